//! Kubernetes specialist: native pass-through tools over the cluster API plus
//! the `kubernetes_assistant` coordinator tool that wraps them in a specialist
//! agent. Works against local K3s (via `KUBECONFIG`) and EKS clusters alike.

use std::sync::Arc;

use async_trait::async_trait;
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::{Event, Namespace, Pod};
use kube::api::{Api, ListParams, LogParams};
use kube::config::{KubeConfigOptions, Kubeconfig};
use serde_json::{json, Value};
use tracing::info;

use crate::agent::run_specialist;
use crate::bedrock::BedrockModel;
use crate::prompts::KUBERNETES_SYSTEM_PROMPT;
use crate::tools::{extract_query, query_schema, Tool};

/// Build a client per invocation: an explicit kubeconfig path wins, otherwise
/// inference (default kubeconfig, then in-cluster config).
async fn cluster_client(kubeconfig: Option<&str>) -> Result<kube::Client, String> {
    let config = match kubeconfig {
        Some(path) => {
            let kc = Kubeconfig::read_from(path)
                .map_err(|e| format!("failed to read kubeconfig {path}: {e}"))?;
            kube::Config::from_custom_kubeconfig(kc, &KubeConfigOptions::default())
                .await
                .map_err(|e| format!("failed to load kubeconfig {path}: {e}"))?
        }
        None => kube::Config::infer()
            .await
            .map_err(|e| format!("failed to infer cluster config: {e}"))?,
    };

    kube::Client::try_from(config).map_err(|e| format!("failed to build cluster client: {e}"))
}

fn render(value: &Value) -> Result<String, String> {
    serde_json::to_string_pretty(value).map_err(|e| e.to_string())
}

fn str_arg<'a>(args: &'a Value, key: &str, default: &'a str) -> &'a str {
    args.get(key).and_then(Value::as_str).unwrap_or(default)
}

pub struct ListNamespacesTool {
    kubeconfig: Option<String>,
}

#[async_trait]
impl Tool for ListNamespacesTool {
    fn name(&self) -> String {
        "list_namespaces".to_string()
    }

    fn description(&self) -> String {
        "List all namespaces in the Kubernetes cluster".to_string()
    }

    fn parameters(&self) -> Value {
        json!({"type": "object", "properties": {}})
    }

    async fn call(&self, _args: Value) -> Result<String, String> {
        let client = cluster_client(self.kubeconfig.as_deref()).await?;
        let namespaces = Api::<Namespace>::all(client)
            .list(&ListParams::default())
            .await
            .map_err(|e| format!("failed to list namespaces: {e}"))?;

        let names: Vec<&str> = namespaces
            .items
            .iter()
            .filter_map(|ns| ns.metadata.name.as_deref())
            .collect();
        render(&json!(names))
    }
}

pub struct ListPodsTool {
    kubeconfig: Option<String>,
}

#[async_trait]
impl Tool for ListPodsTool {
    fn name(&self) -> String {
        "list_pods".to_string()
    }

    fn description(&self) -> String {
        "List pods in a namespace, optionally filtered by a label selector".to_string()
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "namespace": {"type": "string", "description": "Namespace to list pods from"},
                "label_selector": {"type": "string", "description": "Optional label selector, e.g. 'app=nginx'"}
            }
        })
    }

    async fn call(&self, args: Value) -> Result<String, String> {
        let namespace = str_arg(&args, "namespace", "default");
        let client = cluster_client(self.kubeconfig.as_deref()).await?;

        let mut params = ListParams::default();
        if let Some(selector) = args.get("label_selector").and_then(Value::as_str) {
            params = params.labels(selector);
        }

        let pods = Api::<Pod>::namespaced(client, namespace)
            .list(&params)
            .await
            .map_err(|e| format!("failed to list pods in {namespace}: {e}"))?;

        let summaries: Vec<Value> = pods.items.iter().map(pod_summary).collect();
        render(&json!(summaries))
    }
}

fn pod_summary(pod: &Pod) -> Value {
    let status = pod.status.as_ref();
    let spec = pod.spec.as_ref();
    json!({
        "name": pod.metadata.name,
        "namespace": pod.metadata.namespace,
        "status": status.and_then(|s| s.phase.clone()),
        "node": spec.and_then(|s| s.node_name.clone()),
        "start_time": status
            .and_then(|s| s.start_time.as_ref())
            .map(|t| t.0.to_rfc3339()),
        "ip": status.and_then(|s| s.pod_ip.clone()),
        "labels": pod.metadata.labels.clone().unwrap_or_default(),
    })
}

pub struct PodDetailsTool {
    kubeconfig: Option<String>,
}

#[async_trait]
impl Tool for PodDetailsTool {
    fn name(&self) -> String {
        "get_pod_details".to_string()
    }

    fn description(&self) -> String {
        "Get detailed information about a specific pod".to_string()
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "pod_name": {"type": "string", "description": "Name of the pod"},
                "namespace": {"type": "string", "description": "Namespace of the pod"}
            },
            "required": ["pod_name"]
        })
    }

    async fn call(&self, args: Value) -> Result<String, String> {
        let pod_name = str_arg(&args, "pod_name", "");
        if pod_name.is_empty() {
            return Err("pod_name is required".to_string());
        }
        let namespace = str_arg(&args, "namespace", "default");

        let client = cluster_client(self.kubeconfig.as_deref()).await?;
        let pod = Api::<Pod>::namespaced(client, namespace)
            .get(pod_name)
            .await
            .map_err(|e| format!("failed to get pod {pod_name} in {namespace}: {e}"))?;

        let status = pod.status.as_ref();
        let spec = pod.spec.as_ref();

        let container_statuses: Vec<Value> = status
            .and_then(|s| s.container_statuses.as_ref())
            .map(|statuses| {
                statuses
                    .iter()
                    .map(|cs| {
                        json!({
                            "name": cs.name,
                            "ready": cs.ready,
                            "restart_count": cs.restart_count,
                            "state": serde_json::to_value(&cs.state).ok(),
                        })
                    })
                    .collect()
            })
            .unwrap_or_default();

        let conditions: Vec<Value> = status
            .and_then(|s| s.conditions.as_ref())
            .map(|conditions| {
                conditions
                    .iter()
                    .map(|c| {
                        json!({
                            "type": c.type_,
                            "status": c.status,
                            "last_transition_time": c
                                .last_transition_time
                                .as_ref()
                                .map(|t| t.0.to_rfc3339()),
                        })
                    })
                    .collect()
            })
            .unwrap_or_default();

        let mut details = pod_summary(&pod);
        details["annotations"] = json!(pod.metadata.annotations.clone().unwrap_or_default());
        details["containers"] = json!(spec
            .map(|s| s.containers.iter().map(|c| c.name.clone()).collect::<Vec<_>>())
            .unwrap_or_default());
        details["container_statuses"] = json!(container_statuses);
        details["conditions"] = json!(conditions);

        render(&details)
    }
}

pub struct PodLogsTool {
    kubeconfig: Option<String>,
}

#[async_trait]
impl Tool for PodLogsTool {
    fn name(&self) -> String {
        "get_pod_logs".to_string()
    }

    fn description(&self) -> String {
        "Get logs from a specific pod".to_string()
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "pod_name": {"type": "string", "description": "Name of the pod"},
                "namespace": {"type": "string", "description": "Namespace of the pod"},
                "container": {"type": "string", "description": "Container name, required for multi-container pods"},
                "tail_lines": {"type": "integer", "description": "Number of lines to return from the end"}
            },
            "required": ["pod_name"]
        })
    }

    async fn call(&self, args: Value) -> Result<String, String> {
        let pod_name = str_arg(&args, "pod_name", "");
        if pod_name.is_empty() {
            return Err("pod_name is required".to_string());
        }
        let namespace = str_arg(&args, "namespace", "default");
        let container = args
            .get("container")
            .and_then(Value::as_str)
            .map(str::to_string);
        let tail_lines = args
            .get("tail_lines")
            .and_then(Value::as_i64)
            .unwrap_or(100);

        let client = cluster_client(self.kubeconfig.as_deref()).await?;
        let params = LogParams {
            container: container.clone(),
            tail_lines: Some(tail_lines),
            ..LogParams::default()
        };
        let logs = Api::<Pod>::namespaced(client, namespace)
            .logs(pod_name, &params)
            .await
            .map_err(|e| format!("failed to get logs for pod {pod_name} in {namespace}: {e}"))?;

        render(&json!({
            "pod_name": pod_name,
            "namespace": namespace,
            "container": container,
            "logs": logs,
            "log_length": logs.len(),
        }))
    }
}

pub struct ListDeploymentsTool {
    kubeconfig: Option<String>,
}

#[async_trait]
impl Tool for ListDeploymentsTool {
    fn name(&self) -> String {
        "list_deployments".to_string()
    }

    fn description(&self) -> String {
        "List deployments in a namespace".to_string()
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "namespace": {"type": "string", "description": "Namespace to list deployments from"}
            }
        })
    }

    async fn call(&self, args: Value) -> Result<String, String> {
        let namespace = str_arg(&args, "namespace", "default");
        let client = cluster_client(self.kubeconfig.as_deref()).await?;

        let deployments = Api::<Deployment>::namespaced(client, namespace)
            .list(&ListParams::default())
            .await
            .map_err(|e| format!("failed to list deployments in {namespace}: {e}"))?;

        let summaries: Vec<Value> = deployments
            .items
            .iter()
            .map(|deploy| {
                let spec = deploy.spec.as_ref();
                let status = deploy.status.as_ref();
                json!({
                    "name": deploy.metadata.name,
                    "namespace": deploy.metadata.namespace,
                    "replicas": spec.and_then(|s| s.replicas),
                    "available_replicas": status.and_then(|s| s.available_replicas).unwrap_or(0),
                    "ready_replicas": status.and_then(|s| s.ready_replicas).unwrap_or(0),
                    "strategy": spec
                        .and_then(|s| s.strategy.as_ref())
                        .and_then(|s| s.type_.clone())
                        .unwrap_or_else(|| "Unknown".to_string()),
                    "labels": deploy.metadata.labels.clone().unwrap_or_default(),
                })
            })
            .collect();
        render(&json!(summaries))
    }
}

pub struct ClusterEventsTool {
    kubeconfig: Option<String>,
}

#[async_trait]
impl Tool for ClusterEventsTool {
    fn name(&self) -> String {
        "get_events".to_string()
    }

    fn description(&self) -> String {
        "Get Kubernetes events for a namespace".to_string()
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "namespace": {"type": "string", "description": "Namespace to get events from"},
                "limit": {"type": "integer", "description": "Maximum number of events to return"}
            }
        })
    }

    async fn call(&self, args: Value) -> Result<String, String> {
        let namespace = str_arg(&args, "namespace", "default");
        let limit = args.get("limit").and_then(Value::as_u64).unwrap_or(50) as u32;

        let client = cluster_client(self.kubeconfig.as_deref()).await?;
        let events = Api::<Event>::namespaced(client, namespace)
            .list(&ListParams::default().limit(limit))
            .await
            .map_err(|e| format!("failed to get events in {namespace}: {e}"))?;

        let summaries: Vec<Value> = events
            .items
            .iter()
            .map(|event| {
                json!({
                    "name": event.metadata.name,
                    "namespace": event.metadata.namespace,
                    "type": event.type_,
                    "reason": event.reason,
                    "message": event.message,
                    "first_seen": event.first_timestamp.as_ref().map(|t| t.0.to_rfc3339()),
                    "last_seen": event.last_timestamp.as_ref().map(|t| t.0.to_rfc3339()),
                    "count": event.count,
                    "involved_object": {
                        "kind": event.involved_object.kind,
                        "name": event.involved_object.name,
                    },
                })
            })
            .collect();
        render(&json!(summaries))
    }
}

/// Coordinator-facing tool: a Kubernetes specialist agent over the native
/// cluster tools.
pub struct KubernetesAssistant {
    model: Arc<BedrockModel>,
    tools: Vec<Arc<dyn Tool>>,
}

impl KubernetesAssistant {
    pub fn new(model: Arc<BedrockModel>, kubeconfig: Option<String>) -> Self {
        let tools: Vec<Arc<dyn Tool>> = vec![
            Arc::new(ListNamespacesTool {
                kubeconfig: kubeconfig.clone(),
            }),
            Arc::new(ListPodsTool {
                kubeconfig: kubeconfig.clone(),
            }),
            Arc::new(PodDetailsTool {
                kubeconfig: kubeconfig.clone(),
            }),
            Arc::new(PodLogsTool {
                kubeconfig: kubeconfig.clone(),
            }),
            Arc::new(ListDeploymentsTool {
                kubeconfig: kubeconfig.clone(),
            }),
            Arc::new(ClusterEventsTool { kubeconfig }),
        ];

        Self { model, tools }
    }
}

#[async_trait]
impl Tool for KubernetesAssistant {
    fn name(&self) -> String {
        "kubernetes_assistant".to_string()
    }

    fn description(&self) -> String {
        "Kubernetes specialist assistant for cluster management and troubleshooting: \
         querying resources (pods, deployments, services, namespaces), analyzing pod \
         logs and events, and diagnosing application issues. Works with both K3s \
         (local) and EKS (production) clusters."
            .to_string()
    }

    fn parameters(&self) -> Value {
        query_schema("A Kubernetes-related question or request")
    }

    async fn call(&self, args: Value) -> Result<String, String> {
        let query = extract_query(&args)?;
        let preview: String = query.chars().take(100).collect();
        info!("Kubernetes assistant invoked with query: {preview}");

        match run_specialist(&self.model, KUBERNETES_SYSTEM_PROMPT, &self.tools, &query).await {
            Ok(response) => {
                info!("Kubernetes assistant completed successfully");
                Ok(response)
            }
            Err(err) => Ok(format!("Error in Kubernetes assistant: {err}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pod_name_is_required() {
        let tool = PodDetailsTool { kubeconfig: None };
        let err = futures::executor::block_on(tool.call(json!({"namespace": "default"})));
        assert_eq!(err, Err("pod_name is required".to_string()));

        let tool = PodLogsTool { kubeconfig: None };
        let err = futures::executor::block_on(tool.call(json!({})));
        assert_eq!(err, Err("pod_name is required".to_string()));
    }

    #[test]
    fn assistant_requires_a_query() {
        let result = extract_query(&json!({"other": 1}));
        assert_eq!(result, Err("Missing 'query' argument".to_string()));
    }

    #[test]
    fn pod_summary_handles_missing_status() {
        let pod = Pod::default();
        let summary = pod_summary(&pod);
        assert_eq!(summary["status"], Value::Null);
        assert_eq!(summary["labels"], json!({}));
    }
}
