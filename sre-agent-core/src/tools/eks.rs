//! EKS specialist: spawns the AWS EKS MCP server for the duration of one
//! query. Write access and sensitive-data access are opt-in via settings and
//! logged loudly when enabled.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{info, warn};

use crate::agent::run_specialist;
use crate::bedrock::BedrockModel;
use crate::config::Settings;
use crate::mcp::McpToolServer;
use crate::prompts::EKS_SYSTEM_PROMPT;
use crate::tools::{extract_query, query_schema, Tool};

const EKS_MCP: &str = "awslabs.eks-mcp-server@latest";

pub struct EksAssistant {
    model: Arc<BedrockModel>,
    settings: Settings,
}

impl EksAssistant {
    pub fn new(model: Arc<BedrockModel>, settings: Settings) -> Self {
        Self { model, settings }
    }

    fn server_args(&self) -> Vec<&str> {
        let mut args = vec!["tool", "run", "--from", EKS_MCP, "awslabs.eks-mcp-server"];
        if self.settings.eks_mcp_allow_write {
            args.push("--allow-write");
            warn!("EKS MCP server running with --allow-write enabled");
        }
        if self.settings.eks_mcp_allow_sensitive_data {
            args.push("--allow-sensitive-data-access");
            warn!("EKS MCP server running with --allow-sensitive-data-access enabled");
        }
        args
    }

    fn server_env(&self) -> Vec<(String, String)> {
        let mut env = vec![
            ("AWS_REGION".to_string(), self.settings.aws_region.clone()),
            (
                "AWS_PROFILE".to_string(),
                self.settings.aws_profile.clone().unwrap_or_default(),
            ),
            (
                "FASTMCP_LOG_LEVEL".to_string(),
                self.settings.fastmcp_log_level.clone(),
            ),
        ];
        if let Some(kubeconfig) = &self.settings.kubeconfig {
            env.push(("KUBECONFIG".to_string(), kubeconfig.clone()));
            info!("using KUBECONFIG: {kubeconfig}");
        }
        env
    }

    async fn run_query(&self, server: &McpToolServer, query: &str) -> anyhow::Result<String> {
        let tools = server.tools().await?;
        info!("loaded {} EKS tools", tools.len());
        let response = run_specialist(&self.model, EKS_SYSTEM_PROMPT, &tools, query).await?;
        Ok(response)
    }
}

#[async_trait]
impl Tool for EksAssistant {
    fn name(&self) -> String {
        "eks_assistant".to_string()
    }

    fn description(&self) -> String {
        "Manage AWS EKS clusters and Kubernetes resources using EKS MCP tools: \
         query and manage cluster resources, deploy workloads, retrieve pod logs \
         and Kubernetes events, troubleshoot applications, and access CloudWatch \
         metrics and logs."
            .to_string()
    }

    fn parameters(&self) -> Value {
        query_schema("A Kubernetes or EKS-related question or management request")
    }

    async fn call(&self, args: Value) -> Result<String, String> {
        let query = extract_query(&args)?;
        let preview: String = query.chars().take(100).collect();
        info!("EKS assistant invoked with query: {preview}");

        let server_args = self.server_args();
        let env = self.server_env();
        let server = match McpToolServer::start("uv", &server_args, &env).await {
            Ok(server) => server,
            Err(err) => return Ok(format!("Error in EKS assistant: {err}")),
        };

        let result = self.run_query(&server, &query).await;
        server.shutdown().await;

        match result {
            Ok(response) => {
                info!("EKS assistant completed successfully");
                Ok(response)
            }
            Err(err) => Ok(format!("Error in EKS assistant: {err}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn assistant(settings: Settings) -> EksAssistant {
        EksAssistant {
            model: Arc::new(BedrockModel::new(&settings).await),
            settings,
        }
    }

    #[tokio::test]
    async fn default_args_carry_no_write_flags() {
        let assistant = assistant(Settings::default()).await;
        let args = assistant.server_args();
        assert!(!args.contains(&"--allow-write"));
        assert!(!args.contains(&"--allow-sensitive-data-access"));
    }

    #[tokio::test]
    async fn write_flags_are_opt_in() {
        let settings = Settings {
            eks_mcp_allow_write: true,
            eks_mcp_allow_sensitive_data: true,
            ..Settings::default()
        };
        let assistant = assistant(settings).await;
        let args = assistant.server_args();
        assert!(args.contains(&"--allow-write"));
        assert!(args.contains(&"--allow-sensitive-data-access"));
    }

    #[tokio::test]
    async fn kubeconfig_is_forwarded_to_the_server_env() {
        let settings = Settings {
            kubeconfig: Some("/tmp/k3s.yaml".to_string()),
            ..Settings::default()
        };
        let assistant = assistant(settings).await;
        let env = assistant.server_env();
        assert!(env.contains(&("KUBECONFIG".to_string(), "/tmp/k3s.yaml".to_string())));
    }
}
