//! Narrow client interface over stdio MCP tool servers: start a subprocess,
//! list its capabilities, invoke them, and shut it down. The server lifecycle
//! is scoped to a single specialist invocation; if the owning future is
//! cancelled mid-flight, dropping the transport kills the child process.

use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use rmcp::model::CallToolRequestParam;
use rmcp::service::{Peer, RoleClient, RunningService};
use rmcp::transport::TokioChildProcess;
use rmcp::ServiceExt;
use serde_json::Value;
use tokio::process::Command;
use tracing::{info, warn};

use crate::tools::Tool;

pub struct McpToolServer {
    service: RunningService<RoleClient, ()>,
}

impl McpToolServer {
    /// Spawn the server process and run the MCP initialize handshake.
    pub async fn start(command: &str, args: &[&str], env: &[(String, String)]) -> Result<Self> {
        let mut cmd = Command::new(command);
        cmd.args(args);
        for (key, value) in env {
            cmd.env(key, value);
        }

        let transport = TokioChildProcess::new(cmd)
            .with_context(|| format!("failed to spawn MCP server process '{command}'"))?;
        let service = ()
            .serve(transport)
            .await
            .context("MCP initialize handshake failed")?;

        Ok(Self { service })
    }

    /// List the server's tools, each adapted to the local [`Tool`] trait so
    /// specialist agents treat MCP-backed and native tools uniformly.
    pub async fn tools(&self) -> Result<Vec<Arc<dyn Tool>>> {
        let listed = self
            .service
            .list_all_tools()
            .await
            .context("failed to list MCP tools")?;

        info!("loaded {} MCP tools", listed.len());

        Ok(listed
            .into_iter()
            .map(|tool| {
                Arc::new(McpTool {
                    peer: self.service.peer().clone(),
                    name: tool.name.to_string(),
                    description: tool
                        .description
                        .map(|d| d.to_string())
                        .unwrap_or_default(),
                    schema: Value::Object(tool.input_schema.as_ref().clone()),
                }) as Arc<dyn Tool>
            })
            .collect())
    }

    /// Orderly shutdown. Failures are logged, not propagated; the child is
    /// killed on drop regardless.
    pub async fn shutdown(self) {
        if let Err(err) = self.service.cancel().await {
            warn!("MCP server shutdown failed: {err}");
        }
    }
}

struct McpTool {
    peer: Peer<RoleClient>,
    name: String,
    description: String,
    schema: Value,
}

#[async_trait]
impl Tool for McpTool {
    fn name(&self) -> String {
        self.name.clone()
    }

    fn description(&self) -> String {
        self.description.clone()
    }

    fn parameters(&self) -> Value {
        self.schema.clone()
    }

    async fn call(&self, args: Value) -> Result<String, String> {
        let arguments = match args {
            Value::Object(map) => Some(map),
            Value::Null => None,
            other => return Err(format!("tool arguments must be an object, got {other}")),
        };

        let result = self
            .peer
            .call_tool(CallToolRequestParam {
                name: self.name.clone().into(),
                arguments,
            })
            .await
            .map_err(|e| e.to_string())?;

        let text = result
            .content
            .iter()
            .filter_map(|c| c.as_text().map(|t| t.text.clone()))
            .collect::<Vec<_>>()
            .join("\n");

        if result.is_error.unwrap_or(false) {
            Err(if text.is_empty() {
                "tool reported an error".to_string()
            } else {
                text
            })
        } else {
            Ok(text)
        }
    }
}
