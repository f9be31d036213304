//! FinOps specialist: spawns the Cost Explorer MCP server for the duration of
//! one query and runs a specialist agent over its tools.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::info;

use crate::agent::run_specialist;
use crate::bedrock::BedrockModel;
use crate::config::Settings;
use crate::mcp::McpToolServer;
use crate::prompts::FINOPS_SYSTEM_PROMPT;
use crate::tools::{extract_query, query_schema, Tool};

const COST_EXPLORER_MCP: &str = "awslabs.cost-explorer-mcp-server@latest";

pub struct FinopsAssistant {
    model: Arc<BedrockModel>,
    settings: Settings,
}

impl FinopsAssistant {
    pub fn new(model: Arc<BedrockModel>, settings: Settings) -> Self {
        Self { model, settings }
    }

    fn server_env(&self) -> Vec<(String, String)> {
        vec![
            ("AWS_REGION".to_string(), self.settings.aws_region.clone()),
            (
                "AWS_PROFILE".to_string(),
                self.settings.aws_profile.clone().unwrap_or_default(),
            ),
            (
                "FASTMCP_LOG_LEVEL".to_string(),
                self.settings.fastmcp_log_level.clone(),
            ),
        ]
    }

    async fn run_query(&self, server: &McpToolServer, query: &str) -> anyhow::Result<String> {
        let tools = server.tools().await?;
        info!("loaded {} Cost Explorer tools", tools.len());
        let response = run_specialist(&self.model, FINOPS_SYSTEM_PROMPT, &tools, query).await?;
        Ok(response)
    }
}

#[async_trait]
impl Tool for FinopsAssistant {
    fn name(&self) -> String {
        "finops_assistant".to_string()
    }

    fn description(&self) -> String {
        "Analyze AWS costs and provide FinOps insights using Cost Explorer data: \
         historical cost and usage analysis, comparisons between time periods, \
         spend forecasting, breakdowns by service/region/account/tags, and cost \
         optimization opportunities."
            .to_string()
    }

    fn parameters(&self) -> Value {
        query_schema("A cost-related question or analysis request")
    }

    async fn call(&self, args: Value) -> Result<String, String> {
        let query = extract_query(&args)?;
        let preview: String = query.chars().take(100).collect();
        info!("FinOps assistant invoked with query: {preview}");

        let env = self.server_env();
        let server = match McpToolServer::start("uvx", &[COST_EXPLORER_MCP], &env).await {
            Ok(server) => server,
            Err(err) => return Ok(format!("Error in FinOps assistant: {err}")),
        };

        // Shutdown runs on both outcomes; a cancelled future kills the child
        // on drop instead.
        let result = self.run_query(&server, &query).await;
        server.shutdown().await;

        match result {
            Ok(response) => {
                info!("FinOps assistant completed successfully");
                Ok(response)
            }
            Err(err) => Ok(format!("Error in FinOps assistant: {err}")),
        }
    }
}
