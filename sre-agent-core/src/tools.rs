use async_trait::async_trait;
use serde_json::Value;

pub mod eks;
pub mod finops;
pub mod kubernetes;

pub use eks::EksAssistant;
pub use finops::FinopsAssistant;
pub use kubernetes::KubernetesAssistant;

/// An external capability the model may invoke during reasoning: a cloud API
/// pass-through or a subprocess-backed service. Implementations convert their
/// own failures into `Err(String)`; the agent loops fold that into a textual
/// "Error: ..." tool result so the model can keep reasoning.
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> String;
    fn description(&self) -> String;
    /// JSON Schema of the accepted arguments.
    fn parameters(&self) -> Value;
    async fn call(&self, args: Value) -> Result<String, String>;
}

/// Schema shared by the specialist assistants: a single free-form query.
pub(crate) fn query_schema(description: &str) -> Value {
    serde_json::json!({
        "type": "object",
        "properties": {
            "query": {
                "type": "string",
                "description": description
            }
        },
        "required": ["query"]
    })
}

pub(crate) fn extract_query(args: &Value) -> Result<String, String> {
    args.get("query")
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| "Missing 'query' argument".to_string())
}
