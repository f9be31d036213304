use thiserror::Error;

/// Failures surfaced by the agent layer. On the streaming path these become a
/// single trailing `error` normalized event; on the synchronous specialist
/// path they are folded into a textual tool result for the model.
#[derive(Debug, Error)]
pub enum AgentError {
    #[error("model invocation failed: {0}")]
    Model(String),

    #[error("event stream failed: {0}")]
    Stream(String),

    #[error("tool loop exceeded {0} iterations")]
    ToolLoopExceeded(usize),
}

/// Internal session-store failures. The public `SessionStore` API never leaks
/// these; it logs and degrades to `None`/`false` at the component boundary.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Serde(#[from] serde_json::Error),
}
