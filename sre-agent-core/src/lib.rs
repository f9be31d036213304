pub mod agent;
pub mod bedrock;
pub mod config;
pub mod error;
pub mod events;
pub mod logger;
pub mod mcp;
pub mod normalizer;
pub mod prompts;
pub mod session;
pub mod tools;

pub use agent::CoordinatorAgent;
pub use bedrock::BedrockModel;
pub use config::{ServiceMode, Settings};
pub use error::AgentError;
pub use events::NormalizedEvent;
pub use session::{Session, SessionMessage, SessionStore};
