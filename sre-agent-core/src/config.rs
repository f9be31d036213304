use std::env;

/// Which surface the process serves. "web" additionally enables permissive
/// CORS for a browser UI; "api" is the plain JSON service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceMode {
    Api,
    Web,
}

impl ServiceMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceMode::Api => "api",
            ServiceMode::Web => "web",
        }
    }

    fn parse(value: &str) -> Self {
        match value.to_ascii_lowercase().as_str() {
            "web" => ServiceMode::Web,
            _ => ServiceMode::Api,
        }
    }
}

/// Application settings, read from the environment (a `.env` file is loaded by
/// the server binary before this runs). Every field has a default so the
/// service starts with no configuration at all.
#[derive(Debug, Clone)]
pub struct Settings {
    pub service_mode: ServiceMode,
    pub port: u16,
    pub aws_region: String,
    pub aws_profile: Option<String>,
    pub bedrock_model_id: String,
    pub session_storage_path: String,
    pub log_level: String,
    pub fastmcp_log_level: String,
    pub kubeconfig: Option<String>,
    pub eks_mcp_allow_write: bool,
    pub eks_mcp_allow_sensitive_data: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            service_mode: ServiceMode::Api,
            port: 8000,
            aws_region: "us-east-1".to_string(),
            aws_profile: None,
            bedrock_model_id: "anthropic.claude-3-5-sonnet-20241022-v2:0".to_string(),
            session_storage_path: "./sessions".to_string(),
            log_level: "INFO".to_string(),
            fastmcp_log_level: "ERROR".to_string(),
            kubeconfig: None,
            eks_mcp_allow_write: false,
            eks_mcp_allow_sensitive_data: false,
        }
    }
}

impl Settings {
    pub fn from_env() -> Self {
        let defaults = Settings::default();
        Self {
            service_mode: env_opt("SERVICE_MODE")
                .map(|v| ServiceMode::parse(&v))
                .unwrap_or(defaults.service_mode),
            port: env_opt("PORT")
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.port),
            aws_region: env_opt("AWS_REGION").unwrap_or(defaults.aws_region),
            aws_profile: env_opt("AWS_PROFILE"),
            bedrock_model_id: env_opt("BEDROCK_MODEL_ID").unwrap_or(defaults.bedrock_model_id),
            session_storage_path: env_opt("SESSION_STORAGE_PATH")
                .unwrap_or(defaults.session_storage_path),
            log_level: env_opt("LOG_LEVEL").unwrap_or(defaults.log_level),
            fastmcp_log_level: env_opt("FASTMCP_LOG_LEVEL").unwrap_or(defaults.fastmcp_log_level),
            kubeconfig: env_opt("KUBECONFIG"),
            eks_mcp_allow_write: env_flag("EKS_MCP_ALLOW_WRITE"),
            eks_mcp_allow_sensitive_data: env_flag("EKS_MCP_ALLOW_SENSITIVE_DATA"),
        }
    }
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn env_flag(key: &str) -> bool {
    env_opt(key)
        .map(|v| matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
        .unwrap_or(false)
}
