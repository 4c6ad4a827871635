use std::env;
use std::path::PathBuf;

const DEFAULT_DB: &str = "opsagent.db";
const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 8080;

/// Service configuration, read once at startup from the environment.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    pub db_path: PathBuf,
    pub api_host: String,
    pub api_port: u16,
    /// Base URL of the external planning service. When unset the builtin
    /// offline planner is used instead.
    pub ai_service_base_url: Option<String>,
}

impl AgentConfig {
    pub fn from_env() -> Self {
        let db_path = env::var("OPSAGENT_DB")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_DB));
        let api_host = env::var("OPSAGENT_API_HOST").unwrap_or_else(|_| DEFAULT_HOST.to_string());
        let api_port = env::var("OPSAGENT_API_PORT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_PORT);
        let ai_service_base_url = env::var("AI_SERVICE_BASE_URL")
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());

        Self {
            db_path,
            api_host,
            api_port,
            ai_service_base_url,
        }
    }
}
