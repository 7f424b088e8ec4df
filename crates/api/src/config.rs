use std::time::Duration;

use fable_provider::PollConfig;

/// Server configuration loaded from environment variables.
///
/// All fields except the API keys have defaults suitable for local
/// development. In production, override via environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `240`). Generation requests
    /// block on polling for up to about three minutes, so this must exceed
    /// the poll budget.
    pub request_timeout_secs: u64,
    /// Generation provider REST base URL.
    pub provider_base_url: String,
    /// Generation provider API key.
    pub provider_api_key: String,
    /// Chat-completions base URL.
    pub llm_base_url: String,
    /// Chat-completions API key.
    pub llm_api_key: String,
    /// Poll tuning for generation jobs.
    pub generation_poll: PollConfig,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                 | Default                                 |
    /// |-------------------------|-----------------------------------------|
    /// | `HOST`                  | `0.0.0.0`                               |
    /// | `PORT`                  | `3000`                                  |
    /// | `CORS_ORIGINS`          | `http://localhost:5173`                 |
    /// | `REQUEST_TIMEOUT_SECS`  | `240`                                   |
    /// | `PROVIDER_API_BASE`     | `https://cloud.leonardo.ai/api/rest/v1` |
    /// | `PROVIDER_API_KEY`      | (required)                              |
    /// | `LLM_API_BASE`          | `https://api.openai.com/v1`             |
    /// | `LLM_API_KEY`           | (required)                              |
    /// | `POLL_INITIAL_DELAY_MS` | `10000`                                 |
    /// | `POLL_INTERVAL_MS`      | `5000`                                  |
    /// | `POLL_MAX_ATTEMPTS`     | `36`                                    |
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "3000".into())
            .parse()
            .expect("PORT must be a valid u16");

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs: u64 = std::env::var("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "240".into())
            .parse()
            .expect("REQUEST_TIMEOUT_SECS must be a valid u64");

        let provider_base_url = std::env::var("PROVIDER_API_BASE")
            .unwrap_or_else(|_| "https://cloud.leonardo.ai/api/rest/v1".into());
        let provider_api_key =
            std::env::var("PROVIDER_API_KEY").expect("PROVIDER_API_KEY must be set");

        let llm_base_url =
            std::env::var("LLM_API_BASE").unwrap_or_else(|_| "https://api.openai.com/v1".into());
        let llm_api_key = std::env::var("LLM_API_KEY").expect("LLM_API_KEY must be set");

        let generation_poll = PollConfig {
            initial_delay: Duration::from_millis(env_u64("POLL_INITIAL_DELAY_MS", 10_000)),
            interval: Duration::from_millis(env_u64("POLL_INTERVAL_MS", 5_000)),
            max_attempts: env_u64("POLL_MAX_ATTEMPTS", 36) as u32,
        };

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            provider_base_url,
            provider_api_key,
            llm_base_url,
            llm_api_key,
            generation_poll,
        }
    }
}

fn env_u64(name: &str, default: u64) -> u64 {
    std::env::var(name)
        .unwrap_or_else(|_| default.to_string())
        .parse()
        .unwrap_or_else(|_| panic!("{name} must be a valid u64"))
}
