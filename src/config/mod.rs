// src/config/mod.rs

use std::str::FromStr;

/// Runtime configuration, read once at startup and passed into the parts
/// that need it. Nothing in here is global.
#[derive(Debug, Clone)]
pub struct Config {
    // ── Model
    pub openai_api_key: String,
    pub openai_base_url: String,
    pub model: String,
    pub system_template: String,
    pub max_token_limit: usize,

    // ── Client authentication (comma-separated allow-list; empty = open)
    pub api_keys: Vec<String>,

    // ── Redis (unset host = file backends)
    pub redis_host: Option<String>,
    pub redis_port: u16,
    pub redis_password: Option<String>,
    pub redis_db: i64,

    // ── Storage
    pub cache_path: String,
    pub cache_ttl_secs: u64,
    pub history_ttl_secs: u64,

    // ── Server
    pub host: String,
    pub port: u16,

    // ── Logging
    pub log_level: String,
    pub log_dir: String,
}

// Handles values carrying inline comments and stray whitespace; parse
// failures fall back to the default rather than aborting startup.
fn env_var_or<T>(key: &str, default: T) -> T
where
    T: FromStr,
{
    match std::env::var(key) {
        Ok(val) => {
            let clean_val = val.split('#').next().unwrap_or("").trim();
            match clean_val.parse::<T>() {
                Ok(parsed) => parsed,
                Err(_) => {
                    eprintln!("Config: {} = '{}' (parse failed, using default)", key, val);
                    default
                }
            }
        }
        Err(_) => default,
    }
}

fn env_var_opt(key: &str) -> Option<String> {
    match std::env::var(key) {
        Ok(val) if !val.trim().is_empty() => Some(val.trim().to_string()),
        _ => None,
    }
}

impl Config {
    pub fn from_env() -> Self {
        let api_keys = match std::env::var("API_KEY") {
            Ok(val) if !val.trim().is_empty() => {
                val.split(',').map(|key| key.to_string()).collect()
            }
            _ => Vec::new(),
        };

        Self {
            openai_api_key: env_var_or("OPENAI_API_KEY", String::new()),
            openai_base_url: env_var_or(
                "OPENAI_BASE_URL",
                "https://api.openai.com/v1".to_string(),
            ),
            model: env_var_or("MODEL", "gpt-3.5-turbo".to_string()),
            system_template: env_var_or(
                "SYSTEM_TEMPLATE",
                "You are a nice chatbot having a conversation with a person.".to_string(),
            ),
            max_token_limit: env_var_or("MAX_TOKEN_LIMIT", 2000),
            api_keys,
            redis_host: env_var_opt("REDIS_HOST"),
            redis_port: env_var_or("REDIS_PORT", 6379),
            redis_password: env_var_opt("REDIS_PASSWORD"),
            redis_db: env_var_or("REDIS_DB", 0),
            cache_path: env_var_or("CACHE_PATH", "./chat_history".to_string()),
            cache_ttl_secs: env_var_or("CACHE_TTL_SECS", 3600),
            history_ttl_secs: env_var_or("HISTORY_TTL_SECS", 600),
            host: env_var_or("HOST", "0.0.0.0".to_string()),
            port: env_var_or("SERVER_PORT", 5010),
            log_level: env_var_or("LOG_LEVEL", "info".to_string()),
            log_dir: env_var_or("LOG_DIR", ".".to_string()),
        }
    }

    /// Whether a client-supplied token may use the ask/answer endpoints.
    /// With no configured keys the service is open.
    pub fn token_allowed(&self, token: Option<&str>) -> bool {
        if self.api_keys.is_empty() {
            return true;
        }
        match token {
            Some(token) => self.api_keys.iter().any(|key| key == token),
            None => false,
        }
    }

    /// Connection URL for the shared Redis backend, when one is configured.
    pub fn redis_url(&self) -> Option<String> {
        let host = self.redis_host.as_deref()?;
        let auth = match self.redis_password.as_deref() {
            Some(password) => format!(":{}@", password),
            None => String::new(),
        };
        Some(format!(
            "redis://{}{}:{}/{}",
            auth, host, self.redis_port, self.redis_db
        ))
    }

    pub fn chat_completions_url(&self) -> String {
        format!(
            "{}/chat/completions",
            self.openai_base_url.trim_end_matches('/')
        )
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
