//! Process-wide configuration, read once at startup from the environment

use crate::error::FinanceError;
use crate::Result;
use std::env;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_PORT: u16 = 3001;
pub const DEFAULT_CORS_ORIGIN: &str = "http://localhost:3000";
pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_ADVICE_MODEL: &str = "gpt-3.5-turbo";
pub const DEFAULT_ADVICE_MAX_TOKENS: u32 = 300;
pub const DEFAULT_ADVICE_TEMPERATURE: f32 = 0.7;
pub const DEFAULT_ADVICE_TIMEOUT_SECS: u64 = 20;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub server: ServerSettings,
    pub auth: AuthSettings,
    pub advice: AdviceSettings,
    pub database_url: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ServerSettings {
    pub port: u16,
    pub cors_origin: String,
}

#[derive(Debug, Clone)]
pub struct AuthSettings {
    pub jwt_secret: String,
    pub bcrypt_cost: u32,
}

/// Parameters of the single upstream text-generation call
#[derive(Debug, Clone)]
pub struct AdviceSettings {
    /// `None` makes /advice answer 500 instead of failing startup.
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub timeout: Duration,
}

impl Default for AdviceSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_OPENAI_BASE_URL.to_string(),
            model: DEFAULT_ADVICE_MODEL.to_string(),
            max_tokens: DEFAULT_ADVICE_MAX_TOKENS,
            temperature: DEFAULT_ADVICE_TEMPERATURE,
            timeout: Duration::from_secs(DEFAULT_ADVICE_TIMEOUT_SECS),
        }
    }
}

impl AppConfig {
    /// Load from the process environment. Call `dotenv::dotenv()` first.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load from an arbitrary key lookup (used by tests).
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let jwt_secret = get("JWT_SECRET").ok_or_else(|| {
            FinanceError::Configuration("JWT_SECRET must be set".to_string())
        })?;

        let port = match get("PORT").or_else(|| get("API_PORT")) {
            Some(raw) => parse_setting("PORT", &raw)?,
            None => DEFAULT_PORT,
        };

        let bcrypt_cost = match get("BCRYPT_COST") {
            Some(raw) => parse_setting("BCRYPT_COST", &raw)?,
            None => bcrypt::DEFAULT_COST,
        };

        let mut advice = AdviceSettings {
            api_key: get("OPENAI_API_KEY"),
            ..AdviceSettings::default()
        };
        if let Some(base_url) = get("OPENAI_BASE_URL") {
            advice.base_url = base_url.trim_end_matches('/').to_string();
        }
        if let Some(model) = get("ADVICE_MODEL") {
            advice.model = model;
        }
        if let Some(raw) = get("ADVICE_MAX_TOKENS") {
            advice.max_tokens = parse_setting("ADVICE_MAX_TOKENS", &raw)?;
        }
        if let Some(raw) = get("ADVICE_TEMPERATURE") {
            advice.temperature = parse_setting("ADVICE_TEMPERATURE", &raw)?;
        }
        if let Some(raw) = get("ADVICE_TIMEOUT_SECS") {
            advice.timeout = Duration::from_secs(parse_setting("ADVICE_TIMEOUT_SECS", &raw)?);
        }

        Ok(Self {
            server: ServerSettings {
                port,
                cors_origin: get("CORS_ORIGIN").unwrap_or_else(|| DEFAULT_CORS_ORIGIN.to_string()),
            },
            auth: AuthSettings {
                jwt_secret,
                bcrypt_cost,
            },
            advice,
            database_url: get("POSTGRES_URL").or_else(|| get("DATABASE_URL")),
        })
    }
}

fn parse_setting<T: FromStr>(key: &str, raw: &str) -> Result<T> {
    raw.parse::<T>().map_err(|_| {
        FinanceError::Configuration(format!("{} has an invalid value: {:?}", key, raw))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_missing_jwt_secret_is_fatal() {
        let result = AppConfig::from_lookup(lookup_from(&[("OPENAI_API_KEY", "sk-test")]));
        assert!(matches!(result, Err(FinanceError::Configuration(_))));

        let result = AppConfig::from_lookup(lookup_from(&[("JWT_SECRET", "   ")]));
        assert!(matches!(result, Err(FinanceError::Configuration(_))));
    }

    #[test]
    fn test_defaults() {
        let config = AppConfig::from_lookup(lookup_from(&[("JWT_SECRET", "s3cret")])).unwrap();
        assert_eq!(config.server.port, DEFAULT_PORT);
        assert_eq!(config.server.cors_origin, DEFAULT_CORS_ORIGIN);
        assert_eq!(config.auth.bcrypt_cost, bcrypt::DEFAULT_COST);
        assert!(config.advice.api_key.is_none());
        assert_eq!(config.advice.model, DEFAULT_ADVICE_MODEL);
        assert_eq!(config.advice.max_tokens, DEFAULT_ADVICE_MAX_TOKENS);
        assert!(config.database_url.is_none());
    }

    #[test]
    fn test_overrides() {
        let config = AppConfig::from_lookup(lookup_from(&[
            ("JWT_SECRET", "s3cret"),
            ("API_PORT", "8080"),
            ("OPENAI_API_KEY", "sk-test"),
            ("OPENAI_BASE_URL", "http://localhost:9999/v1/"),
            ("ADVICE_TIMEOUT_SECS", "5"),
            ("DATABASE_URL", "postgres://localhost/finance"),
        ]))
        .unwrap();

        assert_eq!(config.server.port, 8080);
        assert_eq!(config.advice.api_key.as_deref(), Some("sk-test"));
        assert_eq!(config.advice.base_url, "http://localhost:9999/v1");
        assert_eq!(config.advice.timeout, Duration::from_secs(5));
        assert_eq!(config.database_url.as_deref(), Some("postgres://localhost/finance"));
    }

    #[test]
    fn test_invalid_number_is_configuration_error() {
        let result = AppConfig::from_lookup(lookup_from(&[
            ("JWT_SECRET", "s3cret"),
            ("PORT", "eighty"),
        ]));
        assert!(matches!(result, Err(FinanceError::Configuration(_))));
    }
}
