use std::env;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Seconds a presigned citation URL stays valid.
pub const SIGNED_URL_EXPIRY_SECS: i64 = 360;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variables: {}", .0.join(", "))]
    MissingEnv(Vec<String>),
    #[error("invalid value for {key}: {value}")]
    Invalid { key: String, value: String },
}

/// Connection settings for the warehouse session. All of these are required
/// and carry no defaults; credentials only ever come from the environment.
#[derive(Debug, Clone)]
pub struct WarehouseConfig {
    pub account: String,
    pub user: String,
    pub password: String,
    pub role: String,
    pub compute: String,
    pub database: String,
    pub schema: String,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub warehouse: WarehouseConfig,
    /// Chunks fetched per retrieval call.
    pub top_k: usize,
    /// Transcript turns folded into the rewrite prompt.
    pub slide_window: usize,
    /// Deadline applied to every warehouse round trip.
    pub request_timeout: Duration,
    pub chunk_table: String,
    pub stage: String,
    pub embedding_function: String,
    pub embedding_model: String,
    pub completion_function: String,
    /// Model identifiers the ask endpoint accepts.
    pub models: Vec<String>,
    /// Model answering when the request names none.
    pub default_model: String,
    /// Fixed model used for the history-aware query rewrite.
    pub rewrite_model: String,
    /// Stateless per-question mode: history is neither read nor written.
    pub single_shot: bool,
    pub log_dir: PathBuf,
}

const REQUIRED_KEYS: [&str; 7] = [
    "WAREHOUSE_ACCOUNT",
    "WAREHOUSE_USER",
    "WAREHOUSE_PASSWORD",
    "WAREHOUSE_ROLE",
    "WAREHOUSE_COMPUTE",
    "WAREHOUSE_DATABASE",
    "WAREHOUSE_SCHEMA",
];

fn default_models() -> Vec<String> {
    [
        "mixtral-8x7b",
        "snowflake-arctic",
        "mistral-large",
        "llama3-8b",
        "llama3-70b",
        "reka-flash",
        "mistral-7b",
        "llama2-70b-chat",
        "gemma-7b",
    ]
    .into_iter()
    .map(str::to_string)
    .collect()
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from an arbitrary key lookup so tests never have to
    /// mutate process-wide environment state.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut missing = Vec::new();
        let mut required = |key: &str| -> String {
            match lookup(key).filter(|v| !v.trim().is_empty()) {
                Some(value) => value,
                None => {
                    missing.push(key.to_string());
                    String::new()
                }
            }
        };

        let warehouse = WarehouseConfig {
            account: required(REQUIRED_KEYS[0]),
            user: required(REQUIRED_KEYS[1]),
            password: required(REQUIRED_KEYS[2]),
            role: required(REQUIRED_KEYS[3]),
            compute: required(REQUIRED_KEYS[4]),
            database: required(REQUIRED_KEYS[5]),
            schema: required(REQUIRED_KEYS[6]),
        };

        if !missing.is_empty() {
            return Err(ConfigError::MissingEnv(missing));
        }

        let top_k = parse_or(&lookup, "MALLARD_TOP_K", 3)?;
        if top_k == 0 {
            return Err(ConfigError::Invalid {
                key: "MALLARD_TOP_K".to_string(),
                value: "0".to_string(),
            });
        }
        let slide_window = parse_or(&lookup, "MALLARD_SLIDE_WINDOW", 7)?;
        let timeout_secs: u64 = parse_or(&lookup, "MALLARD_REQUEST_TIMEOUT_SECS", 60)?;

        let models = match lookup("MALLARD_MODELS") {
            Some(raw) => raw
                .split(',')
                .map(|m| m.trim().to_string())
                .filter(|m| !m.is_empty())
                .collect(),
            None => default_models(),
        };
        let default_model = lookup("MALLARD_DEFAULT_MODEL")
            .unwrap_or_else(|| "mixtral-8x7b".to_string());
        let rewrite_model = lookup("MALLARD_REWRITE_MODEL")
            .unwrap_or_else(|| "mixtral-8x7b".to_string());

        Ok(Self {
            warehouse,
            top_k,
            slide_window,
            request_timeout: Duration::from_secs(timeout_secs),
            chunk_table: lookup("MALLARD_CHUNK_TABLE")
                .unwrap_or_else(|| "docs_chunks_table".to_string()),
            stage: lookup("MALLARD_STAGE").unwrap_or_else(|| "docs".to_string()),
            embedding_function: lookup("MALLARD_EMBEDDING_FUNCTION")
                .unwrap_or_else(|| "SNOWFLAKE.CORTEX.EMBED_TEXT_768".to_string()),
            embedding_model: lookup("MALLARD_EMBEDDING_MODEL")
                .unwrap_or_else(|| "e5-base-v2".to_string()),
            completion_function: lookup("MALLARD_COMPLETION_FUNCTION")
                .unwrap_or_else(|| "SNOWFLAKE.CORTEX.COMPLETE".to_string()),
            models,
            default_model,
            rewrite_model,
            single_shot: lookup("MALLARD_SINGLE_SHOT")
                .map(|v| matches!(v.trim(), "1" | "true" | "yes"))
                .unwrap_or(false),
            log_dir: lookup("MALLARD_LOG_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("logs")),
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, fallback: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(key) {
        Some(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid {
            key: key.to_string(),
            value: raw,
        }),
        None => Ok(fallback),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn full_env() -> HashMap<String, String> {
        REQUIRED_KEYS
            .iter()
            .map(|k| (k.to_string(), format!("{}-value", k.to_lowercase())))
            .collect()
    }

    #[test]
    fn missing_variables_are_all_reported() {
        let err = AppConfig::from_lookup(|_| None).unwrap_err();
        match err {
            ConfigError::MissingEnv(keys) => {
                assert_eq!(keys.len(), REQUIRED_KEYS.len());
                assert!(keys.contains(&"WAREHOUSE_PASSWORD".to_string()));
            }
            other => panic!("expected MissingEnv, got {other:?}"),
        }
    }

    #[test]
    fn blank_value_counts_as_missing() {
        let mut env = full_env();
        env.insert("WAREHOUSE_ROLE".to_string(), "   ".to_string());
        let err = AppConfig::from_lookup(|k| env.get(k).cloned()).unwrap_err();
        match err {
            ConfigError::MissingEnv(keys) => assert_eq!(keys, vec!["WAREHOUSE_ROLE"]),
            other => panic!("expected MissingEnv, got {other:?}"),
        }
    }

    #[test]
    fn defaults_apply_when_only_connection_is_set() {
        let env = full_env();
        let config = AppConfig::from_lookup(|k| env.get(k).cloned()).unwrap();
        assert_eq!(config.top_k, 3);
        assert_eq!(config.slide_window, 7);
        assert_eq!(config.request_timeout, Duration::from_secs(60));
        assert_eq!(config.chunk_table, "docs_chunks_table");
        assert_eq!(config.embedding_model, "e5-base-v2");
        assert!(config.models.contains(&"llama3-70b".to_string()));
        assert!(!config.single_shot);
    }

    #[test]
    fn model_list_override_is_parsed() {
        let mut env = full_env();
        env.insert(
            "MALLARD_MODELS".to_string(),
            "mistral-large, llama3-8b".to_string(),
        );
        env.insert("MALLARD_SINGLE_SHOT".to_string(), "true".to_string());
        let config = AppConfig::from_lookup(|k| env.get(k).cloned()).unwrap();
        assert_eq!(config.models, vec!["mistral-large", "llama3-8b"]);
        assert!(config.single_shot);
    }

    #[test]
    fn zero_top_k_is_rejected() {
        let mut env = full_env();
        env.insert("MALLARD_TOP_K".to_string(), "0".to_string());
        assert!(AppConfig::from_lookup(|k| env.get(k).cloned()).is_err());
    }
}
