use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_json::{json, Map, Value};

use super::paths::AppPaths;
use super::settings::AppConfig;
use super::validation::validate_config;
use crate::core::errors::ApiError;

const REDACT_PLACEHOLDER: &str = "****";

const SENSITIVE_PATTERNS: [&str; 10] = [
    "api_key",
    "secret",
    "password",
    "_token",
    "token_",
    "credential",
    "private_key",
    "auth_",
    "access_key",
    "bearer",
];

const SENSITIVE_WHITELIST: [&str; 3] = ["max_tokens", "tokens", "tokenizer"];

/// Environment variables recognized as overrides, mapped to their config path.
const ENV_OVERRIDES: [(&str, &[&str]); 10] = [
    ("PAGECHAT_HOST", &["server", "host"]),
    ("PORT", &["server", "port"]),
    ("PAGECHAT_LLM_PROVIDER", &["llm", "provider"]),
    ("PAGECHAT_LLM_BASE_URL", &["llm", "base_url"]),
    ("PAGECHAT_MODEL", &["llm", "model"]),
    ("PAGECHAT_API_KEY", &["llm", "api_key"]),
    ("PAGECHAT_EMBEDDING_PROVIDER", &["embeddings", "provider"]),
    ("PAGECHAT_EMBEDDING_BASE_URL", &["embeddings", "base_url"]),
    ("PAGECHAT_EMBEDDING_MODEL", &["embeddings", "model"]),
    ("PAGECHAT_EMBEDDING_API_KEY", &["embeddings", "api_key"]),
];

#[derive(Clone)]
pub struct ConfigService {
    paths: Arc<AppPaths>,
}

impl ConfigService {
    pub fn new(paths: Arc<AppPaths>) -> Self {
        Self { paths }
    }

    pub fn paths(&self) -> &AppPaths {
        &self.paths
    }

    /// Loads `.env` into the process environment, overriding existing values.
    pub fn load_dotenv() {
        match dotenvy::dotenv_override() {
            Ok(path) => tracing::debug!("Loaded environment from {}", path.display()),
            Err(err) if err.not_found() => {}
            Err(err) => tracing::warn!("Failed to load .env: {}", err),
        }
    }

    pub fn config_path(&self) -> PathBuf {
        if let Ok(path) = env::var("PAGECHAT_CONFIG_PATH") {
            return PathBuf::from(path);
        }

        let user_config = self.paths.user_data_dir.join("config.yml");
        if user_config.exists() {
            return user_config;
        }

        self.paths.project_root.join("config.yml")
    }

    /// File config with environment overrides applied, before validation.
    pub fn load_raw(&self) -> Value {
        let file_config = load_yaml_file(&self.config_path());
        let overrides = env_overrides(|key| env::var(key).ok());
        deep_merge(&file_config, &overrides)
    }

    pub fn load_config(&self) -> Result<AppConfig, ApiError> {
        parse_config(&self.load_raw())
    }

    pub fn redact_sensitive_values(&self, value: &Value) -> Value {
        redact_sensitive_values(value)
    }
}

pub fn parse_config(raw: &Value) -> Result<AppConfig, ApiError> {
    validate_config(raw)?;
    serde_json::from_value(raw.clone())
        .map_err(|e| ApiError::BadRequest(format!("Invalid configuration: {}", e)))
}

fn load_yaml_file(path: &Path) -> Value {
    if !path.exists() {
        return Value::Object(Map::new());
    }

    match fs::read_to_string(path) {
        Ok(contents) => match serde_yaml::from_str::<Value>(&contents) {
            Ok(value) => match value {
                Value::Object(_) => value,
                _ => Value::Object(Map::new()),
            },
            Err(err) => {
                tracing::warn!("Ignoring unparsable config {}: {}", path.display(), err);
                Value::Object(Map::new())
            }
        },
        Err(_) => Value::Object(Map::new()),
    }
}

fn env_overrides<F>(lookup: F) -> Value
where
    F: Fn(&str) -> Option<String>,
{
    let mut root = Value::Object(Map::new());
    for (key, path) in ENV_OVERRIDES {
        let Some(raw) = lookup(key) else {
            continue;
        };
        let raw = raw.trim();
        if raw.is_empty() {
            continue;
        }
        let value = match path {
            ["server", "port"] => match raw.parse::<u64>() {
                Ok(port) => json!(port),
                Err(_) => json!(raw),
            },
            _ => json!(raw),
        };
        insert_path(&mut root, path, value);
    }
    root
}

fn insert_path(root: &mut Value, path: &[&str], value: Value) {
    let Some((last, parents)) = path.split_last() else {
        return;
    };
    let mut cursor = root;
    for segment in parents {
        if !cursor.get(*segment).is_some_and(Value::is_object) {
            if let Some(map) = cursor.as_object_mut() {
                map.insert(segment.to_string(), Value::Object(Map::new()));
            }
        }
        cursor = match cursor.get_mut(*segment) {
            Some(next) => next,
            None => return,
        };
    }
    if let Some(map) = cursor.as_object_mut() {
        map.insert(last.to_string(), value);
    }
}

fn deep_merge(base: &Value, override_value: &Value) -> Value {
    match (base, override_value) {
        (Value::Object(base_map), Value::Object(override_map)) => {
            let mut merged: Map<String, Value> = base_map.clone();
            for (key, value) in override_map {
                let merged_value = match merged.get(key) {
                    Some(existing) => deep_merge(existing, value),
                    None => value.clone(),
                };
                merged.insert(key.clone(), merged_value);
            }
            Value::Object(merged)
        }
        _ => override_value.clone(),
    }
}

fn redact_sensitive_values(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut redacted = Map::new();
            for (key, val) in map {
                if is_sensitive_key(key) && !val.is_null() {
                    redacted.insert(key.clone(), Value::String(REDACT_PLACEHOLDER.to_string()));
                } else {
                    redacted.insert(key.clone(), redact_sensitive_values(val));
                }
            }
            Value::Object(redacted)
        }
        Value::Array(items) => Value::Array(items.iter().map(redact_sensitive_values).collect()),
        _ => value.clone(),
    }
}

fn is_sensitive_key(key: &str) -> bool {
    let key_lower = key.to_lowercase();
    if SENSITIVE_WHITELIST
        .iter()
        .any(|allowed| *allowed == key_lower)
    {
        return false;
    }
    SENSITIVE_PATTERNS
        .iter()
        .any(|pattern| key_lower.contains(pattern))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::settings::ProviderKind;
    use std::collections::HashMap;

    #[test]
    fn deep_merge_merges_objects_and_overrides_scalars() {
        let base = json!({
            "llm": { "model": "orca-mini", "temperature": 0.2 },
            "server": { "port": 8000 }
        });
        let override_value = json!({
            "llm": { "model": "llama3" },
            "retry": { "delay_secs": 5 }
        });

        let merged = deep_merge(&base, &override_value);

        assert_eq!(
            merged,
            json!({
                "llm": { "model": "llama3", "temperature": 0.2 },
                "server": { "port": 8000 },
                "retry": { "delay_secs": 5 }
            })
        );
    }

    #[test]
    fn env_overrides_build_nested_tree() {
        let vars: HashMap<&str, &str> = HashMap::from([
            ("PAGECHAT_MODEL", "codestral-2405"),
            ("PAGECHAT_LLM_PROVIDER", "openai"),
            ("PORT", "9001"),
            ("PAGECHAT_EMBEDDING_MODEL", "  "),
        ]);

        let overrides = env_overrides(|key| vars.get(key).map(|v| v.to_string()));

        assert_eq!(
            overrides,
            json!({
                "llm": { "model": "codestral-2405", "provider": "openai" },
                "server": { "port": 9001 }
            })
        );
    }

    #[test]
    fn yaml_file_is_parsed_and_typed() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.yml");
        fs::write(
            &path,
            "llm:\n  provider: openai\n  base_url: https://api.mistral.ai\n  model: codestral-2405\nretrieval:\n  top_k: 2\n",
        )
        .expect("write config");

        let raw = load_yaml_file(&path);
        let config = parse_config(&raw).expect("valid config");

        assert_eq!(config.llm.provider, ProviderKind::OpenAi);
        assert_eq!(config.llm.resolved_base_url(), "https://api.mistral.ai");
        assert_eq!(config.retrieval.top_k, 2);
        assert_eq!(config.embeddings.model, "orca-mini");
    }

    #[test]
    fn non_object_yaml_falls_back_to_empty() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.yml");
        fs::write(&path, "- just\n- a list\n").expect("write config");

        assert_eq!(load_yaml_file(&path), json!({}));
        assert_eq!(load_yaml_file(&dir.path().join("missing.yml")), json!({}));
    }

    #[test]
    fn redact_sensitive_values_replaces_secrets_only() {
        let input = json!({
            "llm": { "api_key": "sk-123", "model": "orca-mini" },
            "embeddings": { "api_key": null }
        });

        let redacted = redact_sensitive_values(&input);

        assert_eq!(
            redacted,
            json!({
                "llm": { "api_key": "****", "model": "orca-mini" },
                "embeddings": { "api_key": null }
            })
        );
    }
}
