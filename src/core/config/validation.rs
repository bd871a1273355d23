use serde_json::{Map, Value};

use crate::core::errors::ApiError;

const KNOWN_PROVIDERS: [&str; 5] = ["ollama", "openai", "openai_compatible", "mistral", "lmstudio"];
const KNOWN_BACKOFFS: [&str; 2] = ["fixed", "exponential"];

pub fn validate_config(config: &Value) -> Result<(), ApiError> {
    let root = config
        .as_object()
        .ok_or_else(|| config_type_error("root", "object"))?;

    if let Some(server) = expect_optional_object(root, "server")? {
        validate_optional_string_field(server, "server.host", "host")?;
        validate_u64_field(server, "server.port", "port", 0, 65535)?;
        validate_string_array_field(
            server,
            "server.cors_allowed_origins",
            "cors_allowed_origins",
        )?;
    }

    for section_name in ["llm", "embeddings"] {
        if let Some(section) = expect_optional_object(root, section_name)? {
            validate_endpoint_section(section, section_name)?;
        }
    }

    if let Some(chunking) = expect_optional_object(root, "chunking")? {
        validate_u64_field(chunking, "chunking.chunk_size", "chunk_size", 1, 1_000_000)?;
        validate_u64_field(
            chunking,
            "chunking.chunk_overlap",
            "chunk_overlap",
            0,
            1_000_000,
        )?;
        let size = chunking
            .get("chunk_size")
            .and_then(Value::as_u64)
            .unwrap_or(500);
        let overlap = chunking
            .get("chunk_overlap")
            .and_then(Value::as_u64)
            .unwrap_or(0);
        if overlap >= size {
            return Err(ApiError::BadRequest(format!(
                "Invalid config at 'chunking.chunk_overlap': must be smaller than chunk_size ({})",
                size
            )));
        }
    }

    if let Some(retrieval) = expect_optional_object(root, "retrieval")? {
        validate_u64_field(retrieval, "retrieval.top_k", "top_k", 1, 1_000)?;
        validate_bool_field(
            retrieval,
            "retrieval.partition_by_session",
            "partition_by_session",
        )?;
        validate_u64_field(
            retrieval,
            "retrieval.max_context_chars",
            "max_context_chars",
            1,
            10_000_000,
        )?;
        validate_bool_field(retrieval, "retrieval.include_citations", "include_citations")?;
    }

    if let Some(retry) = expect_optional_object(root, "retry")? {
        validate_u64_field(retry, "retry.max_attempts", "max_attempts", 1, 100)?;
        validate_u64_field(retry, "retry.delay_secs", "delay_secs", 0, 86_400)?;
        validate_u64_field(retry, "retry.max_delay_secs", "max_delay_secs", 0, 86_400)?;
        validate_enum_field(retry, "retry.backoff", "backoff", &KNOWN_BACKOFFS)?;
    }

    if let Some(history) = expect_optional_object(root, "chat_history")? {
        validate_u64_field(history, "chat_history.window", "window", 0, 100_000)?;
    }

    if let Some(prompts) = expect_optional_object(root, "prompts")? {
        for (prompt_name, value) in prompts {
            let path_prefix = format!("prompts.{}", prompt_name);
            let entry = value
                .as_object()
                .ok_or_else(|| config_type_error(&path_prefix, "object"))?;
            for (field, field_value) in entry {
                if field_value.as_str().is_none() {
                    return Err(config_type_error(
                        &format!("{}.{}", path_prefix, field),
                        "string",
                    ));
                }
            }
        }
    }

    Ok(())
}

fn validate_endpoint_section(section: &Map<String, Value>, name: &str) -> Result<(), ApiError> {
    validate_enum_field(section, &format!("{}.provider", name), "provider", &KNOWN_PROVIDERS)?;
    validate_optional_string_field(section, &format!("{}.base_url", name), "base_url")?;
    validate_optional_string_field(section, &format!("{}.api_key", name), "api_key")?;
    if section.contains_key("model") {
        validate_required_string_field(section, &format!("{}.model", name), "model")?;
    }
    validate_u64_field(
        section,
        &format!("{}.request_timeout_secs", name),
        "request_timeout_secs",
        1,
        86_400,
    )?;
    if section.get("max_tokens").is_some_and(|value| !value.is_null()) {
        validate_u64_field(section, &format!("{}.max_tokens", name), "max_tokens", 1, 1_000_000)?;
    }
    if let Some(value) = section.get("temperature") {
        if !value.is_null() {
            let Some(temperature) = value.as_f64() else {
                return Err(config_type_error(&format!("{}.temperature", name), "number"));
            };
            if !(0.0..=2.0).contains(&temperature) {
                return Err(ApiError::BadRequest(format!(
                    "Invalid config at '{}.temperature': must be between 0 and 2",
                    name
                )));
            }
        }
    }
    Ok(())
}

fn expect_optional_object<'a>(
    root: &'a Map<String, Value>,
    key: &str,
) -> Result<Option<&'a Map<String, Value>>, ApiError> {
    match root.get(key) {
        Some(Value::Object(map)) => Ok(Some(map)),
        Some(_) => Err(config_type_error(key, "object")),
        None => Ok(None),
    }
}

fn validate_bool_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
) -> Result<(), ApiError> {
    let Some(value) = section.get(key) else {
        return Ok(());
    };
    if value.as_bool().is_some() {
        return Ok(());
    }
    Err(config_type_error(path, "boolean"))
}

fn validate_u64_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
    min: u64,
    max: u64,
) -> Result<(), ApiError> {
    let Some(value) = section.get(key) else {
        return Ok(());
    };
    let Some(number) = value.as_u64() else {
        return Err(config_type_error(path, "integer"));
    };
    if number < min || number > max {
        return Err(ApiError::BadRequest(format!(
            "Invalid config at '{}': must be between {} and {}",
            path, min, max
        )));
    }
    Ok(())
}

fn validate_enum_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
    allowed: &[&str],
) -> Result<(), ApiError> {
    let Some(value) = section.get(key) else {
        return Ok(());
    };
    let Some(text) = value.as_str() else {
        return Err(config_type_error(path, "string"));
    };
    if !allowed.contains(&text.trim().to_lowercase().as_str()) {
        return Err(ApiError::BadRequest(format!(
            "Invalid config at '{}': expected one of {}",
            path,
            allowed.join(", ")
        )));
    }
    Ok(())
}

fn validate_required_string_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
) -> Result<(), ApiError> {
    let value = section.get(key).ok_or_else(|| {
        ApiError::BadRequest(format!("Invalid config at '{}': value is required", path))
    })?;
    let Some(text) = value.as_str() else {
        return Err(config_type_error(path, "string"));
    };
    if text.trim().is_empty() {
        return Err(ApiError::BadRequest(format!(
            "Invalid config at '{}': value cannot be empty",
            path
        )));
    }
    Ok(())
}

fn validate_optional_string_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
) -> Result<(), ApiError> {
    let Some(value) = section.get(key) else {
        return Ok(());
    };
    if value.is_null() || value.as_str().is_some() {
        return Ok(());
    }
    Err(config_type_error(path, "string"))
}

fn validate_string_array_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
) -> Result<(), ApiError> {
    let Some(value) = section.get(key) else {
        return Ok(());
    };
    let Some(items) = value.as_array() else {
        return Err(config_type_error(path, "array of strings"));
    };
    for (index, item) in items.iter().enumerate() {
        let Some(text) = item.as_str() else {
            return Err(config_type_error(&format!("{}[{}]", path, index), "string"));
        };
        if text.trim().is_empty() {
            return Err(ApiError::BadRequest(format!(
                "Invalid config at '{}[{}]': value cannot be empty",
                path, index
            )));
        }
    }
    Ok(())
}

fn config_type_error(path: &str, expected: &str) -> ApiError {
    ApiError::BadRequest(format!(
        "Invalid config at '{}': expected {}",
        path, expected
    ))
}
