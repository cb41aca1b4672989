use serde_json::Value as JsonValue;
use std::collections::BTreeMap;

use crate::domain::error::{AppError, Result};
use crate::domain::execution::ApiTestConfig;

/// Reads the headers box: a JSON object, or one `Key: value` pair per line.
///
/// Lines without a key or a value are skipped. Non-string JSON values are
/// kept in their JSON text form.
pub fn parse_headers_input(input: &str) -> BTreeMap<String, String> {
    let input = input.trim();
    if input.is_empty() {
        return BTreeMap::new();
    }

    if let Ok(JsonValue::Object(map)) = serde_json::from_str::<JsonValue>(input) {
        return map
            .into_iter()
            .map(|(key, value)| {
                let value = match value {
                    JsonValue::String(text) => text,
                    other => other.to_string(),
                };
                (key, value)
            })
            .collect();
    }

    input
        .lines()
        .filter_map(|line| {
            let (key, value) = line.split_once(':')?;
            let (key, value) = (key.trim(), value.trim());
            (!key.is_empty() && !value.is_empty()).then(|| (key.to_string(), value.to_string()))
        })
        .collect()
}

/// Reads the body box: JSON when it parses, the raw text otherwise.
/// GET requests never carry a body.
pub fn parse_body_input(method: &str, input: &str) -> Option<JsonValue> {
    let trimmed = input.trim();
    if trimmed.is_empty() || method.trim().eq_ignore_ascii_case("GET") {
        return None;
    }
    Some(serde_json::from_str(trimmed).unwrap_or_else(|_| JsonValue::String(input.to_string())))
}

/// Assembles an API test from the raw form fields.
pub fn build_api_test_config(
    endpoint: &str,
    method: &str,
    headers_input: &str,
    body_input: &str,
    expected_status: u16,
    expected_response_input: &str,
) -> Result<ApiTestConfig> {
    let endpoint = endpoint.trim();
    if endpoint.is_empty() {
        return Err(AppError::ValidationError("An API endpoint is required".to_string()));
    }
    let method = match method.trim() {
        "" => "GET".to_string(),
        other => other.to_uppercase(),
    };

    let expected_response = match expected_response_input.trim() {
        "" => None,
        text => Some(serde_json::from_str(text).map_err(|e| {
            AppError::ValidationError(format!("Expected response must be valid JSON: {}", e))
        })?),
    };

    Ok(ApiTestConfig {
        endpoint: endpoint.to_string(),
        body: parse_body_input(&method, body_input),
        method,
        headers: parse_headers_input(headers_input),
        expected_status,
        expected_response,
    })
}
