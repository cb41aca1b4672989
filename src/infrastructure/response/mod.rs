use serde_json::{Map, Value};

/// Server `detail` carried by an error response body, if any.
///
/// A string `detail` is returned exactly as sent. A list of validation
/// errors is reduced to its `msg` fields joined with `; `. Other fields of
/// the body are ignored, so callers fall back to their own message.
pub fn extract_detail(body: &str) -> Option<String> {
    let json: Value = serde_json::from_str(body.trim()).ok()?;
    detail_of(json.as_object()?)
}

/// Message of a failed function invocation: the `detail`, else the
/// function's `error` (a string or an object with `message`), else a
/// top-level `message`.
pub fn extract_function_error(body: &str) -> Option<String> {
    let json: Value = serde_json::from_str(body.trim()).ok()?;
    let object = json.as_object()?;

    detail_of(object)
        .or_else(|| match object.get("error") {
            Some(Value::String(error)) => Some(error.clone()),
            Some(Value::Object(error)) => string_field(error, "message"),
            _ => None,
        })
        .or_else(|| string_field(object, "message"))
        .filter(|message| !message.trim().is_empty())
}

fn detail_of(object: &Map<String, Value>) -> Option<String> {
    match object.get("detail")? {
        Value::String(detail) if !detail.trim().is_empty() => Some(detail.clone()),
        Value::Array(items) => {
            let messages: Vec<&str> = items
                .iter()
                .filter_map(|item| match item {
                    Value::String(msg) => Some(msg.as_str()),
                    Value::Object(fields) => fields.get("msg").and_then(Value::as_str),
                    _ => None,
                })
                .filter(|msg| !msg.trim().is_empty())
                .collect();
            (!messages.is_empty()).then(|| messages.join("; "))
        }
        _ => None,
    }
}

fn string_field(object: &Map<String, Value>, key: &str) -> Option<String> {
    object.get(key).and_then(Value::as_str).map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_string_detail() {
        assert_eq!(
            extract_detail(r#"{"detail": "Invalid credentials"}"#).as_deref(),
            Some("Invalid credentials")
        );
    }

    #[test]
    fn test_detail_is_returned_verbatim() {
        assert_eq!(
            extract_detail(r#"{"detail": "Line one\n  Line  two "}"#).as_deref(),
            Some("Line one\n  Line  two ")
        );
        assert_eq!(extract_detail(r#"{"detail": "   "}"#), None);
    }

    #[test]
    fn test_extract_validation_list() {
        let body = serde_json::json!({
            "detail": [
                {"loc": ["body", "title"], "msg": "field required", "type": "value_error.missing"},
                {"msg": "title too short"}
            ]
        })
        .to_string();
        assert_eq!(
            extract_detail(&body).as_deref(),
            Some("field required; title too short")
        );
    }

    #[test]
    fn test_rest_errors_ignore_error_and_message_fields() {
        assert_eq!(extract_detail(r#"{"error": "Function not found"}"#), None);
        assert_eq!(extract_detail(r#"{"message": "boom"}"#), None);
    }

    #[test]
    fn test_function_error_fields() {
        assert_eq!(
            extract_function_error(r#"{"error": "Browser crashed"}"#).as_deref(),
            Some("Browser crashed")
        );
        assert_eq!(
            extract_function_error(r#"{"error": {"message": "Quota exceeded"}}"#).as_deref(),
            Some("Quota exceeded")
        );
        assert_eq!(
            extract_function_error(r#"{"detail": "Bad input", "error": "ignored"}"#).as_deref(),
            Some("Bad input")
        );
        assert_eq!(
            extract_function_error(r#"{"message": "rate limited"}"#).as_deref(),
            Some("rate limited")
        );
    }

    #[test]
    fn test_unparseable_or_empty_bodies() {
        assert_eq!(extract_detail("<html>502 Bad Gateway</html>"), None);
        assert_eq!(extract_detail(""), None);
        assert_eq!(extract_detail(r#"["detail"]"#), None);
        assert_eq!(extract_detail(r#"{"detail": ""}"#), None);
        assert_eq!(extract_detail(r#"{"detail": 42}"#), None);
        assert_eq!(extract_function_error("upstream timeout"), None);
    }
}
