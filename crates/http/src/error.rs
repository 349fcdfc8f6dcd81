use serde_json::Value;

/// Picks the most useful message out of an error response body.
///
/// Structured bodies are tried first (`error`, `error.message`, `message`,
/// `detail`), then the raw text, then a message derived from the status.
pub fn extract_error_message(status: u16, body: &str) -> String {
    let structured = serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|value| structured_message(&value));
    if let Some(message) = structured {
        return message;
    }

    let text = body.trim();
    if !text.is_empty() {
        return text.to_owned();
    }
    format!("request failed with status {status}")
}

fn structured_message(value: &Value) -> Option<String> {
    let candidates = [
        value.get("error").and_then(Value::as_str),
        value.pointer("/error/message").and_then(Value::as_str),
        value.get("message").and_then(Value::as_str),
        value.get("detail").and_then(Value::as_str),
    ];
    candidates
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|s| !s.is_empty())
        .map(ToOwned::to_owned)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_structured_bodies() {
        assert_eq!(
            extract_error_message(429, r#"{"error": "rate limited"}"#),
            "rate limited"
        );
        assert_eq!(
            extract_error_message(500, r#"{"error": {"message": "boom"}}"#),
            "boom"
        );
        assert_eq!(
            extract_error_message(400, r#"{"message": "bad query"}"#),
            "bad query"
        );
        assert_eq!(
            extract_error_message(422, r#"{"detail": "missing field"}"#),
            "missing field"
        );
    }

    #[test]
    fn test_fallbacks() {
        assert_eq!(
            extract_error_message(502, "  upstream unavailable\n"),
            "upstream unavailable"
        );
        assert_eq!(
            extract_error_message(500, r#"{"code": 17}"#),
            r#"{"code": 17}"#
        );
        assert_eq!(
            extract_error_message(503, ""),
            "request failed with status 503"
        );
    }
}
