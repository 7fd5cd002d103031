//! Best-effort reader for the Server-Sent-Events body returned by the result
//! endpoint. Only `data:` lines are looked at; event types, ids and retries
//! are ignored.

use serde_json::Value;

use crate::error::PredictionError;

const DATA_PREFIX: &str = "data: ";

/// Returns the first element of the first `data:` line that holds valid JSON.
/// Non-array payloads are returned whole.
pub fn extract_payload(sse_text: &str) -> Result<Value, PredictionError> {
    for line in sse_text.lines() {
        let Some(json_text) = line.strip_prefix(DATA_PREFIX) else {
            continue;
        };

        let parsed: Value = match serde_json::from_str(json_text) {
            Ok(value) => value,
            Err(err) => {
                tracing::debug!(error = %err, "skipping unparseable SSE data line");
                continue;
            }
        };

        return Ok(match parsed {
            Value::Array(mut items) if !items.is_empty() => items.swap_remove(0),
            other => other,
        });
    }

    Err(PredictionError::NoSseData)
}

/// Like [`extract_payload`], but insists on the HTML string the model emits.
pub fn extract_html(sse_text: &str) -> Result<String, PredictionError> {
    match extract_payload(sse_text)? {
        Value::String(html) => Ok(html),
        Value::Null => Err(PredictionError::Parse(
            "prediction service returned an empty result".to_string(),
        )),
        other => Err(PredictionError::Parse(format!(
            "expected an HTML fragment, got {}",
            json_kind(&other)
        ))),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn returns_first_array_element_of_complete_event() {
        let body = "event: generating\ndata: not-json\n\nevent: complete\ndata: [\"<div>ok</div>\", 3]\n\n";
        assert_eq!(extract_html(body).unwrap(), "<div>ok</div>");
    }

    #[test]
    fn tolerates_crlf_line_endings() {
        let body = "event: complete\r\ndata: [\"<p>hi</p>\"]\r\n\r\n";
        assert_eq!(extract_html(body).unwrap(), "<p>hi</p>");
    }

    #[test]
    fn returns_non_array_payload_whole() {
        let body = "data: {\"msg\": \"done\"}\n";
        let payload = extract_payload(body).unwrap();
        assert_eq!(payload["msg"], "done");
    }

    #[test]
    fn fails_when_no_line_parses() {
        let body = "event: heartbeat\ndata: \ndata: {broken\n";
        assert!(matches!(
            extract_payload(body),
            Err(PredictionError::NoSseData)
        ));
        assert!(matches!(extract_payload(""), Err(PredictionError::NoSseData)));
    }

    #[test]
    fn error_events_surface_as_parse_errors() {
        let body = "event: error\ndata: null\n\n";
        assert!(matches!(extract_html(body), Err(PredictionError::Parse(_))));
    }
}
