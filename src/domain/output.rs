//! Captured result of one command execution.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::error::{DaneelError, Result};

/// A structured payload is always a JSON object.
pub type StructuredPayload = Map<String, Value>;

/// Standard output, standard error and an optional structured payload of a
/// finished command.
///
/// The record is immutable once built; the streams are text by construction
/// and the payload type only admits JSON objects.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Output {
    stdout: String,
    stderr: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    structured: Option<StructuredPayload>,
}

impl Output {
    pub fn new(stdout: impl Into<String>, stderr: impl Into<String>) -> Self {
        Self {
            stdout: stdout.into(),
            stderr: stderr.into(),
            structured: None,
        }
    }

    pub fn with_structured(mut self, payload: StructuredPayload) -> Self {
        self.structured = Some(payload);
        self
    }

    /// Parse `stdout` as a JSON object and attach it as the structured payload.
    pub fn parse_structured(self) -> Result<Self> {
        let value: Value =
            serde_json::from_str(self.stdout.trim()).map_err(|e| DaneelError::Decode {
                message: e.to_string(),
                stdout: self.stdout.clone(),
            })?;

        match value {
            Value::Object(map) => Ok(self.with_structured(map)),
            other => Err(DaneelError::Decode {
                message: format!("expected a JSON object, got {}", json_kind(&other)),
                stdout: self.stdout,
            }),
        }
    }

    pub fn stdout(&self) -> &str {
        &self.stdout
    }

    pub fn stderr(&self) -> &str {
        &self.stderr
    }

    pub fn structured(&self) -> Option<&StructuredPayload> {
        self.structured.as_ref()
    }

    /// Both streams joined, stdout first. Used when feeding a failure back to
    /// an assistant.
    pub fn combined(&self) -> String {
        match (self.stdout.is_empty(), self.stderr.is_empty()) {
            (_, true) => self.stdout.clone(),
            (true, false) => self.stderr.clone(),
            (false, false) => format!("{}\n{}", self.stdout.trim_end(), self.stderr),
        }
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
    fn new_output_has_no_payload() {
        let output = Output::new("hello", "");
        assert_eq!(output.stdout(), "hello");
        assert_eq!(output.stderr(), "");
        assert!(output.structured().is_none());
    }

    #[test]
    fn parse_structured_accepts_objects() {
        let output = Output::new(r#"{"result": "success", "data": [1, 2, 3]}"#, "")
            .parse_structured()
            .expect("object payload");
        let payload = output.structured().expect("payload");
        assert_eq!(payload["result"], "success");
        assert_eq!(payload["data"], serde_json::json!([1, 2, 3]));
    }

    #[test]
    fn parse_structured_rejects_invalid_json() {
        let err = Output::new("invalid json {", "").parse_structured().unwrap_err();
        assert!(matches!(err, DaneelError::Decode { .. }));
        assert!(err.to_string().contains("Failed to parse JSON output"));
    }

    #[test]
    fn parse_structured_rejects_non_objects() {
        let err = Output::new("[1, 2]", "").parse_structured().unwrap_err();
        assert!(err.to_string().contains("expected a JSON object, got an array"));
    }

    #[test]
    fn combined_joins_streams() {
        assert_eq!(Output::new("out\n", "err").combined(), "out\nerr");
        assert_eq!(Output::new("", "err").combined(), "err");
        assert_eq!(Output::new("out", "").combined(), "out");
    }
}
