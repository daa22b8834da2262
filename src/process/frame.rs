//! IPC framing between supervisor and worker processes.
//!
//! Frames are JSON-serialized and newline-delimited.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One line on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Frame {
    /// Worker booted and is ready for messages.
    Online,
    /// Application message.
    Message {
        /// Message body.
        payload: Value,
    },
}

impl Frame {
    /// Wraps a message.
    pub fn message(payload: Value) -> Self {
        Self::Message { payload }
    }

    /// Serialize to a JSON line (with newline).
    pub fn to_line(&self) -> Result<String, serde_json::Error> {
        let mut json = serde_json::to_string(self)?;
        json.push('\n');
        Ok(json)
    }

    /// Deserialize from a JSON line.
    pub fn from_line(line: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(line.trim())
    }

    /// Parses a line, treating anything that is not a frame as a plain string message.
    ///
    /// Stray output from a worker (a library printing to stdout) therefore reaches
    /// the generic handler instead of being lost.
    pub fn from_line_lossy(line: &str) -> Self {
        Self::from_line(line).unwrap_or_else(|_| Self::message(Value::String(line.to_string())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_message_line_shape() {
        let line = Frame::message(json!({"ping": 42})).to_line().unwrap();
        assert!(line.ends_with('\n'));
        assert!(line.contains(r#""type":"message""#));

        match Frame::from_line(&line).unwrap() {
            Frame::Message { payload } => assert_eq!(payload, json!({"ping": 42})),
            other => panic!("expected Message, got {other:?}"),
        }
    }

    #[test]
    fn test_online_frame() {
        let line = Frame::Online.to_line().unwrap();
        assert_eq!(line, "{\"type\":\"online\"}\n");
        assert_eq!(Frame::from_line(&line).unwrap(), Frame::Online);
    }

    #[test]
    fn test_stray_output_becomes_string_message() {
        assert_eq!(
            Frame::from_line_lossy("hello from a library"),
            Frame::message(Value::String("hello from a library".into()))
        );
    }
}
