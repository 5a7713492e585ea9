//! Output formatting for CLI

use serde::Serialize;
use tandem_core::Message;

/// Output format options
pub enum OutputFormat {
    Text,
    Json,
}

impl From<&str> for OutputFormat {
    fn from(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "json" => OutputFormat::Json,
            _ => OutputFormat::Text,
        }
    }
}

/// Format output based on selected format
pub fn format_output<T: Serialize + std::fmt::Debug>(data: &T, format: &str) -> String {
    match OutputFormat::from(format) {
        OutputFormat::Json => {
            serde_json::to_string_pretty(data).unwrap_or_else(|_| "{}".to_string())
        }
        OutputFormat::Text => format!("{:#?}", data),
    }
}

/// One received datagram, as printed by `listen`
#[derive(Debug, Serialize)]
pub struct RecordLine<'a> {
    pub received_at: String,
    pub raw: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<Message>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<'a> RecordLine<'a> {
    pub fn parse(raw: &'a str) -> Self {
        let received_at = chrono::Utc::now().format("%H:%M:%S%.3f").to_string();

        match Message::parse(raw) {
            Ok(message) => Self {
                received_at,
                raw,
                message: Some(message),
                error: None,
            },
            Err(e) => Self {
                received_at,
                raw,
                message: None,
                error: Some(e.to_string()),
            },
        }
    }
}

/// Single-line rendering of a received record
pub fn format_record(line: &RecordLine<'_>, format: &str) -> String {
    match OutputFormat::from(format) {
        OutputFormat::Json => serde_json::to_string(line).unwrap_or_else(|_| "{}".to_string()),
        OutputFormat::Text => match (&line.message, &line.error) {
            (Some(Message::Heartbeat(h)), _) => format!(
                "[{}] heartbeat  t={:.3}s  v={:.2}  muted={}  state={}  base={}",
                line.received_at, h.time, h.volume, h.muted, h.state, h.base_time
            ),
            (Some(Message::Command(c)), _) => {
                format!("[{}] command    {:?}", line.received_at, c)
            }
            (None, Some(e)) => format!("[{}] unknown    {} ({})", line.received_at, line.raw, e),
            (None, None) => format!("[{}] unknown    {}", line.received_at, line.raw),
        },
    }
}
