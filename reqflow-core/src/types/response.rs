use std::time::Duration;

use super::Protocol;

/// A response observed from any protocol.
///
/// Streaming protocols produce one per message; the engine folds those into
/// a single merged response when the stream ends.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct HttpResponse {
    pub protocol: Protocol,
    pub status_code: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_message: Option<String>,
    #[serde(default)]
    pub headers: Vec<(String, String)>,
    #[serde(default)]
    pub body: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parsed_body: Option<serde_json::Value>,
    #[serde(default, with = "duration_ms")]
    pub duration: Duration,
}

impl HttpResponse {
    pub fn new(protocol: Protocol, status_code: u16) -> Self {
        Self {
            protocol,
            status_code,
            status_message: None,
            headers: Vec::new(),
            body: String::new(),
            parsed_body: None,
            duration: Duration::ZERO,
        }
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.set_body(body);
        self
    }

    /// Sets the raw body and re-parses it as JSON when possible.
    pub fn set_body(&mut self, body: impl Into<String>) {
        self.body = body.into();
        self.parsed_body = serde_json::from_str(&self.body).ok();
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn header_values<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.headers
            .iter()
            .filter(move |(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn is_success(&self) -> bool {
        (200..400).contains(&self.status_code)
    }

    /// Body as a JSON value: the parsed body, or the raw text as a string.
    pub fn body_value(&self) -> serde_json::Value {
        self.parsed_body
            .clone()
            .unwrap_or_else(|| serde_json::Value::String(self.body.clone()))
    }
}

mod duration_ms {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(d)?))
    }
}
