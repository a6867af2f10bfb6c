use serde_json::Value;

use super::{MessageKind, StreamMessage};
use crate::types::HttpResponse;

/// Folds the messages of a finished stream into one response.
///
/// The last data message is the template for headers and protocol. Bodies of
/// all data messages become a JSON array (a single message keeps its own
/// body). The first error message overrides status code and message.
/// Metadata messages are only used when no data message was seen.
pub fn merge_stream_messages(messages: &[StreamMessage]) -> Option<HttpResponse> {
    let data: Vec<&HttpResponse> = messages
        .iter()
        .filter(|m| m.kind == MessageKind::Data)
        .map(|m| &m.response)
        .collect();
    let first_error = messages.iter().find(|m| m.kind == MessageKind::Error);

    let template = data
        .last()
        .copied()
        .or_else(|| first_error.map(|m| &m.response))
        .or_else(|| messages.last().map(|m| &m.response))?;

    let mut merged = template.clone();
    match data.as_slice() {
        [] => {}
        [single] => merged.set_body(single.body.clone()),
        many => {
            let values: Vec<Value> = many.iter().map(|r| r.body_value()).collect();
            merged.body = Value::Array(values.clone()).to_string();
            merged.parsed_body = Some(Value::Array(values));
        }
    }
    if let Some(error) = first_error {
        merged.status_code = error.response.status_code;
        merged.status_message = error.response.status_message.clone();
    }
    merged.duration = messages
        .iter()
        .map(|m| m.response.duration)
        .max()
        .unwrap_or_default();
    Some(merged)
}
