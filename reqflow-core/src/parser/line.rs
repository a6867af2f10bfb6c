use std::sync::LazyLock;

use regex::Regex;

static REQUEST_LINE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(GET|POST|PUT|DELETE|PATCH|HEAD|OPTIONS|TRACE|CONNECT|SSE|EVENTSOURCE|WS|WEBSOCKET|MQTT|GRPC|KAFKA)\s+(\S+)(?:\s+HTTP/[\d.]+)?\s*$",
    )
    .expect("valid regex")
});

static HEADER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([A-Za-z0-9!#$%&'*+.^_`|~-]+)\s*:\s*(.*)$").expect("valid regex"));

static VARIABLE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^@([A-Za-z_][\w.-]*)\s*=\s*(.*)$").expect("valid regex"));

static META_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:#|//)\s*@([A-Za-z][\w-]*)(?:\s+(.*))?$").expect("valid regex"));

#[derive(Debug, PartialEq, Eq)]
pub(super) enum Line<'a> {
    Blank,
    Separator(&'a str),
    Meta { key: &'a str, value: &'a str },
    Comment,
    Variable { name: &'a str, value: &'a str },
    Assertion(&'a str),
    Request { method: &'a str, url: &'a str },
    Other(&'a str),
}

pub(super) fn classify(raw: &str) -> Line<'_> {
    let line = raw.trim_end();
    let trimmed = line.trim_start();
    if trimmed.is_empty() {
        return Line::Blank;
    }
    if let Some(title) = trimmed.strip_prefix("###") {
        return Line::Separator(title.trim());
    }
    if let Some(c) = META_RE.captures(trimmed) {
        let key = c.get(1).map_or("", |m| m.as_str());
        let value = c.get(2).map_or("", |m| m.as_str().trim());
        return Line::Meta { key, value };
    }
    if trimmed.starts_with('#') || trimmed.starts_with("//") {
        return Line::Comment;
    }
    if let Some(rest) = trimmed.strip_prefix("??") {
        return Line::Assertion(rest.trim());
    }
    if let Some(c) = VARIABLE_RE.captures(trimmed) {
        let name = c.get(1).map_or("", |m| m.as_str());
        let value = c.get(2).map_or("", |m| m.as_str().trim());
        return Line::Variable { name, value };
    }
    if let Some(c) = REQUEST_LINE_RE.captures(trimmed) {
        let method = c.get(1).map_or("", |m| m.as_str());
        let url = c.get(2).map_or("", |m| m.as_str());
        return Line::Request { method, url };
    }
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        if !trimmed.contains(char::is_whitespace) {
            return Line::Request {
                method: "GET",
                url: trimmed,
            };
        }
    }
    Line::Other(line)
}

pub(super) fn header(line: &str) -> Option<(&str, &str)> {
    let c = HEADER_RE.captures(line.trim())?;
    Some((c.get(1)?.as_str(), c.get(2)?.as_str().trim()))
}
