use super::SecretValue;

pub const REDACTED: &str = "<redacted>";

const SENSITIVE_HEADERS: [&str; 4] = ["authorization", "proxy-authorization", "cookie", "set-cookie"];

/// Copy of `headers` with credentials and secret-bearing values masked.
pub fn redact_headers(headers: &[(String, String)], secrets: &[SecretValue]) -> Vec<(String, String)> {
    headers
        .iter()
        .map(|(k, v)| {
            let value = if SENSITIVE_HEADERS.iter().any(|h| k.eq_ignore_ascii_case(h)) {
                REDACTED.to_string()
            } else {
                redact_text(v, secrets)
            };
            (k.clone(), value)
        })
        .collect()
}

/// Replaces every occurrence of a known secret value in `text`.
pub fn redact_text(text: &str, secrets: &[SecretValue]) -> String {
    let mut out = text.to_string();
    for secret in secrets {
        if let Some(s) = secret.expose_str().filter(|s| !s.is_empty()) {
            out = out.replace(s, REDACTED);
        }
    }
    out
}
