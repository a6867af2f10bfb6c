//! `lhs op rhs` conditions shared by assertions, `@disabled` and `while` loops.
//!
//! Operands are plain text after placeholder replacement; each side is read as
//! a JSON literal when possible and as a string otherwise.

use std::cmp::Ordering;
use std::fmt;

use regex::Regex;
use serde_json::Value as JsonValue;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConditionError {
    #[error("unknown operator '{0}'")]
    UnknownOperator(String),
    #[error("invalid regex '{pattern}': {message}")]
    InvalidRegex { pattern: String, message: String },
    #[error("condition is empty")]
    Empty,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Contains,
    Matches,
}

const SYMBOL_OPS: [(&str, CompareOp); 6] = [
    ("==", CompareOp::Eq),
    ("!=", CompareOp::Ne),
    ("<=", CompareOp::Le),
    (">=", CompareOp::Ge),
    ("<", CompareOp::Lt),
    (">", CompareOp::Gt),
];

const WORD_OPS: [(&str, CompareOp); 2] =
    [("contains", CompareOp::Contains), ("matches", CompareOp::Matches)];

impl CompareOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            CompareOp::Eq => "==",
            CompareOp::Ne => "!=",
            CompareOp::Lt => "<",
            CompareOp::Le => "<=",
            CompareOp::Gt => ">",
            CompareOp::Ge => ">=",
            CompareOp::Contains => "contains",
            CompareOp::Matches => "matches",
        }
    }

    pub fn parse(s: &str) -> Result<Self, ConditionError> {
        SYMBOL_OPS
            .iter()
            .chain(WORD_OPS.iter())
            .find(|(token, _)| *token == s)
            .map(|(_, op)| *op)
            .ok_or_else(|| ConditionError::UnknownOperator(s.to_string()))
    }
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Splits at the leftmost operator. Word operators need whitespace on both
/// sides so values like `contains-id` are not split.
pub fn split_condition(text: &str) -> Option<(&str, CompareOp, &str)> {
    let bytes = text.as_bytes();
    for (i, _) in text.char_indices() {
        for (token, op) in SYMBOL_OPS {
            if text[i..].starts_with(token) {
                return Some((text[..i].trim(), op, text[i + token.len()..].trim()));
            }
        }
        if i == 0 || !bytes[i - 1].is_ascii_whitespace() {
            continue;
        }
        for (token, op) in WORD_OPS {
            let end = i + token.len();
            if text[i..].starts_with(token) && bytes.get(end).is_some_and(u8::is_ascii_whitespace) {
                return Some((text[..i].trim(), op, text[end..].trim()));
            }
        }
    }
    None
}

/// Evaluates a condition, or the truthiness of `text` when it has no operator.
pub fn evaluate_condition(text: &str) -> Result<bool, ConditionError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(ConditionError::Empty);
    }
    match split_condition(text) {
        Some((lhs, op, rhs)) => compare(&parse_literal(lhs), op, &parse_literal(rhs)),
        None => Ok(is_truthy(&parse_literal(text))),
    }
}

pub fn parse_literal(s: &str) -> JsonValue {
    let s = s.trim();

    if let Ok(v) = serde_json::from_str::<JsonValue>(s) {
        return v;
    }

    if s.len() >= 2
        && ((s.starts_with('"') && s.ends_with('"')) || (s.starts_with('\'') && s.ends_with('\'')))
    {
        return JsonValue::String(s[1..s.len() - 1].to_string());
    }

    JsonValue::String(s.to_string())
}

pub fn is_truthy(value: &JsonValue) -> bool {
    match value {
        JsonValue::Null => false,
        JsonValue::Bool(b) => *b,
        JsonValue::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        JsonValue::String(s) => !(s.is_empty() || s == "false" || s == "0"),
        JsonValue::Array(_) | JsonValue::Object(_) => true,
    }
}

pub fn compare(actual: &JsonValue, op: CompareOp, expected: &JsonValue) -> Result<bool, ConditionError> {
    let result = match op {
        CompareOp::Eq => json_eq(actual, expected),
        CompareOp::Ne => !json_eq(actual, expected),
        CompareOp::Lt => json_cmp(actual, expected).is_some_and(Ordering::is_lt),
        CompareOp::Le => json_cmp(actual, expected).is_some_and(Ordering::is_le),
        CompareOp::Gt => json_cmp(actual, expected).is_some_and(Ordering::is_gt),
        CompareOp::Ge => json_cmp(actual, expected).is_some_and(Ordering::is_ge),
        CompareOp::Contains => contains(actual, expected),
        CompareOp::Matches => {
            let pattern = as_text(expected);
            let re = Regex::new(&pattern).map_err(|e| ConditionError::InvalidRegex {
                pattern: pattern.clone(),
                message: e.to_string(),
            })?;
            re.is_match(&as_text(actual))
        }
    };
    Ok(result)
}

/// Strings print without quotes; everything else as compact JSON.
pub fn as_text(value: &JsonValue) -> String {
    match value {
        JsonValue::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn contains(haystack: &JsonValue, needle: &JsonValue) -> bool {
    match haystack {
        JsonValue::Array(items) => items.iter().any(|i| json_eq(i, needle)),
        JsonValue::Object(map) => map.contains_key(&as_text(needle)),
        other => as_text(other).contains(&as_text(needle)),
    }
}

fn json_eq(a: &JsonValue, b: &JsonValue) -> bool {
    match (a, b) {
        (JsonValue::Number(a), JsonValue::Number(b)) => a.as_f64() == b.as_f64(),
        (JsonValue::Array(a), JsonValue::Array(b)) => {
            a.len() == b.len() && a.iter().zip(b.iter()).all(|(x, y)| json_eq(x, y))
        }
        (JsonValue::Object(a), JsonValue::Object(b)) => {
            a.len() == b.len()
                && a.iter()
                    .all(|(k, v)| b.get(k).is_some_and(|bv| json_eq(v, bv)))
        }
        (JsonValue::String(s), other @ (JsonValue::Number(_) | JsonValue::Bool(_)))
        | (other @ (JsonValue::Number(_) | JsonValue::Bool(_)), JsonValue::String(s)) => {
            *s == other.to_string()
        }
        _ => a == b,
    }
}

fn json_cmp(a: &JsonValue, b: &JsonValue) -> Option<Ordering> {
    match (a, b) {
        (JsonValue::String(a), JsonValue::String(b)) => Some(a.cmp(b)),
        _ => match (a.as_f64(), b.as_f64()) {
            (Some(a), Some(b)) => a.partial_cmp(&b),
            _ => None,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn numeric_comparisons() {
        assert!(evaluate_condition("200 == 200").unwrap());
        assert!(evaluate_condition("2 < 10").unwrap());
        assert!(!evaluate_condition("10 <= 2").unwrap());
        assert!(evaluate_condition("3 >= 3.0").unwrap());
    }

    #[test]
    fn string_comparisons() {
        assert!(evaluate_condition("abc == 'abc'").unwrap());
        assert!(evaluate_condition("\"a b\" != c").unwrap());
        assert!(evaluate_condition("application/json contains json").unwrap());
        assert!(evaluate_condition("abc-123 matches ^abc-\\d+$").unwrap());
    }

    #[test]
    fn word_operator_needs_whitespace() {
        assert_eq!(split_condition("containsx"), None);
        let (lhs, op, rhs) = split_condition("[1,2] contains 2").unwrap();
        assert_eq!((lhs, op, rhs), ("[1,2]", CompareOp::Contains, "2"));
        assert!(evaluate_condition("[1,2] contains 2").unwrap());
    }

    #[test]
    fn truthiness_without_operator() {
        assert!(evaluate_condition("true").unwrap());
        assert!(!evaluate_condition("false").unwrap());
        assert!(!evaluate_condition("0").unwrap());
        assert!(evaluate_condition("yes").unwrap());
        assert_eq!(evaluate_condition("  "), Err(ConditionError::Empty));
    }

    #[test]
    fn invalid_regex_is_reported() {
        let err = compare(&json!("a"), CompareOp::Matches, &json!("(")).unwrap_err();
        assert!(matches!(err, ConditionError::InvalidRegex { .. }));
    }

    #[test]
    fn number_and_string_forms_compare_equal() {
        assert!(compare(&json!("200"), CompareOp::Eq, &json!(200)).unwrap());
    }
}
