use async_trait::async_trait;
use chrono::format::{Item, StrftimeItems};
use chrono::Utc;

use reqflow_core::{Flow, Hook, HookError};

use super::{rewrite, ReplaceArgs};

/// `$uuid`, `$timestamp`, `$datetime [format]`, `$randomInt min max` and
/// `$processEnv NAME`.
pub struct HostReplacer;

#[async_trait]
impl Hook<ReplaceArgs, bool> for HostReplacer {
    async fn call(&self, args: &mut ReplaceArgs) -> Result<Flow<bool>, HookError> {
        if args.is_cancelled() {
            return Ok(Flow::Cancelled);
        }
        args.text = rewrite(&args.text, host_value);
        Ok(Flow::Continue(true))
    }
}

pub(crate) fn host_value(expr: &str) -> Option<String> {
    let mut parts = expr.split_whitespace();
    let name = parts.next()?;
    let rest: Vec<&str> = parts.collect();
    match name {
        "$uuid" | "$guid" => Some(uuid::Uuid::new_v4().to_string()),
        "$timestamp" => Some(Utc::now().timestamp().to_string()),
        "$datetime" => datetime(&rest.join(" ")),
        "$randomInt" => match rest.as_slice() {
            [min, max] => {
                let (min, max) = (min.parse::<i64>().ok()?, max.parse::<i64>().ok()?);
                (min < max).then(|| fastrand::i64(min..max).to_string())
            }
            _ => None,
        },
        "$processEnv" => std::env::var(rest.first()?).ok(),
        _ => None,
    }
}

fn datetime(format: &str) -> Option<String> {
    let now = Utc::now();
    let format = format.trim().trim_matches(|c| c == '"' || c == '\'');
    match format {
        "" | "iso8601" | "rfc3339" => Some(now.to_rfc3339()),
        "rfc1123" | "rfc2822" => Some(now.to_rfc2822()),
        custom => {
            let items: Vec<Item<'_>> = StrftimeItems::new(custom).collect();
            if items.iter().any(|i| matches!(i, Item::Error)) {
                return None;
            }
            Some(now.format_with_items(items.into_iter()).to_string())
        }
    }
}
