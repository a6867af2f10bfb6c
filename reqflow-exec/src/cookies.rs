//! Cookie jar backed by the run's session store.
//!
//! Cookies are kept per host in one `cookie:<host>` session whose details
//! map cookie names to values.

use async_trait::async_trait;
use serde_json::{Map, Value as JsonValue};

use reqflow_core::{Flow, Hook, HookError, HookOptions, PipelineError};
use reqflow_store::{SessionKind, UserSession};

use crate::context::ProcessorContext;
use crate::document::FileHooks;

pub const COOKIE_JAR: &str = "cookieJar";

pub fn register(hooks: &mut FileHooks) -> Result<(), PipelineError> {
    hooks.on_request.add_hook(COOKIE_JAR, AttachCookies, HookOptions::new())?;
    hooks.on_response.add_hook(COOKIE_JAR, StoreCookies, HookOptions::new())?;
    Ok(())
}

fn session_id(host: &str) -> String {
    format!("cookie:{host}")
}

fn store_error(e: reqflow_store::StoreError) -> HookError {
    HookError::message(format!("cookie jar: {e}"))
}

/// Name and value of a `Set-Cookie` header. A `None` value deletes the
/// cookie (`Max-Age=0`).
pub fn parse_set_cookie(header: &str) -> Option<(String, Option<String>)> {
    let mut parts = header.split(';');
    let (name, value) = parts.next()?.split_once('=')?;
    let name = name.trim();
    if name.is_empty() {
        return None;
    }
    let expired = parts.any(|attr| {
        attr.split_once('=')
            .is_some_and(|(k, v)| k.trim().eq_ignore_ascii_case("max-age") && v.trim().starts_with(['0', '-']))
    });
    let value = (!expired).then(|| value.trim().trim_matches('"').to_string());
    Some((name.to_string(), value))
}

struct AttachCookies;

#[async_trait]
impl Hook<ProcessorContext, bool> for AttachCookies {
    async fn call(&self, ctx: &mut ProcessorContext) -> Result<Flow<bool>, HookError> {
        let Some(host) = ctx.request.as_ref().and_then(|r| r.host()) else {
            return Ok(Flow::Continue(true));
        };
        let session = ctx
            .services
            .sessions
            .get_session(&session_id(&host))
            .await
            .map_err(store_error)?;
        let Some(JsonValue::Object(cookies)) = session.map(|s| s.details) else {
            return Ok(Flow::Continue(true));
        };
        if cookies.is_empty() {
            return Ok(Flow::Continue(true));
        }

        let jar: Vec<String> = cookies
            .iter()
            .filter_map(|(k, v)| v.as_str().map(|v| format!("{k}={v}")))
            .collect();
        if let Some(request) = ctx.request.as_mut() {
            let header = match request.header("cookie") {
                Some(existing) => format!("{existing}; {}", jar.join("; ")),
                None => jar.join("; "),
            };
            request.set_header("Cookie", header);
        }
        Ok(Flow::Continue(true))
    }
}

struct StoreCookies;

#[async_trait]
impl Hook<ProcessorContext, bool> for StoreCookies {
    async fn call(&self, ctx: &mut ProcessorContext) -> Result<Flow<bool>, HookError> {
        let Some(host) = ctx.request.as_ref().and_then(|r| r.host()) else {
            return Ok(Flow::Continue(true));
        };
        let updates: Vec<(String, Option<String>)> = match &ctx.response {
            Some(response) => response.header_values("set-cookie").filter_map(parse_set_cookie).collect(),
            None => Vec::new(),
        };
        if updates.is_empty() {
            return Ok(Flow::Continue(true));
        }

        let sessions = &ctx.services.sessions;
        let id = session_id(&host);
        let mut cookies = match sessions.get_session(&id).await.map_err(store_error)? {
            Some(UserSession {
                details: JsonValue::Object(map),
                ..
            }) => map,
            _ => Map::new(),
        };
        for (name, value) in updates {
            match value {
                Some(value) => {
                    cookies.insert(name, JsonValue::String(value));
                }
                None => {
                    cookies.remove(&name);
                }
            }
        }
        tracing::debug!(host = %host, cookies = cookies.len(), "cookie jar updated");
        let mut session = UserSession::new(id, SessionKind::Cookie, JsonValue::Object(cookies));
        session.title = format!("cookies for {host}");
        sessions.set_session(session).await.map_err(store_error)?;
        Ok(Flow::Continue(true))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_cookie_name_value_and_deletion() {
        assert_eq!(
            parse_set_cookie("sid=abc; Path=/; HttpOnly"),
            Some(("sid".to_string(), Some("abc".to_string())))
        );
        assert_eq!(
            parse_set_cookie("sid=; Max-Age=0"),
            Some(("sid".to_string(), None))
        );
        assert_eq!(parse_set_cookie("garbage"), None);
    }
}
