use serde::Serialize;

use reqflow_core::{HookError, HttpRequest, HttpResponse};
use reqflow_exec::secrets::{redact_headers, redact_text, SecretValue};
use reqflow_exec::{HttpRegion, ResponseLogger};

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

pub fn print_result<T: Serialize>(format: OutputFormat, quiet: bool, result: &T) {
    if quiet {
        return;
    }
    match format {
        OutputFormat::Text => {
            if let Ok(json) = serde_json::to_string_pretty(result) {
                println!("{json}");
            }
        }
        OutputFormat::Json => {
            if let Ok(json) = serde_json::to_string(result) {
                println!("{json}");
            }
        }
    }
}

pub fn print_error(format: OutputFormat, quiet: bool, message: &str) {
    if quiet {
        return;
    }
    match format {
        OutputFormat::Text => eprintln!("error: {message}"),
        OutputFormat::Json => {
            let err = serde_json::json!({"error": message});
            eprintln!("{}", serde_json::to_string(&err).unwrap_or_default());
        }
    }
}

/// Prints every response as it arrives, with secrets masked.
pub struct ConsoleResponseLogger;

impl ConsoleResponseLogger {
    fn render(
        region: &HttpRegion,
        request: Option<&HttpRequest>,
        response: &HttpResponse,
        secrets: &[SecretValue],
    ) -> String {
        let mut out = format!("=== {} ===\n", region.name());
        if let Some(request) = request {
            out.push_str(&format!(
                "{} {}\n",
                request.method,
                redact_text(&request.url, secrets)
            ));
        }
        out.push_str(&format!(
            "{} {} ({} ms)\n",
            response.status_code,
            response.status_message.as_deref().unwrap_or_default(),
            response.duration.as_millis()
        ));
        for (name, value) in redact_headers(&response.headers, secrets) {
            out.push_str(&format!("{name}: {value}\n"));
        }
        if !response.body.is_empty() {
            out.push('\n');
            out.push_str(&redact_text(&response.body, secrets));
            out.push('\n');
        }
        out
    }
}

impl ResponseLogger for ConsoleResponseLogger {
    fn log_response(
        &self,
        region: &HttpRegion,
        request: Option<&HttpRequest>,
        response: &HttpResponse,
        secrets: &[SecretValue],
    ) {
        println!("{}", Self::render(region, request, response, secrets));
    }

    fn log_error(&self, region: &HttpRegion, error: &HookError) {
        eprintln!("error: {}: {error}", region.name());
    }
}
