use std::path::Path;

use reqflow_core::{parse_document_str, RegionDefinition};
use serde::Serialize;

use crate::exit_codes;
use crate::output::{print_error, print_result, OutputFormat};
use crate::OutputArgs;

#[derive(Serialize)]
struct RegionEntry {
    name: String,
    line: usize,
    global: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    method: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    url: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    refs: Vec<String>,
}

impl From<&RegionDefinition> for RegionEntry {
    fn from(region: &RegionDefinition) -> Self {
        Self {
            name: region.symbol.name.clone(),
            line: region.symbol.start_line,
            global: region.is_global(),
            method: region.request.as_ref().map(|r| r.method.clone()),
            url: region.request.as_ref().map(|r| r.url.clone()),
            refs: region.metadata.refs().into_iter().map(|(name, _)| name).collect(),
        }
    }
}

pub async fn list_cmd(path: &Path, output: OutputArgs) -> i32 {
    let content = match tokio::fs::read_to_string(path).await {
        Ok(c) => c,
        Err(e) => {
            print_error(
                output.format,
                output.quiet,
                &format!("failed to read {}: {e}", path.display()),
            );
            return exit_codes::RUNTIME_ERROR;
        }
    };
    let document = match parse_document_str(&content) {
        Ok(d) => d,
        Err(e) => {
            print_error(output.format, output.quiet, &e.to_string());
            return exit_codes::VALIDATION_FAILED;
        }
    };

    let entries: Vec<RegionEntry> = document.regions.iter().map(RegionEntry::from).collect();
    match output.format {
        OutputFormat::Json => print_result(output.format, output.quiet, &entries),
        OutputFormat::Text if !output.quiet => {
            for entry in &entries {
                let request = match (&entry.method, &entry.url) {
                    (Some(method), Some(url)) => format!("{method} {url}"),
                    _ if entry.global => "(global)".to_string(),
                    _ => String::new(),
                };
                println!("{:>4}  {:<24} {request}", entry.line, entry.name);
            }
        }
        OutputFormat::Text => {}
    }
    exit_codes::SUCCESS
}
