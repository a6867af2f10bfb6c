use std::path::Path;

use reqflow_exec::{Executor, Services};
use serde::Serialize;

use crate::exit_codes;
use crate::output::{print_error, print_result, OutputFormat};
use crate::OutputArgs;

#[derive(Serialize)]
struct ValidateResult {
    valid: bool,
    regions: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    errors: Vec<String>,
}

/// Parses and compiles the document so hook ordering errors surface too.
pub async fn validate_cmd(path: &Path, output: OutputArgs) -> i32 {
    let content = match tokio::fs::read_to_string(path).await {
        Ok(v) => v,
        Err(e) => {
            print_error(
                output.format,
                output.quiet,
                &format!("failed to read {}: {e}", path.display()),
            );
            return exit_codes::RUNTIME_ERROR;
        }
    };

    let executor = Executor::new(Services::default());
    match executor.load_str(&content, Some(path.to_path_buf())) {
        Ok(file) => {
            let result = ValidateResult {
                valid: true,
                regions: file.regions().len(),
                errors: Vec::new(),
            };
            match output.format {
                OutputFormat::Json => print_result(output.format, output.quiet, &result),
                OutputFormat::Text if !output.quiet => {
                    println!("ok: {} ({} regions)", path.display(), result.regions);
                }
                OutputFormat::Text => {}
            }
            exit_codes::SUCCESS
        }
        Err(e) => {
            match output.format {
                OutputFormat::Json => {
                    let result = ValidateResult {
                        valid: false,
                        regions: 0,
                        errors: vec![e.to_string()],
                    };
                    print_result(output.format, output.quiet, &result);
                }
                OutputFormat::Text => print_error(output.format, output.quiet, &e.to_string()),
            }
            exit_codes::VALIDATION_FAILED
        }
    }
}
