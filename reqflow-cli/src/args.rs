use std::path::PathBuf;

use clap::Args;

use crate::output::OutputFormat;

#[derive(Debug, Args, Clone)]
pub struct OutputArgs {
    #[arg(long, value_enum, default_value_t = OutputFormat::Text, global = true)]
    pub format: OutputFormat,
    #[arg(long, short, global = true)]
    pub quiet: bool,
}

#[derive(Debug, Args, Clone)]
pub struct RunArgs {
    /// Request timeout in milliseconds.
    #[arg(long, default_value_t = 30_000)]
    pub timeout: u64,
    #[arg(long, default_value_t = 10 * 1024 * 1024)]
    pub max_response_bytes: usize,
    #[arg(long)]
    pub no_cookie_jar: bool,
    #[arg(long)]
    pub allow_secrets_in_url: bool,
    /// JSON or YAML object with initial variables.
    #[arg(long)]
    pub vars: Option<PathBuf>,
    #[arg(long = "var", value_name = "KEY=VALUE")]
    pub set_vars: Vec<String>,
    #[arg(long = "env", value_name = "NAME")]
    pub environments: Vec<String>,
    /// Directory served by the `file://` secrets scheme.
    #[arg(long)]
    pub secrets_dir: Option<PathBuf>,
}
