use std::path::PathBuf;

use clap::Subcommand;

use crate::args::*;

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Execute regions of a document.
    Run {
        path: PathBuf,
        /// Region names to run, in order. Defaults to every region.
        #[arg(value_name = "REGION")]
        regions: Vec<String>,
        /// Run every region even when names are given.
        #[arg(long)]
        all: bool,
        /// Skip the remaining regions after the first failure.
        #[arg(long)]
        bail: bool,
        /// Where execution events go: none, stdout or log.
        #[arg(long, default_value = "none")]
        events: String,
        #[command(flatten)]
        run: RunArgs,
        #[command(flatten)]
        output: OutputArgs,
    },
    /// Show the regions of a document.
    List {
        path: PathBuf,
        #[command(flatten)]
        output: OutputArgs,
    },
    /// Parse and compile a document without running it.
    Validate {
        path: PathBuf,
        #[command(flatten)]
        output: OutputArgs,
    },
}
