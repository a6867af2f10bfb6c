use std::path::Path;
use std::sync::Arc;

use reqflow_exec::{
    BatchResult, EventSink, ExecuteOptions, ExecutionError, Executor, NoOpEventSink, Progress,
    Selection, Services, StdoutEventSink, TracingEventSink,
};

use super::config::{build_executor_config, build_secrets, load_vars, merge_set_vars};
use super::progress::{cancel_on_ctrl_c, ProgressEventSink};
use crate::exit_codes;
use crate::output::{print_error, print_result, ConsoleResponseLogger, OutputFormat};
use crate::{OutputArgs, RunArgs};

pub async fn run_cmd(
    path: &Path,
    regions: &[String],
    all: bool,
    bail: bool,
    events: &str,
    run: RunArgs,
    output: OutputArgs,
) -> i32 {
    let mut variables = match load_vars(run.vars.as_deref()) {
        Ok(v) => v,
        Err(msg) => {
            print_error(output.format, output.quiet, &msg);
            return exit_codes::RUNTIME_ERROR;
        }
    };
    if let Err(msg) = merge_set_vars(&mut variables, &run.set_vars) {
        print_error(output.format, output.quiet, &msg);
        return exit_codes::RUNTIME_ERROR;
    }

    let progress_sink = Arc::new(ProgressEventSink::new());
    let event_sink: Arc<dyn EventSink> = match events {
        "none" => Arc::new(NoOpEventSink),
        "stdout" => Arc::new(StdoutEventSink),
        "log" => Arc::new(TracingEventSink),
        "progress" => progress_sink.clone(),
        other => {
            print_error(
                output.format,
                output.quiet,
                &format!("unknown event sink: {other}"),
            );
            return exit_codes::RUNTIME_ERROR;
        }
    };

    let mut services = Services::new(build_executor_config(&run));
    services.secrets = build_secrets(&run);
    services.events = event_sink;
    if output.format == OutputFormat::Text && !output.quiet {
        services.logger = Some(Arc::new(ConsoleResponseLogger));
    }
    let mut executor = Executor::new(services);
    if bail {
        executor = executor.with_bail();
    }

    let file = match executor.load_file(path).await {
        Ok(f) => f,
        Err(e @ ExecutionError::Io { .. }) => {
            print_error(output.format, output.quiet, &e.to_string());
            return exit_codes::RUNTIME_ERROR;
        }
        Err(e) => {
            print_error(output.format, output.quiet, &e.to_string());
            return exit_codes::VALIDATION_FAILED;
        }
    };

    let selection = if all || regions.is_empty() {
        Selection::All
    } else {
        Selection::Names(regions.to_vec())
    };
    let progress = Progress::new();
    let ctrl_c = cancel_on_ctrl_c(&progress);
    let options = ExecuteOptions {
        variables,
        environments: run.environments.clone(),
        progress: Some(progress),
    };
    let result = executor.execute_all(&file, &selection, &options).await;
    ctrl_c.abort();

    let batch = match result {
        Ok(batch) => batch,
        Err(e @ ExecutionError::RegionNotFound(_)) => {
            print_error(output.format, output.quiet, &e.to_string());
            return exit_codes::VALIDATION_FAILED;
        }
        Err(e) => {
            print_error(output.format, output.quiet, &e.to_string());
            return exit_codes::RUNTIME_ERROR;
        }
    };

    match output.format {
        OutputFormat::Json => print_result(output.format, output.quiet, &batch),
        OutputFormat::Text if !output.quiet => {
            print_summary(&batch);
            if events == "progress" {
                eprintln!("{}", progress_sink.summary());
            }
        }
        OutputFormat::Text => {}
    }

    if batch.cancelled {
        exit_codes::CANCELLED
    } else if batch.succeeded() {
        exit_codes::SUCCESS
    } else {
        exit_codes::RUN_FAILED
    }
}

fn print_summary(batch: &BatchResult) {
    for report in &batch.reports {
        let label = if report.cancelled {
            "CANCELLED"
        } else if report.skipped {
            "SKIPPED"
        } else if report.has_failures() {
            "FAIL"
        } else {
            "PASS"
        };
        println!("{label} {} (line {})", report.name, report.line);
        for test in &report.test_results {
            match &test.error {
                Some(error) => println!("  {} {}: {error}", test.status, test.message),
                None => println!("  {} {}", test.status, test.message),
            }
        }
    }
    println!(
        "{} regions, {} failed{}",
        batch.reports.len(),
        batch.failed_count(),
        if batch.cancelled { ", cancelled" } else { "" }
    );
}
