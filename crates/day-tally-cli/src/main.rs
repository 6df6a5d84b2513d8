mod commands;
mod logging;
mod progress;

use std::process;

use anyhow::Context;
use clap::{CommandFactory, Parser};
use colored::*;
use commands::{Cli, Commands, Overrides, ScanArgs};
use day_tally_core::storage::open_store;
use day_tally_core::{
    export, Aggregate, AppConfig, ProgressReporter, RunStatus, TallyEngine, TracingReporter,
};
use dotenv::dotenv;
use progress::CliReporter;
use tracing::{error, info, warn};

fn main() {
    dotenv().ok();

    let args = Cli::parse();

    let guard = logging::init_logger(args.plain);

    let config = match day_tally_core::config::load_configuration() {
        Ok(config) => apply_overrides(config, &args.overrides),
        Err(err) => {
            error!("Error loading configuration: {}", err);
            drop(guard);
            process::exit(2);
        }
    };

    let outcome = match args.command {
        Some(Commands::Scan(scan_args)) => run_scan(config, &scan_args, args.plain),
        Some(Commands::Show { person }) => {
            run_show(&config, person.as_deref()).map(|()| RunStatus::Completed)
        }
        Some(Commands::PrintConfig) => {
            let mut shown = config;
            shown.database_url = shown.database_url.as_deref().map(redact);
            println!("Configuration: {:#?}", shown);
            Ok(RunStatus::Completed)
        }
        None => {
            let _ = Cli::command().print_long_help();
            Ok(RunStatus::Completed)
        }
    };

    match outcome {
        Ok(status) => {
            let code = exit_code(status);
            if code != 0 {
                drop(guard);
                process::exit(code);
            }
        }
        Err(err) => {
            error!("{} {:#}", "Run FAILED:".red().bold(), err);
            // flush the file appender; process::exit skips destructors
            drop(guard);
            process::exit(1);
        }
    }
}

/// 0 for a clean run, 3 when some subject folders could not be walked.
fn exit_code(status: RunStatus) -> i32 {
    match status {
        RunStatus::Completed => 0,
        RunStatus::CompletedWithFailures(_) => 3,
    }
}

fn apply_overrides(mut config: AppConfig, overrides: &Overrides) -> AppConfig {
    if let Some(root) = &overrides.root {
        config.root_dir = root.clone();
    }
    if let Some(url) = &overrides.database_url {
        config.database_url = Some(url.clone());
    }
    if let Some(start) = overrides.start {
        config.window_start = start;
    }
    if let Some(end) = overrides.end {
        config.window_end = end;
    }
    config
}

fn run_scan(config: AppConfig, args: &ScanArgs, plain: bool) -> anyhow::Result<RunStatus> {
    let database_url = config.resolved_database_url();
    let engine = TallyEngine::new(config);

    let cli_reporter = CliReporter::new();
    let reporter: &dyn ProgressReporter = if plain {
        &TracingReporter
    } else {
        &cli_reporter
    };

    if args.dry_run {
        let aggregate = engine.aggregate(reporter).context("aggregation failed")?;
        for row in &aggregate.rows {
            println!("{}\t{}\t{}", row.person, row.day, row.file_count);
        }
        write_csv_if_requested(args, &aggregate)?;
        print_summary(&aggregate, None);
        return Ok(aggregate.status());
    }

    // Open the store before walking; a bad URL should not cost a full scan.
    let mut store = open_store(&database_url)
        .with_context(|| format!("cannot open store {}", redact(&database_url)))?;
    let report = engine
        .run(store.as_mut(), reporter)
        .context("scan did not complete")?;

    write_csv_if_requested(args, &report.aggregate)?;
    print_summary(&report.aggregate, Some(report.rows_upserted));
    info!(
        "Scan: {}, DB: {}",
        format!("{:.2}s", report.aggregate.scan_duration.as_secs_f64()).green(),
        format!("{:.2}s", report.persist_duration.as_secs_f64()).green(),
    );
    Ok(report.aggregate.status())
}

fn write_csv_if_requested(args: &ScanArgs, aggregate: &Aggregate) -> anyhow::Result<()> {
    if let Some(path) = &args.csv {
        export::write_csv(path, &aggregate.rows)
            .with_context(|| format!("cannot write {}", path.display()))?;
        info!("Wrote {} rows to {}", aggregate.rows.len(), path.display());
    }
    Ok(())
}

fn print_summary(aggregate: &Aggregate, rows_upserted: Option<usize>) {
    let summary = &aggregate.summary;
    info!(
        "{} files scanned, {} errors, {} distinct keys",
        format!("{}", summary.files_scanned).green(),
        format!("{}", summary.errors).red(),
        format!("{}", summary.distinct_keys).cyan(),
    );
    info!(
        "{} batch directories counted, {} batch directories omitted, {} files outside window, {} unreadable directories",
        format!("{}", summary.batch_directories).cyan(),
        summary.batch_omitted,
        summary.out_of_window,
        summary.directory_errors,
    );
    match rows_upserted {
        Some(rows) => info!("{} rows upserted", format!("{}", rows).green()),
        None => info!("Dry run: store not touched"),
    }
    for failure in &aggregate.failures {
        warn!(
            "{} {}: {}",
            "Subject failed".red(),
            failure.subject,
            failure.reason
        );
    }
    let status = aggregate.status();
    if status.is_clean() {
        info!("Run {}", status.to_string().green().bold());
    } else {
        warn!(
            "Run {}: {}",
            status.to_string().yellow().bold(),
            aggregate
                .failures
                .iter()
                .map(|f| f.subject.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        );
    }
}

fn run_show(config: &AppConfig, person: Option<&str>) -> anyhow::Result<()> {
    let database_url = config.resolved_database_url();
    let mut store = open_store(&database_url)
        .with_context(|| format!("cannot open store {}", redact(&database_url)))?;
    let rows = store.fetch_counts(person)?;
    for row in &rows {
        println!(
            "{}\t{}\t{}\t{}",
            row.person,
            row.day,
            row.file_count,
            row.updated_at.to_rfc3339()
        );
    }
    info!("{} rows", rows.len());
    Ok(())
}

/// Hides the password part of a connection URL.
fn redact(url: &str) -> String {
    match (url.find("://"), url.rfind('@')) {
        (Some(scheme_end), Some(at)) if at > scheme_end => {
            let credentials = &url[scheme_end + 3..at];
            match credentials.find(':') {
                Some(colon) => format!(
                    "{}{}:***{}",
                    &url[..scheme_end + 3],
                    &credentials[..colon],
                    &url[at..]
                ),
                None => url.to_string(),
            }
        }
        _ => url.to_string(),
    }
}
