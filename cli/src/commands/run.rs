use std::path::Path;
use std::time::{Duration, Instant};

use anyhow::Context;
use cfst_common::config::Settings;
use cfst_common::network::candidate::FinalResult;
use cfst_common::network::range::ranges_or_default;
use cfst_core::event::PipelineEvent;
use cfst_core::pipeline::Pipeline;
use colored::*;
use tokio::sync::mpsc;
use tracing::{error, info};

use crate::commands::CommandLine;
use crate::export;
use crate::terminal::print::{self, GLOBAL_KEY_WIDTH};
use crate::terminal::progress::ProgressView;
use crate::terminal::{colors, format};
use crate::cprint;

pub async fn run(commands: &CommandLine) -> anyhow::Result<()> {
    let settings: Settings = commands.settings();
    let quiet: u8 = commands.quiet;
    settings.validate().context("invalid settings")?;

    let ranges = ranges_or_default(settings.range_file.as_deref());
    print::header("measurement settings", quiet);
    print_settings(&settings, ranges.len(), quiet);

    let fast: f64 = settings.stop_threshold;
    let pipeline = Pipeline::new(settings, ranges).context("invalid settings")?;

    let (tx, mut rx) = mpsc::unbounded_channel::<PipelineEvent>();
    let start_time: Instant = Instant::now();
    let worker = tokio::task::spawn_blocking(move || pipeline.run(&tx));

    let mut view = ProgressView::new(quiet, fast);
    while let Some(event) = rx.recv().await {
        view.handle(event);
    }
    let run_error: Option<String> = view.finish();
    let results: Vec<FinalResult> = worker.await.context("measurement task failed")?;

    run_ends(&results, run_error, &commands.output, start_time.elapsed(), fast, quiet);
    Ok(())
}

fn print_settings(settings: &Settings, range_count: usize, quiet: u8) {
    if quiet > 0 {
        return;
    }

    let source: String = match &settings.range_file {
        Some(path) => path.display().to_string(),
        None => "built-in".to_string(),
    };
    let policy: &str = if settings.skip_blocked { "discard" } else { "record" };

    let details: Vec<(&str, String)> = vec![
        ("Ranges", format!("{range_count} ({source})")),
        ("Port", settings.port.to_string()),
        ("Sample", format!("{} addresses{}", settings.max_scan, if settings.unique_subnets { ", one per /24" } else { "" })),
        ("Probes", format!("{} concurrent", settings.scan_concurrency)),
        ("Download", format!("{} x {}s", settings.download_threads, settings.duration_secs)),
        ("Quota", settings.result_quota.to_string()),
        ("Stop at", format!("{} MB/s", settings.stop_threshold)),
        ("Blocked", policy.to_string()),
        ("URL", settings.test_url.clone()),
    ];

    let width: usize = details.iter().map(|(key, _)| key.len()).max().unwrap_or(0);
    GLOBAL_KEY_WIDTH.set(width);
    for (key, value) in details {
        print::aligned_line(key, value);
    }
}

fn run_ends(
    results: &[FinalResult],
    run_error: Option<String>,
    output: &Path,
    total_time: Duration,
    fast: f64,
    quiet: u8,
) {
    if results.is_empty() {
        print::header("no usable endpoints", quiet);
        if quiet == 0 {
            print::no_results();
        }
        let reason: String = run_error.unwrap_or_else(|| "The run produced no results.".to_string());
        error!("{reason}");
        return;
    }

    if quiet > 0 {
        cprint!();
    }

    print::header("ranked endpoints", quiet);
    print_table(results, fast);

    match export::write_csv_file(output, results) {
        Ok(()) => info!("Results written to {}", output.display()),
        Err(e) => error!("Could not export results: {e:#}"),
    }

    print_summary(results.len(), total_time, quiet);
}

fn print_table(results: &[FinalResult], fast: f64) {
    cprint!(&format::table_head());
    for (idx, result) in results.iter().enumerate() {
        cprint!(&format::table_row(idx + 1, result, fast));
    }
}

fn print_summary(count: usize, total_time: Duration, quiet: u8) {
    let ranked: ColoredString = format!("{count} endpoints").bold().green();
    let total_time: ColoredString = format!("{:.2}s", total_time.as_secs_f64()).bold().yellow();
    let output: &ColoredString = &format!("Measurement Complete: {ranked} ranked in {total_time}")
        .color(colors::TEXT_DEFAULT);

    match quiet {
        0 => {
            print::fat_separator();
            print::centerln(output);
        }
        _ => {
            cprint!();
            info!("{}", output);
        }
    }
}
