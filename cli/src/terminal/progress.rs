//! Renders pipeline events as progress bars and live result lines.
//!
//! Bars belong to `tracing` spans and are drawn by the `tracing-indicatif` layer,
//! so log lines printed meanwhile land above them instead of tearing them.

use cfst_core::event::PipelineEvent;
use indicatif::ProgressStyle;
use tracing::{Span, debug, info, info_span};
use tracing_indicatif::span_ext::IndicatifSpanExt;

use crate::terminal::{format, print};

const TICK_STRINGS: &[&str] = &[
    "▁▁▁▁▁",
    "▁▂▂▂▁",
    "▁▄▂▄▁",
    "▂▄▆▄▂",
    "▄▆█▆▄",
    "▂▄▆▄▂",
    "▁▄▂▄▁",
    "▁▂▂▂▁",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Scan,
    Colo,
}

pub struct ProgressView {
    quiet: u8,
    fast: f64,
    status: Span,
    stage: Option<(Stage, Span)>,
    rows: usize,
    error: Option<String>,
}

impl ProgressView {
    /// `fast` is the speed highlighted as fast in live rows.
    pub fn new(quiet: u8, fast: f64) -> Self {
        let status = info_span!("status", indicatif.pb_show = true);
        status.pb_set_style(&spinner_style());
        if quiet < 2 {
            status.pb_start();
        }

        Self {
            quiet,
            fast,
            status,
            stage: None,
            rows: 0,
            error: None,
        }
    }

    pub fn handle(&mut self, event: PipelineEvent) {
        match event {
            PipelineEvent::ScanProgress { done, total, valid } => {
                let bar = self.stage_bar(Stage::Scan, total);
                bar.pb_set_position(done as u64);
                bar.pb_set_message(&format!("{valid} reachable"));
            }
            PipelineEvent::ColoProgress { done, total } => {
                let bar = self.stage_bar(Stage::Colo, total);
                bar.pb_set_position(done as u64);
            }
            PipelineEvent::Status(msg) => {
                debug!("{msg}");
                self.status.pb_set_message(&msg);
            }
            PipelineEvent::Row(result) => {
                // The download stage has begun once rows arrive.
                self.stage = None;
                self.rows += 1;
                if self.quiet < 2 {
                    print::print_status(format::table_row(self.rows, &result, self.fast));
                }
            }
            PipelineEvent::FastExit => {
                info!("Enough fast endpoints found, stopping early");
            }
            PipelineEvent::Complete { results } => {
                debug!("Run complete with {results} results");
            }
            PipelineEvent::Error(msg) => {
                self.error = Some(msg);
            }
        }
    }

    /// Closes the bar spans, which removes their bars. Returns the run's error
    /// message, if it ended with one.
    pub fn finish(self) -> Option<String> {
        let Self {
            status,
            stage,
            error,
            ..
        } = self;
        drop(stage);
        drop(status);
        error
    }

    fn stage_bar(&mut self, stage: Stage, total: usize) -> &Span {
        let current = self.stage.as_ref().map(|(s, _)| *s);
        if current != Some(stage) {
            let span = match stage {
                Stage::Scan => info_span!("scan", indicatif.pb_show = true),
                Stage::Colo => info_span!("colo", indicatif.pb_show = true),
            };
            span.pb_set_style(&bar_style(stage));
            span.pb_set_length(total as u64);
            if self.quiet < 2 {
                span.pb_start();
            }
            // Replacing the span drops the previous stage's bar.
            self.stage = Some((stage, span));
        }

        match &self.stage {
            Some((_, span)) => span,
            None => &self.status,
        }
    }
}

fn spinner_style() -> ProgressStyle {
    ProgressStyle::with_template("{spinner:.blue} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
        .tick_strings(TICK_STRINGS)
}

fn bar_style(stage: Stage) -> ProgressStyle {
    let template = match stage {
        Stage::Scan => "  probing   [{bar:32.green/bright_black}] {pos}/{len} {msg}",
        Stage::Colo => "  locating  [{bar:32.cyan/bright_black}] {pos}/{len}",
    };
    ProgressStyle::with_template(template)
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("━╸ ")
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
