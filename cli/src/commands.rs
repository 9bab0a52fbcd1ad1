pub mod run;

use std::path::PathBuf;

use cfst_common::config::{DEFAULT_TEST_URL, DEFAULT_TRACE_URL, Settings};
use clap::{ArgAction, Parser};

#[derive(Parser, Debug)]
#[command(name = "cfst")]
#[command(version, about = "Finds the fastest reachable edge endpoints of a CDN.")]
pub struct CommandLine {
    /// Port every endpoint is probed and tested on
    #[arg(short, long, default_value_t = 443)]
    pub port: u16,

    /// Number of addresses to sample from the ranges
    #[arg(short = 'n', long, default_value_t = 2000)]
    pub max_scan: usize,

    /// Parallel connections per download test
    #[arg(short = 'c', long = "threads", default_value_t = 4)]
    pub threads: usize,

    /// Number of endpoints to download-test before stopping
    #[arg(short = 'd', long, default_value_t = 10)]
    pub download_num: usize,

    /// Seconds each download test runs
    #[arg(short = 't', long, default_value_t = 6)]
    pub duration: u64,

    /// Stop after five endpoints reach this speed (MB/s)
    #[arg(short = 's', long, default_value_t = 25.0)]
    pub stop_threshold: f64,

    /// Sample at most one address per /24 subnet
    #[arg(short = 'u', long)]
    pub unique: bool,

    /// File with one CIDR block or address per line, replacing the built-in ranges
    #[arg(short = 'f', long)]
    pub file: Option<PathBuf>,

    /// Where to write the CSV results
    #[arg(short = 'o', long, default_value = "result_colo.csv")]
    pub output: PathBuf,

    /// Concurrent TCP probes
    #[arg(long, default_value_t = 200)]
    pub scan_concurrency: usize,

    /// Download URL used for the block check and the speed test
    #[arg(long, default_value = DEFAULT_TEST_URL)]
    pub url: String,

    /// URL whose response names the serving location
    #[arg(long, default_value = DEFAULT_TRACE_URL)]
    pub trace_url: String,

    /// Drop blocked endpoints instead of listing them as rate limited
    #[arg(long, default_value_t = true, action = ArgAction::Set)]
    pub skip_blocked: bool,

    /// Less output (-q hides headers, -qq also hides progress and live rows)
    #[arg(short, action = ArgAction::Count)]
    pub quiet: u8,

    /// More log output (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

impl CommandLine {
    pub fn parse_args() -> Self {
        Self::parse()
    }

    pub fn settings(&self) -> Settings {
        Settings {
            port: self.port,
            max_scan: self.max_scan,
            download_threads: self.threads,
            result_quota: self.download_num,
            duration_secs: self.duration,
            stop_threshold: self.stop_threshold,
            unique_subnets: self.unique,
            range_file: self.file.clone(),
            scan_concurrency: self.scan_concurrency,
            test_url: self.url.clone(),
            trace_url: self.trace_url.clone(),
            skip_blocked: self.skip_blocked,
        }
    }
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
