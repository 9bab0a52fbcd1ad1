use std::path::PathBuf;

use crate::error::ConfigError;

pub const DEFAULT_TEST_URL: &str = "https://speed.cloudflare.com/__down?bytes=50000000";
pub const DEFAULT_TRACE_URL: &str = "https://speed.cloudflare.com/cdn-cgi/trace";

/// Knobs for a single measurement run.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    /// Port every candidate is probed and tested on.
    pub port: u16,
    /// How many addresses to sample from the ranges.
    pub max_scan: usize,
    /// Parallel connections per throughput benchmark.
    pub download_threads: usize,
    /// Number of results to collect before stopping.
    pub result_quota: usize,
    /// Benchmark window in seconds.
    pub duration_secs: u64,
    /// Speed (MiB/s) at which a result counts towards the fast-exit.
    pub stop_threshold: f64,
    /// Sample at most one address per /24.
    pub unique_subnets: bool,
    /// Custom range list replacing the default table.
    pub range_file: Option<PathBuf>,
    /// Concurrent TCP probes.
    pub scan_concurrency: usize,
    /// URL used for the block check and the throughput benchmark.
    pub test_url: String,
    /// URL whose body reports the point-of-presence.
    pub trace_url: String,
    /// Drop blocked candidates instead of recording them as rate limited.
    pub skip_blocked: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            port: 443,
            max_scan: 2000,
            download_threads: 4,
            result_quota: 10,
            duration_secs: 6,
            stop_threshold: 25.0,
            unique_subnets: false,
            range_file: None,
            scan_concurrency: 200,
            test_url: DEFAULT_TEST_URL.to_string(),
            trace_url: DEFAULT_TRACE_URL.to_string(),
            skip_blocked: true,
        }
    }
}

impl Settings {
    /// Checks the numeric knobs. URLs are checked where they are parsed.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.port == 0 {
            return Err(ConfigError::Zero("port"));
        }
        if self.download_threads == 0 {
            return Err(ConfigError::Zero("download threads"));
        }
        if self.result_quota == 0 {
            return Err(ConfigError::Zero("result quota"));
        }
        if self.duration_secs == 0 {
            return Err(ConfigError::Zero("duration"));
        }
        if self.scan_concurrency == 0 {
            return Err(ConfigError::Zero("scan concurrency"));
        }
        if !self.stop_threshold.is_finite() || self.stop_threshold < 0.0 {
            return Err(ConfigError::Threshold(self.stop_threshold));
        }
        Ok(())
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert_eq!(Settings::default().validate(), Ok(()));
    }

    #[test]
    fn zero_knobs_are_rejected() {
        let cfg = Settings {
            result_quota: 0,
            ..Settings::default()
        };
        assert_eq!(cfg.validate(), Err(ConfigError::Zero("result quota")));

        let cfg = Settings {
            download_threads: 0,
            ..Settings::default()
        };
        assert_eq!(cfg.validate(), Err(ConfigError::Zero("download threads")));
    }

    #[test]
    fn threshold_must_be_finite() {
        let cfg = Settings {
            stop_threshold: f64::NAN,
            ..Settings::default()
        };
        assert!(matches!(cfg.validate(), Err(ConfigError::Threshold(_))));
    }
}
