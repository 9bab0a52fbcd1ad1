//! Detects endpoints that actively reject the test request.
//!
//! This is a coarse check for rate limiting and policy rejections, not a general
//! HTTP error classifier: any transport failure or any status of 400 and above
//! counts as blocked.

use std::fmt;
use std::time::Duration;

use cfst_common::network::candidate::Candidate;
use reqwest::header::CONNECTION;
use tracing::{debug, warn};

use crate::network::http::{self, ClientOptions, PinnedTarget};

const GATE_OPTIONS: ClientOptions = ClientOptions {
    connect_timeout: Duration::from_secs(2),
    timeout: Some(Duration::from_secs(3)),
    idle_per_host: 0,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockReason {
    /// The endpoint answered with this rejecting status.
    Status(u16),
    /// No HTTP response was received.
    Transport,
}

impl fmt::Display for BlockReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlockReason::Status(code) => write!(f, "HTTP {code}"),
            BlockReason::Transport => f.write_str("no response"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateVerdict {
    Open,
    Blocked(BlockReason),
}

impl GateVerdict {
    pub fn is_blocked(&self) -> bool {
        matches!(self, GateVerdict::Blocked(_))
    }
}

/// Classifies a response status. 400 and above is a rejection.
pub fn classify_status(status: u16) -> GateVerdict {
    if status >= 400 {
        GateVerdict::Blocked(BlockReason::Status(status))
    } else {
        GateVerdict::Open
    }
}

/// Sends one `Connection: close` GET for `test` to `candidate`.
pub fn check(candidate: &Candidate, test: &PinnedTarget) -> GateVerdict {
    let client = match http::pinned_client(test, candidate, GATE_OPTIONS) {
        Ok(client) => client,
        Err(e) => {
            warn!("Failed to build gate client for {candidate}: {e}");
            return GateVerdict::Blocked(BlockReason::Transport);
        }
    };

    let verdict = match test.get(&client, candidate).header(CONNECTION, "close").send() {
        Ok(response) => classify_status(response.status().as_u16()),
        Err(e) => {
            debug!("Gate request to {candidate} failed: {e}");
            GateVerdict::Blocked(BlockReason::Transport)
        }
    };

    if let GateVerdict::Blocked(reason) = verdict {
        debug!("{candidate} is blocked ({reason})");
    }
    verdict
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
