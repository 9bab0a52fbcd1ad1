//! HTTP clients that talk to one specific endpoint.
//!
//! Every candidate serves the same hostname, so DNS is bypassed: the client is
//! pinned to the candidate's address while SNI and the `Host` header keep the
//! service name. Certificates are not validated because the point is to reach a
//! particular address, not to authenticate it.

use std::net::IpAddr;
use std::time::Duration;

use cfst_common::error::ConfigError;
use cfst_common::network::candidate::Candidate;
use reqwest::Url;
use reqwest::blocking::{Client, RequestBuilder};
use reqwest::header::HOST;
use reqwest::redirect::Policy;

pub const MAX_REDIRECTS: usize = 10;

pub const USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) Chrome/120.0 Safari/537.36";

/// A URL whose host is always dialed at the candidate under test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PinnedTarget {
    url: Url,
    host: String,
}

impl PinnedTarget {
    pub fn parse(url: &str) -> Result<Self, ConfigError> {
        Self::parse_setting("URL", url)
    }

    /// Like [`parse`](Self::parse), naming `setting` in the error.
    pub fn parse_setting(setting: &'static str, url: &str) -> Result<Self, ConfigError> {
        let invalid = |reason: &str| ConfigError::Url {
            setting,
            url: url.to_string(),
            reason: reason.to_string(),
        };

        let parsed = Url::parse(url).map_err(|e| invalid(&e.to_string()))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(invalid("scheme must be http or https"));
        }
        let host = parsed
            .host_str()
            .ok_or_else(|| invalid("missing host"))?
            .to_string();

        Ok(Self { url: parsed, host })
    }

    /// Hostname presented through SNI and the `Host` header.
    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    /// The URL to request from `candidate`: same path, candidate's port.
    pub fn url_for(&self, candidate: &Candidate) -> Url {
        let mut url = self.url.clone();
        if self.host.parse::<IpAddr>().is_ok() || self.host.starts_with('[') {
            let _ = url.set_ip_host(IpAddr::V4(candidate.address));
        }
        // Only fails for cannot-be-a-base URLs, which `parse` rejected.
        let _ = url.set_port(Some(candidate.port));
        url
    }

    /// Builds a GET for `candidate` carrying the bare hostname as `Host`.
    pub fn get(&self, client: &Client, candidate: &Candidate) -> RequestBuilder {
        client
            .get(self.url_for(candidate))
            .header(HOST, self.host.as_str())
    }
}

/// Timeouts and pooling for a pinned client.
#[derive(Debug, Clone, Copy)]
pub struct ClientOptions {
    pub connect_timeout: Duration,
    /// Whole-request limit, including reading the body.
    pub timeout: Option<Duration>,
    pub idle_per_host: usize,
}

/// A client that resolves `target`'s host to `candidate` and skips certificate checks.
///
/// Redirects are followed only while they stay on the candidate; a redirect
/// elsewhere is returned as the response.
pub fn pinned_client(
    target: &PinnedTarget,
    candidate: &Candidate,
    options: ClientOptions,
) -> reqwest::Result<Client> {
    Client::builder()
        .resolve(target.host(), candidate.socket_addr())
        .redirect(pinned_redirects(target, candidate))
        .danger_accept_invalid_certs(true)
        .connect_timeout(options.connect_timeout)
        .timeout(options.timeout)
        .pool_max_idle_per_host(options.idle_per_host)
        .user_agent(USER_AGENT)
        .build()
}

fn pinned_redirects(target: &PinnedTarget, candidate: &Candidate) -> Policy {
    let host = target.host().to_string();
    let address = candidate.address.to_string();
    let port = candidate.port;

    Policy::custom(move |attempt| {
        let url = attempt.url();
        let on_candidate = url
            .host_str()
            .is_some_and(|h| h == host || h == address)
            && url.port_or_known_default() == Some(port);

        if attempt.previous().len() >= MAX_REDIRECTS {
            attempt.error("too many redirects")
        } else if on_candidate {
            attempt.follow()
        } else {
            attempt.stop()
        }
    })
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
