use thiserror::Error;

/// Reasons an entry of a range list could not be turned into an [`AddressRange`].
///
/// [`AddressRange`]: crate::network::range::AddressRange
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RangeError {
    #[error("empty range entry")]
    Empty,
    #[error("invalid address in CIDR '{0}'")]
    InvalidCidrAddress(String),
    #[error("invalid prefix in CIDR '{0}'")]
    InvalidPrefix(String),
    #[error("invalid address '{0}'")]
    InvalidAddress(String),
    #[error("only IPv4 ranges are supported: '{0}'")]
    Ipv6(String),
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("{0} must be greater than zero")]
    Zero(&'static str),
    #[error("stop threshold must be a finite, non-negative speed (got {0})")]
    Threshold(f64),
    #[error("invalid {setting} '{url}': {reason}")]
    Url {
        setting: &'static str,
        url: String,
        reason: String,
    },
}
