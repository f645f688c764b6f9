//! Errors returned by the library.
//!
//! Every failure is reported to the immediate caller. The only local
//! recovery is the retry policy of [`crate::readers::http::HttpReader`];
//! once its budget is spent the [`FetchError`] is propagated unchanged.

use std::fmt;

use crate::parsers::Vendor;

/// Shorthand used across the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// The errors a caller can get back when parsing an advisory.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The input is empty, malformed or uses an unsupported scheme.
    #[error("Invalid URL format: {0}")]
    InvalidUrl(String),

    /// The URL is well-formed but no vendor rule matches it.
    #[error("Could not find parser for: {0}")]
    NoParserFound(String),

    /// The URL belongs to a known vendor whose parser doesn't exist yet.
    #[error("Parser for {vendor} advisories is not implemented: {url}")]
    NotImplemented { vendor: Vendor, url: String },

    /// The page could not be retrieved.
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// The page was retrieved but lacks what every advisory of its layout has.
    #[error("Unable to parse advisory: {0}")]
    Parse(String),
}

/// Why the content fetcher gave up.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FetchError {
    /// The request couldn't even be built.
    #[error("Invalid URL specified: {0}")]
    InvalidUrl(String),

    /// A 4xx status, never retried.
    #[error("Failed to GET {url} with status code: {status}")]
    ClientError { url: String, status: u16 },

    /// Every attempt failed with a server or connection error.
    #[error("Failed to GET {url} after {retries} retries: {cause}")]
    RetriesExhausted {
        url: String,
        retries: u32,
        cause: FetchCause,
    },
}

/// The last failure observed before the retry budget ran out.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchCause {
    /// The server answered with a 5xx status.
    Status(u16),
    /// No usable answer at all (DNS, refused connection, timeout, truncated body).
    Connection(String),
}

impl fmt::Display for FetchCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchCause::Status(code) => write!(f, "status code {}", code),
            FetchCause::Connection(reason) => write!(f, "failed to establish connection: {}", reason),
        }
    }
}
