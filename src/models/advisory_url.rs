//! Advisory URLs
//!
//! An [`AdvisoryUrl`] is the validated form of what the user typed. Bare
//! hostnames get an `https://` scheme, everything that doesn't look like an
//! HTTP(S) URL is rejected.

use std::fmt;
use std::str::FromStr;

use log::{debug, trace};
use url::Url;

use crate::errors::{Error, Result};

/// A validated, scheme-qualified advisory URL
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AdvisoryUrl {
    /// The normalized URL, as typed by the user once trimmed and qualified
    raw: String,
    /// The structural form of the URL
    parsed: Url,
}

impl AdvisoryUrl {
    /// Validates and normalizes a URL.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use advisory_parser::models::AdvisoryUrl;
    ///
    /// let url = AdvisoryUrl::parse("  jenkins.io/security/advisory/2019-03-06/ ").unwrap();
    /// assert_eq!("https://jenkins.io/security/advisory/2019-03-06/", url.as_str());
    /// assert_eq!("jenkins.io", url.host());
    ///
    /// assert!(AdvisoryUrl::parse("https://").is_err());
    /// assert!(AdvisoryUrl::parse("ftp://example.com").is_err());
    /// ```
    pub fn parse(raw: &str) -> Result<Self> {
        trace!("Running AdvisoryUrl::parse()");
        let url = raw.trim();
        if url.is_empty() {
            return Err(Error::InvalidUrl(raw.to_string()));
        }

        let has_scheme = url.starts_with("http://") || url.starts_with("https://");
        if url == "http://" || url == "https://" || (url.contains("://") && !has_scheme) {
            return Err(Error::InvalidUrl(url.to_string()));
        }

        let url = if has_scheme {
            url.to_string()
        } else {
            // Only something that looks like a domain gets a scheme
            if !url.contains('.') || url.starts_with('.') || url.ends_with('.') {
                return Err(Error::InvalidUrl(url.to_string()));
            }
            debug!("No scheme in {}, assuming https", url);
            format!("https://{}", url)
        };

        let parsed = match Url::parse(&url) {
            Ok(parsed) => parsed,
            Err(e) => {
                debug!("Unable to parse {}: {}", url, e);
                return Err(Error::InvalidUrl(url));
            }
        };
        match parsed.host_str() {
            Some(host) if !host.is_empty() && host != "." => {}
            _ => return Err(Error::InvalidUrl(url)),
        }

        Ok(AdvisoryUrl { raw: url, parsed })
    }

    /// The normalized URL
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// The host component, never empty
    pub fn host(&self) -> &str {
        self.parsed.host_str().unwrap_or_default()
    }

    /// The path component
    pub fn path(&self) -> &str {
        self.parsed.path()
    }

    /// Whether the URL contains a literal substring
    pub fn contains(&self, pattern: &str) -> bool {
        self.raw.contains(pattern)
    }
}

impl FromStr for AdvisoryUrl {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        AdvisoryUrl::parse(s)
    }
}

impl fmt::Display for AdvisoryUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.raw)
    }
}
