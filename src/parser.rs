//! Dispatching an advisory URL to the right vendor parser.
//!
//! The [`AdvisoryParser`] validates the URL, walks [`VENDOR_RULES`] in order
//! and hands the URL to the parser of the first vendor matching it.

use log::{debug, error, info, trace, warn};

use crate::errors::{Error, Result};
use crate::models::{AdvisoryUrl, ParsedAdvisory};
use crate::parsers::{Vendor, VendorRule, VENDOR_RULES};
use crate::readers::http::{FetchConfig, HttpReader};

/// Parses advisory pages from their URL
pub struct AdvisoryParser {
    /// The rules used to select a vendor, in priority order
    rules: &'static [VendorRule],
    /// The reader given to the vendor parsers
    reader: HttpReader,
}

impl AdvisoryParser {
    /// Creates a parser going over the network with the default settings
    pub fn new() -> Self {
        Self::with_reader(HttpReader::new())
    }

    /// Creates a parser going over the network with the given settings
    pub fn with_config(config: FetchConfig) -> Self {
        Self::with_reader(HttpReader::with_config(config))
    }

    /// Creates a parser on top of the given reader
    pub fn with_reader(reader: HttpReader) -> Self {
        AdvisoryParser {
            rules: VENDOR_RULES,
            reader,
        }
    }

    /// Validates a URL and parses the advisory it points to.
    pub fn parse_from_url(&self, url: &str) -> Result<ParsedAdvisory> {
        trace!("Running AdvisoryParser::parse_from_url()");
        let url = AdvisoryUrl::parse(url)?;
        self.route(&url)
    }

    /// Selects the vendor of an advisory URL, without fetching anything.
    pub fn select(&self, url: &AdvisoryUrl) -> Result<Vendor> {
        match self.rules.iter().find(|rule| url.contains(rule.pattern)) {
            Some(rule) => {
                debug!("{} matches \"{}\", vendor is {}", url, rule.pattern, rule.vendor);
                Ok(rule.vendor)
            }
            None => {
                error!("No vendor rule matches {}", url);
                Err(Error::NoParserFound(url.to_string()))
            }
        }
    }

    /// Parses the advisory with the parser of its vendor.
    pub fn route(&self, url: &AdvisoryUrl) -> Result<ParsedAdvisory> {
        trace!("Running AdvisoryParser::route()");
        let vendor = self.select(url)?;
        let parser = vendor.parser().ok_or_else(|| {
            error!("{} advisories are recognized but not supported", vendor);
            Error::NotImplemented {
                vendor,
                url: url.to_string(),
            }
        })?;

        let parsed = parser.parse(url, &self.reader)?;
        info!(
            "{} flaw(s) found in {} with {} warning(s)",
            parsed.flaws.len(),
            url,
            parsed.warnings.len()
        );
        for warning in &parsed.warnings {
            warn!("{}", warning);
        }
        Ok(parsed)
    }
}

impl Default for AdvisoryParser {
    fn default() -> Self {
        Self::new()
    }
}
