//! This module declares all the vendor parsers.
//! A vendor parser knows the layout of one vendor's advisory pages and
//! turns such a page into [`Flaw`]s.
//!
//! [`VENDOR_RULES`] maps URLs to vendors. Some vendors are known but have
//! no parser yet, [`Vendor::parser()`] returns `None` for them.

pub mod chrome;
pub mod flash;
pub mod jenkins;
pub mod mysql;

use std::fmt;

use chrono::NaiveDate;
use regex::Regex;

use crate::errors::Result;
use crate::models::{AdvisoryUrl, ParsedAdvisory};
use crate::readers::http::HttpReader;

/// The vendors whose advisory pages are recognized
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Vendor {
    /// Chrome Releases blog
    Chrome,
    /// Wireshark security advisories, recognized but not parsed yet
    Wireshark,
    /// Adobe Flash Player security bulletins
    Flash,
    /// Oracle Critical Patch Updates, MySQL section
    MySQL,
    /// Jenkins security advisories, core and plugins
    Jenkins,
    /// phpMyAdmin security announcements, recognized but not parsed yet
    PhpMyAdmin,
}

impl Vendor {
    /// Get the parser of the vendor, `None` if there isn't one yet.
    pub fn parser(&self) -> Option<Box<dyn VendorParser>> {
        match self {
            Vendor::Chrome => Some(Box::new(chrome::ChromeParser::new())),
            Vendor::Flash => Some(Box::new(flash::FlashParser::new())),
            Vendor::MySQL => Some(Box::new(mysql::MySQLParser::new())),
            Vendor::Jenkins => Some(Box::new(jenkins::JenkinsParser::new())),
            Vendor::Wireshark | Vendor::PhpMyAdmin => None,
        }
    }
}

impl fmt::Display for Vendor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Vendor::Chrome => "Chrome",
            Vendor::Wireshark => "Wireshark",
            Vendor::Flash => "Flash Player",
            Vendor::MySQL => "MySQL",
            Vendor::Jenkins => "Jenkins",
            Vendor::PhpMyAdmin => "phpMyAdmin",
        };
        write!(f, "{}", name)
    }
}

/// Associates a literal substring of the URL with a vendor
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct VendorRule {
    /// What the URL must contain
    pub pattern: &'static str,
    /// The vendor selected when it does
    pub vendor: Vendor,
}

/// The rules, in priority order. The first matching rule wins.
pub const VENDOR_RULES: &[VendorRule] = &[
    VendorRule {
        pattern: "chromereleases",
        vendor: Vendor::Chrome,
    },
    VendorRule {
        pattern: "wireshark.org",
        vendor: Vendor::Wireshark,
    },
    VendorRule {
        pattern: "flash-player",
        vendor: Vendor::Flash,
    },
    VendorRule {
        pattern: "oracle.com",
        vendor: Vendor::MySQL,
    },
    VendorRule {
        pattern: "jenkins.io",
        vendor: Vendor::Jenkins,
    },
    VendorRule {
        pattern: "phpmyadmin",
        vendor: Vendor::PhpMyAdmin,
    },
];

/// A common interface between all vendor parsers
pub trait VendorParser {
    /// Fetches the advisory with the reader and extracts its flaws.
    fn parse(&self, url: &AdvisoryUrl, reader: &HttpReader) -> Result<ParsedAdvisory>;

    /// Get the vendor supported by the parser.
    fn vendor(&self) -> Vendor;
}

/// The regex matching dates written like "March 12, 2019".
pub(crate) fn long_date_regex() -> Regex {
    // The regex is a constant
    Regex::new(
        r"(?P<date>(?:January|February|March|April|May|June|July|August|September|October|November|December)\s+\d{1,2},\s+\d{4})",
    )
    .unwrap()
}

/// Finds the first date matched by [`long_date_regex()`] in a text.
///
/// A weekday before the date ("Tuesday, March 12, 2019") is allowed.
pub(crate) fn find_long_date(date_regex: &Regex, text: &str) -> Option<NaiveDate> {
    date_regex.captures_iter(text).find_map(|caps| {
        let date = caps["date"].split_whitespace().collect::<Vec<&str>>().join(" ");
        NaiveDate::parse_from_str(&date, "%B %d, %Y").ok()
    })
}
