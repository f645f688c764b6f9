//! The Chrome parser.
//! This module contains the parser used for the stable channel updates
//! published on the Chrome Releases blog.

use std::collections::HashMap;

use log::{debug, info, trace};
use regex::Regex;

use super::{find_long_date, long_date_regex, Vendor, VendorParser};
use crate::cve::CveExtractor;
use crate::errors::{Error, Result};
use crate::models::{AdvisoryUrl, Flaw, Impact, ParsedAdvisory};
use crate::readers::http::HttpReader;

/// The package name used in summaries and fixed versions
const PACKAGE: &str = "chromium-browser";

/// The parser
pub struct ChromeParser<'a> {
    /// The regexes used to read the blog post
    regexes: HashMap<&'a str, Regex>,
    /// Finds the CVEs in a security fix line
    cve_extractor: CveExtractor,
}

impl<'a> ChromeParser<'a> {
    /// Creates the parser.
    /// By doing so, the regexes are compiled once and the parser can be
    /// reused.
    pub fn new() -> Self {
        let mut regexes = HashMap::new();
        // Example: The stable channel has been updated to 73.0.3683.75 for Windows
        let version_regex = Regex::new(r"updated to (?P<version>\d+\.\d+\.\d+\.\d+)").unwrap();
        // Example: [$3000][931681] High CVE-2019-5787: Use after free in Canvas. Reported by Zhe Jin on 2019-01-16
        let fix_regex = Regex::new(
            r"(?m)^(?:\[[^\]]*\]\s*)?\[(?P<bug>\d+)\]\s*(?P<severity>Critical|High|Medium|Low)\s+(?P<cves>[^:]*):\s*(?P<summary>.+?)(?:\.\s+Reported by.*)?$",
        )
        .unwrap();
        regexes.insert("version", version_regex);
        regexes.insert("security-fix", fix_regex);
        regexes.insert("long-date", long_date_regex());
        Self {
            regexes,
            cve_extractor: CveExtractor::new(),
        }
    }

    /// Extracts the flaws from the visible text of a blog post.
    pub fn parse_text(&self, text: &str, url: &str) -> Result<ParsedAdvisory> {
        trace!("Running ChromeParser::parse_text() on {}", url);
        let mut warnings = Vec::new();

        let public_date = find_long_date(
            self.regexes
                .get("long-date")
                .expect("Regex \"long-date\" not found."),
            text,
        )
        .ok_or_else(|| Error::Parse(format!("Could not find the publication date in {}", url)))?;

        let version = self
            .regexes
            .get("version")
            .expect("Regex \"version\" not found.")
            .captures(text)
            .map(|caps| caps["version"].to_string());
        if version.is_none() {
            warnings.push(format!("Could not find the fixed version in {}", url));
        }

        let mut flaws = Vec::new();
        let fix_regex = self
            .regexes
            .get("security-fix")
            .expect("Regex \"security-fix\" not found.");
        for caps in fix_regex.captures_iter(text) {
            let cves = self.cve_extractor.extract(&caps["cves"]);
            if cves.is_empty() {
                warnings.push(format!(
                    "No valid CVE for Chromium bug {}: {}",
                    &caps["bug"],
                    caps["cves"].trim()
                ));
                continue;
            }

            let summary = caps["summary"].trim().trim_end_matches('.');
            debug!("Found {:?}: {}", cves, summary);
            let mut flaw = Flaw::new(cves, &format!("{}: {}", PACKAGE, summary), url);
            flaw.public_date = Some(public_date);
            flaw.impact = Impact::from_severity(&caps["severity"]);
            if let Some(v) = &version {
                flaw.fixed_in.insert(PACKAGE.to_string(), vec![v.clone()]);
            }
            flaws.push(flaw);
        }

        if flaws.is_empty() {
            return Err(Error::Parse(format!("No CVEs found in {}", url)));
        }

        info!("{} Chrome flaw(s) found", flaws.len());
        Ok(ParsedAdvisory::new(flaws, warnings))
    }
}

impl<'a> VendorParser for ChromeParser<'a> {
    /// Parses a blog post.
    fn parse(&self, url: &AdvisoryUrl, reader: &HttpReader) -> Result<ParsedAdvisory> {
        let text = reader.get_text(url.as_str())?;
        self.parse_text(&text, url.as_str())
    }

    /// The vendor supported by the parser
    fn vendor(&self) -> Vendor {
        Vendor::Chrome
    }
}
