//! The Jenkins parser.
//! This module contains the parser used for the Jenkins security
//! advisories, covering Jenkins core and its plugins.

use std::collections::{BTreeMap, HashMap};

use chrono::NaiveDate;
use log::{debug, info, trace};
use regex::Regex;

use super::{Vendor, VendorParser};
use crate::cve::CveExtractor;
use crate::errors::{Error, Result};
use crate::models::{AdvisoryUrl, Flaw, Impact, ParsedAdvisory};
use crate::readers::http::HttpReader;

/// Headings closing the description of the last issue
const SECTION_HEADINGS: [&str; 3] = ["Severity", "Affected Versions", "Fix"];

/// The parser
pub struct JenkinsParser<'a> {
    /// The regexes used to read the advisory
    regexes: HashMap<&'a str, Regex>,
    /// Finds the CVEs of an issue
    cve_extractor: CveExtractor,
}

impl<'a> JenkinsParser<'a> {
    /// Creates the parser.
    pub fn new() -> Self {
        let mut regexes = HashMap::new();
        // Example: https://jenkins.io/security/advisory/2019-03-06/
        let date_regex =
            Regex::new(r"/security/advisory/(?P<date>\d{4}-\d{2}-\d{2})").unwrap();
        // Example: SECURITY-1321 / CVE-2019-10300
        let issue_regex = Regex::new(r"^(?P<id>SECURITY-\d+)(?:\s*/\s*(?P<rest>.*))?$").unwrap();
        // Example: Jenkins weekly should be updated to version 2.164
        let fix_regex =
            Regex::new(r"^(?P<name>.+?) should be updated to version (?P<version>[\w.\-]+)").unwrap();
        regexes.insert("date", date_regex);
        regexes.insert("issue", issue_regex);
        regexes.insert("fix", fix_regex);
        Self {
            regexes,
            cve_extractor: CveExtractor::new(),
        }
    }

    /// Extracts the flaws from the visible text of an advisory.
    pub fn parse_text(&self, text: &str, url: &str) -> Result<ParsedAdvisory> {
        trace!("Running JenkinsParser::parse_text() on {}", url);
        let public_date = self
            .regexes
            .get("date")
            .expect("Regex \"date\" not found.")
            .captures(url)
            .and_then(|caps| NaiveDate::parse_from_str(&caps["date"], "%Y-%m-%d").ok())
            .ok_or_else(|| {
                Error::Parse(format!("Could not find the publication date in {}", url))
            })?;

        let lines: Vec<&str> = text.lines().map(str::trim).collect();
        let issue_regex = self
            .regexes
            .get("issue")
            .expect("Regex \"issue\" not found.");
        let issue_lines: Vec<usize> = lines
            .iter()
            .enumerate()
            .filter(|(_, line)| issue_regex.is_match(line))
            .map(|(i, _)| i)
            .collect();

        let fixed_in = self.fixed_versions(&lines);
        let mut warnings = Vec::new();
        let mut flaws = Vec::new();

        for (n, &start) in issue_lines.iter().enumerate() {
            let caps = match issue_regex.captures(lines[start]) {
                Some(c) => c,
                None => continue,
            };
            let issue_id = caps["id"].to_string();
            let cves = self
                .cve_extractor
                .extract(caps.name("rest").map(|m| m.as_str()));
            if cves.is_empty() {
                warnings.push(format!("{} has no CVE assigned, skipped", issue_id));
                continue;
            }

            // The issue runs up to the title of the next one
            let end = match issue_lines.get(n + 1) {
                Some(&next) => next.saturating_sub(1),
                None => lines.len(),
            };
            let title = match start.checked_sub(1).map(|i| lines[i]) {
                Some(t) if !t.is_empty() && !issue_regex.is_match(t) => t,
                _ => {
                    warnings.push(format!("{} has no title", issue_id));
                    issue_id.as_str()
                }
            };
            let body = &lines[start + 1..end.max(start + 1)];
            debug!("{} {:?}: {}", issue_id, cves, title);

            let mut flaw = Flaw::new(cves, &format!("jenkins: {}", title), url);
            flaw.public_date = Some(public_date);
            flaw.advisory_id = Some(issue_id.clone());
            flaw.impact = body
                .iter()
                .find_map(|line| line.strip_prefix("Severity (CVSS):"))
                .and_then(Impact::from_severity);
            flaw.description = description(body);
            flaw.fixed_in = fixed_in.clone();
            flaws.push(flaw);
        }

        if flaws.is_empty() {
            return Err(Error::Parse(format!("No CVEs found in {}", url)));
        }

        info!("{} Jenkins flaw(s) found", flaws.len());
        Ok(ParsedAdvisory::new(flaws, warnings))
    }

    /// Reads the "... should be updated to version ..." lines.
    fn fixed_versions(&self, lines: &[&str]) -> BTreeMap<String, Vec<String>> {
        let fix_regex = self.regexes.get("fix").expect("Regex \"fix\" not found.");
        let mut fixed_in: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for caps in lines.iter().filter_map(|line| fix_regex.captures(line)) {
            let name = caps["name"].trim();
            // Weekly and LTS releases are both Jenkins core
            let package = if name.starts_with("Jenkins ") {
                "jenkins".to_string()
            } else {
                name.to_lowercase().replace(' ', "-")
            };
            let versions = fixed_in.entry(package).or_default();
            let version = caps["version"].trim_end_matches('.').to_string();
            if !versions.contains(&version) {
                versions.push(version);
            }
        }
        fixed_in
    }
}

/// The text following "Description:", up to the next section heading.
fn description(body: &[&str]) -> Option<String> {
    let start = body.iter().position(|line| line.starts_with("Description:"))?;
    let mut parts = Vec::new();
    let inline = body[start].trim_start_matches("Description:").trim();
    if !inline.is_empty() {
        parts.push(inline);
    }
    for line in &body[start + 1..] {
        if SECTION_HEADINGS.contains(line) {
            break;
        }
        if !line.is_empty() {
            parts.push(*line);
        }
    }
    if parts.is_empty() {
        None
    } else {
        Some(parts.join(" "))
    }
}

impl<'a> VendorParser for JenkinsParser<'a> {
    /// Parses a security advisory.
    fn parse(&self, url: &AdvisoryUrl, reader: &HttpReader) -> Result<ParsedAdvisory> {
        let text = reader.get_text(url.as_str())?;
        self.parse_text(&text, url.as_str())
    }

    /// The vendor supported by the parser
    fn vendor(&self) -> Vendor {
        Vendor::Jenkins
    }
}
