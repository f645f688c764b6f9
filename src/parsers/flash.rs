//! The Flash Player parser.
//! This module contains the parser used for the Adobe security bulletins
//! about Flash Player (APSBYY-NN).

use std::collections::HashMap;

use log::{debug, info, trace};
use regex::Regex;
use scraper::Html;

use super::{find_long_date, long_date_regex, Vendor, VendorParser};
use crate::cve::CveExtractor;
use crate::errors::{Error, Result};
use crate::models::{AdvisoryUrl, Flaw, Impact, ParsedAdvisory};
use crate::readers::html;
use crate::readers::http::HttpReader;

/// The package name used in summaries and fixed versions
const PACKAGE: &str = "flash-plugin";

/// Where the columns of the vulnerability table are
struct Columns {
    category: usize,
    impact: usize,
    severity: usize,
    cves: usize,
}

impl Columns {
    /// Reads a header row, `None` if it isn't the vulnerability table's.
    fn from_header(header: &[String]) -> Option<Self> {
        let find = |word: &str| {
            header
                .iter()
                .position(|cell| cell.to_lowercase().contains(word))
        };
        Some(Columns {
            category: find("category")?,
            impact: find("impact")?,
            severity: find("severity")?,
            cves: find("cve")?,
        })
    }

    fn max(&self) -> usize {
        self.category.max(self.impact).max(self.severity).max(self.cves)
    }
}

/// The parser
pub struct FlashParser<'a> {
    /// The regexes used to read the bulletin
    regexes: HashMap<&'a str, Regex>,
    /// Finds the CVEs in a table cell
    cve_extractor: CveExtractor,
}

impl<'a> FlashParser<'a> {
    /// Creates the parser.
    pub fn new() -> Self {
        let mut regexes = HashMap::new();
        // Example: https://helpx.adobe.com/security/products/flash-player/apsb19-06.html
        let bulletin_regex = Regex::new(r"(?i)(?P<id>apsb\d{2}-\d{2,})").unwrap();
        // Example: 32.0.0.142
        let version_regex = Regex::new(r"^(?P<version>\d+\.\d+\.\d+\.\d+)$").unwrap();
        regexes.insert("bulletin-id", bulletin_regex);
        regexes.insert("version", version_regex);
        regexes.insert("long-date", long_date_regex());
        Self {
            regexes,
            cve_extractor: CveExtractor::new(),
        }
    }

    /// Extracts the flaws from a bulletin.
    pub fn parse_document(&self, document: &Html, url: &str) -> Result<ParsedAdvisory> {
        trace!("Running FlashParser::parse_document() on {}", url);
        let text = html::document_to_text(document);
        let mut warnings = Vec::new();

        let public_date = find_long_date(
            self.regexes
                .get("long-date")
                .expect("Regex \"long-date\" not found."),
            &text,
        )
        .ok_or_else(|| Error::Parse(format!("Could not find the publication date in {}", url)))?;

        let bulletin_regex = self
            .regexes
            .get("bulletin-id")
            .expect("Regex \"bulletin-id\" not found.");
        let advisory_id = bulletin_regex
            .captures(url)
            .or_else(|| bulletin_regex.captures(&text))
            .map(|caps| caps["id"].to_uppercase());

        let tables: Vec<Vec<Vec<String>>> = html::tables(document)
            .into_iter()
            .map(html::table_rows)
            .collect();

        let fixed_versions = self.fixed_versions(&tables);
        if fixed_versions.is_empty() {
            warnings.push(format!("Could not find the fixed version in {}", url));
        }

        let mut flaws = Vec::new();
        for rows in &tables {
            let columns = match rows.first().and_then(|h| Columns::from_header(h)) {
                Some(c) => c,
                None => continue,
            };
            debug!("Found the vulnerability table");

            for row in rows.iter().skip(1) {
                if row.len() <= columns.max() {
                    warnings.push(format!("Skipped an incomplete row: {}", row.join(" | ")));
                    continue;
                }
                let cves = self.cve_extractor.extract(row[columns.cves].as_str());
                if cves.is_empty() {
                    warnings.push(format!("No valid CVE in row: {}", row.join(" | ")));
                    continue;
                }

                let summary = format!(
                    "{}: {} leading to {}",
                    PACKAGE,
                    row[columns.category].to_lowercase(),
                    row[columns.impact].to_lowercase()
                );
                let mut flaw = Flaw::new(cves, &summary, url);
                flaw.public_date = Some(public_date);
                flaw.impact = Impact::from_severity(&row[columns.severity]);
                flaw.advisory_id = advisory_id.clone();
                if !fixed_versions.is_empty() {
                    flaw.fixed_in
                        .insert(PACKAGE.to_string(), fixed_versions.clone());
                }
                flaws.push(flaw);
            }
        }

        if flaws.is_empty() {
            return Err(Error::Parse(format!("No CVEs found in {}", url)));
        }

        info!("{} Flash Player flaw(s) found", flaws.len());
        Ok(ParsedAdvisory::new(flaws, warnings))
    }

    /// The versions listed next to a Flash Player product, in the solution
    /// table. Affected versions ("32.0.0.114 and earlier") don't match.
    fn fixed_versions(&self, tables: &[Vec<Vec<String>>]) -> Vec<String> {
        let version_regex = self
            .regexes
            .get("version")
            .expect("Regex \"version\" not found.");
        let mut versions: Vec<String> = Vec::new();
        for row in tables.iter().flatten() {
            if !row.iter().any(|cell| cell.contains("Flash Player")) {
                continue;
            }
            for cell in row {
                if let Some(caps) = version_regex.captures(cell) {
                    let version = caps["version"].to_string();
                    if !versions.contains(&version) {
                        versions.push(version);
                    }
                }
            }
        }
        versions
    }
}

impl<'a> VendorParser for FlashParser<'a> {
    /// Parses a security bulletin.
    fn parse(&self, url: &AdvisoryUrl, reader: &HttpReader) -> Result<ParsedAdvisory> {
        let document = reader.get_document(url.as_str())?;
        self.parse_document(&document, url.as_str())
    }

    /// The vendor supported by the parser
    fn vendor(&self) -> Vendor {
        Vendor::Flash
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    const URL: &str = "https://helpx.adobe.com/security/products/flash-player/apsb19-06.html";

    const BULLETIN: &str = r#"<html><body>
<h1>Security updates available for Adobe Flash Player | APSB19-06</h1>
<table>
  <tr><th>Bulletin ID</th><th>Date Published</th><th>Priority</th></tr>
  <tr><td>APSB19-06</td><td>February 12, 2019</td><td>2</td></tr>
</table>
<h2>Affected Versions</h2>
<table>
  <tr><th>Product</th><th>Version</th><th>Platform</th></tr>
  <tr><td>Adobe Flash Player Desktop Runtime</td><td>32.0.0.114 and earlier versions</td><td>Windows, macOS and Linux</td></tr>
</table>
<h2>Solution</h2>
<table>
  <tr><th>Product</th><th>Version</th><th>Platform</th><th>Priority</th></tr>
  <tr><td>Adobe Flash Player Desktop Runtime</td><td>32.0.0.142</td><td>Windows, macOS</td><td>2</td></tr>
  <tr><td>Adobe Flash Player for Linux</td><td>32.0.0.142</td><td>Linux</td><td>3</td></tr>
</table>
<h2>Vulnerability details</h2>
<table>
  <tr><th>Vulnerability Category</th><th>Vulnerability Impact</th><th>Severity</th><th>CVE Number</th></tr>
  <tr><td>Out-of-bounds Read</td><td>Information Disclosure</td><td>Important</td><td>CVE-2019-7090</td></tr>
  <tr><td>Use After Free</td><td>Arbitrary Code Execution</td><td>Critical</td><td>CVE-2019-7096<br>CVE-2019-7097</td></tr>
  <tr><td>Type Confusion</td><td>Arbitrary Code Execution</td><td>Critical</td><td>Pending</td></tr>
</table>
</body></html>"#;

    fn parse(body: &str) -> Result<ParsedAdvisory> {
        FlashParser::new().parse_document(&Html::parse_document(body), URL)
    }

    #[test]
    fn parses_vulnerability_table() {
        let parsed = parse(BULLETIN).unwrap();
        assert_eq!(2, parsed.flaws.len());

        let first = &parsed.flaws[0];
        assert_eq!(vec!["CVE-2019-7090"], first.cves);
        assert_eq!(
            "flash-plugin: out-of-bounds read leading to information disclosure",
            first.summary
        );
        assert_eq!(Some(Impact::Important), first.impact);
        assert_eq!(Some("APSB19-06".to_string()), first.advisory_id);
        assert_eq!(NaiveDate::from_ymd_opt(2019, 2, 12), first.public_date);
        assert_eq!(
            Some(&vec!["32.0.0.142".to_string()]),
            first.fixed_in.get("flash-plugin")
        );

        let second = &parsed.flaws[1];
        assert_eq!(vec!["CVE-2019-7096", "CVE-2019-7097"], second.cves);
        assert_eq!(Some(Impact::Critical), second.impact);
    }

    #[test]
    fn warns_about_rows_without_cve() {
        let parsed = parse(BULLETIN).unwrap();
        assert_eq!(1, parsed.warnings.len());
        assert!(parsed.warnings[0].contains("Type Confusion"));
    }

    #[test]
    fn bulletin_without_vulnerability_table() {
        let body = "<p>Security updates available for Adobe Flash Player, February 12, 2019</p>";
        assert!(matches!(parse(body), Err(Error::Parse(_))));
    }

    #[test]
    fn bulletin_id_falls_back_to_the_text() {
        let parser = FlashParser::new();
        let document = Html::parse_document(BULLETIN);
        let parsed = parser
            .parse_document(&document, "https://helpx.adobe.com/security/products/flash-player/latest.html")
            .unwrap();
        assert_eq!(Some("APSB19-06".to_string()), parsed.flaws[0].advisory_id);
    }
}
