//! The MySQL parser.
//! This module contains the parser used for the MySQL risk matrix of the
//! Oracle Critical Patch Update advisories.

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

/// The number of cells of a risk matrix row, up to the affected versions
const ROW_CELLS: usize = 15;

/// The CVSS 3.0 metrics, in matrix order, with the values they accept.
/// Oracle writes the values in full ("Network", "Un-changed"), the vector
/// uses their first letter.
const CVSS_METRICS: [(&str, &str); 8] = [
    ("AV", "NALP"),
    ("AC", "LH"),
    ("PR", "NLH"),
    ("UI", "NR"),
    ("S", "UC"),
    ("C", "HLN"),
    ("I", "HLN"),
    ("A", "HLN"),
];

/// The parser
pub struct MySQLParser<'a> {
    /// The regexes used to read the advisory
    regexes: HashMap<&'a str, Regex>,
    /// Finds the CVE of a row
    cve_extractor: CveExtractor,
}

impl<'a> MySQLParser<'a> {
    /// Creates the parser.
    pub fn new() -> Self {
        let mut regexes = HashMap::new();
        // Example: https://www.oracle.com/security-alerts/cpuapr2019.html
        let cpu_regex = Regex::new(r"(?i)cpu(?P<month>jan|apr|jul|oct)(?P<year>\d{4})").unwrap();
        // Example: 5.6.43 and prior
        let affected_regex = Regex::new(
            r"(?P<major>\d+)\.(?P<minor>\d+)\.(?P<patch>\d+) and (?:prior|earlier)",
        )
        .unwrap();
        regexes.insert("cpu", cpu_regex);
        regexes.insert("affected-version", affected_regex);
        regexes.insert("long-date", long_date_regex());
        Self {
            regexes,
            cve_extractor: CveExtractor::new(),
        }
    }

    /// Extracts the MySQL flaws from a Critical Patch Update page.
    pub fn parse_document(&self, document: &Html, url: &str) -> Result<ParsedAdvisory> {
        trace!("Running MySQLParser::parse_document() on {}", url);
        let text = html::document_to_text(document);
        let mut warnings = Vec::new();

        let public_date = find_long_date(
            self.regexes
                .get("long-date")
                .expect("Regex \"long-date\" not found."),
            &text,
        )
        .ok_or_else(|| Error::Parse(format!("Could not find the publication date in {}", url)))?;
        let advisory_id = self.advisory_id(url);

        let mut flaws = Vec::new();
        for table in html::tables(document) {
            for row in html::table_rows(table) {
                let cves = match row.first() {
                    Some(cell) => self.cve_extractor.extract(cell.as_str()),
                    None => continue,
                };
                if cves.is_empty() || !row.get(1).map_or(false, |p| p.contains("MySQL")) {
                    continue;
                }
                if row.len() < ROW_CELLS {
                    warnings.push(format!("Skipped an incomplete row: {}", row.join(" | ")));
                    continue;
                }
                debug!("Found MySQL row for {:?}", cves);

                let product = &row[1];
                let component = &row[2];
                let summary = match &advisory_id {
                    Some(id) => format!("mysql: {} unspecified vulnerability ({})", component, id),
                    None => format!("mysql: {} unspecified vulnerability", component),
                };
                let mut flaw = Flaw::new(cves, &summary, url);
                flaw.public_date = Some(public_date);
                flaw.advisory_id = advisory_id.clone();
                flaw.description = Some(format!(
                    "Vulnerability in the {} component of Oracle MySQL (subcomponent: {}).",
                    product, component
                ));

                match row[5].parse::<f32>() {
                    Ok(score) => {
                        flaw.cvss3_score = Some(score);
                        flaw.impact = Some(Impact::from_cvss_score(score));
                    }
                    Err(_) => warnings.push(format!(
                        "Invalid base score \"{}\" for {}",
                        row[5],
                        flaw.cves.join(", ")
                    )),
                }
                match cvss3_vector(&row[6..14]) {
                    Some(vector) => flaw.cvss3 = Some(vector),
                    None => warnings.push(format!(
                        "Invalid CVSS metrics for {}: {}",
                        flaw.cves.join(", "),
                        row[6..14].join(" | ")
                    )),
                }

                let fixed = self.fixed_versions(&row[14]);
                if !fixed.is_empty() {
                    flaw.fixed_in.insert(package_name(product), fixed);
                }
                flaws.push(flaw);
            }
        }

        if flaws.is_empty() {
            return Err(Error::Parse(format!("No MySQL CVEs found in {}", url)));
        }

        info!("{} MySQL flaw(s) found", flaws.len());
        Ok(ParsedAdvisory::new(flaws, warnings))
    }

    /// "CPU April 2019" for cpuapr2019 in the URL.
    fn advisory_id(&self, url: &str) -> Option<String> {
        let caps = self
            .regexes
            .get("cpu")
            .expect("Regex \"cpu\" not found.")
            .captures(url)?;
        let month = match caps["month"].to_lowercase().as_str() {
            "jan" => "January",
            "apr" => "April",
            "jul" => "July",
            _ => "October",
        };
        Some(format!("CPU {} {}", month, &caps["year"]))
    }

    /// Turns "5.6.43 and prior, 5.7.25 and prior" into the first versions
    /// not affected, 5.6.44 and 5.7.26. Versions with no successor are skipped.
    fn fixed_versions(&self, affected: &str) -> Vec<String> {
        self.regexes
            .get("affected-version")
            .expect("Regex \"affected-version\" not found.")
            .captures_iter(affected)
            .filter_map(|caps| {
                let patch = caps["patch"].parse::<u32>().ok()?.checked_add(1)?;
                Some(format!("{}.{}.{}", &caps["major"], &caps["minor"], patch))
            })
            .collect()
    }
}

/// Builds a CVSS 3.0 vector from the eight metric cells of a row.
fn cvss3_vector(cells: &[String]) -> Option<String> {
    if cells.len() != CVSS_METRICS.len() {
        return None;
    }
    let mut vector = "CVSS:3.0".to_string();
    for ((metric, accepted), cell) in CVSS_METRICS.iter().zip(cells) {
        let value = cell.trim().chars().next()?.to_ascii_uppercase();
        if !accepted.contains(value) {
            return None;
        }
        vector.push_str(&format!("/{}:{}", metric, value));
    }
    Some(vector)
}

/// "MySQL Server" is packaged as mysql, the other products keep their name.
fn package_name(product: &str) -> String {
    if product == "MySQL Server" {
        "mysql".to_string()
    } else {
        product.to_lowercase().replace(' ', "-")
    }
}

impl<'a> VendorParser for MySQLParser<'a> {
    /// Parses a Critical Patch Update page.
    fn parse(&self, url: &AdvisoryUrl, reader: &HttpReader) -> Result<ParsedAdvisory> {
        let document = reader.get_document(url.as_str())?;
        self.parse_document(&document, url.as_str())
    }

    /// The vendor supported by the parser
    fn vendor(&self) -> Vendor {
        Vendor::MySQL
    }
}
