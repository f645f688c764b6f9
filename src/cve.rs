//! CVE identifier extraction.
//!
//! Advisory pages mention CVE identifiers in free text, tables and links.
//! The [`CveExtractor`] finds them, drops the placeholders commonly used in
//! examples (`CVE-2000-0000`, `CVE-9999-...`) and the identifiers whose year
//! can't be real, and returns each remaining identifier once.

use std::collections::HashSet;

use log::trace;
use regex::Regex;

/// The validation policy applied to every lexically valid candidate.
#[derive(Clone, Debug, PartialEq)]
pub struct CveFilter {
    /// The oldest year accepted, inclusive.
    pub min_year: u32,
    /// The most recent year accepted, inclusive.
    pub max_year: u32,
    /// Years that only appear in placeholders.
    pub sentinel_years: Vec<String>,
    /// Sequence numbers that only appear in placeholders.
    pub sentinel_sequences: Vec<String>,
}

impl Default for CveFilter {
    fn default() -> Self {
        CveFilter {
            min_year: 1999,
            max_year: 2030,
            sentinel_years: vec!["0000".to_string(), "9999".to_string()],
            sentinel_sequences: vec!["0000".to_string(), "9999".to_string()],
        }
    }
}

impl CveFilter {
    /// Checks an upper-cased `CVE-YYYY-NNNN` token against the policy.
    pub fn accepts(&self, cve: &str) -> bool {
        let mut parts = cve.splitn(3, '-').skip(1);
        let (year, sequence) = match (parts.next(), parts.next()) {
            (Some(y), Some(s)) => (y, s),
            _ => return false,
        };

        if self.sentinel_years.iter().any(|s| s == year)
            || self.sentinel_sequences.iter().any(|s| s == sequence)
        {
            trace!("{} is a placeholder, ignored", cve);
            return false;
        }

        match year.parse::<u32>() {
            Ok(y) => y >= self.min_year && y <= self.max_year,
            Err(_) => false,
        }
    }
}

/// Finds CVE identifiers in text.
pub struct CveExtractor {
    /// The lexical shape of an identifier
    regex: Regex,
    /// What is accepted among the lexical matches
    filter: CveFilter,
}

impl CveExtractor {
    /// Creates an extractor with the default policy.
    pub fn new() -> Self {
        Self::with_filter(CveFilter::default())
    }

    /// Creates an extractor with a custom policy.
    pub fn with_filter(filter: CveFilter) -> Self {
        // The regex is a constant, it can't fail to compile.
        let regex = Regex::new(r"(?i)CVE-(?:19[789]\d|20\d\d)-\d{4,}").unwrap();
        CveExtractor { regex, filter }
    }

    /// Extracts the unique, valid CVE identifiers from a text.
    ///
    /// Identifiers are upper-cased and returned in order of first appearance.
    /// An absent or empty text gives an empty list.
    ///
    /// # Examples
    ///
    /// ```rust
    /// let extractor = advisory_parser::cve::CveExtractor::new();
    /// let cves = extractor.extract("See CVE-2021-1234 and cve-2021-1234.");
    /// assert_eq!(vec!["CVE-2021-1234".to_string()], cves);
    /// assert!(extractor.extract(None).is_empty());
    /// ```
    pub fn extract<'a>(&self, text: impl Into<Option<&'a str>>) -> Vec<String> {
        let text = match text.into() {
            Some(t) if !t.is_empty() => t,
            _ => return Vec::new(),
        };

        let mut seen = HashSet::new();
        let mut cves = Vec::new();
        for rmatch in self.regex.find_iter(text) {
            let cve = rmatch.as_str().to_uppercase();
            if self.filter.accepts(&cve) && seen.insert(cve.clone()) {
                cves.push(cve);
            }
        }
        trace!("Extracted {} CVE(s)", cves.len());
        cves
    }

    /// The policy in use.
    pub fn filter(&self) -> &CveFilter {
        &self.filter
    }
}

impl Default for CveExtractor {
    fn default() -> Self {
        Self::new()
    }
}

/// Extracts CVE identifiers with the default policy.
pub fn extract_cves<'a>(text: impl Into<Option<&'a str>>) -> Vec<String> {
    CveExtractor::new().extract(text)
}
