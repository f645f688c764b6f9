//! In this module are declared the entities manipulated by this program

pub mod advisory_url;

use std::collections::BTreeMap;
use std::fmt;

use chrono::NaiveDate;
use serde::Serialize;

pub use advisory_url::AdvisoryUrl;

/// The impact of a flaw, on the four-level scale used to triage it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Impact {
    Low,
    Moderate,
    Important,
    Critical,
}

impl Impact {
    /// Maps a severity word used by a vendor to an impact.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use advisory_parser::models::Impact;
    /// assert_eq!(Some(Impact::Important), Impact::from_severity("High"));
    /// assert_eq!(None, Impact::from_severity("n/a"));
    /// ```
    pub fn from_severity(severity: &str) -> Option<Impact> {
        match severity.trim().to_lowercase().as_str() {
            "critical" => Some(Impact::Critical),
            "high" | "important" => Some(Impact::Important),
            "medium" | "moderate" => Some(Impact::Moderate),
            "low" => Some(Impact::Low),
            _ => None,
        }
    }

    /// Maps a CVSS base score to an impact.
    pub fn from_cvss_score(score: f32) -> Impact {
        if score >= 9.0 {
            Impact::Critical
        } else if score >= 7.0 {
            Impact::Important
        } else if score >= 4.0 {
            Impact::Moderate
        } else {
            Impact::Low
        }
    }
}

impl fmt::Display for Impact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Impact::Low => "low",
            Impact::Moderate => "moderate",
            Impact::Important => "important",
            Impact::Critical => "critical",
        };
        write!(f, "{}", name)
    }
}

/// Represents one vulnerability described by an advisory page
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Flaw {
    /// The CVE identifiers of the flaw
    /// Example: ["CVE-2019-5786"]
    pub cves: Vec<String>,
    /// A one-line summary, prefixed by the affected package
    /// Example: chromium-browser: Use after free in FileReader
    pub summary: String,
    /// When the advisory was published, if the page tells
    pub public_date: Option<NaiveDate>,
    /// The CVSS 3 vector
    /// Example: CVSS:3.0/AV:N/AC:L/PR:L/UI:N/S:U/C:N/I:N/A:H
    pub cvss3: Option<String>,
    /// The CVSS 3 base score
    pub cvss3_score: Option<f32>,
    /// The impact, derived from the vendor's severity
    pub impact: Option<Impact>,
    /// A longer description
    pub description: Option<String>,
    /// The versions fixing the flaw, by package
    /// Example: {"chromium-browser": ["72.0.3626.121"]}
    pub fixed_in: BTreeMap<String, Vec<String>>,
    /// The page the flaw has been extracted from
    pub from_url: String,
    /// The vendor's identifier for the advisory
    /// Example: APSB19-06
    pub advisory_id: Option<String>,
}

impl Flaw {
    /// Creates a new flaw, the optional fields being unset
    pub fn new(cves: Vec<String>, summary: &str, from_url: &str) -> Self {
        Flaw {
            cves,
            summary: summary.to_string(),
            public_date: None,
            cvss3: None,
            cvss3_score: None,
            impact: None,
            description: None,
            fixed_in: BTreeMap::new(),
            from_url: from_url.to_string(),
            advisory_id: None,
        }
    }
}

/// What parsing one advisory page gives: the flaws found, and the
/// warnings about the parts of the page that couldn't be used.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct ParsedAdvisory {
    /// The flaws found on the page
    pub flaws: Vec<Flaw>,
    /// Human-readable messages about what has been skipped
    pub warnings: Vec<String>,
}

impl ParsedAdvisory {
    /// Creates a new result
    pub fn new(flaws: Vec<Flaw>, warnings: Vec<String>) -> Self {
        ParsedAdvisory { flaws, warnings }
    }
}
