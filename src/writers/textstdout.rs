//! Write the parsed advisory to standard output
//! It is the default writer, it presents the flaws in a text
//! format and prints it on STDOUT.

use super::Writer;
use crate::models::{Flaw, ParsedAdvisory};

/// A writer to print the flaws in the terminal.
pub struct TextStdoutWriter {
    /// The URL parsed
    url: String,
}

impl TextStdoutWriter {
    /// Formats one flaw on several lines
    fn render_flaw(flaw: &Flaw) -> String {
        let mut lines = vec![format!("[{}] {}", flaw.cves.join(", "), flaw.summary)];
        if let Some(impact) = flaw.impact {
            lines.push(format!("    Impact: {}", impact));
        }
        if let Some(date) = flaw.public_date {
            lines.push(format!("    Public date: {}", date));
        }
        if let Some(cvss3) = &flaw.cvss3 {
            match flaw.cvss3_score {
                Some(score) => lines.push(format!("    CVSS3: {}/{}", score, cvss3)),
                None => lines.push(format!("    CVSS3: {}", cvss3)),
            }
        }
        for (package, versions) in &flaw.fixed_in {
            lines.push(format!("    Fixed in: {} {}", package, versions.join(", ")));
        }
        if let Some(id) = &flaw.advisory_id {
            lines.push(format!("    Advisory: {}", id));
        }
        if let Some(description) = &flaw.description {
            lines.push(format!("    {}", description));
        }
        lines.join("\n")
    }
}

impl Writer for TextStdoutWriter {
    /// Create a new TextStdoutWriter
    fn new(url: &str) -> Self {
        Self {
            url: url.to_string(),
        }
    }

    /// Formats the flaws, then the warnings
    fn render(&self, parsed: &ParsedAdvisory) -> String {
        let mut out = format!("----------{}----------\n", self.url);
        for flaw in &parsed.flaws {
            out.push('\n');
            out.push_str(&Self::render_flaw(flaw));
            out.push('\n');
        }
        if !parsed.warnings.is_empty() {
            out.push_str("\nWarnings:\n");
            for warning in &parsed.warnings {
                out.push_str(&format!("  - {}\n", warning));
            }
        }
        out
    }
}
