//! Extracts vulnerability records from vendor security advisory pages.
//!
//! Given the URL of an advisory, the [`AdvisoryParser`] recognizes the
//! vendor, fetches the page and returns the [`Flaw`]s it describes, along
//! with warnings about what couldn't be used.
//!
//! ```no_run
//! let parsed = advisory_parser::parse_from_url(
//!     "https://chromereleases.googleblog.com/2019/03/stable-channel-update-for-desktop.html",
//! )
//! .unwrap();
//! for flaw in parsed.flaws {
//!     println!("{:?} {}", flaw.cves, flaw.summary);
//! }
//! ```
//!
//! [`Flaw`]: models::Flaw

pub mod application;
pub mod cve;
pub mod errors;
pub mod models;
pub mod parser;
pub mod parsers;
pub mod readers;
pub mod writers;

pub use errors::{Error, Result};
pub use models::{Flaw, ParsedAdvisory};
pub use parser::AdvisoryParser;

/// Parses the advisory at the given URL with the default settings.
pub fn parse_from_url(url: &str) -> Result<ParsedAdvisory> {
    AdvisoryParser::new().parse_from_url(url)
}
