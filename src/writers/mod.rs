//! Writing parsed advisories
//!
//! Once an advisory has been parsed, it's up to a writer to present the
//! [`Flaw`]s and the warnings. It provides a common interface, allowing to
//! change the output without affecting the parsing.
//!
//! [`Flaw`]: crate::models::Flaw

pub mod json;
pub mod textstdout;

use clap::{builder::PossibleValue, ValueEnum};

use crate::models::ParsedAdvisory;

/// A trait to have a common interface between writers.
pub trait Writer {
    /// Create a new writer for the advisory at the given URL
    fn new(url: &str) -> Self
    where
        Self: Sized;

    /// Formats the parsed advisory
    fn render(&self, parsed: &ParsedAdvisory) -> String;

    /// Writes the parsed advisory on STDOUT
    fn write(&self, parsed: &ParsedAdvisory) {
        println!("{}", self.render(parsed));
    }
}

/// The writers available on the command line
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Writers {
    /// Human-readable text
    TextStdout,
    /// JSON document
    Json,
}

impl ValueEnum for Writers {
    /// Lists the variants available for clap
    fn value_variants<'a>() -> &'a [Self] {
        &[Writers::TextStdout, Writers::Json]
    }

    /// Map each value to a possible value in clap
    fn to_possible_value(&self) -> Option<PossibleValue> {
        match &self {
            Writers::TextStdout => Some(PossibleValue::new("textstdout")),
            Writers::Json => Some(PossibleValue::new("json")),
        }
    }
}
