//! This module contains the main structure and logic for the whole
//! application.

use std::time::Duration;

use clap::Parser;
use log::{debug, error, info, trace};

use crate::errors::Result;
use crate::parser::AdvisoryParser;
use crate::readers::http::FetchConfig;
use crate::writers::json::JsonWriter;
use crate::writers::textstdout::TextStdoutWriter;
use crate::writers::{Writer, Writers};

/// Represents the application
pub struct Application {
    /// The arguments given on the command line.
    argv: Args,
}

impl Application {
    /// Creates a new application from the command line
    pub fn new() -> Self {
        trace!("In Application::new()");
        Self::with_args(Args::parse())
    }

    /// Creates a new application from already parsed arguments
    pub fn with_args(argv: Args) -> Self {
        Application { argv }
    }

    /// The fetch settings matching the arguments
    pub fn fetch_config(&self) -> FetchConfig {
        FetchConfig {
            max_retries: self.argv.max_retries,
            timeout: Duration::from_secs(self.argv.timeout),
            ..FetchConfig::default()
        }
    }

    /// Runs the global application
    pub fn run(&self) -> Result<()> {
        trace!("Running Application::run()");
        let config = self.fetch_config();
        debug!("Fetch configuration: {:?}", config);

        let parser = AdvisoryParser::with_config(config);
        let parsed = parser.parse_from_url(&self.argv.url).map_err(|e| {
            error!("Unable to parse {}: {}", self.argv.url, e);
            e
        })?;

        info!("Parsing finished, writing output");
        let writer: Box<dyn Writer> = match self.argv.writer {
            Writers::TextStdout => Box::new(TextStdoutWriter::new(&self.argv.url)),
            Writers::Json => Box::new(JsonWriter::new(&self.argv.url)),
        };
        writer.write(&parsed);
        Ok(())
    }
}

/// Represents the CLI arguments accepted by the parser
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// The URL of the advisory to parse
    #[arg(short, long, value_name = "URL")]
    pub url: String,
    /// The writer to use
    #[arg(short, long, value_name = "WRITER", default_value = "textstdout")]
    pub writer: Writers,
    /// How many times a failing request is retried
    #[arg(short = 'r', long, value_name = "RETRIES", default_value_t = 3)]
    pub max_retries: u32,
    /// The timeout of each request, in seconds
    #[arg(short, long, value_name = "SECONDS", default_value_t = 30)]
    pub timeout: u64,
}
