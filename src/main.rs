use std::process;

use advisory_parser::application::Application;
use log::LevelFilter;
use simple_logger::SimpleLogger;

fn main() {
    // RUST_LOG overrides the default level
    if let Err(e) = SimpleLogger::new().with_level(LevelFilter::Warn).env().init() {
        eprintln!("Unable to initialize the logger: {}", e);
    }

    let application = Application::new();
    if let Err(e) = application.run() {
        eprintln!("{}", e);
        process::exit(1);
    }
}
