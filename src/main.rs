use std::process::ExitCode;

use clap::Parser;

use facetint::cli::{self, CliArgs};
use facetint::logger;

fn main() -> ExitCode {
    // Initialize session log (overwrites previous session log)
    logger::init();

    let args = CliArgs::parse();
    cli::run(args)
}
