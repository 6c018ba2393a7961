//! parcelsat CLI entrypoint.
//!
//! Parses arguments, runs one analysis and prints the JSON response.
//! For programmatic use, prefer the library API (`parcelsat::api`).

use clap::Parser;

mod cli;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = cli::CliArgs::parse();
    cli::run(args)
}
