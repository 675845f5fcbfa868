//! Command-line front end: `scan` prints a table, `run` renames and
//! transfers in one go, `transfer` replays a saved table.

mod cli;
mod commands;
mod error;
mod logging;

use clap::Parser;
use cli::Cli;
use std::process::ExitCode;

fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init(cli.verbose);
    match cli.run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {err:?}");
            ExitCode::FAILURE
        },
    }
}
