use std::process::ExitCode;

use clap::Parser;
use paintcore::cli::{self, CliArgs};

fn main() -> ExitCode {
    paintcore::logger::init();
    let args = CliArgs::parse();
    paintcore::log_info!("CLI mode: {} input(s)", args.input.len());
    cli::run(args)
}
