#![forbid(unsafe_code)]

//! ckf — cache key finder CLI entry point.

use clap::Parser;
use clap::error::ErrorKind;

mod cli_app;

fn main() {
    let args = match cli_app::Cli::try_parse() {
        Ok(args) => args,
        Err(err) if matches!(err.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            err.exit()
        }
        Err(err) => {
            print!("{}", cli_app::usage_text());
            eprintln!("ckf: {}", err.kind());
            std::process::exit(1);
        }
    };

    if let Err(e) = cli_app::run(&args) {
        if matches!(e, cli_app::CliError::Usage) {
            print!("{}", cli_app::usage_text());
        }
        eprintln!("ckf: {e}");
        std::process::exit(1);
    }
}
