use std::env;
use std::process::ExitCode;

use bitforge::commands::bitforge::Bitforge;
use cliproc::Cli;

fn main() -> ExitCode {
    Cli::default().parse(env::args()).go::<Bitforge>()
}
