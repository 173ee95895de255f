use colored::Colorize;
use std::io;
use std::io::Error;

/// Interactive yes/no capability for gating risky operations.
///
/// The orchestrators take this as a seam so CI and tests can substitute a
/// canned answer instead of reading a tty.
pub trait Confirm {
    fn confirm(&self, question: &str) -> Result<bool, Error>;
}

/// Asks the question on stdout and reads the answer from stdin.
pub struct TtyConfirmer;

impl Confirm for TtyConfirmer {
    fn confirm(&self, question: &str) -> Result<bool, Error> {
        println!("{}? [y/n]", question.yellow());
        check_for_response(&mut io::stdin().lock())
    }
}

/// Answers every question the same way without consulting a tty.
pub struct PresetConfirmer(pub bool);

impl Confirm for PresetConfirmer {
    fn confirm(&self, _: &str) -> Result<bool, Error> {
        Ok(self.0)
    }
}

/// Infinitely loops until a valid response is entered. "Y\n" and "\n" map to `true`, while
/// "N\n" maps to `false`.
///
/// Also supports checking windows-style line endings `\r\n`.
fn check_for_response(input: &mut (impl io::Read + io::BufRead)) -> Result<bool, Error> {
    let mut buffer: String = String::new();
    loop {
        input.read_line(&mut buffer)?;
        let result = match buffer.to_uppercase().as_ref() {
            "\r\n" | "\n" | "Y\n" | "Y\r\n" => Some(true),
            "N\n" | "N\r\n" => Some(false),
            _ => {
                buffer.clear();
                None
            }
        };
        if let Some(r) = result {
            break Ok(r);
        };
    }
}
