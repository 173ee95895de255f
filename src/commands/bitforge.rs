use cliproc::{cli, proc, stage::*};
use cliproc::{Arg, Cli, Command, Help, Subcommand};

use std::str::FromStr;

use crate::commands::build_deploy::BuildDeploy;
use crate::commands::build::Build;
use crate::commands::deploy::Deploy;
use crate::commands::helps::bitforge;
use crate::core::context::Context;
use crate::util::anyerror::AnyError;

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Debug, PartialEq)]
pub struct Bitforge {
    version: bool,
    command: Option<BitforgeSubcommand>,
}

impl Command for Bitforge {
    fn interpret(cli: &mut Cli<Memory>) -> cli::Result<Self> {
        cli.help(Help::with(bitforge::HELP))?;
        // the coloring mode must be set before anything prints
        match cli
            .get(Arg::option("color").value("when"))?
            .unwrap_or(ColorMode::Auto)
        {
            ColorMode::Always => colored::control::set_override(true),
            ColorMode::Never => colored::control::set_override(false),
            ColorMode::Auto => (),
        }
        Ok(Bitforge {
            version: cli.check(Arg::flag("version"))?,
            command: cli.nest(Arg::subcommand("command"))?,
        })
    }

    fn execute(self) -> proc::Result {
        if self.version == true {
            println!("bitforge {}", VERSION);
            Ok(())
        } else if let Some(command) = self.command {
            // every subcommand runs against a located project
            let context = Context::new()?;
            command.execute(&context)
        } else {
            println!("{}", bitforge::HELP);
            Ok(())
        }
    }
}

#[derive(Debug, PartialEq)]
enum BitforgeSubcommand {
    Build(Build),
    Deploy(Deploy),
    BuildDeploy(BuildDeploy),
}

impl Subcommand<Context> for BitforgeSubcommand {
    fn interpret(cli: &mut Cli<Memory>) -> cli::Result<Self> {
        match cli
            .select(&["build", "deploy", "build-deploy", "bd"])?
            .as_ref()
        {
            "build" => Ok(Self::Build(Build::interpret(cli)?)),
            "deploy" => Ok(Self::Deploy(Deploy::interpret(cli)?)),
            "build-deploy" | "bd" => Ok(Self::BuildDeploy(BuildDeploy::interpret(cli)?)),
            _ => panic!("an unimplemented command was passed through!"),
        }
    }

    fn execute(self, c: &Context) -> proc::Result {
        match self {
            Self::Build(command) => command.execute(c),
            Self::Deploy(command) => command.execute(c),
            Self::BuildDeploy(command) => command.execute(c),
        }
    }
}

#[derive(Debug, PartialEq)]
enum ColorMode {
    Auto,
    Always,
    Never,
}

impl FromStr for ColorMode {
    type Err = AnyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "auto" => Ok(Self::Auto),
            "always" => Ok(Self::Always),
            "never" => Ok(Self::Never),
            _ => Err(AnyError(format!(
                "value must be 'auto', 'always', or 'never' but got '{}'",
                s
            ))),
        }
    }
}
