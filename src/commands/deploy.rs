use cliproc::{cli, proc, stage::*};
use cliproc::{Arg, Cli, Help, Subcommand};

use std::env;

use crate::commands::helps::deploy;
use crate::core::builder::{check_clean_tree, BuildResult};
use crate::core::context::Context;
use crate::core::deployer::{DeployOptions, Deployer, CI_MARKER};
use crate::util::prompt::TtyConfirmer;
use crate::util::subprocess::SystemInvoker;

#[derive(Debug, PartialEq)]
pub struct Deploy {
    device: Option<String>,
    for_gitlab: bool,
    commit: bool,
    dry_run: bool,
    no_branch_confirm: bool,
    allow_dirty: bool,
}

impl Subcommand<Context> for Deploy {
    fn interpret<'c>(cli: &'c mut Cli<Memory>) -> cli::Result<Self> {
        cli.help(Help::with(deploy::HELP))?;
        Ok(Deploy {
            // Flags
            for_gitlab: cli.check(Arg::flag("for-gitlab"))?,
            commit: cli.check(Arg::flag("commit"))?,
            dry_run: cli.check(Arg::flag("dry-run"))?,
            no_branch_confirm: cli.check(Arg::flag("no-branch-confirm"))?,
            allow_dirty: cli.check(Arg::flag("allow-dirty"))?,
            // Positionals
            device: cli.get(Arg::positional("device"))?,
        })
    }

    fn execute(self, c: &Context) -> proc::Result {
        let options = self.to_options();
        let devices = c.select_devices(self.device.as_deref())?;
        let invoker = SystemInvoker::new();
        let confirmer = TtyConfirmer;
        let deployer = Deployer::new(c, &options, &invoker, &confirmer);

        check_clean_tree(
            c.get_root(),
            true,
            options.commit,
            self.allow_dirty,
            &confirmer,
        )?;

        for device in devices {
            let build = BuildResult::locate(c, device);
            deployer.deploy(device, &build)?;
        }
        Ok(())
    }
}

impl Deploy {
    fn to_options(&self) -> DeployOptions {
        DeployOptions {
            // pipeline jobs always behave as gitlab deployments
            for_gitlab: self.for_gitlab || env::var_os(CI_MARKER).is_some(),
            commit: self.commit,
            dry_run: self.dry_run,
            no_branch_confirm: self.no_branch_confirm,
        }
    }
}
