use cliproc::{cli, proc, stage::*};
use cliproc::{Arg, Cli, Help, Subcommand};

use std::env;

use crate::commands::helps::build_deploy;
use crate::core::builder::{check_clean_tree, BuildOptions, Builder};
use crate::core::context::Context;
use crate::core::deployer::{DeployOptions, Deployer, CI_MARKER};
use crate::error::Error;
use crate::util::prompt::TtyConfirmer;
use crate::util::subprocess::SystemInvoker;

#[derive(Debug, PartialEq)]
pub struct BuildDeploy {
    device: Option<String>,
    branch: Option<String>,
    threads: Option<usize>,
    force: bool,
    gui: bool,
    archive: bool,
    golden: bool,
    release: bool,
    for_gitlab: bool,
    commit: bool,
    dry_run: bool,
    no_branch_confirm: bool,
    allow_dirty: bool,
}

impl Subcommand<Context> for BuildDeploy {
    fn interpret<'c>(cli: &'c mut Cli<Memory>) -> cli::Result<Self> {
        cli.help(Help::with(build_deploy::HELP))?;
        Ok(BuildDeploy {
            // Flags
            force: cli.check(Arg::flag("force").switch('f'))?,
            gui: cli.check(Arg::flag("gui"))?,
            archive: cli.check(Arg::flag("archive"))?,
            golden: cli.check(Arg::flag("golden"))?,
            release: cli.check(Arg::flag("release"))?,
            for_gitlab: cli.check(Arg::flag("for-gitlab"))?,
            commit: cli.check(Arg::flag("commit"))?,
            dry_run: cli.check(Arg::flag("dry-run"))?,
            no_branch_confirm: cli.check(Arg::flag("no-branch-confirm"))?,
            allow_dirty: cli.check(Arg::flag("allow-dirty"))?,
            // Options
            branch: cli.get(Arg::option("branch").value("name"))?,
            threads: cli.get(Arg::option("threads").value("num"))?,
            // Positionals
            device: cli.get(Arg::positional("device"))?,
        })
    }

    fn execute(self, c: &Context) -> proc::Result {
        // an interactive session cannot be followed by a deployment
        if self.gui == true {
            return Err(Error::GuiWithDeploy)?;
        }
        let build_options = self.to_build_options();
        let deploy_options = self.to_deploy_options();
        let devices = c.select_devices(self.device.as_deref())?;
        let invoker = SystemInvoker::new();
        let confirmer = TtyConfirmer;
        let builder = Builder::new(c, &build_options, &invoker);
        let deployer = Deployer::new(c, &deploy_options, &invoker, &confirmer);

        check_clean_tree(
            c.get_root(),
            true,
            deploy_options.commit,
            self.allow_dirty,
            &confirmer,
        )?;

        for device in devices {
            let build = builder.build(device)?;
            deployer.deploy(device, &build)?;
        }
        Ok(())
    }
}

impl BuildDeploy {
    fn to_build_options(&self) -> BuildOptions {
        BuildOptions {
            branch: self.branch.clone(),
            threads: self.threads.unwrap_or(BuildOptions::default().threads),
            force: self.force,
            archive: self.archive,
            allow_dirty: self.allow_dirty,
            golden: self.golden,
            release: self.release,
            ..Default::default()
        }
    }

    fn to_deploy_options(&self) -> DeployOptions {
        DeployOptions {
            for_gitlab: self.for_gitlab || env::var_os(CI_MARKER).is_some(),
            commit: self.commit,
            dry_run: self.dry_run,
            no_branch_confirm: self.no_branch_confirm,
        }
    }
}
