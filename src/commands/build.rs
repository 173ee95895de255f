use cliproc::{cli, proc, stage::*};
use cliproc::{Arg, Cli, Help, Subcommand};

use crate::commands::helps::build;
use crate::core::builder::{check_clean_tree, BuildOptions, Builder};
use crate::core::context::Context;
use crate::error::Error;
use crate::util::prompt::TtyConfirmer;
use crate::util::subprocess::SystemInvoker;

#[derive(Debug, PartialEq)]
pub struct Build {
    device: Option<String>,
    branch: Option<String>,
    threads: Option<usize>,
    bd_only: bool,
    synth_only: bool,
    impl_only: bool,
    force: bool,
    gui: bool,
    archive: bool,
    golden: bool,
    release: bool,
    allow_dirty: bool,
}

impl Subcommand<Context> for Build {
    fn interpret<'c>(cli: &'c mut Cli<Memory>) -> cli::Result<Self> {
        cli.help(Help::with(build::HELP))?;
        Ok(Build {
            // Flags
            bd_only: cli.check(Arg::flag("bd-only"))?,
            synth_only: cli.check(Arg::flag("synth-only"))?,
            impl_only: cli.check(Arg::flag("impl-only"))?,
            force: cli.check(Arg::flag("force").switch('f'))?,
            gui: cli.check(Arg::flag("gui"))?,
            archive: cli.check(Arg::flag("archive"))?,
            golden: cli.check(Arg::flag("golden"))?,
            release: cli.check(Arg::flag("release"))?,
            allow_dirty: cli.check(Arg::flag("allow-dirty"))?,
            // Options
            branch: cli.get(Arg::option("branch").value("name"))?,
            threads: cli.get(Arg::option("threads").value("num"))?,
            // Positionals
            device: cli.get(Arg::positional("device"))?,
        })
    }

    fn execute(self, c: &Context) -> proc::Result {
        let options = self.to_options();
        let devices = c.select_devices(self.device.as_deref())?;
        let invoker = SystemInvoker::new();
        let builder = Builder::new(c, &options, &invoker);

        // the gui path opens an existing project and goes no further
        if self.gui == true {
            if devices.len() != 1 {
                return Err(Error::GuiRequiresOneDevice)?;
            }
            return builder.open_gui(devices[0]);
        }

        check_clean_tree(
            c.get_root(),
            false,
            false,
            options.allow_dirty,
            &TtyConfirmer,
        )?;

        for device in devices {
            builder.build(device)?;
        }
        Ok(())
    }
}

impl Build {
    fn to_options(&self) -> BuildOptions {
        BuildOptions {
            branch: self.branch.clone(),
            threads: self.threads.unwrap_or(BuildOptions::default().threads),
            bd_only: self.bd_only,
            synth_only: self.synth_only,
            impl_only: self.impl_only,
            force: self.force,
            archive: self.archive,
            allow_dirty: self.allow_dirty,
            golden: self.golden,
            release: self.release,
        }
    }
}
