use colored::Colorize;
use std::path::{Path, PathBuf};

use crate::core::archive;
use crate::core::context::Context;
use crate::core::extgit::{BranchSource, ExtGit};
use crate::core::manifest::Device;
use crate::core::toolchain::{self, Tool};
use crate::core::version::{DesignVersion, Generation};
use crate::error::{Error, Hint, LastError};
use crate::util::anyerror::Fault;
use crate::util::filesystem::into_std_str;
use crate::util::prompt::Confirm;
use crate::util::subprocess::Invoke;

pub const OUTPUT_DIR: &str = "output";
pub const LOG_FILE: &str = "vivado.log";
pub const VERSION_FILE: &str = "version.txt";

const DEFAULT_THREADS: usize = 5;

/// Caller-facing knobs for one build invocation.
#[derive(Debug, PartialEq, Clone)]
pub struct BuildOptions {
    pub branch: Option<String>,
    pub threads: usize,
    pub bd_only: bool,
    pub synth_only: bool,
    pub impl_only: bool,
    pub force: bool,
    pub archive: bool,
    /// Skips the interactive dirty-tree confirmation. Never bypasses the
    /// hard block on committing a deployment from a dirty tree.
    pub allow_dirty: bool,
    pub golden: bool,
    pub release: bool,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            branch: None,
            threads: DEFAULT_THREADS,
            bd_only: false,
            synth_only: false,
            impl_only: false,
            force: false,
            archive: false,
            allow_dirty: false,
            golden: false,
            release: false,
        }
    }
}

impl BuildOptions {
    /// A partial build stops before producing the hardware artifact.
    pub fn is_partial(&self) -> bool {
        self.bd_only || self.synth_only || self.impl_only
    }
}

/// Where a finished (or previously finished) build left its outputs.
///
/// Passed to the deployer instead of letting it re-derive paths from
/// directory conventions.
#[derive(Debug, PartialEq)]
pub struct BuildResult {
    device: String,
    run_dir: PathBuf,
    output_dir: PathBuf,
    design_version: DesignVersion,
    generation: Generation,
}

impl BuildResult {
    /// Reconstructs the result of an earlier build from the conventional
    /// layout, for deploy-only invocations.
    pub fn locate(c: &Context, device: &Device) -> Self {
        let run_dir = c.run_dir(device);
        Self {
            device: device.get_name().to_string(),
            output_dir: run_dir.join(OUTPUT_DIR),
            run_dir,
            design_version: device.get_design_version(),
            generation: device.get_tool_version().generation(),
        }
    }

    pub fn get_device(&self) -> &str {
        &self.device
    }

    pub fn get_run_dir(&self) -> &Path {
        &self.run_dir
    }

    pub fn get_output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn get_design_version(&self) -> &DesignVersion {
        &self.design_version
    }

    pub fn get_generation(&self) -> Generation {
        self.generation
    }
}

/// Sequences one device build: preconditions, tool discovery, the synthesis
/// run itself, and optional archival of the outputs.
pub struct Builder<'a> {
    context: &'a Context,
    options: &'a BuildOptions,
    invoker: &'a dyn Invoke,
}

impl<'a> Builder<'a> {
    pub fn new(context: &'a Context, options: &'a BuildOptions, invoker: &'a dyn Invoke) -> Self {
        Self {
            context,
            options,
            invoker,
        }
    }

    /// Opens the existing project in the vendor gui and returns immediately.
    pub fn open_gui(&self, device: &Device) -> Result<(), Fault> {
        let run_dir = self.context.run_dir(device);
        let project = find_project(&run_dir)?;
        let vivado = toolchain::locate(Tool::Vivado, &device.get_tool_version())?;
        self.invoker.detach(
            &into_std_str(vivado),
            &[into_std_str(project)],
            &run_dir,
        )
    }

    /// Runs the full build sequence for one device.
    pub fn build(&self, device: &Device) -> Result<BuildResult, Fault> {
        let run_dir = self.context.run_dir(device);
        let version = device.get_tool_version();
        let generation = version.generation();
        let design_version = device.get_design_version();
        println!(
            "info: building {} with vivado {} ({})",
            device.get_name(),
            version,
            generation
        );
        println!("info: USR_ACCESS: {}", design_version.usr_access());

        let vivado = toolchain::locate(Tool::Vivado, &version)?;

        let output_dir = prepare_run_dir(&run_dir, self.options.force)?;

        // regenerate the file list after the run dir is recreated so the
        // generator's output survives into the build
        if let Some(generator) = self
            .context
            .get_manifest()
            .get_project()
            .get_filelist_command()
        {
            println!("info: regenerating file list with {:?}", generator);
            self.invoker.invoke(
                generator,
                &[
                    into_std_str(self.context.get_root().to_path_buf()),
                    into_std_str(run_dir.clone()),
                ],
                self.context.get_root(),
                None,
            )?;
        }

        std::fs::write(
            output_dir.join(VERSION_FILE),
            format!("{}\n", design_version),
        )?;

        let stats_file = output_dir.join(stats_file_name(
            &gethostname::gethostname().to_string_lossy(),
            std::env::consts::OS,
            self.options.threads,
        ));

        let args = compose_vivado_args(
            &self.context.build_script(device),
            &output_dir.join(LOG_FILE),
            &device.get_args(),
            &self.context.support_script(),
            &stats_file,
            self.options,
            generation,
            &design_version,
        );

        let mut classify = |line: &str| classify_line(line);
        self.invoker
            .invoke(&into_std_str(vivado), &args, &run_dir, Some(&mut classify))?;

        if self.options.archive == true && self.options.is_partial() == false {
            self.archive_outputs(device, &output_dir)?;
        }

        println!("{}", read_stats(&stats_file)?);
        println!("{}", "Done!".green());

        Ok(BuildResult {
            device: device.get_name().to_string(),
            run_dir,
            output_dir,
            design_version,
            generation,
        })
    }

    /// Pins the source tree and bundles the output files into a tarball.
    fn archive_outputs(&self, device: &Device, output_dir: &Path) -> Result<(), Fault> {
        let git = ExtGit::new().path(self.context.get_root().to_path_buf());
        let app = git.app_name()?;
        let head = git.commit_hash()?;
        let pin = archive::pin_listing(&app, &head, &git.submodule_status()?);
        std::fs::write(output_dir.join(archive::PIN_FILE), pin)?;

        let branch = match &self.options.branch {
            Some(b) => b.clone(),
            None => git.current_branch(BranchSource::Local)?,
        };
        let name = archive::bundle_name(&app, device.get_name(), &branch, &head);
        let tarball = archive::bundle(output_dir, &name)?;
        println!("info: archived outputs to {:?}", tarball);
        Ok(())
    }
}

/// Enforces the clean-tree precondition shared by build and deploy.
///
/// A dirty tree is a hard error when the run will commit a deployment;
/// otherwise the operator may confirm to continue (or `allow_dirty` skips
/// the question).
pub fn check_clean_tree(
    root: &Path,
    deploying: bool,
    committing: bool,
    allow_dirty: bool,
    confirmer: &dyn Confirm,
) -> Result<(), Fault> {
    let git = ExtGit::new().path(root.to_path_buf());
    let (clean, status) = git.is_clean()?;
    if clean == true {
        return Ok(());
    }
    if deploying == true && committing == true {
        eprintln!("{}", "error: cannot commit a deployment from an unclean repo, please clean the following".red().bold());
        println!("{}", status);
        return Err(Error::DirtyRepoCommitBlocked)?;
    }
    println!("{}", "warning: repo is not in a clean state".yellow());
    println!("{}", status);
    if allow_dirty == true {
        println!("{}", "warning: continuing with a dirty tree".yellow());
        return Ok(());
    }
    let suffix = match deploying {
        true => " (the deployment commit message will not be trustworthy)",
        false => "",
    };
    match confirmer.confirm(&format!("would you like to continue anyways{}", suffix))? {
        true => Ok(()),
        false => Err(Error::UserAborted)?,
    }
}

/// Locates exactly one vendor project file beneath `run_dir`.
pub fn find_project(run_dir: &Path) -> Result<PathBuf, Error> {
    let pattern = format!("{}/**/*.xpr", into_std_str(run_dir.to_path_buf()));
    let mut projects: Vec<PathBuf> = match glob::glob(&pattern) {
        Ok(paths) => paths.filter_map(|p| p.ok()).collect(),
        Err(_) => Vec::new(),
    };
    match projects.len() {
        0 => Err(Error::ProjectNotFound(
            run_dir.to_path_buf(),
            Hint::GenerateFirst,
        )),
        1 => Ok(projects.remove(0)),
        n => Err(Error::MultipleProjectsFound(n, run_dir.to_path_buf())),
    }
}

/// Applies the run-directory discipline: an existing directory requires
/// `force`, which deletes and recreates it. Returns the fresh output dir.
fn prepare_run_dir(run_dir: &Path, force: bool) -> Result<PathBuf, Fault> {
    if run_dir.exists() == true {
        if force == false {
            return Err(Error::RunDirExists(run_dir.to_path_buf(), Hint::ForceFlag))?;
        }
        std::fs::remove_dir_all(run_dir)?;
    }
    let output_dir = run_dir.join(OUTPUT_DIR);
    std::fs::create_dir_all(&output_dir)?;
    Ok(output_dir)
}

/// Assembles the vivado batch-mode argument list.
///
/// User-supplied tcl args come first; the fixed positionals ride at the back
/// so the utility script can pop them off without counting.
fn compose_vivado_args(
    build_script: &Path,
    log_file: &Path,
    user_args: &[&String],
    support_script: &Path,
    stats_file: &Path,
    options: &BuildOptions,
    generation: Generation,
    design_version: &DesignVersion,
) -> Vec<String> {
    let as_flag = |b: bool| match b {
        true => String::from("1"),
        false => String::from("0"),
    };
    let mut args: Vec<String> = vec![
        String::from("-mode"),
        String::from("batch"),
        String::from("-notrace"),
        String::from("-log"),
        into_std_str(log_file.to_path_buf()),
        String::from("-nojournal"),
        String::from("-source"),
        into_std_str(build_script.to_path_buf()),
        String::from("-tclargs"),
    ];
    args.extend(user_args.iter().map(|a| a.to_string()));
    args.extend([
        into_std_str(support_script.to_path_buf()),
        into_std_str(stats_file.to_path_buf()),
        options.threads.to_string(),
        as_flag(options.bd_only),
        as_flag(options.synth_only),
        as_flag(options.impl_only),
        as_flag(options.force),
        generation.as_flag().to_string(),
        design_version.usr_access(),
    ]);
    args
}

/// Routes a tool log line to the severity its prefix declares.
fn classify_line(line: &str) {
    if line.starts_with("ERROR:") {
        println!("{}", line.red().bold());
    } else if line.starts_with("CRITICAL WARNING:") {
        println!("{}", line.magenta().bold());
    } else if line.starts_with("WARNING:") {
        println!("{}", line.yellow());
    } else {
        println!("{}", line);
    }
}

/// The stats filename is qualified so runs from different hosts or thread
/// counts never clobber each other.
fn stats_file_name(hostname: &str, platform: &str, threads: usize) -> String {
    format!("stats_{}_{}_p{}.txt", hostname, platform, threads)
}

/// Returns the stats file path followed by its verbatim contents.
fn read_stats(stats_file: &Path) -> Result<String, Error> {
    let contents = std::fs::read_to_string(stats_file).map_err(|e| {
        Error::StatsFileUnreadable(stats_file.to_path_buf(), LastError(e.to_string()))
    })?;
    Ok(format!("{}\n{}", stats_file.display(), contents))
}
