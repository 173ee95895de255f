use colored::Colorize;
use std::path::{Path, PathBuf};

use crate::core::builder::BuildResult;
use crate::core::context::Context;
use crate::core::extgit::{BranchSource, ExtGit};
use crate::core::manifest::Device;
use crate::core::toolchain::{self, Tool};
use crate::core::version::Generation;
use crate::error::{Error, Hint};
use crate::util::anyerror::Fault;
use crate::util::filesystem::into_std_str;
use crate::util::prompt::Confirm;
use crate::util::subprocess::Invoke;

/// Set in the environment of every gitlab pipeline job.
pub const CI_MARKER: &str = "CI_SERVER";

const GITLAB_USER_NAME: &str = "Gitlab Deploy User";
const GITLAB_USER_EMAIL: &str = "gitlab_deploy_user@noreply.gitlab.com";

/// The directory of board support libraries legacy workspaces expect next to
/// the checkout.
const BSP_LIBS_DIR: &str = "zynq_bsp_libs";

/// Caller-facing knobs for one deployment.
#[derive(Debug, PartialEq, Clone, Default)]
pub struct DeployOptions {
    /// Running inside a gitlab pipeline: branch names come from the pipeline
    /// environment and the deployment commit is pushed under the service
    /// identity.
    pub for_gitlab: bool,
    pub commit: bool,
    /// Goes through every check and prints the commit message, but never
    /// copies, regenerates, or commits anything.
    pub dry_run: bool,
    pub no_branch_confirm: bool,
}

/// Copies a build's hardware artifact into the checked-out deployment
/// repository and refreshes the derived workspace there.
pub struct Deployer<'a> {
    context: &'a Context,
    options: &'a DeployOptions,
    invoker: &'a dyn Invoke,
    confirmer: &'a dyn Confirm,
}

impl<'a> Deployer<'a> {
    pub fn new(
        context: &'a Context,
        options: &'a DeployOptions,
        invoker: &'a dyn Invoke,
        confirmer: &'a dyn Confirm,
    ) -> Self {
        Self {
            context,
            options,
            invoker,
            confirmer,
        }
    }

    /// Runs the full deployment sequence for one device's finished build.
    pub fn deploy(&self, device: &Device, build: &BuildResult) -> Result<(), Fault> {
        let deploy_dir = self.context.deploy_dir(device);
        if deploy_dir.is_dir() == false {
            return Err(Error::DeployDirMissing(deploy_dir))?;
        }
        let target = ExtGit::new().path(deploy_dir.clone());
        let checkout = target.root_dir()?;

        let generation = build.get_generation();
        let artifact = find_artifact(build.get_output_dir(), generation)?;
        let destination = deploy_dir.join(artifact.file_name().unwrap_or_default());

        let source = ExtGit::new().path(self.context.get_root().to_path_buf());
        let message = format!("Update hardware from {}", source.commit_url()?);

        // announced before the dry-run branch so a dry run previews the copy
        println!(
            "info: copying {:?} to {:?}",
            artifact.file_name().unwrap_or_default(),
            deploy_dir
        );
        if self.options.dry_run == false {
            if self.options.no_branch_confirm == false {
                self.verify_branches(&source, &target)?;
            }
            std::fs::copy(&artifact, &destination)?;
            let changed_dir = self.regenerate(device, generation, &checkout, &destination)?;
            if self.options.commit == true {
                target.add_update(&changed_dir)?;
                if self.options.for_gitlab == true {
                    target.set_identity(GITLAB_USER_NAME, GITLAB_USER_EMAIL)?;
                }
                target.commit(&message)?;
                if self.options.for_gitlab == true {
                    target.push()?;
                }
                return Ok(());
            }
        }

        let (clean, _) = source.is_clean()?;
        println!("{}", closing_line(clean, &message));
        Ok(())
    }

    /// Confirms with the operator when the build and deployment checkouts sit
    /// on different branches.
    fn verify_branches(&self, source: &ExtGit, target: &ExtGit) -> Result<(), Fault> {
        let branch_source = match self.options.for_gitlab {
            true => BranchSource::GitLab,
            false => BranchSource::Local,
        };
        let ours = source.current_branch(branch_source)?;
        let theirs = target.current_branch(BranchSource::Local)?;
        if ours == theirs {
            return Ok(());
        }
        println!(
            "{}",
            format!(
                "warning: deploying branch '{}' onto a checkout of branch '{}'",
                ours, theirs
            )
            .yellow()
        );
        match self.confirmer.confirm("would you like to continue anyways")? {
            true => Ok(()),
            false => Err(Error::BranchMismatchAborted)?,
        }
    }

    /// Rebuilds the derived software workspace around the new artifact.
    ///
    /// Returns the directory whose changes belong in the deployment commit.
    fn regenerate(
        &self,
        device: &Device,
        generation: Generation,
        checkout: &Path,
        artifact: &Path,
    ) -> Result<PathBuf, Fault> {
        let version = device.get_tool_version();
        let xsct = toolchain::locate(Tool::Xsct, &version)?;
        match generation {
            Generation::Vitis => {
                let platform = checkout
                    .join("projects")
                    .join(device.get_name())
                    .join("platform.tcl");
                self.invoker.invoke(
                    &into_std_str(xsct),
                    &[into_std_str(platform)],
                    checkout,
                    None,
                )?;
                Ok(checkout.join("projects").join(device.get_name()))
            }
            Generation::Sdk => {
                let script = match self.context.get_manifest().get_project().get_sdk_script() {
                    Some(s) => self.context.get_root().join(s),
                    None => return Err(Error::SdkScriptMissing)?,
                };
                // the sdk workspace is two levels above the artifact's landing spot
                let workspace = artifact
                    .parent()
                    .and_then(|p| p.parent())
                    .map(|p| p.to_path_buf())
                    .unwrap_or_default();
                let bsp_libs = checkout
                    .parent()
                    .map(|p| p.join(BSP_LIBS_DIR))
                    .unwrap_or_default();
                self.invoker.invoke(
                    &into_std_str(xsct),
                    &[
                        into_std_str(script),
                        into_std_str(workspace.clone()),
                        into_std_str(bsp_libs),
                        into_std_str(artifact.to_path_buf()),
                    ],
                    checkout,
                    None,
                )?;
                Ok(workspace)
            }
        }
    }
}

/// The operator-facing closing line of a deployment that did not commit.
///
/// The commit message is only trustworthy when it was built from a clean
/// tree; otherwise the operator is told to rebuild instead.
fn closing_line(clean: bool, message: &str) -> String {
    match clean {
        true => message.to_string(),
        false => format!(
            "{}",
            "warning: the source tree was dirty, rebuild from a clean tree before publishing this deployment"
                .yellow()
        ),
    }
}

/// Locates exactly one hardware artifact of the generation's type in a
/// build's output directory.
pub fn find_artifact(output_dir: &Path, generation: Generation) -> Result<PathBuf, Error> {
    let ext = generation.artifact_ext();
    let pattern = format!("{}/*.{}", into_std_str(output_dir.to_path_buf()), ext);
    let mut artifacts: Vec<PathBuf> = match glob::glob(&pattern) {
        Ok(paths) => paths.filter_map(|p| p.ok()).collect(),
        Err(_) => Vec::new(),
    };
    match artifacts.len() {
        0 => Err(Error::ArtifactNotFound(
            ext.to_string(),
            output_dir.to_path_buf(),
            Hint::FullBuild,
        )),
        1 => Ok(artifacts.remove(0)),
        n => Err(Error::MultipleArtifactsFound(
            n,
            ext.to_string(),
            output_dir.to_path_buf(),
        )),
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::core::manifest::Manifest;
    use crate::util::prompt::PresetConfirmer;
    use std::cell::RefCell;
    use std::process::Command;
    use std::str::FromStr;

    struct NoopInvoker {
        calls: RefCell<usize>,
    }

    impl Invoke for NoopInvoker {
        fn invoke(
            &self,
            _command: &str,
            _args: &[String],
            _cwd: &Path,
            _line_handler: Option<&mut dyn FnMut(&str)>,
        ) -> Result<(), Fault> {
            *self.calls.borrow_mut() += 1;
            Ok(())
        }

        fn detach(&self, _command: &str, _args: &[String], _cwd: &Path) -> Result<(), Fault> {
            *self.calls.borrow_mut() += 1;
            Ok(())
        }
    }

    #[test]
    fn artifact_discovery_needs_exactly_one() {
        let tmp = tempfile::tempdir().unwrap();
        let out = tmp.path().to_path_buf();

        assert_eq!(
            find_artifact(&out, Generation::Vitis).unwrap_err(),
            Error::ArtifactNotFound(String::from("xsa"), out.clone(), Hint::FullBuild)
        );

        std::fs::write(out.join("top.xsa"), "").unwrap();
        std::fs::write(out.join("top.bit"), "").unwrap();
        assert_eq!(
            find_artifact(&out, Generation::Vitis).unwrap(),
            out.join("top.xsa")
        );
        // the legacy flow looks for a different extension
        assert_eq!(
            find_artifact(&out, Generation::Sdk).unwrap_err(),
            Error::ArtifactNotFound(String::from("hdf"), out.clone(), Hint::FullBuild)
        );

        std::fs::write(out.join("system.xsa"), "").unwrap();
        assert_eq!(
            find_artifact(&out, Generation::Vitis).unwrap_err(),
            Error::MultipleArtifactsFound(2, String::from("xsa"), out.clone())
        );
    }

    #[test]
    fn missing_deploy_dir_is_fatal() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path().join("fpga");
        std::fs::create_dir_all(&root).unwrap();
        let text = "[[device]]\nname = \"alpha\"\nscript = \"run.tcl\"\n";
        let c = Context::with(root, Manifest::from_str(text).unwrap());
        let device = &c.get_manifest().get_devices()[0];
        let build = BuildResult::locate(&c, device);

        let options = DeployOptions::default();
        let invoker = NoopInvoker {
            calls: RefCell::new(0),
        };
        let err = Deployer::new(&c, &options, &invoker, &PresetConfirmer(true))
            .deploy(device, &build)
            .unwrap_err();
        assert_eq!(
            *err.downcast_ref::<Error>().unwrap(),
            Error::DeployDirMissing(tmp.path().join("hw"))
        );
    }

    fn git(dir: &Path, args: &[&str]) -> bool {
        Command::new("git")
            .args(args)
            .current_dir(dir)
            .output()
            .map(|o| o.status.success())
            .unwrap_or(false)
    }

    #[test]
    fn commit_message_withheld_on_dirty_tree() {
        let msg = "Update hardware from http://gitlab.com/icu/icu-fpga/-/commit/abc123";
        assert_eq!(closing_line(true, msg), msg);
        let warned = closing_line(false, msg);
        assert!(warned.contains(msg) == false);
        assert!(warned.contains("rebuild from a clean tree"));
    }

    #[test]
    fn dry_run_touches_nothing() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path().join("fpga");
        let hw = tmp.path().join("hw");
        std::fs::create_dir_all(&root).unwrap();
        std::fs::create_dir_all(&hw).unwrap();
        if git(&root, &["--version"]) == false {
            return;
        }
        for dir in [&root, &hw] {
            assert!(git(dir, &["init", "-q"]));
            assert!(git(dir, &["config", "user.name", "tester"]));
            assert!(git(dir, &["config", "user.email", "tester@example.com"]));
            assert!(git(dir, &["commit", "--allow-empty", "-q", "-m", "init"]));
        }
        assert!(git(
            &root,
            &["remote", "add", "origin", "git@gitlab.com:icu/icu-fpga.git"]
        ));

        let text = "[[device]]\nname = \"alpha\"\nscript = \"run.tcl\"\nvivado-version = \"2022.2\"\n";
        let c = Context::with(root, Manifest::from_str(text).unwrap());
        let device = &c.get_manifest().get_devices()[0];
        let build = BuildResult::locate(&c, device);
        std::fs::create_dir_all(build.get_output_dir()).unwrap();
        std::fs::write(build.get_output_dir().join("top.xsa"), "bits").unwrap();

        let options = DeployOptions {
            dry_run: true,
            commit: true,
            ..Default::default()
        };
        let invoker = NoopInvoker {
            calls: RefCell::new(0),
        };
        Deployer::new(&c, &options, &invoker, &PresetConfirmer(true))
            .deploy(device, &build)
            .unwrap();

        // nothing copied, nothing regenerated, nothing committed
        assert!(hw.join("top.xsa").exists() == false);
        assert_eq!(*invoker.calls.borrow(), 0);
    }

    /// Stands in for both external tools: the build invocation (spotted by
    /// its `-tclargs`) drops the stats file and a device-named artifact into
    /// the output dir, anything else is only recorded.
    struct FakeToolInvoker {
        calls: RefCell<Vec<(String, Vec<String>, PathBuf)>>,
    }

    impl Invoke for FakeToolInvoker {
        fn invoke(
            &self,
            command: &str,
            args: &[String],
            cwd: &Path,
            _line_handler: Option<&mut dyn FnMut(&str)>,
        ) -> Result<(), Fault> {
            if args.iter().any(|a| a == "-tclargs") {
                let stats = PathBuf::from(&args[args.len() - 8]);
                std::fs::write(&stats, "synth: 1s\n").unwrap();
                let output_dir = stats.parent().unwrap();
                let device = output_dir
                    .parent()
                    .unwrap()
                    .file_name()
                    .unwrap()
                    .to_string_lossy()
                    .to_string();
                std::fs::write(output_dir.join(format!("{}.xsa", device)), "bits").unwrap();
            }
            self.calls
                .borrow_mut()
                .push((command.to_string(), args.to_vec(), cwd.to_path_buf()));
            Ok(())
        }

        fn detach(&self, command: &str, args: &[String], cwd: &Path) -> Result<(), Fault> {
            self.calls
                .borrow_mut()
                .push((command.to_string(), args.to_vec(), cwd.to_path_buf()));
            Ok(())
        }
    }

    #[test]
    fn build_deploy_two_devices_end_to_end() {
        use crate::core::builder::{BuildOptions, Builder};

        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path().join("fpga");
        let hw = tmp.path().join("hw");
        std::fs::create_dir_all(&root).unwrap();
        std::fs::create_dir_all(&hw).unwrap();
        if git(&root, &["--version"]) == false {
            return;
        }
        for dir in [&root, &hw] {
            assert!(git(dir, &["init", "-q"]));
            assert!(git(dir, &["config", "user.name", "tester"]));
            assert!(git(dir, &["config", "user.email", "tester@example.com"]));
            assert!(git(dir, &["commit", "--allow-empty", "-q", "-m", "init"]));
        }
        assert!(git(
            &root,
            &["remote", "add", "origin", "git@gitlab.com:icu/icu-fpga.git"]
        ));

        // tool discovery resolves through the override variables
        let vivado_var = "BITFORGE_VIVADO_2033_1_INSTALL_DIR";
        let sdk_var = "BITFORGE_SDK_2033_1_INSTALL_DIR";
        std::env::set_var(vivado_var, tmp.path().display().to_string());
        std::env::set_var(sdk_var, tmp.path().display().to_string());

        let text = "\
[[device]]
name = \"alpha\"
script = \"tcl/alpha.tcl\"
vivado-version = \"2033.1\"

[[device]]
name = \"beta\"
script = \"tcl/beta.tcl\"
vivado-version = \"2033.1\"
";
        let c = Context::with(root.clone(), Manifest::from_str(text).unwrap());

        let build_options = BuildOptions::default();
        let deploy_options = DeployOptions {
            no_branch_confirm: true,
            ..Default::default()
        };
        let invoker = FakeToolInvoker {
            calls: RefCell::new(Vec::new()),
        };
        let confirmer = PresetConfirmer(true);
        let builder = Builder::new(&c, &build_options, &invoker);
        let deployer = Deployer::new(&c, &deploy_options, &invoker, &confirmer);

        for device in c.select_devices(Some("all")).unwrap() {
            let build = builder.build(device).unwrap();
            deployer.deploy(device, &build).unwrap();
        }
        std::env::remove_var(vivado_var);
        std::env::remove_var(sdk_var);

        // one run dir, one stats file, and one copied artifact per device
        for name in ["alpha", "beta"] {
            let output = root.join("build").join(name).join("output");
            assert!(output.join("version.txt").exists());
            let stats = std::fs::read_dir(&output)
                .unwrap()
                .filter(|e| {
                    e.as_ref()
                        .unwrap()
                        .file_name()
                        .to_string_lossy()
                        .starts_with("stats_")
                })
                .count();
            assert_eq!(stats, 1);
            assert_eq!(
                std::fs::read_to_string(hw.join(format!("{}.xsa", name))).unwrap(),
                "bits"
            );
        }

        // a build then a workspace regeneration per device, in list order
        let calls = invoker.calls.borrow();
        assert_eq!(calls.len(), 4);
        assert!(calls[0].1.iter().any(|a| a == "-tclargs"));
        assert!(calls[1].1[0].ends_with("platform.tcl"));
        assert!(calls[2].1.iter().any(|a| a == "-tclargs"));
        assert!(calls[3].1[0].ends_with("platform.tcl"));
    }
}
