use colored::Colorize;
use std::{fmt::Display, path::PathBuf};

#[derive(Debug, PartialEq, thiserror::Error)]
pub enum Error {
    #[error("no Bitforge.toml manifest found in the current directory or any parent directory")]
    ManifestNotFound,
    #[error("failed to read manifest {0:?}: {1}")]
    ManifestParseFailed(PathBuf, LastError),
    #[error("manifest defines no devices")]
    NoDevicesDefined,
    #[error("device {0:?} is defined more than once in the manifest")]
    DuplicateDevice(String),
    #[error("no device named {0:?}{1}")]
    DeviceNotFound(String, Hint),
    #[error("a device must be selected when more than one is configured{0}")]
    DeviceNotSpecified(Hint),
    #[error("gui mode can only open one device at a time")]
    GuiRequiresOneDevice,
    #[error("gui mode cannot be combined with deployment")]
    GuiWithDeploy,
    #[error("no project file found under {0:?}{1}")]
    ProjectNotFound(PathBuf, Hint),
    #[error("found {0} project files under {1:?}, expected exactly one")]
    MultipleProjectsFound(usize, PathBuf),
    #[error("run directory {0:?} already exists{1}")]
    RunDirExists(PathBuf, Hint),
    #[error("cannot commit a deployment from an unclean repository")]
    DirtyRepoCommitBlocked,
    #[error("{0} {1} not found; run a setup script or set {2}")]
    ToolNotFound(String, String, String),
    #[error("{2} points the {0} {1} install directory at {3:?}, but it does not exist")]
    ToolInstallDirMissing(String, String, String, PathBuf),
    #[error("failed to launch command {0:?}: {1}")]
    CommandLaunchFailed(String, LastError),
    #[error("command {0:?} exited with error code {2} (cwd: {1:?})")]
    CommandFailed(String, PathBuf, i32),
    #[error("command {0:?} terminated by signal")]
    CommandTerminated(String),
    #[error("version control query failed: {0}")]
    VcsQueryFailed(LastError),
    #[error("version control command failed: {0}")]
    VcsCommandFailed(LastError),
    #[error("no .{0} artifact found under {1:?}{2}")]
    ArtifactNotFound(String, PathBuf, Hint),
    #[error("found {0} .{1} artifacts under {2:?}, expected exactly one")]
    MultipleArtifactsFound(usize, String, PathBuf),
    #[error("deploy directory {0:?} does not exist")]
    DeployDirMissing(PathBuf),
    #[error("manifest does not set \"sdk-script\", which is required to deploy a legacy-generation build")]
    SdkScriptMissing,
    #[error("stats file {0:?} was not produced by the build: {1}")]
    StatsFileUnreadable(PathBuf, LastError),
    #[error("operation cancelled by user")]
    UserAborted,
    #[error("branch mismatch rejected by user")]
    BranchMismatchAborted,
}

#[derive(Debug, PartialEq)]
pub struct LastError(pub String);

impl Display for LastError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", Error::lowerize(self.0.to_string()))
    }
}

impl Error {
    pub fn lowerize(s: String) -> String {
        // get the first word
        let first_word = match s.split_whitespace().into_iter().next() {
            Some(w) => w,
            None => return s,
        };
        // retain punctuation if the first word is all-caps and longer than 1 character
        if first_word.len() > 1
            && first_word
                .chars()
                .find(|c| c.is_ascii_lowercase() == true)
                .is_none()
        {
            s.to_string()
        } else {
            s.char_indices()
                .map(|(i, c)| if i == 0 { c.to_ascii_lowercase() } else { c })
                .collect()
        }
    }
}

#[derive(Debug, PartialEq)]
pub enum Hint {
    ForceFlag,
    GenerateFirst,
    DeviceList,
    FullBuild,
}

impl Display for Hint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let message = match self {
            Self::ForceFlag => "use \"--force\" to delete and recreate the run directory",
            Self::GenerateFirst => "the project may need to be generated first",
            Self::DeviceList => {
                "device names are listed in the [[device]] tables of Bitforge.toml, or use \"all\""
            }
            Self::FullBuild => "run a full build (no --bd-only/--synth-only/--impl-only) to produce the hardware artifact",
        };
        write!(
            f,
            "\n\n{}: {}",
            "hint".green(),
            Error::lowerize(message.to_string())
        )
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn lowercases_leading_word() {
        assert_eq!(
            Error::lowerize(String::from("Failed to open file")),
            "failed to open file"
        );
        // all-caps first words are kept as-is
        assert_eq!(
            Error::lowerize(String::from("ERROR: something broke")),
            "ERROR: something broke"
        );
    }

    #[test]
    fn run_dir_exists_message() {
        let e = Error::RunDirExists(PathBuf::from("build/alpha"), Hint::ForceFlag);
        assert!(e.to_string().starts_with("run directory \"build/alpha\" already exists"));
        assert!(e.to_string().contains("--force"));
    }
}
