use std::env;
use std::path::{Path, PathBuf};
use std::process::Command;

use crate::error::{Error, LastError};

/// Where to learn the current branch name from.
///
/// CI runners check out detached heads, so local `git` queries lie there and
/// the pipeline-provided variables are authoritative instead.
#[derive(Debug, PartialEq, Clone, Copy)]
pub enum BranchSource {
    Local,
    /// Gitlab pipelines: `CI_COMMIT_BRANCH`.
    GitLab,
    /// Jenkins jobs: `BRANCH_NAME`.
    Jenkins,
}

/// A series of git commands ran through subprocesses rather than libgit2 bindings.
///
/// Every query hits the repository fresh; nothing is cached because the tree
/// may change between calls.
pub struct ExtGit {
    command: String,
    root: PathBuf,
}

impl ExtGit {
    /// Creates an empty `ExtGit` struct.
    pub fn new() -> Self {
        Self {
            command: String::from("git"),
            root: PathBuf::new(),
        }
    }

    /// Sets the command for calling git through processes.
    ///
    /// When `s` is `None`, the command assumes git is on path and is simply `git`.
    pub fn command(mut self, s: Option<String>) -> Self {
        self.command = s.unwrap_or(String::from("git"));
        self
    }

    /// Sets the directory from where to call `git`.
    pub fn path(mut self, p: PathBuf) -> Self {
        self.root = p;
        self
    }

    /// Runs a read-only query and captures its trimmed stdout.
    fn capture(&self, args: &[&str]) -> Result<String, Error> {
        let output = Command::new(&self.command)
            .args(args)
            .current_dir(&self.root)
            .output()
            .map_err(|e| Error::VcsQueryFailed(LastError(e.to_string())))?;
        if output.status.success() == false {
            return Err(Error::VcsQueryFailed(LastError(format!(
                "git {}: {}",
                args.join(" "),
                String::from_utf8_lossy(&output.stderr).trim()
            ))));
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    /// Runs a mutating git command, relaying its output to the console.
    fn run(&self, args: &[&str]) -> Result<(), Error> {
        let status = Command::new(&self.command)
            .args(args)
            .current_dir(&self.root)
            .status()
            .map_err(|e| Error::VcsCommandFailed(LastError(e.to_string())))?;
        match status.code() {
            Some(0) => Ok(()),
            Some(num) => Err(Error::VcsCommandFailed(LastError(format!(
                "git {} exited with error code: {}",
                args.join(" "),
                num
            )))),
            None => Err(Error::VcsCommandFailed(LastError(format!(
                "git {} terminated by signal",
                args.join(" ")
            )))),
        }
    }

    /// Checks whether the working tree has pending changes.
    ///
    /// Returns the raw porcelain status text alongside so a dirty tree can be
    /// shown to the operator.
    pub fn is_clean(&self) -> Result<(bool, String), Error> {
        let out = self.capture(&["status", "--porcelain"])?;
        Ok((out.is_empty(), out))
    }

    pub fn current_branch(&self, source: BranchSource) -> Result<String, Error> {
        match source {
            BranchSource::GitLab => env::var("CI_COMMIT_BRANCH").map_err(|_| {
                Error::VcsQueryFailed(LastError(String::from(
                    "CI_COMMIT_BRANCH is not set in this environment",
                )))
            }),
            BranchSource::Jenkins => env::var("BRANCH_NAME").map_err(|_| {
                Error::VcsQueryFailed(LastError(String::from(
                    "BRANCH_NAME is not set in this environment",
                )))
            }),
            BranchSource::Local => self.capture(&["rev-parse", "--abbrev-ref", "HEAD"]),
        }
    }

    /// The full hash of the commit currently checked out.
    pub fn commit_hash(&self) -> Result<String, Error> {
        self.capture(&["log", "--pretty=format:%H", "-n", "1"])
    }

    /// The url of the `origin` remote, e.g. `git@host:group/repo.git`.
    pub fn remote_url(&self) -> Result<String, Error> {
        self.capture(&["config", "--get", "remote.origin.url"])
    }

    /// The top-level directory of the repository containing `self.root`.
    pub fn root_dir(&self) -> Result<PathBuf, Error> {
        Ok(PathBuf::from(
            self.capture(&["rev-parse", "--show-toplevel"])?,
        ))
    }

    /// The commit each recursive submodule is pinned at, as (name, hash) pairs.
    pub fn submodule_status(&self) -> Result<Vec<(String, String)>, Error> {
        Ok(parse_submodule_status(
            &self.capture(&["submodule", "status", "--recursive"])?,
        ))
    }

    /// A browsable link to the currently checked-out commit.
    pub fn commit_url(&self) -> Result<String, Error> {
        Ok(build_commit_url(&self.remote_url()?, &self.commit_hash()?))
    }

    /// The repository name derived from the remote url.
    pub fn app_name(&self) -> Result<String, Error> {
        Ok(remote_stem(&self.remote_url()?))
    }

    /// Stages already-tracked changes beneath `path`.
    pub fn add_update(&self, path: &Path) -> Result<(), Error> {
        self.run(&["add", &path.display().to_string(), "-u"])
    }

    /// Sets the committer identity for this repository only.
    pub fn set_identity(&self, name: &str, email: &str) -> Result<(), Error> {
        self.run(&["config", "user.name", name])?;
        self.run(&["config", "user.email", email])
    }

    pub fn commit(&self, message: &str) -> Result<(), Error> {
        self.run(&["commit", "-m", message])
    }

    pub fn push(&self) -> Result<(), Error> {
        self.run(&["push"])
    }
}

/// Extracts the repository name from a remote url, dropping any `.git` suffix.
pub fn remote_stem(url: &str) -> String {
    let tail = url
        .rsplit(|c| c == '/' || c == ':')
        .next()
        .unwrap_or(url);
    tail.trim_end_matches(".git").to_string()
}

/// Reformats a remote url into a web link for the given commit.
///
/// Scp-style remotes (`git@host:group/repo.git`) are rewritten into
/// `http://host/group/repo`; url-style remotes only lose the `.git` suffix.
pub fn build_commit_url(remote: &str, hash: &str) -> String {
    let base = match remote.contains("://") {
        true => remote.trim_end_matches(".git").to_string(),
        false => format!(
            "http://{}",
            remote
                .trim_start_matches("git@")
                .replacen(':', "/", 1)
                .trim_end_matches(".git")
        ),
    };
    format!("{}/-/commit/{}", base, hash)
}

/// Parses `git submodule status --recursive` output into (name, hash) pairs.
///
/// Each line looks like ` <hash> <path> (<describe>)`, with a one-character
/// state prefix when the submodule is out of sync.
pub fn parse_submodule_status(raw: &str) -> Vec<(String, String)> {
    raw.lines()
        .filter_map(|line| {
            let line = line.trim().trim_start_matches(['+', '-', 'U']);
            let mut fields = line.split_whitespace();
            let hash = fields.next()?;
            let name = fields.next()?;
            Some((name.to_string(), hash.to_string()))
        })
        .collect()
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn remote_stems() {
        assert_eq!(remote_stem("git@gitlab.com:icu/fpga/icu-fpga.git"), "icu-fpga");
        assert_eq!(remote_stem("https://gitlab.com/icu/icu-fpga.git"), "icu-fpga");
        assert_eq!(remote_stem("https://gitlab.com/icu/icu-fpga"), "icu-fpga");
    }

    #[test]
    fn commit_urls() {
        assert_eq!(
            build_commit_url("git@gitlab.com:icu/icu-fpga.git", "abc123"),
            "http://gitlab.com/icu/icu-fpga/-/commit/abc123"
        );
        assert_eq!(
            build_commit_url("https://gitlab.com/icu/icu-fpga.git", "abc123"),
            "https://gitlab.com/icu/icu-fpga/-/commit/abc123"
        );
    }

    #[test]
    fn submodule_listing() {
        let raw = "\
 a1b2c3d4 libs/encoder (v1.2.0)
+e5f6a7b8 libs/uart (heads/main)
-09c8d7e6 libs/dma
";
        let pins = parse_submodule_status(raw);
        assert_eq!(
            pins,
            vec![
                (String::from("libs/encoder"), String::from("a1b2c3d4")),
                (String::from("libs/uart"), String::from("e5f6a7b8")),
                (String::from("libs/dma"), String::from("09c8d7e6")),
            ]
        );
        assert_eq!(parse_submodule_status(""), Vec::new());
    }
}
