use std::env;
use std::path::{Path, PathBuf};

use crate::core::manifest::{Device, Manifest, MANIFEST_FILE};
use crate::error::{Error, Hint};
use crate::util::anyerror::Fault;

/// Process-wide state shared by every subcommand: the project root and the
/// loaded manifest.
pub struct Context {
    root: PathBuf,
    manifest: Manifest,
}

impl Context {
    /// Locates the project by walking up from the current directory and loads
    /// its manifest.
    pub fn new() -> Result<Self, Fault> {
        let cwd = env::current_dir()?;
        let root = match Self::find_root(&cwd) {
            Some(p) => p,
            None => return Err(Error::ManifestNotFound)?,
        };
        let manifest = Manifest::load(&root.join(MANIFEST_FILE))?;
        Ok(Self { root, manifest })
    }

    #[cfg(test)]
    pub fn with(root: PathBuf, manifest: Manifest) -> Self {
        Self { root, manifest }
    }

    /// Searches `dir` and every parent for the directory holding the
    /// manifest file.
    pub fn find_root(dir: &Path) -> Option<PathBuf> {
        let mut cwd = dir.to_path_buf();
        loop {
            if cwd.join(MANIFEST_FILE).is_file() {
                return Some(cwd);
            }
            if cwd.pop() == false {
                return None;
            }
        }
    }

    pub fn get_root(&self) -> &Path {
        &self.root
    }

    pub fn get_manifest(&self) -> &Manifest {
        &self.manifest
    }

    /// Expands the device selector into the list of devices to operate on.
    ///
    /// `all` selects every configured device in manifest order. Omitting the
    /// selector is only allowed when exactly one device is configured.
    pub fn select_devices(&self, selector: Option<&str>) -> Result<Vec<&Device>, Error> {
        match selector {
            Some("all") => Ok(self.manifest.get_devices().iter().collect()),
            Some(name) => match self.manifest.get_device(name) {
                Some(dev) => Ok(vec![dev]),
                None => Err(Error::DeviceNotFound(name.to_string(), Hint::DeviceList)),
            },
            None => {
                if self.manifest.get_devices().len() == 1 {
                    Ok(vec![&self.manifest.get_devices()[0]])
                } else {
                    Err(Error::DeviceNotSpecified(Hint::DeviceList))
                }
            }
        }
    }

    /// The absolute run directory for a device build.
    pub fn run_dir(&self, device: &Device) -> PathBuf {
        self.root.join(device.get_run_dir())
    }

    /// The absolute path of the utility tcl handed to every build.
    pub fn support_script(&self) -> PathBuf {
        self.root.join(self.manifest.get_project().get_support_script())
    }

    /// The absolute path of a device's build tcl.
    pub fn build_script(&self, device: &Device) -> PathBuf {
        self.root.join(device.get_script())
    }

    /// The absolute deploy directory, a sibling of the project repository.
    pub fn deploy_dir(&self, device: &Device) -> PathBuf {
        match self.root.parent() {
            Some(parent) => parent.join(device.get_deploy_dir()),
            None => PathBuf::from(device.get_deploy_dir()),
        }
    }
}
