use serde_derive::Deserialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::core::version::{DesignVersion, ToolVersion};
use crate::error::{Error, LastError};

pub const MANIFEST_FILE: &str = "Bitforge.toml";

/// The project manifest found at the root of an FPGA repository.
///
/// Declares the buildable devices and project-wide script locations. All
/// relative paths inside the manifest are resolved against the directory the
/// manifest lives in.
#[derive(Debug, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Manifest {
    #[serde(default)]
    project: Project,
    #[serde(default, rename = "device")]
    devices: Vec<Device>,
}

#[derive(Debug, PartialEq, Default, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct Project {
    name: Option<String>,
    support_script: Option<String>,
    sdk_script: Option<String>,
    filelist_command: Option<String>,
}

/// A named hardware target, statically configured and immutable for the run.
#[derive(Debug, PartialEq, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct Device {
    name: String,
    script: String,
    run_dir: Option<String>,
    deploy_dir: Option<String>,
    vivado_version: Option<ToolVersion>,
    design_version: Option<DesignVersion>,
    part: Option<String>,
    args: Option<Vec<String>>,
}

impl Manifest {
    pub fn load(path: &Path) -> Result<Self, Error> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| Error::ManifestParseFailed(path.to_path_buf(), LastError(e.to_string())))?;
        let man = Self::from_str(&text)
            .map_err(|e| Error::ManifestParseFailed(path.to_path_buf(), LastError(e.to_string())))?;
        man.validate()?;
        Ok(man)
    }

    fn validate(&self) -> Result<(), Error> {
        if self.devices.is_empty() {
            return Err(Error::NoDevicesDefined);
        }
        let mut seen = HashSet::new();
        for dev in &self.devices {
            if seen.insert(dev.name.as_str()) == false {
                return Err(Error::DuplicateDevice(dev.name.clone()));
            }
        }
        Ok(())
    }

    pub fn get_project(&self) -> &Project {
        &self.project
    }

    pub fn get_devices(&self) -> &Vec<Device> {
        &self.devices
    }

    pub fn get_device(&self, name: &str) -> Option<&Device> {
        self.devices.iter().find(|d| d.name == name)
    }
}

impl FromStr for Manifest {
    type Err = toml::de::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        toml::from_str(s)
    }
}

impl Project {
    pub fn get_name(&self) -> Option<&String> {
        self.name.as_ref()
    }

    /// The utility tcl passed as the first fixed positional of every build.
    pub fn get_support_script(&self) -> &str {
        self.support_script.as_deref().unwrap_or("utils.tcl")
    }

    /// The BSP regeneration tcl, only needed for legacy-generation deploys.
    pub fn get_sdk_script(&self) -> Option<&String> {
        self.sdk_script.as_ref()
    }

    /// An external generator that rewrites the file list before each build.
    pub fn get_filelist_command(&self) -> Option<&String> {
        self.filelist_command.as_ref()
    }
}

impl Device {
    pub fn get_name(&self) -> &str {
        &self.name
    }

    pub fn get_script(&self) -> &str {
        &self.script
    }

    /// The run directory relative to the project root, defaulting to the
    /// `build/<name>` convention.
    pub fn get_run_dir(&self) -> PathBuf {
        match &self.run_dir {
            Some(d) => PathBuf::from(d),
            None => PathBuf::from("build").join(&self.name),
        }
    }

    /// The deployment directory name, resolved as a sibling of the project
    /// repository.
    pub fn get_deploy_dir(&self) -> &str {
        self.deploy_dir.as_deref().unwrap_or("hw")
    }

    pub fn get_tool_version(&self) -> ToolVersion {
        self.vivado_version.unwrap_or_default()
    }

    pub fn get_design_version(&self) -> DesignVersion {
        self.design_version.unwrap_or_default()
    }

    pub fn get_part(&self) -> Option<&String> {
        self.part.as_ref()
    }

    /// Extra tcl arguments placed before the fixed positionals.
    pub fn get_args(&self) -> Vec<&String> {
        match &self.args {
            Some(list) => list.iter().collect(),
            None => Vec::new(),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::core::version::Generation;
    use crate::error::Hint;

    const M_1: &str = r#"
[project]
name = "icu-fpga"
support-script = "tcl/utils.tcl"
filelist-command = "genfilelist"

[[device]]
name = "alpha"
script = "tcl/alpha.tcl"
design-version = "1.4.0.1"
vivado-version = "2020.1"
part = "xc7z020clg400-2"
args = ["filelist.tcl"]

[[device]]
name = "beta"
script = "tcl/beta.tcl"
run-dir = "scratch/beta"
deploy-dir = "hw-beta"
"#;

    #[test]
    fn from_toml_string() {
        let man = Manifest::from_str(M_1).unwrap();
        assert_eq!(man.get_project().get_name(), Some(&String::from("icu-fpga")));
        assert_eq!(man.get_project().get_support_script(), "tcl/utils.tcl");
        assert_eq!(man.get_project().get_sdk_script(), None);
        assert_eq!(
            man.get_project().get_filelist_command(),
            Some(&String::from("genfilelist"))
        );
        assert_eq!(man.get_devices().len(), 2);

        let alpha = man.get_device("alpha").unwrap();
        assert_eq!(alpha.get_run_dir(), PathBuf::from("build/alpha"));
        assert_eq!(alpha.get_deploy_dir(), "hw");
        assert_eq!(alpha.get_design_version().usr_access(), "0x01010400");
        assert_eq!(alpha.get_tool_version().generation(), Generation::Vitis);
        assert_eq!(alpha.get_args(), vec![&String::from("filelist.tcl")]);

        let beta = man.get_device("beta").unwrap();
        assert_eq!(beta.get_run_dir(), PathBuf::from("scratch/beta"));
        assert_eq!(beta.get_deploy_dir(), "hw-beta");
        // defaults kick in when fields are omitted
        assert_eq!(beta.get_tool_version().to_string(), "2019.1");
        assert_eq!(beta.get_design_version().to_string(), "0.0.0.0");

        assert_eq!(man.get_device("gamma"), None);
    }

    #[test]
    fn rejects_duplicate_devices() {
        let text = r#"
[[device]]
name = "alpha"
script = "a.tcl"

[[device]]
name = "alpha"
script = "b.tcl"
"#;
        let man = Manifest::from_str(text).unwrap();
        assert_eq!(
            man.validate().unwrap_err(),
            Error::DuplicateDevice(String::from("alpha"))
        );
    }

    #[test]
    fn rejects_empty_device_list() {
        let man = Manifest::from_str("[project]\nname = \"x\"\n").unwrap();
        assert_eq!(man.validate().unwrap_err(), Error::NoDevicesDefined);
    }

    #[test]
    fn rejects_unknown_fields() {
        let text = r#"
[[device]]
name = "alpha"
script = "a.tcl"
speed-grade = "-2"
"#;
        assert!(Manifest::from_str(text).is_err());
    }

    #[test]
    fn hint_is_attached_to_missing_device() {
        // the error type carries the hint so the cli can point at the manifest
        let e = Error::DeviceNotFound(String::from("gamma"), Hint::DeviceList);
        assert!(e.to_string().contains("[[device]]"));
    }
}
