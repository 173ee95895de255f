use std::env;
use std::path::PathBuf;

use crate::core::version::ToolVersion;
use crate::error::Error;

/// The external programs this crate knows how to hunt down.
#[derive(Debug, PartialEq, Clone, Copy)]
pub enum Tool {
    Vivado,
    Xsct,
}

impl Tool {
    /// The executable's base name.
    pub fn program(&self) -> &'static str {
        match self {
            Self::Vivado => "vivado",
            Self::Xsct => "xsct",
        }
    }

    /// The keyword spelled into the override environment variable.
    fn env_keyword(&self) -> &'static str {
        match self {
            Self::Vivado => "VIVADO",
            Self::Xsct => "SDK",
        }
    }

    /// The environment variable that overrides discovery for this tool and
    /// version, e.g. `BITFORGE_VIVADO_2019_1_INSTALL_DIR`.
    pub fn env_var(&self, version: &ToolVersion) -> String {
        format!(
            "BITFORGE_{}_{}_INSTALL_DIR",
            self.env_keyword(),
            version.env_fragment()
        )
    }

    /// Install roots the vendor installers use by default.
    fn conventional_roots(&self, version: &ToolVersion) -> Vec<PathBuf> {
        let families: &[&str] = match self {
            Self::Vivado => &["Vivado"],
            // xsct ships under SDK through 2019.1 and Vitis afterwards
            Self::Xsct => &["SDK", "Vitis"],
        };
        let mut roots = Vec::new();
        for family in families {
            for prefix in ["C:/Xilinx", "/opt/Xilinx", "/tools/Xilinx"] {
                roots.push(PathBuf::from(format!(
                    "{}/{}/{}",
                    prefix, family, version
                )));
            }
        }
        roots
    }
}

/// The suffix vendor launch scripts carry on windows installs.
pub fn bin_extension() -> &'static str {
    if cfg!(target_os = "windows") {
        ".bat"
    } else {
        ""
    }
}

/// Resolves the filesystem path of a versioned toolchain binary.
///
/// Search order: a PATH entry following the `.../<version>/bin/<tool>`
/// convention, then the install-dir override environment variable, then the
/// conventional install roots.
pub fn locate(tool: Tool, version: &ToolVersion) -> Result<PathBuf, Error> {
    let binary = format!("{}{}", tool.program(), bin_extension());

    // 1. a matching install already on the search path
    let path_dirs: Vec<PathBuf> = env::var_os("PATH")
        .map(|p| env::split_paths(&p).collect())
        .unwrap_or_default();
    if let Some(hit) = match_on_search_path(&binary, &version.to_string(), path_dirs.into_iter()) {
        return Ok(hit);
    }

    // 2. the explicit override variable
    let var = tool.env_var(version);
    if let Ok(dir) = env::var(&var) {
        let install_dir = PathBuf::from(dir);
        return match install_dir.exists() {
            true => Ok(install_dir.join("bin").join(&binary)),
            false => Err(Error::ToolInstallDirMissing(
                tool.program().to_string(),
                version.to_string(),
                var,
                install_dir,
            )),
        };
    }

    // 3. the usual install locations
    for root in tool.conventional_roots(version) {
        let candidate = root.join("bin").join(&binary);
        if candidate.exists() {
            return Ok(candidate);
        }
    }

    Err(Error::ToolNotFound(
        tool.program().to_string(),
        version.to_string(),
        var,
    ))
}

/// Finds the first `binary` among `dirs` whose grandparent directory is named
/// `version`, the layout vendor installs place on PATH.
fn match_on_search_path(
    binary: &str,
    version: &str,
    dirs: impl Iterator<Item = PathBuf>,
) -> Option<PathBuf> {
    for dir in dirs {
        let candidate = dir.join(binary);
        if candidate.is_file() == false {
            continue;
        }
        // only the first hit counts, mirroring how the shell would resolve it
        let installed_version = dir.parent().and_then(|p| p.file_name());
        return match installed_version {
            Some(v) if v == version => Some(candidate),
            _ => None,
        };
    }
    None
}

#[cfg(test)]
mod test {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn env_var_spelling() {
        let v = ToolVersion::from_str("2019.1").unwrap();
        assert_eq!(
            Tool::Vivado.env_var(&v),
            "BITFORGE_VIVADO_2019_1_INSTALL_DIR"
        );
        // xsct keeps the historical SDK keyword
        assert_eq!(Tool::Xsct.env_var(&v), "BITFORGE_SDK_2019_1_INSTALL_DIR");
    }

    #[test]
    fn search_path_convention() {
        let tmp = tempfile::tempdir().unwrap();
        let bin = tmp.path().join("2019.1").join("bin");
        std::fs::create_dir_all(&bin).unwrap();
        std::fs::write(bin.join("vivado"), "").unwrap();

        // grandparent matches the requested version
        let hit = match_on_search_path("vivado", "2019.1", vec![bin.clone()].into_iter());
        assert_eq!(hit, Some(bin.join("vivado")));

        // the binary on path belongs to a different version
        let miss = match_on_search_path("vivado", "2020.1", vec![bin.clone()].into_iter());
        assert_eq!(miss, None);

        // nothing on path at all
        let none = match_on_search_path(
            "vivado",
            "2019.1",
            vec![tmp.path().join("empty")].into_iter(),
        );
        assert_eq!(none, None);
    }

    #[test]
    fn first_path_hit_wins() {
        let tmp = tempfile::tempdir().unwrap();
        let wrong = tmp.path().join("2018.3").join("bin");
        let right = tmp.path().join("2019.1").join("bin");
        for dir in [&wrong, &right] {
            std::fs::create_dir_all(dir).unwrap();
            std::fs::write(dir.join("vivado"), "").unwrap();
        }
        // shell resolution stops at the first match, so a mismatched version
        // earlier on path hides a matching one later
        let hit = match_on_search_path(
            "vivado",
            "2019.1",
            vec![wrong.clone(), right.clone()].into_iter(),
        );
        assert_eq!(hit, None);
    }

    #[test]
    fn override_var_requires_existing_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let v = ToolVersion::from_str("2031.9").unwrap();
        let var = Tool::Vivado.env_var(&v);

        env::set_var(&var, tmp.path().join("nowhere").display().to_string());
        let err = locate(Tool::Vivado, &v).unwrap_err();
        assert!(matches!(err, Error::ToolInstallDirMissing(_, _, _, _)));

        env::set_var(&var, tmp.path().display().to_string());
        let hit = locate(Tool::Vivado, &v).unwrap();
        assert_eq!(
            hit,
            tmp.path()
                .join("bin")
                .join(format!("vivado{}", bin_extension()))
        );
        env::remove_var(&var);
    }

    #[test]
    fn reports_missing_tool_with_override_hint() {
        // a version nobody has installed
        let v = ToolVersion::from_str("2099.9").unwrap();
        let err = locate(Tool::Xsct, &v).unwrap_err();
        assert_eq!(
            err,
            Error::ToolNotFound(
                String::from("xsct"),
                String::from("2099.9"),
                String::from("BITFORGE_SDK_2099_9_INSTALL_DIR"),
            )
        );
    }
}
