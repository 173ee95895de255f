//! Packs a finished build's reports, logs, and bitstream into a compressed
//! tarball keyed by app, device, branch, and commit.

use std::fs::File;
use std::path::{Path, PathBuf};

use xz2::write::XzEncoder;

use crate::util::anyerror::Fault;

pub const PIN_FILE: &str = "pin.txt";

/// Output files worth keeping around after a build.
const BUNDLED_EXTENSIONS: [&str; 8] = ["rpt", "hdf", "xsa", "bit", "log", "txt", "ltx", "json"];

const XZ_LEVEL: u32 = 6;

/// Branch names may contain separators that are illegal in filenames.
pub fn sanitize_branch(branch: &str) -> String {
    branch.replace('/', "|")
}

/// The tarball filename for a build of `device` at `hash` on `branch`.
pub fn bundle_name(app: &str, device: &str, branch: &str, hash: &str) -> String {
    let short = hash.get(..8).unwrap_or(hash);
    format!(
        "{}-{}-{}.{}.tar.xz",
        app,
        device,
        sanitize_branch(branch),
        short
    )
}

/// Renders the pin listing: the top repository followed by every recursive
/// submodule, as space-joined `name hash` pairs.
pub fn pin_listing(app: &str, head: &str, submodules: &[(String, String)]) -> String {
    let mut pairs = vec![format!("{} {}", app, head)];
    pairs.extend(submodules.iter().map(|(name, hash)| format!("{} {}", name, hash)));
    pairs.join(" ")
}

/// Collects the files under `output_dir` matching the bundled extension set.
pub fn collect_outputs(output_dir: &Path) -> Result<Vec<PathBuf>, Fault> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(output_dir)? {
        let path = entry?.path();
        if path.is_file() == false {
            continue;
        }
        let matched = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| BUNDLED_EXTENSIONS.contains(&e))
            .unwrap_or(false);
        if matched == true {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Writes `<output_dir>/<tar_name>` holding every matching output file at the
/// archive root.
pub fn bundle(output_dir: &Path, tar_name: &str) -> Result<PathBuf, Fault> {
    // gather before creating the target so the tarball never nests itself
    let files = collect_outputs(output_dir)?;
    let target = output_dir.join(tar_name);
    let encoder = XzEncoder::new(File::create(&target)?, XZ_LEVEL);
    let mut builder = tar::Builder::new(encoder);
    for file in &files {
        // archive entries are flat, named by the file only
        let name = file.file_name().unwrap_or_default();
        builder.append_path_with_name(file, name)?;
    }
    builder.into_inner()?.finish()?;
    Ok(target)
}
