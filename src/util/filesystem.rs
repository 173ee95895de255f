use std::path::PathBuf;

/// Converts a [`PathBuf`] into a string for use in command arguments.
///
/// Uses forward slashes on every platform because the Xilinx tcl interpreter
/// chokes on backslashed paths.
pub fn into_std_str(path: PathBuf) -> String {
    let mut s = path.display().to_string().replace('\\', "/");
    if s.ends_with('/') {
        s.pop();
    }
    s
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn path_to_argument_string() {
        let p = PathBuf::from("some/run/dir");
        assert_eq!(into_std_str(p), "some/run/dir");

        let p = PathBuf::from("some/run/dir/");
        assert_eq!(into_std_str(p), "some/run/dir");
    }
}
