pub const HELP: &str = r#"Copy a finished build into the hardware repo.

Usage:
    bitforge deploy [options] [device]

Options:
    <device>              device to deploy, or 'all' for every device
    --commit              commit the deployment in the hardware repo
    --for-gitlab          run with pipeline branch names and push the commit
    --dry-run             go through the checks without changing anything
    --no-branch-confirm   skip the branch mismatch confirmation
    --allow-dirty         skip the dirty-tree confirmation
    --help, -h            print help information
"#;
