pub const HELP: &str = r#"Build and deploy in one step.

Usage:
    bitforge build-deploy [options] [device]

Options:
    <device>              device to process, or 'all' for every device
    --branch <name>       branch name recorded in the archive
    --threads <num>       number of synthesis threads (default: 5)
    --force, -f           delete an existing run directory first
    --archive             bundle outputs into a tarball after the build
    --golden              mark this as a golden build for bootloader fallback
    --release             mark this as a release build
    --commit              commit the deployment in the hardware repo
    --for-gitlab          run with pipeline branch names and push the commit
    --dry-run             deploy checks only, nothing is changed
    --no-branch-confirm   skip the branch mismatch confirmation
    --allow-dirty         skip the dirty-tree confirmation
    --help, -h            print help information
"#;
