pub const HELP: &str = r#"Synthesize a device's bitstream.

Usage:
    bitforge build [options] [device]

Options:
    <device>              device to build, or 'all' for every device
    --branch <name>       branch name recorded in the archive
    --threads <num>       number of synthesis threads (default: 5)
    --bd-only             only generate the block design
    --synth-only          only synthesize, no implementation
    --impl-only           only implement, don't generate a bitstream
    --force, -f           delete an existing run directory first
    --gui                 open the existing project interactively
    --archive             bundle outputs into a tarball after the build
    --golden              mark this as a golden build for bootloader fallback
    --release             mark this as a release build
    --allow-dirty         skip the dirty-tree confirmation
    --help, -h            print help information
"#;
