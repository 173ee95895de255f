pub const HELP: &str = r#"Bitforge is a build and deployment tool for fpga designs.

Usage:
    bitforge [options] [command]

Commands:
    build                 synthesize a device's bitstream
    deploy                copy a finished build into the hardware repo
    build-deploy, bd      build and deploy in one step

Options:
    --version             print version information and exit
    --color <when>        coloring: auto, always, never
    --help, -h            print help information

Use 'bitforge <command> --help' for more information about a command.
"#;
