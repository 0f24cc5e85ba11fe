//! Clap command tree for the `sandbox` binary.

use clap::{Arg, Command};

/// Build the top-level command.
pub fn build_cli() -> Command {
    Command::new("sandbox")
        .about("Serve engine calls from the host over stdin/stdout")
        .arg(
            Arg::new("config")
                .long("config")
                .value_name("PATH")
                .help("Config file (default: built-in defaults)"),
        )
        .arg(
            Arg::new("log-filter")
                .long("log-filter")
                .value_name("FILTER")
                .help("Log filter when RUST_LOG is unset (overrides the config file)"),
        )
        .arg(
            Arg::new("init-config")
                .long("init-config")
                .help("Write a default config to --config if it does not exist, then exit")
                .action(clap::ArgAction::SetTrue)
                .requires("config"),
        )
        .arg(
            Arg::new("print-default-config")
                .long("print-default-config")
                .help("Print the default config file and exit")
                .action(clap::ArgAction::SetTrue)
                .conflicts_with("init-config"),
        )
}
