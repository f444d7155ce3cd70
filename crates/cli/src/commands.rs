//! Clap command tree definition.

use clap::{Arg, Command};

/// Build the complete CLI command tree.
pub fn build_cli() -> Command {
    Command::new("tether")
        .about("Walk through the persistence session operations")
        .subcommand_required(false)
        .arg(
            Arg::new("db")
                .long("db")
                .help("Data directory for a file-backed store (default: in-memory)")
                .global(true),
        )
        .arg(
            Arg::new("config")
                .long("config")
                .help("Path to a tether.toml selecting the backend")
                .conflicts_with("db")
                .global(true),
        )
        .arg(
            Arg::new("json")
                .long("json")
                .help("JSON output for entities")
                .action(clap::ArgAction::SetTrue)
                .global(true),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Log session and transaction events to stderr")
                .action(clap::ArgAction::SetTrue)
                .global(true),
        )
        .subcommand(
            Command::new("demo")
                .about("Run save, get, load, persist, update, saveOrUpdate, merge, delete, evict and clear in sequence"),
        )
        .subcommand(
            Command::new("show")
                .about("Print a stored person by identity")
                .arg(
                    Arg::new("id")
                        .required(true)
                        .value_parser(clap::value_parser!(u64)),
                ),
        )
}
