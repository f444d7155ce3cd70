//! Tether CLI: walks through the session operations against a record store.
//!
//! - `tether [demo]` runs the full sequence and prints each step
//! - `tether show <id>` prints one stored person
//!
//! The store is in-memory unless `--db <dir>` or `--config <tether.toml>`
//! selects a file backend.

mod commands;
mod demo;
mod format;

use std::path::Path;
use std::process;

use tether_core::{Identity, Person, Result};
use tether_engine::Database;
use tracing::Level;

use commands::build_cli;
use format::{format_error, format_person, OutputMode};

fn main() {
    let matches = build_cli().get_matches();

    let output_mode = if matches.get_flag("json") {
        OutputMode::Json
    } else {
        OutputMode::Human
    };

    let level = if matches.get_flag("verbose") {
        Level::DEBUG
    } else {
        Level::WARN
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    let db = match open_database(&matches) {
        Ok(db) => db,
        Err(e) => {
            eprintln!("{}", format_error(&e, output_mode));
            process::exit(1);
        }
    };

    let result = match matches.subcommand() {
        Some(("show", sub)) => sub
            .get_one::<u64>("id")
            .copied()
            .map_or(Ok(()), |id| run_show(&db, Identity::new(id), output_mode)),
        _ => {
            let today = chrono::Local::now().date_naive();
            demo::run(&db, today, output_mode, &mut std::io::stdout().lock())
        }
    };

    if let Err(e) = result {
        eprintln!("{}", format_error(&e, output_mode));
        process::exit(1);
    }
}

fn open_database(matches: &clap::ArgMatches) -> Result<Database> {
    if let Some(dir) = matches.get_one::<String>("db") {
        return Database::open(dir);
    }
    if let Some(path) = matches.get_one::<String>("config") {
        return Database::from_config_file(Path::new(path));
    }
    Ok(Database::ephemeral())
}

fn run_show(db: &Database, identity: Identity, mode: OutputMode) -> Result<()> {
    let mut session = db.session();
    match session.get::<Person>(identity)? {
        Some(person) => println!("{}", format_person(&person.get()?, mode)),
        None => println!("(nil)"),
    }
    session.close()
}
