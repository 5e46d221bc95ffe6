//! CLI smoke entry point.
//!
//! # Responsibility
//! - Provide a minimal executable to verify `projel_core` linkage.
//! - Optionally audit a persisted store:
//!   `projel_cli <db_path> [storage_key] [log_dir]`.
//! - Keep output deterministic for quick local sanity checks.

use projel_core::db::open_db;
use projel_core::{init_logging_from_config, ProjectStore, SqliteProjectRepository, StoreConfig};
use std::process::ExitCode;

fn main() -> ExitCode {
    println!("projel_core ping={}", projel_core::ping());
    println!("projel_core version={}", projel_core::core_version());

    let Some(config) = config_from_args(std::env::args().skip(1)) else {
        return ExitCode::SUCCESS;
    };

    match run(&config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("projel_cli error: {message}");
            ExitCode::FAILURE
        }
    }
}

/// Positional arguments: database path, then optional storage key and log
/// directory. `None` when no database path was given.
fn config_from_args(mut args: impl Iterator<Item = String>) -> Option<StoreConfig> {
    let database_path = args.next()?;
    let mut config = StoreConfig {
        database_path: Some(database_path.into()),
        ..StoreConfig::default()
    };
    if let Some(storage_key) = args.next() {
        config.storage_key = storage_key;
    }
    config.log_dir = args.next().map(Into::into);
    Some(config)
}

fn run(config: &StoreConfig) -> Result<(), String> {
    config.validate().map_err(|err| err.to_string())?;
    if init_logging_from_config(config)? {
        println!("logging level={}", config.log_level);
    }
    audit_store(config)
}

fn audit_store(config: &StoreConfig) -> Result<(), String> {
    let path = config
        .database_path
        .as_deref()
        .ok_or_else(|| "database path is required".to_string())?;

    let conn = open_db(path).map_err(|err| err.to_string())?;
    let repo = SqliteProjectRepository::try_new(&conn, config.storage_key.as_str())
        .map_err(|err| err.to_string())?;
    let store = ProjectStore::load(repo).map_err(|err| err.to_string())?;

    println!(
        "storage_key={} projects={}",
        config.storage_key,
        store.projects().len()
    );
    for project in store.projects() {
        let violations = store.audit(project.id).map_err(|err| err.to_string())?;
        println!(
            "project={} zones={} locations={} loads={} proposals={} circuits={} violations={}",
            project.id,
            project.zones.len(),
            project.locations.len(),
            project.loads.len(),
            project.proposals.len(),
            project.circuits.len(),
            violations.len()
        );
        for violation in &violations {
            println!("  {violation}");
        }
    }
    Ok(())
}
