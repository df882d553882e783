//! relmap demo binary: migrates a SQLite database, seeds sample users and
//! walks through the mapping layer's operations, printing results to stdout.

mod config;
mod demo;

use relmap_store::{seed_sample_data, SeedOutcome, Session};
use tracing_subscriber::EnvFilter;

fn resolve_config_path() -> (String, &'static str) {
    if let Some(path) = std::env::args()
        .nth(1)
        .filter(|value| !value.trim().is_empty())
    {
        return (path, "cli-arg");
    }

    if let Ok(path) = std::env::var("RELMAP_CONFIG_PATH") {
        if !path.trim().is_empty() {
            return (path, "env-var");
        }
    }

    ("relmap.toml".to_string(), "default")
}

fn main() {
    let (config_path, config_source) = resolve_config_path();

    let config = config::load_config(Some(&config_path))
        .expect("failed to load configuration: set database.path or RELMAP_DB_PATH");

    let filter =
        EnvFilter::try_new(&config.logging.level).unwrap_or_else(|_| EnvFilter::new("info"));

    if config.logging.json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    tracing::info!(
        source = config_source,
        path = %config_path,
        "resolved startup configuration path"
    );

    let session = Session::open(&config.database.path, config.db_runtime_settings())
        .expect("failed to open database: check database.path in config");

    session
        .migrate()
        .expect("failed to migrate database schema");

    match seed_sample_data(&session) {
        Ok(SeedOutcome::Seeded {
            users,
            notes,
            credit_cards,
        }) => tracing::info!(users, notes, credit_cards, "seeded sample data"),
        Ok(SeedOutcome::AlreadySeeded { users }) => {
            tracing::info!(users, "sample data already present, skipping seed")
        }
        Err(err) => {
            tracing::error!(error = %err, "failed to seed sample data");
            std::process::exit(1);
        }
    }

    let stdout = std::io::stdout();
    let result = demo::run(&session, &mut stdout.lock());
    session.close();

    if let Err(err) = result {
        tracing::error!(error = %err, "demo step failed");
        std::process::exit(1);
    }
}
