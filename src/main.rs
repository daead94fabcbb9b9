//! Kapplang - Binary Entry Point
//!
//! Runs a console over stdin/stdout against the JSONL event log found
//! under `KAPPLANG_DATA_DIR` (default `./data`). Logs go to stderr.

use std::io::{self, BufWriter};

use tracing_subscriber::EnvFilter;

use kapplang::console::Console;
use kapplang::event_store::{EventStoreConfig, JsonlEventStore};
use kapplang::KapplangApp;

fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("kapplang=info")),
        )
        .with_writer(io::stderr)
        .init();

    let store = JsonlEventStore::open(EventStoreConfig::from_env())?;
    let app = KapplangApp::new(store);

    let mut console = Console::new(app, io::stdin().lock(), BufWriter::new(io::stdout()));
    console.run()?;

    Ok(())
}
