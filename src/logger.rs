use std::{fs::OpenOptions, io, path::Path, sync::Mutex};

use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

// Install the global subscriber.
// With a log file the output is appended to it instead of stdout
pub fn init_logging(log_file: Option<&Path>) -> io::Result<()> {
    let level = if cfg!(debug_assertions) { "trace" } else { "info" };

    let (filter, from_env) = match EnvFilter::try_from_default_env() {
        Ok(f) => (f, true),
        Err(_) => (EnvFilter::new(level), false),
    };

    let file_layer = match log_file {
        Some(path) => {
            let file = OpenOptions::new().create(true).append(true).open(path)?;

            Some(fmt::layer().with_ansi(false).with_writer(Mutex::new(file)))
        }
        None => None,
    };

    let stdout_layer = if file_layer.is_none() {
        Some(fmt::layer())
    } else {
        None
    };

    tracing_subscriber::registry()
        .with(file_layer)
        .with(stdout_layer)
        .with(filter)
        .init();

    if !from_env {
        info!("\"RUST_LOG\" variable not set, defaulting to {level}");
    }

    Ok(())
}
