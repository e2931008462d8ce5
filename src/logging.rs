//! Tracing subscriber setup with a runtime-adjustable level

use anyhow::{Context, Result};
use tracing::Level;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{Registry, fmt, reload};

/// Parse a level name, falling back to INFO like `LOG_LEVEL` handling always has
pub fn parse_level(raw: &str) -> Level {
    match raw.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    }
}

/// Changes the global log level after startup
#[derive(Clone)]
pub struct LogHandle {
    filter: reload::Handle<LevelFilter, Registry>,
}

impl LogHandle {
    pub fn set_level(&self, level: Level) -> Result<()> {
        self.filter
            .modify(|filter| *filter = LevelFilter::from_level(level))
            .context("Failed to change log level")
    }
}

/// Install the global subscriber
pub fn init(level: Level) -> Result<LogHandle> {
    let (filter, handle) = reload::Layer::new(LevelFilter::from_level(level));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .try_init()
        .context("Failed to install tracing subscriber")?;
    Ok(LogHandle { filter: handle })
}
