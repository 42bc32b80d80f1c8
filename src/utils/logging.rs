use std::error::Error;
use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub const LOG_ENV: &str = "DIYBOT_LOG";

const DEFAULT_FILTER: &str = "diybot=info";
const DEFAULT_STDERR_FILTER: &str = "diybot=warn";

/// Where diagnostics go.
#[derive(Debug, Clone, Copy)]
pub enum LogTarget<'a> {
    /// Append to a file. Used by the chat UI, which owns the terminal.
    File(&'a Path),
    Stderr,
    /// No subscriber at all.
    Off,
}

/// Picks the filter from `DIYBOT_LOG`, then `RUST_LOG`, then `fallback`.
fn build_filter(lookup: impl Fn(&str) -> Option<String>, fallback: &str) -> EnvFilter {
    [LOG_ENV, EnvFilter::DEFAULT_ENV]
        .into_iter()
        .filter_map(|key| lookup(key))
        .filter(|value| !value.trim().is_empty())
        .find_map(|value| EnvFilter::try_new(value).ok())
        .unwrap_or_else(|| EnvFilter::new(fallback))
}

pub fn init_tracing(target: LogTarget<'_>) -> Result<(), Box<dyn Error>> {
    let env = |key: &str| std::env::var(key).ok();
    match target {
        LogTarget::Off => Ok(()),
        LogTarget::Stderr => {
            tracing_subscriber::registry()
                .with(build_filter(env, DEFAULT_STDERR_FILTER))
                .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
                .try_init()?;
            Ok(())
        }
        LogTarget::File(path) => {
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            tracing_subscriber::registry()
                .with(build_filter(env, DEFAULT_FILTER))
                .with(
                    tracing_subscriber::fmt::layer()
                        .with_ansi(false)
                        .with_writer(Mutex::new(file)),
                )
                .try_init()?;
            Ok(())
        }
    }
}
