//! Tracing subscriber setup

use anyhow::Result;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Install the global subscriber, writing to stderr
///
/// `RUST_LOG` or `SKILLGRID_LOG` override the level chosen by `verbose`.
pub fn init_tracing(verbose: bool, log_json: bool) -> Result<()> {
    let level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_from_env("SKILLGRID_LOG"))
        .unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "skillgrid={level},skillgrid_interview={level},skillgrid_core={level}"
            ))
        });

    let registry = tracing_subscriber::registry().with(filter);

    if log_json {
        registry
            .with(
                fmt::layer()
                    .json()
                    .with_writer(std::io::stderr)
                    .with_ansi(false),
            )
            .try_init()?;
    } else {
        registry
            .with(
                fmt::layer()
                    .compact()
                    .with_writer(std::io::stderr)
                    .with_target(false),
            )
            .try_init()?;
    }

    Ok(())
}
