//! Diagnostic logging
//!
//! `tracing` events go to stderr; stdout is reserved for operator output and
//! `--json` summaries. `RUST_LOG` wins over the `-v` count when set.

use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

/// Default level for a `-v` count: 0 -> warn, 1 -> info, 2+ -> debug
pub fn level_for(verbosity: u8) -> Level {
  match verbosity {
    0 => Level::WARN,
    1 => Level::INFO,
    _ => Level::DEBUG,
  }
}

/// Install the global subscriber; later calls are ignored
pub fn init(verbosity: u8) {
  let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level_for(verbosity).as_str()));

  tracing_subscriber::registry()
    .with(env_filter)
    .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
    .try_init()
    .ok();
}
