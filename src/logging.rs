// 📝 Logging - tracing subscriber for the binaries

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub const DEFAULT_FILTER: &str = "squad_ledger=info";

/// Install a fmt subscriber. `RUST_LOG` wins over `default_filter`.
///
/// Logs go to stderr so stdout stays clean for JSON output.
pub fn init_tracing(default_filter: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into());

    // A second init (e.g. in tests) is ignored
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init();
}
