use std::sync::Once;

use tracing_subscriber::{EnvFilter, fmt, prelude::*};

static INIT: Once = Once::new();

/// Installs a stderr subscriber filtered by `IRONWEAVE_LOG`
/// (e.g. `IRONWEAVE_LOG=ironweave=debug`), falling back to `ironweave=info`.
/// Safe to call more than once.
pub fn init_tracing() {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_env("IRONWEAVE_LOG")
            .unwrap_or_else(|_| EnvFilter::new("ironweave=info"));

        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(true),
            )
            .with(filter)
            .init();
    });
}
