// Logging, powered by tracing-subscriber.

use std::sync::Once;

use tracing_subscriber::EnvFilter;

static INIT: Once = Once::new();

/// Install the global fmt subscriber. Later calls are no-ops.
///
/// An invalid directive falls back to `info` instead of failing startup.
pub fn init(filter: &str) {
    INIT.call_once(|| {
        let env_filter = EnvFilter::try_new(filter).unwrap_or_else(|_| EnvFilter::new("info"));

        // another subscriber may already be installed (tests, embedding apps)
        let _ = tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .try_init();
    });
}
