//! Initialises `tracing_subscriber` with a stdout formatter, filtered
//! by the environment.
//!
//! An example environment is shown:
//! ```bash
//! RUST_LOG=roadmatch=debug
//! ```

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Initialises the tracer, using tracing subscription.
/// This is optional, not calling this function will simply
/// not log traces.
pub fn initialize_tracer() {
    let fmt_layer = tracing_subscriber::fmt::layer();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .with(fmt_layer)
        .init();
}
