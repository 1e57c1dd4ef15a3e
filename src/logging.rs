//! Structured logging setup.
//!
//! Deployed profiles log JSON lines, local runs get compact human output.
//! Everything goes to stderr so stdout only ever carries the result.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Profile;

/// Filter used when `RUST_LOG` is not set.
fn default_directive(verbose: bool) -> &'static str {
    if verbose { "debug" } else { "info" }
}

pub fn init(profile: Profile, verbose: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(verbose)));

    let registry = tracing_subscriber::registry().with(filter);
    let result = match profile {
        Profile::Local => registry
            .with(fmt::layer().compact().with_target(false).with_writer(std::io::stderr))
            .try_init(),
        Profile::Dev | Profile::Prod => registry
            .with(
                fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_writer(std::io::stderr),
            )
            .try_init(),
    };

    // A subscriber may already be installed (tests); keep using it.
    if result.is_err() {
        tracing::debug!("tracing subscriber already initialised");
    }
}
