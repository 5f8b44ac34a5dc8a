//! Console logging for the demo binaries.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Install a plain line-per-message subscriber on stdout.
///
/// The level comes from `FACE_MATCH_LOG` (`debug`, `info`, `warn`, `error`)
/// and defaults to `info`.
pub fn init() -> anyhow::Result<()> {
    let env_filter =
        EnvFilter::try_from_env("FACE_MATCH_LOG").unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            fmt::layer()
                .without_time()
                .with_target(false)
                .with_level(false),
        )
        .try_init()?;
    Ok(())
}
