use tracing_subscriber::{EnvFilter, Layer, layer::SubscriberExt, util::SubscriberInitExt};

/// Installs the global `tracing` subscriber.
///
/// Logs go to stderr so they never mix with the output of the commands being
/// run. Verbosity is taken from `RUST_LOG` and falls back to `info`.
pub fn init_telemetry(json: bool) -> anyhow::Result<()> {
    let fmt = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_thread_ids(true)
        .with_target(false)
        .with_timer(tracing_subscriber::fmt::time::ChronoLocal::rfc_3339());

    let fmt = if json {
        fmt.json().boxed()
    } else {
        fmt.boxed()
    };

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(fmt)
        .try_init()?;

    Ok(())
}
