/// Initializes structured logging the same way every teacher binary does:
/// `tracing_subscriber::fmt` with an `EnvFilter` that falls back to
/// `<default_target>=info` when `RUST_LOG` is unset.
pub fn init(default_target: &str) {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("{default_target}=info").into()),
        )
        .with_target(false)
        .with_thread_ids(true)
        .with_line_number(true)
        .init();
}
