pub fn init() {
    init_with(false);
}

/// Initialize the tracing subscriber once, honoring RUST_LOG if set.
/// Output goes to stderr so stdio mode keeps stdout for protocol frames.
pub fn init_with(debug: bool) {
    let default = if debug { "debug" } else { "info" };
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| default.to_string());
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Logs a metric line and records it as a histogram sample.
pub fn log_metric(tool: &str, metric: &str, value: f64) {
    tracing::info!(tool = tool, metric = metric, value = value, "metric");
    metrics::histogram!(metric.to_owned(), "tool" => tool.to_owned()).record(value);
}

/// Bumps a counter.
pub fn log_count(tool: &str, metric: &str) {
    tracing::debug!(tool = tool, metric = metric, "count");
    metrics::counter!(metric.to_owned(), "tool" => tool.to_owned()).increment(1);
}
