use tracing_subscriber::EnvFilter;

/// Install the global log subscriber. JSON lines unless `pretty` is set.
pub fn init_logging(pretty: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    if pretty {
        builder.init();
    } else {
        builder.json().init();
    }
}

/// Register descriptions for the poller's metrics.
pub fn describe_metrics() {
    metrics::describe_counter!("job_poll_ticks_total", "Status ticks issued across all sessions");
    metrics::describe_counter!(
        "job_poll_query_failures_total",
        "Per-job status queries that failed and were skipped for their tick"
    );
    metrics::describe_counter!(
        "job_poll_sessions_total",
        "Poll sessions resolved, by outcome"
    );
    metrics::describe_histogram!(
        "job_poll_session_seconds",
        "Wall time from session start to resolution"
    );
}
