use anyhow::Result;
use metrics::{describe_counter, describe_gauge, describe_histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::OnceLock;

static PROM_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

pub fn describe() {
    describe_gauge!(
        "refund_dashboard_build_info",
        "Build info for the refund dashboard (value is always 1)."
    );
    describe_counter!(
        "refund_dashboard_refresh_total",
        "Refresh cycles finished, by outcome."
    );
    describe_histogram!(
        "refund_dashboard_refresh_duration_ms",
        "Wall-clock time of one refresh cycle (bulk load + aggregate)."
    );
    describe_counter!(
        "refund_dashboard_stale_responses_total",
        "Refresh results discarded because a newer refresh had started."
    );
    describe_gauge!(
        "refund_dashboard_records_loaded",
        "Refund records held after the last applied refresh."
    );
    describe_counter!(
        "refund_dashboard_source_requests_total",
        "Upstream requests, by source and status."
    );
    describe_counter!(
        "refund_dashboard_source_errors_total",
        "Upstream request failures, by source and error kind."
    );
    describe_histogram!(
        "refund_dashboard_source_latency_ms",
        "Upstream request latency in milliseconds."
    );
}

/// Install the global Prometheus recorder once and return a handle for `/metrics`.
///
/// Upkeep runs on each `/metrics` request.
pub fn init_global() -> Result<PrometheusHandle> {
    if let Some(handle) = PROM_HANDLE.get() {
        return Ok(handle.clone());
    }
    let handle = PrometheusBuilder::new().install_recorder()?;
    describe();
    let handle = PROM_HANDLE.get_or_init(|| handle).clone();

    let git_sha = std::env::var("GIT_SHA").unwrap_or_else(|_| "unknown".to_string());
    ::metrics::gauge!(
        "refund_dashboard_build_info",
        "version" => env!("CARGO_PKG_VERSION"),
        "git_sha" => git_sha,
    )
    .set(1.0);

    Ok(handle)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_refresh_metrics_render() {
        let recorder = PrometheusBuilder::new().build_recorder();
        let handle = recorder.handle();

        metrics::with_local_recorder(&recorder, || {
            describe();
            metrics::counter!("refund_dashboard_refresh_total", "outcome" => "success")
                .increment(1);
            metrics::counter!("refund_dashboard_stale_responses_total").increment(1);
        });

        let rendered = handle.render();
        assert!(rendered.contains("refund_dashboard_refresh_total"));
        assert!(rendered.contains("outcome=\"success\""));
        assert!(rendered.contains("refund_dashboard_stale_responses_total"));
    }
}
