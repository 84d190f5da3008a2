//! Metrics collection for observability

use once_cell::sync::Lazy;
use prometheus::{
    register_counter_vec_with_registry, register_counter_with_registry,
    register_histogram_vec_with_registry, register_histogram_with_registry, Counter, CounterVec,
    Histogram, HistogramVec, Opts, Registry,
};
use std::sync::Arc;

/// Global metrics registry
pub static METRICS: Lazy<Arc<Metrics>> =
    Lazy::new(|| Arc::new(Metrics::new().expect("Failed to initialize metrics")));

/// Metrics collector
pub struct Metrics {
    registry: Registry,

    // Relay API metrics
    pub relay_requests: CounterVec,
    pub relay_request_duration: HistogramVec,

    // Backend metrics
    pub backend_request_duration: Histogram,
    pub backend_errors: CounterVec,

    // Token budget metrics
    pub token_budget_used: Histogram,
    pub token_budget_remaining: Histogram,
    pub token_budget_overflows: Counter,
    pub history_dropped: Histogram,

    // Summary memory metrics
    pub summaries_requested: Counter,
    pub summary_truncations: Counter,
}

impl Metrics {
    /// Create a new metrics collector
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let relay_requests = register_counter_vec_with_registry!(
            Opts::new("relay_requests_total", "Total relay requests"),
            &["mode", "status"],
            registry
        )?;

        let relay_request_duration = register_histogram_vec_with_registry!(
            "relay_request_duration_seconds",
            "Relay request duration in seconds",
            &["mode"],
            registry
        )?;

        let backend_request_duration = register_histogram_with_registry!(
            "backend_request_duration_seconds",
            "Model backend call duration in seconds",
            registry
        )?;

        let backend_errors = register_counter_vec_with_registry!(
            Opts::new("backend_errors_total", "Total model backend failures"),
            &["kind"],
            registry
        )?;

        let token_budget_used = register_histogram_with_registry!(
            "token_budget_used",
            "Estimated history tokens sent per chat request",
            registry
        )?;

        let token_budget_remaining = register_histogram_with_registry!(
            "token_budget_remaining",
            "Estimated history tokens left unused per chat request",
            registry
        )?;

        let token_budget_overflows = register_counter_with_registry!(
            Opts::new(
                "token_budget_overflows_total",
                "Chat turns whose current message alone exceeded the budget"
            ),
            registry
        )?;

        let history_dropped = register_histogram_with_registry!(
            "history_dropped_messages",
            "History messages left out of a chat request",
            registry
        )?;

        let summaries_requested = register_counter_with_registry!(
            Opts::new("summaries_requested_total", "Chat replies flagged with needsSummary"),
            registry
        )?;

        let summary_truncations = register_counter_with_registry!(
            Opts::new(
                "summary_truncations_total",
                "Summary prompts whose transcript was trimmed to fit"
            ),
            registry
        )?;

        Ok(Self {
            registry,
            relay_requests,
            relay_request_duration,
            backend_request_duration,
            backend_errors,
            token_budget_used,
            token_budget_remaining,
            token_budget_overflows,
            history_dropped,
            summaries_requested,
            summary_truncations,
        })
    }

    /// Get the metrics registry for exporting
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Record a finished relay request
    pub fn record_request(&self, mode: &str, success: bool, seconds: f64) {
        let status = if success { "success" } else { "error" };
        self.relay_requests.with_label_values(&[mode, status]).inc();
        self.relay_request_duration
            .with_label_values(&[mode])
            .observe(seconds);
    }

    /// Record token budget usage for one planned context
    pub fn record_token_budget(
        &self,
        used: usize,
        remaining: usize,
        dropped: usize,
        overflow: bool,
    ) {
        self.token_budget_used.observe(used as f64);
        self.token_budget_remaining.observe(remaining as f64);
        self.history_dropped.observe(dropped as f64);
        if overflow {
            self.token_budget_overflows.inc();
        }
    }

    pub fn record_summary_requested(&self) {
        self.summaries_requested.inc();
    }

    pub fn record_summary_truncation(&self) {
        self.summary_truncations.inc();
    }

    pub fn record_backend_error(&self, kind: &str) {
        self.backend_errors.with_label_values(&[kind]).inc();
    }

    /// Export metrics in Prometheus text format
    pub fn export_prometheus(&self) -> String {
        use prometheus::Encoder;

        let encoder = prometheus::TextEncoder::new();
        let metric_families = self.registry.gather();

        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer).unwrap_or_default();

        String::from_utf8(buffer).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_initialization() {
        let metrics = Metrics::new();
        assert!(metrics.is_ok());
    }

    #[test]
    fn test_record_token_budget() {
        let metrics = Metrics::new().unwrap();
        metrics.record_token_budget(5000, 3000, 2, false);
        metrics.record_token_budget(8100, 0, 40, true);
        assert_eq!(metrics.token_budget_overflows.get(), 1.0);
    }

    #[test]
    fn test_export_contains_recorded_series() {
        let metrics = Metrics::new().unwrap();
        metrics.record_request("chat", true, 0.25);
        metrics.record_backend_error("timeout");

        let text = metrics.export_prometheus();
        assert!(text.contains("relay_requests_total"));
        assert!(text.contains(r#"mode="chat""#));
        assert!(text.contains(r#"kind="timeout""#));
    }
}
