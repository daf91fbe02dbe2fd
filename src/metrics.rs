//! Prometheus metrics collection for Cinerelay
//!
//! This module provides metrics instrumentation for tracking:
//! - Chat relay requests by delivery mode, and upstream latency
//! - Reply classifications and enrichment failures
//! - Mirror probe outcomes and media proxy requests
//! - Upstream errors by service
//!
//! Metrics are exposed via the `/metrics` endpoint in Prometheus text format.

use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts, Registry, TextEncoder,
};
use std::sync::Arc;

use crate::extraction::Classification;

/// How a chat request was answered
///
/// Restricts the `mode` label to three values at compile time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayMode {
    /// Incremental SSE relay
    Stream,
    /// Single JSON document
    Complete,
    /// Served from the response cache without an upstream call
    Cached,
}

impl RelayMode {
    /// Convert mode to Prometheus label string
    pub fn as_str(&self) -> &'static str {
        match self {
            RelayMode::Stream => "stream",
            RelayMode::Complete => "complete",
            RelayMode::Cached => "cached",
        }
    }
}

/// Media proxy operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProxyMode {
    Info,
    Stream,
}

impl ProxyMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProxyMode::Info => "info",
            ProxyMode::Stream => "stream",
        }
    }
}

/// Metrics collector for Cinerelay
#[derive(Clone)]
pub struct Metrics {
    pub registry: Arc<Registry>,
    relay_requests: IntCounterVec,
    upstream_duration: HistogramVec,
    classifications: IntCounterVec,
    enrichment_failures: IntCounterVec,
    mirror_probes: IntCounterVec,
    proxy_requests: IntCounterVec,
    upstream_errors: IntCounterVec,
    mid_stream_failures: IntCounter,
}

impl Metrics {
    /// Create a new Metrics instance
    ///
    /// Registers all metrics with a new Prometheus registry.
    ///
    /// # Errors
    ///
    /// Returns an error if metric registration fails (e.g., duplicate names).
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        // Cardinality: 3 modes
        let relay_requests = IntCounterVec::new(
            Opts::new(
                "cinerelay_relay_requests_total",
                "Total number of chat relay requests by delivery mode",
            ),
            &["mode"],
        )?;

        // Time until the upstream produced response headers (stream) or the
        // full body (complete)
        let upstream_duration = HistogramVec::new(
            HistogramOpts::new(
                "cinerelay_upstream_duration_ms",
                "Upstream completion latency in milliseconds",
            )
            .buckets(vec![
                50.0, 100.0, 250.0, 500.0, 1000.0, 2500.0, 5000.0, 10000.0, 30000.0, 60000.0,
            ]),
            &["mode"],
        )?;

        // Cardinality: 3 classifications
        let classifications = IntCounterVec::new(
            Opts::new(
                "cinerelay_classifications_total",
                "Completed replies by classification",
            ),
            &["kind"],
        )?;

        // Labels:
        // - kind: video_link (oEmbed lookup) or youtube_search (keyword query)
        let enrichment_failures = IntCounterVec::new(
            Opts::new(
                "cinerelay_enrichment_failures_total",
                "Enrichment lookups that failed and were degraded or skipped",
            ),
            &["kind"],
        )?;

        // Instance URLs come from configuration, so cardinality is bounded
        let mirror_probes = IntCounterVec::new(
            Opts::new(
                "cinerelay_mirror_probes_total",
                "Mirror instance probes by instance and outcome",
            ),
            &["instance", "outcome"],
        )?;

        let proxy_requests = IntCounterVec::new(
            Opts::new(
                "cinerelay_proxy_requests_total",
                "Media proxy requests by mode",
            ),
            &["mode"],
        )?;

        // Labels:
        // - service: static service name (chat completion API, oEmbed endpoint, ...)
        let upstream_errors = IntCounterVec::new(
            Opts::new(
                "cinerelay_upstream_errors_total",
                "Requests that failed because an external service failed",
            ),
            &["service"],
        )?;

        // Errors after the SSE response was already committed; the client sees
        // an error event instead of a status code
        let mid_stream_failures = IntCounter::with_opts(Opts::new(
            "cinerelay_mid_stream_failures_total",
            "Upstream transport failures during an active SSE relay",
        ))?;

        registry.register(Box::new(relay_requests.clone()))?;
        registry.register(Box::new(upstream_duration.clone()))?;
        registry.register(Box::new(classifications.clone()))?;
        registry.register(Box::new(enrichment_failures.clone()))?;
        registry.register(Box::new(mirror_probes.clone()))?;
        registry.register(Box::new(proxy_requests.clone()))?;
        registry.register(Box::new(upstream_errors.clone()))?;
        registry.register(Box::new(mid_stream_failures.clone()))?;

        Ok(Self {
            registry: Arc::new(registry),
            relay_requests,
            upstream_duration,
            classifications,
            enrichment_failures,
            mirror_probes,
            proxy_requests,
            upstream_errors,
            mid_stream_failures,
        })
    }

    pub fn record_relay_request(&self, mode: RelayMode) {
        self.relay_requests.with_label_values(&[mode.as_str()]).inc();
    }

    pub fn relay_requests_count(&self, mode: RelayMode) -> u64 {
        self.relay_requests.with_label_values(&[mode.as_str()]).get()
    }

    /// Record upstream latency
    ///
    /// # Errors
    ///
    /// Returns an error if `duration_ms` is NaN, infinite, or negative. Such
    /// values would corrupt every percentile of the histogram.
    pub fn record_upstream_duration(
        &self,
        mode: RelayMode,
        duration_ms: f64,
    ) -> Result<(), prometheus::Error> {
        if !duration_ms.is_finite() || duration_ms < 0.0 {
            return Err(prometheus::Error::Msg(format!(
                "Histogram value must be finite and non-negative, got: {}",
                duration_ms
            )));
        }

        self.upstream_duration
            .get_metric_with_label_values(&[mode.as_str()])?
            .observe(duration_ms);
        Ok(())
    }

    pub fn record_classification(&self, classification: Classification) {
        self.classifications
            .with_label_values(&[classification.as_str()])
            .inc();
    }

    pub fn classifications_count(&self, classification: Classification) -> u64 {
        self.classifications
            .with_label_values(&[classification.as_str()])
            .get()
    }

    /// Record a failed enrichment lookup
    ///
    /// `kind` must be `video_link` or `youtube_search`.
    pub fn enrichment_failure(&self, kind: &str) {
        self.enrichment_failures.with_label_values(&[kind]).inc();
    }

    pub fn enrichment_failures_count(&self, kind: &str) -> u64 {
        self.enrichment_failures.with_label_values(&[kind]).get()
    }

    pub fn record_mirror_probe(&self, instance: &str, healthy: bool) {
        let outcome = if healthy { "healthy" } else { "unhealthy" };
        self.mirror_probes
            .with_label_values(&[instance, outcome])
            .inc();
    }

    pub fn mirror_probes_count(&self, instance: &str, healthy: bool) -> u64 {
        let outcome = if healthy { "healthy" } else { "unhealthy" };
        self.mirror_probes
            .with_label_values(&[instance, outcome])
            .get()
    }

    pub fn record_proxy_request(&self, mode: ProxyMode) {
        self.proxy_requests.with_label_values(&[mode.as_str()]).inc();
    }

    pub fn upstream_error(&self, service: &str) {
        self.upstream_errors.with_label_values(&[service]).inc();
    }

    pub fn upstream_errors_count(&self, service: &str) -> u64 {
        self.upstream_errors.with_label_values(&[service]).get()
    }

    pub fn mid_stream_failure(&self) {
        self.mid_stream_failures.inc();
    }

    pub fn mid_stream_failures_count(&self) -> u64 {
        self.mid_stream_failures.get()
    }

    /// Gather all metrics and encode them in Prometheus text format
    ///
    /// # Errors
    ///
    /// Returns an error if metric encoding fails.
    pub fn gather(&self) -> Result<String, prometheus::Error> {
        let metric_families = self.registry.gather();
        let metric_count = metric_families.len();

        tracing::debug!(
            metric_family_count = metric_count,
            "Encoding metrics to Prometheus text format"
        );

        let mut buffer = Vec::new();
        let encoder = TextEncoder::new();

        encoder.encode(&metric_families, &mut buffer).map_err(|e| {
            tracing::error!(
                error = %e,
                metric_family_count = metric_count,
                "Prometheus text encoder failed"
            );
            prometheus::Error::Msg(format!(
                "Failed to encode {} metric families: {}",
                metric_count, e
            ))
        })?;

        String::from_utf8(buffer).map_err(|e| {
            let valid_up_to = e.utf8_error().valid_up_to();
            tracing::error!(
                invalid_byte_index = valid_up_to,
                "Prometheus encoder produced invalid UTF-8"
            );
            prometheus::Error::Msg(format!(
                "Failed to convert metrics to UTF-8 at byte {}: {}",
                valid_up_to, e
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_new_registers_families() {
        let metrics = Metrics::new().expect("Failed to create metrics");

        metrics.record_relay_request(RelayMode::Stream);
        metrics
            .record_upstream_duration(RelayMode::Stream, 12.0)
            .expect("Test operation should succeed");
        metrics.record_classification(Classification::MovieRecommend);
        metrics.enrichment_failure("video_link");
        metrics.record_mirror_probe("https://a.example", true);
        metrics.record_proxy_request(ProxyMode::Info);
        metrics.upstream_error("chat completion API");
        metrics.mid_stream_failure();

        let names: Vec<String> = metrics
            .registry
            .gather()
            .iter()
            .map(|m| m.name().to_string())
            .collect();
        assert_eq!(names.len(), 8, "Expected 8 metric families: {:?}", names);
        assert!(names.contains(&"cinerelay_relay_requests_total".to_string()));
        assert!(names.contains(&"cinerelay_upstream_duration_ms".to_string()));
        assert!(names.contains(&"cinerelay_classifications_total".to_string()));
        assert!(names.contains(&"cinerelay_mirror_probes_total".to_string()));
        assert!(names.contains(&"cinerelay_mid_stream_failures_total".to_string()));
    }

    #[test]
    fn test_counters_are_per_label() {
        let metrics = Metrics::new().unwrap();

        metrics.record_relay_request(RelayMode::Stream);
        metrics.record_relay_request(RelayMode::Stream);
        metrics.record_relay_request(RelayMode::Cached);
        metrics.record_mirror_probe("https://a.example", false);

        assert_eq!(metrics.relay_requests_count(RelayMode::Stream), 2);
        assert_eq!(metrics.relay_requests_count(RelayMode::Cached), 1);
        assert_eq!(metrics.relay_requests_count(RelayMode::Complete), 0);
        assert_eq!(metrics.mirror_probes_count("https://a.example", false), 1);
        assert_eq!(metrics.mirror_probes_count("https://a.example", true), 0);
    }

    #[test]
    fn test_gather_produces_prometheus_text_format() {
        let metrics = Metrics::new().unwrap();
        metrics.record_classification(Classification::VideoLink);

        let output = metrics.gather().expect("Failed to gather test metrics");
        assert!(output.contains("# HELP cinerelay_classifications_total"));
        assert!(output.contains("# TYPE cinerelay_classifications_total counter"));
        assert!(output.contains("kind=\"video_link\""));
    }

    #[test]
    fn test_metrics_is_clonable() {
        let metrics = Metrics::new().unwrap();
        let cloned = metrics.clone();

        metrics.mid_stream_failure();

        assert_eq!(cloned.mid_stream_failures_count(), 1);
    }

    #[test]
    fn test_rejects_invalid_durations() {
        let metrics = Metrics::new().unwrap();
        assert!(
            metrics
                .record_upstream_duration(RelayMode::Complete, f64::NAN)
                .is_err()
        );
        assert!(
            metrics
                .record_upstream_duration(RelayMode::Complete, f64::INFINITY)
                .is_err()
        );
        assert!(
            metrics
                .record_upstream_duration(RelayMode::Complete, -1.0)
                .is_err()
        );
        assert!(
            metrics
                .record_upstream_duration(RelayMode::Complete, 0.0)
                .is_ok()
        );
    }
}
