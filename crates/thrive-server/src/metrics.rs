//! Prometheus metrics for the Thrive server.
//!
//! This module provides:
//! - HTTP request metrics (count, latency)
//! - Domain counters (tasks, badges, focus minutes, AI analysis, OTP)
//! - Smart plan cache and realtime connection gauges

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::OnceLock;
use std::time::Duration;

/// Global Prometheus handle for rendering metrics.
static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Metric names as constants for consistency.
pub mod names {
    // HTTP metrics
    pub const HTTP_REQUESTS_TOTAL: &str = "http_requests_total";
    pub const HTTP_REQUEST_DURATION_SECONDS: &str = "http_request_duration_seconds";

    // Domain metrics
    pub const TASKS_CREATED_TOTAL: &str = "tasks_created_total";
    pub const TASKS_COMPLETED_TOTAL: &str = "tasks_completed_total";
    pub const BADGES_UNLOCKED_TOTAL: &str = "badges_unlocked_total";
    pub const FOCUS_MINUTES_TOTAL: &str = "focus_minutes_total";
    pub const AI_ANALYSIS_TOTAL: &str = "ai_analysis_total";
    pub const OTP_REQUESTS_TOTAL: &str = "otp_requests_total";

    // Smart plan cache
    pub const PLAN_CACHE_HITS_TOTAL: &str = "plan_cache_hits_total";
    pub const PLAN_CACHE_MISSES_TOTAL: &str = "plan_cache_misses_total";

    // Realtime
    pub const REALTIME_CONNECTIONS: &str = "realtime_connections";
}

/// Install the Prometheus recorder.
///
/// Returns `true` if initialization succeeded, `false` if already initialized.
pub fn init_metrics() -> bool {
    if PROMETHEUS_HANDLE.get().is_some() {
        tracing::debug!("Prometheus metrics already initialized");
        return false;
    }

    // Pull-based: /metrics renders the handle itself
    match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => {
            if PROMETHEUS_HANDLE.set(handle).is_err() {
                tracing::warn!("Failed to store Prometheus handle (already set)");
                return false;
            }

            tracing::info!("Prometheus metrics initialized");
            true
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to install Prometheus recorder");
            false
        }
    }
}

/// Render all metrics in Prometheus text format.
///
/// Returns `None` if metrics were not initialized.
pub fn render_metrics() -> Option<String> {
    PROMETHEUS_HANDLE.get().map(|handle| handle.render())
}

// =============================================================================
// HTTP Metrics
// =============================================================================

pub fn record_http_request(method: &str, path: &str, status: u16, duration: Duration) {
    let status_class = match status {
        200..=299 => "2xx",
        300..=399 => "3xx",
        400..=499 => "4xx",
        500..=599 => "5xx",
        _ => "other",
    };

    let normalized_path = normalize_path(path);

    counter!(
        names::HTTP_REQUESTS_TOTAL,
        "method" => method.to_string(),
        "path" => normalized_path.clone(),
        "status" => status.to_string(),
        "status_class" => status_class.to_string()
    )
    .increment(1);

    histogram!(
        names::HTTP_REQUEST_DURATION_SECONDS,
        "method" => method.to_string(),
        "path" => normalized_path
    )
    .record(duration.as_secs_f64());
}

// =============================================================================
// Domain Metrics
// =============================================================================

pub fn record_task_created() {
    counter!(names::TASKS_CREATED_TOTAL).increment(1);
}

pub fn record_task_completed() {
    counter!(names::TASKS_COMPLETED_TOTAL).increment(1);
}

pub fn record_badge_unlocked(badge_id: &str) {
    counter!(names::BADGES_UNLOCKED_TOTAL, "badge" => badge_id.to_string()).increment(1);
}

pub fn record_focus_minutes(minutes: u32) {
    counter!(names::FOCUS_MINUTES_TOTAL).increment(u64::from(minutes));
}

/// `source` is `model` or `heuristic`.
pub fn record_ai_analysis(source: &str) {
    counter!(names::AI_ANALYSIS_TOTAL, "source" => source.to_string()).increment(1);
}

pub fn record_otp_request() {
    counter!(names::OTP_REQUESTS_TOTAL).increment(1);
}

pub fn record_plan_cache_hit() {
    counter!(names::PLAN_CACHE_HITS_TOTAL).increment(1);
}

pub fn record_plan_cache_miss() {
    counter!(names::PLAN_CACHE_MISSES_TOTAL).increment(1);
}

pub fn increment_realtime_connections() {
    gauge!(names::REALTIME_CONNECTIONS).increment(1.0);
}

pub fn decrement_realtime_connections() {
    gauge!(names::REALTIME_CONNECTIONS).decrement(1.0);
}

// =============================================================================
// Helpers
// =============================================================================

/// Replaces ids in a path with `{id}` to keep label cardinality bounded.
fn normalize_path(path: &str) -> String {
    path.split('/')
        .map(|part| if is_likely_id(part) { "{id}" } else { part })
        .collect::<Vec<_>>()
        .join("/")
}

/// Check if a string looks like an ID (UUID or numeric).
fn is_likely_id(s: &str) -> bool {
    if s.is_empty() {
        return false;
    }

    // UUID pattern (with or without dashes)
    if s.len() == 36 && s.chars().filter(|c| *c == '-').count() == 4 {
        return true;
    }
    if s.len() == 32 && s.chars().all(|c| c.is_ascii_hexdigit()) {
        return true;
    }

    s.chars().all(|c| c.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_path() {
        assert_eq!(
            normalize_path("/api/tasks/550e8400-e29b-41d4-a716-446655440000"),
            "/api/tasks/{id}"
        );
        assert_eq!(
            normalize_path("/api/focus/sessions/550e8400-e29b-41d4-a716-446655440000/complete"),
            "/api/focus/sessions/{id}/complete"
        );
        assert_eq!(normalize_path("/api/tasks/42"), "/api/tasks/{id}");
        assert_eq!(normalize_path("/metrics"), "/metrics");
        assert_eq!(
            normalize_path("/api/localization/cultural/DE"),
            "/api/localization/cultural/DE"
        );
    }

    #[test]
    fn test_is_likely_id() {
        assert!(is_likely_id("550e8400-e29b-41d4-a716-446655440000"));
        assert!(is_likely_id("550e8400e29b41d4a716446655440000"));
        assert!(is_likely_id("12345"));
        assert!(!is_likely_id("tasks"));
        assert!(!is_likely_id("read-all"));
        assert!(!is_likely_id(""));
    }
}
