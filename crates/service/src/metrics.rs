use once_cell::sync::Lazy;
use prometheus::{register_int_counter, register_int_counter_vec, Encoder, IntCounter, IntCounterVec, TextEncoder};

// Prometheus metrics (default registry)
pub static SUBMISSIONS_CREATED_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "branding_submissions_created_total",
        "Total submissions created"
    )
    .expect("register submissions_created_total")
});

pub static STATUS_CHANGES_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "branding_status_changes_total",
        "Total admin status changes by target status",
        &["status"]
    )
    .expect("register status_changes_total")
});

pub static VOTES_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "branding_votes_total",
        "Total votes by target, direction and outcome",
        &["target", "direction", "outcome"]
    )
    .expect("register votes_total")
});

pub static UPLOADS_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "branding_uploads_total",
        "Total logo images stored"
    )
    .expect("register uploads_total")
});

/// Encode the default registry in the Prometheus text format.
pub fn encode_metrics() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    Ok(String::from_utf8(buffer).unwrap_or_default())
}
