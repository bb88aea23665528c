use lazy_static::lazy_static;
use prometheus::{
    register_histogram_vec, register_int_counter_vec, Encoder, HistogramVec, IntCounterVec,
    TextEncoder,
};

lazy_static! {
    // HTTP Metrics
    pub static ref HTTP_REQUESTS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "http_requests_total",
        "Total number of HTTP requests",
        &["method", "path", "status"]
    )
    .unwrap();

    pub static ref HTTP_REQUEST_DURATION_SECONDS: HistogramVec = register_histogram_vec!(
        "http_request_duration_seconds",
        "HTTP request duration in seconds",
        &["method", "path"],
        vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]
    )
    .unwrap();

    // Distribution queue
    pub static ref QUESTIONS_SERVED_TOTAL: IntCounterVec = register_int_counter_vec!(
        "questions_served_total",
        "Total number of questions handed out from the distribution queue",
        &["subject"]
    )
    .unwrap();

    pub static ref QUEUE_REFILLS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "queue_refills_total",
        "Total number of distribution queue refills",
        &["status"]
    )
    .unwrap();

    // Grading
    pub static ref ANSWERS_CHECKED_TOTAL: IntCounterVec = register_int_counter_vec!(
        "answers_checked_total",
        "Total number of answers graded",
        &["type", "correct"]
    )
    .unwrap();

    // Telemetry ingestion
    pub static ref TELEMETRY_ENQUEUED_TOTAL: IntCounterVec = register_int_counter_vec!(
        "telemetry_enqueued_total",
        "Total number of telemetry events pushed to ingestion queues",
        &["queue", "status"]
    )
    .unwrap();

    pub static ref TELEMETRY_DRAINED_TOTAL: IntCounterVec = register_int_counter_vec!(
        "telemetry_drained_total",
        "Total number of telemetry events processed by the drain worker",
        &["queue", "outcome"]
    )
    .unwrap();

    pub static ref DRAIN_WORKER_TICKS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "drain_worker_ticks_total",
        "Total number of drain worker loop iterations",
        &["queue", "status"]
    )
    .unwrap();
}

/// Renders all metrics in Prometheus text format
pub fn render_metrics() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    String::from_utf8(buffer)
        .map_err(|e| prometheus::Error::Msg(format!("Failed to convert metrics to UTF-8: {}", e)))
}
