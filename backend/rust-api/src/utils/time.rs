use chrono::Utc;

/// Producer-side clock for telemetry events. Millisecond epoch,
/// monotonically non-decreasing per producer but not globally ordered.
pub fn epoch_millis() -> i64 {
    Utc::now().timestamp_millis()
}
