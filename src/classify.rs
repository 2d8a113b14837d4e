//! Failure classification for the retry wrapper
//!
//! The Gemini API does not expose a structured error taxonomy, so
//! retryability is decided from the HTTP status code plus substring matching
//! on the free-text message. Best effort only: a misread costs a few extra
//! retries or a slightly-early surfaced error, never a wrong result.

/// How a failed call should be handled by the retry wrapper.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Expected to succeed if retried soon (short-lived rate limiting,
    /// temporary unavailability)
    Transient,

    /// A hard allowance (e.g. a daily quota) that will not clear within a
    /// sub-second backoff window
    QuotaExhausted,

    /// Never retried: malformed input, auth failure, non-rate-limit 4xx
    Fatal,
}

/// Message fragments that indicate a hard quota rather than short-lived rate
/// limiting.
const QUOTA_MARKERS: &[&str] = &["quota", "daily limit"];

/// Classify a failure response by status code and message text.
pub fn classify(status: u16, message: &str) -> ErrorClass {
    match status {
        429 if is_quota_message(message) => ErrorClass::QuotaExhausted,
        429 | 503 | 504 => ErrorClass::Transient,
        _ => ErrorClass::Fatal,
    }
}

fn is_quota_message(message: &str) -> bool {
    let message = message.to_ascii_lowercase();
    QUOTA_MARKERS.iter().any(|marker| message.contains(marker))
}
