//! Status -> outcome classification.

use contracts::{DispatchResult, Outcome, ResponseMode};

/// Classify an upstream status.
///
/// 2xx is `Success`, 429 is `RateLimited`, everything else `Failed`. Opaque
/// targets always complete as `SentUnconfirmed` since their status is not trusted.
pub fn classify_status(status: u16, mode: ResponseMode) -> Outcome {
    if mode == ResponseMode::Opaque {
        return Outcome::SentUnconfirmed;
    }
    match status {
        200..=299 => Outcome::Success,
        429 => Outcome::RateLimited,
        _ => Outcome::Failed,
    }
}

/// Build the normalized result for a received response
pub fn result_for_status(
    status: u16,
    reason: Option<&str>,
    detail: &str,
    latency_ms: u64,
    mode: ResponseMode,
) -> DispatchResult {
    let outcome = classify_status(status, mode);
    let status_line = match reason {
        Some(reason) => format!("{status} {reason}"),
        None => status.to_string(),
    };
    let message = if detail.is_empty() {
        status_line
    } else {
        format!("{status_line} | {detail}")
    };
    DispatchResult::completed(outcome, status, latency_ms, message)
}

/// Truncate a response body for log messages, on a char boundary
pub fn preview(body: &str, limit: usize) -> String {
    let trimmed = body.trim();
    match trimmed.char_indices().nth(limit) {
        Some((cut, _)) => format!("{}...", &trimmed[..cut]),
        None => trimmed.to_string(),
    }
}
