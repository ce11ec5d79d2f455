//! Rate-limit detection for GitHub API responses.
//!
//! GitHub signals rate limits through:
//! - HTTP 403 with "API rate limit exceeded" in the message
//! - HTTP 429 (secondary rate limit)

use http::StatusCode;

/// Check whether a GitHub error response indicates a rate limit.
pub(crate) fn is_rate_limited(status: StatusCode, message: &str) -> bool {
    if status == StatusCode::TOO_MANY_REQUESTS {
        return true;
    }
    let msg = message.to_lowercase();
    status == StatusCode::FORBIDDEN
        && (msg.contains("rate limit") || msg.contains("secondary rate limit"))
}
