//! Internal error helpers for mapping HTTP/reqwest errors to [`ApiError`].

use std::time::Duration;

use relay_types::ApiError;

/// Map a non-success HTTP status from the assistant service to an [`ApiError`].
pub(crate) fn map_http_status(status: reqwest::StatusCode, body: &str) -> ApiError {
    match status.as_u16() {
        400 | 409 | 422 => ApiError::InvalidRequest(body.to_string()),
        401 | 403 => ApiError::Authentication(body.to_string()),
        404 => ApiError::NotFound(body.to_string()),
        408 => ApiError::Timeout(Duration::from_secs(30)),
        429 => ApiError::RateLimit {
            retry_after: parse_retry_after(body),
        },
        500..=599 => ApiError::ServiceUnavailable(body.to_string()),
        _ => ApiError::InvalidRequest(format!("HTTP {status}: {body}")),
    }
}

/// Best-effort parse of "retry after N" from an error body.
fn parse_retry_after(body: &str) -> Option<Duration> {
    let lower = body.to_lowercase();
    let idx = lower.find("retry after ")?;
    let secs: String = lower[idx + 12..]
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    secs.parse::<u64>().ok().map(Duration::from_secs)
}

/// Map a [`reqwest::Error`] to an [`ApiError`].
pub(crate) fn map_reqwest_error(err: reqwest::Error) -> ApiError {
    if err.is_timeout() {
        ApiError::Timeout(Duration::from_secs(30))
    } else if err.is_decode() {
        ApiError::InvalidResponse(err.to_string())
    } else {
        ApiError::Network(Box::new(err))
    }
}

/// Map an error raised while reading the run's response body.
pub(crate) fn map_stream_error(err: reqwest::Error) -> ApiError {
    ApiError::Stream(format!("stream read error: {err}"))
}
