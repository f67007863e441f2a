use std::time::Duration;

use alloy::transports::{RpcError, TransportErrorKind};

/// Whether an RPC failure is worth retrying.
///
/// Transport-level failures (timeouts, dropped connections, rate limits,
/// unavailable backends) are transient. JSON-RPC error responses are
/// transient only when the node flags them as retryable; everything else is
/// a structural failure of the request or the response.
pub fn is_transient_rpc_error(err: &RpcError<TransportErrorKind>) -> bool {
    match err {
        RpcError::Transport(TransportErrorKind::HttpError(http)) => {
            http.is_rate_limit_err() || http.is_temporarily_unavailable() || http.status >= 500
        }
        RpcError::Transport(_) => true,
        RpcError::ErrorResp(payload) => {
            payload.is_retry_err() || mentions_rate_limit(&payload.message)
        }
        RpcError::NullResp => true,
        RpcError::DeserError { text, .. } => mentions_rate_limit(text),
        _ => false,
    }
}

/// Backoff requested by the provider in the error payload, if any.
pub fn rpc_backoff_hint(err: &RpcError<TransportErrorKind>) -> Option<Duration> {
    let RpcError::ErrorResp(payload) = err else {
        return None;
    };

    let data = payload.try_data_as::<serde_json::Value>()?;
    let Ok(data) = data else {
        return None;
    };

    let backoff_seconds = data["rate"]["backoff_seconds"]
        .as_f64()
        .or_else(|| data["retry_after"].as_f64())?;
    if !backoff_seconds.is_finite() || backoff_seconds < 0.0 {
        return None;
    }
    Some(Duration::from_secs(backoff_seconds.ceil() as u64))
}

fn mentions_rate_limit(text: &str) -> bool {
    let lowered = text.to_ascii_lowercase();
    lowered.contains("rate limit")
        || lowered.contains("too many requests")
        || lowered.contains("request limit")
}
