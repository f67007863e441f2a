use std::time::Duration;

use alloy::transports::{RpcError, TransportErrorKind};

use crate::error_classification::{is_transient_rpc_error, rpc_backoff_hint};

/// Failure reported by a [`RemoteEventSource`](crate::RemoteEventSource).
///
/// The split decides whether the range fetcher retries the sub-range.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EventSourceError {
    /// Timeout, rate limiting or an unavailable backend; retrying may succeed.
    #[error("Transient event source failure: {reason}")]
    Transient {
        reason: String,
        /// Backoff requested by the provider, if it sent one.
        retry_after: Option<Duration>,
    },

    /// Malformed response or invalid request; retrying will not help.
    #[error("Structural event source failure: {reason}")]
    Structural { reason: String },
}

impl EventSourceError {
    pub fn transient(reason: impl Into<String>) -> Self {
        Self::Transient {
            reason: reason.into(),
            retry_after: None,
        }
    }

    pub fn structural(reason: impl Into<String>) -> Self {
        Self::Structural {
            reason: reason.into(),
        }
    }

    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient { .. })
    }

    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::Transient { retry_after, .. } => *retry_after,
            Self::Structural { .. } => None,
        }
    }

    /// Classify an RPC failure from the alloy transport stack.
    pub(crate) fn from_rpc(operation: &str, err: RpcError<TransportErrorKind>) -> Self {
        let reason = format!("{operation}: {err}");
        if is_transient_rpc_error(&err) {
            Self::Transient {
                reason,
                retry_after: rpc_backoff_hint(&err),
            }
        } else {
            Self::Structural { reason }
        }
    }
}

/// Failure while building a concrete event source.
#[derive(Debug, thiserror::Error)]
pub enum EventSourceInitError {
    #[error("Invalid RPC URL '{url}': {reason}")]
    InvalidRpcUrl { url: String, reason: String },

    #[error("RPC connection failed after trying {attempts} endpoint(s)")]
    RpcConnectionFailed { attempts: usize },
}
