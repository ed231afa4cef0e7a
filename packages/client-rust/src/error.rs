//! The single failure type returned by `Client::invoke`.

use wirecall_core::{CodecError, TypedFault};

use crate::transport::TransportError;

/// Every way an invocation can fail. Exactly one is returned per failed call.
#[derive(Debug, thiserror::Error)]
pub enum InvokeError {
    #[error("unknown operation: {name}")]
    UnknownOperation { name: String },
    #[error("{operation} expects {role} type {expected}, got {found}")]
    TypeMismatch {
        operation: String,
        role: &'static str,
        expected: &'static str,
        found: &'static str,
    },
    #[error(transparent)]
    Encode(CodecError),
    #[error(transparent)]
    Transport(TransportError),
    #[error("no reply within {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },
    #[error("invocation cancelled")]
    Cancelled,
    #[error("malformed response for {operation}: {reason}")]
    MalformedResponse { operation: String, reason: String },
    #[error(transparent)]
    Fault(#[from] TypedFault),
}

impl InvokeError {
    /// Whether repeating the same call could plausibly succeed.
    ///
    /// The client never retries on its own; this is for callers that do.
    /// Faults are retryable when their `FaultType` was registered as such.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Timeout { .. } | Self::Transport(_) => true,
            Self::Fault(fault) => fault.is_retryable(),
            _ => false,
        }
    }

    /// The typed fault, if the service answered with one.
    #[must_use]
    pub fn fault(&self) -> Option<&TypedFault> {
        match self {
            Self::Fault(fault) => Some(fault),
            _ => None,
        }
    }

    /// Short label used for metrics and log fields.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::UnknownOperation { .. } => "unknown_operation",
            Self::TypeMismatch { .. } => "type_mismatch",
            Self::Encode(_) => "encode",
            Self::Transport(_) => "transport",
            Self::Timeout { .. } => "timeout",
            Self::Cancelled => "cancelled",
            Self::MalformedResponse { .. } => "malformed_response",
            Self::Fault(_) => "fault",
        }
    }
}

impl From<TransportError> for InvokeError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::Timeout { timeout_ms } => Self::Timeout { timeout_ms },
            other => Self::Transport(other),
        }
    }
}
