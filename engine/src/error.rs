//! Error types for the Syncline engine.

use crate::{ClientGroupId, ClientId, MutationId, ProfileId};
use thiserror::Error;

/// Which protocol message carried an unsupported version.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VersionKind {
    Push,
    Pull,
}

impl std::fmt::Display for VersionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VersionKind::Push => f.write_str("push"),
            VersionKind::Pull => f.write_str("pull"),
        }
    }
}

/// What a client has to do after a failed push or pull.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recovery {
    /// Transient failure, the same request may be sent again later.
    Retry,
    /// The client's local state is ahead of the server and must be rebuilt.
    Resync,
    /// The request cannot succeed without a client-side change.
    Fatal,
}

impl Recovery {
    /// Wire name of the recovery action.
    pub fn as_str(&self) -> &'static str {
        match self {
            Recovery::Retry => "retry",
            Recovery::Resync => "resync",
            Recovery::Fatal => "fatal",
        }
    }
}

/// All possible errors from the Syncline engine.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    // Request shape errors
    #[error("unsupported {kind} version: {version}")]
    ProtocolVersion { kind: VersionKind, version: i64 },

    // Identity errors
    #[error("unknown client group: {0}")]
    UnknownClientGroup(ClientGroupId),

    #[error("client {client_id} belongs to group {actual}, not {expected}")]
    ClientGroupMismatch {
        client_id: ClientId,
        expected: ClientGroupId,
        actual: ClientGroupId,
    },

    #[error("client group {client_group_id} is not owned by profile {profile_id}")]
    AuthMismatch {
        client_group_id: ClientGroupId,
        profile_id: ProfileId,
    },

    // Ordering errors
    #[error("mutation gap for client {client_id}: expected {expected}, got {actual}")]
    MutationOrderGap {
        client_id: ClientId,
        expected: MutationId,
        actual: MutationId,
    },

    // Domain errors
    #[error("handler error: {0}")]
    Handler(String),

    // Transient errors
    #[error("transaction conflict")]
    TransactionConflict,

    #[error("request deadline exceeded")]
    Timeout,

    #[error("storage error: {0}")]
    Storage(String),
}

impl Error {
    /// Build a domain failure from inside a [`Handler`](crate::Handler).
    pub fn handler(msg: impl std::fmt::Display) -> Self {
        Error::Handler(msg.to_string())
    }

    /// Classify the error by what the client should do next.
    pub fn recovery(&self) -> Recovery {
        match self {
            Error::TransactionConflict | Error::Timeout | Error::Storage(_) => Recovery::Retry,
            Error::MutationOrderGap { .. } => Recovery::Resync,
            Error::ProtocolVersion { .. }
            | Error::UnknownClientGroup(_)
            | Error::ClientGroupMismatch { .. }
            | Error::AuthMismatch { .. }
            | Error::Handler(_) => Recovery::Fatal,
        }
    }

    /// Whether the Syncer may run the transaction again.
    pub fn is_conflict(&self) -> bool {
        matches!(self, Error::TransactionConflict)
    }
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, Error>;
