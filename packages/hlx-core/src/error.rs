//! Centralized error types for the HLX core library.
//!
//! Errors are grouped by the layer that produces them: the data model,
//! the wire-protocol codec, the connection/exchange machinery, and the
//! configuration backing store. [`HlxError`] aggregates all of them for
//! callers that sit above the individual layers.

use serde::Serialize;
use thiserror::Error;

/// Trait for error types that provide machine-readable error codes.
///
/// Implement this trait to provide consistent error codes across different
/// error conversion paths.
pub trait ErrorCode {
    /// Returns a machine-readable error code for logs and event payloads.
    fn code(&self) -> &'static str;
}

/// Errors produced by the data model.
///
/// The first three variants are programmer errors: surfaced synchronously,
/// never retried. The rest are semantic errors: surfaced to the caller with
/// no state mutated.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "type", content = "details")]
pub enum ModelError {
    /// An argument was structurally invalid (zero identifier, empty name, etc.).
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// A property was read before any value was ever stored into it.
    #[error("Property not initialized: {0}")]
    NotInitialized(&'static str),

    /// A value fell outside its declared range.
    #[error("Value out of range: {0}")]
    OutOfRange(String),

    /// A volume level write was attempted on a fixed-volume output.
    #[error("Volume is fixed and cannot be adjusted")]
    VolumeLocked,

    /// A mutating command addressed a group with no member zones.
    #[error("Group {0} has no member zones")]
    EmptyGroup(u8),

    /// A name write collided with another entity of the same class.
    #[error("Name already in use: {0:?}")]
    DuplicateName(String),
}

impl ErrorCode for ModelError {
    fn code(&self) -> &'static str {
        match self {
            Self::InvalidArgument(_) => "invalid_argument",
            Self::NotInitialized(_) => "not_initialized",
            Self::OutOfRange(_) => "out_of_range",
            Self::VolumeLocked => "volume_locked",
            Self::EmptyGroup(_) => "empty_group",
            Self::DuplicateName(_) => "duplicate_name",
        }
    }
}

/// Errors produced by the wire-protocol codec.
///
/// Protocol errors never tear down the connection; they are logged and
/// surfaced as error notifications.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "type", content = "details")]
pub enum ProtocolError {
    /// A frame matched a pattern but carried values that do not parse or
    /// fall outside their declared domain.
    #[error("Malformed frame {frame:?}: {reason}")]
    Malformed {
        /// The offending frame payload.
        frame: String,
        /// What failed inside it.
        reason: String,
    },

    /// A frame matched no pattern in the dispatch table.
    #[error("Unknown command: {0:?}")]
    UnknownCommand(String),

    /// An inbound frame exceeded the per-frame byte cap and was discarded.
    #[error("Frame exceeded {0} bytes and was discarded")]
    FrameOverflow(usize),

    /// A response arrived that the head-of-queue exchange did not expect
    /// and that is not a recognizable state report either.
    #[error("Unexpected response: {0:?}")]
    UnexpectedResponse(String),
}

impl ErrorCode for ProtocolError {
    fn code(&self) -> &'static str {
        match self {
            Self::Malformed { .. } => "malformed",
            Self::UnknownCommand(_) => "unknown_command",
            Self::FrameOverflow(_) => "frame_overflow",
            Self::UnexpectedResponse(_) => "unexpected_response",
        }
    }
}

/// Errors produced by the connection manager and the exchange engine.
///
/// Any of these fails every pending exchange on the connection; the
/// connection transitions to idle and reconnecting is the caller's
/// responsibility.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "type", content = "details")]
pub enum ConnectionError {
    /// The underlying byte stream failed.
    #[error("Transport error: {0}")]
    Transport(String),

    /// The exchange timer expired with no matching response.
    #[error("Exchange timed out")]
    Timeout,

    /// The exchange was cancelled by a disconnect.
    #[error("Exchange cancelled")]
    Cancelled,

    /// The connection is not in a state that can carry an exchange.
    #[error("Not connected")]
    Disconnected,

    /// The peer address could not be resolved.
    #[error("Failed to resolve {0:?}")]
    Resolve(String),
}

impl ErrorCode for ConnectionError {
    fn code(&self) -> &'static str {
        match self {
            Self::Transport(_) => "transport_error",
            Self::Timeout => "timeout",
            Self::Cancelled => "cancelled",
            Self::Disconnected => "disconnected",
            Self::Resolve(_) => "resolve_failed",
        }
    }
}

impl From<std::io::Error> for ConnectionError {
    fn from(err: std::io::Error) -> Self {
        Self::Transport(err.to_string())
    }
}

/// Errors produced by the configuration backing store.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "type", content = "details")]
pub enum StorageError {
    /// The store could not be reached or written.
    #[error("Storage unavailable: {0}")]
    Unavailable(String),

    /// The stored blob exists but does not deserialize.
    #[error("Stored configuration is corrupt: {0}")]
    Corrupt(String),
}

impl ErrorCode for StorageError {
    fn code(&self) -> &'static str {
        match self {
            Self::Unavailable(_) => "storage_unavailable",
            Self::Corrupt(_) => "storage_corrupt",
        }
    }
}

/// Application-wide error type aggregating every layer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HlxError {
    /// A data-model error.
    #[error(transparent)]
    Model(#[from] ModelError),

    /// A wire-protocol error.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A connection or exchange error.
    #[error(transparent)]
    Connection(#[from] ConnectionError),

    /// A backing-store error.
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// A configuration validation error.
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl ErrorCode for HlxError {
    fn code(&self) -> &'static str {
        match self {
            Self::Model(e) => e.code(),
            Self::Protocol(e) => e.code(),
            Self::Connection(e) => e.code(),
            Self::Storage(e) => e.code(),
            Self::Configuration(_) => "configuration_error",
        }
    }
}

/// Convenient Result alias for model operations.
pub type ModelResult<T> = Result<T, ModelError>;

/// Convenient Result alias for codec operations.
pub type ProtocolResult<T> = Result<T, ProtocolError>;

/// Convenient Result alias for connection operations.
pub type ConnectionResult<T> = Result<T, ConnectionError>;

/// Convenient Result alias for backing-store operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Convenient Result alias for application-wide operations.
pub type HlxResult<T> = Result<T, HlxError>;
