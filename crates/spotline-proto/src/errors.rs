//! Wire-layer error types.

use thiserror::Error;

/// Convenience alias for wire-layer results.
pub type Result<T> = std::result::Result<T, WireError>;

/// Errors from encoding, decoding, or routing wire data.
///
/// Every variant is a local, recoverable condition: a malformed inbound frame
/// is logged and dropped by the caller, never escalated into a session-level
/// failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WireError {
    /// A frame or body could not be serialized.
    #[error("encode failed: {reason}")]
    Encode {
        /// Serializer diagnostic.
        reason: String,
    },

    /// A frame or body could not be parsed.
    #[error("decode failed: {reason}")]
    Decode {
        /// Parser diagnostic.
        reason: String,
    },

    /// A destination path does not match the routing grammar.
    #[error("unknown destination: {destination}")]
    UnknownDestination {
        /// The offending path.
        destination: String,
    },
}
