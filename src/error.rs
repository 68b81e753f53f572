//! Error types for the am43 library.

use thiserror::Error;
use uuid::Uuid;

/// The main error type for am43 operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Bluetooth backend error.
    #[error("bluetooth backend error: {0}")]
    Backend(#[from] btleplug::Error),

    /// Generic transport failure (used by non-btleplug transports).
    #[error("transport error: {message}")]
    Transport { message: String },

    /// An operation requiring an active session was invoked while disconnected.
    #[error("not connected")]
    NotConnected,

    /// Command timed out waiting for a reply notification.
    #[error("command timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    /// Malformed or unexpected reply from the device.
    #[error("protocol error: {message}")]
    Protocol { message: String },

    /// Reply did not carry the prefix expected for the outstanding command.
    #[error("unexpected reply prefix {received:02x?}, expected {expected:02x?}")]
    UnexpectedReply {
        expected: [u8; 2],
        received: Vec<u8>,
    },

    /// Requested position is outside the 0-100 percent range.
    #[error("position {0} out of range (expected 0-100 percent)")]
    InvalidPosition(u8),

    /// All connection attempts were exhausted.
    #[error("connection to device {address} failed after {attempts} attempts")]
    ConnectionFailed { address: String, attempts: u32 },

    /// No advertising device with the given address was found.
    #[error("device {address} not found")]
    DeviceNotFound { address: String },

    /// The peripheral does not expose the required characteristic.
    #[error("characteristic {0} not found")]
    CharacteristicNotFound(Uuid),

    /// The notification mailbox was closed while a reply was outstanding.
    #[error("reply channel closed")]
    ChannelClosed,
}

/// Result type alias for am43 operations.
pub type Result<T> = std::result::Result<T, Error>;
