// ABOUTME: Error type for outbound carrier links: transport, codec, carrier status and timeouts
// ABOUTME: Classifies failures as retryable so the queue layer can decide whether to re-attempt

use crate::codec::CodecError;
use crate::connection::ReadError;
use crate::datatypes::{CommandStatus, describe_status};
use std::io;
use thiserror::Error;

/// Error type for outbound client operations
#[derive(Debug, Error)]
pub enum SmppError {
    /// I/O error during network operations (connection, read, write)
    #[error("Connection error: {0}")]
    Connection(#[from] io::Error),

    /// A frame could not be encoded or the carrier sent one we could not decode
    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),

    /// The carrier answered with a nonzero command_status
    #[error("Carrier returned {}", status_text(.0))]
    CarrierStatus(u32),

    /// No matching response arrived before the deadline
    #[error("Operation timeout")]
    Timeout,

    /// Unexpected PDU received (wrong response type for request)
    #[error("Unexpected PDU: expected {expected}, got {actual}")]
    UnexpectedPdu { expected: String, actual: String },

    /// The link went away while the request was pending
    #[error("Connection closed")]
    ConnectionClosed,
}

fn status_text(raw: &u32) -> String {
    describe_status(*raw)
}

/// Result type alias for SMPP operations
pub type SmppResult<T> = Result<T, SmppError>;

impl SmppError {
    /// Whether another attempt, possibly on a fresh link, could succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            SmppError::Connection(_) | SmppError::Timeout | SmppError::ConnectionClosed => true,
            SmppError::CarrierStatus(raw) => CommandStatus::try_from(*raw)
                .map(CommandStatus::is_transient)
                .unwrap_or(false),
            _ => false,
        }
    }

    /// The carrier's command_status, when that is what failed.
    pub fn carrier_status(&self) -> Option<u32> {
        match self {
            SmppError::CarrierStatus(raw) => Some(*raw),
            _ => None,
        }
    }
}

impl From<ReadError> for SmppError {
    fn from(err: ReadError) -> Self {
        match err {
            ReadError::Malformed { source, .. } => SmppError::Codec(source),
            ReadError::ConnectionReset => SmppError::ConnectionClosed,
            ReadError::Io(e) => SmppError::Connection(e),
        }
    }
}
