//! # gmond-bridge Protocol
//!
//! Crate for encoding and decoding the Ganglia 3.1 gmetric wire format:
//! XDR primitives plus the metadata and string-value messages gmond accepts
//! on its UDP channel.

pub mod gmetric;
pub mod xdr;

pub use gmetric::{GangliaMessage, MetadataMessage, MetricId, Slope, ValueMessage};
pub use xdr::{XdrReader, XdrWriter};

use thiserror::Error;

/// Largest datagram we are willing to emit. gmond reads into a 1500 byte buffer.
pub const MAX_DATAGRAM_LEN: usize = 1500;

/// Errors that can occur while encoding or decoding gmetric messages.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum ProtocolError {
    #[error("Truncated XDR data: needed {needed} bytes, {remaining} remaining")]
    Truncated { needed: usize, remaining: usize },
    #[error("XDR string is not valid UTF-8")]
    InvalidUtf8,
    #[error("Invalid XDR boolean value {0}")]
    InvalidBool(u32),
    #[error("Unsupported gmetric message id {0}")]
    UnknownMessage(u32),
    #[error("Invalid slope value {0}")]
    InvalidSlope(u32),
    #[error("Encoded message is {len} bytes, limit is {MAX_DATAGRAM_LEN}")]
    Oversized { len: usize },
}
