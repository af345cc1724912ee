//! Transfer headers for the GET and PUT sub-protocols.
//!
//! # GET reply
//!
//! - 2 bytes: `"OK"` or `"NO"`
//! - 8 bytes: file size as a signed 64-bit integer (zero-filled on `"NO"`)
//! - on `"NO"` only: reason bytes, unterminated
//!
//! # PUT reply
//!
//! - 2 bytes: `"OK"` or `"NO"`
//! - on `"NO"` only: reason bytes, unterminated
//! - on `"OK"` the uploader sends the 8-byte size, then the body
//!
//! # Byte order
//!
//! Size fields use the host's native byte order. Peers on hosts with
//! different endianness will misread sizes; the protocol has no version or
//! negotiation step that could fix this.

use crate::error::{ProtocolError, Result};

/// Length of the status tag.
pub const TAG_LEN: usize = 2;

/// Length of the size field.
pub const SIZE_FIELD_LEN: usize = 8;

/// Length of a GET reply header: tag plus size field.
pub const GET_REPLY_SIZE: usize = TAG_LEN + SIZE_FIELD_LEN;

/// Length of a PUT reply tag.
pub const PUT_REPLY_SIZE: usize = TAG_LEN;

/// Tag for an accepted transfer.
pub const REPLY_OK: [u8; TAG_LEN] = *b"OK";

/// Tag for a refused transfer.
pub const REPLY_NO: [u8; TAG_LEN] = *b"NO";

/// Status carried by a transfer reply tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferStatus {
    /// Transfer accepted.
    Ok,
    /// Transfer refused; a reason follows.
    No,
}

impl TransferStatus {
    /// Wire tag for this status.
    pub fn tag(self) -> [u8; TAG_LEN] {
        match self {
            TransferStatus::Ok => REPLY_OK,
            TransferStatus::No => REPLY_NO,
        }
    }

    /// Parse a wire tag.
    pub fn from_tag(tag: [u8; TAG_LEN]) -> Result<Self> {
        match tag {
            REPLY_OK => Ok(TransferStatus::Ok),
            REPLY_NO => Ok(TransferStatus::No),
            other => Err(ProtocolError::InvalidTag(other)),
        }
    }
}

/// Fixed-size preamble of a GET reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GetHeader {
    /// The file will follow; `size` bytes exactly.
    Ok {
        /// File size as reported by the filesystem at validation time.
        size: i64,
    },
    /// The file will not follow; a reason follows the header.
    No,
}

impl GetHeader {
    /// Encode into the 10-byte wire form.
    pub fn encode(self) -> [u8; GET_REPLY_SIZE] {
        let mut buf = [0u8; GET_REPLY_SIZE];
        match self {
            GetHeader::Ok { size } => {
                buf[..TAG_LEN].copy_from_slice(&REPLY_OK);
                buf[TAG_LEN..].copy_from_slice(&encode_size(size));
            }
            GetHeader::No => {
                buf[..TAG_LEN].copy_from_slice(&REPLY_NO);
            }
        }
        buf
    }

    /// Decode from the 10-byte wire form.
    ///
    /// The size field of a `NO` header is padding and is not inspected.
    pub fn decode(buf: &[u8; GET_REPLY_SIZE]) -> Result<Self> {
        let tag = [buf[0], buf[1]];
        match TransferStatus::from_tag(tag)? {
            TransferStatus::Ok => {
                let mut size = [0u8; SIZE_FIELD_LEN];
                size.copy_from_slice(&buf[TAG_LEN..]);
                Ok(GetHeader::Ok {
                    size: decode_size(size),
                })
            }
            TransferStatus::No => Ok(GetHeader::No),
        }
    }

    /// Status of this header.
    pub fn status(self) -> TransferStatus {
        match self {
            GetHeader::Ok { .. } => TransferStatus::Ok,
            GetHeader::No => TransferStatus::No,
        }
    }
}

/// Decode a PUT reply tag.
pub fn decode_tag(tag: [u8; PUT_REPLY_SIZE]) -> Result<TransferStatus> {
    TransferStatus::from_tag(tag)
}

/// Encode a size field in native byte order.
pub fn encode_size(size: i64) -> [u8; SIZE_FIELD_LEN] {
    size.to_ne_bytes()
}

/// Decode a size field in native byte order.
pub fn decode_size(bytes: [u8; SIZE_FIELD_LEN]) -> i64 {
    i64::from_ne_bytes(bytes)
}

/// Build a complete refusal: header followed by the reason bytes.
///
/// GET refusals carry the zero-filled size padding, PUT refusals do not.
pub fn encode_get_refusal(reason: &str) -> Vec<u8> {
    let mut buf = Vec::with_capacity(GET_REPLY_SIZE + reason.len());
    buf.extend_from_slice(&GetHeader::No.encode());
    buf.extend_from_slice(reason.as_bytes());
    buf
}

/// Build a PUT refusal: `"NO"` followed by the reason bytes.
pub fn encode_put_refusal(reason: &str) -> Vec<u8> {
    let mut buf = Vec::with_capacity(PUT_REPLY_SIZE + reason.len());
    buf.extend_from_slice(&REPLY_NO);
    buf.extend_from_slice(reason.as_bytes());
    buf
}
