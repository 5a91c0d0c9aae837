//! # Frame Protocol
//!
//! Every message on the wire is a single `Frame`: either a `Call` addressed to a
//! provider id, or a `Reply` correlated to a call by its sequence number.
//!
//! Frames and their payloads are encoded with bincode's serde bridge using the
//! standard configuration (little-endian, varint integers).

use serde::Deserialize;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::FailureReason;
use crate::error::Result;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Call {
    pub seq: u64,
    pub provider_id: u16,
    pub method: String,
    pub args: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reply {
    pub seq: u64,
    pub status: std::result::Result<Vec<u8>, FailureReason>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Frame {
    Call(Call),
    Reply(Reply),
}

impl Frame {
    pub fn encode(&self) -> Result<Vec<u8>> {
        encode(self)
    }

    pub fn decode(bytes: &[u8]) -> Result<Self> {
        decode(bytes)
    }
}

/// Encodes any serde value with the codec used for frames.
pub fn encode<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>> {
    Ok(bincode::serde::encode_to_vec(value, bincode::config::standard())?)
}

/// Decodes a value produced by [`encode`].
///
/// Trailing bytes are ignored, matching how the reader consumes only the
/// fields it knows about.
pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    let (value, _read) = bincode::serde::decode_from_slice(bytes, bincode::config::standard())?;
    Ok(value)
}
