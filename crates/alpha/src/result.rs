//! # Result Protocol
//!
//! Every remote operation answers with a `Result<V>`. On the wire this is
//! the serde encoding of `std::result::Result<V, Error>`: a variant tag
//! followed by the active branch only. An `Ok(())` is the tag alone.

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::warn;

use crate::error::Error;
use crate::error::Result;

/// Encodes a handler outcome as reply bytes.
///
/// An outcome that cannot be encoded is replaced by an `Rpc` failure, so
/// the caller always receives a decodable reply.
pub fn encode_reply<V: Serialize>(outcome: &Result<V>) -> Vec<u8> {
    match alpharpc::frame::encode(outcome) {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!(error = %e, "Could not encode result, replying with failure");
            let fallback: Result<V> = Err(Error::Rpc(e.to_string()));
            alpharpc::frame::encode(&fallback).unwrap_or_default()
        }
    }
}

/// Decodes reply bytes into the value or the error they carry.
pub fn decode_reply<V: DeserializeOwned>(bytes: &[u8]) -> Result<V> {
    alpharpc::frame::decode::<Result<V>>(bytes).map_err(Error::from)?
}
