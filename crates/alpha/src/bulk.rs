//! # Bulk Sums
//!
//! The caller exposes its arrays and sends only [`BulkLocation`]s. The
//! provider pulls both inputs, adds them element by element through the
//! backend, and pushes the sums into the output window. Elements are `i32`
//! in little-endian order.

use std::sync::Arc;

use alpharpc::Bulk;
use alpharpc::Engine;
use alpharpc::Exposure;
use serde::Deserialize;
use serde::Serialize;
use tracing::debug;

use crate::backend::Resource;
use crate::backend::run_blocking;
use crate::error::Error;
use crate::error::Result;

/// Size in bytes of one element.
pub const ELEMENT_SIZE: u64 = 4;

/// A window into a region exposed by the endpoint at `address`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkLocation {
    pub bulk: Bulk,
    pub address: String,
    pub offset: u64,
    pub size: u64,
}

impl BulkLocation {
    pub fn new(bulk: Bulk, address: impl Into<String>, offset: u64, size: u64) -> Self {
        Self {
            bulk,
            address: address.into(),
            offset,
            size,
        }
    }

    /// A window into a local exposure.
    pub fn within(exposure: &Exposure, offset: u64, size: u64) -> Self {
        Self::new(exposure.bulk(), exposure.address(), offset, size)
    }
}

/// Checks that three windows describe arrays of the same element count.
pub fn element_count(x: &BulkLocation, y: &BulkLocation, out: &BulkLocation) -> Result<usize> {
    if x.size != y.size || x.size != out.size {
        return Err(Error::InvalidArgument(format!(
            "Bulk sizes differ: x={} y={} out={}",
            x.size, y.size, out.size
        )));
    }
    if x.size % ELEMENT_SIZE != 0 {
        return Err(Error::InvalidArgument(format!(
            "Bulk size {} is not a multiple of {}",
            x.size, ELEMENT_SIZE
        )));
    }
    Ok((x.size / ELEMENT_SIZE) as usize)
}

pub fn encode_i32s(values: &[i32]) -> Vec<u8> {
    values.iter().flat_map(|v| v.to_le_bytes()).collect()
}

/// Decodes little-endian `i32`s. A trailing partial element is ignored.
pub fn decode_i32s(bytes: &[u8]) -> Vec<i32> {
    bytes
        .chunks_exact(ELEMENT_SIZE as usize)
        .map(|c| i32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect()
}

fn transfer(e: alpharpc::Error) -> Error {
    Error::Transfer(e.to_string())
}

/// Pulls `x` and `y`, sums them through `resource`, and pushes into `out`.
pub async fn compute_sums(
    engine: &Engine,
    resource: Arc<Resource>,
    x: &BulkLocation,
    y: &BulkLocation,
    out: &BulkLocation,
) -> Result<bool> {
    let count = element_count(x, y, out)?;
    if count == 0 {
        return Ok(true);
    }

    let lhs = engine
        .pull(&x.address, x.bulk, x.offset, x.size)
        .await
        .map_err(transfer)?;
    let rhs = engine
        .pull(&y.address, y.bulk, y.offset, y.size)
        .await
        .map_err(transfer)?;

    let sums = run_blocking(move || {
        let backend = resource.backend();
        decode_i32s(&lhs)
            .into_iter()
            .zip(decode_i32s(&rhs))
            .map(|(a, b)| backend.compute_sum(a, b))
            .collect::<Result<Vec<i32>>>()
    })
    .await?;

    engine
        .push(&out.address, out.bulk, out.offset, encode_i32s(&sums))
        .await
        .map_err(transfer)?;

    debug!(count, "Pushed bulk sums");
    Ok(true)
}
