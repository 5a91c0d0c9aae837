//! Wire names and argument layouts of the provider's methods.

use std::time::Instant;

use alpharpc::Engine;
use serde::Deserialize;
use serde::Serialize;

use crate::bulk::BulkLocation;
use crate::error::Error;
use crate::error::Result;
use crate::future::Finish;
use crate::future::Future;
use crate::id::ResourceId;

pub const CHECK: &str = "alpha_check";
pub const CREATE_RESOURCE: &str = "alpha_create_resource";
pub const OPEN_RESOURCE: &str = "alpha_open_resource";
pub const CLOSE_RESOURCE: &str = "alpha_close_resource";
pub const DESTROY_RESOURCE: &str = "alpha_destroy_resource";
pub const COMPUTE_SUM: &str = "alpha_compute_sum";
pub const COMPUTE_SUMS: &str = "alpha_compute_sums";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckArgs {
    pub id: ResourceId,
}

/// Shared by create and open. `config` is JSON text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttachArgs {
    pub token: String,
    pub backend_type: String,
    pub config: String,
}

/// Shared by close and destroy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReleaseArgs {
    pub token: String,
    pub id: ResourceId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SumArgs {
    pub id: ResourceId,
    pub x: i32,
    pub y: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SumsArgs {
    pub id: ResourceId,
    pub x: BulkLocation,
    pub y: BulkLocation,
    pub out: BulkLocation,
}

pub fn decode_args<A: serde::de::DeserializeOwned>(bytes: &[u8]) -> Result<A> {
    alpharpc::frame::decode(bytes).map_err(|e| Error::Rpc(format!("Malformed arguments: {}", e)))
}

/// Encodes `args` and issues `method` without waiting for the reply.
pub(crate) fn invoke<A: Serialize, T: Send + 'static>(
    engine: &Engine,
    address: &str,
    provider_id: u16,
    method: &str,
    args: &A,
    deadline: Option<Instant>,
    finish: Finish<T>,
) -> Result<Future<T>> {
    let bytes = alpharpc::frame::encode(args)?;
    let call = engine.call(address, provider_id, method, bytes, deadline)?;
    Ok(Future::new(call, deadline, finish))
}
