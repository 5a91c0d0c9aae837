//! # Alpha Client
//!
//! A `Client` wraps an engine for calling alpha providers. Resource handles
//! made from it name one resource on one provider and issue operations
//! against it. Every operation returns a [`Future`] without waiting.

use std::sync::Arc;
use std::time::Duration;
use std::time::Instant;

use alpharpc::BulkMode;
use alpharpc::Engine;

use crate::bulk;
use crate::bulk::BulkLocation;
use crate::bulk::ELEMENT_SIZE;
use crate::error::Error;
use crate::error::Result;
use crate::future::Future;
use crate::id::ResourceId;
use crate::result::decode_reply;
use crate::rpc;
use crate::rpc::CheckArgs;
use crate::rpc::SumArgs;
use crate::rpc::SumsArgs;

#[derive(Clone)]
pub struct Client {
    engine: Engine,
}

impl Client {
    pub fn new(engine: Engine) -> Self {
        Self { engine }
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    /// The client keeps no configuration of its own.
    pub fn get_config(&self) -> String {
        "{}".to_string()
    }

    /// Makes a handle to `resource_id` on the provider at `address`.
    ///
    /// With `verify`, blocks on a check call and fails if the provider or the
    /// resource cannot be found. Without it, nothing is sent. Verifying from
    /// a thread inside a runtime context fails with `Rpc`.
    pub fn make_resource_handle(
        &self,
        address: &str,
        provider_id: u16,
        resource_id: ResourceId,
        verify: bool,
    ) -> Result<ResourceHandle> {
        let handle = ResourceHandle {
            inner: Some(Arc::new(HandleInner {
                client: self.clone(),
                address: address.to_string(),
                provider_id,
                resource_id,
            })),
        };

        if verify {
            handle.check()?.wait()?;
        }
        Ok(handle)
    }
}

struct HandleInner {
    client: Client,
    address: String,
    provider_id: u16,
    resource_id: ResourceId,
}

/// Handle to one remote resource. The default handle is unconstructed and
/// fails every operation with `InvalidHandle`.
#[derive(Clone, Default)]
pub struct ResourceHandle {
    inner: Option<Arc<HandleInner>>,
}

impl ResourceHandle {
    pub fn is_valid(&self) -> bool {
        self.inner.is_some()
    }

    fn inner(&self) -> Result<&HandleInner> {
        self.inner.as_deref().ok_or(Error::InvalidHandle)
    }

    pub fn client(&self) -> Result<Client> {
        Ok(self.inner()?.client.clone())
    }

    pub fn resource_id(&self) -> Result<ResourceId> {
        Ok(self.inner()?.resource_id)
    }

    pub fn address(&self) -> Result<&str> {
        Ok(self.inner()?.address.as_str())
    }

    pub fn provider_id(&self) -> Result<u16> {
        Ok(self.inner()?.provider_id)
    }

    /// Asks the provider whether the resource exists.
    pub fn check(&self) -> Result<Future<bool>> {
        let inner = self.inner()?;
        let args = CheckArgs { id: inner.resource_id };
        inner.invoke(rpc::CHECK, &args, None, Box::new(|bytes: Vec<u8>| decode_reply::<bool>(&bytes)))
    }

    /// Adds `x` and `y` on the resource.
    pub fn compute_sum(&self, x: i32, y: i32) -> Result<Future<i32>> {
        self.sum(x, y, None)
    }

    /// Like [`compute_sum`](Self::compute_sum), failing with `Timeout` if no
    /// reply arrives within `timeout`.
    pub fn compute_sum_with_timeout(&self, x: i32, y: i32, timeout: Duration) -> Result<Future<i32>> {
        self.sum(x, y, Some(Instant::now() + timeout))
    }

    fn sum(&self, x: i32, y: i32, deadline: Option<Instant>) -> Result<Future<i32>> {
        let inner = self.inner()?;
        let args = SumArgs {
            id: inner.resource_id,
            x,
            y,
        };
        inner.invoke(rpc::COMPUTE_SUM, &args, deadline, Box::new(|bytes: Vec<u8>| decode_reply::<i32>(&bytes)))
    }

    /// Adds two arrays element by element through a bulk transfer.
    ///
    /// Both inputs share one read-only exposure; the sums land in a
    /// write-only exposure that is read back when the reply arrives.
    pub fn compute_sums(&self, x: &[i32], y: &[i32]) -> Result<Future<Vec<i32>>> {
        let inner = self.inner()?;
        if x.len() != y.len() {
            return Err(Error::InvalidArgument(format!(
                "Input lengths differ: {} and {}",
                x.len(),
                y.len()
            )));
        }

        let size = x.len() as u64 * ELEMENT_SIZE;
        let engine = inner.client.engine();

        let mut inputs = bulk::encode_i32s(x);
        inputs.extend_from_slice(&bulk::encode_i32s(y));
        let input = engine.expose(inputs, BulkMode::ReadOnly);
        let output = engine.expose(vec![0; size as usize], BulkMode::WriteOnly);

        let args = SumsArgs {
            id: inner.resource_id,
            x: BulkLocation::within(&input, 0, size),
            y: BulkLocation::within(&input, size, size),
            out: BulkLocation::within(&output, 0, size),
        };

        inner.invoke(
            rpc::COMPUTE_SUMS,
            &args,
            None,
            Box::new(move |bytes: Vec<u8>| -> Result<Vec<i32>> {
                drop(input);
                decode_reply::<bool>(&bytes)?;
                Ok(bulk::decode_i32s(&output.read()?))
            }),
        )
    }

    /// Runs a bulk sum over windows the caller has exposed itself.
    pub fn compute_sums_from_bulk(
        &self,
        x: &BulkLocation,
        y: &BulkLocation,
        out: &BulkLocation,
    ) -> Result<Future<bool>> {
        let inner = self.inner()?;
        bulk::element_count(x, y, out)?;
        let args = SumsArgs {
            id: inner.resource_id,
            x: x.clone(),
            y: y.clone(),
            out: out.clone(),
        };
        inner.invoke(rpc::COMPUTE_SUMS, &args, None, Box::new(|bytes: Vec<u8>| decode_reply::<bool>(&bytes)))
    }
}

impl HandleInner {
    fn invoke<A: serde::Serialize, T: Send + 'static>(
        &self,
        method: &str,
        args: &A,
        deadline: Option<Instant>,
        finish: crate::future::Finish<T>,
    ) -> Result<Future<T>> {
        rpc::invoke(
            self.client.engine(),
            &self.address,
            self.provider_id,
            method,
            args,
            deadline,
            finish,
        )
    }
}
