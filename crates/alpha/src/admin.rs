//! Client-side administration of a provider's resources.

use alpharpc::Engine;

use crate::error::Result;
use crate::future::Future;
use crate::id::ResourceId;
use crate::result::decode_reply;
use crate::rpc;
use crate::rpc::AttachArgs;
use crate::rpc::ReleaseArgs;

#[derive(Clone)]
pub struct Admin {
    engine: Engine,
}

impl Admin {
    pub fn new(engine: Engine) -> Self {
        Self { engine }
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    /// Creates a resource of `backend_type` configured by the JSON in `config`.
    pub fn create_resource(
        &self,
        address: &str,
        provider_id: u16,
        token: &str,
        backend_type: &str,
        config: &str,
    ) -> Result<Future<ResourceId>> {
        self.attach(rpc::CREATE_RESOURCE, address, provider_id, token, backend_type, config)
    }

    /// Attaches the provider to an existing resource of `backend_type`.
    pub fn open_resource(
        &self,
        address: &str,
        provider_id: u16,
        token: &str,
        backend_type: &str,
        config: &str,
    ) -> Result<Future<ResourceId>> {
        self.attach(rpc::OPEN_RESOURCE, address, provider_id, token, backend_type, config)
    }

    /// Detaches a resource without destroying it.
    pub fn close_resource(&self, address: &str, provider_id: u16, token: &str, id: ResourceId) -> Result<Future<bool>> {
        self.release(rpc::CLOSE_RESOURCE, address, provider_id, token, id)
    }

    pub fn destroy_resource(&self, address: &str, provider_id: u16, token: &str, id: ResourceId) -> Result<Future<bool>> {
        self.release(rpc::DESTROY_RESOURCE, address, provider_id, token, id)
    }

    fn attach(
        &self,
        method: &str,
        address: &str,
        provider_id: u16,
        token: &str,
        backend_type: &str,
        config: &str,
    ) -> Result<Future<ResourceId>> {
        let args = AttachArgs {
            token: token.to_string(),
            backend_type: backend_type.to_string(),
            config: config.to_string(),
        };
        rpc::invoke(&self.engine, address, provider_id, method, &args, None, Box::new(|bytes: Vec<u8>| decode_reply::<ResourceId>(&bytes)))
    }

    fn release(&self, method: &str, address: &str, provider_id: u16, token: &str, id: ResourceId) -> Result<Future<bool>> {
        let args = ReleaseArgs {
            token: token.to_string(),
            id,
        };
        rpc::invoke(&self.engine, address, provider_id, method, &args, None, Box::new(|bytes: Vec<u8>| decode_reply::<bool>(&bytes)))
    }
}
