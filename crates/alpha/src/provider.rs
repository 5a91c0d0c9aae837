//! # Alpha Provider
//!
//! A `Provider` serves the alpha methods under one provider id on an
//! [`Engine`]. It owns a table of resources, each backed by a [`Backend`](crate::Backend)
//! built through the registry, and answers every request exactly once.
//!
//! Handlers run on the provider's pool (the engine runtime unless a pool was
//! given). They look a resource up, release the table, and call the backend
//! through an `Arc`, so a concurrent destroy never pulls a backend out from
//! under a running call. Backend calls and factories go to the blocking pool,
//! leaving the workers free for table operations.
//!
//! ```ignore
//! let provider = Provider::builder(engine, 42)
//!     .config(r#"{ "resources": [ { "type": "reference" } ] }"#)
//!     .token("secret")
//!     .build()?;
//! ```
//!
//! Dropping the provider deregisters it and destroys every remaining backend.

use std::sync::Arc;

use alpharpc::Engine;
use alpharpc::Request;
use alpharpc::Responder;
use alpharpc::Service;
use serde::Serialize;
use tokio::runtime::Handle;
use tracing::debug;
use tracing::error;
use tracing::info;
use tracing::trace;
use tracing::warn;

use crate::backend::Resource;
use crate::backend::run_blocking;
use crate::bulk;
use crate::config;
use crate::config::ProviderConfig;
use crate::config::ResourceSpec;
use crate::error::Error;
use crate::error::Result;
use crate::id::ResourceId;
use crate::registry;
use crate::result::encode_reply;
use crate::rpc;
use crate::rpc::AttachArgs;
use crate::rpc::CheckArgs;
use crate::rpc::ReleaseArgs;
use crate::rpc::SumArgs;
use crate::rpc::SumsArgs;
use crate::table::ResourceTable;

/// Replies with `result` when dropped, whichever way the handler exits.
struct AutoResponse<T: Serialize> {
    responder: Option<Responder>,
    result: Result<T>,
}

impl<T: Serialize> AutoResponse<T> {
    fn new(responder: Responder) -> Self {
        Self {
            responder: Some(responder),
            result: Err(Error::OperationFailed("Handler exited before producing a result".into())),
        }
    }
}

impl<T: Serialize> Drop for AutoResponse<T> {
    fn drop(&mut self) {
        if let Some(responder) = self.responder.take() {
            responder.respond(encode_reply(&self.result));
        }
    }
}

pub struct ProviderBuilder {
    engine: Engine,
    provider_id: u16,
    config: String,
    token: String,
    pool: Option<Handle>,
}

impl ProviderBuilder {
    /// JSON configuration naming the resources to attach at startup.
    pub fn config(mut self, config: impl Into<String>) -> Self {
        self.config = config.into();
        self
    }

    /// Secret required by create, open, close and destroy. Empty disables the check.
    pub fn token(mut self, token: impl Into<String>) -> Self {
        self.token = token.into();
        self
    }

    /// Pool that runs request handlers.
    pub fn pool(mut self, pool: Handle) -> Self {
        self.pool = Some(pool);
        self
    }

    pub fn build(self) -> Result<Provider> {
        let config = ProviderConfig::parse(&self.config)?;

        let state = Arc::new(ProviderState {
            engine: self.engine,
            provider_id: self.provider_id,
            token: self.token,
            pool: self.pool,
            table: ResourceTable::new(),
        });

        state
            .engine
            .register(state.provider_id, state.clone())
            .map_err(Error::from)?;
        let provider = Provider { state };

        if let Some(entry) = &config.resource {
            provider.state.attach_entry(entry)?;
        }
        for entry in &config.resources {
            if let Err(e) = provider.state.attach_entry(entry) {
                error!(
                    provider_id = provider.state.provider_id,
                    backend = %entry.backend_type,
                    error = %e,
                    "Skipping resource from configuration"
                );
            }
        }

        info!(
            provider_id = provider.state.provider_id,
            address = provider.state.engine.address(),
            resources = provider.state.table.len(),
            "Registered alpha provider"
        );
        Ok(provider)
    }
}

pub struct Provider {
    state: Arc<ProviderState>,
}

impl Provider {
    pub fn builder(engine: Engine, provider_id: u16) -> ProviderBuilder {
        ProviderBuilder {
            engine,
            provider_id,
            config: String::new(),
            token: String::new(),
            pool: None,
        }
    }

    pub fn provider_id(&self) -> u16 {
        self.state.provider_id
    }

    pub fn engine(&self) -> &Engine {
        &self.state.engine
    }

    /// Live resources in the configuration format, each with its `__id__`.
    pub fn get_config(&self) -> String {
        let snapshot = self.state.table.snapshot();
        config::render(snapshot.iter().map(|(id, resource)| (*id, resource.as_ref())))
    }

    pub fn resource_ids(&self) -> Vec<ResourceId> {
        self.state.table.ids()
    }

    pub fn len(&self) -> usize {
        self.state.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.table.is_empty()
    }
}

impl Drop for Provider {
    fn drop(&mut self) {
        let state = &self.state;
        trace!(provider_id = state.provider_id, "Deregistering alpha provider");
        state.engine.deregister(state.provider_id);

        for (id, resource) in state.table.drain() {
            debug!(provider_id = state.provider_id, resource_id = %id, "Destroying resource");
            if let Err(e) = resource.backend().destroy() {
                warn!(provider_id = state.provider_id, resource_id = %id, error = %e, "Backend destroy failed");
            }
        }
        trace!(provider_id = state.provider_id, "Alpha provider successfully cleaned up");
    }
}

struct ProviderState {
    engine: Engine,
    provider_id: u16,
    token: String,
    pool: Option<Handle>,
    table: ResourceTable,
}

impl ProviderState {
    fn authorize(&self, token: &str) -> Result<()> {
        if !self.token.is_empty() && self.token.as_bytes() != token.as_bytes() {
            return Err(Error::Unauthorized);
        }
        Ok(())
    }

    fn attach_entry(&self, entry: &ResourceSpec) -> Result<ResourceId> {
        let resource = registry::create_resource(&entry.backend_type, &self.engine, &entry.config)?;
        self.attach(entry.id.unwrap_or_default(), resource)
    }

    fn attach(&self, id: ResourceId, resource: Resource) -> Result<ResourceId> {
        let backend_type = resource.backend_type().to_string();
        self.table.insert(id, resource)?;
        debug!(provider_id = self.provider_id, resource_id = %id, backend = %backend_type, "Attached resource");
        Ok(id)
    }

    fn check(&self, args: &[u8]) -> Result<bool> {
        let args: CheckArgs = rpc::decode_args(args)?;
        if !self.table.contains(&args.id) {
            return Err(Error::ResourceNotFound(args.id));
        }
        Ok(true)
    }

    async fn create_resource(&self, args: &[u8]) -> Result<ResourceId> {
        let args: AttachArgs = rpc::decode_args(args)?;
        self.authorize(&args.token)?;
        let config = config::parse_backend_config(&args.config)?;
        let engine = self.engine.clone();
        let resource =
            run_blocking(move || registry::create_resource(&args.backend_type, &engine, &config)).await?;
        self.attach(ResourceId::new(), resource)
    }

    async fn open_resource(&self, args: &[u8]) -> Result<ResourceId> {
        let args: AttachArgs = rpc::decode_args(args)?;
        self.authorize(&args.token)?;
        let config = config::parse_backend_config(&args.config)?;
        let engine = self.engine.clone();
        let resource =
            run_blocking(move || registry::open_resource(&args.backend_type, &engine, &config)).await?;
        self.attach(ResourceId::new(), resource)
    }

    fn close_resource(&self, args: &[u8]) -> Result<bool> {
        let args: ReleaseArgs = rpc::decode_args(args)?;
        self.authorize(&args.token)?;
        self.table.remove(&args.id)?;
        debug!(provider_id = self.provider_id, resource_id = %args.id, "Closed resource");
        Ok(true)
    }

    async fn destroy_resource(&self, args: &[u8]) -> Result<bool> {
        let args: ReleaseArgs = rpc::decode_args(args)?;
        self.authorize(&args.token)?;
        let resource = self.table.remove(&args.id)?;
        let destroyed = run_blocking(move || resource.backend().destroy()).await?;
        debug!(provider_id = self.provider_id, resource_id = %args.id, "Destroyed resource");
        Ok(destroyed)
    }

    async fn compute_sum(&self, args: &[u8]) -> Result<i32> {
        let args: SumArgs = rpc::decode_args(args)?;
        let resource = self.table.get(&args.id)?;
        run_blocking(move || resource.backend().compute_sum(args.x, args.y)).await
    }

    async fn compute_sums(&self, args: &[u8]) -> Result<bool> {
        let args: SumsArgs = rpc::decode_args(args)?;
        bulk::element_count(&args.x, &args.y, &args.out)?;
        let resource = self.table.get(&args.id)?;
        bulk::compute_sums(&self.engine, resource, &args.x, &args.y, &args.out).await
    }

    /// Logs a failed handler outcome.
    fn log_outcome<T>(&self, method: &str, outcome: &Result<T>) {
        if let Err(e) = outcome {
            error!(provider_id = self.provider_id, method, error = %e, "Request failed");
        }
    }
}

#[async_trait::async_trait]
impl Service for ProviderState {
    fn pool(&self) -> Option<Handle> {
        self.pool.clone()
    }

    async fn handle(&self, request: Request, responder: Responder) {
        let method = request.method.as_str();
        trace!(provider_id = self.provider_id, method, from = %request.from, "Received request");

        match method {
            rpc::CHECK => {
                let mut response = AutoResponse::new(responder);
                response.result = self.check(&request.args);
            }
            rpc::CREATE_RESOURCE => {
                let mut response = AutoResponse::new(responder);
                response.result = self.create_resource(&request.args).await;
                self.log_outcome(method, &response.result);
            }
            rpc::OPEN_RESOURCE => {
                let mut response = AutoResponse::new(responder);
                response.result = self.open_resource(&request.args).await;
                self.log_outcome(method, &response.result);
            }
            rpc::CLOSE_RESOURCE => {
                let mut response = AutoResponse::new(responder);
                response.result = self.close_resource(&request.args);
                self.log_outcome(method, &response.result);
            }
            rpc::DESTROY_RESOURCE => {
                let mut response = AutoResponse::new(responder);
                response.result = self.destroy_resource(&request.args).await;
                self.log_outcome(method, &response.result);
            }
            rpc::COMPUTE_SUM => {
                let mut response = AutoResponse::new(responder);
                response.result = self.compute_sum(&request.args).await;
            }
            rpc::COMPUTE_SUMS => {
                let mut response = AutoResponse::new(responder);
                response.result = self.compute_sums(&request.args).await;
                self.log_outcome(method, &response.result);
            }
            other => {
                debug!(provider_id = self.provider_id, method = other, "Unknown method");
                responder.fail(alpharpc::FailureReason::MethodNotFound(other.to_string()));
            }
        }
    }
}
