//! # Backend Interface
//!
//! A backend owns the state of one resource. Providers hold backends behind
//! `Arc<Resource>` and never serialize calls into them, so a backend that
//! keeps mutable state must synchronize it itself.
//!
//! Backend methods are synchronous and may block. Providers call them through
//! [`run_blocking`] so a slow backend never holds up a runtime worker.

use std::fmt;

use alpharpc::Engine;
use serde_json::Value;

use crate::error::Error;
use crate::error::Result;

pub trait Backend: Send + Sync + 'static {
    /// Current configuration as JSON text.
    fn get_config(&self) -> String;

    fn compute_sum(&self, x: i32, y: i32) -> Result<i32>;

    /// Releases whatever the backend owns. Called at most once per instance.
    fn destroy(&self) -> Result<bool>;
}

/// A backend that can be registered by type.
///
/// `create` builds a fresh resource; `open` attaches to one that already
/// exists outside the provider.
pub trait BackendType: Backend + Sized {
    fn create(engine: &Engine, config: &Value) -> anyhow::Result<Self>;

    fn open(engine: &Engine, config: &Value) -> anyhow::Result<Self>;
}

/// A live backend, tagged with the registry name that built it.
pub struct Resource {
    backend_type: String,
    backend: Box<dyn Backend>,
}

impl Resource {
    pub fn new(backend_type: impl Into<String>, backend: Box<dyn Backend>) -> Self {
        Self {
            backend_type: backend_type.into(),
            backend,
        }
    }

    pub fn backend_type(&self) -> &str {
        &self.backend_type
    }

    pub fn backend(&self) -> &dyn Backend {
        self.backend.as_ref()
    }
}

impl fmt::Debug for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resource")
            .field("backend_type", &self.backend_type)
            .finish_non_exhaustive()
    }
}

/// Runs synchronous backend work on the blocking pool of the current runtime.
pub(crate) async fn run_blocking<T, F>(work: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| Error::OperationFailed(format!("Backend task failed: {}", e)))?
}
