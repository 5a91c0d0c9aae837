//! # Backend Registry
//!
//! Process-wide map from backend names to the factories that build them.
//! Built-in backends are present from first use; others are added with
//! [`register`] or [`register_fns`] before providers that need them start.
//! Registering a name again replaces the earlier factories.

use std::sync::Arc;

use alpharpc::Engine;
use dashmap::DashMap;
use once_cell::sync::Lazy;
use serde_json::Value;
use tracing::debug;

use crate::backend::Backend;
use crate::backend::BackendType;
use crate::backend::Resource;
use crate::error::Error;
use crate::error::Result;
use crate::reference::ReferenceBackend;

type Factory = Arc<dyn Fn(&Engine, &Value) -> anyhow::Result<Box<dyn Backend>> + Send + Sync>;

#[derive(Clone)]
struct Entry {
    create: Factory,
    open: Factory,
}

static REGISTRY: Lazy<DashMap<String, Entry>> = Lazy::new(|| {
    let registry = DashMap::new();
    registry.insert(ReferenceBackend::NAME.to_string(), typed_entry::<ReferenceBackend>());
    registry
});

fn typed_entry<B: BackendType>() -> Entry {
    fn create<B: BackendType>(engine: &Engine, config: &Value) -> anyhow::Result<Box<dyn Backend>> {
        Ok(Box::new(B::create(engine, config)?))
    }

    fn open<B: BackendType>(engine: &Engine, config: &Value) -> anyhow::Result<Box<dyn Backend>> {
        Ok(Box::new(B::open(engine, config)?))
    }

    Entry {
        create: Arc::new(create::<B>),
        open: Arc::new(open::<B>),
    }
}

/// Registers `B` under `name`.
pub fn register<B: BackendType>(name: &str) {
    debug!(backend = name, "Registering backend type");
    REGISTRY.insert(name.to_string(), typed_entry::<B>());
}

/// Registers a pair of factory closures under `name`.
pub fn register_fns<C, O>(name: &str, create: C, open: O)
where
    C: Fn(&Engine, &Value) -> anyhow::Result<Box<dyn Backend>> + Send + Sync + 'static,
    O: Fn(&Engine, &Value) -> anyhow::Result<Box<dyn Backend>> + Send + Sync + 'static,
{
    debug!(backend = name, "Registering backend factories");
    REGISTRY.insert(name.to_string(), Entry {
        create: Arc::new(create),
        open: Arc::new(open),
    });
}

pub fn is_registered(name: &str) -> bool {
    REGISTRY.contains_key(name)
}

/// Sorted names of every registered backend.
pub fn registered_names() -> Vec<String> {
    let mut names: Vec<String> = REGISTRY.iter().map(|e| e.key().clone()).collect();
    names.sort();
    names
}

/// Builds a new resource of backend type `name`.
pub fn create_resource(name: &str, engine: &Engine, config: &Value) -> Result<Resource> {
    let factory = lookup(name)?.create;
    build(name, factory, engine, config)
}

/// Attaches to an existing resource of backend type `name`.
pub fn open_resource(name: &str, engine: &Engine, config: &Value) -> Result<Resource> {
    let factory = lookup(name)?.open;
    build(name, factory, engine, config)
}

// Clones the entry out so no shard lock is held while a factory runs.
fn lookup(name: &str) -> Result<Entry> {
    REGISTRY
        .get(name)
        .map(|entry| entry.value().clone())
        .ok_or_else(|| Error::UnknownBackendType(name.to_string()))
}

fn build(name: &str, factory: Factory, engine: &Engine, config: &Value) -> Result<Resource> {
    let backend = factory(engine, config).map_err(factory_error)?;
    Ok(Resource::new(name, backend))
}

/// Keeps typed errors raised by factories; anything else is an operation failure.
fn factory_error(e: anyhow::Error) -> Error {
    match e.downcast::<Error>() {
        Ok(err) => err,
        Err(e) => Error::OperationFailed(format!("{:#}", e)),
    }
}
