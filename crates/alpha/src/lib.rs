//! # alpha
//!
//! A resource provider that serves integer sums over RPC. A [`Provider`]
//! hosts resources, each backed by a [`Backend`] chosen by name from the
//! process-wide [`registry`]. A [`Client`] reaches those resources through
//! [`ResourceHandle`]s, and an [`Admin`] creates and destroys them.

pub mod admin;
pub mod backend;
pub mod bulk;
pub mod client;
pub mod config;
pub mod error;
pub mod future;
pub mod id;
pub mod logging;
pub mod provider;
pub mod reference;
pub mod registry;
pub mod result;
pub mod rpc;
pub mod table;

pub use admin::Admin;
pub use backend::Backend;
pub use backend::BackendType;
pub use backend::Resource;
pub use bulk::BulkLocation;
pub use client::Client;
pub use client::ResourceHandle;
pub use error::Error;
pub use error::Result;
pub use future::Future;
pub use id::ResourceId;
pub use provider::Provider;
pub use provider::ProviderBuilder;
pub use reference::ReferenceBackend;
