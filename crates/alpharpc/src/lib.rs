//! # alpharpc
//!
//! Addressed RPC and bulk-transfer fabric used by the alpha provider and its
//! clients. An `Engine` sits on one `Transport` endpoint, issues calls to
//! remote providers, and serves the `Service`s registered on it.

pub mod bulk;
pub mod engine;
pub mod error;
pub mod frame;
pub mod local;
pub mod transport;

pub use bulk::Bulk;
pub use bulk::BulkMode;
pub use bulk::Exposure;
pub use engine::Engine;
pub use engine::PendingCall;
pub use engine::Request;
pub use engine::Responder;
pub use engine::Service;
pub use error::BulkError;
pub use error::Error;
pub use error::FailureReason;
pub use error::Result;
pub use local::LocalFabric;
pub use local::LocalTransport;
pub use transport::Envelope;
pub use transport::Transport;
