//! # Error Definitions
//!
//! One error type covers every failure a resource operation can report.
//! It is serializable, so a failure raised inside a provider reaches the
//! caller with its kind intact.

use std::fmt;

use serde::Deserialize;
use serde::Serialize;

use crate::id::ResourceId;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Error {
    /// No backend is registered under the requested name.
    UnknownBackendType(String),
    /// A configuration document or entry could not be understood.
    ConfigParse(String),
    ResourceNotFound(ResourceId),
    /// The security token did not match the provider's secret.
    Unauthorized,
    /// A backend or factory reported a failure.
    OperationFailed(String),
    /// A bulk pull or push failed.
    Transfer(String),
    /// The call deadline elapsed before the reply arrived.
    Timeout,
    /// The resource handle was never constructed.
    InvalidHandle,
    /// The caller broke a precondition, such as mismatched buffer lengths.
    InvalidArgument(String),
    /// The call could not be delivered, served or decoded.
    Rpc(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownBackendType(name) => write!(f, "Unknown resource type {}", name),
            Self::ConfigParse(msg) => write!(f, "Could not parse configuration: {}", msg),
            Self::ResourceNotFound(id) => write!(f, "Resource with UUID {} not found", id),
            Self::Unauthorized => write!(f, "Invalid security token"),
            Self::OperationFailed(msg) => write!(f, "{}", msg),
            Self::Transfer(msg) => write!(f, "Bulk transfer failed: {}", msg),
            Self::Timeout => write!(f, "Request timed out"),
            Self::InvalidHandle => write!(f, "Invalid resource handle"),
            Self::InvalidArgument(msg) => write!(f, "Invalid argument: {}", msg),
            Self::Rpc(msg) => write!(f, "RPC failure: {}", msg),
        }
    }
}

impl std::error::Error for Error {}

impl From<alpharpc::Error> for Error {
    fn from(e: alpharpc::Error) -> Self {
        match e {
            alpharpc::Error::Timeout => Self::Timeout,
            alpharpc::Error::Bulk(e) => Self::Transfer(e.to_string()),
            other => Self::Rpc(other.to_string()),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Self::ConfigParse(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
