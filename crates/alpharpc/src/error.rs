//! # Error Definitions
//!
//! Failures raised by the transport, the call protocol and bulk transfers.

use std::fmt;

use serde::Deserialize;
use serde::Serialize;

use crate::bulk::Bulk;
use crate::bulk::BulkMode;

/// Why a remote engine could not run a call.
///
/// These travel inside reply frames. They describe the remote side refusing
/// or losing a call, whereas the other `Error` variants are local failures.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FailureReason {
    /// No service is registered under the requested provider id.
    ProviderNotFound(u16),
    /// The service does not handle the requested method.
    MethodNotFound(String),
    /// The handler finished without sending a reply.
    NoResponse,
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ProviderNotFound(id) => write!(f, "No provider with id {}", id),
            Self::MethodNotFound(name) => write!(f, "Method not found: {}", name),
            Self::NoResponse => write!(f, "Handler returned without responding"),
        }
    }
}

/// Rejections of a bulk pull or push.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BulkError {
    /// The handle was never exposed, or has already been released.
    UnknownHandle(Bulk),
    /// The exposure mode forbids the requested direction.
    AccessDenied { bulk: Bulk, mode: BulkMode },
    /// The requested window does not fit inside the exposed region.
    OutOfBounds { offset: u64, len: u64, size: u64 },
}

impl fmt::Display for BulkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownHandle(bulk) => write!(f, "Unknown bulk handle {}", bulk),
            Self::AccessDenied { bulk, mode } => {
                write!(f, "Access to {} denied by mode {:?}", bulk, mode)
            }
            Self::OutOfBounds { offset, len, size } => write!(
                f,
                "Window [{}, {}) exceeds region of {} bytes",
                offset,
                offset.saturating_add(*len),
                size
            ),
        }
    }
}

#[derive(Debug, Clone)]
pub enum Error {
    /// The peer is unreachable or the connection was dropped.
    ConnectionLost(String),
    /// Nothing is listening at the address.
    UnknownAddress(String),
    /// The deadline elapsed before a reply arrived.
    Timeout,
    /// The reply channel closed without a reply.
    ChannelClosed,
    /// A frame or payload could not be encoded or decoded.
    Codec(String),
    /// The remote engine refused the call.
    Remote(FailureReason),
    Bulk(BulkError),
    /// A service already holds this provider id.
    ProviderExists(u16),
    /// A blocking wait was attempted on a thread inside a runtime context.
    BlockingInRuntime,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConnectionLost(msg) => write!(f, "Connection lost: {}", msg),
            Self::UnknownAddress(addr) => write!(f, "Unknown address: {}", addr),
            Self::Timeout => write!(f, "Request timed out"),
            Self::ChannelClosed => write!(f, "Response channel closed"),
            Self::Codec(msg) => write!(f, "Codec error: {}", msg),
            Self::Remote(reason) => write!(f, "Remote failure: {}", reason),
            Self::Bulk(e) => write!(f, "Bulk transfer error: {}", e),
            Self::ProviderExists(id) => write!(f, "Provider id {} is already registered", id),
            Self::BlockingInRuntime => write!(f, "Cannot block on a reply from inside an async runtime"),
        }
    }
}

impl std::error::Error for Error {}

impl From<BulkError> for Error {
    fn from(e: BulkError) -> Self {
        Self::Bulk(e)
    }
}

impl From<bincode::error::EncodeError> for Error {
    fn from(e: bincode::error::EncodeError) -> Self {
        Self::Codec(e.to_string())
    }
}

impl From<bincode::error::DecodeError> for Error {
    fn from(e: bincode::error::DecodeError) -> Self {
        Self::Codec(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
