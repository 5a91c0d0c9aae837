//! # Transport Abstraction
//!
//! A minimal, async interface for moving bytes between addressed endpoints.
//!
//! ## Philosophy
//!
//! - **Byte-Oriented**: The transport knows nothing about frames or methods.
//!   It moves opaque buffers between addresses.
//! - **Addressed**: Every endpoint has a printable address. Inbound messages
//!   carry the sender's address so replies can be routed back.
//! - **Bulk-Capable**: Besides messages, an endpoint can expose memory regions
//!   that remote endpoints pull from or push into without a round of calls.

use crate::bulk::Bulk;
use crate::bulk::BulkMode;
use crate::error::Result;

/// An inbound payload together with the address it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    pub from: String,
    pub payload: Vec<u8>,
}

/// A mechanism to send byte buffers to addresses and expose memory.
///
/// This trait is designed to be object-safe (`Arc<dyn Transport>`).
#[async_trait::async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Address other endpoints use to reach this one.
    fn address(&self) -> &str;

    /// Delivers a payload to the endpoint at `to`.
    ///
    /// # invariants
    /// - Must return `Err` if nothing is reachable at `to`.
    /// - Should not interpret the payload content.
    async fn send(&self, to: &str, payload: Vec<u8>) -> Result<()>;

    /// Receives the next inbound payload. `Ok(None)` means the stream closed.
    async fn recv(&self) -> Result<Option<Envelope>>;

    /// Exposes `data` for remote access and returns its handle.
    fn expose(&self, data: Vec<u8>, mode: BulkMode) -> Bulk;

    /// Withdraws an exposed region. Unknown handles are ignored.
    fn release(&self, bulk: Bulk);

    /// Copies a locally exposed region, regardless of its mode.
    fn read_exposed(&self, bulk: Bulk) -> Result<Vec<u8>>;

    /// Copies `len` bytes starting at `offset` out of a region owned by `owner`.
    async fn pull(&self, owner: &str, bulk: Bulk, offset: u64, len: u64) -> Result<Vec<u8>>;

    /// Writes `data` at `offset` into a region owned by `owner`.
    async fn push(&self, owner: &str, bulk: Bulk, offset: u64, data: Vec<u8>) -> Result<()>;
}
