//! # In-Process Fabric
//!
//! A `LocalFabric` connects any number of `LocalTransport` endpoints living in
//! the same process. Each endpoint gets a `local://N` address, an unbounded
//! inbox, and a table of exposed regions that other endpoints on the same
//! fabric can pull from or push into.
//!
//! Dropping an endpoint removes it from the fabric; later sends to its address
//! fail with `UnknownAddress`.

use std::sync::Arc;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;

use dashmap::DashMap;
use parking_lot::RwLock;
use tokio::sync::Mutex;
use tokio::sync::mpsc;

use crate::bulk::Bulk;
use crate::bulk::BulkMode;
use crate::bulk::window;
use crate::error::BulkError;
use crate::error::Error;
use crate::error::Result;
use crate::transport::Envelope;
use crate::transport::Transport;

struct Region {
    mode: BulkMode,
    data: RwLock<Vec<u8>>,
}

struct Mailbox {
    tx: mpsc::UnboundedSender<Envelope>,
    regions: DashMap<Bulk, Region>,
    next_bulk: AtomicU64,
}

struct Fabric {
    endpoints: DashMap<String, Arc<Mailbox>>,
    next_address: AtomicU64,
}

impl Fabric {
    fn lookup(&self, address: &str) -> Result<Arc<Mailbox>> {
        self.endpoints
            .get(address)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| Error::UnknownAddress(address.to_string()))
    }
}

/// Shared in-process network. Cloning yields another handle to the same fabric.
#[derive(Clone)]
pub struct LocalFabric {
    inner: Arc<Fabric>,
}

impl LocalFabric {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Fabric {
                endpoints: DashMap::new(),
                next_address: AtomicU64::new(1),
            }),
        }
    }

    /// Attaches a new endpoint with a fresh address.
    pub fn endpoint(&self) -> LocalTransport {
        let n = self.inner.next_address.fetch_add(1, Ordering::Relaxed);
        let address = format!("local://{}", n);
        let (tx, rx) = mpsc::unbounded_channel();
        let mailbox = Arc::new(Mailbox {
            tx,
            regions: DashMap::new(),
            next_bulk: AtomicU64::new(1),
        });

        self.inner.endpoints.insert(address.clone(), mailbox.clone());

        LocalTransport {
            address,
            fabric: self.inner.clone(),
            mailbox,
            rx: Mutex::new(rx),
        }
    }

    /// Number of live endpoints.
    pub fn len(&self) -> usize {
        self.inner.endpoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.endpoints.is_empty()
    }
}

impl Default for LocalFabric {
    fn default() -> Self {
        Self::new()
    }
}

/// One endpoint on a `LocalFabric`.
pub struct LocalTransport {
    address: String,
    fabric: Arc<Fabric>,
    mailbox: Arc<Mailbox>,
    rx: Mutex<mpsc::UnboundedReceiver<Envelope>>,
}

impl Drop for LocalTransport {
    fn drop(&mut self) {
        self.fabric.endpoints.remove(&self.address);
    }
}

#[async_trait::async_trait]
impl Transport for LocalTransport {
    fn address(&self) -> &str {
        &self.address
    }

    async fn send(&self, to: &str, payload: Vec<u8>) -> Result<()> {
        let mailbox = self.fabric.lookup(to)?;
        let envelope = Envelope {
            from: self.address.clone(),
            payload,
        };
        mailbox
            .tx
            .send(envelope)
            .map_err(|_| Error::ConnectionLost("Channel closed".into()))
    }

    async fn recv(&self) -> Result<Option<Envelope>> {
        let mut rx = self.rx.lock().await;
        Ok(rx.recv().await)
    }

    fn expose(&self, data: Vec<u8>, mode: BulkMode) -> Bulk {
        let bulk = Bulk(self.mailbox.next_bulk.fetch_add(1, Ordering::Relaxed));
        self.mailbox.regions.insert(bulk, Region {
            mode,
            data: RwLock::new(data),
        });
        bulk
    }

    fn release(&self, bulk: Bulk) {
        self.mailbox.regions.remove(&bulk);
    }

    fn read_exposed(&self, bulk: Bulk) -> Result<Vec<u8>> {
        let region = self
            .mailbox
            .regions
            .get(&bulk)
            .ok_or(BulkError::UnknownHandle(bulk))?;
        let data = region.data.read().clone();
        Ok(data)
    }

    async fn pull(&self, owner: &str, bulk: Bulk, offset: u64, len: u64) -> Result<Vec<u8>> {
        let mailbox = self.fabric.lookup(owner)?;
        let bytes = {
            let region = mailbox.regions.get(&bulk).ok_or(BulkError::UnknownHandle(bulk))?;
            if !region.mode.readable() {
                return Err(BulkError::AccessDenied { bulk, mode: region.mode }.into());
            }
            let data = region.data.read();
            let range = window(data.len(), offset, len)?;
            data[range].to_vec()
        };

        // Let other tasks run as a real network transfer would.
        tokio::task::yield_now().await;
        Ok(bytes)
    }

    async fn push(&self, owner: &str, bulk: Bulk, offset: u64, data: Vec<u8>) -> Result<()> {
        let mailbox = self.fabric.lookup(owner)?;
        {
            let region = mailbox.regions.get(&bulk).ok_or(BulkError::UnknownHandle(bulk))?;
            if !region.mode.writable() {
                return Err(BulkError::AccessDenied { bulk, mode: region.mode }.into());
            }
            let mut target = region.data.write();
            let range = window(target.len(), offset, data.len() as u64)?;
            target[range].copy_from_slice(&data);
        }

        tokio::task::yield_now().await;
        Ok(())
    }
}
