//! # Bulk Handles
//!
//! A bulk handle names a region of memory that an endpoint has exposed for
//! remote access. Holders of the handle (and the owner's address) can pull
//! bytes out of the region or push bytes into it, subject to the mode the
//! region was exposed with.

use std::fmt;
use std::ops::Range;
use std::sync::Arc;

use serde::Deserialize;
use serde::Serialize;

use crate::error::BulkError;
use crate::error::Result;
use crate::transport::Transport;

/// Opaque, serializable handle to an exposed region.
#[derive(Copy, Clone, Debug, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Bulk(pub u64);

impl fmt::Display for Bulk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "bulk-{}", self.0)
    }
}

/// Which directions remote peers may transfer in.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum BulkMode {
    /// Remote peers may pull from the region.
    ReadOnly,
    /// Remote peers may push into the region.
    WriteOnly,
    ReadWrite,
}

impl BulkMode {
    pub fn readable(self) -> bool {
        matches!(self, Self::ReadOnly | Self::ReadWrite)
    }

    pub fn writable(self) -> bool {
        matches!(self, Self::WriteOnly | Self::ReadWrite)
    }
}

/// Resolves a transfer window against a region of `size` bytes.
pub(crate) fn window(size: usize, offset: u64, len: u64) -> std::result::Result<Range<usize>, BulkError> {
    let out_of_bounds = || BulkError::OutOfBounds { offset, len, size: size as u64 };
    let end = offset.checked_add(len).ok_or_else(out_of_bounds)?;
    if end > size as u64 {
        return Err(out_of_bounds());
    }
    Ok(offset as usize..end as usize)
}

/// A region exposed through a transport, released when dropped.
pub struct Exposure {
    bulk: Bulk,
    len: u64,
    mode: BulkMode,
    transport: Arc<dyn Transport>,
}

impl Exposure {
    pub(crate) fn new(bulk: Bulk, len: u64, mode: BulkMode, transport: Arc<dyn Transport>) -> Self {
        Self { bulk, len, mode, transport }
    }

    pub fn bulk(&self) -> Bulk {
        self.bulk
    }

    /// Size of the exposed region in bytes.
    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn mode(&self) -> BulkMode {
        self.mode
    }

    /// Address remote peers must use to reach this region.
    pub fn address(&self) -> &str {
        self.transport.address()
    }

    /// Copies the current contents of the region.
    pub fn read(&self) -> Result<Vec<u8>> {
        self.transport.read_exposed(self.bulk)
    }
}

impl fmt::Debug for Exposure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Exposure")
            .field("bulk", &self.bulk)
            .field("len", &self.len)
            .field("mode", &self.mode)
            .field("address", &self.address())
            .finish()
    }
}

impl Drop for Exposure {
    fn drop(&mut self) {
        self.transport.release(self.bulk);
    }
}
