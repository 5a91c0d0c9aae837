//! # Resource Table
//!
//! Maps resource ids to live resources. Lookups hand out `Arc` clones, so an
//! entry can be removed while calls that already found it keep running.
//! Shard locks are held only for the lookup, insert or removal itself.

use std::sync::Arc;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

use crate::backend::Resource;
use crate::error::Error;
use crate::error::Result;
use crate::id::ResourceId;

#[derive(Default)]
pub struct ResourceTable {
    entries: DashMap<ResourceId, Arc<Resource>>,
}

impl ResourceTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a resource under a fresh id. Fails if the id is taken.
    pub fn insert(&self, id: ResourceId, resource: Resource) -> Result<Arc<Resource>> {
        match self.entries.entry(id) {
            Entry::Occupied(_) => Err(Error::InvalidArgument(format!("Resource {} already exists", id))),
            Entry::Vacant(slot) => {
                let resource = Arc::new(resource);
                slot.insert(resource.clone());
                Ok(resource)
            }
        }
    }

    pub fn get(&self, id: &ResourceId) -> Result<Arc<Resource>> {
        self.entries
            .get(id)
            .map(|entry| entry.value().clone())
            .ok_or(Error::ResourceNotFound(*id))
    }

    pub fn contains(&self, id: &ResourceId) -> bool {
        self.entries.contains_key(id)
    }

    /// Removes and returns the resource. Only one caller can win a removal.
    pub fn remove(&self, id: &ResourceId) -> Result<Arc<Resource>> {
        self.entries
            .remove(id)
            .map(|(_, resource)| resource)
            .ok_or(Error::ResourceNotFound(*id))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Ids currently present, in no particular order.
    pub fn ids(&self) -> Vec<ResourceId> {
        self.entries.iter().map(|e| *e.key()).collect()
    }

    pub fn snapshot(&self) -> Vec<(ResourceId, Arc<Resource>)> {
        self.entries
            .iter()
            .map(|e| (*e.key(), e.value().clone()))
            .collect()
    }

    /// Removes every entry and returns them.
    pub fn drain(&self) -> Vec<(ResourceId, Arc<Resource>)> {
        self.ids()
            .into_iter()
            .filter_map(|id| self.entries.remove(&id))
            .collect()
    }
}
