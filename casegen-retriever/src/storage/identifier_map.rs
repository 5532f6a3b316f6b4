//! Bidirectional handle <-> chunk id bookkeeping for one collection

use super::{ChunkId, Handle};
use crate::error::{Result, RetrieverError};
use std::collections::HashMap;
use std::ops::Range;

/// Maps vector index handles to chunk ids and back.
///
/// Handles are issued monotonically and never reused, even after the vectors
/// they name have been retired.
#[derive(Debug, Clone)]
pub struct IdentifierMap {
    collection: String,
    next_handle: Handle,
    by_handle: HashMap<Handle, ChunkId>,
    by_chunk: HashMap<ChunkId, Vec<Handle>>,
}

impl IdentifierMap {
    pub fn new(collection: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            next_handle: 0,
            by_handle: HashMap::new(),
            by_chunk: HashMap::new(),
        }
    }

    /// Reserve `count` fresh handles, starting at the number already issued.
    pub fn allocate(&mut self, count: usize) -> Range<Handle> {
        let start = self.next_handle;
        self.next_handle += count as Handle;
        start..self.next_handle
    }

    /// Mark a caller-chosen `handle` as issued so [`allocate`](Self::allocate)
    /// never hands it out.
    pub fn reserve(&mut self, handle: Handle) {
        self.next_handle = self.next_handle.max(handle + 1);
    }

    /// Number of handles issued so far.
    pub fn issued(&self) -> Handle {
        self.next_handle
    }

    /// Associate `handle` with `chunk_id`.
    pub fn bind(&mut self, handle: Handle, chunk_id: impl Into<ChunkId>) -> Result<()> {
        if self.by_handle.contains_key(&handle) {
            return Err(RetrieverError::DuplicateHandle {
                collection: self.collection.clone(),
                handle,
            });
        }

        let chunk_id = chunk_id.into();
        self.by_chunk
            .entry(chunk_id.clone())
            .or_default()
            .push(handle);
        self.by_handle.insert(handle, chunk_id);
        self.reserve(handle);
        Ok(())
    }

    pub fn resolve(&self, handle: Handle) -> Result<&ChunkId> {
        self.get(handle).ok_or_else(|| RetrieverError::UnknownHandle {
            collection: self.collection.clone(),
            handle,
        })
    }

    pub fn get(&self, handle: Handle) -> Option<&ChunkId> {
        self.by_handle.get(&handle)
    }

    /// Every handle ever bound to `chunk_id`, oldest first.
    pub fn handles_for(&self, chunk_id: &str) -> &[Handle] {
        self.by_chunk
            .get(chunk_id)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Number of bound handles.
    pub fn len(&self) -> usize {
        self.by_handle.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_handle.is_empty()
    }
}
