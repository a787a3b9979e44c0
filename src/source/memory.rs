//! In-memory source with controllable chunking and failure behavior.
//!
//! Useful for embedding the proxy in front of data that is already in memory and
//! for exercising the relay against misbehaving upstreams.

use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use super::{ChunkStream, ObjectHandle, ObjectMetadata, RemoteObjectSource};
use crate::error::SourceError;

/// Object stored in a [`MemorySource`]
#[derive(Debug, Clone)]
pub struct MemoryObject {
    data: Bytes,
    name: Option<String>,
    content_type: Option<String>,
    fail_after: Option<usize>,
    stall_after: Option<usize>,
    ignore_limit: bool,
    short_by: u64,
    stall_resolve: bool,
    stall_open: bool,
}

impl MemoryObject {
    pub fn new(data: impl Into<Bytes>) -> Self {
        Self {
            data: data.into(),
            name: None,
            content_type: None,
            fail_after: None,
            stall_after: None,
            ignore_limit: false,
            short_by: 0,
            stall_resolve: false,
            stall_open: false,
        }
    }

    #[must_use]
    pub fn with_name(mut self, name: &str) -> Self {
        self.name = Some(name.to_owned());
        self
    }

    #[must_use]
    pub fn with_content_type(mut self, content_type: &str) -> Self {
        self.content_type = Some(content_type.to_owned());
        self
    }

    /// Reads fail with a transport error after `chunks` chunks were delivered.
    #[must_use]
    pub const fn fail_after(mut self, chunks: usize) -> Self {
        self.fail_after = Some(chunks);
        self
    }

    /// Reads never produce another chunk after `chunks` chunks were delivered.
    #[must_use]
    pub const fn stall_after(mut self, chunks: usize) -> Self {
        self.stall_after = Some(chunks);
        self
    }

    /// Metadata lookups never answer.
    #[must_use]
    pub const fn stall_resolve(mut self) -> Self {
        self.stall_resolve = true;
        self
    }

    /// Opening a read never answers.
    #[must_use]
    pub const fn stall_open(mut self) -> Self {
        self.stall_open = true;
        self
    }

    /// Reads keep delivering data past the requested limit.
    #[must_use]
    pub const fn ignore_limit(mut self) -> Self {
        self.ignore_limit = true;
        self
    }

    /// Reads end `bytes` bytes before the requested limit.
    #[must_use]
    pub const fn short_by(mut self, bytes: u64) -> Self {
        self.short_by = bytes;
        self
    }

    pub fn len(&self) -> u64 {
        self.data.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Source keeping all objects in memory
#[derive(Debug, Default)]
pub struct MemorySource {
    objects: Mutex<HashMap<ObjectHandle, MemoryObject>>,
    resolve_calls: AtomicUsize,
    chunks_delivered: Arc<AtomicUsize>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace an object
    pub fn insert(&self, id: &str, object: MemoryObject) -> Option<ObjectHandle> {
        let handle = ObjectHandle::parse(id)?;
        self.objects
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(handle.clone(), object);
        Some(handle)
    }

    pub fn remove(&self, handle: &ObjectHandle) -> Option<MemoryObject> {
        self.objects
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(handle)
    }

    /// Number of metadata lookups served so far
    pub fn resolve_calls(&self) -> usize {
        self.resolve_calls.load(Ordering::Relaxed)
    }

    /// Number of chunks handed out by all reads so far
    pub fn chunks_delivered(&self) -> usize {
        self.chunks_delivered.load(Ordering::Relaxed)
    }

    fn get(&self, handle: &ObjectHandle) -> Result<MemoryObject, SourceError> {
        self.objects
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(handle)
            .cloned()
            .ok_or(SourceError::NotFound)
    }
}

#[async_trait]
impl RemoteObjectSource for MemorySource {
    async fn resolve(&self, handle: &ObjectHandle) -> Result<ObjectMetadata, SourceError> {
        self.resolve_calls.fetch_add(1, Ordering::Relaxed);
        let object = self.get(handle)?;
        if object.stall_resolve {
            futures::future::pending::<()>().await;
        }
        Ok(ObjectMetadata {
            size: object.len(),
            name: object.name,
            content_type: object.content_type,
        })
    }

    async fn read_chunks(
        &self,
        handle: &ObjectHandle,
        offset: u64,
        limit: u64,
        chunk_size: usize,
    ) -> Result<ChunkStream, SourceError> {
        let object = self.get(handle)?;
        if object.stall_open {
            futures::future::pending::<()>().await;
        }
        let size = object.len();
        if offset > size {
            return Err(SourceError::Transport(format!(
                "offset {offset} beyond object size {size}"
            )));
        }

        let end = if object.ignore_limit {
            size
        } else {
            offset
                .saturating_add(limit)
                .min(size)
                .saturating_sub(object.short_by)
                .max(offset)
        };
        let start = usize::try_from(offset).map_err(|e| SourceError::Transport(e.to_string()))?;
        let end = usize::try_from(end).map_err(|e| SourceError::Transport(e.to_string()))?;
        let data = object.data.slice(start..end);
        let chunk_size = chunk_size.max(1);
        let delivered = Arc::clone(&self.chunks_delivered);
        let (fail_after, stall_after) = (object.fail_after, object.stall_after);

        let chunks = futures::stream::try_unfold((0usize, 0usize), move |(pos, index)| {
            let data = data.clone();
            let delivered = Arc::clone(&delivered);
            async move {
                if fail_after == Some(index) {
                    return Err(SourceError::Transport(format!(
                        "connection reset after {index} chunks"
                    )));
                }
                if stall_after == Some(index) {
                    futures::future::pending::<()>().await;
                }
                if pos >= data.len() {
                    return Ok(None);
                }

                let next = (pos + chunk_size).min(data.len());
                delivered.fetch_add(1, Ordering::Relaxed);
                Ok(Some((data.slice(pos..next), (next, index + 1))))
            }
        });

        Ok(chunks.boxed())
    }
}
