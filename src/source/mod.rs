//! Remote object sources
//!
//! A source resolves an opaque [`ObjectHandle`] into [`ObjectMetadata`] and
//! hands out finite, non-restartable chunk streams for byte ranges of the
//! object. The proxy never caches either: every request resolves again.

mod directory;
mod memory;

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;
use std::fmt;
use std::sync::Arc;

use crate::config::SourceConfig;
use crate::error::SourceError;

pub use directory::DirectorySource;
pub use memory::{MemoryObject, MemorySource};

/// Lazy sequence of chunks, each at most the requested chunk size
pub type ChunkStream = BoxStream<'static, Result<Bytes, SourceError>>;

/// Opaque identifier of a remote object, taken from the request path
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ObjectHandle(String);

impl ObjectHandle {
    /// Accepts any non-empty identifier without control characters or `/`.
    pub fn parse(id: &str) -> Option<Self> {
        if id.is_empty() || id.contains('/') || id.chars().any(char::is_control) {
            return None;
        }
        Some(Self(id.to_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ObjectHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// What the source knows about an object
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectMetadata {
    pub size: u64,
    /// Display name, if the source has one
    pub name: Option<String>,
    /// MIME type, if the source has one
    pub content_type: Option<String>,
}

/// Upstream the proxy pulls objects from
#[async_trait]
pub trait RemoteObjectSource: Send + Sync + fmt::Debug {
    /// Look up current metadata. Unknown handles fail with [`SourceError::NotFound`].
    async fn resolve(&self, handle: &ObjectHandle) -> Result<ObjectMetadata, SourceError>;

    /// Open a chunked read of at most `limit` bytes starting at `offset`. No
    /// chunk is larger than `chunk_size`. A fresh call is required to read
    /// from a different offset.
    async fn read_chunks(
        &self,
        handle: &ObjectHandle,
        offset: u64,
        limit: u64,
        chunk_size: usize,
    ) -> Result<ChunkStream, SourceError>;
}

/// Create the source described by the configuration
pub fn from_config(conf: &SourceConfig) -> Result<Arc<dyn RemoteObjectSource>, SourceError> {
    match conf {
        SourceConfig::Directory { root } => Ok(Arc::new(DirectorySource::new(root)?)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handle_parse() {
        assert_eq!(ObjectHandle::parse("1234").unwrap().as_str(), "1234");
        assert_eq!(ObjectHandle::parse("clip.mp4").unwrap().to_string(), "clip.mp4");
        assert!(ObjectHandle::parse("").is_none());
        assert!(ObjectHandle::parse("a/b").is_none());
        assert!(ObjectHandle::parse("a\nb").is_none());
    }
}
