//! Source serving objects stored as files in a single directory.

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use futures::StreamExt;
use log::{debug, warn};
use std::io::{self, ErrorKind, SeekFrom};
use std::path::{Path, PathBuf};
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncSeekExt};

use super::{ChunkStream, ObjectHandle, ObjectMetadata, RemoteObjectSource};
use crate::error::SourceError;
use crate::http::mime;

/// Serves every regular file directly inside `root`, the handle being the
/// file name.
#[derive(Debug)]
pub struct DirectorySource {
    root: PathBuf,
}

impl DirectorySource {
    /// Creates a source for `root`. The directory has to exist.
    pub fn new(root: impl AsRef<Path>) -> io::Result<Self> {
        let root = root.as_ref().canonicalize()?;
        if !root.is_dir() {
            return Err(io::Error::new(
                ErrorKind::InvalidInput,
                format!("{} is not a directory", root.display()),
            ));
        }
        debug!("Serving objects from {}", root.display());
        Ok(Self { root })
    }

    /// Handles that could escape the root or address hidden files don't resolve.
    fn object_path(&self, handle: &ObjectHandle) -> Option<PathBuf> {
        let name = handle.as_str();
        if name.starts_with('.') || name.contains('\\') || name.contains(':') {
            warn!("Rejecting object handle {name:?}");
            return None;
        }
        Some(self.root.join(name))
    }
}

fn open_error(err: io::Error) -> SourceError {
    match err.kind() {
        ErrorKind::NotFound => SourceError::NotFound,
        _ => SourceError::Io(err),
    }
}

#[async_trait]
impl RemoteObjectSource for DirectorySource {
    async fn resolve(&self, handle: &ObjectHandle) -> Result<ObjectMetadata, SourceError> {
        let path = self.object_path(handle).ok_or(SourceError::NotFound)?;
        let meta = tokio::fs::metadata(&path).await.map_err(open_error)?;
        if !meta.is_file() {
            return Err(SourceError::NotFound);
        }

        Ok(ObjectMetadata {
            size: meta.len(),
            name: Some(handle.as_str().to_owned()),
            content_type: Some(mime::content_type_for(handle.as_str()).to_owned()),
        })
    }

    async fn read_chunks(
        &self,
        handle: &ObjectHandle,
        offset: u64,
        limit: u64,
        chunk_size: usize,
    ) -> Result<ChunkStream, SourceError> {
        let path = self.object_path(handle).ok_or(SourceError::NotFound)?;
        let mut file = File::open(&path).await.map_err(open_error)?;
        if offset != 0 {
            file.seek(SeekFrom::Start(offset)).await?;
        }

        let max_chunk = u64::try_from(chunk_size).unwrap_or(u64::MAX);
        let chunks = futures::stream::try_unfold((file, limit), move |(mut file, remaining)| async move {
            if remaining == 0 {
                return Ok::<_, SourceError>(None);
            }

            let wanted = usize::try_from(remaining.min(max_chunk)).unwrap_or(chunk_size);
            let mut buf = BytesMut::zeroed(wanted);
            let len = file.read(&mut buf).await?;
            if len == 0 {
                // File shrank since it was resolved, the relay notices the shortfall
                return Ok(None);
            }

            buf.truncate(len);
            let chunk: Bytes = buf.freeze();
            Ok(Some((chunk, (file, remaining - len as u64))))
        });

        Ok(chunks.boxed())
    }
}
