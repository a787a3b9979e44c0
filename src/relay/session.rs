//! Request-scoped stream session
//!
//! A session owns the upstream chunk stream for one response. It is pulled by
//! the response body, so the next chunk is only requested after the transport
//! took the previous one. Dropping the body drops the session together with the
//! upstream stream.

use bytes::Bytes;
use futures::{StreamExt, TryStreamExt};
use http_body_util::{BodyExt, StreamBody};
use hyper::body::Frame;
use log::{debug, error, warn};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use super::stats::StreamStats;
use crate::error::ProxyError;
use crate::http::{BoxError, ByteRange, ProxyBody};
use crate::source::{ChunkStream, ObjectHandle};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Streaming,
    Completed,
    Aborted,
}

/// Relays one byte range of one object
pub struct StreamSession {
    handle: ObjectHandle,
    range: ByteRange,
    chunks: Option<ChunkStream>,
    remaining: u64,
    chunk_timeout: Duration,
    upstream_chunks: usize,
    state: State,
    stats: Arc<StreamStats>,
}

impl fmt::Debug for StreamSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamSession")
            .field("handle", &self.handle)
            .field("range", &self.range)
            .field("remaining", &self.remaining)
            .field("upstream_chunks", &self.upstream_chunks)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl StreamSession {
    pub fn new(
        handle: ObjectHandle,
        range: ByteRange,
        chunks: ChunkStream,
        chunk_timeout: Duration,
        stats: Arc<StreamStats>,
    ) -> Self {
        stats.session_opened();
        Self {
            handle,
            range,
            chunks: Some(chunks),
            remaining: range.content_length(),
            chunk_timeout,
            upstream_chunks: 0,
            state: State::Streaming,
            stats,
        }
    }

    /// Bytes handed out so far
    pub const fn delivered(&self) -> u64 {
        self.range.content_length() - self.remaining
    }

    /// Chunks received from upstream so far
    pub const fn upstream_chunks(&self) -> usize {
        self.upstream_chunks
    }

    /// Next chunk for the client, `None` once the whole range was delivered.
    ///
    /// The upstream is not polled again once the quota is used up. Chunks
    /// overshooting the quota are truncated, an upstream ending before the
    /// quota is an error.
    pub async fn next_chunk(&mut self) -> Result<Option<Bytes>, ProxyError> {
        loop {
            if self.remaining == 0 {
                self.complete();
                return Ok(None);
            }
            let Some(chunks) = self.chunks.as_mut() else {
                return Ok(None);
            };

            let next = match tokio::time::timeout(self.chunk_timeout, chunks.next()).await {
                Ok(next) => next,
                Err(_) => {
                    let err = ProxyError::UpstreamTimeout {
                        handle: self.handle.clone(),
                        timeout: self.chunk_timeout,
                    };
                    return Err(self.abort(err));
                }
            };

            let mut chunk = match next {
                Some(Ok(chunk)) => chunk,
                Some(Err(source)) => {
                    let err = ProxyError::UpstreamTransport {
                        handle: self.handle.clone(),
                        source,
                    };
                    return Err(self.abort(err));
                }
                None => {
                    let err = ProxyError::UpstreamExhausted {
                        handle: self.handle.clone(),
                        remaining: self.remaining,
                    };
                    return Err(self.abort(err));
                }
            };

            self.upstream_chunks += 1;
            if chunk.is_empty() {
                continue;
            }

            let len = chunk.len() as u64;
            if len > self.remaining {
                warn!(
                    "upstream delivered {len} bytes of {} with only {} bytes left, truncating",
                    self.handle, self.remaining
                );
                chunk.truncate(usize::try_from(self.remaining).unwrap_or(usize::MAX));
            }

            let len = chunk.len() as u64;
            self.remaining -= len;
            self.stats.record_bytes(len);
            // hyper drops the body once Content-Length bytes are out and never
            // polls for the end of stream
            if self.remaining == 0 {
                self.complete();
            }
            return Ok(Some(chunk));
        }
    }

    fn complete(&mut self) {
        if self.state == State::Streaming {
            self.state = State::Completed;
            self.chunks = None;
            self.stats.record_completed();
            debug!(
                "stream of {} completed, bytes {}-{} in {} upstream chunks",
                self.handle, self.range.start, self.range.end, self.upstream_chunks
            );
        }
    }

    fn abort(&mut self, err: ProxyError) -> ProxyError {
        self.state = State::Aborted;
        self.chunks = None;
        self.stats.record_aborted();
        error!(
            "aborting stream of {} after {} of {} bytes: {err}",
            self.handle,
            self.delivered(),
            self.range.content_length()
        );
        err
    }

    /// Turn the session into a response body pulling one chunk per frame
    pub fn into_body(self) -> ProxyBody {
        let frames = futures::stream::try_unfold(self, |mut session| async move {
            let next = session.next_chunk().await?;
            Ok::<_, ProxyError>(next.map(|chunk| (Frame::data(chunk), session)))
        });
        StreamBody::new(frames.map_err(BoxError::from)).boxed_unsync()
    }
}

impl Drop for StreamSession {
    fn drop(&mut self) {
        self.stats.session_closed();
        if self.state == State::Streaming {
            self.stats.record_disconnected();
            debug!(
                "client went away from stream of {} after {} of {} bytes",
                self.handle,
                self.delivered(),
                self.range.content_length()
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SourceError;
    use crate::source::{MemoryObject, MemorySource, RemoteObjectSource};
    use test_log::test;

    const SECOND: Duration = Duration::from_secs(1);

    async fn session_for(
        object: MemoryObject,
        range: ByteRange,
        chunk_size: usize,
    ) -> (StreamSession, Arc<StreamStats>) {
        let source = MemorySource::new();
        let handle = source.insert("1", object).unwrap();
        let chunks = source
            .read_chunks(&handle, range.start, range.content_length(), chunk_size)
            .await
            .unwrap();
        let stats = Arc::new(StreamStats::new());
        let session = StreamSession::new(handle, range, chunks, SECOND, Arc::clone(&stats));
        (session, stats)
    }

    async fn drain(session: &mut StreamSession) -> Result<Vec<u8>, ProxyError> {
        let mut out = Vec::new();
        while let Some(chunk) = session.next_chunk().await? {
            out.extend_from_slice(&chunk);
        }
        Ok(out)
    }

    #[test(tokio::test)]
    async fn relays_exact_range() {
        let data: Vec<u8> = (0..=255u8).cycle().take(1000).collect();
        let range = ByteRange { start: 100, end: 349 };
        let (mut session, stats) = session_for(MemoryObject::new(data.clone()), range, 64).await;

        let out = drain(&mut session).await.unwrap();
        assert_eq!(out, &data[100..350]);
        assert_eq!(session.upstream_chunks(), 4);
        assert_eq!(session.delivered(), 250);
        drop(session);

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.completed, 1);
        assert_eq!(snapshot.disconnected, 0);
        assert_eq!(snapshot.active, 0);
        assert_eq!(snapshot.bytes_relayed, 250);
    }

    #[test(tokio::test)]
    async fn over_delivery_is_truncated() {
        let range = ByteRange { start: 0, end: 14 };
        let (mut session, _) =
            session_for(MemoryObject::new(vec![9u8; 100]).ignore_limit(), range, 10).await;

        let out = drain(&mut session).await.unwrap();
        assert_eq!(out.len(), 15);
        // The upstream still has chunks, they are never requested
        assert_eq!(session.upstream_chunks(), 2);
    }

    #[test(tokio::test)]
    async fn under_delivery_aborts() {
        let range = ByteRange { start: 0, end: 49 };
        let (mut session, stats) =
            session_for(MemoryObject::new(vec![9u8; 100]).short_by(5), range, 10).await;

        let err = drain(&mut session).await.unwrap_err();
        assert!(matches!(
            err,
            ProxyError::UpstreamExhausted { remaining: 5, .. }
        ));
        assert_eq!(session.delivered(), 45);
        drop(session);
        assert_eq!(stats.snapshot().aborted, 1);
        assert_eq!(stats.snapshot().disconnected, 0);
    }

    #[test(tokio::test)]
    async fn upstream_failure_aborts() {
        let range = ByteRange { start: 0, end: 99 };
        let (mut session, stats) =
            session_for(MemoryObject::new(vec![1u8; 100]).fail_after(3), range, 10).await;

        let err = drain(&mut session).await.unwrap_err();
        assert!(matches!(
            err,
            ProxyError::UpstreamTransport {
                source: SourceError::Transport(_),
                ..
            }
        ));
        assert_eq!(session.delivered(), 30);
        // Aborted sessions stay closed
        assert!(session.next_chunk().await.unwrap().is_none());
        drop(session);
        assert_eq!(stats.snapshot().aborted, 1);
    }

    #[test(tokio::test)]
    async fn stalled_upstream_times_out() {
        let range = ByteRange { start: 0, end: 99 };
        let (mut session, stats) =
            session_for(MemoryObject::new(vec![1u8; 100]).stall_after(1), range, 10).await;

        assert_eq!(session.next_chunk().await.unwrap().unwrap().len(), 10);
        let err = session.next_chunk().await.unwrap_err();
        assert!(matches!(err, ProxyError::UpstreamTimeout { .. }));
        drop(session);
        assert_eq!(stats.snapshot().aborted, 1);
    }

    #[test(tokio::test)]
    async fn dropping_mid_stream_counts_as_disconnect() {
        let range = ByteRange { start: 0, end: 99 };
        let (mut session, stats) = session_for(MemoryObject::new(vec![1u8; 100]), range, 10).await;

        session.next_chunk().await.unwrap();
        assert_eq!(stats.snapshot().active, 1);
        drop(session);

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.active, 0);
        assert_eq!(snapshot.disconnected, 1);
        assert_eq!(snapshot.completed, 0);
    }

    #[test(tokio::test)]
    async fn last_chunk_completes_without_end_of_stream_poll() {
        let range = ByteRange { start: 0, end: 19 };
        let (mut session, stats) = session_for(MemoryObject::new(vec![1u8; 100]), range, 10).await;

        session.next_chunk().await.unwrap();
        session.next_chunk().await.unwrap();
        assert_eq!(stats.snapshot().completed, 1);
        drop(session);

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.completed, 1);
        assert_eq!(snapshot.disconnected, 0);
        assert_eq!(snapshot.active, 0);
    }

    #[test(tokio::test)]
    async fn body_yields_frames() {
        let data: Vec<u8> = (0..100u8).collect();
        let range = ByteRange { start: 90, end: 99 };
        let (session, _) = session_for(MemoryObject::new(data), range, 4).await;

        let bytes = session.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(bytes.as_ref(), &(90..100u8).collect::<Vec<_>>()[..]);
    }
}
