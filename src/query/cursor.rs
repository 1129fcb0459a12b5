//! Server-side cursor iteration.
//!
//! A [`Cursor`] turns the batches of one query execution into a forward-only
//! lazy sequence of documents. Only the current batch is held in memory; the
//! next one is fetched when the current batch is drained.
//!
//! The cursor moves through three states:
//!
//! ```text
//!  Active ──(last document yielded, no more batches)──> Exhausted
//!    │                                                     │
//!    └──────────────────(delete)──────> Deleted <──(delete)─┘
//! ```
//!
//! There is no way back to `Active`: server cursors are single-pass.

use crate::error::{CursorError, TransportError};
use crate::transport::messages::{BatchResponse, CursorExtra, CursorId, QueryStats, QueryWarning};
use crate::transport::TransportProtocol;
use futures_util::Stream;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, warn};

#[derive(Debug)]
enum CursorState {
    /// Documents remain in `batch[position..]` or on the server
    Active {
        batch: Vec<Value>,
        position: usize,
        has_more: bool,
    },
    /// Every document was yielded and the server holds nothing
    Exhausted,
    /// Released; terminal
    Deleted,
}

enum Step {
    Yield { document: Value, last: bool },
    Fetch,
    Drained,
}

/// Forward-only cursor over the results of one statement.
///
/// Created by [`StatementExecutor::execute`](crate::query::StatementExecutor::execute).
/// A cursor whose results span several batches holds a resource on the server
/// until it is exhausted or [`delete`](Cursor::delete)d.
pub struct Cursor {
    transport: Arc<Mutex<dyn TransportProtocol>>,
    id: Option<CursorId>,
    state: CursorState,
    count: Option<u64>,
    cached: bool,
    extra: CursorExtra,
    yielded: u64,
}

impl std::fmt::Debug for Cursor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cursor")
            .field("id", &self.id)
            .field("state", &self.state)
            .field("count", &self.count)
            .field("yielded", &self.yielded)
            .field("transport", &"<TransportProtocol>")
            .finish()
    }
}

impl Cursor {
    /// Seed a cursor from the first batch of a statement.
    pub(crate) fn new(first: BatchResponse, transport: Arc<Mutex<dyn TransportProtocol>>) -> Self {
        let mut cursor = Self {
            transport,
            id: None,
            state: CursorState::Exhausted,
            count: None,
            cached: first.cached,
            extra: CursorExtra::default(),
            yielded: 0,
        };
        cursor.apply(first);
        cursor
    }

    /// Cursor id, while the server still holds further batches.
    pub fn id(&self) -> Option<&CursorId> {
        self.id.as_ref()
    }

    /// Whether another document can be obtained.
    ///
    /// Never performs a network call: when the current batch is drained the
    /// server's `hasMore` flag from the last reply is taken as the answer.
    pub fn has_next(&self) -> bool {
        match &self.state {
            CursorState::Active {
                batch,
                position,
                has_more,
            } => *position < batch.len() || *has_more,
            CursorState::Exhausted | CursorState::Deleted => false,
        }
    }

    /// Yield the next document, fetching the next batch if the current one is drained.
    ///
    /// # Errors
    /// - `CursorError::Exhausted` past the last document
    /// - `CursorError::Deleted` after [`delete`](Cursor::delete)
    /// - `CursorError::FetchFailed` if fetching failed; the cursor is left as it
    ///   was and the call may be retried
    /// - `CursorError::NotFound` if the server no longer knows the cursor; no
    ///   further documents are available
    #[allow(clippy::should_implement_trait)]
    pub async fn next(&mut self) -> Result<Value, CursorError> {
        loop {
            let step = match &mut self.state {
                CursorState::Deleted => return Err(CursorError::Deleted),
                CursorState::Exhausted => return Err(CursorError::Exhausted),
                CursorState::Active {
                    batch,
                    position,
                    has_more,
                } => {
                    if *position < batch.len() {
                        let document = std::mem::take(&mut batch[*position]);
                        *position += 1;
                        Step::Yield {
                            document,
                            last: *position == batch.len() && !*has_more,
                        }
                    } else if *has_more {
                        Step::Fetch
                    } else {
                        Step::Drained
                    }
                }
            };

            match step {
                Step::Yield { document, last } => {
                    self.yielded += 1;
                    if last {
                        self.state = CursorState::Exhausted;
                    }
                    return Ok(document);
                }
                Step::Fetch => self.fetch_next_batch().await?,
                Step::Drained => {
                    self.state = CursorState::Exhausted;
                    return Err(CursorError::Exhausted);
                }
            }
        }
    }

    /// Yield the next document deserialized into `T`.
    ///
    /// # Errors
    /// As [`next`](Cursor::next), plus `CursorError::Decode` if the document
    /// does not match `T`. The document is consumed either way.
    pub async fn next_as<T: DeserializeOwned>(&mut self) -> Result<T, CursorError> {
        let document = self.next().await?;
        serde_json::from_value(document).map_err(|e| CursorError::Decode(e.to_string()))
    }

    /// Total number of results, if it was requested and returned by the server.
    ///
    /// This is not the size of the current batch.
    pub fn count(&self) -> Option<u64> {
        self.count
    }

    /// Release the server-side cursor.
    ///
    /// Idempotent: deleting a deleted cursor succeeds without a network call.
    /// A remote delete is only issued while the server still holds further
    /// batches. Returns `false` if the server no longer knew the cursor.
    ///
    /// # Errors
    /// Returns `CursorError::DeleteFailed` if the remote delete failed; the
    /// cursor is left undeleted so the call can be repeated.
    pub async fn delete(&mut self) -> Result<bool, CursorError> {
        let remote = match &self.state {
            CursorState::Deleted => return Ok(true),
            CursorState::Active { has_more: true, .. } => self.id.clone(),
            _ => None,
        };

        let released = match remote {
            Some(id) => {
                let result = {
                    let mut transport = self.transport.lock().await;
                    transport.delete_cursor(&id).await
                };
                match result {
                    Ok(released) => released,
                    Err(TransportError::CursorNotFound { .. }) => false,
                    Err(e) => return Err(CursorError::DeleteFailed(e)),
                }
            }
            None => true,
        };

        debug!("Cursor released after {} documents", self.yielded);
        self.id = None;
        self.state = CursorState::Deleted;
        Ok(released)
    }

    /// Restart iteration. Always fails: server cursors are single-pass.
    pub fn rewind(&mut self) -> Result<(), CursorError> {
        Err(CursorError::NotRewindable)
    }

    /// Drain every remaining document into memory and release the cursor.
    ///
    /// If draining fails, the server-side cursor is deleted before the error
    /// is returned.
    pub async fn fetch_all(mut self) -> Result<Vec<Value>, CursorError> {
        let mut documents = Vec::new();

        while self.has_next() {
            match self.next().await {
                Ok(document) => documents.push(document),
                Err(CursorError::Exhausted) => break,
                Err(e) => {
                    if let Err(cleanup) = self.delete().await {
                        warn!("Failed to delete cursor after error: {}", cleanup);
                    }
                    return Err(e);
                }
            }
        }

        self.delete().await?;
        Ok(documents)
    }

    /// Adapt the cursor into a stream of documents.
    ///
    /// The stream ends after the last document. An error is yielded once,
    /// after which the server-side cursor is deleted and the stream ends.
    pub fn into_stream(self) -> impl Stream<Item = Result<Value, CursorError>> + Send {
        futures_util::stream::unfold(Some(self), |cursor| async move {
            let mut cursor = cursor?;
            if !cursor.has_next() {
                return None;
            }
            match cursor.next().await {
                Ok(document) => Some((Ok(document), Some(cursor))),
                Err(CursorError::Exhausted) => None,
                Err(e) => {
                    if let Err(cleanup) = cursor.delete().await {
                        warn!("Failed to delete cursor after error: {}", cleanup);
                    }
                    Some((Err(e), None))
                }
            }
        })
    }

    /// Diagnostics from the most recent batch that carried any.
    pub fn extra(&self) -> &CursorExtra {
        &self.extra
    }

    /// Warnings raised by the server.
    pub fn warnings(&self) -> &[QueryWarning] {
        &self.extra.warnings
    }

    /// Execution statistics, if reported.
    pub fn stats(&self) -> Option<&QueryStats> {
        self.extra.stats.as_ref()
    }

    /// Result count ignoring the final LIMIT, if `full_count` was requested.
    pub fn full_count(&self) -> Option<u64> {
        self.stats().and_then(|s| s.full_count)
    }

    /// Whether the result came from the query cache.
    pub fn is_cached(&self) -> bool {
        self.cached
    }

    /// Whether every document has been yielded.
    pub fn is_exhausted(&self) -> bool {
        matches!(self.state, CursorState::Exhausted)
    }

    /// Whether the cursor has been deleted.
    pub fn is_deleted(&self) -> bool {
        matches!(self.state, CursorState::Deleted)
    }

    /// Number of documents yielded so far.
    pub fn documents_yielded(&self) -> u64 {
        self.yielded
    }

    /// Index of the next document within the current batch.
    pub fn position(&self) -> usize {
        match &self.state {
            CursorState::Active { position, .. } => *position,
            _ => 0,
        }
    }

    /// Length of the current batch.
    pub fn batch_len(&self) -> usize {
        match &self.state {
            CursorState::Active { batch, .. } => batch.len(),
            _ => 0,
        }
    }

    /// Documents of the current batch not yet yielded.
    pub fn current_batch(&self) -> &[Value] {
        match &self.state {
            CursorState::Active {
                batch, position, ..
            } => &batch[*position..],
            _ => &[],
        }
    }

    async fn fetch_next_batch(&mut self) -> Result<(), CursorError> {
        let id = self.id.clone().ok_or_else(|| {
            CursorError::FetchFailed(TransportError::MalformedResponse(
                "server reported more batches without a cursor id".to_string(),
            ))
        })?;

        debug!("Fetching next batch for cursor {}", id);
        let result = {
            let mut transport = self.transport.lock().await;
            transport.fetch_next_batch(&id).await
        };

        let response = match result {
            Ok(response) => response,
            Err(TransportError::CursorNotFound { id }) => {
                self.forget_remote();
                return Err(CursorError::NotFound { id });
            }
            Err(other) => return Err(CursorError::FetchFailed(other)),
        };

        debug!(
            "Received batch of {} documents (has_more: {})",
            response.documents.len(),
            response.has_more
        );
        self.apply(response);
        Ok(())
    }

    /// The server no longer holds the cursor: nothing left to fetch or release.
    fn forget_remote(&mut self) {
        warn!("Cursor {:?} expired on the server", self.id);
        self.id = None;
        if let CursorState::Active { has_more, .. } = &mut self.state {
            *has_more = false;
        }
    }

    /// Replace the current batch with a freshly received one.
    fn apply(&mut self, response: BatchResponse) {
        for warning in &response.extra.warnings {
            warn!("Query warning {}: {}", warning.code, warning.message);
        }
        if response.extra != CursorExtra::default() {
            self.extra = response.extra;
        }
        if response.count.is_some() {
            self.count = response.count;
        }

        let previous = self.id.take();
        self.id = if response.has_more {
            response.id.or(previous)
        } else {
            None
        };

        self.state = if response.documents.is_empty() && !response.has_more {
            CursorState::Exhausted
        } else {
            CursorState::Active {
                batch: response.documents,
                position: 0,
                has_more: response.has_more,
            }
        };
    }
}

impl Drop for Cursor {
    fn drop(&mut self) {
        if let (Some(id), CursorState::Active { has_more: true, .. }) = (&self.id, &self.state) {
            warn!(
                "Cursor {} dropped without being deleted; the server keeps it until its ttl expires",
                id
            );
        }
    }
}
