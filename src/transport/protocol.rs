//! Transport protocol abstraction trait.
//!
//! This module defines the `TransportProtocol` trait that abstracts the three
//! cursor round trips. The cursor state machine only ever talks to this trait,
//! so it can be driven by the HTTP transport or by a fake in tests.

use crate::error::TransportError;
use async_trait::async_trait;

use super::messages::{BatchResponse, CursorId, CursorRequest};

/// Transport protocol trait for cursor communication.
#[async_trait]
pub trait TransportProtocol: Send + Sync {
    /// Submit a statement and return the first batch.
    ///
    /// # Errors
    ///
    /// Returns `TransportError` if the request fails or the server rejects the query.
    async fn submit_statement(
        &mut self,
        request: &CursorRequest,
    ) -> Result<BatchResponse, TransportError>;

    /// Fetch the next batch of an open cursor.
    ///
    /// # Errors
    ///
    /// Returns `TransportError::CursorNotFound` if the server no longer knows `id`,
    /// or another `TransportError` if the request fails.
    async fn fetch_next_batch(&mut self, id: &CursorId) -> Result<BatchResponse, TransportError>;

    /// Release a server-side cursor.
    ///
    /// Returns `false` if the server did not know the cursor (already gone).
    ///
    /// # Errors
    ///
    /// Returns `TransportError` if the request fails for any other reason.
    async fn delete_cursor(&mut self, id: &CursorId) -> Result<bool, TransportError>;
}
