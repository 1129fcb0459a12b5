//! Statement submission.

use crate::error::{QueryError, TransportError};
use crate::query::cursor::Cursor;
use crate::query::statement::Statement;
use crate::transport::TransportProtocol;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

/// Submits statements and hands back cursors over their results.
///
/// The executor does not track the cursors it creates; releasing them is up
/// to the caller.
#[derive(Clone)]
pub struct StatementExecutor {
    transport: Arc<Mutex<dyn TransportProtocol>>,
}

impl std::fmt::Debug for StatementExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StatementExecutor")
            .field("transport", &"<TransportProtocol>")
            .finish()
    }
}

impl StatementExecutor {
    /// Create an executor over a shared transport.
    pub fn new(transport: Arc<Mutex<dyn TransportProtocol>>) -> Self {
        Self { transport }
    }

    /// Execute a statement and return a cursor seeded with the first batch.
    ///
    /// # Errors
    /// - `QueryError::InvalidStatement` if the statement fails validation; no
    ///   request is sent
    /// - `QueryError::ExecutionFailed` if the submission fails
    pub async fn execute(&self, statement: &Statement) -> Result<Cursor, QueryError> {
        statement.validate()?;
        let request = statement.to_request();

        debug!("Executing statement: {}", statement.query());
        let result = {
            let mut transport = self.transport.lock().await;
            transport.submit_statement(&request).await
        };
        let first = result.map_err(QueryError::execution_failed)?;

        if first.has_more && first.id.is_none() {
            return Err(QueryError::execution_failed(
                TransportError::MalformedResponse(
                    "server reported more batches without a cursor id".to_string(),
                ),
            ));
        }

        debug!(
            "Statement returned {} documents (cursor: {:?}, has_more: {})",
            first.documents.len(),
            first.id,
            first.has_more
        );
        Ok(Cursor::new(first, Arc::clone(&self.transport)))
    }
}
