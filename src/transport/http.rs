//! HTTP transport implementation.
//!
//! Talks to the cursor REST endpoints:
//! - `POST   /_db/{database}/_api/cursor` submits a statement
//! - `PUT    /_db/{database}/_api/cursor/{id}` fetches the next batch
//! - `DELETE /_db/{database}/_api/cursor/{id}` releases the cursor

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde_json::Value;
use tracing::debug;

use crate::connection::{ConnectionParams, Credentials};
use crate::error::{ConnectionError, TransportError, ERROR_CURSOR_NOT_FOUND};

use super::messages::{BatchResponse, CursorId, CursorRequest, ErrorBody};
use super::protocol::TransportProtocol;

/// HTTP transport over `reqwest`.
pub struct HttpTransport {
    client: Client,
    cursor_url: String,
    credentials: Credentials,
}

impl HttpTransport {
    /// Create a transport from connection parameters.
    ///
    /// # Errors
    ///
    /// Returns `ConnectionError::ClientSetup` if the HTTP client cannot be built.
    pub fn new(params: &ConnectionParams) -> Result<Self, ConnectionError> {
        let client = Client::builder()
            .connect_timeout(params.connection_timeout)
            .timeout(params.request_timeout)
            .danger_accept_invalid_certs(!params.validate_server_certificate)
            .build()
            .map_err(|e| ConnectionError::ClientSetup(e.to_string()))?;

        Ok(Self::with_client(client, params))
    }

    /// Create a transport that reuses an existing HTTP client.
    pub fn with_client(client: Client, params: &ConnectionParams) -> Self {
        Self {
            client,
            cursor_url: cursor_url(params),
            credentials: params.credentials.clone(),
        }
    }

    /// URL of the cursor endpoint for this database.
    pub fn cursor_url(&self) -> &str {
        &self.cursor_url
    }

    fn cursor_id_url(&self, id: &CursorId) -> String {
        format!("{}/{}", self.cursor_url, urlencoding::encode(id.as_str()))
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.credentials {
            Credentials::Anonymous => request,
            Credentials::Basic { username, .. } => {
                request.basic_auth(username, self.credentials.password())
            }
            Credentials::Bearer(_) => match self.credentials.token() {
                Some(token) => request.bearer_auth(token),
                None => request,
            },
        }
    }

    /// Send a request and decode the reply body.
    async fn send(&self, request: RequestBuilder) -> Result<Value, TransportError> {
        let response = self.authorize(request).send().await?;
        let status = response.status();
        let body = response.bytes().await?;
        decode_reply(status, &body)
    }
}

fn cursor_url(params: &ConnectionParams) -> String {
    format!(
        "{}/_db/{}/_api/cursor",
        params.base_url(),
        urlencoding::encode(&params.database)
    )
}

/// Turn a raw reply into a JSON body, or into an error for non-2xx statuses.
fn decode_reply(status: StatusCode, body: &[u8]) -> Result<Value, TransportError> {
    if status.is_success() {
        return serde_json::from_slice(body)
            .map_err(|e| TransportError::MalformedResponse(e.to_string()));
    }

    let error = serde_json::from_slice::<ErrorBody>(body).unwrap_or_else(|_| ErrorBody {
        error: true,
        code: status.as_u16(),
        error_num: 0,
        error_message: String::from_utf8_lossy(body).into_owned(),
    });

    let message = if error.error_message.is_empty() {
        status.canonical_reason().unwrap_or("unknown error").to_string()
    } else {
        error.error_message
    };

    Err(TransportError::Server {
        code: if error.code == 0 {
            status.as_u16()
        } else {
            error.code
        },
        error_num: error.error_num,
        message,
    })
}

/// Map "cursor not found" server errors to the dedicated variant.
///
/// A 404 only counts when it carries no error number of its own; other
/// numbered 404s (unknown database, ...) pass through unchanged.
fn classify_cursor_error(err: TransportError, id: &CursorId) -> TransportError {
    match err {
        TransportError::Server {
            error_num: ERROR_CURSOR_NOT_FOUND,
            ..
        }
        | TransportError::Server {
            code: 404,
            error_num: 0,
            ..
        } => TransportError::CursorNotFound {
            id: id.to_string(),
        },
        other => other,
    }
}

#[async_trait]
impl TransportProtocol for HttpTransport {
    async fn submit_statement(
        &mut self,
        request: &CursorRequest,
    ) -> Result<BatchResponse, TransportError> {
        debug!("Submitting statement to {}", self.cursor_url);
        let body = self
            .send(self.client.post(&self.cursor_url).json(request))
            .await?;
        BatchResponse::from_value(body)
    }

    async fn fetch_next_batch(&mut self, id: &CursorId) -> Result<BatchResponse, TransportError> {
        debug!("Fetching next batch of cursor {}", id);
        let body = self
            .send(self.client.put(self.cursor_id_url(id)))
            .await
            .map_err(|e| classify_cursor_error(e, id))?;
        BatchResponse::from_value(body)
    }

    async fn delete_cursor(&mut self, id: &CursorId) -> Result<bool, TransportError> {
        debug!("Deleting cursor {}", id);
        match self
            .send(self.client.delete(self.cursor_id_url(id)))
            .await
            .map_err(|e| classify_cursor_error(e, id))
        {
            Ok(_) => Ok(true),
            Err(TransportError::CursorNotFound { .. }) => Ok(false),
            Err(e) => Err(e),
        }
    }
}
