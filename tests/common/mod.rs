//! Common test utilities for aql-cursor integration tests.
//!
//! Two kinds of helpers live here:
//!
//! - [`FakeServer`], an in-memory implementation of the cursor protocol that
//!   end-to-end tests drive through the public API.
//! - Live-server configuration read from the environment, for tests that talk
//!   to a real database.
//!
//! # Live Server Prerequisites
//!
//! ```bash
//! docker run -d --name arangodb-test -p 8529:8529 -e ARANGO_ROOT_PASSWORD=test arangodb:latest
//! ```
//!
//! # Configuration
//!
//! | Default Constant   | Environment Variable | Default Value |
//! |--------------------|----------------------|---------------|
//! | `DEFAULT_HOST`     | `ARANGO_HOST`        | "localhost"   |
//! | `DEFAULT_PORT`     | `ARANGO_PORT`        | 8529          |
//! | `DEFAULT_USER`     | `ARANGO_USER`        | "root"        |
//! | `DEFAULT_PASSWORD` | `ARANGO_PASSWORD`    | "test"        |
//!
//! Live tests are `#[ignore]`d and additionally skip when nothing listens on
//! the configured host and port:
//!
//! ```bash
//! cargo test --test integration_tests -- --ignored
//! ```

#![allow(dead_code)]

use aql_cursor::error::TransportError;
use aql_cursor::transport::{BatchResponse, CursorExtra, CursorId, CursorRequest};
use aql_cursor::{ConnectionBuilder, Database, TransportProtocol};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::env;
use std::net::{TcpStream, ToSocketAddrs};
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;
use tokio::sync::Mutex;

// ============================================================================
// Fake server
// ============================================================================

/// Batch size the fake server uses when the request does not set one.
pub const FAKE_DEFAULT_BATCH_SIZE: usize = 1000;

/// One round trip observed by the fake server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Submit(String),
    Fetch(String),
    Delete(String),
}

#[derive(Default)]
struct ServerState {
    documents: Vec<Value>,
    cursors: HashMap<String, OpenCursor>,
    next_id: u64,
    calls: Vec<Call>,
    failing_fetches: usize,
}

struct OpenCursor {
    remaining: VecDeque<Value>,
    batch_size: usize,
}

/// In-memory server that answers every statement with the same documents.
#[derive(Clone, Default)]
pub struct FakeServer {
    state: Arc<StdMutex<ServerState>>,
}

impl FakeServer {
    /// Create a server whose queries all return `documents`.
    pub fn new(documents: Vec<Value>) -> Self {
        let server = Self::default();
        server.state.lock().unwrap().documents = documents;
        server
    }

    /// A transport connected to this server.
    pub fn transport(&self) -> Arc<Mutex<dyn TransportProtocol>> {
        Arc::new(Mutex::new(FakeTransport {
            state: Arc::clone(&self.state),
        }))
    }

    /// A database handle connected to this server.
    pub fn database(&self) -> Database {
        let params = ConnectionBuilder::new()
            .host("fake.invalid")
            .build()
            .unwrap();
        Database::from_transport(params, self.transport())
    }

    /// Every round trip seen so far, in order.
    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    /// Number of fetch-next round trips seen so far.
    pub fn fetch_count(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, Call::Fetch(_)))
            .count()
    }

    /// Number of cursors the server still holds.
    pub fn open_cursors(&self) -> usize {
        self.state.lock().unwrap().cursors.len()
    }

    /// Drop every open cursor, as a ttl expiry would.
    pub fn expire_cursors(&self) {
        self.state.lock().unwrap().cursors.clear();
    }

    /// Make the next `n` fetches fail with a network error.
    pub fn fail_next_fetches(&self, n: usize) {
        self.state.lock().unwrap().failing_fetches = n;
    }
}

struct FakeTransport {
    state: Arc<StdMutex<ServerState>>,
}

impl FakeTransport {
    fn submit(&self, request: &CursorRequest) -> BatchResponse {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::Submit(request.query.clone()));

        let batch_size = request
            .batch_size
            .map(|b| b as usize)
            .unwrap_or(FAKE_DEFAULT_BATCH_SIZE);
        let mut remaining: VecDeque<Value> = state.documents.iter().cloned().collect();
        let count = request.count.map(|_| remaining.len() as u64);
        let documents = take_batch(&mut remaining, batch_size);

        let id = if remaining.is_empty() {
            None
        } else {
            state.next_id += 1;
            let id = state.next_id.to_string();
            state.cursors.insert(
                id.clone(),
                OpenCursor {
                    remaining,
                    batch_size,
                },
            );
            Some(CursorId::new(id))
        };

        BatchResponse {
            has_more: id.is_some(),
            id,
            documents,
            count,
            cached: false,
            extra: CursorExtra::default(),
        }
    }

    fn fetch(&self, id: &CursorId) -> Result<BatchResponse, TransportError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::Fetch(id.to_string()));

        if state.failing_fetches > 0 {
            state.failing_fetches -= 1;
            return Err(TransportError::Http("connection reset by peer".to_string()));
        }

        let cursor = state
            .cursors
            .get_mut(id.as_str())
            .ok_or_else(|| TransportError::CursorNotFound { id: id.to_string() })?;
        let batch_size = cursor.batch_size;
        let documents = take_batch(&mut cursor.remaining, batch_size);
        let has_more = !cursor.remaining.is_empty();
        if !has_more {
            state.cursors.remove(id.as_str());
        }

        Ok(BatchResponse {
            id: Some(id.clone()),
            documents,
            has_more,
            count: None,
            cached: false,
            extra: CursorExtra::default(),
        })
    }

    fn delete(&self, id: &CursorId) -> bool {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::Delete(id.to_string()));
        state.cursors.remove(id.as_str()).is_some()
    }
}

fn take_batch(remaining: &mut VecDeque<Value>, batch_size: usize) -> Vec<Value> {
    let n = batch_size.min(remaining.len());
    remaining.drain(..n).collect()
}

#[async_trait]
impl TransportProtocol for FakeTransport {
    async fn submit_statement(
        &mut self,
        request: &CursorRequest,
    ) -> Result<BatchResponse, TransportError> {
        Ok(self.submit(request))
    }

    async fn fetch_next_batch(&mut self, id: &CursorId) -> Result<BatchResponse, TransportError> {
        self.fetch(id)
    }

    async fn delete_cursor(&mut self, id: &CursorId) -> Result<bool, TransportError> {
        Ok(self.delete(id))
    }
}

// ============================================================================
// Live server configuration
// ============================================================================

/// Default host for the live server.
pub const DEFAULT_HOST: &str = "localhost";

/// Default port for the live server.
pub const DEFAULT_PORT: u16 = 8529;

/// Default username for the live server.
pub const DEFAULT_USER: &str = "root";

/// Default password for the live server.
pub const DEFAULT_PASSWORD: &str = "test";

const ENV_ARANGO_HOST: &str = "ARANGO_HOST";
const ENV_ARANGO_PORT: &str = "ARANGO_PORT";
const ENV_ARANGO_USER: &str = "ARANGO_USER";
const ENV_ARANGO_PASSWORD: &str = "ARANGO_PASSWORD";

/// Get the server host from `ARANGO_HOST` or use the default.
pub fn get_host() -> String {
    env::var(ENV_ARANGO_HOST).unwrap_or_else(|_| DEFAULT_HOST.to_string())
}

/// Get the server port from `ARANGO_PORT` or use the default.
///
/// An unparsable value falls back to the default.
pub fn get_port() -> u16 {
    env::var(ENV_ARANGO_PORT)
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(DEFAULT_PORT)
}

/// Get the username from `ARANGO_USER` or use the default.
pub fn get_user() -> String {
    env::var(ENV_ARANGO_USER).unwrap_or_else(|_| DEFAULT_USER.to_string())
}

/// Get the password from `ARANGO_PASSWORD` or use the default.
pub fn get_password() -> String {
    env::var(ENV_ARANGO_PASSWORD).unwrap_or_else(|_| DEFAULT_PASSWORD.to_string())
}

/// Build a connection string for the live server.
pub fn get_test_connection_string() -> String {
    format!(
        "arangodb://{}:{}@{}:{}/_system",
        urlencoding::encode(&get_user()),
        urlencoding::encode(&get_password()),
        get_host(),
        get_port()
    )
}

/// Open the live test database.
pub fn get_test_database() -> Result<Database, aql_cursor::ArangoError> {
    Ok(get_test_connection_string().parse::<Database>()?)
}

/// Check whether anything listens on the configured host and port.
///
/// Only network reachability is checked, not authentication.
pub fn is_server_available() -> bool {
    let addr = format!("{}:{}", get_host(), get_port());

    let socket_addrs: Vec<_> = match addr.to_socket_addrs() {
        Ok(addrs) => addrs.collect(),
        Err(_) => return false,
    };

    socket_addrs
        .iter()
        .any(|a| TcpStream::connect_timeout(a, Duration::from_secs(2)).is_ok())
}

/// Return early from a test when no live server is reachable.
#[macro_export]
macro_rules! skip_if_no_server {
    () => {
        if !$crate::common::is_server_available() {
            eprintln!(
                "Skipping test: server not available at {}:{}",
                $crate::common::get_host(),
                $crate::common::get_port()
            );
            return;
        }
    };
}
