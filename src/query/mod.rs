//! Statement execution and result iteration.
//!
//! # Overview
//!
//! The query module is organized into:
//! - `statement` - Statement description, bind variables and options
//! - `executor` - Submits statements and creates cursors
//! - `cursor` - Forward-only iteration over batched results
//!
//! # Example
//!
//! ```no_run
//! use aql_cursor::connection::ConnectionParams;
//! use aql_cursor::query::{Statement, StatementExecutor};
//! use aql_cursor::transport::{HttpTransport, TransportProtocol};
//! use std::str::FromStr;
//! use std::sync::Arc;
//! use tokio::sync::Mutex;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let params = ConnectionParams::from_str("arangodb://root@localhost:8529")?;
//! let transport: Arc<Mutex<dyn TransportProtocol>> =
//!     Arc::new(Mutex::new(HttpTransport::new(&params)?));
//! let executor = StatementExecutor::new(transport);
//!
//! let stmt = Statement::builder("FOR u IN users FILTER u.age > @age RETURN u")
//!     .bind("age", 18)
//!     .batch_size(100)
//!     .build();
//!
//! let mut cursor = executor.execute(&stmt).await?;
//! while cursor.has_next() {
//!     let user = cursor.next().await?;
//!     println!("{}", user);
//! }
//! cursor.delete().await?;
//! # Ok(())
//! # }
//! ```

pub mod cursor;
pub mod executor;
pub mod statement;

// Re-export commonly used types
pub use cursor::Cursor;
pub use executor::StatementExecutor;
pub use statement::{QueryOptions, Statement, StatementBuilder};
