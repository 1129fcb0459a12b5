//! AQL statement description.
//!
//! A [`Statement`] is an immutable description of a query to run: the query
//! text, its bind variables and execution options. It has no behavior beyond
//! checking its own shape and producing the request body for the server.

use crate::error::QueryError;
use crate::transport::messages::{CursorRequest, CursorRequestOptions};
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;

/// Execution options recognized by the server.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryOptions {
    /// Maximum number of documents per batch (must be > 0)
    pub batch_size: Option<u32>,
    /// Allow the server-side query result cache
    pub cache: Option<bool>,
    /// Ask for the total result count
    pub count: bool,
    /// Ask for the count ignoring the final LIMIT
    pub full_count: Option<bool>,
    /// Abort server-side execution after this time (must be > 0)
    pub max_runtime: Option<Duration>,
    /// Idle time-to-live of the server cursor
    pub ttl: Option<Duration>,
    /// Memory the query may use, in bytes
    pub memory_limit: Option<u64>,
    /// Produce results lazily on the server
    pub stream: Option<bool>,
    /// Return profiling data
    pub profile: Option<bool>,
    /// Turn warnings into errors
    pub fail_on_warning: Option<bool>,
}

/// An AQL statement ready for execution.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    query: String,
    bind_vars: HashMap<String, Value>,
    options: QueryOptions,
}

impl Statement {
    /// Create a statement with no bind variables and default options.
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            bind_vars: HashMap::new(),
            options: QueryOptions::default(),
        }
    }

    /// Start building a statement.
    pub fn builder(query: impl Into<String>) -> StatementBuilder {
        StatementBuilder {
            statement: Self::new(query),
        }
    }

    /// Get the query text.
    pub fn query(&self) -> &str {
        &self.query
    }

    /// Get the bind variables.
    pub fn bind_vars(&self) -> &HashMap<String, Value> {
        &self.bind_vars
    }

    /// Get the execution options.
    pub fn options(&self) -> &QueryOptions {
        &self.options
    }

    /// Check the statement's shape.
    ///
    /// # Errors
    /// Returns `QueryError::InvalidStatement` if the query is blank, a bind
    /// variable has no name, or a numeric option is zero.
    pub fn validate(&self) -> Result<(), QueryError> {
        if self.query.trim().is_empty() {
            return Err(invalid("query must not be empty"));
        }

        if let Some(name) = self
            .bind_vars
            .keys()
            .find(|name| name.is_empty() || name.as_str() == "@")
        {
            return Err(invalid(format!("invalid bind variable name '{}'", name)));
        }

        if self.options.batch_size == Some(0) {
            return Err(invalid("batch size must be greater than 0"));
        }

        if self.options.max_runtime.is_some_and(|d| d.is_zero()) {
            return Err(invalid("max runtime must be greater than 0"));
        }

        if self.options.ttl.is_some_and(|d| d.is_zero()) {
            return Err(invalid("ttl must be greater than 0"));
        }

        Ok(())
    }

    /// Build the request body submitted to the cursor endpoint.
    pub fn to_request(&self) -> CursorRequest {
        let options = CursorRequestOptions {
            full_count: self.options.full_count,
            max_runtime: self.options.max_runtime.map(|d| d.as_secs_f64()),
            stream: self.options.stream,
            profile: self.options.profile,
            fail_on_warning: self.options.fail_on_warning,
        };

        CursorRequest {
            query: self.query.clone(),
            bind_vars: self.bind_vars.clone(),
            batch_size: self.options.batch_size,
            cache: self.options.cache,
            count: self.options.count.then_some(true),
            ttl: self.options.ttl.map(|d| d.as_secs_f64()),
            memory_limit: self.options.memory_limit,
            options: (!options.is_empty()).then_some(options),
        }
    }
}

fn invalid(message: impl Into<String>) -> QueryError {
    QueryError::InvalidStatement(message.into())
}

/// Builder for creating `Statement` instances with a fluent API.
#[derive(Debug, Clone)]
pub struct StatementBuilder {
    statement: Statement,
}

impl StatementBuilder {
    /// Bind a value to a placeholder (`@name` in the query, `name` here).
    pub fn bind(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.statement.bind_vars.insert(name.into(), value.into());
        self
    }

    /// Bind any serializable value.
    ///
    /// # Errors
    /// Returns `QueryError::InvalidStatement` if the value cannot be serialized.
    pub fn bind_serialized<T: Serialize>(
        self,
        name: impl Into<String>,
        value: &T,
    ) -> Result<Self, QueryError> {
        let name = name.into();
        let value = serde_json::to_value(value).map_err(|e| {
            invalid(format!("cannot serialize bind variable '{}': {}", name, e))
        })?;
        Ok(self.bind(name, value))
    }

    /// Bind several values at once.
    pub fn bind_vars<K, I>(mut self, vars: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Value)>,
    {
        self.statement
            .bind_vars
            .extend(vars.into_iter().map(|(k, v)| (k.into(), v)));
        self
    }

    /// Set the maximum number of documents per batch.
    pub fn batch_size(mut self, batch_size: u32) -> Self {
        self.statement.options.batch_size = Some(batch_size);
        self
    }

    /// Allow or forbid the query result cache.
    pub fn cache(mut self, cache: bool) -> Self {
        self.statement.options.cache = Some(cache);
        self
    }

    /// Request the total result count.
    pub fn count(mut self, count: bool) -> Self {
        self.statement.options.count = count;
        self
    }

    /// Request the count ignoring the final LIMIT.
    pub fn full_count(mut self, full_count: bool) -> Self {
        self.statement.options.full_count = Some(full_count);
        self
    }

    /// Bound server-side execution time.
    pub fn max_runtime(mut self, max_runtime: Duration) -> Self {
        self.statement.options.max_runtime = Some(max_runtime);
        self
    }

    /// Set the idle time-to-live of the server cursor.
    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.statement.options.ttl = Some(ttl);
        self
    }

    /// Limit query memory usage.
    pub fn memory_limit(mut self, bytes: u64) -> Self {
        self.statement.options.memory_limit = Some(bytes);
        self
    }

    /// Produce results lazily on the server.
    pub fn stream(mut self, stream: bool) -> Self {
        self.statement.options.stream = Some(stream);
        self
    }

    /// Return profiling data with the result.
    pub fn profile(mut self, profile: bool) -> Self {
        self.statement.options.profile = Some(profile);
        self
    }

    /// Turn query warnings into errors.
    pub fn fail_on_warning(mut self, fail_on_warning: bool) -> Self {
        self.statement.options.fail_on_warning = Some(fail_on_warning);
        self
    }

    /// Replace all options at once.
    pub fn options(mut self, options: QueryOptions) -> Self {
        self.statement.options = options;
        self
    }

    /// Build the statement.
    pub fn build(self) -> Statement {
        self.statement
    }
}
