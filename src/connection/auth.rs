//! Credential handling.
//!
//! Credentials are sent with every request; this module keeps them out of
//! logs and debug output.

use std::fmt;
use std::sync::Arc;
use zeroize::Zeroize;

/// How requests authenticate against the server.
#[derive(Clone, Default)]
pub enum Credentials {
    /// No authentication header
    #[default]
    Anonymous,
    /// HTTP basic authentication
    Basic {
        username: String,
        password: Arc<SecureString>,
    },
    /// Pre-issued JWT sent as a bearer token
    Bearer(Arc<SecureString>),
}

impl Credentials {
    /// Create basic credentials.
    pub fn basic(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self::Basic {
            username: username.into(),
            password: Arc::new(SecureString::new(password.into())),
        }
    }

    /// Create bearer token credentials.
    pub fn bearer(token: impl Into<String>) -> Self {
        Self::Bearer(Arc::new(SecureString::new(token.into())))
    }

    /// Get the username, if any.
    pub fn username(&self) -> Option<&str> {
        match self {
            Self::Basic { username, .. } => Some(username),
            _ => None,
        }
    }

    /// Get the password (for internal use only).
    pub(crate) fn password(&self) -> Option<&str> {
        match self {
            Self::Basic { password, .. } => Some(password.as_str()),
            _ => None,
        }
    }

    /// Get the bearer token (for internal use only).
    pub(crate) fn token(&self) -> Option<&str> {
        match self {
            Self::Bearer(token) => Some(token.as_str()),
            _ => None,
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Anonymous => write!(f, "Anonymous"),
            Self::Basic { username, .. } => f
                .debug_struct("Basic")
                .field("username", username)
                .field("password", &"<redacted>")
                .finish(),
            Self::Bearer(_) => write!(f, "Bearer(<redacted>)"),
        }
    }
}

impl fmt::Display for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Anonymous => write!(f, "anonymous"),
            Self::Basic { username, .. } => write!(f, "basic({})", username),
            Self::Bearer(_) => write!(f, "bearer"),
        }
    }
}

/// Secret string that zeros its bytes on drop and never displays its contents.
pub struct SecureString(String);

impl SecureString {
    fn new(s: String) -> Self {
        Self(s)
    }

    fn as_str(&self) -> &str {
        &self.0
    }
}

impl Drop for SecureString {
    fn drop(&mut self) {
        self.0.zeroize();
    }
}

impl fmt::Debug for SecureString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SecureString(<redacted>)")
    }
}
