//! Client runtime configuration.
//!
//! Configuration is resolved once at process startup and passed into the
//! client, rather than read from the environment during request handling.
//! Binaries own the environment lookups; everything below them takes this
//! struct.

use crate::error::{ClientError, ClientResult};

/// Configuration for the census API client.
#[derive(Clone, Debug)]
pub struct ClientConfig {
    base_url: String,
}

impl ClientConfig {
    /// Create a new `ClientConfig`.
    ///
    /// The base URL must be non-empty; a trailing slash is stripped so path
    /// joining stays uniform.
    pub fn new(base_url: impl Into<String>) -> ClientResult<Self> {
        let base_url = base_url.into();
        let trimmed = base_url.trim().trim_end_matches('/');
        if trimmed.is_empty() {
            return Err(ClientError::InvalidInput(
                "base URL cannot be empty".into(),
            ));
        }

        Ok(Self {
            base_url: trimmed.to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}
