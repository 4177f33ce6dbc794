//! Model gateway - key rotation and rate-limit retry
//!
//! Owns the ordered credential list and a shared rotation cursor. Every
//! call takes the next key round-robin, regardless of how the previous
//! call ended. Rate-limit failures rotate and retry with a linear backoff;
//! anything else propagates immediately.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, warn};

use crate::error::{PipelineError, Result};
use crate::transport::{ModelRequest, ModelTransport};

/// Floor for the retry budget, regardless of key count
pub const MIN_ATTEMPTS: usize = 5;

/// Base backoff before the first retry
pub const BACKOFF_BASE: Duration = Duration::from_millis(1000);

/// Additional backoff per attempt
pub const BACKOFF_STEP: Duration = Duration::from_millis(500);

/// Rotating multi-key front door to the model API
pub struct ModelGateway {
    keys: Vec<String>,
    cursor: AtomicUsize,
    transport: Arc<dyn ModelTransport>,
    backoff_base: Duration,
    backoff_step: Duration,
}

impl ModelGateway {
    pub fn new(keys: Vec<String>, transport: Arc<dyn ModelTransport>) -> Self {
        Self {
            keys,
            cursor: AtomicUsize::new(0),
            transport,
            backoff_base: BACKOFF_BASE,
            backoff_step: BACKOFF_STEP,
        }
    }

    /// Override the backoff schedule (tests)
    pub fn with_backoff(mut self, base: Duration, step: Duration) -> Self {
        self.backoff_base = base;
        self.backoff_step = step;
        self
    }

    pub fn key_count(&self) -> usize {
        self.keys.len()
    }

    pub fn has_credentials(&self) -> bool {
        !self.keys.is_empty()
    }

    /// Retry budget: twice the key count, never fewer than [`MIN_ATTEMPTS`]
    pub fn max_attempts(&self) -> usize {
        (self.keys.len() * 2).max(MIN_ATTEMPTS)
    }

    fn next_key(&self) -> &str {
        let index = self.cursor.fetch_add(1, Ordering::Relaxed) % self.keys.len();
        &self.keys[index]
    }

    /// Run one model call, rotating keys across rate-limit retries.
    pub async fn generate(&self, request: &ModelRequest) -> Result<String> {
        if self.keys.is_empty() {
            return Err(PipelineError::NoCredentials);
        }

        let max_attempts = self.max_attempts();
        let mut last_error = String::new();

        for attempt in 0..max_attempts {
            let key = self.next_key();
            match self.transport.generate(key, request).await {
                Ok(text) => return Ok(text),
                Err(e) if e.is_rate_limit() => {
                    warn!(
                        attempt = attempt + 1,
                        max_attempts,
                        "rate limit hit; rotating key"
                    );
                    last_error = e.to_string();
                    let backoff = self.backoff_base + self.backoff_step * attempt as u32;
                    tokio::time::sleep(backoff).await;
                }
                Err(e) => return Err(PipelineError::Upstream(e.to_string())),
            }
        }

        error!("all keys exhausted or rate limited");
        Err(PipelineError::RateLimited {
            attempts: max_attempts,
            last: last_error,
        })
    }
}

impl std::fmt::Debug for ModelGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelGateway")
            .field("keys", &self.keys.len())
            .field("cursor", &self.cursor.load(Ordering::Relaxed))
            .finish()
    }
}
