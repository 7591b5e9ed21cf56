//! Client configuration.

use std::time::Duration;

use crate::correlation::MAX_CORRELATION_IDS;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// How long a caller waits for an invocation result.
    pub invocation_timeout: Duration,
    /// How long opening a stateful session may take.
    pub session_open_timeout: Duration,
    /// How long a transaction message may take.
    pub transaction_timeout: Duration,
    /// Maximum outstanding invocations per channel.
    pub max_outstanding: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            invocation_timeout: Duration::from_secs(30),
            session_open_timeout: Duration::from_secs(30),
            transaction_timeout: Duration::from_secs(30),
            max_outstanding: 4096,
        }
    }
}

impl ClientConfig {
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder::new()
    }
}

/// Fluent builder for `ClientConfig`.
#[derive(Debug, Clone, Default)]
pub struct ClientConfigBuilder {
    config: ClientConfig,
}

impl ClientConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn invocation_timeout(mut self, timeout: Duration) -> Self {
        self.config.invocation_timeout = timeout;
        self
    }

    pub fn session_open_timeout(mut self, timeout: Duration) -> Self {
        self.config.session_open_timeout = timeout;
        self
    }

    pub fn transaction_timeout(mut self, timeout: Duration) -> Self {
        self.config.transaction_timeout = timeout;
        self
    }

    /// Clamped to `1..=65536`, the number of ids a channel can tell apart.
    pub fn max_outstanding(mut self, limit: usize) -> Self {
        self.config.max_outstanding = limit.clamp(1, MAX_CORRELATION_IDS);
        self
    }

    pub fn build(self) -> ClientConfig {
        self.config
    }
}
