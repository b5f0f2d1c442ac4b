//! Configuration for the sync engine.

use std::time::Duration;

/// Default interval between poll requests while a connection is open.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(200);

/// Default delay before retrying a failed or closed connection.
pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_millis(1000);

/// Configuration for a sync engine instance.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Endpoint address handed to the transport.
    pub endpoint: String,
    /// Interval between poll requests.
    pub poll_interval: Duration,
    /// Fixed delay before a reconnect attempt. There is no backoff and no
    /// retry cap; the engine retries indefinitely.
    pub reconnect_delay: Duration,
    /// When true, a poll tick is skipped while a previously sent request's
    /// response has not yet arrived. Unconditional sends (the default) are
    /// simpler but can overlap if the server is slow; gated sends avoid
    /// overlap but stall until the next inbound frame if a response is lost.
    pub gate_in_flight: bool,
}

impl EngineConfig {
    /// Creates a configuration with default timing for the given endpoint.
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            reconnect_delay: DEFAULT_RECONNECT_DELAY,
            gate_in_flight: false,
        }
    }

    /// Sets the poll interval.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Sets the reconnect delay.
    pub fn with_reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }

    /// Enables or disables in-flight backpressure gating.
    pub fn with_in_flight_gating(mut self, gate: bool) -> Self {
        self.gate_in_flight = gate;
        self
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::new("")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn engine_config_builder() {
        let config = EngineConfig::new("ws://localhost:6080/api/ssh")
            .with_poll_interval(Duration::from_millis(50))
            .with_reconnect_delay(Duration::from_millis(250))
            .with_in_flight_gating(true);

        assert_eq!(config.endpoint, "ws://localhost:6080/api/ssh");
        assert_eq!(config.poll_interval, Duration::from_millis(50));
        assert_eq!(config.reconnect_delay, Duration::from_millis(250));
        assert!(config.gate_in_flight);
    }

    #[test]
    fn default_timing() {
        let config = EngineConfig::default();
        assert_eq!(config.poll_interval, Duration::from_millis(200));
        assert_eq!(config.reconnect_delay, Duration::from_millis(1000));
        assert!(!config.gate_in_flight);
    }
}
