use reqwest::blocking::Client;
use std::time::Duration;
use tracing::warn;

/// Upper bound on connection setup, whatever the request timeout.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

pub struct HttpClientFactory;

impl HttpClientFactory {
    /// Creates a blocking HTTP client whose requests give up after `timeout`.
    pub fn create_blocking_client(timeout: Duration) -> Client {
        Client::builder()
            .pool_max_idle_per_host(5)
            .timeout(timeout)
            .connect_timeout(CONNECT_TIMEOUT.min(timeout))
            .build()
            .unwrap_or_else(|e| {
                warn!("HTTP client builder failed ({}), using defaults", e);
                Client::new()
            })
    }
}
