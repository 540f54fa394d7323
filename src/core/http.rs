use std::time::Duration;

use reqwest::Client;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Outbound HTTP client with the request timeout applied.
///
/// If the TLS backend cannot be initialized, the default client is used and
/// the loss of timeouts is logged.
pub fn http_client(purpose: &str, timeout: Duration) -> Client {
    Client::builder()
        .timeout(timeout)
        .connect_timeout(CONNECT_TIMEOUT.min(timeout))
        .build()
        .unwrap_or_else(|err| {
            tracing::warn!(
                "Failed to build {} HTTP client ({}); continuing without timeouts",
                purpose,
                err
            );
            Client::new()
        })
}
