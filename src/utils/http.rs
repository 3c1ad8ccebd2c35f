//! HTTP Client with Connection Pooling
//!
//! Provides a global async HTTP client with connection reuse and
//! conservative timeouts. Every adapter and oracle request in the crate
//! goes through this pool.

use reqwest::Client;
use serde::de::DeserializeOwned;
use std::sync::OnceLock;
use std::time::Duration;

use crate::error::{WardenError, WardenResult};

/// Global HTTP client instance - lazy initialized
static GLOBAL_CLIENT: OnceLock<Client> = OnceLock::new();

/// Get the shared HTTP client
pub fn get_client() -> &'static Client {
    GLOBAL_CLIENT.get_or_init(|| {
        // Client::builder only fails if TLS initialization fails, which is a
        // system-level issue. The crate cannot function without HTTP.
        Client::builder()
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(10))
            .pool_idle_timeout(Duration::from_secs(90))
            .pool_max_idle_per_host(5)
            .tcp_keepalive(Duration::from_secs(60))
            .tcp_nodelay(true)
            .user_agent("Warden/1.0")
            .build()
            .expect("HTTP client initialization failed - check TLS configuration")
    })
}

/// GET a JSON document
pub async fn get_json<T: DeserializeOwned>(url: &str) -> WardenResult<T> {
    let response = get_client().get(url).send().await?;

    if !response.status().is_success() {
        return Err(WardenError::network_error(format!(
            "GET {} returned {}",
            url,
            response.status()
        )));
    }

    response
        .json::<T>()
        .await
        .map_err(|e| WardenError::parse_error(format!("Failed to parse response: {}", e)))
}

/// POST a JSON body, returning the parsed JSON response
pub async fn post_json<T: DeserializeOwned, B: serde::Serialize>(
    url: &str,
    body: &B,
) -> WardenResult<T> {
    let response = get_client().post(url).json(body).send().await?;

    if !response.status().is_success() {
        return Err(WardenError::network_error(format!(
            "POST {} returned {}",
            url,
            response.status()
        )));
    }

    response
        .json::<T>()
        .await
        .map_err(|e| WardenError::parse_error(format!("Failed to parse response: {}", e)))
}

/// POST a plain-text body, returning `(status, body)` without treating a
/// non-success status as a transport error; broadcast callers map status
/// codes themselves
pub async fn post_text(url: &str, body: String) -> WardenResult<(u16, String)> {
    let response = get_client()
        .post(url)
        .header("Content-Type", "text/plain")
        .body(body)
        .send()
        .await?;

    let status = response.status().as_u16();
    let text = response.text().await.unwrap_or_default();
    Ok((status, text))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_pool_creation() {
        let client = get_client();
        assert!(client.get("https://example.com").build().is_ok());
    }
}
