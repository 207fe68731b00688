//! TCP listener setup.
//!
//! # Responsibilities
//! - Accept bare-port addresses (`:3333` means every interface, IPv6 and IPv4)
//! - Bind the listener both transports serve on
//! - Report bind failures as a fatal startup error

use thiserror::Error;
use tokio::net::TcpListener;

/// Error type for listener operations.
#[derive(Debug, Error)]
pub enum ListenerError {
    /// Failed to bind to address.
    #[error("Failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },
}

/// Addresses to try for `address`, in order.
///
/// A bare `:port` prefers the dual-stack IPv6 wildcard and falls back to
/// IPv4 on hosts without IPv6.
pub fn candidate_addresses(address: &str) -> Vec<String> {
    if address.starts_with(':') {
        vec![format!("[::]{}", address), format!("0.0.0.0{}", address)]
    } else {
        vec![address.to_string()]
    }
}

/// Bind a TCP listener on `address`.
pub async fn bind(address: &str) -> Result<TcpListener, ListenerError> {
    let mut last_error = None;

    for candidate in candidate_addresses(address) {
        match TcpListener::bind(&candidate).await {
            Ok(listener) => {
                if let Ok(local_addr) = listener.local_addr() {
                    tracing::debug!(address = %local_addr, "Listener bound");
                }
                return Ok(listener);
            }
            Err(e) => {
                tracing::debug!(address = %candidate, error = %e, "Bind attempt failed");
                last_error = Some(e);
            }
        }
    }

    Err(ListenerError::Bind {
        address: address.to_string(),
        source: last_error.unwrap_or_else(|| std::io::Error::other("no address to bind")),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_port_means_all_interfaces() {
        assert_eq!(candidate_addresses(":3333"), vec!["[::]:3333", "0.0.0.0:3333"]);
        assert_eq!(candidate_addresses("127.0.0.1:80"), vec!["127.0.0.1:80"]);
        assert_eq!(candidate_addresses("localhost:8080"), vec!["localhost:8080"]);
    }

    #[tokio::test]
    async fn bare_port_binds_a_wildcard_address() {
        let listener = bind(":0").await.unwrap();
        let local = listener.local_addr().unwrap();

        assert!(local.ip().is_unspecified());
        assert_ne!(local.port(), 0);
    }

    #[tokio::test]
    async fn binds_ephemeral_port() {
        let listener = bind("127.0.0.1:0").await.unwrap();
        assert_ne!(listener.local_addr().unwrap().port(), 0);
    }

    #[tokio::test]
    async fn bind_failure_is_reported() {
        let taken = bind("127.0.0.1:0").await.unwrap();
        let address = taken.local_addr().unwrap().to_string();

        let err = bind(&address).await.unwrap_err();
        assert!(err.to_string().contains(&address));
    }
}
