//! TCP listener binding.
//!
//! # Responsibilities
//! - Bind to the configured address
//! - Report bind and serve failures as `ListenError`
//!
//! # Design Decisions
//! - Binding happens before the TLS decision so both paths share one socket
//! - Bind failures are fatal at startup; they are never retried

use std::net::SocketAddr;

use thiserror::Error;
use tokio::net::TcpListener;

/// Error type for listener operations.
#[derive(Debug, Error)]
pub enum ListenError {
    /// Failed to bind to address.
    #[error("failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },

    /// The accept loop or connection driver failed.
    #[error("server error: {0}")]
    Serve(#[source] std::io::Error),
}

/// Bind a TCP listener on `address` (`host:port`).
pub async fn bind(address: &str) -> Result<TcpListener, ListenError> {
    let listener = TcpListener::bind(address)
        .await
        .map_err(|source| ListenError::Bind {
            address: address.to_string(),
            source,
        })?;

    let local_addr = local_addr(&listener)?;
    tracing::info!(address = %local_addr, "Listener bound");

    Ok(listener)
}

/// The address `listener` is bound to.
pub fn local_addr(listener: &TcpListener) -> Result<SocketAddr, ListenError> {
    listener.local_addr().map_err(ListenError::Serve)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn binds_ephemeral_port() {
        let listener = bind("127.0.0.1:0").await.unwrap();
        assert_ne!(local_addr(&listener).unwrap().port(), 0);
    }

    #[tokio::test]
    async fn reports_address_in_use() {
        let first = bind("127.0.0.1:0").await.unwrap();
        let taken = local_addr(&first).unwrap().to_string();
        let err = bind(&taken).await.unwrap_err();
        assert!(matches!(err, ListenError::Bind { ref address, .. } if *address == taken));
    }

    #[tokio::test]
    async fn reports_unparseable_address() {
        assert!(matches!(
            bind("not-an-address").await,
            Err(ListenError::Bind { .. })
        ));
    }
}
