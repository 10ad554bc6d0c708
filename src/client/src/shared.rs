//! Process-wide client lifecycle.
//!
//! The first request for a client dials containerd; every later request,
//! concurrent or not, receives the outcome of that one attempt. A failed
//! attempt is cached like a successful one and never retried: only the
//! channel's own reconnect backoff recovers from transport trouble, and
//! only after an initial success.

use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::OnceCell;

use ctrlink_core::{ConnectError, ConnectionConfig};

use crate::channel;
use crate::client::Client;

/// Outcome of the one-time client construction.
pub type SharedClient = Result<Arc<Client>, ConnectError>;

/// Owner of a lazily built, initialize-once [`Client`].
///
/// Concurrent first callers all wait for the single construction to finish
/// and then observe the same result.
pub struct ClientCell {
    cell: OnceCell<SharedClient>,
}

impl ClientCell {
    pub const fn new() -> Self {
        Self {
            cell: OnceCell::const_new(),
        }
    }

    /// The client for `config`, connecting on first use.
    ///
    /// `config` only matters for the call that performs the construction.
    pub async fn get_or_connect(&self, config: &ConnectionConfig) -> SharedClient {
        self.get_or_init_with(|| async move {
            tracing::debug!(
                address = %config.address.display(),
                namespace = %config.namespace,
                "Building process-wide containerd client"
            );
            channel::connect(config).await.map(Arc::new)
        })
        .await
    }

    /// Run `init` if no construction has completed yet and return the
    /// stored outcome.
    pub async fn get_or_init_with<F, Fut>(&self, init: F) -> SharedClient
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = SharedClient>,
    {
        self.cell.get_or_init(init).await.clone()
    }

    /// The stored outcome, if construction has completed.
    pub fn get(&self) -> Option<&SharedClient> {
        self.cell.get()
    }

    pub fn is_initialized(&self) -> bool {
        self.cell.initialized()
    }
}

impl Default for ClientCell {
    fn default() -> Self {
        Self::new()
    }
}

static GLOBAL: ClientCell = ClientCell::new();

/// The process-wide client for the daemon at `address`, scoped to
/// `namespace`.
///
/// Only the first call in a process connects; later calls return the same
/// client (or the same error), whatever arguments they pass.
pub async fn client(address: impl Into<PathBuf>, namespace: &str) -> SharedClient {
    client_with_config(&ConnectionConfig::new(address, namespace)).await
}

/// [`client`] with full connection parameters.
pub async fn client_with_config(config: &ConnectionConfig) -> SharedClient {
    GLOBAL.get_or_connect(config).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn probe_failure() -> ConnectError {
        ConnectError::Probe {
            address: "/tmp/none.sock".to_string(),
            message: "No such file or directory (os error 2)".to_string(),
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_first_callers_share_one_attempt() {
        let cell = Arc::new(ClientCell::new());
        let attempts = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..16 {
            let cell = cell.clone();
            let attempts = attempts.clone();
            handles.push(tokio::spawn(async move {
                cell.get_or_init_with(|| async move {
                    attempts.fetch_add(1, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(50)).await;
                    Err(probe_failure())
                })
                .await
            }));
        }

        for handle in handles {
            let outcome = handle.await.unwrap();
            assert_eq!(outcome.err(), Some(probe_failure()));
        }
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failed_attempt_is_not_retried() {
        let cell = ClientCell::new();
        let attempts = AtomicUsize::new(0);
        let counter = &attempts;
        let attempt = || async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Err(probe_failure())
        };

        let first = cell.get_or_init_with(attempt).await;
        let second = cell.get_or_init_with(attempt).await;

        assert_eq!(first.err(), second.err());
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
        assert!(cell.is_initialized());
    }

    #[tokio::test]
    async fn test_get_before_init() {
        let cell = ClientCell::default();
        assert!(cell.get().is_none());
        assert!(!cell.is_initialized());
    }

    #[tokio::test]
    async fn test_unreachable_socket_is_cached_without_reprobing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("containerd.sock");
        let config = ConnectionConfig::new(&path, "k8s.io")
            .with_connect_timeout(Duration::from_millis(300));
        let cell = ClientCell::new();

        let first = cell.get_or_connect(&config).await.err().unwrap();
        assert!(matches!(first, ConnectError::Probe { .. }));

        // The socket exists now, but the cached failure stands.
        let _listener = tokio::net::UnixListener::bind(&path).unwrap();
        let second = cell.get_or_connect(&config).await.err().unwrap();
        assert_eq!(first, second);
    }
}
