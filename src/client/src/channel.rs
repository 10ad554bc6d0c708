//! Channel construction over containerd's Unix socket.
//!
//! Building the client takes three steps: a bounded probe that the socket
//! accepts connections, a blocking dial of the HTTP/2 channel that ends with
//! one round trip to the daemon, and binding the namespaced service clients
//! to it. The connector behind the channel retries with exponential backoff,
//! for the first dial and for every reconnect tonic performs after a
//! transport blip.

use std::error::Error as StdError;
use std::path::Path;
use std::time::Duration;

use tokio::net::UnixStream;
use tonic::transport::{Channel, Endpoint, Uri};
use tonic::{Code, Request, Status};
use tower::service_fn;

use ctrlink_core::{ConnectError, ConnectionConfig, ContainerdError};

use crate::backoff::Backoff;
use crate::client::Client;
use crate::containerd::services::version::v1::version_client::VersionClient;
use crate::interceptor::NamespaceInterceptor;
use crate::services::Services;

/// Authority sent on the wire; the socket path is what gets dialed.
const ENDPOINT_URI: &str = "http://localhost";

/// Headroom the endpoint's own connect timeout gets over the dial bound, so
/// a first dial that runs out of time surfaces as `DialTimeout`.
const CONNECT_TIMEOUT_SLACK: Duration = Duration::from_millis(250);

/// Build a client connected to the daemon described by `config`.
///
/// Fails without exposing a partially built client.
pub async fn connect(config: &ConnectionConfig) -> Result<Client, ConnectError> {
    config.validate().map_err(|e| ConnectError::InvalidConfig {
        message: match e {
            ContainerdError::Config(message) => message,
            other => other.to_string(),
        },
    })?;
    let interceptor = NamespaceInterceptor::new(&config.namespace)?;

    probe(&config.address, config.connect_timeout()).await?;
    let channel = dial(config).await?;

    tracing::info!(
        address = %config.address.display(),
        namespace = %config.namespace,
        "Connected to containerd"
    );

    Ok(Client::new(Services::grpc(channel, interceptor)))
}

/// Check that something accepts connections on `address`, then hang up.
pub async fn probe(address: &Path, timeout: Duration) -> Result<(), ConnectError> {
    let probe_error = |message: String| ConnectError::Probe {
        address: address.display().to_string(),
        message,
    };

    match tokio::time::timeout(timeout, UnixStream::connect(address)).await {
        Ok(Ok(stream)) => {
            drop(stream);
            Ok(())
        }
        Ok(Err(e)) => {
            tracing::warn!(
                address = %address.display(),
                error = %e,
                "containerd socket unreachable"
            );
            Err(probe_error(e.to_string()))
        }
        Err(_) => Err(probe_error(format!("timed out after {:?}", timeout))),
    }
}

/// Dial the gRPC channel and wait for the daemon to answer on it, all within
/// the connect timeout.
///
/// A listener that accepts connections but never speaks HTTP/2 leaves the
/// answer pending, so the dial ends in `DialTimeout` rather than handing out
/// a channel nothing is serving.
pub async fn dial(config: &ConnectionConfig) -> Result<Channel, ConnectError> {
    let address = config.address.display().to_string();
    let timeout = config.connect_timeout();

    // Reconnects after the first dial are bounded by the endpoint alone.
    let endpoint =
        Endpoint::from_static(ENDPOINT_URI).connect_timeout(timeout + CONNECT_TIMEOUT_SLACK);

    let path = config.address.clone();
    let backoff = Backoff::new(config.backoff.clone());
    let connector = service_fn(move |_: Uri| {
        let path = path.clone();
        let backoff = backoff.clone();
        async move { dial_with_backoff(&path, &backoff).await }
    });

    let handshake = async {
        let channel = endpoint
            .connect_with_connector(connector)
            .await
            .map_err(|e| ConnectError::Dial {
                address: address.clone(),
                message: error_chain(&e),
            })?;
        ready(&channel).await.map_err(|status| ConnectError::Dial {
            address: address.clone(),
            message: status.message().to_string(),
        })?;
        Ok(channel)
    };

    let outcome = tokio::time::timeout(timeout, handshake).await;
    match outcome {
        Ok(result) => result,
        Err(_) => {
            tracing::warn!(address = %address, ?timeout, "containerd dial timed out");
            Err(ConnectError::DialTimeout { address, timeout })
        }
    }
}

/// One round trip on a fresh channel.
///
/// Any reply from the daemon, error statuses included, shows it is serving
/// gRPC; only transport failures count against readiness.
async fn ready(channel: &Channel) -> Result<(), Status> {
    match VersionClient::new(channel.clone()).version(Request::new(())).await {
        Ok(_) => Ok(()),
        Err(status) if matches!(status.code(), Code::Unavailable | Code::Unknown) => Err(status),
        Err(status) => {
            tracing::debug!(code = ?status.code(), "Daemon answered readiness call with an error");
            Ok(())
        }
    }
}

async fn dial_with_backoff(path: &Path, backoff: &Backoff) -> std::io::Result<UnixStream> {
    let mut retries = 0u32;
    loop {
        match UnixStream::connect(path).await {
            Ok(stream) => {
                if retries > 0 {
                    tracing::debug!(
                        address = %path.display(),
                        retries,
                        "Reconnected to containerd"
                    );
                }
                return Ok(stream);
            }
            Err(e) => {
                let delay = backoff.delay(retries);
                tracing::debug!(
                    address = %path.display(),
                    error = %e,
                    delay_ms = delay.as_millis() as u64,
                    "containerd dial failed, backing off"
                );
                tokio::time::sleep(delay).await;
                retries = retries.saturating_add(1);
            }
        }
    }
}

/// Render an error with its chain of sources, `outer: inner: root`.
fn error_chain(err: &(dyn StdError + 'static)) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}
