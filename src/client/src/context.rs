//! Per-call cancellation and deadlines.

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tonic::metadata::MetadataValue;
use tonic::{Request, Status};

use crate::interceptor::NAMESPACE_HEADER;

/// Caller-supplied scope for one facade call.
///
/// A call made under a context resolves as soon as its token is cancelled
/// or its deadline passes, with a `Cancelled` or `DeadlineExceeded` status,
/// whatever the state of the round trip. The deadline is also sent to the
/// daemon as the gRPC timeout.
#[derive(Debug, Clone, Default)]
pub struct CallContext {
    deadline: Option<Instant>,
    cancel: Option<CancellationToken>,
    namespace: Option<String>,
}

impl CallContext {
    /// A context that is never cancelled and has no deadline.
    pub fn background() -> Self {
        Self::default()
    }

    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    /// Set the deadline; an earlier existing deadline wins.
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(match self.deadline {
            Some(current) => current.min(deadline),
            None => deadline,
        });
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Address this call to `namespace` instead of the client's default.
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Time left before the deadline, if one is set.
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|deadline| deadline.saturating_duration_since(Instant::now()))
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(|t| t.is_cancelled())
    }

    /// Wrap a request message, carrying the deadline and namespace override.
    pub fn request<T>(&self, message: T) -> Result<Request<T>, Status> {
        let mut request = Request::new(message);
        if let Some(remaining) = self.remaining() {
            request.set_timeout(remaining);
        }
        if let Some(namespace) = &self.namespace {
            let value = MetadataValue::try_from(namespace.as_str()).map_err(|_| {
                Status::invalid_argument(format!("invalid namespace {:?}", namespace))
            })?;
            request.metadata_mut().insert(NAMESPACE_HEADER, value);
        }
        Ok(request)
    }

    /// Drive `call` until it completes or the context is done.
    pub async fn run<T, F>(&self, call: F) -> Result<T, Status>
    where
        F: Future<Output = Result<T, Status>>,
    {
        if self.is_cancelled() {
            return Err(cancelled());
        }

        let cancelled_fut = async {
            match &self.cancel {
                Some(token) => token.cancelled().await,
                None => std::future::pending::<()>().await,
            }
        };
        let deadline_fut = async {
            match self.deadline {
                Some(deadline) => tokio::time::sleep_until(deadline).await,
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            biased;
            _ = cancelled_fut => Err(cancelled()),
            _ = deadline_fut => Err(Status::deadline_exceeded("context deadline exceeded")),
            result = call => result,
        }
    }
}

fn cancelled() -> Status {
    Status::cancelled("context canceled")
}
