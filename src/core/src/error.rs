use std::time::Duration;

use thiserror::Error;
use tonic::{Code, Status};

/// Failure to establish the process-wide containerd channel.
///
/// The singleton caches the outcome of its one construction attempt, so this
/// type is `Clone` and comparable: every caller observes the same value.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConnectError {
    /// The pre-connect reachability probe could not reach the socket
    #[error("containerd: cannot unix dial containerd api service at {address}: {message}")]
    Probe { address: String, message: String },

    /// The gRPC channel could not be established
    #[error("containerd: failed to dial {address}: {message}")]
    Dial { address: String, message: String },

    /// The gRPC channel was not ready within the connect timeout
    #[error("containerd: timed out after {timeout:?} dialing {address}")]
    DialTimeout { address: String, timeout: Duration },

    /// The connection parameters are unusable
    #[error("containerd: invalid connection config: {message}")]
    InvalidConfig { message: String },

    /// The namespace cannot be carried in request metadata
    #[error("containerd: invalid namespace {namespace:?}: {message}")]
    InvalidNamespace { namespace: String, message: String },
}

/// Errors returned by containerd facade operations.
///
/// Transport failures are classified by their gRPC status code. Codes with
/// no local class survive untouched in [`ContainerdError::Transport`].
#[derive(Error, Debug)]
pub enum ContainerdError {
    /// The task backing a container reported an unknown process status
    #[error("containerd task is in unknown state")]
    UnknownTaskState,

    #[error("{}", with_class(.0, "not found"))]
    NotFound(String),

    #[error("{}", with_class(.0, "already exists"))]
    AlreadyExists(String),

    #[error("{}", with_class(.0, "invalid argument"))]
    InvalidArgument(String),

    #[error("{}", with_class(.0, "failed precondition"))]
    FailedPrecondition(String),

    #[error("{}", with_class(.0, "unavailable"))]
    Unavailable(String),

    #[error("{}", with_class(.0, "not implemented"))]
    NotImplemented(String),

    /// The caller cancelled the call
    #[error("{}", with_class(.0, "context canceled"))]
    Cancelled(String),

    /// The caller's deadline elapsed before the call completed
    #[error("{}", with_class(.0, "context deadline exceeded"))]
    DeadlineExceeded(String),

    /// Unclassified transport error, passed through unchanged
    #[error("gRPC error: {0}")]
    Transport(Status),

    /// The shared channel could not be established
    #[error(transparent)]
    Connect(#[from] ConnectError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl ContainerdError {
    /// Classify a gRPC status into the local taxonomy.
    ///
    /// The message text is kept, minus the redundant `": <class>"` suffix
    /// containerd appends when it serialises its own typed errors.
    pub fn from_grpc(status: Status) -> Self {
        let class: fn(String) -> Self = match status.code() {
            Code::InvalidArgument => Self::InvalidArgument,
            Code::NotFound => Self::NotFound,
            Code::AlreadyExists => Self::AlreadyExists,
            Code::FailedPrecondition => Self::FailedPrecondition,
            Code::Unavailable => Self::Unavailable,
            Code::Unimplemented => Self::NotImplemented,
            Code::Cancelled => Self::Cancelled,
            Code::DeadlineExceeded => Self::DeadlineExceeded,
            _ => return Self::Transport(status),
        };
        let message = rebase_message(status.message(), class_name(status.code()));
        class(message)
    }

    /// Classify an error that may still be carrying a raw transport status.
    ///
    /// Already classified errors are returned unchanged, so
    /// `e.classify().classify()` is equivalent to `e.classify()`.
    pub fn classify(self) -> Self {
        match self {
            Self::Transport(status) => Self::from_grpc(status),
            other => other,
        }
    }

    /// The gRPC status code this error corresponds to.
    pub fn code(&self) -> Code {
        match self {
            Self::UnknownTaskState => Code::Unknown,
            Self::NotFound(_) => Code::NotFound,
            Self::AlreadyExists(_) => Code::AlreadyExists,
            Self::InvalidArgument(_) => Code::InvalidArgument,
            Self::FailedPrecondition(_) => Code::FailedPrecondition,
            Self::Unavailable(_) => Code::Unavailable,
            Self::NotImplemented(_) => Code::Unimplemented,
            Self::Cancelled(_) => Code::Cancelled,
            Self::DeadlineExceeded(_) => Code::DeadlineExceeded,
            Self::Transport(status) => status.code(),
            Self::Connect(_) => Code::Unavailable,
            Self::Config(_) => Code::InvalidArgument,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled(_) | Self::DeadlineExceeded(_))
    }
}

impl From<Status> for ContainerdError {
    fn from(status: Status) -> Self {
        Self::from_grpc(status)
    }
}

/// Result type alias for ctrlink operations
pub type Result<T> = std::result::Result<T, ContainerdError>;

fn class_name(code: Code) -> &'static str {
    match code {
        Code::InvalidArgument => "invalid argument",
        Code::NotFound => "not found",
        Code::AlreadyExists => "already exists",
        Code::FailedPrecondition => "failed precondition",
        Code::Unavailable => "unavailable",
        Code::Unimplemented => "not implemented",
        Code::Cancelled => "context canceled",
        Code::DeadlineExceeded => "context deadline exceeded",
        _ => "unknown",
    }
}

fn rebase_message(message: &str, class: &str) -> String {
    if message == class {
        return String::new();
    }
    message
        .strip_suffix(class)
        .and_then(|rest| rest.strip_suffix(": "))
        .unwrap_or(message)
        .to_string()
}

fn with_class(message: &str, class: &str) -> String {
    if message.is_empty() {
        class.to_string()
    } else {
        format!("{}: {}", message, class)
    }
}
