//! ctrlink core - shared types for the containerd connection adapter.
//!
//! This crate carries everything that does not touch the wire: the local
//! error taxonomy and the mapping from gRPC status codes into it, the
//! connection parameters, and the domain records produced from containerd
//! responses.

pub mod config;
pub mod container;
pub mod error;

// Re-export commonly used types
pub use config::{BackoffConfig, ConnectionConfig};
pub use container::{AnyBlob, Container, Mount, RuntimeInfo, TaskStatus, VersionInfo};
pub use error::{ConnectError, ContainerdError, Result};

/// ctrlink version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
