//! ctrlink client - a process-wide connection to containerd.
//!
//! One gRPC channel is dialed per process over containerd's Unix socket and
//! shared by every call. Each call is scoped to a namespace by the
//! [`NamespaceInterceptor`], and the [`Client`] facade turns wire responses
//! into the records of [`ctrlink_core`] and transport failures into
//! [`ContainerdError`].
//!
//! ```no_run
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! use ctrlink_client::CallContext;
//!
//! let client = ctrlink_client::client("/run/containerd/containerd.sock", "k8s.io").await?;
//! let ctx = CallContext::background();
//! println!("containerd {}", client.version(&ctx).await?);
//! # Ok(())
//! # }
//! ```

pub mod backoff;
pub mod channel;
pub mod client;
pub mod context;
pub mod convert;
pub mod interceptor;
pub mod services;
pub mod shared;

pub use ctrlink_core::{
    AnyBlob, BackoffConfig, ConnectError, ConnectionConfig, Container, ContainerdError, Mount,
    Result, RuntimeInfo, TaskStatus, VersionInfo,
};

pub use backoff::Backoff;
pub use client::Client;
pub use context::CallContext;
pub use interceptor::{CallWrapper, NamespaceInterceptor, NAMESPACE_HEADER};
pub use services::{
    ContainerService, CriService, Services, SnapshotService, TaskService, VersionService,
};
pub use shared::{client, client_with_config, ClientCell};

/// Generated containerd API types.
pub mod containerd {
    pub mod types {
        tonic::include_proto!("containerd.types");
    }

    pub mod v1 {
        pub mod types {
            tonic::include_proto!("containerd.v1.types");
        }
    }

    pub mod services {
        pub mod containers {
            pub mod v1 {
                tonic::include_proto!("containerd.services.containers.v1");
            }
        }

        pub mod tasks {
            pub mod v1 {
                tonic::include_proto!("containerd.services.tasks.v1");
            }
        }

        pub mod version {
            pub mod v1 {
                tonic::include_proto!("containerd.services.version.v1");
            }
        }

        pub mod snapshots {
            pub mod v1 {
                tonic::include_proto!("containerd.services.snapshots.v1");
            }
        }
    }
}

/// Generated CRI v1alpha2 types.
pub mod cri_api {
    tonic::include_proto!("runtime.v1alpha2");
}
