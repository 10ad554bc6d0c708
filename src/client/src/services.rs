//! Narrow capability interfaces over the five remote services.
//!
//! Each trait covers one containerd (or CRI) service and performs exactly
//! one round trip per method, returning wire messages and raw statuses.
//! Translation and error classification happen in [`crate::Client`], so any
//! of the five can be swapped for a fake independently.

use std::sync::Arc;

use async_trait::async_trait;
use tonic::codegen::InterceptedService;
use tonic::transport::Channel;
use tonic::{Request, Status};

use crate::containerd::services::containers::v1 as containers;
use crate::containerd::services::snapshots::v1 as snapshots;
use crate::containerd::services::tasks::v1 as tasks;
use crate::containerd::services::version::v1 as version;
use crate::cri_api;
use crate::interceptor::NamespaceInterceptor;

use containers::containers_client::ContainersClient;
use cri_api::runtime_service_client::RuntimeServiceClient;
use snapshots::snapshots_client::SnapshotsClient;
use tasks::tasks_client::TasksClient;
use version::version_client::VersionClient;

/// The shared channel with namespace tagging installed.
pub type NamespacedChannel = InterceptedService<Channel, NamespaceInterceptor>;

/// Container metadata lookups.
#[async_trait]
pub trait ContainerService: Send + Sync {
    async fn get(
        &self,
        request: Request<containers::GetContainerRequest>,
    ) -> Result<containers::GetContainerResponse, Status>;

    async fn list(
        &self,
        request: Request<containers::ListContainersRequest>,
    ) -> Result<containers::ListContainersResponse, Status>;

    /// Server-streaming listing; yields containers in the order received.
    async fn list_stream(
        &self,
        request: Request<containers::ListContainersRequest>,
    ) -> Result<Vec<containers::Container>, Status>;
}

/// Task (process) lookups.
#[async_trait]
pub trait TaskService: Send + Sync {
    async fn get(&self, request: Request<tasks::GetRequest>) -> Result<tasks::GetResponse, Status>;
}

/// Daemon version.
#[async_trait]
pub trait VersionService: Send + Sync {
    async fn version(&self, request: Request<()>) -> Result<version::VersionResponse, Status>;
}

/// Snapshot mount lookups.
#[async_trait]
pub trait SnapshotService: Send + Sync {
    async fn mounts(
        &self,
        request: Request<snapshots::MountsRequest>,
    ) -> Result<snapshots::MountsResponse, Status>;
}

/// CRI status and stats queries.
#[async_trait]
pub trait CriService: Send + Sync {
    async fn container_status(
        &self,
        request: Request<cri_api::ContainerStatusRequest>,
    ) -> Result<cri_api::ContainerStatusResponse, Status>;

    async fn container_stats(
        &self,
        request: Request<cri_api::ContainerStatsRequest>,
    ) -> Result<cri_api::ContainerStatsResponse, Status>;
}

/// The five service handles a [`crate::Client`] is composed of.
#[derive(Clone)]
pub struct Services {
    pub containers: Arc<dyn ContainerService>,
    pub tasks: Arc<dyn TaskService>,
    pub version: Arc<dyn VersionService>,
    pub snapshots: Arc<dyn SnapshotService>,
    pub cri: Arc<dyn CriService>,
}

impl Services {
    /// Bind gRPC clients for all five services to one channel.
    pub fn grpc(channel: Channel, interceptor: NamespaceInterceptor) -> Self {
        let namespaced = InterceptedService::new(channel, interceptor);
        Self {
            containers: Arc::new(GrpcContainers(ContainersClient::new(namespaced.clone()))),
            tasks: Arc::new(GrpcTasks(TasksClient::new(namespaced.clone()))),
            version: Arc::new(GrpcVersion(VersionClient::new(namespaced.clone()))),
            snapshots: Arc::new(GrpcSnapshots(SnapshotsClient::new(namespaced.clone()))),
            cri: Arc::new(GrpcCri(RuntimeServiceClient::new(namespaced))),
        }
    }
}

struct GrpcContainers(ContainersClient<NamespacedChannel>);

#[async_trait]
impl ContainerService for GrpcContainers {
    async fn get(
        &self,
        request: Request<containers::GetContainerRequest>,
    ) -> Result<containers::GetContainerResponse, Status> {
        Ok(self.0.clone().get(request).await?.into_inner())
    }

    async fn list(
        &self,
        request: Request<containers::ListContainersRequest>,
    ) -> Result<containers::ListContainersResponse, Status> {
        Ok(self.0.clone().list(request).await?.into_inner())
    }

    async fn list_stream(
        &self,
        request: Request<containers::ListContainersRequest>,
    ) -> Result<Vec<containers::Container>, Status> {
        let mut stream = self.0.clone().list_stream(request).await?.into_inner();
        let mut out = Vec::new();
        while let Some(message) = stream.message().await? {
            out.extend(message.container);
        }
        Ok(out)
    }
}

struct GrpcTasks(TasksClient<NamespacedChannel>);

#[async_trait]
impl TaskService for GrpcTasks {
    async fn get(&self, request: Request<tasks::GetRequest>) -> Result<tasks::GetResponse, Status> {
        Ok(self.0.clone().get(request).await?.into_inner())
    }
}

struct GrpcVersion(VersionClient<NamespacedChannel>);

#[async_trait]
impl VersionService for GrpcVersion {
    async fn version(&self, request: Request<()>) -> Result<version::VersionResponse, Status> {
        Ok(self.0.clone().version(request).await?.into_inner())
    }
}

struct GrpcSnapshots(SnapshotsClient<NamespacedChannel>);

#[async_trait]
impl SnapshotService for GrpcSnapshots {
    async fn mounts(
        &self,
        request: Request<snapshots::MountsRequest>,
    ) -> Result<snapshots::MountsResponse, Status> {
        Ok(self.0.clone().mounts(request).await?.into_inner())
    }
}

struct GrpcCri(RuntimeServiceClient<NamespacedChannel>);

#[async_trait]
impl CriService for GrpcCri {
    async fn container_status(
        &self,
        request: Request<cri_api::ContainerStatusRequest>,
    ) -> Result<cri_api::ContainerStatusResponse, Status> {
        Ok(self.0.clone().container_status(request).await?.into_inner())
    }

    async fn container_stats(
        &self,
        request: Request<cri_api::ContainerStatsRequest>,
    ) -> Result<cri_api::ContainerStatsResponse, Status> {
        Ok(self.0.clone().container_stats(request).await?.into_inner())
    }
}
