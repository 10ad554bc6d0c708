//! The containerd facade.

use std::fmt;
use std::future::Future;

use tonic::{Code, Status};

use ctrlink_core::{Container, ContainerdError, Mount, Result, TaskStatus, VersionInfo};

use crate::containerd::services::containers::v1 as containers;
use crate::containerd::services::snapshots::v1 as snapshots;
use crate::containerd::services::tasks::v1 as tasks;
use crate::containerd::v1::types as task_types;
use crate::context::CallContext;
use crate::convert;
use crate::cri_api;
use crate::services::Services;

/// Typed operations against one containerd daemon.
///
/// Each operation is a single round trip through the shared, namespaced
/// channel. containerd operations classify failures into
/// [`ContainerdError`]; the CRI operations (`container_status`,
/// `container_stats`) hand back the raw [`Status`] instead, so callers of
/// those two must match on gRPC codes.
#[derive(Clone)]
pub struct Client {
    services: Services,
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client").finish_non_exhaustive()
    }
}

impl Client {
    pub fn new(services: Services) -> Self {
        Self { services }
    }

    pub fn services(&self) -> &Services {
        &self.services
    }

    /// Load the metadata record of a container.
    pub async fn load_container(&self, ctx: &CallContext, id: &str) -> Result<Container> {
        let response = classified(ctx, "load_container", async {
            let request = ctx.request(containers::GetContainerRequest { id: id.to_string() })?;
            self.services.containers.get(request).await
        })
        .await?;

        Ok(response
            .container
            .map(convert::container_from_proto)
            .unwrap_or_default())
    }

    /// List containers matching any of `filters` (all when empty).
    ///
    /// Uses the streaming listing, falling back to the unary one for daemons
    /// that do not implement it.
    pub async fn list_containers(
        &self,
        ctx: &CallContext,
        filters: &[String],
    ) -> Result<Vec<Container>> {
        let list_request = || {
            ctx.request(containers::ListContainersRequest {
                filters: filters.to_vec(),
            })
        };

        let streamed = ctx
            .run(async { self.services.containers.list_stream(list_request()?).await })
            .await;

        let wire = match streamed {
            Ok(wire) => wire,
            Err(status) if status.code() == Code::Unimplemented => {
                tracing::debug!("ListStream unimplemented, falling back to List");
                classified(ctx, "list_containers", async {
                    self.services.containers.list(list_request()?).await
                })
                .await?
                .containers
            }
            Err(status) => return Err(failed("list_containers", status)),
        };

        Ok(wire.into_iter().map(convert::container_from_proto).collect())
    }

    /// Pid of the init process of the container's task.
    ///
    /// A task whose status is unknown yields
    /// [`ContainerdError::UnknownTaskState`] even when a pid was reported.
    pub async fn task_pid(&self, ctx: &CallContext, id: &str) -> Result<u32> {
        let response = classified(ctx, "task_pid", async {
            let request = ctx.request(tasks::GetRequest {
                container_id: id.to_string(),
                exec_id: String::new(),
            })?;
            self.services.tasks.get(request).await
        })
        .await?;

        // Only an explicit UNKNOWN counts; statuses newer than this proto
        // are passed over rather than folded into it.
        let process = response.process.unwrap_or_default();
        let status = task_types::Status::try_from(process.status)
            .ok()
            .map(convert::task_status_from_proto);
        if status == Some(TaskStatus::Unknown) {
            tracing::debug!(container_id = %id, pid = process.pid, "Task is in unknown state");
            return Err(ContainerdError::UnknownTaskState);
        }
        Ok(process.pid)
    }

    /// Version string of the daemon.
    pub async fn version(&self, ctx: &CallContext) -> Result<String> {
        Ok(self.version_info(ctx).await?.version)
    }

    /// Version and git revision of the daemon.
    pub async fn version_info(&self, ctx: &CallContext) -> Result<VersionInfo> {
        let response = classified(ctx, "version", async {
            self.services.version.version(ctx.request(())?).await
        })
        .await?;

        Ok(convert::version_from_proto(response))
    }

    /// Mounts for the snapshot `key` held by `snapshotter`, in the order
    /// they must be applied.
    pub async fn snapshot_mounts(
        &self,
        ctx: &CallContext,
        snapshotter: &str,
        key: &str,
    ) -> Result<Vec<Mount>> {
        let response = classified(ctx, "snapshot_mounts", async {
            let request = ctx.request(snapshots::MountsRequest {
                snapshotter: snapshotter.to_string(),
                key: key.to_string(),
            })?;
            self.services.snapshots.mounts(request).await
        })
        .await?;

        Ok(response.mounts.into_iter().map(convert::mount_from_proto).collect())
    }

    /// CRI status of a container. Errors are returned unclassified.
    pub async fn container_status(
        &self,
        ctx: &CallContext,
        id: &str,
    ) -> std::result::Result<cri_api::ContainerStatus, Status> {
        let response = ctx
            .run(async {
                let request = ctx.request(cri_api::ContainerStatusRequest {
                    container_id: id.to_string(),
                    verbose: false,
                })?;
                self.services.cri.container_status(request).await
            })
            .await?;

        response
            .status
            .ok_or_else(|| Status::internal(format!("no status returned for container {}", id)))
    }

    /// CRI resource usage of a container. Errors are returned unclassified.
    pub async fn container_stats(
        &self,
        ctx: &CallContext,
        id: &str,
    ) -> std::result::Result<cri_api::ContainerStats, Status> {
        let response = ctx
            .run(async {
                let request = ctx.request(cri_api::ContainerStatsRequest {
                    container_id: id.to_string(),
                })?;
                self.services.cri.container_stats(request).await
            })
            .await?;

        response
            .stats
            .ok_or_else(|| Status::internal(format!("no stats returned for container {}", id)))
    }
}

/// Run a containerd call under `ctx` and classify its failure.
async fn classified<T, F>(ctx: &CallContext, op: &'static str, call: F) -> Result<T>
where
    F: Future<Output = std::result::Result<T, Status>>,
{
    ctx.run(call).await.map_err(|status| failed(op, status))
}

fn failed(op: &'static str, status: Status) -> ContainerdError {
    tracing::debug!(
        op,
        code = ?status.code(),
        message = status.message(),
        "containerd call failed"
    );
    ContainerdError::from_grpc(status)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    use async_trait::async_trait;
    use tokio_util::sync::CancellationToken;
    use tonic::Request;

    use crate::containerd::services::version::v1 as version;
    use crate::containerd::types;
    use crate::services::{
        ContainerService, CriService, SnapshotService, TaskService, VersionService,
    };

    /// One fake standing in for all five services.
    #[derive(Default)]
    struct Fake {
        process: Option<task_types::Process>,
        stream_unimplemented: bool,
        hang: bool,
        calls: AtomicUsize,
    }

    impl Fake {
        async fn maybe_hang(&self) {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.hang {
                std::future::pending::<()>().await;
            }
        }
    }

    #[async_trait]
    impl ContainerService for Fake {
        async fn get(
            &self,
            request: Request<containers::GetContainerRequest>,
        ) -> std::result::Result<containers::GetContainerResponse, Status> {
            self.maybe_hang().await;
            let id = request.into_inner().id;
            if id == "missing" {
                return Err(Status::not_found(format!("container \"{}\": not found", id)));
            }
            Ok(containers::GetContainerResponse {
                container: Some(containers::Container {
                    id,
                    image: "img:latest".to_string(),
                    ..Default::default()
                }),
            })
        }

        async fn list(
            &self,
            _request: Request<containers::ListContainersRequest>,
        ) -> std::result::Result<containers::ListContainersResponse, Status> {
            Ok(containers::ListContainersResponse {
                containers: vec![containers::Container {
                    id: "unary".to_string(),
                    ..Default::default()
                }],
            })
        }

        async fn list_stream(
            &self,
            _request: Request<containers::ListContainersRequest>,
        ) -> std::result::Result<Vec<containers::Container>, Status> {
            if self.stream_unimplemented {
                return Err(Status::unimplemented("unknown method ListStream"));
            }
            Ok(vec![containers::Container {
                id: "streamed".to_string(),
                ..Default::default()
            }])
        }
    }

    #[async_trait]
    impl TaskService for Fake {
        async fn get(
            &self,
            _request: Request<tasks::GetRequest>,
        ) -> std::result::Result<tasks::GetResponse, Status> {
            Ok(tasks::GetResponse {
                process: self.process.clone(),
            })
        }
    }

    #[async_trait]
    impl VersionService for Fake {
        async fn version(
            &self,
            _request: Request<()>,
        ) -> std::result::Result<version::VersionResponse, Status> {
            Err(Status::unavailable("connection error: unavailable"))
        }
    }

    #[async_trait]
    impl SnapshotService for Fake {
        async fn mounts(
            &self,
            request: Request<snapshots::MountsRequest>,
        ) -> std::result::Result<snapshots::MountsResponse, Status> {
            let req = request.into_inner();
            Ok(snapshots::MountsResponse {
                mounts: vec![types::Mount {
                    r#type: "overlay".to_string(),
                    source: req.snapshotter,
                    target: String::new(),
                    options: vec![format!("upperdir={}", req.key)],
                }],
            })
        }
    }

    #[async_trait]
    impl CriService for Fake {
        async fn container_status(
            &self,
            _request: Request<cri_api::ContainerStatusRequest>,
        ) -> std::result::Result<cri_api::ContainerStatusResponse, Status> {
            Ok(cri_api::ContainerStatusResponse::default())
        }

        async fn container_stats(
            &self,
            _request: Request<cri_api::ContainerStatsRequest>,
        ) -> std::result::Result<cri_api::ContainerStatsResponse, Status> {
            self.maybe_hang().await;
            Err(Status::not_found("container not found"))
        }
    }

    fn client(fake: Fake) -> (Client, Arc<Fake>) {
        let fake = Arc::new(fake);
        let services = Services {
            containers: fake.clone(),
            tasks: fake.clone(),
            version: fake.clone(),
            snapshots: fake.clone(),
            cri: fake.clone(),
        };
        (Client::new(services), fake)
    }

    fn process(status: task_types::Status, pid: u32) -> task_types::Process {
        task_types::Process {
            pid,
            status: status as i32,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_load_container_translates() {
        let (client, _) = client(Fake::default());
        let c = client.load_container(&CallContext::background(), "c1").await.unwrap();
        assert_eq!(c.id, "c1");
        assert_eq!(c.image, "img:latest");
    }

    #[tokio::test]
    async fn test_load_container_maps_not_found() {
        let (client, _) = client(Fake::default());
        let err = client
            .load_container(&CallContext::background(), "missing")
            .await
            .unwrap_err();
        assert!(matches!(err, ContainerdError::NotFound(ref m) if m == "container \"missing\""));
    }

    #[tokio::test]
    async fn test_task_pid_running() {
        let (client, _) = client(Fake {
            process: Some(process(task_types::Status::Running, 4242)),
            ..Default::default()
        });
        let pid = client.task_pid(&CallContext::background(), "c1").await.unwrap();
        assert_eq!(pid, 4242);
    }

    #[tokio::test]
    async fn test_task_pid_unknown_state_ignores_pid() {
        let (client, _) = client(Fake {
            process: Some(process(task_types::Status::Unknown, 4242)),
            ..Default::default()
        });
        let err = client.task_pid(&CallContext::background(), "c1").await.unwrap_err();
        assert!(matches!(err, ContainerdError::UnknownTaskState));
    }

    #[tokio::test]
    async fn test_task_pid_missing_process_is_unknown() {
        let (client, _) = client(Fake::default());
        let err = client.task_pid(&CallContext::background(), "c1").await.unwrap_err();
        assert!(matches!(err, ContainerdError::UnknownTaskState));
    }

    #[tokio::test]
    async fn test_task_pid_stopped_still_reports_pid() {
        let (client, _) = client(Fake {
            process: Some(process(task_types::Status::Stopped, 17)),
            ..Default::default()
        });
        assert_eq!(client.task_pid(&CallContext::background(), "c1").await.unwrap(), 17);
    }

    #[tokio::test]
    async fn test_task_pid_unrecognized_status_reports_pid() {
        let (client, _) = client(Fake {
            process: Some(task_types::Process {
                pid: 42,
                status: 7,
                ..Default::default()
            }),
            ..Default::default()
        });
        assert_eq!(client.task_pid(&CallContext::background(), "c1").await.unwrap(), 42);
    }

    #[test]
    fn test_client_debug_hides_services() {
        let (client, _) = client(Fake::default());
        assert_eq!(format!("{:?}", client), "Client { .. }");
    }

    #[tokio::test]
    async fn test_version_maps_unavailable() {
        let (client, _) = client(Fake::default());
        let err = client.version(&CallContext::background()).await.unwrap_err();
        assert!(matches!(err, ContainerdError::Unavailable(ref m) if m == "connection error"));
    }

    #[tokio::test]
    async fn test_snapshot_mounts_keeps_order_and_fields() {
        let (client, _) = client(Fake::default());
        let mounts = client
            .snapshot_mounts(&CallContext::background(), "overlayfs", "k1")
            .await
            .unwrap();
        assert_eq!(mounts.len(), 1);
        assert_eq!(mounts[0].kind, "overlay");
        assert_eq!(mounts[0].source, "overlayfs");
        assert_eq!(mounts[0].options, vec!["upperdir=k1"]);
    }

    #[tokio::test]
    async fn test_list_containers_prefers_stream() {
        let (client, _) = client(Fake::default());
        let list = client.list_containers(&CallContext::background(), &[]).await.unwrap();
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].id, "streamed");
    }

    #[tokio::test]
    async fn test_list_containers_falls_back_to_unary() {
        let (client, _) = client(Fake {
            stream_unimplemented: true,
            ..Default::default()
        });
        let list = client.list_containers(&CallContext::background(), &[]).await.unwrap();
        assert_eq!(list[0].id, "unary");
    }

    #[tokio::test]
    async fn test_cri_errors_pass_through() {
        let (client, _) = client(Fake::default());
        let status = client
            .container_stats(&CallContext::background(), "c1")
            .await
            .unwrap_err();
        assert_eq!(status.code(), Code::NotFound);
        assert_eq!(status.message(), "container not found");
    }

    #[tokio::test]
    async fn test_cri_empty_status_is_internal() {
        let (client, _) = client(Fake::default());
        let status = client
            .container_status(&CallContext::background(), "c1")
            .await
            .unwrap_err();
        assert_eq!(status.code(), Code::Internal);
    }

    #[tokio::test]
    async fn test_cancelled_container_stats_returns_promptly() {
        let (client, fake) = client(Fake {
            hang: true,
            ..Default::default()
        });
        let token = CancellationToken::new();
        let ctx = CallContext::background().with_cancellation(token.clone());

        let call = tokio::spawn({
            let client = client.clone();
            async move { client.container_stats(&ctx, "c1").await }
        });
        tokio::time::sleep(Duration::from_millis(20)).await;
        token.cancel();

        let status = tokio::time::timeout(Duration::from_secs(1), call)
            .await
            .expect("call should return promptly")
            .unwrap()
            .unwrap_err();
        assert_eq!(status.code(), Code::Cancelled);
        assert_eq!(fake.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_maps_to_deadline_exceeded() {
        let (client, _) = client(Fake {
            hang: true,
            ..Default::default()
        });
        let ctx = CallContext::background().with_timeout(Duration::from_secs(1));
        let err = client.load_container(&ctx, "c1").await.unwrap_err();
        assert!(matches!(err, ContainerdError::DeadlineExceeded(_)));
    }
}
