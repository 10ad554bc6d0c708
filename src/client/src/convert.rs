//! Conversion between wire messages and ctrlink records.
//!
//! Every conversion is total: optional wire fields that are absent come out
//! as zero values of the corresponding record field.

use chrono::{DateTime, Utc};

use ctrlink_core::{AnyBlob, Container, Mount, RuntimeInfo, TaskStatus, VersionInfo};

use crate::containerd::services::containers::v1 as containers;
use crate::containerd::services::version::v1 as version;
use crate::containerd::types;
use crate::containerd::v1::types as task_types;

/// Convert a wire container into a [`Container`].
pub fn container_from_proto(container: containers::Container) -> Container {
    let runtime = container
        .runtime
        .map(|runtime| RuntimeInfo {
            name: runtime.name,
            options: runtime.options.map(blob_from_proto).unwrap_or_default(),
        })
        .unwrap_or_default();

    Container {
        id: container.id,
        labels: container.labels,
        image: container.image,
        runtime,
        spec: container.spec.map(blob_from_proto).unwrap_or_default(),
        snapshotter: container.snapshotter,
        snapshot_key: container.snapshot_key,
        created_at: container.created_at.and_then(timestamp_from_proto),
        updated_at: container.updated_at.and_then(timestamp_from_proto),
        extensions: container
            .extensions
            .into_iter()
            .map(|(key, value)| (key, blob_from_proto(value)))
            .collect(),
        sandbox: container.sandbox,
    }
}

pub fn mount_from_proto(mount: types::Mount) -> Mount {
    Mount {
        kind: mount.r#type,
        source: mount.source,
        target: mount.target,
        options: mount.options,
    }
}

pub fn blob_from_proto(any: prost_types::Any) -> AnyBlob {
    AnyBlob {
        type_url: any.type_url,
        value: any.value,
    }
}

pub fn task_status_from_proto(status: task_types::Status) -> TaskStatus {
    match status {
        task_types::Status::Unknown => TaskStatus::Unknown,
        task_types::Status::Created => TaskStatus::Created,
        task_types::Status::Running => TaskStatus::Running,
        task_types::Status::Stopped => TaskStatus::Stopped,
        task_types::Status::Paused => TaskStatus::Paused,
        task_types::Status::Pausing => TaskStatus::Pausing,
    }
}

pub fn version_from_proto(response: version::VersionResponse) -> VersionInfo {
    VersionInfo {
        version: response.version,
        revision: response.revision,
    }
}

/// `None` for timestamps outside the representable range.
pub fn timestamp_from_proto(ts: prost_types::Timestamp) -> Option<DateTime<Utc>> {
    let nanos = u32::try_from(ts.nanos).ok()?;
    DateTime::from_timestamp(ts.seconds, nanos)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn any(type_url: &str, value: &[u8]) -> prost_types::Any {
        prost_types::Any {
            type_url: type_url.to_string(),
            value: value.to_vec(),
        }
    }

    #[test]
    fn test_minimal_container() {
        let wire = containers::Container {
            id: "c1".to_string(),
            image: "img:latest".to_string(),
            labels: HashMap::from([("a".to_string(), "b".to_string())]),
            ..Default::default()
        };

        let c = container_from_proto(wire);
        assert_eq!(c.id, "c1");
        assert_eq!(c.image, "img:latest");
        assert_eq!(c.labels, HashMap::from([("a".to_string(), "b".to_string())]));
        assert_eq!(c.runtime, RuntimeInfo::default());
        assert_eq!(c.spec, AnyBlob::default());
        assert!(c.snapshotter.is_empty());
        assert!(c.snapshot_key.is_empty());
        assert!(c.extensions.is_empty());
        assert!(c.created_at.is_none());
        assert!(c.sandbox.is_empty());
    }

    #[test]
    fn test_missing_runtime_is_zero_value() {
        let c = container_from_proto(containers::Container::default());
        assert_eq!(c.runtime.name, "");
        assert!(c.runtime.options.is_empty());
    }

    #[test]
    fn test_runtime_without_options() {
        let wire = containers::Container {
            runtime: Some(containers::container::Runtime {
                name: "io.containerd.runc.v2".to_string(),
                options: None,
            }),
            ..Default::default()
        };
        let c = container_from_proto(wire);
        assert_eq!(c.runtime.name, "io.containerd.runc.v2");
        assert_eq!(c.runtime.options, AnyBlob::default());
    }

    #[test]
    fn test_full_container() {
        let wire = containers::Container {
            id: "nginx".to_string(),
            labels: HashMap::new(),
            image: "docker.io/library/nginx:1.25".to_string(),
            runtime: Some(containers::container::Runtime {
                name: "io.containerd.runc.v2".to_string(),
                options: Some(any("containerd.runc.v1.Options", b"\x08\x01")),
            }),
            spec: Some(any("types.containerd.io/opencontainers/runtime-spec/1/Spec", b"{}")),
            snapshotter: "overlayfs".to_string(),
            snapshot_key: "nginx-snapshot".to_string(),
            created_at: Some(prost_types::Timestamp {
                seconds: 1_700_000_000,
                nanos: 5,
            }),
            updated_at: None,
            extensions: HashMap::from([(
                "io.cri-containerd.container.metadata".to_string(),
                any("x", b"meta"),
            )]),
            sandbox: "pod-1".to_string(),
        };

        let c = container_from_proto(wire);
        assert_eq!(c.runtime.options.type_url, "containerd.runc.v1.Options");
        assert_eq!(c.runtime.options.value, b"\x08\x01");
        assert_eq!(c.spec.value, b"{}");
        assert_eq!(c.snapshotter, "overlayfs");
        assert_eq!(c.snapshot_key, "nginx-snapshot");
        assert_eq!(c.created_at.unwrap().timestamp(), 1_700_000_000);
        assert!(c.updated_at.is_none());
        assert_eq!(
            c.extensions["io.cri-containerd.container.metadata"].value,
            b"meta"
        );
        assert_eq!(c.sandbox, "pod-1");
    }

    #[test]
    fn test_mount_conversion() {
        let mount = mount_from_proto(types::Mount {
            r#type: "overlay".to_string(),
            source: "overlay".to_string(),
            target: String::new(),
            options: vec!["workdir=/w".to_string(), "upperdir=/u".to_string()],
        });
        assert_eq!(mount.kind, "overlay");
        assert_eq!(mount.options, vec!["workdir=/w", "upperdir=/u"]);
    }

    #[test]
    fn test_task_status_conversion() {
        assert_eq!(task_status_from_proto(task_types::Status::Running), TaskStatus::Running);
        assert_eq!(task_status_from_proto(task_types::Status::Unknown), TaskStatus::Unknown);
        assert_eq!(task_status_from_proto(task_types::Status::Pausing), TaskStatus::Pausing);
    }

    #[test]
    fn test_invalid_timestamp_is_dropped() {
        let ts = prost_types::Timestamp {
            seconds: 0,
            nanos: -1,
        };
        assert!(timestamp_from_proto(ts).is_none());
    }
}
