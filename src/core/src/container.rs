//! Domain records produced from containerd responses.
//!
//! Every field is concrete: an attribute the runtime left unset is carried
//! as its zero value, never as an absent marker.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An opaque, type-tagged payload (a `google.protobuf.Any` on the wire).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnyBlob {
    /// Type URL identifying the payload schema
    pub type_url: String,
    /// Encoded payload
    #[serde(with = "base64_bytes")]
    pub value: Vec<u8>,
}

impl AnyBlob {
    pub fn is_empty(&self) -> bool {
        self.type_url.is_empty() && self.value.is_empty()
    }
}

/// Runtime selected for a container.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuntimeInfo {
    /// Runtime name, e.g. `io.containerd.runc.v2`
    pub name: String,
    /// Runtime specific options
    pub options: AnyBlob,
}

/// A container as recorded by containerd's metadata store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Container {
    /// Unique container identifier within its namespace.
    pub id: String,
    /// Container labels.
    pub labels: HashMap<String, String>,
    /// Image reference used to create this container.
    pub image: String,
    /// Runtime the container's task is executed with.
    pub runtime: RuntimeInfo,
    /// OCI runtime spec.
    pub spec: AnyBlob,
    /// Snapshotter holding the root filesystem.
    pub snapshotter: String,
    /// Key of the root filesystem snapshot.
    pub snapshot_key: String,
    /// Creation time (`None` if the runtime did not report one).
    pub created_at: Option<DateTime<Utc>>,
    /// Last update time.
    pub updated_at: Option<DateTime<Utc>>,
    /// Client-defined extensions.
    pub extensions: HashMap<String, AnyBlob>,
    /// Sandbox the container belongs to (empty outside a pod).
    pub sandbox: String,
}

/// A filesystem mount backing a snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mount {
    /// Mount type, e.g. `overlay` or `bind`
    #[serde(rename = "type")]
    pub kind: String,
    pub source: String,
    pub target: String,
    pub options: Vec<String>,
}

/// Process status reported for a task.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    #[default]
    Unknown,
    Created,
    Running,
    Stopped,
    Paused,
    Pausing,
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Unknown => "unknown",
            Self::Created => "created",
            Self::Running => "running",
            Self::Stopped => "stopped",
            Self::Paused => "paused",
            Self::Pausing => "pausing",
        };
        f.write_str(s)
    }
}

/// Daemon version as reported by the version service.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionInfo {
    pub version: String,
    pub revision: String,
}

mod base64_bytes {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD.decode(encoded).map_err(serde::de::Error::custom)
    }
}
