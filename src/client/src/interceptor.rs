//! Namespace scoping for outgoing calls.
//!
//! containerd resolves every request against the namespace carried in the
//! `containerd-namespace` metadata entry. The interceptor is installed on
//! each service client built over the shared channel; tonic runs it for
//! unary and streaming calls alike, before the request leaves the process.
//! Responses, errors and stream items are never touched.

use tonic::metadata::{Ascii, MetadataMap, MetadataValue};
use tonic::service::Interceptor;
use tonic::{GrpcMethod, Request, Status};

use ctrlink_core::ConnectError;

/// Metadata key containerd reads the namespace from.
pub const NAMESPACE_HEADER: &str = "containerd-namespace";

/// Server-streaming methods reachable through the shared channel.
const STREAMING_METHODS: &[(&str, &str)] =
    &[("containerd.services.containers.v1.Containers", "ListStream")];

/// Hook run on the metadata of every outgoing call.
///
/// Unary and streaming calls get separate entry points so a wrapper can
/// treat them differently; a wrapper must not fail a call it does not
/// understand.
pub trait CallWrapper: Send + Sync {
    fn wrap_unary(&self, metadata: &mut MetadataMap) -> Result<(), Status>;

    fn wrap_streaming(&self, metadata: &mut MetadataMap) -> Result<(), Status>;
}

/// Route a request to the matching [`CallWrapper`] entry point.
pub fn wrap<W: CallWrapper + ?Sized>(wrapper: &W, request: &mut Request<()>) -> Result<(), Status> {
    let streaming = request
        .extensions()
        .get::<GrpcMethod>()
        .map(|m| STREAMING_METHODS.contains(&(m.service(), m.method())))
        .unwrap_or(false);

    if streaming {
        wrapper.wrap_streaming(request.metadata_mut())
    } else {
        wrapper.wrap_unary(request.metadata_mut())
    }
}

/// Attaches a fixed namespace to every call passing through a client.
///
/// A request that already names a namespace keeps it; the configured one
/// only fills the gap.
#[derive(Debug, Clone)]
pub struct NamespaceInterceptor {
    namespace: String,
    value: MetadataValue<Ascii>,
}

impl NamespaceInterceptor {
    pub fn new(namespace: &str) -> Result<Self, ConnectError> {
        let value = MetadataValue::try_from(namespace).map_err(|e| ConnectError::InvalidNamespace {
            namespace: namespace.to_string(),
            message: e.to_string(),
        })?;

        Ok(Self {
            namespace: namespace.to_string(),
            value,
        })
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Tag call metadata with the namespace unless one is already present.
    pub fn tag(&self, metadata: &mut MetadataMap) {
        if !metadata.contains_key(NAMESPACE_HEADER) {
            metadata.insert(NAMESPACE_HEADER, self.value.clone());
        }
    }
}

impl CallWrapper for NamespaceInterceptor {
    fn wrap_unary(&self, metadata: &mut MetadataMap) -> Result<(), Status> {
        self.tag(metadata);
        Ok(())
    }

    fn wrap_streaming(&self, metadata: &mut MetadataMap) -> Result<(), Status> {
        self.tag(metadata);
        Ok(())
    }
}

impl Interceptor for NamespaceInterceptor {
    fn call(&mut self, mut request: Request<()>) -> Result<Request<()>, Status> {
        wrap(self, &mut request)?;
        Ok(request)
    }
}

/// Namespace named by a request's metadata, if any.
pub fn namespace_of(metadata: &MetadataMap) -> Option<&str> {
    metadata
        .get(NAMESPACE_HEADER)
        .and_then(|value| value.to_str().ok())
}
