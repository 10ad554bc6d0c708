//! Build script for ctrlink-client
//!
//! Compiles the containerd and CRI proto contracts. Servers are generated
//! too so the integration tests can stand up an in-process daemon.

const PROTOS: &[&str] = &[
    "proto/containerd/types/mount.proto",
    "proto/containerd/types/task/task.proto",
    "proto/containerd/services/containers/v1/containers.proto",
    "proto/containerd/services/tasks/v1/tasks.proto",
    "proto/containerd/services/version/v1/version.proto",
    "proto/containerd/services/snapshots/v1/snapshots.proto",
    "proto/cri/v1alpha2/api.proto",
];

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tonic_build::configure()
        .build_server(true)
        .build_client(true)
        // CRI records are printed as JSON by the CLI
        .type_attribute(".runtime.v1alpha2", "#[derive(serde::Serialize)]")
        .compile(PROTOS, &["proto"])?;

    println!("cargo:rerun-if-changed=proto");

    Ok(())
}
