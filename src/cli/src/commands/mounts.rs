//! `ctrlink mounts` command.

use clap::Args;

use super::ConnectionArgs;
use crate::output;

#[derive(Args)]
pub struct MountsArgs {
    /// Snapshotter name (e.g. overlayfs)
    pub snapshotter: String,

    /// Snapshot key, usually the container ID
    pub key: String,
}

pub async fn execute(
    args: MountsArgs,
    connection: &ConnectionArgs,
) -> Result<(), Box<dyn std::error::Error>> {
    let client = super::connect(connection).await?;
    let mounts = client
        .snapshot_mounts(&connection.context(), &args.snapshotter, &args.key)
        .await?;
    output::print_json(&mounts)
}
