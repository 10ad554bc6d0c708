//! `ctrlink version` command.

use clap::Args;

use super::ConnectionArgs;

#[derive(Args)]
pub struct VersionArgs {
    /// Only print the client version
    #[arg(long)]
    pub client: bool,
}

pub async fn execute(
    args: VersionArgs,
    connection: &ConnectionArgs,
) -> Result<(), Box<dyn std::error::Error>> {
    println!("ctrlink version {}", ctrlink_core::VERSION);
    if args.client {
        return Ok(());
    }

    let client = super::connect(connection).await?;
    let info = client.version_info(&connection.context()).await?;
    println!("containerd version {} (revision {})", info.version, info.revision);
    Ok(())
}
