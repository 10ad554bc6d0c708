//! `ctrlink container` command.

use clap::Args;

use super::ConnectionArgs;
use crate::output;

#[derive(Args)]
pub struct ContainerArgs {
    /// Container ID
    pub id: String,
}

pub async fn execute(
    args: ContainerArgs,
    connection: &ConnectionArgs,
) -> Result<(), Box<dyn std::error::Error>> {
    let client = super::connect(connection).await?;
    let container = client.load_container(&connection.context(), &args.id).await?;
    output::print_json(&container)
}
