//! `ctrlink status` command.

use clap::Args;

use super::ConnectionArgs;
use crate::output;

#[derive(Args)]
pub struct StatusArgs {
    /// Container ID
    pub id: String,
}

pub async fn execute(
    args: StatusArgs,
    connection: &ConnectionArgs,
) -> Result<(), Box<dyn std::error::Error>> {
    let client = super::connect(connection).await?;
    let status = client.container_status(&connection.context(), &args.id).await?;
    output::print_json(&status)
}
