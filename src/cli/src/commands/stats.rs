//! `ctrlink stats` command.

use clap::Args;

use super::ConnectionArgs;
use crate::output;

#[derive(Args)]
pub struct StatsArgs {
    /// Container ID
    pub id: String,
}

pub async fn execute(
    args: StatsArgs,
    connection: &ConnectionArgs,
) -> Result<(), Box<dyn std::error::Error>> {
    let client = super::connect(connection).await?;
    let stats = client.container_stats(&connection.context(), &args.id).await?;
    output::print_json(&stats)
}
