//! `ctrlink pid` command.

use clap::Args;

use super::ConnectionArgs;

#[derive(Args)]
pub struct PidArgs {
    /// Container ID
    pub id: String,
}

pub async fn execute(
    args: PidArgs,
    connection: &ConnectionArgs,
) -> Result<(), Box<dyn std::error::Error>> {
    let client = super::connect(connection).await?;
    let pid = client.task_pid(&connection.context(), &args.id).await?;
    println!("{pid}");
    Ok(())
}
