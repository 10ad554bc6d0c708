//! `ctrlink ps` command - List containers.

use clap::Args;

use ctrlink_core::Container;

use super::ConnectionArgs;
use crate::output;

#[derive(Args)]
pub struct PsArgs {
    /// Only display container IDs
    #[arg(short, long)]
    pub quiet: bool,

    /// Print the full records as JSON
    #[arg(long)]
    pub json: bool,

    /// containerd filter expression (e.g. image==nginx, labels."app"==web)
    #[arg(short, long = "filter")]
    pub filters: Vec<String>,
}

pub async fn execute(
    args: PsArgs,
    connection: &ConnectionArgs,
) -> Result<(), Box<dyn std::error::Error>> {
    let client = super::connect(connection).await?;
    let containers = client.list_containers(&connection.context(), &args.filters).await?;

    if args.quiet {
        for c in &containers {
            println!("{}", c.id);
        }
        return Ok(());
    }

    if args.json {
        return output::print_json(&containers);
    }

    println!("{}", render_table(&containers));
    Ok(())
}

fn render_table(containers: &[Container]) -> comfy_table::Table {
    let mut table = output::new_table(&["CONTAINER ID", "IMAGE", "RUNTIME", "CREATED"]);
    for c in containers {
        table.add_row([
            output::short_id(&c.id).to_string(),
            c.image.clone(),
            c.runtime.name.clone(),
            output::format_ago(c.created_at.as_ref()),
        ]);
    }
    table
}
