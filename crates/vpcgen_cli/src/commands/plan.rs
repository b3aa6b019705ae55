//! Plan command - Print the address plan.

use anyhow::Result;
use clap::Args;
use tracing::info;

use vpcgen_plan::{plan, AddressBlock, AddressPlan, SubnetTier, Zone};

#[derive(Args)]
pub struct PlanArgs {
    /// Root address block
    #[arg(short, long, default_value = "10.0.0.0/16")]
    cidr: String,

    /// Comma-separated zones, in order
    #[arg(short, long, value_delimiter = ',', required = true)]
    zones: Vec<String>,

    /// Print the plan as JSON
    #[arg(long)]
    json: bool,
}

pub async fn execute(args: PlanArgs) -> Result<()> {
    let root: AddressBlock = args.cidr.parse()?;
    let zones: Vec<Zone> = args.zones.iter().map(|z| Zone::new(z.trim())).collect();

    info!("Planning {} zones inside {}", zones.len(), root);
    let plan = plan(root, &zones)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&plan)?);
    } else {
        print!("{}", render(&plan));
    }

    Ok(())
}

fn render(plan: &AddressPlan) -> String {
    let mut out = String::new();
    if let Some(root) = plan.root() {
        out.push_str(&format!("Root block: {}\n\n", root));
    }
    out.push_str(&format!(
        "{:<4} {:<16} {:<18} {:<18} {:<18} {:<18}\n",
        "#", "ZONE", "BLOCK", "APP", "PUBLIC", "DB"
    ));
    for allocation in plan.allocations() {
        out.push_str(&format!(
            "{:<4} {:<16} {:<18} {:<18} {:<18} {:<18}\n",
            allocation.position,
            allocation.zone.as_str(),
            allocation.block.to_string(),
            allocation.tier(SubnetTier::Application).to_string(),
            allocation.tier(SubnetTier::Public).to_string(),
            allocation.tier(SubnetTier::Database).to_string(),
        ));
    }
    out
}
