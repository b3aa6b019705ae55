//! Validate command - Resolve a configuration and report the result.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use tracing::info;

use vpcgen_iac::{NatMode, VpcConfig, VpcOptions};

#[derive(Args)]
pub struct ValidateArgs {
    /// Configuration file (YAML)
    #[arg(short, long)]
    config: PathBuf,
}

pub async fn execute(args: ValidateArgs) -> Result<()> {
    info!("Validating configuration: {}", args.config.display());

    let config = VpcConfig::from_file(&args.config)
        .with_context(|| format!("failed to read {}", args.config.display()))?;
    let options = VpcOptions::from_config(config)?;

    println!("Configuration is valid");
    println!("{}", describe(&options));
    Ok(())
}

fn describe(options: &VpcOptions) -> String {
    let zones = match &options.zones {
        Some(zones) => zones.iter().map(|z| z.as_str()).collect::<Vec<_>>().join(", "),
        None => "discovered".to_string(),
    };
    let nat = match options.nat {
        NatMode::Disabled => "none".to_string(),
        NatMode::Gateways { requested: None } => "gateway per zone".to_string(),
        NatMode::Gateways { requested: Some(count) } => format!("{} gateway(s)", count),
        NatMode::Instance => "instance".to_string(),
    };
    let subnet_groups: Vec<&str> = options.subnet_groups.iter().map(|k| k.as_str()).collect();

    let lines = [
        format!("  region:        {}", options.region),
        format!("  stage:         {}", options.stage),
        format!("  cidr block:    {}", options.cidr_block),
        format!("  zones:         {}", zones),
        format!("  services:      {}", options.services.join(", ")),
        format!("  nat:           {}", nat),
        format!("  database tier: {}", options.db_subnet),
        format!("  network acls:  {}", options.network_acl),
        format!("  flow logs:     {}", options.flow_logs),
        format!(
            "  bastion:       {}",
            options.bastion.as_ref().map(|b| b.key_name.as_str()).unwrap_or("none")
        ),
        format!("  subnet groups: {}", subnet_groups.join(", ")),
        format!("  export:        {}", options.export_outputs),
    ];
    lines.join("\n")
}
