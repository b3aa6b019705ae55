//! Generate command - Produce the network template.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use tracing::{info, warn};

use vpcgen_iac::{
    DataProviders, IacError, NetworkAttachments, StaticInventory, Template, VpcConfig, VpcGenerator,
    VpcOptions,
};

#[derive(Args)]
pub struct GenerateArgs {
    /// Configuration file (YAML)
    #[arg(short, long)]
    config: PathBuf,

    /// Inventory of zones, images, and endpoint services (YAML).
    /// Without it, zones must be configured and services are assumed offered.
    #[arg(short, long)]
    inventory: Option<PathBuf>,

    /// Existing template (JSON) to merge the generated resources into
    #[arg(short, long)]
    template: Option<PathBuf>,

    /// Output file. Defaults to stdout.
    #[arg(short, long)]
    output: Option<PathBuf>,
}

pub async fn execute(args: GenerateArgs) -> Result<()> {
    let config = VpcConfig::from_file(&args.config)
        .with_context(|| format!("failed to read {}", args.config.display()))?;
    let options = VpcOptions::from_config(config)?;

    let inventory = match &args.inventory {
        Some(path) => StaticInventory::from_file(path)
            .with_context(|| format!("failed to read inventory {}", path.display()))?,
        None => offline_inventory(&options)?,
    };

    let generator = VpcGenerator::new(DataProviders::from_single(Arc::new(inventory)));
    let assembly = generator.generate_with(&options).await?;

    let mut template = match &args.template {
        Some(path) => Template::from_file(path)
            .with_context(|| format!("failed to read template {}", path.display()))?,
        None => Template::new(),
    };
    let mut attachments = NetworkAttachments::default();
    let replaced = assembly.merge_into(&mut template, &mut attachments);

    let json = template.to_json_pretty()?;
    match &args.output {
        Some(path) => {
            fs::write(path, format!("{}\n", json))
                .with_context(|| format!("failed to write {}", path.display()))?;
            info!("Template written to {}", path.display());
        }
        None => println!("{}", json),
    }

    for warning in assembly.warnings.iter() {
        eprintln!("warning: {}", warning);
    }
    for name in replaced.iter() {
        eprintln!("warning: replaced existing {}", name);
    }

    eprintln!("Generated {} resources, {} outputs", assembly.resources.len(), assembly.outputs.len());
    for (resource_type, count) in assembly.resources.count_by_type() {
        eprintln!("  {:<40} {}", resource_type, count);
    }
    eprintln!("Attachments: {}", serde_json::to_string(&attachments)?);

    Ok(())
}

/// Inventory built from the configuration alone: the configured zones, and
/// every requested service reported as offered. Images are never available.
fn offline_inventory(options: &VpcOptions) -> Result<StaticInventory> {
    let zones = options.zones.as_ref().ok_or_else(|| {
        IacError::Configuration("zones must be configured when no inventory is given".to_string())
    })?;

    warn!("No inventory given, assuming requested services are offered in {}", options.region);

    Ok(StaticInventory::new()
        .with_zones(&options.region, zones.iter().map(|z| z.as_str().to_string()))
        .with_services(&options.region, options.services.iter()))
}
