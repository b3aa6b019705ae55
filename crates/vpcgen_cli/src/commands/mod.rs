//! CLI command definitions.

use clap::{Parser, Subcommand};

pub mod generate;
pub mod plan;
pub mod validate;

/// vpcgen - network template generator
#[derive(Parser)]
#[command(name = "vpcgen")]
#[command(version, about = "vpcgen - network template generator")]
#[command(long_about = r#"
vpcgen computes a per-zone, per-tier address plan and generates a complete
network template (VPC, subnets, routing, NAT, ACLs, endpoints, subnet
groups, bastion, flow logs) from a small YAML configuration.

COMMANDS:
  plan      → Print the address plan for a block and zone list
  validate  → Resolve a configuration and report errors
  generate  → Generate the template, optionally merged into an existing one

EXIT CODES:
  0 - Success
  1 - General error
  2 - Invalid configuration
  3 - Missing external resource
  4 - Data provider error
"#)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Print the address plan
    Plan(plan::PlanArgs),

    /// Validate a configuration file
    Validate(validate::ValidateArgs),

    /// Generate a network template
    Generate(generate::GenerateArgs),
}
