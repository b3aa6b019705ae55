//! # vpcgen_iac
//!
//! Network template generation for vpcgen.
//!
//! This crate turns a small YAML configuration into a complete graph of
//! declarative network resources (VPC, subnets, routing, NAT, ACLs,
//! endpoints, subnet groups, bastion, flow logs) for a provisioning engine
//! to create.
//!
//! ## Features
//!
//! - Validated options with fail-fast checks
//! - Pluggable zone, image, and endpoint-service providers
//! - Pure, name-addressed resource builders
//! - Assembly with referential completeness and advisory warnings
//! - Merging into existing templates
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use vpcgen_iac::{DataProviders, StaticInventory, VpcConfig, VpcGenerator};
//!
//! # async fn run() -> vpcgen_iac::IacResult<()> {
//! let inventory = StaticInventory::new()
//!     .with_zones("us-east-1", ["us-east-1a", "us-east-1b"])
//!     .with_services("us-east-1", ["s3", "dynamodb"]);
//!
//! let generator = VpcGenerator::new(DataProviders::from_single(Arc::new(inventory)));
//! let assembly = generator.generate(VpcConfig::default()).await?;
//!
//! assert!(assembly.resources.contains("AppSubnet2"));
//! # Ok(())
//! # }
//! ```

pub mod assembler;
pub mod builders;
pub mod error;
pub mod generator;
pub mod inventory;
pub mod naming;
pub mod options;
pub mod outputs;
pub mod provider;
pub mod resource;
pub mod template;

pub use assembler::{assemble, Assembly, NetworkAttachments, ELASTIC_ADDRESS_SOFT_LIMIT};
pub use error::{IacError, IacResult};
pub use generator::VpcGenerator;
pub use inventory::{InventoryData, LookupCall, StaticInventory, ZoneState};
pub use options::{BastionOptions, NatGatewaySetting, NatMode, VpcConfig, VpcOptions};
pub use outputs::{OutputEntry, OutputSelection, OutputsGraph};
pub use provider::{
    DataProviders, ExternalData, ImageProvider, MachineImage, ServiceCatalog, ZoneProvider,
    BASTION_IMAGE_PATTERN, NAT_IMAGE_PATTERN,
};
pub use resource::{DanglingReference, ResourceGraph, ResourceNode};
pub use template::Template;
