//! Generator configuration.
//!
//! [`VpcConfig`] is the loosely typed configuration as written by users
//! (every field optional). [`VpcOptions::from_config`] applies defaults and
//! performs every check that can be made without external data, once, before
//! any resource is built.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use vpcgen_plan::{AddressBlock, Zone, MAX_ZONES};

use crate::builders::SubnetGroupKind;
use crate::error::{IacError, IacResult};
use crate::naming;

pub const DEFAULT_REGION: &str = "us-east-1";
pub const DEFAULT_STAGE: &str = "dev";
pub const DEFAULT_CIDR_BLOCK: &str = "10.0.0.0/16";
pub const DEFAULT_BASTION_SOURCE: &str = "0.0.0.0/0";
pub const DEFAULT_SERVICES: [&str; 2] = ["s3", "dynamodb"];

/// NAT gateway setting: a switch (one per zone) or an explicit count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NatGatewaySetting {
    Enabled(bool),
    Count(u32),
}

impl Default for NatGatewaySetting {
    fn default() -> Self {
        Self::Enabled(false)
    }
}

impl NatGatewaySetting {
    fn is_requested(&self) -> bool {
        match self {
            NatGatewaySetting::Enabled(enabled) => *enabled,
            NatGatewaySetting::Count(count) => *count > 0,
        }
    }
}

/// User-facing configuration. Unknown keys are rejected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct VpcConfig {
    pub region: Option<String>,
    /// Deployment stage, used in resource tags.
    pub stage: Option<String>,
    pub cidr_block: Option<String>,
    /// Zones to use. Discovered from the region when unset or empty.
    pub zones: Option<Vec<String>>,
    /// Endpoint services. Defaults to the storage and key-value services.
    pub services: Option<Vec<String>>,
    pub nat_gateway: NatGatewaySetting,
    pub nat_instance: bool,
    pub network_acl: bool,
    pub db_subnet: bool,
    pub flow_logs: bool,
    pub bastion_host: bool,
    pub bastion_key_name: Option<String>,
    pub bastion_source_cidr: Option<String>,
    pub export_outputs: bool,
    pub subnet_groups: Option<Vec<String>>,
}

impl Default for VpcConfig {
    fn default() -> Self {
        Self {
            region: None,
            stage: None,
            cidr_block: None,
            zones: None,
            services: None,
            nat_gateway: NatGatewaySetting::default(),
            nat_instance: false,
            network_acl: false,
            db_subnet: true,
            flow_logs: false,
            bastion_host: false,
            bastion_key_name: None,
            bastion_source_cidr: None,
            export_outputs: false,
            subnet_groups: None,
        }
    }
}

impl VpcConfig {
    /// Load configuration from a YAML file.
    pub fn from_file(path: &Path) -> IacResult<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
    }

    pub fn from_yaml_str(content: &str) -> IacResult<Self> {
        Ok(serde_yaml::from_str(content)?)
    }

    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    pub fn with_cidr_block(mut self, cidr: impl Into<String>) -> Self {
        self.cidr_block = Some(cidr.into());
        self
    }

    pub fn with_zones<I, S>(mut self, zones: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.zones = Some(zones.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_services<I, S>(mut self, services: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.services = Some(services.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_nat_gateway(mut self, setting: NatGatewaySetting) -> Self {
        self.nat_gateway = setting;
        self
    }

    pub fn with_nat_instance(mut self) -> Self {
        self.nat_instance = true;
        self
    }

    pub fn with_bastion(mut self, key_name: impl Into<String>) -> Self {
        self.bastion_host = true;
        self.bastion_key_name = Some(key_name.into());
        self
    }
}

/// How the application tier reaches the internet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NatMode {
    Disabled,
    /// NAT gateways; `None` means one per zone.
    Gateways { requested: Option<usize> },
    Instance,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BastionOptions {
    pub key_name: String,
    pub source_cidr: AddressBlock,
}

/// Validated, defaulted options. Built once and read-only afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VpcOptions {
    pub region: String,
    pub stage: String,
    pub cidr_block: AddressBlock,
    /// Explicit zones; `None` when they must be discovered.
    pub zones: Option<Vec<Zone>>,
    pub services: Vec<String>,
    pub nat: NatMode,
    pub network_acl: bool,
    pub db_subnet: bool,
    pub flow_logs: bool,
    pub bastion: Option<BastionOptions>,
    pub export_outputs: bool,
    pub subnet_groups: Vec<SubnetGroupKind>,
}

impl VpcOptions {
    /// Resolve a configuration into options, failing on the first invalid or
    /// contradictory setting.
    pub fn from_config(config: VpcConfig) -> IacResult<Self> {
        let nat = resolve_nat(&config)?;

        let cidr_block = config
            .cidr_block
            .as_deref()
            .unwrap_or(DEFAULT_CIDR_BLOCK)
            .parse::<AddressBlock>()?;

        let zones = match config.zones {
            Some(zones) if !zones.is_empty() => Some(resolve_zones(zones)?),
            _ => None,
        };

        let subnet_groups = match config.subnet_groups {
            Some(kinds) => resolve_subnet_groups(&kinds)?,
            None => SubnetGroupKind::all(),
        };

        let bastion = if config.bastion_host {
            let key_name = config
                .bastion_key_name
                .filter(|k| !k.trim().is_empty())
                .ok_or_else(|| {
                    IacError::MissingResource(
                        "bastion_key_name must be provided when bastion_host is enabled".to_string(),
                    )
                })?;
            let source_cidr = config
                .bastion_source_cidr
                .as_deref()
                .unwrap_or(DEFAULT_BASTION_SOURCE)
                .parse::<AddressBlock>()?;
            Some(BastionOptions { key_name, source_cidr })
        } else {
            None
        };

        let services = match config.services {
            Some(services) => normalize_services(services)?,
            None => DEFAULT_SERVICES.iter().map(|s| s.to_string()).collect(),
        };

        let options = Self {
            region: config.region.unwrap_or_else(|| DEFAULT_REGION.to_string()),
            stage: config.stage.unwrap_or_else(|| DEFAULT_STAGE.to_string()),
            cidr_block,
            zones,
            services,
            nat,
            network_acl: config.network_acl,
            db_subnet: config.db_subnet,
            flow_logs: config.flow_logs,
            bastion,
            export_outputs: config.export_outputs,
            subnet_groups,
        };

        debug!("Resolved options: {:?}", options);
        Ok(options)
    }
}

fn resolve_nat(config: &VpcConfig) -> IacResult<NatMode> {
    let gateways = config.nat_gateway.is_requested();

    if gateways && config.nat_instance {
        return Err(IacError::Configuration(
            "choose either nat_gateway or nat_instance, not both".to_string(),
        ));
    }

    Ok(match config.nat_gateway {
        _ if config.nat_instance => NatMode::Instance,
        NatGatewaySetting::Enabled(true) => NatMode::Gateways { requested: None },
        NatGatewaySetting::Count(count) if count > 0 => NatMode::Gateways {
            requested: Some(count as usize),
        },
        _ => NatMode::Disabled,
    })
}

fn resolve_zones(names: Vec<String>) -> IacResult<Vec<Zone>> {
    if names.len() > MAX_ZONES {
        return Err(IacError::Configuration(format!(
            "{} zones requested, at most {} are supported",
            names.len(),
            MAX_ZONES
        )));
    }

    let mut seen = HashSet::new();
    names
        .into_iter()
        .map(|name| {
            let name = name.trim().to_string();
            if name.is_empty() {
                return Err(IacError::Configuration("zone names cannot be empty".to_string()));
            }
            if !seen.insert(name.clone()) {
                return Err(IacError::Configuration(format!("duplicate zone '{}'", name)));
            }
            Ok(Zone::new(name))
        })
        .collect()
}

fn resolve_subnet_groups(kinds: &[String]) -> IacResult<Vec<SubnetGroupKind>> {
    let mut resolved = Vec::new();
    let mut invalid = Vec::new();

    for kind in kinds {
        match kind.parse::<SubnetGroupKind>() {
            Ok(kind) if !resolved.contains(&kind) => resolved.push(kind),
            Ok(_) => {}
            Err(_) => invalid.push(kind.clone()),
        }
    }

    if !invalid.is_empty() {
        let valid: Vec<&str> = SubnetGroupKind::all().iter().map(|k| k.as_str()).collect();
        return Err(IacError::Configuration(format!(
            "invalid subnet_groups: {}. Valid options: {}",
            invalid.join(", "),
            valid.join(", ")
        )));
    }

    Ok(resolved)
}

/// Trim and deduplicate services, keeping order. Two distinct services
/// whose endpoint names coincide are rejected.
fn normalize_services(services: Vec<String>) -> IacResult<Vec<String>> {
    let mut seen = HashSet::new();
    let services: Vec<String> = services
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty() && seen.insert(s.clone()))
        .collect();

    let mut names: HashMap<String, String> = HashMap::new();
    for service in services.iter() {
        if let Some(other) = names.insert(naming::vpc_endpoint(service), service.clone()) {
            return Err(IacError::Configuration(format!(
                "services '{}' and '{}' map to the same endpoint {}",
                other,
                service,
                naming::vpc_endpoint(service)
            )));
        }
    }

    Ok(services)
}
