//! Managed data-service subnet groups.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use vpcgen_plan::SubnetTier;

use crate::error::IacError;
use crate::naming;
use crate::resource::{reference, stack_name, ResourceGraph, ResourceNode};

/// Minimum number of zones the managed services accept in a subnet group.
pub const MIN_ZONES: usize = 2;

/// Subnet group kinds. This is the full allow-list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubnetGroupKind {
    /// Relational database service.
    Rds,
    /// Data warehouse.
    Redshift,
    /// In-memory cache.
    Elasticache,
    /// Accelerator cache for the key-value store.
    Dax,
}

impl SubnetGroupKind {
    pub fn all() -> Vec<Self> {
        vec![
            SubnetGroupKind::Rds,
            SubnetGroupKind::Redshift,
            SubnetGroupKind::Elasticache,
            SubnetGroupKind::Dax,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SubnetGroupKind::Rds => "rds",
            SubnetGroupKind::Redshift => "redshift",
            SubnetGroupKind::Elasticache => "elasticache",
            SubnetGroupKind::Dax => "dax",
        }
    }

    /// Name of the node (and output) for this kind.
    pub fn resource_name(&self) -> &'static str {
        match self {
            SubnetGroupKind::Rds => "RDSSubnetGroup",
            SubnetGroupKind::Redshift => "RedshiftSubnetGroup",
            SubnetGroupKind::Elasticache => "ElastiCacheSubnetGroup",
            SubnetGroupKind::Dax => "DAXSubnetGroup",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            SubnetGroupKind::Rds => "RDS Subnet Group",
            SubnetGroupKind::Redshift => "Redshift Subnet Group",
            SubnetGroupKind::Elasticache => "ElastiCache Subnet Group",
            SubnetGroupKind::Dax => "DAX Subnet Group",
        }
    }

    fn resource_type(&self) -> &'static str {
        match self {
            SubnetGroupKind::Rds => "AWS::RDS::DBSubnetGroup",
            SubnetGroupKind::Redshift => "AWS::Redshift::ClusterSubnetGroup",
            SubnetGroupKind::Elasticache => "AWS::ElastiCache::SubnetGroup",
            SubnetGroupKind::Dax => "AWS::DAX::SubnetGroup",
        }
    }

    fn properties(&self, subnet_ids: Value) -> Value {
        match self {
            SubnetGroupKind::Rds => json!({
                "DBSubnetGroupName": stack_name(),
                "DBSubnetGroupDescription": stack_name(),
                "SubnetIds": subnet_ids,
            }),
            SubnetGroupKind::Redshift => json!({
                "Description": stack_name(),
                "SubnetIds": subnet_ids,
            }),
            SubnetGroupKind::Elasticache => json!({
                "CacheSubnetGroupName": stack_name(),
                "Description": stack_name(),
                "SubnetIds": subnet_ids,
            }),
            SubnetGroupKind::Dax => json!({
                "SubnetGroupName": stack_name(),
                "Description": stack_name(),
                "SubnetIds": subnet_ids,
            }),
        }
    }
}

impl fmt::Display for SubnetGroupKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SubnetGroupKind {
    type Err = IacError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "rds" => Ok(SubnetGroupKind::Rds),
            "redshift" => Ok(SubnetGroupKind::Redshift),
            "elasticache" => Ok(SubnetGroupKind::Elasticache),
            "dax" => Ok(SubnetGroupKind::Dax),
            other => Err(IacError::Configuration(format!(
                "invalid subnet group kind '{}'",
                other
            ))),
        }
    }
}

/// Subnet group collecting the database subnet of every zone, in zone order.
///
/// Empty when fewer than [`MIN_ZONES`] zones exist.
pub fn subnet_group(kind: SubnetGroupKind, zone_count: usize) -> ResourceGraph {
    if zone_count < MIN_ZONES {
        return ResourceGraph::new();
    }

    let subnet_ids = Value::Array(
        (1..=zone_count)
            .map(|position| reference(naming::subnet(SubnetTier::Database, position)))
            .collect(),
    );

    ResourceGraph::single(
        kind.resource_name(),
        ResourceNode::new(kind.resource_type()).with_properties(kind.properties(subnet_ids)),
    )
}
