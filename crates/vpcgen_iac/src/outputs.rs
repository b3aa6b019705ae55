//! Template outputs.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use vpcgen_plan::SubnetTier;

use crate::builders::bastion::{BASTION_EIP, BASTION_SSH_USER};
use crate::builders::SubnetGroupKind;
use crate::naming;
use crate::resource::{collect_references, get_att, join, reference, stack_name};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputEntry {
    #[serde(rename = "Description", default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(rename = "Value")]
    pub value: Value,

    #[serde(rename = "Export", default, skip_serializing_if = "Option::is_none")]
    pub export: Option<Value>,
}

impl OutputEntry {
    pub fn new(value: Value) -> Self {
        Self {
            description: None,
            value,
            export: None,
        }
    }

    pub fn described(description: impl Into<String>, value: Value) -> Self {
        Self {
            description: Some(description.into()),
            value,
            export: None,
        }
    }
}

/// Named outputs, ordered by name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OutputsGraph {
    entries: BTreeMap<String, OutputEntry>,
}

impl OutputsGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, entry: OutputEntry) -> Self {
        self.entries.insert(name.into(), entry);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, entry: OutputEntry) -> Option<OutputEntry> {
        self.entries.insert(name.into(), entry)
    }

    /// Union of both graphs; entries of `other` win on a name clash.
    pub fn merge(mut self, other: OutputsGraph) -> Self {
        self.entries.extend(other.entries);
        self
    }

    pub fn get(&self, name: &str) -> Option<&OutputEntry> {
        self.entries.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &OutputEntry)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Node names referenced by output values.
    pub fn references(&self) -> BTreeSet<String> {
        let mut names = BTreeSet::new();
        for entry in self.entries.values() {
            collect_references(&entry.value, &mut names);
        }
        names
    }

    /// Export every output as `<stack name>-<output name>`.
    pub fn exported(mut self) -> Self {
        for (name, entry) in self.entries.iter_mut() {
            entry.export = Some(json!({
                "Name": join("-", vec![stack_name(), json!(name)]),
            }));
        }
        self
    }
}

impl IntoIterator for OutputsGraph {
    type Item = (String, OutputEntry);
    type IntoIter = std::collections::btree_map::IntoIter<String, OutputEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

/// What the outputs describe.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OutputSelection {
    pub zone_count: usize,
    pub database_tier: bool,
    pub subnet_groups: Vec<SubnetGroupKind>,
    pub bastion: bool,
}

fn tier_subnets(tier: SubnetTier, zone_count: usize) -> OutputsGraph {
    (1..=zone_count).fold(OutputsGraph::new(), |outputs, position| {
        let name = naming::subnet(tier, position);
        outputs.with(name.clone(), OutputEntry::new(reference(name)))
    })
}

/// Outputs for a generated network.
///
/// Always exports the VPC and application security group; adds one entry per
/// subnet, per emitted subnet group, and the bastion login details.
pub fn outputs(selection: &OutputSelection) -> OutputsGraph {
    let mut outputs = OutputsGraph::new()
        .with("VPC", OutputEntry::described("VPC logical resource ID", reference(naming::VPC)))
        .with(
            "AppSecurityGroupId",
            OutputEntry::described(
                "Application security group ID",
                get_att(naming::APP_SECURITY_GROUP, "GroupId"),
            ),
        )
        .merge(tier_subnets(SubnetTier::Application, selection.zone_count))
        .merge(tier_subnets(SubnetTier::Public, selection.zone_count));

    if selection.database_tier {
        outputs = outputs.merge(tier_subnets(SubnetTier::Database, selection.zone_count));
    }

    for kind in &selection.subnet_groups {
        outputs.insert(
            kind.resource_name(),
            OutputEntry::described(kind.description(), reference(kind.resource_name())),
        );
    }

    if selection.bastion {
        outputs.insert(
            "BastionSSHUser",
            OutputEntry::described("SSH username for the bastion host", json!(BASTION_SSH_USER)),
        );
        outputs.insert(
            BASTION_EIP,
            OutputEntry::described("Public IP of the bastion host", reference(BASTION_EIP)),
        );
    }

    outputs
}
