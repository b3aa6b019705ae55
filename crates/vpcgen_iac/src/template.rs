//! Caller-owned templates and merging generated graphs into them.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::warn;

use crate::assembler::{Assembly, NetworkAttachments};
use crate::error::IacResult;
use crate::outputs::OutputsGraph;
use crate::resource::ResourceGraph;

pub const FORMAT_VERSION: &str = "2010-09-09";

/// A template document. Sections other than resources and outputs are kept
/// untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Template {
    #[serde(rename = "AWSTemplateFormatVersion", default, skip_serializing_if = "Option::is_none")]
    pub format_version: Option<String>,

    #[serde(rename = "Description", default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(rename = "Resources", default)]
    pub resources: ResourceGraph,

    #[serde(rename = "Outputs", default, skip_serializing_if = "OutputsGraph::is_empty")]
    pub outputs: OutputsGraph,

    #[serde(flatten)]
    pub other: Map<String, Value>,
}

impl Template {
    pub fn new() -> Self {
        Self {
            format_version: Some(FORMAT_VERSION.to_string()),
            ..Self::default()
        }
    }

    pub fn from_file(path: &Path) -> IacResult<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    pub fn from_json_str(content: &str) -> IacResult<Self> {
        Ok(serde_json::from_str(content)?)
    }

    pub fn to_json_pretty(&self) -> IacResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Resource counts by type, for reporting.
    pub fn summary(&self) -> BTreeMap<String, usize> {
        self.resources.count_by_type()
    }
}

impl Assembly {
    /// Merge this run into caller-owned collections.
    ///
    /// Generated resources and outputs replace caller entries of the same
    /// name; each replacement is logged and returned. Attachment references
    /// already present are not duplicated.
    pub fn merge_into(&self, template: &mut Template, attachments: &mut NetworkAttachments) -> Vec<String> {
        let mut replaced = Vec::new();

        for (name, node) in self.resources.iter() {
            if template.resources.insert(name, node.clone()).is_some() {
                warn!("Generated resource {} replaces an existing resource", name);
                replaced.push(name.to_string());
            }
        }

        for (name, entry) in self.outputs.iter() {
            if template.outputs.insert(name, entry.clone()).is_some() {
                warn!("Generated output {} replaces an existing output", name);
                replaced.push(name.to_string());
            }
        }

        attachments.extend(&self.attachments);
        replaced
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::outputs::OutputEntry;
    use crate::resource::{reference, ResourceNode};
    use serde_json::json;

    fn assembly() -> Assembly {
        Assembly {
            resources: ResourceGraph::single("VPC", ResourceNode::new("AWS::EC2::VPC"))
                .with("AppSubnet1", ResourceNode::new("AWS::EC2::Subnet")),
            outputs: OutputsGraph::new().with("VPC", OutputEntry::new(reference("VPC"))),
            attachments: NetworkAttachments {
                security_group_ids: vec![reference("AppSecurityGroup")],
                subnet_ids: vec![reference("AppSubnet1")],
            },
            ..Assembly::default()
        }
    }

    #[test]
    fn test_merge_into_keeps_caller_entries() {
        let mut template = Template::new();
        template
            .resources
            .insert("Function", ResourceNode::new("AWS::Lambda::Function"));
        let mut attachments = NetworkAttachments {
            security_group_ids: vec![json!("sg-0123")],
            subnet_ids: Vec::new(),
        };

        let replaced = assembly().merge_into(&mut template, &mut attachments);
        assert!(replaced.is_empty());
        assert_eq!(template.resources.len(), 3);
        assert!(template.resources.contains("Function"));
        assert_eq!(
            attachments.security_group_ids,
            vec![json!("sg-0123"), reference("AppSecurityGroup")]
        );
        assert_eq!(attachments.subnet_ids, vec![reference("AppSubnet1")]);
    }

    #[test]
    fn test_merge_into_reports_replacements() {
        let mut template = Template::new();
        template.resources.insert("VPC", ResourceNode::new("Custom::Old"));
        let mut attachments = NetworkAttachments::default();

        let replaced = assembly().merge_into(&mut template, &mut attachments);
        assert_eq!(replaced, vec!["VPC".to_string()]);
        assert_eq!(template.resources.get("VPC").unwrap().resource_type, "AWS::EC2::VPC");

        // Merging twice is stable for attachments.
        assembly().merge_into(&mut template, &mut attachments);
        assert_eq!(attachments.subnet_ids.len(), 1);
    }

    #[test]
    fn test_unknown_sections_survive_round_trip() {
        let source = json!({
            "AWSTemplateFormatVersion": "2010-09-09",
            "Parameters": { "Stage": { "Type": "String" } },
            "Resources": {
                "Queue": { "Type": "AWS::SQS::Queue", "Properties": { "DelaySeconds": 5 } }
            }
        });
        let template = Template::from_json_str(&source.to_string()).unwrap();
        assert!(template.other.contains_key("Parameters"));
        assert_eq!(serde_json::to_value(&template).unwrap(), source);
    }

    #[test]
    fn test_summary_counts_types() {
        let mut template = Template::new();
        let mut attachments = NetworkAttachments::default();
        assembly().merge_into(&mut template, &mut attachments);
        let summary = template.summary();
        assert_eq!(summary.get("AWS::EC2::VPC"), Some(&1));
        assert_eq!(summary.get("AWS::EC2::Subnet"), Some(&1));
    }
}
