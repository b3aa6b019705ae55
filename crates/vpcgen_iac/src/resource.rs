//! Resource nodes and the resource graph.
//!
//! Nodes are serialized in the provisioning engine's template shape:
//!
//! ```json
//! { "Type": "AWS::EC2::Route", "DependsOn": ["InternetGatewayAttachment"], "Properties": { ... } }
//! ```
//!
//! Cross-references between nodes are plain names embedded in property
//! values as `{"Ref": name}` or `{"Fn::GetAtt": [name, attribute]}`. The
//! engine resolves them by name, so they stay strings here as well.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{json, Map, Value};

/// Prefix of engine-provided pseudo parameters such as `AWS::StackName`.
const PSEUDO_PARAMETER_PREFIX: &str = "AWS::";

/// A single named resource definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceNode {
    #[serde(rename = "Type")]
    pub resource_type: String,

    #[serde(rename = "DeletionPolicy", default, skip_serializing_if = "Option::is_none")]
    pub deletion_policy: Option<String>,

    /// Nodes that must exist before this one.
    #[serde(
        rename = "DependsOn",
        default,
        deserialize_with = "string_or_list",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub depends_on: Vec<String>,

    #[serde(rename = "Properties", default, skip_serializing_if = "Map::is_empty")]
    pub properties: Map<String, Value>,
}

impl ResourceNode {
    pub fn new(resource_type: impl Into<String>) -> Self {
        Self {
            resource_type: resource_type.into(),
            deletion_policy: None,
            depends_on: Vec::new(),
            properties: Map::new(),
        }
    }

    /// Set a single property.
    pub fn property(mut self, key: impl Into<String>, value: Value) -> Self {
        self.properties.insert(key.into(), value);
        self
    }

    /// Merge every key of a JSON object into the property bag.
    ///
    /// Non-object values carry no keys and leave the node unchanged.
    pub fn with_properties(mut self, properties: Value) -> Self {
        if let Value::Object(map) = properties {
            self.properties.extend(map);
        }
        self
    }

    pub fn depends_on(mut self, name: impl Into<String>) -> Self {
        self.depends_on.push(name.into());
        self
    }

    pub fn deletion_policy(mut self, policy: impl Into<String>) -> Self {
        self.deletion_policy = Some(policy.into());
        self
    }

    /// Names of every node this node refers to, including its predecessors.
    pub fn references(&self) -> BTreeSet<String> {
        let mut names: BTreeSet<String> = self.depends_on.iter().cloned().collect();
        for value in self.properties.values() {
            collect_references(value, &mut names);
        }
        names
    }
}

fn string_or_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
    }

    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::One(name) => vec![name],
        OneOrMany::Many(names) => names,
    })
}

/// `{"Ref": name}`
pub fn reference(name: impl Into<String>) -> Value {
    json!({ "Ref": name.into() })
}

/// `{"Fn::GetAtt": [name, attribute]}`
pub fn get_att(name: impl Into<String>, attribute: impl Into<String>) -> Value {
    json!({ "Fn::GetAtt": [name.into(), attribute.into()] })
}

/// `{"Fn::Join": [delimiter, parts]}`
pub fn join(delimiter: &str, parts: Vec<Value>) -> Value {
    json!({ "Fn::Join": [delimiter, parts] })
}

/// Reference to the stack name supplied by the engine at deploy time.
pub fn stack_name() -> Value {
    reference("AWS::StackName")
}

/// Tag list with a single `Name` tag: the stack name joined with `suffix`.
pub fn name_tags(suffix: &[&str]) -> Value {
    let mut parts = vec![stack_name()];
    parts.extend(suffix.iter().map(|s| Value::String((*s).to_string())));
    json!([{ "Key": "Name", "Value": join("-", parts) }])
}

/// Walk a property value and record every node name it references.
pub fn collect_references(value: &Value, names: &mut BTreeSet<String>) {
    match value {
        Value::Object(map) => {
            if let Some(Value::String(target)) = map.get("Ref") {
                if !target.starts_with(PSEUDO_PARAMETER_PREFIX) {
                    names.insert(target.clone());
                }
            }
            if let Some(Value::Array(args)) = map.get("Fn::GetAtt") {
                if let Some(Value::String(target)) = args.first() {
                    names.insert(target.clone());
                }
            }
            for nested in map.values() {
                collect_references(nested, names);
            }
        }
        Value::Array(items) => {
            for item in items {
                collect_references(item, names);
            }
        }
        _ => {}
    }
}

/// A reference that points at a name no node in the graph carries.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct DanglingReference {
    pub from: String,
    pub to: String,
}

/// Named resource definitions for one run, keyed by unique name.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceGraph {
    nodes: BTreeMap<String, ResourceNode>,
}

impl ResourceGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Graph holding exactly one node.
    pub fn single(name: impl Into<String>, node: ResourceNode) -> Self {
        Self::new().with(name, node)
    }

    pub fn with(mut self, name: impl Into<String>, node: ResourceNode) -> Self {
        self.nodes.insert(name.into(), node);
        self
    }

    /// Insert a node, returning the one it replaced.
    pub fn insert(&mut self, name: impl Into<String>, node: ResourceNode) -> Option<ResourceNode> {
        self.nodes.insert(name.into(), node)
    }

    /// Combine two graphs. Nodes in `other` win on name collisions.
    pub fn merge(mut self, other: ResourceGraph) -> Self {
        self.nodes.extend(other.nodes);
        self
    }

    pub fn get(&self, name: &str) -> Option<&ResourceNode> {
        self.nodes.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.nodes.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.nodes.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ResourceNode)> {
        self.nodes.iter().map(|(name, node)| (name.as_str(), node))
    }

    /// Names of nodes with the given resource type, in name order.
    pub fn names_of_type<'a>(&'a self, resource_type: &'a str) -> impl Iterator<Item = &'a str> {
        self.iter()
            .filter(move |(_, node)| node.resource_type == resource_type)
            .map(|(name, _)| name)
    }

    /// Names referenced by the node called `name`.
    pub fn references_of(&self, name: &str) -> Option<BTreeSet<String>> {
        self.nodes.get(name).map(ResourceNode::references)
    }

    /// Node count per resource type.
    pub fn count_by_type(&self) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        for node in self.nodes.values() {
            *counts.entry(node.resource_type.clone()).or_insert(0) += 1;
        }
        counts
    }

    /// Every reference that does not resolve to a node in this graph.
    pub fn dangling_references(&self) -> Vec<DanglingReference> {
        self.nodes
            .iter()
            .flat_map(|(from, node)| {
                node.references()
                    .into_iter()
                    .filter(|to| !self.nodes.contains_key(to))
                    .map(move |to| DanglingReference {
                        from: from.clone(),
                        to,
                    })
            })
            .collect()
    }
}

impl IntoIterator for ResourceGraph {
    type Item = (String, ResourceNode);
    type IntoIter = std::collections::btree_map::IntoIter<String, ResourceNode>;

    fn into_iter(self) -> Self::IntoIter {
        self.nodes.into_iter()
    }
}
