//! Network ACL builders.

use serde_json::json;

use vpcgen_plan::{AddressBlock, SubnetTier};

use crate::builders::ANY_IPV4;
use crate::naming;
use crate::resource::{name_tags, reference, ResourceGraph, ResourceNode};

/// Rule number of the first entry in every ACL.
pub const FIRST_RULE_NUMBER: u32 = 100;

pub fn network_acl(tier: SubnetTier) -> ResourceGraph {
    let label = tier.label().to_lowercase();

    ResourceGraph::single(
        naming::network_acl(tier),
        ResourceNode::new("AWS::EC2::NetworkAcl").with_properties(json!({
            "VpcId": reference(naming::VPC),
            "Tags": name_tags(&[label.as_str()]),
        })),
    )
}

/// A single allow rule for all protocols from (or to) `cidr`.
pub fn network_acl_entry(tier: SubnetTier, cidr: &str, egress: bool, rule_number: u32) -> ResourceGraph {
    ResourceGraph::single(
        naming::network_acl_entry(tier, egress, rule_number),
        ResourceNode::new("AWS::EC2::NetworkAclEntry").with_properties(json!({
            "CidrBlock": cidr,
            "Egress": egress,
            "NetworkAclId": reference(naming::network_acl(tier)),
            "Protocol": -1,
            "RuleAction": "allow",
            "RuleNumber": rule_number,
        })),
    )
}

pub fn network_acl_association(tier: SubnetTier, position: usize) -> ResourceGraph {
    ResourceGraph::single(
        naming::network_acl_association(tier, position),
        ResourceNode::new("AWS::EC2::SubnetNetworkAclAssociation").with_properties(json!({
            "NetworkAclId": reference(naming::network_acl(tier)),
            "SubnetId": reference(naming::subnet(tier, position)),
        })),
    )
}

fn associations(tier: SubnetTier, zone_count: usize) -> ResourceGraph {
    (1..=zone_count).fold(ResourceGraph::new(), |graph, position| {
        graph.merge(network_acl_association(tier, position))
    })
}

/// ACL with one allow-all ingress/egress pair, associated with the tier's
/// subnet in every zone.
pub fn open_network_acl(tier: SubnetTier, zone_count: usize) -> ResourceGraph {
    network_acl(tier)
        .merge(network_acl_entry(tier, ANY_IPV4, false, FIRST_RULE_NUMBER))
        .merge(network_acl_entry(tier, ANY_IPV4, true, FIRST_RULE_NUMBER))
        .merge(associations(tier, zone_count))
}

/// Database ACL: traffic is allowed only to and from the application blocks,
/// one ingress/egress pair per block with rule numbers counting up per zone.
pub fn database_network_acl(app_blocks: &[AddressBlock]) -> ResourceGraph {
    let tier = SubnetTier::Database;

    let entries = app_blocks
        .iter()
        .zip(FIRST_RULE_NUMBER..)
        .fold(ResourceGraph::new(), |graph, (block, rule_number)| {
            let cidr = block.to_string();
            graph
                .merge(network_acl_entry(tier, &cidr, false, rule_number))
                .merge(network_acl_entry(tier, &cidr, true, rule_number))
        });

    network_acl(tier)
        .merge(entries)
        .merge(associations(tier, app_blocks.len()))
}
