//! Core network builders: VPC, internet gateway, subnets, routing, NAT gateways.

use serde_json::json;

use vpcgen_plan::{AddressBlock, SubnetTier, Zone};

use crate::builders::ANY_IPV4;
use crate::error::{IacError, IacResult};
use crate::naming;
use crate::resource::{get_att, name_tags, reference, ResourceGraph, ResourceNode};

/// Root network node.
pub fn vpc(stage: &str, block: AddressBlock) -> ResourceGraph {
    ResourceGraph::single(
        naming::VPC,
        ResourceNode::new("AWS::EC2::VPC").with_properties(json!({
            "CidrBlock": block.to_string(),
            "EnableDnsSupport": true,
            "EnableDnsHostnames": true,
            "InstanceTenancy": "default",
            "Tags": name_tags(&[stage]),
        })),
    )
}

/// Internet gateway plus its attachment to the VPC.
pub fn internet_gateway(stage: &str) -> ResourceGraph {
    ResourceGraph::single(
        naming::INTERNET_GATEWAY,
        ResourceNode::new("AWS::EC2::InternetGateway").property("Tags", name_tags(&[stage])),
    )
    .with(
        naming::INTERNET_GATEWAY_ATTACHMENT,
        ResourceNode::new("AWS::EC2::VPCGatewayAttachment").with_properties(json!({
            "InternetGatewayId": reference(naming::INTERNET_GATEWAY),
            "VpcId": reference(naming::VPC),
        })),
    )
}

pub fn subnet(tier: SubnetTier, position: usize, zone: &Zone, block: AddressBlock) -> ResourceGraph {
    let label = tier.label().to_lowercase();
    let network = if tier.is_public() { "Public" } else { "Private" };
    let name_tag = name_tags(&[label.as_str(), zone.as_str()])[0].clone();

    ResourceGraph::single(
        naming::subnet(tier, position),
        ResourceNode::new("AWS::EC2::Subnet").with_properties(json!({
            "AvailabilityZone": zone.as_str(),
            "CidrBlock": block.to_string(),
            "Tags": [name_tag, { "Key": "Network", "Value": network }],
            "VpcId": reference(naming::VPC),
        })),
    )
}

pub fn route_table(tier: SubnetTier, position: usize, zone: &Zone) -> ResourceGraph {
    let label = tier.label().to_lowercase();

    ResourceGraph::single(
        naming::route_table(tier, position),
        ResourceNode::new("AWS::EC2::RouteTable").with_properties(json!({
            "VpcId": reference(naming::VPC),
            "Tags": name_tags(&[label.as_str(), zone.as_str()]),
        })),
    )
}

pub fn route_table_association(tier: SubnetTier, position: usize) -> ResourceGraph {
    ResourceGraph::single(
        naming::route_table_association(tier, position),
        ResourceNode::new("AWS::EC2::SubnetRouteTableAssociation").with_properties(json!({
            "RouteTableId": reference(naming::route_table(tier, position)),
            "SubnetId": reference(naming::subnet(tier, position)),
        })),
    )
}

/// Candidate targets for a default route. Exactly one must be set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteTargets {
    pub nat_gateway: Option<String>,
    pub internet_gateway: Option<String>,
    pub instance: Option<String>,
}

impl RouteTargets {
    pub fn nat_gateway(name: impl Into<String>) -> Self {
        Self {
            nat_gateway: Some(name.into()),
            ..Self::default()
        }
    }

    pub fn internet_gateway(name: impl Into<String>) -> Self {
        Self {
            internet_gateway: Some(name.into()),
            ..Self::default()
        }
    }

    pub fn instance(name: impl Into<String>) -> Self {
        Self {
            instance: Some(name.into()),
            ..Self::default()
        }
    }

    fn count(&self) -> usize {
        [&self.nat_gateway, &self.internet_gateway, &self.instance]
            .iter()
            .filter(|t| t.is_some())
            .count()
    }
}

/// Default (`0.0.0.0/0`) route in the tier's route table.
///
/// Routes through the internet gateway depend on the gateway attachment so
/// the engine never creates them against an unattached gateway.
pub fn route(tier: SubnetTier, position: usize, targets: &RouteTargets) -> IacResult<ResourceGraph> {
    let name = naming::route(tier, position);

    if targets.count() != 1 {
        return Err(IacError::InvalidRouteTarget(format!(
            "{} needs exactly one of a NAT gateway, internet gateway or instance target, got {}",
            name,
            targets.count()
        )));
    }

    let mut node = ResourceNode::new("AWS::EC2::Route").with_properties(json!({
        "DestinationCidrBlock": ANY_IPV4,
        "RouteTableId": reference(naming::route_table(tier, position)),
    }));

    if let Some(nat) = &targets.nat_gateway {
        node = node.property("NatGatewayId", reference(nat));
    } else if let Some(gateway) = &targets.internet_gateway {
        node = node
            .property("GatewayId", reference(gateway))
            .depends_on(naming::INTERNET_GATEWAY_ATTACHMENT);
    } else if let Some(instance) = &targets.instance {
        node = node.property("InstanceId", reference(instance));
    }

    Ok(ResourceGraph::single(name, node))
}

/// NAT gateway and the elastic address it owns, sharing one position.
///
/// The gateway sits in the public subnet of the same position.
pub fn nat_gateway(position: usize, zone: &Zone) -> ResourceGraph {
    let eip = naming::elastic_ip(position);

    ResourceGraph::single(
        &eip,
        ResourceNode::new("AWS::EC2::EIP").property("Domain", json!("vpc")),
    )
    .with(
        naming::nat_gateway(position),
        ResourceNode::new("AWS::EC2::NatGateway").with_properties(json!({
            "AllocationId": get_att(&eip, "AllocationId"),
            "SubnetId": reference(naming::subnet(SubnetTier::Public, position)),
            "Tags": name_tags(&[zone.as_str()]),
        })),
    )
}
