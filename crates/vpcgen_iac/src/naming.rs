//! Resource names.
//!
//! Per-zone names follow `{Tier}{Kind}{Position}` with a 1-based position.
//! Builders compute the names of the nodes they reference with these same
//! functions instead of looking them up, so the formulas must not drift.

use vpcgen_plan::SubnetTier;

pub const VPC: &str = "VPC";
pub const INTERNET_GATEWAY: &str = "InternetGateway";
pub const INTERNET_GATEWAY_ATTACHMENT: &str = "InternetGatewayAttachment";
pub const APP_SECURITY_GROUP: &str = "AppSecurityGroup";
pub const BASTION_SECURITY_GROUP: &str = "BastionSecurityGroup";
pub const NAT_SECURITY_GROUP: &str = "NatSecurityGroup";
pub const ENDPOINT_SECURITY_GROUP: &str = "EndpointSecurityGroup";
pub const NAT_INSTANCE: &str = "NatInstance";

pub fn subnet(tier: SubnetTier, position: usize) -> String {
    format!("{}Subnet{}", tier.label(), position)
}

pub fn route_table(tier: SubnetTier, position: usize) -> String {
    format!("{}RouteTable{}", tier.label(), position)
}

pub fn route_table_association(tier: SubnetTier, position: usize) -> String {
    format!("{}RouteTableAssociation{}", tier.label(), position)
}

pub fn route(tier: SubnetTier, position: usize) -> String {
    format!("{}Route{}", tier.label(), position)
}

pub fn nat_gateway(position: usize) -> String {
    format!("NatGateway{}", position)
}

pub fn elastic_ip(position: usize) -> String {
    format!("EIP{}", position)
}

pub fn network_acl(tier: SubnetTier) -> String {
    format!("{}NetworkAcl", tier.label())
}

pub fn network_acl_entry(tier: SubnetTier, egress: bool, rule_number: u32) -> String {
    let direction = if egress { "Egress" } else { "Ingress" };
    format!("{}{}{}", network_acl(tier), direction, rule_number)
}

pub fn network_acl_association(tier: SubnetTier, position: usize) -> String {
    format!("{}SubnetNetworkAclAssociation{}", tier.label(), position)
}

/// Endpoint name: the service identifier split on `-`, `_` and `.`, each
/// segment title-cased, followed by `VPCEndpoint`.
///
/// ```rust
/// assert_eq!(vpcgen_iac::naming::vpc_endpoint("kinesis-streams"), "KinesisStreamsVPCEndpoint");
/// assert_eq!(vpcgen_iac::naming::vpc_endpoint("ecr.api"), "EcrApiVPCEndpoint");
/// ```
pub fn vpc_endpoint(service: &str) -> String {
    let mut name: String = service
        .split(['-', '_', '.'])
        .filter(|segment| !segment.is_empty())
        .map(title_case)
        .collect();
    name.push_str("VPCEndpoint");
    name
}

fn title_case(segment: &str) -> String {
    let mut chars = segment.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
