//! Security group builders.

use serde_json::{json, Value};

use vpcgen_plan::AddressBlock;

use crate::builders::ANY_IPV4;
use crate::naming;
use crate::resource::{name_tags, reference, ResourceGraph, ResourceNode};

const SSH: u16 = 22;
const HTTP: u16 = 80;
const HTTPS: u16 = 443;

fn cidr_rule(description: &str, port: u16, cidr: &str) -> Value {
    json!({
        "Description": description,
        "IpProtocol": "tcp",
        "FromPort": port,
        "ToPort": port,
        "CidrIp": cidr,
    })
}

fn group_rule(description: &str, port: u16, group: &str) -> Value {
    json!({
        "Description": description,
        "IpProtocol": "tcp",
        "FromPort": port,
        "ToPort": port,
        "SourceSecurityGroupId": reference(group),
    })
}

fn security_group(description: &str, tag: &str, ingress: Vec<Value>, egress: Vec<Value>) -> ResourceNode {
    ResourceNode::new("AWS::EC2::SecurityGroup").with_properties(json!({
        "GroupDescription": description,
        "SecurityGroupIngress": ingress,
        "SecurityGroupEgress": egress,
        "VpcId": reference(naming::VPC),
        "Tags": name_tags(&[tag]),
    }))
}

/// Security group for application workloads: HTTPS in and out, plus SSH
/// from `ssh_source` when a bastion group is given.
pub fn app_security_group(ssh_source: Option<&str>) -> ResourceGraph {
    let mut ingress = vec![cidr_rule("permit HTTPS inbound", HTTPS, ANY_IPV4)];
    if let Some(group) = ssh_source {
        ingress.push(group_rule("permit SSH from bastion", SSH, group));
    }

    ResourceGraph::single(
        naming::APP_SECURITY_GROUP,
        security_group(
            "Application Security Group",
            "app",
            ingress,
            vec![cidr_rule("permit HTTPS outbound", HTTPS, ANY_IPV4)],
        ),
    )
}

/// Security group for the bastion host. SSH is admitted from `source`.
pub fn bastion_security_group(source: AddressBlock) -> ResourceGraph {
    let source = source.to_string();

    ResourceGraph::single(
        naming::BASTION_SECURITY_GROUP,
        security_group(
            "Bastion Host",
            "bastion",
            vec![
                cidr_rule("permit inbound SSH", SSH, &source),
                json!({
                    "Description": "permit ICMP echo",
                    "IpProtocol": "icmp",
                    "FromPort": 8,
                    "ToPort": -1,
                    "CidrIp": source,
                }),
            ],
            vec![cidr_rule("permit outbound SSH", SSH, ANY_IPV4)],
        ),
    )
}

/// Security group for the NAT instance: HTTP and HTTPS from every
/// application block, HTTP and HTTPS out to anywhere.
pub fn nat_security_group(app_blocks: &[AddressBlock]) -> ResourceGraph {
    let ingress = app_blocks
        .iter()
        .flat_map(|block| {
            let cidr = block.to_string();
            [
                cidr_rule(&format!("permit HTTP from {}", cidr), HTTP, &cidr),
                cidr_rule(&format!("permit HTTPS from {}", cidr), HTTPS, &cidr),
            ]
        })
        .collect();

    ResourceGraph::single(
        naming::NAT_SECURITY_GROUP,
        security_group(
            "NAT Instance",
            "nat",
            ingress,
            vec![
                cidr_rule("permit outbound HTTP", HTTP, ANY_IPV4),
                cidr_rule("permit outbound HTTPS", HTTPS, ANY_IPV4),
            ],
        ),
    )
}

/// Security group shared by interface endpoints: HTTPS from the
/// application security group only.
pub fn endpoint_security_group() -> ResourceGraph {
    ResourceGraph::single(
        naming::ENDPOINT_SECURITY_GROUP,
        security_group(
            "VPC endpoint access",
            "endpoints",
            vec![group_rule(
                "permit HTTPS from application",
                HTTPS,
                naming::APP_SECURITY_GROUP,
            )],
            vec![cidr_rule("permit HTTPS outbound", HTTPS, ANY_IPV4)],
        ),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_security_group_without_bastion() {
        let graph = app_security_group(None);
        let node = graph.get("AppSecurityGroup").unwrap();
        assert_eq!(node.properties["SecurityGroupIngress"].as_array().unwrap().len(), 1);
        assert_eq!(node.properties["SecurityGroupEgress"][0]["FromPort"], json!(443));
    }

    #[test]
    fn test_app_security_group_admits_bastion_ssh() {
        let graph = app_security_group(Some("BastionSecurityGroup"));
        let node = graph.get("AppSecurityGroup").unwrap();
        let ingress = node.properties["SecurityGroupIngress"].as_array().unwrap();
        assert_eq!(ingress.len(), 2);
        assert_eq!(ingress[1]["SourceSecurityGroupId"], reference("BastionSecurityGroup"));
        assert!(node.references().contains("BastionSecurityGroup"));
    }

    #[test]
    fn test_bastion_source_is_overridable() {
        let graph = bastion_security_group("203.0.113.0/24".parse().unwrap());
        let node = graph.get("BastionSecurityGroup").unwrap();
        assert_eq!(node.properties["SecurityGroupIngress"][0]["CidrIp"], json!("203.0.113.0/24"));
        assert_eq!(node.properties["SecurityGroupIngress"][0]["FromPort"], json!(22));
    }

    #[test]
    fn test_nat_security_group_rules_per_app_block() {
        let blocks: Vec<AddressBlock> = vec!["10.0.0.0/21".parse().unwrap(), "10.0.16.0/21".parse().unwrap()];
        let graph = nat_security_group(&blocks);
        let node = graph.get("NatSecurityGroup").unwrap();
        let ingress = node.properties["SecurityGroupIngress"].as_array().unwrap();
        assert_eq!(ingress.len(), 4);
        assert_eq!(ingress[2]["CidrIp"], json!("10.0.16.0/21"));
        assert_eq!(ingress[2]["FromPort"], json!(80));
    }

    #[test]
    fn test_endpoint_security_group_references_app_group() {
        let graph = endpoint_security_group();
        let node = graph.get("EndpointSecurityGroup").unwrap();
        assert!(node.references().contains("AppSecurityGroup"));
    }
}
