//! Bastion host bundle.
//!
//! A single-instance auto-scaling group spread over the public subnets. On
//! boot the instance claims a fixed elastic address, so the SSH endpoint
//! stays stable across replacements.

use serde_json::{json, Value};

use vpcgen_plan::SubnetTier;

use crate::naming;
use crate::resource::{get_att, join, name_tags, reference, ResourceGraph, ResourceNode};

pub const BASTION_EIP: &str = "BastionEIP";
pub const BASTION_ROLE: &str = "BastionIamRole";
pub const BASTION_INSTANCE_PROFILE: &str = "BastionInstanceProfile";
pub const BASTION_LAUNCH_TEMPLATE: &str = "BastionLaunchTemplate";
pub const BASTION_AUTO_SCALING_GROUP: &str = "BastionAutoScalingGroup";

/// Login user of the bastion image.
pub const BASTION_SSH_USER: &str = "ec2-user";

const INSTANCE_TYPE: &str = "t3.micro";

fn elastic_ip() -> ResourceNode {
    ResourceNode::new("AWS::EC2::EIP").with_properties(json!({
        "Domain": "vpc",
        "Tags": name_tags(&["bastion"]),
    }))
}

fn iam_role() -> ResourceNode {
    ResourceNode::new("AWS::IAM::Role").with_properties(json!({
        "AssumeRolePolicyDocument": {
            "Version": "2012-10-17",
            "Statement": [{
                "Effect": "Allow",
                "Principal": { "Service": ["ec2.amazonaws.com"] },
                "Action": ["sts:AssumeRole"],
            }]
        },
        "Policies": [{
            "PolicyName": "AllowEIPAssociation",
            "PolicyDocument": {
                "Version": "2012-10-17",
                "Statement": [{
                    "Effect": "Allow",
                    "Action": "ec2:AssociateAddress",
                    "Resource": "*",
                }]
            }
        }],
        "ManagedPolicyArns": [
            join("", vec![
                json!("arn:"),
                reference("AWS::Partition"),
                json!(":iam::aws:policy/AmazonSSMManagedInstanceCore"),
            ])
        ],
    }))
}

fn instance_profile() -> ResourceNode {
    ResourceNode::new("AWS::IAM::InstanceProfile")
        .property("Roles", json!([reference(BASTION_ROLE)]))
}

fn user_data() -> Value {
    json!({
        "Fn::Base64": join("", vec![
            json!("#!/bin/bash -xe\n"),
            json!("/usr/bin/yum update -y\n"),
            json!("INSTANCE_ID=$(curl -s http://169.254.169.254/latest/meta-data/instance-id)\n"),
            json!("/usr/bin/aws ec2 associate-address --instance-id $INSTANCE_ID --allocation-id "),
            get_att(BASTION_EIP, "AllocationId"),
            json!(" --region "),
            reference("AWS::Region"),
            json!("\n"),
        ])
    })
}

fn launch_template(key_name: &str, image_id: &str) -> ResourceNode {
    ResourceNode::new("AWS::EC2::LaunchTemplate").with_properties(json!({
        "LaunchTemplateName": join("-", vec![reference("AWS::StackName"), json!("bastion")]),
        "LaunchTemplateData": {
            "BlockDeviceMappings": [{
                "DeviceName": "/dev/xvda",
                "Ebs": { "VolumeSize": 10, "VolumeType": "gp3", "DeleteOnTermination": true }
            }],
            "IamInstanceProfile": { "Arn": get_att(BASTION_INSTANCE_PROFILE, "Arn") },
            "ImageId": image_id,
            "InstanceType": INSTANCE_TYPE,
            "KeyName": key_name,
            "Monitoring": { "Enabled": false },
            "NetworkInterfaces": [{
                "AssociatePublicIpAddress": true,
                "DeleteOnTermination": true,
                "Description": "eth0",
                "DeviceIndex": 0,
                "Groups": [reference(naming::BASTION_SECURITY_GROUP)],
            }],
            "UserData": user_data(),
        },
    }))
}

fn auto_scaling_group(zone_count: usize) -> ResourceNode {
    let public_subnets: Vec<Value> = (1..=zone_count)
        .map(|position| reference(naming::subnet(SubnetTier::Public, position)))
        .collect();

    ResourceNode::new("AWS::AutoScaling::AutoScalingGroup")
        .depends_on(naming::INTERNET_GATEWAY_ATTACHMENT)
        .with_properties(json!({
            "LaunchTemplate": {
                "LaunchTemplateId": reference(BASTION_LAUNCH_TEMPLATE),
                "Version": get_att(BASTION_LAUNCH_TEMPLATE, "LatestVersionNumber"),
            },
            "MinSize": "1",
            "MaxSize": "1",
            "DesiredCapacity": "1",
            "VPCZoneIdentifier": public_subnets,
            "Tags": [{
                "Key": "Name",
                "Value": join("-", vec![reference("AWS::StackName"), json!("bastion")]),
                "PropagateAtLaunch": true,
            }],
        }))
}

/// Bastion bundle for `zone_count` public subnets. The bastion security
/// group is built separately.
pub fn bastion(key_name: &str, image_id: &str, zone_count: usize) -> ResourceGraph {
    ResourceGraph::single(BASTION_EIP, elastic_ip())
        .with(BASTION_ROLE, iam_role())
        .with(BASTION_INSTANCE_PROFILE, instance_profile())
        .with(BASTION_LAUNCH_TEMPLATE, launch_template(key_name, image_id))
        .with(BASTION_AUTO_SCALING_GROUP, auto_scaling_group(zone_count))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bastion_bundle() {
        let graph = bastion("ops-key", "ami-0123", 2);
        assert_eq!(graph.len(), 5);

        let template = graph.get(BASTION_LAUNCH_TEMPLATE).unwrap();
        let data = &template.properties["LaunchTemplateData"];
        assert_eq!(data["KeyName"], json!("ops-key"));
        assert_eq!(data["ImageId"], json!("ami-0123"));

        let group = graph.get(BASTION_AUTO_SCALING_GROUP).unwrap();
        assert_eq!(
            group.properties["VPCZoneIdentifier"],
            json!([reference("PublicSubnet1"), reference("PublicSubnet2")])
        );
    }

    #[test]
    fn test_bastion_external_references() {
        let mut external: Vec<String> = bastion("k", "ami-1", 1)
            .dangling_references()
            .into_iter()
            .map(|d| d.to)
            .collect();
        external.sort();
        external.dedup();
        assert_eq!(
            external,
            vec![
                "BastionSecurityGroup".to_string(),
                "InternetGatewayAttachment".to_string(),
                "PublicSubnet1".to_string(),
            ]
        );
    }
}
