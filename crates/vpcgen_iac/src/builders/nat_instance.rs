//! NAT instance: a single instance forwarding traffic for the private tiers.

use serde_json::json;

use vpcgen_plan::{SubnetTier, Zone};

use crate::naming;
use crate::resource::{name_tags, reference, ResourceGraph, ResourceNode};

const INSTANCE_TYPE: &str = "t2.micro";

/// NAT instance in the first public subnet. Source/destination checking is
/// disabled so the instance can forward traffic it does not own.
pub fn nat_instance(image_id: &str, zone: &Zone) -> ResourceGraph {
    ResourceGraph::single(
        naming::NAT_INSTANCE,
        ResourceNode::new("AWS::EC2::Instance")
            .depends_on(naming::INTERNET_GATEWAY_ATTACHMENT)
            .with_properties(json!({
                "AvailabilityZone": zone.as_str(),
                "BlockDeviceMappings": [{
                    "DeviceName": "/dev/xvda",
                    "Ebs": { "VolumeSize": 10, "VolumeType": "gp2", "DeleteOnTermination": true }
                }],
                "ImageId": image_id,
                "InstanceType": INSTANCE_TYPE,
                "Monitoring": false,
                "NetworkInterfaces": [{
                    "AssociatePublicIpAddress": true,
                    "DeleteOnTermination": true,
                    "Description": "eth0",
                    "DeviceIndex": "0",
                    "GroupSet": [reference(naming::NAT_SECURITY_GROUP)],
                    "SubnetId": reference(naming::subnet(SubnetTier::Public, 1)),
                }],
                "SourceDestCheck": false,
                "Tags": name_tags(&["nat"]),
            })),
    )
}
