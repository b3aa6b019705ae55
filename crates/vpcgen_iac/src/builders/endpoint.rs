//! VPC endpoint builders.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::naming;
use crate::resource::{join, reference, ResourceGraph, ResourceNode};

/// Services reached through route-table ("gateway") endpoints.
const GATEWAY_SERVICES: [&str; 2] = ["s3", "dynamodb"];

/// How an endpoint attaches to the network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EndpointKind {
    /// Attached to route tables.
    Gateway,
    /// Attached to subnets and a security group.
    Interface,
}

impl EndpointKind {
    pub fn for_service(service: &str) -> Self {
        if GATEWAY_SERVICES.contains(&service) {
            EndpointKind::Gateway
        } else {
            EndpointKind::Interface
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EndpointKind::Gateway => "Gateway",
            EndpointKind::Interface => "Interface",
        }
    }
}

/// Fully qualified service name as listed by the regional service catalog.
pub fn canonical_service_name(region: &str, service: &str) -> String {
    format!("com.amazonaws.{}.{}", region, service)
}

/// Requested services whose canonical name is absent from `catalog`, in
/// request order.
pub fn unavailable_services(region: &str, services: &[String], catalog: &[String]) -> Vec<String> {
    services
        .iter()
        .filter(|service| {
            let canonical = canonical_service_name(region, service);
            !catalog.iter().any(|offered| *offered == canonical)
        })
        .cloned()
        .collect()
}

/// Where endpoints attach, as node names.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EndpointAttachments {
    /// Route tables for gateway endpoints.
    pub route_tables: Vec<String>,
    /// Subnets for interface endpoints.
    pub subnets: Vec<String>,
    /// Security group for interface endpoints.
    pub security_group: String,
}

fn references(names: &[String]) -> Value {
    Value::Array(names.iter().map(reference).collect())
}

pub fn vpc_endpoint(service: &str, attachments: &EndpointAttachments) -> ResourceGraph {
    let kind = EndpointKind::for_service(service);

    let node = ResourceNode::new("AWS::EC2::VPCEndpoint").with_properties(json!({
        "ServiceName": join(".", vec![
            json!("com.amazonaws"),
            reference("AWS::Region"),
            json!(service),
        ]),
        "VpcEndpointType": kind.as_str(),
        "VpcId": reference(naming::VPC),
    }));

    let node = match kind {
        EndpointKind::Gateway => node
            .property("RouteTableIds", references(&attachments.route_tables))
            .property(
                "PolicyDocument",
                json!({
                    "Statement": [{
                        "Effect": "Allow",
                        "Principal": "*",
                        "Resource": "*",
                        "Action": "*",
                    }]
                }),
            ),
        EndpointKind::Interface => node
            .property("SubnetIds", references(&attachments.subnets))
            .property(
                "SecurityGroupIds",
                json!([reference(&attachments.security_group)]),
            )
            .property("PrivateDnsEnabled", json!(true)),
    };

    ResourceGraph::single(naming::vpc_endpoint(service), node)
}
