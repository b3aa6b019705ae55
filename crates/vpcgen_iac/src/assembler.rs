//! Resource graph assembly.
//!
//! [`assemble`] turns validated options, an address plan, and the gathered
//! external data into the complete set of resources and outputs. Every
//! check runs before the first resource is built: a run either yields a
//! whole graph or an error, never a partial graph.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use vpcgen_plan::{AddressPlan, SubnetTier, ZoneAllocation};

use crate::builders::endpoint::{unavailable_services, EndpointAttachments};
use crate::builders::{
    acl, bastion, endpoint, flow_logs, nat_instance, network, security, subnet_group, EndpointKind,
    RouteTargets, SubnetGroupKind,
};
use crate::error::{IacError, IacResult};
use crate::naming;
use crate::options::{NatMode, VpcOptions};
use crate::outputs::{self, OutputSelection, OutputsGraph};
use crate::provider::{ExternalData, MachineImage, BASTION_IMAGE_PATTERN, NAT_IMAGE_PATTERN};
use crate::resource::{reference, ResourceGraph};

/// Default per-region quota of elastic addresses.
pub const ELASTIC_ADDRESS_SOFT_LIMIT: usize = 5;

/// Security groups and subnets a workload should attach to.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkAttachments {
    #[serde(default)]
    pub security_group_ids: Vec<Value>,
    #[serde(default)]
    pub subnet_ids: Vec<Value>,
}

impl NetworkAttachments {
    pub fn is_empty(&self) -> bool {
        self.security_group_ids.is_empty() && self.subnet_ids.is_empty()
    }

    /// Append every entry of `other` that is not already present.
    pub fn extend(&mut self, other: &NetworkAttachments) {
        append_missing(&mut self.security_group_ids, &other.security_group_ids);
        append_missing(&mut self.subnet_ids, &other.subnet_ids);
    }
}

fn append_missing(target: &mut Vec<Value>, values: &[Value]) {
    for value in values {
        if !target.contains(value) {
            target.push(value.clone());
        }
    }
}

/// Result of one assembly run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Assembly {
    pub plan: AddressPlan,
    pub resources: ResourceGraph,
    pub outputs: OutputsGraph,
    pub attachments: NetworkAttachments,
    /// Advisory conditions that did not stop the run.
    pub warnings: Vec<String>,
}

impl Assembly {
    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }
}

/// Image ids resolved by the gates.
struct Images {
    nat: Option<String>,
    bastion: Option<String>,
}

struct Assembler<'a> {
    options: &'a VpcOptions,
    plan: &'a AddressPlan,
    warnings: Vec<String>,
}

/// Assemble the resource graph.
///
/// Gates, in order: the NAT image (instance mode), the bastion image, then
/// the endpoint services, with every unavailable service reported at once.
/// NAT mode exclusivity and the subnet group allow-list are enforced when
/// [`VpcOptions`] is built.
pub fn assemble(options: &VpcOptions, plan: &AddressPlan, external: &ExternalData) -> IacResult<Assembly> {
    let images = check_gates(options, external)?;

    let mut assembler = Assembler {
        options,
        plan,
        warnings: Vec::new(),
    };

    if plan.is_empty() {
        assembler.warn("no zones available, nothing to build".to_string());
        return Ok(Assembly {
            plan: plan.clone(),
            warnings: assembler.warnings,
            ..Assembly::default()
        });
    }

    let resources = assembler
        .core_network()?
        .merge(assembler.nat_gateways()?)
        .merge(assembler.database_tier())
        .merge(assembler.network_acls())
        .merge(assembler.nat_instance(images.nat.as_deref())?)
        .merge(assembler.bastion(images.bastion.as_deref()))
        .merge(assembler.endpoints())
        .merge(assembler.subnet_groups())
        .merge(assembler.flow_logs());

    let outputs = assembler.outputs(&resources);
    let attachments = assembler.attachments();

    info!(
        "Assembled {} resources and {} outputs for {} zones",
        resources.len(),
        outputs.len(),
        plan.len()
    );

    Ok(Assembly {
        plan: plan.clone(),
        resources,
        outputs,
        attachments,
        warnings: assembler.warnings,
    })
}

fn check_gates(options: &VpcOptions, external: &ExternalData) -> IacResult<Images> {
    let nat = match options.nat {
        NatMode::Instance => Some(image_id(external.nat_image.as_ref(), NAT_IMAGE_PATTERN, "NAT instance")?),
        _ => None,
    };

    let bastion = match options.bastion {
        Some(_) => Some(image_id(
            external.bastion_image.as_ref(),
            BASTION_IMAGE_PATTERN,
            "bastion host",
        )?),
        None => None,
    };

    let missing = unavailable_services(&options.region, &options.services, &external.endpoint_services);
    if !missing.is_empty() {
        return Err(IacError::UnavailableService {
            region: options.region.clone(),
            services: missing,
        });
    }

    Ok(Images { nat, bastion })
}

fn image_id(image: Option<&MachineImage>, pattern: &str, purpose: &str) -> IacResult<String> {
    image.map(|i| i.image_id.clone()).ok_or_else(|| {
        IacError::MissingResource(format!(
            "no machine image matching '{}' found for the {}",
            pattern, purpose
        ))
    })
}

impl<'a> Assembler<'a> {
    fn warn(&mut self, message: String) {
        warn!("{}", message);
        self.warnings.push(message);
    }

    fn allocations(&self) -> &'a [ZoneAllocation] {
        self.plan.allocations()
    }

    fn zone_count(&self) -> usize {
        self.plan.len()
    }

    /// VPC, gateway, application and public subnets with their route
    /// tables, public routes, and the application security group.
    fn core_network(&self) -> IacResult<ResourceGraph> {
        let options = self.options;
        let mut graph = network::vpc(&options.stage, options.cidr_block)
            .merge(network::internet_gateway(&options.stage))
            .merge(security::app_security_group(
                options.bastion.as_ref().map(|_| naming::BASTION_SECURITY_GROUP),
            ));

        for allocation in self.allocations() {
            let position = allocation.position;
            for tier in [SubnetTier::Application, SubnetTier::Public] {
                graph = graph
                    .merge(network::subnet(tier, position, &allocation.zone, allocation.tier(tier)))
                    .merge(network::route_table(tier, position, &allocation.zone))
                    .merge(network::route_table_association(tier, position));
            }
            graph = graph.merge(network::route(
                SubnetTier::Public,
                position,
                &RouteTargets::internet_gateway(naming::INTERNET_GATEWAY),
            )?);
        }

        Ok(graph)
    }

    /// NAT gateways and the application default routes through them.
    ///
    /// Zones beyond the gateway count share gateways round-robin.
    fn nat_gateways(&mut self) -> IacResult<ResourceGraph> {
        let requested = match self.options.nat {
            NatMode::Gateways { requested } => requested,
            _ => return Ok(ResourceGraph::new()),
        };

        let zone_count = self.zone_count();
        let count = match requested {
            Some(requested) if requested > zone_count => {
                self.warn(format!(
                    "{} NAT gateways requested but only {} zones exist, using {}",
                    requested, zone_count, zone_count
                ));
                zone_count
            }
            Some(requested) => requested,
            None => zone_count,
        };

        if count == 0 {
            return Ok(ResourceGraph::new());
        }

        if count > ELASTIC_ADDRESS_SOFT_LIMIT {
            self.warn(format!(
                "{} NAT gateways need {} elastic addresses, above the default limit of {}",
                count, count, ELASTIC_ADDRESS_SOFT_LIMIT
            ));
        }

        let allocations = self.allocations();
        let mut graph = allocations
            .iter()
            .take(count)
            .fold(ResourceGraph::new(), |graph, allocation| {
                graph.merge(network::nat_gateway(allocation.position, &allocation.zone))
            });

        for allocation in allocations {
            let gateway = (allocation.position - 1) % count + 1;
            debug!("Zone {} routes through NAT gateway {}", allocation.zone, gateway);
            graph = graph.merge(network::route(
                SubnetTier::Application,
                allocation.position,
                &RouteTargets::nat_gateway(naming::nat_gateway(gateway)),
            )?);
        }

        Ok(graph)
    }

    /// Database subnets with route tables. They get no default route.
    fn database_tier(&self) -> ResourceGraph {
        if !self.options.db_subnet {
            return ResourceGraph::new();
        }

        debug!("Adding database tier to {} zones", self.zone_count());
        let tier = SubnetTier::Database;
        self.allocations()
            .iter()
            .fold(ResourceGraph::new(), |graph, allocation| {
                graph
                    .merge(network::subnet(tier, allocation.position, &allocation.zone, allocation.database))
                    .merge(network::route_table(tier, allocation.position, &allocation.zone))
                    .merge(network::route_table_association(tier, allocation.position))
            })
    }

    fn network_acls(&self) -> ResourceGraph {
        if !self.options.network_acl {
            return ResourceGraph::new();
        }

        let zone_count = self.zone_count();
        debug!("Adding network ACLs for {} zones", zone_count);
        let graph = acl::open_network_acl(SubnetTier::Public, zone_count)
            .merge(acl::open_network_acl(SubnetTier::Application, zone_count));

        if self.options.db_subnet {
            graph.merge(acl::database_network_acl(
                &self.plan.tier_blocks(SubnetTier::Application),
            ))
        } else {
            graph
        }
    }

    /// NAT instance in the first zone, with the application default routes
    /// pointing at it.
    fn nat_instance(&self, image_id: Option<&str>) -> IacResult<ResourceGraph> {
        let (image_id, first) = match (image_id, self.allocations().first()) {
            (Some(image_id), Some(first)) if self.options.nat == NatMode::Instance => (image_id, first),
            _ => return Ok(ResourceGraph::new()),
        };

        debug!("Adding NAT instance from {} in {}", image_id, first.zone);
        let mut graph = security::nat_security_group(&self.plan.tier_blocks(SubnetTier::Application))
            .merge(nat_instance::nat_instance(image_id, &first.zone));

        for allocation in self.allocations() {
            graph = graph.merge(network::route(
                SubnetTier::Application,
                allocation.position,
                &RouteTargets::instance(naming::NAT_INSTANCE),
            )?);
        }

        Ok(graph)
    }

    fn bastion(&self, image_id: Option<&str>) -> ResourceGraph {
        match (&self.options.bastion, image_id) {
            (Some(options), Some(image_id)) => {
                debug!("Adding bastion host from {} with key {}", image_id, options.key_name);
                security::bastion_security_group(options.source_cidr)
                    .merge(bastion::bastion(&options.key_name, image_id, self.zone_count()))
            }
            _ => ResourceGraph::new(),
        }
    }

    /// Route tables a gateway endpoint attaches to: every enabled tier of
    /// every zone.
    fn endpoint_route_tables(&self) -> Vec<String> {
        let mut tiers = vec![SubnetTier::Application, SubnetTier::Public];
        if self.options.db_subnet {
            tiers.push(SubnetTier::Database);
        }

        tiers
            .into_iter()
            .flat_map(|tier| {
                self.allocations()
                    .iter()
                    .map(move |allocation| naming::route_table(tier, allocation.position))
            })
            .collect()
    }

    fn endpoints(&self) -> ResourceGraph {
        let services = &self.options.services;
        if services.is_empty() {
            return ResourceGraph::new();
        }

        debug!("Adding {} VPC endpoints: {}", services.len(), services.join(", "));
        let attachments = EndpointAttachments {
            route_tables: self.endpoint_route_tables(),
            subnets: self
                .allocations()
                .iter()
                .map(|allocation| naming::subnet(SubnetTier::Application, allocation.position))
                .collect(),
            security_group: naming::ENDPOINT_SECURITY_GROUP.to_string(),
        };

        let needs_group = services
            .iter()
            .any(|service| EndpointKind::for_service(service) == EndpointKind::Interface);

        let graph = if needs_group {
            security::endpoint_security_group()
        } else {
            ResourceGraph::new()
        };

        services.iter().fold(graph, |graph, service| {
            graph.merge(endpoint::vpc_endpoint(service, &attachments))
        })
    }

    /// Subnet groups actually emitted for this run.
    fn emitted_subnet_groups(&self) -> Vec<SubnetGroupKind> {
        if self.options.db_subnet && self.zone_count() >= subnet_group::MIN_ZONES {
            self.options.subnet_groups.clone()
        } else {
            Vec::new()
        }
    }

    fn subnet_groups(&mut self) -> ResourceGraph {
        if self.options.subnet_groups.is_empty() {
            return ResourceGraph::new();
        }

        if !self.options.db_subnet {
            self.warn("subnet groups skipped: the database tier is disabled".to_string());
            return ResourceGraph::new();
        }

        let zone_count = self.zone_count();
        if zone_count < subnet_group::MIN_ZONES {
            self.warn(format!(
                "subnet groups skipped: {} zone(s) available, at least {} required",
                zone_count,
                subnet_group::MIN_ZONES
            ));
            return ResourceGraph::new();
        }

        let kinds = self.emitted_subnet_groups();
        debug!("Adding {} subnet groups across {} zones", kinds.len(), zone_count);
        kinds
            .into_iter()
            .fold(ResourceGraph::new(), |graph, kind| {
                graph.merge(subnet_group::subnet_group(kind, zone_count))
            })
    }

    fn flow_logs(&self) -> ResourceGraph {
        if self.options.flow_logs {
            debug!("Adding VPC flow logs");
            flow_logs::flow_logs()
        } else {
            ResourceGraph::new()
        }
    }

    fn outputs(&self, resources: &ResourceGraph) -> OutputsGraph {
        let outputs = outputs::outputs(&OutputSelection {
            zone_count: self.zone_count(),
            database_tier: self.options.db_subnet,
            subnet_groups: self.emitted_subnet_groups(),
            bastion: resources.contains(bastion::BASTION_EIP),
        });

        if self.options.export_outputs {
            outputs.exported()
        } else {
            outputs
        }
    }

    fn attachments(&self) -> NetworkAttachments {
        NetworkAttachments {
            security_group_ids: vec![reference(naming::APP_SECURITY_GROUP)],
            subnet_ids: self
                .allocations()
                .iter()
                .map(|allocation| reference(naming::subnet(SubnetTier::Application, allocation.position)))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::{NatGatewaySetting, VpcConfig};
    use chrono::{TimeZone, Utc};
    use vpcgen_plan::{plan, Zone};

    fn machine_image(id: &str) -> MachineImage {
        MachineImage {
            image_id: id.to_string(),
            name: id.to_string(),
            created_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        }
    }

    fn external(zones: &[&str]) -> ExternalData {
        ExternalData {
            zones: zones.iter().map(|z| Zone::from(*z)).collect(),
            nat_image: Some(machine_image("ami-nat")),
            bastion_image: Some(machine_image("ami-bastion")),
            endpoint_services: ["s3", "dynamodb", "kms"]
                .iter()
                .map(|s| endpoint::canonical_service_name("us-east-1", s))
                .collect(),
        }
    }

    fn run(config: VpcConfig, zones: &[&str]) -> IacResult<Assembly> {
        let options = VpcOptions::from_config(config)?;
        let external = external(zones);
        let plan = plan(options.cidr_block, &external.zones)?;
        assemble(&options, &plan, &external)
    }

    #[test]
    fn test_minimal_network() {
        let assembly = run(VpcConfig::default().with_services(Vec::<String>::new()), &["a", "b"]).unwrap();
        let resources = &assembly.resources;

        for name in [
            "VPC",
            "InternetGateway",
            "InternetGatewayAttachment",
            "AppSecurityGroup",
            "AppSubnet1",
            "PublicSubnet2",
            "DBSubnet2",
            "PublicRoute1",
            "PublicRoute2",
            "DBRouteTableAssociation1",
        ] {
            assert!(resources.contains(name), "missing {}", name);
        }
        assert!(!resources.contains("AppRoute1"));
        assert!(!resources.contains("DBRoute1"));
        assert!(resources.dangling_references().is_empty());
    }

    #[test]
    fn test_nat_gateways_round_robin() {
        let config = VpcConfig::default().with_nat_gateway(NatGatewaySetting::Count(2));
        let assembly = run(config, &["a", "b", "c"]).unwrap();
        let resources = &assembly.resources;

        assert!(resources.contains("NatGateway1"));
        assert!(resources.contains("NatGateway2"));
        assert!(!resources.contains("NatGateway3"));

        let targets: Vec<Value> = (1..=3)
            .map(|p| resources.get(&format!("AppRoute{}", p)).unwrap().properties["NatGatewayId"].clone())
            .collect();
        assert_eq!(
            targets,
            vec![reference("NatGateway1"), reference("NatGateway2"), reference("NatGateway1")]
        );
        assert!(assembly.warnings.is_empty());
    }

    #[test]
    fn test_nat_count_clamped_with_warning() {
        let config = VpcConfig::default().with_nat_gateway(NatGatewaySetting::Count(4));
        let assembly = run(config, &["a", "b"]).unwrap();
        assert!(!assembly.resources.contains("NatGateway3"));
        assert_eq!(assembly.warnings.len(), 1);
        assert!(assembly.warnings[0].contains("only 2 zones"));
    }

    #[test]
    fn test_nat_gateways_above_address_limit_warns() {
        let config = VpcConfig::default().with_nat_gateway(NatGatewaySetting::Enabled(true));
        let zones = ["a", "b", "c", "d", "e", "f"];
        let assembly = run(config, &zones).unwrap();
        assert!(assembly.resources.contains("NatGateway6"));
        assert!(assembly.warnings.iter().any(|w| w.contains("elastic addresses")));
    }

    #[test]
    fn test_nat_instance_routes() {
        let assembly = run(VpcConfig::default().with_nat_instance(), &["a", "b"]).unwrap();
        let resources = &assembly.resources;
        assert!(resources.contains("NatInstance"));
        assert!(resources.contains("NatSecurityGroup"));
        assert_eq!(
            resources.get("AppRoute2").unwrap().properties["InstanceId"],
            reference("NatInstance")
        );
        assert!(resources.dangling_references().is_empty());
    }

    #[test]
    fn test_missing_nat_image() {
        let options = VpcOptions::from_config(VpcConfig::default().with_nat_instance()).unwrap();
        let mut external = external(&["a"]);
        external.nat_image = None;
        let plan = plan(options.cidr_block, &external.zones).unwrap();

        let err = assemble(&options, &plan, &external).unwrap_err();
        assert!(matches!(err, IacError::MissingResource(_)));
    }

    #[test]
    fn test_unavailable_services_checked_before_build() {
        let options = VpcOptions::from_config(VpcConfig::default().with_services(["s3", "bogus", "sqs"])).unwrap();
        let external = external(&["a"]);
        let plan = plan(options.cidr_block, &external.zones).unwrap();

        match assemble(&options, &plan, &external) {
            Err(IacError::UnavailableService { region, services }) => {
                assert_eq!(region, "us-east-1");
                assert_eq!(services, vec!["bogus".to_string(), "sqs".to_string()]);
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_gateway_endpoint_attaches_to_every_route_table() {
        let assembly = run(VpcConfig::default().with_services(["s3"]), &["a", "b"]).unwrap();
        let endpoint = assembly.resources.get("S3VPCEndpoint").unwrap();
        assert_eq!(endpoint.properties["RouteTableIds"].as_array().unwrap().len(), 6);
        assert!(!assembly.resources.contains("EndpointSecurityGroup"));
    }

    #[test]
    fn test_interface_endpoint_adds_security_group() {
        let assembly = run(VpcConfig::default().with_services(["kms"]), &["a", "b"]).unwrap();
        assert!(assembly.resources.contains("KmsVPCEndpoint"));
        assert!(assembly.resources.contains("EndpointSecurityGroup"));
        assert!(assembly.resources.dangling_references().is_empty());
    }

    #[test]
    fn test_subnet_groups_skipped_for_single_zone() {
        let assembly = run(VpcConfig::default(), &["a"]).unwrap();
        assert!(assembly.resources.names_of_type("AWS::RDS::DBSubnetGroup").next().is_none());
        assert!(!assembly.outputs.contains("RDSSubnetGroup"));
        assert!(assembly.warnings.iter().any(|w| w.contains("subnet groups skipped")));
    }

    #[test]
    fn test_subnet_groups_need_database_tier() {
        let config = VpcConfig {
            db_subnet: false,
            ..VpcConfig::default()
        };
        let assembly = run(config, &["a", "b"]).unwrap();
        assert!(!assembly.resources.contains("RDSSubnetGroup"));
        assert!(!assembly.resources.contains("DBSubnet1"));
        assert!(assembly.warnings.iter().any(|w| w.contains("database tier is disabled")));
    }

    #[test]
    fn test_database_acl_rules() {
        let config = VpcConfig {
            network_acl: true,
            ..VpcConfig::default()
        };
        let assembly = run(config, &["a", "b"]).unwrap();
        let resources = &assembly.resources;
        let first = resources.get("DBNetworkAclIngress100").unwrap();
        let second = resources.get("DBNetworkAclEgress101").unwrap();
        assert_eq!(first.properties["CidrBlock"], serde_json::json!("10.0.0.0/21"));
        assert_eq!(second.properties["CidrBlock"], serde_json::json!("10.0.16.0/21"));
        assert!(resources.contains("AppSubnetNetworkAclAssociation2"));
        assert!(resources.dangling_references().is_empty());
    }

    #[test]
    fn test_bastion_opens_ssh_on_app_group() {
        let assembly = run(VpcConfig::default().with_bastion("ops"), &["a", "b"]).unwrap();
        let resources = &assembly.resources;
        assert!(resources.contains("BastionSecurityGroup"));
        assert!(resources.get("AppSecurityGroup").unwrap().references().contains("BastionSecurityGroup"));
        assert!(assembly.outputs.contains("BastionSSHUser"));
        assert!(resources.dangling_references().is_empty());
    }

    #[test]
    fn test_empty_plan() {
        let assembly = run(VpcConfig::default(), &[]).unwrap();
        assert!(assembly.is_empty());
        assert!(assembly.outputs.is_empty());
        assert_eq!(assembly.warnings.len(), 1);
    }

    /// Collects the message of every event emitted while it is the default.
    #[derive(Clone, Default)]
    struct CapturedEvents(std::sync::Arc<parking_lot::Mutex<Vec<String>>>);

    struct MessageVisitor<'a>(&'a mut String);

    impl tracing::field::Visit for MessageVisitor<'_> {
        fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
            if field.name() == "message" {
                *self.0 = format!("{:?}", value);
            }
        }
    }

    impl<S: tracing::Subscriber> tracing_subscriber::Layer<S> for CapturedEvents {
        fn on_event(&self, event: &tracing::Event<'_>, _ctx: tracing_subscriber::layer::Context<'_, S>) {
            let mut message = String::new();
            event.record(&mut MessageVisitor(&mut message));
            self.0.lock().push(message);
        }
    }

    #[test]
    fn test_each_feature_block_logs() {
        use tracing_subscriber::prelude::*;

        let config = VpcConfig {
            network_acl: true,
            flow_logs: true,
            ..VpcConfig::default()
        }
        .with_services(["s3", "kms"])
        .with_nat_instance()
        .with_bastion("ops");

        let captured = CapturedEvents::default();
        let subscriber = tracing_subscriber::registry().with(captured.clone());
        tracing::subscriber::with_default(subscriber, || run(config, &["a", "b"])).unwrap();

        let messages = captured.0.lock().clone();
        for expected in [
            "Adding database tier to 2 zones",
            "Adding network ACLs for 2 zones",
            "Adding NAT instance from ami-nat in a",
            "Adding bastion host from ami-bastion with key ops",
            "Adding 2 VPC endpoints: s3, kms",
            "Adding 4 subnet groups across 2 zones",
            "Adding VPC flow logs",
        ] {
            assert!(messages.iter().any(|m| m == expected), "missing log: {}", expected);
        }
    }

    #[test]
    fn test_attachments() {
        let assembly = run(VpcConfig::default(), &["a", "b"]).unwrap();
        assert_eq!(assembly.attachments.security_group_ids, vec![reference("AppSecurityGroup")]);
        assert_eq!(
            assembly.attachments.subnet_ids,
            vec![reference("AppSubnet1"), reference("AppSubnet2")]
        );
    }
}
