//! Resource builders.
//!
//! Every builder is a pure function from explicit arguments to a
//! [`ResourceGraph`](crate::resource::ResourceGraph) of one or more nodes.
//! Names of referenced nodes are computed with [`crate::naming`], never
//! looked up, so builders can be called in any order and any number of
//! times with identical results.

pub mod acl;
pub mod bastion;
pub mod endpoint;
pub mod flow_logs;
pub mod nat_instance;
pub mod network;
pub mod security;
pub mod subnet_group;

pub use endpoint::EndpointKind;
pub use network::RouteTargets;
pub use subnet_group::SubnetGroupKind;

/// Destination covering every IPv4 address.
pub const ANY_IPV4: &str = "0.0.0.0/0";
