//! # vpcgen_plan
//!
//! Deterministic address planning for vpcgen.
//!
//! Given a root IPv4 block and an ordered list of availability zones, this
//! crate computes which block every zone and every subnet tier receives.
//! The computation is pure: no I/O, no hidden state, identical output for
//! identical input.
//!
//! ## Example
//!
//! ```rust
//! use vpcgen_plan::{plan, AddressBlock, SubnetTier, Zone};
//!
//! let root: AddressBlock = "10.0.0.0/16".parse().unwrap();
//! let zones = vec![Zone::from("us-east-1a"), Zone::from("us-east-1b")];
//!
//! let plan = plan(root, &zones).unwrap();
//! let app = plan.block(&zones[1], SubnetTier::Application).unwrap();
//! assert_eq!(app.to_string(), "10.0.16.0/21");
//! ```

pub mod block;
pub mod error;
pub mod planner;
pub mod zone;

pub use block::AddressBlock;
pub use error::{PlanError, PlanResult};
pub use planner::{plan, AddressPlan, ZoneAllocation, MAX_ZONES, TIER_LEVELS, ZONE_LEVELS};
pub use zone::{SubnetTier, Zone};
