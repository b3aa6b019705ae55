//! Address planning: carving one root block into per-zone, per-tier blocks.
//!
//! The root block is halved four times to produce sixteen zone blocks
//! (a /16 yields sixteen /20s). Each zone block is halved once more: the low
//! half is the application tier, and the high half is halved again into the
//! public and database tiers.
//!
//! ```text
//! 10.0.0.0/16
//! └── 10.0.0.0/20   zone 1
//!     ├── 10.0.0.0/21   application
//!     └── 10.0.8.0/21
//!         ├── 10.0.8.0/22   public
//!         └── 10.0.12.0/22  database
//! ```

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::block::AddressBlock;
use crate::error::{PlanError, PlanResult};
use crate::zone::{SubnetTier, Zone};

/// Maximum number of zones a single root block is divided between.
pub const MAX_ZONES: usize = 16;

/// Halving levels below the root that produce the zone blocks.
pub const ZONE_LEVELS: u8 = MAX_ZONES.next_power_of_two().trailing_zeros() as u8;

/// Halving levels below a zone block that produce the smallest tier blocks.
pub const TIER_LEVELS: u8 = 2;

/// Blocks assigned to a single zone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZoneAllocation {
    pub zone: Zone,
    /// 1-based position of the zone in the requested zone list.
    pub position: usize,
    pub block: AddressBlock,
    pub application: AddressBlock,
    pub public: AddressBlock,
    pub database: AddressBlock,
}

impl ZoneAllocation {
    pub fn tier(&self, tier: SubnetTier) -> AddressBlock {
        match tier {
            SubnetTier::Application => self.application,
            SubnetTier::Public => self.public,
            SubnetTier::Database => self.database,
        }
    }
}

/// The complete address plan for one run. Immutable once computed.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AddressPlan {
    root: Option<AddressBlock>,
    allocations: Vec<ZoneAllocation>,
}

impl AddressPlan {
    /// The root block, or `None` for an empty plan.
    pub fn root(&self) -> Option<AddressBlock> {
        self.root
    }

    pub fn is_empty(&self) -> bool {
        self.allocations.is_empty()
    }

    /// Number of zones in the plan.
    pub fn len(&self) -> usize {
        self.allocations.len()
    }

    /// Allocations in zone order.
    pub fn allocations(&self) -> &[ZoneAllocation] {
        &self.allocations
    }

    pub fn zones(&self) -> impl Iterator<Item = &Zone> {
        self.allocations.iter().map(|a| &a.zone)
    }

    pub fn allocation(&self, zone: &Zone) -> Option<&ZoneAllocation> {
        self.allocations.iter().find(|a| &a.zone == zone)
    }

    pub fn block(&self, zone: &Zone, tier: SubnetTier) -> Option<AddressBlock> {
        self.allocation(zone).map(|a| a.tier(tier))
    }

    /// Every zone's block for one tier, in zone order.
    pub fn tier_blocks(&self, tier: SubnetTier) -> Vec<AddressBlock> {
        self.allocations.iter().map(|a| a.tier(tier)).collect()
    }
}

/// Compute the address plan for `zones` inside `root`.
///
/// The root must leave room for the zone split plus the two tier levels
/// (a /26 or larger). An empty zone list yields an empty plan.
pub fn plan(root: AddressBlock, zones: &[Zone]) -> PlanResult<AddressPlan> {
    let required = root.prefix_len() + ZONE_LEVELS + TIER_LEVELS;
    if required > AddressBlock::MAX_PREFIX {
        return Err(PlanError::BlockTooSmall {
            block: root.to_string(),
            prefix_len: root.prefix_len(),
            required,
        });
    }

    if zones.len() > MAX_ZONES {
        return Err(PlanError::TooManyZones {
            count: zones.len(),
            max: MAX_ZONES,
        });
    }

    let mut seen = HashSet::new();
    for zone in zones {
        if !seen.insert(zone) {
            return Err(PlanError::DuplicateZone(zone.to_string()));
        }
    }

    if zones.is_empty() {
        debug!("No zones given for {}, returning empty plan", root);
        return Ok(AddressPlan::default());
    }

    let zone_blocks = subdivide(root, ZONE_LEVELS)?;

    let allocations = zones
        .iter()
        .zip(zone_blocks)
        .enumerate()
        .map(|(index, (zone, block))| allocate(zone, index + 1, block))
        .collect::<PlanResult<Vec<_>>>()?;

    debug!("Planned {} zones inside {}", allocations.len(), root);

    Ok(AddressPlan {
        root: Some(root),
        allocations,
    })
}

fn allocate(zone: &Zone, position: usize, block: AddressBlock) -> PlanResult<ZoneAllocation> {
    let (application, rest) = halve(block)?;
    let (public, database) = halve(rest)?;

    Ok(ZoneAllocation {
        zone: zone.clone(),
        position,
        block,
        application,
        public,
        database,
    })
}

fn halve(block: AddressBlock) -> PlanResult<(AddressBlock, AddressBlock)> {
    block.split().ok_or_else(|| too_small(block, 1))
}

fn subdivide(block: AddressBlock, levels: u8) -> PlanResult<Vec<AddressBlock>> {
    block.subdivide(levels).ok_or_else(|| too_small(block, levels))
}

fn too_small(block: AddressBlock, levels: u8) -> PlanError {
    PlanError::BlockTooSmall {
        block: block.to_string(),
        prefix_len: block.prefix_len(),
        required: block.prefix_len() + levels,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn zones(names: &[&str]) -> Vec<Zone> {
        names.iter().map(|n| Zone::from(*n)).collect()
    }

    fn root() -> AddressBlock {
        "10.0.0.0/16".parse().unwrap()
    }

    #[test]
    fn test_plan_three_zones() {
        let plan = plan(root(), &zones(&["a", "b", "c"])).unwrap();
        assert_eq!(plan.len(), 3);

        let blocks: Vec<String> = plan.allocations().iter().map(|a| a.block.to_string()).collect();
        assert_eq!(blocks, vec!["10.0.0.0/20", "10.0.16.0/20", "10.0.32.0/20"]);

        let a = plan.allocation(&Zone::from("a")).unwrap();
        assert_eq!(a.position, 1);
        assert_eq!(a.application.to_string(), "10.0.0.0/21");
        assert_eq!(a.public.to_string(), "10.0.8.0/22");
        assert_eq!(a.database.to_string(), "10.0.12.0/22");
    }

    #[test]
    fn test_tier_blocks_follow_zone_order() {
        let plan = plan(root(), &zones(&["z", "y"])).unwrap();
        let public: Vec<String> = plan
            .tier_blocks(SubnetTier::Public)
            .iter()
            .map(|b| b.to_string())
            .collect();
        assert_eq!(public, vec!["10.0.8.0/22", "10.0.24.0/22"]);
        assert_eq!(
            plan.block(&Zone::from("y"), SubnetTier::Application).unwrap().to_string(),
            "10.0.16.0/21"
        );
    }

    #[test]
    fn test_empty_zone_list_is_empty_plan() {
        let plan = plan(root(), &[]).unwrap();
        assert!(plan.is_empty());
        assert!(plan.root().is_none());
    }

    #[test]
    fn test_root_too_small() {
        let small: AddressBlock = "10.0.0.0/27".parse().unwrap();
        let err = plan(small, &zones(&["a"])).unwrap_err();
        assert!(matches!(err, PlanError::BlockTooSmall { required: 33, .. }));

        let smallest_ok: AddressBlock = "10.0.0.0/26".parse().unwrap();
        let plan = plan(smallest_ok, &zones(&["a"])).unwrap();
        assert_eq!(plan.allocations()[0].public.prefix_len(), 32);
    }

    #[test]
    fn test_too_many_zones() {
        let names: Vec<Zone> = (0..17).map(|i| Zone::new(format!("zone-{}", i))).collect();
        let err = plan(root(), &names).unwrap_err();
        assert_eq!(err, PlanError::TooManyZones { count: 17, max: 16 });
    }

    #[test]
    fn test_duplicate_zone() {
        let err = plan(root(), &zones(&["a", "b", "a"])).unwrap_err();
        assert_eq!(err, PlanError::DuplicateZone("a".to_string()));
    }

    #[test]
    fn test_zone_levels_constant() {
        assert_eq!(ZONE_LEVELS, 4);
    }
}
