//! IPv4 address blocks in CIDR notation.

use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{PlanError, PlanResult};

/// A contiguous, power-of-two sized IPv4 range.
///
/// Invariants:
/// - prefix length is at most 32
/// - no host bits are set in the base address
///
/// ```rust
/// use vpcgen_plan::AddressBlock;
///
/// let block: AddressBlock = "10.0.0.0/16".parse().unwrap();
/// let (low, high) = block.split().unwrap();
/// assert_eq!(low.to_string(), "10.0.0.0/17");
/// assert_eq!(high.to_string(), "10.0.128.0/17");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AddressBlock {
    base: Ipv4Addr,
    prefix_len: u8,
}

impl AddressBlock {
    pub const MAX_PREFIX: u8 = 32;

    /// Create a block, rejecting prefixes above /32 and misaligned bases.
    pub fn new(base: Ipv4Addr, prefix_len: u8) -> PlanResult<Self> {
        if prefix_len > Self::MAX_PREFIX {
            return Err(PlanError::InvalidBlock(format!(
                "{}/{}: prefix length must be <= 32",
                base, prefix_len
            )));
        }

        if u32::from(base) & !mask(prefix_len) != 0 {
            return Err(PlanError::Misaligned(format!("{}/{}", base, prefix_len)));
        }

        Ok(Self { base, prefix_len })
    }

    pub fn base(&self) -> Ipv4Addr {
        self.base
    }

    pub fn prefix_len(&self) -> u8 {
        self.prefix_len
    }

    /// Number of addresses covered by the block.
    pub fn size(&self) -> u64 {
        1u64 << (Self::MAX_PREFIX - self.prefix_len)
    }

    /// Last address in the block.
    pub fn last(&self) -> Ipv4Addr {
        Ipv4Addr::from(u32::from(self.base) | !mask(self.prefix_len))
    }

    /// Split into two equal halves in ascending address order.
    ///
    /// Returns `None` for a /32, which cannot be halved.
    pub fn split(&self) -> Option<(Self, Self)> {
        if self.prefix_len >= Self::MAX_PREFIX {
            return None;
        }

        let child_prefix = self.prefix_len + 1;
        let low = Self {
            base: self.base,
            prefix_len: child_prefix,
        };
        let high = Self {
            base: Ipv4Addr::from(u32::from(self.base) | (1u32 << (Self::MAX_PREFIX - child_prefix))),
            prefix_len: child_prefix,
        };
        Some((low, high))
    }

    /// Halve the block `levels` times, returning `2^levels` children in
    /// ascending order.
    ///
    /// Subdivision is always binary: each child is the result of repeated
    /// halving, never a direct k-way cut.
    pub fn subdivide(&self, levels: u8) -> Option<Vec<Self>> {
        if levels == 0 {
            return Some(vec![*self]);
        }

        let (low, high) = self.split()?;
        let mut children = low.subdivide(levels - 1)?;
        children.extend(high.subdivide(levels - 1)?);
        Some(children)
    }

    /// Whether `other` lies entirely inside this block.
    pub fn contains(&self, other: &AddressBlock) -> bool {
        other.prefix_len >= self.prefix_len
            && u32::from(other.base) & mask(self.prefix_len) == u32::from(self.base)
    }

    pub fn overlaps(&self, other: &AddressBlock) -> bool {
        self.contains(other) || other.contains(self)
    }
}

fn mask(prefix_len: u8) -> u32 {
    if prefix_len == 0 {
        0
    } else {
        u32::MAX << (AddressBlock::MAX_PREFIX - prefix_len)
    }
}

impl fmt::Display for AddressBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.base, self.prefix_len)
    }
}

impl FromStr for AddressBlock {
    type Err = PlanError;

    fn from_str(s: &str) -> PlanResult<Self> {
        let (addr, prefix) = s
            .trim()
            .split_once('/')
            .ok_or_else(|| PlanError::InvalidBlock(format!("{}: expected <address>/<prefix>", s)))?;

        let base = addr
            .parse::<Ipv4Addr>()
            .map_err(|e| PlanError::InvalidBlock(format!("{}: {}", s, e)))?;

        let prefix_len = prefix
            .parse::<u8>()
            .map_err(|e| PlanError::InvalidBlock(format!("{}: invalid prefix length: {}", s, e)))?;

        Self::new(base, prefix_len)
    }
}

impl TryFrom<String> for AddressBlock {
    type Error = PlanError;

    fn try_from(value: String) -> PlanResult<Self> {
        value.parse()
    }
}

impl From<AddressBlock> for String {
    fn from(block: AddressBlock) -> Self {
        block.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_display() {
        let block: AddressBlock = "10.0.0.0/16".parse().unwrap();
        assert_eq!(block.base(), Ipv4Addr::new(10, 0, 0, 0));
        assert_eq!(block.prefix_len(), 16);
        assert_eq!(block.to_string(), "10.0.0.0/16");
        assert_eq!(block.size(), 65536);
        assert_eq!(block.last(), Ipv4Addr::new(10, 0, 255, 255));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(matches!(
            "10.0.0.0".parse::<AddressBlock>(),
            Err(PlanError::InvalidBlock(_))
        ));
        assert!(matches!(
            "10.0.0.0/33".parse::<AddressBlock>(),
            Err(PlanError::InvalidBlock(_))
        ));
        assert!(matches!(
            "10.0.0.300/16".parse::<AddressBlock>(),
            Err(PlanError::InvalidBlock(_))
        ));
    }

    #[test]
    fn test_parse_rejects_host_bits() {
        assert!(matches!(
            "10.0.0.1/16".parse::<AddressBlock>(),
            Err(PlanError::Misaligned(_))
        ));
    }

    #[test]
    fn test_split_halves() {
        let block: AddressBlock = "10.0.16.0/20".parse().unwrap();
        let (low, high) = block.split().unwrap();
        assert_eq!(low.to_string(), "10.0.16.0/21");
        assert_eq!(high.to_string(), "10.0.24.0/21");
        assert!(block.contains(&low));
        assert!(block.contains(&high));
        assert!(!low.overlaps(&high));
    }

    #[test]
    fn test_split_host_route() {
        let block: AddressBlock = "10.0.0.1/32".parse().unwrap();
        assert!(block.split().is_none());
        assert!(block.subdivide(1).is_none());
    }

    #[test]
    fn test_subdivide_is_ascending() {
        let block: AddressBlock = "10.0.0.0/16".parse().unwrap();
        let children = block.subdivide(4).unwrap();
        assert_eq!(children.len(), 16);
        assert_eq!(children[0].to_string(), "10.0.0.0/20");
        assert_eq!(children[1].to_string(), "10.0.16.0/20");
        assert_eq!(children[15].to_string(), "10.0.240.0/20");
        assert!(children.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_serde_uses_cidr_string() {
        let block: AddressBlock = "192.168.0.0/24".parse().unwrap();
        let json = serde_json::to_string(&block).unwrap();
        assert_eq!(json, "\"192.168.0.0/24\"");
        let back: AddressBlock = serde_json::from_str(&json).unwrap();
        assert_eq!(back, block);
    }
}
