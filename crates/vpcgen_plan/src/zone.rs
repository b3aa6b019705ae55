//! Zones and subnet tiers.

use std::fmt;

use serde::{Deserialize, Serialize};

/// An availability zone identifier. Opaque; only its position in the zone
/// list carries meaning.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Zone(String);

impl Zone {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Zone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Zone {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for Zone {
    fn from(name: String) -> Self {
        Self(name)
    }
}

/// Subnet category. Each zone receives at most one block per tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubnetTier {
    /// Private compute subnets.
    Application,
    /// Internet-facing subnets.
    Public,
    /// Data-layer subnets with no route to the internet.
    Database,
}

impl SubnetTier {
    /// Label used as the prefix of every resource name derived from the tier.
    pub fn label(&self) -> &'static str {
        match self {
            SubnetTier::Application => "App",
            SubnetTier::Public => "Public",
            SubnetTier::Database => "DB",
        }
    }

    pub fn all() -> [Self; 3] {
        [SubnetTier::Application, SubnetTier::Public, SubnetTier::Database]
    }

    pub fn is_public(&self) -> bool {
        matches!(self, SubnetTier::Public)
    }
}

impl fmt::Display for SubnetTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tier_labels() {
        assert_eq!(SubnetTier::Application.label(), "App");
        assert_eq!(SubnetTier::Public.label(), "Public");
        assert_eq!(SubnetTier::Database.label(), "DB");
        assert!(SubnetTier::Public.is_public());
        assert!(!SubnetTier::Database.is_public());
    }

    #[test]
    fn test_zone_display() {
        let zone = Zone::from("us-east-1a");
        assert_eq!(zone.to_string(), "us-east-1a");
        assert_eq!(zone.as_str(), "us-east-1a");
    }
}
