//! Static inventory provider.
//!
//! Implements every provider trait from a fixed data set, either built in
//! code or loaded from YAML. Used for offline generation and in tests; every
//! lookup is recorded so callers can verify which lookups a run performed.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::debug;

use vpcgen_plan::Zone;

use crate::builders::endpoint::canonical_service_name;
use crate::error::{IacError, IacResult};
use crate::provider::{ImageProvider, MachineImage, ServiceCatalog, ZoneProvider};

/// Lifecycle state of a zone.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ZoneState {
    #[default]
    Available,
    Impaired,
    Unavailable,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZoneRecord {
    pub name: String,
    #[serde(default)]
    pub state: ZoneState,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionInventory {
    #[serde(default)]
    pub zones: Vec<ZoneRecord>,
    /// Canonical endpoint service names.
    #[serde(default)]
    pub endpoint_services: Vec<String>,
}

/// Serialized form of an inventory file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryData {
    #[serde(default)]
    pub regions: BTreeMap<String, RegionInventory>,
    #[serde(default)]
    pub images: Vec<MachineImage>,
}

/// A recorded provider lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LookupCall {
    pub method: String,
    pub argument: String,
}

#[derive(Clone, Default)]
pub struct StaticInventory {
    data: Arc<RwLock<InventoryData>>,
    calls: Arc<RwLock<Vec<LookupCall>>>,
    /// Simulated failure returned by every lookup.
    failure: Arc<RwLock<Option<String>>>,
}

impl StaticInventory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_data(data: InventoryData) -> Self {
        Self {
            data: Arc::new(RwLock::new(data)),
            ..Self::default()
        }
    }

    /// Load an inventory from a YAML file.
    pub fn from_file(path: &Path) -> IacResult<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
    }

    pub fn from_yaml_str(content: &str) -> IacResult<Self> {
        let data: InventoryData = serde_yaml::from_str(content)?;
        debug!(
            "Loaded inventory with {} regions and {} images",
            data.regions.len(),
            data.images.len()
        );
        Ok(Self::from_data(data))
    }

    /// Add available zones to `region`.
    pub fn with_zones<I, S>(self, region: &str, zones: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        {
            let mut data = self.data.write();
            let entry = data.regions.entry(region.to_string()).or_default();
            entry.zones.extend(zones.into_iter().map(|name| ZoneRecord {
                name: name.into(),
                state: ZoneState::Available,
            }));
        }
        self
    }

    /// Add a zone in a state other than available.
    pub fn with_zone_state(self, region: &str, zone: impl Into<String>, state: ZoneState) -> Self {
        self.data
            .write()
            .regions
            .entry(region.to_string())
            .or_default()
            .zones
            .push(ZoneRecord { name: zone.into(), state });
        self
    }

    /// Offer services of the cloud provider in `region`, by short name.
    pub fn with_services<I, S>(self, region: &str, services: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        {
            let mut data = self.data.write();
            let entry = data.regions.entry(region.to_string()).or_default();
            entry.endpoint_services.extend(
                services
                    .into_iter()
                    .map(|service| canonical_service_name(region, service.as_ref())),
            );
        }
        self
    }

    pub fn with_image(self, image: MachineImage) -> Self {
        self.data.write().images.push(image);
        self
    }

    /// Make every subsequent lookup fail with `message`.
    pub fn simulate_failure(self, message: impl Into<String>) -> Self {
        *self.failure.write() = Some(message.into());
        self
    }

    pub fn calls(&self) -> Vec<LookupCall> {
        self.calls.read().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.read().len()
    }

    pub fn was_called(&self, method: &str) -> bool {
        self.calls.read().iter().any(|c| c.method == method)
    }

    pub fn clear_calls(&self) {
        self.calls.write().clear();
    }

    fn record_call(&self, method: &str, argument: &str) {
        self.calls.write().push(LookupCall {
            method: method.to_string(),
            argument: argument.to_string(),
        });
    }

    fn check_failure(&self) -> IacResult<()> {
        if let Some(message) = self.failure.read().clone() {
            return Err(IacError::Provider(message));
        }
        Ok(())
    }
}

#[async_trait]
impl ZoneProvider for StaticInventory {
    async fn available_zones(&self, region: &str) -> IacResult<Vec<Zone>> {
        self.record_call("available_zones", region);
        self.check_failure()?;

        let data = self.data.read();
        let mut zones: Vec<Zone> = data
            .regions
            .get(region)
            .map(|r| {
                r.zones
                    .iter()
                    .filter(|z| z.state == ZoneState::Available)
                    .map(|z| Zone::new(z.name.clone()))
                    .collect()
            })
            .unwrap_or_default();
        zones.sort();
        zones.dedup();
        Ok(zones)
    }
}

#[async_trait]
impl ImageProvider for StaticInventory {
    async fn find_images(&self, name_pattern: &str) -> IacResult<Vec<MachineImage>> {
        self.record_call("find_images", name_pattern);
        self.check_failure()?;

        let pattern = glob::Pattern::new(name_pattern)
            .map_err(|e| IacError::Provider(format!("invalid image pattern '{}': {}", name_pattern, e)))?;

        let mut images: Vec<MachineImage> = self
            .data
            .read()
            .images
            .iter()
            .filter(|image| pattern.matches(&image.name))
            .cloned()
            .collect();
        images.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(images)
    }
}

#[async_trait]
impl ServiceCatalog for StaticInventory {
    async fn endpoint_services(&self, region: &str) -> IacResult<Vec<String>> {
        self.record_call("endpoint_services", region);
        self.check_failure()?;

        let mut services = self
            .data
            .read()
            .regions
            .get(region)
            .map(|r| r.endpoint_services.clone())
            .unwrap_or_default();
        services.sort();
        services.dedup();
        Ok(services)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn image(id: &str, name: &str, year: i32) -> MachineImage {
        MachineImage {
            image_id: id.to_string(),
            name: name.to_string(),
            created_at: Utc.with_ymd_and_hms(year, 6, 1, 0, 0, 0).unwrap(),
        }
    }

    #[tokio::test]
    async fn test_zones_sorted_and_available_only() {
        let inventory = StaticInventory::new()
            .with_zones("eu-west-1", ["eu-west-1c", "eu-west-1a"])
            .with_zone_state("eu-west-1", "eu-west-1b", ZoneState::Impaired);

        let zones = inventory.available_zones("eu-west-1").await.unwrap();
        assert_eq!(zones, vec![Zone::from("eu-west-1a"), Zone::from("eu-west-1c")]);
        assert!(inventory.available_zones("us-west-2").await.unwrap().is_empty());
        assert_eq!(inventory.call_count(), 2);
    }

    #[tokio::test]
    async fn test_images_match_pattern_newest_first() {
        let inventory = StaticInventory::new()
            .with_image(image("ami-1", "amzn-ami-vpc-nat-2018.03", 2018))
            .with_image(image("ami-2", "amzn-ami-vpc-nat-2020.09", 2020))
            .with_image(image("ami-3", "amzn2-ami-hvm-2.0-x86_64-ebs", 2023));

        let images = inventory.find_images("amzn-ami-vpc-nat-*").await.unwrap();
        let ids: Vec<&str> = images.iter().map(|i| i.image_id.as_str()).collect();
        assert_eq!(ids, vec!["ami-2", "ami-1"]);

        let calls = inventory.calls();
        assert_eq!(calls[0].method, "find_images");
        assert_eq!(calls[0].argument, "amzn-ami-vpc-nat-*");
    }

    #[tokio::test]
    async fn test_invalid_pattern() {
        let err = StaticInventory::new().find_images("[").await.unwrap_err();
        assert!(matches!(err, IacError::Provider(_)));
    }

    #[tokio::test]
    async fn test_services_are_canonical() {
        let inventory = StaticInventory::new().with_services("us-east-1", ["s3", "kms"]);
        let services = inventory.endpoint_services("us-east-1").await.unwrap();
        assert_eq!(
            services,
            vec![
                "com.amazonaws.us-east-1.kms".to_string(),
                "com.amazonaws.us-east-1.s3".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn test_simulated_failure() {
        let inventory = StaticInventory::new().simulate_failure("offline");
        let err = inventory.available_zones("us-east-1").await.unwrap_err();
        assert_eq!(err.to_string(), "Data provider error: offline");
        assert!(inventory.was_called("available_zones"));
    }

    #[tokio::test]
    async fn test_clear_calls() {
        let inventory = StaticInventory::new().with_zones("us-east-1", ["us-east-1a"]);
        inventory.available_zones("us-east-1").await.unwrap();
        assert_eq!(inventory.call_count(), 1);

        inventory.clear_calls();
        assert_eq!(inventory.call_count(), 0);
        assert!(!inventory.was_called("available_zones"));
    }

    #[test]
    fn test_from_yaml() {
        let yaml = r#"
regions:
  us-east-1:
    zones:
      - name: us-east-1a
      - name: us-east-1b
        state: unavailable
    endpoint_services:
      - com.amazonaws.us-east-1.s3
images:
  - image_id: ami-0abc
    name: amzn2-ami-hvm-2.0.20240101-x86_64-ebs
    created_at: "2024-01-01T00:00:00Z"
"#;
        let inventory = StaticInventory::from_yaml_str(yaml).unwrap();
        let data = inventory.data.read();
        let region = &data.regions["us-east-1"];
        assert_eq!(region.zones.len(), 2);
        assert_eq!(region.zones[0].state, ZoneState::Available);
        assert_eq!(region.zones[1].state, ZoneState::Unavailable);
        assert_eq!(data.images[0].image_id, "ami-0abc");
    }
}
