//! External data providers.
//!
//! Zone, image, and endpoint-service lookups are the only inputs that do not
//! come from configuration. They sit behind traits so a cloud-backed
//! implementation, the [`StaticInventory`](crate::inventory::StaticInventory),
//! or a test double can be plugged in.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use vpcgen_plan::Zone;

use crate::error::{IacError, IacResult};
use crate::options::{NatMode, VpcOptions};

/// Name pattern of the NAT instance image family.
pub const NAT_IMAGE_PATTERN: &str = "amzn-ami-vpc-nat-*";

/// Name pattern of the bastion image family.
pub const BASTION_IMAGE_PATTERN: &str = "amzn2-ami-hvm-*-x86_64-ebs";

/// A machine image returned by an [`ImageProvider`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MachineImage {
    pub image_id: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

/// Availability-zone lookup.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ZoneProvider: Send + Sync {
    /// Zones of `region` currently accepting resources, sorted by name.
    async fn available_zones(&self, region: &str) -> IacResult<Vec<Zone>>;
}

/// Machine image lookup.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ImageProvider: Send + Sync {
    /// Images whose name matches the glob `name_pattern`, newest first.
    async fn find_images(&self, name_pattern: &str) -> IacResult<Vec<MachineImage>>;
}

/// Regional catalog of private-endpoint services.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ServiceCatalog: Send + Sync {
    /// Canonical names of the endpoint services offered in `region`.
    async fn endpoint_services(&self, region: &str) -> IacResult<Vec<String>>;
}

/// The three providers a generation run needs.
#[derive(Clone)]
pub struct DataProviders {
    pub zones: Arc<dyn ZoneProvider>,
    pub images: Arc<dyn ImageProvider>,
    pub services: Arc<dyn ServiceCatalog>,
}

impl DataProviders {
    pub fn new(
        zones: Arc<dyn ZoneProvider>,
        images: Arc<dyn ImageProvider>,
        services: Arc<dyn ServiceCatalog>,
    ) -> Self {
        Self { zones, images, services }
    }

    /// Use a single value implementing every provider trait.
    pub fn from_single<P>(provider: Arc<P>) -> Self
    where
        P: ZoneProvider + ImageProvider + ServiceCatalog + 'static,
    {
        Self {
            zones: provider.clone(),
            images: provider.clone(),
            services: provider,
        }
    }
}

/// Everything fetched from providers for one run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExternalData {
    /// Zones to plan, configured or discovered.
    pub zones: Vec<Zone>,
    /// Newest NAT image, looked up only in NAT instance mode.
    pub nat_image: Option<MachineImage>,
    /// Newest bastion image, looked up only when a bastion is requested.
    pub bastion_image: Option<MachineImage>,
    /// Service catalog of the region, fetched only when endpoints are requested.
    pub endpoint_services: Vec<String>,
}

impl ExternalData {
    /// Perform the lookups `options` require, concurrently.
    ///
    /// Lookups that the options make unnecessary are skipped entirely.
    pub async fn gather(options: &VpcOptions, providers: &DataProviders) -> IacResult<Self> {
        let region = options.region.as_str();

        let zones = async {
            match &options.zones {
                Some(zones) => Ok::<_, IacError>(zones.clone()),
                None => {
                    let zones = providers.zones.available_zones(region).await?;
                    debug!("Discovered {} zones in {}", zones.len(), region);
                    Ok(zones)
                }
            }
        };

        let nat_image = async {
            if options.nat == NatMode::Instance {
                newest_image(providers, NAT_IMAGE_PATTERN).await
            } else {
                Ok(None)
            }
        };

        let bastion_image = async {
            if options.bastion.is_some() {
                newest_image(providers, BASTION_IMAGE_PATTERN).await
            } else {
                Ok(None)
            }
        };

        let endpoint_services = async {
            if options.services.is_empty() {
                Ok(Vec::new())
            } else {
                providers.services.endpoint_services(region).await
            }
        };

        let (zones, nat_image, bastion_image, endpoint_services) =
            tokio::try_join!(zones, nat_image, bastion_image, endpoint_services)?;

        info!("Gathered external data for {} ({} zones)", region, zones.len());

        Ok(Self {
            zones,
            nat_image,
            bastion_image,
            endpoint_services,
        })
    }
}

async fn newest_image(providers: &DataProviders, pattern: &str) -> IacResult<Option<MachineImage>> {
    let image = providers.images.find_images(pattern).await?.into_iter().next();
    match &image {
        Some(image) => debug!("Image {} ({}) matches {}", image.image_id, image.name, pattern),
        None => debug!("No image matches {}", pattern),
    }
    Ok(image)
}
