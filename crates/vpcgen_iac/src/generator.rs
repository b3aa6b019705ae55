//! End-to-end generation: options, external data, plan, assembly.

use tracing::{info, instrument};

use vpcgen_plan::plan;

use crate::assembler::{assemble, Assembly};
use crate::error::IacResult;
use crate::options::{VpcConfig, VpcOptions};
use crate::provider::{DataProviders, ExternalData};

/// Runs the generation pipeline against a set of data providers.
#[derive(Clone)]
pub struct VpcGenerator {
    providers: DataProviders,
}

impl VpcGenerator {
    pub fn new(providers: DataProviders) -> Self {
        Self { providers }
    }

    /// Validate `config` and generate. Configuration errors are raised before
    /// any provider is queried.
    pub async fn generate(&self, config: VpcConfig) -> IacResult<Assembly> {
        let options = VpcOptions::from_config(config)?;
        self.generate_with(&options).await
    }

    #[instrument(skip_all, fields(region = %options.region, cidr = %options.cidr_block))]
    pub async fn generate_with(&self, options: &VpcOptions) -> IacResult<Assembly> {
        info!("Generating network template");

        let external = ExternalData::gather(options, &self.providers).await?;
        let plan = plan(options.cidr_block, &external.zones)?;
        assemble(options, &plan, &external)
    }
}
