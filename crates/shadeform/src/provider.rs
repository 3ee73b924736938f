//! Provider entry point: configuration and resource registry.

use crate::client::ShadeformClient;
use crate::config::ProviderConfig;
use crate::error::Result;
use crate::resources::{InstanceResource, InstanceTypesDataSource, VolumeResource};

/// Resource type name for instances.
pub const INSTANCE_RESOURCE: &str = "shadeform_instance";

/// Resource type name for volumes.
pub const VOLUME_RESOURCE: &str = "shadeform_volume";

/// Data source type name for instance types.
pub const INSTANCE_TYPES_DATA_SOURCE: &str = "shadeform_instance_types";

/// Unconfigured provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShadeformProvider {
    version: String,
}

impl Default for ShadeformProvider {
    fn default() -> Self {
        Self::new(option_env!("SHADEFORM_VERSION").unwrap_or("dev"))
    }
}

impl ShadeformProvider {
    /// Provider type name.
    pub const TYPE_NAME: &'static str = "shadeform";

    #[must_use]
    pub fn new(version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
        }
    }

    #[must_use]
    pub fn version(&self) -> &str {
        &self.version
    }

    #[allow(clippy::unused_self)]
    #[must_use]
    pub const fn resource_types(&self) -> [&'static str; 2] {
        [INSTANCE_RESOURCE, VOLUME_RESOURCE]
    }

    #[allow(clippy::unused_self)]
    #[must_use]
    pub const fn data_source_types(&self) -> [&'static str; 1] {
        [INSTANCE_TYPES_DATA_SOURCE]
    }

    /// Validate configuration without building a client.
    ///
    /// # Errors
    /// Returns [`crate::ShadeformError::Config`] for a missing API key, a
    /// non-http base URL or a zero interval/timeout.
    #[allow(clippy::unused_self)]
    pub fn validate_config(&self, config: &ProviderConfig) -> Result<()> {
        config.validate()
    }

    /// Build the shared client and hand it to every resource.
    ///
    /// # Errors
    /// Returns error when validation fails or the HTTP client cannot be built.
    pub fn configure(&self, config: ProviderConfig) -> Result<ConfiguredProvider> {
        let client = ShadeformClient::new(&config)?;
        tracing::info!(
            version = %self.version,
            base_url = %client.base_url(),
            "Shadeform provider configured"
        );
        Ok(ConfiguredProvider { client, config })
    }
}

/// Provider with a validated configuration and a ready client.
#[derive(Debug, Clone)]
pub struct ConfiguredProvider {
    client: ShadeformClient,
    config: ProviderConfig,
}

impl ConfiguredProvider {
    #[must_use]
    pub const fn client(&self) -> &ShadeformClient {
        &self.client
    }

    #[must_use]
    pub const fn config(&self) -> &ProviderConfig {
        &self.config
    }

    #[must_use]
    pub fn instances(&self) -> InstanceResource {
        InstanceResource::new(self.client.clone(), &self.config)
    }

    #[must_use]
    pub fn volumes(&self) -> VolumeResource {
        VolumeResource::new(self.client.clone())
    }

    #[must_use]
    pub fn instance_types(&self) -> InstanceTypesDataSource {
        InstanceTypesDataSource::new(self.client.clone())
    }
}
