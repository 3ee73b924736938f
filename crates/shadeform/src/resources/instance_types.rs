//! `shadeform_instance_types` data source.

use serde::{Deserialize, Serialize};

use crate::client::{InstanceTypeInfo, ShadeformClient};
use crate::error::Result;

/// Optional filters; unset fields are not sent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstanceTypeQuery {
    pub cloud: Option<String>,
    pub region: Option<String>,
    pub num_gpus: Option<String>,
    pub gpu_type: Option<String>,
    pub shade_instance_type: Option<String>,
    pub available: Option<bool>,
    /// Sort order, e.g. `price`.
    pub sort: Option<String>,
}

impl InstanceTypeQuery {
    /// Query string pairs in a stable order.
    #[must_use]
    pub fn to_pairs(&self) -> Vec<(&'static str, String)> {
        let text = [
            ("cloud", &self.cloud),
            ("region", &self.region),
            ("num_gpus", &self.num_gpus),
            ("gpu_type", &self.gpu_type),
            ("shade_instance_type", &self.shade_instance_type),
        ];

        let mut pairs: Vec<(&'static str, String)> = text
            .into_iter()
            .filter_map(|(key, value)| value.clone().map(|v| (key, v)))
            .collect();

        if let Some(available) = self.available {
            pairs.push(("available", available.to_string()));
        }
        if let Some(sort) = &self.sort {
            pairs.push(("sort", sort.clone()));
        }
        pairs
    }
}

/// Region availability of an instance type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Availability {
    pub region: Option<String>,
    pub available: bool,
    pub display_name: Option<String>,
}

/// Expected boot time range in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BootTime {
    pub min_boot_in_sec: Option<i64>,
    pub max_boot_in_sec: Option<i64>,
}

/// An instance type as exposed to configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceType {
    pub cloud: Option<String>,
    pub region: Option<String>,
    pub shade_instance_type: Option<String>,
    pub cloud_instance_type: Option<String>,
    /// Cents per hour.
    pub hourly_price: Option<i64>,
    pub deployment_type: Option<String>,
    pub os_options: Vec<String>,
    pub availability: Vec<Availability>,
    pub boot_time: Option<BootTime>,
}

#[allow(clippy::cast_possible_truncation)]
fn whole(value: f64) -> i64 {
    value as i64
}

impl From<InstanceTypeInfo> for InstanceType {
    fn from(info: InstanceTypeInfo) -> Self {
        Self {
            cloud: info.cloud,
            region: info.region,
            shade_instance_type: info.shade_instance_type,
            cloud_instance_type: info.cloud_instance_type,
            hourly_price: info.hourly_price.map(whole),
            deployment_type: info.deployment_type,
            os_options: info
                .configuration
                .and_then(|c| c.os_options)
                .unwrap_or_default(),
            availability: info
                .availability
                .unwrap_or_default()
                .into_iter()
                .map(|a| Availability {
                    region: a.region,
                    available: a.available.unwrap_or(false),
                    display_name: a.display_name,
                })
                .collect(),
            boot_time: info.boot_time.map(|b| BootTime {
                min_boot_in_sec: b.min_boot_in_sec.map(whole),
                max_boot_in_sec: b.max_boot_in_sec.map(whole),
            }),
        }
    }
}

/// Read-only listing of purchasable instance types.
#[derive(Debug, Clone)]
pub struct InstanceTypesDataSource {
    client: ShadeformClient,
}

impl InstanceTypesDataSource {
    #[must_use]
    pub const fn new(client: ShadeformClient) -> Self {
        Self { client }
    }

    /// List instance types matching `query`.
    ///
    /// # Errors
    /// Returns error when the request fails or the response has no
    /// `instance_types` field.
    pub async fn read(&self, query: &InstanceTypeQuery) -> Result<Vec<InstanceType>> {
        let types = self.client.list_instance_types(&query.to_pairs()).await?;
        tracing::debug!(count = types.len(), "Fetched instance types");
        Ok(types.into_iter().map(InstanceType::from).collect())
    }
}
