//! Shadeform API wire models.
//!
//! Response fields are optional and unknown fields are ignored; the API adds
//! fields over time and some are only present for certain clouds.

use serde::{Deserialize, Deserializer, Serialize};

// ============================================================================
// Instances
// ============================================================================

/// Request body for `POST /instances/create`.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct CreateInstanceBody {
    /// Underlying cloud provider.
    pub cloud: String,
    /// Region to deploy into.
    pub region: String,
    /// Shadeform standardized instance type.
    pub shade_instance_type: String,
    /// Use Shade Cloud rather than a linked cloud account.
    pub shade_cloud: bool,
    /// Instance name.
    pub name: String,
    /// Operating system image.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub os: Option<String>,
    /// Launch template.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template_id: Option<String>,
    /// SSH key to install.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ssh_key_id: Option<String>,
    /// Volumes to mount.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub volume_ids: Option<Vec<String>>,
}

/// Request body for `POST /instances/{id}/update`.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct UpdateInstanceBody {
    /// New instance name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl UpdateInstanceBody {
    /// True when there is nothing to send.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.name.is_none()
    }
}

/// Response of the create endpoints; only the id is relied upon.
#[derive(Debug, Deserialize)]
pub struct CreatedResource {
    /// Remote identifier.
    #[serde(default)]
    pub id: Option<String>,
}

/// Instance as returned by `GET /instances/{id}/info`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct InstanceInfo {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub cloud: Option<String>,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub shade_instance_type: Option<String>,
    #[serde(default)]
    pub shade_cloud: Option<bool>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub os: Option<String>,
    #[serde(default)]
    pub template_id: Option<String>,
    #[serde(default)]
    pub ssh_key_id: Option<String>,
    #[serde(default)]
    pub volume_ids: Option<Vec<String>>,
    #[serde(default)]
    pub cloud_instance_type: Option<String>,
    #[serde(default)]
    pub cloud_assigned_id: Option<String>,
    #[serde(default)]
    pub ip: Option<String>,
    #[serde(default)]
    pub ssh_user: Option<String>,
    #[serde(default)]
    pub ssh_port: Option<i64>,
    /// Lifecycle status, e.g. `pending` or `active`.
    #[serde(default)]
    pub status: Option<String>,
    /// Free-form explanation accompanying the status, mostly for `error`.
    #[serde(default)]
    pub status_details: Option<String>,
    #[serde(default, deserialize_with = "string_or_number")]
    pub cost_estimate: Option<String>,
    #[serde(default, deserialize_with = "string_or_number")]
    pub hourly_price: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
}

// ============================================================================
// Volumes
// ============================================================================

/// Request body for `POST /volumes/create`.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct CreateVolumeBody {
    pub cloud: String,
    pub region: String,
    pub name: String,
    pub size_in_gb: i64,
}

/// Volume as returned by `GET /volumes/{id}/info`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct VolumeInfo {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub cloud: Option<String>,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub size_in_gb: Option<i64>,
    #[serde(default)]
    pub fixed_size: Option<bool>,
    #[serde(default)]
    pub supports_multi_mount: Option<bool>,
    #[serde(default, deserialize_with = "string_or_number")]
    pub cost_estimate: Option<String>,
    /// Instance id currently mounting the volume; null or empty when free.
    #[serde(default)]
    pub mounted_by: Option<String>,
}

// ============================================================================
// Instance types
// ============================================================================

/// Response of `GET /instances/types`.
#[derive(Debug, Deserialize)]
pub struct InstanceTypesResponse {
    /// Absent only on malformed responses.
    #[serde(default)]
    pub instance_types: Option<Vec<InstanceTypeInfo>>,
}

/// One purchasable instance type.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct InstanceTypeInfo {
    #[serde(default)]
    pub cloud: Option<String>,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub shade_instance_type: Option<String>,
    #[serde(default)]
    pub cloud_instance_type: Option<String>,
    /// Price in cents per hour.
    #[serde(default)]
    pub hourly_price: Option<f64>,
    #[serde(default)]
    pub deployment_type: Option<String>,
    #[serde(default)]
    pub configuration: Option<InstanceTypeConfiguration>,
    #[serde(default)]
    pub availability: Option<Vec<AvailabilityInfo>>,
    #[serde(default)]
    pub boot_time: Option<BootTimeInfo>,
}

/// Hardware configuration of an instance type.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct InstanceTypeConfiguration {
    #[serde(default)]
    pub os_options: Option<Vec<String>>,
    #[serde(default)]
    pub gpu_type: Option<String>,
    #[serde(default)]
    pub num_gpus: Option<u32>,
}

/// Per-region availability of an instance type.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AvailabilityInfo {
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub available: Option<bool>,
    #[serde(default)]
    pub display_name: Option<String>,
}

/// Expected boot duration range.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BootTimeInfo {
    #[serde(default)]
    pub min_boot_in_sec: Option<f64>,
    #[serde(default)]
    pub max_boot_in_sec: Option<f64>,
}

/// Prices come back as strings from some endpoints and numbers from others.
fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Number(serde_json::Number),
    }

    Ok(Option::<Raw>::deserialize(deserializer)?.map(|raw| match raw {
        Raw::Text(s) => s,
        Raw::Number(n) => n.to_string(),
    }))
}
