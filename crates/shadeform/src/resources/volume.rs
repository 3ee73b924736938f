//! `shadeform_volume` resource.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::client::{CreateVolumeBody, ShadeformClient, VolumeInfo};
use crate::error::{Result, ShadeformError};

/// Desired configuration of a volume.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VolumePlan {
    pub cloud: String,
    pub region: String,
    pub name: String,
    pub size_in_gb: i64,
}

/// Recorded state of a volume.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VolumeState {
    pub id: String,
    pub cloud: String,
    pub region: String,
    pub name: String,
    pub size_in_gb: i64,
    pub fixed_size: Option<bool>,
    pub supports_multi_mount: Option<bool>,
    pub cost_estimate: Option<String>,
    /// Instance id mounting the volume.
    pub mounted_by: Option<String>,
}

impl VolumeState {
    fn apply_info(&mut self, info: VolumeInfo) {
        if let Some(cloud) = info.cloud {
            self.cloud = cloud;
        }
        if let Some(region) = info.region {
            self.region = region;
        }
        if let Some(name) = info.name {
            self.name = name;
        }
        if let Some(size) = info.size_in_gb {
            self.size_in_gb = size;
        }
        if info.fixed_size.is_some() {
            self.fixed_size = info.fixed_size;
        }
        if info.supports_multi_mount.is_some() {
            self.supports_multi_mount = info.supports_multi_mount;
        }
        if info.cost_estimate.is_some() {
            self.cost_estimate = info.cost_estimate;
        }
        self.mounted_by = info.mounted_by.filter(|m| !m.is_empty());
    }
}

/// CRUD orchestration for volumes.
#[derive(Debug, Clone)]
pub struct VolumeResource {
    client: ShadeformClient,
}

impl VolumeResource {
    #[must_use]
    pub const fn new(client: ShadeformClient) -> Self {
        Self { client }
    }

    /// Create a volume and read back its computed fields.
    ///
    /// # Errors
    /// Returns error when the create call or the follow-up read fails.
    pub async fn create(&self, plan: &VolumePlan) -> Result<VolumeState> {
        let body = CreateVolumeBody {
            cloud: plan.cloud.clone(),
            region: plan.region.clone(),
            name: plan.name.clone(),
            size_in_gb: plan.size_in_gb,
        };
        let id = self.client.create_volume(&body).await?;

        let info = self.client.get_volume(&id).await?;
        let mut state = VolumeState {
            id,
            cloud: plan.cloud.clone(),
            region: plan.region.clone(),
            name: plan.name.clone(),
            size_in_gb: plan.size_in_gb,
            ..VolumeState::default()
        };
        state.apply_info(info);

        info!(volume_id = %state.id, size_in_gb = state.size_in_gb, "Volume created");
        Ok(state)
    }

    /// Refresh state. `None` means the volume no longer exists.
    ///
    /// # Errors
    /// Returns error on any failure other than not-found.
    pub async fn read(&self, prior: &VolumeState) -> Result<Option<VolumeState>> {
        match self.client.get_volume(&prior.id).await {
            Ok(info) => {
                let mut state = prior.clone();
                state.apply_info(info);
                Ok(Some(state))
            }
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Volumes have no update endpoint; the planned values are recorded
    /// without any API call.
    #[allow(clippy::unused_self)]
    #[must_use]
    pub fn update(&self, prior: &VolumeState, plan: &VolumePlan) -> VolumeState {
        if plan.size_in_gb != prior.size_in_gb
            || plan.cloud != prior.cloud
            || plan.region != prior.region
        {
            warn!(volume_id = %prior.id, "Volume changes are not applied remotely");
        }
        VolumeState {
            cloud: plan.cloud.clone(),
            region: plan.region.clone(),
            name: plan.name.clone(),
            size_in_gb: plan.size_in_gb,
            ..prior.clone()
        }
    }

    /// Delete a volume that no instance has mounted.
    ///
    /// # Errors
    /// Returns [`ShadeformError::VolumeMounted`] while an instance uses it.
    pub async fn delete(&self, id: &str) -> Result<()> {
        let info = self.client.get_volume(id).await?;

        if let Some(instance) = info.mounted_by.filter(|m| !m.is_empty()) {
            return Err(ShadeformError::VolumeMounted {
                id: id.to_string(),
                instance,
            });
        }

        self.client.delete_volume(id).await
    }

    /// Adopt an existing volume by id.
    ///
    /// # Errors
    /// Returns [`ShadeformError::NotFound`] when no such volume exists.
    pub async fn import(&self, id: &str) -> Result<VolumeState> {
        let info = self.client.get_volume(id).await?;
        let mut state = VolumeState {
            id: id.to_string(),
            ..VolumeState::default()
        };
        state.apply_info(info);
        Ok(state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_info_clears_empty_mount() {
        let mut state = VolumeState {
            id: "vol-1".to_string(),
            mounted_by: Some("inst-1".to_string()),
            ..VolumeState::default()
        };

        state.apply_info(VolumeInfo {
            mounted_by: Some(String::new()),
            size_in_gb: Some(250),
            ..VolumeInfo::default()
        });

        assert!(state.mounted_by.is_none());
        assert_eq!(state.size_in_gb, 250);
    }
}
