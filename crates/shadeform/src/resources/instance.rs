//! `shadeform_instance` resource.
//!
//! Creation is the only operation with temporal behaviour: after the create
//! call is accepted the instance is polled until it is active. When the wait
//! times out the half-provisioned instance is deleted on a best-effort basis
//! so it does not keep billing.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::client::{CreateInstanceBody, InstanceInfo, ShadeformClient, UpdateInstanceBody};
use crate::config::{ProviderConfig, DEFAULT_CREATE_TIMEOUT, DEFAULT_POLL_INTERVAL};
use crate::error::{Result, ShadeformError};
use crate::poller::{await_ready, PollOutcome, PollSettings, ResourceHandle, StatusFetcher};

/// Instance endpoints used by [`InstanceResource`].
#[async_trait]
pub trait InstanceApi: StatusFetcher {
    /// Launch an instance, returning its id.
    async fn create_instance(&self, body: &CreateInstanceBody) -> Result<String>;

    /// Fetch an instance by id.
    async fn get_instance(&self, id: &str) -> Result<InstanceInfo>;

    /// Apply in-place changes.
    async fn update_instance(&self, id: &str, body: &UpdateInstanceBody) -> Result<()>;

    /// Delete an instance.
    async fn delete_instance(&self, id: &str) -> Result<()>;
}

#[async_trait]
impl InstanceApi for ShadeformClient {
    async fn create_instance(&self, body: &CreateInstanceBody) -> Result<String> {
        Self::create_instance(self, body).await
    }

    async fn get_instance(&self, id: &str) -> Result<InstanceInfo> {
        Self::get_instance(self, id).await
    }

    async fn update_instance(&self, id: &str, body: &UpdateInstanceBody) -> Result<()> {
        Self::update_instance(self, id, body).await
    }

    async fn delete_instance(&self, id: &str) -> Result<()> {
        Self::delete_instance(self, id).await
    }
}

/// Desired configuration of an instance.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstancePlan {
    pub cloud: String,
    pub region: String,
    pub shade_instance_type: String,
    /// Usually true; false deploys through a linked cloud account.
    pub shade_cloud: bool,
    pub name: String,
    pub os: Option<String>,
    pub ssh_key_id: Option<String>,
    pub template_id: Option<String>,
    /// The API mounts at most one volume at launch.
    pub volume_ids: Option<Vec<String>>,
    /// Overrides the provider-wide create timeout.
    pub create_timeout: Option<Duration>,
}

impl InstancePlan {
    fn to_create_body(&self) -> CreateInstanceBody {
        CreateInstanceBody {
            cloud: self.cloud.clone(),
            region: self.region.clone(),
            shade_instance_type: self.shade_instance_type.clone(),
            shade_cloud: self.shade_cloud,
            name: self.name.clone(),
            os: self.os.clone(),
            template_id: self.template_id.clone(),
            ssh_key_id: self.ssh_key_id.clone(),
            volume_ids: self.volume_ids.clone().filter(|ids| !ids.is_empty()),
        }
    }
}

/// Recorded state of an instance.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceState {
    pub id: String,
    pub cloud: String,
    pub region: String,
    pub shade_instance_type: String,
    pub shade_cloud: bool,
    pub name: String,
    pub os: Option<String>,
    pub ssh_key_id: Option<String>,
    pub template_id: Option<String>,
    pub volume_ids: Option<Vec<String>>,
    pub cloud_instance_type: Option<String>,
    pub cloud_assigned_id: Option<String>,
    pub ip: Option<String>,
    pub ssh_user: Option<String>,
    pub ssh_port: Option<i64>,
    pub status: Option<String>,
    pub cost_estimate: Option<String>,
    pub hourly_price: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
}

impl InstanceState {
    fn from_plan(id: &str, plan: &InstancePlan) -> Self {
        Self {
            id: id.to_string(),
            cloud: plan.cloud.clone(),
            region: plan.region.clone(),
            shade_instance_type: plan.shade_instance_type.clone(),
            shade_cloud: plan.shade_cloud,
            name: plan.name.clone(),
            os: plan.os.clone(),
            ssh_key_id: plan.ssh_key_id.clone(),
            template_id: plan.template_id.clone(),
            volume_ids: plan.volume_ids.clone(),
            ..Self::default()
        }
    }

    /// Overlay the API view. Required fields keep their current value when
    /// the API omits them; everything else mirrors the API exactly.
    fn apply_info(&mut self, info: InstanceInfo) {
        if let Some(cloud) = info.cloud {
            self.cloud = cloud;
        }
        if let Some(region) = info.region {
            self.region = region;
        }
        if let Some(shade_instance_type) = info.shade_instance_type {
            self.shade_instance_type = shade_instance_type;
        }
        if let Some(shade_cloud) = info.shade_cloud {
            self.shade_cloud = shade_cloud;
        }
        if let Some(name) = info.name {
            self.name = name;
        }

        self.os = info.os;
        self.ssh_key_id = info.ssh_key_id;
        self.template_id = info.template_id;
        self.volume_ids = info.volume_ids.filter(|ids| !ids.is_empty());
        self.cloud_instance_type = info.cloud_instance_type;
        self.cloud_assigned_id = info.cloud_assigned_id;
        self.ip = info.ip;
        self.ssh_user = info.ssh_user;
        self.ssh_port = info.ssh_port;
        self.status = info.status;
        self.cost_estimate = info.cost_estimate;
        self.hourly_price = info.hourly_price;
        self.created_at = info
            .created_at
            .as_deref()
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|dt| dt.with_timezone(&Utc));
    }
}

/// CRUD orchestration for instances.
#[derive(Debug, Clone)]
pub struct InstanceResource<A = ShadeformClient> {
    api: A,
    poll_interval: Duration,
    create_timeout: Duration,
}

impl InstanceResource<ShadeformClient> {
    /// Build from a configured client and the provider's timing settings.
    #[must_use]
    pub fn new(client: ShadeformClient, config: &ProviderConfig) -> Self {
        Self::with_api(client, config.poll_interval, config.create_timeout)
    }
}

impl<A: InstanceApi> InstanceResource<A> {
    /// Build on any [`InstanceApi`] implementation.
    pub const fn with_api(api: A, poll_interval: Duration, create_timeout: Duration) -> Self {
        Self {
            api,
            poll_interval,
            create_timeout,
        }
    }

    /// Build with the default 15s interval and 60m create timeout.
    pub const fn with_defaults(api: A) -> Self {
        Self::with_api(api, DEFAULT_POLL_INTERVAL, DEFAULT_CREATE_TIMEOUT)
    }

    /// Launch an instance and wait until it is active.
    ///
    /// # Errors
    /// - `ShadeformError::ProvisioningFailed` when the instance reports `error`
    /// - `ShadeformError::Timeout` when it is not active in time; the instance
    ///   has been deleted unless that deletion failed too (logged)
    /// - `ShadeformError::Cancelled` when `cancel` fires first; the instance
    ///   is left as is
    /// - `ShadeformError::StatusCheck` when a status check fails
    pub async fn create(
        &self,
        plan: &InstancePlan,
        cancel: &CancellationToken,
    ) -> Result<InstanceState> {
        let id = self.api.create_instance(&plan.to_create_body()).await?;
        let handle = ResourceHandle::new(&plan.name, &id);

        let settings = PollSettings {
            interval: self.poll_interval,
            deadline: plan.create_timeout.unwrap_or(self.create_timeout),
        };

        match await_ready(&handle, &self.api, settings, cancel).await {
            PollOutcome::Ready => {}
            PollOutcome::TimedOut { id, waited } => {
                self.cleanup_after_timeout(&id).await;
                return Err(ShadeformError::Timeout {
                    id,
                    waited_secs: waited.as_secs(),
                });
            }
            other => other.into_result()?,
        }

        let info = self.api.get_instance(&id).await?;
        debug!(instance_id = %id, ?info, "Instance info after create");

        let mut state = InstanceState::from_plan(&id, plan);
        state.apply_info(info);
        if plan.ssh_key_id.is_some() {
            state.ssh_key_id.clone_from(&plan.ssh_key_id);
        }

        info!(instance_id = %id, ip = ?state.ip, "Instance ready");
        Ok(state)
    }

    async fn cleanup_after_timeout(&self, id: &str) {
        warn!(instance_id = %id, "Deleting instance that did not become active in time");
        if let Err(e) = self.api.delete_instance(id).await {
            error!(
                instance_id = %id,
                error = %e,
                "Cleanup delete failed; the instance may still exist and incur charges"
            );
        }
    }

    /// Refresh state from the API. `None` means the instance no longer exists.
    ///
    /// # Errors
    /// Returns error on any failure other than not-found.
    pub async fn read(&self, prior: &InstanceState) -> Result<Option<InstanceState>> {
        match self.api.get_instance(&prior.id).await {
            Ok(info) => {
                let mut state = prior.clone();
                state.apply_info(info);
                Ok(Some(state))
            }
            Err(e) if e.is_not_found() => {
                info!(instance_id = %prior.id, "Instance no longer exists");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Apply changes to an existing instance. Only the name is updatable in
    /// place.
    ///
    /// # Errors
    /// Returns error when the update or the follow-up read fails.
    pub async fn update(&self, prior: &InstanceState, plan: &InstancePlan) -> Result<InstanceState> {
        let body = UpdateInstanceBody {
            name: (plan.name != prior.name).then(|| plan.name.clone()),
        };

        if plan.cloud != prior.cloud
            || plan.region != prior.region
            || plan.shade_instance_type != prior.shade_instance_type
            || plan.shade_cloud != prior.shade_cloud
        {
            warn!(
                instance_id = %prior.id,
                "Placement changes cannot be applied in place and are ignored"
            );
        }

        if body.is_empty() {
            debug!(instance_id = %prior.id, "No in-place changes to send");
        } else {
            self.api.update_instance(&prior.id, &body).await?;
        }

        let info = self.api.get_instance(&prior.id).await?;
        let mut state = prior.clone();
        state.name.clone_from(&plan.name);
        state.apply_info(info);
        Ok(state)
    }

    /// Delete an instance.
    ///
    /// # Errors
    /// Returns error when the API call fails.
    pub async fn delete(&self, id: &str) -> Result<()> {
        self.api.delete_instance(id).await
    }

    /// Adopt an existing instance by id.
    ///
    /// # Errors
    /// Returns `ShadeformError::NotFound` when no such instance exists.
    pub async fn import(&self, id: &str) -> Result<InstanceState> {
        let info = self.api.get_instance(id).await?;
        let mut state = InstanceState {
            id: id.to_string(),
            ..InstanceState::default()
        };
        state.apply_info(info);
        Ok(state)
    }

    /// Wait for an already created instance to become active.
    pub async fn wait_active(
        &self,
        handle: &ResourceHandle,
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> PollOutcome {
        let settings = PollSettings {
            interval: self.poll_interval,
            deadline: timeout,
        };
        await_ready(handle, &self.api, settings, cancel).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use crate::poller::StatusSnapshot;

    /// In-memory API: scripted statuses, recorded calls.
    #[derive(Default)]
    struct FakeApi {
        statuses: Mutex<VecDeque<&'static str>>,
        info: Mutex<Option<InstanceInfo>>,
        deletes: Mutex<Vec<String>>,
        updates: Mutex<Vec<UpdateInstanceBody>>,
        fail_delete: bool,
    }

    impl FakeApi {
        fn with_statuses(statuses: &[&'static str]) -> Self {
            Self {
                statuses: Mutex::new(statuses.iter().copied().collect()),
                ..Self::default()
            }
        }

        fn deletes(&self) -> Vec<String> {
            self.deletes.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl StatusFetcher for FakeApi {
        async fn fetch_status(&self, _id: &str) -> Result<StatusSnapshot> {
            let status = self.statuses.lock().unwrap().pop_front().unwrap_or("pending");
            Ok(StatusSnapshot::new(status))
        }
    }

    #[async_trait]
    impl InstanceApi for FakeApi {
        async fn create_instance(&self, _body: &CreateInstanceBody) -> Result<String> {
            Ok("inst-7".to_string())
        }

        async fn get_instance(&self, id: &str) -> Result<InstanceInfo> {
            self.info
                .lock()
                .unwrap()
                .clone()
                .ok_or_else(|| ShadeformError::NotFound(id.to_string()))
        }

        async fn update_instance(&self, _id: &str, body: &UpdateInstanceBody) -> Result<()> {
            self.updates.lock().unwrap().push(body.clone());
            Ok(())
        }

        async fn delete_instance(&self, id: &str) -> Result<()> {
            self.deletes.lock().unwrap().push(id.to_string());
            if self.fail_delete {
                return Err(ShadeformError::Api {
                    status: 500,
                    message: "delete failed".to_string(),
                });
            }
            Ok(())
        }
    }

    fn plan() -> InstancePlan {
        InstancePlan {
            cloud: "hyperstack".to_string(),
            region: "canada-1".to_string(),
            shade_instance_type: "A6000".to_string(),
            shade_cloud: true,
            name: "trainer".to_string(),
            ssh_key_id: Some("key-from-plan".to_string()),
            ..InstancePlan::default()
        }
    }

    fn active_info() -> InstanceInfo {
        InstanceInfo {
            id: Some("inst-7".to_string()),
            cloud: Some("hyperstack".to_string()),
            name: Some("trainer".to_string()),
            status: Some("active".to_string()),
            ip: Some("203.0.113.10".to_string()),
            ssh_user: Some("shadeform".to_string()),
            ssh_port: Some(22),
            ssh_key_id: Some("key-from-api".to_string()),
            volume_ids: Some(vec![]),
            created_at: Some("2024-05-01T12:00:00Z".to_string()),
            ..InstanceInfo::default()
        }
    }

    fn resource(api: FakeApi) -> InstanceResource<FakeApi> {
        InstanceResource::with_api(api, Duration::from_secs(15), Duration::from_secs(60))
    }

    #[tokio::test(start_paused = true)]
    async fn test_create_populates_state_when_active() {
        let api = FakeApi::with_statuses(&["pending", "active"]);
        *api.info.lock().unwrap() = Some(active_info());
        let resource = resource(api);

        let state = resource.create(&plan(), &CancellationToken::new()).await.unwrap();

        assert_eq!(state.id, "inst-7");
        assert_eq!(state.ip.as_deref(), Some("203.0.113.10"));
        assert_eq!(state.ssh_port, Some(22));
        assert_eq!(state.ssh_key_id.as_deref(), Some("key-from-plan"));
        assert_eq!(state.region, "canada-1");
        assert!(state.volume_ids.is_none());
        assert!(state.created_at.is_some());
        assert!(resource.api.deletes().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_create_timeout_deletes_instance() {
        let resource = resource(FakeApi::with_statuses(&[]));

        let err = resource.create(&plan(), &CancellationToken::new()).await.unwrap_err();

        assert!(matches!(err, ShadeformError::Timeout { ref id, waited_secs: 60 } if id == "inst-7"));
        assert_eq!(resource.api.deletes(), vec!["inst-7".to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_create_timeout_survives_failed_cleanup() {
        let api = FakeApi {
            fail_delete: true,
            ..FakeApi::default()
        };
        let resource = resource(api);

        let err = resource.create(&plan(), &CancellationToken::new()).await.unwrap_err();

        assert!(matches!(err, ShadeformError::Timeout { .. }));
        assert_eq!(resource.api.deletes().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_plan_timeout_overrides_default() {
        let resource = resource(FakeApi::with_statuses(&[]));
        let plan = InstancePlan {
            create_timeout: Some(Duration::from_secs(30)),
            ..plan()
        };

        let err = resource.create(&plan, &CancellationToken::new()).await.unwrap_err();

        assert!(matches!(err, ShadeformError::Timeout { waited_secs: 30, .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_create_error_state_keeps_instance() {
        let resource = resource(FakeApi::with_statuses(&["pending", "error"]));

        let err = resource.create(&plan(), &CancellationToken::new()).await.unwrap_err();

        assert!(matches!(err, ShadeformError::ProvisioningFailed { ref id, .. } if id == "inst-7"));
        assert!(resource.api.deletes().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_create_cancelled_skips_cleanup() {
        let resource = resource(FakeApi::with_statuses(&[]));
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = resource.create(&plan(), &cancel).await.unwrap_err();

        assert!(matches!(err, ShadeformError::Cancelled { .. }));
        assert!(resource.api.deletes().is_empty());
    }

    #[tokio::test]
    async fn test_read_missing_instance_returns_none() {
        let resource = resource(FakeApi::default());
        let prior = InstanceState {
            id: "inst-7".to_string(),
            ..InstanceState::default()
        };

        assert!(resource.read(&prior).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_sends_only_changed_name() {
        let api = FakeApi::default();
        *api.info.lock().unwrap() = Some(InstanceInfo {
            name: Some("renamed".to_string()),
            ..active_info()
        });
        let resource = resource(api);
        let prior = InstanceState {
            id: "inst-7".to_string(),
            name: "trainer".to_string(),
            ..InstanceState::default()
        };
        let plan = InstancePlan {
            name: "renamed".to_string(),
            ..InstancePlan::default()
        };

        let state = resource.update(&prior, &plan).await.unwrap();

        assert_eq!(state.name, "renamed");
        let updates = resource.api.updates.lock().unwrap().clone();
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].name.as_deref(), Some("renamed"));
    }

    #[tokio::test]
    async fn test_update_without_changes_skips_call() {
        let api = FakeApi::default();
        *api.info.lock().unwrap() = Some(active_info());
        let resource = resource(api);
        let prior = InstanceState {
            id: "inst-7".to_string(),
            name: "trainer".to_string(),
            ..InstanceState::default()
        };

        resource.update(&prior, &plan()).await.unwrap();

        assert!(resource.api.updates.lock().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_active_uses_given_timeout() {
        let resource = resource(FakeApi::with_statuses(&["pending", "active"]));
        let handle = ResourceHandle::new("trainer", "inst-7");

        let outcome = resource
            .wait_active(&handle, Duration::from_secs(60), &CancellationToken::new())
            .await;
        assert!(outcome.is_ready());

        let outcome = resource
            .wait_active(&handle, Duration::from_secs(20), &CancellationToken::new())
            .await;
        assert!(matches!(outcome, PollOutcome::TimedOut { ref id, .. } if id == "inst-7"));
        assert!(resource.api.deletes().is_empty());
    }

    #[tokio::test]
    async fn test_import_missing_instance_is_not_found() {
        let resource = resource(FakeApi::default());

        let err = resource.import("inst-404").await.unwrap_err();

        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_import_builds_state_from_api() {
        let api = FakeApi::default();
        *api.info.lock().unwrap() = Some(active_info());
        let resource = resource(api);

        let state = resource.import("inst-7").await.unwrap();

        assert_eq!(state.id, "inst-7");
        assert_eq!(state.name, "trainer");
        assert_eq!(state.ssh_key_id.as_deref(), Some("key-from-api"));
    }

    #[test]
    fn test_create_body_drops_empty_volume_list() {
        let plan = InstancePlan {
            volume_ids: Some(vec![]),
            ..plan()
        };
        assert!(plan.to_create_body().volume_ids.is_none());
    }
}
