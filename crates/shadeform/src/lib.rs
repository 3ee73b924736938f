//! Shadeform GPU cloud provider.
//!
//! Manages Shadeform instances and volumes through the public REST API and
//! waits for newly launched instances to become usable.
//!
//! ## Architecture
//!
//! ```text
//! ShadeformProvider ──configure──► ConfiguredProvider
//!                                     │
//!            ┌────────────────────────┼─────────────────────────┐
//!            ▼                        ▼                         ▼
//!    InstanceResource          VolumeResource       InstanceTypesDataSource
//!            │
//!            ▼
//!      poller::await_ready ──fetch_status──► ShadeformClient (StatusFetcher)
//! ```
//!
//! Instance creation polls `GET /instances/{id}/info` until the status is
//! `active` or `error`, the deadline passes, or the caller cancels. An
//! instance that times out is deleted so it does not keep billing.
//!
//! ## Example
//!
//! ```ignore
//! use shadeform::{InstancePlan, ProviderConfig, ShadeformProvider};
//! use tokio_util::sync::CancellationToken;
//!
//! let provider = ShadeformProvider::default().configure(ProviderConfig::from_env())?;
//!
//! let plan = InstancePlan {
//!     cloud: "hyperstack".into(),
//!     region: "canada-1".into(),
//!     shade_instance_type: "A6000".into(),
//!     shade_cloud: true,
//!     name: "trainer".into(),
//!     ..InstancePlan::default()
//! };
//! let state = provider.instances().create(&plan, &CancellationToken::new()).await?;
//! println!("ssh {}@{}", state.ssh_user.unwrap_or_default(), state.ip.unwrap_or_default());
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod poller;
pub mod provider;
pub mod resources;

pub use client::ShadeformClient;
pub use config::ProviderConfig;
pub use error::{Result, ShadeformError};
pub use poller::{
    await_ready, PollOutcome, PollSettings, ResourceHandle, StatusFetcher, StatusSnapshot,
};
pub use provider::{ConfiguredProvider, ShadeformProvider};
pub use resources::{
    InstancePlan, InstanceResource, InstanceState, InstanceType, InstanceTypeQuery,
    InstanceTypesDataSource, VolumePlan, VolumeResource, VolumeState,
};
