//! Resources and data sources exposed by the provider.
//!
//! Each type wraps a configured [`ShadeformClient`](crate::client::ShadeformClient)
//! and translates between typed plan/state values and API calls. Only
//! instance creation waits on the remote side; everything else is a single
//! request/response exchange.

pub mod instance;
pub mod instance_types;
pub mod volume;

pub use instance::{InstanceApi, InstancePlan, InstanceResource, InstanceState};
pub use instance_types::{InstanceType, InstanceTypeQuery, InstanceTypesDataSource};
pub use volume::{VolumePlan, VolumeResource, VolumeState};
