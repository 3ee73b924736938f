//! Shadeform REST API client.
//!
//! ## Example
//!
//! ```ignore
//! use shadeform::client::ShadeformClient;
//! use shadeform::config::ProviderConfig;
//!
//! let client = ShadeformClient::new(&ProviderConfig::from_env())?;
//! let info = client.get_instance("d8f6c2a1-...").await?;
//! println!("{:?}", info.status);
//! ```

mod http;
pub mod models;

pub use http::ShadeformClient;
pub use models::*;
