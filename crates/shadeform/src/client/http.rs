//! Shadeform API client implementation.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use tracing::{debug, info, warn};

use super::models::{
    CreateInstanceBody, CreateVolumeBody, CreatedResource, InstanceInfo, InstanceTypeInfo,
    InstanceTypesResponse, UpdateInstanceBody, VolumeInfo,
};
use crate::config::ProviderConfig;
use crate::error::{Result, ShadeformError};
use crate::poller::{StatusFetcher, StatusSnapshot};

/// Header carrying the API key.
const API_KEY_HEADER: &str = "X-API-KEY";

/// Shadeform API client.
///
/// Cheap to clone; all clones share one connection pool.
#[derive(Clone)]
pub struct ShadeformClient {
    /// HTTP client.
    client: Client,
    /// API key for authentication.
    api_key: String,
    /// API root, e.g. `https://api.shadeform.ai/v1`.
    base_url: String,
}

impl std::fmt::Debug for ShadeformClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShadeformClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl ShadeformClient {
    /// Create a new client from provider configuration.
    ///
    /// # Errors
    /// Returns error if the configuration is invalid or the HTTP client cannot
    /// be created.
    pub fn new(config: &ProviderConfig) -> Result<Self> {
        config.validate()?;
        let api_key = config.resolve_api_key()?;

        let client = Client::builder()
            .timeout(config.request_timeout)
            .user_agent(concat!("shadeform-rs/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            api_key,
            base_url: config.base_url.clone(),
        })
    }

    /// API root this client talks to.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Make an authenticated GET request.
    async fn get<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T> {
        let url = format!("{}{path}", self.base_url);
        debug!(url = %url, "GET request");

        let response = self
            .client
            .get(&url)
            .header(API_KEY_HEADER, &self.api_key)
            .query(query)
            .send()
            .await?;

        Self::handle_response(response).await
    }

    /// Make an authenticated POST request.
    async fn post<T, B>(&self, path: &str, body: &B) -> Result<T>
    where
        T: serde::de::DeserializeOwned,
        B: serde::Serialize,
    {
        let url = format!("{}{path}", self.base_url);
        debug!(url = %url, "POST request");

        let response = self
            .client
            .post(&url)
            .header(API_KEY_HEADER, &self.api_key)
            .json(body)
            .send()
            .await?;

        Self::handle_response(response).await
    }

    /// Make an authenticated POST request whose response body is ignored.
    async fn post_empty<B: serde::Serialize>(&self, path: &str, body: Option<&B>) -> Result<()> {
        let url = format!("{}{path}", self.base_url);
        debug!(url = %url, "POST request (empty response)");

        let mut request = self.client.post(&url).header(API_KEY_HEADER, &self.api_key);
        if let Some(body) = body {
            request = request.json(body);
        }
        let response = request.send().await?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            let text = response.text().await?;
            Err(Self::status_error(status, text))
        }
    }

    /// Handle API response, parsing JSON or error.
    async fn handle_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T> {
        let status = response.status();
        let text = response.text().await?;

        if status.is_success() {
            serde_json::from_str(&text).map_err(|e| {
                warn!(error = %e, body_len = text.len(), "Failed to parse response");
                ShadeformError::Serialization(e)
            })
        } else {
            Err(Self::status_error(status, text))
        }
    }

    fn status_error(status: StatusCode, text: String) -> ShadeformError {
        if status == StatusCode::NOT_FOUND {
            ShadeformError::NotFound(text)
        } else {
            ShadeformError::Api {
                status: status.as_u16(),
                message: text,
            }
        }
    }

    // ========================================================================
    // Instances
    // ========================================================================

    /// Launch a new instance and return its id.
    ///
    /// # Errors
    /// Returns error on HTTP failure or when the response carries no id.
    pub async fn create_instance(&self, body: &CreateInstanceBody) -> Result<String> {
        info!(name = %body.name, cloud = %body.cloud, region = %body.region, "Creating instance");
        let created: CreatedResource = self.post("/instances/create", body).await?;
        let id = created.id.ok_or(ShadeformError::MissingField("id"))?;
        info!(instance_id = %id, "Instance create accepted");
        Ok(id)
    }

    /// Fetch an instance by id.
    ///
    /// # Errors
    /// Returns [`ShadeformError::NotFound`] when the instance does not exist.
    pub async fn get_instance(&self, id: &str) -> Result<InstanceInfo> {
        self.get(&format!("/instances/{id}/info"), &[]).await
    }

    /// Apply in-place changes to an instance.
    ///
    /// # Errors
    /// Returns error on HTTP failure.
    pub async fn update_instance(&self, id: &str, body: &UpdateInstanceBody) -> Result<()> {
        info!(instance_id = %id, "Updating instance");
        self.post_empty(&format!("/instances/{id}/update"), Some(body))
            .await
    }

    /// Delete an instance.
    ///
    /// # Errors
    /// Returns error on HTTP failure.
    pub async fn delete_instance(&self, id: &str) -> Result<()> {
        info!(instance_id = %id, "Deleting instance");
        self.post_empty::<()>(&format!("/instances/{id}/delete"), None)
            .await?;
        info!(instance_id = %id, "Instance deleted");
        Ok(())
    }

    /// List instance types matching the given query parameters.
    ///
    /// # Errors
    /// Returns [`ShadeformError::MissingField`] when the response has no
    /// `instance_types` array.
    pub async fn list_instance_types(
        &self,
        query: &[(&str, String)],
    ) -> Result<Vec<InstanceTypeInfo>> {
        let response: InstanceTypesResponse = self.get("/instances/types", query).await?;
        response
            .instance_types
            .ok_or(ShadeformError::MissingField("instance_types"))
    }

    // ========================================================================
    // Volumes
    // ========================================================================

    /// Create a storage volume and return its id.
    ///
    /// # Errors
    /// Returns error on HTTP failure or when the response carries no id.
    pub async fn create_volume(&self, body: &CreateVolumeBody) -> Result<String> {
        info!(name = %body.name, size_in_gb = body.size_in_gb, "Creating volume");
        let created: CreatedResource = self.post("/volumes/create", body).await?;
        created.id.ok_or(ShadeformError::MissingField("id"))
    }

    /// Fetch a volume by id.
    ///
    /// # Errors
    /// Returns [`ShadeformError::NotFound`] when the volume does not exist.
    pub async fn get_volume(&self, id: &str) -> Result<VolumeInfo> {
        self.get(&format!("/volumes/{id}/info"), &[]).await
    }

    /// Delete a volume.
    ///
    /// # Errors
    /// Returns error on HTTP failure.
    pub async fn delete_volume(&self, id: &str) -> Result<()> {
        info!(volume_id = %id, "Deleting volume");
        self.post_empty::<()>(&format!("/volumes/{id}/delete"), None)
            .await
    }
}

#[async_trait]
impl StatusFetcher for ShadeformClient {
    async fn fetch_status(&self, id: &str) -> Result<StatusSnapshot> {
        let info = self.get_instance(id).await?;
        Ok(StatusSnapshot {
            status: info.status.unwrap_or_default(),
            detail: info.status_details,
        })
    }
}
