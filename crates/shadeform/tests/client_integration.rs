//! Integration tests for the Shadeform HTTP client using wiremock
//!
//! These tests run the real client against mocked endpoints to check
//! authentication, routing, query encoding and error mapping.

use serde_json::json;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use shadeform::client::{CreateInstanceBody, UpdateInstanceBody};
use shadeform::{InstanceTypeQuery, ProviderConfig, ShadeformClient, ShadeformError, ShadeformProvider};

fn client_for(server: &MockServer) -> ShadeformClient {
    let config = ProviderConfig::default()
        .with_api_key("test-key")
        .with_base_url(server.uri());
    ShadeformClient::new(&config).expect("client should build")
}

fn create_body() -> CreateInstanceBody {
    CreateInstanceBody {
        cloud: "hyperstack".to_string(),
        region: "canada-1".to_string(),
        shade_instance_type: "A6000".to_string(),
        shade_cloud: true,
        name: "trainer".to_string(),
        os: None,
        template_id: None,
        ssh_key_id: None,
        volume_ids: None,
    }
}

/// Requests carry the API key header and the JSON body
#[tokio::test]
async fn test_create_instance_sends_key_and_body() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/instances/create"))
        .and(header("X-API-KEY", "test-key"))
        .and(body_json(json!({
            "cloud": "hyperstack",
            "region": "canada-1",
            "shade_instance_type": "A6000",
            "shade_cloud": true,
            "name": "trainer"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "d290f1ee-6c54-4b01-90e6-d701748f0851",
            "cloud_assigned_id": "13b057d7"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let id = client_for(&server)
        .create_instance(&create_body())
        .await
        .expect("create should succeed");

    assert_eq!(id, "d290f1ee-6c54-4b01-90e6-d701748f0851");
}

/// A create response without an id is an error, not an empty id
#[tokio::test]
async fn test_create_instance_without_id() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/instances/create"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .mount(&server)
        .await;

    let err = client_for(&server)
        .create_instance(&create_body())
        .await
        .unwrap_err();

    assert!(matches!(err, ShadeformError::MissingField("id")));
}

/// 404 maps to NotFound so callers can treat the resource as gone
#[tokio::test]
async fn test_get_instance_404_is_not_found() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/instances/missing/info"))
        .respond_with(ResponseTemplate::new(404).set_body_string("instance not found"))
        .mount(&server)
        .await;

    let err = client_for(&server).get_instance("missing").await.unwrap_err();

    assert!(err.is_not_found());
    assert!(err.to_string().contains("instance not found"));
}

/// Other failures keep their status code and body
#[tokio::test]
async fn test_server_error_maps_to_api_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/instances/inst-1/delete"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let err = client_for(&server).delete_instance("inst-1").await.unwrap_err();

    match err {
        ShadeformError::Api { status, message } => {
            assert_eq!(status, 500);
            assert_eq!(message, "boom");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

/// Malformed success bodies surface as serialization errors
#[tokio::test]
async fn test_invalid_json_is_serialization_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/instances/inst-1/info"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
        .mount(&server)
        .await;

    let err = client_for(&server).get_instance("inst-1").await.unwrap_err();

    assert!(matches!(err, ShadeformError::Serialization(_)));
}

#[tokio::test]
async fn test_update_instance_sends_name_only() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/instances/inst-1/update"))
        .and(body_json(json!({"name": "renamed"})))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let body = UpdateInstanceBody {
        name: Some("renamed".to_string()),
    };
    client_for(&server)
        .update_instance("inst-1", &body)
        .await
        .expect("update should succeed");
}

/// Only set filters are encoded in the query string
#[tokio::test]
async fn test_instance_types_query_encoding() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/instances/types"))
        .and(query_param("gpu_type", "H100"))
        .and(query_param("available", "true"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "instance_types": [{
                "cloud": "lambdalabs",
                "region": "us-east-1",
                "shade_instance_type": "H100",
                "cloud_instance_type": "gpu_1x_h100_pcie",
                "hourly_price": 249,
                "deployment_type": "vm",
                "configuration": {
                    "gpu_type": "H100",
                    "num_gpus": 1,
                    "os_options": ["ubuntu22.04_cuda12.2_shade_os"]
                },
                "availability": [{"region": "us-east-1", "available": true}],
                "boot_time": {"min_boot_in_sec": 300, "max_boot_in_sec": 600}
            }]
        })))
        .mount(&server)
        .await;

    let provider = ShadeformProvider::default()
        .configure(
            ProviderConfig::default()
                .with_api_key("test-key")
                .with_base_url(server.uri()),
        )
        .expect("provider should configure");

    let query = InstanceTypeQuery {
        gpu_type: Some("H100".to_string()),
        available: Some(true),
        ..InstanceTypeQuery::default()
    };
    let types = provider
        .instance_types()
        .read(&query)
        .await
        .expect("types should load");

    assert_eq!(types.len(), 1);
    assert_eq!(types[0].hourly_price, Some(249));
    assert_eq!(types[0].os_options, vec!["ubuntu22.04_cuda12.2_shade_os"]);

    let requests = server.received_requests().await.expect("recording enabled");
    assert_eq!(requests[0].url.query(), Some("gpu_type=H100&available=true"));
}

#[tokio::test]
async fn test_instance_types_missing_field() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/instances/types"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .mount(&server)
        .await;

    let err = client_for(&server)
        .list_instance_types(&[])
        .await
        .unwrap_err();

    assert!(matches!(err, ShadeformError::MissingField("instance_types")));
}
