//! Integration tests: http transport.

use std::time::Duration;

use anyhow::Result;
use ari_bulk_loader::{
    ApiTransport, BulkDataLoader, BulkLoadError, ClientConfig, Credentials, HttpTransport,
    LoadOptions, RequestDescriptor, TransportError,
};
use serde_json::json;
use wiremock::{
    matchers::{header, method, path, query_param},
    Mock, MockServer, ResponseTemplate,
};

#[tokio::test]
async fn bulk_load_over_http_sends_expected_parameters() -> Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/clientes/count"))
        .and(query_param("baseId", "7"))
        .and(query_param("status", "all"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": { "count": 3 } })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/clientes"))
        .and(query_param("page", "1"))
        .and(query_param("per_page", "2"))
        .and(query_param("offset", "0"))
        .and(query_param("sort_by", "id"))
        .and(query_param("sort_order", "asc"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "data": [{ "id": 1 }, { "id": 2 }] })),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/clientes"))
        .and(query_param("page", "2"))
        .and(query_param("offset", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": [{ "id": 3 }] })))
        .expect(1)
        .mount(&server)
        .await;

    let config = ClientConfig::new(server.uri()).with_page_delay(Duration::from_millis(1));
    let loader = BulkDataLoader::from_config(&config)?;
    let descriptor = RequestDescriptor::new("/api/clientes", 7).with_filter("status", "all");
    let result = loader
        .load_bulk_data(&descriptor, LoadOptions::new().page_size(2))
        .await?;

    assert_eq!(result.total_count, 3);
    assert_eq!(result.page_count, 2);

    let requests = server.received_requests().await.unwrap_or_default();
    let snapshots = requests
        .iter()
        .filter(|request| request.url.path() == "/api/clientes")
        .filter_map(|request| {
            request
                .url
                .query_pairs()
                .find(|(key, _)| key == "_snapshot")
                .map(|(_, value)| value.into_owned())
        })
        .collect::<Vec<_>>();
    assert_eq!(snapshots.len(), 2);
    assert_eq!(snapshots[0], snapshots[1]);
    Ok(())
}

#[tokio::test]
async fn bearer_token_and_admin_override_are_sent() -> Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/clientes/count"))
        .and(header("authorization", "Bearer jwt-token"))
        .and(header("x-admin-base-override", "99"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": { "count": 0 } })))
        .expect(1)
        .mount(&server)
        .await;

    let config = ClientConfig::new(server.uri())
        .with_credentials(Credentials::Bearer("jwt-token".to_string()))
        .with_admin_base_override(99);
    let transport = HttpTransport::new(&config)?;
    transport
        .get("/api/clientes/count", &[("baseId".to_string(), "7".to_string())])
        .await?;
    Ok(())
}

#[tokio::test]
async fn api_key_pair_replaces_bearer_token() -> Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(header("x-api-key", "key-1"))
        .and(header("x-api-secret", "secret-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": [] })))
        .expect(1)
        .mount(&server)
        .await;

    let config = ClientConfig::new(server.uri()).with_credentials(Credentials::ApiKey {
        key: "key-1".to_string(),
        secret: "secret-1".to_string(),
    });
    let transport = HttpTransport::new(&config)?;
    transport.get("/api/clientes", &[]).await?;

    let requests = server.received_requests().await.unwrap_or_default();
    assert_eq!(requests.len(), 1);
    assert!(requests[0].headers.get("authorization").is_none());
    Ok(())
}

#[tokio::test]
async fn non_success_status_carries_api_message() -> Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(403).set_body_json(json!({ "message": "Base não autorizada" })),
        )
        .mount(&server)
        .await;

    let loader = BulkDataLoader::from_config(&ClientConfig::new(server.uri()))?;
    let err = loader
        .load_bulk_data(&RequestDescriptor::new("/api/clientes", 7), LoadOptions::new())
        .await
        .expect_err("forbidden");

    match err {
        BulkLoadError::Transport(TransportError::Status {
            status,
            message,
            path,
        }) => {
            assert_eq!(status, 403);
            assert_eq!(message, "Base não autorizada");
            assert_eq!(path, "/api/clientes/count");
        },
        other => panic!("unexpected error: {other:?}"),
    }
    Ok(())
}

#[tokio::test]
async fn slow_response_maps_to_timeout() -> Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "data": { "count": 1 } }))
                .set_delay(Duration::from_secs(2)),
        )
        .mount(&server)
        .await;

    let config = ClientConfig::new(server.uri()).with_timeout(Duration::from_millis(100));
    let transport = HttpTransport::new(&config)?;
    let err = transport
        .get("/api/clientes/count", &[])
        .await
        .expect_err("request times out");

    assert!(matches!(err, TransportError::Timeout { .. }));
    Ok(())
}

#[tokio::test]
async fn html_body_is_a_schema_error() -> Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
        .mount(&server)
        .await;

    let loader = BulkDataLoader::from_config(&ClientConfig::new(server.uri()))?;
    let err = loader
        .load_bulk_data(&RequestDescriptor::new("/api/clientes", 7), LoadOptions::new())
        .await
        .expect_err("not json");

    assert!(matches!(err, BulkLoadError::Schema(_)));
    Ok(())
}
