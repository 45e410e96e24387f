//! Mock tenant: token endpoint plus activity feed on one wiremock server

use super::fixtures::TENANT_ID;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

/// Access token handed out by the mock token endpoint
pub const ACCESS_TOKEN: &str = "eyJ0eXAiOiJKV1QiLCJhbGciOiJSUzI1NiJ9.mock.signature";

/// Path of the v2.0 token endpoint for the mock tenant
pub fn token_path() -> String {
    format!("/{TENANT_ID}/oauth2/v2.0/token")
}

/// Path of a feed operation for the mock tenant
pub fn feed_path(operation: &str) -> String {
    format!("/api/v1.0/{TENANT_ID}/activity/feed/subscriptions/{operation}")
}

/// Answer token requests with a one-hour token
pub async fn mount_token_endpoint(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path(token_path()))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "token_type": "Bearer",
            "expires_in": 3599,
            "ext_expires_in": 3599,
            "access_token": ACCESS_TOKEN
        })))
        .mount(server)
        .await;
}

/// Subscription listing containing `content_types`
pub async fn mount_subscriptions(server: &MockServer, content_types: &[&str]) {
    let body: Vec<serde_json::Value> = content_types
        .iter()
        .map(|ct| serde_json::json!({"contentType": ct, "status": "enabled", "webhook": null}))
        .collect();
    Mock::given(method("GET"))
        .and(path(feed_path("list")))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

/// Content listing for windows starting at `start_time`, one pointer per blob name
pub async fn mount_content(server: &MockServer, start_time: Option<&str>, blobs: &[&str]) {
    let body: Vec<serde_json::Value> = blobs
        .iter()
        .map(|name| {
            serde_json::json!({
                "contentType": "Audit.SharePoint",
                "contentId": name,
                "contentUri": format!("{}/api/v1.0/{TENANT_ID}/activity/feed/audit/{name}", server.uri()),
                "contentCreated": "2024-06-01T09:55:00.000Z",
                "contentExpiration": "2024-06-08T09:55:00.000Z"
            })
        })
        .collect();

    let mut mock = Mock::given(method("GET")).and(path(feed_path("content")));
    if let Some(start_time) = start_time {
        mock = mock.and(query_param("startTime", start_time));
    }
    mock.respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

/// Blob `name` containing one audit event per id
pub async fn mount_blob(server: &MockServer, name: &str, ids: &[&str]) {
    let body: Vec<serde_json::Value> = ids
        .iter()
        .map(|id| {
            serde_json::json!({
                "Id": id,
                "RecordType": 6,
                "Operation": "FileAccessed",
                "Workload": "SharePoint",
                "CreationTime": "2024-06-01T09:55:12"
            })
        })
        .collect();
    Mock::given(method("GET"))
        .and(path(format!("/api/v1.0/{TENANT_ID}/activity/feed/audit/{name}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

/// "METHOD /path" for every request the server saw, in arrival order
pub fn request_log(requests: &[Request]) -> Vec<String> {
    requests
        .iter()
        .map(|r| format!("{} {}", r.method, r.url.path()))
        .collect()
}
