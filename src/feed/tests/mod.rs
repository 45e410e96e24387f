use super::*;
use crate::test_helpers::{TEST_PUBLISHER, TEST_TENANT, static_tokens, test_feed_client};


#[test]
fn test_endpoint_layout() {
    let client = test_feed_client("https://manage.office.com/");
    assert_eq!(
        client.endpoint("content"),
        format!("https://manage.office.com/api/v1.0/{TEST_TENANT}/activity/feed/subscriptions/content")
    );
}

#[test]
fn test_with_publisher_appends_parameter() {
    let client = test_feed_client("https://manage.office.com");
    let url = client
        .with_publisher("https://manage.office.com/api/v1.0/t/activity/feed/audit/abc$01")
        .unwrap();
    let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
    assert_eq!(
        pairs,
        vec![(PUBLISHER_PARAM.to_string(), TEST_PUBLISHER.to_string())]
    );
}

#[test]
fn test_with_publisher_replaces_existing_value() {
    let client = test_feed_client("https://manage.office.com");
    let url = client
        .with_publisher(
            "https://manage.office.com/x/content?contentType=Audit.General&PublisherIdentifier=other&nextPage=2024060112",
        )
        .unwrap();
    let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();

    assert_eq!(
        pairs.iter().filter(|(k, _)| k == PUBLISHER_PARAM).count(),
        1
    );
    assert!(pairs.contains(&(PUBLISHER_PARAM.to_string(), TEST_PUBLISHER.to_string())));
    assert!(pairs.contains(&("nextPage".to_string(), "2024060112".to_string())));
    assert!(pairs.contains(&("contentType".to_string(), "Audit.General".to_string())));
}

#[test]
fn test_with_publisher_rejects_relative_reference() {
    let client = test_feed_client("https://manage.office.com");
    assert!(matches!(
        client.with_publisher("/api/v1.0/content?nextPage=1"),
        Err(Error::Url(_))
    ));
}

#[test]
fn test_new_rejects_invalid_base_url() {
    let result = FeedClient::new(
        reqwest::Client::new(),
        static_tokens(),
        "not a url",
        TEST_TENANT,
        TEST_PUBLISHER,
    );
    assert!(matches!(result, Err(Error::Url(_))));
}
