//! Integration tests for the integrated mapping request against a mock
//! HTTP server.

use std::io::Write;

use adknowledge_client::{Config, Integrated};
use adknowledge_domain::{AdknowledgeError, Recipient};
use flate2::write::GzEncoder;
use flate2::Compression;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const RESULT_BODY: &str = "<result>\
    <email><recipient>md5_1</recipient><template>42</template><campaign>summer</campaign></email>\
    <error><recipient>md5_2</recipient><str>domain not supported</str><num>704</num></error>\
    </result>";

fn config_for(server: &MockServer) -> Config {
    Config::new("T").with_integrated_url(&server.uri()).expect("mock server url")
}

fn batch() -> Vec<Recipient> {
    vec![
        Recipient::new("md5_1", "101", "hotmail.com"),
        Recipient::new("md5_2", "101", "gmail.com"),
    ]
}

#[tokio::test]
async fn maps_recipients_and_partitions_by_outcome() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/1.3"))
        .and(body_string_contains("token=T"))
        .and(body_string_contains("test=0"))
        .and(body_string_contains("request="))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(RESULT_BODY, "application/xml"),
        )
        .expect(1)
        .mount(&server)
        .await;

    let mut request = Integrated::new(config_for(&server));
    request.set_recipients(batch()).expect("valid batch");
    request.map().await.expect("mapping round trip");

    assert!(request.mapped());

    let mapped = request.mapped_recipients();
    assert_eq!(mapped.len(), 1);
    assert_eq!(mapped[0].recipient.as_deref(), Some("md5_1"));
    assert_eq!(mapped[0].success, Some(true));
    // response-supplied fields are merged in
    assert_eq!(mapped[0].mapped["template"], "42");
    assert_eq!(mapped[0].mapped["campaign"], "summer");

    let errored = request.errored_recipients();
    assert_eq!(errored.len(), 1);
    assert_eq!(errored[0].recipient.as_deref(), Some("md5_2"));
    assert_eq!(errored[0].success, Some(false));
    let error = errored[0].error.clone().expect("error sub-fields");
    assert_eq!(error.str, "domain not supported");
    assert_eq!(error.num, "704");
}

#[tokio::test]
async fn repeat_map_calls_rerun_the_round_trip() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/1.3"))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(RESULT_BODY, "application/xml"),
        )
        .expect(2)
        .mount(&server)
        .await;

    let mut request = Integrated::new(config_for(&server));
    request.set_recipients(batch()).expect("valid batch");
    request.map().await.expect("first round trip");
    request.map().await.expect("second round trip");

    assert_eq!(request.mapped_recipients().len(), 1);
}

#[tokio::test]
async fn decodes_gzip_response_bodies() {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(RESULT_BODY.as_bytes()).expect("gzip write");
    let compressed = encoder.finish().expect("gzip finish");

    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/1.3"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw(compressed, "application/xml")
                .insert_header("content-encoding", "gzip"),
        )
        .mount(&server)
        .await;

    let mut request = Integrated::new(config_for(&server));
    request.set_recipients(batch()).expect("valid batch");
    request.map().await.expect("gzip-decoded round trip");

    assert_eq!(request.mapped_recipients().len(), 1);
    assert_eq!(request.errored_recipients().len(), 1);
}

#[tokio::test]
async fn missing_token_fails_before_any_network_call() {
    let server = MockServer::start().await;

    let config = Config::without_token().with_integrated_url(&server.uri()).expect("url");
    let mut request = Integrated::new(config);
    request.set_recipients(batch()).expect("valid batch");

    let err = request.map().await.expect_err("no token configured");
    assert_eq!(err, AdknowledgeError::MissingToken);

    let requests = server.received_requests().await.unwrap();
    assert!(requests.is_empty(), "round-trip count must be observably zero");
}

#[tokio::test]
async fn timeout_surfaces_as_transport_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/1.3"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw(RESULT_BODY, "application/xml")
                .set_delay(std::time::Duration::from_secs(5)),
        )
        .mount(&server)
        .await;

    let mut request = Integrated::new(config_for(&server));
    request.set_recipients(batch()).expect("valid batch");
    request.timeout(1);

    let err = request.map().await.expect_err("bounded request duration");
    assert!(matches!(err, AdknowledgeError::Transport(_)));
    // a timed-out call is not a partial result
    assert!(!request.mapped());
    assert!(request.mapped_recipients().is_empty());
}

#[tokio::test]
async fn unparseable_response_body_is_a_remote_api_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/1.3"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not xml <<<"))
        .mount(&server)
        .await;

    let mut request = Integrated::new(config_for(&server));
    request.set_recipients(batch()).expect("valid batch");

    let err = request.map().await.expect_err("malformed envelope");
    assert!(matches!(err, AdknowledgeError::RemoteApi(_)));
}
