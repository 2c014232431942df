//! Solver Integration Tests
//!
//! Drives `RegerySolver` against a mock Regery API:
//! - Record create and delete requests
//! - Non-200 responses and transport failures
//! - Credential lookup failures

mod support;

use regery_core::ChallengeAction;
use regery_webhook::Solver;
use regery_webhook::regery::{CredentialError, SolverError};
use regery_webhook::secrets::StaticSecretStore;
use serde_json::json;
use support::{challenge, credential_store, solver, store_with};
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const RECORDS_PATH: &str = "/domains/example.com/records";

#[tokio::test]
async fn test_present_creates_txt_record() {
    let api = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(RECORDS_PATH))
        .and(header("Authorization", "K:S"))
        .and(header("Content-Type", "application/json"))
        .and(body_json(json!({
            "records": [{
                "type": "TXT",
                "name": "_acme-challenge",
                "value": "abc123",
                "ttl": "60"
            }]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_string("ignored"))
        .expect(1)
        .mount(&api)
        .await;

    let solver = solver(&api, credential_store());
    solver
        .present(&challenge(ChallengeAction::Present))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_clean_up_deletes_txt_record_without_ttl() {
    let api = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path(RECORDS_PATH))
        .and(header("Authorization", "K:S"))
        .and(body_json(json!({
            "records": [{
                "type": "TXT",
                "name": "_acme-challenge",
                "value": "abc123"
            }]
        })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&api)
        .await;

    let solver = solver(&api, credential_store());
    solver
        .clean_up(&challenge(ChallengeAction::CleanUp))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_trailing_dots_are_optional() {
    let api = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(RECORDS_PATH))
        .and(body_json(json!({
            "records": [{
                "type": "TXT",
                "name": "_acme-challenge",
                "value": "abc123",
                "ttl": "60"
            }]
        })))
        .respond_with(ResponseTemplate::new(200))
        .expect(2)
        .mount(&api)
        .await;

    let solver = solver(&api, credential_store());

    let dotted = challenge(ChallengeAction::Present);
    solver.present(&dotted).await.unwrap();

    let mut bare = challenge(ChallengeAction::Present);
    bare.resolved_fqdn = "_acme-challenge.example.com".to_string();
    bare.resolved_zone = "example.com".to_string();
    solver.present(&bare).await.unwrap();
}

#[tokio::test]
async fn test_nested_label_keeps_inner_dots() {
    let api = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(RECORDS_PATH))
        .and(body_json(json!({
            "records": [{
                "type": "TXT",
                "name": "_acme-challenge.www",
                "value": "abc123",
                "ttl": "60"
            }]
        })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&api)
        .await;

    let mut request = challenge(ChallengeAction::Present);
    request.resolved_fqdn = "_acme-challenge.www.example.com.".to_string();

    solver(&api, credential_store())
        .present(&request)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_non_200_statuses_fail() {
    for status in [201u16, 400, 401, 500] {
        let api = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(RECORDS_PATH))
            .respond_with(ResponseTemplate::new(status))
            .expect(1)
            .mount(&api)
            .await;

        let err = solver(&api, credential_store())
            .present(&challenge(ChallengeAction::Present))
            .await
            .unwrap_err();

        match &err {
            SolverError::ApiRequest {
                status: got,
                url,
                method,
            } => {
                assert_eq!(got.as_u16(), status);
                assert_eq!(url, &format!("{}{}", api.uri(), RECORDS_PATH));
                assert_eq!(method, &reqwest::Method::POST);
            }
            other => panic!("expected ApiRequest for {status}, got {other:?}"),
        }

        let message = err.to_string();
        assert!(message.contains("Error calling Regery API"));
        assert!(message.contains(&status.to_string()));
        assert!(message.contains("POST"));
        assert!(message.contains(RECORDS_PATH));
    }
}

#[tokio::test]
async fn test_delete_failure_names_delete_method() {
    let api = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path(RECORDS_PATH))
        .respond_with(ResponseTemplate::new(404))
        .mount(&api)
        .await;

    let err = solver(&api, credential_store())
        .clean_up(&challenge(ChallengeAction::CleanUp))
        .await
        .unwrap_err();

    assert!(err.to_string().contains("DELETE"));
}

#[tokio::test]
async fn test_unreachable_api_is_transport_error() {
    let api = MockServer::start().await;
    let solver = solver(&api, credential_store()).with_api_url("http://127.0.0.1:1");

    let err = solver
        .present(&challenge(ChallengeAction::Present))
        .await
        .unwrap_err();
    assert!(matches!(err, SolverError::Transport(_)));
}

#[tokio::test]
async fn test_missing_api_key_makes_no_request() {
    let api = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&api)
        .await;

    let err = solver(&api, store_with(&[("api-secret", "S")]))
        .present(&challenge(ChallengeAction::Present))
        .await
        .unwrap_err();

    assert!(matches!(
        err.credential_error(),
        Some(CredentialError::MissingField { key: "api-key", .. })
    ));
    assert!(err.to_string().contains("api-key"));
}

#[tokio::test]
async fn test_missing_api_secret_makes_no_request() {
    let api = MockServer::start().await;
    Mock::given(method("DELETE"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&api)
        .await;

    let err = solver(&api, store_with(&[("api-key", "K")]))
        .clean_up(&challenge(ChallengeAction::CleanUp))
        .await
        .unwrap_err();

    assert!(matches!(
        err.credential_error(),
        Some(CredentialError::MissingField {
            key: "api-secret",
            ..
        })
    ));
}

#[tokio::test]
async fn test_absent_config_looks_up_empty_secret_name() {
    let api = MockServer::start().await;
    let mut request = challenge(ChallengeAction::Present);
    request.config = None;

    let err = solver(&api, credential_store())
        .present(&request)
        .await
        .unwrap_err();

    assert!(matches!(
        err.credential_error(),
        Some(CredentialError::SecretLookup { name, .. }) if name.is_empty()
    ));
    assert!(err.to_string().contains("cert-manager"));
}

#[tokio::test]
async fn test_malformed_config_is_decode_error() {
    let api = MockServer::start().await;
    let mut request = challenge(ChallengeAction::Present);
    request.config = Some(json!({ "secretName": 42 }));

    let err = solver(&api, StaticSecretStore::new())
        .present(&request)
        .await
        .unwrap_err();

    assert!(matches!(
        err.credential_error(),
        Some(CredentialError::ConfigDecode(_))
    ));
}
