use std::time::Duration;

use serde_json::{Value, json};
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub use super::access::tests::ACCESS_DOCUMENT;
use super::{AuthRequest, CredentialNegotiator, Error, Scope};
use crate::secret::Secret;

pub fn access_document() -> Value {
    serde_json::from_str(ACCESS_DOCUMENT).unwrap()
}

fn unauthorized_document() -> Value {
    json!({
        "error": {
            "message": "The request you have made requires authentication.",
            "code": 401,
            "title": "Unauthorized"
        }
    })
}

fn negotiator() -> CredentialNegotiator {
    CredentialNegotiator::new(Duration::from_secs(5)).unwrap()
}

fn key_pair_request(server: &MockServer) -> AuthRequest {
    AuthRequest::new(
        &format!("{}/v2.0", server.uri()),
        Some("AKIA123".to_string()),
        Some(Secret::from("secret")),
        None,
        Scope::tenant("123"),
    )
    .unwrap()
}

fn token_request(server: &MockServer) -> AuthRequest {
    AuthRequest::new(
        &format!("{}/v2.0", server.uri()),
        None,
        None,
        Some(Secret::from("existing-token")),
        Scope::tenant("123"),
    )
    .unwrap()
}

fn access_key_body() -> Value {
    json!({
        "auth": {
            "apiAccessKeyCredentials": { "accessKey": "AKIA123", "secretKey": "secret" }
        }
    })
}

fn password_body() -> Value {
    json!({
        "auth": {
            "passwordCredentials": { "username": "AKIA123", "password": "secret" }
        }
    })
}

async fn recorded_bodies(server: &MockServer) -> Vec<Value> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .map(|request| serde_json::from_slice(&request.body).unwrap())
        .collect()
}

#[tokio::test]
async fn test_access_key_success_makes_one_request() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v2.0/tokens"))
        .and(header("Content-Type", "application/json"))
        .and(body_partial_json(access_key_body()))
        .respond_with(ResponseTemplate::new(200).set_body_json(access_document()))
        .expect(1)
        .mount(&server)
        .await;

    let access = negotiator()
        .authenticate(&key_pair_request(&server))
        .await
        .unwrap();

    assert_eq!(access.token.id.expose(), "ab48a9efdfedb23ty3494");
    assert_eq!(access.user.name, "AKIA123");

    let bodies = recorded_bodies(&server).await;
    assert_eq!(bodies.len(), 1);
    assert_eq!(bodies[0]["auth"]["tenantId"], "123");
    assert!(bodies[0]["auth"].get("passwordCredentials").is_none());
}

#[tokio::test]
async fn test_unauthorized_access_key_falls_back_to_password() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v2.0/tokens"))
        .and(body_partial_json(access_key_body()))
        .respond_with(ResponseTemplate::new(401).set_body_json(unauthorized_document()))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/v2.0/tokens"))
        .and(body_partial_json(password_body()))
        .respond_with(ResponseTemplate::new(200).set_body_json(access_document()))
        .expect(1)
        .mount(&server)
        .await;

    let result = negotiator().authenticate(&key_pair_request(&server)).await;
    assert!(result.is_ok());

    let bodies = recorded_bodies(&server).await;
    assert_eq!(bodies.len(), 2);

    assert_eq!(
        bodies[0],
        json!({
            "auth": {
                "apiAccessKeyCredentials": { "accessKey": "AKIA123", "secretKey": "secret" },
                "tenantId": "123"
            }
        })
    );
    assert_eq!(
        bodies[1],
        json!({
            "auth": {
                "passwordCredentials": { "username": "AKIA123", "password": "secret" },
                "tenantId": "123"
            }
        })
    );
}

#[tokio::test]
async fn test_fallback_result_is_final() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v2.0/tokens"))
        .respond_with(ResponseTemplate::new(401).set_body_json(unauthorized_document()))
        .expect(2)
        .mount(&server)
        .await;

    let result = negotiator().authenticate(&key_pair_request(&server)).await;
    assert_eq!(
        result.unwrap_err(),
        Error::Unauthorized("The request you have made requires authentication.".to_string())
    );
}

#[tokio::test]
async fn test_fallback_forbidden_is_surfaced() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(body_partial_json(access_key_body()))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(body_partial_json(password_body()))
        .respond_with(ResponseTemplate::new(403))
        .expect(1)
        .mount(&server)
        .await;

    let result = negotiator().authenticate(&key_pair_request(&server)).await;
    assert!(matches!(result, Err(Error::Forbidden(_))));
}

#[tokio::test]
async fn test_token_is_never_retried() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v2.0/tokens"))
        .and(header("X-Auth-Token", "existing-token"))
        .and(body_partial_json(json!({ "auth": { "token": { "id": "existing-token" } } })))
        .respond_with(ResponseTemplate::new(401).set_body_json(unauthorized_document()))
        .expect(1)
        .mount(&server)
        .await;

    let result = negotiator().authenticate(&token_request(&server)).await;
    assert!(matches!(result, Err(Error::Unauthorized(_))));
}

#[tokio::test]
async fn test_token_success() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(header("X-Auth-Token", "existing-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(access_document()))
        .expect(1)
        .mount(&server)
        .await;

    let access = negotiator()
        .authenticate(&token_request(&server))
        .await
        .unwrap();
    assert_eq!(access.token.tenant.unwrap().id, "123");

    let bodies = recorded_bodies(&server).await;
    assert!(bodies[0]["auth"].get("apiAccessKeyCredentials").is_none());
    assert_eq!(bodies[0]["auth"]["tenantId"], "123");
}

#[tokio::test]
async fn test_terminal_statuses_are_not_retried() {
    let cases: [(u16, fn(&Error) -> bool); 3] = [
        (403, |e| matches!(e, Error::Forbidden(_))),
        (404, |e| matches!(e, Error::NotFound(_))),
        (500, |e| matches!(e, Error::Provider(_))),
    ];

    for (status, is_expected) in cases {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(status))
            .expect(1)
            .mount(&server)
            .await;

        let error = negotiator()
            .authenticate(&key_pair_request(&server))
            .await
            .unwrap_err();
        assert!(is_expected(&error), "unexpected error for {status}: {error}");
    }
}

#[tokio::test]
async fn test_bad_request_does_not_fall_back() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": {
                "message": "Expecting to find passwordCredentials in auth",
                "code": 400,
                "title": "Bad Request"
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let error = negotiator()
        .authenticate(&key_pair_request(&server))
        .await
        .unwrap_err();

    assert_eq!(
        error,
        Error::Provider(
            "Unexpected status 400 Bad Request: Expecting to find passwordCredentials in auth"
                .to_string()
        )
    );
}

#[tokio::test]
async fn test_unreadable_success_body_is_provider_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>proxy</html>"))
        .expect(1)
        .mount(&server)
        .await;

    let result = negotiator().authenticate(&key_pair_request(&server)).await;
    assert!(matches!(result, Err(Error::Provider(_))));
}

#[tokio::test]
async fn test_success_without_access_is_authorization_failure() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "version": "v2.0" })))
        .expect(1)
        .mount(&server)
        .await;

    let result = negotiator().authenticate(&key_pair_request(&server)).await;
    assert!(matches!(result, Err(Error::AuthorizationFailure(_))));
}

#[tokio::test]
async fn test_expired_token_is_authorization_failure() {
    let server = MockServer::start().await;

    let mut document = access_document();
    document["access"]["token"]["expires"] = json!("2012-02-05T00:00:00Z");

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(document))
        .expect(1)
        .mount(&server)
        .await;

    let result = negotiator().authenticate(&key_pair_request(&server)).await;
    assert_eq!(
        result.err(),
        Some(Error::AuthorizationFailure(
            "Issued token has already expired".to_string()
        ))
    );
}

#[tokio::test]
async fn test_unreachable_provider_is_provider_error() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let address = listener.local_addr().unwrap();
    drop(listener);

    let request = AuthRequest::new(
        &format!("http://{address}/v2.0"),
        Some("AKIA123".to_string()),
        Some(Secret::from("secret")),
        None,
        Scope::tenant("123"),
    )
    .unwrap();

    let result = negotiator().authenticate(&request).await;
    assert!(matches!(result, Err(Error::Provider(_))));
}

#[tokio::test]
async fn test_slow_provider_times_out() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(access_document())
                .set_delay(Duration::from_secs(2)),
        )
        .mount(&server)
        .await;

    let negotiator = CredentialNegotiator::new(Duration::from_millis(100)).unwrap();
    let result = negotiator.authenticate(&key_pair_request(&server)).await;

    assert!(matches!(result, Err(Error::Provider(msg)) if msg.contains("timed out")));
}
