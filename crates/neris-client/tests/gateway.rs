//! End-to-end gateway tests against a mock identity provider and API.

use std::time::Duration;

use assert_matches::assert_matches;
use chrono::{TimeDelta, Utc};
use neris_auth::{AuthError, AuthState, AuthStatus, ProviderConfig, TokenCache, TokenSet};
use neris_client::{ApiClient, CallOutcome, ClientError, Method, Payload, RequestFailure};
use neris_settings::{CredentialConfig, Environment, Grant, NerisSettings};
use serde_json::json;
use tempfile::TempDir;
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

fn base_url(server: &MockServer) -> String {
    format!("{}/v1", server.uri())
}

fn client_credentials_client(server: &MockServer) -> ApiClient {
    let grant = Grant::client_credentials("id1", "secret1").unwrap();
    ApiClient::new(CredentialConfig::new(base_url(server), grant)).unwrap()
}

fn token_response(access: &str, refresh: Option<&str>) -> ResponseTemplate {
    let mut body = json!({"access_token": access, "expires_in": 3600});
    if let Some(refresh) = refresh {
        body["refresh_token"] = json!(refresh);
    }
    ResponseTemplate::new(200).set_body_json(body)
}

fn expired(refresh: &str) -> TokenSet {
    TokenSet {
        access_token: "AT-old".into(),
        refresh_token: refresh.into(),
        expires_at: Utc::now() - TimeDelta::seconds(5),
    }
}

async fn mount_health(server: &MockServer, bearer: &str, times: u64) {
    Mock::given(method("GET"))
        .and(path("/v1/health"))
        .and(header("authorization", format!("Bearer {bearer}").as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "ok"})))
        .expect(times)
        .mount(server)
        .await;
}

// ── end to end ──────────────────────────────────────────────────────────

#[tokio::test]
async fn client_credentials_end_to_end() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/token"))
        .and(header("authorization", "Basic aWQxOnNlY3JldDE="))
        .and(body_string_contains("grant_type=client_credentials"))
        .respond_with(token_response("AT1", Some("RT1")))
        .expect(1)
        .mount(&server)
        .await;
    mount_health(&server, "AT1", 2).await;

    let client = client_credentials_client(&server);
    let outcome = client.call(Method::GET, "/health", None, None).await.unwrap();
    assert_eq!(outcome, CallOutcome::Success(Payload::Json(json!({"status": "ok"}))));

    // Token is reused.
    assert!(client.health().await.unwrap().is_success());
    assert_eq!(client.auth_state(), Some(AuthState::Authenticated));
}

#[tokio::test]
async fn valid_cached_token_performs_no_negotiation() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let provider = ProviderConfig {
        token_url: format!("{}/token", base_url(&server)),
        client_id: None,
    };
    let cached = TokenSet {
        access_token: "AT-cached".into(),
        refresh_token: "RT-cached".into(),
        expires_at: Utc::now() + TimeDelta::seconds(600),
    };
    TokenCache::new(dir.path()).save(&provider, "alice", &cached).unwrap();

    Mock::given(method("POST"))
        .and(path("/v1/token"))
        .respond_with(token_response("AT-new", None))
        .expect(0)
        .mount(&server)
        .await;
    mount_health(&server, "AT-cached", 1).await;

    let grant = Grant::password("alice", "pw").unwrap();
    let config = CredentialConfig::new(base_url(&server), grant)
        .with_token_cache(dir.path())
        .unwrap();
    let client = ApiClient::new(config).unwrap();

    assert!(client.health().await.unwrap().is_success());
}

// ── refresh and fallback ────────────────────────────────────────────────

#[tokio::test]
async fn expired_token_refreshes_once_before_call() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/token"))
        .and(body_string_contains("grant_type=refresh_token"))
        .and(body_string_contains("refresh_token=RT1"))
        .respond_with(token_response("AT2", None))
        .expect(1)
        .mount(&server)
        .await;
    mount_health(&server, "AT2", 1).await;

    let client = client_credentials_client(&server);
    client.restore_session(expired("RT1"));

    assert!(client.health().await.unwrap().is_success());
    let tokens = client.negotiator().unwrap().tokens();
    assert_eq!(tokens.access_token, "AT2");
    assert_eq!(tokens.refresh_token, "RT1");
}

#[tokio::test]
async fn failed_refresh_falls_back_to_one_acquisition() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/token"))
        .and(body_string_contains("grant_type=refresh_token"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({"error": "invalid_grant"})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/token"))
        .and(body_string_contains("grant_type=client_credentials"))
        .respond_with(token_response("AT3", Some("RT3")))
        .expect(1)
        .mount(&server)
        .await;
    mount_health(&server, "AT3", 1).await;

    let client = client_credentials_client(&server);
    client.restore_session(expired("RT1"));

    assert!(client.health().await.unwrap().is_success());
}

#[tokio::test]
async fn second_failure_surfaces_without_third_attempt() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/token"))
        .and(body_string_contains("grant_type=refresh_token"))
        .respond_with(ResponseTemplate::new(400))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/token"))
        .and(body_string_contains("grant_type=client_credentials"))
        .respond_with(ResponseTemplate::new(401).set_body_string("invalid_client"))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/health"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let client = client_credentials_client(&server);
    client.restore_session(expired("RT1"));

    let err = client.health().await.unwrap_err();
    assert_matches!(
        err,
        ClientError::Auth(AuthError::Authentication { status: 401, .. })
    );
}

#[tokio::test]
async fn concurrent_calls_share_one_refresh() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/token"))
        .respond_with(token_response("AT2", Some("RT2")).set_delay(Duration::from_millis(200)))
        .expect(1)
        .mount(&server)
        .await;
    mount_health(&server, "AT2", 3).await;

    let client = client_credentials_client(&server);
    client.restore_session(expired("RT1"));
    let (second, third) = (client.clone(), client.clone());

    let (a, b, c) = tokio::join!(client.health(), second.health(), third.health());
    for outcome in [a, b, c] {
        assert!(outcome.unwrap().is_success());
    }
}

// ── MFA ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn password_challenge_then_code() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/token"))
        .and(body_string_contains("grant_type=password"))
        .respond_with(
            ResponseTemplate::new(202)
                .set_body_json(json!({"challenge_name": "SMS_MFA", "session": "sess-1"})),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/token"))
        .and(body_string_contains("grant_type=SMS_MFA"))
        .and(body_string_contains("SMS_MFA=123456"))
        .respond_with(token_response("AT1", Some("RT1")))
        .expect(1)
        .mount(&server)
        .await;
    mount_health(&server, "AT1", 1).await;

    let grant = Grant::password("alice", "pw").unwrap();
    let client = ApiClient::new(CredentialConfig::new(base_url(&server), grant)).unwrap();

    let err = client.health().await.unwrap_err();
    assert_eq!(err.challenge().map(|c| c.name.as_str()), Some("SMS_MFA"));
    assert_eq!(client.auth_state(), Some(AuthState::AwaitingChallenge));

    // Still suspended: no token is attached and nothing is sent.
    assert_matches!(client.health().await, Err(ClientError::Auth(AuthError::ChallengeRequired(_))));

    let status = client.submit_challenge_response("123456").await.unwrap();
    assert_matches!(status, AuthStatus::Authenticated { warning: None });
    assert!(client.health().await.unwrap().is_success());
}

// ── local environment ───────────────────────────────────────────────────

#[tokio::test]
async fn local_calls_carry_no_authorization() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(token_response("AT1", None))
        .expect(0)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(|req: &Request| {
            if req.headers.contains_key("authorization") {
                ResponseTemplate::new(400)
            } else {
                ResponseTemplate::new(200).set_body_json(json!({"status": "ok"}))
            }
        })
        .expect(1)
        .mount(&server)
        .await;

    let settings = NerisSettings {
        base_url: server.uri(),
        environment: Environment::Local,
        ..NerisSettings::default()
    };
    let client = ApiClient::from_settings(&settings).unwrap();
    assert!(client.health().await.unwrap().is_success());
}

// ── response classification ─────────────────────────────────────────────

#[tokio::test]
async fn non_success_statuses_are_values() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/entity/FD00000000"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({"detail": "Not found"})))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/user/u1"))
        .respond_with(ResponseTemplate::new(500).set_body_string("Internal Server Error"))
        .mount(&server)
        .await;

    let client = ApiClient::new(CredentialConfig::local(server.uri())).unwrap();

    let outcome = client.get_entity("FD00000000").await.unwrap();
    assert_eq!(
        outcome,
        CallOutcome::Failure(RequestFailure {
            status: 404,
            payload: Payload::Json(json!({"detail": "Not found"})),
        })
    );

    let outcome = client.get_user("u1").await.unwrap();
    assert_matches!(
        outcome,
        CallOutcome::Failure(RequestFailure { status: 500, payload: Payload::Text(text) })
            if text == "Internal Server Error"
    );
}

// ── debug records ───────────────────────────────────────────────────────

#[tokio::test]
async fn debug_mode_logs_masked_record_per_call() {
    let (logs, _guard) = neris_logging::capture_logs();
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/token"))
        .respond_with(token_response("AT1", Some("RT1")))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/incident/FD24027000"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"incidents": []})))
        .mount(&server)
        .await;

    let grant = Grant::client_credentials("id1", "secret1").unwrap();
    let config = CredentialConfig::new(base_url(&server), grant).with_debug(true);
    let client = ApiClient::new(config).unwrap();
    let _ = client
        .list_incidents("FD24027000", Some(&[("page_size", "5")]))
        .await
        .unwrap();

    let calls: Vec<_> = logs
        .events_for_target(neris_logging::DEBUG_TARGET)
        .into_iter()
        .filter(|e| e.message == "api call")
        .collect();
    assert_eq!(calls.len(), 1);

    let record: serde_json::Value = serde_json::from_str(calls[0].field("record").unwrap()).unwrap();
    assert_eq!(record["request"]["method"], "GET");
    assert_eq!(record["request"]["params"]["page_size"], "5");
    assert_eq!(record["request"]["headers"]["authorization"], "Bearer ***");
    assert_eq!(record["response"]["status"], 200);
    assert_eq!(record["response"]["body"], json!({"incidents": []}));

    for event in logs.events_for_target(neris_logging::DEBUG_TARGET) {
        let text = event.field("record").unwrap_or_default();
        assert!(!text.contains("AT1"));
        assert!(!text.contains("RT1"));
    }
}

#[tokio::test]
async fn debug_off_logs_nothing() {
    let (logs, _guard) = neris_logging::capture_logs();
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let client = ApiClient::new(CredentialConfig::local(server.uri())).unwrap();
    let _ = client.health().await.unwrap();
    assert!(logs.events_for_target(neris_logging::DEBUG_TARGET).is_empty());
}

// ── persistence and configuration ───────────────────────────────────────

#[tokio::test]
async fn cache_write_failure_does_not_fail_the_call() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let blocker = dir.path().join("blocker");
    std::fs::write(&blocker, "x").unwrap();

    Mock::given(method("POST"))
        .and(path("/v1/token"))
        .respond_with(token_response("AT1", Some("RT1")))
        .expect(1)
        .mount(&server)
        .await;
    mount_health(&server, "AT1", 1).await;

    let grant = Grant::password("alice", "pw").unwrap();
    let config = CredentialConfig::new(base_url(&server), grant)
        .with_token_cache(&blocker)
        .unwrap();
    let client = ApiClient::new(config).unwrap();

    assert!(client.health().await.unwrap().is_success());
    assert_eq!(client.auth_state(), Some(AuthState::Authenticated));
}

#[tokio::test]
async fn tokens_are_cached_for_the_next_client() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    Mock::given(method("POST"))
        .and(path("/v1/token"))
        .respond_with(token_response("AT1", Some("RT1")))
        .expect(1)
        .mount(&server)
        .await;
    mount_health(&server, "AT1", 2).await;

    for _ in 0..2 {
        let grant = Grant::password("alice", "pw").unwrap();
        let config = CredentialConfig::new(base_url(&server), grant)
            .with_token_cache(dir.path())
            .unwrap();
        let client = ApiClient::new(config).unwrap();
        assert!(client.health().await.unwrap().is_success());
    }
}

#[test]
fn missing_secret_fails_at_construction() {
    for grant_type in ["client_credentials", "password", "refresh_token"] {
        let settings = NerisSettings {
            grant_type: Some(grant_type.into()),
            ..NerisSettings::default()
        };
        let err = ApiClient::from_settings(&settings).unwrap_err();
        assert_matches!(err, ClientError::Configuration(_), "grant {grant_type}");
    }
}
