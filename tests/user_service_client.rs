use accessgate::connectors::{
    ConnectorError, UserServiceClient, UserServiceConfig, UserServiceConnector,
};
use accessgate::models::{FeatureKey, OnboardingStatus, PlanTier, Session};
use accessgate::services::{
    EntitlementResolver, InMemorySessionStore, NavigationOutcome, OnboardingGate,
    OnboardingGateConfig, RecordingNavigator, ResolvePolicy, SatisfiedReason,
};
use serde_json::json;
use std::sync::Arc;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client(server: &MockServer) -> UserServiceClient {
    UserServiceClient::new(UserServiceConfig {
        enabled: true,
        base_url: server.uri(),
        timeout_secs: 2,
        auth_token: None,
    })
    .expect("Failed to build client")
}

fn session() -> Session {
    Session::new("u-42", "user-token", Some("tenant-1".to_string()))
}

#[tokio::test]
async fn entitlements_are_fetched_with_bearer_token() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/1.0/entitlements"))
        .and(header("Authorization", "Bearer user-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "plan": "starter",
            "role": "staff",
            "features": ["attendance.track"],
            "capabilities": ["students.create"]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let payload = client(&server).fetch_entitlements(&session()).await.unwrap();
    assert_eq!(payload.plan, "starter");
    assert_eq!(payload.features, vec![FeatureKey::AttendanceTrack]);
}

#[tokio::test]
async fn status_codes_map_to_connector_errors() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/1.0/entitlements"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/1.0/profiles/u-42"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/1.0/tenants/repair"))
        .respond_with(ResponseTemplate::new(403).set_body_string("forbidden"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/1.0/tenant_memberships"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let client = client(&server);
    assert_eq!(
        client.fetch_entitlements(&session()).await,
        Err(ConnectorError::NoActiveSession)
    );
    assert!(client
        .get_user_profile(&session())
        .await
        .unwrap_err()
        .is_not_found());
    assert_eq!(
        client.repair_tenant(&session()).await,
        Err(ConnectorError::Unauthorized("forbidden".to_string()))
    );
    assert!(matches!(
        client.list_tenant_memberships(&session()).await,
        Err(ConnectorError::ServiceUnavailable(_))
    ));
}

#[tokio::test]
async fn profile_is_read_and_provisioned() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/1.0/profiles/u-42"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "u-42",
            "email": "u42@example.com",
            "onboarding_status": "pending"
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/1.0/profiles"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "id": "u-42",
            "email": "u42@example.com",
            "onboarding_status": "pending",
            "tenant_ref": "tenant-1"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client(&server);
    let profile = client.get_user_profile(&session()).await.unwrap();
    assert_eq!(profile.onboarding_status, OnboardingStatus::Pending);

    let provisioned = client.provision_profile(&session()).await.unwrap();
    assert_eq!(provisioned.tenant_ref.as_deref(), Some("tenant-1"));
}

#[tokio::test]
async fn profile_without_status_fails_open() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/1.0/profiles/u-42"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "u-42",
            "email": "u42@example.com"
        })))
        .mount(&server)
        .await;

    let client = Arc::new(client(&server));
    assert!(matches!(
        client.get_user_profile(&session()).await,
        Err(ConnectorError::InvalidResponse(_))
    ));

    let navigator = Arc::new(RecordingNavigator::new());
    let gate = OnboardingGate::new(
        OnboardingGateConfig::default(),
        Arc::new(InMemorySessionStore::with_session(session())),
        client,
        navigator.clone(),
    );
    let outcome = gate.on_navigate("/students").await;

    assert_eq!(
        outcome,
        NavigationOutcome::Proceed {
            reason: SatisfiedReason::CheckFailed
        }
    );
    assert!(navigator.commands().is_empty());
}

#[tokio::test]
async fn memberships_accept_eve_envelope_and_bare_list() {
    let membership = json!({
        "user_id": "u-42",
        "tenant_id": "tenant-1",
        "role": "owner",
        "status": "active",
        "tenant": { "plan": "scale", "status": "active" }
    });

    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/1.0/tenant_memberships"))
        .and(query_param("user_id", "u-42"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "_items": [membership] })))
        .mount(&server)
        .await;
    let memberships = client(&server)
        .list_tenant_memberships(&session())
        .await
        .unwrap();
    assert_eq!(memberships.len(), 1);
    assert_eq!(memberships[0].tenant.plan, PlanTier::Scale);

    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/1.0/tenant_memberships"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([membership])))
        .mount(&server)
        .await;
    let memberships = client(&server)
        .list_tenant_memberships(&session())
        .await
        .unwrap();
    assert!(memberships[0].is_active());
}

#[tokio::test]
async fn resolver_falls_back_when_backend_errors() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/1.0/entitlements"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let resolver = EntitlementResolver::new(
        Arc::new(client(&server)),
        Arc::new(InMemorySessionStore::with_session(session())),
        ResolvePolicy::default(),
    );
    let snapshot = resolver.resolve().await;

    assert!(snapshot.is_initialized);
    assert!(snapshot.is_fallback());
    assert_eq!(snapshot.plan, PlanTier::Free);
}
