#![allow(dead_code)]

use accessgate::configuration::Settings;
use accessgate::connectors::user_service::mock::MockUserServiceConnector;
use accessgate::models::RouteDeclaration;
use std::sync::Arc;

pub struct TestApp {
    pub address: String,
    pub user_service: Arc<MockUserServiceConnector>,
    pub client: reqwest::Client,
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.address, path)
    }

    pub async fn sign_in(&self, token: &str, user_id: &str) -> reqwest::Response {
        self.client
            .post(self.url("/session"))
            .bearer_auth(token)
            .json(&serde_json::json!({ "user_id": user_id, "tenant_id": "tenant-1" }))
            .send()
            .await
            .expect("Failed to execute request.")
    }

    pub async fn get(&self, token: &str, path: &str) -> reqwest::Response {
        self.client
            .get(self.url(path))
            .bearer_auth(token)
            .send()
            .await
            .expect("Failed to execute request.")
    }

    pub async fn post(
        &self,
        token: &str,
        path: &str,
        body: serde_json::Value,
    ) -> reqwest::Response {
        self.client
            .post(self.url(path))
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
            .expect("Failed to execute request.")
    }
}

pub fn test_settings() -> Settings {
    let mut settings = Settings::default();
    settings.access.session_retry_delay_ms = 20;
    settings.access.routes = serde_json::from_value::<Vec<RouteDeclaration>>(serde_json::json!([
        { "path": "/analytics", "moduleKey": "analytics", "feature": "analytics.view" },
        { "path": "/fees/refunds", "moduleKey": "refunds", "capability": "fees.refund" },
        { "path": "/students/:id", "moduleKey": "student-detail", "feature": "students.view" }
    ]))
    .expect("Failed to parse route declarations");
    settings
}

pub async fn spawn_app_with(
    settings: Settings,
    user_service: MockUserServiceConnector,
) -> TestApp {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    let user_service = Arc::new(user_service);
    let server = accessgate::startup::run(listener, settings, user_service.clone())
        .await
        .expect("Failed to bind address.");
    let _ = tokio::spawn(server);

    TestApp {
        address,
        user_service,
        client: reqwest::Client::new(),
    }
}

pub async fn spawn_app() -> TestApp {
    spawn_app_with(test_settings(), MockUserServiceConnector::new()).await
}
