#![allow(dead_code)]

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use eduflow::config::Config;
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

pub const ADMIN_USERNAME: &str = "admin";
pub const ADMIN_PASSWORD: &str = "password";

pub fn test_config() -> Config {
    let mut config = Config::default();
    config.general.database_path = "sqlite::memory:".to_string();
    config.server.secure_cookies = false;
    config.observability.metrics_enabled = false;
    config.security.argon2_memory_cost_kib = 1024;
    config.security.argon2_time_cost = 1;
    config.security.expose_verification_codes = true;
    config.security.login_two_factor_enabled = false;
    config
}

pub async fn spawn_app_with(config: Config) -> Router {
    let state = eduflow::api::create_app_state_from_config(config, None)
        .await
        .expect("Failed to create app state");
    eduflow::api::router(state)
        .await
        .expect("Failed to build router")
}

pub async fn spawn_app() -> Router {
    spawn_app_with(test_config()).await
}

/// A browser stand-in: keeps the session cookie and CSRF token between
/// requests.
pub struct TestClient {
    app: Router,
    cookie: Option<String>,
    pub csrf: Option<String>,
}

impl TestClient {
    pub fn new(app: Router) -> Self {
        Self {
            app,
            cookie: None,
            csrf: None,
        }
    }

    pub async fn get(&mut self, uri: &str) -> (StatusCode, Value) {
        self.request("GET", uri, None, true).await
    }

    pub async fn post(&mut self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.request("POST", uri, Some(body), true).await
    }

    /// POST without the `X-CSRF-Token` header.
    pub async fn post_without_csrf_header(
        &mut self,
        uri: &str,
        body: Value,
    ) -> (StatusCode, Value) {
        self.request("POST", uri, Some(body), false).await
    }

    pub async fn login(&mut self, username: &str, password: &str) -> (StatusCode, Value) {
        let (status, body) = self
            .post(
                "/api/auth/login",
                serde_json::json!({ "username": username, "password": password }),
            )
            .await;
        if status == StatusCode::OK {
            self.csrf = body["data"]["csrf_token"].as_str().map(str::to_string);
        }
        (status, body)
    }

    pub async fn login_as_admin(&mut self) {
        let (status, body) = self.login(ADMIN_USERNAME, ADMIN_PASSWORD).await;
        assert_eq!(status, StatusCode::OK, "login failed: {body}");
    }

    async fn request(
        &mut self,
        method: &str,
        uri: &str,
        body: Option<Value>,
        with_csrf: bool,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);

        if let Some(cookie) = &self.cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        if with_csrf && let Some(token) = &self.csrf {
            builder = builder.header("X-CSRF-Token", token);
        }

        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();

        if let Some(set_cookie) = response
            .headers()
            .get(header::SET_COOKIE)
            .and_then(|v| v.to_str().ok())
            && let Some(pair) = set_cookie.split(';').next()
        {
            self.cookie = Some(pair.trim().to_string());
        }

        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };

        (status, json)
    }

    /// Requests and redeems a permission access code for the admin.
    pub async fn grant_permission_access(&mut self) {
        let (status, body) = self
            .post(
                "/api/permissions/request-access",
                serde_json::json!({ "username": ADMIN_USERNAME }),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "request-access failed: {body}");
        let code = body["data"]["code"].as_str().unwrap().to_string();

        let (status, body) = self
            .post(
                "/api/permissions/verify-access",
                serde_json::json!({ "code": code }),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "verify-access failed: {body}");
        assert_eq!(body["data"]["access_granted"], true);
    }
}
