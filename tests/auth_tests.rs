mod common;

use axum::http::StatusCode;
use common::{ADMIN_PASSWORD, ADMIN_USERNAME, TestClient, spawn_app, spawn_app_with, test_config};
use serde_json::json;

#[tokio::test]
async fn protected_routes_require_a_session() {
    let mut client = TestClient::new(spawn_app().await);

    let (status, body) = client.get("/api/courses").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "unauthorized");

    let (status, _) = client.get("/api/health").await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn login_returns_profile_and_csrf_token() {
    let mut client = TestClient::new(spawn_app().await);

    let (status, body) = client.login(ADMIN_USERNAME, ADMIN_PASSWORD).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["admin"]["public_id"], "ADM-1");
    assert!(body["data"]["admin"].get("password_hash").is_none());

    let (status, me) = client.get("/api/auth/me").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["data"]["admin"]["username"], ADMIN_USERNAME);
    assert_eq!(me["data"]["csrf_token"].as_str(), client.csrf.as_deref());
}

#[tokio::test]
async fn login_accepts_email_as_identifier() {
    let mut client = TestClient::new(spawn_app().await);
    let (status, _) = client.login("admin@eduflow.local", ADMIN_PASSWORD).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn login_reports_missing_fields() {
    let mut client = TestClient::new(spawn_app().await);

    let (status, body) = client.post("/api/auth/login", json!({})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "missing_fields");
    assert_eq!(body["fields"], json!(["username", "password"]));
}

#[tokio::test]
async fn login_regenerates_csrf_token() {
    let mut client = TestClient::new(spawn_app().await);

    let (status, body) = client.get("/api/csrf").await;
    assert_eq!(status, StatusCode::OK);
    let anonymous = body["data"]["csrf_token"].as_str().unwrap().to_string();

    client.login_as_admin().await;
    let fresh = client.csrf.clone().unwrap();
    assert_ne!(anonymous, fresh);

    client.csrf = Some(anonymous);
    let (status, body) = client.post("/api/courses", json!({ "name": "Algebra" })).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "csrf_token_invalid");

    client.csrf = Some(fresh);
    let (status, _) = client.post("/api/courses", json!({ "name": "Algebra" })).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn posts_without_csrf_are_rejected() {
    let mut client = TestClient::new(spawn_app().await);
    client.login_as_admin().await;

    let (status, body) = client
        .post_without_csrf_header("/api/courses", json!({ "name": "Physics" }))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "csrf_token_invalid");

    let token = client.csrf.clone().unwrap();
    let (status, body) = client
        .post_without_csrf_header(
            "/api/courses",
            json!({ "name": "Physics", "_csrf_token": token }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["public_id"], "C-1");
}

#[tokio::test]
async fn logout_ends_the_session() {
    let mut client = TestClient::new(spawn_app().await);
    client.login_as_admin().await;

    let (status, _) = client.post("/api/auth/logout", json!({})).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = client.get("/api/auth/me").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn pending_admin_cannot_log_in_until_approved() {
    let app = spawn_app().await;
    let mut newcomer = TestClient::new(app.clone());

    let (status, body) = newcomer
        .post(
            "/api/auth/signup",
            json!({ "username": "jdoe", "email": "jdoe@example.com", "password": "longenough" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["status"], "pending");
    let public_id = body["data"]["public_id"].as_str().unwrap().to_string();

    let (status, body) = newcomer.login("jdoe", "longenough").await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "account_pending");

    let mut admin = TestClient::new(app);
    admin.login_as_admin().await;

    let (status, body) = admin.get("/api/auth/requests").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 1);

    // Approval needs the settings unlock; with no PIN set the password works.
    let (status, body) = admin
        .post(
            &format!("/api/auth/requests/{public_id}"),
            json!({ "decision": "accept" }),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "settings_locked");

    let (status, body) = admin
        .post(
            &format!("/api/auth/requests/{public_id}"),
            json!({ "decision": "accept", "pin": ADMIN_PASSWORD }),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["status"], "active");

    let (status, _) = newcomer.login("jdoe", "longenough").await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn signup_rejects_duplicates_and_weak_passwords() {
    let mut client = TestClient::new(spawn_app().await);

    let (status, body) = client
        .post(
            "/api/auth/signup",
            json!({ "username": "admin", "email": "other@example.com", "password": "longenough" }),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "duplicate");

    let (status, body) = client
        .post(
            "/api/auth/signup",
            json!({ "username": "shorty", "email": "shorty@example.com", "password": "short" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "weak_password");
}

#[tokio::test]
async fn account_locks_after_repeated_failures() {
    let mut client = TestClient::new(spawn_app().await);

    for _ in 0..5 {
        let (status, body) = client.login(ADMIN_USERNAME, "wrong-password").await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "invalid_credentials");
    }

    let (status, locked) = client.login(ADMIN_USERNAME, ADMIN_PASSWORD).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(locked["error"], "too_many_attempts");
}

#[tokio::test]
async fn rate_limit_and_lockout_share_a_message() {
    let mut config = test_config();
    config.security.rate_limit_enabled = true;
    config.security.account_lock_enabled = false;
    let mut client = TestClient::new(spawn_app_with(config).await);

    for _ in 0..5 {
        let (status, _) = client.login(ADMIN_USERNAME, "wrong-password").await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    let (status, limited) = client.login(ADMIN_USERNAME, ADMIN_PASSWORD).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);

    let mut locked_client = TestClient::new(spawn_app().await);
    for _ in 0..5 {
        locked_client.login(ADMIN_USERNAME, "wrong-password").await;
    }
    let (_, locked) = locked_client.login(ADMIN_USERNAME, ADMIN_PASSWORD).await;

    assert_eq!(limited["message"], locked["message"]);
}

#[tokio::test]
async fn change_password_checks_current_password() {
    let mut client = TestClient::new(spawn_app().await);
    client.login_as_admin().await;

    let (status, body) = client
        .post(
            "/api/auth/password",
            json!({ "current_password": "nope", "new_password": "brand-new-pass" }),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "invalid_credentials");

    let (status, _) = client
        .post(
            "/api/auth/password",
            json!({ "current_password": ADMIN_PASSWORD, "new_password": "brand-new-pass" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = client.post("/api/auth/logout", json!({})).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = client.login(ADMIN_USERNAME, ADMIN_PASSWORD).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, _) = client.login(ADMIN_USERNAME, "brand-new-pass").await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn password_reset_token_is_single_use() {
    let mut client = TestClient::new(spawn_app().await);

    let (status, body) = client
        .post("/api/auth/password/forgot", json!({ "identifier": ADMIN_USERNAME }))
        .await;
    assert_eq!(status, StatusCode::OK);
    let token = body["data"]["token"].as_str().unwrap().to_string();

    let (status, _) = client
        .post(
            "/api/auth/password/reset",
            json!({ "token": token, "password": "after-reset" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = client
        .post(
            "/api/auth/password/reset",
            json!({ "token": token, "password": "second-try" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid_token");

    let (status, _) = client.login(ADMIN_USERNAME, "after-reset").await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn unknown_reset_identifier_still_answers_ok() {
    let mut client = TestClient::new(spawn_app().await);

    let (status, body) = client
        .post("/api/auth/password/forgot", json!({ "identifier": "ghost" }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["data"].get("token").is_none());
}

#[tokio::test]
async fn two_factor_login_needs_the_mailed_code() {
    let mut config = test_config();
    config.security.login_two_factor_enabled = true;
    let mut client = TestClient::new(spawn_app_with(config).await);

    let (status, body) = client.login(ADMIN_USERNAME, ADMIN_PASSWORD).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["two_factor_required"], true);
    let code = body["data"]["code"].as_str().unwrap().to_string();

    let (status, _) = client.get("/api/auth/me").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = client
        .post(
            "/api/auth/login",
            json!({ "username": ADMIN_USERNAME, "password": ADMIN_PASSWORD, "code": "000000x" }),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "invalid_2fa");

    // The wrong guess discarded the challenge, so the right code is stale now.
    let (status, body) = client
        .post(
            "/api/auth/login",
            json!({ "username": ADMIN_USERNAME, "password": ADMIN_PASSWORD, "code": code }),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "invalid_2fa");

    let (status, body) = client
        .post("/api/auth/2fa/resend", json!({ "username": ADMIN_USERNAME }))
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let code = body["data"]["code"].as_str().unwrap().to_string();

    let (status, body) = client
        .post(
            "/api/auth/login",
            json!({ "username": ADMIN_USERNAME, "password": ADMIN_PASSWORD, "code": code }),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["admin"]["public_id"], "ADM-1");
    assert!(body["data"]["csrf_token"].is_string());

    let (status, _) = client.get("/api/auth/me").await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn login_code_resend_does_not_reveal_accounts() {
    let mut config = test_config();
    config.security.login_two_factor_enabled = true;
    let mut client = TestClient::new(spawn_app_with(config).await);

    let (status, body) = client
        .post("/api/auth/2fa/resend", json!({ "username": "nobody" }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "ok");
    assert!(body["data"].get("code").is_none());
}
