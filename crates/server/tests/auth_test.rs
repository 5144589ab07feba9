//! # Authentication API Tests
//!
//! Registration, OTP verification, login, refresh, logout and the token
//! rejection codes, driven over HTTP against a spawned server.

mod common;

use anyhow::Result;
use chrono::Utc;
use common::{TestApp, status_and_body};
use core_access::Role;
use jsonwebtoken::{EncodingKey, Header, encode};
use serde_json::json;
use zygote_test_utils::TEST_PASSWORD;

const STRONG_PASSWORD: &str = "Heart@2024";

async fn register(app: &TestApp, email: &str, password: &str) -> Result<(u16, serde_json::Value)> {
    let response = app
        .post("/api/auth/register")
        .json(&json!({ "email": email, "password": password, "fullName": "Asha Rao" }))
        .send()
        .await?;
    status_and_body(response).await
}

#[tokio::test]
async fn register_verify_yields_tokens_for_a_student() -> Result<()> {
    let app = TestApp::spawn().await?;

    let (status, body) = register(&app, "Asha@Example.com", STRONG_PASSWORD).await?;
    assert_eq!(status, 201, "{body}");
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["email"], "asha@example.com");
    assert_eq!(body["data"]["otpSent"], true);

    let code = app
        .notifier
        .last_code_for("asha@example.com")
        .expect("an OTP was sent");
    assert_eq!(code.len(), 6);

    let response = app
        .post("/api/auth/verify-otp")
        .json(&json!({ "email": "asha@example.com", "otpCode": code }))
        .send()
        .await?;
    let (status, body) = status_and_body(response).await?;
    assert_eq!(status, 200, "{body}");
    assert_eq!(body["message"], "Email verified successfully.");
    assert_eq!(body["data"]["user"]["role"], "student");
    assert_eq!(body["data"]["user"]["isVerified"], true);
    let token = body["data"]["token"].as_str().unwrap().to_string();
    assert!(body["data"]["refreshToken"].as_str().is_some());

    let response = app.get("/api/auth/me").bearer_auth(&token).send().await?;
    let (status, body) = status_and_body(response).await?;
    assert_eq!(status, 200, "{body}");
    assert_eq!(body["data"]["user"]["email"], "asha@example.com");
    assert!(body["data"]["subscription"].is_null());

    // The same code cannot be used twice.
    let response = app
        .post("/api/auth/verify-otp")
        .json(&json!({ "email": "asha@example.com", "otpCode": code }))
        .send()
        .await?;
    let (status, body) = status_and_body(response).await?;
    assert_eq!(status, 400);
    assert_eq!(body["code"], "VALIDATION_ERROR");
    assert_eq!(body["message"], "Invalid or expired OTP.");
    Ok(())
}

#[tokio::test]
async fn duplicate_email_is_rejected_case_insensitively() -> Result<()> {
    let app = TestApp::spawn().await?;
    let (status, _) = register(&app, "dup@example.com", STRONG_PASSWORD).await?;
    assert_eq!(status, 201);

    let (status, body) = register(&app, "DUP@example.com", STRONG_PASSWORD).await?;
    assert_eq!(status, 400);
    assert_eq!(body["success"], false);
    assert_eq!(body["code"], "EMAIL_EXISTS");
    assert_eq!(body["message"], "Email already registered.");
    Ok(())
}

#[tokio::test]
async fn weak_password_creates_no_user() -> Result<()> {
    let app = TestApp::spawn().await?;
    let (status, body) = register(&app, "weak@example.com", "password").await?;
    assert_eq!(status, 400);
    assert_eq!(body["code"], "VALIDATION_ERROR");
    assert_eq!(app.count("SELECT COUNT(*) FROM users").await?, 0);
    assert!(app.notifier.sent().is_empty());
    Ok(())
}

#[tokio::test]
async fn malformed_json_is_a_validation_error() -> Result<()> {
    let app = TestApp::spawn().await?;
    let response = app
        .post("/api/auth/login")
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await?;
    let (status, body) = status_and_body(response).await?;
    assert_eq!(status, 400);
    assert_eq!(body["code"], "VALIDATION_ERROR");
    Ok(())
}

#[tokio::test]
async fn unverified_login_resends_code_instead_of_tokens() -> Result<()> {
    let app = TestApp::spawn().await?;
    let (_, registered) = register(&app, "late@example.com", STRONG_PASSWORD).await?;

    let response = app
        .post("/api/auth/login")
        .json(&json!({ "email": "late@example.com", "password": STRONG_PASSWORD }))
        .send()
        .await?;
    let (status, body) = status_and_body(response).await?;
    assert_eq!(status, 401);
    assert_eq!(body["code"], "EMAIL_NOT_VERIFIED");
    assert_eq!(body["data"]["userId"], registered["data"]["userId"]);
    assert_eq!(body["data"]["email"], "late@example.com");
    assert!(body["data"].get("token").is_none());
    assert_eq!(app.notifier.sent().len(), 2);
    Ok(())
}

#[tokio::test]
async fn wrong_password_and_unknown_email_look_the_same() -> Result<()> {
    let app = TestApp::spawn().await?;
    app.user_with_token("known@example.com", Role::Student).await?;

    for (email, password) in [
        ("known@example.com", "Wrong@1234"),
        ("nobody@example.com", TEST_PASSWORD),
    ] {
        let response = app
            .post("/api/auth/login")
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await?;
        let (status, body) = status_and_body(response).await?;
        assert_eq!(status, 401);
        assert_eq!(body["code"], "INVALID_CREDENTIALS");
        assert_eq!(body["message"], "Invalid email or password.");
    }
    Ok(())
}

#[tokio::test]
async fn resend_otp_rules() -> Result<()> {
    let app = TestApp::spawn().await?;
    register(&app, "resend@example.com", STRONG_PASSWORD).await?;
    app.user_with_token("verified@example.com", Role::Student).await?;

    let response = app
        .post("/api/auth/resend-otp")
        .json(&json!({ "email": "resend@example.com" }))
        .send()
        .await?;
    assert_eq!(response.status(), 200);
    assert_eq!(app.notifier.sent().len(), 2);

    let response = app
        .post("/api/auth/resend-otp")
        .json(&json!({ "email": "ghost@example.com" }))
        .send()
        .await?;
    let (status, body) = status_and_body(response).await?;
    assert_eq!(status, 404);
    assert_eq!(body["code"], "NOT_FOUND");

    let response = app
        .post("/api/auth/resend-otp")
        .json(&json!({ "email": "verified@example.com" }))
        .send()
        .await?;
    let (status, body) = status_and_body(response).await?;
    assert_eq!(status, 400);
    assert_eq!(body["message"], "Email already verified.");
    Ok(())
}

#[tokio::test]
async fn login_refresh_and_logout() -> Result<()> {
    let app = TestApp::spawn().await?;
    app.user_with_token("cycle@example.com", Role::Student).await?;

    let response = app
        .post("/api/auth/login")
        .json(&json!({ "email": "cycle@example.com", "password": TEST_PASSWORD }))
        .send()
        .await?;
    let (status, body) = status_and_body(response).await?;
    assert_eq!(status, 200, "{body}");
    let token = body["data"]["token"].as_str().unwrap().to_string();
    let refresh_token = body["data"]["refreshToken"].as_str().unwrap().to_string();
    assert!(body["data"]["user"]["lastLogin"].is_string());

    let response = app
        .post("/api/auth/refresh-token")
        .json(&json!({ "refreshToken": refresh_token }))
        .send()
        .await?;
    let (status, body) = status_and_body(response).await?;
    assert_eq!(status, 200, "{body}");
    let fresh = body["data"]["token"].as_str().unwrap();
    let response = app.get("/api/auth/me").bearer_auth(fresh).send().await?;
    assert_eq!(response.status(), 200);

    let response = app
        .post("/api/auth/logout")
        .bearer_auth(&token)
        .json(&json!({ "refreshToken": refresh_token }))
        .send()
        .await?;
    assert_eq!(response.status(), 200);

    let response = app
        .post("/api/auth/refresh-token")
        .json(&json!({ "refreshToken": refresh_token }))
        .send()
        .await?;
    let (status, body) = status_and_body(response).await?;
    assert_eq!(status, 401);
    assert_eq!(body["code"], "INVALID_TOKEN");
    Ok(())
}

#[tokio::test]
async fn logout_accepts_an_empty_body() -> Result<()> {
    let app = TestApp::spawn().await?;
    let (_, token) = app.user_with_token("quiet@example.com", Role::Student).await?;
    let response = app.post("/api/auth/logout").bearer_auth(&token).send().await?;
    let (status, body) = status_and_body(response).await?;
    assert_eq!(status, 200, "{body}");
    assert_eq!(body["message"], "Logged out successfully.");
    Ok(())
}

#[tokio::test]
async fn token_rejections_have_distinct_codes() -> Result<()> {
    let app = TestApp::spawn().await?;
    let (user, _) = app.user_with_token("codes@example.com", Role::Student).await?;

    let response = app.get("/api/auth/me").send().await?;
    let (status, body) = status_and_body(response).await?;
    assert_eq!(status, 401);
    assert_eq!(body["code"], "NO_TOKEN");

    let response = app.get("/api/auth/me").bearer_auth("garbage").send().await?;
    let (status, body) = status_and_body(response).await?;
    assert_eq!(status, 401);
    assert_eq!(body["code"], "INVALID_TOKEN");

    let now = Utc::now().timestamp();
    let expired = encode(
        &Header::default(),
        &json!({
            "sub": user.id,
            "email": user.email,
            "role": "student",
            "iat": now - 7200,
            "exp": now - 3600,
        }),
        &EncodingKey::from_secret(b"test-access-secret"),
    )?;
    let response = app.get("/api/auth/me").bearer_auth(&expired).send().await?;
    let (status, body) = status_and_body(response).await?;
    assert_eq!(status, 401);
    assert_eq!(body["code"], "TOKEN_EXPIRED");
    Ok(())
}
