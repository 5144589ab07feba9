//! # Subscription API Tests

mod common;

use anyhow::Result;
use chrono::{DateTime, Months, Utc};
use common::{TestApp, status_and_body};
use core_access::Role;
use serde_json::json;

#[tokio::test]
async fn plans_are_public() -> Result<()> {
    let app = TestApp::spawn().await?;
    let response = app.get("/api/subscriptions/plans").send().await?;
    let (status, body) = status_and_body(response).await?;
    assert_eq!(status, 200);

    let plans = body["data"].as_array().unwrap();
    let ids: Vec<&str> = plans.iter().map(|p| p["id"].as_str().unwrap()).collect();
    assert_eq!(ids, ["6_months", "12_months", "24_months"]);
    assert_eq!(plans[1]["price"], 4999);
    assert_eq!(plans[1]["popular"], true);
    assert!(plans[0].get("popular").is_none());
    Ok(())
}

#[tokio::test]
async fn subscribing_then_cancelling() -> Result<()> {
    let app = TestApp::spawn().await?;
    let (_, token) = app.user_with_token("payer@zygote.test", Role::Student).await?;

    let response = app
        .get("/api/subscriptions/my-subscription")
        .bearer_auth(&token)
        .send()
        .await?;
    let (status, body) = status_and_body(response).await?;
    assert_eq!(status, 200);
    assert!(body["data"].is_null());

    let response = app
        .post("/api/subscriptions/create")
        .bearer_auth(&token)
        .json(&json!({ "planType": "12_months" }))
        .send()
        .await?;
    let (status, body) = status_and_body(response).await?;
    assert_eq!(status, 201, "{body}");
    assert_eq!(body["data"]["status"], "active");
    assert_eq!(body["data"]["planType"], "12_months");

    let start: DateTime<Utc> = body["data"]["startDate"].as_str().unwrap().parse()?;
    let end: DateTime<Utc> = body["data"]["endDate"].as_str().unwrap().parse()?;
    assert_eq!(start.checked_add_months(Months::new(12)), Some(end));

    let response = app.get("/api/auth/me").bearer_auth(&token).send().await?;
    let (_, body) = status_and_body(response).await?;
    assert_eq!(body["data"]["subscription"]["planType"], "12_months");

    let response = app
        .post("/api/subscriptions/cancel")
        .bearer_auth(&token)
        .send()
        .await?;
    let (status, body) = status_and_body(response).await?;
    assert_eq!(status, 200, "{body}");
    assert_eq!(body["message"], "Subscription cancelled successfully.");
    assert_eq!(body["data"]["status"], "cancelled");
    assert_eq!(body["data"]["planType"], "12_months");
    assert_eq!(body["data"]["autoRenew"], false);

    let response = app
        .get("/api/subscriptions/my-subscription")
        .bearer_auth(&token)
        .send()
        .await?;
    let (_, body) = status_and_body(response).await?;
    assert!(body["data"].is_null());

    let response = app
        .post("/api/subscriptions/cancel")
        .bearer_auth(&token)
        .send()
        .await?;
    let (status, body) = status_and_body(response).await?;
    assert_eq!(status, 404);
    assert_eq!(body["message"], "No active subscription found.");
    Ok(())
}

#[tokio::test]
async fn unknown_plans_are_rejected() -> Result<()> {
    let app = TestApp::spawn().await?;
    let (_, token) = app.user_with_token("payer@zygote.test", Role::Student).await?;

    for plan in ["3_months", ""] {
        let response = app
            .post("/api/subscriptions/create")
            .bearer_auth(&token)
            .json(&json!({ "planType": plan }))
            .send()
            .await?;
        let (status, body) = status_and_body(response).await?;
        assert_eq!(status, 400);
        assert_eq!(body["message"], "Invalid plan type.");
    }
    assert_eq!(app.count("SELECT COUNT(*) FROM subscriptions").await?, 0);

    let response = app
        .post("/api/subscriptions/create")
        .json(&json!({ "planType": "6_months" }))
        .send()
        .await?;
    assert_eq!(response.status(), 401);
    Ok(())
}
