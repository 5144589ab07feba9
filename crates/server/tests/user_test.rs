//! # Learner State Tests
//!
//! Preferences, bookmarks and the analytics summary of the signed-in user.

mod common;

use anyhow::Result;
use common::{TestApp, status_and_body};
use core_access::Role;
use serde_json::json;

#[tokio::test]
async fn preferences_start_at_defaults_and_merge_updates() -> Result<()> {
    let app = TestApp::spawn().await?;
    let (_, token) = app.user_with_token("prefs@zygote.test", Role::Student).await?;

    let response = app
        .get("/api/users/preferences")
        .bearer_auth(&token)
        .send()
        .await?;
    let (status, body) = status_and_body(response).await?;
    assert_eq!(status, 200, "{body}");
    assert_eq!(body["data"]["theme"], "light");
    assert_eq!(body["data"]["fontSize"], "medium");
    assert_eq!(body["data"]["notificationsEnabled"], true);

    let response = app
        .put("/api/users/preferences")
        .bearer_auth(&token)
        .json(&json!({ "theme": "dark" }))
        .send()
        .await?;
    let (status, body) = status_and_body(response).await?;
    assert_eq!(status, 200, "{body}");
    assert_eq!(body["message"], "Preferences updated successfully.");
    assert_eq!(body["data"]["theme"], "dark");
    assert_eq!(body["data"]["fontSize"], "medium");

    let response = app
        .put("/api/users/preferences")
        .bearer_auth(&token)
        .json(&json!({ "fontSize": "huge" }))
        .send()
        .await?;
    let (status, body) = status_and_body(response).await?;
    assert_eq!(status, 400);
    assert_eq!(body["code"], "VALIDATION_ERROR");

    assert_eq!(
        app.count("SELECT COUNT(*) FROM user_preferences").await?,
        1
    );
    Ok(())
}

#[tokio::test]
async fn bookmarks_are_idempotent_and_follow_visibility() -> Result<()> {
    let app = TestApp::spawn().await?;
    let (_, admin) = app.user_with_token("admin@zygote.test", Role::Admin).await?;
    let (_, token) = app.user_with_token("reader@zygote.test", Role::Student).await?;
    let chain = app.create_content_chain(&admin).await?;

    for _ in 0..2 {
        let response = app
            .post("/api/users/bookmarks")
            .bearer_auth(&token)
            .json(&json!({ "topicId": chain.topic_id }))
            .send()
            .await?;
        let (status, body) = status_and_body(response).await?;
        assert_eq!(status, 201, "{body}");
        assert_eq!(body["message"], "Bookmark added successfully.");
    }
    assert_eq!(app.count("SELECT COUNT(*) FROM bookmarks").await?, 1);

    let response = app
        .get("/api/users/bookmarks")
        .bearer_auth(&token)
        .send()
        .await?;
    let (_, body) = status_and_body(response).await?;
    let bookmarks = body["data"].as_array().unwrap();
    assert_eq!(bookmarks.len(), 1);
    assert_eq!(bookmarks[0]["title"], "Cardiovascular System");
    assert_eq!(bookmarks[0]["subjectName"], "Anatomy");

    // A hidden topic drops out of the list but the row stays.
    app.delete(&format!("/api/admin/topics/{}", chain.topic_id))
        .bearer_auth(&admin)
        .send()
        .await?;
    let response = app
        .get("/api/users/bookmarks")
        .bearer_auth(&token)
        .send()
        .await?;
    let (_, body) = status_and_body(response).await?;
    assert!(body["data"].as_array().unwrap().is_empty());
    assert_eq!(app.count("SELECT COUNT(*) FROM bookmarks").await?, 1);

    for _ in 0..2 {
        let response = app
            .delete(&format!("/api/users/bookmarks/{}", chain.topic_id))
            .bearer_auth(&token)
            .send()
            .await?;
        assert_eq!(response.status(), 200);
    }
    assert_eq!(app.count("SELECT COUNT(*) FROM bookmarks").await?, 0);
    Ok(())
}

#[tokio::test]
async fn bookmark_requests_are_validated() -> Result<()> {
    let app = TestApp::spawn().await?;
    let (_, token) = app.user_with_token("reader@zygote.test", Role::Student).await?;

    let response = app
        .post("/api/users/bookmarks")
        .bearer_auth(&token)
        .json(&json!({ "topicId": "" }))
        .send()
        .await?;
    let (status, body) = status_and_body(response).await?;
    assert_eq!(status, 400);
    assert_eq!(body["message"], "Topic ID is required.");

    let response = app
        .post("/api/users/bookmarks")
        .bearer_auth(&token)
        .json(&json!({ "topicId": "no-such-topic" }))
        .send()
        .await?;
    assert_eq!(response.status(), 404);

    let response = app.get("/api/users/bookmarks").send().await?;
    assert_eq!(response.status(), 401);
    Ok(())
}

#[tokio::test]
async fn analytics_start_empty() -> Result<()> {
    let app = TestApp::spawn().await?;
    let (_, token) = app.user_with_token("new@zygote.test", Role::Student).await?;

    let response = app
        .get("/api/users/analytics")
        .bearer_auth(&token)
        .send()
        .await?;
    let (status, body) = status_and_body(response).await?;
    assert_eq!(status, 200);
    assert_eq!(
        body["data"],
        json!({
            "topicsOpened": 0,
            "totalTimeSpent": 0,
            "avgQuizScore": null,
            "quizzesAttempted": 0
        })
    );
    Ok(())
}
