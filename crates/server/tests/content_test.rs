//! # Content API Tests
//!
//! Public reads of the hierarchy, soft-delete visibility, topic bodies,
//! the premium gate and MCQ answer submission.

mod common;

use anyhow::Result;
use common::{TestApp, status_and_body};
use core_access::Role;
use serde_json::{Value, json};
use turso::params;

async fn add_notes(app: &TestApp, token: &str, topic_id: &str, body: &str, version: i64) -> Result<()> {
    let response = app
        .post(&format!("/api/admin/topics/{topic_id}/notes"))
        .bearer_auth(token)
        .json(&json!({ "content": body, "version": version }))
        .send()
        .await?;
    assert_eq!(response.status(), 201);
    Ok(())
}

async fn add_mcq(app: &TestApp, token: &str, topic_id: &str, answer: &str) -> Result<String> {
    let response = app
        .post("/api/admin/mcqs")
        .bearer_auth(token)
        .json(&json!({
            "topicId": topic_id,
            "question": "Which chamber pumps oxygenated blood to the aorta?",
            "optionA": "Right Atrium",
            "optionB": "Right Ventricle",
            "optionC": "Left Ventricle",
            "optionD": "Left Atrium",
            "correctAnswer": answer,
            "difficulty": "easy"
        }))
        .send()
        .await?;
    let (status, body) = status_and_body(response).await?;
    assert_eq!(status, 201, "{body}");
    Ok(body["data"]["id"].as_str().unwrap().to_string())
}

#[tokio::test]
async fn created_chain_is_publicly_listed() -> Result<()> {
    let app = TestApp::spawn().await?;
    let (_, admin) = app.user_with_token("admin@zygote.test", Role::Admin).await?;
    let chain = app.create_content_chain(&admin).await?;

    let response = app
        .get(&format!("/api/subjects/{}/topics", chain.subject_id))
        .send()
        .await?;
    let (status, body) = status_and_body(response).await?;
    assert_eq!(status, 200);
    let topics = body["data"].as_array().unwrap();
    assert_eq!(topics.len(), 1);
    assert_eq!(topics[0]["id"], chain.topic_id.as_str());
    assert_eq!(topics[0]["isActive"], true);

    let response = app.get("/api/tracks").send().await?;
    let (_, body) = status_and_body(response).await?;
    assert_eq!(body["data"].as_array().unwrap().len(), 1);

    let response = app
        .get(&format!("/api/subjects/{}", chain.subject_id))
        .send()
        .await?;
    let (status, body) = status_and_body(response).await?;
    assert_eq!(status, 200);
    assert_eq!(body["data"]["trackName"], "First Year MBBS");
    assert_eq!(body["data"]["yearNumber"], 1);

    let response = app
        .get(&format!("/api/topics/{}", chain.topic_id))
        .send()
        .await?;
    let (_, body) = status_and_body(response).await?;
    assert_eq!(body["data"]["subjectName"], "Anatomy");
    assert_eq!(body["data"]["colorCode"], "#2563EB");
    Ok(())
}

#[tokio::test]
async fn deleting_a_track_hides_its_descendants() -> Result<()> {
    let app = TestApp::spawn().await?;
    let (_, admin) = app.user_with_token("admin@zygote.test", Role::Admin).await?;
    let chain = app.create_content_chain(&admin).await?;

    let response = app
        .delete(&format!("/api/admin/tracks/{}", chain.track_id))
        .bearer_auth(&admin)
        .send()
        .await?;
    assert_eq!(response.status(), 200);

    let response = app.get("/api/tracks").send().await?;
    let (_, body) = status_and_body(response).await?;
    assert!(body["data"].as_array().unwrap().is_empty());

    let response = app
        .get(&format!("/api/tracks/{}/subjects", chain.track_id))
        .send()
        .await?;
    let (_, body) = status_and_body(response).await?;
    assert!(body["data"].as_array().unwrap().is_empty());

    let response = app
        .get(&format!("/api/subjects/{}/topics", chain.subject_id))
        .send()
        .await?;
    let (_, body) = status_and_body(response).await?;
    assert!(body["data"].as_array().unwrap().is_empty());

    let response = app
        .get(&format!("/api/topics/{}", chain.topic_id))
        .send()
        .await?;
    let (status, body) = status_and_body(response).await?;
    assert_eq!(status, 404);
    assert_eq!(body["code"], "NOT_FOUND");

    // Rows stay behind.
    assert_eq!(app.count("SELECT COUNT(*) FROM tracks").await?, 1);
    assert_eq!(app.count("SELECT COUNT(*) FROM topics").await?, 1);

    // Restoring the track brings everything back.
    let response = app
        .put(&format!("/api/admin/tracks/{}", chain.track_id))
        .bearer_auth(&admin)
        .json(&json!({ "isActive": true }))
        .send()
        .await?;
    assert_eq!(response.status(), 200);
    let response = app
        .get(&format!("/api/subjects/{}/topics", chain.subject_id))
        .send()
        .await?;
    let (_, body) = status_and_body(response).await?;
    assert_eq!(body["data"].as_array().unwrap().len(), 1);
    Ok(())
}

#[tokio::test]
async fn notes_read_the_highest_version_or_report_no_content() -> Result<()> {
    let app = TestApp::spawn().await?;
    let (_, admin) = app.user_with_token("admin@zygote.test", Role::Admin).await?;
    let chain = app.create_content_chain(&admin).await?;
    let path = format!("/api/topics/{}/notes", chain.topic_id);

    let response = app.get(&path).bearer_auth(&admin).send().await?;
    let (status, body) = status_and_body(response).await?;
    assert_eq!(status, 200);
    assert_eq!(body["success"], true);
    assert!(body["data"].is_null());
    assert_eq!(body["message"], "No notes available for this topic.");

    add_notes(&app, &admin, &chain.topic_id, "Second draft", 2).await?;
    add_notes(&app, &admin, &chain.topic_id, "First draft", 1).await?;

    let response = app.get(&path).bearer_auth(&admin).send().await?;
    let (_, body) = status_and_body(response).await?;
    assert_eq!(body["data"]["content"], "Second draft");
    assert_eq!(body["data"]["version"], 2);
    assert_eq!(body["data"]["contentType"], "markdown");

    let response = app
        .get(&format!("/api/topics/{}/mindmap", chain.topic_id))
        .bearer_auth(&admin)
        .send()
        .await?;
    let (_, body) = status_and_body(response).await?;
    assert!(body["data"].is_null());
    assert_eq!(body["message"], "No mind map available for this topic.");
    Ok(())
}

#[tokio::test]
async fn premium_topics_need_an_active_subscription() -> Result<()> {
    let app = TestApp::spawn().await?;
    let (_, admin) = app.user_with_token("admin@zygote.test", Role::Admin).await?;
    let (_, editor) = app.user_with_token("editor@zygote.test", Role::Editor).await?;
    let (student, student_token) = app
        .user_with_token("student@zygote.test", Role::Student)
        .await?;
    let chain = app.create_content_chain(&admin).await?;
    add_notes(&app, &admin, &chain.topic_id, "Paid notes", 1).await?;
    let path = format!("/api/topics/{}/notes", chain.topic_id);

    let response = app.get(&path).send().await?;
    let (status, body) = status_and_body(response).await?;
    assert_eq!(status, 401);
    assert_eq!(body["code"], "NO_TOKEN");

    let response = app.get(&path).bearer_auth(&student_token).send().await?;
    let (status, body) = status_and_body(response).await?;
    assert_eq!(status, 403);
    assert_eq!(body["code"], "SUBSCRIPTION_REQUIRED");

    // An expired subscription does not count.
    let conn = app.db().connect()?;
    conn.execute(
        "INSERT INTO subscriptions (id, user_id, plan_type, status, start_date, end_date, auto_renew, created_at, updated_at)
         VALUES ('expired-sub', ?, '6_months', 'active', '2020-01-01 00:00:00', '2020-07-01 00:00:00', 1, '2020-01-01 00:00:00', '2020-01-01 00:00:00')",
        params![student.id.as_str()],
    )
    .await?;
    let response = app.get(&path).bearer_auth(&student_token).send().await?;
    let (status, body) = status_and_body(response).await?;
    assert_eq!(status, 403);
    assert_eq!(body["code"], "SUBSCRIPTION_REQUIRED");

    // Staff are never gated.
    let response = app.get(&path).bearer_auth(&editor).send().await?;
    assert_eq!(response.status(), 200);

    let response = app
        .post("/api/subscriptions/create")
        .bearer_auth(&student_token)
        .json(&json!({ "planType": "6_months" }))
        .send()
        .await?;
    assert_eq!(response.status(), 201);

    let response = app.get(&path).bearer_auth(&student_token).send().await?;
    let (status, body) = status_and_body(response).await?;
    assert_eq!(status, 200, "{body}");
    assert_eq!(body["data"]["content"], "Paid notes");
    Ok(())
}

#[tokio::test]
async fn free_samples_are_open_to_everyone() -> Result<()> {
    let app = TestApp::spawn().await?;
    let (_, admin) = app.user_with_token("admin@zygote.test", Role::Admin).await?;
    let chain = app.create_content_chain(&admin).await?;

    let response = app
        .put(&format!("/api/admin/topics/{}", chain.topic_id))
        .bearer_auth(&admin)
        .json(&json!({ "isFreeSample": true }))
        .send()
        .await?;
    assert_eq!(response.status(), 200);
    add_notes(&app, &admin, &chain.topic_id, "Free notes", 1).await?;

    let response = app
        .get(&format!("/api/topics/{}/notes", chain.topic_id))
        .send()
        .await?;
    let (status, body) = status_and_body(response).await?;
    assert_eq!(status, 200, "{body}");
    assert_eq!(body["data"]["content"], "Free notes");
    Ok(())
}

#[tokio::test]
async fn submitting_answers_scores_and_records_attempts() -> Result<()> {
    let app = TestApp::spawn().await?;
    let (_, admin) = app.user_with_token("admin@zygote.test", Role::Admin).await?;
    let (student, student_token) = app
        .user_with_token("student@zygote.test", Role::Student)
        .await?;
    let chain = app.create_content_chain(&admin).await?;
    let mcq_id = add_mcq(&app, &admin, &chain.topic_id, "C").await?;

    let response = app
        .post("/api/subscriptions/create")
        .bearer_auth(&student_token)
        .json(&json!({ "planType": "12_months" }))
        .send()
        .await?;
    assert_eq!(response.status(), 201);

    let submit = format!("/api/topics/{}/mcqs/{mcq_id}/submit", chain.topic_id);
    let response = app
        .post(&submit)
        .bearer_auth(&student_token)
        .json(&json!({ "selectedAnswer": "C", "timeSpent": 12 }))
        .send()
        .await?;
    let (status, body) = status_and_body(response).await?;
    assert_eq!(status, 200, "{body}");
    assert_eq!(body["data"]["isCorrect"], true);
    assert_eq!(body["data"]["correctAnswer"], "C");

    let response = app
        .post(&submit)
        .bearer_auth(&student_token)
        .json(&json!({ "selectedAnswer": "A" }))
        .send()
        .await?;
    let (_, body) = status_and_body(response).await?;
    assert_eq!(body["data"]["isCorrect"], false);
    assert_eq!(body["data"]["correctAnswer"], "C");

    let perfect = app
        .count(&format!(
            "SELECT COUNT(*) FROM analytics WHERE user_id = '{}' AND quiz_score_percentage = 100",
            student.id
        ))
        .await?;
    assert_eq!(perfect, 1);

    let response = app
        .get("/api/users/analytics")
        .bearer_auth(&student_token)
        .send()
        .await?;
    let (_, body) = status_and_body(response).await?;
    assert_eq!(body["data"]["quizzesAttempted"], 2);
    assert_eq!(body["data"]["avgQuizScore"], 50.0);
    assert_eq!(body["data"]["totalTimeSpent"], 12);

    // Bad letters and foreign MCQs are rejected.
    let response = app
        .post(&submit)
        .bearer_auth(&student_token)
        .json(&json!({ "selectedAnswer": "E" }))
        .send()
        .await?;
    assert_eq!(response.status(), 400);

    let response = app
        .post(&format!("/api/topics/{}/mcqs/not-an-mcq/submit", chain.topic_id))
        .bearer_auth(&student_token)
        .json(&json!({ "selectedAnswer": "A" }))
        .send()
        .await?;
    let (status, body) = status_and_body(response).await?;
    assert_eq!(status, 404);
    assert_eq!(body["message"], "MCQ not found.");

    let response = app
        .post(&submit)
        .json(&json!({ "selectedAnswer": "C" }))
        .send()
        .await?;
    assert_eq!(response.status(), 401);
    Ok(())
}

#[tokio::test]
async fn mcq_listing_filters_and_limits() -> Result<()> {
    let app = TestApp::spawn().await?;
    let (_, admin) = app.user_with_token("admin@zygote.test", Role::Admin).await?;
    let chain = app.create_content_chain(&admin).await?;
    for answer in ["A", "B", "C"] {
        add_mcq(&app, &admin, &chain.topic_id, answer).await?;
    }
    let path = format!("/api/topics/{}/mcqs", chain.topic_id);

    let response = app.get(&path).bearer_auth(&admin).send().await?;
    let (_, body) = status_and_body(response).await?;
    assert_eq!(body["data"].as_array().unwrap().len(), 3);

    let response = app
        .get(&format!("{path}?limit=2&difficulty=easy"))
        .bearer_auth(&admin)
        .send()
        .await?;
    let (_, body) = status_and_body(response).await?;
    assert_eq!(body["data"].as_array().unwrap().len(), 2);

    let response = app
        .get(&format!("{path}?difficulty=hard"))
        .bearer_auth(&admin)
        .send()
        .await?;
    let (_, body) = status_and_body(response).await?;
    assert!(body["data"].as_array().unwrap().is_empty());

    let response = app
        .get(&format!("{path}?difficulty=impossible"))
        .bearer_auth(&admin)
        .send()
        .await?;
    let (status, body) = status_and_body(response).await?;
    assert_eq!(status, 400);
    assert_eq!(body["code"], "VALIDATION_ERROR");
    Ok(())
}

#[tokio::test]
async fn opening_a_topic_while_signed_in_records_it() -> Result<()> {
    let app = TestApp::spawn().await?;
    let (_, admin) = app.user_with_token("admin@zygote.test", Role::Admin).await?;
    let (_, student_token) = app
        .user_with_token("student@zygote.test", Role::Student)
        .await?;
    let chain = app.create_content_chain(&admin).await?;

    let path = format!("/api/topics/{}", chain.topic_id);
    app.get(&path).send().await?;
    assert_eq!(app.count("SELECT COUNT(*) FROM analytics").await?, 0);

    app.get(&path).bearer_auth(&student_token).send().await?;
    app.get(&path).bearer_auth(&student_token).send().await?;

    let response = app
        .get("/api/users/analytics")
        .bearer_auth(&student_token)
        .send()
        .await?;
    let (_, body) = status_and_body(response).await?;
    assert_eq!(body["data"]["topicsOpened"], 1);
    assert!(body["data"]["avgQuizScore"].is_null());
    Ok(())
}

#[tokio::test]
async fn unknown_routes_and_health() -> Result<()> {
    let app = TestApp::spawn().await?;

    let response = app.get("/api/does-not-exist").send().await?;
    let (status, body) = status_and_body(response).await?;
    assert_eq!(status, 404);
    assert_eq!(body, json!({ "success": false, "message": "Route not found" }));

    let response = app.get("/health").send().await?;
    let (status, body): (u16, Value) = status_and_body(response).await?;
    assert_eq!(status, 200);
    assert_eq!(body["message"], "ZYGOTE API is running");
    assert_eq!(body["environment"], "development");
    Ok(())
}
