use crate::{errors::ZygoteError, types::ActivityType};
use core_access::{columns, now_timestamp};
use serde::Serialize;
use tracing::debug;
use turso::{Connection, Database, params};
use uuid::Uuid;

/// Aggregate usage figures for one learner.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserAnalytics {
    /// Distinct topics with any event, including topics only quizzed on.
    pub topics_opened: i64,
    /// Seconds, summed over every event.
    pub total_time_spent: i64,
    /// Mean over scored events only; `None` until a quiz is attempted.
    pub avg_quiz_score: Option<f64>,
    pub quizzes_attempted: i64,
}

/// Appends one analytics event on the caller's connection.
pub async fn record_event(
    conn: &Connection,
    user_id: &str,
    topic_id: &str,
    activity_type: ActivityType,
    time_spent_seconds: i64,
    quiz_score_percentage: Option<f64>,
) -> Result<(), ZygoteError> {
    conn.execute(
        "INSERT INTO analytics (id, user_id, topic_id, activity_type, time_spent_seconds, quiz_score_percentage, created_at)
         VALUES (?, ?, ?, ?, ?, ?, ?)",
        params![
            Uuid::new_v4().to_string(),
            user_id,
            topic_id,
            activity_type.as_str(),
            time_spent_seconds.max(0),
            quiz_score_percentage,
            now_timestamp()
        ],
    )
    .await?;
    debug!(%user_id, %topic_id, activity = %activity_type, "Analytics event recorded");
    Ok(())
}

/// One grouped pass over the user's events, folded per topic.
pub async fn user_analytics(db: &Database, user_id: &str) -> Result<UserAnalytics, ZygoteError> {
    let conn = db.connect()?;
    let mut rows = conn
        .query(
            "SELECT
                SUM(time_spent_seconds),
                SUM(quiz_score_percentage),
                COUNT(quiz_score_percentage),
                SUM(CASE WHEN activity_type = 'quiz_attempted' THEN 1 ELSE 0 END)
             FROM analytics
             WHERE user_id = ?
             GROUP BY topic_id",
            params![user_id],
        )
        .await?;

    let mut analytics = UserAnalytics::default();
    let mut score_sum = 0.0;
    let mut scored = 0;
    while let Some(row) = rows.next().await? {
        analytics.topics_opened += 1;
        analytics.total_time_spent += columns::optional_integer(&row, 0)?.unwrap_or(0);
        score_sum += columns::optional_real(&row, 1)?.unwrap_or(0.0);
        scored += columns::optional_integer(&row, 2)?.unwrap_or(0);
        analytics.quizzes_attempted += columns::optional_integer(&row, 3)?.unwrap_or(0);
    }
    if scored > 0 {
        analytics.avg_quiz_score = Some(score_sum / scored as f64);
    }
    Ok(analytics)
}
