use super::{non_negative, optional_required, required, subjects::find_subject};
use crate::{errors::ZygoteError, learner::analytics, types::ActivityType};
use chrono::{DateTime, Utc};
use core_access::{ActivityEntry, atomically, columns, now_timestamp, record_activity};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info};
use turso::{Connection, Database, Row, params};
use uuid::Uuid;

const TOPIC_COLUMNS: &str = "t.id, t.subject_id, t.title, t.description, t.display_order, t.is_free_sample, t.is_active, t.completion_percentage, t.version, t.created_at, t.updated_at, t.created_by, t.last_edited_by";

const VISIBLE_CHAIN: &str = "JOIN subjects s ON s.id = t.subject_id
     JOIN tracks tr ON tr.id = s.track_id";

/// A chapter within a subject.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Topic {
    pub id: String,
    pub subject_id: String,
    pub title: String,
    pub description: Option<String>,
    pub display_order: i64,
    pub is_free_sample: bool,
    pub is_active: bool,
    pub completion_percentage: i64,
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub created_by: Option<String>,
    pub last_edited_by: Option<String>,
}

impl TryFrom<&Row> for Topic {
    type Error = ZygoteError;

    fn try_from(row: &Row) -> Result<Self, Self::Error> {
        Ok(Topic {
            id: columns::text(row, 0)?,
            subject_id: columns::text(row, 1)?,
            title: columns::text(row, 2)?,
            description: columns::optional_text(row, 3)?,
            display_order: columns::integer(row, 4)?,
            is_free_sample: columns::flag(row, 5)?,
            is_active: columns::flag(row, 6)?,
            completion_percentage: columns::integer(row, 7)?,
            version: columns::integer(row, 8)?,
            created_at: columns::timestamp(row, 9)?,
            updated_at: columns::timestamp(row, 10)?,
            created_by: columns::optional_text(row, 11)?,
            last_edited_by: columns::optional_text(row, 12)?,
        })
    }
}

/// A topic together with its subject's name and colour.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TopicDetail {
    #[serde(flatten)]
    pub topic: Topic,
    pub subject_name: String,
    pub color_code: Option<String>,
}

/// What the premium gate needs to know about a visible topic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TopicAccess {
    /// A free sample topic, or any topic inside a free-trial subject.
    pub is_free: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTopic {
    pub subject_id: String,
    pub title: String,
    pub description: Option<String>,
    #[serde(default)]
    pub display_order: i64,
    #[serde(default)]
    pub is_free_sample: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopicUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_order: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_free_sample: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completion_percentage: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
}

/// Active topics of a subject whose whole ancestry is active.
pub async fn list_topics(db: &Database, subject_id: &str) -> Result<Vec<Topic>, ZygoteError> {
    let conn = db.connect()?;
    let mut rows = conn
        .query(
            &format!(
                "SELECT {TOPIC_COLUMNS} FROM topics t
                 {VISIBLE_CHAIN}
                 WHERE t.subject_id = ? AND t.is_active = 1 AND s.is_active = 1 AND tr.is_active = 1
                 ORDER BY t.display_order ASC, t.created_at ASC"
            ),
            params![subject_id],
        )
        .await?;

    let mut topics = Vec::new();
    while let Some(row) = rows.next().await? {
        topics.push(Topic::try_from(&row)?);
    }
    Ok(topics)
}

/// A visible topic. When `viewer_id` is given an `opened` event is recorded
/// for that user.
pub async fn get_topic(
    db: &Database,
    topic_id: &str,
    viewer_id: Option<&str>,
) -> Result<TopicDetail, ZygoteError> {
    let conn = db.connect()?;
    let mut rows = conn
        .query(
            &format!(
                "SELECT {TOPIC_COLUMNS}, s.name, s.color_code FROM topics t
                 {VISIBLE_CHAIN}
                 WHERE t.id = ? AND t.is_active = 1 AND s.is_active = 1 AND tr.is_active = 1"
            ),
            params![topic_id],
        )
        .await?;
    let row = rows
        .next()
        .await?
        .ok_or_else(|| ZygoteError::not_found("Topic"))?;
    let detail = TopicDetail {
        topic: Topic::try_from(&row)?,
        subject_name: columns::text(&row, 13)?,
        color_code: columns::optional_text(&row, 14)?,
    };
    drop(rows);

    if let Some(user_id) = viewer_id {
        analytics::record_event(&conn, user_id, topic_id, ActivityType::Opened, 0, None).await?;
        debug!(%user_id, %topic_id, "Recorded topic open");
    }
    Ok(detail)
}

/// Checks that a topic is publicly visible and reports whether it is free.
pub async fn topic_access(db: &Database, topic_id: &str) -> Result<TopicAccess, ZygoteError> {
    let conn = db.connect()?;
    let mut rows = conn
        .query(
            &format!(
                "SELECT t.is_free_sample, s.is_free_trial FROM topics t
                 {VISIBLE_CHAIN}
                 WHERE t.id = ? AND t.is_active = 1 AND s.is_active = 1 AND tr.is_active = 1"
            ),
            params![topic_id],
        )
        .await?;
    let row = rows
        .next()
        .await?
        .ok_or_else(|| ZygoteError::not_found("Topic"))?;
    Ok(TopicAccess {
        is_free: columns::flag(&row, 0)? || columns::flag(&row, 1)?,
    })
}

pub(crate) async fn find_topic(
    conn: &Connection,
    topic_id: &str,
) -> Result<Option<Topic>, ZygoteError> {
    let mut rows = conn
        .query(
            &format!("SELECT {TOPIC_COLUMNS} FROM topics t WHERE t.id = ?"),
            params![topic_id],
        )
        .await?;
    match rows.next().await? {
        Some(row) => Ok(Some(Topic::try_from(&row)?)),
        None => Ok(None),
    }
}

/// Fails with not-found unless the topic row exists (active or not).
pub(crate) async fn require_topic(conn: &Connection, topic_id: &str) -> Result<Topic, ZygoteError> {
    find_topic(conn, topic_id)
        .await?
        .ok_or_else(|| ZygoteError::not_found("Topic"))
}

fn validate_percentage(value: Option<i64>) -> Result<(), ZygoteError> {
    match value {
        Some(p) if !(0..=100).contains(&p) => Err(ZygoteError::Validation(
            "Completion percentage must be between 0 and 100.".to_string(),
        )),
        _ => Ok(()),
    }
}

pub async fn create_topic(
    db: &Database,
    actor_id: &str,
    new: NewTopic,
) -> Result<Topic, ZygoteError> {
    let title = required(&new.title, "Title")?;
    let display_order = non_negative(new.display_order, "Display order")?;

    let conn = db.connect()?;
    if find_subject(&conn, &new.subject_id).await?.is_none() {
        return Err(ZygoteError::not_found("Subject"));
    }

    let topic_id = Uuid::new_v4().to_string();
    atomically(&conn, async {
        let now = now_timestamp();
        conn.execute(
            "INSERT INTO topics (id, subject_id, title, description, display_order, is_free_sample, is_active, completion_percentage, version, created_at, updated_at, created_by, last_edited_by)
             VALUES (?, ?, ?, ?, ?, ?, 1, 0, 1, ?, ?, ?, ?)",
            params![
                topic_id.clone(),
                new.subject_id.as_str(),
                title.clone(),
                new.description.as_deref(),
                display_order,
                i64::from(new.is_free_sample),
                now.clone(),
                now,
                actor_id,
                actor_id
            ],
        )
        .await?;
        record_activity(
            &conn,
            ActivityEntry::new(Some(actor_id), "TOPIC_CREATED", "topic")
                .entity(&topic_id)
                .details(json!({ "title": title, "subjectId": new.subject_id })),
        )
        .await?;
        Ok::<_, ZygoteError>(())
    })
    .await?;

    info!(%topic_id, "Topic created");
    require_topic(&conn, &topic_id).await
}

pub async fn update_topic(
    db: &Database,
    actor_id: &str,
    topic_id: &str,
    update: TopicUpdate,
) -> Result<Topic, ZygoteError> {
    let title = optional_required(update.title.as_deref(), "Title")?;
    if let Some(order) = update.display_order {
        non_negative(order, "Display order")?;
    }
    if let Some(version) = update.version {
        if version < 1 {
            return Err(ZygoteError::Validation(
                "Version must be at least 1.".to_string(),
            ));
        }
    }
    validate_percentage(update.completion_percentage)?;
    let details = serde_json::to_value(&update)?;

    let conn = db.connect()?;
    if let Some(subject_id) = update.subject_id.as_deref() {
        if find_subject(&conn, subject_id).await?.is_none() {
            return Err(ZygoteError::not_found("Subject"));
        }
    }

    atomically(&conn, async {
        let changed = conn
            .execute(
                "UPDATE topics SET
                    subject_id = COALESCE(?, subject_id),
                    title = COALESCE(?, title),
                    description = COALESCE(?, description),
                    display_order = COALESCE(?, display_order),
                    is_free_sample = COALESCE(?, is_free_sample),
                    completion_percentage = COALESCE(?, completion_percentage),
                    version = COALESCE(?, version),
                    is_active = COALESCE(?, is_active),
                    last_edited_by = ?,
                    updated_at = ?
                 WHERE id = ?",
                params![
                    update.subject_id.as_deref(),
                    title.as_deref(),
                    update.description.as_deref(),
                    update.display_order,
                    update.is_free_sample.map(i64::from),
                    update.completion_percentage,
                    update.version,
                    update.is_active.map(i64::from),
                    actor_id,
                    now_timestamp(),
                    topic_id
                ],
            )
            .await?;
        if changed == 0 {
            return Err(ZygoteError::not_found("Topic"));
        }
        record_activity(
            &conn,
            ActivityEntry::new(Some(actor_id), "TOPIC_UPDATED", "topic")
                .entity(topic_id)
                .details(details),
        )
        .await?;
        Ok(())
    })
    .await?;

    info!(%topic_id, "Topic updated");
    require_topic(&conn, topic_id).await
}

pub async fn delete_topic(db: &Database, actor_id: &str, topic_id: &str) -> Result<(), ZygoteError> {
    let conn = db.connect()?;
    let topic = require_topic(&conn, topic_id).await?;

    atomically(&conn, async {
        conn.execute(
            "UPDATE topics SET is_active = 0, last_edited_by = ?, updated_at = ? WHERE id = ?",
            params![actor_id, now_timestamp(), topic_id],
        )
        .await?;
        record_activity(
            &conn,
            ActivityEntry::new(Some(actor_id), "TOPIC_DELETED", "topic")
                .entity(topic_id)
                .details(json!({ "title": topic.title })),
        )
        .await?;
        Ok::<_, ZygoteError>(())
    })
    .await?;

    info!(%topic_id, "Topic deleted");
    Ok(())
}
