use crate::{content::topics::topic_access, errors::ZygoteError};
use chrono::{DateTime, Utc};
use core_access::{columns, now_timestamp};
use serde::Serialize;
use tracing::info;
use turso::{Database, Row, params};
use uuid::Uuid;

/// A bookmark joined with the topic and subject it points at.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookmarkedTopic {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub topic_id: String,
    pub title: String,
    pub description: Option<String>,
    pub subject_name: String,
    pub color_code: Option<String>,
}

impl TryFrom<&Row> for BookmarkedTopic {
    type Error = ZygoteError;

    fn try_from(row: &Row) -> Result<Self, Self::Error> {
        Ok(BookmarkedTopic {
            id: columns::text(row, 0)?,
            created_at: columns::timestamp(row, 1)?,
            topic_id: columns::text(row, 2)?,
            title: columns::text(row, 3)?,
            description: columns::optional_text(row, 4)?,
            subject_name: columns::text(row, 5)?,
            color_code: columns::optional_text(row, 6)?,
        })
    }
}

/// Newest first. Bookmarks of topics that are no longer visible are left out.
pub async fn list_bookmarks(
    db: &Database,
    user_id: &str,
) -> Result<Vec<BookmarkedTopic>, ZygoteError> {
    let conn = db.connect()?;
    let mut rows = conn
        .query(
            "SELECT b.id, b.created_at, b.topic_id, t.title, t.description, s.name, s.color_code
             FROM bookmarks b
             JOIN topics t ON t.id = b.topic_id
             JOIN subjects s ON s.id = t.subject_id
             JOIN tracks tr ON tr.id = s.track_id
             WHERE b.user_id = ? AND t.is_active = 1 AND s.is_active = 1 AND tr.is_active = 1
             ORDER BY b.created_at DESC",
            params![user_id],
        )
        .await?;

    let mut bookmarks = Vec::new();
    while let Some(row) = rows.next().await? {
        bookmarks.push(BookmarkedTopic::try_from(&row)?);
    }
    Ok(bookmarks)
}

/// Adding the same topic twice leaves a single row.
pub async fn add_bookmark(db: &Database, user_id: &str, topic_id: &str) -> Result<(), ZygoteError> {
    topic_access(db, topic_id).await?;
    let conn = db.connect()?;
    let inserted = conn
        .execute(
            "INSERT INTO bookmarks (id, user_id, topic_id, created_at)
             VALUES (?, ?, ?, ?)
             ON CONFLICT (user_id, topic_id) DO NOTHING",
            params![Uuid::new_v4().to_string(), user_id, topic_id, now_timestamp()],
        )
        .await?;
    if inserted > 0 {
        info!(%user_id, %topic_id, "Bookmark added");
    }
    Ok(())
}

/// Removing a bookmark that does not exist is not an error.
pub async fn remove_bookmark(
    db: &Database,
    user_id: &str,
    topic_id: &str,
) -> Result<(), ZygoteError> {
    let conn = db.connect()?;
    conn.execute(
        "DELETE FROM bookmarks WHERE user_id = ? AND topic_id = ?",
        params![user_id, topic_id],
    )
    .await?;
    info!(%user_id, %topic_id, "Bookmark removed");
    Ok(())
}
