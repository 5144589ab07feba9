//! Notes, summaries and mind maps attached to a topic.
//!
//! Every create appends a row. The current body is the highest version among
//! active rows, newest first on ties; versions are whatever the author supplies.

use super::{TOPIC_CHAIN_ACTIVE, TOPIC_CHAIN_JOIN, required, topics::require_topic};
use crate::{
    constants::DEFAULT_CONTENT_VERSION,
    errors::ZygoteError,
    types::{ContentType, ImageType},
};
use chrono::{DateTime, Utc};
use core_access::{ActivityEntry, atomically, columns, now_timestamp, record_activity};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;
use turso::{Connection, Database, Row, params};
use uuid::Uuid;

const TEXT_COLUMNS: &str = "c.id, c.topic_id, c.content, c.content_type, c.pdf_url, c.version, c.is_active, c.created_at, c.updated_at, c.created_by";
const MIND_MAP_COLUMNS: &str = "c.id, c.topic_id, c.image_url, c.image_type, c.thumbnail_url, c.version, c.is_active, c.created_at, c.updated_at, c.created_by";

/// The two text bodies a topic can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextKind {
    Notes,
    Summary,
}

impl TextKind {
    fn table(&self) -> &'static str {
        match self {
            TextKind::Notes => "notes",
            TextKind::Summary => "summaries",
        }
    }

    fn audit_action(&self) -> &'static str {
        match self {
            TextKind::Notes => "NOTES_CREATED",
            TextKind::Summary => "SUMMARY_CREATED",
        }
    }

    fn entity_type(&self) -> &'static str {
        match self {
            TextKind::Notes => "notes",
            TextKind::Summary => "summary",
        }
    }

    /// Shown when a topic has no current body of this kind.
    pub fn empty_message(&self) -> &'static str {
        match self {
            TextKind::Notes => "No notes available for this topic.",
            TextKind::Summary => "No summary available for this topic.",
        }
    }

    pub fn created_message(&self) -> &'static str {
        match self {
            TextKind::Notes => "Notes created successfully.",
            TextKind::Summary => "Summary created successfully.",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TextContent {
    pub id: String,
    pub topic_id: String,
    pub content: String,
    pub content_type: ContentType,
    pub pdf_url: Option<String>,
    pub version: i64,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub created_by: Option<String>,
}

impl TryFrom<&Row> for TextContent {
    type Error = ZygoteError;

    fn try_from(row: &Row) -> Result<Self, Self::Error> {
        Ok(TextContent {
            id: columns::text(row, 0)?,
            topic_id: columns::text(row, 1)?,
            content: columns::text(row, 2)?,
            content_type: columns::text(row, 3)?.parse()?,
            pdf_url: columns::optional_text(row, 4)?,
            version: columns::integer(row, 5)?,
            is_active: columns::flag(row, 6)?,
            created_at: columns::timestamp(row, 7)?,
            updated_at: columns::timestamp(row, 8)?,
            created_by: columns::optional_text(row, 9)?,
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTextContent {
    pub content: String,
    pub content_type: Option<ContentType>,
    pub pdf_url: Option<String>,
    pub version: Option<i64>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MindMap {
    pub id: String,
    pub topic_id: String,
    pub image_url: String,
    pub image_type: ImageType,
    pub thumbnail_url: Option<String>,
    pub version: i64,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub created_by: Option<String>,
}

impl TryFrom<&Row> for MindMap {
    type Error = ZygoteError;

    fn try_from(row: &Row) -> Result<Self, Self::Error> {
        Ok(MindMap {
            id: columns::text(row, 0)?,
            topic_id: columns::text(row, 1)?,
            image_url: columns::text(row, 2)?,
            image_type: columns::text(row, 3)?.parse()?,
            thumbnail_url: columns::optional_text(row, 4)?,
            version: columns::integer(row, 5)?,
            is_active: columns::flag(row, 6)?,
            created_at: columns::timestamp(row, 7)?,
            updated_at: columns::timestamp(row, 8)?,
            created_by: columns::optional_text(row, 9)?,
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewMindMap {
    pub image_url: String,
    pub image_type: Option<ImageType>,
    pub thumbnail_url: Option<String>,
    pub version: Option<i64>,
}

fn resolve_version(version: Option<i64>) -> Result<i64, ZygoteError> {
    let version = version.unwrap_or(DEFAULT_CONTENT_VERSION);
    if version < 1 {
        return Err(ZygoteError::Validation(
            "Version must be at least 1.".to_string(),
        ));
    }
    Ok(version)
}

/// The current notes or summary of a visible topic, if any.
pub async fn latest_text_content(
    db: &Database,
    topic_id: &str,
    kind: TextKind,
) -> Result<Option<TextContent>, ZygoteError> {
    let conn = db.connect()?;
    let mut rows = conn
        .query(
            &format!(
                "SELECT {TEXT_COLUMNS} FROM {table} c
                 {TOPIC_CHAIN_JOIN}
                 WHERE c.topic_id = ? AND c.is_active = 1 AND {TOPIC_CHAIN_ACTIVE}
                 ORDER BY c.version DESC, c.created_at DESC
                 LIMIT 1",
                table = kind.table()
            ),
            params![topic_id],
        )
        .await?;
    match rows.next().await? {
        Some(row) => Ok(Some(TextContent::try_from(&row)?)),
        None => Ok(None),
    }
}

pub async fn create_text_content(
    db: &Database,
    actor_id: &str,
    topic_id: &str,
    kind: TextKind,
    new: NewTextContent,
) -> Result<TextContent, ZygoteError> {
    let content = required(&new.content, "Content")?;
    let content_type = new.content_type.unwrap_or_default();
    if content_type == ContentType::PdfUrl && new.pdf_url.is_none() {
        return Err(ZygoteError::Validation(
            "A PDF URL is required for pdf_url content.".to_string(),
        ));
    }
    let version = resolve_version(new.version)?;

    let conn = db.connect()?;
    require_topic(&conn, topic_id).await?;

    let content_id = Uuid::new_v4().to_string();
    atomically(&conn, async {
        let now = now_timestamp();
        conn.execute(
            &format!(
                "INSERT INTO {} (id, topic_id, content, content_type, pdf_url, version, is_active, created_at, updated_at, created_by)
                 VALUES (?, ?, ?, ?, ?, ?, 1, ?, ?, ?)",
                kind.table()
            ),
            params![
                content_id.clone(),
                topic_id,
                content,
                content_type.as_str(),
                new.pdf_url.as_deref(),
                version,
                now.clone(),
                now,
                actor_id
            ],
        )
        .await?;
        record_activity(
            &conn,
            ActivityEntry::new(Some(actor_id), kind.audit_action(), kind.entity_type())
                .entity(&content_id)
                .details(json!({ "topicId": topic_id, "version": version })),
        )
        .await?;
        Ok::<_, ZygoteError>(())
    })
    .await?;

    info!(%topic_id, version, "{} created", kind.entity_type());
    find_text_content(&conn, kind, &content_id).await
}

async fn find_text_content(
    conn: &Connection,
    kind: TextKind,
    content_id: &str,
) -> Result<TextContent, ZygoteError> {
    let mut rows = conn
        .query(
            &format!("SELECT {TEXT_COLUMNS} FROM {} c WHERE c.id = ?", kind.table()),
            params![content_id],
        )
        .await?;
    match rows.next().await? {
        Some(row) => TextContent::try_from(&row),
        None => Err(ZygoteError::DataIntegrity(format!(
            "Content '{content_id}' vanished"
        ))),
    }
}

/// The current mind map of a visible topic, if any.
pub async fn latest_mind_map(
    db: &Database,
    topic_id: &str,
) -> Result<Option<MindMap>, ZygoteError> {
    let conn = db.connect()?;
    let mut rows = conn
        .query(
            &format!(
                "SELECT {MIND_MAP_COLUMNS} FROM mind_maps c
                 {TOPIC_CHAIN_JOIN}
                 WHERE c.topic_id = ? AND c.is_active = 1 AND {TOPIC_CHAIN_ACTIVE}
                 ORDER BY c.version DESC, c.created_at DESC
                 LIMIT 1"
            ),
            params![topic_id],
        )
        .await?;
    match rows.next().await? {
        Some(row) => Ok(Some(MindMap::try_from(&row)?)),
        None => Ok(None),
    }
}

pub async fn create_mind_map(
    db: &Database,
    actor_id: &str,
    topic_id: &str,
    new: NewMindMap,
) -> Result<MindMap, ZygoteError> {
    let image_url = required(&new.image_url, "Image URL")?;
    let image_type = new.image_type.unwrap_or_default();
    let version = resolve_version(new.version)?;

    let conn = db.connect()?;
    require_topic(&conn, topic_id).await?;

    let mind_map_id = Uuid::new_v4().to_string();
    atomically(&conn, async {
        let now = now_timestamp();
        conn.execute(
            "INSERT INTO mind_maps (id, topic_id, image_url, image_type, thumbnail_url, version, is_active, created_at, updated_at, created_by)
             VALUES (?, ?, ?, ?, ?, ?, 1, ?, ?, ?)",
            params![
                mind_map_id.clone(),
                topic_id,
                image_url,
                image_type.as_str(),
                new.thumbnail_url.as_deref(),
                version,
                now.clone(),
                now,
                actor_id
            ],
        )
        .await?;
        record_activity(
            &conn,
            ActivityEntry::new(Some(actor_id), "MINDMAP_CREATED", "mind_map")
                .entity(&mind_map_id)
                .details(json!({ "topicId": topic_id, "version": version })),
        )
        .await?;
        Ok::<_, ZygoteError>(())
    })
    .await?;

    info!(%topic_id, version, "Mind map created");
    let mut rows = conn
        .query(
            &format!("SELECT {MIND_MAP_COLUMNS} FROM mind_maps c WHERE c.id = ?"),
            params![mind_map_id.as_str()],
        )
        .await?;
    match rows.next().await? {
        Some(row) => MindMap::try_from(&row),
        None => Err(ZygoteError::DataIntegrity(format!(
            "Mind map '{mind_map_id}' vanished"
        ))),
    }
}
