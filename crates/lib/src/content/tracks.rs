use super::{non_negative, optional_required, required};
use crate::errors::ZygoteError;
use chrono::{DateTime, Utc};
use core_access::{ActivityEntry, atomically, columns, now_timestamp, record_activity};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;
use turso::{Connection, Database, Row, params};
use uuid::Uuid;

const TRACK_COLUMNS: &str =
    "id, name, description, year_number, display_order, is_active, created_at, updated_at, created_by";

/// A year of study, e.g. "First Year MBBS".
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Track {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub year_number: i64,
    pub display_order: i64,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub created_by: Option<String>,
}

impl TryFrom<&Row> for Track {
    type Error = ZygoteError;

    fn try_from(row: &Row) -> Result<Self, Self::Error> {
        Ok(Track {
            id: columns::text(row, 0)?,
            name: columns::text(row, 1)?,
            description: columns::optional_text(row, 2)?,
            year_number: columns::integer(row, 3)?,
            display_order: columns::integer(row, 4)?,
            is_active: columns::flag(row, 5)?,
            created_at: columns::timestamp(row, 6)?,
            updated_at: columns::timestamp(row, 7)?,
            created_by: columns::optional_text(row, 8)?,
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTrack {
    pub name: String,
    pub description: Option<String>,
    pub year_number: i64,
    #[serde(default)]
    pub display_order: i64,
}

/// Only supplied fields are written. `is_active: true` restores a deleted track.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year_number: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_order: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
}

/// Active tracks ordered for display.
pub async fn list_tracks(db: &Database) -> Result<Vec<Track>, ZygoteError> {
    let conn = db.connect()?;
    let mut rows = conn
        .query(
            &format!(
                "SELECT {TRACK_COLUMNS} FROM tracks WHERE is_active = 1 ORDER BY display_order ASC, created_at ASC"
            ),
            (),
        )
        .await?;

    let mut tracks = Vec::new();
    while let Some(row) = rows.next().await? {
        tracks.push(Track::try_from(&row)?);
    }
    Ok(tracks)
}

/// An active track by ID.
pub async fn get_track(db: &Database, track_id: &str) -> Result<Track, ZygoteError> {
    let conn = db.connect()?;
    let mut rows = conn
        .query(
            &format!("SELECT {TRACK_COLUMNS} FROM tracks WHERE id = ? AND is_active = 1"),
            params![track_id],
        )
        .await?;
    match rows.next().await? {
        Some(row) => Track::try_from(&row),
        None => Err(ZygoteError::not_found("Track")),
    }
}

/// Any track by ID, active or not. Administrative paths use this.
pub(crate) async fn find_track(
    conn: &Connection,
    track_id: &str,
) -> Result<Option<Track>, ZygoteError> {
    let mut rows = conn
        .query(
            &format!("SELECT {TRACK_COLUMNS} FROM tracks WHERE id = ?"),
            params![track_id],
        )
        .await?;
    match rows.next().await? {
        Some(row) => Ok(Some(Track::try_from(&row)?)),
        None => Ok(None),
    }
}

pub async fn create_track(
    db: &Database,
    actor_id: &str,
    new: NewTrack,
) -> Result<Track, ZygoteError> {
    let name = required(&new.name, "Name")?;
    let year_number = non_negative(new.year_number, "Year number")?;
    let display_order = non_negative(new.display_order, "Display order")?;
    let track_id = Uuid::new_v4().to_string();

    let conn = db.connect()?;
    atomically(&conn, async {
        let now = now_timestamp();
        conn.execute(
            "INSERT INTO tracks (id, name, description, year_number, display_order, is_active, created_at, updated_at, created_by)
             VALUES (?, ?, ?, ?, ?, 1, ?, ?, ?)",
            params![
                track_id.clone(),
                name.clone(),
                new.description.as_deref(),
                year_number,
                display_order,
                now.clone(),
                now,
                actor_id
            ],
        )
        .await?;
        record_activity(
            &conn,
            ActivityEntry::new(Some(actor_id), "TRACK_CREATED", "track")
                .entity(&track_id)
                .details(json!({ "name": name })),
        )
        .await?;
        Ok::<_, ZygoteError>(())
    })
    .await?;

    info!(%track_id, "Track created");
    find_track(&conn, &track_id)
        .await?
        .ok_or_else(|| ZygoteError::DataIntegrity(format!("Track '{track_id}' vanished")))
}

pub async fn update_track(
    db: &Database,
    actor_id: &str,
    track_id: &str,
    update: TrackUpdate,
) -> Result<Track, ZygoteError> {
    let name = optional_required(update.name.as_deref(), "Name")?;
    if let Some(year) = update.year_number {
        non_negative(year, "Year number")?;
    }
    if let Some(order) = update.display_order {
        non_negative(order, "Display order")?;
    }
    let details = serde_json::to_value(&update)?;

    let conn = db.connect()?;
    atomically(&conn, async {
        let changed = conn
            .execute(
                "UPDATE tracks SET
                    name = COALESCE(?, name),
                    description = COALESCE(?, description),
                    year_number = COALESCE(?, year_number),
                    display_order = COALESCE(?, display_order),
                    is_active = COALESCE(?, is_active),
                    updated_at = ?
                 WHERE id = ?",
                params![
                    name.as_deref(),
                    update.description.as_deref(),
                    update.year_number,
                    update.display_order,
                    update.is_active.map(i64::from),
                    now_timestamp(),
                    track_id
                ],
            )
            .await?;
        if changed == 0 {
            return Err(ZygoteError::not_found("Track"));
        }
        record_activity(
            &conn,
            ActivityEntry::new(Some(actor_id), "TRACK_UPDATED", "track")
                .entity(track_id)
                .details(details),
        )
        .await?;
        Ok(())
    })
    .await?;

    info!(%track_id, "Track updated");
    find_track(&conn, track_id)
        .await?
        .ok_or_else(|| ZygoteError::not_found("Track"))
}

/// Soft delete. Subjects and topics beneath stay in place but disappear from
/// every public read.
pub async fn delete_track(db: &Database, actor_id: &str, track_id: &str) -> Result<(), ZygoteError> {
    let conn = db.connect()?;
    let track = find_track(&conn, track_id)
        .await?
        .ok_or_else(|| ZygoteError::not_found("Track"))?;

    atomically(&conn, async {
        conn.execute(
            "UPDATE tracks SET is_active = 0, updated_at = ? WHERE id = ?",
            params![now_timestamp(), track_id],
        )
        .await?;
        record_activity(
            &conn,
            ActivityEntry::new(Some(actor_id), "TRACK_DELETED", "track")
                .entity(track_id)
                .details(json!({ "name": track.name })),
        )
        .await?;
        Ok::<_, ZygoteError>(())
    })
    .await?;

    info!(%track_id, "Track deleted");
    Ok(())
}

const TOPICS_OF_TRACK: &str =
    "SELECT t.id FROM topics t JOIN subjects s ON t.subject_id = s.id WHERE s.track_id = ?";

/// Hard delete of a track and every row beneath it: subjects, topics, their
/// materials, MCQs, bookmarks and analytics events. Runs in one transaction.
/// Foreign keys are not enforced on these connections, so the cascade is
/// spelled out here.
pub async fn purge_track(db: &Database, actor_id: &str, track_id: &str) -> Result<(), ZygoteError> {
    let conn = db.connect()?;
    let track = find_track(&conn, track_id)
        .await?
        .ok_or_else(|| ZygoteError::not_found("Track"))?;

    atomically(&conn, async {
        for table in ["notes", "summaries", "mind_maps", "mcqs", "bookmarks", "analytics"] {
            conn.execute(
                &format!("DELETE FROM {table} WHERE topic_id IN ({TOPICS_OF_TRACK})"),
                params![track_id],
            )
            .await?;
        }
        conn.execute(
            "DELETE FROM topics WHERE subject_id IN (SELECT id FROM subjects WHERE track_id = ?)",
            params![track_id],
        )
        .await?;
        conn.execute("DELETE FROM subjects WHERE track_id = ?", params![track_id])
            .await?;
        conn.execute("DELETE FROM tracks WHERE id = ?", params![track_id])
            .await?;
        record_activity(
            &conn,
            ActivityEntry::new(Some(actor_id), "TRACK_PURGED", "track")
                .entity(track_id)
                .details(json!({ "name": track.name })),
        )
        .await?;
        Ok::<_, ZygoteError>(())
    })
    .await?;

    info!(%track_id, "Track purged");
    Ok(())
}
