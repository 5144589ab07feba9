use super::{non_negative, optional_required, required, tracks::find_track};
use crate::errors::ZygoteError;
use chrono::{DateTime, Utc};
use core_access::{ActivityEntry, atomically, columns, now_timestamp, record_activity};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;
use turso::{Connection, Database, Row, params};
use uuid::Uuid;

const SUBJECT_COLUMNS: &str = "s.id, s.track_id, s.name, s.description, s.icon_url, s.color_code, s.display_order, s.is_free_trial, s.is_active, s.created_at, s.updated_at, s.created_by";

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Subject {
    pub id: String,
    pub track_id: String,
    pub name: String,
    pub description: Option<String>,
    pub icon_url: Option<String>,
    pub color_code: Option<String>,
    pub display_order: i64,
    pub is_free_trial: bool,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub created_by: Option<String>,
}

impl TryFrom<&Row> for Subject {
    type Error = ZygoteError;

    fn try_from(row: &Row) -> Result<Self, Self::Error> {
        Ok(Subject {
            id: columns::text(row, 0)?,
            track_id: columns::text(row, 1)?,
            name: columns::text(row, 2)?,
            description: columns::optional_text(row, 3)?,
            icon_url: columns::optional_text(row, 4)?,
            color_code: columns::optional_text(row, 5)?,
            display_order: columns::integer(row, 6)?,
            is_free_trial: columns::flag(row, 7)?,
            is_active: columns::flag(row, 8)?,
            created_at: columns::timestamp(row, 9)?,
            updated_at: columns::timestamp(row, 10)?,
            created_by: columns::optional_text(row, 11)?,
        })
    }
}

/// A subject together with the track it belongs to.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectDetail {
    #[serde(flatten)]
    pub subject: Subject,
    pub track_name: String,
    pub year_number: i64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewSubject {
    pub track_id: String,
    pub name: String,
    pub description: Option<String>,
    pub icon_url: Option<String>,
    pub color_code: Option<String>,
    #[serde(default)]
    pub display_order: i64,
    #[serde(default)]
    pub is_free_trial: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub track_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_order: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_free_trial: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
}

/// `#RRGGBB`, the only colour form the clients render.
fn validate_color(color: Option<&str>) -> Result<(), ZygoteError> {
    if let Some(color) = color {
        let hex = color.strip_prefix('#').unwrap_or_default();
        if hex.len() != 6 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(ZygoteError::Validation(format!(
                "Invalid color code '{color}'. Expected #RRGGBB."
            )));
        }
    }
    Ok(())
}

/// Active subjects of a track, or nothing when the track itself is hidden.
pub async fn list_subjects(db: &Database, track_id: &str) -> Result<Vec<Subject>, ZygoteError> {
    let conn = db.connect()?;
    let mut rows = conn
        .query(
            &format!(
                "SELECT {SUBJECT_COLUMNS} FROM subjects s
                 JOIN tracks tr ON tr.id = s.track_id
                 WHERE s.track_id = ? AND s.is_active = 1 AND tr.is_active = 1
                 ORDER BY s.display_order ASC, s.created_at ASC"
            ),
            params![track_id],
        )
        .await?;

    let mut subjects = Vec::new();
    while let Some(row) = rows.next().await? {
        subjects.push(Subject::try_from(&row)?);
    }
    Ok(subjects)
}

pub async fn get_subject(db: &Database, subject_id: &str) -> Result<SubjectDetail, ZygoteError> {
    let conn = db.connect()?;
    let mut rows = conn
        .query(
            &format!(
                "SELECT {SUBJECT_COLUMNS}, tr.name, tr.year_number FROM subjects s
                 JOIN tracks tr ON tr.id = s.track_id
                 WHERE s.id = ? AND s.is_active = 1 AND tr.is_active = 1"
            ),
            params![subject_id],
        )
        .await?;
    let row = rows
        .next()
        .await?
        .ok_or_else(|| ZygoteError::not_found("Subject"))?;

    Ok(SubjectDetail {
        subject: Subject::try_from(&row)?,
        track_name: columns::text(&row, 12)?,
        year_number: columns::integer(&row, 13)?,
    })
}

pub(crate) async fn find_subject(
    conn: &Connection,
    subject_id: &str,
) -> Result<Option<Subject>, ZygoteError> {
    let mut rows = conn
        .query(
            &format!("SELECT {SUBJECT_COLUMNS} FROM subjects s WHERE s.id = ?"),
            params![subject_id],
        )
        .await?;
    match rows.next().await? {
        Some(row) => Ok(Some(Subject::try_from(&row)?)),
        None => Ok(None),
    }
}

pub async fn create_subject(
    db: &Database,
    actor_id: &str,
    new: NewSubject,
) -> Result<Subject, ZygoteError> {
    let name = required(&new.name, "Name")?;
    let display_order = non_negative(new.display_order, "Display order")?;
    validate_color(new.color_code.as_deref())?;

    let conn = db.connect()?;
    if find_track(&conn, &new.track_id).await?.is_none() {
        return Err(ZygoteError::not_found("Track"));
    }

    let subject_id = Uuid::new_v4().to_string();
    atomically(&conn, async {
        let now = now_timestamp();
        conn.execute(
            "INSERT INTO subjects (id, track_id, name, description, icon_url, color_code, display_order, is_free_trial, is_active, created_at, updated_at, created_by)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, 1, ?, ?, ?)",
            params![
                subject_id.clone(),
                new.track_id.as_str(),
                name.clone(),
                new.description.as_deref(),
                new.icon_url.as_deref(),
                new.color_code.as_deref(),
                display_order,
                i64::from(new.is_free_trial),
                now.clone(),
                now,
                actor_id
            ],
        )
        .await?;
        record_activity(
            &conn,
            ActivityEntry::new(Some(actor_id), "SUBJECT_CREATED", "subject")
                .entity(&subject_id)
                .details(json!({ "name": name, "trackId": new.track_id })),
        )
        .await?;
        Ok::<_, ZygoteError>(())
    })
    .await?;

    info!(%subject_id, "Subject created");
    find_subject(&conn, &subject_id)
        .await?
        .ok_or_else(|| ZygoteError::DataIntegrity(format!("Subject '{subject_id}' vanished")))
}

pub async fn update_subject(
    db: &Database,
    actor_id: &str,
    subject_id: &str,
    update: SubjectUpdate,
) -> Result<Subject, ZygoteError> {
    let name = optional_required(update.name.as_deref(), "Name")?;
    if let Some(order) = update.display_order {
        non_negative(order, "Display order")?;
    }
    validate_color(update.color_code.as_deref())?;
    let details = serde_json::to_value(&update)?;

    let conn = db.connect()?;
    if let Some(track_id) = update.track_id.as_deref() {
        if find_track(&conn, track_id).await?.is_none() {
            return Err(ZygoteError::not_found("Track"));
        }
    }

    atomically(&conn, async {
        let changed = conn
            .execute(
                "UPDATE subjects SET
                    track_id = COALESCE(?, track_id),
                    name = COALESCE(?, name),
                    description = COALESCE(?, description),
                    icon_url = COALESCE(?, icon_url),
                    color_code = COALESCE(?, color_code),
                    display_order = COALESCE(?, display_order),
                    is_free_trial = COALESCE(?, is_free_trial),
                    is_active = COALESCE(?, is_active),
                    updated_at = ?
                 WHERE id = ?",
                params![
                    update.track_id.as_deref(),
                    name.as_deref(),
                    update.description.as_deref(),
                    update.icon_url.as_deref(),
                    update.color_code.as_deref(),
                    update.display_order,
                    update.is_free_trial.map(i64::from),
                    update.is_active.map(i64::from),
                    now_timestamp(),
                    subject_id
                ],
            )
            .await?;
        if changed == 0 {
            return Err(ZygoteError::not_found("Subject"));
        }
        record_activity(
            &conn,
            ActivityEntry::new(Some(actor_id), "SUBJECT_UPDATED", "subject")
                .entity(subject_id)
                .details(details),
        )
        .await?;
        Ok(())
    })
    .await?;

    info!(%subject_id, "Subject updated");
    find_subject(&conn, subject_id)
        .await?
        .ok_or_else(|| ZygoteError::not_found("Subject"))
}

pub async fn delete_subject(
    db: &Database,
    actor_id: &str,
    subject_id: &str,
) -> Result<(), ZygoteError> {
    let conn = db.connect()?;
    let subject = find_subject(&conn, subject_id)
        .await?
        .ok_or_else(|| ZygoteError::not_found("Subject"))?;

    atomically(&conn, async {
        conn.execute(
            "UPDATE subjects SET is_active = 0, updated_at = ? WHERE id = ?",
            params![now_timestamp(), subject_id],
        )
        .await?;
        record_activity(
            &conn,
            ActivityEntry::new(Some(actor_id), "SUBJECT_DELETED", "subject")
                .entity(subject_id)
                .details(json!({ "name": subject.name })),
        )
        .await?;
        Ok::<_, ZygoteError>(())
    })
    .await?;

    info!(%subject_id, "Subject deleted");
    Ok(())
}
