use crate::{
    errors::ZygoteError,
    types::{FontSize, Theme},
};
use chrono::{DateTime, Utc};
use core_access::{columns, now_timestamp};
use serde::{Deserialize, Serialize};
use tracing::info;
use turso::{Connection, Database, Row, params};
use uuid::Uuid;

const PREFERENCE_COLUMNS: &str =
    "id, user_id, theme, font_size, notifications_enabled, created_at, updated_at";

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserPreferences {
    pub id: String,
    pub user_id: String,
    pub theme: Theme,
    pub font_size: FontSize,
    pub notifications_enabled: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<&Row> for UserPreferences {
    type Error = ZygoteError;

    fn try_from(row: &Row) -> Result<Self, Self::Error> {
        Ok(UserPreferences {
            id: columns::text(row, 0)?,
            user_id: columns::text(row, 1)?,
            theme: columns::text(row, 2)?.parse()?,
            font_size: columns::text(row, 3)?.parse()?,
            notifications_enabled: columns::flag(row, 4)?,
            created_at: columns::timestamp(row, 5)?,
            updated_at: columns::timestamp(row, 6)?,
        })
    }
}

/// Fields left as `None` keep their stored value.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreferencesUpdate {
    pub theme: Option<Theme>,
    pub font_size: Option<FontSize>,
    pub notifications_enabled: Option<bool>,
}

/// Inserts the default row unless one already exists.
async fn ensure_defaults(conn: &Connection, user_id: &str) -> Result<(), ZygoteError> {
    let now = now_timestamp();
    conn.execute(
        "INSERT INTO user_preferences (id, user_id, theme, font_size, notifications_enabled, created_at, updated_at)
         VALUES (?, ?, ?, ?, 1, ?, ?)
         ON CONFLICT (user_id) DO NOTHING",
        params![
            Uuid::new_v4().to_string(),
            user_id,
            Theme::Light.as_str(),
            FontSize::Medium.as_str(),
            now.clone(),
            now
        ],
    )
    .await?;
    Ok(())
}

async fn read_preferences(conn: &Connection, user_id: &str) -> Result<UserPreferences, ZygoteError> {
    let mut rows = conn
        .query(
            &format!("SELECT {PREFERENCE_COLUMNS} FROM user_preferences WHERE user_id = ?"),
            params![user_id],
        )
        .await?;
    match rows.next().await? {
        Some(row) => UserPreferences::try_from(&row),
        None => Err(ZygoteError::DataIntegrity(format!(
            "Preferences for user '{user_id}' vanished"
        ))),
    }
}

/// The user's preferences, persisting the defaults on first read.
pub async fn get_preferences(db: &Database, user_id: &str) -> Result<UserPreferences, ZygoteError> {
    let conn = db.connect()?;
    ensure_defaults(&conn, user_id).await?;
    read_preferences(&conn, user_id).await
}

pub async fn update_preferences(
    db: &Database,
    user_id: &str,
    update: PreferencesUpdate,
) -> Result<UserPreferences, ZygoteError> {
    let conn = db.connect()?;
    ensure_defaults(&conn, user_id).await?;
    conn.execute(
        "UPDATE user_preferences SET
            theme = COALESCE(?, theme),
            font_size = COALESCE(?, font_size),
            notifications_enabled = COALESCE(?, notifications_enabled),
            updated_at = ?
         WHERE user_id = ?",
        params![
            update.theme.map(|t| t.as_str()),
            update.font_size.map(|f| f.as_str()),
            update.notifications_enabled.map(i64::from),
            now_timestamp(),
            user_id
        ],
    )
    .await?;
    info!(%user_id, "Preferences updated");
    read_preferences(&conn, user_id).await
}
