//! # Core Access Crate
//!
//! This crate is the central authority for all identity, authentication (AuthN),
//! and authorization (AuthZ) logic for the ZYGOTE platform. It owns the `users`,
//! `otp_verifications`, `refresh_tokens` and `activity_logs` tables, while the
//! schema itself is created by the `zygote` storage provider.

pub mod accounts;
pub mod audit;
pub mod columns;
pub mod notifier;
pub mod otp;
pub mod password;
pub mod policy;
pub mod token;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{fmt, future::Future, str::FromStr};
use thiserror::Error;
use tracing::warn;
use turso::{Connection, Database, Error as TursoError, Row, params};

pub use accounts::{AccountService, AuthSession, RegisteredUser};
pub use audit::{ActivityEntry, record_activity};
pub use notifier::{LogNotifier, OtpNotifier};
pub use otp::OtpPolicy;
pub use token::{AccessClaims, TokenConfig};

/// The single text format used for every timestamp column. UTC, second precision,
/// so lexical order equals chronological order.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// The column list matching `User::try_from(&Row)`.
pub const USER_COLUMNS: &str = "id, email, full_name, role, is_verified, is_active, google_id, profile_picture, created_at, updated_at, last_login";

#[derive(Error, Debug)]
pub enum CoreAccessError {
    #[error("Database error: {0}")]
    Database(#[from] TursoError),
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    Conflict(String),
    #[error("Invalid email or password.")]
    InvalidCredentials,
    #[error("Email not verified. OTP sent to your email.")]
    EmailNotVerified { user_id: String, email: String },
    #[error("Invalid or expired OTP.")]
    InvalidOtp,
    #[error("{0}")]
    NotFound(String),
    #[error("Token expired. Please login again.")]
    TokenExpired,
    #[error("Invalid token: {0}")]
    TokenInvalid(String),
    #[error("Crypto error: {0}")]
    Crypto(String),
    #[error("Notification delivery failed: {0}")]
    Notification(String),
    #[error("Data integrity error: {0}")]
    DataIntegrity(String),
}

/// The closed set of roles a user can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Student,
    Admin,
    Editor,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Student => "student",
            Role::Admin => "admin",
            Role::Editor => "editor",
        }
    }

    /// Admins and editors manage content and bypass the subscription gate.
    pub fn is_staff(&self) -> bool {
        matches!(self, Role::Admin | Role::Editor)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = CoreAccessError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "student" => Ok(Role::Student),
            "admin" => Ok(Role::Admin),
            "editor" => Ok(Role::Editor),
            other => Err(CoreAccessError::Validation(format!("Unknown role '{other}'."))),
        }
    }
}

/// Represents a user in the system. The password hash never leaves the crate.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub email: String,
    pub full_name: String,
    pub role: Role,
    pub is_verified: bool,
    pub is_active: bool,
    pub google_id: Option<String>,
    pub profile_picture: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_login: Option<DateTime<Utc>>,
}

impl TryFrom<&Row> for User {
    type Error = CoreAccessError;

    fn try_from(row: &Row) -> Result<Self, Self::Error> {
        Ok(User {
            id: columns::text(row, 0)?,
            email: columns::text(row, 1)?,
            full_name: columns::text(row, 2)?,
            role: columns::text(row, 3)?.parse()?,
            is_verified: columns::flag(row, 4)?,
            is_active: columns::flag(row, 5)?,
            google_id: columns::optional_text(row, 6)?,
            profile_picture: columns::optional_text(row, 7)?,
            created_at: columns::timestamp(row, 8)?,
            updated_at: columns::timestamp(row, 9)?,
            last_login: columns::optional_timestamp(row, 10)?,
        })
    }
}

/// Formats a UTC instant the way every timestamp column stores it.
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.format(TIMESTAMP_FORMAT).to_string()
}

/// The current instant in storage format.
pub fn now_timestamp() -> String {
    format_timestamp(Utc::now())
}

/// Parses a stored timestamp back into a UTC instant.
pub fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, CoreAccessError> {
    NaiveDateTime::parse_from_str(value, TIMESTAMP_FORMAT)
        .map(|ndt| DateTime::<Utc>::from_naive_utc_and_offset(ndt, Utc))
        .map_err(|e| CoreAccessError::DataIntegrity(format!("Failed to parse date '{value}': {e}")))
}

/// Runs `work` between `BEGIN TRANSACTION` and `COMMIT` on `conn`, rolling back
/// when it fails. The future must only touch the database through `conn`.
pub async fn atomically<T, E, Fut>(conn: &Connection, work: Fut) -> Result<T, E>
where
    Fut: Future<Output = Result<T, E>>,
    E: From<TursoError>,
{
    conn.execute("BEGIN TRANSACTION", ()).await?;
    match work.await {
        Ok(value) => {
            conn.execute("COMMIT", ()).await?;
            Ok(value)
        }
        Err(err) => {
            if let Err(rollback_err) = conn.execute("ROLLBACK", ()).await {
                warn!("Rollback failed: {rollback_err}");
            }
            Err(err)
        }
    }
}

/// Looks up a user by primary key.
pub async fn find_user_by_id(
    conn: &Connection,
    user_id: &str,
) -> Result<Option<User>, CoreAccessError> {
    let mut rows = conn
        .query(
            &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?"),
            params![user_id],
        )
        .await?;
    match rows.next().await? {
        Some(row) => Ok(Some(User::try_from(&row)?)),
        None => Ok(None),
    }
}

/// Looks up a user by email. The comparison is case-insensitive because emails
/// are always stored lower-cased.
pub async fn find_user_by_email(
    conn: &Connection,
    email: &str,
) -> Result<Option<User>, CoreAccessError> {
    let mut rows = conn
        .query(
            &format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?"),
            params![normalize_email(email)],
        )
        .await?;
    match rows.next().await? {
        Some(row) => Ok(Some(User::try_from(&row)?)),
        None => Ok(None),
    }
}

/// Resolves the live user row behind an already verified access token.
///
/// Missing and deactivated accounts are both reported as `TokenInvalid`, so a
/// token outliving its account is treated like any other bad token.
pub async fn resolve_active_user(
    db: &Database,
    claims: &AccessClaims,
) -> Result<User, CoreAccessError> {
    let conn = db.connect()?;
    match find_user_by_id(&conn, &claims.sub).await? {
        Some(user) if user.is_active => Ok(user),
        Some(_) => Err(CoreAccessError::TokenInvalid(
            "Account is deactivated.".to_string(),
        )),
        None => Err(CoreAccessError::TokenInvalid("User not found.".to_string())),
    }
}

/// Returns every user, newest first.
pub async fn list_users(db: &Database) -> Result<Vec<User>, CoreAccessError> {
    let conn = db.connect()?;
    let mut rows = conn
        .query(
            &format!("SELECT {USER_COLUMNS} FROM users ORDER BY created_at DESC, email ASC"),
            (),
        )
        .await?;

    let mut users = Vec::new();
    while let Some(row) = rows.next().await? {
        users.push(User::try_from(&row)?);
    }
    Ok(users)
}

/// The fields an administrator may change on another account.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserAccessUpdate {
    pub role: Option<Role>,
    pub is_active: Option<bool>,
}

/// Changes a user's role and/or active flag and records the change.
///
/// Accounts are never hard-deleted; setting `is_active = false` is the only
/// way to lock one out.
pub async fn update_user_access(
    db: &Database,
    actor_id: &str,
    user_id: &str,
    update: UserAccessUpdate,
) -> Result<User, CoreAccessError> {
    let conn = db.connect()?;
    if find_user_by_id(&conn, user_id).await?.is_none() {
        return Err(CoreAccessError::NotFound("User not found.".to_string()));
    }

    let role = update.role.map(|r| r.as_str());
    let is_active = update.is_active.map(i64::from);
    let details = serde_json::json!({
        "role": role,
        "isActive": update.is_active,
    });

    atomically(&conn, async {
        conn.execute(
            "UPDATE users SET role = COALESCE(?, role), is_active = COALESCE(?, is_active), updated_at = ? WHERE id = ?",
            params![role, is_active, now_timestamp(), user_id],
        )
        .await?;
        record_activity(
            &conn,
            ActivityEntry::new(Some(actor_id), "USER_UPDATED", "user")
                .entity(user_id)
                .details(details),
        )
        .await
    })
    .await?;

    find_user_by_id(&conn, user_id)
        .await?
        .ok_or_else(|| CoreAccessError::DataIntegrity(format!("User '{user_id}' vanished")))
}

/// Emails are compared and stored lower-cased and trimmed.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_round_trips_through_its_text_form() {
        for role in [Role::Student, Role::Admin, Role::Editor] {
            assert_eq!(role.as_str().parse::<Role>().unwrap(), role);
        }
        assert!("root".parse::<Role>().is_err());
    }

    #[test]
    fn only_admins_and_editors_are_staff() {
        assert!(Role::Admin.is_staff());
        assert!(Role::Editor.is_staff());
        assert!(!Role::Student.is_staff());
    }

    #[test]
    fn timestamps_sort_chronologically_as_text() {
        let earlier = Utc::now();
        let later = earlier + chrono::Duration::minutes(5);
        assert!(format_timestamp(earlier) < format_timestamp(later));

        let parsed = parse_timestamp(&format_timestamp(earlier)).unwrap();
        assert_eq!(parsed.timestamp(), earlier.timestamp());
    }

    #[test]
    fn emails_are_normalized() {
        assert_eq!(normalize_email("  A@B.Com "), "a@b.com");
    }
}
