//! # Account Flows
//!
//! Registration, login, OTP verification, token refresh and logout. Every
//! flow works against the live database rows; tokens are only ever issued
//! after the user row has been re-read.

use crate::{
    ActivityEntry, CoreAccessError, OtpNotifier, OtpPolicy, Role, TokenConfig, USER_COLUMNS, User,
    atomically, find_user_by_email, find_user_by_id, format_timestamp, normalize_email,
    now_timestamp, otp,
    password::{self, PASSWORD_POLICY_MESSAGE},
    record_activity,
    token::{self, decode_refresh_token},
};
use serde::Serialize;
use serde_json::json;
use tracing::{info, warn};
use turso::{Connection, Database, params};
use uuid::Uuid;

/// The outcome of a successful registration. No tokens are issued until the
/// email address is verified.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisteredUser {
    pub user_id: String,
    pub email: String,
    pub full_name: String,
    pub otp_sent: bool,
}

/// A logged-in session: the user plus an access token and a refresh token.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthSession {
    pub user: User,
    pub token: String,
    pub refresh_token: String,
}

/// Issues and checks credentials. Cheap to clone; share it through app state.
#[derive(Debug, Clone)]
pub struct AccountService {
    db: Database,
    tokens: TokenConfig,
    otp_policy: OtpPolicy,
    notifier: Box<dyn OtpNotifier>,
}

impl AccountService {
    pub fn new(
        db: Database,
        tokens: TokenConfig,
        otp_policy: OtpPolicy,
        notifier: Box<dyn OtpNotifier>,
    ) -> Self {
        Self {
            db,
            tokens,
            otp_policy,
            notifier,
        }
    }

    pub fn token_config(&self) -> &TokenConfig {
        &self.tokens
    }

    /// Creates an unverified student account and sends it a verification code.
    pub async fn register(
        &self,
        email: &str,
        password: &str,
        full_name: &str,
    ) -> Result<RegisteredUser, CoreAccessError> {
        let email = normalize_email(email);
        let full_name = full_name.trim();
        if email.is_empty() || password.is_empty() || full_name.is_empty() {
            return Err(CoreAccessError::Validation(
                "Email, password, and full name are required.".to_string(),
            ));
        }
        if !password::is_valid_email(&email) {
            return Err(CoreAccessError::Validation(
                "Invalid email format.".to_string(),
            ));
        }
        if !password::is_strong_password(password) {
            return Err(CoreAccessError::Validation(
                PASSWORD_POLICY_MESSAGE.to_string(),
            ));
        }

        let conn = self.db.connect()?;
        if find_user_by_email(&conn, &email).await?.is_some() {
            return Err(CoreAccessError::Conflict(
                "Email already registered.".to_string(),
            ));
        }

        let password_hash = password::hash_password(password)?;
        let user_id = Uuid::new_v4().to_string();
        let policy = self.otp_policy;

        let code = atomically(&conn, async {
            insert_user(&conn, &user_id, &email, &password_hash, full_name, Role::Student, false)
                .await
                .map_err(duplicate_email_as_conflict)?;
            let code = otp::issue_otp(&conn, &user_id, &email, policy).await?;
            record_activity(
                &conn,
                ActivityEntry::new(Some(&user_id), "USER_REGISTERED", "user")
                    .entity(&user_id)
                    .details(json!({ "email": email })),
            )
            .await?;
            Ok::<_, CoreAccessError>(code)
        })
        .await?;

        info!(%user_id, "Registered new student account");
        self.deliver(&email, &code).await;

        Ok(RegisteredUser {
            user_id,
            email,
            full_name: full_name.to_string(),
            otp_sent: true,
        })
    }

    /// Checks credentials and opens a session.
    ///
    /// Unknown emails, deactivated accounts and wrong passwords are reported
    /// identically. Unverified students get a fresh code instead of tokens.
    pub async fn login(&self, email: &str, password: &str) -> Result<AuthSession, CoreAccessError> {
        if email.trim().is_empty() || password.is_empty() {
            return Err(CoreAccessError::Validation(
                "Email and password are required.".to_string(),
            ));
        }

        let conn = self.db.connect()?;
        let Some((user, password_hash)) = find_credentials(&conn, email).await? else {
            // Equal Argon2 work for unknown emails.
            password::verify_against_dummy(password);
            warn!("Login attempt for unknown email");
            return Err(CoreAccessError::InvalidCredentials);
        };

        let password_matches = password::verify_password(password, &password_hash)?;
        if !user.is_active || !password_matches {
            warn!(user_id = %user.id, "Rejected login attempt");
            return Err(CoreAccessError::InvalidCredentials);
        }

        if user.role == Role::Student && !user.is_verified {
            let code = otp::issue_otp(&conn, &user.id, &user.email, self.otp_policy).await?;
            self.deliver(&user.email, &code).await;
            return Err(CoreAccessError::EmailNotVerified {
                user_id: user.id,
                email: user.email,
            });
        }

        self.open_session(&conn, &user.id, "USER_LOGIN").await
    }

    /// Consumes a verification code, marks the account verified and logs the user in.
    pub async fn verify_otp(&self, email: &str, code: &str) -> Result<AuthSession, CoreAccessError> {
        if email.trim().is_empty() || code.trim().is_empty() {
            return Err(CoreAccessError::Validation(
                "Email and OTP code are required.".to_string(),
            ));
        }

        let conn = self.db.connect()?;
        let user_id = atomically(&conn, async {
            let user_id = otp::consume_otp(&conn, email, code).await?;
            conn.execute(
                "UPDATE users SET is_verified = 1, updated_at = ? WHERE id = ?",
                params![now_timestamp(), user_id.clone()],
            )
            .await?;
            Ok::<_, CoreAccessError>(user_id)
        })
        .await?;

        info!(%user_id, "Email verified");
        self.open_session(&conn, &user_id, "USER_VERIFIED").await
    }

    /// Issues a new code for an unverified account. Older codes stay valid until
    /// they expire, but only a matching code is ever accepted.
    pub async fn resend_otp(&self, email: &str) -> Result<(), CoreAccessError> {
        if email.trim().is_empty() {
            return Err(CoreAccessError::Validation("Email is required.".to_string()));
        }

        let conn = self.db.connect()?;
        let user = find_user_by_email(&conn, email)
            .await?
            .ok_or_else(|| CoreAccessError::NotFound("User not found.".to_string()))?;
        if user.is_verified {
            return Err(CoreAccessError::Validation(
                "Email already verified.".to_string(),
            ));
        }

        let code = otp::issue_otp(&conn, &user.id, &user.email, self.otp_policy).await?;
        self.deliver(&user.email, &code).await;
        Ok(())
    }

    /// Exchanges a persisted, unexpired refresh token for a new access token.
    pub async fn refresh(&self, refresh_token: &str) -> Result<(User, String), CoreAccessError> {
        let claims = decode_refresh_token(refresh_token, &self.tokens)?;
        let conn = self.db.connect()?;

        let mut rows = conn
            .query(
                "SELECT user_id FROM refresh_tokens WHERE token = ? AND expires_at > ?",
                params![refresh_token, now_timestamp()],
            )
            .await?;
        let row = rows.next().await?.ok_or_else(|| {
            CoreAccessError::TokenInvalid("Refresh token revoked or expired.".to_string())
        })?;
        let owner: String = row.get(0)?;
        if owner != claims.sub {
            return Err(CoreAccessError::TokenInvalid(
                "Refresh token owner mismatch.".to_string(),
            ));
        }

        let user = match find_user_by_id(&conn, &owner).await? {
            Some(user) if user.is_active => user,
            _ => {
                return Err(CoreAccessError::TokenInvalid(
                    "Account is not active.".to_string(),
                ));
            }
        };
        let access_token = token::issue_access_token(&user, &self.tokens)?;
        Ok((user, access_token))
    }

    /// Revokes the given refresh token, if any. Unknown tokens are ignored.
    pub async fn logout(
        &self,
        user_id: &str,
        refresh_token: Option<&str>,
    ) -> Result<(), CoreAccessError> {
        if let Some(refresh_token) = refresh_token {
            let conn = self.db.connect()?;
            conn.execute(
                "DELETE FROM refresh_tokens WHERE token = ? AND user_id = ?",
                params![refresh_token, user_id],
            )
            .await?;
        }
        info!(%user_id, "User logged out");
        Ok(())
    }

    /// Creates a verified account with `role`, or brings an existing one with
    /// the same email to that state: new password, `role`, verified and active.
    /// Used for seeding administrators.
    pub async fn ensure_account(
        &self,
        email: &str,
        password: &str,
        full_name: &str,
        role: Role,
    ) -> Result<User, CoreAccessError> {
        let email = normalize_email(email);
        let password_hash = password::hash_password(password)?;
        let conn = self.db.connect()?;

        let user_id = match find_user_by_email(&conn, &email).await? {
            Some(existing) => {
                conn.execute(
                    "UPDATE users SET password_hash = ?, role = ?, is_verified = 1, is_active = 1, updated_at = ?
                     WHERE id = ?",
                    params![password_hash, role.as_str(), now_timestamp(), existing.id.clone()],
                )
                .await?;
                if existing.role != role || !existing.is_verified || !existing.is_active {
                    warn!(user_id = %existing.id, role = %role, "Existing account promoted to the seeded role");
                }
                existing.id
            }
            None => {
                let user_id = Uuid::new_v4().to_string();
                insert_user(&conn, &user_id, &email, &password_hash, full_name, role, true).await?;
                user_id
            }
        };

        find_user_by_id(&conn, &user_id)
            .await?
            .ok_or_else(|| CoreAccessError::DataIntegrity(format!("User '{user_id}' vanished")))
    }

    async fn open_session(
        &self,
        conn: &Connection,
        user_id: &str,
        action: &str,
    ) -> Result<AuthSession, CoreAccessError> {
        let (refresh_token, refresh_expires_at) =
            token::issue_refresh_token(user_id, &self.tokens)?;

        atomically(conn, async {
            let now = now_timestamp();
            conn.execute(
                "INSERT INTO refresh_tokens (id, user_id, token, expires_at, created_at) VALUES (?, ?, ?, ?, ?)",
                params![
                    Uuid::new_v4().to_string(),
                    user_id,
                    refresh_token.clone(),
                    format_timestamp(refresh_expires_at),
                    now.clone()
                ],
            )
            .await?;
            conn.execute(
                "UPDATE users SET last_login = ? WHERE id = ?",
                params![now, user_id],
            )
            .await?;
            record_activity(
                conn,
                ActivityEntry::new(Some(user_id), action, "user").entity(user_id),
            )
            .await
        })
        .await?;

        let user = find_user_by_id(conn, user_id)
            .await?
            .ok_or_else(|| CoreAccessError::DataIntegrity(format!("User '{user_id}' vanished")))?;
        let token = token::issue_access_token(&user, &self.tokens)?;

        Ok(AuthSession {
            user,
            token,
            refresh_token,
        })
    }

    async fn deliver(&self, email: &str, code: &str) {
        if let Err(e) = self.notifier.send_otp(email, code).await {
            warn!("OTP delivery failed, the user can request a new code: {e}");
        }
    }
}

async fn insert_user(
    conn: &Connection,
    user_id: &str,
    email: &str,
    password_hash: &str,
    full_name: &str,
    role: Role,
    verified: bool,
) -> Result<(), CoreAccessError> {
    let now = now_timestamp();
    conn.execute(
        "INSERT INTO users (id, email, password_hash, full_name, role, is_verified, is_active, created_at, updated_at)
         VALUES (?, ?, ?, ?, ?, ?, 1, ?, ?)",
        params![
            user_id,
            email,
            password_hash,
            full_name,
            role.as_str(),
            i64::from(verified),
            now.clone(),
            now
        ],
    )
    .await?;
    Ok(())
}

/// Two registrations for one email can both pass the lookup; the loser hits
/// the unique index and is reported like any other duplicate.
fn duplicate_email_as_conflict(err: CoreAccessError) -> CoreAccessError {
    match err {
        CoreAccessError::Database(e) if e.to_string().contains("UNIQUE constraint failed") => {
            CoreAccessError::Conflict("Email already registered.".to_string())
        }
        other => other,
    }
}

async fn find_credentials(
    conn: &Connection,
    email: &str,
) -> Result<Option<(User, String)>, CoreAccessError> {
    let mut rows = conn
        .query(
            &format!("SELECT {USER_COLUMNS}, password_hash FROM users WHERE email = ?"),
            params![normalize_email(email)],
        )
        .await?;
    match rows.next().await? {
        Some(row) => {
            let user = User::try_from(&row)?;
            let hash: String = row.get(11)?;
            Ok(Some((user, hash)))
        }
        None => Ok(None),
    }
}
