//! One-time verification codes.
//!
//! Every issue inserts a fresh row; older rows are never rewritten, only
//! superseded. A code is consumed at most once.

use crate::{CoreAccessError, format_timestamp, normalize_email, now_timestamp};
use chrono::{Duration, Utc};
use rand::Rng;
use tracing::info;
use turso::{Connection, params};
use uuid::Uuid;

#[derive(Debug, Clone, Copy)]
pub struct OtpPolicy {
    /// Number of decimal digits in a code.
    pub length: u32,
    pub expiry_minutes: i64,
}

impl Default for OtpPolicy {
    fn default() -> Self {
        Self {
            length: 6,
            expiry_minutes: 10,
        }
    }
}

/// Generates a numeric code with exactly `length` digits (no leading zero).
pub fn generate_code(length: u32) -> String {
    let length = length.clamp(4, 9);
    let low = 10u32.pow(length - 1);
    let high = 10u32.pow(length);
    rand::rng().random_range(low..high).to_string()
}

/// Stores a new code for the user and returns it for delivery.
pub async fn issue_otp(
    conn: &Connection,
    user_id: &str,
    email: &str,
    policy: OtpPolicy,
) -> Result<String, CoreAccessError> {
    let code = generate_code(policy.length);
    let expires_at = Utc::now() + Duration::minutes(policy.expiry_minutes);

    conn.execute(
        "INSERT INTO otp_verifications (id, user_id, email, otp_code, expires_at, is_used, created_at)
         VALUES (?, ?, ?, ?, ?, 0, ?)",
        params![
            Uuid::new_v4().to_string(),
            user_id,
            normalize_email(email),
            code.clone(),
            format_timestamp(expires_at),
            now_timestamp()
        ],
    )
    .await?;
    info!(user_id, "Issued verification code");
    Ok(code)
}

/// Marks the newest unused, unexpired code matching `(email, code)` as used and
/// returns the owning user's ID.
pub async fn consume_otp(
    conn: &Connection,
    email: &str,
    code: &str,
) -> Result<String, CoreAccessError> {
    let mut rows = conn
        .query(
            "SELECT id, user_id FROM otp_verifications
             WHERE email = ? AND otp_code = ? AND is_used = 0 AND expires_at > ?
             ORDER BY created_at DESC
             LIMIT 1",
            params![normalize_email(email), code.trim(), now_timestamp()],
        )
        .await?;

    let row = rows.next().await?.ok_or(CoreAccessError::InvalidOtp)?;
    let otp_id: String = row.get(0)?;
    let user_id: String = row.get(1)?;

    let updated = conn
        .execute(
            "UPDATE otp_verifications SET is_used = 1 WHERE id = ? AND is_used = 0",
            params![otp_id],
        )
        .await?;
    if updated == 0 {
        return Err(CoreAccessError::InvalidOtp);
    }
    Ok(user_id)
}
