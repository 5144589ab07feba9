//! Append-only audit trail stored in `activity_logs`.

use crate::{CoreAccessError, now_timestamp};
use serde_json::Value;
use tracing::debug;
use turso::{Connection, params};
use uuid::Uuid;

/// One audit row. Build it with [`ActivityEntry::new`] and the chained setters.
#[derive(Debug, Clone)]
pub struct ActivityEntry<'a> {
    pub actor_id: Option<&'a str>,
    pub action: &'a str,
    pub entity_type: &'a str,
    pub entity_id: Option<&'a str>,
    pub details: Option<Value>,
}

impl<'a> ActivityEntry<'a> {
    pub fn new(actor_id: Option<&'a str>, action: &'a str, entity_type: &'a str) -> Self {
        Self {
            actor_id,
            action,
            entity_type,
            entity_id: None,
            details: None,
        }
    }

    pub fn entity(mut self, entity_id: &'a str) -> Self {
        self.entity_id = Some(entity_id);
        self
    }

    pub fn details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }
}

/// Appends an entry. Callers that pair this with an entity write run both
/// inside [`crate::atomically`] on the same connection.
pub async fn record_activity(
    conn: &Connection,
    entry: ActivityEntry<'_>,
) -> Result<(), CoreAccessError> {
    debug!(action = entry.action, entity = entry.entity_type, "Recording activity");
    let details = entry.details.as_ref().map(Value::to_string);
    conn.execute(
        "INSERT INTO activity_logs (id, user_id, action, entity_type, entity_id, details, created_at)
         VALUES (?, ?, ?, ?, ?, ?, ?)",
        params![
            Uuid::new_v4().to_string(),
            entry.actor_id,
            entry.action,
            entry.entity_type,
            entry.entity_id,
            details,
            now_timestamp()
        ],
    )
    .await?;
    Ok(())
}
