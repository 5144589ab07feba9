//! # Content Hierarchy
//!
//! Track → Subject → Topic → {Notes, Summary, MindMap, MCQs}.
//!
//! Public reads only ever see a node when it and every ancestor are active.
//! Administrative writes pair the entity change with its audit row in one
//! transaction.

pub mod materials;
pub mod mcqs;
pub mod subjects;
pub mod topics;
pub mod tracks;

pub use materials::{MindMap, NewMindMap, NewTextContent, TextContent, TextKind};
pub use mcqs::{AnswerOutcome, Mcq, McqQuery, McqUpdate, NewMcq, SubmitAnswer};
pub use subjects::{NewSubject, Subject, SubjectDetail, SubjectUpdate};
pub use topics::{NewTopic, Topic, TopicAccess, TopicDetail, TopicUpdate};
pub use tracks::{NewTrack, Track, TrackUpdate};

use crate::errors::ZygoteError;

/// Joins a row aliased `c` that carries a `topic_id` up to its track.
pub(crate) const TOPIC_CHAIN_JOIN: &str = "JOIN topics t ON t.id = c.topic_id
     JOIN subjects s ON s.id = t.subject_id
     JOIN tracks tr ON tr.id = s.track_id";

/// Visibility filter matching [`TOPIC_CHAIN_JOIN`].
pub(crate) const TOPIC_CHAIN_ACTIVE: &str =
    "t.is_active = 1 AND s.is_active = 1 AND tr.is_active = 1";

/// Trims a required text field and rejects it when empty.
pub(crate) fn required(value: &str, field: &str) -> Result<String, ZygoteError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ZygoteError::Validation(format!("{field} is required.")));
    }
    Ok(trimmed.to_string())
}

/// Rejects an explicitly supplied but blank replacement value.
pub(crate) fn optional_required(
    value: Option<&str>,
    field: &str,
) -> Result<Option<String>, ZygoteError> {
    value.map(|v| required(v, field)).transpose()
}

pub(crate) fn non_negative(value: i64, field: &str) -> Result<i64, ZygoteError> {
    if value < 0 {
        return Err(ZygoteError::Validation(format!(
            "{field} must not be negative."
        )));
    }
    Ok(value)
}
