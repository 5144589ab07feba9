use super::{
    TOPIC_CHAIN_ACTIVE, TOPIC_CHAIN_JOIN, non_negative, optional_required, required,
    topics::require_topic,
};
use crate::{
    constants::{DEFAULT_MCQ_LIMIT, MAX_MCQ_LIMIT},
    errors::ZygoteError,
    learner::analytics,
    types::{ActivityType, AnswerOption, Difficulty},
};
use chrono::{DateTime, Utc};
use core_access::{ActivityEntry, atomically, columns, now_timestamp, record_activity};
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;
use turso::{Connection, Database, Row, params};
use uuid::Uuid;

const MCQ_COLUMNS: &str = "c.id, c.topic_id, c.question, c.option_a, c.option_b, c.option_c, c.option_d, c.correct_answer, c.explanation, c.difficulty, c.display_order, c.is_active, c.created_at, c.updated_at, c.created_by";

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Mcq {
    pub id: String,
    pub topic_id: String,
    pub question: String,
    pub option_a: String,
    pub option_b: String,
    pub option_c: String,
    pub option_d: String,
    pub correct_answer: AnswerOption,
    pub explanation: Option<String>,
    pub difficulty: Difficulty,
    pub display_order: Option<i64>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub created_by: Option<String>,
}

impl TryFrom<&Row> for Mcq {
    type Error = ZygoteError;

    fn try_from(row: &Row) -> Result<Self, Self::Error> {
        Ok(Mcq {
            id: columns::text(row, 0)?,
            topic_id: columns::text(row, 1)?,
            question: columns::text(row, 2)?,
            option_a: columns::text(row, 3)?,
            option_b: columns::text(row, 4)?,
            option_c: columns::text(row, 5)?,
            option_d: columns::text(row, 6)?,
            correct_answer: columns::text(row, 7)?.parse()?,
            explanation: columns::optional_text(row, 8)?,
            difficulty: columns::text(row, 9)?.parse()?,
            display_order: columns::optional_integer(row, 10)?,
            is_active: columns::flag(row, 11)?,
            created_at: columns::timestamp(row, 12)?,
            updated_at: columns::timestamp(row, 13)?,
            created_by: columns::optional_text(row, 14)?,
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewMcq {
    pub topic_id: String,
    pub question: String,
    pub option_a: String,
    pub option_b: String,
    pub option_c: String,
    pub option_d: String,
    pub correct_answer: AnswerOption,
    pub explanation: Option<String>,
    pub difficulty: Option<Difficulty>,
    pub display_order: Option<i64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct McqUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub question: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub option_a: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub option_b: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub option_c: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub option_d: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correct_answer: Option<AnswerOption>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub difficulty: Option<Difficulty>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_order: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
}

/// Listing filters, taken from the query string.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct McqQuery {
    pub difficulty: Option<Difficulty>,
    pub limit: Option<usize>,
}

impl McqQuery {
    pub fn effective_limit(&self) -> usize {
        self.limit.unwrap_or(DEFAULT_MCQ_LIMIT).min(MAX_MCQ_LIMIT)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitAnswer {
    pub selected_answer: String,
    #[serde(default)]
    pub time_spent: Option<i64>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerOutcome {
    pub is_correct: bool,
    pub correct_answer: AnswerOption,
}

/// MCQs of a visible topic: filtered, shuffled, then truncated.
pub async fn list_mcqs(
    db: &Database,
    topic_id: &str,
    query: &McqQuery,
) -> Result<Vec<Mcq>, ZygoteError> {
    let conn = db.connect()?;
    let difficulty = query.difficulty.map(|d| d.as_str());
    let mut rows = conn
        .query(
            &format!(
                "SELECT {MCQ_COLUMNS} FROM mcqs c
                 {TOPIC_CHAIN_JOIN}
                 WHERE c.topic_id = ? AND c.is_active = 1 AND {TOPIC_CHAIN_ACTIVE}
                   AND (? IS NULL OR c.difficulty = ?)"
            ),
            params![topic_id, difficulty, difficulty],
        )
        .await?;

    let mut mcqs = Vec::new();
    while let Some(row) = rows.next().await? {
        mcqs.push(Mcq::try_from(&row)?);
    }

    mcqs.shuffle(&mut rand::rng());
    mcqs.truncate(query.effective_limit());
    Ok(mcqs)
}

struct ValidatedMcq {
    topic_id: String,
    question: String,
    options: [String; 4],
    correct_answer: AnswerOption,
    explanation: Option<String>,
    difficulty: Difficulty,
    display_order: Option<i64>,
}

fn validate_new(new: NewMcq) -> Result<ValidatedMcq, ZygoteError> {
    if let Some(order) = new.display_order {
        non_negative(order, "Display order")?;
    }
    Ok(ValidatedMcq {
        question: required(&new.question, "Question")?,
        options: [
            required(&new.option_a, "Option A")?,
            required(&new.option_b, "Option B")?,
            required(&new.option_c, "Option C")?,
            required(&new.option_d, "Option D")?,
        ],
        topic_id: new.topic_id,
        correct_answer: new.correct_answer,
        explanation: new.explanation,
        difficulty: new.difficulty.unwrap_or_default(),
        display_order: new.display_order,
    })
}

async fn insert_mcq(
    conn: &Connection,
    actor_id: &str,
    mcq: &ValidatedMcq,
) -> Result<String, ZygoteError> {
    let mcq_id = Uuid::new_v4().to_string();
    let now = now_timestamp();
    let [a, b, c, d] = &mcq.options;
    conn.execute(
        "INSERT INTO mcqs (id, topic_id, question, option_a, option_b, option_c, option_d, correct_answer, explanation, difficulty, display_order, is_active, created_at, updated_at, created_by)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 1, ?, ?, ?)",
        params![
            mcq_id.clone(),
            mcq.topic_id.as_str(),
            mcq.question.as_str(),
            a.as_str(),
            b.as_str(),
            c.as_str(),
            d.as_str(),
            mcq.correct_answer.as_str(),
            mcq.explanation.as_deref(),
            mcq.difficulty.as_str(),
            mcq.display_order,
            now.clone(),
            now,
            actor_id
        ],
    )
    .await?;
    Ok(mcq_id)
}

async fn find_mcq(conn: &Connection, mcq_id: &str) -> Result<Option<Mcq>, ZygoteError> {
    let mut rows = conn
        .query(
            &format!("SELECT {MCQ_COLUMNS} FROM mcqs c WHERE c.id = ?"),
            params![mcq_id],
        )
        .await?;
    match rows.next().await? {
        Some(row) => Ok(Some(Mcq::try_from(&row)?)),
        None => Ok(None),
    }
}

pub async fn create_mcq(db: &Database, actor_id: &str, new: NewMcq) -> Result<Mcq, ZygoteError> {
    let mcq = validate_new(new)?;
    let conn = db.connect()?;
    require_topic(&conn, &mcq.topic_id).await?;

    let mcq_id = atomically(&conn, async {
        let mcq_id = insert_mcq(&conn, actor_id, &mcq).await?;
        record_activity(
            &conn,
            ActivityEntry::new(Some(actor_id), "MCQ_CREATED", "mcq")
                .entity(&mcq_id)
                .details(json!({ "topicId": mcq.topic_id, "question": mcq.question })),
        )
        .await?;
        Ok::<_, ZygoteError>(mcq_id)
    })
    .await?;

    info!(%mcq_id, "MCQ created");
    find_mcq(&conn, &mcq_id)
        .await?
        .ok_or_else(|| ZygoteError::DataIntegrity(format!("MCQ '{mcq_id}' vanished")))
}

/// Creates every MCQ or none of them.
pub async fn create_mcqs_bulk(
    db: &Database,
    actor_id: &str,
    batch: Vec<NewMcq>,
) -> Result<Vec<Mcq>, ZygoteError> {
    if batch.is_empty() {
        return Err(ZygoteError::Validation(
            "MCQs array is required.".to_string(),
        ));
    }
    let validated = batch
        .into_iter()
        .map(validate_new)
        .collect::<Result<Vec<_>, _>>()?;

    let conn = db.connect()?;
    for mcq in &validated {
        require_topic(&conn, &mcq.topic_id).await?;
    }

    let ids = atomically(&conn, async {
        let mut ids = Vec::with_capacity(validated.len());
        for mcq in &validated {
            ids.push(insert_mcq(&conn, actor_id, mcq).await?);
        }
        record_activity(
            &conn,
            ActivityEntry::new(Some(actor_id), "MCQS_BULK_CREATED", "mcq")
                .details(json!({ "count": ids.len(), "ids": ids })),
        )
        .await?;
        Ok::<_, ZygoteError>(ids)
    })
    .await?;

    info!(count = ids.len(), "MCQs bulk created");
    let mut created = Vec::with_capacity(ids.len());
    for id in &ids {
        let mcq = find_mcq(&conn, id)
            .await?
            .ok_or_else(|| ZygoteError::DataIntegrity(format!("MCQ '{id}' vanished")))?;
        created.push(mcq);
    }
    Ok(created)
}

pub async fn update_mcq(
    db: &Database,
    actor_id: &str,
    mcq_id: &str,
    update: McqUpdate,
) -> Result<Mcq, ZygoteError> {
    let question = optional_required(update.question.as_deref(), "Question")?;
    let option_a = optional_required(update.option_a.as_deref(), "Option A")?;
    let option_b = optional_required(update.option_b.as_deref(), "Option B")?;
    let option_c = optional_required(update.option_c.as_deref(), "Option C")?;
    let option_d = optional_required(update.option_d.as_deref(), "Option D")?;
    if let Some(order) = update.display_order {
        non_negative(order, "Display order")?;
    }
    let details = serde_json::to_value(&update)?;

    let conn = db.connect()?;
    atomically(&conn, async {
        let changed = conn
            .execute(
                "UPDATE mcqs SET
                    question = COALESCE(?, question),
                    option_a = COALESCE(?, option_a),
                    option_b = COALESCE(?, option_b),
                    option_c = COALESCE(?, option_c),
                    option_d = COALESCE(?, option_d),
                    correct_answer = COALESCE(?, correct_answer),
                    explanation = COALESCE(?, explanation),
                    difficulty = COALESCE(?, difficulty),
                    display_order = COALESCE(?, display_order),
                    is_active = COALESCE(?, is_active),
                    updated_at = ?
                 WHERE id = ?",
                params![
                    question.as_deref(),
                    option_a.as_deref(),
                    option_b.as_deref(),
                    option_c.as_deref(),
                    option_d.as_deref(),
                    update.correct_answer.map(|a| a.as_str()),
                    update.explanation.as_deref(),
                    update.difficulty.map(|d| d.as_str()),
                    update.display_order,
                    update.is_active.map(i64::from),
                    now_timestamp(),
                    mcq_id
                ],
            )
            .await?;
        if changed == 0 {
            return Err(ZygoteError::not_found("MCQ"));
        }
        record_activity(
            &conn,
            ActivityEntry::new(Some(actor_id), "MCQ_UPDATED", "mcq")
                .entity(mcq_id)
                .details(details),
        )
        .await?;
        Ok(())
    })
    .await?;

    info!(%mcq_id, "MCQ updated");
    find_mcq(&conn, mcq_id)
        .await?
        .ok_or_else(|| ZygoteError::not_found("MCQ"))
}

pub async fn delete_mcq(db: &Database, actor_id: &str, mcq_id: &str) -> Result<(), ZygoteError> {
    let conn = db.connect()?;
    let mcq = find_mcq(&conn, mcq_id)
        .await?
        .ok_or_else(|| ZygoteError::not_found("MCQ"))?;

    atomically(&conn, async {
        conn.execute(
            "UPDATE mcqs SET is_active = 0, updated_at = ? WHERE id = ?",
            params![now_timestamp(), mcq_id],
        )
        .await?;
        record_activity(
            &conn,
            ActivityEntry::new(Some(actor_id), "MCQ_DELETED", "mcq")
                .entity(mcq_id)
                .details(json!({ "topicId": mcq.topic_id })),
        )
        .await?;
        Ok::<_, ZygoteError>(())
    })
    .await?;

    info!(%mcq_id, "MCQ deleted");
    Ok(())
}

/// Grades an answer and records a `quiz_attempted` event scored 100 or 0.
pub async fn submit_answer(
    db: &Database,
    user_id: &str,
    topic_id: &str,
    mcq_id: &str,
    submission: SubmitAnswer,
) -> Result<AnswerOutcome, ZygoteError> {
    let selected = AnswerOption::parse_letter(&submission.selected_answer)?;
    let time_spent = submission.time_spent.unwrap_or(0).max(0);

    let conn = db.connect()?;
    let mut rows = conn
        .query(
            &format!(
                "SELECT c.correct_answer FROM mcqs c
                 {TOPIC_CHAIN_JOIN}
                 WHERE c.id = ? AND c.topic_id = ? AND c.is_active = 1 AND {TOPIC_CHAIN_ACTIVE}"
            ),
            params![mcq_id, topic_id],
        )
        .await?;
    let row = rows
        .next()
        .await?
        .ok_or_else(|| ZygoteError::not_found("MCQ"))?;
    let correct_answer: AnswerOption = columns::text(&row, 0)?.parse()?;
    drop(rows);

    let is_correct = selected == correct_answer;
    let score = if is_correct { 100.0 } else { 0.0 };
    analytics::record_event(
        &conn,
        user_id,
        topic_id,
        ActivityType::QuizAttempted,
        time_spent,
        Some(score),
    )
    .await?;

    Ok(AnswerOutcome {
        is_correct,
        correct_answer,
    })
}
