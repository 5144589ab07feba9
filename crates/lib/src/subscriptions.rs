//! # Subscriptions
//!
//! A static plan catalogue and the per-user subscription rows. No payment is
//! captured: creating a subscription activates it immediately.

use crate::{
    errors::ZygoteError,
    types::{PlanType, SubscriptionStatus},
};
use chrono::{DateTime, Months, Utc};
use core_access::{
    ActivityEntry, atomically, columns, format_timestamp, now_timestamp, record_activity,
};
use serde::Serialize;
use serde_json::json;
use tracing::info;
use turso::{Connection, Database, Row, params};
use uuid::Uuid;

const SUBSCRIPTION_COLUMNS: &str = "id, user_id, stripe_customer_id, stripe_subscription_id, plan_type, status, start_date, end_date, auto_renew, created_at, updated_at";

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Plan {
    pub id: PlanType,
    pub name: &'static str,
    pub duration: u32,
    pub duration_unit: &'static str,
    pub price: u32,
    pub currency: &'static str,
    pub features: &'static [&'static str],
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub popular: bool,
}

pub static PLANS: [Plan; 3] = [
    Plan {
        id: PlanType::SixMonths,
        name: "6 Months Plan",
        duration: 6,
        duration_unit: "months",
        price: 2999,
        currency: "INR",
        features: &[
            "Access to all subjects",
            "Unlimited MCQs",
            "Notes & Summaries",
            "Mind Maps",
            "Progress tracking",
        ],
        popular: false,
    },
    Plan {
        id: PlanType::TwelveMonths,
        name: "12 Months Plan",
        duration: 12,
        duration_unit: "months",
        price: 4999,
        currency: "INR",
        features: &[
            "All 6-month features",
            "Priority support",
            "Early access to new content",
            "Downloadable PDFs",
        ],
        popular: true,
    },
    Plan {
        id: PlanType::TwentyFourMonths,
        name: "24 Months Plan",
        duration: 24,
        duration_unit: "months",
        price: 7999,
        currency: "INR",
        features: &[
            "All 12-month features",
            "Lifetime content updates",
            "Dedicated support",
            "Certificate of completion",
        ],
        popular: false,
    },
];

impl PlanType {
    pub fn months(&self) -> u32 {
        match self {
            PlanType::SixMonths => 6,
            PlanType::TwelveMonths => 12,
            PlanType::TwentyFourMonths => 24,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Subscription {
    pub id: String,
    pub user_id: String,
    pub stripe_customer_id: Option<String>,
    pub stripe_subscription_id: Option<String>,
    pub plan_type: PlanType,
    pub status: SubscriptionStatus,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub auto_renew: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<&Row> for Subscription {
    type Error = ZygoteError;

    fn try_from(row: &Row) -> Result<Self, Self::Error> {
        Ok(Subscription {
            id: columns::text(row, 0)?,
            user_id: columns::text(row, 1)?,
            stripe_customer_id: columns::optional_text(row, 2)?,
            stripe_subscription_id: columns::optional_text(row, 3)?,
            plan_type: columns::text(row, 4)?.parse()?,
            status: columns::text(row, 5)?.parse()?,
            start_date: columns::timestamp(row, 6)?,
            end_date: columns::timestamp(row, 7)?,
            auto_renew: columns::flag(row, 8)?,
            created_at: columns::timestamp(row, 9)?,
            updated_at: columns::timestamp(row, 10)?,
        })
    }
}

pub fn plans() -> &'static [Plan] {
    &PLANS
}

/// Parses a requested plan, answering with the catalogue's own message.
pub fn parse_plan(plan_type: &str) -> Result<PlanType, ZygoteError> {
    plan_type
        .parse()
        .map_err(|_| ZygoteError::Validation("Invalid plan type.".to_string()))
}

async fn find_current(conn: &Connection, user_id: &str) -> Result<Option<Subscription>, ZygoteError> {
    let mut rows = conn
        .query(
            &format!(
                "SELECT {SUBSCRIPTION_COLUMNS} FROM subscriptions
                 WHERE user_id = ? AND status = 'active' AND end_date > ?
                 ORDER BY end_date DESC
                 LIMIT 1"
            ),
            params![user_id, now_timestamp()],
        )
        .await?;
    match rows.next().await? {
        Some(row) => Ok(Some(Subscription::try_from(&row)?)),
        None => Ok(None),
    }
}

/// The active, unexpired subscription with the latest end date.
pub async fn current_subscription(
    db: &Database,
    user_id: &str,
) -> Result<Option<Subscription>, ZygoteError> {
    let conn = db.connect()?;
    find_current(&conn, user_id).await
}

pub async fn has_active_subscription(db: &Database, user_id: &str) -> Result<bool, ZygoteError> {
    Ok(current_subscription(db, user_id).await?.is_some())
}

pub async fn create_subscription(
    db: &Database,
    user_id: &str,
    plan_type: PlanType,
) -> Result<Subscription, ZygoteError> {
    let start = Utc::now();
    let end = start
        .checked_add_months(Months::new(plan_type.months()))
        .ok_or_else(|| ZygoteError::Validation("Subscription end date out of range.".to_string()))?;
    let subscription_id = Uuid::new_v4().to_string();

    let conn = db.connect()?;
    atomically(&conn, async {
        let now = format_timestamp(start);
        conn.execute(
            "INSERT INTO subscriptions (id, user_id, plan_type, status, start_date, end_date, auto_renew, created_at, updated_at)
             VALUES (?, ?, ?, 'active', ?, ?, 1, ?, ?)",
            params![
                subscription_id.clone(),
                user_id,
                plan_type.as_str(),
                now.clone(),
                format_timestamp(end),
                now.clone(),
                now
            ],
        )
        .await?;
        record_activity(
            &conn,
            ActivityEntry::new(Some(user_id), "SUBSCRIPTION_CREATED", "subscription")
                .entity(&subscription_id)
                .details(json!({ "planType": plan_type.as_str() })),
        )
        .await?;
        Ok::<_, ZygoteError>(())
    })
    .await?;

    info!(%user_id, plan = %plan_type, "Subscription created");
    find_subscription(&conn, &subscription_id).await
}

async fn find_subscription(
    conn: &Connection,
    subscription_id: &str,
) -> Result<Subscription, ZygoteError> {
    let mut rows = conn
        .query(
            &format!("SELECT {SUBSCRIPTION_COLUMNS} FROM subscriptions WHERE id = ?"),
            params![subscription_id],
        )
        .await?;
    match rows.next().await? {
        Some(row) => Subscription::try_from(&row),
        None => Err(ZygoteError::DataIntegrity(format!(
            "Subscription '{subscription_id}' vanished"
        ))),
    }
}

/// Cancels the most recently created active subscription only and returns it
/// in its cancelled state.
pub async fn cancel_subscription(
    db: &Database,
    user_id: &str,
) -> Result<Subscription, ZygoteError> {
    let conn = db.connect()?;
    let mut rows = conn
        .query(
            "SELECT id FROM subscriptions
             WHERE user_id = ? AND status = 'active'
             ORDER BY created_at DESC
             LIMIT 1",
            params![user_id],
        )
        .await?;
    let subscription_id = match rows.next().await? {
        Some(row) => columns::text(&row, 0)?,
        None => {
            return Err(ZygoteError::NotFound(
                "No active subscription found.".to_string(),
            ));
        }
    };
    drop(rows);

    atomically(&conn, async {
        conn.execute(
            "UPDATE subscriptions SET status = 'cancelled', auto_renew = 0, updated_at = ? WHERE id = ?",
            params![now_timestamp(), subscription_id.as_str()],
        )
        .await?;
        record_activity(
            &conn,
            ActivityEntry::new(Some(user_id), "SUBSCRIPTION_CANCELLED", "subscription")
                .entity(&subscription_id),
        )
        .await?;
        Ok::<_, ZygoteError>(())
    })
    .await?;

    info!(%user_id, %subscription_id, "Subscription cancelled");
    find_subscription(&conn, &subscription_id).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalogue_matches_plan_types() {
        assert_eq!(plans().len(), PlanType::ALL.len());
        for plan in plans() {
            assert_eq!(plan.duration, plan.id.months());
        }
        let popular: Vec<_> = plans().iter().filter(|p| p.popular).collect();
        assert_eq!(popular.len(), 1);
        assert_eq!(popular[0].id, PlanType::TwelveMonths);
    }

    #[test]
    fn unknown_plans_are_rejected() {
        assert_eq!(parse_plan("12_months").unwrap(), PlanType::TwelveMonths);
        let err = parse_plan("3_months").unwrap_err();
        assert_eq!(err.to_string(), "Invalid plan type.");
    }
}
