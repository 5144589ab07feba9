use anyhow::Result;
use async_trait::async_trait;
use core_access::{
    AccountService, CoreAccessError, OtpNotifier, OtpPolicy, Role, TokenConfig, User,
};
use std::sync::{Arc, Mutex};
use turso::Database;
use zygote::content::{
    NewSubject, NewTopic, NewTrack, Subject, Topic, Track, subjects, topics, tracks,
};

// --- Test Setup ---

/// A helper struct to manage database creation for each test.
pub struct TestSetup {
    pub db: Database,
    pub notifier: RecordingNotifier,
    pub accounts: AccountService,
}

impl TestSetup {
    /// Creates a new, isolated in-memory database and initializes the schema.
    pub async fn new() -> Result<Self> {
        let db = turso::Builder::new_local(":memory:").build().await?;
        let conn = db.connect()?;

        let schema = zygote::providers::db::sqlite::sql::ALL_TABLE_CREATION_SQL
            .iter()
            .chain(zygote::providers::db::sqlite::sql::CREATE_INDEXES);
        for statement in schema {
            conn.execute(statement, ()).await?;
        }

        let notifier = RecordingNotifier::new();
        let accounts = AccountService::new(
            db.clone(),
            test_token_config(),
            OtpPolicy::default(),
            Box::new(notifier.clone()),
        );

        Ok(Self {
            db,
            notifier,
            accounts,
        })
    }

    /// Creates a verified, active account with [`TEST_PASSWORD`].
    pub async fn create_user(&self, email: &str, role: Role) -> Result<User> {
        let user = self
            .accounts
            .ensure_account(email, TEST_PASSWORD, "Test User", role)
            .await?;
        Ok(user)
    }

    /// Creates an active Track → Subject → Topic chain authored by `actor_id`.
    /// Nothing in it is free.
    pub async fn create_content_chain(&self, actor_id: &str) -> Result<ContentChain> {
        let track = tracks::create_track(
            &self.db,
            actor_id,
            NewTrack {
                name: "First Year MBBS".to_string(),
                description: None,
                year_number: 1,
                display_order: 1,
            },
        )
        .await?;
        let subject = subjects::create_subject(
            &self.db,
            actor_id,
            NewSubject {
                track_id: track.id.clone(),
                name: "Anatomy".to_string(),
                description: None,
                icon_url: None,
                color_code: Some("#2563EB".to_string()),
                display_order: 1,
                is_free_trial: false,
            },
        )
        .await?;
        let topic = topics::create_topic(
            &self.db,
            actor_id,
            NewTopic {
                subject_id: subject.id.clone(),
                title: "Cardiovascular System".to_string(),
                description: Some("Heart and great vessels".to_string()),
                display_order: 1,
                is_free_sample: false,
            },
        )
        .await?;
        Ok(ContentChain {
            track,
            subject,
            topic,
        })
    }

    /// Runs a single-value `SELECT COUNT(*) ...` query.
    pub async fn count(&self, sql: &str) -> Result<i64> {
        let conn = self.db.connect()?;
        let mut rows = conn.query(sql, ()).await?;
        let row = rows
            .next()
            .await?
            .ok_or_else(|| anyhow::anyhow!("COUNT query returned no row"))?;
        Ok(core_access::columns::integer(&row, 0)?)
    }
}

/// The three levels created by [`TestSetup::create_content_chain`].
#[derive(Debug, Clone)]
pub struct ContentChain {
    pub track: Track,
    pub subject: Subject,
    pub topic: Topic,
}

/// Satisfies the password policy.
pub const TEST_PASSWORD: &str = "Passw0rd!";

/// Token settings used by every test harness.
pub fn test_token_config() -> TokenConfig {
    TokenConfig {
        access_secret: "test-access-secret".to_string(),
        access_ttl_secs: 3600,
        refresh_secret: "test-refresh-secret".to_string(),
        refresh_ttl_secs: 86_400,
    }
}

// --- Recording Notifier ---

/// Captures every OTP instead of delivering it.
#[derive(Clone, Debug, Default)]
pub struct RecordingNotifier {
    sent: Arc<Mutex<Vec<(String, String)>>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// All `(email, code)` pairs sent so far, oldest first.
    pub fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().unwrap().clone()
    }

    /// The most recent code sent to `email`.
    pub fn last_code_for(&self, email: &str) -> Option<String> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|(to, _)| to.eq_ignore_ascii_case(email))
            .map(|(_, code)| code.clone())
    }
}

#[async_trait]
impl OtpNotifier for RecordingNotifier {
    async fn send_otp(&self, email: &str, code: &str) -> Result<(), CoreAccessError> {
        self.sent
            .lock()
            .unwrap()
            .push((email.to_string(), code.to_string()));
        Ok(())
    }
}
