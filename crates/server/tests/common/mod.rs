//! # Common Test Utilities
//!
//! `TestApp` spawns the real router on a random port with a temporary
//! database and a recording OTP notifier, and offers helpers for the accounts
//! and content most tests need.

// Not every test file uses every helper.
#![allow(unused)]

use anyhow::Result;
use core_access::{Role, User, token::issue_access_token};
use reqwest::{Client, RequestBuilder, Response};
use serde_json::Value;
use std::{fs::File, io::Write, net::SocketAddr};
use tempfile::{NamedTempFile, TempDir, tempdir};
use tokio::{net::TcpListener, task::JoinHandle};
use zygote_server::{
    config, router,
    state::{AppState, build_app_state_with_notifier},
};
use zygote_test_utils::{RecordingNotifier, TEST_PASSWORD};

pub const DEFAULT_TEST_CONFIG: &str = r#"
jwt_secret: "test-access-secret"
refresh_token_secret: "test-refresh-secret"
rate_limit_max_requests: 1000
"#;

/// A harness for end-to-end testing of the Axum server.
pub struct TestApp {
    pub address: String,
    pub client: Client,
    pub app_state: AppState,
    pub notifier: RecordingNotifier,
    _db_file: NamedTempFile,
    _config_dir: TempDir,
    _server_handle: JoinHandle<()>,
    shutdown_tx: Option<tokio::sync::oneshot::Sender<()>>,
}

impl TestApp {
    pub async fn spawn() -> Result<Self> {
        Self::spawn_with_config(DEFAULT_TEST_CONFIG).await
    }

    /// Spawns the server with `extra_yaml` as the config file, plus the
    /// temporary database path.
    pub async fn spawn_with_config(extra_yaml: &str) -> Result<Self> {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .compact()
            .try_init();

        let db_file = NamedTempFile::new()?;
        let db_path = db_file.path().to_string_lossy().to_string();

        let config_dir = tempdir()?;
        let config_path = config_dir.path().join("config.yml");
        let config_content = format!("db_url: \"{db_path}\"\n{extra_yaml}");
        File::create(&config_path)?.write_all(config_content.as_bytes())?;

        let config = config::get_config(Some(&config_path.to_string_lossy()))?;
        let notifier = RecordingNotifier::new();
        let app_state = build_app_state_with_notifier(config, Box::new(notifier.clone())).await?;

        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr: SocketAddr = listener.local_addr()?;
        let address = format!("http://{addr}");

        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();
        let app = router::create_router(app_state.clone());
        let server_handle = tokio::spawn(async move {
            let server = axum::serve(
                listener,
                app.into_make_service_with_connect_info::<SocketAddr>(),
            )
            .with_graceful_shutdown(async {
                shutdown_rx.await.ok();
            });
            if let Err(e) = server.await {
                tracing::error!("[TestApp] Server error: {}", e);
            }
        });

        Ok(Self {
            address,
            client: Client::new(),
            app_state,
            notifier,
            _db_file: db_file,
            _config_dir: config_dir,
            _server_handle: server_handle,
            shutdown_tx: Some(shutdown_tx),
        })
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.address, path)
    }

    pub fn get(&self, path: &str) -> RequestBuilder {
        self.client.get(self.url(path))
    }

    pub fn post(&self, path: &str) -> RequestBuilder {
        self.client.post(self.url(path))
    }

    pub fn put(&self, path: &str) -> RequestBuilder {
        self.client.put(self.url(path))
    }

    pub fn delete(&self, path: &str) -> RequestBuilder {
        self.client.delete(self.url(path))
    }

    pub fn db(&self) -> &turso::Database {
        self.app_state.db()
    }

    /// Creates a verified account and returns it with a valid access token.
    pub async fn user_with_token(&self, email: &str, role: Role) -> Result<(User, String)> {
        let user = self
            .app_state
            .accounts
            .ensure_account(email, TEST_PASSWORD, "Test User", role)
            .await?;
        let token = issue_access_token(&user, self.app_state.accounts.token_config())?;
        Ok((user, token))
    }

    /// A Track → Subject → Topic chain created through the admin API.
    /// Nothing in it is free.
    pub async fn create_content_chain(&self, admin_token: &str) -> Result<ContentChainIds> {
        let track = self
            .post("/api/admin/tracks")
            .bearer_auth(admin_token)
            .json(&serde_json::json!({ "name": "First Year MBBS", "yearNumber": 1, "displayOrder": 1 }))
            .send()
            .await?;
        let track_id = data_id(track).await?;

        let subject = self
            .post("/api/admin/subjects")
            .bearer_auth(admin_token)
            .json(&serde_json::json!({
                "trackId": track_id,
                "name": "Anatomy",
                "colorCode": "#2563EB",
                "displayOrder": 1
            }))
            .send()
            .await?;
        let subject_id = data_id(subject).await?;

        let topic = self
            .post("/api/admin/topics")
            .bearer_auth(admin_token)
            .json(&serde_json::json!({
                "subjectId": subject_id,
                "title": "Cardiovascular System",
                "description": "Heart and great vessels",
                "displayOrder": 1
            }))
            .send()
            .await?;
        let topic_id = data_id(topic).await?;

        Ok(ContentChainIds {
            track_id,
            subject_id,
            topic_id,
        })
    }

    /// Runs a single-value `SELECT COUNT(*) ...` query.
    pub async fn count(&self, sql: &str) -> Result<i64> {
        let conn = self.db().connect()?;
        let mut rows = conn.query(sql, ()).await?;
        let row = rows
            .next()
            .await?
            .ok_or_else(|| anyhow::anyhow!("COUNT query returned no row"))?;
        Ok(core_access::columns::integer(&row, 0)?)
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

/// IDs of the chain created by [`TestApp::create_content_chain`].
#[derive(Debug, Clone)]
pub struct ContentChainIds {
    pub track_id: String,
    pub subject_id: String,
    pub topic_id: String,
}

/// Asserts a 201 and returns `data.id`.
async fn data_id(response: Response) -> Result<String> {
    let status = response.status();
    let body: Value = response.json().await?;
    anyhow::ensure!(status == 201, "expected 201, got {status}: {body}");
    body["data"]["id"]
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| anyhow::anyhow!("response has no data.id: {body}"))
}

/// Returns the status and JSON body of a response.
pub async fn status_and_body(response: Response) -> Result<(u16, Value)> {
    let status = response.status().as_u16();
    let body: Value = response.json().await?;
    Ok((status, body))
}
