//! # SQLite Schema
//!
//! Every table the platform uses, in dependency order. All statements are
//! idempotent. Enumerated columns are validated in Rust before they reach the
//! database; timestamps are UTC text written by the application.

pub const CREATE_USERS_TABLE: &str = "
    CREATE TABLE IF NOT EXISTS users (
        id TEXT PRIMARY KEY,
        email TEXT NOT NULL UNIQUE,
        password_hash TEXT NOT NULL,
        full_name TEXT NOT NULL,
        role TEXT NOT NULL DEFAULT 'student',
        is_verified INTEGER NOT NULL DEFAULT 0,
        is_active INTEGER NOT NULL DEFAULT 1,
        google_id TEXT,
        profile_picture TEXT,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL,
        last_login TEXT
    );
";

pub const CREATE_OTP_VERIFICATIONS_TABLE: &str = "
    CREATE TABLE IF NOT EXISTS otp_verifications (
        id TEXT PRIMARY KEY,
        user_id TEXT NOT NULL,
        email TEXT NOT NULL,
        otp_code TEXT NOT NULL,
        expires_at TEXT NOT NULL,
        is_used INTEGER NOT NULL DEFAULT 0,
        created_at TEXT NOT NULL,
        FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
    );
";

pub const CREATE_REFRESH_TOKENS_TABLE: &str = "
    CREATE TABLE IF NOT EXISTS refresh_tokens (
        id TEXT PRIMARY KEY,
        user_id TEXT NOT NULL,
        token TEXT NOT NULL,
        expires_at TEXT NOT NULL,
        created_at TEXT NOT NULL,
        FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
    );
";

pub const CREATE_TRACKS_TABLE: &str = "
    CREATE TABLE IF NOT EXISTS tracks (
        id TEXT PRIMARY KEY,
        name TEXT NOT NULL,
        description TEXT,
        year_number INTEGER NOT NULL,
        display_order INTEGER NOT NULL,
        is_active INTEGER NOT NULL DEFAULT 1,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL,
        created_by TEXT,
        FOREIGN KEY (created_by) REFERENCES users(id)
    );
";

pub const CREATE_SUBJECTS_TABLE: &str = "
    CREATE TABLE IF NOT EXISTS subjects (
        id TEXT PRIMARY KEY,
        track_id TEXT NOT NULL,
        name TEXT NOT NULL,
        description TEXT,
        icon_url TEXT,
        color_code TEXT,
        display_order INTEGER NOT NULL,
        is_free_trial INTEGER NOT NULL DEFAULT 0,
        is_active INTEGER NOT NULL DEFAULT 1,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL,
        created_by TEXT,
        FOREIGN KEY (track_id) REFERENCES tracks(id) ON DELETE CASCADE,
        FOREIGN KEY (created_by) REFERENCES users(id)
    );
";

pub const CREATE_TOPICS_TABLE: &str = "
    CREATE TABLE IF NOT EXISTS topics (
        id TEXT PRIMARY KEY,
        subject_id TEXT NOT NULL,
        title TEXT NOT NULL,
        description TEXT,
        display_order INTEGER NOT NULL,
        is_free_sample INTEGER NOT NULL DEFAULT 0,
        is_active INTEGER NOT NULL DEFAULT 1,
        completion_percentage INTEGER NOT NULL DEFAULT 0,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL,
        created_by TEXT,
        last_edited_by TEXT,
        version INTEGER NOT NULL DEFAULT 1,
        FOREIGN KEY (subject_id) REFERENCES subjects(id) ON DELETE CASCADE,
        FOREIGN KEY (created_by) REFERENCES users(id),
        FOREIGN KEY (last_edited_by) REFERENCES users(id)
    );
";

pub const CREATE_NOTES_TABLE: &str = "
    CREATE TABLE IF NOT EXISTS notes (
        id TEXT PRIMARY KEY,
        topic_id TEXT NOT NULL,
        content TEXT NOT NULL,
        content_type TEXT NOT NULL DEFAULT 'markdown',
        pdf_url TEXT,
        version INTEGER NOT NULL DEFAULT 1,
        is_active INTEGER NOT NULL DEFAULT 1,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL,
        created_by TEXT,
        FOREIGN KEY (topic_id) REFERENCES topics(id) ON DELETE CASCADE,
        FOREIGN KEY (created_by) REFERENCES users(id)
    );
";

pub const CREATE_SUMMARIES_TABLE: &str = "
    CREATE TABLE IF NOT EXISTS summaries (
        id TEXT PRIMARY KEY,
        topic_id TEXT NOT NULL,
        content TEXT NOT NULL,
        content_type TEXT NOT NULL DEFAULT 'markdown',
        pdf_url TEXT,
        version INTEGER NOT NULL DEFAULT 1,
        is_active INTEGER NOT NULL DEFAULT 1,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL,
        created_by TEXT,
        FOREIGN KEY (topic_id) REFERENCES topics(id) ON DELETE CASCADE,
        FOREIGN KEY (created_by) REFERENCES users(id)
    );
";

pub const CREATE_MIND_MAPS_TABLE: &str = "
    CREATE TABLE IF NOT EXISTS mind_maps (
        id TEXT PRIMARY KEY,
        topic_id TEXT NOT NULL,
        image_url TEXT NOT NULL,
        image_type TEXT NOT NULL DEFAULT 'png',
        thumbnail_url TEXT,
        version INTEGER NOT NULL DEFAULT 1,
        is_active INTEGER NOT NULL DEFAULT 1,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL,
        created_by TEXT,
        FOREIGN KEY (topic_id) REFERENCES topics(id) ON DELETE CASCADE,
        FOREIGN KEY (created_by) REFERENCES users(id)
    );
";

pub const CREATE_MCQS_TABLE: &str = "
    CREATE TABLE IF NOT EXISTS mcqs (
        id TEXT PRIMARY KEY,
        topic_id TEXT NOT NULL,
        question TEXT NOT NULL,
        option_a TEXT NOT NULL,
        option_b TEXT NOT NULL,
        option_c TEXT NOT NULL,
        option_d TEXT NOT NULL,
        correct_answer TEXT NOT NULL,
        explanation TEXT,
        difficulty TEXT NOT NULL DEFAULT 'moderate',
        display_order INTEGER,
        is_active INTEGER NOT NULL DEFAULT 1,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL,
        created_by TEXT,
        FOREIGN KEY (topic_id) REFERENCES topics(id) ON DELETE CASCADE,
        FOREIGN KEY (created_by) REFERENCES users(id)
    );
";

pub const CREATE_BOOKMARKS_TABLE: &str = "
    CREATE TABLE IF NOT EXISTS bookmarks (
        id TEXT PRIMARY KEY,
        user_id TEXT NOT NULL,
        topic_id TEXT NOT NULL,
        created_at TEXT NOT NULL,
        UNIQUE (user_id, topic_id),
        FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE,
        FOREIGN KEY (topic_id) REFERENCES topics(id) ON DELETE CASCADE
    );
";

pub const CREATE_USER_PREFERENCES_TABLE: &str = "
    CREATE TABLE IF NOT EXISTS user_preferences (
        id TEXT PRIMARY KEY,
        user_id TEXT NOT NULL UNIQUE,
        theme TEXT NOT NULL DEFAULT 'light',
        font_size TEXT NOT NULL DEFAULT 'medium',
        notifications_enabled INTEGER NOT NULL DEFAULT 1,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL,
        FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
    );
";

pub const CREATE_ANALYTICS_TABLE: &str = "
    CREATE TABLE IF NOT EXISTS analytics (
        id TEXT PRIMARY KEY,
        user_id TEXT NOT NULL,
        topic_id TEXT NOT NULL,
        activity_type TEXT NOT NULL,
        time_spent_seconds INTEGER NOT NULL DEFAULT 0,
        quiz_score_percentage REAL,
        created_at TEXT NOT NULL,
        FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE,
        FOREIGN KEY (topic_id) REFERENCES topics(id) ON DELETE CASCADE
    );
";

pub const CREATE_ACTIVITY_LOGS_TABLE: &str = "
    CREATE TABLE IF NOT EXISTS activity_logs (
        id TEXT PRIMARY KEY,
        user_id TEXT,
        action TEXT NOT NULL,
        entity_type TEXT,
        entity_id TEXT,
        details TEXT,
        ip_address TEXT,
        user_agent TEXT,
        created_at TEXT NOT NULL,
        FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE SET NULL
    );
";

pub const CREATE_SUBSCRIPTIONS_TABLE: &str = "
    CREATE TABLE IF NOT EXISTS subscriptions (
        id TEXT PRIMARY KEY,
        user_id TEXT NOT NULL,
        stripe_customer_id TEXT,
        stripe_subscription_id TEXT,
        plan_type TEXT NOT NULL,
        status TEXT NOT NULL DEFAULT 'active',
        start_date TEXT NOT NULL,
        end_date TEXT NOT NULL,
        auto_renew INTEGER NOT NULL DEFAULT 1,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL,
        FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
    );
";

pub const CREATE_INDEXES: &[&str] = &[
    "CREATE INDEX IF NOT EXISTS idx_users_role ON users(role);",
    "CREATE INDEX IF NOT EXISTS idx_otp_email ON otp_verifications(email);",
    "CREATE INDEX IF NOT EXISTS idx_refresh_tokens_token ON refresh_tokens(token);",
    "CREATE INDEX IF NOT EXISTS idx_subjects_track ON subjects(track_id);",
    "CREATE INDEX IF NOT EXISTS idx_topics_subject ON topics(subject_id);",
    "CREATE INDEX IF NOT EXISTS idx_notes_topic ON notes(topic_id);",
    "CREATE INDEX IF NOT EXISTS idx_summaries_topic ON summaries(topic_id);",
    "CREATE INDEX IF NOT EXISTS idx_mind_maps_topic ON mind_maps(topic_id);",
    "CREATE INDEX IF NOT EXISTS idx_mcqs_topic ON mcqs(topic_id);",
    "CREATE INDEX IF NOT EXISTS idx_bookmarks_user ON bookmarks(user_id);",
    "CREATE INDEX IF NOT EXISTS idx_analytics_user ON analytics(user_id);",
    "CREATE INDEX IF NOT EXISTS idx_subscriptions_user ON subscriptions(user_id);",
    "CREATE INDEX IF NOT EXISTS idx_activity_logs_user ON activity_logs(user_id);",
];

/// Every table in creation order. Indexes follow in [`CREATE_INDEXES`].
pub const ALL_TABLE_CREATION_SQL: &[&str] = &[
    CREATE_USERS_TABLE,
    CREATE_OTP_VERIFICATIONS_TABLE,
    CREATE_REFRESH_TOKENS_TABLE,
    CREATE_TRACKS_TABLE,
    CREATE_SUBJECTS_TABLE,
    CREATE_TOPICS_TABLE,
    CREATE_NOTES_TABLE,
    CREATE_SUMMARIES_TABLE,
    CREATE_MIND_MAPS_TABLE,
    CREATE_MCQS_TABLE,
    CREATE_BOOKMARKS_TABLE,
    CREATE_USER_PREFERENCES_TABLE,
    CREATE_ANALYTICS_TABLE,
    CREATE_ACTIVITY_LOGS_TABLE,
    CREATE_SUBSCRIPTIONS_TABLE,
];
