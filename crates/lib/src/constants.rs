//! # Shared Constants
//!
//! Defaults shared by the library and the server.

/// The default path for the main application SQLite database.
pub const DEFAULT_DB_FILE: &str = "db/zygote.db";

/// MCQs returned per request when the caller does not ask for a limit.
pub const DEFAULT_MCQ_LIMIT: usize = 20;

/// Upper bound on MCQs returned per request.
pub const MAX_MCQ_LIMIT: usize = 100;

/// Version assigned to content bodies created without an explicit one.
pub const DEFAULT_CONTENT_VERSION: i64 = 1;
