//! # Learner State
//!
//! Per-user data owned by the learning app: display preferences, topic
//! bookmarks and the append-only analytics stream with its aggregate view.

pub mod analytics;
pub mod bookmarks;
pub mod preferences;

pub use analytics::UserAnalytics;
pub use bookmarks::BookmarkedTopic;
pub use preferences::{PreferencesUpdate, UserPreferences};
