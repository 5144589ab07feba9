//! # Zygote
//!
//! The learning platform's domain layer: the content hierarchy
//! (Track → Subject → Topic → notes, summary, mind map, MCQs), learner state,
//! subscriptions and the demo seed, all persisted through a local turso
//! database. Identity and sessions live in `core-access`.

pub mod constants;
pub mod content;
pub mod errors;
pub mod learner;
pub mod providers;
pub mod seed;
pub mod subscriptions;
pub mod types;

pub use errors::ZygoteError;
pub use providers::db::sqlite::SqliteProvider;
pub use seed::{SeedReport, seed_demo_content};
pub use subscriptions::{Plan, Subscription};
