//! # Authentication and Authorization
//!
//! `middleware` turns bearer tokens into live users; `gate` holds the route
//! policy check and the subscription gate for paid topics.

pub mod gate;
pub mod middleware;

pub use middleware::{AuthenticatedUser, MaybeUser};
