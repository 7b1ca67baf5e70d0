//! PostgreSQL storage implementations.
//!
//! This module provides persistent storage using PostgreSQL for:
//! - Family and group invitations
//! - Family and group memberships
//! - The family, group, user, child and vehicle read models

pub mod store;

// Re-exports
pub use store::{PgHandle, PostgresInvitationStore};
