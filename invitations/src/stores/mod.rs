//! Storage implementations for the invitation system.
//!
//! - **PostgreSQL** - Persistent, transactional storage backed by the schema
//!   in `migrations/`
//!
//! The in-memory store used by tests lives in [`crate::mocks`].

#[cfg(feature = "postgres")]
pub mod postgres;

// Re-exports
#[cfg(feature = "postgres")]
pub use postgres::{PgHandle, PostgresInvitationStore};
