//! In-memory provider implementations for tests.
//!
//! [`InMemoryInvitationStore`] honours the same transaction and uniqueness
//! contract as the Postgres store, and [`RecordingNotifier`] captures every
//! delivered email.

pub mod notifier;
pub mod store;

pub use notifier::RecordingNotifier;
pub use store::{InMemoryInvitationStore, MemoryHandle};
