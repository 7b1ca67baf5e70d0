//! Invitation providers.
//!
//! This module defines traits for all external dependencies used by the
//! invitation service. These traits enable dependency injection and make
//! the invitation logic testable.
//!
//! # Architecture
//!
//! Providers are **interfaces**, not implementations. The service depends
//! on these traits, and the application provides concrete implementations:
//!
//! | Trait | Production | Development | Tests |
//! |-------|------------|-------------|-------|
//! | [`InvitationStore`] | `PostgresInvitationStore` | `PostgresInvitationStore` | `InMemoryInvitationStore` |
//! | [`Notifier`] | [`SmtpNotifier`] | [`ConsoleNotifier`] | `RecordingNotifier` |

pub mod console_notifier;
pub mod notifier;
pub mod smtp_notifier;
pub mod store;

// Re-export provider traits
pub use console_notifier::ConsoleNotifier;
pub use notifier::{FamilyInvitationEmail, GroupInvitationEmail, Notifier};
pub use smtp_notifier::SmtpNotifier;
pub use store::{InvitationStore, StoreOps, StoreTx};
