//! # Carpool Invitations
//!
//! Family and carpool-group invitations behind one service.
//!
//! ## Features
//!
//! - **Two kinds, one lifecycle**: family and group invitations share code
//!   generation, expiry and the `PENDING → ACCEPTED | EXPIRED | CANCELLED`
//!   state machine
//! - **Race-free**: terminal transitions are conditional and duplicates are
//!   rejected by unique indexes, so concurrent accepts cannot both win
//! - **Post-commit email**: notifications are dispatched after the
//!   transaction commits, with retries, and never affect the outcome
//! - **Testable**: the in-memory store and recording notifier run the full
//!   workflows at memory speed
//!
//! ## Architecture
//!
//! ```text
//! caller → InvitationService → StoreTx (begin … commit)
//!                            ↘ NotificationDispatcher → Notifier
//! ```
//!
//! ## Example: invite a grandparent
//!
//! ```rust,ignore
//! use carpool_invitations::*;
//!
//! let invitation = service
//!     .create_family_invitation(
//!         CreateFamilyInvitation::new(family_id, admin_id, FamilyRole::Member)
//!             .with_email("grandma@example.com"),
//!     )
//!     .await?;
//!
//! // Later, signed in as grandma:
//! let outcome = service
//!     .accept_family_invitation(&invitation.invite_code, grandma_id, false)
//!     .await?;
//! assert!(outcome.success);
//! ```

#![deny(missing_docs)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![deny(clippy::todo)]
#![deny(clippy::unimplemented)]

// Public modules
pub mod authz;
pub mod code;
pub mod config;
pub mod constants;
pub mod error;
pub mod notify;
pub mod providers;
pub mod service;
pub mod stores;
pub mod utils;

#[cfg(any(test, feature = "test-utils"))]
pub mod mocks;

// Re-export main types for convenience
pub use code::generate_invite_code;
pub use config::{ConfigError, InvitationConfig, SweeperConfig};
pub use error::{ErrorKind, InvitationError, Result};
pub use service::{
    AcceptanceFailure, AcceptanceOutcome, CreateFamilyInvitation, CreateGroupInvitation,
    FamilyDetails, FamilyInvitationPreview, FamilyMemberView, GroupAcceptance,
    GroupInvitationPreview, InvitationService, SweepReport, UserInvitations, ValidationErrorCode,
    ValidationOutcome,
};
