//! The invitation service.
//!
//! [`InvitationService`] is the single entry point the API layer calls. Each
//! operation lives in its own file:
//!
//! | File | Operations |
//! |------|------------|
//! | `create.rs` | `create_family_invitation`, `create_group_invitation` |
//! | `validate.rs` | `validate_family_invitation`, `validate_group_invitation` |
//! | `accept.rs` | `accept_family_invitation`, `accept_group_invitation` |
//! | `cancel.rs` | `cancel_family_invitation`, `cancel_group_invitation` |
//! | `list.rs` | `list_user_invitations`, `list_family_invitations`, `list_group_invitations` |
//! | `sweep.rs` | `cleanup_expired_invitations` |
//!
//! # Transactions
//!
//! Creation, acceptance, cancellation and sweeping each run in one store
//! transaction. Business failures return early and the dropped transaction
//! rolls back. Emails are handed to the [`NotificationDispatcher`] only after
//! the commit succeeded.
//!
//! # Error policy
//!
//! Creation, cancellation and listing return [`InvitationError`]s.
//! Acceptance returns an [`AcceptanceOutcome`] for business failures and an
//! error only for infrastructure failures. Validation never fails: store
//! errors become [`ValidationErrorCode::TemporaryError`].

mod accept;
mod cancel;
mod create;
mod list;
mod sweep;
mod types;
mod validate;

pub use types::{
    AcceptanceFailure, AcceptanceOutcome, CreateFamilyInvitation, CreateGroupInvitation,
    FamilyDetails, FamilyInvitationPreview, FamilyMemberView, GroupAcceptance,
    GroupInvitationPreview, SweepReport, UserInvitations, ValidationErrorCode, ValidationOutcome,
};

use crate::code::generate_invite_code_with_length;
use crate::config::InvitationConfig;
use crate::constants::{MAX_PERSONAL_MESSAGE_CHARS, messages};
use crate::error::{InvitationError, Result};
use crate::notify::NotificationDispatcher;
use crate::providers::{InvitationStore, Notifier, StoreOps};
use crate::utils::{is_valid_email, normalize_email};
use carpool_core::environment::{Clock, SystemClock};
use carpool_core::{FamilyId, FamilyRole, User, UserId};
use tracing::{error, warn};

/// Shown when an inviter's account can no longer be resolved.
const UNKNOWN_INVITER: &str = "A carpool member";

/// Family and group invitation workflows over a store and a notifier.
///
/// # Examples
///
/// ```ignore
/// let service = InvitationService::new(
///     PostgresInvitationStore::from_pool(pool),
///     SmtpNotifier::new(/* ... */),
///     SystemClock,
///     InvitationConfig::from_env()?,
/// );
///
/// let invitation = service
///     .create_family_invitation(
///         CreateFamilyInvitation::new(family_id, admin_id, FamilyRole::Member)
///             .with_email("grandma@example.com"),
///     )
///     .await?;
/// ```
pub struct InvitationService<S, N, C = SystemClock>
where
    S: InvitationStore,
    N: Notifier,
    C: Clock,
{
    store: S,
    dispatcher: NotificationDispatcher<N>,
    clock: C,
    config: InvitationConfig,
}

impl<S, N, C> InvitationService<S, N, C>
where
    S: InvitationStore,
    N: Notifier,
    C: Clock,
{
    /// Create a service.
    #[must_use]
    pub fn new(store: S, notifier: N, clock: C, config: InvitationConfig) -> Self {
        let dispatcher = NotificationDispatcher::new(notifier, config.notification_retry.clone());
        Self {
            store,
            dispatcher,
            clock,
            config,
        }
    }

    /// The underlying store.
    #[must_use]
    pub const fn store(&self) -> &S {
        &self.store
    }

    /// Active configuration.
    #[must_use]
    pub const fn config(&self) -> &InvitationConfig {
        &self.config
    }

    /// The notifier emails are delivered through.
    #[must_use]
    pub fn notifier(&self) -> &N {
        self.dispatcher.notifier()
    }

    /// Generate a code not used by any invitation of either kind.
    ///
    /// The store's unique index is the final arbiter; this loop only keeps
    /// collisions from surfacing as conflicts in the common case.
    async fn generate_unique_code<T: StoreOps>(&self, ops: &mut T) -> Result<String> {
        for attempt in 1..=self.config.max_code_attempts {
            let code = generate_invite_code_with_length(self.config.code_length);
            if !ops.invite_code_exists(&code).await? {
                return Ok(code);
            }
            warn!(attempt, "Invite code collision, regenerating");
        }

        error!(
            attempts = self.config.max_code_attempts,
            "Exhausted invite code generation attempts"
        );
        Err(InvitationError::infrastructure(
            messages::CODE_GENERATION_EXHAUSTED,
        ))
    }
}

/// Normalize and format-check an optional addressee.
fn normalize_optional_email(email: Option<String>) -> Result<Option<String>> {
    match email.as_deref().map(normalize_email) {
        None => Ok(None),
        Some(normalized) if normalized.is_empty() => Ok(None),
        Some(normalized) if is_valid_email(&normalized) => Ok(Some(normalized)),
        Some(_) => Err(InvitationError::validation(messages::INVALID_EMAIL)),
    }
}

/// Trim a personal message; blank becomes `None`.
fn normalize_message(message: Option<String>) -> Result<Option<String>> {
    let Some(message) = message else {
        return Ok(None);
    };
    let trimmed = message.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    if trimmed.chars().count() > MAX_PERSONAL_MESSAGE_CHARS {
        return Err(InvitationError::validation(messages::MESSAGE_TOO_LONG));
    }
    Ok(Some(trimmed.to_string()))
}

fn display_name(user: Option<&User>) -> String {
    user.map_or_else(|| UNKNOWN_INVITER.to_string(), |u| u.name.clone())
}

/// Email addresses of every `ADMIN` of a family.
async fn family_admin_emails<T: StoreOps>(ops: &mut T, family_id: FamilyId) -> Result<Vec<String>> {
    let mut emails = Vec::new();
    for member in ops.list_family_members(family_id).await? {
        if member.role != FamilyRole::Admin {
            continue;
        }
        if let Some(user) = ops.get_user(member.user_id).await? {
            emails.push(user.email);
        }
    }
    Ok(emails)
}

/// Display name of the first `ADMIN` of a family, if any.
async fn first_admin_name<T: StoreOps>(ops: &mut T, family_id: FamilyId) -> Result<Option<String>> {
    for member in ops.list_family_members(family_id).await? {
        if member.role == FamilyRole::Admin {
            if let Some(user) = ops.get_user(member.user_id).await? {
                return Ok(Some(user.name));
            }
        }
    }
    Ok(None)
}

/// Resolve a caller, treating an unknown account as not found.
async fn require_user<T: StoreOps>(ops: &mut T, user_id: UserId) -> Result<User> {
    ops.get_user(user_id)
        .await?
        .ok_or_else(|| InvitationError::not_found(messages::USER_NOT_FOUND))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn email_is_normalized_and_checked() {
        assert_eq!(
            normalize_optional_email(Some("  Pat@Example.COM ".to_string())).unwrap(),
            Some("pat@example.com".to_string())
        );
        assert_eq!(normalize_optional_email(Some("   ".to_string())).unwrap(), None);
        assert!(matches!(
            normalize_optional_email(Some("nope".to_string())),
            Err(InvitationError::Validation(_))
        ));
    }

    #[test]
    fn message_is_trimmed_and_bounded() {
        assert_eq!(
            normalize_message(Some("  see you Monday ".to_string())).unwrap(),
            Some("see you Monday".to_string())
        );
        assert_eq!(normalize_message(Some(String::new())).unwrap(), None);
        let long = "x".repeat(MAX_PERSONAL_MESSAGE_CHARS + 1);
        assert!(normalize_message(Some(long)).is_err());
    }
}
