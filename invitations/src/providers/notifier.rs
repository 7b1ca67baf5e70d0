//! Notifier trait.

use crate::error::Result;
use carpool_core::{FamilyRole, GroupRole};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::future::Future;

/// Content of a family invitation email.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FamilyInvitationEmail {
    /// Name of the inviting family.
    pub family_name: String,
    /// Display name of the inviting admin.
    pub inviter_name: String,
    /// Code to enter or follow.
    pub invite_code: String,
    /// Role granted on acceptance.
    pub role: FamilyRole,
    /// Optional note from the inviter.
    pub personal_message: Option<String>,
    /// Acceptance deadline.
    pub expires_at: DateTime<Utc>,
    /// Link that opens the acceptance flow.
    pub accept_url: String,
}

/// Content of a group invitation email.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupInvitationEmail {
    /// Name of the inviting group.
    pub group_name: String,
    /// Display name of the inviting admin.
    pub inviter_name: String,
    /// Name of the invited family, when the invitation targets one.
    pub target_family_name: Option<String>,
    /// Code to enter or follow.
    pub invite_code: String,
    /// Group role granted to the accepting family.
    pub role: GroupRole,
    /// Optional note from the inviter.
    pub personal_message: Option<String>,
    /// Acceptance deadline.
    pub expires_at: DateTime<Utc>,
    /// Link that opens the acceptance flow.
    pub accept_url: String,
}

/// Outbound invitation delivery.
///
/// This trait abstracts over email delivery (SMTP, a transactional email
/// API, push). Delivery is best-effort: the service calls it after the
/// invitation is committed and only logs failures.
pub trait Notifier: Send + Sync + 'static {
    /// Send a family invitation email.
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - The address is rejected
    /// - The transport fails
    fn send_family_invitation(
        &self,
        to: &str,
        data: &FamilyInvitationEmail,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Send a group invitation email.
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - The address is rejected
    /// - The transport fails
    fn send_group_invitation(
        &self,
        to: &str,
        data: &GroupInvitationEmail,
    ) -> impl Future<Output = Result<()>> + Send;
}
