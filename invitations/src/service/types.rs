//! Inputs and outcomes of the invitation service.

use crate::constants::messages;
use carpool_core::{
    Child, Family, FamilyId, FamilyInvitation, FamilyRole, GroupId, GroupInvitation, GroupRole,
    UserId, Vehicle,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ═══════════════════════════════════════════════════════════════════════════
// Creation requests
// ═══════════════════════════════════════════════════════════════════════════

/// Request to invite someone into a family.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateFamilyInvitation {
    /// Family to join.
    pub family_id: FamilyId,
    /// Issuing user (must be a family admin).
    pub invited_by: UserId,
    /// Addressee. `None` creates a public link.
    pub email: Option<String>,
    /// Role granted on acceptance.
    pub role: FamilyRole,
    /// Optional note shown to the invitee.
    pub personal_message: Option<String>,
}

impl CreateFamilyInvitation {
    /// Public link granting `role`.
    #[must_use]
    pub const fn new(family_id: FamilyId, invited_by: UserId, role: FamilyRole) -> Self {
        Self {
            family_id,
            invited_by,
            email: None,
            role,
            personal_message: None,
        }
    }

    /// Bind the invitation to an email address.
    #[must_use]
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    /// Attach a personal message.
    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.personal_message = Some(message.into());
        self
    }
}

/// Request to invite a family into a carpool group.
///
/// At least one of `target_family_id` and `email` must be set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateGroupInvitation {
    /// Group to join.
    pub group_id: GroupId,
    /// Issuing user (must hold group-admin permission).
    pub created_by: UserId,
    /// Family being invited.
    pub target_family_id: Option<FamilyId>,
    /// Addressee when no family is known.
    pub email: Option<String>,
    /// Group role granted to the family. Defaults to `MEMBER`.
    #[serde(default)]
    pub role: GroupRole,
    /// Optional note shown to the invitee.
    pub personal_message: Option<String>,
}

impl CreateGroupInvitation {
    /// Invitation targeting an existing family.
    #[must_use]
    pub fn for_family(group_id: GroupId, created_by: UserId, family_id: FamilyId) -> Self {
        Self {
            group_id,
            created_by,
            target_family_id: Some(family_id),
            email: None,
            role: GroupRole::default(),
            personal_message: None,
        }
    }

    /// Invitation addressed to an email.
    #[must_use]
    pub fn for_email(group_id: GroupId, created_by: UserId, email: impl Into<String>) -> Self {
        Self {
            group_id,
            created_by,
            target_family_id: None,
            email: Some(email.into()),
            role: GroupRole::default(),
            personal_message: None,
        }
    }

    /// Grant a different group role.
    #[must_use]
    pub const fn with_role(mut self, role: GroupRole) -> Self {
        self.role = role;
        self
    }

    /// Attach a personal message.
    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.personal_message = Some(message.into());
        self
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Validation
// ═══════════════════════════════════════════════════════════════════════════

/// Why a code failed validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ValidationErrorCode {
    /// Unknown or no longer pending.
    InvalidCode,
    /// Past its deadline.
    Expired,
    /// Bound to another account.
    EmailMismatch,
    /// Addressed to another family.
    WrongFamily,
    /// Lookup failed; safe to retry.
    TemporaryError,
}

impl ValidationErrorCode {
    /// User-facing message for this code.
    #[must_use]
    pub const fn message(&self) -> &'static str {
        match self {
            Self::InvalidCode => messages::INVALID_CODE,
            Self::Expired => messages::EXPIRED,
            Self::EmailMismatch => messages::EMAIL_MISMATCH_VALIDATION,
            Self::WrongFamily => messages::WRONG_FAMILY,
            Self::TemporaryError => messages::TEMPORARY_VALIDATION_ERROR,
        }
    }
}

/// Result of validating a code without consuming it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationOutcome<P> {
    /// Whether the code can be accepted by the caller.
    pub valid: bool,
    /// User-facing error message.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Machine-readable error.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<ValidationErrorCode>,
    /// Invitation preview on success.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invitation: Option<P>,
}

impl<P> ValidationOutcome<P> {
    /// Successful validation.
    pub const fn valid(preview: P) -> Self {
        Self {
            valid: true,
            error: None,
            error_code: None,
            invitation: Some(preview),
        }
    }

    /// Failed validation.
    #[must_use]
    pub fn invalid(code: ValidationErrorCode) -> Self {
        Self {
            valid: false,
            error: Some(code.message().to_string()),
            error_code: Some(code),
            invitation: None,
        }
    }
}

/// What an invitee sees before accepting a family invitation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FamilyInvitationPreview {
    /// Family being joined.
    pub family_id: FamilyId,
    /// Family display name.
    pub family_name: String,
    /// Role granted on acceptance.
    pub role: FamilyRole,
    /// Display name of the issuing admin.
    pub inviter_name: String,
    /// Acceptance deadline.
    pub expires_at: DateTime<Utc>,
    /// Addressee; absent for public links.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Absent when the inviter left no message.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub personal_message: Option<String>,
}

/// What an invitee sees before accepting a group invitation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupInvitationPreview {
    /// Group being joined.
    pub group_id: GroupId,
    /// Group display name.
    pub group_name: String,
    /// Group role granted to the family.
    pub role: GroupRole,
    /// Display name of the issuing admin.
    pub inviter_name: String,
    /// Acceptance deadline.
    pub expires_at: DateTime<Utc>,
    /// Targeted family, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_family_id: Option<FamilyId>,
    /// Targeted family's name, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_family_name: Option<String>,
    /// Addressee, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Absent when the inviter left no message.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub personal_message: Option<String>,
}

// ═══════════════════════════════════════════════════════════════════════════
// Acceptance
// ═══════════════════════════════════════════════════════════════════════════

/// Expected reasons an acceptance does not go through.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "code", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AcceptanceFailure {
    /// Unknown, expired, cancelled or already used.
    InvalidCode,
    /// Invitation is bound to another email.
    EmailMismatch,
    /// Caller belongs to another family and did not opt to leave it.
    #[serde(rename_all = "camelCase")]
    AlreadyInFamily {
        /// Caller's current family.
        family_name: String,
    },
    /// Leaving would strand the caller's family without an admin.
    #[serde(rename_all = "camelCase")]
    SoleAdmin {
        /// Caller's current family.
        family_name: String,
    },
    /// Caller has no family yet.
    FamilyOnboardingRequired,
    /// Caller is not an admin of their family.
    #[serde(rename_all = "camelCase")]
    AdminActionRequired {
        /// Name of an admin the caller can ask.
        admin_name: String,
    },
    /// Group invitation targets another family.
    WrongFamily,
    /// Caller's family is already in the group.
    #[serde(rename_all = "camelCase")]
    AlreadyMember {
        /// Group display name.
        group_name: String,
    },
}

impl AcceptanceFailure {
    /// User-facing message.
    #[must_use]
    pub fn message(&self) -> String {
        match self {
            Self::InvalidCode => messages::INVALID_CODE.to_string(),
            Self::EmailMismatch => messages::EMAIL_MISMATCH.to_string(),
            Self::AlreadyInFamily { family_name } => messages::already_in_family(family_name),
            Self::SoleAdmin { family_name } => messages::sole_admin(family_name),
            Self::FamilyOnboardingRequired => messages::FAMILY_ONBOARDING_REQUIRED.to_string(),
            Self::AdminActionRequired { admin_name } => {
                messages::admin_action_required(admin_name)
            }
            Self::WrongFamily => messages::WRONG_FAMILY.to_string(),
            Self::AlreadyMember { group_name } => messages::family_already_in_group(group_name),
        }
    }
}

#[allow(clippy::trivially_copy_pass_by_ref)]
const fn is_false(value: &bool) -> bool {
    !*value
}

/// Result of an acceptance attempt.
///
/// Business failures are values of this type, with typed flags the caller
/// can branch on. Only infrastructure failures are returned as errors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
#[allow(clippy::struct_excessive_bools)]
pub struct AcceptanceOutcome<T> {
    /// Whether the caller now holds the membership.
    pub success: bool,
    /// User-facing error message.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Typed failure reason.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<AcceptanceFailure>,
    /// Caller must create or join a family first.
    #[serde(skip_serializing_if = "is_false")]
    pub requires_family_onboarding: bool,
    /// A family admin has to accept instead.
    #[serde(skip_serializing_if = "is_false")]
    pub requires_admin_action: bool,
    /// Caller (or their family) already holds the membership.
    #[serde(skip_serializing_if = "is_false")]
    pub already_member: bool,
    /// Caller belongs to another family.
    #[serde(skip_serializing_if = "is_false")]
    pub already_in_family: bool,
    /// Caller is the only admin of the family they would leave.
    #[serde(skip_serializing_if = "is_false")]
    pub sole_admin: bool,
    /// Invitation is bound to another email.
    #[serde(skip_serializing_if = "is_false")]
    pub email_mismatch: bool,
    /// Payload on success.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> AcceptanceOutcome<T> {
    /// Successful acceptance.
    pub const fn succeeded(data: T) -> Self {
        Self {
            success: true,
            error: None,
            reason: None,
            requires_family_onboarding: false,
            requires_admin_action: false,
            already_member: false,
            already_in_family: false,
            sole_admin: false,
            email_mismatch: false,
            data: Some(data),
        }
    }

    /// Caller already holds the membership; nothing was changed.
    pub fn already_satisfied(data: T) -> Self {
        let mut outcome = Self::succeeded(data);
        outcome.already_member = true;
        outcome
    }

    /// Business failure.
    #[must_use]
    pub fn failed(reason: AcceptanceFailure) -> Self {
        Self {
            success: false,
            error: Some(reason.message()),
            requires_family_onboarding: matches!(
                reason,
                AcceptanceFailure::FamilyOnboardingRequired
            ),
            requires_admin_action: matches!(reason, AcceptanceFailure::AdminActionRequired { .. }),
            already_member: matches!(reason, AcceptanceFailure::AlreadyMember { .. }),
            already_in_family: matches!(
                reason,
                AcceptanceFailure::AlreadyInFamily { .. } | AcceptanceFailure::SoleAdmin { .. }
            ),
            sole_admin: matches!(reason, AcceptanceFailure::SoleAdmin { .. }),
            email_mismatch: matches!(reason, AcceptanceFailure::EmailMismatch),
            reason: Some(reason),
            data: None,
        }
    }
}

/// A family member with display data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FamilyMemberView {
    /// Member's user ID.
    pub user_id: UserId,
    /// Display name.
    pub name: String,
    /// Account email.
    pub email: String,
    /// Family role.
    pub role: FamilyRole,
    /// When the member joined.
    pub joined_at: DateTime<Utc>,
}

/// The joined family, returned after a family acceptance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FamilyDetails {
    /// Family row.
    pub family: Family,
    /// Members, earliest joined first.
    pub members: Vec<FamilyMemberView>,
    /// Children of the family.
    pub children: Vec<Child>,
    /// Vehicles of the family.
    pub vehicles: Vec<Vehicle>,
}

/// Summary of a group acceptance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupAcceptance {
    /// Group joined.
    pub group_id: GroupId,
    /// Group display name.
    pub group_name: String,
    /// Family that joined.
    pub family_id: FamilyId,
    /// Role granted to the family.
    pub role: GroupRole,
    /// Children newly enrolled in the group.
    pub enrolled_children: u64,
}

// ═══════════════════════════════════════════════════════════════════════════
// Listing and sweeping
// ═══════════════════════════════════════════════════════════════════════════

/// Pending invitations a user can act on.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserInvitations {
    /// Family invitations addressed to the user's email.
    pub family_invitations: Vec<FamilyInvitation>,
    /// Group invitations addressed to the user's email or, for family
    /// admins, targeting the user's family.
    pub group_invitations: Vec<GroupInvitation>,
}

impl UserInvitations {
    /// Total number of invitations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.family_invitations.len() + self.group_invitations.len()
    }

    /// Whether there is nothing to act on.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Rows moved to `EXPIRED` by a sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SweepReport {
    /// Family invitations expired.
    pub family_expired: u64,
    /// Group invitations expired.
    pub group_expired: u64,
}

impl SweepReport {
    /// Both kinds together.
    #[must_use]
    pub const fn total(&self) -> u64 {
        self.family_expired + self.group_expired
    }
}
