//! Invitation constants.
//!
//! User-facing messages live here so the service, the stores and the tests
//! agree on the exact wording.

/// Default lifetime of a new invitation, in days.
pub const DEFAULT_INVITATION_TTL_DAYS: i64 = 7;

/// User-facing messages.
pub mod messages {
    /// Unknown, expired, cancelled or already-used code on acceptance.
    pub const INVALID_CODE: &str = "Invalid invitation code";

    /// Code found but past its deadline (validation only).
    pub const EXPIRED: &str = "This invitation has expired";

    /// Validation: invitation addressed to another account.
    pub const EMAIL_MISMATCH_VALIDATION: &str =
        "This invitation was sent to a different email address. Please sign in with that account.";

    /// Acceptance: invitation addressed to another account.
    pub const EMAIL_MISMATCH: &str = "This invitation was sent to a different email address";

    /// Infrastructure failure during validation.
    pub const TEMPORARY_VALIDATION_ERROR: &str = "Temporary validation error. Please try again.";

    /// Infrastructure failure anywhere else.
    pub const GENERIC_FAILURE: &str = "Something went wrong. Please try again.";

    /// Non-admin tried to invite into a family.
    pub const FAMILY_ADMIN_REQUIRED: &str = "Only family administrators can send invitations";

    /// Non-admin tried to manage family invitations.
    pub const FAMILY_ADMIN_REQUIRED_TO_MANAGE: &str =
        "Only family administrators can manage invitations";

    /// Caller lacks inherited group-admin rights.
    pub const GROUP_ADMIN_REQUIRED: &str = "Only group administrators can manage group invitations";

    /// Pending invitation already exists for the addressee.
    pub const ACTIVE_INVITATION_EXISTS: &str = "An active invitation already exists for this email";

    /// Pending invitation already exists for the target family.
    pub const ACTIVE_FAMILY_INVITATION_EXISTS: &str =
        "An active invitation already exists for this family";

    /// Group invitation without addressee.
    pub const GROUP_TARGET_REQUIRED: &str =
        "Either targetFamilyId or email must be provided for group invitations";

    /// Unknown target family.
    pub const TARGET_FAMILY_NOT_FOUND: &str = "Target family not found";

    /// Target family already in the group.
    pub const TARGET_ALREADY_MEMBER: &str = "This family is already a member of the group";

    /// Unknown family.
    pub const FAMILY_NOT_FOUND: &str = "Family not found";

    /// Unknown group.
    pub const GROUP_NOT_FOUND: &str = "Group not found";

    /// Unknown invitation id.
    pub const INVITATION_NOT_FOUND: &str = "Invitation not found";

    /// Unknown caller account.
    pub const USER_NOT_FOUND: &str = "User not found";

    /// Cancel on a terminal invitation.
    pub const ONLY_PENDING_CANCELLABLE: &str = "Only pending invitations can be cancelled";

    /// Malformed email address.
    pub const INVALID_EMAIL: &str = "Invalid email address";

    /// Personal message over the length limit.
    pub const MESSAGE_TOO_LONG: &str = "Personal message is too long";

    /// Group acceptance by a user without a family.
    pub const FAMILY_ONBOARDING_REQUIRED: &str = "Family onboarding required";

    /// Group invitation addressed to another family.
    pub const WRONG_FAMILY: &str = "This invitation was sent to a different family";

    /// Unique code could not be generated.
    pub const CODE_GENERATION_EXHAUSTED: &str = "Could not generate a unique invite code";

    /// Store-level rejection of a second family for one user.
    pub const ALREADY_IN_A_FAMILY: &str = "User already belongs to a family";

    /// Caller belongs to another family.
    #[must_use]
    pub fn already_in_family(family_name: &str) -> String {
        format!("You already belong to a family: {family_name}")
    }

    /// Caller would leave their family without an administrator.
    #[must_use]
    pub fn sole_admin(family_name: &str) -> String {
        format!(
            "You are the only administrator of {family_name}. \
             Promote another member before leaving."
        )
    }

    /// Group acceptance by a non-admin family member.
    #[must_use]
    pub fn admin_action_required(admin_name: &str) -> String {
        format!("Only your family admin can accept this invitation \u{2014} contact {admin_name}")
    }

    /// Caller's family already belongs to the group.
    #[must_use]
    pub fn family_already_in_group(group_name: &str) -> String {
        format!("Your family is already a member of {group_name}")
    }
}

/// Maximum length of a personal message, in characters.
pub const MAX_PERSONAL_MESSAGE_CHARS: usize = 1000;
