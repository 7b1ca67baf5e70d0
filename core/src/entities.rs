//! Persisted entities.
//!
//! These are plain data rows. Invariants that span rows (one family per
//! user, one membership per family and group, one pending invitation per
//! addressee) are enforced by the invitation service and the store schema,
//! not by these types.

use crate::ids::{ChildId, FamilyId, GroupId, InvitationId, UserId, VehicleId};
use crate::roles::{FamilyRole, GroupRole, InvitationStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An authenticated account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// User ID.
    pub id: UserId,
    /// Account email address, stored normalized (trimmed, lower-case).
    pub email: String,
    /// Display name.
    pub name: String,
}

/// A household.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Family {
    /// Family ID.
    pub id: FamilyId,
    /// Display name.
    pub name: String,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

/// A carpool coordination group owned by one family.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    /// Group ID.
    pub id: GroupId,
    /// Display name.
    pub name: String,
    /// The family that created and owns the group.
    pub owner_family_id: FamilyId,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

/// A child belonging to a family.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Child {
    /// Child ID.
    pub id: ChildId,
    /// Owning family.
    pub family_id: FamilyId,
    /// Display name.
    pub name: String,
}

/// A vehicle registered by a family.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vehicle {
    /// Vehicle ID.
    pub id: VehicleId,
    /// Owning family.
    pub family_id: FamilyId,
    /// Free-form description ("Blue Touran").
    pub description: String,
    /// Passenger seats available for children.
    pub seats: i32,
}

/// Membership of a user in a family. A user holds at most one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FamilyMembership {
    /// Member.
    pub user_id: UserId,
    /// Family.
    pub family_id: FamilyId,
    /// Role inside the family.
    pub role: FamilyRole,
    /// When the membership was created.
    pub joined_at: DateTime<Utc>,
}

/// Membership of a whole family in a group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupFamilyMembership {
    /// Member family.
    pub family_id: FamilyId,
    /// Group.
    pub group_id: GroupId,
    /// Role of the family inside the group.
    pub role: GroupRole,
    /// When the family joined.
    pub joined_at: DateTime<Utc>,
    /// User who added the family (the accepting admin).
    pub added_by: UserId,
}

/// Enrollment of a child in a group's schedule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupChildMembership {
    /// Group.
    pub group_id: GroupId,
    /// Enrolled child.
    pub child_id: ChildId,
    /// Enrollment timestamp.
    pub added_at: DateTime<Utc>,
}

/// Invitation into a family.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FamilyInvitation {
    /// Invitation ID.
    pub id: InvitationId,
    /// Inviting family.
    pub family_id: FamilyId,
    /// Addressee. `None` for a public link anyone can accept.
    pub email: Option<String>,
    /// Role granted on acceptance.
    pub role: FamilyRole,
    /// Unique, normalized invite code.
    pub invite_code: String,
    /// Optional note from the inviter.
    pub personal_message: Option<String>,
    /// Lifecycle state.
    pub status: InvitationStatus,
    /// Acceptance deadline.
    pub expires_at: DateTime<Utc>,
    /// Issuing user.
    pub invited_by: UserId,
    /// Set when the invitation is accepted.
    pub accepted_by: Option<UserId>,
    /// Set when the invitation is accepted.
    pub accepted_at: Option<DateTime<Utc>>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

/// Invitation of a family into a carpool group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupInvitation {
    /// Invitation ID.
    pub id: InvitationId,
    /// Inviting group.
    pub group_id: GroupId,
    /// Family the invitation is addressed to, when known.
    pub target_family_id: Option<FamilyId>,
    /// Addressee email when no family is known yet.
    pub email: Option<String>,
    /// Group role granted to the accepting family.
    pub role: GroupRole,
    /// Unique, normalized invite code.
    pub invite_code: String,
    /// Optional note from the inviter.
    pub personal_message: Option<String>,
    /// Lifecycle state.
    pub status: InvitationStatus,
    /// Acceptance deadline.
    pub expires_at: DateTime<Utc>,
    /// Issuing user.
    pub created_by: UserId,
    /// Admin who accepted on behalf of their family.
    pub accepted_by: Option<UserId>,
    /// Family that joined through this invitation.
    pub accepted_family_id: Option<FamilyId>,
    /// Set when the invitation is accepted.
    pub accepted_at: Option<DateTime<Utc>>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}
