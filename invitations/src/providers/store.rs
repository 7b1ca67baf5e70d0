//! Transactional store traits.
//!
//! The invitation service never talks to a database directly. It asks an
//! [`InvitationStore`] for a handle, performs reads and writes through
//! [`StoreOps`], and commits:
//!
//! ```text
//! let mut tx = store.begin().await?;      // scoped handle
//! tx.find_family_invitation_by_code(..)   // check
//! tx.create_family_membership(..)         // act
//! tx.commit().await?;                     // or drop → rollback
//! ```
//!
//! Dropping a [`StoreTx`] without committing discards every write made
//! through it. Read-only flows use [`InvitationStore::reader`], whose writes
//! (if any) apply immediately.
//!
//! # Concurrency contract
//!
//! Implementations must make the following race-free with respect to other
//! transactions touching the same keys:
//!
//! - the `mark_*`, `cancel_*` and `expire_*` methods only affect
//!   rows that are still `PENDING` and report how many rows they changed;
//! - `insert_*_invitation` rejects a second `PENDING` row for the same
//!   addressee and a duplicate code with [`InvitationError::Conflict`];
//! - `create_family_membership` rejects a second family for the same user
//!   with [`InvitationError::Conflict`].
//!
//! [`InvitationError::Conflict`]: crate::error::InvitationError::Conflict

use crate::error::Result;
use carpool_core::{
    Child, Family, FamilyId, FamilyInvitation, FamilyMembership, Group, GroupChildMembership,
    GroupFamilyMembership, GroupId, GroupInvitation, InvitationId, User, UserId, Vehicle,
};
use chrono::{DateTime, Utc};
use std::future::Future;

/// Read and write operations over invitations, memberships and the read
/// models they reference.
///
/// Lookups return `Ok(None)` for missing rows; `Err` is reserved for
/// infrastructure failures and the constraint violations listed in the
/// module docs.
pub trait StoreOps: Send {
    // ═══════════════════════════════════════════════════════════════════════
    // Read models
    // ═══════════════════════════════════════════════════════════════════════

    /// Get user by ID.
    fn get_user(&mut self, user_id: UserId) -> impl Future<Output = Result<Option<User>>> + Send;

    /// Get family by ID.
    fn get_family(
        &mut self,
        family_id: FamilyId,
    ) -> impl Future<Output = Result<Option<Family>>> + Send;

    /// Get group by ID.
    fn get_group(&mut self, group_id: GroupId)
    -> impl Future<Output = Result<Option<Group>>> + Send;

    /// Children of a family, oldest record first.
    fn list_children(
        &mut self,
        family_id: FamilyId,
    ) -> impl Future<Output = Result<Vec<Child>>> + Send;

    /// Vehicles of a family.
    fn list_vehicles(
        &mut self,
        family_id: FamilyId,
    ) -> impl Future<Output = Result<Vec<Vehicle>>> + Send;

    // ═══════════════════════════════════════════════════════════════════════
    // Family memberships
    // ═══════════════════════════════════════════════════════════════════════

    /// The user's family membership, if any.
    fn get_membership_for_user(
        &mut self,
        user_id: UserId,
    ) -> impl Future<Output = Result<Option<FamilyMembership>>> + Send;

    /// All members of a family, earliest joined first.
    fn list_family_members(
        &mut self,
        family_id: FamilyId,
    ) -> impl Future<Output = Result<Vec<FamilyMembership>>> + Send;

    /// Number of `ADMIN` members in a family.
    ///
    /// Inside a transaction the family stays locked until commit, so two
    /// admins leaving at once cannot both see the other as remaining.
    fn count_family_admins(
        &mut self,
        family_id: FamilyId,
    ) -> impl Future<Output = Result<u64>> + Send;

    /// Insert a family membership.
    ///
    /// # Errors
    ///
    /// `Conflict` if the user already belongs to a family.
    fn create_family_membership(
        &mut self,
        membership: &FamilyMembership,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Delete a family membership. Returns `true` if a row was removed.
    fn delete_family_membership(
        &mut self,
        user_id: UserId,
        family_id: FamilyId,
    ) -> impl Future<Output = Result<bool>> + Send;

    // ═══════════════════════════════════════════════════════════════════════
    // Group memberships
    // ═══════════════════════════════════════════════════════════════════════

    /// The family's membership in a group, if any.
    fn get_group_family_membership(
        &mut self,
        group_id: GroupId,
        family_id: FamilyId,
    ) -> impl Future<Output = Result<Option<GroupFamilyMembership>>> + Send;

    /// Insert a group membership for a family.
    ///
    /// # Errors
    ///
    /// `Conflict` if the family is already a member of the group.
    fn create_group_family_membership(
        &mut self,
        membership: &GroupFamilyMembership,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Enroll children in a group, skipping existing enrollments.
    /// Returns the number of new rows.
    fn create_group_child_memberships(
        &mut self,
        memberships: &[GroupChildMembership],
    ) -> impl Future<Output = Result<u64>> + Send;

    // ═══════════════════════════════════════════════════════════════════════
    // Codes
    // ═══════════════════════════════════════════════════════════════════════

    /// Whether a code is used by any invitation of either kind.
    fn invite_code_exists(&mut self, code: &str) -> impl Future<Output = Result<bool>> + Send;

    // ═══════════════════════════════════════════════════════════════════════
    // Family invitations
    // ═══════════════════════════════════════════════════════════════════════

    /// Insert a new family invitation.
    fn insert_family_invitation(
        &mut self,
        invitation: &FamilyInvitation,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Family invitation by ID.
    fn find_family_invitation(
        &mut self,
        id: InvitationId,
    ) -> impl Future<Output = Result<Option<FamilyInvitation>>> + Send;

    /// Family invitation by normalized code, any status.
    fn find_family_invitation_by_code(
        &mut self,
        code: &str,
    ) -> impl Future<Output = Result<Option<FamilyInvitation>>> + Send;

    /// `PENDING` invitation of `family_id` addressed to `email`, expired by
    /// time or not.
    fn find_pending_family_invitation_for_email(
        &mut self,
        family_id: FamilyId,
        email: &str,
    ) -> impl Future<Output = Result<Option<FamilyInvitation>>> + Send;

    /// Every invitation of a family, newest first.
    fn list_family_invitations(
        &mut self,
        family_id: FamilyId,
    ) -> impl Future<Output = Result<Vec<FamilyInvitation>>> + Send;

    /// `PENDING`, unexpired family invitations addressed to `email`.
    fn list_active_family_invitations_for_email(
        &mut self,
        email: &str,
        now: DateTime<Utc>,
    ) -> impl Future<Output = Result<Vec<FamilyInvitation>>> + Send;

    /// `PENDING` → `ACCEPTED`. Returns `false` if the row was no longer pending.
    fn mark_family_invitation_accepted(
        &mut self,
        id: InvitationId,
        accepted_by: UserId,
        accepted_at: DateTime<Utc>,
    ) -> impl Future<Output = Result<bool>> + Send;

    /// `PENDING` → `CANCELLED`. Returns `false` if the row was no longer pending.
    fn cancel_family_invitation(
        &mut self,
        id: InvitationId,
    ) -> impl Future<Output = Result<bool>> + Send;

    /// `PENDING` → `EXPIRED` for a single row. Returns `false` if the row was
    /// no longer pending.
    fn mark_family_invitation_expired(
        &mut self,
        id: InvitationId,
    ) -> impl Future<Output = Result<bool>> + Send;

    /// `PENDING` rows with `expires_at < now` → `EXPIRED`. Returns the count.
    fn expire_family_invitations(
        &mut self,
        now: DateTime<Utc>,
    ) -> impl Future<Output = Result<u64>> + Send;

    // ═══════════════════════════════════════════════════════════════════════
    // Group invitations
    // ═══════════════════════════════════════════════════════════════════════

    /// Insert a new group invitation.
    fn insert_group_invitation(
        &mut self,
        invitation: &GroupInvitation,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Group invitation by ID.
    fn find_group_invitation(
        &mut self,
        id: InvitationId,
    ) -> impl Future<Output = Result<Option<GroupInvitation>>> + Send;

    /// Group invitation by normalized code, any status.
    fn find_group_invitation_by_code(
        &mut self,
        code: &str,
    ) -> impl Future<Output = Result<Option<GroupInvitation>>> + Send;

    /// `PENDING` invitation of `group_id` targeting `family_id`.
    fn find_pending_group_invitation_for_family(
        &mut self,
        group_id: GroupId,
        family_id: FamilyId,
    ) -> impl Future<Output = Result<Option<GroupInvitation>>> + Send;

    /// `PENDING` invitation of `group_id` addressed to `email`.
    fn find_pending_group_invitation_for_email(
        &mut self,
        group_id: GroupId,
        email: &str,
    ) -> impl Future<Output = Result<Option<GroupInvitation>>> + Send;

    /// Every invitation of a group, newest first.
    fn list_group_invitations(
        &mut self,
        group_id: GroupId,
    ) -> impl Future<Output = Result<Vec<GroupInvitation>>> + Send;

    /// `PENDING`, unexpired group invitations addressed to `email`.
    fn list_active_group_invitations_for_email(
        &mut self,
        email: &str,
        now: DateTime<Utc>,
    ) -> impl Future<Output = Result<Vec<GroupInvitation>>> + Send;

    /// `PENDING`, unexpired group invitations targeting `family_id`.
    fn list_active_group_invitations_for_family(
        &mut self,
        family_id: FamilyId,
        now: DateTime<Utc>,
    ) -> impl Future<Output = Result<Vec<GroupInvitation>>> + Send;

    /// `PENDING` → `ACCEPTED`, recording the joining family. Returns `false`
    /// if the row was no longer pending.
    fn mark_group_invitation_accepted(
        &mut self,
        id: InvitationId,
        accepted_by: UserId,
        family_id: FamilyId,
        accepted_at: DateTime<Utc>,
    ) -> impl Future<Output = Result<bool>> + Send;

    /// `PENDING` → `CANCELLED`. Returns `false` if the row was no longer pending.
    fn cancel_group_invitation(
        &mut self,
        id: InvitationId,
    ) -> impl Future<Output = Result<bool>> + Send;

    /// `PENDING` → `EXPIRED` for a single row. Returns `false` if the row was
    /// no longer pending.
    fn mark_group_invitation_expired(
        &mut self,
        id: InvitationId,
    ) -> impl Future<Output = Result<bool>> + Send;

    /// `PENDING` rows with `expires_at < now` → `EXPIRED`. Returns the count.
    fn expire_group_invitations(
        &mut self,
        now: DateTime<Utc>,
    ) -> impl Future<Output = Result<u64>> + Send;
}

/// A transaction: every operation performed through it commits or rolls
/// back together.
pub trait StoreTx: StoreOps {
    /// Commit all writes.
    ///
    /// # Errors
    ///
    /// Returns error if the commit fails; nothing is persisted then.
    fn commit(self) -> impl Future<Output = Result<()>> + Send;
}

/// Source of transactional and non-transactional store handles.
pub trait InvitationStore: Send + Sync + 'static {
    /// Transaction handle.
    type Tx: StoreTx;

    /// Non-transactional handle for read-only flows.
    type Reader: StoreOps;

    /// Begin a transaction.
    ///
    /// # Errors
    ///
    /// Returns error if no connection is available.
    fn begin(&self) -> impl Future<Output = Result<Self::Tx>> + Send;

    /// Acquire a non-transactional handle.
    ///
    /// # Errors
    ///
    /// Returns error if no connection is available.
    fn reader(&self) -> impl Future<Output = Result<Self::Reader>> + Send;
}
