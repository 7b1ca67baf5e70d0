//! In-memory invitation store for testing.

use crate::constants::messages;
use crate::error::{InvitationError, Result};
use crate::providers::{InvitationStore, StoreOps, StoreTx};
use carpool_core::{
    Child, Family, FamilyId, FamilyInvitation, FamilyMembership, FamilyRole, Group,
    GroupChildMembership, GroupFamilyMembership, GroupId, GroupInvitation, InvitationId,
    InvitationStatus, User, UserId, Vehicle,
};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::{Mutex, OwnedMutexGuard};

#[derive(Debug, Clone, Default)]
struct Tables {
    users: HashMap<UserId, User>,
    families: HashMap<FamilyId, Family>,
    groups: HashMap<GroupId, Group>,
    children: Vec<Child>,
    vehicles: Vec<Vehicle>,
    family_memberships: Vec<FamilyMembership>,
    group_family_memberships: Vec<GroupFamilyMembership>,
    group_child_memberships: Vec<GroupChildMembership>,
    family_invitations: Vec<FamilyInvitation>,
    group_invitations: Vec<GroupInvitation>,
}

/// In-memory invitation store.
///
/// Every handle holds the whole store lock for its lifetime, so
/// transactions are serializable by construction. A transaction works on
/// the live tables and keeps a snapshot taken at `begin()`; dropping it
/// without `commit()` restores the snapshot. The uniqueness rules enforced
/// by the Postgres schema are checked on insert.
///
/// Seed helpers (`insert_user`, `insert_family`, ...) write directly and are
/// meant for test setup.
#[derive(Debug, Clone, Default)]
pub struct InMemoryInvitationStore {
    tables: Arc<Mutex<Tables>>,
    unavailable: Arc<AtomicBool>,
}

impl InMemoryInvitationStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate an outage: while set, acquiring a handle fails with an
    /// infrastructure error.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Seeding
    // ═══════════════════════════════════════════════════════════════════════

    /// Insert or replace a user.
    pub async fn insert_user(&self, user: User) {
        self.tables.lock().await.users.insert(user.id, user);
    }

    /// Insert or replace a family.
    pub async fn insert_family(&self, family: Family) {
        self.tables.lock().await.families.insert(family.id, family);
    }

    /// Insert or replace a group.
    pub async fn insert_group(&self, group: Group) {
        self.tables.lock().await.groups.insert(group.id, group);
    }

    /// Insert a child.
    pub async fn insert_child(&self, child: Child) {
        self.tables.lock().await.children.push(child);
    }

    /// Insert a vehicle.
    pub async fn insert_vehicle(&self, vehicle: Vehicle) {
        self.tables.lock().await.vehicles.push(vehicle);
    }

    /// Insert a family membership, bypassing the one-family check.
    pub async fn insert_family_membership(&self, membership: FamilyMembership) {
        self.tables.lock().await.family_memberships.push(membership);
    }

    /// Insert a group membership.
    pub async fn insert_group_family_membership(&self, membership: GroupFamilyMembership) {
        self.tables
            .lock()
            .await
            .group_family_memberships
            .push(membership);
    }

    /// Insert a family invitation as-is (any status or expiry).
    pub async fn insert_raw_family_invitation(&self, invitation: FamilyInvitation) {
        self.tables.lock().await.family_invitations.push(invitation);
    }

    /// Insert a group invitation as-is (any status or expiry).
    pub async fn insert_raw_group_invitation(&self, invitation: GroupInvitation) {
        self.tables.lock().await.group_invitations.push(invitation);
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Inspection
    // ═══════════════════════════════════════════════════════════════════════

    /// All family invitations.
    pub async fn family_invitations(&self) -> Vec<FamilyInvitation> {
        self.tables.lock().await.family_invitations.clone()
    }

    /// All group invitations.
    pub async fn group_invitations(&self) -> Vec<GroupInvitation> {
        self.tables.lock().await.group_invitations.clone()
    }

    /// All family memberships of a user.
    pub async fn memberships_of(&self, user_id: UserId) -> Vec<FamilyMembership> {
        self.tables
            .lock()
            .await
            .family_memberships
            .iter()
            .filter(|m| m.user_id == user_id)
            .cloned()
            .collect()
    }

    /// All group memberships of a group.
    pub async fn group_members(&self, group_id: GroupId) -> Vec<GroupFamilyMembership> {
        self.tables
            .lock()
            .await
            .group_family_memberships
            .iter()
            .filter(|m| m.group_id == group_id)
            .cloned()
            .collect()
    }

    /// All child enrollments of a group.
    pub async fn group_children(&self, group_id: GroupId) -> Vec<GroupChildMembership> {
        self.tables
            .lock()
            .await
            .group_child_memberships
            .iter()
            .filter(|m| m.group_id == group_id)
            .cloned()
            .collect()
    }

    async fn handle(&self, transactional: bool) -> Result<MemoryHandle> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(InvitationError::infrastructure(
                "in-memory store marked unavailable",
            ));
        }
        let guard = Arc::clone(&self.tables).lock_owned().await;
        let snapshot = transactional.then(|| guard.clone());
        Ok(MemoryHandle { guard, snapshot })
    }
}

impl InvitationStore for InMemoryInvitationStore {
    type Tx = MemoryHandle;
    type Reader = MemoryHandle;

    async fn begin(&self) -> Result<MemoryHandle> {
        self.handle(true).await
    }

    async fn reader(&self) -> Result<MemoryHandle> {
        self.handle(false).await
    }
}

/// Handle into an [`InMemoryInvitationStore`].
///
/// Transactional when obtained from `begin()`, autocommit when obtained from
/// `reader()`.
#[derive(Debug)]
pub struct MemoryHandle {
    guard: OwnedMutexGuard<Tables>,
    snapshot: Option<Tables>,
}

impl Drop for MemoryHandle {
    fn drop(&mut self) {
        if let Some(snapshot) = self.snapshot.take() {
            *self.guard = snapshot;
        }
    }
}

impl StoreTx for MemoryHandle {
    async fn commit(mut self) -> Result<()> {
        self.snapshot = None;
        Ok(())
    }
}

fn newest_first<T, F>(mut rows: Vec<T>, created_at: F) -> Vec<T>
where
    F: Fn(&T) -> DateTime<Utc>,
{
    rows.sort_by_key(|r| std::cmp::Reverse(created_at(r)));
    rows
}

fn to_count(n: usize) -> u64 {
    u64::try_from(n).unwrap_or(u64::MAX)
}

impl StoreOps for MemoryHandle {
    async fn get_user(&mut self, user_id: UserId) -> Result<Option<User>> {
        Ok(self.guard.users.get(&user_id).cloned())
    }

    async fn get_family(&mut self, family_id: FamilyId) -> Result<Option<Family>> {
        Ok(self.guard.families.get(&family_id).cloned())
    }

    async fn get_group(&mut self, group_id: GroupId) -> Result<Option<Group>> {
        Ok(self.guard.groups.get(&group_id).cloned())
    }

    async fn list_children(&mut self, family_id: FamilyId) -> Result<Vec<Child>> {
        Ok(self
            .guard
            .children
            .iter()
            .filter(|c| c.family_id == family_id)
            .cloned()
            .collect())
    }

    async fn list_vehicles(&mut self, family_id: FamilyId) -> Result<Vec<Vehicle>> {
        Ok(self
            .guard
            .vehicles
            .iter()
            .filter(|v| v.family_id == family_id)
            .cloned()
            .collect())
    }

    async fn get_membership_for_user(
        &mut self,
        user_id: UserId,
    ) -> Result<Option<FamilyMembership>> {
        Ok(self
            .guard
            .family_memberships
            .iter()
            .find(|m| m.user_id == user_id)
            .cloned())
    }

    async fn list_family_members(&mut self, family_id: FamilyId) -> Result<Vec<FamilyMembership>> {
        let mut members: Vec<_> = self
            .guard
            .family_memberships
            .iter()
            .filter(|m| m.family_id == family_id)
            .cloned()
            .collect();
        members.sort_by_key(|m| m.joined_at);
        Ok(members)
    }

    async fn count_family_admins(&mut self, family_id: FamilyId) -> Result<u64> {
        Ok(to_count(
            self.guard
                .family_memberships
                .iter()
                .filter(|m| m.family_id == family_id && m.role == FamilyRole::Admin)
                .count(),
        ))
    }

    async fn create_family_membership(&mut self, membership: &FamilyMembership) -> Result<()> {
        if self
            .guard
            .family_memberships
            .iter()
            .any(|m| m.user_id == membership.user_id)
        {
            return Err(InvitationError::conflict(messages::ALREADY_IN_A_FAMILY));
        }
        self.guard.family_memberships.push(membership.clone());
        Ok(())
    }

    async fn delete_family_membership(
        &mut self,
        user_id: UserId,
        family_id: FamilyId,
    ) -> Result<bool> {
        let before = self.guard.family_memberships.len();
        self.guard
            .family_memberships
            .retain(|m| !(m.user_id == user_id && m.family_id == family_id));
        Ok(self.guard.family_memberships.len() < before)
    }

    async fn get_group_family_membership(
        &mut self,
        group_id: GroupId,
        family_id: FamilyId,
    ) -> Result<Option<GroupFamilyMembership>> {
        Ok(self
            .guard
            .group_family_memberships
            .iter()
            .find(|m| m.group_id == group_id && m.family_id == family_id)
            .cloned())
    }

    async fn create_group_family_membership(
        &mut self,
        membership: &GroupFamilyMembership,
    ) -> Result<()> {
        if self
            .guard
            .group_family_memberships
            .iter()
            .any(|m| m.group_id == membership.group_id && m.family_id == membership.family_id)
        {
            return Err(InvitationError::conflict(messages::TARGET_ALREADY_MEMBER));
        }
        self.guard.group_family_memberships.push(membership.clone());
        Ok(())
    }

    async fn create_group_child_memberships(
        &mut self,
        memberships: &[GroupChildMembership],
    ) -> Result<u64> {
        let mut created = 0;
        for membership in memberships {
            let exists = self
                .guard
                .group_child_memberships
                .iter()
                .any(|m| m.group_id == membership.group_id && m.child_id == membership.child_id);
            if !exists {
                self.guard.group_child_memberships.push(membership.clone());
                created += 1;
            }
        }
        Ok(created)
    }

    async fn invite_code_exists(&mut self, code: &str) -> Result<bool> {
        Ok(self
            .guard
            .family_invitations
            .iter()
            .any(|i| i.invite_code == code)
            || self
                .guard
                .group_invitations
                .iter()
                .any(|i| i.invite_code == code))
    }

    async fn insert_family_invitation(&mut self, invitation: &FamilyInvitation) -> Result<()> {
        let tables = &mut *self.guard;
        if tables
            .family_invitations
            .iter()
            .any(|i| i.invite_code == invitation.invite_code)
        {
            return Err(InvitationError::conflict("Invite code already in use"));
        }
        if invitation.status == InvitationStatus::Pending
            && invitation.email.is_some()
            && tables.family_invitations.iter().any(|i| {
                i.status == InvitationStatus::Pending
                    && i.family_id == invitation.family_id
                    && i.email == invitation.email
            })
        {
            return Err(InvitationError::conflict(messages::ACTIVE_INVITATION_EXISTS));
        }
        tables.family_invitations.push(invitation.clone());
        Ok(())
    }

    async fn find_family_invitation(
        &mut self,
        id: InvitationId,
    ) -> Result<Option<FamilyInvitation>> {
        Ok(self
            .guard
            .family_invitations
            .iter()
            .find(|i| i.id == id)
            .cloned())
    }

    async fn find_family_invitation_by_code(
        &mut self,
        code: &str,
    ) -> Result<Option<FamilyInvitation>> {
        Ok(self
            .guard
            .family_invitations
            .iter()
            .find(|i| i.invite_code == code)
            .cloned())
    }

    async fn find_pending_family_invitation_for_email(
        &mut self,
        family_id: FamilyId,
        email: &str,
    ) -> Result<Option<FamilyInvitation>> {
        Ok(self
            .guard
            .family_invitations
            .iter()
            .find(|i| {
                i.status == InvitationStatus::Pending
                    && i.family_id == family_id
                    && i.email.as_deref() == Some(email)
            })
            .cloned())
    }

    async fn list_family_invitations(
        &mut self,
        family_id: FamilyId,
    ) -> Result<Vec<FamilyInvitation>> {
        let rows: Vec<_> = self
            .guard
            .family_invitations
            .iter()
            .filter(|i| i.family_id == family_id)
            .cloned()
            .collect();
        Ok(newest_first(rows, |i: &FamilyInvitation| i.created_at))
    }

    async fn list_active_family_invitations_for_email(
        &mut self,
        email: &str,
        now: DateTime<Utc>,
    ) -> Result<Vec<FamilyInvitation>> {
        let rows: Vec<_> = self
            .guard
            .family_invitations
            .iter()
            .filter(|i| {
                i.status == InvitationStatus::Pending
                    && i.expires_at >= now
                    && i.email.as_deref() == Some(email)
            })
            .cloned()
            .collect();
        Ok(newest_first(rows, |i: &FamilyInvitation| i.created_at))
    }

    async fn mark_family_invitation_accepted(
        &mut self,
        id: InvitationId,
        accepted_by: UserId,
        accepted_at: DateTime<Utc>,
    ) -> Result<bool> {
        Ok(match self
            .guard
            .family_invitations
            .iter_mut()
            .find(|i| i.id == id && i.status == InvitationStatus::Pending)
        {
            Some(invitation) => {
                invitation.status = InvitationStatus::Accepted;
                invitation.accepted_by = Some(accepted_by);
                invitation.accepted_at = Some(accepted_at);
                true
            }
            None => false,
        })
    }

    async fn cancel_family_invitation(&mut self, id: InvitationId) -> Result<bool> {
        Ok(transition(
            self.guard
                .family_invitations
                .iter_mut()
                .map(|i| (i.id, &mut i.status)),
            id,
            InvitationStatus::Cancelled,
        ))
    }

    async fn mark_family_invitation_expired(&mut self, id: InvitationId) -> Result<bool> {
        Ok(transition(
            self.guard
                .family_invitations
                .iter_mut()
                .map(|i| (i.id, &mut i.status)),
            id,
            InvitationStatus::Expired,
        ))
    }

    async fn expire_family_invitations(&mut self, now: DateTime<Utc>) -> Result<u64> {
        let mut expired = 0;
        for invitation in &mut self.guard.family_invitations {
            if invitation.status == InvitationStatus::Pending && invitation.expires_at < now {
                invitation.status = InvitationStatus::Expired;
                expired += 1;
            }
        }
        Ok(expired)
    }

    async fn insert_group_invitation(&mut self, invitation: &GroupInvitation) -> Result<()> {
        let tables = &mut *self.guard;
        if tables
            .group_invitations
            .iter()
            .any(|i| i.invite_code == invitation.invite_code)
        {
            return Err(InvitationError::conflict("Invite code already in use"));
        }
        if invitation.status == InvitationStatus::Pending {
            let pending = tables.group_invitations.iter().filter(|i| {
                i.status == InvitationStatus::Pending && i.group_id == invitation.group_id
            });
            for existing in pending {
                if invitation.target_family_id.is_some()
                    && existing.target_family_id == invitation.target_family_id
                {
                    return Err(InvitationError::conflict(
                        messages::ACTIVE_FAMILY_INVITATION_EXISTS,
                    ));
                }
                if invitation.email.is_some() && existing.email == invitation.email {
                    return Err(InvitationError::conflict(messages::ACTIVE_INVITATION_EXISTS));
                }
            }
        }
        tables.group_invitations.push(invitation.clone());
        Ok(())
    }

    async fn find_group_invitation(&mut self, id: InvitationId) -> Result<Option<GroupInvitation>> {
        Ok(self
            .guard
            .group_invitations
            .iter()
            .find(|i| i.id == id)
            .cloned())
    }

    async fn find_group_invitation_by_code(
        &mut self,
        code: &str,
    ) -> Result<Option<GroupInvitation>> {
        Ok(self
            .guard
            .group_invitations
            .iter()
            .find(|i| i.invite_code == code)
            .cloned())
    }

    async fn find_pending_group_invitation_for_family(
        &mut self,
        group_id: GroupId,
        family_id: FamilyId,
    ) -> Result<Option<GroupInvitation>> {
        Ok(self
            .guard
            .group_invitations
            .iter()
            .find(|i| {
                i.status == InvitationStatus::Pending
                    && i.group_id == group_id
                    && i.target_family_id == Some(family_id)
            })
            .cloned())
    }

    async fn find_pending_group_invitation_for_email(
        &mut self,
        group_id: GroupId,
        email: &str,
    ) -> Result<Option<GroupInvitation>> {
        Ok(self
            .guard
            .group_invitations
            .iter()
            .find(|i| {
                i.status == InvitationStatus::Pending
                    && i.group_id == group_id
                    && i.email.as_deref() == Some(email)
            })
            .cloned())
    }

    async fn list_group_invitations(&mut self, group_id: GroupId) -> Result<Vec<GroupInvitation>> {
        let rows: Vec<_> = self
            .guard
            .group_invitations
            .iter()
            .filter(|i| i.group_id == group_id)
            .cloned()
            .collect();
        Ok(newest_first(rows, |i: &GroupInvitation| i.created_at))
    }

    async fn list_active_group_invitations_for_email(
        &mut self,
        email: &str,
        now: DateTime<Utc>,
    ) -> Result<Vec<GroupInvitation>> {
        let rows: Vec<_> = self
            .guard
            .group_invitations
            .iter()
            .filter(|i| {
                i.status == InvitationStatus::Pending
                    && i.expires_at >= now
                    && i.email.as_deref() == Some(email)
            })
            .cloned()
            .collect();
        Ok(newest_first(rows, |i: &GroupInvitation| i.created_at))
    }

    async fn list_active_group_invitations_for_family(
        &mut self,
        family_id: FamilyId,
        now: DateTime<Utc>,
    ) -> Result<Vec<GroupInvitation>> {
        let rows: Vec<_> = self
            .guard
            .group_invitations
            .iter()
            .filter(|i| {
                i.status == InvitationStatus::Pending
                    && i.expires_at >= now
                    && i.target_family_id == Some(family_id)
            })
            .cloned()
            .collect();
        Ok(newest_first(rows, |i: &GroupInvitation| i.created_at))
    }

    async fn mark_group_invitation_accepted(
        &mut self,
        id: InvitationId,
        accepted_by: UserId,
        family_id: FamilyId,
        accepted_at: DateTime<Utc>,
    ) -> Result<bool> {
        Ok(match self
            .guard
            .group_invitations
            .iter_mut()
            .find(|i| i.id == id && i.status == InvitationStatus::Pending)
        {
            Some(invitation) => {
                invitation.status = InvitationStatus::Accepted;
                invitation.accepted_by = Some(accepted_by);
                invitation.accepted_family_id = Some(family_id);
                invitation.accepted_at = Some(accepted_at);
                true
            }
            None => false,
        })
    }

    async fn cancel_group_invitation(&mut self, id: InvitationId) -> Result<bool> {
        Ok(transition(
            self.guard
                .group_invitations
                .iter_mut()
                .map(|i| (i.id, &mut i.status)),
            id,
            InvitationStatus::Cancelled,
        ))
    }

    async fn mark_group_invitation_expired(&mut self, id: InvitationId) -> Result<bool> {
        Ok(transition(
            self.guard
                .group_invitations
                .iter_mut()
                .map(|i| (i.id, &mut i.status)),
            id,
            InvitationStatus::Expired,
        ))
    }

    async fn expire_group_invitations(&mut self, now: DateTime<Utc>) -> Result<u64> {
        let mut expired = 0;
        for invitation in &mut self.guard.group_invitations {
            if invitation.status == InvitationStatus::Pending && invitation.expires_at < now {
                invitation.status = InvitationStatus::Expired;
                expired += 1;
            }
        }
        Ok(expired)
    }
}

/// Move the `PENDING` row with `id` to `to`.
fn transition<'a>(
    mut rows: impl Iterator<Item = (InvitationId, &'a mut InvitationStatus)>,
    id: InvitationId,
    to: InvitationStatus,
) -> bool {
    rows.find(|(row_id, status)| *row_id == id && **status == InvitationStatus::Pending)
        .is_some_and(|(_, status)| {
            *status = to;
            true
        })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn membership(user_id: UserId, family_id: FamilyId) -> FamilyMembership {
        FamilyMembership {
            user_id,
            family_id,
            role: FamilyRole::Member,
            joined_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn dropped_transaction_rolls_back() {
        let store = InMemoryInvitationStore::new();
        let user = UserId::new();

        {
            let mut tx = store.begin().await.unwrap();
            tx.create_family_membership(&membership(user, FamilyId::new()))
                .await
                .unwrap();
        }

        assert!(store.memberships_of(user).await.is_empty());
    }

    #[tokio::test]
    async fn committed_transaction_persists() {
        let store = InMemoryInvitationStore::new();
        let user = UserId::new();

        let mut tx = store.begin().await.unwrap();
        tx.create_family_membership(&membership(user, FamilyId::new()))
            .await
            .unwrap();
        tx.commit().await.unwrap();

        assert_eq!(store.memberships_of(user).await.len(), 1);
    }

    #[tokio::test]
    async fn second_family_for_user_is_conflict() {
        let store = InMemoryInvitationStore::new();
        let user = UserId::new();
        let mut tx = store.begin().await.unwrap();
        tx.create_family_membership(&membership(user, FamilyId::new()))
            .await
            .unwrap();

        let err = tx
            .create_family_membership(&membership(user, FamilyId::new()))
            .await
            .unwrap_err();
        assert!(matches!(err, InvitationError::Conflict(_)));
    }

    #[tokio::test]
    async fn unavailable_store_fails_to_begin() {
        let store = InMemoryInvitationStore::new();
        store.set_unavailable(true);
        assert!(store.begin().await.unwrap_err().is_infrastructure());
        store.set_unavailable(false);
        assert!(store.reader().await.is_ok());
    }
}
