//! Role lookups.
//!
//! Both predicates are live queries against the membership relations, run
//! through whatever handle the caller holds (inside a transaction they see
//! that transaction's view). Nothing is cached.

use crate::error::Result;
use crate::providers::StoreOps;
use carpool_core::{FamilyId, FamilyRole, GroupId, GroupRole, UserId};

/// Whether `user_id` is an `ADMIN` member of `family_id`.
///
/// # Errors
///
/// Returns error if the store lookup fails.
pub async fn is_family_admin<S: StoreOps>(
    store: &mut S,
    user_id: UserId,
    family_id: FamilyId,
) -> Result<bool> {
    Ok(store
        .get_membership_for_user(user_id)
        .await?
        .is_some_and(|m| m.family_id == family_id && m.role == FamilyRole::Admin))
}

/// Whether `user_id` may administer `group_id`.
///
/// Group authority is inherited from the family: the user must be an
/// `ADMIN` of their family, and that family must either own the group or
/// hold an `ADMIN` group membership in it.
///
/// # Errors
///
/// Returns error if a store lookup fails.
pub async fn has_group_admin_permissions<S: StoreOps>(
    store: &mut S,
    user_id: UserId,
    group_id: GroupId,
) -> Result<bool> {
    let Some(group) = store.get_group(group_id).await? else {
        return Ok(false);
    };

    let Some(membership) = store.get_membership_for_user(user_id).await? else {
        return Ok(false);
    };

    if membership.role != FamilyRole::Admin {
        return Ok(false);
    }

    if group.owner_family_id == membership.family_id {
        return Ok(true);
    }

    Ok(store
        .get_group_family_membership(group_id, membership.family_id)
        .await?
        .is_some_and(|m| m.role == GroupRole::Admin))
}
