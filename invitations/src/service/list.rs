use super::{InvitationService, require_user};
use crate::authz;
use crate::constants::messages;
use crate::error::{InvitationError, Result};
use crate::providers::{InvitationStore, Notifier, StoreOps};
use crate::service::types::UserInvitations;
use crate::utils::normalize_email;
use carpool_core::environment::Clock;
use carpool_core::{FamilyId, FamilyInvitation, FamilyRole, GroupId, GroupInvitation, UserId};
use std::cmp::Reverse;
use std::collections::HashSet;
use tracing::{debug, instrument, warn};

impl<S, N, C> InvitationService<S, N, C>
where
    S: InvitationStore,
    N: Notifier,
    C: Clock,
{
    /// Invitations the user can act on right now.
    ///
    /// Includes pending, unexpired invitations addressed to the user's
    /// email and, when the user administers a family, group invitations
    /// targeting that family.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the user does not exist
    /// - `Infrastructure` on store failure
    #[instrument(skip(self))]
    pub async fn list_user_invitations(&self, user_id: UserId) -> Result<UserInvitations> {
        let now = self.clock.now();
        let mut reader = self.store.reader().await?;

        let user = require_user(&mut reader, user_id).await?;
        let email = normalize_email(&user.email);

        let family_invitations = reader
            .list_active_family_invitations_for_email(&email, now)
            .await?;
        let mut group_invitations = reader
            .list_active_group_invitations_for_email(&email, now)
            .await?;

        if let Some(membership) = reader.get_membership_for_user(user_id).await? {
            if membership.role == FamilyRole::Admin {
                let mut seen: HashSet<_> = group_invitations.iter().map(|i| i.id).collect();
                let targeted = reader
                    .list_active_group_invitations_for_family(membership.family_id, now)
                    .await?;
                group_invitations.extend(targeted.into_iter().filter(|i| seen.insert(i.id)));
                group_invitations.sort_by_key(|i| Reverse(i.created_at));
            }
        }

        let invitations = UserInvitations {
            family_invitations,
            group_invitations,
        };
        debug!(count = invitations.len(), "Listed user invitations");
        Ok(invitations)
    }

    /// Every invitation of a family, newest first.
    ///
    /// # Errors
    ///
    /// - `Unauthorized` if the caller is not an admin of the family
    /// - `Infrastructure` on store failure
    #[instrument(skip(self))]
    pub async fn list_family_invitations(
        &self,
        family_id: FamilyId,
        caller: UserId,
    ) -> Result<Vec<FamilyInvitation>> {
        let mut reader = self.store.reader().await?;

        if !authz::is_family_admin(&mut reader, caller, family_id).await? {
            warn!("Non-admin attempted to list family invitations");
            return Err(InvitationError::unauthorized(
                messages::FAMILY_ADMIN_REQUIRED_TO_MANAGE,
            ));
        }

        reader.list_family_invitations(family_id).await
    }

    /// Every invitation of a group, newest first.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the group does not exist
    /// - `Unauthorized` if the caller lacks group-admin permission
    /// - `Infrastructure` on store failure
    #[instrument(skip(self))]
    pub async fn list_group_invitations(
        &self,
        group_id: GroupId,
        caller: UserId,
    ) -> Result<Vec<GroupInvitation>> {
        let mut reader = self.store.reader().await?;

        if reader.get_group(group_id).await?.is_none() {
            return Err(InvitationError::not_found(messages::GROUP_NOT_FOUND));
        }

        if !authz::has_group_admin_permissions(&mut reader, caller, group_id).await? {
            warn!("Caller without group-admin permission attempted to list");
            return Err(InvitationError::unauthorized(
                messages::GROUP_ADMIN_REQUIRED,
            ));
        }

        reader.list_group_invitations(group_id).await
    }
}
