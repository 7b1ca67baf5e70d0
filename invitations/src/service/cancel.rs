use super::InvitationService;
use crate::authz;
use crate::constants::messages;
use crate::error::{InvitationError, Result};
use crate::providers::{InvitationStore, Notifier, StoreOps, StoreTx};
use carpool_core::environment::Clock;
use carpool_core::{FamilyInvitation, GroupInvitation, InvitationId, InvitationStatus, UserId};
use tracing::{info, instrument, warn};

impl<S, N, C> InvitationService<S, N, C>
where
    S: InvitationStore,
    N: Notifier,
    C: Clock,
{
    /// Cancel a pending family invitation.
    ///
    /// Returns the invitation as it is after cancellation.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the invitation does not exist
    /// - `Unauthorized` if the caller is not an admin of the family
    /// - `Conflict` if the invitation is no longer pending
    /// - `Infrastructure` on store failure
    #[instrument(skip(self))]
    pub async fn cancel_family_invitation(
        &self,
        invitation_id: InvitationId,
        caller: UserId,
    ) -> Result<FamilyInvitation> {
        let mut tx = self.store.begin().await?;

        let mut invitation = tx
            .find_family_invitation(invitation_id)
            .await?
            .ok_or_else(|| InvitationError::not_found(messages::INVITATION_NOT_FOUND))?;

        if !authz::is_family_admin(&mut tx, caller, invitation.family_id).await? {
            warn!("Non-admin attempted to cancel a family invitation");
            return Err(InvitationError::unauthorized(
                messages::FAMILY_ADMIN_REQUIRED_TO_MANAGE,
            ));
        }

        if invitation.status != InvitationStatus::Pending
            || !tx.cancel_family_invitation(invitation.id).await?
        {
            return Err(InvitationError::conflict(
                messages::ONLY_PENDING_CANCELLABLE,
            ));
        }
        tx.commit().await?;

        invitation.status = InvitationStatus::Cancelled;
        info!(family_id = %invitation.family_id, "Family invitation cancelled");
        Ok(invitation)
    }

    /// Cancel a pending group invitation.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the invitation does not exist
    /// - `Unauthorized` if the caller lacks group-admin permission
    /// - `Conflict` if the invitation is no longer pending
    /// - `Infrastructure` on store failure
    #[instrument(skip(self))]
    pub async fn cancel_group_invitation(
        &self,
        invitation_id: InvitationId,
        caller: UserId,
    ) -> Result<GroupInvitation> {
        let mut tx = self.store.begin().await?;

        let mut invitation = tx
            .find_group_invitation(invitation_id)
            .await?
            .ok_or_else(|| InvitationError::not_found(messages::INVITATION_NOT_FOUND))?;

        if !authz::has_group_admin_permissions(&mut tx, caller, invitation.group_id).await? {
            warn!("Caller without group-admin permission attempted to cancel");
            return Err(InvitationError::unauthorized(
                messages::GROUP_ADMIN_REQUIRED,
            ));
        }

        if invitation.status != InvitationStatus::Pending
            || !tx.cancel_group_invitation(invitation.id).await?
        {
            return Err(InvitationError::conflict(
                messages::ONLY_PENDING_CANCELLABLE,
            ));
        }
        tx.commit().await?;

        invitation.status = InvitationStatus::Cancelled;
        info!(group_id = %invitation.group_id, "Group invitation cancelled");
        Ok(invitation)
    }
}
