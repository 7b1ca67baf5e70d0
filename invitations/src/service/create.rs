use super::{
    InvitationService, display_name, family_admin_emails, normalize_message,
    normalize_optional_email,
};
use crate::authz;
use crate::constants::messages;
use crate::error::{InvitationError, Result};
use crate::notify::Notification;
use crate::providers::{
    FamilyInvitationEmail, GroupInvitationEmail, InvitationStore, Notifier, StoreOps, StoreTx,
};
use crate::service::types::{CreateFamilyInvitation, CreateGroupInvitation};
use carpool_core::environment::Clock;
use carpool_core::{FamilyInvitation, GroupInvitation, Invitation, InvitationId, InvitationStatus};
use tracing::{debug, info, instrument, warn};

impl<S, N, C> InvitationService<S, N, C>
where
    S: InvitationStore,
    N: Notifier,
    C: Clock,
{
    /// Create a family invitation.
    ///
    /// With an email the invitation is bound to that address and an email is
    /// sent after commit. Without one it is a public link that any signed-in
    /// user can accept once.
    ///
    /// # Errors
    ///
    /// - `Unauthorized` if the issuer is not an admin of the family
    /// - `NotFound` if the family does not exist
    /// - `Validation` for a malformed email or an overlong message
    /// - `Conflict` if a pending invitation for the email already exists
    /// - `Infrastructure` on store failure
    #[instrument(
        skip(self, request),
        fields(family_id = %request.family_id, invited_by = %request.invited_by)
    )]
    pub async fn create_family_invitation(
        &self,
        request: CreateFamilyInvitation,
    ) -> Result<FamilyInvitation> {
        let now = self.clock.now();
        let mut tx = self.store.begin().await?;

        if !authz::is_family_admin(&mut tx, request.invited_by, request.family_id).await? {
            warn!("Non-admin attempted to create a family invitation");
            return Err(InvitationError::unauthorized(
                messages::FAMILY_ADMIN_REQUIRED,
            ));
        }

        let family = tx
            .get_family(request.family_id)
            .await?
            .ok_or_else(|| InvitationError::not_found(messages::FAMILY_NOT_FOUND))?;

        let email = normalize_optional_email(request.email)?;
        let personal_message = normalize_message(request.personal_message)?;

        if let Some(email) = email.as_deref() {
            if let Some(existing) = tx
                .find_pending_family_invitation_for_email(family.id, email)
                .await?
            {
                if !existing.is_expired(now) {
                    return Err(InvitationError::conflict(
                        messages::ACTIVE_INVITATION_EXISTS,
                    ));
                }
                tx.mark_family_invitation_expired(existing.id).await?;
                debug!(invitation_id = %existing.id, "Lazily expired stale invitation");
            }
        }

        let invite_code = self.generate_unique_code(&mut tx).await?;
        let invitation = FamilyInvitation {
            id: InvitationId::new(),
            family_id: family.id,
            email,
            role: request.role,
            invite_code,
            personal_message,
            status: InvitationStatus::Pending,
            expires_at: now + self.config.ttl(),
            invited_by: request.invited_by,
            accepted_by: None,
            accepted_at: None,
            created_at: now,
        };
        tx.insert_family_invitation(&invitation).await?;

        let inviter = tx.get_user(request.invited_by).await?;
        tx.commit().await?;

        info!(
            invitation_id = %invitation.id,
            public_link = invitation.email.is_none(),
            role = %invitation.role,
            "Family invitation created"
        );

        if let Some(to) = invitation.email.clone() {
            self.dispatcher.dispatch(Notification::Family {
                to,
                data: FamilyInvitationEmail {
                    family_name: family.name,
                    inviter_name: display_name(inviter.as_ref()),
                    invite_code: invitation.invite_code.clone(),
                    role: invitation.role,
                    personal_message: invitation.personal_message.clone(),
                    expires_at: invitation.expires_at,
                    accept_url: self.config.accept_url(&invitation.invite_code),
                },
            });
        }

        Ok(invitation)
    }

    /// Create a group invitation for a family or an email address.
    ///
    /// A family-targeted invitation is emailed to every admin of that
    /// family, since only an admin can accept it. An email-only invitation
    /// goes to that address.
    ///
    /// # Errors
    ///
    /// - `Validation` if neither a target family nor an email is given
    /// - `NotFound` if the group or the target family does not exist
    /// - `Unauthorized` if the issuer lacks group-admin permission
    /// - `Conflict` if the target family is already a member, or a pending
    ///   invitation for the same addressee exists
    /// - `Infrastructure` on store failure
    #[instrument(
        skip(self, request),
        fields(group_id = %request.group_id, created_by = %request.created_by)
    )]
    pub async fn create_group_invitation(
        &self,
        request: CreateGroupInvitation,
    ) -> Result<GroupInvitation> {
        let email = normalize_optional_email(request.email)?;
        if request.target_family_id.is_none() && email.is_none() {
            return Err(InvitationError::validation(
                messages::GROUP_TARGET_REQUIRED,
            ));
        }

        let now = self.clock.now();
        let mut tx = self.store.begin().await?;

        let group = tx
            .get_group(request.group_id)
            .await?
            .ok_or_else(|| InvitationError::not_found(messages::GROUP_NOT_FOUND))?;

        if !authz::has_group_admin_permissions(&mut tx, request.created_by, group.id).await? {
            warn!("Caller without group-admin permission attempted to invite");
            return Err(InvitationError::unauthorized(
                messages::GROUP_ADMIN_REQUIRED,
            ));
        }

        let personal_message = normalize_message(request.personal_message)?;

        let target_family = match request.target_family_id {
            Some(family_id) => {
                let family = tx
                    .get_family(family_id)
                    .await?
                    .ok_or_else(|| InvitationError::not_found(messages::TARGET_FAMILY_NOT_FOUND))?;

                if tx
                    .get_group_family_membership(group.id, family.id)
                    .await?
                    .is_some()
                {
                    return Err(InvitationError::conflict(messages::TARGET_ALREADY_MEMBER));
                }

                if let Some(existing) = tx
                    .find_pending_group_invitation_for_family(group.id, family.id)
                    .await?
                {
                    if !existing.is_expired(now) {
                        return Err(InvitationError::conflict(
                            messages::ACTIVE_FAMILY_INVITATION_EXISTS,
                        ));
                    }
                    tx.mark_group_invitation_expired(existing.id).await?;
                    debug!(invitation_id = %existing.id, "Lazily expired stale invitation");
                }
                Some(family)
            }
            None => None,
        };

        if let Some(email) = email.as_deref() {
            if let Some(existing) = tx
                .find_pending_group_invitation_for_email(group.id, email)
                .await?
            {
                if !existing.is_expired(now) {
                    return Err(InvitationError::conflict(
                        messages::ACTIVE_INVITATION_EXISTS,
                    ));
                }
                tx.mark_group_invitation_expired(existing.id).await?;
                debug!(invitation_id = %existing.id, "Lazily expired stale invitation");
            }
        }

        let invite_code = self.generate_unique_code(&mut tx).await?;
        let invitation = GroupInvitation {
            id: InvitationId::new(),
            group_id: group.id,
            target_family_id: target_family.as_ref().map(|f| f.id),
            email,
            role: request.role,
            invite_code,
            personal_message,
            status: InvitationStatus::Pending,
            expires_at: now + self.config.ttl(),
            created_by: request.created_by,
            accepted_by: None,
            accepted_family_id: None,
            accepted_at: None,
            created_at: now,
        };
        tx.insert_group_invitation(&invitation).await?;

        let mut recipients = match &target_family {
            Some(family) => family_admin_emails(&mut tx, family.id).await?,
            None => Vec::new(),
        };
        if let Some(email) = &invitation.email {
            if !recipients.iter().any(|r| crate::utils::emails_match(r, email)) {
                recipients.push(email.clone());
            }
        }

        let inviter = tx.get_user(request.created_by).await?;
        tx.commit().await?;

        info!(
            invitation_id = %invitation.id,
            target_family_id = ?invitation.target_family_id,
            recipients = recipients.len(),
            "Group invitation created"
        );

        let data = GroupInvitationEmail {
            group_name: group.name,
            inviter_name: display_name(inviter.as_ref()),
            target_family_name: target_family.map(|f| f.name),
            invite_code: invitation.invite_code.clone(),
            role: invitation.role,
            personal_message: invitation.personal_message.clone(),
            expires_at: invitation.expires_at,
            accept_url: self.config.accept_url(&invitation.invite_code),
        };
        self.dispatcher
            .dispatch_all(recipients.into_iter().map(|to| Notification::Group {
                to,
                data: data.clone(),
            }));

        Ok(invitation)
    }
}
