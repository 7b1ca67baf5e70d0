use super::{InvitationService, display_name};
use crate::code::{is_well_formed, normalize_invite_code};
use crate::error::Result;
use crate::providers::{InvitationStore, Notifier, StoreOps};
use crate::service::types::{
    FamilyInvitationPreview, GroupInvitationPreview, ValidationErrorCode, ValidationOutcome,
};
use crate::utils::emails_match;
use carpool_core::environment::Clock;
use carpool_core::{FamilyId, GroupInvitation, Invitation, InvitationStatus, UserId};
use chrono::{DateTime, Utc};
use tracing::{debug, error, instrument, warn};

/// Outcome of the checks shared by both kinds.
enum Gate {
    Open,
    Closed(ValidationErrorCode),
}

/// Who an invitation is addressed to, as acceptance enforces it.
enum Binding<'a> {
    Anyone,
    Email(&'a str),
    Family(FamilyId),
}

impl<'a> Binding<'a> {
    fn of_group(invitation: &'a GroupInvitation) -> Self {
        match (invitation.target_family_id, invitation.email.as_deref()) {
            (Some(target), _) => Self::Family(target),
            (None, Some(email)) => Self::Email(email),
            (None, None) => Self::Anyone,
        }
    }
}

/// Status, expiry and identity checks.
///
/// Expiry is judged by time, so a row the sweeper has not reached yet is
/// still reported as expired.
async fn check_invitation<I, T>(
    invitation: &I,
    binding: Binding<'_>,
    caller: Option<UserId>,
    now: DateTime<Utc>,
    ops: &mut T,
) -> Result<Gate>
where
    I: Invitation + Sync,
    T: StoreOps,
{
    match invitation.status() {
        InvitationStatus::Pending => {}
        status => {
            debug!(%status, "Code belongs to a non-pending invitation");
            return Ok(Gate::Closed(ValidationErrorCode::InvalidCode));
        }
    }

    if invitation.is_expired(now) {
        return Ok(Gate::Closed(ValidationErrorCode::Expired));
    }

    let Some(caller) = caller else {
        return Ok(Gate::Open);
    };

    match binding {
        Binding::Anyone => {}
        Binding::Email(bound_to) => {
            let matches = ops
                .get_user(caller)
                .await?
                .is_some_and(|user| emails_match(&user.email, bound_to));
            if !matches {
                warn!(
                    kind = %invitation.kind(),
                    invitation_id = %invitation.id(),
                    "Invitation validated by a different account"
                );
                return Ok(Gate::Closed(ValidationErrorCode::EmailMismatch));
            }
        }
        Binding::Family(target) => {
            let matches = ops
                .get_membership_for_user(caller)
                .await?
                .is_some_and(|membership| membership.family_id == target);
            if !matches {
                warn!(
                    kind = %invitation.kind(),
                    invitation_id = %invitation.id(),
                    "Invitation validated by another family"
                );
                return Ok(Gate::Closed(ValidationErrorCode::WrongFamily));
            }
        }
    }

    Ok(Gate::Open)
}

impl<S, N, C> InvitationService<S, N, C>
where
    S: InvitationStore,
    N: Notifier,
    C: Clock,
{
    /// Check a family invitation code without consuming it.
    ///
    /// When `caller` is given and the invitation is bound to an email, the
    /// caller's account email must match. Store failures are logged and
    /// reported as [`ValidationErrorCode::TemporaryError`].
    #[instrument(skip(self, code))]
    pub async fn validate_family_invitation(
        &self,
        code: &str,
        caller: Option<UserId>,
    ) -> ValidationOutcome<FamilyInvitationPreview> {
        match self.try_validate_family(code, caller).await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!(error = %e, "Family invitation validation failed");
                ValidationOutcome::invalid(ValidationErrorCode::TemporaryError)
            }
        }
    }

    /// Check a group invitation code without consuming it.
    ///
    /// Same rules as [`validate_family_invitation`](Self::validate_family_invitation),
    /// except that an invitation addressed to a family is checked against the
    /// caller's family instead of their email, as acceptance does.
    #[instrument(skip(self, code))]
    pub async fn validate_group_invitation(
        &self,
        code: &str,
        caller: Option<UserId>,
    ) -> ValidationOutcome<GroupInvitationPreview> {
        match self.try_validate_group(code, caller).await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!(error = %e, "Group invitation validation failed");
                ValidationOutcome::invalid(ValidationErrorCode::TemporaryError)
            }
        }
    }

    async fn try_validate_family(
        &self,
        code: &str,
        caller: Option<UserId>,
    ) -> Result<ValidationOutcome<FamilyInvitationPreview>> {
        let code = normalize_invite_code(code);
        if !is_well_formed(&code) {
            return Ok(ValidationOutcome::invalid(ValidationErrorCode::InvalidCode));
        }

        let now = self.clock.now();
        let mut reader = self.store.reader().await?;

        let Some(invitation) = reader.find_family_invitation_by_code(&code).await? else {
            return Ok(ValidationOutcome::invalid(ValidationErrorCode::InvalidCode));
        };

        let binding = invitation.email.as_deref().map_or(Binding::Anyone, Binding::Email);
        if let Gate::Closed(reason) =
            check_invitation(&invitation, binding, caller, now, &mut reader).await?
        {
            return Ok(ValidationOutcome::invalid(reason));
        }

        let Some(family) = reader.get_family(invitation.family_id).await? else {
            warn!(invitation_id = %invitation.id, "Invitation references a missing family");
            return Ok(ValidationOutcome::invalid(ValidationErrorCode::InvalidCode));
        };
        let inviter = reader.get_user(invitation.invited_by).await?;

        Ok(ValidationOutcome::valid(FamilyInvitationPreview {
            family_id: family.id,
            family_name: family.name,
            role: invitation.role,
            inviter_name: display_name(inviter.as_ref()),
            expires_at: invitation.expires_at,
            email: invitation.email,
            personal_message: invitation.personal_message,
        }))
    }

    async fn try_validate_group(
        &self,
        code: &str,
        caller: Option<UserId>,
    ) -> Result<ValidationOutcome<GroupInvitationPreview>> {
        let code = normalize_invite_code(code);
        if !is_well_formed(&code) {
            return Ok(ValidationOutcome::invalid(ValidationErrorCode::InvalidCode));
        }

        let now = self.clock.now();
        let mut reader = self.store.reader().await?;

        let Some(invitation) = reader.find_group_invitation_by_code(&code).await? else {
            return Ok(ValidationOutcome::invalid(ValidationErrorCode::InvalidCode));
        };

        if let Gate::Closed(reason) = check_invitation(
            &invitation,
            Binding::of_group(&invitation),
            caller,
            now,
            &mut reader,
        )
        .await?
        {
            return Ok(ValidationOutcome::invalid(reason));
        }

        let Some(group) = reader.get_group(invitation.group_id).await? else {
            warn!(invitation_id = %invitation.id, "Invitation references a missing group");
            return Ok(ValidationOutcome::invalid(ValidationErrorCode::InvalidCode));
        };
        let target_family_name = match invitation.target_family_id {
            Some(family_id) => reader.get_family(family_id).await?.map(|f| f.name),
            None => None,
        };
        let inviter = reader.get_user(invitation.created_by).await?;

        Ok(ValidationOutcome::valid(GroupInvitationPreview {
            group_id: group.id,
            group_name: group.name,
            role: invitation.role,
            inviter_name: display_name(inviter.as_ref()),
            expires_at: invitation.expires_at,
            target_family_id: invitation.target_family_id,
            target_family_name,
            email: invitation.email,
            personal_message: invitation.personal_message,
        }))
    }
}
