use super::{InvitationService, first_admin_name, require_user};
use crate::code::{is_well_formed, normalize_invite_code};
use crate::error::{ErrorKind, Result};
use crate::providers::{InvitationStore, Notifier, StoreOps, StoreTx};
use crate::service::types::{
    AcceptanceFailure, AcceptanceOutcome, FamilyDetails, FamilyMemberView, GroupAcceptance,
};
use crate::utils::emails_match;
use carpool_core::environment::Clock;
use carpool_core::{
    FamilyId, FamilyMembership, FamilyRole, GroupChildMembership, GroupFamilyMembership,
    Invitation, UserId,
};
use tracing::{info, instrument, warn};

/// Shown when the family a caller belongs to can no longer be resolved.
const UNKNOWN_FAMILY: &str = "another family";

/// Shown when a family has no resolvable admin.
const UNKNOWN_ADMIN: &str = "your family administrator";

/// Load a family with member names, children and vehicles.
async fn load_family_details<T: StoreOps>(
    ops: &mut T,
    family_id: FamilyId,
) -> Result<Option<FamilyDetails>> {
    let Some(family) = ops.get_family(family_id).await? else {
        return Ok(None);
    };

    let memberships = ops.list_family_members(family_id).await?;
    let mut members = Vec::with_capacity(memberships.len());
    for membership in memberships {
        let Some(user) = ops.get_user(membership.user_id).await? else {
            continue;
        };
        members.push(FamilyMemberView {
            user_id: user.id,
            name: user.name,
            email: user.email,
            role: membership.role,
            joined_at: membership.joined_at,
        });
    }

    let children = ops.list_children(family_id).await?;
    let vehicles = ops.list_vehicles(family_id).await?;

    Ok(Some(FamilyDetails {
        family,
        members,
        children,
        vehicles,
    }))
}

impl<S, N, C> InvitationService<S, N, C>
where
    S: InvitationStore,
    N: Notifier,
    C: Clock,
{
    /// Accept a family invitation, joining the caller to the family.
    ///
    /// Runs in one transaction. Expired, cancelled, already-accepted and
    /// unknown codes all fail with the same "Invalid invitation code".
    ///
    /// If the caller already belongs to the invited family the call
    /// succeeds with `already_member` set and the invitation stays pending.
    /// If they belong to another family it fails unless
    /// `leave_current_family` is set, in which case the old membership is
    /// removed in the same transaction, provided the caller is not that
    /// family's only admin.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the caller's account does not exist
    /// - `Infrastructure` on store failure
    #[instrument(skip(self, code))]
    pub async fn accept_family_invitation(
        &self,
        code: &str,
        user_id: UserId,
        leave_current_family: bool,
    ) -> Result<AcceptanceOutcome<FamilyDetails>> {
        let code = normalize_invite_code(code);
        if !is_well_formed(&code) {
            return Ok(AcceptanceOutcome::failed(AcceptanceFailure::InvalidCode));
        }

        let now = self.clock.now();
        let mut tx = self.store.begin().await?;

        let Some(invitation) = tx.find_family_invitation_by_code(&code).await? else {
            return Ok(AcceptanceOutcome::failed(AcceptanceFailure::InvalidCode));
        };
        if !invitation.is_acceptable(now) {
            return Ok(AcceptanceOutcome::failed(AcceptanceFailure::InvalidCode));
        }

        let user = require_user(&mut tx, user_id).await?;
        if let Some(bound_to) = invitation.email.as_deref() {
            if !emails_match(&user.email, bound_to) {
                warn!(invitation_id = %invitation.id, "Family invitation used by a different account");
                return Ok(AcceptanceOutcome::failed(AcceptanceFailure::EmailMismatch));
            }
        }

        if let Some(current) = tx.get_membership_for_user(user_id).await? {
            if current.family_id == invitation.family_id {
                let Some(details) = load_family_details(&mut tx, invitation.family_id).await?
                else {
                    return Ok(AcceptanceOutcome::failed(AcceptanceFailure::InvalidCode));
                };
                info!(family_id = %invitation.family_id, "Caller already in the invited family");
                return Ok(AcceptanceOutcome::already_satisfied(details));
            }

            let current_family_name = tx
                .get_family(current.family_id)
                .await?
                .map_or_else(|| UNKNOWN_FAMILY.to_string(), |f| f.name);

            if !leave_current_family {
                return Ok(AcceptanceOutcome::failed(AcceptanceFailure::AlreadyInFamily {
                    family_name: current_family_name,
                }));
            }

            if current.role == FamilyRole::Admin
                && tx.count_family_admins(current.family_id).await? <= 1
            {
                return Ok(AcceptanceOutcome::failed(AcceptanceFailure::SoleAdmin {
                    family_name: current_family_name,
                }));
            }

            tx.delete_family_membership(user_id, current.family_id)
                .await?;
            info!(left_family_id = %current.family_id, "Caller leaving previous family");
        }

        if tx.get_family(invitation.family_id).await?.is_none() {
            warn!(invitation_id = %invitation.id, "Invitation references a missing family");
            return Ok(AcceptanceOutcome::failed(AcceptanceFailure::InvalidCode));
        }

        let membership = FamilyMembership {
            user_id,
            family_id: invitation.family_id,
            role: invitation.role,
            joined_at: now,
        };
        match tx.create_family_membership(&membership).await {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::Conflict => {
                warn!("Caller joined another family concurrently");
                return Ok(AcceptanceOutcome::failed(AcceptanceFailure::AlreadyInFamily {
                    family_name: UNKNOWN_FAMILY.to_string(),
                }));
            }
            Err(e) => return Err(e),
        }

        if !tx
            .mark_family_invitation_accepted(invitation.id, user_id, now)
            .await?
        {
            warn!(invitation_id = %invitation.id, "Invitation consumed concurrently");
            return Ok(AcceptanceOutcome::failed(AcceptanceFailure::InvalidCode));
        }

        let Some(details) = load_family_details(&mut tx, invitation.family_id).await? else {
            return Ok(AcceptanceOutcome::failed(AcceptanceFailure::InvalidCode));
        };
        tx.commit().await?;

        info!(
            invitation_id = %invitation.id,
            family_id = %invitation.family_id,
            role = %invitation.role,
            "Family invitation accepted"
        );
        Ok(AcceptanceOutcome::succeeded(details))
    }

    /// Accept a group invitation on behalf of the caller's family.
    ///
    /// The caller must be an admin of their family. On success the family
    /// joins the group with the invitation's role and every child of the
    /// family is enrolled in the group.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the caller's account does not exist
    /// - `Infrastructure` on store failure
    #[instrument(skip(self, code))]
    pub async fn accept_group_invitation(
        &self,
        code: &str,
        user_id: UserId,
    ) -> Result<AcceptanceOutcome<GroupAcceptance>> {
        let code = normalize_invite_code(code);
        if !is_well_formed(&code) {
            return Ok(AcceptanceOutcome::failed(AcceptanceFailure::InvalidCode));
        }

        let now = self.clock.now();
        let mut tx = self.store.begin().await?;

        let Some(invitation) = tx.find_group_invitation_by_code(&code).await? else {
            return Ok(AcceptanceOutcome::failed(AcceptanceFailure::InvalidCode));
        };
        if !invitation.is_acceptable(now) {
            return Ok(AcceptanceOutcome::failed(AcceptanceFailure::InvalidCode));
        }
        let Some(group) = tx.get_group(invitation.group_id).await? else {
            warn!(invitation_id = %invitation.id, "Invitation references a missing group");
            return Ok(AcceptanceOutcome::failed(AcceptanceFailure::InvalidCode));
        };

        let user = require_user(&mut tx, user_id).await?;

        let Some(membership) = tx.get_membership_for_user(user_id).await? else {
            return Ok(AcceptanceOutcome::failed(
                AcceptanceFailure::FamilyOnboardingRequired,
            ));
        };
        let family_id = membership.family_id;

        if membership.role != FamilyRole::Admin {
            let admin_name = first_admin_name(&mut tx, family_id)
                .await?
                .unwrap_or_else(|| UNKNOWN_ADMIN.to_string());
            return Ok(AcceptanceOutcome::failed(
                AcceptanceFailure::AdminActionRequired { admin_name },
            ));
        }

        match (invitation.target_family_id, invitation.email.as_deref()) {
            (Some(target), _) if target != family_id => {
                warn!(invitation_id = %invitation.id, "Group invitation used by another family");
                return Ok(AcceptanceOutcome::failed(AcceptanceFailure::WrongFamily));
            }
            (None, Some(bound_to)) if !emails_match(&user.email, bound_to) => {
                warn!(invitation_id = %invitation.id, "Group invitation used by a different account");
                return Ok(AcceptanceOutcome::failed(AcceptanceFailure::EmailMismatch));
            }
            _ => {}
        }

        let already_member = AcceptanceFailure::AlreadyMember {
            group_name: group.name.clone(),
        };
        if tx
            .get_group_family_membership(group.id, family_id)
            .await?
            .is_some()
        {
            return Ok(AcceptanceOutcome::failed(already_member));
        }

        let role = invitation.role;
        let group_membership = GroupFamilyMembership {
            family_id,
            group_id: group.id,
            role,
            joined_at: now,
            added_by: user_id,
        };
        match tx.create_group_family_membership(&group_membership).await {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::Conflict => {
                return Ok(AcceptanceOutcome::failed(already_member));
            }
            Err(e) => return Err(e),
        }

        let enrollments: Vec<GroupChildMembership> = tx
            .list_children(family_id)
            .await?
            .into_iter()
            .map(|child| GroupChildMembership {
                group_id: group.id,
                child_id: child.id,
                added_at: now,
            })
            .collect();
        let enrolled_children = tx.create_group_child_memberships(&enrollments).await?;

        if !tx
            .mark_group_invitation_accepted(invitation.id, user_id, family_id, now)
            .await?
        {
            warn!(invitation_id = %invitation.id, "Invitation consumed concurrently");
            return Ok(AcceptanceOutcome::failed(AcceptanceFailure::InvalidCode));
        }
        tx.commit().await?;

        info!(
            invitation_id = %invitation.id,
            group_id = %group.id,
            family_id = %family_id,
            role = %role,
            enrolled_children,
            "Group invitation accepted"
        );
        Ok(AcceptanceOutcome::succeeded(GroupAcceptance {
            group_id: group.id,
            group_name: group.name,
            family_id,
            role,
            enrolled_children,
        }))
    }
}
