//! Family invitation workflows: create, accept, cancel.

#![allow(clippy::unwrap_used)]

mod common;

use carpool_core::{FamilyRole, InvitationId, InvitationStatus};
use carpool_invitations::constants::messages;
use carpool_invitations::notify::Notification;
use carpool_invitations::{AcceptanceFailure, CreateFamilyInvitation, ErrorKind, InvitationError};
use common::{EMAIL_WAIT, World};
use std::time::Duration;

#[tokio::test]
async fn public_link_has_no_email_and_any_user_can_accept() {
    let world = World::new();
    let (family, admin) = world.family_with_admin("Garcias", "Lucia").await;

    let invitation = world
        .service
        .create_family_invitation(CreateFamilyInvitation::new(family, admin, FamilyRole::Member))
        .await
        .unwrap();

    assert!(invitation.email.is_none());
    assert_eq!(invitation.invite_code.len(), 8);
    assert_eq!(invitation.status, InvitationStatus::Pending);

    let stranger = world.user("Sam", "sam@example.com").await;
    let outcome = world
        .service
        .accept_family_invitation(&invitation.invite_code, stranger, false)
        .await
        .unwrap();

    assert!(outcome.success, "{:?}", outcome.error);
    assert_eq!(world.family_of(stranger).await, Some(family));

    let stored = world.store.family_invitations().await;
    assert_eq!(stored[0].status, InvitationStatus::Accepted);
    assert_eq!(stored[0].accepted_by, Some(stranger));

    // Public links never email anyone.
    assert!(!world.notifier.wait_for_sent(1, Duration::from_millis(50)).await);
}

#[tokio::test]
async fn email_invitation_is_normalized_and_emailed_after_commit() {
    let world = World::new();
    let (family, admin) = world.family_with_admin("Garcias", "Lucia").await;

    let invitation = world
        .service
        .create_family_invitation(
            CreateFamilyInvitation::new(family, admin, FamilyRole::Admin)
                .with_email("  Grandma@Example.COM ")
                .with_message("Welcome aboard"),
        )
        .await
        .unwrap();

    assert_eq!(invitation.email.as_deref(), Some("grandma@example.com"));
    assert_eq!(invitation.expires_at, invitation.created_at + chrono::Duration::days(7));

    assert!(world.notifier.wait_for_sent(1, EMAIL_WAIT).await);
    let sent = world.notifier.sent();
    let Notification::Family { to, data } = &sent[0] else {
        unreachable!("expected a family email, got {sent:?}");
    };
    assert_eq!(to, "grandma@example.com");
    assert_eq!(data.family_name, "Garcias");
    assert_eq!(data.inviter_name, "Lucia");
    assert_eq!(data.role, FamilyRole::Admin);
    assert_eq!(data.personal_message.as_deref(), Some("Welcome aboard"));
    assert!(data.accept_url.ends_with(&invitation.invite_code));
}

#[tokio::test]
async fn second_pending_invitation_for_same_email_conflicts() {
    let world = World::new();
    let (family, admin) = world.family_with_admin("Garcias", "Lucia").await;

    world
        .service
        .create_family_invitation(
            CreateFamilyInvitation::new(family, admin, FamilyRole::Member)
                .with_email("pat@example.com"),
        )
        .await
        .unwrap();

    let err = world
        .service
        .create_family_invitation(
            CreateFamilyInvitation::new(family, admin, FamilyRole::Member)
                .with_email("PAT@example.com"),
        )
        .await
        .unwrap_err();

    assert_eq!(
        err,
        InvitationError::Conflict(messages::ACTIVE_INVITATION_EXISTS.to_string())
    );
    assert_eq!(world.store.family_invitations().await.len(), 1);
}

#[tokio::test]
async fn stale_pending_invitation_does_not_block_a_new_one() {
    let world = World::new();
    let (family, admin) = world.family_with_admin("Garcias", "Lucia").await;
    let request = CreateFamilyInvitation::new(family, admin, FamilyRole::Member)
        .with_email("pat@example.com");

    let first = world
        .service
        .create_family_invitation(request.clone())
        .await
        .unwrap();
    world.days(8);
    let second = world
        .service
        .create_family_invitation(request)
        .await
        .unwrap();

    let stored = world.store.family_invitations().await;
    let status_of = |id: InvitationId| stored.iter().find(|i| i.id == id).unwrap().status;
    assert_eq!(status_of(first.id), InvitationStatus::Expired);
    assert_eq!(status_of(second.id), InvitationStatus::Pending);
}

#[tokio::test]
async fn non_admin_cannot_invite() {
    let world = World::new();
    let (family, _) = world.family_with_admin("Garcias", "Lucia").await;
    let member = world.member(family, "Teo", FamilyRole::Member).await;

    let err = world
        .service
        .create_family_invitation(CreateFamilyInvitation::new(family, member, FamilyRole::Member))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Authorization);
    assert_eq!(err.status_hint(), 403);
    assert!(world.store.family_invitations().await.is_empty());
}

#[tokio::test]
async fn malformed_input_is_rejected() {
    let world = World::new();
    let (family, admin) = world.family_with_admin("Garcias", "Lucia").await;

    let bad_email = world
        .service
        .create_family_invitation(
            CreateFamilyInvitation::new(family, admin, FamilyRole::Member).with_email("not-an-email"),
        )
        .await
        .unwrap_err();
    assert_eq!(bad_email.kind(), ErrorKind::Validation);

    let long_message = world
        .service
        .create_family_invitation(
            CreateFamilyInvitation::new(family, admin, FamilyRole::Member)
                .with_message("x".repeat(1001)),
        )
        .await
        .unwrap_err();
    assert_eq!(long_message.kind(), ErrorKind::Validation);
}

#[tokio::test]
async fn accepted_code_cannot_be_used_again() {
    let world = World::new();
    let (family, admin) = world.family_with_admin("Garcias", "Lucia").await;
    let invitation = world
        .service
        .create_family_invitation(CreateFamilyInvitation::new(family, admin, FamilyRole::Member))
        .await
        .unwrap();

    let first = world.user("Sam", "sam@example.com").await;
    let second = world.user("Ada", "ada@example.com").await;

    assert!(
        world
            .service
            .accept_family_invitation(&invitation.invite_code, first, false)
            .await
            .unwrap()
            .success
    );

    for caller in [first, second] {
        let outcome = world
            .service
            .accept_family_invitation(&invitation.invite_code, caller, false)
            .await
            .unwrap();
        assert!(!outcome.success);
        assert_eq!(outcome.error.as_deref(), Some(messages::INVALID_CODE));
        assert_eq!(outcome.reason, Some(AcceptanceFailure::InvalidCode));
    }
    assert_eq!(world.family_of(second).await, None);
}

#[tokio::test]
async fn code_lookup_ignores_case_and_whitespace() {
    let world = World::new();
    let (family, admin) = world.family_with_admin("Garcias", "Lucia").await;
    let invitation = world
        .service
        .create_family_invitation(CreateFamilyInvitation::new(family, admin, FamilyRole::Member))
        .await
        .unwrap();
    let caller = world.user("Sam", "sam@example.com").await;

    let typed = format!("  {}  ", invitation.invite_code.to_lowercase());
    let outcome = world
        .service
        .accept_family_invitation(&typed, caller, false)
        .await
        .unwrap();

    assert!(outcome.success);
}

#[tokio::test]
async fn member_of_another_family_must_opt_in_to_leave() {
    let world = World::new();
    let (old_family, _) = world.family_with_admin("Smiths", "Jo").await;
    let (new_family, admin) = world.family_with_admin("Garcias", "Lucia").await;
    let mover = world.member(old_family, "Kim", FamilyRole::Member).await;

    let invitation = world
        .service
        .create_family_invitation(CreateFamilyInvitation::new(new_family, admin, FamilyRole::Member))
        .await
        .unwrap();

    let refused = world
        .service
        .accept_family_invitation(&invitation.invite_code, mover, false)
        .await
        .unwrap();
    assert!(!refused.success);
    assert!(refused.already_in_family);
    assert_eq!(
        refused.error.as_deref(),
        Some("You already belong to a family: Smiths")
    );
    assert_eq!(world.family_of(mover).await, Some(old_family));

    let moved = world
        .service
        .accept_family_invitation(&invitation.invite_code, mover, true)
        .await
        .unwrap();
    assert!(moved.success);
    assert_eq!(world.family_of(mover).await, Some(new_family));
}

#[tokio::test]
async fn sole_admin_cannot_leave_their_family() {
    let world = World::new();
    let (old_family, sole_admin) = world.family_with_admin("Smiths", "Jo").await;
    let (new_family, admin) = world.family_with_admin("Garcias", "Lucia").await;
    let invitation = world
        .service
        .create_family_invitation(CreateFamilyInvitation::new(new_family, admin, FamilyRole::Member))
        .await
        .unwrap();

    let outcome = world
        .service
        .accept_family_invitation(&invitation.invite_code, sole_admin, true)
        .await
        .unwrap();

    assert!(!outcome.success);
    assert!(outcome.sole_admin);
    assert!(outcome.already_in_family);
    assert!(outcome.error.unwrap().contains("Smiths"));
    assert_eq!(world.family_of(sole_admin).await, Some(old_family));
    assert_eq!(
        world.store.family_invitations().await[0].status,
        InvitationStatus::Pending
    );
}

#[tokio::test]
async fn one_of_two_admins_can_leave() {
    let world = World::new();
    let (old_family, first_admin) = world.family_with_admin("Smiths", "Jo").await;
    world.member(old_family, "Ray", FamilyRole::Admin).await;
    let (new_family, admin) = world.family_with_admin("Garcias", "Lucia").await;
    let invitation = world
        .service
        .create_family_invitation(CreateFamilyInvitation::new(new_family, admin, FamilyRole::Admin))
        .await
        .unwrap();

    let outcome = world
        .service
        .accept_family_invitation(&invitation.invite_code, first_admin, true)
        .await
        .unwrap();

    assert!(outcome.success);
    assert_eq!(world.family_of(first_admin).await, Some(new_family));
    let details = outcome.data.unwrap();
    let joined = details.members.iter().find(|m| m.user_id == first_admin).unwrap();
    assert_eq!(joined.role, FamilyRole::Admin);
}

#[tokio::test]
async fn accepting_into_own_family_is_a_no_op_success() {
    let world = World::new();
    let (family, admin) = world.family_with_admin("Garcias", "Lucia").await;
    let member = world.member(family, "Teo", FamilyRole::Member).await;
    let invitation = world
        .service
        .create_family_invitation(CreateFamilyInvitation::new(family, admin, FamilyRole::Member))
        .await
        .unwrap();

    let outcome = world
        .service
        .accept_family_invitation(&invitation.invite_code, member, false)
        .await
        .unwrap();

    assert!(outcome.success);
    assert!(outcome.already_member);
    assert_eq!(
        world.store.family_invitations().await[0].status,
        InvitationStatus::Pending
    );
}

#[tokio::test]
async fn acceptance_returns_family_details() {
    let world = World::new();
    let (family, admin) = world.family_with_admin("Garcias", "Lucia").await;
    world.child(family, "Mia").await;
    world.child(family, "Leo").await;
    world.vehicle(family, "Blue Touran", 5).await;
    let invitation = world
        .service
        .create_family_invitation(CreateFamilyInvitation::new(family, admin, FamilyRole::Member))
        .await
        .unwrap();
    let caller = world.user("Sam", "sam@example.com").await;

    let details = world
        .service
        .accept_family_invitation(&invitation.invite_code, caller, false)
        .await
        .unwrap()
        .data
        .unwrap();

    assert_eq!(details.family.name, "Garcias");
    let mut names: Vec<_> = details.members.iter().map(|m| m.name.as_str()).collect();
    names.sort_unstable();
    assert_eq!(names, vec!["Lucia", "Sam"]);
    assert_eq!(details.children.len(), 2);
    assert_eq!(details.vehicles[0].seats, 5);
}

#[tokio::test]
async fn expired_code_is_rejected_on_accept() {
    let world = World::new();
    let (family, admin) = world.family_with_admin("Garcias", "Lucia").await;
    let invitation = world
        .service
        .create_family_invitation(CreateFamilyInvitation::new(family, admin, FamilyRole::Member))
        .await
        .unwrap();
    let caller = world.user("Sam", "sam@example.com").await;

    world.days(8);
    let outcome = world
        .service
        .accept_family_invitation(&invitation.invite_code, caller, false)
        .await
        .unwrap();

    assert!(!outcome.success);
    assert_eq!(outcome.error.as_deref(), Some(messages::INVALID_CODE));
    assert_eq!(world.family_of(caller).await, None);
}

#[tokio::test]
async fn unknown_caller_is_not_found() {
    let world = World::new();
    let (family, admin) = world.family_with_admin("Garcias", "Lucia").await;
    let invitation = world
        .service
        .create_family_invitation(CreateFamilyInvitation::new(family, admin, FamilyRole::Member))
        .await
        .unwrap();

    let err = world
        .service
        .accept_family_invitation(&invitation.invite_code, carpool_core::UserId::new(), false)
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn admin_can_cancel_pending_invitation_once() {
    let world = World::new();
    let (family, admin) = world.family_with_admin("Garcias", "Lucia").await;
    let invitation = world
        .service
        .create_family_invitation(CreateFamilyInvitation::new(family, admin, FamilyRole::Member))
        .await
        .unwrap();

    let cancelled = world
        .service
        .cancel_family_invitation(invitation.id, admin)
        .await
        .unwrap();
    assert_eq!(cancelled.status, InvitationStatus::Cancelled);

    let again = world
        .service
        .cancel_family_invitation(invitation.id, admin)
        .await
        .unwrap_err();
    assert_eq!(
        again,
        InvitationError::Conflict(messages::ONLY_PENDING_CANCELLABLE.to_string())
    );

    let caller = world.user("Sam", "sam@example.com").await;
    let outcome = world
        .service
        .accept_family_invitation(&invitation.invite_code, caller, false)
        .await
        .unwrap();
    assert_eq!(outcome.reason, Some(AcceptanceFailure::InvalidCode));
}

#[tokio::test]
async fn cancel_requires_family_admin_and_existing_invitation() {
    let world = World::new();
    let (family, admin) = world.family_with_admin("Garcias", "Lucia").await;
    let member = world.member(family, "Teo", FamilyRole::Member).await;
    let invitation = world
        .service
        .create_family_invitation(CreateFamilyInvitation::new(family, admin, FamilyRole::Member))
        .await
        .unwrap();

    let denied = world
        .service
        .cancel_family_invitation(invitation.id, member)
        .await
        .unwrap_err();
    assert_eq!(denied.kind(), ErrorKind::Authorization);

    let missing = world
        .service
        .cancel_family_invitation(InvitationId::new(), admin)
        .await
        .unwrap_err();
    assert_eq!(missing.kind(), ErrorKind::NotFound);

    assert_eq!(
        world.store.family_invitations().await[0].status,
        InvitationStatus::Pending
    );
}
