//! Group invitation workflows and group-admin role inheritance.

#![allow(clippy::unwrap_used)]

mod common;

use carpool_core::{FamilyRole, GroupRole, InvitationStatus};
use carpool_invitations::authz::has_group_admin_permissions;
use carpool_invitations::constants::messages;
use carpool_invitations::notify::Notification;
use carpool_invitations::providers::InvitationStore;
use carpool_invitations::{
    AcceptanceFailure, CreateGroupInvitation, ErrorKind, InvitationError, ValidationErrorCode,
};
use common::{EMAIL_WAIT, World};

#[tokio::test]
async fn family_admin_accepts_and_children_are_enrolled() {
    let world = World::new();
    let (owner, owner_admin) = world.family_with_admin("Garcias", "Lucia").await;
    let group = world.group("Oak Street School Run", owner).await;
    let (joining, joining_admin) = world.family_with_admin("Smiths", "Jo").await;
    let mia = world.child(joining, "Mia").await;
    let leo = world.child(joining, "Leo").await;

    let invitation = world
        .service
        .create_group_invitation(CreateGroupInvitation::for_family(group, owner_admin, joining))
        .await
        .unwrap();
    assert_eq!(invitation.role, GroupRole::Member);

    let outcome = world
        .service
        .accept_group_invitation(&invitation.invite_code, joining_admin)
        .await
        .unwrap();

    assert!(outcome.success, "{:?}", outcome.error);
    let acceptance = outcome.data.unwrap();
    assert_eq!(acceptance.group_name, "Oak Street School Run");
    assert_eq!(acceptance.family_id, joining);
    assert_eq!(acceptance.enrolled_children, 2);

    let members = world.store.group_members(group).await;
    assert_eq!(members.len(), 1);
    assert_eq!(members[0].added_by, joining_admin);

    let mut enrolled: Vec<_> = world
        .store
        .group_children(group)
        .await
        .into_iter()
        .map(|c| c.child_id)
        .collect();
    enrolled.sort_unstable();
    let mut expected = vec![mia, leo];
    expected.sort_unstable();
    assert_eq!(enrolled, expected);

    let stored = &world.store.group_invitations().await[0];
    assert_eq!(stored.status, InvitationStatus::Accepted);
    assert_eq!(stored.accepted_family_id, Some(joining));
}

#[tokio::test]
async fn family_targeted_invitation_emails_every_admin() {
    let world = World::new();
    let (owner, owner_admin) = world.family_with_admin("Garcias", "Lucia").await;
    let group = world.group("Oak Street School Run", owner).await;
    let (joining, _) = world.family_with_admin("Smiths", "Jo").await;
    world.member(joining, "Ray", FamilyRole::Admin).await;
    world.member(joining, "Kid", FamilyRole::Member).await;

    world
        .service
        .create_group_invitation(CreateGroupInvitation::for_family(group, owner_admin, joining))
        .await
        .unwrap();

    assert!(world.notifier.wait_for_sent(2, EMAIL_WAIT).await);
    let mut recipients = world.notifier.recipients();
    recipients.sort();
    assert_eq!(recipients, vec!["jo@example.com", "ray@example.com"]);
    assert!(world.notifier.sent().iter().all(|n| matches!(
        n,
        Notification::Group { data, .. } if data.target_family_name.as_deref() == Some("Smiths")
    )));
}

#[tokio::test]
async fn invitation_needs_a_target_or_email() {
    let world = World::new();
    let (owner, owner_admin) = world.family_with_admin("Garcias", "Lucia").await;
    let group = world.group("Oak Street School Run", owner).await;

    let mut request = CreateGroupInvitation::for_email(group, owner_admin, "x@example.com");
    request.email = None;
    let err = world
        .service
        .create_group_invitation(request)
        .await
        .unwrap_err();

    assert_eq!(
        err,
        InvitationError::Validation(messages::GROUP_TARGET_REQUIRED.to_string())
    );
}

#[tokio::test]
async fn creation_checks_group_target_and_membership() {
    let world = World::new();
    let (owner, owner_admin) = world.family_with_admin("Garcias", "Lucia").await;
    let group = world.group("Oak Street School Run", owner).await;
    let (member_family, member_admin) = world.family_with_admin("Smiths", "Jo").await;
    world
        .join_group(member_family, group, GroupRole::Member, member_admin)
        .await;

    let missing_group = world
        .service
        .create_group_invitation(CreateGroupInvitation::for_family(
            carpool_core::GroupId::new(),
            owner_admin,
            member_family,
        ))
        .await
        .unwrap_err();
    assert_eq!(
        missing_group,
        InvitationError::NotFound(messages::GROUP_NOT_FOUND.to_string())
    );

    let missing_target = world
        .service
        .create_group_invitation(CreateGroupInvitation::for_family(
            group,
            owner_admin,
            carpool_core::FamilyId::new(),
        ))
        .await
        .unwrap_err();
    assert_eq!(
        missing_target,
        InvitationError::NotFound(messages::TARGET_FAMILY_NOT_FOUND.to_string())
    );

    let already_member = world
        .service
        .create_group_invitation(CreateGroupInvitation::for_family(group, owner_admin, member_family))
        .await
        .unwrap_err();
    assert_eq!(
        already_member,
        InvitationError::Conflict(messages::TARGET_ALREADY_MEMBER.to_string())
    );
}

#[tokio::test]
async fn second_pending_invitation_for_same_family_conflicts() {
    let world = World::new();
    let (owner, owner_admin) = world.family_with_admin("Garcias", "Lucia").await;
    let group = world.group("Oak Street School Run", owner).await;
    let (joining, _) = world.family_with_admin("Smiths", "Jo").await;

    let request = CreateGroupInvitation::for_family(group, owner_admin, joining);
    world
        .service
        .create_group_invitation(request.clone())
        .await
        .unwrap();
    let err = world
        .service
        .create_group_invitation(request.clone())
        .await
        .unwrap_err();
    assert_eq!(
        err,
        InvitationError::Conflict(messages::ACTIVE_FAMILY_INVITATION_EXISTS.to_string())
    );

    // Once the first one is past its deadline a new one may be issued.
    world.days(8);
    world.service.create_group_invitation(request).await.unwrap();
}

#[tokio::test]
async fn user_without_family_must_onboard_first() {
    let world = World::new();
    let (owner, owner_admin) = world.family_with_admin("Garcias", "Lucia").await;
    let group = world.group("Oak Street School Run", owner).await;
    let invitation = world
        .service
        .create_group_invitation(CreateGroupInvitation::for_email(
            group,
            owner_admin,
            "orphan@example.com",
        ))
        .await
        .unwrap();
    let orphan = world.user("Orphan", "orphan@example.com").await;

    let outcome = world
        .service
        .accept_group_invitation(&invitation.invite_code, orphan)
        .await
        .unwrap();

    assert!(!outcome.success);
    assert!(outcome.requires_family_onboarding);
    assert_eq!(outcome.error.as_deref(), Some("Family onboarding required"));
    assert_eq!(
        world.store.group_invitations().await[0].status,
        InvitationStatus::Pending
    );
}

#[tokio::test]
async fn non_admin_member_is_pointed_to_their_admin() {
    let world = World::new();
    let (owner, owner_admin) = world.family_with_admin("Garcias", "Lucia").await;
    let group = world.group("Oak Street School Run", owner).await;
    let (joining, _) = world.family_with_admin("Smiths", "Jo").await;
    let teen = world.member(joining, "Teo", FamilyRole::Member).await;
    let invitation = world
        .service
        .create_group_invitation(CreateGroupInvitation::for_family(group, owner_admin, joining))
        .await
        .unwrap();

    let outcome = world
        .service
        .accept_group_invitation(&invitation.invite_code, teen)
        .await
        .unwrap();

    assert!(!outcome.success);
    assert!(outcome.requires_admin_action);
    let error = outcome.error.unwrap();
    assert!(error.contains("Only your family admin can accept this invitation"));
    assert!(error.contains("Jo"));
    assert!(world.store.group_members(group).await.is_empty());
}

#[tokio::test]
async fn family_already_in_group_is_reported_by_name() {
    let world = World::new();
    let (owner, owner_admin) = world.family_with_admin("Garcias", "Lucia").await;
    let group = world.group("Oak Street School Run", owner).await;
    let (joining, joining_admin) = world.family_with_admin("Smiths", "Jo").await;
    let invitation = world
        .service
        .create_group_invitation(CreateGroupInvitation::for_email(
            group,
            owner_admin,
            "jo@example.com",
        ))
        .await
        .unwrap();
    world
        .join_group(joining, group, GroupRole::Member, owner_admin)
        .await;

    let outcome = world
        .service
        .accept_group_invitation(&invitation.invite_code, joining_admin)
        .await
        .unwrap();

    assert!(!outcome.success);
    assert!(outcome.already_member);
    assert_eq!(
        outcome.error.as_deref(),
        Some("Your family is already a member of Oak Street School Run")
    );
}

#[tokio::test]
async fn invitation_for_one_family_cannot_be_used_by_another() {
    let world = World::new();
    let (owner, owner_admin) = world.family_with_admin("Garcias", "Lucia").await;
    let group = world.group("Oak Street School Run", owner).await;
    let (intended, _) = world.family_with_admin("Smiths", "Jo").await;
    let (_, other_admin) = world.family_with_admin("Lees", "Min").await;
    let invitation = world
        .service
        .create_group_invitation(CreateGroupInvitation::for_family(group, owner_admin, intended))
        .await
        .unwrap();

    let outcome = world
        .service
        .accept_group_invitation(&invitation.invite_code, other_admin)
        .await
        .unwrap();

    assert_eq!(outcome.reason, Some(AcceptanceFailure::WrongFamily));
    assert!(world.store.group_members(group).await.is_empty());
}

/// A family target outranks the email on both validation and acceptance.
#[tokio::test]
async fn family_target_decides_when_email_is_also_set() {
    let world = World::new();
    let (owner, owner_admin) = world.family_with_admin("Garcias", "Lucia").await;
    let group = world.group("Oak Street School Run", owner).await;
    let (intended, jo) = world.family_with_admin("Smiths", "Jo").await;
    let (_, min) = world.family_with_admin("Lees", "Min").await;
    let mut request = CreateGroupInvitation::for_family(group, owner_admin, intended);
    request.email = Some("someone.else@example.com".to_string());
    let invitation = world.service.create_group_invitation(request).await.unwrap();

    let other_family = world
        .service
        .validate_group_invitation(&invitation.invite_code, Some(min))
        .await;
    assert!(!other_family.valid);
    assert_eq!(other_family.error_code, Some(ValidationErrorCode::WrongFamily));
    assert_eq!(other_family.error.as_deref(), Some(messages::WRONG_FAMILY));

    let preview = world
        .service
        .validate_group_invitation(&invitation.invite_code, Some(jo))
        .await;
    assert!(preview.valid, "{:?}", preview.error);
    assert_eq!(
        preview.invitation.unwrap().target_family_name.as_deref(),
        Some("Smiths")
    );

    let outcome = world
        .service
        .accept_group_invitation(&invitation.invite_code, jo)
        .await
        .unwrap();
    assert!(outcome.success, "{:?}", outcome.error);
    assert_eq!(world.store.group_members(group).await.len(), 1);
}

#[tokio::test]
async fn group_invitation_role_is_granted() {
    let world = World::new();
    let (owner, owner_admin) = world.family_with_admin("Garcias", "Lucia").await;
    let group = world.group("Oak Street School Run", owner).await;
    let (joining, joining_admin) = world.family_with_admin("Smiths", "Jo").await;
    let invitation = world
        .service
        .create_group_invitation(
            CreateGroupInvitation::for_family(group, owner_admin, joining)
                .with_role(GroupRole::Admin),
        )
        .await
        .unwrap();

    world
        .service
        .accept_group_invitation(&invitation.invite_code, joining_admin)
        .await
        .unwrap();

    // The joined family now administers the group.
    let mut reader = world.store.reader().await.unwrap();
    assert!(has_group_admin_permissions(&mut reader, joining_admin, group).await.unwrap());
}

#[tokio::test]
async fn group_admin_rights_follow_family_roles() {
    let world = World::new();
    let (owner, owner_admin) = world.family_with_admin("Garcias", "Lucia").await;
    let owner_member = world.member(owner, "Teo", FamilyRole::Member).await;
    let group = world.group("Oak Street School Run", owner).await;

    let (admin_family, admin_family_admin) = world.family_with_admin("Smiths", "Jo").await;
    let admin_family_member = world.member(admin_family, "Kim", FamilyRole::Member).await;
    world
        .join_group(admin_family, group, GroupRole::Admin, owner_admin)
        .await;

    let (plain_family, plain_family_admin) = world.family_with_admin("Lees", "Min").await;
    world
        .join_group(plain_family, group, GroupRole::Member, owner_admin)
        .await;

    let (_, outsider) = world.family_with_admin("Okafors", "Ada").await;

    let mut reader = world.store.reader().await.unwrap();
    let cases = [
        (owner_admin, true),
        (owner_member, false),
        (admin_family_admin, true),
        (admin_family_member, false),
        (plain_family_admin, false),
        (outsider, false),
    ];
    for (user, expected) in cases {
        assert_eq!(
            has_group_admin_permissions(&mut reader, user, group).await.unwrap(),
            expected,
            "user {user:?}"
        );
    }
}

#[tokio::test]
async fn member_family_admin_without_group_admin_cannot_invite() {
    let world = World::new();
    let (owner, owner_admin) = world.family_with_admin("Garcias", "Lucia").await;
    let group = world.group("Oak Street School Run", owner).await;
    let (member_family, member_admin) = world.family_with_admin("Smiths", "Jo").await;
    world
        .join_group(member_family, group, GroupRole::Member, owner_admin)
        .await;

    let err = world
        .service
        .create_group_invitation(CreateGroupInvitation::for_email(
            group,
            member_admin,
            "new@example.com",
        ))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Authorization);
}

#[tokio::test]
async fn group_admin_cancels_and_lists() {
    let world = World::new();
    let (owner, owner_admin) = world.family_with_admin("Garcias", "Lucia").await;
    let owner_member = world.member(owner, "Teo", FamilyRole::Member).await;
    let group = world.group("Oak Street School Run", owner).await;

    let first = world
        .service
        .create_group_invitation(CreateGroupInvitation::for_email(
            group,
            owner_admin,
            "a@example.com",
        ))
        .await
        .unwrap();
    world.clock.advance(chrono::Duration::minutes(1));
    let second = world
        .service
        .create_group_invitation(CreateGroupInvitation::for_email(
            group,
            owner_admin,
            "b@example.com",
        ))
        .await
        .unwrap();

    let denied = world
        .service
        .cancel_group_invitation(first.id, owner_member)
        .await
        .unwrap_err();
    assert_eq!(denied.kind(), ErrorKind::Authorization);

    world
        .service
        .cancel_group_invitation(first.id, owner_admin)
        .await
        .unwrap();

    let listed = world
        .service
        .list_group_invitations(group, owner_admin)
        .await
        .unwrap();
    let ids: Vec<_> = listed.iter().map(|i| i.id).collect();
    assert_eq!(ids, vec![second.id, first.id]);
    assert_eq!(listed[1].status, InvitationStatus::Cancelled);

    let not_allowed = world
        .service
        .list_group_invitations(group, owner_member)
        .await
        .unwrap_err();
    assert_eq!(not_allowed.kind(), ErrorKind::Authorization);
}
