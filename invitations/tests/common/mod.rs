//! Shared fixtures for the invitation integration tests.
//!
//! [`World`] wires an [`InvitationService`] to an in-memory store, a
//! recording notifier and an adjustable clock, and offers seed helpers for
//! users, families and groups.

#![allow(dead_code)]

use carpool_core::environment::Clock;
use carpool_core::{
    Child, ChildId, Family, FamilyId, FamilyMembership, FamilyRole, Group,
    GroupFamilyMembership, GroupId, GroupRole, User, UserId, Vehicle, VehicleId,
};
use carpool_invitations::mocks::{InMemoryInvitationStore, RecordingNotifier};
use carpool_invitations::notify::RetryPolicy;
use carpool_invitations::{InvitationConfig, InvitationService};
use carpool_testing::helpers::init_test_tracing;
use carpool_testing::{AdjustableClock, test_clock};
use std::sync::Arc;
use std::time::Duration;

/// Service under test.
pub type TestService = InvitationService<InMemoryInvitationStore, RecordingNotifier, AdjustableClock>;

/// How long tests wait for a detached email task.
pub const EMAIL_WAIT: Duration = Duration::from_secs(2);

/// Everything a test needs, sharing state with the service.
pub struct World {
    pub service: Arc<TestService>,
    pub store: InMemoryInvitationStore,
    pub notifier: RecordingNotifier,
    pub clock: AdjustableClock,
}

impl World {
    pub fn new() -> Self {
        init_test_tracing();

        let store = InMemoryInvitationStore::new();
        let notifier = RecordingNotifier::new();
        let clock = AdjustableClock::new(test_clock().now());
        let config = InvitationConfig::new("https://carpool.test").with_notification_retry(
            RetryPolicy::builder()
                .max_retries(1)
                .initial_delay(Duration::from_millis(1))
                .build(),
        );

        let service = Arc::new(InvitationService::new(
            store.clone(),
            notifier.clone(),
            clock.clone(),
            config,
        ));

        Self {
            service,
            store,
            notifier,
            clock,
        }
    }

    pub async fn user(&self, name: &str, email: &str) -> UserId {
        let id = UserId::new();
        self.store
            .insert_user(User {
                id,
                email: email.to_string(),
                name: name.to_string(),
            })
            .await;
        id
    }

    pub async fn family(&self, name: &str) -> FamilyId {
        let id = FamilyId::new();
        self.store
            .insert_family(Family {
                id,
                name: name.to_string(),
                created_at: self.clock.now(),
            })
            .await;
        id
    }

    pub async fn join(&self, user_id: UserId, family_id: FamilyId, role: FamilyRole) {
        self.store
            .insert_family_membership(FamilyMembership {
                user_id,
                family_id,
                role,
                joined_at: self.clock.now(),
            })
            .await;
    }

    /// A family with a single admin. Returns `(family, admin)`.
    pub async fn family_with_admin(&self, family: &str, admin: &str) -> (FamilyId, UserId) {
        let family_id = self.family(family).await;
        let email = format!("{}@example.com", admin.to_lowercase());
        let admin_id = self.user(admin, &email).await;
        self.join(admin_id, family_id, FamilyRole::Admin).await;
        (family_id, admin_id)
    }

    /// A user belonging to `family_id` with `role`.
    pub async fn member(&self, family_id: FamilyId, name: &str, role: FamilyRole) -> UserId {
        let email = format!("{}@example.com", name.to_lowercase());
        let user_id = self.user(name, &email).await;
        self.join(user_id, family_id, role).await;
        user_id
    }

    pub async fn group(&self, name: &str, owner: FamilyId) -> GroupId {
        let id = GroupId::new();
        self.store
            .insert_group(Group {
                id,
                name: name.to_string(),
                owner_family_id: owner,
                created_at: self.clock.now(),
            })
            .await;
        id
    }

    pub async fn join_group(
        &self,
        family_id: FamilyId,
        group_id: GroupId,
        role: GroupRole,
        added_by: UserId,
    ) {
        self.store
            .insert_group_family_membership(GroupFamilyMembership {
                family_id,
                group_id,
                role,
                joined_at: self.clock.now(),
                added_by,
            })
            .await;
    }

    pub async fn child(&self, family_id: FamilyId, name: &str) -> ChildId {
        let id = ChildId::new();
        self.store
            .insert_child(Child {
                id,
                family_id,
                name: name.to_string(),
            })
            .await;
        id
    }

    pub async fn vehicle(&self, family_id: FamilyId, description: &str, seats: i32) -> VehicleId {
        let id = VehicleId::new();
        self.store
            .insert_vehicle(Vehicle {
                id,
                family_id,
                description: description.to_string(),
                seats,
            })
            .await;
        id
    }

    /// The family a user currently belongs to, if any.
    pub async fn family_of(&self, user_id: UserId) -> Option<FamilyId> {
        let memberships = self.store.memberships_of(user_id).await;
        assert!(memberships.len() <= 1, "user holds more than one family");
        memberships.first().map(|m| m.family_id)
    }

    pub fn days(&self, days: i64) {
        self.clock.advance(chrono::Duration::days(days));
    }
}
