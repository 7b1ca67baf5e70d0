//! # Carpool Core
//!
//! Domain types for school-transport carpools organized around families.
//!
//! A **family** is a household whose members hold an `ADMIN` or `MEMBER`
//! role. A **group** is a carpool coordination unit owned by one family and
//! joinable by other families. Families and groups grow through
//! **invitations**: short codes that can be turned into membership exactly
//! once.
//!
//! ## Contents
//!
//! - [`ids`]: strongly-typed identifiers
//! - [`roles`]: family roles, group roles and invitation status
//! - [`entities`]: persisted rows (families, groups, memberships, invitations)
//! - [`invitation`]: the [`Invitation`] concept shared by both invitation kinds
//! - [`environment`]: injected dependencies such as the [`environment::Clock`]

pub mod entities;
pub mod ids;
pub mod invitation;
pub mod roles;

// Re-export commonly used types
pub use chrono::{DateTime, Utc};
pub use entities::{
    Child, Family, FamilyInvitation, FamilyMembership, Group, GroupChildMembership,
    GroupFamilyMembership, GroupInvitation, User, Vehicle,
};
pub use ids::{ChildId, FamilyId, GroupId, InvitationId, UserId, VehicleId};
pub use invitation::{Invitation, InvitationKind};
pub use roles::{FamilyRole, GroupRole, InvitationStatus, ParseEnumError};

/// Environment module - dependencies injected into services
///
/// All time-dependent logic (invitation expiry, sweeps) reads the current
/// instant through [`Clock`](environment::Clock) so tests can pin it.
pub mod environment {
    use chrono::{DateTime, Utc};

    /// Clock trait - abstracts time operations for testability
    ///
    /// # Examples
    ///
    /// ```
    /// use carpool_core::environment::{Clock, SystemClock};
    ///
    /// let clock = SystemClock;
    /// let before = chrono::Utc::now();
    /// assert!(clock.now() >= before);
    /// ```
    pub trait Clock: Send + Sync {
        /// Get the current time
        fn now(&self) -> DateTime<Utc>;
    }

    /// Production clock backed by the system time.
    #[derive(Debug, Clone, Copy, Default)]
    pub struct SystemClock;

    impl Clock for SystemClock {
        fn now(&self) -> DateTime<Utc> {
            Utc::now()
        }
    }

    impl<C: Clock + ?Sized> Clock for std::sync::Arc<C> {
        fn now(&self) -> DateTime<Utc> {
            (**self).now()
        }
    }
}
