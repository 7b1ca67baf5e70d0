//! The invitation concept shared by family and group invitations.
//!
//! Both kinds carry a code, a status and an expiry and follow the same
//! lifecycle. What differs is what acceptance does, which lives in the
//! service layer.

use crate::entities::{FamilyInvitation, GroupInvitation};
use crate::ids::{InvitationId, UserId};
use crate::roles::InvitationStatus;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Which table an invitation lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InvitationKind {
    /// Invitation into a family.
    Family,
    /// Invitation of a family into a group.
    Group,
}

impl InvitationKind {
    /// Lower-case label used in logs.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Family => "family",
            Self::Group => "group",
        }
    }
}

impl fmt::Display for InvitationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Common view over both invitation kinds.
pub trait Invitation {
    /// The kind of this invitation.
    fn kind(&self) -> InvitationKind;

    /// Row ID.
    fn id(&self) -> InvitationId;

    /// Normalized invite code.
    fn invite_code(&self) -> &str;

    /// Current status as stored.
    fn status(&self) -> InvitationStatus;

    /// Acceptance deadline.
    fn expires_at(&self) -> DateTime<Utc>;

    /// Addressee email, if the invitation is bound to one.
    fn email(&self) -> Option<&str>;

    /// Issuing user.
    fn issuer(&self) -> UserId;

    /// Past the deadline, whatever the stored status says.
    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at() < now
    }

    /// `PENDING` and not yet expired: the only state in which an
    /// invitation may be accepted.
    fn is_acceptable(&self, now: DateTime<Utc>) -> bool {
        self.status() == InvitationStatus::Pending && !self.is_expired(now)
    }
}

impl Invitation for FamilyInvitation {
    fn kind(&self) -> InvitationKind {
        InvitationKind::Family
    }

    fn id(&self) -> InvitationId {
        self.id
    }

    fn invite_code(&self) -> &str {
        &self.invite_code
    }

    fn status(&self) -> InvitationStatus {
        self.status
    }

    fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    fn email(&self) -> Option<&str> {
        self.email.as_deref()
    }

    fn issuer(&self) -> UserId {
        self.invited_by
    }
}

impl Invitation for GroupInvitation {
    fn kind(&self) -> InvitationKind {
        InvitationKind::Group
    }

    fn id(&self) -> InvitationId {
        self.id
    }

    fn invite_code(&self) -> &str {
        &self.invite_code
    }

    fn status(&self) -> InvitationStatus {
        self.status
    }

    fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    fn email(&self) -> Option<&str> {
        self.email.as_deref()
    }

    fn issuer(&self) -> UserId {
        self.created_by
    }
}
