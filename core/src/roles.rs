//! Roles and invitation status.
//!
//! All three enums are persisted as upper-case strings (`"ADMIN"`,
//! `"PENDING"`, ...) and round-trip through [`as_str`](FamilyRole::as_str)
//! and [`parse`](FamilyRole::parse).

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// A stored string did not match any known variant.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid {kind} value: {value}")]
pub struct ParseEnumError {
    /// Name of the enum being parsed.
    pub kind: &'static str,
    /// The rejected value.
    pub value: String,
}

/// Role of a user inside a family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FamilyRole {
    /// May invite, remove members and act for the family in groups.
    Admin,
    /// Regular family member.
    Member,
}

impl FamilyRole {
    /// Database representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "ADMIN",
            Self::Member => "MEMBER",
        }
    }

    /// Parse from the database representation.
    ///
    /// # Errors
    ///
    /// Returns [`ParseEnumError`] if the string is not a known role.
    pub fn parse(s: &str) -> Result<Self, ParseEnumError> {
        match s {
            "ADMIN" => Ok(Self::Admin),
            "MEMBER" => Ok(Self::Member),
            _ => Err(ParseEnumError {
                kind: "family role",
                value: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for FamilyRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Role of a family inside a carpool group.
///
/// Group roles belong to families, never to individual users. A user acts
/// with a family's group role only while being that family's admin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GroupRole {
    /// Family may manage the group (invite, cancel invitations).
    Admin,
    /// Family participates in the group.
    #[default]
    Member,
}

impl GroupRole {
    /// Database representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "ADMIN",
            Self::Member => "MEMBER",
        }
    }

    /// Parse from the database representation.
    ///
    /// # Errors
    ///
    /// Returns [`ParseEnumError`] if the string is not a known role.
    pub fn parse(s: &str) -> Result<Self, ParseEnumError> {
        match s {
            "ADMIN" => Ok(Self::Admin),
            "MEMBER" => Ok(Self::Member),
            _ => Err(ParseEnumError {
                kind: "group role",
                value: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for GroupRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle state of an invitation.
///
/// ```text
///            ┌──> ACCEPTED
/// PENDING ───┼──> EXPIRED
///            └──> CANCELLED
/// ```
///
/// Every transition leaves `PENDING` exactly once; the other states are
/// terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InvitationStatus {
    /// Waiting for acceptance.
    Pending,
    /// Turned into a membership.
    Accepted,
    /// Past its expiry date.
    Expired,
    /// Withdrawn by an administrator.
    Cancelled,
}

impl InvitationStatus {
    /// Database representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Accepted => "ACCEPTED",
            Self::Expired => "EXPIRED",
            Self::Cancelled => "CANCELLED",
        }
    }

    /// Parse from the database representation.
    ///
    /// # Errors
    ///
    /// Returns [`ParseEnumError`] if the string is not a known status.
    pub fn parse(s: &str) -> Result<Self, ParseEnumError> {
        match s {
            "PENDING" => Ok(Self::Pending),
            "ACCEPTED" => Ok(Self::Accepted),
            "EXPIRED" => Ok(Self::Expired),
            "CANCELLED" => Ok(Self::Cancelled),
            _ => Err(ParseEnumError {
                kind: "invitation status",
                value: s.to_string(),
            }),
        }
    }

    /// Returns `true` for `ACCEPTED`, `EXPIRED` and `CANCELLED`.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }
}

impl fmt::Display for InvitationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[allow(clippy::unwrap_used)]
    fn status_parse_rejects_unknown_values() {
        let err = InvitationStatus::parse("pending").unwrap_err();
        assert_eq!(err.kind, "invitation status");
        assert_eq!(err.to_string(), "invalid invitation status value: pending");
    }

    #[test]
    fn only_pending_is_non_terminal() {
        assert!(!InvitationStatus::Pending.is_terminal());
        assert!(InvitationStatus::Accepted.is_terminal());
        assert!(InvitationStatus::Expired.is_terminal());
        assert!(InvitationStatus::Cancelled.is_terminal());
    }

    #[test]
    fn group_role_defaults_to_member() {
        assert_eq!(GroupRole::default(), GroupRole::Member);
    }

    #[test]
    #[allow(clippy::unwrap_used)]
    fn roles_serialize_upper_case() {
        assert_eq!(serde_json::to_string(&FamilyRole::Admin).unwrap(), "\"ADMIN\"");
        assert_eq!(
            serde_json::from_str::<GroupRole>("\"MEMBER\"").unwrap(),
            GroupRole::Member
        );
    }
}
