//! Error types for invitation operations.

use thiserror::Error;

/// Result type alias for invitation operations.
pub type Result<T> = std::result::Result<T, InvitationError>;

/// Broad error category, independent of any transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Caller lacks the required admin role (family or group-inherited).
    Authorization,
    /// Invitation, family, group or target does not exist.
    NotFound,
    /// Duplicate pending invitation, existing membership, non-pending row.
    Conflict,
    /// Missing or malformed input.
    Validation,
    /// Invitation bound to a different account.
    Security,
    /// Persistence or network failure.
    Infrastructure,
}

/// Error taxonomy for creating, cancelling and listing invitations.
///
/// Acceptance does not use this type for business failures; it returns an
/// [`AcceptanceOutcome`](crate::service::AcceptanceOutcome) so callers can
/// branch on typed flags. Only infrastructure failures surface as
/// `InvitationError` there.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum InvitationError {
    // ═══════════════════════════════════════════════════════════
    // Business Errors
    // ═══════════════════════════════════════════════════════════

    /// Caller is not allowed to perform the operation.
    #[error("{0}")]
    Unauthorized(String),

    /// Referenced entity does not exist.
    #[error("{0}")]
    NotFound(String),

    /// Operation conflicts with existing state.
    #[error("{0}")]
    Conflict(String),

    /// Input failed validation.
    #[error("{0}")]
    Validation(String),

    /// Invitation is bound to another identity.
    #[error("{0}")]
    Security(String),

    // ═══════════════════════════════════════════════════════════
    // System Errors
    // ═══════════════════════════════════════════════════════════

    /// Persistence or delivery failure. The message is for logs only.
    #[error("Infrastructure error: {0}")]
    Infrastructure(String),
}

impl InvitationError {
    /// Category of this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Unauthorized(_) => ErrorKind::Authorization,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::Conflict(_) => ErrorKind::Conflict,
            Self::Validation(_) => ErrorKind::Validation,
            Self::Security(_) => ErrorKind::Security,
            Self::Infrastructure(_) => ErrorKind::Infrastructure,
        }
    }

    /// HTTP-style status hint for the API layer.
    ///
    /// # Examples
    ///
    /// ```
    /// # use carpool_invitations::InvitationError;
    /// assert_eq!(InvitationError::Conflict("dup".into()).status_hint(), 409);
    /// assert_eq!(InvitationError::Infrastructure("io".into()).status_hint(), 500);
    /// ```
    #[must_use]
    pub const fn status_hint(&self) -> u16 {
        match self.kind() {
            ErrorKind::Authorization | ErrorKind::Security => 403,
            ErrorKind::NotFound => 404,
            ErrorKind::Conflict => 409,
            ErrorKind::Validation => 400,
            ErrorKind::Infrastructure => 500,
        }
    }

    /// Message safe to show to the caller.
    ///
    /// Infrastructure details never leave the server.
    ///
    /// # Examples
    ///
    /// ```
    /// # use carpool_invitations::InvitationError;
    /// let err = InvitationError::Infrastructure("connection reset by peer".into());
    /// assert!(!err.user_message().contains("connection"));
    /// ```
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Infrastructure(_) => crate::constants::messages::GENERIC_FAILURE.to_string(),
            other => other.to_string(),
        }
    }

    /// Returns `true` for persistence and delivery failures.
    #[must_use]
    pub const fn is_infrastructure(&self) -> bool {
        matches!(self, Self::Infrastructure(_))
    }

    pub(crate) fn unauthorized(msg: impl Into<String>) -> Self {
        Self::Unauthorized(msg.into())
    }

    pub(crate) fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub(crate) fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub(crate) fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub(crate) fn infrastructure(msg: impl Into<String>) -> Self {
        Self::Infrastructure(msg.into())
    }
}

#[cfg(feature = "postgres")]
impl From<sqlx::Error> for InvitationError {
    /// Unique violations become [`InvitationError::Conflict`] with the
    /// business message for the violated constraint. Everything else is
    /// infrastructure.
    fn from(err: sqlx::Error) -> Self {
        use crate::constants::messages;

        if let sqlx::Error::Database(db_err) = &err {
            if db_err.is_unique_violation() {
                let message = match db_err.constraint() {
                    Some("uq_family_memberships_user" | "family_memberships_pkey") => {
                        messages::ALREADY_IN_A_FAMILY
                    }
                    Some("group_family_memberships_pkey") => messages::TARGET_ALREADY_MEMBER,
                    Some(
                        "uq_family_invitations_pending_email"
                        | "uq_group_invitations_pending_email",
                    ) => messages::ACTIVE_INVITATION_EXISTS,
                    Some("uq_group_invitations_pending_family") => {
                        messages::ACTIVE_FAMILY_INVITATION_EXISTS
                    }
                    _ => "Duplicate record",
                };
                return Self::Conflict(message.to_string());
            }
        }
        Self::Infrastructure(format!("Database error: {err}"))
    }
}
