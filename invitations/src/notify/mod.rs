//! Post-commit notification delivery.
//!
//! The invitation service never sends email inside a transaction. After a
//! successful commit it hands [`Notification`]s to the
//! [`NotificationDispatcher`], which delivers each one on its own tokio task
//! with exponential backoff. Delivery failures are logged and dropped; they
//! cannot affect the invitation that was already persisted.

pub mod retry;

pub use retry::{RetryPolicy, RetryPolicyBuilder, retry_with_backoff};

use crate::providers::{FamilyInvitationEmail, GroupInvitationEmail, Notifier};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{Instrument, debug, info_span, warn};

/// A single email to deliver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    /// Family invitation email.
    Family {
        /// Recipient address.
        to: String,
        /// Template data.
        data: FamilyInvitationEmail,
    },
    /// Group invitation email.
    Group {
        /// Recipient address.
        to: String,
        /// Template data.
        data: GroupInvitationEmail,
    },
}

impl Notification {
    /// Recipient address.
    #[must_use]
    pub fn recipient(&self) -> &str {
        match self {
            Self::Family { to, .. } | Self::Group { to, .. } => to,
        }
    }

    const fn kind(&self) -> &'static str {
        match self {
            Self::Family { .. } => "family",
            Self::Group { .. } => "group",
        }
    }
}

/// Detached, retried delivery through a [`Notifier`].
pub struct NotificationDispatcher<N: Notifier> {
    notifier: Arc<N>,
    policy: RetryPolicy,
}

impl<N: Notifier> Clone for NotificationDispatcher<N> {
    fn clone(&self) -> Self {
        Self {
            notifier: Arc::clone(&self.notifier),
            policy: self.policy.clone(),
        }
    }
}

impl<N: Notifier> NotificationDispatcher<N> {
    /// Create a dispatcher.
    #[must_use]
    pub fn new(notifier: N, policy: RetryPolicy) -> Self {
        Self {
            notifier: Arc::new(notifier),
            policy,
        }
    }

    /// The underlying notifier.
    #[must_use]
    pub const fn notifier(&self) -> &Arc<N> {
        &self.notifier
    }

    /// Deliver a notification on a background task.
    ///
    /// The returned handle completes once delivery succeeded or retries were
    /// exhausted. Callers normally drop it.
    pub fn dispatch(&self, notification: Notification) -> JoinHandle<()> {
        let notifier = Arc::clone(&self.notifier);
        let policy = self.policy.clone();
        let span = info_span!(
            "invitation_email",
            kind = notification.kind(),
            to = %notification.recipient()
        );

        tokio::spawn(
            async move {
                let result = retry_with_backoff(&policy, || async {
                    match &notification {
                        Notification::Family { to, data } => {
                            notifier.send_family_invitation(to, data).await
                        }
                        Notification::Group { to, data } => {
                            notifier.send_group_invitation(to, data).await
                        }
                    }
                })
                .await;

                match result {
                    Ok(()) => debug!("Invitation email delivered"),
                    Err(e) => warn!(
                        error = %e,
                        retries = policy.max_retries,
                        "Invitation email dropped after retries"
                    ),
                }
            }
            .instrument(span),
        )
    }

    /// Deliver several notifications, one task each.
    pub fn dispatch_all(
        &self,
        notifications: impl IntoIterator<Item = Notification>,
    ) -> Vec<JoinHandle<()>> {
        notifications
            .into_iter()
            .map(|n| self.dispatch(n))
            .collect()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::mocks::RecordingNotifier;
    use carpool_core::FamilyRole;
    use chrono::Utc;
    use std::time::Duration;

    fn family_email(to: &str) -> Notification {
        Notification::Family {
            to: to.to_string(),
            data: FamilyInvitationEmail {
                family_name: "Garcias".to_string(),
                inviter_name: "Lu".to_string(),
                invite_code: "HJKM2345".to_string(),
                role: FamilyRole::Member,
                personal_message: None,
                expires_at: Utc::now(),
                accept_url: "http://localhost:3000/invitations/HJKM2345".to_string(),
            },
        }
    }

    fn fast_policy() -> RetryPolicy {
        RetryPolicy::builder()
            .max_retries(2)
            .initial_delay(Duration::from_millis(1))
            .build()
    }

    #[tokio::test]
    async fn delivers_on_background_task() {
        let notifier = RecordingNotifier::new();
        let dispatcher = NotificationDispatcher::new(notifier.clone(), fast_policy());

        dispatcher.dispatch(family_email("a@example.com")).await.unwrap();

        assert_eq!(notifier.recipients(), vec!["a@example.com".to_string()]);
    }

    #[tokio::test]
    async fn failed_delivery_is_retried_then_dropped() {
        let notifier = RecordingNotifier::new();
        notifier.set_should_fail(true);
        let dispatcher = NotificationDispatcher::new(notifier.clone(), fast_policy());

        // Task completes normally; failure is only logged.
        dispatcher.dispatch(family_email("b@example.com")).await.unwrap();

        assert_eq!(notifier.attempts(), 3);
        assert!(notifier.sent().is_empty());
    }
}
