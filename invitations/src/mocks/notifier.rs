//! Recording notifier for testing.

use crate::error::{InvitationError, Result};
use crate::notify::Notification;
use crate::providers::{FamilyInvitationEmail, GroupInvitationEmail, Notifier};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

/// Notifier that records every delivered email instead of sending it.
///
/// Clones share the same recording, so a test can keep one handle while the
/// service owns another.
#[derive(Debug, Clone, Default)]
pub struct RecordingNotifier {
    sent: Arc<Mutex<Vec<Notification>>>,
    attempts: Arc<AtomicUsize>,
    should_fail: Arc<AtomicBool>,
}

impl RecordingNotifier {
    /// Create a notifier that succeeds.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent send fail with an infrastructure error.
    pub fn set_should_fail(&self, fail: bool) {
        self.should_fail.store(fail, Ordering::SeqCst);
    }

    /// Successfully delivered notifications, in delivery order.
    #[must_use]
    pub fn sent(&self) -> Vec<Notification> {
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Recipients of delivered notifications, in delivery order.
    #[must_use]
    pub fn recipients(&self) -> Vec<String> {
        self.sent()
            .iter()
            .map(|n| n.recipient().to_string())
            .collect()
    }

    /// Number of send attempts, failed ones included.
    #[must_use]
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    /// Wait until at least `count` notifications were delivered.
    ///
    /// Returns `false` on timeout. Delivery runs on detached tasks, so tests
    /// use this instead of awaiting the service.
    pub async fn wait_for_sent(&self, count: usize, timeout: Duration) -> bool {
        let poll = async {
            while self.sent.lock().unwrap_or_else(PoisonError::into_inner).len() < count {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        };
        tokio::time::timeout(timeout, poll).await.is_ok()
    }

    fn record(&self, notification: Notification) -> Result<()> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if self.should_fail.load(Ordering::SeqCst) {
            return Err(InvitationError::infrastructure("mock notifier failure"));
        }
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(notification);
        Ok(())
    }
}

impl Notifier for RecordingNotifier {
    async fn send_family_invitation(&self, to: &str, data: &FamilyInvitationEmail) -> Result<()> {
        self.record(Notification::Family {
            to: to.to_string(),
            data: data.clone(),
        })
    }

    async fn send_group_invitation(&self, to: &str, data: &GroupInvitationEmail) -> Result<()> {
        self.record(Notification::Group {
            to: to.to_string(),
            data: data.clone(),
        })
    }
}
