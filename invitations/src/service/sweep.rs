use super::InvitationService;
use crate::error::Result;
use crate::providers::{InvitationStore, Notifier, StoreOps, StoreTx};
use crate::service::types::SweepReport;
use carpool_core::environment::Clock;
use tracing::{debug, info, instrument};

impl<S, N, C> InvitationService<S, N, C>
where
    S: InvitationStore,
    N: Notifier,
    C: Clock,
{
    /// Move every pending invitation past its deadline to `EXPIRED`.
    ///
    /// Idempotent. Terminal rows are never touched, so running the sweep
    /// twice reports zero the second time.
    ///
    /// # Errors
    ///
    /// Returns error if the store fails; nothing is expired then.
    #[instrument(skip(self))]
    pub async fn cleanup_expired_invitations(&self) -> Result<SweepReport> {
        let now = self.clock.now();
        let mut tx = self.store.begin().await?;

        let family_expired = tx.expire_family_invitations(now).await?;
        let group_expired = tx.expire_group_invitations(now).await?;
        tx.commit().await?;

        let report = SweepReport {
            family_expired,
            group_expired,
        };
        if report.total() > 0 {
            info!(family_expired, group_expired, "Expired stale invitations");
        } else {
            debug!("No invitations to expire");
        }
        Ok(report)
    }
}
