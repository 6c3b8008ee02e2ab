//! Backfill of local users from the identity provider's listing.
//!
//! Each provider account is applied as a `user.updated` event, which creates
//! missing users and refreshes existing ones. A fresh database can therefore
//! be filled, and a stale one repaired, by running the backfill at any time.

use std::sync::Arc;

use tracing::{info, warn};

use crate::domain::WebhookEvent;
use crate::domain::ports::{
    IdentityProvider, IdentityProviderError, IdentitySync, SyncOutcome,
};

/// Counts reported at the end of a backfill run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BackfillReport {
    pub seen: u64,
    pub created: u64,
    pub updated: u64,
    pub skipped: u64,
    pub failed: u64,
}

pub struct IdentityBackfill<I, S> {
    idp: Arc<I>,
    sync: Arc<S>,
    page_size: u32,
}

impl<I, S> IdentityBackfill<I, S> {
    pub const DEFAULT_PAGE_SIZE: u32 = 100;

    pub fn new(idp: Arc<I>, sync: Arc<S>) -> Self {
        Self {
            idp,
            sync,
            page_size: Self::DEFAULT_PAGE_SIZE,
        }
    }

    #[must_use]
    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size.max(1);
        self
    }
}

impl<I, S> IdentityBackfill<I, S>
where
    I: IdentityProvider,
    S: IdentitySync,
{
    /// Walk every provider page until an empty one comes back.
    ///
    /// Accounts that cannot be mirrored count as skipped. Per-user sync
    /// failures are counted and logged. A provider failure aborts the run.
    pub async fn run(&self) -> Result<BackfillReport, IdentityProviderError> {
        let mut report = BackfillReport::default();
        let mut offset = 0_u64;
        loop {
            let page = self.idp.list_users(offset, self.page_size).await?;
            if page.is_exhausted() {
                break;
            }
            report.seen += page.skipped();
            report.skipped += page.skipped();
            for user in page.users {
                report.seen += 1;
                let external_id = user.identity.external_id.clone();
                match self
                    .sync
                    .apply_event(WebhookEvent::UserUpdated(user.identity))
                    .await
                {
                    Ok(SyncOutcome::Created(_)) => report.created += 1,
                    Ok(SyncOutcome::Updated(_)) => report.updated += 1,
                    Ok(SyncOutcome::Deleted | SyncOutcome::Skipped(_)) => report.skipped += 1,
                    Err(error) => {
                        warn!(%external_id, %error, "backfill could not sync user");
                        report.failed += 1;
                    }
                }
            }
            offset += u64::from(self.page_size);
        }
        info!(
            seen = report.seen,
            created = report.created,
            updated = report.updated,
            skipped = report.skipped,
            failed = report.failed,
            "identity backfill finished"
        );
        Ok(report)
    }
}
