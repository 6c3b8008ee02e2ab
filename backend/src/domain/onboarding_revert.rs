//! Bulk undo of the onboarding write-back, for development environments.
//!
//! Every provider account loses its stored local id and its onboarding flag,
//! so the next session token sends the user through onboarding again. Local
//! users are left alone.

use std::sync::Arc;

use tracing::{info, warn};

use crate::domain::ports::{IdentityProvider, IdentityProviderError};

/// Counts reported at the end of a revert run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RevertReport {
    pub seen: u64,
    pub reverted: u64,
    pub failed: u64,
}

pub struct OnboardingRevert<I> {
    idp: Arc<I>,
    page_size: u32,
}

impl<I> OnboardingRevert<I> {
    pub const DEFAULT_PAGE_SIZE: u32 = 100;

    pub fn new(idp: Arc<I>) -> Self {
        Self {
            idp,
            page_size: Self::DEFAULT_PAGE_SIZE,
        }
    }

    #[must_use]
    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size.max(1);
        self
    }
}

impl<I> OnboardingRevert<I>
where
    I: IdentityProvider,
{
    /// Revert every account, including ones that were never mirrored.
    ///
    /// A failed revert is counted and the run continues. A listing failure
    /// aborts it.
    pub async fn run(&self) -> Result<RevertReport, IdentityProviderError> {
        let mut report = RevertReport::default();
        let mut offset = 0_u64;
        loop {
            let page = self.idp.list_users(offset, self.page_size).await?;
            if page.is_exhausted() {
                break;
            }
            for external_id in page.external_ids() {
                report.seen += 1;
                match self.idp.revert_onboarding(external_id).await {
                    Ok(()) => report.reverted += 1,
                    Err(error) => {
                        warn!(%external_id, %error, "could not revert onboarding");
                        report.failed += 1;
                    }
                }
            }
            offset += u64::from(self.page_size);
        }
        info!(
            seen = report.seen,
            reverted = report.reverted,
            failed = report.failed,
            "onboarding revert finished"
        );
        Ok(report)
    }
}
