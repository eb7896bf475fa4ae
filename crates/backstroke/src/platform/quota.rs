//! Block until the hosting platform has rate limit quota left.

use std::time::Duration;

use tracing::{debug, info, warn};

use super::errors::Result;
use super::types::HostingClient;

/// Polls remaining quota and sleeps while it is exhausted.
///
/// There is no cap on how long the gate waits; it relies on the platform
/// resetting the quota window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuotaGate {
    poll_interval: Duration,
    enabled: bool,
}

impl QuotaGate {
    pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

    pub fn new(poll_interval: Duration) -> Self {
        Self {
            poll_interval,
            enabled: true,
        }
    }

    /// A gate that never checks quota.
    pub fn disabled() -> Self {
        Self {
            poll_interval: Self::DEFAULT_POLL_INTERVAL,
            enabled: false,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Return once `client` reports a non-zero remaining quota.
    ///
    /// # Errors
    /// A failing quota check is returned as-is; it is not retried here.
    pub async fn wait<C>(&self, client: &C) -> Result<()>
    where
        C: HostingClient + ?Sized,
    {
        if !self.enabled {
            return Ok(());
        }

        let mut polls: u32 = 0;
        loop {
            let remaining = client.remaining_quota().await?;
            if remaining > 0 {
                if polls > 0 {
                    info!(remaining, polls, "rate limit quota available again");
                }
                return Ok(());
            }

            if polls == 0 {
                warn!(
                    poll_ms = self.poll_interval.as_millis() as u64,
                    "rate limit quota exhausted, waiting for reset"
                );
            } else {
                debug!(polls, "rate limit quota still exhausted");
            }
            polls = polls.saturating_add(1);
            tokio::time::sleep(self.poll_interval).await;
        }
    }
}

impl Default for QuotaGate {
    fn default() -> Self {
        Self::new(Self::DEFAULT_POLL_INTERVAL)
    }
}
