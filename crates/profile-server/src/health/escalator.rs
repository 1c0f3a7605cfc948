//! [`HealthEscalator`]: shared, monotonic-until-reset status register.

use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{info, warn};

use super::HealthStatus;

/// Worst-observed health status for the process.
///
/// Wraps an `Arc<RwLock<HealthStatus>>` so that:
/// - Liveness probes read under the shared lock without blocking each other.
/// - Escalations and resets are serialised under the exclusive lock; each is a
///   single compare-and-set or unconditional write.
#[derive(Clone, Debug, Default)]
pub struct HealthEscalator {
    inner: Arc<RwLock<HealthStatus>>,
}

impl HealthEscalator {
    /// Create a new escalator at [`HealthStatus::Healthy`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Current status.
    pub async fn get(&self) -> HealthStatus {
        *self.inner.read().await
    }

    /// Escalate to `status` if it is more severe than the current one.
    ///
    /// Lower or equal severities are ignored. Returns `true` when the stored
    /// status changed.
    pub async fn raise(&self, status: HealthStatus) -> bool {
        let mut current = self.inner.write().await;
        if status <= *current {
            return false;
        }
        let previous = *current;
        *current = status;
        warn!(from = %previous, to = %status, "health status escalated");
        true
    }

    /// Force the status back to [`HealthStatus::Healthy`], bypassing the
    /// escalation check. Administrative use only.
    pub async fn reset(&self) {
        let mut current = self.inner.write().await;
        let previous = *current;
        *current = HealthStatus::Healthy;
        info!(from = %previous, "health status reset");
    }
}
