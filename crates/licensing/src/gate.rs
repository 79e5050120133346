//! Per-tenant license gate.

use crate::authority::LicenseAuthority;
use crate::{LicenseFeature, LicenseStatus};
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use storefront_cache::{get_json, put_json, KeyValueStore};
use storefront_core::config::LicensingConfig;
use storefront_core::generation::GenerationGuard;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Cache entry: the last good authority answer and when it was received
/// (epoch milliseconds).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedLicense {
    pub data: LicenseStatus,
    pub timestamp: i64,
}

pub struct LicenseGate {
    tenant_id: Uuid,
    authority: Arc<dyn LicenseAuthority>,
    cache: Arc<dyn KeyValueStore>,
    cache_key: String,
    max_staleness: ChronoDuration,
    snapshot: RwLock<Option<LicenseStatus>>,
    generations: GenerationGuard,
}

impl LicenseGate {
    pub fn new(
        tenant_id: Uuid,
        authority: Arc<dyn LicenseAuthority>,
        cache: Arc<dyn KeyValueStore>,
        config: &LicensingConfig,
    ) -> Self {
        Self {
            tenant_id,
            authority,
            cache,
            cache_key: format!("{}:{}", config.cache_key, tenant_id),
            max_staleness: ChronoDuration::hours(config.max_staleness_hours),
            snapshot: RwLock::new(None),
            generations: GenerationGuard::new(),
        }
    }

    pub fn tenant_id(&self) -> Uuid {
        self.tenant_id
    }

    pub async fn check_license(&self) -> LicenseStatus {
        self.check_license_at(Utc::now()).await
    }

    /// Ask the authority, falling back to the cache. Never fails: the worst
    /// case is the fail-closed status.
    pub async fn check_license_at(&self, now: DateTime<Utc>) -> LicenseStatus {
        let ticket = self.generations.begin();

        let (status, fresh) = match self.authority.fetch(self.tenant_id).await {
            Ok(status) => {
                info!(
                    tenant_id = %self.tenant_id,
                    status = ?status.status,
                    plan = %status.plan,
                    "License refreshed"
                );
                metrics::counter!("license.refreshed").increment(1);
                (status, true)
            }
            Err(e) => {
                warn!(tenant_id = %self.tenant_id, error = %e, "License authority unavailable, checking cache");
                (self.fallback(now).await, false)
            }
        };

        if !self.generations.is_current(ticket) {
            debug!(tenant_id = %self.tenant_id, "Discarding superseded license check");
            return status;
        }
        *self.snapshot.write() = Some(status.clone());
        if fresh {
            let entry = CachedLicense {
                data: status.clone(),
                timestamp: now.timestamp_millis(),
            };
            if let Err(e) = put_json(self.cache.as_ref(), &self.cache_key, &entry).await {
                warn!(tenant_id = %self.tenant_id, error = %e, "License cache write failed");
            }
        }
        status
    }

    async fn fallback(&self, now: DateTime<Utc>) -> LicenseStatus {
        match get_json::<CachedLicense>(self.cache.as_ref(), &self.cache_key).await {
            Ok(Some(cached)) if now.timestamp_millis() - cached.timestamp < self.max_staleness.num_milliseconds() => {
                metrics::counter!("license.fallback.cache").increment(1);
                cached.data
            }
            Ok(Some(_)) => {
                warn!(tenant_id = %self.tenant_id, "Cached license too old, failing closed");
                self.fail_closed()
            }
            Ok(None) => {
                warn!(tenant_id = %self.tenant_id, "No cached license, failing closed");
                self.fail_closed()
            }
            Err(e) => {
                warn!(tenant_id = %self.tenant_id, error = %e, "License cache unreadable, failing closed");
                self.fail_closed()
            }
        }
    }

    fn fail_closed(&self) -> LicenseStatus {
        metrics::counter!("license.fail_closed").increment(1);
        LicenseStatus::fail_closed(self.tenant_id.to_string())
    }

    /// Last applied status, if any check has completed.
    pub fn snapshot(&self) -> Option<LicenseStatus> {
        self.snapshot.read().clone()
    }

    /// Pure lookup against the last snapshot; `false` before the first check.
    pub fn is_feature_enabled(&self, feature: LicenseFeature) -> bool {
        self.snapshot
            .read()
            .as_ref()
            .map(|s| s.features.is_enabled(feature))
            .unwrap_or(false)
    }

    pub fn is_blocked(&self) -> bool {
        self.snapshot
            .read()
            .as_ref()
            .map(LicenseStatus::is_blocked)
            .unwrap_or(false)
    }

    /// Re-check every `period`. The first tick fires one period from now; the
    /// caller does the initial check.
    pub fn spawn_refresh(self: &Arc<Self>, period: Duration) -> JoinHandle<()> {
        let gate = Arc::clone(self);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                gate.check_license().await;
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{LicenseError, LicenseFeatures, LicenseState};
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicBool, Ordering};
    use storefront_cache::LocalCache;

    fn active(plan: &str) -> LicenseStatus {
        LicenseStatus {
            status: LicenseState::Active,
            plan: plan.to_string(),
            days_remaining: 30,
            features: LicenseFeatures {
                cashback: true,
                ..Default::default()
            },
            tenant_id: "t".into(),
            tenant_name: "Farmavida".into(),
        }
    }

    /// Authority that can be switched off.
    struct Switchable {
        up: AtomicBool,
    }

    #[async_trait]
    impl LicenseAuthority for Switchable {
        async fn fetch(&self, _tenant_id: Uuid) -> Result<LicenseStatus, LicenseError> {
            if self.up.load(Ordering::SeqCst) {
                Ok(active("Pro"))
            } else {
                Err(LicenseError::Timeout)
            }
        }
    }

    fn gate_with(authority: Arc<dyn LicenseAuthority>, cache: Arc<LocalCache>) -> LicenseGate {
        LicenseGate::new(Uuid::new_v4(), authority, cache, &LicensingConfig::default())
    }

    #[tokio::test]
    async fn test_cache_is_trusted_within_window_then_fails_closed() {
        let authority = Arc::new(Switchable {
            up: AtomicBool::new(true),
        });
        let gate = gate_with(authority.clone(), Arc::new(LocalCache::new(3600, 100)));
        let t0 = Utc::now();

        let fresh = gate.check_license_at(t0).await;
        assert_eq!(fresh.status, LicenseState::Active);

        authority.up.store(false, Ordering::SeqCst);

        // Repeated checks inside the window return the same cached answer.
        let first = gate.check_license_at(t0 + ChronoDuration::hours(1)).await;
        let second = gate.check_license_at(t0 + ChronoDuration::hours(71)).await;
        assert_eq!(first, fresh);
        assert_eq!(second, fresh);
        assert!(gate.is_feature_enabled(LicenseFeature::Cashback));

        let expired = gate.check_license_at(t0 + ChronoDuration::hours(73)).await;
        assert!(expired.is_blocked());
        assert_eq!(expired.tenant_name, "Connection Error");
        assert!(gate.is_blocked());
        assert!(!gate.is_feature_enabled(LicenseFeature::Cashback));
    }

    #[tokio::test]
    async fn test_no_cache_fails_closed() {
        let authority = Arc::new(Switchable {
            up: AtomicBool::new(false),
        });
        let gate = gate_with(authority, Arc::new(LocalCache::new(3600, 100)));
        assert!(!gate.is_feature_enabled(LicenseFeature::Cashback));
        assert!(gate.check_license().await.is_blocked());
    }

    #[tokio::test]
    async fn test_cache_write_failure_does_not_change_result() {
        let authority = Arc::new(Switchable {
            up: AtomicBool::new(true),
        });
        // Zero capacity: every write is rejected.
        let gate = gate_with(authority, Arc::new(LocalCache::new(3600, 0)));
        let status = gate.check_license().await;
        assert_eq!(status.status, LicenseState::Active);
    }

    /// Authority answering from a script of (delay, plan) pairs.
    struct Scripted {
        script: tokio::sync::Mutex<VecDeque<(u64, &'static str)>>,
    }

    #[async_trait]
    impl LicenseAuthority for Scripted {
        async fn fetch(&self, _tenant_id: Uuid) -> Result<LicenseStatus, LicenseError> {
            let (delay, plan) = self
                .script
                .lock()
                .await
                .pop_front()
                .ok_or(LicenseError::Timeout)?;
            tokio::time::sleep(Duration::from_millis(delay)).await;
            Ok(active(plan))
        }
    }

    #[tokio::test]
    async fn test_superseded_check_is_not_applied() {
        let authority = Arc::new(Scripted {
            script: tokio::sync::Mutex::new(VecDeque::from([(80, "old"), (0, "new")])),
        });
        let cache = Arc::new(LocalCache::new(3600, 100));
        let gate = gate_with(authority, cache.clone());

        let slow = gate.check_license();
        let fast = async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            gate.check_license().await
        };
        let (slow_result, fast_result) = tokio::join!(slow, fast);

        assert_eq!(slow_result.plan, "old");
        assert_eq!(fast_result.plan, "new");
        assert_eq!(gate.snapshot().map(|s| s.plan).as_deref(), Some("new"));

        // The late answer must not replace the cached one either.
        let cached = get_json::<CachedLicense>(cache.as_ref(), &gate.cache_key)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(cached.data.plan, "new");
    }
}
