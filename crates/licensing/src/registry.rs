//! One [`LicenseGate`] per tenant, created on first use.

use crate::authority::LicenseAuthority;
use crate::gate::LicenseGate;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;
use storefront_cache::KeyValueStore;
use storefront_core::config::LicensingConfig;
use tokio::task::JoinHandle;
use tracing::info;
use uuid::Uuid;

pub struct LicenseRegistry {
    gates: DashMap<Uuid, Arc<LicenseGate>>,
    refreshers: DashMap<Uuid, JoinHandle<()>>,
    authority: Arc<dyn LicenseAuthority>,
    cache: Arc<dyn KeyValueStore>,
    config: LicensingConfig,
    background_refresh: bool,
}

impl LicenseRegistry {
    pub fn new(
        authority: Arc<dyn LicenseAuthority>,
        cache: Arc<dyn KeyValueStore>,
        config: LicensingConfig,
    ) -> Self {
        Self {
            gates: DashMap::new(),
            refreshers: DashMap::new(),
            authority,
            cache,
            config,
            background_refresh: true,
        }
    }

    /// Disable the periodic refresh task (tests, one-shot tools).
    pub fn without_background_refresh(mut self) -> Self {
        self.background_refresh = false;
        self
    }

    /// Gate for `tenant_id`. A new gate checks the authority once before it is
    /// returned and then refreshes on the configured interval.
    pub async fn gate_for(&self, tenant_id: Uuid) -> Arc<LicenseGate> {
        if let Some(gate) = self.gates.get(&tenant_id) {
            return Arc::clone(gate.value());
        }

        let gate = match self.gates.entry(tenant_id) {
            Entry::Occupied(existing) => return Arc::clone(existing.get()),
            Entry::Vacant(slot) => {
                let gate = Arc::new(LicenseGate::new(
                    tenant_id,
                    Arc::clone(&self.authority),
                    Arc::clone(&self.cache),
                    &self.config,
                ));
                slot.insert(Arc::clone(&gate));
                gate
            }
        };

        gate.check_license().await;
        if self.background_refresh {
            let period = Duration::from_secs(self.config.refresh_interval_secs.max(1));
            self.refreshers.insert(tenant_id, gate.spawn_refresh(period));
        }
        info!(tenant_id = %tenant_id, "License gate created");
        gate
    }

    pub fn len(&self) -> usize {
        self.gates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.gates.is_empty()
    }

    /// Stop every refresh task.
    pub fn shutdown(&self) {
        for entry in self.refreshers.iter() {
            entry.value().abort();
        }
        self.refreshers.clear();
    }
}

impl Drop for LicenseRegistry {
    fn drop(&mut self) {
        self.shutdown();
    }
}
