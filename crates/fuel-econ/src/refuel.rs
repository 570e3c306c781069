use crate::FuelStore;
use fuel_core::EconomyConfig;
use persistence::{keys, load_u32, save_u32, DurableStore};
use tracing::{info, warn};

/// Counts completed "refuel via ad" flows; early refuels pay more.
pub struct RefuelLedger {
    store: DurableStore,
    count: u32,
}

impl RefuelLedger {
    pub fn load(store: DurableStore) -> Self {
        let count = match load_u32(&*store, keys::REFUEL_COUNT) {
            Ok(n) => n.unwrap_or(0),
            Err(e) => {
                warn!(error = %e, "refuel count unreadable, starting over");
                0
            }
        };
        Self { store, count }
    }

    pub fn count(&self) -> u32 {
        self.count
    }

    /// Fuel the next completed refuel will grant.
    pub fn next_grant(&self, cfg: &EconomyConfig) -> u32 {
        cfg.refuel_grant(self.count)
    }

    /// Grant fuel for a rewarded ad watched to the end.
    pub fn complete(&mut self, cfg: &EconomyConfig, fuel: &mut FuelStore) -> u32 {
        let grant = self.next_grant(cfg);
        fuel.add(grant);
        self.count = self.count.saturating_add(1);
        if let Err(e) = save_u32(&*self.store, keys::REFUEL_COUNT, self.count) {
            warn!(error = %e, "failed to persist refuel count");
        }
        info!(grant, refuels = self.count, "refuel completed");
        grant
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use persistence::MemoryStore;
    use std::sync::Arc;

    #[test]
    fn boosted_refuels_then_regular() {
        let mem = MemoryStore::new();
        let durable = DurableStore::new(Arc::new(mem.clone()));
        let cfg = EconomyConfig::default();
        let mut fuel = FuelStore::load(durable.clone(), 0);
        let mut ledger = RefuelLedger::load(durable.clone());
        let grants: Vec<u32> = (0..5).map(|_| ledger.complete(&cfg, &mut fuel)).collect();
        assert_eq!(grants, vec![5, 5, 5, 3, 3]);
        assert_eq!(fuel.balance(), 21);
        assert_eq!(load_u32(&mem, keys::REFUEL_COUNT).unwrap(), Some(5));
        assert_eq!(RefuelLedger::load(durable).count(), 5);
    }
}
