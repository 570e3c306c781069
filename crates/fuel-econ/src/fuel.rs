use persistence::{keys, load_u32, save_u32, DurableStore};
use tracing::{debug, warn};

/// Persisted calculation fuel balance.
///
/// The balance is cached in memory and written through on every mutation.
/// When storage is unavailable the cached value keeps the session going.
pub struct FuelStore {
    store: DurableStore,
    balance: u32,
}

impl FuelStore {
    /// Load the balance, falling back to `starting` (and writing it back) when
    /// nothing usable is stored.
    pub fn load(store: DurableStore, starting: u32) -> Self {
        let loaded = load_u32(&*store, keys::CALCULATION_FUEL);
        let balance = match loaded {
            Ok(Some(v)) => return Self { store, balance: v },
            Ok(None) => starting,
            Err(e) => {
                warn!(error = %e, "fuel unreadable, resetting to starting balance");
                starting
            }
        };
        let fuel = Self { store, balance };
        fuel.persist();
        fuel
    }

    pub fn balance(&self) -> u32 {
        self.balance
    }

    /// Take `amount` if the whole amount is available. Never partial.
    pub fn consume(&mut self, amount: u32) -> bool {
        if self.balance < amount {
            debug!(balance = self.balance, amount, "insufficient fuel");
            return false;
        }
        self.balance -= amount;
        self.persist();
        true
    }

    pub fn add(&mut self, amount: u32) {
        self.balance = self.balance.saturating_add(amount);
        self.persist();
    }

    /// Overwrite the balance. Negative input clamps to zero.
    pub fn set(&mut self, amount: i64) {
        self.balance = amount.clamp(0, i64::from(u32::MAX)) as u32;
        self.persist();
    }

    fn persist(&self) {
        if let Err(e) = save_u32(&*self.store, keys::CALCULATION_FUEL, self.balance) {
            warn!(error = %e, balance = self.balance, "failed to persist fuel");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::UnavailableStore;
    use persistence::MemoryStore;
    use proptest::prelude::*;
    use std::sync::Arc;

    fn fresh() -> (MemoryStore, FuelStore) {
        let mem = MemoryStore::new();
        let fuel = FuelStore::load(DurableStore::new(Arc::new(mem.clone())), 5);
        (mem, fuel)
    }

    #[test]
    fn first_run_persists_starting_balance() {
        let (mem, fuel) = fresh();
        assert_eq!(fuel.balance(), 5);
        assert_eq!(load_u32(&mem, keys::CALCULATION_FUEL).unwrap(), Some(5));
    }

    #[test]
    fn consume_two_of_five() {
        let (mem, mut fuel) = fresh();
        assert!(fuel.consume(2));
        assert_eq!(fuel.balance(), 3);
        assert_eq!(load_u32(&mem, keys::CALCULATION_FUEL).unwrap(), Some(3));
    }

    #[test]
    fn corrupt_balance_falls_back() {
        let mem = MemoryStore::new();
        persistence::KeyValueStore::set(&mem, keys::CALCULATION_FUEL, "NaN").unwrap();
        let fuel = FuelStore::load(DurableStore::new(Arc::new(mem.clone())), 5);
        assert_eq!(fuel.balance(), 5);
        assert_eq!(load_u32(&mem, keys::CALCULATION_FUEL).unwrap(), Some(5));
    }

    #[test]
    fn stored_balance_wins_over_default() {
        let mem = MemoryStore::new();
        save_u32(&mem, keys::CALCULATION_FUEL, 0).unwrap();
        let fuel = FuelStore::load(DurableStore::new(Arc::new(mem)), 5);
        assert_eq!(fuel.balance(), 0);
    }

    #[test]
    fn set_clamps_negative() {
        let (_, mut fuel) = fresh();
        fuel.set(-4);
        assert_eq!(fuel.balance(), 0);
        fuel.set(12);
        assert_eq!(fuel.balance(), 12);
    }

    #[test]
    fn unavailable_storage_keeps_session_in_memory() {
        let mut fuel = FuelStore::load(DurableStore::new(Arc::new(UnavailableStore)), 5);
        assert_eq!(fuel.balance(), 5);
        assert!(fuel.consume(1));
        fuel.add(3);
        assert_eq!(fuel.balance(), 7);
    }

    #[derive(Debug, Clone)]
    enum Op {
        Consume(u32),
        Add(u32),
        Set(i64),
    }

    fn op() -> impl Strategy<Value = Op> {
        prop_oneof![
            (1u32..20).prop_map(Op::Consume),
            (1u32..20).prop_map(Op::Add),
            (-50i64..50).prop_map(Op::Set),
        ]
    }

    proptest! {
        #[test]
        fn balance_tracks_reference_model(ops in proptest::collection::vec(op(), 0..64)) {
            let (mem, mut fuel) = fresh();
            let mut model: i64 = 5;
            for op in ops {
                match op {
                    Op::Consume(n) => {
                        let ok = fuel.consume(n);
                        prop_assert_eq!(ok, model >= i64::from(n));
                        if ok { model -= i64::from(n); }
                    }
                    Op::Add(n) => { fuel.add(n); model += i64::from(n); }
                    Op::Set(n) => { fuel.set(n); model = n.max(0); }
                }
                prop_assert!(model >= 0);
                prop_assert_eq!(i64::from(fuel.balance()), model);
            }
            prop_assert_eq!(load_u32(&mem, keys::CALCULATION_FUEL).unwrap(), Some(fuel.balance()));
        }

        #[test]
        fn failed_consume_leaves_balance(start in 0u32..10, extra in 1u32..10) {
            let (_, mut fuel) = fresh();
            fuel.set(i64::from(start));
            prop_assert!(!fuel.consume(start + extra));
            prop_assert_eq!(fuel.balance(), start);
        }
    }
}
