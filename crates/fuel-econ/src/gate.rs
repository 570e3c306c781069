use fuel_core::GateOutcome;
use persistence::{keys, load_bool, load_u32, save_bool, save_u32, SessionStore};
use tracing::{debug, warn};

/// Decides, per calculation action, whether an ad runs.
///
/// Holds the session-scoped free-action counter and the one-time toast flag.
/// Fuel is read, never written: callers consume fuel themselves.
pub struct AdGatePolicy {
    session: SessionStore,
    ad_frequency: u32,
    free_ad_counter: u32,
    has_shown_toast: bool,
}

impl AdGatePolicy {
    /// Restore session state. Unreadable or out-of-range values start over.
    pub fn load(session: SessionStore, ad_frequency: u32) -> Self {
        let ad_frequency = ad_frequency.max(1);
        let free_ad_counter = match load_u32(&*session, keys::AD_CALCULATION_COUNT) {
            Ok(Some(n)) if n < ad_frequency => n,
            Ok(Some(n)) => {
                warn!(counter = n, "ad counter out of range, resetting");
                0
            }
            Ok(None) => 0,
            Err(e) => {
                warn!(error = %e, "ad counter unreadable, resetting");
                0
            }
        };
        let has_shown_toast = match load_bool(&*session, keys::HAS_SEEN_OUT_OF_FUEL_MESSAGE) {
            Ok(flag) => flag.unwrap_or(false),
            Err(e) => {
                warn!(error = %e, "toast flag unreadable, resetting");
                false
            }
        };
        Self {
            session,
            ad_frequency,
            free_ad_counter,
            has_shown_toast,
        }
    }

    pub fn free_ad_counter(&self) -> u32 {
        self.free_ad_counter
    }

    pub fn has_shown_toast(&self) -> bool {
        self.has_shown_toast
    }

    /// Record that the out-of-fuel toast was already shown this session.
    pub fn mark_toast_shown(&mut self) {
        self.has_shown_toast = true;
        self.persist_toast();
    }

    /// Decide for one action. `cost` is informational only.
    pub fn decide(&mut self, current_fuel: u32, cost: u32, is_premium: bool) -> GateOutcome {
        let outcome = if current_fuel > 0 {
            if self.free_ad_counter != 0 {
                self.free_ad_counter = 0;
                self.persist_counter();
            }
            GateOutcome::ProceedFree
        } else if !self.has_shown_toast {
            self.mark_toast_shown();
            GateOutcome::ProceedFreeToastFirst
        } else if is_premium {
            GateOutcome::RequireAdAlways
        } else {
            self.free_ad_counter += 1;
            if self.free_ad_counter >= self.ad_frequency {
                self.free_ad_counter = 0;
                self.persist_counter();
                GateOutcome::ShowInterstitialThenProceed
            } else {
                self.persist_counter();
                GateOutcome::ProceedFree
            }
        };
        debug!(
            current_fuel,
            cost,
            is_premium,
            counter = self.free_ad_counter,
            ?outcome,
            "ad gate decision"
        );
        outcome
    }

    /// Collapsed view for calculator forms: true when an ad must run.
    pub fn should_show_ad(&mut self, current_fuel: u32, is_premium: bool) -> bool {
        self.decide(current_fuel, 0, is_premium).shows_ad()
    }

    fn persist_counter(&self) {
        if let Err(e) = save_u32(&*self.session, keys::AD_CALCULATION_COUNT, self.free_ad_counter) {
            warn!(error = %e, "failed to persist ad counter");
        }
    }

    fn persist_toast(&self) {
        if let Err(e) = save_bool(
            &*self.session,
            keys::HAS_SEEN_OUT_OF_FUEL_MESSAGE,
            self.has_shown_toast,
        ) {
            warn!(error = %e, "failed to persist toast flag");
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

    fn policy() -> (MemoryStore, AdGatePolicy) {
        let mem = MemoryStore::new();
        let gate = AdGatePolicy::load(SessionStore::new(Arc::new(mem.clone())), 3);
        (mem, gate)
    }

    fn out_of_fuel_policy() -> (MemoryStore, AdGatePolicy) {
        let (mem, mut gate) = policy();
        gate.mark_toast_shown();
        (mem, gate)
    }

    #[test]
    fn first_empty_action_gets_toast_instead_of_ad() {
        let (mem, mut gate) = policy();
        assert_eq!(gate.decide(0, 1, false), GateOutcome::ProceedFreeToastFirst);
        assert!(gate.has_shown_toast());
        assert_eq!(
            load_bool(&mem, keys::HAS_SEEN_OUT_OF_FUEL_MESSAGE).unwrap(),
            Some(true)
        );
        assert_eq!(gate.free_ad_counter(), 0);
    }

    #[test]
    fn toast_first_applies_to_premium_too() {
        let (_, mut gate) = policy();
        assert_eq!(gate.decide(0, 2, true), GateOutcome::ProceedFreeToastFirst);
        assert_eq!(gate.decide(0, 2, true), GateOutcome::RequireAdAlways);
    }

    #[test]
    fn free_tool_cadence_has_period_three() {
        let (mem, mut gate) = out_of_fuel_policy();
        let seen: Vec<bool> = (0..6).map(|_| gate.should_show_ad(0, false)).collect();
        assert_eq!(seen, vec![false, false, true, false, false, true]);
        assert_eq!(gate.free_ad_counter(), 0);
        assert_eq!(load_u32(&mem, keys::AD_CALCULATION_COUNT).unwrap(), Some(0));
    }

    #[test]
    fn counter_is_persisted_between_actions() {
        let (mem, mut gate) = out_of_fuel_policy();
        assert_eq!(gate.decide(0, 1, false), GateOutcome::ProceedFree);
        assert_eq!(load_u32(&mem, keys::AD_CALCULATION_COUNT).unwrap(), Some(1));
        let mut reloaded = AdGatePolicy::load(SessionStore::new(Arc::new(mem)), 3);
        assert_eq!(reloaded.free_ad_counter(), 1);
        assert!(reloaded.has_shown_toast());
        assert_eq!(reloaded.decide(0, 1, false), GateOutcome::ProceedFree);
        assert_eq!(
            reloaded.decide(0, 1, false),
            GateOutcome::ShowInterstitialThenProceed
        );
    }

    #[test]
    fn refuelling_resets_counter() {
        let (mem, mut gate) = out_of_fuel_policy();
        gate.decide(0, 1, false);
        gate.decide(0, 1, false);
        assert_eq!(gate.free_ad_counter(), 2);
        assert_eq!(gate.decide(4, 1, false), GateOutcome::ProceedFree);
        assert_eq!(gate.free_ad_counter(), 0);
        assert_eq!(load_u32(&mem, keys::AD_CALCULATION_COUNT).unwrap(), Some(0));
    }

    #[test]
    fn out_of_range_counter_resets() {
        let mem = MemoryStore::new();
        save_u32(&mem, keys::AD_CALCULATION_COUNT, 7).unwrap();
        let gate = AdGatePolicy::load(SessionStore::new(Arc::new(mem)), 3);
        assert_eq!(gate.free_ad_counter(), 0);
    }

    #[test]
    fn unavailable_session_storage_still_decides() {
        let mut gate = AdGatePolicy::load(SessionStore::new(Arc::new(UnavailableStore)), 3);
        assert_eq!(gate.decide(0, 1, false), GateOutcome::ProceedFreeToastFirst);
        assert_eq!(gate.decide(0, 1, false), GateOutcome::ProceedFree);
    }

    proptest! {
        #[test]
        fn fuel_always_suppresses_ads(
            fuel in 1u32..1000,
            cost in 0u32..5,
            premium in any::<bool>(),
            warmup in 0usize..3,
        ) {
            let (_, mut gate) = out_of_fuel_policy();
            for _ in 0..warmup {
                gate.decide(0, 1, false);
            }
            prop_assert_eq!(gate.decide(fuel, cost, premium), GateOutcome::ProceedFree);
            prop_assert_eq!(gate.free_ad_counter(), 0);
        }

        #[test]
        fn premium_without_fuel_always_needs_ad(calls in 1usize..50) {
            let (_, mut gate) = out_of_fuel_policy();
            for _ in 0..calls {
                prop_assert_eq!(gate.decide(0, 2, true), GateOutcome::RequireAdAlways);
            }
            prop_assert_eq!(gate.free_ad_counter(), 0);
        }

        #[test]
        fn cadence_holds_for_any_length(calls in 1usize..100) {
            let (_, mut gate) = out_of_fuel_policy();
            for i in 1..=calls {
                let expected = if i % 3 == 0 {
                    GateOutcome::ShowInterstitialThenProceed
                } else {
                    GateOutcome::ProceedFree
                };
                prop_assert_eq!(gate.decide(0, 1, false), expected);
                prop_assert!(gate.free_ad_counter() < 3);
            }
        }
    }
}
