#![deny(warnings)]

//! Composition root for the fuel economy.
//!
//! [`FuelEconomy`] owns one instance of every service, wired to a durable and
//! a session store and a clock, and exposes the surface calculator forms and
//! the rewards screens talk to. Nothing here is global; tests build as many
//! independent economies as they like.

mod ad;
mod pending;

pub use ad::{AdCompletion, AdKind, AdModal, CloseAttempt};
pub use chance_games::{Reveal, ScratchBoard, SpinPlan};
pub use fuel_econ::{RewardDay, RewardStatus};
pub use pending::{AdPrompt, PendingResult, Resolution};

use chance_games::{ChanceError, ScratchCardGame, SpinWheel};
use chrono::NaiveDate;
use fuel_core::{
    validate_config, CalculationRecord, Clock, EconomyConfig, FeatureTier, GateOutcome,
    ValidationError,
};
use fuel_econ::{
    AdGatePolicy, ClaimError, ClaimOutcome, DailyRewardsEngine, FuelStore, RefuelLedger,
};
use persistence::{DurableStore, SessionStore};
use rand::Rng;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error, PartialEq)]
pub enum RuntimeError {
    #[error(transparent)]
    Config(#[from] ValidationError),
    #[error(transparent)]
    Claim(#[from] ClaimError),
    #[error(transparent)]
    Chance(#[from] ChanceError),
}

/// What a calculator should do with a finished calculation.
#[derive(Clone, Debug, PartialEq)]
pub enum CalculationGate {
    /// Reveal now.
    Show(CalculationRecord),
    /// Reveal now, with the one-time "out of fuel" toast.
    ShowWithToast(CalculationRecord),
    /// Some fuel left but not enough for this tool; offer to continue with ads.
    InsufficientFuel {
        needed: u32,
        available: u32,
        record: CalculationRecord,
    },
    /// Show the ad, then resume the pending result.
    WatchAd(AdPrompt),
}

/// Result of pressing "claim" on the daily rewards screen.
#[derive(Clone, Debug, PartialEq)]
pub enum DailyClaim {
    AlreadyClaimed,
    Granted { reward: u32, streak: u32 },
    /// Ad day: the reward is granted once the rewarded ad completes.
    WatchAd(AdPrompt),
}

pub struct FuelEconomy {
    cfg: EconomyConfig,
    clock: Arc<dyn Clock>,
    fuel: FuelStore,
    gate: AdGatePolicy,
    rewards: DailyRewardsEngine,
    refuel: RefuelLedger,
    scratch: ScratchCardGame,
    wheel: SpinWheel,
}

impl FuelEconomy {
    /// Validate `cfg` and wire every service to its storage namespace.
    pub fn new(
        cfg: EconomyConfig,
        durable: DurableStore,
        session: SessionStore,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, RuntimeError> {
        validate_config(&cfg)?;
        let fuel = FuelStore::load(durable.clone(), cfg.starting_fuel);
        let gate = AdGatePolicy::load(session, cfg.ad_frequency);
        let rewards = DailyRewardsEngine::load(durable.clone(), &cfg);
        let refuel = RefuelLedger::load(durable.clone());
        let scratch = ScratchCardGame::load(durable.clone(), &cfg);
        let wheel = SpinWheel::load(durable, &cfg);
        info!(fuel = fuel.balance(), "fuel economy ready");
        Ok(Self {
            cfg,
            clock,
            fuel,
            gate,
            rewards,
            refuel,
            scratch,
            wheel,
        })
    }

    pub fn config(&self) -> &EconomyConfig {
        &self.cfg
    }

    pub fn today(&self) -> NaiveDate {
        self.clock.today()
    }

    /// Current fuel balance.
    pub fn fuel(&self) -> u32 {
        self.fuel.balance()
    }

    /// Take `amount` if the balance covers it; never partial.
    pub fn consume_fuel(&mut self, amount: u32) -> bool {
        self.fuel.consume(amount)
    }

    pub fn add_fuel(&mut self, amount: u32) {
        self.fuel.add(amount)
    }

    pub fn set_fuel(&mut self, amount: i64) {
        self.fuel.set(amount)
    }

    /// Boolean gate for forms that run their own flow.
    pub fn should_show_ad(&mut self, is_premium: bool) -> bool {
        let fuel = self.fuel.balance();
        self.gate.should_show_ad(fuel, is_premium)
    }

    pub fn decide(&mut self, tier: FeatureTier) -> GateOutcome {
        let fuel = self.fuel.balance();
        self.gate
            .decide(fuel, self.cfg.cost_of(tier), tier.is_premium())
    }

    fn ad_prompt(&self, kind: AdKind, pending: PendingResult) -> AdPrompt {
        let duration = match kind {
            AdKind::Interstitial => self.cfg.interstitial_duration(),
            AdKind::Rewarded => self.cfg.rewarded_duration(),
        };
        AdPrompt {
            modal: AdModal::new(kind, duration),
            pending,
        }
    }

    /// Gate one finished calculation. Charges fuel when the balance covers
    /// the tool's cost.
    pub fn request_calculation(&mut self, record: CalculationRecord) -> CalculationGate {
        let cost = self.cfg.cost_of(record.tier);
        let available = self.fuel.balance();
        let outcome = self.gate.decide(available, cost, record.tier.is_premium());
        debug!(calculator = %record.calculator, ?outcome, available, cost, "calculation gated");
        match outcome {
            GateOutcome::ProceedFree if available > 0 => {
                if self.fuel.consume(cost) {
                    CalculationGate::Show(record)
                } else {
                    CalculationGate::InsufficientFuel {
                        needed: cost,
                        available,
                        record,
                    }
                }
            }
            GateOutcome::ProceedFree => CalculationGate::Show(record),
            GateOutcome::ProceedFreeToastFirst => CalculationGate::ShowWithToast(record),
            GateOutcome::ShowInterstitialThenProceed => CalculationGate::WatchAd(
                self.ad_prompt(AdKind::Interstitial, PendingResult::Calculation(record)),
            ),
            GateOutcome::RequireAdAlways => CalculationGate::WatchAd(
                self.ad_prompt(AdKind::Rewarded, PendingResult::Calculation(record)),
            ),
        }
    }

    /// "Continue anyway": drop the leftover fuel and go ad-supported.
    pub fn continue_ad_supported(&mut self, record: CalculationRecord) -> CalculationGate {
        info!(dropped = self.fuel.balance(), "continuing ad-supported");
        self.fuel.set(0);
        self.request_calculation(record)
    }

    /// Commit or discard a pending result once its modal has closed.
    pub fn resume(
        &mut self,
        pending: PendingResult,
        completion: AdCompletion,
    ) -> Result<Resolution, RuntimeError> {
        if !completion.commits() {
            info!(?completion, "pending result discarded");
            return Ok(Resolution::Discarded);
        }
        match pending {
            PendingResult::Calculation(record) => Ok(Resolution::Calculation(record)),
            PendingResult::DailyReward(ticket) => {
                let reward = self.rewards.commit_claim(&ticket, &mut self.fuel)?;
                Ok(Resolution::DailyReward {
                    reward,
                    streak: ticket.new_streak,
                })
            }
            PendingResult::ChanceGame(plan) => {
                let prize = self.wheel.complete(plan, &mut self.fuel)?;
                Ok(Resolution::Spin { prize })
            }
            PendingResult::Refuel => {
                let granted = self.refuel.complete(&self.cfg, &mut self.fuel);
                Ok(Resolution::Refuel { granted })
            }
        }
    }

    /// Weekly calendar and claimability for today.
    pub fn daily_status(&self) -> RewardStatus {
        self.rewards.status(self.clock.today())
    }

    pub fn claim_daily(&mut self) -> DailyClaim {
        let today = self.clock.today();
        match self.rewards.claim(today, &mut self.fuel) {
            ClaimOutcome::AlreadyClaimed => DailyClaim::AlreadyClaimed,
            ClaimOutcome::Granted { reward, streak } => DailyClaim::Granted { reward, streak },
            ClaimOutcome::AdRequired(ticket) => DailyClaim::WatchAd(
                self.ad_prompt(AdKind::Rewarded, PendingResult::DailyReward(ticket)),
            ),
        }
    }

    pub fn next_refuel_grant(&self) -> u32 {
        self.refuel.next_grant(&self.cfg)
    }

    /// Rewarded ad that tops up fuel when watched to the end.
    pub fn start_refuel(&self) -> AdPrompt {
        self.ad_prompt(AdKind::Rewarded, PendingResult::Refuel)
    }

    pub fn scratch_available(&self) -> bool {
        self.scratch.can_play(self.clock.today())
    }

    pub fn open_scratch_card<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
    ) -> Result<ScratchBoard, RuntimeError> {
        Ok(self.scratch.open(self.clock.today(), rng)?)
    }

    pub fn scratch(&mut self, board: &mut ScratchBoard, cell: usize) -> Result<Reveal, RuntimeError> {
        Ok(self.scratch.reveal(board, cell, &mut self.fuel)?)
    }

    pub fn wheel_available(&self) -> bool {
        self.wheel.can_play(self.clock.today())
    }

    pub fn wheel_prizes(&self) -> &[u32] {
        self.wheel.prizes()
    }

    /// Draw a spin. Hold the plan through the animation, then
    /// [`FuelEconomy::finish_spin`]. Waiting out `settle_after` is up to the
    /// caller; nothing here sleeps.
    pub fn spin_wheel<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<SpinPlan, RuntimeError> {
        Ok(self.wheel.spin(self.clock.today(), rng)?)
    }

    pub fn finish_spin(&mut self, plan: SpinPlan) -> Result<u32, RuntimeError> {
        Ok(self.wheel.complete(plan, &mut self.fuel)?)
    }
}
