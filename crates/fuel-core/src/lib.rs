#![deny(warnings)]

//! Core domain models and invariants for the calculation fuel economy.
//!
//! This crate defines the serializable types shared by the fuel store, the ad
//! gate, the daily rewards engine and the chance games, together with the
//! tunable [`EconomyConfig`] and validation helpers that guard its invariants.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::Mutex;
use std::time::Duration;
use thiserror::Error;

/// Balance granted on first run and whenever persisted fuel is unusable.
pub const STARTING_FUEL: u32 = 5;
/// Free-tool actions per interstitial while out of fuel.
pub const AD_FREQUENCY: u32 = 3;
/// Fuel granted per streak day, indexed by `(streak - 1) % len`.
pub const DAILY_REWARDS: [u32; 7] = [1, 1, 2, 3, 2, 3, 5];
/// Streak days that require a rewarded ad before the fuel is granted.
pub const AD_DAYS: [u32; 2] = [4, 7];
/// Prize wheel segments, clockwise from the pointer at rotation 0.
pub const WHEEL_PRIZES: [u32; 6] = [1, 2, 5, 1, 2, 10];
/// Prize values a scratch card can embed.
pub const SCRATCH_PRIZES: [u32; 5] = [1, 2, 3, 5, 10];
/// Cells on a scratch card (3x3).
pub const SCRATCH_CELLS: usize = 9;
/// Matching cells needed to win a scratch card.
pub const SCRATCH_MATCH: usize = 3;

/// Whether a calculator is a regular tool or an expert/premium one.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum FeatureTier {
    /// Regular calculator, one fuel per action.
    #[default]
    Standard,
    /// Expert calculator, premium cost and always ad-gated when out of fuel.
    Premium,
}

impl FeatureTier {
    pub fn is_premium(self) -> bool {
        matches!(self, FeatureTier::Premium)
    }
}

/// Decision returned by the ad gate for one calculation action.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum GateOutcome {
    /// No ad; the calculation proceeds.
    ProceedFree,
    /// No ad this once; the "out of fuel" toast is shown instead.
    ProceedFreeToastFirst,
    /// Free tool hit the ad cadence: interstitial, then the result.
    ShowInterstitialThenProceed,
    /// Premium tool with no fuel: every action requires an ad.
    RequireAdAlways,
}

impl GateOutcome {
    /// Boolean view used by calculator forms: does an ad have to run?
    pub fn shows_ad(self) -> bool {
        matches!(
            self,
            GateOutcome::ShowInterstitialThenProceed | GateOutcome::RequireAdAlways
        )
    }
}

/// Persisted streak state, stored as `{streak, lastClaimedDate}`.
///
/// `streak == 0` with no date means nothing was ever claimed.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyRewardState {
    pub streak: u32,
    pub last_claimed_date: Option<NaiveDate>,
}

/// The two once-per-day chance games.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChanceGameKind {
    ScratchCard,
    Wheel,
}

/// A finished calculation held back until its ad resolves.
///
/// `inputs` and `result` are plain data objects handed to the history,
/// explanation and export collaborators unchanged.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CalculationRecord {
    /// Calculator identifier, e.g. "emi".
    pub calculator: String,
    pub tier: FeatureTier,
    pub inputs: serde_json::Value,
    pub result: serde_json::Value,
}

/// Tunable parameters of the economy. Every field has a default so partial
/// YAML files are accepted.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EconomyConfig {
    /// Balance on first run.
    pub starting_fuel: u32,
    /// Free-tool actions per interstitial while out of fuel.
    pub ad_frequency: u32,
    /// Fuel per standard calculation.
    pub standard_cost: u32,
    /// Fuel per premium calculation.
    pub premium_cost: u32,
    /// Streak reward table.
    pub daily_rewards: Vec<u32>,
    /// Streak values gated behind a rewarded ad.
    pub ad_days: Vec<u32>,
    /// Wheel segments.
    pub wheel_prizes: Vec<u32>,
    /// Fraction of a segment's width the landing offset may span, in [0, 1).
    pub wheel_jitter_frac: f32,
    /// Full turns before the wheel settles.
    pub wheel_min_turns: u32,
    /// Animation time before a spin's prize is granted.
    pub spin_settle_ms: u64,
    /// Scratch card prize table.
    pub scratch_prizes: Vec<u32>,
    /// Interstitial length.
    pub interstitial_secs: u64,
    /// Rewarded ad length.
    pub rewarded_secs: u64,
    /// Fuel per refuel once the boost is used up.
    pub refuel_amount: u32,
    /// Fuel per refuel while boosted.
    pub refuel_boosted_amount: u32,
    /// Number of boosted refuels.
    pub refuel_boosted_uses: u32,
}

impl Default for EconomyConfig {
    fn default() -> Self {
        Self {
            starting_fuel: STARTING_FUEL,
            ad_frequency: AD_FREQUENCY,
            standard_cost: 1,
            premium_cost: 2,
            daily_rewards: DAILY_REWARDS.to_vec(),
            ad_days: AD_DAYS.to_vec(),
            wheel_prizes: WHEEL_PRIZES.to_vec(),
            wheel_jitter_frac: 0.8,
            wheel_min_turns: 5,
            spin_settle_ms: 4000,
            scratch_prizes: SCRATCH_PRIZES.to_vec(),
            interstitial_secs: 5,
            rewarded_secs: 15,
            refuel_amount: 3,
            refuel_boosted_amount: 5,
            refuel_boosted_uses: 3,
        }
    }
}

impl EconomyConfig {
    /// Fuel charged for one action on a tool of the given tier.
    pub fn cost_of(&self, tier: FeatureTier) -> u32 {
        match tier {
            FeatureTier::Standard => self.standard_cost,
            FeatureTier::Premium => self.premium_cost,
        }
    }

    pub fn interstitial_duration(&self) -> Duration {
        Duration::from_secs(self.interstitial_secs)
    }

    pub fn rewarded_duration(&self) -> Duration {
        Duration::from_secs(self.rewarded_secs)
    }

    pub fn spin_settle_delay(&self) -> Duration {
        Duration::from_millis(self.spin_settle_ms)
    }

    /// Fuel granted by a refuel given how many refuels came before it.
    pub fn refuel_grant(&self, previous_refuels: u32) -> u32 {
        if previous_refuels < self.refuel_boosted_uses {
            self.refuel_boosted_amount
        } else {
            self.refuel_amount
        }
    }
}

/// Validation errors for domain invariants.
#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    /// A prize or reward table has no entries.
    #[error("{0} table is empty")]
    EmptyTable(&'static str),
    /// A prize or reward of zero fuel.
    #[error("{0} table contains a zero prize")]
    ZeroPrize(&'static str),
    /// Ad cadence must be at least one action.
    #[error("ad frequency must be > 0")]
    ZeroAdFrequency,
    /// Costs must be positive and premium must not undercut standard.
    #[error("invalid costs: standard {standard}, premium {premium}")]
    InvalidCost { standard: u32, premium: u32 },
    /// Ad day outside the streak cycle.
    #[error("ad day {0} is outside the reward cycle")]
    AdDayOutOfRange(u32),
    /// Wheel jitter must be a fraction in [0, 1).
    #[error("wheel jitter fraction {0} is outside [0, 1)")]
    InvalidJitter(f32),
    /// Scratch table cannot guarantee a unique winner.
    #[error("scratch table needs at least 4 distinct prizes, found {0}")]
    ScratchTableTooSmall(usize),
    /// Ad durations must be positive.
    #[error("ad duration must be > 0")]
    ZeroAdDuration,
    /// Streak outside the reward cycle.
    #[error("streak {0} is outside the reward cycle")]
    StreakOutOfRange(u32),
    /// A claimed date without a streak, or a streak without a date.
    #[error("streak and last claimed date disagree")]
    InconsistentStreak,
}

fn validate_table(name: &'static str, table: &[u32]) -> Result<(), ValidationError> {
    if table.is_empty() {
        return Err(ValidationError::EmptyTable(name));
    }
    if table.contains(&0) {
        return Err(ValidationError::ZeroPrize(name));
    }
    Ok(())
}

/// Validate a full economy configuration.
pub fn validate_config(cfg: &EconomyConfig) -> Result<(), ValidationError> {
    validate_table("daily rewards", &cfg.daily_rewards)?;
    validate_table("wheel", &cfg.wheel_prizes)?;
    validate_table("scratch", &cfg.scratch_prizes)?;
    if cfg.ad_frequency == 0 {
        return Err(ValidationError::ZeroAdFrequency);
    }
    if cfg.standard_cost == 0 || cfg.premium_cost < cfg.standard_cost {
        return Err(ValidationError::InvalidCost {
            standard: cfg.standard_cost,
            premium: cfg.premium_cost,
        });
    }
    let cycle = cfg.daily_rewards.len() as u32;
    if let Some(&day) = cfg.ad_days.iter().find(|&&d| d == 0 || d > cycle) {
        return Err(ValidationError::AdDayOutOfRange(day));
    }
    if !cfg.wheel_jitter_frac.is_finite() || !(0.0..1.0).contains(&cfg.wheel_jitter_frac) {
        return Err(ValidationError::InvalidJitter(cfg.wheel_jitter_frac));
    }
    let distinct: BTreeSet<u32> = cfg.scratch_prizes.iter().copied().collect();
    if distinct.len() < 4 {
        return Err(ValidationError::ScratchTableTooSmall(distinct.len()));
    }
    if cfg.interstitial_secs == 0 || cfg.rewarded_secs == 0 {
        return Err(ValidationError::ZeroAdDuration);
    }
    Ok(())
}

/// Validate persisted streak state against a reward cycle of `cycle` days.
pub fn validate_daily_state(state: &DailyRewardState, cycle: u32) -> Result<(), ValidationError> {
    match state.last_claimed_date {
        None if state.streak == 0 => Ok(()),
        None => Err(ValidationError::InconsistentStreak),
        Some(_) if state.streak == 0 => Err(ValidationError::InconsistentStreak),
        Some(_) if state.streak > cycle => Err(ValidationError::StreakOutOfRange(state.streak)),
        Some(_) => Ok(()),
    }
}

/// Source of the user's local calendar date.
pub trait Clock: Send + Sync {
    fn today(&self) -> NaiveDate;
}

/// Wall clock in the local timezone.
#[derive(Clone, Copy, Debug, Default)]
pub struct LocalClock;

impl Clock for LocalClock {
    fn today(&self) -> NaiveDate {
        chrono::Local::now().date_naive()
    }
}

/// A clock pinned to a date that only moves when told to.
#[derive(Debug)]
pub struct FixedClock {
    today: Mutex<NaiveDate>,
}

impl FixedClock {
    pub fn new(today: NaiveDate) -> Self {
        Self {
            today: Mutex::new(today),
        }
    }

    pub fn set(&self, date: NaiveDate) {
        *self.today.lock().unwrap_or_else(|e| e.into_inner()) = date;
    }

    /// Move forward by whole days, saturating at the calendar's end.
    pub fn advance_days(&self, days: u32) {
        let mut guard = self.today.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(next) = guard.checked_add_days(chrono::Days::new(u64::from(days))) {
            *guard = next;
        }
    }
}

impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        *self.today.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// The calendar day before `today`, if representable.
pub fn yesterday(today: NaiveDate) -> Option<NaiveDate> {
    today.pred_opt()
}
