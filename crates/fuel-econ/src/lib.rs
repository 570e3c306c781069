#![deny(warnings)]

//! Fuel economy services.
//!
//! This crate provides the stateful pieces every calculator leans on:
//! - [`FuelStore`]: the persisted, never-negative fuel balance
//! - [`AdGatePolicy`]: per-action decision between free, toast and ad
//! - [`DailyRewardsEngine`]: the seven-day streak with ad-gated days
//! - [`RefuelLedger`]: fuel bought by watching a rewarded ad

mod fuel;
mod gate;
mod refuel;
mod rewards;

pub use fuel::FuelStore;
pub use gate::AdGatePolicy;
pub use refuel::RefuelLedger;
pub use rewards::{ClaimError, ClaimOutcome, ClaimTicket, DailyRewardsEngine, RewardDay, RewardStatus};
