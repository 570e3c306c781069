use crate::FuelStore;
use chrono::NaiveDate;
use fuel_core::{validate_daily_state, yesterday, DailyRewardState, EconomyConfig};
use persistence::{keys, load_json, save_json, DurableStore};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error, PartialEq)]
pub enum ClaimError {
    /// The reward for this date was already taken.
    #[error("daily reward already claimed for {0}")]
    AlreadyClaimed(NaiveDate),
}

/// A computed, not yet applied, claim.
///
/// Produced by [`DailyRewardsEngine::peek_claim`] and applied once by
/// [`DailyRewardsEngine::commit_claim`], after any required ad finishes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimTicket {
    pub new_streak: u32,
    pub reward: u32,
    pub requires_ad: bool,
    pub date: NaiveDate,
    /// Last claim date the ticket was computed against. A commit only lands
    /// while the stored date still matches.
    #[serde(default)]
    pub last_claimed: Option<NaiveDate>,
}

/// Result of the single-call [`DailyRewardsEngine::claim`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ClaimOutcome {
    /// Today was already claimed; nothing changed.
    AlreadyClaimed,
    /// Fuel added and streak persisted.
    Granted { reward: u32, streak: u32 },
    /// Nothing changed yet; commit the ticket once the rewarded ad completes.
    AdRequired(ClaimTicket),
}

impl ClaimOutcome {
    pub fn success(&self) -> bool {
        !matches!(self, ClaimOutcome::AlreadyClaimed)
    }

    pub fn reward(&self) -> Option<u32> {
        match self {
            ClaimOutcome::AlreadyClaimed => None,
            ClaimOutcome::Granted { reward, .. } => Some(*reward),
            ClaimOutcome::AdRequired(ticket) => Some(ticket.reward),
        }
    }

    pub fn requires_ad(&self) -> bool {
        matches!(self, ClaimOutcome::AdRequired(_))
    }
}

/// One cell of the weekly rewards calendar.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RewardDay {
    pub day: u32,
    pub reward: u32,
    pub requires_ad: bool,
    pub claimed: bool,
}

/// Read-only view for the rewards screen.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RewardStatus {
    pub claimable: bool,
    /// Streak still alive today; 0 once a day was missed.
    pub current_streak: u32,
    /// Streak the next claim will reach.
    pub next_streak: u32,
    pub days: Vec<RewardDay>,
}

/// Daily login rewards with a cycling streak.
pub struct DailyRewardsEngine {
    store: DurableStore,
    rewards: Vec<u32>,
    ad_days: Vec<u32>,
    state: DailyRewardState,
}

impl DailyRewardsEngine {
    /// Load persisted streak state. Malformed or inconsistent state is logged
    /// and treated as never claimed.
    pub fn load(store: DurableStore, cfg: &EconomyConfig) -> Self {
        let cycle = cfg.daily_rewards.len() as u32;
        let state = match load_json::<DailyRewardState>(&*store, keys::DAILY_REWARDS) {
            Ok(Some(state)) => match validate_daily_state(&state, cycle) {
                Ok(()) => state,
                Err(e) => {
                    warn!(error = %e, "invalid daily reward state, starting over");
                    DailyRewardState::default()
                }
            },
            Ok(None) => DailyRewardState::default(),
            Err(e) => {
                warn!(error = %e, "daily reward state unreadable, starting over");
                DailyRewardState::default()
            }
        };
        Self {
            store,
            rewards: cfg.daily_rewards.clone(),
            ad_days: cfg.ad_days.clone(),
            state,
        }
    }

    pub fn state(&self) -> &DailyRewardState {
        &self.state
    }

    fn cycle(&self) -> u32 {
        self.rewards.len().max(1) as u32
    }

    /// Reward for an absolute streak value (1-based).
    pub fn reward_for_streak(&self, streak: u32) -> u32 {
        let idx = (streak.max(1) - 1) % self.cycle();
        self.rewards.get(idx as usize).copied().unwrap_or(0)
    }

    pub fn requires_ad(&self, streak: u32) -> bool {
        self.ad_days.contains(&streak)
    }

    pub fn is_claimable(&self, today: NaiveDate) -> bool {
        self.state.last_claimed_date != Some(today)
    }

    fn claimed_yesterday(&self, today: NaiveDate) -> bool {
        self.state.last_claimed_date.is_some() && self.state.last_claimed_date == yesterday(today)
    }

    /// Compute today's claim without touching any state.
    pub fn peek_claim(&self, today: NaiveDate) -> Result<ClaimTicket, ClaimError> {
        if !self.is_claimable(today) {
            return Err(ClaimError::AlreadyClaimed(today));
        }
        let new_streak = if self.claimed_yesterday(today) {
            (self.state.streak % self.cycle()) + 1
        } else {
            1
        };
        Ok(ClaimTicket {
            new_streak,
            reward: self.reward_for_streak(new_streak),
            requires_ad: self.requires_ad(new_streak),
            date: today,
            last_claimed: self.state.last_claimed_date,
        })
    }

    /// Apply a ticket: add its fuel and persist the advanced streak.
    ///
    /// Fails if any claim landed since the ticket was issued, so a ticket
    /// can be committed at most once and never over a newer claim.
    pub fn commit_claim(
        &mut self,
        ticket: &ClaimTicket,
        fuel: &mut FuelStore,
    ) -> Result<u32, ClaimError> {
        if self.state.last_claimed_date != ticket.last_claimed {
            return Err(ClaimError::AlreadyClaimed(ticket.date));
        }
        fuel.add(ticket.reward);
        self.state = DailyRewardState {
            streak: ticket.new_streak,
            last_claimed_date: Some(ticket.date),
        };
        if let Err(e) = save_json(&*self.store, keys::DAILY_REWARDS, &self.state) {
            warn!(error = %e, "failed to persist daily reward state");
        }
        info!(
            streak = ticket.new_streak,
            reward = ticket.reward,
            "daily reward claimed"
        );
        Ok(ticket.reward)
    }

    /// Claim today's reward in one call. Ad days change nothing and hand back
    /// the ticket to commit after the ad.
    pub fn claim(&mut self, today: NaiveDate, fuel: &mut FuelStore) -> ClaimOutcome {
        let ticket = match self.peek_claim(today) {
            Ok(ticket) => ticket,
            Err(_) => return ClaimOutcome::AlreadyClaimed,
        };
        if ticket.requires_ad {
            return ClaimOutcome::AdRequired(ticket);
        }
        match self.commit_claim(&ticket, fuel) {
            Ok(reward) => ClaimOutcome::Granted {
                reward,
                streak: ticket.new_streak,
            },
            Err(_) => ClaimOutcome::AlreadyClaimed,
        }
    }

    /// Weekly calendar for the rewards screen.
    pub fn status(&self, today: NaiveDate) -> RewardStatus {
        let claimable = self.is_claimable(today);
        let alive = !claimable || self.claimed_yesterday(today);
        let current_streak = if alive { self.state.streak } else { 0 };
        let next_streak = (current_streak % self.cycle()) + 1;
        let days = (1..=self.cycle())
            .map(|day| RewardDay {
                day,
                reward: self.reward_for_streak(day),
                requires_ad: self.requires_ad(day),
                claimed: day <= current_streak,
            })
            .collect();
        RewardStatus {
            claimable,
            current_streak,
            next_streak,
            days,
        }
    }
}
