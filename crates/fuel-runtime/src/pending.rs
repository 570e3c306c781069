use crate::ad::{AdKind, AdModal};
use chance_games::SpinPlan;
use fuel_core::CalculationRecord;
use fuel_econ::ClaimTicket;
use serde::{Deserialize, Serialize};

/// Work held back until an ad (or the wheel animation) resolves.
///
/// Plain data: the caller keeps it across the modal and hands it back to
/// [`crate::FuelEconomy::resume`], which commits or discards it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum PendingResult {
    Calculation(CalculationRecord),
    DailyReward(ClaimTicket),
    ChanceGame(SpinPlan),
    Refuel,
}

/// An ad to show and the result it unlocks.
#[derive(Clone, Debug, PartialEq)]
pub struct AdPrompt {
    pub modal: AdModal,
    pub pending: PendingResult,
}

impl AdPrompt {
    pub fn kind(&self) -> AdKind {
        self.modal.kind()
    }
}

/// What a resumed pending result turned into.
#[derive(Clone, Debug, PartialEq)]
pub enum Resolution {
    /// Reveal the result and record it in history.
    Calculation(CalculationRecord),
    DailyReward { reward: u32, streak: u32 },
    Spin { prize: u32 },
    Refuel { granted: u32 },
    /// Closed early; nothing committed.
    Discarded,
}
