#![deny(warnings)]

//! Once-per-day chance games that pay out calculation fuel.
//!
//! Both games draw from a caller-supplied RNG so play is reproducible under a
//! seeded `ChaCha8Rng`, and both record their last play date in durable
//! storage independently of each other.

mod scratch;
mod wheel;

pub use scratch::{generate_board, Reveal, ScratchBoard, ScratchCardGame};
pub use wheel::{landed_segment, plan_rotation, SpinPlan, SpinWheel};

use chrono::NaiveDate;
use fuel_core::ChanceGameKind;
use persistence::{load_date, save_date, DurableStore};
use thiserror::Error;
use tracing::warn;

/// Errors produced by the chance games.
#[derive(Debug, Error, PartialEq)]
pub enum ChanceError {
    /// The game was already played on this calendar day.
    #[error("{0:?} already played on {1}")]
    AlreadyPlayedToday(ChanceGameKind, NaiveDate),
    /// Scratch cell index past the end of the board.
    #[error("cell {0} is outside the board")]
    CellOutOfRange(usize),
    /// No prizes configured.
    #[error("prize table is empty")]
    EmptyTable,
    /// Too few distinct prizes for a single winning triple.
    #[error("scratch table has {0} distinct prizes; a unique winner needs 4")]
    AmbiguousTable(usize),
}

/// Last play date of one game.
struct PlayLog {
    store: DurableStore,
    key: &'static str,
    kind: ChanceGameKind,
    last_played: Option<NaiveDate>,
}

impl PlayLog {
    fn load(store: DurableStore, key: &'static str, kind: ChanceGameKind) -> Self {
        let last_played = match load_date(&*store, key) {
            Ok(date) => date,
            Err(e) => {
                warn!(error = %e, game = ?kind, "last play date unreadable, allowing play");
                None
            }
        };
        Self {
            store,
            key,
            kind,
            last_played,
        }
    }

    fn can_play(&self, today: NaiveDate) -> bool {
        self.last_played != Some(today)
    }

    fn ensure_playable(&self, today: NaiveDate) -> Result<(), ChanceError> {
        if self.can_play(today) {
            Ok(())
        } else {
            Err(ChanceError::AlreadyPlayedToday(self.kind, today))
        }
    }

    fn record(&mut self, today: NaiveDate) {
        self.last_played = Some(today);
        if let Err(e) = save_date(&*self.store, self.key, today) {
            warn!(error = %e, game = ?self.kind, "failed to persist play date");
        }
    }
}
