use crate::{ChanceError, PlayLog};
use chrono::NaiveDate;
use fuel_core::{ChanceGameKind, EconomyConfig, SCRATCH_CELLS, SCRATCH_MATCH};
use fuel_econ::FuelStore;
use persistence::{keys, DurableStore};
use rand::seq::SliceRandom;
use rand::Rng;
use tracing::info;

/// Build a shuffled 3x3 board with exactly one value appearing three times.
///
/// The winner is drawn uniformly from `prizes`. The other six cells cycle
/// through the remaining distinct values; with at least three of those no
/// filler value can reach a match. A table with a single value reuses it,
/// and tables with two or three distinct values are refused.
pub fn generate_board<R: Rng + ?Sized>(
    prizes: &[u32],
    rng: &mut R,
) -> Result<([u32; SCRATCH_CELLS], u32), ChanceError> {
    let winner = *prizes.choose(rng).ok_or(ChanceError::EmptyTable)?;
    let mut others: Vec<u32> = Vec::with_capacity(prizes.len());
    for &p in prizes {
        if p != winner && !others.contains(&p) {
            others.push(p);
        }
    }
    match others.len() {
        0 => others.push(winner),
        n if n < SCRATCH_MATCH => return Err(ChanceError::AmbiguousTable(n + 1)),
        _ => {}
    }
    let mut cells = [winner; SCRATCH_CELLS];
    for (cell, &value) in cells[SCRATCH_MATCH..]
        .iter_mut()
        .zip(others.iter().cycle())
    {
        *cell = value;
    }
    cells.shuffle(rng);
    Ok((cells, winner))
}

/// What a single scratch did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Reveal {
    /// Cell uncovered, no match yet.
    Revealed { cell: usize, value: u32 },
    /// Cell uncovered and completed the match; `prize` fuel was granted.
    Won { cell: usize, prize: u32 },
    /// Cell was already uncovered.
    AlreadyRevealed { cell: usize },
    /// Board already settled; nothing changes.
    Locked,
}

/// One day's scratch card.
#[derive(Clone, Debug)]
pub struct ScratchBoard {
    cells: [u32; SCRATCH_CELLS],
    revealed: [bool; SCRATCH_CELLS],
    winner: u32,
    won: Option<u32>,
    locked: bool,
    date: NaiveDate,
}

impl ScratchBoard {
    pub fn date(&self) -> NaiveDate {
        self.date
    }

    /// The embedded winning value.
    pub fn winner(&self) -> u32 {
        self.winner
    }

    /// Prize granted by this board, once matched.
    pub fn won(&self) -> Option<u32> {
        self.won
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }

    /// Cell values, `None` where still covered.
    pub fn visible(&self) -> [Option<u32>; SCRATCH_CELLS] {
        let mut out = [None; SCRATCH_CELLS];
        for (i, slot) in out.iter_mut().enumerate() {
            if self.revealed[i] {
                *slot = Some(self.cells[i]);
            }
        }
        out
    }

    fn revealed_count(&self, value: u32) -> usize {
        self.cells
            .iter()
            .zip(self.revealed.iter())
            .filter(|&(&v, &r)| r && v == value)
            .count()
    }
}

/// Match-three scratch card, once per calendar day.
pub struct ScratchCardGame {
    log: PlayLog,
    prizes: Vec<u32>,
}

impl ScratchCardGame {
    pub fn load(store: DurableStore, cfg: &EconomyConfig) -> Self {
        Self {
            log: PlayLog::load(store, keys::LAST_SCRATCH_DATE, ChanceGameKind::ScratchCard),
            prizes: cfg.scratch_prizes.clone(),
        }
    }

    pub fn can_play(&self, today: NaiveDate) -> bool {
        self.log.can_play(today)
    }

    /// Deal today's board.
    pub fn open<R: Rng + ?Sized>(
        &self,
        today: NaiveDate,
        rng: &mut R,
    ) -> Result<ScratchBoard, ChanceError> {
        self.log.ensure_playable(today)?;
        let (cells, winner) = generate_board(&self.prizes, rng)?;
        Ok(ScratchBoard {
            cells,
            revealed: [false; SCRATCH_CELLS],
            winner,
            won: None,
            locked: false,
            date: today,
        })
    }

    /// Uncover one cell. The first value to reach three uncovered copies pays
    /// out, marks the day as played and locks the board.
    pub fn reveal(
        &mut self,
        board: &mut ScratchBoard,
        cell: usize,
        fuel: &mut FuelStore,
    ) -> Result<Reveal, ChanceError> {
        if board.locked {
            return Ok(Reveal::Locked);
        }
        if cell >= SCRATCH_CELLS {
            return Err(ChanceError::CellOutOfRange(cell));
        }
        if board.revealed[cell] {
            return Ok(Reveal::AlreadyRevealed { cell });
        }
        board.revealed[cell] = true;
        let value = board.cells[cell];
        if board.revealed_count(value) < SCRATCH_MATCH {
            return Ok(Reveal::Revealed { cell, value });
        }
        board.locked = true;
        self.log.ensure_playable(board.date)?;
        fuel.add(value);
        board.won = Some(value);
        self.log.record(board.date);
        info!(prize = value, "scratch card won");
        Ok(Reveal::Won { cell, prize: value })
    }
}
