use crate::{ChanceError, PlayLog};
use chrono::NaiveDate;
use fuel_core::{ChanceGameKind, EconomyConfig};
use fuel_econ::FuelStore;
use persistence::{keys, DurableStore};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::info;

/// A drawn spin waiting for its animation to finish.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SpinPlan {
    /// Winning segment index, clockwise from the pointer at rotation 0.
    pub segment: usize,
    pub prize: u32,
    /// Clockwise rotation in degrees, full turns included.
    pub rotation_deg: f64,
    /// Delay before the prize is granted.
    pub settle_after: Duration,
    pub date: NaiveDate,
}

/// Rotation that parks the pointer inside `segment`.
///
/// The landing point is the segment centre offset by a uniform draw spanning
/// `jitter_frac` of the segment width, so it never sits on a boundary.
pub fn plan_rotation<R: Rng + ?Sized>(
    segment: usize,
    segments: usize,
    jitter_frac: f64,
    min_turns: u32,
    rng: &mut R,
) -> f64 {
    let width = 360.0 / segments.max(1) as f64;
    let centre = segment as f64 * width + width / 2.0;
    let half_span = width * jitter_frac.clamp(0.0, 0.999) / 2.0;
    let offset = if half_span > 0.0 {
        rng.gen_range(-half_span..=half_span)
    } else {
        0.0
    };
    f64::from(min_turns) * 360.0 + (360.0 - (centre + offset))
}

/// Segment under the pointer after rotating clockwise by `rotation_deg`.
pub fn landed_segment(rotation_deg: f64, segments: usize) -> usize {
    let segments = segments.max(1);
    let width = 360.0 / segments as f64;
    let under_pointer = (360.0 - rotation_deg.rem_euclid(360.0)).rem_euclid(360.0);
    ((under_pointer / width).floor() as usize).min(segments - 1)
}

/// Six-segment prize wheel, once per calendar day.
pub struct SpinWheel {
    log: PlayLog,
    prizes: Vec<u32>,
    jitter_frac: f64,
    min_turns: u32,
    settle: Duration,
}

impl SpinWheel {
    pub fn load(store: DurableStore, cfg: &EconomyConfig) -> Self {
        Self {
            log: PlayLog::load(store, keys::LAST_SPIN_DATE, ChanceGameKind::Wheel),
            prizes: cfg.wheel_prizes.clone(),
            jitter_frac: f64::from(cfg.wheel_jitter_frac),
            min_turns: cfg.wheel_min_turns,
            settle: cfg.spin_settle_delay(),
        }
    }

    pub fn prizes(&self) -> &[u32] {
        &self.prizes
    }

    pub fn can_play(&self, today: NaiveDate) -> bool {
        self.log.can_play(today)
    }

    /// Draw a segment uniformly and plan the animation. Nothing is granted
    /// until [`SpinWheel::complete`].
    pub fn spin<R: Rng + ?Sized>(
        &self,
        today: NaiveDate,
        rng: &mut R,
    ) -> Result<SpinPlan, ChanceError> {
        self.log.ensure_playable(today)?;
        if self.prizes.is_empty() {
            return Err(ChanceError::EmptyTable);
        }
        let segment = rng.gen_range(0..self.prizes.len());
        let rotation_deg = plan_rotation(
            segment,
            self.prizes.len(),
            self.jitter_frac,
            self.min_turns,
            rng,
        );
        Ok(SpinPlan {
            segment,
            prize: self.prizes[segment],
            rotation_deg,
            settle_after: self.settle,
            date: today,
        })
    }

    /// Grant a settled spin and mark its day as played. The caller waits out
    /// `settle_after` before calling this.
    pub fn complete(&mut self, plan: SpinPlan, fuel: &mut FuelStore) -> Result<u32, ChanceError> {
        self.log.ensure_playable(plan.date)?;
        fuel.add(plan.prize);
        self.log.record(plan.date);
        info!(segment = plan.segment, prize = plan.prize, "wheel spin granted");
        Ok(plan.prize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use persistence::{load_date, MemoryStore};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use std::sync::Arc;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn setup() -> (MemoryStore, FuelStore, SpinWheel) {
        let mem = MemoryStore::new();
        let durable = DurableStore::new(Arc::new(mem.clone()));
        let fuel = FuelStore::load(durable.clone(), 0);
        let wheel = SpinWheel::load(durable, &EconomyConfig::default());
        (mem, fuel, wheel)
    }

    #[test]
    fn rotation_always_lands_in_drawn_segment() {
        let mut rng = ChaCha8Rng::seed_from_u64(17);
        for _ in 0..5_000 {
            let segment = rng.gen_range(0..6);
            let rot = plan_rotation(segment, 6, 0.8, 5, &mut rng);
            assert!(rot >= 5.0 * 360.0);
            assert_eq!(landed_segment(rot, 6), segment);
        }
    }

    #[test]
    fn zero_jitter_lands_on_centre() {
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let rot = plan_rotation(2, 6, 0.0, 0, &mut rng);
        assert_eq!(rot, 360.0 - 150.0);
        assert_eq!(landed_segment(rot, 6), 2);
    }

    #[test]
    fn segments_are_drawn_uniformly() {
        let today = date(2024, 6, 10);
        let (_, _, wheel) = setup();
        let mut rng = ChaCha8Rng::seed_from_u64(2024);
        let mut per_segment = [0usize; 6];
        let mut per_prize = std::collections::BTreeMap::new();
        for _ in 0..12_000 {
            let plan = wheel.spin(today, &mut rng).unwrap();
            per_segment[plan.segment] += 1;
            *per_prize.entry(plan.prize).or_insert(0usize) += 1;
        }
        for n in per_segment {
            assert!((n as f64 - 2000.0).abs() < 200.0, "segment hit {n} times");
        }
        // 1 and 2 each own two segments.
        assert!((per_prize[&1] as f64 - 4000.0).abs() < 300.0);
        assert!((per_prize[&2] as f64 - 4000.0).abs() < 300.0);
        assert!((per_prize[&10] as f64 - 2000.0).abs() < 200.0);
    }

    #[test]
    fn spin_grants_once_per_day() {
        let today = date(2024, 6, 10);
        let (mem, mut fuel, mut wheel) = setup();
        let mut rng = ChaCha8Rng::seed_from_u64(8);
        let plan = wheel.spin(today, &mut rng).unwrap();
        let extra = wheel.spin(today, &mut rng).unwrap();
        assert_eq!(plan.settle_after, Duration::from_millis(4000));
        assert_eq!(fuel.balance(), 0);
        let prize = wheel.complete(plan, &mut fuel).unwrap();
        assert_eq!(fuel.balance(), prize);
        assert_eq!(load_date(&mem, keys::LAST_SPIN_DATE).unwrap(), Some(today));
        assert_eq!(
            wheel.complete(extra, &mut fuel),
            Err(ChanceError::AlreadyPlayedToday(ChanceGameKind::Wheel, today))
        );
        assert_eq!(
            wheel.spin(today, &mut rng),
            Err(ChanceError::AlreadyPlayedToday(ChanceGameKind::Wheel, today))
        );
        assert_eq!(fuel.balance(), prize);

        let tomorrow = today.succ_opt().unwrap();
        let plan = wheel.spin(tomorrow, &mut rng).unwrap();
        wheel.complete(plan, &mut fuel).unwrap();
        assert!(!wheel.can_play(tomorrow));
    }

    #[test]
    fn play_dates_are_independent_per_game() {
        let today = date(2024, 6, 10);
        let mem = MemoryStore::new();
        let durable = DurableStore::new(Arc::new(mem));
        let mut fuel = FuelStore::load(durable.clone(), 0);
        let mut wheel = SpinWheel::load(durable.clone(), &EconomyConfig::default());
        let scratch = crate::ScratchCardGame::load(durable, &EconomyConfig::default());
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let plan = wheel.spin(today, &mut rng).unwrap();
        wheel.complete(plan, &mut fuel).unwrap();
        assert!(scratch.can_play(today));
    }
}
