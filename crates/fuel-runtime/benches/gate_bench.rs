use criterion::{criterion_group, criterion_main, Criterion};
use fuel_core::{CalculationRecord, EconomyConfig, FeatureTier, FixedClock};
use fuel_runtime::{CalculationGate, FuelEconomy};
use persistence::{DurableStore, SessionStore};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::sync::Arc;

fn economy() -> FuelEconomy {
    let today = chrono::NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
    FuelEconomy::new(
        EconomyConfig::default(),
        DurableStore::memory(),
        SessionStore::memory(),
        Arc::new(FixedClock::new(today)),
    )
    .unwrap()
}

fn bench_gate(c: &mut Criterion) {
    let mut econ = economy();
    econ.set_fuel(0);
    let record = CalculationRecord {
        calculator: "sip".into(),
        tier: FeatureTier::Standard,
        inputs: serde_json::json!({"monthly": 5000, "years": 10}),
        result: serde_json::json!({"maturity": 1161695}),
    };
    c.bench_function("gate_out_of_fuel", |b| {
        b.iter(|| match econ.request_calculation(record.clone()) {
            CalculationGate::WatchAd(prompt) => prompt.kind(),
            _ => fuel_runtime::AdKind::Interstitial,
        })
    });
}

fn bench_spin(c: &mut Criterion) {
    let econ = economy();
    let mut rng = ChaCha8Rng::seed_from_u64(42);
    c.bench_function("wheel_spin_plan", |b| {
        b.iter(|| econ.spin_wheel(&mut rng).map(|p| p.segment))
    });
}

fn bench_board(c: &mut Criterion) {
    let prizes = EconomyConfig::default().scratch_prizes;
    let mut rng = ChaCha8Rng::seed_from_u64(7);
    c.bench_function("scratch_board", |b| {
        b.iter(|| chance_games::generate_board(&prizes, &mut rng).map(|(_, winner)| winner))
    });
}

criterion_group!(benches, bench_gate, bench_spin, bench_board);
criterion_main!(benches);
