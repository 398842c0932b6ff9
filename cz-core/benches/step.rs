use criterion::{black_box, criterion_group, criterion_main, Criterion};
use cz_core::{Action, CraftParams, State};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

fn bench_execute(c: &mut Criterion) {
    let params = CraftParams::default();
    let mut rng = ChaCha8Rng::seed_from_u64(0xC0FFEE);

    c.bench_function("execute_opening_sequence", |b| {
        b.iter(|| {
            let mut s = State::new(&params);
            s.execute_all(
                black_box(&[
                    Action::MuscleMemory,
                    Action::InnerQuiet,
                    Action::Manipulation,
                    Action::BasicTouch,
                    Action::StandardTouch,
                    Action::BasicSynthesis,
                ]),
                &params,
                &mut rng,
            )
        })
    });

    c.bench_function("legality_scan", |b| {
        let s = State::new(&params);
        b.iter(|| {
            let mut n = 0usize;
            for id in 0..cz_core::NUM_ACTIONS {
                if s.can_execute(black_box(Action::from_id(id))) {
                    n += 1;
                }
            }
            n
        })
    });
}

criterion_group!(benches, bench_execute);
criterion_main!(benches);
