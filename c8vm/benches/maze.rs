use criterion::{black_box, criterion_group, criterion_main, Criterion};

use c8vm::prelude::*;

fn criterion_benchmark(c: &mut Criterion) {
    const MAZE: &[u8] = include_bytes!("../programs/maze");

    {
        let mut vm = Chip8Vm::new(Chip8Conf {
            rng_seed: Some(1),
            ..Chip8Conf::default()
        });

        c.bench_function("maze bytecode", |b| {
            b.iter(|| {
                vm.reset_and_load(MAZE).unwrap();
                let step_count = black_box(1000_usize);
                black_box(vm.run_steps(step_count))
            })
        });
    }

    c.bench_function("decode", |b| {
        b.iter(|| {
            for word in (0..=u16::MAX).step_by(7) {
                black_box(decode(black_box(word)));
            }
        })
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
