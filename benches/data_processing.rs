//! Benchmarks for the per-tick graph path
//!
//! Run with: cargo bench

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use gridlines_rs::config::{GraphConfig, ScaleTuning, ScrollDirection};
use gridlines_rs::graph::{Epoch, RollingBuffer, ScaleGroup};
use gridlines_rs::types::{EpochId, Measurement, SignalId};

const DT: f64 = 1.0 / 30.0;

fn bench_buffer_shift(c: &mut Criterion) {
    let mut group = c.benchmark_group("buffer_shift");

    for window in [50, 500, 5_000].iter() {
        group.throughput(Throughput::Elements(1));
        for direction in [ScrollDirection::Left, ScrollDirection::Right] {
            group.bench_with_input(
                BenchmarkId::new(format!("{:?}", direction), window),
                window,
                |b, &window| {
                    let mut buffer =
                        RollingBuffer::new(SignalId::from_u128(1), 0, window, direction, 5.0)
                            .unwrap();
                    let mut value = 0.0;
                    b.iter(|| {
                        value += 0.1;
                        buffer.update_value(black_box(value));
                    });
                },
            );
        }
    }

    group.finish();
}

fn bench_scale_update(c: &mut Criterion) {
    let mut group = c.benchmark_group("scale_update");

    for members in [1, 10, 30].iter() {
        group.throughput(Throughput::Elements(*members as u64));
        group.bench_with_input(BenchmarkId::from_parameter(members), members, |b, &members| {
            let mut scale = ScaleGroup::new("FREQ", 5.0, true, ScaleTuning::default());
            for n in 0..members {
                let mut buffer =
                    RollingBuffer::new(SignalId::from_u128(n as u128), n, 50, ScrollDirection::Left, 5.0)
                        .unwrap();
                for i in 0..50 {
                    buffer.update_value(60.0 + (i as f64 * 0.1 + n as f64).sin() * 0.05);
                }
                scale.add(buffer).unwrap();
            }

            b.iter(|| scale.update(black_box(DT)));
        });
    }

    group.finish();
}

fn bench_epoch_tick(c: &mut Criterion) {
    let mut group = c.benchmark_group("epoch_tick");
    let graph = GraphConfig::default();

    for signals in [10, 30].iter() {
        group.throughput(Throughput::Elements(*signals as u64));
        group.bench_with_input(BenchmarkId::from_parameter(signals), signals, |b, &signals| {
            let mut epoch = Epoch::empty(EpochId(1));
            let ids: Vec<SignalId> = (0..signals as u128).map(SignalId::from_u128).collect();
            for (n, &id) in ids.iter().enumerate() {
                let key = if n % 2 == 0 { "FREQ" } else { "VPHM" };
                epoch
                    .insert(id, key, true, &graph, ScaleTuning::default())
                    .unwrap();
            }

            let mut t = 0.0f64;
            b.iter(|| {
                t += DT;
                let batch: Vec<Measurement> = ids
                    .iter()
                    .map(|&id| Measurement::now(id, t.sin()))
                    .collect();
                epoch.apply_batch(&batch);
                epoch.update(DT);
                black_box(epoch.len())
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_buffer_shift, bench_scale_update, bench_epoch_tick);
criterion_main!(benches);
