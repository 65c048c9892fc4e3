//! Criterion benchmarks for ebb-forecast critical operations.
//!
//! Covers: snapshot linearization, percentile computation, and diagram
//! comparison.

use std::collections::HashSet;

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use ebb_core::constants::DEFAULT_BLOCK_MAX_WEIGHT;
use ebb_core::diagram::{build_diagram, compare_diagrams};
use ebb_core::types::{SnapshotEntry, Txid};
use ebb_forecast::linearize::linearize;
use ebb_forecast::percentile::calculate_block_percentiles;

/// A snapshot of `count` transactions; every third one spends the
/// previous, producing short dependency chains.
fn sample_entries(count: u16) -> Vec<SnapshotEntry> {
    (0..count)
        .map(|i| {
            let mut bytes = [0u8; 32];
            bytes[0] = (i >> 8) as u8;
            bytes[1] = (i & 0xFF) as u8;
            let parents = if i % 3 == 0 || i == 0 {
                vec![]
            } else {
                let mut parent = [0u8; 32];
                parent[0] = ((i - 1) >> 8) as u8;
                parent[1] = ((i - 1) & 0xFF) as u8;
                vec![Txid(parent)]
            };
            SnapshotEntry {
                txid: Txid(bytes),
                fee: 500 + i64::from(i) * 13 % 5_000,
                vsize: 250 + u32::from(i % 7) * 50,
                parents,
                arrival: 0,
            }
        })
        .collect()
}

fn bench_linearize(c: &mut Criterion) {
    let entries = sample_entries(500);
    c.bench_function("linearize_500_txs", |b| {
        b.iter(|| linearize(black_box(&entries), DEFAULT_BLOCK_MAX_WEIGHT, &HashSet::new()))
    });
}

fn bench_percentiles(c: &mut Criterion) {
    let entries = sample_entries(2_000);
    let lin = linearize(&entries, DEFAULT_BLOCK_MAX_WEIGHT, &HashSet::new());
    let stats = lin.fee_rate_stats();
    c.bench_function("block_percentiles", |b| {
        b.iter(|| calculate_block_percentiles(black_box(&stats)))
    });
}

fn bench_diagram_compare(c: &mut Criterion) {
    let entries = sample_entries(400);
    let lin = linearize(&entries, DEFAULT_BLOCK_MAX_WEIGHT, &HashSet::new());
    let mut chunks_a = lin.chunk_feefracs();
    let mut chunks_b = chunks_a.clone();
    if let Some(first) = chunks_b.first_mut() {
        first.fee += 1;
    }
    let dia_a = build_diagram(&mut chunks_a);
    let dia_b = build_diagram(&mut chunks_b);

    c.bench_function("compare_diagrams", |b| {
        b.iter(|| compare_diagrams(black_box(&dia_a), black_box(&dia_b)))
    });
}

criterion_group!(benches, bench_linearize, bench_percentiles, bench_diagram_compare);
criterion_main!(benches);
