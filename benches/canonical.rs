// SPDX-License-Identifier: MPL-2.0
use std::time::Duration;

extern crate criterion;
use self::criterion::*;

use prefab::constraint::Constraint;
use prefab::version::NumberVersion;

/// Many short overlapping ranges, in a scrambled order.
fn scattered(count: u64) -> Constraint<NumberVersion> {
    let mut constraint = Constraint::empty("Apt");
    for i in 0..count {
        let start = (i * 7919) % (count * 4);
        constraint.add_range(
            Some(NumberVersion(start)),
            Some(NumberVersion(start + 3)),
            i % 2 == 0,
            i % 3 == 0,
        );
    }
    constraint
}

fn bench_canonical(c: &mut Criterion) {
    let mut group = c.benchmark_group("canonical");
    group.measurement_time(Duration::from_secs(10));

    for count in [10u64, 100, 1_000] {
        let raw = scattered(count);
        group.bench_function(format!("canonical/{count}"), |b| {
            b.iter(|| black_box(&raw).canonical())
        });

        let left = raw.canonical();
        let right = scattered(count / 2).inverse();
        group.bench_function(format!("intersect/{count}"), |b| {
            b.iter(|| black_box(&left).intersect(black_box(&right)))
        });
        group.bench_function(format!("inverse/{count}"), |b| {
            b.iter(|| black_box(&left).inverse())
        });
    }

    group.finish();
}

criterion_group!(benches, bench_canonical);
criterion_main!(benches);
