//! Benchmarks for guard overhead

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use fault_collector::prelude::*;
use std::panic;

fn silent(format_trace: bool) -> FaultCollector {
    let config = Config::builder()
        .reporting(FaultReporting::Silent)
        .format_trace(format_trace)
        .build()
        .unwrap();
    FaultCollector::with_config(config).unwrap()
}

fn bench_guard_no_fault(c: &mut Criterion) {
    let collector = silent(true);

    c.bench_function("guard_no_fault", |b| {
        b.iter(|| collector.guard_with(|| black_box(21) * 2));
    });
}

fn bench_guard_fault_callers_only(c: &mut Criterion) {
    c.bench_function("guard_fault_callers_only", |b| {
        b.iter(|| {
            let collector = silent(false);
            collector.guard(|| panic::panic_any(black_box(1u32)));
            black_box(collector.first_fault())
        });
    });
}

fn bench_guard_fault_formatted(c: &mut Criterion) {
    c.bench_function("guard_fault_formatted", |b| {
        b.iter(|| {
            let collector = silent(true);
            collector.guard(|| panic::panic_any(black_box(1u32)));
            black_box(collector.first_fault())
        });
    });
}

fn bench_first_fault_read(c: &mut Criterion) {
    let collector = silent(false);
    collector.guard(|| panic::panic_any(0u32));

    c.bench_function("first_fault_read", |b| {
        b.iter(|| black_box(collector.first_fault()));
    });
}

criterion_group!(
    benches,
    bench_guard_no_fault,
    bench_guard_fault_callers_only,
    bench_guard_fault_formatted,
    bench_first_fault_read
);
criterion_main!(benches);
