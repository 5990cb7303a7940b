// (c) Copyright 2025 Helsing GmbH. All rights reserved.
use rand::{Rng, SeedableRng, rngs::StdRng};
use serde_json::{Value, json};
use sset::{SSet, SetOperation};
use std::hint::black_box;
use tango_bench::{IntoBenchmarks, benchmark_fn, tango_benchmarks, tango_main};

/// Record-like values with a fixed seed, so that runs are comparable.
fn records(seed: u64, n: usize) -> Vec<Value> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..n)
        .map(|_| {
            json!({
                "id": rng.random_range(0..4 * n as u64),
                "name": format!("user-{}", rng.random_range(0..1000u32)),
                "tags": ["a", "b"],
            })
        })
        .collect()
}

fn set_of(seed: u64, n: usize) -> &'static SSet {
    Box::leak(Box::new(records(seed, n).into_iter().collect()))
}

fn member_benchmarks() -> impl IntoBenchmarks {
    let big = set_of(1, 4096);
    let probe: &'static Value = Box::leak(Box::new(records(2, 1).remove(0)));
    let present: &'static Value = big.iter().next().unwrap_or(probe);

    [
        benchmark_fn("sset::merge", move |b| {
            b.iter(move || black_box(big).merge(black_box(probe)))
        }),
        benchmark_fn("sset::has::present", move |b| {
            b.iter(move || black_box(big).has(black_box(present)))
        }),
        benchmark_fn("sset::has::absent", move |b| {
            b.iter(move || black_box(big).has(black_box(probe)))
        }),
        benchmark_fn("sset::remove", move |b| {
            b.iter(move || black_box(big).remove(black_box(present)))
        }),
        benchmark_fn("sset::hash_of", move |b| {
            b.iter(move || sset::hash_of(black_box(probe)))
        }),
    ]
}

fn algebra_benchmarks() -> impl IntoBenchmarks {
    let small = set_of(3, 16);
    let one = set_of(6, 1);
    let big1 = set_of(4, 4096);
    let big2 = set_of(5, 4096);

    [
        benchmark_fn("sset::union::small_big", move |b| {
            b.iter(move || black_box(small).union(black_box(big1)))
        }),
        benchmark_fn("sset::union::one_big", move |b| {
            b.iter(move || black_box(one).union(black_box(big1)))
        }),
        benchmark_fn("sset::union::both_big", move |b| {
            b.iter(move || black_box(big1).union(black_box(big2)))
        }),
        benchmark_fn("sset::intersection::small_big", move |b| {
            b.iter(move || black_box(big1).intersection(black_box(small)))
        }),
        benchmark_fn("sset::intersection::both_big", move |b| {
            b.iter(move || black_box(big1).intersection(black_box(big2)))
        }),
        benchmark_fn("sset::combine::all", move |b| {
            b.iter(move || {
                black_box(big1).combine(
                    black_box(big2),
                    &[
                        SetOperation::Union,
                        SetOperation::Difference,
                        SetOperation::OppositeDifference,
                        SetOperation::Intersection,
                    ],
                )
            })
        }),
        benchmark_fn("sset::changes_to", move |b| {
            b.iter(move || black_box(big1).changes_to(black_box(big2)))
        }),
    ]
}

tango_benchmarks!(member_benchmarks(), algebra_benchmarks());
tango_main!();
