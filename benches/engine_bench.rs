// ABOUTME: Criterion benchmarks for the pacing engine tick path and plan loading
// ABOUTME: Measures a full scripted ride, row rendering and plan signature computation
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! Criterion benchmarks for the pacing engine.
//!
//! A ride is one snapshot per second over a plan of `n` one-kilometre
//! segments, so the tick benchmark scales with plan length.

#![allow(
    clippy::missing_docs_in_private_items,
    clippy::unwrap_used,
    missing_docs
)]

use chrono::{DateTime, Duration, TimeZone, Utc};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use pacing_core::config::PacingConfig;
use pacing_core::models::{Plan, Segment, TelemetrySnapshot};
use pacing_engine::signature::compute_plan_signature;
use pacing_engine::{LoadedPlan, PacingEngine};

const SPEED_M_PER_S: f64 = 12.0;

fn plan_with_segments(count: usize) -> Plan {
    Plan {
        intervals: (0..count)
            .map(|i| Segment {
                start_km: Some(i as f64),
                end_km: Some((i + 1) as f64),
                power_w: Some(if i % 2 == 0 { 260.0 } else { 230.0 }),
                duration_s: Some(1000.0 / SPEED_M_PER_S),
                ..Segment::default()
            })
            .collect(),
        ..Plan::default()
    }
}

fn start_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 1, 18, 0, 0).unwrap()
}

fn ride(segments: usize) -> Vec<(DateTime<Utc>, TelemetrySnapshot)> {
    let total_m = segments as f64 * 1000.0;
    let seconds = (total_m / SPEED_M_PER_S).ceil() as i64 + 2;
    (0..seconds)
        .map(|s| {
            let progress = (s as f64 * SPEED_M_PER_S).min(total_m);
            let snapshot = TelemetrySnapshot {
                power: Some(240.0 + (s % 7) as f64),
                distance_meters: Some(progress),
                race_clock_seconds: Some(s as f64),
                athlete_id: Some("1001".to_owned()),
                event_subgroup_id: Some("sg".to_owned()),
                course_id: Some("6".to_owned()),
                remaining_metric: Some("distance".to_owned()),
                remaining_distance: Some(total_m - progress),
                remaining_end_distance: Some(total_m),
                ..TelemetrySnapshot::default()
            };
            (start_time() + Duration::seconds(s), snapshot)
        })
        .collect()
}

fn bench_full_ride(c: &mut Criterion) {
    let mut group = c.benchmark_group("tick");
    for segments in [10_usize, 40, 120] {
        let plan = plan_with_segments(segments);
        let ticks = ride(segments);
        group.throughput(Throughput::Elements(ticks.len() as u64));
        group.bench_with_input(BenchmarkId::new("full_ride", segments), &ticks, |b, ticks| {
            b.iter(|| {
                let mut engine = PacingEngine::with_instance_id(PacingConfig::default(), "bench");
                engine.set_plan(plan.clone(), true, start_time());
                for (now, snapshot) in ticks {
                    black_box(engine.handle_telemetry(snapshot, *now));
                }
                engine.event_complete()
            });
        });
    }
    group.finish();
}

fn bench_rows(c: &mut Criterion) {
    let segments = 40;
    let mut engine = PacingEngine::with_instance_id(PacingConfig::default(), "bench");
    engine.set_plan(plan_with_segments(segments), true, start_time());
    let ticks = ride(segments);
    for (now, snapshot) in ticks.iter().take(ticks.len() / 2) {
        engine.handle_telemetry(snapshot, *now);
    }

    c.bench_function("rows_mid_ride", |b| b.iter(|| black_box(engine.rows())));
    c.bench_function("progress_summary_mid_ride", |b| {
        b.iter(|| black_box(engine.progress_summary()));
    });
}

fn bench_plan_loading(c: &mut Criterion) {
    let plan = plan_with_segments(120);
    c.bench_function("plan_signature_120", |b| {
        b.iter(|| compute_plan_signature(black_box(Some(&plan))));
    });
    c.bench_function("loaded_plan_120", |b| {
        b.iter(|| LoadedPlan::new(black_box(plan.clone())));
    });
}

criterion_group!(benches, bench_full_ride, bench_rows, bench_plan_loading);
criterion_main!(benches);
