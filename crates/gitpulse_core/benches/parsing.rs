//! Benchmarks for the history parsers and aggregation.
//!
//! Run with: cargo bench -p `gitpulse_core`

use std::fmt::Write as _;
use std::hint::black_box;

use criterion::{Criterion, Throughput, criterion_group, criterion_main};
use globset::GlobSet;
use gitpulse_core::aggregate;
use gitpulse_core::log::{parse_name_only, parse_numstat, parse_timeline};
use gitpulse_core::survival::parse_unified_diff;

const COMMITS: usize = 2_000;
const FILES_PER_COMMIT: usize = 6;

fn hash(i: usize) -> String {
    format!("{i:040x}")
}

fn timeline_text() -> String {
    let mut out = String::new();
    for i in 0..COMMITS {
        let _ = writeln!(
            out,
            "\x1e{}\x1f{}\x1fDev {}\x1fdev{}@example.com\x1f{}",
            hash(i),
            hash(i + 1),
            i % 17,
            i % 17,
            1_700_000_000 - i * 3_600
        );
    }
    out
}

fn numstat_text() -> String {
    let mut out = String::new();
    for i in 0..COMMITS {
        let _ = writeln!(out, "\x1e{}\n", hash(i));
        for f in 0..FILES_PER_COMMIT {
            if f == 0 && i % 50 == 0 {
                let _ = writeln!(out, "0\t0\tsrc/{{mod{f} => module{f}}}/file{i}.rs");
            } else {
                let _ = writeln!(out, "{}\t{}\tsrc/mod{f}/file{}.rs", i % 13, i % 7, i % 97);
            }
        }
    }
    out
}

fn name_only_text() -> String {
    let mut out = String::new();
    for i in 0..COMMITS {
        let _ = writeln!(out, "\x1e{}\n", hash(i));
        for f in 0..FILES_PER_COMMIT {
            let _ = writeln!(out, "src/mod{f}/file{}.rs", i % 97);
        }
    }
    out
}

fn diff_text() -> String {
    let mut out = String::new();
    for i in 0..COMMITS / 10 {
        let _ = write!(
            out,
            "\x1e{}\n\ndiff --git a/src/lib.rs b/src/lib.rs\n--- a/src/lib.rs\n+++ b/src/lib.rs\n@@ -10,2 +10,3 @@\n-old\n-old\n+new line {i}\n+another {i}\n+third {i}\n",
            hash(i)
        );
    }
    out
}

fn bench_log_parsers(c: &mut Criterion) {
    let timeline = timeline_text();
    let numstat = numstat_text();
    let name_only = name_only_text();

    let mut group = c.benchmark_group("log_parsers");

    group.throughput(Throughput::Bytes(timeline.len() as u64));
    group.bench_function("timeline", |b| b.iter(|| black_box(parse_timeline(black_box(&timeline)))));

    group.throughput(Throughput::Bytes(numstat.len() as u64));
    group.bench_function("numstat", |b| b.iter(|| black_box(parse_numstat(black_box(&numstat)))));

    group.throughput(Throughput::Bytes(name_only.len() as u64));
    group.bench_function("name_only", |b| b.iter(|| black_box(parse_name_only(black_box(&name_only)))));

    group.finish();
}

fn bench_aggregate(c: &mut Criterion) {
    let changes = parse_name_only(&name_only_text()).items;
    let numstat = parse_numstat(&numstat_text()).items;
    let exclude = GlobSet::empty();

    c.bench_function("aggregate", |b| {
        b.iter(|| black_box(aggregate(black_box(&changes), black_box(&numstat), &exclude)));
    });
}

fn bench_diff_parser(c: &mut Criterion) {
    let diff = diff_text();

    let mut group = c.benchmark_group("survival_parsers");
    group.throughput(Throughput::Bytes(diff.len() as u64));
    group.bench_function("unified_diff", |b| b.iter(|| black_box(parse_unified_diff(black_box(&diff)))));
    group.finish();
}

criterion_group!(benches, bench_log_parsers, bench_aggregate, bench_diff_parser);

criterion_main!(benches);
