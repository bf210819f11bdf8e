use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, SamplingMode, Throughput};

use asic::metadata::probe;
use asic::pattern::pattern_to_template;
use asic::AsicConfig;

// A month directory as published: every daily kind for every day, plus noise.
fn month_listing(n_days: u32) -> Vec<String> {
    let daily = ["adem", "pep", "ptb", "trsd", "tgrl"];
    let exts = ["tx2", "txr", "txf"];
    let mut out = Vec::new();
    for day in 1..=n_days {
        for k in daily {
            for e in exts { out.push(format!("/PUBLICOK/SIC/COMERCIA/2023-10/{k}10{day:02}.{e}")); }
        }
        out.push(format!("/PUBLICOK/SIC/COMERCIA/2023-10/leeme{day:02}.txt"));
    }
    for k in ["trsm", "tserv", "sntie", "afac"] { out.push(format!("/PUBLICOK/SIC/COMERCIA/2023-10/{k}10.txf")); }
    out
}

fn bench_classify(c: &mut Criterion) {
    let cfg = AsicConfig::builtin().expect("builtin configuration");
    let mut group = c.benchmark_group("classify");
    group.sampling_mode(SamplingMode::Flat);
    group.sample_size(20);

    for &days in &[1u32, 31u32] {
        let paths = month_listing(days);
        group.throughput(Throughput::Elements(paths.len() as u64));
        group.bench_with_input(BenchmarkId::new("probe_all_kinds", days.to_string()), &paths, |b, paths| {
            b.iter(|| {
                let mut hits = 0usize;
                for p in paths {
                    if let Ok(Some(_)) = probe(&cfg.kinds, &cfg.extensions, p) { hits += 1; }
                }
                criterion::black_box(hits);
            });
        });
    }

    group.bench_function("pattern_to_template_catalogue", |b| {
        b.iter(|| {
            for e in cfg.kinds.entries() {
                criterion::black_box(pattern_to_template(e.descriptor.name_pattern()));
                criterion::black_box(pattern_to_template(e.descriptor.location_pattern()));
            }
        });
    });
    group.finish();
}

criterion_group!(benches, bench_classify);
criterion_main!(benches);
