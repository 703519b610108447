use std::net::Ipv4Addr;

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};

use domain::admission::engine::AdmissionController;
use domain::admission::entity::{AdmissionConfig, WindowInterval};
use domain::common::entity::Protocol;
use domain::packet::entity::FeatureVector;
use domain::sketch::countmin::CountMinSketch;
use domain::sketch::entity::{SketchKey, SketchParams};

fn make_features(i: u32) -> FeatureVector {
    FeatureVector {
        source: Ipv4Addr::from(0xC633_6400 + (i % 250)),
        destination: Ipv4Addr::new(192, 168, 1, 100),
        destination_port: 40006,
        total_length: 1052,
        protocol: Protocol::Udp,
    }
}

fn bench_countmin(c: &mut Criterion) {
    let mut group = c.benchmark_group("countmin_insert_query");

    for &depth in &[2usize, 4, 8] {
        let params = SketchParams {
            depth,
            ..SketchParams::default()
        };
        let mut sketch = CountMinSketch::new(&params).unwrap();
        let mut k = 0u64;
        group.bench_with_input(BenchmarkId::from_parameter(depth), &depth, |b, _| {
            b.iter(|| {
                k = k.wrapping_add(0x9E37_79B9);
                sketch.insert(black_box(SketchKey(k)));
                black_box(sketch.query(SketchKey(k)));
            });
        });
    }

    group.finish();
}

fn bench_process(c: &mut Criterion) {
    let mut group = c.benchmark_group("admission_process");

    for &window in &[1_024u64, 65_536] {
        let config = AdmissionConfig {
            window: WindowInterval::Packets(window),
            volume_threshold: 10_000,
            ..AdmissionConfig::default()
        };
        let mut ctl = AdmissionController::new(config).unwrap();
        let packets: Vec<FeatureVector> = (0..4096).map(make_features).collect();
        let mut i = 0usize;

        group.bench_with_input(BenchmarkId::from_parameter(window), &window, |b, _| {
            b.iter(|| {
                let fv = &packets[i % packets.len()];
                i += 1;
                black_box(ctl.process(black_box(fv), 0));
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_countmin, bench_process);
criterion_main!(benches);
