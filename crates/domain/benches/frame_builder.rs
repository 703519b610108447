use std::net::Ipv4Addr;

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};

use domain::packet::builder::{BuildStatus, FeatureVectorBuilder};
use domain::packet::encode::{FrameTemplate, encode_frame};
use domain::packet::entity::Chunk;

fn bench_classify(c: &mut Criterion) {
    let mut group = c.benchmark_group("frame_builder_classify");
    let frame = encode_frame(&FrameTemplate::tcp(
        Ipv4Addr::new(192, 168, 1, 101),
        Ipv4Addr::new(192, 168, 1, 100),
        40000,
        5001,
        1400,
    ));

    for &width in &[8usize, 64, 256] {
        let chunks = Chunk::segment(&frame, width);
        let mut builder = FeatureVectorBuilder::new(width).unwrap();

        group.bench_with_input(BenchmarkId::from_parameter(width), &width, |b, _| {
            b.iter(|| {
                for chunk in &chunks {
                    if let BuildStatus::Complete(fv) = builder.push(black_box(chunk)) {
                        black_box(fv);
                    }
                }
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_classify);
criterion_main!(benches);
