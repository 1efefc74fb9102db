use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use common::diagnostics::DecodeStats;
use sensor::frame::{checksum, FrameCodec};

fn sample_burst(frames: usize) -> Vec<u8> {
    let mut burst = String::new();
    for i in 0..frames {
        let payload = format!(
            r#"{{"raw":{},"dst":{:.3},"ocf":false,"cof":false,"lin":true}}"#,
            i % 1024,
            i as f64 * 0.001
        );
        burst.push_str(&format!("{payload}*{:04X}\n", checksum(&payload)));
    }
    burst.into_bytes()
}

fn bench_checksum(c: &mut Criterion) {
    let payload = r#"{"raw":512,"dst":0.125,"ocf":false,"cof":false,"lin":true}"#;
    c.bench_function("crc16_payload", |b| {
        b.iter(|| checksum(black_box(payload)))
    });
}

fn bench_feed(c: &mut Criterion) {
    let burst = sample_burst(100);
    c.bench_function("feed_100_frames", |b| {
        b.iter(|| {
            let mut codec = FrameCodec::new(Arc::new(DecodeStats::new()));
            codec.feed(black_box(&burst))
        })
    });
}

criterion_group!(benches, bench_checksum, bench_feed);
criterion_main!(benches);
