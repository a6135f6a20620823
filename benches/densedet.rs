use criterion::{criterion_group, criterion_main, Criterion};
use densedet::{
    decode_pyramid, nms_indices, BoundingBox, BoxSet, DecoderConfig, HeatmapEncoder,
    HeatmapEncoderConfig, HeatmapMode, PyramidEncoder, PyramidSpec,
};
use std::hint::black_box;

fn make_boxes(count: usize, image_size: f32) -> BoxSet {
    let mut boxes = Vec::with_capacity(count);
    let mut labels = Vec::with_capacity(count);
    for i in 0..count {
        // Deterministic pseudo-random placement.
        let seed = i.wrapping_mul(2654435761) % 1000;
        let y0 = (seed % 100) as f32 / 100.0 * (image_size - 80.0);
        let x0 = ((seed / 10) % 100) as f32 / 100.0 * (image_size - 80.0);
        let side = 16.0 + (seed % 60) as f32;
        boxes.push(BoundingBox::new(y0, x0, y0 + side, x0 + side).unwrap());
        labels.push(i % 8);
    }
    BoxSet::new(boxes, labels).unwrap()
}

fn bench_encoders(c: &mut Criterion) {
    let boxes = make_boxes(20, 512.0);
    let spec = PyramidSpec::reference(512, 512).unwrap();
    let pyramid_encoder = PyramidEncoder::new(8).unwrap();

    c.bench_function("encode_pyramid_512", |b| {
        b.iter(|| black_box(pyramid_encoder.encode(&boxes, &spec).unwrap()));
    });

    let heatmap_encoder = HeatmapEncoder::new(HeatmapEncoderConfig {
        mode: HeatmapMode::Gaussian,
        stride: 4,
        num_labels: 8,
        ..HeatmapEncoderConfig::default()
    })
    .unwrap();

    c.bench_function("encode_heatmap_512", |b| {
        b.iter(|| black_box(heatmap_encoder.encode(&boxes, 128, 128).unwrap()));
    });
}

fn bench_decode_and_nms(c: &mut Criterion) {
    let boxes = make_boxes(20, 512.0);
    let spec = PyramidSpec::reference(512, 512).unwrap();
    let encoder = PyramidEncoder::new(8).unwrap();
    let targets = encoder.encode(&boxes, &spec).unwrap();
    let config = DecoderConfig {
        score_threshold: 0.5,
    };

    c.bench_function("decode_pyramid_512", |b| {
        b.iter(|| black_box(decode_pyramid(&spec, &targets, &config).unwrap()));
    });

    let candidates = decode_pyramid(&spec, &targets, &config).unwrap();
    let cand_boxes: Vec<BoundingBox> = candidates.iter().map(|d| d.bbox).collect();
    let cand_labels: Vec<usize> = candidates.iter().map(|d| d.label).collect();
    let cand_scores: Vec<f32> = candidates.iter().map(|d| d.score).collect();

    c.bench_function("nms_decoded_candidates", |b| {
        b.iter(|| black_box(nms_indices(&cand_boxes, &cand_labels, &cand_scores, 0.5).unwrap()));
    });
}

criterion_group!(benches, bench_encoders, bench_decode_and_nms);
criterion_main!(benches);
