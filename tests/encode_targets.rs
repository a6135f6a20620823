use densedet::{
    gaussian_radius, BoundingBox, BoxSet, DenseDetError, HeatmapEncoder, HeatmapEncoderConfig,
    HeatmapMode, LevelSpec, PyramidEncoder, PyramidSpec,
};
use rand::seq::SliceRandom;
use rand::SeedableRng;

fn single_box_set(y0: f32, x0: f32, y1: f32, x1: f32, label: usize) -> BoxSet {
    BoxSet::new(
        vec![BoundingBox::new(y0, x0, y1, x1).unwrap()],
        vec![label],
    )
    .unwrap()
}

fn gaussian_encoder(num_labels: usize, stride: usize) -> HeatmapEncoder {
    HeatmapEncoder::new(HeatmapEncoderConfig {
        mode: HeatmapMode::Gaussian,
        stride,
        num_labels,
        ..HeatmapEncoderConfig::default()
    })
    .unwrap()
}

#[test]
fn radius_is_monotonic_in_overlap() {
    // A stricter overlap guarantee needs a tighter (smaller) radius.
    let loose = gaussian_radius(20.0, 20.0, 0.3).unwrap();
    let strict = gaussian_radius(20.0, 20.0, 0.9).unwrap();
    assert!(strict < loose);
}

#[test]
fn gaussian_center_pixel_is_exactly_one() {
    let encoder = gaussian_encoder(5, 4);
    let boxes = single_box_set(10.0, 10.0, 30.0, 30.0, 2);
    let target = encoder.encode(&boxes, 16, 16).unwrap();

    // center (20, 20) / stride 4 -> pixel (5, 5)
    assert_eq!(target.keypoint.get(2, 5, 5), Some(1.0));
    for label in [0usize, 1, 3, 4] {
        assert_eq!(target.keypoint.get(label, 5, 5), Some(0.0));
    }
    assert_eq!(target.size.get(0, 5, 5), Some(20.0));
    assert_eq!(target.size.get(1, 5, 5), Some(20.0));
}

#[test]
fn gaussian_values_stay_in_unit_interval_and_decay() {
    let encoder = gaussian_encoder(1, 4);
    let boxes = single_box_set(10.0, 10.0, 30.0, 30.0, 0);
    let target = encoder.encode(&boxes, 16, 16).unwrap();

    let plane = target.keypoint.plane(0).unwrap();
    for &value in plane {
        assert!((0.0..=1.0).contains(&value));
    }
    // Monotone decay away from the peak along a row.
    let near = target.keypoint.get(0, 5, 6).unwrap();
    let far = target.keypoint.get(0, 5, 10).unwrap();
    assert!(near > far);
    assert!(near < 1.0);
}

#[test]
fn gaussian_combination_is_order_independent() {
    let encoder = gaussian_encoder(1, 4);
    let boxes: Vec<BoundingBox> = [
        (8.0, 8.0, 28.0, 28.0),
        (20.0, 20.0, 44.0, 44.0),
        (4.0, 30.0, 24.0, 58.0),
    ]
    .iter()
    .map(|&(y0, x0, y1, x1)| BoundingBox::new(y0, x0, y1, x1).unwrap())
    .collect();

    let forward = BoxSet::new(boxes.clone(), vec![0; 3]).unwrap();
    let reference = encoder.encode(&forward, 16, 16).unwrap();

    let mut rng = rand::rngs::StdRng::seed_from_u64(7);
    for _ in 0..5 {
        let mut shuffled = boxes.clone();
        shuffled.shuffle(&mut rng);
        let permuted = BoxSet::new(shuffled, vec![0; 3]).unwrap();
        let target = encoder.encode(&permuted, 16, 16).unwrap();
        assert_eq!(target.keypoint, reference.keypoint);
    }
}

#[test]
fn overlapping_splats_take_elementwise_maximum() {
    let encoder = gaussian_encoder(1, 4);
    let a = single_box_set(8.0, 8.0, 28.0, 28.0, 0);
    let b = single_box_set(20.0, 20.0, 44.0, 44.0, 0);
    let both = BoxSet::new(
        [a.boxes(), b.boxes()].concat(),
        [a.labels(), b.labels()].concat(),
    )
    .unwrap();

    let ta = encoder.encode(&a, 16, 16).unwrap();
    let tb = encoder.encode(&b, 16, 16).unwrap();
    let tboth = encoder.encode(&both, 16, 16).unwrap();

    let pa = ta.keypoint.plane(0).unwrap();
    let pb = tb.keypoint.plane(0).unwrap();
    let pboth = tboth.keypoint.plane(0).unwrap();
    for ((&va, &vb), &vboth) in pa.iter().zip(pb.iter()).zip(pboth.iter()) {
        assert!((vboth - va.max(vb)).abs() < 1e-6);
    }
}

#[test]
fn rectangle_fixed_radius_paints_three_by_three_patch() {
    let encoder = HeatmapEncoder::new(HeatmapEncoderConfig {
        mode: HeatmapMode::Rectangle,
        radius: 1,
        stride: 4,
        num_labels: 1,
        ..HeatmapEncoderConfig::default()
    })
    .unwrap();
    let boxes = single_box_set(16.0, 16.0, 24.0, 24.0, 0);
    let target = encoder.encode(&boxes, 10, 10).unwrap();

    // center (20, 20) / 4 -> pixel (5, 5)
    for y in 0..10 {
        for x in 0..10 {
            let expected = if (4..=6).contains(&y) && (4..=6).contains(&x) {
                1.0
            } else {
                0.0
            };
            assert_eq!(target.keypoint.get(0, y, x), Some(expected), "({y}, {x})");
        }
    }
}

#[test]
fn rectangle_patch_clips_at_map_border() {
    let encoder = HeatmapEncoder::new(HeatmapEncoderConfig {
        mode: HeatmapMode::Rectangle,
        radius: 1,
        stride: 4,
        num_labels: 1,
        ..HeatmapEncoderConfig::default()
    })
    .unwrap();
    // center (2, 2) -> pixel (0, 0); only the 2x2 in-bounds corner remains
    let boxes = single_box_set(0.0, 0.0, 4.0, 4.0, 0);
    let target = encoder.encode(&boxes, 6, 6).unwrap();

    let painted: usize = target
        .keypoint
        .plane(0)
        .unwrap()
        .iter()
        .filter(|&&v| v == 1.0)
        .count();
    assert_eq!(painted, 4);
    assert_eq!(target.keypoint.get(0, 0, 0), Some(1.0));
    assert_eq!(target.keypoint.get(0, 1, 1), Some(1.0));
    assert_eq!(target.keypoint.get(0, 2, 2), Some(0.0));
}

#[test]
fn rectangle_negative_radius_derives_extent_from_box_size() {
    let encoder = HeatmapEncoder::new(HeatmapEncoderConfig {
        mode: HeatmapMode::Rectangle,
        radius: -1,
        stride: 4,
        num_labels: 1,
        ..HeatmapEncoderConfig::default()
    })
    .unwrap();
    // Half-extent = floor((40 / 4) / 2 * 0.3) = 1, so a 3x3 patch.
    let boxes = single_box_set(20.0, 20.0, 60.0, 60.0, 0);
    let target = encoder.encode(&boxes, 16, 16).unwrap();

    let painted: usize = target
        .keypoint
        .plane(0)
        .unwrap()
        .iter()
        .filter(|&&v| v == 1.0)
        .count();
    assert_eq!(painted, 9);
    // center (40, 40) / 4 -> pixel (10, 10)
    assert_eq!(target.keypoint.get(0, 10, 10), Some(1.0));
    assert_eq!(target.keypoint.get(0, 9, 9), Some(1.0));
    assert_eq!(target.keypoint.get(0, 8, 8), Some(0.0));
}

#[test]
fn encoder_rejects_label_out_of_range() {
    let encoder = gaussian_encoder(3, 4);
    let boxes = single_box_set(10.0, 10.0, 30.0, 30.0, 3);
    let err = encoder.encode(&boxes, 16, 16).err().unwrap();
    assert_eq!(
        err,
        DenseDetError::LabelOutOfRange {
            label: 3,
            num_labels: 3,
        }
    );
}

#[test]
fn encoder_rejects_center_outside_map() {
    let encoder = gaussian_encoder(1, 4);
    let boxes = single_box_set(100.0, 100.0, 140.0, 140.0, 0);
    let err = encoder.encode(&boxes, 8, 8).err().unwrap();
    assert_eq!(
        err,
        DenseDetError::CenterOutsideMap {
            py: 30,
            px: 30,
            height: 8,
            width: 8,
        }
    );
}

#[test]
fn pyramid_single_pixel_box_yields_unit_centerness() {
    let spec = PyramidSpec::new(vec![LevelSpec {
        stride: 4,
        max_box_side: 32.0,
        height: 8,
        width: 8,
    }])
    .unwrap();
    let encoder = PyramidEncoder::new(2).unwrap();
    // Strictly contains only the input position (8, 8), i.e. pixel (2, 2),
    // and is centered on it.
    let boxes = single_box_set(6.0, 6.0, 10.0, 10.0, 1);
    let targets = encoder.encode(&boxes, &spec).unwrap();

    let maps = &targets[0];
    assert_eq!(maps.center.get(0, 2, 2), Some(1.0));
    assert_eq!(maps.label.get(1, 2, 2), Some(1.0));
    assert_eq!(maps.label.get(0, 2, 2), Some(0.0));

    let top = maps.reg.get(0, 2, 2).unwrap();
    let left = maps.reg.get(1, 2, 2).unwrap();
    let bottom = maps.reg.get(2, 2, 2).unwrap();
    let right = maps.reg.get(3, 2, 2).unwrap();
    assert_eq!(top + bottom, 4.0);
    assert_eq!(left + right, 4.0);

    // Every other pixel is background.
    for y in 0..8 {
        for x in 0..8 {
            if (y, x) == (2, 2) {
                continue;
            }
            assert_eq!(maps.center.get(0, y, x), Some(0.0));
            assert_eq!(maps.label.get(0, y, x), Some(0.0));
            assert_eq!(maps.label.get(1, y, x), Some(0.0));
        }
    }
}

#[test]
fn pyramid_levels_filter_boxes_by_size() {
    let spec = PyramidSpec::new(vec![
        LevelSpec {
            stride: 8,
            max_box_side: 64.0,
            height: 8,
            width: 8,
        },
        LevelSpec {
            stride: 4,
            max_box_side: 16.0,
            height: 16,
            width: 16,
        },
    ])
    .unwrap();
    let encoder = PyramidEncoder::new(1).unwrap();
    // Side 24 exceeds the fine level's threshold of 16.
    let boxes = single_box_set(10.0, 10.0, 34.0, 34.0, 0);
    let targets = encoder.encode(&boxes, &spec).unwrap();

    let coarse_positives: f32 = targets[0].label.plane(0).unwrap().iter().sum();
    let fine_positives: f32 = targets[1].label.plane(0).unwrap().iter().sum();
    assert!(coarse_positives > 0.0);
    assert_eq!(fine_positives, 0.0);
}

#[test]
fn pyramid_assigns_smallest_box_where_boxes_nest() {
    let spec = PyramidSpec::new(vec![LevelSpec {
        stride: 4,
        max_box_side: 64.0,
        height: 16,
        width: 16,
    }])
    .unwrap();
    let encoder = PyramidEncoder::new(2).unwrap();
    let outer = BoundingBox::new(2.0, 2.0, 46.0, 46.0).unwrap();
    let inner = BoundingBox::new(18.0, 18.0, 30.0, 30.0).unwrap();
    let boxes = BoxSet::new(vec![outer, inner], vec![0, 1]).unwrap();
    let targets = encoder.encode(&boxes, &spec).unwrap();

    // Position (24, 24) = pixel (6, 6) lies inside both; the inner box wins.
    let maps = &targets[0];
    assert_eq!(maps.label.get(1, 6, 6), Some(1.0));
    assert_eq!(maps.label.get(0, 6, 6), Some(0.0));
    // Position (8, 8) = pixel (2, 2) lies only inside the outer box.
    assert_eq!(maps.label.get(0, 2, 2), Some(1.0));
    assert_eq!(maps.label.get(1, 2, 2), Some(0.0));
}

#[test]
fn coarsest_level_accepts_oversized_boxes() {
    let spec = PyramidSpec::new(vec![
        LevelSpec {
            stride: 8,
            max_box_side: 64.0,
            height: 16,
            width: 16,
        },
        LevelSpec {
            stride: 4,
            max_box_side: 32.0,
            height: 32,
            width: 32,
        },
    ])
    .unwrap();
    let encoder = PyramidEncoder::new(1).unwrap();
    // Side 100 exceeds every threshold; the coarsest level still takes it.
    let boxes = single_box_set(10.0, 10.0, 110.0, 110.0, 0);
    let targets = encoder.encode(&boxes, &spec).unwrap();

    let coarse_positives: f32 = targets[0].label.plane(0).unwrap().iter().sum();
    let fine_positives: f32 = targets[1].label.plane(0).unwrap().iter().sum();
    assert!(coarse_positives > 0.0);
    assert_eq!(fine_positives, 0.0);
}
