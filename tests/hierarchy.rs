mod common;

use common::init_logging;
use common::synthetic_field::{bump_field, normalized, power_law_map};
use turbulence_stats::distance::{HierarchyDistance, HistogramBins};
use turbulence_stats::field::{Field, FieldHeader, Map2};
use turbulence_stats::hierarchy::{DendroParams, HierarchyRunOptions, HierarchyStats};
use turbulence_stats::StatError;

fn geometric_heights(n: usize, ratio: f64) -> Vec<f64> {
    (0..n).map(|i| ratio.powi(i as i32)).collect()
}

fn deltas() -> Vec<f64> {
    vec![0.01, 0.02, 0.05, 0.1, 0.2, 0.5]
}

fn params() -> DendroParams {
    DendroParams {
        min_npix: 10,
        min_value: 0.001,
        min_delta: 0.01,
    }
}

fn run_stats(map: Map2, min_deltas: Vec<f64>, params: DendroParams) -> HierarchyStats {
    let mut stats = HierarchyStats::new(Field::map(map), Some(min_deltas), params).unwrap();
    stats.run(&HierarchyRunOptions::default()).unwrap();
    stats
}

#[test]
fn isolated_bumps_are_counted_per_threshold() {
    init_logging();
    let heights = geometric_heights(64, 0.9);
    let stats = run_stats(bump_field(&heights, 16, 2.0), deltas(), params());
    let counts = stats.numfeatures();
    assert_eq!(counts.len(), 6);
    for (i, &delta) in deltas().iter().enumerate() {
        // bumps with enough contrast and enough pixels above min_value
        let expected = heights.iter().filter(|&&h| h - 0.001 >= delta).count();
        assert!(
            counts[i] <= expected && counts[i] + 3 >= expected,
            "delta {delta}: {} structures, about {expected} expected",
            counts[i]
        );
    }
    let peaks = &stats.values()[3];
    assert!(peaks.iter().all(|&p| p >= 0.1));
}

#[test]
fn feature_counts_never_increase_with_threshold() {
    init_logging();
    let map = normalized(&power_law_map(64, -1.5, 3));
    let min_deltas = vec![0.005, 0.01, 0.02, 0.04, 0.08, 0.16, 0.32];
    let stats = run_stats(
        map,
        min_deltas,
        DendroParams {
            min_npix: 4,
            ..DendroParams::default()
        },
    );
    let counts = stats.numfeatures();
    assert!(counts[0] > 1, "counts {counts:?}");
    assert!(counts.windows(2).all(|w| w[1] <= w[0]), "counts {counts:?}");
}

#[test]
fn periodic_boundaries_join_structures_across_edges() {
    init_logging();
    // one ridge split by the left/right edge
    let map = Map2::from_fn(32, 32, |x, y| {
        let dy = y as f64 - 16.0;
        let dx = (x as f64).min(31.0 - x as f64);
        (-(dx * dx + dy * dy) / 8.0).exp()
    });
    let field = || Field::map(map.clone());
    let p = DendroParams {
        min_npix: 5,
        min_value: 0.01,
        min_delta: 0.05,
    };
    let mut open = HierarchyStats::new(field(), None, p.clone()).unwrap();
    open.compute(false).unwrap();
    let mut wrapped = HierarchyStats::new(field(), None, p).unwrap();
    wrapped.compute(true).unwrap();
    assert_eq!(open.numfeatures(), vec![2]);
    assert_eq!(wrapped.numfeatures(), vec![1]);
}

#[test]
fn tail_fit_and_histograms_are_built() {
    init_logging();
    let stats = run_stats(bump_field(&geometric_heights(64, 0.9), 16, 2.0), deltas(), params());
    let tail = stats.tail().expect("tail fit");
    assert!(tail.fit.slope() < 0.0, "tail slope {}", tail.fit.slope());
    assert!(stats.tail_slope_err().is_finite());
    assert!(tail.log_deltas.len() >= 2);

    let hists = stats.histograms().expect("histograms");
    assert_eq!(hists.len(), 6);
    // the last level keeps fewer than ten peaks and gets a placeholder
    assert!(hists[5].is_empty());
    assert!(!hists[0].is_empty());
}

#[test]
fn single_threshold_skips_the_tail_fit() {
    init_logging();
    let stats = run_stats(bump_field(&geometric_heights(16, 0.8), 16, 2.0), vec![0.05], params());
    assert!(stats.tail().is_none());
    assert!(stats.tail_slope().is_nan());
}

#[test]
fn descending_thresholds_are_rejected() {
    let err = HierarchyStats::new(
        Field::map(Map2::new(8, 8)),
        Some(vec![0.1, 0.3, 0.2]),
        DendroParams::default(),
    )
    .unwrap_err();
    assert!(matches!(
        err,
        StatError::NonAscendingThresholds { index: 2, .. }
    ));
}

#[test]
fn saved_results_reload_with_and_without_data() {
    init_logging();
    let stats = run_stats(bump_field(&geometric_heights(36, 0.85), 16, 2.0), deltas(), params());
    let dir = std::env::temp_dir().join("turbulence_stats_hierarchy_io");
    let lean = dir.join("lean.json");
    let full = dir.join("full.json");
    stats.save_results(&lean, false).unwrap();
    stats.save_results(&full, true).unwrap();

    let reloaded = HierarchyStats::load_results(&lean).unwrap();
    assert!(reloaded.data().is_none());
    assert_eq!(reloaded.levels().unwrap(), stats.levels().unwrap());
    assert_eq!(reloaded.min_deltas(), stats.min_deltas());
    assert_eq!(reloaded.tail_slope(), stats.tail_slope());

    let mut with_data = HierarchyStats::load_results(&full).unwrap();
    assert!(with_data.data().is_some());
    with_data.compute(false).unwrap();
    assert_eq!(with_data.numfeatures(), stats.numfeatures());

    let mut without_data = HierarchyStats::load_results(&lean).unwrap();
    assert!(without_data.compute(false).is_err());
}

#[test]
fn distance_between_hierarchies() {
    init_logging();
    let geometric = run_stats(bump_field(&geometric_heights(64, 0.9), 16, 2.0), deltas(), params());
    let linear_heights: Vec<f64> = (0..64).map(|i| 1.0 - i as f64 / 64.0).collect();
    let linear = run_stats(bump_field(&linear_heights, 16, 2.0), deltas(), params());

    let mut same = HierarchyDistance::new(&geometric, &geometric, HistogramBins::Best, 5).unwrap();
    let report = same.distance_metric().unwrap();
    assert_eq!(report.numfeature_distance, 0.0);
    assert!(report.histogram_distance.abs() < 1e-12);

    let mut apart = HierarchyDistance::new(&geometric, &linear, HistogramBins::Best, 5).unwrap();
    let report = apart.distance_metric().unwrap();
    assert!(report.numfeature_distance > 0.0);
    assert!((0.0..=1.0).contains(&report.histogram_distance));
    let hists = apart.histograms().expect("histogram comparison");
    assert_eq!(hists.histograms1.len(), report.cutoff);

    let err = HierarchyDistance::new(&geometric, &linear, HistogramBins::Best, 1000).unwrap_err();
    assert!(matches!(err, StatError::InvalidParameter { .. }));
}

#[test]
fn histogram_distance_needs_a_level_before_the_cutoff() {
    init_logging();
    let heights = geometric_heights(64, 0.9);
    let a = run_stats(bump_field(&heights, 16, 2.0), vec![0.01, 0.5], params());
    let b = run_stats(bump_field(&heights, 16, 2.0), vec![0.01, 0.5], params());
    assert!(a.numfeatures()[0] > 20 && a.numfeatures()[1] <= 20);

    let mut metric = HierarchyDistance::new(&a, &b, HistogramBins::Best, 20).unwrap();
    assert_eq!(metric.cutoff(), 0);
    let err = metric.histogram_distance().unwrap_err();
    assert!(matches!(err, StatError::InsufficientData { .. }));
    assert!(metric.histograms().is_none());
}

#[test]
fn header_travels_with_the_statistics() {
    let header = FieldHeader::default().with_pixel_scale_deg(0.002);
    let field = Field::new(
        turbulence_stats::field::FieldData::Map(Map2::new(4, 4)),
        header.clone(),
    )
    .unwrap();
    let stats = HierarchyStats::new(field, None, DendroParams::default()).unwrap();
    assert_eq!(stats.header(), &header);
    assert_eq!(stats.min_deltas(), &[0.1]);
}
