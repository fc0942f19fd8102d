// 该文件是 Detviz （检测可视化） 项目的一部分。
// tests/property_tests.rs - 基于 proptest 的性质测试
//
// 本文件根据 Apache 许可证第 2.0 版（以下简称“许可证”）授权使用；
// 除非遵守该许可证条款，否则您不得使用本文件。
// 您可通过以下网址获取许可证副本：
// http://www.apache.org/licenses/LICENSE-2.0
// 除非适用法律要求或书面同意，根据本许可协议分发的软件均按“原样”提供，
// 不附带任何形式的明示或暗示的保证或条件。
// 有关许可权限与限制的具体条款，请参阅本许可协议。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, Wareless Group

use detviz::evaluation::{count_active, linspace};
use detviz::precision::{
  NUM_IOU_THRESHOLDS, NUM_RECALL_LEVELS, PrSettings, pr_curve_iou_mean, pr_curves_iou_range,
};
use detviz::{Bbox, CocoEval, EvalConfig, ims_eval_detections};
use ndarray::Array5;
use proptest::prelude::*;

fn scored_boxes(scores: &[f32]) -> Vec<Bbox> {
  scores
    .iter()
    .enumerate()
    .map(|(i, &s)| {
      let x = i as f32 * 20.0;
      Bbox::detection(x, 0.0, x + 10.0, 10.0, 1, "obj", s)
    })
    .collect()
}

// 性质：活跃检测数随阈值单调不增
proptest! {
  #[test]
  fn prop_count_active_non_increasing(
    scores in prop::collection::vec(0.0f32..=1.0, 0..30),
    a in 0.0f32..=1.0,
    b in 0.0f32..=1.0,
  ) {
    let boxes = scored_boxes(&scores);
    let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
    prop_assert!(count_active(&boxes, lo) >= count_active(&boxes, hi));
    prop_assert_eq!(count_active(&boxes, 0.0), boxes.len());
  }
}

// 性质：没有真值的图像上，误检数与活跃检测数一致，且随阈值单调不增
proptest! {
  #[test]
  fn prop_wrong_detections_match_active(
    images in prop::collection::vec(prop::collection::vec(0.0f32..=1.0, 0..8), 1..6),
  ) {
    let detections: Vec<Vec<Bbox>> = images.iter().map(|s| scored_boxes(s)).collect();
    let dataset: Vec<Vec<Bbox>> = vec![vec![]; detections.len()];
    let config = EvalConfig::default();
    let curves = ims_eval_detections(&detections, &dataset, None, &config).unwrap();

    for (i, &t) in curves.score_thresholds.iter().enumerate() {
      let active: usize = detections.iter().map(|d| count_active(d, t)).sum();
      prop_assert_eq!(curves.obj_wrong_det_counts[i], active);
      prop_assert_eq!(curves.obj_missed_gt_counts[i], 0);
      prop_assert_eq!(curves.im_error_counts[i], curves.im_wrong_det_counts[i]);
    }
    for w in curves.im_error_counts.windows(2) {
      prop_assert!(w[0] >= w[1]);
    }
  }
}

// 性质：图像错误数不小于误检图像数与漏检图像数中的较大者，不大于两者之和
proptest! {
  #[test]
  fn prop_error_count_bounds(
    det_scores in prop::collection::vec(prop::collection::vec(0.0f32..=1.0, 0..5), 1..6),
    gt_counts in prop::collection::vec(0usize..4, 6),
  ) {
    let detections: Vec<Vec<Bbox>> = det_scores.iter().map(|s| scored_boxes(s)).collect();
    let dataset: Vec<Vec<Bbox>> = detections
      .iter()
      .zip(&gt_counts)
      .map(|(_, &n)| {
        (0..n)
          .map(|i| {
            let x = i as f32 * 20.0;
            Bbox::annotation(x, 0.0, x + 10.0, 10.0, 1, "obj")
          })
          .collect()
      })
      .collect();
    let config = EvalConfig::default().with_score_thresholds(linspace(0.0, 1.0, 11));
    let curves = ims_eval_detections(&detections, &dataset, None, &config).unwrap();

    for i in 0..curves.score_thresholds.len() {
      let wrong = curves.im_wrong_det_counts[i];
      let missed = curves.im_missed_gt_counts[i];
      let error = curves.im_error_counts[i];
      prop_assert!(error >= wrong.max(missed));
      prop_assert!(error <= wrong + missed);
      prop_assert!(error <= detections.len());
    }
  }
}

// 性质：每个 IoU 阈值取常数时，均值曲线等于这些常数的均值
proptest! {
  #[test]
  fn prop_iou_mean_is_average(
    per_iou in prop::collection::vec(0.0f64..=1.0, NUM_IOU_THRESHOLDS),
    categories in 1usize..4,
  ) {
    let table = Array5::from_shape_fn(
      (NUM_IOU_THRESHOLDS, NUM_RECALL_LEVELS, categories, 4, 3),
      |(t, _, _, _, _)| per_iou[t],
    );
    let eval = CocoEval::from_precision(table);
    let settings = PrSettings::default();

    let curves = pr_curves_iou_range(&eval, &settings).unwrap();
    prop_assert_eq!(curves.len(), NUM_IOU_THRESHOLDS);
    for (curve, &expected) in curves.iter().zip(&per_iou) {
      prop_assert_eq!(curve.precision.len(), NUM_RECALL_LEVELS);
      for v in &curve.precision {
        let v = v.unwrap();
        prop_assert!((v - expected).abs() < 1e-9);
      }
    }

    let expected = per_iou.iter().sum::<f64>() / NUM_IOU_THRESHOLDS as f64;
    let mean = pr_curve_iou_mean(&eval, &settings).unwrap();
    prop_assert_eq!(mean.label.as_str(), "IOU=mean");
    for v in &mean.precision {
      prop_assert!((v.unwrap() - expected).abs() < 1e-9);
    }
  }
}
