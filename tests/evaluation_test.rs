// 该文件是 Detviz （检测可视化） 项目的一部分。
// tests/evaluation_test.rs - 阈值扫描统计集成测试
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

use detviz::evaluation::Subset;
use detviz::{Bbox, EvalConfig, EvalError, ims_eval_detections};

fn gt(left: f32, top: f32, label: u32) -> Bbox {
  Bbox::annotation(left, top, left + 10.0, top + 10.0, label, "obj")
}

fn det(left: f32, top: f32, label: u32, score: f32) -> Bbox {
  Bbox::detection(left, top, left + 10.0, top + 10.0, label, "obj", score)
}

/// 图像 A 有一个被 0.9 分检测命中的目标，图像 B 的目标始终漏检
fn two_images() -> (Vec<Vec<Bbox>>, Vec<Vec<Bbox>>) {
  let dataset = vec![vec![gt(0.0, 0.0, 1)], vec![gt(50.0, 50.0, 1)]];
  let detections = vec![vec![det(0.0, 0.0, 1, 0.9)], vec![]];
  (detections, dataset)
}

#[test]
fn test_error_transition_at_detection_score() {
  let (detections, dataset) = two_images();
  let config = EvalConfig::default().with_score_thresholds(vec![0.5, 0.9, 0.95]);
  let curves = ims_eval_detections(&detections, &dataset, None, &config).unwrap();

  assert_eq!(curves.score_thresholds, vec![0.5, 0.9, 0.95]);
  assert_eq!(curves.im_error_counts, vec![1, 1, 2]);
  assert_eq!(curves.im_wrong_det_counts, vec![0, 0, 0]);
  assert_eq!(curves.im_missed_gt_counts, vec![1, 1, 2]);
  assert_eq!(curves.obj_wrong_det_counts, vec![0, 0, 0]);
  assert_eq!(curves.obj_missed_gt_counts, vec![1, 1, 2]);
  assert!(curves.im_neg_det_counts.is_none());
  assert!(curves.obj_neg_det_counts.is_none());
}

#[test]
fn test_two_point_sweep() {
  let (detections, dataset) = two_images();
  let config = EvalConfig::default().with_score_thresholds(vec![0.5, 0.95]);
  let curves = ims_eval_detections(&detections, &dataset, None, &config).unwrap();
  assert_eq!(curves.im_error_counts, vec![1, 2]);
}

#[test]
fn test_default_sweep_lengths() {
  let (detections, dataset) = two_images();
  let curves = ims_eval_detections(&detections, &dataset, None, &EvalConfig::default()).unwrap();
  assert_eq!(curves.score_thresholds.len(), 51);
  assert_eq!(curves.im_error_counts.len(), 51);
  assert_eq!(curves.obj_missed_gt_counts.len(), 51);
}

#[test]
fn test_wrong_label_is_wrong_and_missed() {
  let dataset = vec![vec![gt(0.0, 0.0, 1)]];
  let detections = vec![vec![det(0.0, 0.0, 2, 0.8)]];
  let config = EvalConfig::default().with_score_thresholds(vec![0.5]);
  let curves = ims_eval_detections(&detections, &dataset, None, &config).unwrap();
  assert_eq!(curves.im_error_counts, vec![1]);
  assert_eq!(curves.im_wrong_det_counts, vec![1]);
  assert_eq!(curves.im_missed_gt_counts, vec![1]);
  assert_eq!(curves.obj_wrong_det_counts, vec![1]);
  assert_eq!(curves.obj_missed_gt_counts, vec![1]);
}

#[test]
fn test_duplicate_detection_is_spurious() {
  let dataset = vec![vec![gt(0.0, 0.0, 1)]];
  let detections = vec![vec![det(0.0, 0.0, 1, 0.9), det(1.0, 0.0, 1, 0.7)]];
  let config = EvalConfig::default().with_score_thresholds(vec![0.5, 0.8]);
  let curves = ims_eval_detections(&detections, &dataset, None, &config).unwrap();
  assert_eq!(curves.obj_wrong_det_counts, vec![1, 0]);
  assert_eq!(curves.im_error_counts, vec![1, 0]);
  assert_eq!(curves.obj_missed_gt_counts, vec![0, 0]);
}

#[test]
fn test_negative_image_counts() {
  let (detections, dataset) = two_images();
  let negatives = vec![
    vec![det(0.0, 0.0, 1, 0.3), det(20.0, 20.0, 1, 0.8)],
    vec![],
    vec![det(5.0, 5.0, 3, 0.6)],
  ];
  let config = EvalConfig::default().with_score_thresholds(vec![0.0, 0.5, 0.9]);
  let curves = ims_eval_detections(&detections, &dataset, Some(negatives.as_slice()), &config).unwrap();
  assert_eq!(curves.im_neg_det_counts, Some(vec![2, 2, 0]));
  assert_eq!(curves.obj_neg_det_counts, Some(vec![3, 2, 0]));
}

#[test]
fn test_length_mismatch() {
  let (detections, dataset) = two_images();
  let err = ims_eval_detections(&detections[..1], &dataset, None, &EvalConfig::default()).unwrap_err();
  assert!(matches!(
    err,
    EvalError::LengthMismatch {
      detections: 1,
      dataset: 2
    }
  ));
}

#[test]
fn test_subset_reorders_ground_truth() {
  let (_, dataset) = two_images();
  // 子集顺序为 B, A
  let subset = Subset::new(&dataset, vec![1, 0]);
  let detections = vec![vec![], vec![det(0.0, 0.0, 1, 0.9)]];
  let config = EvalConfig::default().with_score_thresholds(vec![0.5]);
  let curves = ims_eval_detections(&detections, &subset, None, &config).unwrap();
  assert_eq!(curves.im_error_counts, vec![1]);
}

#[test]
fn test_stricter_iou_turns_match_into_error() {
  let dataset = vec![vec![gt(0.0, 0.0, 1)]];
  // IoU = 50 / 150
  let detections = vec![vec![det(5.0, 0.0, 1, 0.9)]];
  let loose = EvalConfig::default()
    .with_score_thresholds(vec![0.5])
    .with_iou_threshold(0.3);
  let strict = loose.clone().with_iou_threshold(0.5);
  let a = ims_eval_detections(&detections, &dataset, None, &loose).unwrap();
  let b = ims_eval_detections(&detections, &dataset, None, &strict).unwrap();
  assert_eq!(a.im_error_counts, vec![0]);
  assert_eq!(b.im_error_counts, vec![1]);
}

#[test]
fn test_invalid_config_rejected() {
  let (detections, dataset) = two_images();
  let config = EvalConfig::default().with_score_thresholds(vec![0.9, 0.1]);
  assert!(matches!(
    ims_eval_detections(&detections, &dataset, None, &config),
    Err(EvalError::InvalidThreshold(_))
  ));
}
