// 该文件是 Detviz （检测可视化） 项目的一部分。
// src/evaluation.rs - 按分数阈值统计检测错误
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

use thiserror::Error;
use tracing::{debug, info};

use crate::bbox::Bbox;

pub mod matching;
pub use self::matching::{MatchCounts, match_boxes};

/// 默认匹配 IoU 阈值
pub const DEFAULT_IOU_THRESHOLD: f32 = 0.5;
/// 默认分数阈值个数，[0, 1] 等分
pub const DEFAULT_THRESHOLD_STEPS: usize = 51;

#[derive(Error, Debug)]
pub enum EvalError {
  #[error("检测结果数量 ({detections}) 与数据集大小 ({dataset}) 不一致")]
  LengthMismatch { detections: usize, dataset: usize },
  #[error("数据集中缺少第 {0} 张图像的标注")]
  MissingAnnotations(usize),
  #[error("无效阈值: {0}")]
  InvalidThreshold(String),
}

/// 可按下标访问真值框的数据集
pub trait GroundTruthSource {
  fn len(&self) -> usize;

  fn annotations(&self, index: usize) -> Option<&[Bbox]>;

  fn is_empty(&self) -> bool {
    self.len() == 0
  }
}

impl GroundTruthSource for [Vec<Bbox>] {
  fn len(&self) -> usize {
    <[Vec<Bbox>]>::len(self)
  }

  fn annotations(&self, index: usize) -> Option<&[Bbox]> {
    self.get(index).map(Vec::as_slice)
  }
}

impl GroundTruthSource for Vec<Vec<Bbox>> {
  fn len(&self) -> usize {
    self.as_slice().len()
  }

  fn annotations(&self, index: usize) -> Option<&[Bbox]> {
    self.as_slice().annotations(index)
  }
}

/// 数据集的子集视图，按给定下标顺序访问
pub struct Subset<'a, D: ?Sized> {
  dataset: &'a D,
  indices: Vec<usize>,
}

impl<'a, D: GroundTruthSource + ?Sized> Subset<'a, D> {
  pub fn new(dataset: &'a D, indices: Vec<usize>) -> Self {
    Self { dataset, indices }
  }
}

impl<D: GroundTruthSource + ?Sized> GroundTruthSource for Subset<'_, D> {
  fn len(&self) -> usize {
    self.indices.len()
  }

  fn annotations(&self, index: usize) -> Option<&[Bbox]> {
    self
      .indices
      .get(index)
      .and_then(|&i| self.dataset.annotations(i))
  }
}

/// 评估配置
#[derive(Debug, Clone, PartialEq)]
pub struct EvalConfig {
  pub iou_threshold: f32,
  pub score_thresholds: Vec<f32>,
}

impl Default for EvalConfig {
  fn default() -> Self {
    Self {
      iou_threshold: DEFAULT_IOU_THRESHOLD,
      score_thresholds: linspace(0.0, 1.0, DEFAULT_THRESHOLD_STEPS),
    }
  }
}

impl EvalConfig {
  pub fn with_score_thresholds(mut self, thresholds: Vec<f32>) -> Self {
    self.score_thresholds = thresholds;
    self
  }

  pub fn with_iou_threshold(mut self, iou_threshold: f32) -> Self {
    self.iou_threshold = iou_threshold;
    self
  }

  fn validate(&self) -> Result<(), EvalError> {
    if !(0.0..=1.0).contains(&self.iou_threshold) {
      return Err(EvalError::InvalidThreshold(format!(
        "IoU 阈值必须在 [0, 1] 之间, 实际为 {}",
        self.iou_threshold
      )));
    }
    if self.score_thresholds.is_empty() {
      return Err(EvalError::InvalidThreshold("分数阈值序列为空".to_string()));
    }
    if let Some(t) = self
      .score_thresholds
      .iter()
      .find(|t| !(0.0..=1.0).contains(*t))
    {
      return Err(EvalError::InvalidThreshold(format!(
        "分数阈值必须在 [0, 1] 之间, 实际为 {}",
        t
      )));
    }
    if self.score_thresholds.windows(2).any(|w| w[0] >= w[1]) {
      return Err(EvalError::InvalidThreshold(
        "分数阈值必须严格递增".to_string(),
      ));
    }
    Ok(())
  }
}

/// [start, end] 上等间距的 `steps` 个取值
pub fn linspace(start: f32, end: f32, steps: usize) -> Vec<f32> {
  match steps {
    0 => Vec::new(),
    1 => vec![start],
    _ => {
      let step = (end - start) / (steps - 1) as f32;
      (0..steps).map(|i| start + step * i as f32).collect()
    }
  }
}

/// 分数不低于阈值的检测框数量
pub fn count_active(detections: &[Bbox], threshold: f32) -> usize {
  detections
    .iter()
    .filter(|d| d.confidence() >= threshold)
    .count()
}

/// 各分数阈值下的图像级与目标级统计
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CountCurves {
  pub score_thresholds: Vec<f32>,
  /// 存在漏检或误检的图像数
  pub im_error_counts: Vec<usize>,
  /// 存在误检的图像数
  pub im_wrong_det_counts: Vec<usize>,
  /// 存在漏检的图像数
  pub im_missed_gt_counts: Vec<usize>,
  /// 误检框总数
  pub obj_wrong_det_counts: Vec<usize>,
  /// 漏检真值框总数
  pub obj_missed_gt_counts: Vec<usize>,
  /// 负样本图像中存在检测框的图像数
  pub im_neg_det_counts: Option<Vec<usize>>,
  /// 负样本图像中的检测框总数
  pub obj_neg_det_counts: Option<Vec<usize>>,
}

/// 在分数阈值序列上统计各类错误
///
/// `detections` 按数据集顺序给出每张图像的检测框；`detections_neg` 为
/// 不含任何目标的负样本图像上的检测结果。
pub fn ims_eval_detections<D: GroundTruthSource + ?Sized>(
  detections: &[Vec<Bbox>],
  dataset: &D,
  detections_neg: Option<&[Vec<Bbox>]>,
  config: &EvalConfig,
) -> Result<CountCurves, EvalError> {
  config.validate()?;

  if detections.len() != dataset.len() {
    return Err(EvalError::LengthMismatch {
      detections: detections.len(),
      dataset: dataset.len(),
    });
  }

  let ground_truths = (0..dataset.len())
    .map(|i| dataset.annotations(i).ok_or(EvalError::MissingAnnotations(i)))
    .collect::<Result<Vec<_>, _>>()?;

  info!(
    "统计 {} 张图像, {} 个分数阈值",
    detections.len(),
    config.score_thresholds.len()
  );

  let steps = config.score_thresholds.len();
  let mut curves = CountCurves {
    score_thresholds: config.score_thresholds.clone(),
    im_error_counts: Vec::with_capacity(steps),
    im_wrong_det_counts: Vec::with_capacity(steps),
    im_missed_gt_counts: Vec::with_capacity(steps),
    obj_wrong_det_counts: Vec::with_capacity(steps),
    obj_missed_gt_counts: Vec::with_capacity(steps),
    im_neg_det_counts: detections_neg.map(|_| Vec::with_capacity(steps)),
    obj_neg_det_counts: detections_neg.map(|_| Vec::with_capacity(steps)),
  };

  for &threshold in &config.score_thresholds {
    let mut im_error = 0;
    let mut im_wrong_det = 0;
    let mut im_missed_gt = 0;
    let mut obj_wrong_det = 0;
    let mut obj_missed_gt = 0;

    for (dets, gts) in detections.iter().zip(&ground_truths) {
      let active: Vec<&Bbox> = dets
        .iter()
        .filter(|d| d.confidence() >= threshold)
        .collect();
      let counts = match_boxes(&active, gts, config.iou_threshold);

      let wrong = counts.spurious > 0;
      let missed = counts.missed > 0;
      im_wrong_det += wrong as usize;
      im_missed_gt += missed as usize;
      im_error += (wrong || missed) as usize;
      obj_wrong_det += counts.spurious;
      obj_missed_gt += counts.missed;
    }

    debug!(
      "阈值 {:.2}: 错误图像 {}, 误检图像 {}, 漏检图像 {}",
      threshold, im_error, im_wrong_det, im_missed_gt
    );

    curves.im_error_counts.push(im_error);
    curves.im_wrong_det_counts.push(im_wrong_det);
    curves.im_missed_gt_counts.push(im_missed_gt);
    curves.obj_wrong_det_counts.push(obj_wrong_det);
    curves.obj_missed_gt_counts.push(obj_missed_gt);

    if let (Some(neg), Some(im_neg), Some(obj_neg)) = (
      detections_neg,
      curves.im_neg_det_counts.as_mut(),
      curves.obj_neg_det_counts.as_mut(),
    ) {
      let per_image: Vec<usize> = neg.iter().map(|d| count_active(d, threshold)).collect();
      im_neg.push(per_image.iter().filter(|&&n| n > 0).count());
      obj_neg.push(per_image.iter().sum());
    }
  }

  Ok(curves)
}
