// 该文件是 Detviz （检测可视化） 项目的一部分。
// src/precision.rs - 从 COCO 精度表提取 PR 曲线
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

//! 精度表为五维数组 `[T, R, K, A, M]`：
//!
//! 1. `T` 10 个 IoU 阈值，0.50 到 0.95；
//! 2. `R` 101 个召回率水平，0.00 到 1.00；
//! 3. `K` 类别；
//! 4. `A` 目标面积范围（all、small、medium、large）；
//! 5. `M` 单张图像最大检测数（1、10、100）。
//!
//! 取值为 [0, 1] 的精度，或 -1 表示该格没有数据。

use ndarray::{Array5, ArrayView5, Axis, s};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

pub const NUM_IOU_THRESHOLDS: usize = 10;
pub const NUM_RECALL_LEVELS: usize = 101;

#[derive(Error, Debug)]
pub enum PrecisionError {
  #[error("评估器尚未调用 accumulate(), 精度表为空")]
  NotAccumulated,
  #[error("精度表形状不符: 期望 [{expected_t}, {expected_r}, K, A, M], 实际 {actual:?}")]
  ShapeMismatch {
    expected_t: usize,
    expected_r: usize,
    actual: Vec<usize>,
  },
  #[error("{axis} 下标 {index} 越界 (长度 {len})")]
  IndexOutOfRange {
    axis: &'static str,
    index: usize,
    len: usize,
  },
  #[error("扁平精度表长度 {actual} 与形状 {shape:?} 不符")]
  FlatLength { shape: [usize; 5], actual: usize },
}

/// 只读的评估结果接口
pub trait PrecisionSource {
  fn is_accumulated(&self) -> bool;

  fn precision(&self) -> Option<ArrayView5<'_, f64>>;
}

/// 单一 IoU 类型的评估结果
#[derive(Debug, Clone, PartialEq)]
pub struct CocoEval {
  pub accumulated: bool,
  pub precision: Array5<f64>,
}

impl CocoEval {
  /// 尚未累计的评估结果
  pub fn pending() -> Self {
    Self {
      accumulated: false,
      precision: Array5::zeros((0, 0, 0, 0, 0)),
    }
  }

  pub fn from_precision(precision: Array5<f64>) -> Self {
    Self {
      accumulated: true,
      precision,
    }
  }
}

impl PrecisionSource for CocoEval {
  fn is_accumulated(&self) -> bool {
    self.accumulated
  }

  fn precision(&self) -> Option<ArrayView5<'_, f64>> {
    self.accumulated.then(|| self.precision.view())
  }
}

/// 行优先展开的精度表，下标 `((((t * R + r) * K + k) * A + a) * M) + m`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlatPrecision {
  pub shape: [usize; 5],
  pub data: Vec<f64>,
}

impl TryFrom<FlatPrecision> for CocoEval {
  type Error = PrecisionError;

  fn try_from(flat: FlatPrecision) -> Result<Self, Self::Error> {
    let [t, r, k, a, m] = flat.shape;
    let actual = flat.data.len();
    let precision = Array5::from_shape_vec((t, r, k, a, m), flat.data).map_err(|_| {
      PrecisionError::FlatLength {
        shape: flat.shape,
        actual,
      }
    })?;
    Ok(CocoEval::from_precision(precision))
  }
}

/// 按 IoU 类型（bbox、segm 等）保存的评估结果，保持插入顺序
#[derive(Debug, Clone, Default)]
pub struct CocoEvaluator {
  evaluations: Vec<(String, CocoEval)>,
}

impl CocoEvaluator {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn with_eval(mut self, iou_type: impl Into<String>, eval: CocoEval) -> Self {
    let iou_type = iou_type.into();
    match self.evaluations.iter_mut().find(|(k, _)| *k == iou_type) {
      Some((_, slot)) => *slot = eval,
      None => self.evaluations.push((iou_type, eval)),
    }
    self
  }

  pub fn get(&self, iou_type: &str) -> Option<&CocoEval> {
    self
      .evaluations
      .iter()
      .find(|(k, _)| k == iou_type)
      .map(|(_, e)| e)
  }

  pub fn iter(&self) -> impl Iterator<Item = (&str, &CocoEval)> {
    self.evaluations.iter().map(|(k, e)| (k.as_str(), e))
  }

  pub fn len(&self) -> usize {
    self.evaluations.len()
  }

  pub fn is_empty(&self) -> bool {
    self.evaluations.is_empty()
  }
}

/// 面积范围
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AreaRange {
  #[default]
  All,
  Small,
  Medium,
  Large,
}

impl AreaRange {
  pub fn index(self) -> usize {
    match self {
      AreaRange::All => 0,
      AreaRange::Small => 1,
      AreaRange::Medium => 2,
      AreaRange::Large => 3,
    }
  }
}

/// 精度表切片设置
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PrSettings {
  pub area_range: AreaRange,
  /// 最大检测数下标，`None` 取最后一档
  pub max_dets_index: Option<usize>,
}

/// 一条 PR 曲线，与 [`recall_levels`] 一一对应，`None` 表示无数据
#[derive(Debug, Clone, PartialEq)]
pub struct PrCurve {
  pub label: String,
  pub precision: Vec<Option<f64>>,
}

/// 0.50, 0.55, ..., 0.95
pub fn iou_thresholds() -> Vec<f64> {
  (0..NUM_IOU_THRESHOLDS)
    .map(|i| (50 + 5 * i) as f64 / 100.0)
    .collect()
}

/// 0.00, 0.01, ..., 1.00
pub fn recall_levels() -> Vec<f64> {
  (0..NUM_RECALL_LEVELS).map(|i| i as f64 / 100.0).collect()
}

/// 忽略未定义值（负数）的均值
fn defined_mean(values: impl IntoIterator<Item = f64>) -> Option<f64> {
  let (sum, n) = values
    .into_iter()
    .filter(|v| *v >= 0.0)
    .fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
  (n > 0).then(|| sum / n as f64)
}

fn checked_table<'a, E: PrecisionSource + ?Sized>(
  eval: &'a E,
  settings: &PrSettings,
) -> Result<(ArrayView5<'a, f64>, usize, usize), PrecisionError> {
  let table = eval
    .precision()
    .filter(|p| eval.is_accumulated() && !p.is_empty())
    .ok_or(PrecisionError::NotAccumulated)?;

  let shape = table.shape();
  if shape[0] != NUM_IOU_THRESHOLDS || shape[1] != NUM_RECALL_LEVELS {
    return Err(PrecisionError::ShapeMismatch {
      expected_t: NUM_IOU_THRESHOLDS,
      expected_r: NUM_RECALL_LEVELS,
      actual: shape.to_vec(),
    });
  }

  let area = settings.area_range.index();
  if area >= shape[3] {
    return Err(PrecisionError::IndexOutOfRange {
      axis: "area_range",
      index: area,
      len: shape[3],
    });
  }

  let max_dets = settings.max_dets_index.unwrap_or(shape[4] - 1);
  if max_dets >= shape[4] {
    return Err(PrecisionError::IndexOutOfRange {
      axis: "max_dets",
      index: max_dets,
      len: shape[4],
    });
  }

  Ok((table, area, max_dets))
}

/// 每个 IoU 阈值一条曲线，在所有类别上取均值
pub fn pr_curves_iou_range<E: PrecisionSource + ?Sized>(
  eval: &E,
  settings: &PrSettings,
) -> Result<Vec<PrCurve>, PrecisionError> {
  let (table, area, max_dets) = checked_table(eval, settings)?;
  // [T, R, K]
  let slice = table.slice(s![.., .., .., area, max_dets]);
  debug!("精度切片形状: {:?}", slice.shape());

  Ok(
    iou_thresholds()
      .into_iter()
      .enumerate()
      .map(|(t, iou)| {
        let per_iou = slice.index_axis(Axis(0), t);
        let precision = per_iou
          .outer_iter()
          .map(|categories| defined_mean(categories.iter().copied()))
          .collect();
        PrCurve {
          label: format!("IOU={}", (iou * 100.0).round() / 100.0),
          precision,
        }
      })
      .collect(),
  )
}

/// 在所有 IoU 阈值的曲线上逐点取均值
pub fn pr_curve_iou_mean<E: PrecisionSource + ?Sized>(
  eval: &E,
  settings: &PrSettings,
) -> Result<PrCurve, PrecisionError> {
  let curves = pr_curves_iou_range(eval, settings)?;
  let precision = (0..NUM_RECALL_LEVELS)
    .map(|r| defined_mean(curves.iter().filter_map(|c| c.precision[r])))
    .collect();

  Ok(PrCurve {
    label: "IOU=mean".to_string(),
    precision,
  })
}
