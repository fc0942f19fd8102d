// 该文件是 Detviz （检测可视化） 项目的一部分。
// src/bbox.rs - 边界框定义
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

use serde::{Deserialize, Serialize};

/// 背景类别编号，永远不绘制
pub const BACKGROUND_LABEL: u32 = 0;

/// 轴对齐边界框，像素坐标 [left, top, right, bottom]
///
/// 标注框（真值）没有置信度，检测框带有置信度。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bbox {
  pub left: f32,
  pub top: f32,
  pub right: f32,
  pub bottom: f32,
  pub label_idx: u32,
  pub label_name: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub score: Option<f32>,
}

impl Bbox {
  /// 创建标注框
  pub fn annotation(
    left: f32,
    top: f32,
    right: f32,
    bottom: f32,
    label_idx: u32,
    label_name: impl Into<String>,
  ) -> Self {
    Self {
      left,
      top,
      right,
      bottom,
      label_idx,
      label_name: label_name.into(),
      score: None,
    }
  }

  /// 创建检测框
  pub fn detection(
    left: f32,
    top: f32,
    right: f32,
    bottom: f32,
    label_idx: u32,
    label_name: impl Into<String>,
    score: f32,
  ) -> Self {
    Self {
      score: Some(score),
      ..Self::annotation(left, top, right, bottom, label_idx, label_name)
    }
  }

  pub fn is_background(&self) -> bool {
    self.label_idx == BACKGROUND_LABEL
  }

  pub fn is_detection(&self) -> bool {
    self.score.is_some()
  }

  /// 置信度，标注框视为 1.0
  pub fn confidence(&self) -> f32 {
    self.score.unwrap_or(1.0)
  }

  pub fn width(&self) -> f32 {
    (self.right - self.left).max(0.0)
  }

  pub fn height(&self) -> f32 {
    (self.bottom - self.top).max(0.0)
  }

  pub fn area(&self) -> f32 {
    self.width() * self.height()
  }

  /// 交并比，无重叠或面积为零时返回 0
  pub fn iou(&self, other: &Bbox) -> f32 {
    let x_left = self.left.max(other.left);
    let y_top = self.top.max(other.top);
    let x_right = self.right.min(other.right);
    let y_bottom = self.bottom.min(other.bottom);

    if x_right <= x_left || y_bottom <= y_top {
      return 0.0;
    }

    let intersection = (x_right - x_left) * (y_bottom - y_top);
    let union = self.area() + other.area() - intersection;
    if union <= 0.0 {
      return 0.0;
    }

    intersection / union
  }
}
