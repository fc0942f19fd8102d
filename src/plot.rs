// 该文件是 Detviz （检测可视化） 项目的一部分。
// src/plot.rs - 绘图模块
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

use crate::{evaluation::EvalError, mask::MaskError, precision::PrecisionError};

pub mod boxes;
pub mod chart;
pub mod counts;
pub mod figure;
pub mod grid;
pub mod pr;
pub mod settings;

pub use self::boxes::{
  PaintPixel, display_bboxes_mask, plot_boxes, plot_detection_vs_ground_truth, plot_mask,
};
pub use self::chart::{Chart, LegendPosition, LineStyle, Series};
pub use self::counts::{image_counts_chart, object_counts_chart, plot_counts_curves};
pub use self::figure::{Axes, FigSize, Figure};
pub use self::grid::{GridArgs, plot_grid};
pub use self::pr::{plot_pr_curves, pr_iou_mean_chart, pr_iou_range_chart};
pub use self::settings::{PlotSettings, bundled_font, default_font, load_font};

#[derive(Error, Debug)]
pub enum PlotError {
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("图像错误: {0}")]
  ImageError(#[from] image::ImageError),
  #[error("字体错误: {0}")]
  FontError(String),
  #[error("掩码错误: {0}")]
  MaskError(#[from] MaskError),
  #[error("精度表错误: {0}")]
  PrecisionError(#[from] PrecisionError),
  #[error("评估错误: {0}")]
  EvalError(#[from] EvalError),
  #[error("无效数据序列 '{label}': {reason}")]
  InvalidSeries { label: String, reason: String },
  #[error("无效布局: {0}")]
  InvalidLayout(String),
  #[error("网格参数不足: 已填充 {filled} / {total} 个子图")]
  GridArgsExhausted { filled: usize, total: usize },
}
