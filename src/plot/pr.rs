// 该文件是 Detviz （检测可视化） 项目的一部分。
// src/plot/pr.rs - 精度-召回曲线图
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

use image::RgbImage;
use tracing::info;

use crate::{
  plot::{Chart, FigSize, Figure, LegendPosition, LineStyle, PlotError, PlotSettings, Series},
  precision::{
    CocoEvaluator, PrCurve, PrSettings, PrecisionError, PrecisionSource, pr_curve_iou_mean,
    pr_curves_iou_range, recall_levels,
  },
};

const MEAN_COLOR: [u8; 3] = [0, 0, 0];

/// hsv 色环上均匀分布的第 `i` 个颜色（共 `n` 个）
fn hsv_color(i: usize, n: usize) -> [u8; 3] {
  let h = i as f32 / n.max(1) as f32 * 6.0;
  let x = 1.0 - (h % 2.0 - 1.0).abs();
  let (r, g, b) = match h as u32 {
    0 => (1.0, x, 0.0),
    1 => (x, 1.0, 0.0),
    2 => (0.0, 1.0, x),
    3 => (0.0, x, 1.0),
    4 => (x, 0.0, 1.0),
    _ => (1.0, 0.0, x),
  };
  [
    (r * 255.0f32).round() as u8,
    (g * 255.0f32).round() as u8,
    (b * 255.0f32).round() as u8,
  ]
}

fn pr_axes(title: String) -> Chart {
  Chart::new(title)
    .x_label("recall")
    .y_label("precision")
    .x_range(0.0, 1.0)
    .y_range(0.0, 1.01)
    .grid(true)
    .legend(LegendPosition::LowerLeft)
}

fn curve_series(curve: PrCurve, style: LineStyle) -> Result<Series, PlotError> {
  Series::new(curve.label, recall_levels(), curve.precision, style)
}

/// 各 IoU 阈值下的 PR 曲线图
pub fn pr_iou_range_chart<E: PrecisionSource + ?Sized>(
  eval: &E,
  iou_type: &str,
  settings: &PrSettings,
) -> Result<Chart, PlotError> {
  let curves = pr_curves_iou_range(eval, settings)?;
  let n = curves.len();
  let mut chart = pr_axes(format!(
    "Precision-Recall Curve ({}) @ different IoU Thresholds",
    iou_type
  ));
  for (i, curve) in curves.into_iter().enumerate() {
    chart = chart.series(curve_series(curve, LineStyle::solid(hsv_color(i, n)))?);
  }
  Ok(chart)
}

/// 在 IoU 阈值上取均值的 PR 曲线图
pub fn pr_iou_mean_chart<E: PrecisionSource + ?Sized>(
  eval: &E,
  iou_type: &str,
  settings: &PrSettings,
) -> Result<Chart, PlotError> {
  let curve = pr_curve_iou_mean(eval, settings)?;
  Ok(
    pr_axes(format!(
      "Precision-Recall Curve ({}) - Mean over IoU Thresholds",
      iou_type
    ))
    .series(curve_series(curve, LineStyle::solid(MEAN_COLOR))?),
  )
}

/// 每种 IoU 类型一行，左侧为各阈值曲线，右侧为均值曲线
///
/// 任一评估结果未累积时返回 [`PrecisionError::NotAccumulated`]。
pub fn plot_pr_curves(
  evaluator: &CocoEvaluator,
  figsize: FigSize,
  settings: &PlotSettings,
) -> Result<RgbImage, PlotError> {
  if evaluator.is_empty() {
    return Err(PrecisionError::NotAccumulated.into());
  }

  let pr_settings = PrSettings::default();
  let mut fig = Figure::subplots(evaluator.len(), 2, figsize)?;
  for (row, (iou_type, eval)) in evaluator.iter().enumerate() {
    info!("绘制 {} 的 PR 曲线", iou_type);
    let range = pr_iou_range_chart(eval, iou_type, &pr_settings)?;
    let mean = pr_iou_mean_chart(eval, iou_type, &pr_settings)?;

    if let Some(ax) = fig.axes(row, 0) {
      ax.show_chart(&range, settings.font.as_ref())?;
    }
    if let Some(ax) = fig.axes(row, 1) {
      ax.show_chart(&mean, settings.font.as_ref())?;
    }
  }

  Ok(fig.render())
}
