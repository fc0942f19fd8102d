// 该文件是 Detviz （检测可视化） 项目的一部分。
// src/plot/counts.rs - 错误计数随分数阈值变化的曲线图
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
  bbox::Bbox,
  evaluation::{CountCurves, EvalConfig, GroundTruthSource, ims_eval_detections},
  plot::{Chart, FigSize, Figure, LegendPosition, LineStyle, PlotError, PlotSettings, Series},
};

const NEGATIVE: LineStyle = LineStyle::solid([191, 191, 0]); // y
const ERROR: LineStyle = LineStyle::solid([255, 0, 0]); // r
const WRONG: LineStyle = LineStyle::dotted([0, 128, 0]); // g:
const MISSED: LineStyle = LineStyle::dotted([0, 0, 255]); // b:

const Y_HEADROOM: f64 = 1.05;

fn counts_axes(title: &str, curves: &CountCurves, series: &[Series]) -> Chart {
  let thresholds = &curves.score_thresholds;
  let (x_lo, x_hi) = match (thresholds.first(), thresholds.last()) {
    (Some(&lo), Some(&hi)) if lo < hi => (lo as f64, hi as f64),
    (Some(&t), _) => (t as f64 - 0.05, t as f64 + 0.05),
    _ => (0.0, 1.0),
  };
  let y_max = series
    .iter()
    .filter_map(Series::y_max)
    .fold(1.0, f64::max);

  series.iter().cloned().fold(
    Chart::new(title)
      .x_label("Score threshold")
      .y_label("Frequency")
      .x_range(x_lo, x_hi)
      .y_range(0.0, y_max * Y_HEADROOM)
      .grid(true)
      .legend(LegendPosition::UpperRight),
    Chart::series,
  )
}

/// 图像级计数曲线
pub fn image_counts_chart(curves: &CountCurves) -> Result<Chart, PlotError> {
  let t = &curves.score_thresholds;
  let mut series = Vec::with_capacity(4);
  if let Some(neg) = &curves.im_neg_det_counts {
    series.push(Series::from_counts("Negative images with detections", t, neg, NEGATIVE)?);
  }
  series.push(Series::from_counts(
    "Images with missed gt or wrong detections",
    t,
    &curves.im_error_counts,
    ERROR,
  )?);
  series.push(Series::from_counts(
    "Images with wrong detections",
    t,
    &curves.im_wrong_det_counts,
    WRONG,
  )?);
  series.push(Series::from_counts(
    "Images with missed ground truth",
    t,
    &curves.im_missed_gt_counts,
    MISSED,
  )?);

  Ok(counts_axes("Image counts", curves, &series))
}

/// 目标级计数曲线
pub fn object_counts_chart(curves: &CountCurves) -> Result<Chart, PlotError> {
  let t = &curves.score_thresholds;
  let mut series = Vec::with_capacity(3);
  if let Some(neg) = &curves.obj_neg_det_counts {
    series.push(Series::from_counts(
      "Total number of detections within negative images",
      t,
      neg,
      NEGATIVE,
    )?);
  }
  series.push(Series::from_counts(
    "Total number of wrong detections",
    t,
    &curves.obj_wrong_det_counts,
    WRONG,
  )?);
  series.push(Series::from_counts(
    "Total number of missed ground truths",
    t,
    &curves.obj_missed_gt_counts,
    MISSED,
  )?);

  Ok(counts_axes("Object counts", curves, &series))
}

/// 统计各阈值下的错误并绘制图像级（左）与目标级（右）曲线
pub fn plot_counts_curves<D: GroundTruthSource + ?Sized>(
  detections: &[Vec<Bbox>],
  dataset: &D,
  detections_neg: Option<&[Vec<Bbox>]>,
  config: &EvalConfig,
  figsize: FigSize,
  settings: &PlotSettings,
) -> Result<RgbImage, PlotError> {
  let curves = ims_eval_detections(detections, dataset, detections_neg, config)?;
  info!(
    "统计完成: {} 个阈值, {} 张图像",
    curves.score_thresholds.len(),
    detections.len()
  );

  let image_chart = image_counts_chart(&curves)?;
  let object_chart = object_counts_chart(&curves)?;

  let mut fig = Figure::subplots(1, 2, figsize)?;
  if let Some(ax) = fig.axes(0, 0) {
    ax.show_chart(&image_chart, settings.font.as_ref())?;
  }
  if let Some(ax) = fig.axes(0, 1) {
    ax.show_chart(&object_chart, settings.font.as_ref())?;
  }
  Ok(fig.render())
}
