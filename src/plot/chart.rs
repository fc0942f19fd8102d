// 该文件是 Detviz （检测可视化） 项目的一部分。
// src/plot/chart.rs - 折线图渲染
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

use ab_glyph::{FontArc, PxScale};
use image::{Rgb, RgbImage};
use imageproc::{
  drawing::{draw_filled_rect_mut, draw_hollow_rect_mut, draw_line_segment_mut, draw_text_mut, text_size},
  rect::Rect,
};

use crate::plot::PlotError;

// 布局常量（像素）
const MARGIN_LEFT: i32 = 60;
const MARGIN_RIGHT: i32 = 20;
const MARGIN_TOP: i32 = 36;
const MARGIN_BOTTOM: i32 = 48;
const TITLE_SIZE: f32 = 18.0;
const LABEL_SIZE: f32 = 15.0;
const TICK_SIZE: f32 = 12.0;
const LEGEND_SIZE: f32 = 12.0;
const LEGEND_SAMPLE: i32 = 24;
const LEGEND_PADDING: i32 = 6;
const MAX_TICK_INTERVALS: f64 = 6.0;

const WHITE: Rgb<u8> = Rgb([255, 255, 255]);
const BLACK: Rgb<u8> = Rgb([0, 0, 0]);
const GRID_COLOR: Rgb<u8> = Rgb([221, 221, 221]);
const LEGEND_BORDER: Rgb<u8> = Rgb([200, 200, 200]);

/// 线型：颜色与可选的虚线模式（实线长度, 间隔长度）
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineStyle {
  pub color: [u8; 3],
  pub dash: Option<(f32, f32)>,
}

impl LineStyle {
  pub const fn solid(color: [u8; 3]) -> Self {
    Self { color, dash: None }
  }

  pub const fn dotted(color: [u8; 3]) -> Self {
    Self {
      color,
      dash: Some((2.0, 4.0)),
    }
  }

  pub const fn dashed(color: [u8; 3]) -> Self {
    Self {
      color,
      dash: Some((8.0, 5.0)),
    }
  }
}

/// 一条数据序列，x 严格递增，`None` 值处断开
#[derive(Debug, Clone, PartialEq)]
pub struct Series {
  label: String,
  xs: Vec<f64>,
  ys: Vec<Option<f64>>,
  style: LineStyle,
}

impl Series {
  pub fn new(
    label: impl Into<String>,
    xs: Vec<f64>,
    ys: Vec<Option<f64>>,
    style: LineStyle,
  ) -> Result<Self, PlotError> {
    let label = label.into();
    let invalid = |reason: String| PlotError::InvalidSeries {
      label: label.clone(),
      reason,
    };

    if xs.len() != ys.len() {
      return Err(invalid(format!(
        "x 长度 {} 与 y 长度 {} 不一致",
        xs.len(),
        ys.len()
      )));
    }
    if xs.iter().any(|x| !x.is_finite()) {
      return Err(invalid("x 含有非有限值".to_string()));
    }
    if xs.windows(2).any(|w| w[0] >= w[1]) {
      return Err(invalid("x 必须严格递增".to_string()));
    }

    Ok(Self {
      label,
      xs,
      ys,
      style,
    })
  }

  /// 由分数阈值与计数构造
  pub fn from_counts(
    label: impl Into<String>,
    thresholds: &[f32],
    counts: &[usize],
    style: LineStyle,
  ) -> Result<Self, PlotError> {
    Self::new(
      label,
      thresholds.iter().map(|&t| t as f64).collect(),
      counts.iter().map(|&c| Some(c as f64)).collect(),
      style,
    )
  }

  pub fn label(&self) -> &str {
    &self.label
  }

  pub fn style(&self) -> LineStyle {
    self.style
  }

  pub fn len(&self) -> usize {
    self.xs.len()
  }

  pub fn is_empty(&self) -> bool {
    self.xs.is_empty()
  }

  /// 已定义的 y 最大值
  pub fn y_max(&self) -> Option<f64> {
    self.ys.iter().flatten().copied().reduce(f64::max)
  }

  fn segments(&self) -> impl Iterator<Item = ((f64, f64), (f64, f64))> + '_ {
    self
      .xs
      .windows(2)
      .zip(self.ys.windows(2))
      .filter_map(|(x, y)| match (y[0], y[1]) {
        (Some(y0), Some(y1)) => Some(((x[0], y0), (x[1], y1))),
        _ => None,
      })
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LegendPosition {
  #[default]
  UpperRight,
  UpperLeft,
  LowerLeft,
  LowerRight,
}

/// 折线图，坐标范围固定，不随数据变化
#[derive(Debug, Clone, PartialEq)]
pub struct Chart {
  title: String,
  x_label: String,
  y_label: String,
  x_range: (f64, f64),
  y_range: (f64, f64),
  grid: bool,
  legend: Option<LegendPosition>,
  series: Vec<Series>,
}

impl Chart {
  pub fn new(title: impl Into<String>) -> Self {
    Self {
      title: title.into(),
      x_label: String::new(),
      y_label: String::new(),
      x_range: (0.0, 1.0),
      y_range: (0.0, 1.0),
      grid: false,
      legend: None,
      series: Vec::new(),
    }
  }

  pub fn x_label(mut self, label: impl Into<String>) -> Self {
    self.x_label = label.into();
    self
  }

  pub fn y_label(mut self, label: impl Into<String>) -> Self {
    self.y_label = label.into();
    self
  }

  pub fn x_range(mut self, lo: f64, hi: f64) -> Self {
    self.x_range = (lo, hi);
    self
  }

  pub fn y_range(mut self, lo: f64, hi: f64) -> Self {
    self.y_range = (lo, hi);
    self
  }

  pub fn grid(mut self, grid: bool) -> Self {
    self.grid = grid;
    self
  }

  pub fn legend(mut self, position: LegendPosition) -> Self {
    self.legend = Some(position);
    self
  }

  pub fn series(mut self, series: Series) -> Self {
    self.series.push(series);
    self
  }

  pub fn title(&self) -> &str {
    &self.title
  }

  pub fn get_x_range(&self) -> (f64, f64) {
    self.x_range
  }

  pub fn get_y_range(&self) -> (f64, f64) {
    self.y_range
  }

  pub fn all_series(&self) -> &[Series] {
    &self.series
  }

  /// 渲染为 width × height 的图像，没有字体时只画线条
  pub fn render(&self, width: u32, height: u32, font: Option<&FontArc>) -> Result<RgbImage, PlotError> {
    let (x0, x1) = self.x_range;
    let (y0, y1) = self.y_range;
    if !(x1 > x0) || !(y1 > y0) {
      return Err(PlotError::InvalidLayout(format!(
        "坐标范围无效: x {:?}, y {:?}",
        self.x_range, self.y_range
      )));
    }

    let plot = PlotArea {
      left: MARGIN_LEFT,
      top: MARGIN_TOP,
      right: width as i32 - MARGIN_RIGHT,
      bottom: height as i32 - MARGIN_BOTTOM,
      x_range: self.x_range,
      y_range: self.y_range,
    };
    if plot.right - plot.left < 2 || plot.bottom - plot.top < 2 {
      return Err(PlotError::InvalidLayout(format!(
        "画布 {}x{} 过小",
        width, height
      )));
    }

    let mut canvas = RgbImage::from_pixel(width, height, WHITE);
    let x_ticks = ticks(x0, x1);
    let y_ticks = ticks(y0, y1);

    if self.grid {
      for &x in &x_ticks {
        let px = plot.px(x);
        draw_line_segment_mut(
          &mut canvas,
          (px, plot.top as f32),
          (px, plot.bottom as f32),
          GRID_COLOR,
        );
      }
      for &y in &y_ticks {
        let py = plot.py(y);
        draw_line_segment_mut(
          &mut canvas,
          (plot.left as f32, py),
          (plot.right as f32, py),
          GRID_COLOR,
        );
      }
    }

    for series in &self.series {
      let color = Rgb(series.style.color);
      let mut phase = 0.0;
      for ((ax, ay), (bx, by)) in series.segments() {
        let a = plot.clamp(plot.px(ax), plot.py(ay));
        let b = plot.clamp(plot.px(bx), plot.py(by));
        draw_styled_segment(&mut canvas, a, b, color, series.style.dash, &mut phase);
      }
    }

    draw_hollow_rect_mut(
      &mut canvas,
      Rect::at(plot.left, plot.top).of_size(
        (plot.right - plot.left + 1) as u32,
        (plot.bottom - plot.top + 1) as u32,
      ),
      BLACK,
    );

    if let Some(font) = font {
      self.draw_texts(&mut canvas, &plot, &x_ticks, &y_ticks, font);
    }
    if let Some(position) = self.legend {
      self.draw_legend(&mut canvas, &plot, position, font);
    }

    Ok(canvas)
  }

  fn draw_texts(
    &self,
    canvas: &mut RgbImage,
    plot: &PlotArea,
    x_ticks: &[f64],
    y_ticks: &[f64],
    font: &FontArc,
  ) {
    let height = canvas.height() as i32;

    let scale = PxScale::from(TITLE_SIZE);
    let (tw, _) = text_size(scale, font, &self.title);
    draw_text_mut(
      canvas,
      BLACK,
      (plot.left + plot.right - tw as i32) / 2,
      (MARGIN_TOP - TITLE_SIZE as i32) / 2,
      scale,
      font,
      &self.title,
    );

    let scale = PxScale::from(TICK_SIZE);
    let x_decimals = decimals(x_ticks);
    for &x in x_ticks {
      let text = format!("{:.*}", x_decimals, x);
      let (w, _) = text_size(scale, font, &text);
      draw_text_mut(
        canvas,
        BLACK,
        plot.px(x) as i32 - w as i32 / 2,
        plot.bottom + 4,
        scale,
        font,
        &text,
      );
    }
    let y_decimals = decimals(y_ticks);
    for &y in y_ticks {
      let text = format!("{:.*}", y_decimals, y);
      let (w, h) = text_size(scale, font, &text);
      draw_text_mut(
        canvas,
        BLACK,
        plot.left - 4 - w as i32,
        plot.py(y) as i32 - h as i32 / 2,
        scale,
        font,
        &text,
      );
    }

    let scale = PxScale::from(LABEL_SIZE);
    let (w, h) = text_size(scale, font, &self.x_label);
    draw_text_mut(
      canvas,
      BLACK,
      (plot.left + plot.right - w as i32) / 2,
      height - h as i32 - 4,
      scale,
      font,
      &self.x_label,
    );
    // 纵轴标签水平绘制于左上角
    draw_text_mut(
      canvas,
      BLACK,
      4,
      (plot.top - h as i32 - 2).max(0),
      scale,
      font,
      &self.y_label,
    );
  }

  fn draw_legend(
    &self,
    canvas: &mut RgbImage,
    plot: &PlotArea,
    position: LegendPosition,
    font: Option<&FontArc>,
  ) {
    if self.series.is_empty() {
      return;
    }

    let scale = PxScale::from(LEGEND_SIZE);
    let row_h = LEGEND_SIZE as i32 + 4;
    let text_w = font
      .map(|f| {
        self
          .series
          .iter()
          .map(|s| text_size(scale, f, &s.label).0 as i32)
          .max()
          .unwrap_or(0)
      })
      .unwrap_or(0);

    let box_w = LEGEND_PADDING * 3 + LEGEND_SAMPLE + text_w;
    let box_h = LEGEND_PADDING * 2 + row_h * self.series.len() as i32;
    let (bx, by) = match position {
      LegendPosition::UpperRight => (plot.right - box_w - 8, plot.top + 8),
      LegendPosition::UpperLeft => (plot.left + 8, plot.top + 8),
      LegendPosition::LowerLeft => (plot.left + 8, plot.bottom - box_h - 8),
      LegendPosition::LowerRight => (plot.right - box_w - 8, plot.bottom - box_h - 8),
    };
    let bx = bx.max(plot.left + 1);
    let by = by.max(plot.top + 1);

    let rect = Rect::at(bx, by).of_size(box_w.max(1) as u32, box_h.max(1) as u32);
    draw_filled_rect_mut(canvas, rect, WHITE);
    draw_hollow_rect_mut(canvas, rect, LEGEND_BORDER);

    for (i, series) in self.series.iter().enumerate() {
      let cy = (by + LEGEND_PADDING + row_h * i as i32 + row_h / 2) as f32;
      let sx = (bx + LEGEND_PADDING) as f32;
      let mut phase = 0.0;
      draw_styled_segment(
        canvas,
        (sx, cy),
        (sx + LEGEND_SAMPLE as f32, cy),
        Rgb(series.style.color),
        series.style.dash,
        &mut phase,
      );
      if let Some(font) = font {
        draw_text_mut(
          canvas,
          BLACK,
          bx + LEGEND_PADDING * 2 + LEGEND_SAMPLE,
          cy as i32 - LEGEND_SIZE as i32 / 2,
          scale,
          font,
          &series.label,
        );
      }
    }
  }
}

struct PlotArea {
  left: i32,
  top: i32,
  right: i32,
  bottom: i32,
  x_range: (f64, f64),
  y_range: (f64, f64),
}

impl PlotArea {
  fn px(&self, x: f64) -> f32 {
    let (lo, hi) = self.x_range;
    self.left as f32 + ((x - lo) / (hi - lo)) as f32 * (self.right - self.left) as f32
  }

  fn py(&self, y: f64) -> f32 {
    let (lo, hi) = self.y_range;
    self.bottom as f32 - ((y - lo) / (hi - lo)) as f32 * (self.bottom - self.top) as f32
  }

  fn clamp(&self, x: f32, y: f32) -> (f32, f32) {
    (
      x.clamp(self.left as f32, self.right as f32),
      y.clamp(self.top as f32, self.bottom as f32),
    )
  }
}

/// 两像素宽的线段，`dash` 为 (实线, 间隔) 长度，`phase` 在线段间延续
fn draw_styled_segment(
  canvas: &mut RgbImage,
  a: (f32, f32),
  b: (f32, f32),
  color: Rgb<u8>,
  dash: Option<(f32, f32)>,
  phase: &mut f32,
) {
  let mut stroke = |p: (f32, f32), q: (f32, f32)| {
    draw_line_segment_mut(canvas, p, q, color);
    draw_line_segment_mut(canvas, (p.0, p.1 + 1.0), (q.0, q.1 + 1.0), color);
  };

  let Some((on, off)) = dash else {
    stroke(a, b);
    return;
  };

  let (dx, dy) = (b.0 - a.0, b.1 - a.1);
  let length = (dx * dx + dy * dy).sqrt();
  let period = on + off;
  if length <= f32::EPSILON || period <= 0.0 {
    return;
  }

  let mut t = 0.0;
  while t < length {
    let pos = (*phase + t) % period;
    let (run, drawing) = if pos < on {
      (on - pos, true)
    } else {
      (period - pos, false)
    };
    let end = (t + run).min(length);
    if drawing {
      stroke(
        (a.0 + dx * t / length, a.1 + dy * t / length),
        (a.0 + dx * end / length, a.1 + dy * end / length),
      );
    }
    t = end;
  }
  *phase = (*phase + length) % period;
}

/// 以 1、2、5 × 10^k 为步长的刻度
fn ticks(lo: f64, hi: f64) -> Vec<f64> {
  let raw = (hi - lo) / MAX_TICK_INTERVALS;
  let magnitude = 10f64.powf(raw.log10().floor());
  let step = [1.0, 2.0, 5.0, 10.0]
    .iter()
    .map(|m| m * magnitude)
    .find(|s| *s >= raw * (1.0 - 1e-9))
    .unwrap_or(10.0 * magnitude);

  let start = (lo / step).ceil() as i64;
  let end = (hi / step + 1e-9).floor() as i64;
  (start..=end).map(|i| i as f64 * step).collect()
}

fn decimals(ticks: &[f64]) -> usize {
  match ticks {
    [a, b, ..] => (-(b - a).log10().floor()).max(0.0) as usize,
    _ => 1,
  }
}
