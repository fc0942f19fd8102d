// 该文件是 Detviz （检测可视化） 项目的一部分。
// src/plot/figure.rs - 画布与子图
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

use ab_glyph::FontArc;
use image::{DynamicImage, Rgb, RgbImage, imageops};

use crate::plot::{Chart, PlotError};

/// 每英寸像素数
pub const DPI: f32 = 50.0;

const BACKGROUND: Rgb<u8> = Rgb([255, 255, 255]);

/// 画布尺寸，单位英寸
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FigSize {
  pub width: f32,
  pub height: f32,
}

impl FigSize {
  pub fn new(width: f32, height: f32) -> Self {
    Self { width, height }
  }

  pub fn pixels(&self) -> (u32, u32) {
    (
      (self.width * DPI).round().max(1.0) as u32,
      (self.height * DPI).round().max(1.0) as u32,
    )
  }
}

/// 一个子图，持有自己的像素画布
#[derive(Debug, Clone)]
pub struct Axes {
  canvas: RgbImage,
}

impl Axes {
  pub fn new(width: u32, height: u32) -> Self {
    Self {
      canvas: RgbImage::from_pixel(width, height, BACKGROUND),
    }
  }

  pub fn width(&self) -> u32 {
    self.canvas.width()
  }

  pub fn height(&self) -> u32 {
    self.canvas.height()
  }

  pub fn canvas(&self) -> &RgbImage {
    &self.canvas
  }

  pub fn into_canvas(self) -> RgbImage {
    self.canvas
  }

  /// 等比缩放后居中显示图像，不绘制坐标轴
  pub fn show_image(&mut self, image: &DynamicImage) {
    let (w, h) = (self.width(), self.height());
    self.canvas = RgbImage::from_pixel(w, h, BACKGROUND);
    if image.width() == 0 || image.height() == 0 {
      return;
    }

    let scale = (w as f32 / image.width() as f32).min(h as f32 / image.height() as f32);
    let tw = ((image.width() as f32 * scale).round() as u32).clamp(1, w);
    let th = ((image.height() as f32 * scale).round() as u32).clamp(1, h);
    let resized = image.resize_exact(tw, th, imageops::FilterType::Triangle).to_rgb8();
    let x = (w - tw) / 2;
    let y = (h - th) / 2;
    imageops::replace(&mut self.canvas, &resized, x as i64, y as i64);
  }

  /// 在子图中绘制折线图
  pub fn show_chart(&mut self, chart: &Chart, font: Option<&FontArc>) -> Result<(), PlotError> {
    self.canvas = chart.render(self.width(), self.height(), font)?;
    Ok(())
  }
}

/// rows × cols 的子图网格
#[derive(Debug, Clone)]
pub struct Figure {
  rows: usize,
  cols: usize,
  width: u32,
  height: u32,
  axes: Vec<Axes>,
}

impl Figure {
  pub fn subplots(rows: usize, cols: usize, figsize: FigSize) -> Result<Self, PlotError> {
    if rows == 0 || cols == 0 {
      return Err(PlotError::InvalidLayout(format!(
        "行列数必须大于 0, 实际为 {}x{}",
        rows, cols
      )));
    }

    let (width, height) = figsize.pixels();
    let cell_w = width / cols as u32;
    let cell_h = height / rows as u32;
    if cell_w == 0 || cell_h == 0 {
      return Err(PlotError::InvalidLayout(format!(
        "画布 {}x{} 过小, 无法划分为 {}x{} 个子图",
        width, height, rows, cols
      )));
    }

    Ok(Self {
      rows,
      cols,
      width,
      height,
      axes: (0..rows * cols).map(|_| Axes::new(cell_w, cell_h)).collect(),
    })
  }

  pub fn rows(&self) -> usize {
    self.rows
  }

  pub fn cols(&self) -> usize {
    self.cols
  }

  pub fn axes(&mut self, row: usize, col: usize) -> Option<&mut Axes> {
    if row >= self.rows || col >= self.cols {
      return None;
    }
    self.axes.get_mut(row * self.cols + col)
  }

  /// 按行优先顺序遍历子图
  pub fn axes_iter_mut(&mut self) -> impl Iterator<Item = &mut Axes> {
    self.axes.iter_mut()
  }

  pub fn render(self) -> RgbImage {
    let mut out = RgbImage::from_pixel(self.width, self.height, BACKGROUND);
    for (i, ax) in self.axes.iter().enumerate() {
      let (row, col) = (i / self.cols, i % self.cols);
      let x = col as u32 * ax.width();
      let y = row as u32 * ax.height();
      imageops::replace(&mut out, ax.canvas(), x as i64, y as i64);
    }
    out
  }
}
