// 该文件是 Detviz （检测可视化） 项目的一部分。
// src/plot/boxes.rs - 在图像上绘制边界框与掩码
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

use std::path::Path;

use ab_glyph::PxScale;
use image::{DynamicImage, ImageBuffer, ImageReader, Pixel, Rgb, RgbImage, Rgba, RgbaImage};
use imageproc::{
  drawing::{draw_hollow_rect_mut, draw_text_mut},
  rect::Rect,
};
use tracing::debug;

use crate::{
  bbox::Bbox,
  mask::{Mask, alpha_composite, colorise},
  plot::{Axes, PlotError, PlotSettings},
};

const DETECTION_COLOR: [u8; 3] = [255, 0, 0]; // 红色
const ANNOTATION_COLOR: [u8; 3] = [0, 255, 0]; // 绿色
// 对比图中文字缩到最小，只看框
const VERSUS_TEXT_SIZE: f32 = 1.0;

/// 可以用 RGB 颜色绘制的像素类型
pub trait PaintPixel: Pixel<Subpixel = u8> + 'static {
  fn from_rgb(rgb: [u8; 3]) -> Self;
}

impl PaintPixel for Rgb<u8> {
  fn from_rgb(rgb: [u8; 3]) -> Self {
    Rgb(rgb)
  }
}

impl PaintPixel for Rgba<u8> {
  fn from_rgb(rgb: [u8; 3]) -> Self {
    Rgba([rgb[0], rgb[1], rgb[2], 255])
  }
}

/// 裁剪到图像范围内的像素坐标 (x_min, y_min, x_max, y_max)，完全在图像外时为 `None`
fn clamp_to_image(bbox: &Bbox, width: u32, height: u32) -> Option<(i32, i32, i32, i32)> {
  if width == 0 || height == 0 {
    return None;
  }
  let (w, h) = ((width - 1) as f32, (height - 1) as f32);

  let x_min = bbox.left.round().max(0.0);
  let y_min = bbox.top.round().max(0.0);
  let x_max = bbox.right.round().min(w);
  let y_max = bbox.bottom.round().min(h);
  // NaN 坐标同样视为不可见
  if !(x_min <= x_max && y_min <= y_max) {
    return None;
  }
  Some((x_min as i32, y_min as i32, x_max as i32, y_max as i32))
}

/// 绘制宽度为 `thickness` 的矩形边框，边框向内加粗
fn draw_thick_rect<P: PaintPixel>(
  image: &mut ImageBuffer<P, Vec<u8>>,
  (x_min, y_min, x_max, y_max): (i32, i32, i32, i32),
  thickness: u32,
  color: P,
) {
  for t in 0..thickness.max(1) as i32 {
    let w = x_max - x_min + 1 - 2 * t;
    let h = y_max - y_min + 1 - 2 * t;
    if w <= 0 || h <= 0 {
      break;
    }
    let rect = Rect::at(x_min + t, y_min + t).of_size(w as u32, h as u32);
    draw_hollow_rect_mut(image, rect, color);
  }
}

/// 在图像副本上绘制边界框与类别名，返回新图像
///
/// 背景框（类别 0）不绘制；`title` 仅在至少绘制了一个边界框时写在左上角。
/// 没有字体时只绘制边框。
pub fn plot_boxes<P: PaintPixel>(
  image: &ImageBuffer<P, Vec<u8>>,
  bboxes: &[Bbox],
  title: Option<&str>,
  settings: &PlotSettings,
) -> ImageBuffer<P, Vec<u8>> {
  let mut out = image.clone();
  let mut visible = bboxes.iter().filter(|b| !b.is_background()).peekable();
  if visible.peek().is_none() {
    return out;
  }

  let rect_color = P::from_rgb(settings.rect_color);
  let text_color = P::from_rgb(settings.text_color);
  let scale = PxScale::from(settings.text_size);
  let (width, height) = out.dimensions();

  for bbox in visible {
    let Some(corners) = clamp_to_image(bbox, width, height) else {
      continue;
    };
    draw_thick_rect(&mut out, corners, settings.rect_th, rect_color);

    if let Some(font) = &settings.font {
      draw_text_mut(
        &mut out,
        text_color,
        corners.0,
        corners.1,
        scale,
        font,
        &bbox.label_name,
      );
    }
  }

  if let (Some(title), Some(font)) = (title, &settings.font) {
    draw_text_mut(&mut out, text_color, 0, 0, scale, font, title);
  }

  out
}

/// 将掩码逐实例着色后叠加到图像的 RGBA 副本上，后面的实例覆盖前面的
pub fn plot_mask(image: &DynamicImage, mask: &Mask, settings: &PlotSettings) -> Result<RgbaImage, PlotError> {
  mask.check_dimensions(image.width(), image.height())?;

  let mut out = image.to_rgba8();
  let instances = mask.binarise();
  debug!("叠加 {} 个实例掩码", instances.len());
  for binary in &instances {
    let overlay = colorise(binary, settings.mask_color, settings.mask_alpha)?;
    out = alpha_composite(&out, &overlay)?;
  }
  Ok(out)
}

fn open_image(path: &Path) -> Result<DynamicImage, PlotError> {
  Ok(ImageReader::open(path)?.decode()?)
}

fn file_title(path: &Path) -> String {
  path
    .file_name()
    .map(|n| n.to_string_lossy().into_owned())
    .unwrap_or_default()
}

/// 读取图像，叠加掩码与边界框，以文件名为标题
///
/// 给出 `ax` 时同时显示在该子图中；返回绘制好的图像。
pub fn display_bboxes_mask(
  bboxes: Option<&[Bbox]>,
  im_path: &Path,
  mask_path: Option<&Path>,
  ax: Option<&mut Axes>,
  settings: &PlotSettings,
) -> Result<RgbaImage, PlotError> {
  let image = open_image(im_path)?;
  let title = file_title(im_path);

  let mut out = match mask_path {
    Some(mask_path) => plot_mask(&image, &Mask::open(mask_path)?, settings)?,
    None => image.to_rgba8(),
  };

  if let Some(bboxes) = bboxes {
    out = plot_boxes(&out, bboxes, Some(&title), settings);
  }

  if let Some(ax) = ax {
    ax.show_image(&DynamicImage::ImageRgba8(out.clone()));
  }

  Ok(out)
}

/// 在同一张图上绘制检测框（红）与真值框（绿）并显示在子图中
///
/// 两次绘制的文字大小固定为 1 像素，`settings` 的其余参数照常生效。
pub fn plot_detection_vs_ground_truth(
  im_path: &Path,
  det_bboxes: &[Bbox],
  anno_bboxes: &[Bbox],
  ax: &mut Axes,
  settings: &PlotSettings,
) -> Result<RgbImage, PlotError> {
  let image = open_image(im_path)?.to_rgb8();
  let title = file_title(im_path);

  let det_settings = settings
    .clone()
    .with_rect_color(DETECTION_COLOR)
    .with_text_size(VERSUS_TEXT_SIZE);
  let image = plot_boxes(&image, det_bboxes, Some(&title), &det_settings);

  let anno_settings = settings
    .clone()
    .with_rect_color(ANNOTATION_COLOR)
    .with_text_size(VERSUS_TEXT_SIZE);
  let image = plot_boxes(&image, anno_bboxes, Some(&title), &anno_settings);

  ax.show_image(&DynamicImage::ImageRgb8(image.clone()));
  Ok(image)
}
