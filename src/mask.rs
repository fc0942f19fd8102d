// 该文件是 Detviz （检测可视化） 项目的一部分。
// src/mask.rs - 实例分割掩码
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

use std::collections::BTreeSet;
use std::path::Path;

use image::{ImageReader, Rgba, RgbaImage};
use ndarray::{Array2, Array3, Axis};
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum MaskError {
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("图像错误: {0}")]
  ImageError(#[from] image::ImageError),
  #[error("掩码尺寸不匹配: 图像 {image_width}x{image_height}, 掩码 {mask_width}x{mask_height}")]
  ShapeMismatch {
    image_width: u32,
    image_height: u32,
    mask_width: u32,
    mask_height: u32,
  },
  #[error("掩码透明度必须在 [0, 1] 之间, 实际为 {0}")]
  InvalidAlpha(f32),
}

/// 实例掩码
///
/// `Instances` 为 [N, H, W] 的二值掩码，非零即前景；
/// `LabelMap` 为 [H, W] 的灰度图，每个非零取值代表一个实例，0 为背景。
#[derive(Debug, Clone, PartialEq)]
pub enum Mask {
  Instances(Array3<u8>),
  LabelMap(Array2<u8>),
}

impl Mask {
  /// 从灰度图文件读取标签图
  pub fn open(path: impl AsRef<Path>) -> Result<Self, MaskError> {
    let path = path.as_ref();
    debug!("读取掩码文件: {}", path.display());
    let luma = ImageReader::open(path)?.decode()?.to_luma8();
    let (width, height) = luma.dimensions();
    let data = Array2::from_shape_vec((height as usize, width as usize), luma.into_raw())
      .map_err(|_| MaskError::ShapeMismatch {
        image_width: width,
        image_height: height,
        mask_width: width,
        mask_height: height,
      })?;
    Ok(Mask::LabelMap(data))
  }

  /// 掩码宽高
  pub fn dimensions(&self) -> (u32, u32) {
    let (h, w) = match self {
      Mask::Instances(m) => (m.shape()[1], m.shape()[2]),
      Mask::LabelMap(m) => (m.shape()[0], m.shape()[1]),
    };
    (w as u32, h as u32)
  }

  /// 拆分为逐实例的二值掩码，标签图按取值升序排列
  pub fn binarise(&self) -> Vec<Array2<bool>> {
    match self {
      Mask::Instances(m) => m
        .axis_iter(Axis(0))
        .map(|plane| plane.mapv(|v| v != 0))
        .collect(),
      Mask::LabelMap(m) => {
        let labels: BTreeSet<u8> = m.iter().copied().filter(|&v| v != 0).collect();
        labels
          .into_iter()
          .map(|label| m.mapv(|v| v == label))
          .collect()
      }
    }
  }

  pub(crate) fn check_dimensions(&self, width: u32, height: u32) -> Result<(), MaskError> {
    let (mask_width, mask_height) = self.dimensions();
    if (mask_width, mask_height) != (width, height) {
      return Err(MaskError::ShapeMismatch {
        image_width: width,
        image_height: height,
        mask_width,
        mask_height,
      });
    }
    Ok(())
  }
}

/// 将二值掩码着色为半透明图层，背景完全透明
pub fn colorise(binary: &Array2<bool>, color: [u8; 3], alpha: f32) -> Result<RgbaImage, MaskError> {
  if !(0.0..=1.0).contains(&alpha) {
    return Err(MaskError::InvalidAlpha(alpha));
  }
  let a = (alpha * 255.0).round() as u8;
  let (h, w) = binary.dim();
  Ok(RgbaImage::from_fn(w as u32, h as u32, |x, y| {
    if binary[[y as usize, x as usize]] {
      Rgba([color[0], color[1], color[2], a])
    } else {
      Rgba([0, 0, 0, 0])
    }
  }))
}

/// Porter-Duff over 合成，`src` 覆盖在 `dst` 之上
///
/// 两者尺寸必须一致。
pub fn alpha_composite(dst: &RgbaImage, src: &RgbaImage) -> Result<RgbaImage, MaskError> {
  if dst.dimensions() != src.dimensions() {
    return Err(MaskError::ShapeMismatch {
      image_width: dst.width(),
      image_height: dst.height(),
      mask_width: src.width(),
      mask_height: src.height(),
    });
  }

  let mut out = dst.clone();
  for (o, s) in out.pixels_mut().zip(src.pixels()) {
    if s[3] == 0 {
      continue;
    }
    *o = over(*o, *s);
  }
  Ok(out)
}

fn over(dst: Rgba<u8>, src: Rgba<u8>) -> Rgba<u8> {
  let sa = src[3] as f32 / 255.0;
  let da = dst[3] as f32 / 255.0;
  let oa = sa + da * (1.0 - sa);
  if oa <= 0.0 {
    return Rgba([0, 0, 0, 0]);
  }

  let mut px = [0u8; 4];
  for c in 0..3 {
    let sc = src[c] as f32;
    let dc = dst[c] as f32;
    px[c] = ((sc * sa + dc * da * (1.0 - sa)) / oa).round().clamp(0.0, 255.0) as u8;
  }
  px[3] = (oa * 255.0).round() as u8;
  Rgba(px)
}

#[cfg(test)]
mod tests {
  use super::*;
  use ndarray::array;

  #[test]
  fn test_binarise_label_map_orders_by_value() {
    let m = Mask::LabelMap(array![[0, 7, 7], [3, 0, 7]]);
    let planes = m.binarise();
    assert_eq!(planes.len(), 2);
    assert_eq!(planes[0], array![[false, false, false], [true, false, false]]);
    assert_eq!(planes[1], array![[false, true, true], [false, false, true]]);
  }

  #[test]
  fn test_binarise_instances() {
    let mut data = Array3::<u8>::zeros((2, 2, 3));
    data[[0, 0, 0]] = 1;
    data[[1, 1, 2]] = 255;
    let planes = Mask::Instances(data).binarise();
    assert_eq!(planes.len(), 2);
    assert!(planes[0][[0, 0]]);
    assert!(planes[1][[1, 2]]);
    assert_eq!(planes[1].iter().filter(|&&v| v).count(), 1);
  }

  #[test]
  fn test_dimensions_and_check() {
    let m = Mask::LabelMap(Array2::zeros((4, 6)));
    assert_eq!(m.dimensions(), (6, 4));
    assert!(m.check_dimensions(6, 4).is_ok());
    assert!(matches!(
      m.check_dimensions(4, 6),
      Err(MaskError::ShapeMismatch { .. })
    ));
  }

  #[test]
  fn test_colorise() {
    let overlay = colorise(&array![[true, false]], [2, 166, 101], 0.5).unwrap();
    assert_eq!(overlay.get_pixel(0, 0), &Rgba([2, 166, 101, 128]));
    assert_eq!(overlay.get_pixel(1, 0), &Rgba([0, 0, 0, 0]));
    assert!(colorise(&array![[true]], [0, 0, 0], 1.5).is_err());
  }

  #[test]
  fn test_alpha_composite() {
    let dst = RgbaImage::from_pixel(2, 1, Rgba([0, 0, 0, 255]));
    let mut src = RgbaImage::from_pixel(2, 1, Rgba([0, 0, 0, 0]));
    src.put_pixel(0, 0, Rgba([255, 255, 255, 255]));
    let out = alpha_composite(&dst, &src).unwrap();
    assert_eq!(out.get_pixel(0, 0), &Rgba([255, 255, 255, 255]));
    assert_eq!(out.get_pixel(1, 0), &Rgba([0, 0, 0, 255]));
  }
}
