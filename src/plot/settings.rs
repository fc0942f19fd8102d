// 该文件是 Detviz （检测可视化） 项目的一部分。
// src/plot/settings.rs - 绘图参数与字体
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
use std::sync::OnceLock;

use ab_glyph::FontArc;
use tracing::debug;

use crate::plot::PlotError;

const RECT_THICKNESS: u32 = 4;
const RECT_COLOR: [u8; 3] = [255, 0, 0]; // 红色
const TEXT_SIZE: f32 = 25.0;
const TEXT_COLOR: [u8; 3] = [255, 255, 255]; // 白色
const MASK_COLOR: [u8; 3] = [2, 166, 101];
const MASK_ALPHA: f32 = 0.5;

/// 指定字体文件的环境变量，设置后覆盖内置字体
pub const FONT_ENV: &str = "DETVIZ_FONT";

static BUNDLED_FONT_DATA: &[u8] = include_bytes!("../../assets/DejaVuSans.ttf");

/// 绘图参数，每次调用时构造并以引用传入
#[derive(Clone)]
pub struct PlotSettings {
  pub rect_th: u32,
  pub rect_color: [u8; 3],
  pub text_size: f32,
  pub text_color: [u8; 3],
  pub mask_color: [u8; 3],
  pub mask_alpha: f32,
  /// 为 `None` 时不绘制任何文字，只能通过 [`PlotSettings::without_font`] 显式得到
  pub font: Option<FontArc>,
}

impl std::fmt::Debug for PlotSettings {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("PlotSettings")
      .field("rect_th", &self.rect_th)
      .field("rect_color", &self.rect_color)
      .field("text_size", &self.text_size)
      .field("text_color", &self.text_color)
      .field("mask_color", &self.mask_color)
      .field("mask_alpha", &self.mask_alpha)
      .field("font", &self.font.is_some())
      .finish()
  }
}

impl Default for PlotSettings {
  fn default() -> Self {
    Self::without_font().with_font(bundled_font())
  }
}

impl PlotSettings {
  /// 默认参数，字体取自 [`default_font`]，字体加载失败时返回错误
  pub fn from_env() -> Result<Self, PlotError> {
    Ok(Self::without_font().with_font(default_font()?))
  }

  /// 默认参数，但不绘制任何文字
  pub fn without_font() -> Self {
    Self {
      rect_th: RECT_THICKNESS,
      rect_color: RECT_COLOR,
      text_size: TEXT_SIZE,
      text_color: TEXT_COLOR,
      mask_color: MASK_COLOR,
      mask_alpha: MASK_ALPHA,
      font: None,
    }
  }

  pub fn with_font(self, font: FontArc) -> Self {
    Self {
      font: Some(font),
      ..self
    }
  }

  pub fn with_rect_th(self, rect_th: u32) -> Self {
    Self { rect_th, ..self }
  }

  pub fn with_rect_color(self, rect_color: [u8; 3]) -> Self {
    Self { rect_color, ..self }
  }

  pub fn with_text_size(self, text_size: f32) -> Self {
    Self { text_size, ..self }
  }

  pub fn with_text_color(self, text_color: [u8; 3]) -> Self {
    Self { text_color, ..self }
  }

  pub fn with_mask_color(self, mask_color: [u8; 3]) -> Self {
    Self { mask_color, ..self }
  }

  pub fn with_mask_alpha(self, mask_alpha: f32) -> Self {
    Self { mask_alpha, ..self }
  }
}

/// 读取字体文件，读取或解析失败直接返回错误
pub fn load_font(path: impl AsRef<Path>) -> Result<FontArc, PlotError> {
  let data = std::fs::read(path.as_ref())?;
  FontArc::try_from_vec(data).map_err(|e| PlotError::FontError(e.to_string()))
}

/// 内置字体 DejaVu Sans
pub fn bundled_font() -> FontArc {
  static FONT: OnceLock<FontArc> = OnceLock::new();
  FONT
    .get_or_init(|| FontArc::try_from_slice(BUNDLED_FONT_DATA).expect("无法加载内置字体文件"))
    .clone()
}

/// 默认字体：设置了 [`FONT_ENV`] 时读取该文件，读取失败直接返回错误；否则使用内置字体
pub fn default_font() -> Result<FontArc, PlotError> {
  match std::env::var_os(FONT_ENV) {
    Some(path) => {
      debug!("使用字体: {}", Path::new(&path).display());
      load_font(path)
    }
    None => Ok(bundled_font()),
  }
}
