// 该文件是 Detviz （检测可视化） 项目的一部分。
// src/plot/grid.rs - 子图网格批量绘制
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
use tracing::debug;

use crate::plot::{Axes, FigSize, Figure, PlotError};

/// 每行子图的高度，单位英寸
pub const ROW_HEIGHT: f32 = 8.0;

/// 网格中每个子图的参数来源
pub enum GridArgs<'a, A> {
  /// 所有子图使用同一参数
  Fixed(A),
  /// 按行优先顺序依次取用
  Sequence(Box<dyn Iterator<Item = A> + 'a>),
  /// 每个子图调用一次生成参数
  Generator(Box<dyn FnMut() -> A + 'a>),
}

impl<'a, A> GridArgs<'a, A> {
  pub fn sequence(items: impl IntoIterator<Item = A> + 'a) -> Self {
    GridArgs::Sequence(Box::new(items.into_iter()))
  }

  pub fn generator(f: impl FnMut() -> A + 'a) -> Self {
    GridArgs::Generator(Box::new(f))
  }
}

impl<A: Clone> GridArgs<'_, A> {
  fn next_arg(&mut self) -> Option<A> {
    match self {
      GridArgs::Fixed(a) => Some(a.clone()),
      GridArgs::Sequence(it) => it.next(),
      GridArgs::Generator(f) => Some(f()),
    }
  }
}

/// 创建 rows × cols 网格，对每个子图以取得的参数调用 `f`
///
/// 画布宽度取 `figsize.width`，高度为 `rows × ROW_HEIGHT` 英寸。
/// 参数序列提前耗尽时返回 [`PlotError::GridArgsExhausted`]；
/// `f` 返回的错误直接向上传递。
pub fn plot_grid<A, F>(
  mut f: F,
  mut args: GridArgs<'_, A>,
  rows: usize,
  cols: usize,
  figsize: FigSize,
) -> Result<RgbImage, PlotError>
where
  A: Clone,
  F: FnMut(&A, &mut Axes) -> Result<(), PlotError>,
{
  let size = FigSize::new(figsize.width, rows as f32 * ROW_HEIGHT);
  let mut fig = Figure::subplots(rows, cols, size)?;
  let total = rows * cols;
  debug!("绘制 {}x{} 网格, 画布 {:?} 像素", rows, cols, size.pixels());

  for (filled, ax) in fig.axes_iter_mut().enumerate() {
    let arg = args
      .next_arg()
      .ok_or(PlotError::GridArgsExhausted { filled, total })?;
    f(&arg, ax)?;
  }

  Ok(fig.render())
}
