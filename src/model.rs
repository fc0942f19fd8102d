// 该文件是 Detviz （检测可视化） 项目的一部分。
// src/model.rs - 分类模型
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

use image::DynamicImage;

/// 图像分类模型
pub trait Classifier {
  type Error: std::error::Error;

  fn predict(&self, image: &DynamicImage) -> Result<Prediction, Self::Error>;
}

/// 一次分类预测结果
#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
  pub label: String,
  pub index: usize,
  /// 各类别概率
  pub scores: Vec<f32>,
}

impl Prediction {
  /// 预测类别的概率
  pub fn probability(&self) -> Option<f32> {
    self.scores.get(self.index).copied()
  }
}

/// 读取标签文件，每行一个类别名
pub fn load_labels(path: impl AsRef<std::path::Path>) -> std::io::Result<Vec<String>> {
  let text = std::fs::read_to_string(path)?;
  Ok(
    text
      .lines()
      .map(str::trim)
      .filter(|l| !l.is_empty())
      .map(String::from)
      .collect(),
  )
}

/// 数值稳定的 softmax
pub fn softmax(logits: &[f32]) -> Vec<f32> {
  let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
  let exps: Vec<f32> = logits.iter().map(|&x| (x - max).exp()).collect();
  let sum: f32 = exps.iter().sum();
  exps.into_iter().map(|e| e / sum).collect()
}

/// 最大值下标，空输入返回 None
pub fn argmax(values: &[f32]) -> Option<usize> {
  values
    .iter()
    .enumerate()
    .max_by(|a, b| a.1.partial_cmp(b.1).unwrap_or(std::cmp::Ordering::Equal))
    .map(|(i, _)| i)
}

#[cfg(feature = "model_onnx")]
mod onnx;
#[cfg(feature = "model_onnx")]
pub use self::onnx::{OnnxClassifier, OnnxClassifierBuilder, OnnxClassifierError};
