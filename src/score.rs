// 该文件是 Detviz （检测可视化） 项目的一部分。
// src/score.rs - 批量图像分类入口
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

use image::{DynamicImage, ImageReader};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{error, info};

use crate::model::Classifier;

#[derive(Error, Debug)]
pub enum ScoreError {
  #[error("JSON 错误: {0}")]
  Json(#[from] serde_json::Error),
}

/// 待分类的图像：文件路径或编码后的字节
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ImageRef {
  Path(String),
  Bytes { bytes: Vec<u8> },
}

impl ImageRef {
  pub fn open(&self) -> Result<DynamicImage, image::ImageError> {
    match self {
      ImageRef::Path(path) => Ok(ImageReader::open(path)?.decode()?),
      ImageRef::Bytes { bytes } => image::load_from_memory(bytes),
    }
  }
}

/// 单张图像的分类结果，失败时 `label` 为错误信息、`probability` 为空
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PredictionRecord {
  pub label: String,
  pub probability: String,
}

impl PredictionRecord {
  pub fn failed(message: impl ToString) -> Self {
    Self {
      label: message.to_string(),
      probability: String::new(),
    }
  }

  pub fn is_failed(&self) -> bool {
    self.probability.is_empty()
  }
}

fn score_one<M: Classifier>(model: &M, image: &ImageRef) -> Result<PredictionRecord, String> {
  let decoded = image.open().map_err(|e| e.to_string())?;
  let prediction = model.predict(&decoded).map_err(|e| e.to_string())?;
  let probability = prediction
    .probability()
    .ok_or_else(|| format!("预测下标 {} 超出概率范围", prediction.index))?;

  Ok(PredictionRecord {
    label: prediction.label,
    probability: probability.to_string(),
  })
}

fn record_or_failed(i: usize, result: Result<PredictionRecord, String>) -> PredictionRecord {
  result.unwrap_or_else(|message| {
    error!("第 {} 张图像分类失败: {}", i, message);
    PredictionRecord::failed(message)
  })
}

/// 逐张分类，单张失败不影响其他图像
pub fn run<M: Classifier>(model: &M, images: &[ImageRef]) -> Vec<PredictionRecord> {
  info!("开始分类 {} 张图像", images.len());
  images
    .iter()
    .enumerate()
    .map(|(i, image)| record_or_failed(i, score_one(model, image)))
    .collect()
}

/// 输入为 JSON 列表，输出为 JSON 结果列表
///
/// 只有输入不是 JSON 列表时返回错误；无法识别的元素与其他失败一样记为失败结果。
pub fn run_json<M: Classifier>(model: &M, raw_data: &str) -> Result<String, ScoreError> {
  let items: Vec<serde_json::Value> = serde_json::from_str(raw_data)?;
  info!("开始分类 {} 张图像", items.len());
  let records: Vec<PredictionRecord> = items
    .into_iter()
    .enumerate()
    .map(|(i, item)| {
      let result = serde_json::from_value::<ImageRef>(item)
        .map_err(|e| format!("无法识别的图像: {}", e))
        .and_then(|image| score_one(model, &image));
      record_or_failed(i, result)
    })
    .collect();
  Ok(serde_json::to_string(&records)?)
}
