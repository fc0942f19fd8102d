// 该文件是 Detviz （检测可视化） 项目的一部分。
// src/model/onnx.rs - ONNX Runtime 分类模型
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

use std::sync::Mutex;

use image::{DynamicImage, imageops::FilterType};
use ort::{
  inputs,
  session::{Session, builder::GraphOptimizationLevel},
  value::Tensor,
};
use thiserror::Error;
use tracing::{debug, info};
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  model::{Classifier, Prediction, argmax, load_labels, softmax},
  url_file_path,
};

const DEFAULT_INPUT_SIZE: u32 = 224;
const DEFAULT_INTRA_THREADS: usize = 4;
const IMAGENET_MEAN: [f32; 3] = [0.485, 0.456, 0.406];
const IMAGENET_STD: [f32; 3] = [0.229, 0.224, 0.225];

#[derive(Error, Debug)]
pub enum OnnxClassifierError {
  #[error("模型路径错误: {0}")]
  ModelPathError(String),
  #[error("标签文件读取错误: {0}")]
  LabelsError(std::io::Error),
  #[error("ONNX Runtime 错误: {0}")]
  OrtError(#[from] ort::Error),
  #[error("模型输出为空")]
  EmptyOutput,
  #[error("模型输出类别数 {outputs} 与标签数 {labels} 不一致")]
  LabelCountMismatch { outputs: usize, labels: usize },
  #[error("推理会话锁已失效")]
  SessionPoisoned,
}

pub struct OnnxClassifierBuilder {
  model_path: String,
  labels_path: Option<String>,
  input_size: u32,
  intra_threads: usize,
}

impl FromUrlWithScheme for OnnxClassifierBuilder {
  const SCHEME: &'static str = "onnx";
}

impl FromUrl for OnnxClassifierBuilder {
  type Error = OnnxClassifierError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(OnnxClassifierError::ModelPathError(format!(
        "模型路径必须使用 {} 方案",
        Self::SCHEME
      )));
    }

    let mut builder = OnnxClassifierBuilder {
      model_path: url_file_path(url),
      labels_path: None,
      input_size: DEFAULT_INPUT_SIZE,
      intra_threads: DEFAULT_INTRA_THREADS,
    };

    for (key, value) in url.query_pairs() {
      match key.as_ref() {
        "labels" => builder.labels_path = Some(value.into_owned()),
        "size" => {
          builder.input_size = value.parse().map_err(|_| {
            OnnxClassifierError::ModelPathError(format!("无效的输入尺寸: {}", value))
          })?
        }
        "threads" => {
          builder.intra_threads = value.parse().map_err(|_| {
            OnnxClassifierError::ModelPathError(format!("无效的线程数: {}", value))
          })?
        }
        other => debug!("忽略未知参数: {}", other),
      }
    }

    Ok(builder)
  }
}

impl OnnxClassifierBuilder {
  pub fn labels(mut self, path: impl Into<String>) -> Self {
    self.labels_path = Some(path.into());
    self
  }

  pub fn input_size(mut self, size: u32) -> Self {
    self.input_size = size;
    self
  }

  pub fn build(self) -> Result<OnnxClassifier, OnnxClassifierError> {
    info!("加载模型文件: {}", self.model_path);
    let session = Session::builder()?
      .with_optimization_level(GraphOptimizationLevel::Level3)?
      .with_intra_threads(self.intra_threads)?
      .commit_from_file(&self.model_path)?;

    let labels = match &self.labels_path {
      Some(path) => {
        let labels = load_labels(path).map_err(OnnxClassifierError::LabelsError)?;
        debug!("读取到 {} 个类别标签", labels.len());
        labels
      }
      None => Vec::new(),
    };
    info!("模型加载完成");

    Ok(OnnxClassifier {
      session: Mutex::new(session),
      labels,
      input_size: self.input_size,
    })
  }
}

pub struct OnnxClassifier {
  session: Mutex<Session>,
  labels: Vec<String>,
  input_size: u32,
}

impl OnnxClassifier {
  /// 缩放并按 ImageNet 均值方差归一化为 NCHW 数据
  fn preprocess(&self, image: &DynamicImage) -> Vec<f32> {
    let size = self.input_size;
    let rgb = image
      .resize_exact(size, size, FilterType::Triangle)
      .to_rgb8();
    let plane = (size * size) as usize;
    let mut data = vec![0f32; 3 * plane];

    for (x, y, pixel) in rgb.enumerate_pixels() {
      let idx = (y * size + x) as usize;
      for c in 0..3 {
        data[c * plane + idx] = (pixel[c] as f32 / 255.0 - IMAGENET_MEAN[c]) / IMAGENET_STD[c];
      }
    }
    data
  }
}

impl Classifier for OnnxClassifier {
  type Error = OnnxClassifierError;

  fn predict(&self, image: &DynamicImage) -> Result<Prediction, Self::Error> {
    let size = self.input_size as usize;
    let input = Tensor::from_array(([1usize, 3, size, size], self.preprocess(image)))?;

    let logits = {
      let mut session = self
        .session
        .lock()
        .map_err(|_| OnnxClassifierError::SessionPoisoned)?;
      let outputs = session.run(inputs![input])?;
      let (_shape, data) = outputs[0].try_extract_tensor::<f32>()?;
      data.to_vec()
    };

    if !self.labels.is_empty() && logits.len() != self.labels.len() {
      return Err(OnnxClassifierError::LabelCountMismatch {
        outputs: logits.len(),
        labels: self.labels.len(),
      });
    }

    let scores = softmax(&logits);
    let index = argmax(&scores).ok_or(OnnxClassifierError::EmptyOutput)?;
    let label = self
      .labels
      .get(index)
      .cloned()
      .unwrap_or_else(|| index.to_string());
    debug!("预测类别: {} ({})", label, scores[index]);

    Ok(Prediction {
      label,
      index,
      scores,
    })
  }
}
