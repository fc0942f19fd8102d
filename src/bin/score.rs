// 该文件是 Detviz （检测可视化） 项目的一部分。
// src/bin/score.rs - 图像分类评分入口
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

use std::io::Read;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use url::Url;

use detviz::{FromUrl, model::OnnxClassifierBuilder, score};

/// 对 JSON 图像列表逐张分类，输出 `{label, probability}` 列表
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// 模型地址，例如 onnx:///models/resnet18.onnx?labels=/models/labels.txt
  #[arg(long, value_name = "MODEL")]
  pub model: Url,
  /// JSON 输入文件，`-` 表示标准输入
  #[arg(long, value_name = "FILE", default_value = "-")]
  pub input: PathBuf,
}

fn read_input(path: &PathBuf) -> Result<String> {
  let mut raw = String::new();
  if path.as_os_str() == "-" {
    std::io::stdin()
      .read_to_string(&mut raw)
      .context("读取标准输入失败")?;
  } else {
    raw = std::fs::read_to_string(path)
      .with_context(|| format!("读取输入文件 {} 失败", path.display()))?;
  }
  Ok(raw)
}

fn main() -> Result<()> {
  tracing_subscriber::fmt::init();

  let args = Args::parse();

  info!("模型地址: {}", args.model);
  info!("输入: {}", args.input.display());

  let model = OnnxClassifierBuilder::from_url(&args.model)?.build()?;
  let raw = read_input(&args.input)?;

  let now = std::time::Instant::now();
  let result = score::run_json(&model, &raw)?;
  info!("评分完成，耗时: {:.2?}", now.elapsed());

  println!("{}", result);
  Ok(())
}
