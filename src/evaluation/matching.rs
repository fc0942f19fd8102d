// 该文件是 Detviz （检测可视化） 项目的一部分。
// src/evaluation/matching.rs - 检测框与真值框匹配
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

use crate::bbox::Bbox;

/// 单张图像的匹配统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MatchCounts {
  /// 匹配上真值的检测数
  pub matched: usize,
  /// 未被任何检测覆盖的真值数
  pub missed: usize,
  /// 未匹配任何真值的检测数
  pub spurious: usize,
}

/// 贪心一对一匹配
///
/// 检测框按置信度降序处理，每个检测框取同类别、尚未匹配且 IoU 最大的真值框，
/// IoU 不低于 `iou_threshold` 才算匹配。调用方负责事先按分数阈值过滤检测框。
pub fn match_boxes(detections: &[&Bbox], ground_truths: &[Bbox], iou_threshold: f32) -> MatchCounts {
  let mut order: Vec<usize> = (0..detections.len()).collect();
  order.sort_by(|&a, &b| {
    detections[b]
      .confidence()
      .partial_cmp(&detections[a].confidence())
      .unwrap_or(std::cmp::Ordering::Equal)
  });

  let mut taken = vec![false; ground_truths.len()];
  let mut matched = 0;

  for det_idx in order {
    let det = detections[det_idx];
    let mut best: Option<(usize, f32)> = None;

    for (gt_idx, gt) in ground_truths.iter().enumerate() {
      if taken[gt_idx] || gt.label_idx != det.label_idx {
        continue;
      }
      let iou = det.iou(gt);
      if iou >= iou_threshold && best.is_none_or(|(_, b)| iou > b) {
        best = Some((gt_idx, iou));
      }
    }

    if let Some((gt_idx, _)) = best {
      taken[gt_idx] = true;
      matched += 1;
    }
  }

  MatchCounts {
    matched,
    missed: ground_truths.len() - matched,
    spurious: detections.len() - matched,
  }
}
