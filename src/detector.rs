// 该文件是 Xueqing （学情） 项目的一部分。
// src/detector.rs - 课堂行为检测器
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

use std::fmt::Display;

use image::RgbImage;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::{
  label::{BehaviorColor, BehaviorLabel},
  model::{DetectItem, DetectResult, Model},
};

/// 默认行为置信度阈值，置信度不大于该值的检测结果会被丢弃
pub const DEFAULT_CONFIDENCE_THRESHOLD: f32 = 0.5;

/// 单个检测到的行为
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetectionRecord {
  /// [x_min, y_min, x_max, y_max]，原图像素坐标
  #[serde(rename = "box")]
  pub bbox: [i32; 4],
  pub label: &'static str,
  pub confidence: f32,
  pub description: &'static str,
  pub color: BehaviorColor,
}

impl DetectionRecord {
  /// 由模型输出构造，坐标向图像原点取整
  pub fn from_item(item: &DetectItem<BehaviorLabel>) -> Self {
    let [x_min, y_min, x_max, y_max] = item.bbox;
    DetectionRecord {
      bbox: [
        x_min.floor() as i32,
        y_min.floor() as i32,
        x_max.floor() as i32,
        y_max.floor() as i32,
      ],
      label: item.kind.name(),
      confidence: item.score,
      description: item.kind.description(),
      color: item.kind.color(),
    }
  }
}

/// 模拟检测结果
///
/// 模型不可用或推理失败时使用，内容固定。
pub fn simulated_detections() -> Vec<DetectionRecord> {
  vec![
    DetectionRecord {
      bbox: [50, 50, 150, 180],
      label: BehaviorLabel::Attentive.name(),
      confidence: 0.92,
      description: "学生看起来专注并积极参与课堂内容。",
      color: BehaviorLabel::Attentive.color(),
    },
    DetectionRecord {
      bbox: [200, 220, 300, 350],
      label: BehaviorLabel::PhoneUse.name(),
      confidence: 0.85,
      description: "学生似乎在使用移动设备。",
      color: BehaviorLabel::PhoneUse.color(),
    },
    DetectionRecord {
      bbox: [380, 80, 480, 200],
      label: BehaviorLabel::Sleeping.name(),
      confidence: 0.78,
      description: "学生的姿势表明他们可能在课桌上睡觉。",
      color: BehaviorLabel::Sleeping.color(),
    },
  ]
}

/// 检测器运行模式，进程启动时确定一次
pub enum DetectorMode<M> {
  /// 模型加载成功，每次调用都尝试推理
  Live(M),
  /// 模型加载失败，始终返回模拟结果
  Simulated,
}

impl<M> DetectorMode<M> {
  /// 根据模型加载结果确定模式，加载失败只记录日志
  pub fn from_load_result<E: Display>(result: Result<M, E>) -> Self {
    match result {
      Ok(model) => {
        info!("模型加载成功，使用实时推理");
        DetectorMode::Live(model)
      }
      Err(e) => {
        warn!("模型加载失败: {}，使用模拟数据", e);
        DetectorMode::Simulated
      }
    }
  }
}

/// 检测结果来源，仅用于诊断日志
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectionSource {
  Model,
  Fallback,
  Simulated,
}

#[derive(Debug, Clone)]
pub struct Detections {
  pub records: Vec<DetectionRecord>,
  pub source: DetectionSource,
}

/// 可恢复的推理失败
#[derive(Error, Debug)]
#[error("推理失败: {0}")]
pub struct InferenceFailed(String);

pub struct BehaviorDetector<M> {
  mode: DetectorMode<M>,
  confidence_threshold: f32,
}

impl<M> BehaviorDetector<M>
where
  M: Model<Input = RgbImage, Output = DetectResult<BehaviorLabel>>,
  M::Error: Display,
{
  pub fn new(mode: DetectorMode<M>) -> Self {
    Self {
      mode,
      confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
    }
  }

  /// 提高置信度阈值，低于默认值的阈值（包括 NaN）按默认值处理
  pub fn with_threshold(mut self, confidence_threshold: f32) -> Self {
    if confidence_threshold.is_nan() || confidence_threshold < DEFAULT_CONFIDENCE_THRESHOLD {
      warn!(
        "置信度阈值 {} 低于 {}，使用默认值",
        confidence_threshold, DEFAULT_CONFIDENCE_THRESHOLD
      );
    }
    self.confidence_threshold = confidence_threshold.max(DEFAULT_CONFIDENCE_THRESHOLD);
    self
  }

  /// 检测图像中的学生行为
  ///
  /// 推理失败不会向上传播，而是在此处替换为模拟结果。
  pub fn detect_behaviors(&self, image: &RgbImage) -> Detections {
    match &self.mode {
      DetectorMode::Simulated => Detections {
        records: simulated_detections(),
        source: DetectionSource::Simulated,
      },
      DetectorMode::Live(model) => match self.infer_behaviors(model, image) {
        Ok(records) => Detections {
          records,
          source: DetectionSource::Model,
        },
        Err(e) => {
          warn!("检测过程中出错: {}，使用模拟数据", e);
          Detections {
            records: simulated_detections(),
            source: DetectionSource::Fallback,
          }
        }
      },
    }
  }

  fn infer_behaviors(
    &self,
    model: &M,
    image: &RgbImage,
  ) -> Result<Vec<DetectionRecord>, InferenceFailed> {
    let result = model
      .infer(image)
      .map_err(|e| InferenceFailed(e.to_string()))?;
    debug!("模型输出 {} 个候选", result.items.len());

    Ok(
      result
        .items
        .iter()
        .filter(|item| item.score > self.confidence_threshold)
        .map(DetectionRecord::from_item)
        .collect(),
    )
  }
}
