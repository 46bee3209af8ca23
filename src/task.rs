// 该文件是 Xueqing （学情） 项目的一部分。
// src/task.rs - 单张图像的检测与标注任务
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
use thiserror::Error;
use tracing::{error, info, warn};

use crate::{
  detector::{BehaviorDetector, DetectionSource},
  input::{InputError, decode_base64_image},
  label::BehaviorLabel,
  model::{DetectResult, Model},
  output::{DEFAULT_JPEG_QUALITY, Draw, EncodeError, ResultEnvelope, encode_jpeg_base64},
};

#[derive(Error, Debug)]
pub enum TaskError {
  #[error("{0}")]
  Input(#[from] InputError),
  #[error("{0}")]
  Encode(#[from] EncodeError),
}

/// 解码、检测、绘制、编码
///
/// 所有错误都在此处转换为失败形状的 [`ResultEnvelope`]。
pub struct AnnotateTask<'a, M> {
  detector: &'a BehaviorDetector<M>,
  draw: &'a Draw,
  jpeg_quality: u8,
}

impl<'a, M> AnnotateTask<'a, M>
where
  M: Model<Input = RgbImage, Output = DetectResult<BehaviorLabel>>,
  M::Error: Display,
{
  pub fn new(detector: &'a BehaviorDetector<M>, draw: &'a Draw) -> Self {
    Self {
      detector,
      draw,
      jpeg_quality: DEFAULT_JPEG_QUALITY,
    }
  }

  pub fn with_jpeg_quality(mut self, jpeg_quality: u8) -> Self {
    self.jpeg_quality = jpeg_quality;
    self
  }

  pub fn run_task(&self, payload: &str) -> ResultEnvelope {
    match self.process(payload) {
      Ok(envelope) => envelope,
      Err(e) => {
        error!("处理图片时出错: {}", e);
        ResultEnvelope::failure(e)
      }
    }
  }

  fn process(&self, payload: &str) -> Result<ResultEnvelope, TaskError> {
    info!("开始任务...");
    let image = decode_base64_image(payload)?;
    info!("图像解码成功: {}x{}", image.width(), image.height());

    let now = std::time::Instant::now();
    let detections = self.detector.detect_behaviors(&image);
    let elapsed = now.elapsed();
    match detections.source {
      DetectionSource::Model => info!("推理完成，耗时: {:.2?}", elapsed),
      DetectionSource::Fallback => warn!("推理失败，已使用模拟数据，耗时: {:.2?}", elapsed),
      DetectionSource::Simulated => info!("模型不可用，使用模拟数据"),
    }

    let now = std::time::Instant::now();
    let mut canvas = image.clone();
    self
      .draw
      .draw_detections_on_image(&mut canvas, &detections.records);
    info!("渲染完成，耗时: {:.2?}", now.elapsed());

    let processed_image_base64 = encode_jpeg_base64(&canvas, self.jpeg_quality)?;
    info!("检测到 {} 个行为", detections.records.len());

    Ok(ResultEnvelope::success(
      processed_image_base64,
      detections.records,
    ))
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{detector::DetectorMode, model::NoModel};
  use base64::{Engine, prelude::BASE64_STANDARD};

  fn jpeg_base64(width: u32, height: u32) -> String {
    let image = RgbImage::from_pixel(width, height, image::Rgb([128, 128, 128]));
    encode_jpeg_base64(&image, 90).unwrap()
  }

  #[test]
  fn simulated_run_produces_success_envelope() {
    let detector = BehaviorDetector::<NoModel>::new(DetectorMode::Simulated);
    let draw = Draw::default();
    let task = AnnotateTask::new(&detector, &draw);

    let envelope = task.run_task(&jpeg_base64(64, 48));
    match envelope {
      ResultEnvelope::Success {
        processed_image_base64,
        detections,
        total_detections,
      } => {
        assert_eq!(total_detections, 3);
        assert_eq!(detections.len(), 3);
        let bytes = BASE64_STANDARD.decode(processed_image_base64).unwrap();
        let image = image::load_from_memory(&bytes).unwrap();
        assert_eq!((image.width(), image.height()), (64, 48));
      }
      ResultEnvelope::Failure { error, .. } => panic!("unexpected failure: {error}"),
    }
  }

  #[test]
  fn decode_errors_become_failure_envelope() {
    let detector = BehaviorDetector::<NoModel>::new(DetectorMode::Simulated);
    let draw = Draw::default();
    let task = AnnotateTask::new(&detector, &draw);

    for payload in ["@@@@", "", BASE64_STANDARD.encode("hello").as_str()] {
      let envelope = task.run_task(payload);
      assert!(
        matches!(
          &envelope,
          ResultEnvelope::Failure { detections, .. } if detections.is_empty()
        ),
        "payload {payload:?}"
      );
    }
  }

  #[test]
  fn encode_errors_become_failure_envelope() {
    let detector = BehaviorDetector::<NoModel>::new(DetectorMode::Simulated);
    let draw = Draw::default();
    let task = AnnotateTask::new(&detector, &draw).with_jpeg_quality(0);

    let envelope = task.run_task(&jpeg_base64(8, 8));
    match envelope {
      ResultEnvelope::Failure {
        error,
        processed_image_base64,
        detections,
      } => {
        assert!(error.contains("JPEG"));
        assert!(processed_image_base64.is_none());
        assert!(detections.is_empty());
      }
      ResultEnvelope::Success { .. } => panic!("expected failure"),
    }
  }
}
