// 该文件是 Xueqing （学情） 项目的一部分。
// src/output/envelope.rs - 结果文档
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

use serde::Serialize;

use crate::detector::DetectionRecord;

/// 单次调用的输出，成功与失败两种形状之一
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum ResultEnvelope {
  Success {
    processed_image_base64: String,
    detections: Vec<DetectionRecord>,
    total_detections: usize,
  },
  Failure {
    error: String,
    // 始终为 null
    processed_image_base64: Option<String>,
    // 始终为空
    detections: Vec<DetectionRecord>,
  },
}

impl ResultEnvelope {
  pub fn success(processed_image_base64: String, detections: Vec<DetectionRecord>) -> Self {
    ResultEnvelope::Success {
      processed_image_base64,
      total_detections: detections.len(),
      detections,
    }
  }

  pub fn failure<E: Display>(error: E) -> Self {
    ResultEnvelope::Failure {
      error: error.to_string(),
      processed_image_base64: None,
      detections: Vec::new(),
    }
  }

  /// 序列化为 JSON，非 ASCII 字符保持原样
  pub fn to_json(&self) -> Result<String, serde_json::Error> {
    serde_json::to_string(self)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::detector::simulated_detections;
  use serde_json::Value;

  #[test]
  fn success_shape_counts_detections() {
    let envelope = ResultEnvelope::success("aGVsbG8=".to_string(), simulated_detections());
    let json: Value = serde_json::from_str(&envelope.to_json().unwrap()).unwrap();

    let object = json.as_object().unwrap();
    let mut keys: Vec<_> = object.keys().map(String::as_str).collect();
    keys.sort();
    assert_eq!(keys, ["detections", "processed_image_base64", "total_detections"]);
    assert_eq!(json["total_detections"], 3);
    assert_eq!(json["detections"].as_array().unwrap().len(), 3);
    assert_eq!(json["detections"][0]["confidence"].as_f64(), Some(0.92));
  }

  #[test]
  fn failure_shape_has_null_image_and_no_detections() {
    let envelope = ResultEnvelope::failure("Base64 解码错误");
    assert!(matches!(
      &envelope,
      ResultEnvelope::Failure { detections, processed_image_base64: None, .. }
        if detections.is_empty()
    ));

    let json: Value = serde_json::from_str(&envelope.to_json().unwrap()).unwrap();
    let object = json.as_object().unwrap();
    assert_eq!(object.len(), 3);
    assert_eq!(json["error"], "Base64 解码错误");
    assert!(json["processed_image_base64"].is_null());
    assert_eq!(json["detections"], serde_json::json!([]));
  }

  #[test]
  fn non_ascii_text_is_not_escaped() {
    let envelope = ResultEnvelope::success(String::new(), simulated_detections());
    let text = envelope.to_json().unwrap();
    assert!(text.contains("专心听讲"));
    assert!(text.contains("学生似乎在使用移动设备。"));
    assert!(!text.contains("\\u"));
  }
}
