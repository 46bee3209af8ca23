// 该文件是 Xueqing （学情） 项目的一部分。
// src/args.rs - 项目参数配置
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

use std::path::PathBuf;

use clap::Parser;

use xueqing::{
  detector::DEFAULT_CONFIDENCE_THRESHOLD,
  output::{
    DEFAULT_JPEG_QUALITY,
    font::{DEFAULT_FONT_PATH, DEFAULT_FONT_SIZE},
  },
};

/// 学情：课堂行为检测与标注
///
/// 从标准输入读取 Base64 编码的图片，向标准输出写出 JSON 结果。
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// 模型文件，普通路径或者 onnx: URL，例如 onnx:///opt/models/behavior.onnx
  /// 模型无法加载时使用模拟数据
  #[arg(
    long,
    env = "XUEQING_MODEL",
    default_value = "onnx:models/yolov12_student_behavior.onnx",
    value_name = "MODEL"
  )]
  pub model: String,

  /// 输入文件，缺省时读取标准输入
  #[arg(long, value_name = "FILE")]
  pub input: Option<PathBuf>,

  /// 标签字体文件，加载失败时使用内置字体
  #[arg(long, default_value = DEFAULT_FONT_PATH, value_name = "FILE")]
  pub font: PathBuf,

  /// 标签字体大小（像素）
  #[arg(long, default_value_t = DEFAULT_FONT_SIZE, value_name = "SIZE")]
  pub font_size: f32,

  /// 置信度阈值 (0.5 - 1.0)，不大于该值的结果被丢弃
  #[arg(
    long,
    default_value_t = DEFAULT_CONFIDENCE_THRESHOLD,
    value_name = "THRESHOLD",
    value_parser = parse_confidence
  )]
  pub confidence: f32,

  /// NMS IOU 阈值 (0.0 - 1.0)
  #[arg(long, default_value_t = 0.45, value_name = "THRESHOLD")]
  pub nms_threshold: f32,

  /// 输出 JPEG 质量 (1 - 100)
  #[arg(long, default_value_t = DEFAULT_JPEG_QUALITY, value_name = "QUALITY")]
  pub jpeg_quality: u8,

  /// 输出调试日志
  #[arg(short, long)]
  pub verbose: bool,
}

fn parse_confidence(s: &str) -> Result<f32, String> {
  let value: f32 = s.parse().map_err(|e| format!("{e}"))?;
  if (DEFAULT_CONFIDENCE_THRESHOLD..=1.0).contains(&value) {
    Ok(value)
  } else {
    Err(format!(
      "置信度阈值必须在 {DEFAULT_CONFIDENCE_THRESHOLD} 到 1.0 之间"
    ))
  }
}
