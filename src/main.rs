// 该文件是 Xueqing （学情） 项目的一部分。
// src/main.rs - 项目主程序
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

mod args;

use std::io::{Read, Write};
use std::path::Path;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{Level, error, info};

use xueqing::{
  detector::{BehaviorDetector, DetectorMode},
  output::{Draw, LabelFont, ResultEnvelope},
  task::AnnotateTask,
};

fn read_payload(input: Option<&Path>) -> std::io::Result<String> {
  match input {
    Some(path) => std::fs::read_to_string(path),
    None => {
      let mut payload = String::new();
      std::io::stdin().read_to_string(&mut payload)?;
      Ok(payload)
    }
  }
}

#[cfg(feature = "backend-tract")]
fn load_detector(
  args: &args::Args,
) -> BehaviorDetector<xueqing::model::YoloOnnx<xueqing::label::BehaviorLabel>> {
  use xueqing::model::YoloOnnxBuilder;

  let model = YoloOnnxBuilder::from_locator(&args.model)
    .and_then(|builder| builder.nms_threshold(args.nms_threshold).build());
  BehaviorDetector::new(DetectorMode::from_load_result(model)).with_threshold(args.confidence)
}

#[cfg(not(feature = "backend-tract"))]
fn load_detector(args: &args::Args) -> BehaviorDetector<xueqing::model::NoModel> {
  tracing::warn!("未启用推理后端，忽略模型 {}，使用模拟数据", args.model);
  BehaviorDetector::new(DetectorMode::Simulated).with_threshold(args.confidence)
}

fn write_envelope(envelope: &ResultEnvelope) -> Result<()> {
  let json = envelope.to_json().context("无法序列化结果")?;
  let mut stdout = std::io::stdout().lock();
  writeln!(stdout, "{}", json).context("无法写出结果")?;
  stdout.flush().context("无法写出结果")?;
  Ok(())
}

fn main() -> Result<()> {
  let args = args::Args::parse();

  tracing_subscriber::fmt()
    .with_writer(std::io::stderr)
    .with_max_level(if args.verbose {
      Level::DEBUG
    } else {
      Level::INFO
    })
    .init();

  info!("学情 课堂行为检测");
  info!("模型文件路径: {}", args.model);
  info!("置信度阈值: {}", args.confidence);
  info!("NMS 阈值: {}", args.nms_threshold);

  let payload = match read_payload(args.input.as_deref()) {
    Ok(payload) => payload,
    Err(e) => {
      error!("读取输入失败: {}", e);
      return write_envelope(&ResultEnvelope::failure(format!("读取输入失败: {}", e)));
    }
  };

  let detector = load_detector(&args);
  let draw = Draw::new(LabelFont::load(&args.font, args.font_size));

  let envelope = AnnotateTask::new(&detector, &draw)
    .with_jpeg_quality(args.jpeg_quality)
    .run_task(&payload);

  // 错误信息只体现在 JSON 中，进程总是正常退出
  write_envelope(&envelope)
}
