// 该文件是 Xueqing （学情） 项目的一部分。
// src/input.rs - Base64 图像输入
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

use base64::{Engine, prelude::BASE64_STANDARD};
use image::RgbImage;
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum InputError {
  #[error("Base64 解码错误: {0}")]
  Base64Error(#[from] base64::DecodeError),
  #[error("图像数据为空")]
  EmptyImage,
  #[error("图像解码错误: {0}")]
  ImageLoadError(#[from] image::ImageError),
}

/// 解码 Base64 图像
///
/// 首尾空白会被忽略，图像格式根据内容自动识别，统一转换为 RGB。
pub fn decode_base64_image(payload: &str) -> Result<RgbImage, InputError> {
  let bytes = BASE64_STANDARD.decode(payload.trim())?;
  if bytes.is_empty() {
    return Err(InputError::EmptyImage);
  }
  debug!("图像数据大小: {} 字节", bytes.len());

  let image = image::load_from_memory(&bytes)?.to_rgb8();
  debug!("图像尺寸: {}x{}", image.width(), image.height());
  Ok(image)
}
