// 该文件是 Xueqing （学情） 项目的一部分。
// src/output.rs - 输出定义
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
use image::{RgbImage, codecs::jpeg::JpegEncoder};
use thiserror::Error;
use tracing::debug;

pub mod draw;
pub mod envelope;
pub mod font;

pub use self::draw::Draw;
pub use self::envelope::ResultEnvelope;
pub use self::font::LabelFont;

pub const DEFAULT_JPEG_QUALITY: u8 = 75;

#[derive(Error, Debug)]
pub enum EncodeError {
  #[error("图像编码错误: {0}")]
  ImageError(#[from] image::ImageError),
  #[error("JPEG 质量必须在 1 到 100 之间，实际为 {0}")]
  InvalidQuality(u8),
}

/// 编码为 JPEG 并转为 Base64
pub fn encode_jpeg_base64(image: &RgbImage, quality: u8) -> Result<String, EncodeError> {
  if !(1..=100).contains(&quality) {
    return Err(EncodeError::InvalidQuality(quality));
  }

  let mut buf = Vec::new();
  JpegEncoder::new_with_quality(&mut buf, quality).encode_image(image)?;
  debug!("JPEG 编码完成: {} 字节", buf.len());

  Ok(BASE64_STANDARD.encode(buf))
}
