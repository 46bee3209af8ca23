// 该文件是 Xueqing （学情） 项目的一部分。
// src/output/font.rs - 标签字体
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

use std::path::Path;

use ab_glyph::{FontArc, PxScale};
use image::{Rgb, RgbImage};
use imageproc::drawing::draw_text_mut;
use tracing::{debug, info, warn};

pub const DEFAULT_FONT_PATH: &str = "simhei.ttf";
pub const DEFAULT_FONT_SIZE: f32 = 15.0;

// 内置字体，不含中文字形
const EMBEDDED_FONT: &[u8] = include_bytes!("../../assets/DejaVuSans.ttf");

// 指定字体不可用时依次尝试的系统中文字体
const SYSTEM_CJK_FONTS: &[&str] = &[
  "/usr/share/fonts/opentype/noto/NotoSansCJK-Regular.ttc",
  "/usr/share/fonts/noto-cjk/NotoSansCJK-Regular.ttc",
  "/usr/share/fonts/google-noto-cjk/NotoSansCJK-Regular.ttc",
  "/usr/share/fonts/truetype/wqy/wqy-microhei.ttc",
  "/usr/share/fonts/truetype/wqy/wqy-zenhei.ttc",
  "/usr/share/fonts/wenquanyi/wqy-microhei/wqy-microhei.ttc",
  "/System/Library/Fonts/PingFang.ttc",
  "/System/Library/Fonts/STHeiti Medium.ttc",
  "C:\\Windows\\Fonts\\simhei.ttf",
  "C:\\Windows\\Fonts\\msyh.ttc",
];

/// 标签字体
///
/// 依次尝试指定的字体文件、常见的系统中文字体，最后使用内置字体。
pub struct LabelFont {
  font: FontArc,
  scale: PxScale,
}

impl LabelFont {
  /// 加载字体，任何失败都回退到下一个候选
  pub fn load<P: AsRef<Path>>(path: P, size: f32) -> Self {
    let path = path.as_ref();
    match read_font(path) {
      Ok(font) => {
        info!("加载字体: {}", path.display());
        return Self::new(font, size);
      }
      Err(e) => warn!("无法加载字体 {}: {}", path.display(), e),
    }

    for candidate in SYSTEM_CJK_FONTS.iter().map(Path::new) {
      match read_font(candidate) {
        Ok(font) => {
          info!("使用系统字体: {}", candidate.display());
          return Self::new(font, size);
        }
        Err(e) => debug!("跳过系统字体 {}: {}", candidate.display(), e),
      }
    }

    warn!("未找到可用的中文字体，使用内置字体，中文标签无法正常显示");
    Self::embedded(size)
  }

  fn embedded(size: f32) -> Self {
    let font = FontArc::try_from_slice(EMBEDDED_FONT).expect("无法加载嵌入的字体文件");
    Self::new(font, size)
  }

  fn new(font: FontArc, size: f32) -> Self {
    Self {
      font,
      scale: PxScale::from(size),
    }
  }

  /// 以 (x, y) 为左上角绘制文本，超出图像的部分被裁剪
  pub fn draw_text(&self, image: &mut RgbImage, color: Rgb<u8>, x: i32, y: i32, text: &str) {
    draw_text_mut(image, color, x, y, self.scale, &self.font, text);
  }
}

impl Default for LabelFont {
  fn default() -> Self {
    Self::embedded(DEFAULT_FONT_SIZE)
  }
}

fn read_font(path: &Path) -> Result<FontArc, String> {
  let data = std::fs::read(path).map_err(|e| e.to_string())?;
  FontArc::try_from_vec(data).map_err(|e| e.to_string())
}
