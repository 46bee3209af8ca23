// 该文件是 Xueqing （学情） 项目的一部分。
// src/output/draw.rs - 行为检测结果可视化
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

use image::{Rgb, RgbImage};
use imageproc::{drawing::draw_hollow_rect_mut, rect::Rect};
use tracing::debug;

use crate::{detector::DetectionRecord, output::font::LabelFont};

// 边框线宽，向框内加粗
const BBOX_STROKE_WIDTH: i32 = 3;
// 标签放在框上方的偏移
const LABEL_OFFSET_ABOVE: i32 = 20;
// 框贴近图像顶部时，标签放在框内的偏移
const LABEL_OFFSET_INSIDE: i32 = 5;

pub struct Draw {
  font: LabelFont,
  stroke_width: i32,
}

impl Default for Draw {
  fn default() -> Self {
    Self::new(LabelFont::default())
  }
}

impl Draw {
  pub fn new(font: LabelFont) -> Self {
    Self {
      font,
      stroke_width: BBOX_STROKE_WIDTH,
    }
  }

  /// 在图像上依次绘制所有检测结果
  pub fn draw_detections_on_image(&self, image: &mut RgbImage, records: &[DetectionRecord]) {
    for record in records {
      let color = record.color.rgb();
      self.draw_bbox(image, &record.bbox, color);

      let (x, y) = label_anchor(&record.bbox);
      self
        .font
        .draw_text(image, color, x, y, &label_text(record.label, record.confidence));
    }
    debug!("绘制了 {} 个检测框", records.len());
  }

  // 矩形框 [x_min, y_min, x_max, y_max] 包含右下角，超出图像的部分由 imageproc 裁剪
  fn draw_bbox(&self, image: &mut RgbImage, bbox: &[i32; 4], color: Rgb<u8>) {
    let [x_min, y_min, x_max, y_max] = *bbox;

    for t in 0..self.stroke_width {
      let (left, top, right, bottom) = (x_min + t, y_min + t, x_max - t, y_max - t);
      if left > right || top > bottom {
        break;
      }
      let rect = Rect::at(left, top).of_size((right - left + 1) as u32, (bottom - top + 1) as u32);
      draw_hollow_rect_mut(image, rect, color);
    }
  }
}

/// 标签文本，置信度取整为百分比，恰好一半时取偶数
pub fn label_text(label: &str, confidence: f32) -> String {
  format!("{} ({}%)", label, (confidence * 100.0).round_ties_even() as i32)
}

/// 标签位置，框上方空间不足时移到框内
pub fn label_anchor(bbox: &[i32; 4]) -> (i32, i32) {
  let [x_min, y_min, _, _] = *bbox;
  if y_min - LABEL_OFFSET_ABOVE > 0 {
    (x_min, y_min - LABEL_OFFSET_ABOVE)
  } else {
    (x_min, y_min + LABEL_OFFSET_INSIDE)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{detector::simulated_detections, label::BehaviorColor};

  fn record(bbox: [i32; 4], color: BehaviorColor) -> DetectionRecord {
    DetectionRecord {
      bbox,
      label: "test",
      confidence: 0.9,
      description: "",
      color,
    }
  }

  #[test]
  fn label_text_rounds_percentage() {
    assert_eq!(label_text("专心听讲", 0.92), "专心听讲 (92%)");
    assert_eq!(label_text("睡觉", 0.786), "睡觉 (79%)");
    assert_eq!(label_text("交谈", 1.0), "交谈 (100%)");
  }

  #[test]
  fn label_text_rounds_halves_to_even() {
    assert_eq!(label_text("x", 0.625), "x (62%)");
    assert_eq!(label_text("x", 0.875), "x (88%)");
    assert_eq!(label_text("x", 0.125), "x (12%)");
  }

  #[test]
  fn label_moves_inside_box_near_top_edge() {
    assert_eq!(label_anchor(&[50, 50, 150, 180]), (50, 30));
    assert_eq!(label_anchor(&[10, 21, 20, 40]), (10, 1));
    assert_eq!(label_anchor(&[10, 20, 20, 40]), (10, 25));
    assert_eq!(label_anchor(&[0, 0, 20, 40]), (0, 5));
  }

  #[test]
  fn bbox_stroke_is_three_pixels_inward() {
    let mut image = RgbImage::new(60, 60);
    let draw = Draw::default();
    draw.draw_bbox(&mut image, &[10, 30, 40, 50], BehaviorColor::Red.rgb());

    let red = BehaviorColor::Red.rgb();
    for x in [10, 11, 12, 38, 39, 40] {
      assert_eq!(image.get_pixel(x, 40), &red, "x = {x}");
    }
    assert_ne!(image.get_pixel(13, 40), &red);
    assert_ne!(image.get_pixel(9, 40), &red);
    assert_ne!(image.get_pixel(41, 40), &red);
    for y in [30, 31, 32, 48, 49, 50] {
      assert_eq!(image.get_pixel(25, y), &red, "y = {y}");
    }
    assert_ne!(image.get_pixel(25, 33), &red);
  }

  #[test]
  fn boxes_beyond_image_are_clipped() {
    let mut image = RgbImage::new(480, 350);
    let draw = Draw::default();
    draw.draw_detections_on_image(&mut image, &simulated_detections());

    assert_eq!(image.dimensions(), (480, 350));
    assert_eq!(image.get_pixel(380, 150), &BehaviorColor::Red.rgb());
    assert_eq!(image.get_pixel(250, 349), &BehaviorColor::Orange.rgb());
  }

  #[test]
  fn degenerate_box_draws_nothing_outside() {
    let mut image = RgbImage::new(20, 20);
    Draw::default().draw_bbox(&mut image, &[15, 15, 5, 5], BehaviorColor::Blue.rgb());
    assert!(image.pixels().all(|p| *p == Rgb([0, 0, 0])));
  }

  #[test]
  fn text_uses_record_color() {
    let mut image = RgbImage::new(120, 120);
    let draw = Draw::default();
    draw.draw_detections_on_image(&mut image, &[record([60, 60, 100, 100], BehaviorColor::Cyan)]);

    // 标签位于 (60, 40)，在框的上方；抗锯齿像素只含青色分量
    let text_pixels: Vec<_> = (40..58)
      .flat_map(|y| (60..120).map(move |x| (x, y)))
      .map(|(x, y)| *image.get_pixel(x, y))
      .filter(|p| *p != Rgb([0, 0, 0]))
      .collect();
    assert!(!text_pixels.is_empty());
    assert!(text_pixels.iter().all(|p| p[0] == 0 && p[1] > 0 && p[1] == p[2]));
  }
}
