// 该文件是 Xueqing （学情） 项目的一部分。
// src/label.rs - 课堂行为类别表
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

use image::Rgb;
use serde::Serialize;

use crate::model::WithLabel;

/// 课堂行为类别
///
/// 类别编号与模型训练时的编号一致，未登记的编号统一映射为 [`BehaviorLabel::Unknown`]。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BehaviorLabel {
  Attentive,
  PhoneUse,
  Sleeping,
  Talking,
  Writing,
  Reading,
  HandRaising,
  Unknown,
}

/// 模型可输出的全部类别，下标即类别编号
pub const BEHAVIOR_LABELS: [BehaviorLabel; 7] = [
  BehaviorLabel::Attentive,
  BehaviorLabel::PhoneUse,
  BehaviorLabel::Sleeping,
  BehaviorLabel::Talking,
  BehaviorLabel::Writing,
  BehaviorLabel::Reading,
  BehaviorLabel::HandRaising,
];

impl BehaviorLabel {
  pub fn name(&self) -> &'static str {
    match self {
      BehaviorLabel::Attentive => "专心听讲",
      BehaviorLabel::PhoneUse => "使用手机",
      BehaviorLabel::Sleeping => "睡觉",
      BehaviorLabel::Talking => "交谈",
      BehaviorLabel::Writing => "写作业",
      BehaviorLabel::Reading => "看书",
      BehaviorLabel::HandRaising => "举手提问",
      BehaviorLabel::Unknown => "未知行为",
    }
  }

  pub fn color(&self) -> BehaviorColor {
    match self {
      BehaviorLabel::Attentive => BehaviorColor::Green,
      BehaviorLabel::PhoneUse => BehaviorColor::Orange,
      BehaviorLabel::Sleeping => BehaviorColor::Red,
      BehaviorLabel::Talking => BehaviorColor::Yellow,
      BehaviorLabel::Writing => BehaviorColor::Blue,
      BehaviorLabel::Reading => BehaviorColor::Purple,
      BehaviorLabel::HandRaising => BehaviorColor::Cyan,
      BehaviorLabel::Unknown => BehaviorColor::Blue,
    }
  }

  pub fn description(&self) -> &'static str {
    match self {
      BehaviorLabel::Attentive => "学生正在专注地听老师讲课，表现出良好的学习态度。",
      BehaviorLabel::PhoneUse => "学生在课堂上使用手机，可能影响学习效果。",
      BehaviorLabel::Sleeping => "学生在课堂上睡觉，需要老师关注和提醒。",
      BehaviorLabel::Talking => "学生与同学交谈，可能是讨论学习内容或私人话题。",
      BehaviorLabel::Writing => "学生正在认真完成作业或笔记。",
      BehaviorLabel::Reading => "学生在阅读教材或其他学习资料。",
      BehaviorLabel::HandRaising => "学生积极参与课堂互动，举手提问或回答问题。",
      BehaviorLabel::Unknown => "检测到的学生行为",
    }
  }
}

impl WithLabel for BehaviorLabel {
  fn to_label_str(&self) -> String {
    self.name().to_string()
  }

  fn from_label_id(id: u32) -> Self {
    BEHAVIOR_LABELS
      .get(id as usize)
      .copied()
      .unwrap_or(BehaviorLabel::Unknown)
  }
}

/// 绘制颜色，序列化为颜色名称
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BehaviorColor {
  Green,
  Orange,
  Red,
  Yellow,
  Blue,
  Purple,
  Cyan,
}

impl BehaviorColor {
  pub fn name(&self) -> &'static str {
    match self {
      BehaviorColor::Green => "green",
      BehaviorColor::Orange => "orange",
      BehaviorColor::Red => "red",
      BehaviorColor::Yellow => "yellow",
      BehaviorColor::Blue => "blue",
      BehaviorColor::Purple => "purple",
      BehaviorColor::Cyan => "cyan",
    }
  }

  // 与常见 CSS 颜色名取值一致
  pub fn rgb(&self) -> Rgb<u8> {
    match self {
      BehaviorColor::Green => Rgb([0, 128, 0]),
      BehaviorColor::Orange => Rgb([255, 165, 0]),
      BehaviorColor::Red => Rgb([255, 0, 0]),
      BehaviorColor::Yellow => Rgb([255, 255, 0]),
      BehaviorColor::Blue => Rgb([0, 0, 255]),
      BehaviorColor::Purple => Rgb([128, 0, 128]),
      BehaviorColor::Cyan => Rgb([0, 255, 255]),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn class_ids_map_in_training_order() {
    assert_eq!(BehaviorLabel::from_label_id(0), BehaviorLabel::Attentive);
    assert_eq!(BehaviorLabel::from_label_id(1), BehaviorLabel::PhoneUse);
    assert_eq!(BehaviorLabel::from_label_id(6), BehaviorLabel::HandRaising);
    assert_eq!(BehaviorLabel::from_label_id(2).to_label_str(), "睡觉");
  }

  #[test]
  fn unmapped_ids_fall_back_to_unknown() {
    for id in [7, 42, u32::MAX] {
      let label = BehaviorLabel::from_label_id(id);
      assert_eq!(label, BehaviorLabel::Unknown);
      assert_eq!(label.name(), "未知行为");
      assert_eq!(label.color(), BehaviorColor::Blue);
      assert_eq!(label.description(), "检测到的学生行为");
    }
  }

  #[test]
  fn every_known_label_has_distinct_name() {
    let mut names: Vec<_> = BEHAVIOR_LABELS.iter().map(|l| l.name()).collect();
    names.sort();
    names.dedup();
    assert_eq!(names.len(), BEHAVIOR_LABELS.len());
  }

  #[test]
  fn color_serializes_as_name() {
    for color in [BehaviorColor::Green, BehaviorColor::Orange, BehaviorColor::Cyan] {
      let json = serde_json::to_string(&color).unwrap();
      assert_eq!(json, format!("\"{}\"", color.name()));
    }
  }
}
