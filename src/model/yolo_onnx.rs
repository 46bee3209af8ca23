// 该文件是 Xueqing （学情） 项目的一部分。
// src/model/yolo_onnx.rs - ONNX YOLO 行为检测模型
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

use image::RgbImage;
use thiserror::Error;
use tracing::{debug, error, info};
use tract_onnx::prelude::*;
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  model::{DetectItem, DetectResult, Model, WithLabel},
};

const YOLO_INPUT_SIZE: u32 = 640;
const YOLO_BOX_VALUES: usize = 4;
// 模型层面的粗筛阈值，行为置信度阈值由检测器另行过滤
const YOLO_OBJECT_THRESH: f32 = 0.25;
pub const YOLO_DEFAULT_NMS_THRESH: f32 = 0.45;

pub struct YoloOnnx<T> {
  plan: TypedRunnableModel<TypedModel>,
  input_size: u32,
  nms_threshold: f32,
  _phantom: std::marker::PhantomData<T>,
}

#[derive(Error, Debug)]
pub enum YoloOnnxError {
  #[error("模型加载错误: {0}")]
  ModelLoadError(#[from] std::io::Error),
  #[error("Tract 错误: {0}")]
  TractError(String),
  #[error("模型路径错误: {0}")]
  ModelPathError(String),
  #[error("模型输出形状不符: {0:?}")]
  OutputShape(Vec<usize>),
}

impl YoloOnnxError {
  fn tract(e: TractError) -> Self {
    YoloOnnxError::TractError(format!("{e:#}"))
  }
}

pub struct YoloOnnxBuilder {
  model_path: String,
  input_size: u32,
  nms_threshold: f32,
}

impl FromUrlWithScheme for YoloOnnxBuilder {
  const SCHEME: &'static str = "onnx";
}

impl FromUrl for YoloOnnxBuilder {
  type Error = YoloOnnxError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(YoloOnnxError::ModelPathError(format!(
        "模型路径必须使用 {} 方案，实际为 {}",
        Self::SCHEME,
        url.scheme()
      )));
    }
    if url.path().is_empty() {
      return Err(YoloOnnxError::ModelPathError("模型路径为空".to_string()));
    }

    Ok(Self::from_path(url.path()))
  }
}

impl YoloOnnxBuilder {
  pub fn from_path<P: AsRef<Path>>(path: P) -> Self {
    YoloOnnxBuilder {
      model_path: path.as_ref().to_string_lossy().into_owned(),
      input_size: YOLO_INPUT_SIZE,
      nms_threshold: YOLO_DEFAULT_NMS_THRESH,
    }
  }

  /// 解析模型位置
  ///
  /// 接受 `onnx:` URL 或者普通文件路径，其余方案视为错误。
  pub fn from_locator(locator: &str) -> Result<Self, YoloOnnxError> {
    let locator = locator.trim();
    if locator.is_empty() {
      return Err(YoloOnnxError::ModelPathError("模型路径为空".to_string()));
    }

    match Url::parse(locator) {
      // Windows 盘符会被解析为单字母方案
      Ok(url) if url.scheme().len() == 1 => Ok(Self::from_path(locator)),
      Ok(url) => Self::from_url(&url),
      Err(url::ParseError::RelativeUrlWithoutBase) => Ok(Self::from_path(locator)),
      Err(e) => Err(YoloOnnxError::ModelPathError(format!(
        "无法解析模型位置 {}: {}",
        locator, e
      ))),
    }
  }

  pub fn nms_threshold(mut self, nms_threshold: f32) -> Self {
    self.nms_threshold = nms_threshold;
    self
  }

  pub fn build<T>(self) -> Result<YoloOnnx<T>, YoloOnnxError> {
    info!("加载模型文件: {}", self.model_path);
    let model_data = std::fs::read(&self.model_path)?;
    debug!(
      "模型文件大小: {:.2} MB",
      model_data.len() as f64 / (1024.0 * 1024.0)
    );

    let size = self.input_size as usize;
    info!("创建 ONNX 推理计划");
    let plan = tract_onnx::onnx()
      .model_for_read(&mut &model_data[..])
      .map_err(YoloOnnxError::tract)?
      .with_input_fact(
        0,
        InferenceFact::dt_shape(f32::datum_type(), tvec!(1, 3, size, size)),
      )
      .map_err(YoloOnnxError::tract)?
      .into_optimized()
      .map_err(YoloOnnxError::tract)?
      .into_runnable()
      .map_err(YoloOnnxError::tract)?;
    info!("模型加载完成");

    Ok(YoloOnnx {
      plan,
      input_size: self.input_size,
      nms_threshold: self.nms_threshold,
      _phantom: std::marker::PhantomData,
    })
  }
}

impl<T> YoloOnnx<T> {
  /// 缩放到模型输入尺寸，转为 NCHW 并归一化到 [0, 1]
  fn preprocess(&self, image: &RgbImage) -> Tensor {
    let size = self.input_size;
    let resized =
      image::imageops::resize(image, size, size, image::imageops::FilterType::Triangle);

    tract_ndarray::Array4::from_shape_fn(
      (1, 3, size as usize, size as usize),
      |(_, channel, y, x)| resized.get_pixel(x as u32, y as u32)[channel] as f32 / 255.0,
    )
    .into_tensor()
  }
}

impl<T: WithLabel> Model for YoloOnnx<T> {
  type Input = RgbImage;
  type Output = DetectResult<T>;
  type Error = YoloOnnxError;

  fn infer(&self, input: &Self::Input) -> Result<Self::Output, Self::Error> {
    debug!("设置模型输入");
    let tensor = self.preprocess(input);

    debug!("执行模型推理");
    let outputs = self
      .plan
      .run(tvec!(tensor.into()))
      .map_err(YoloOnnxError::tract)?;

    debug!("获取模型输出");
    let output = outputs
      .first()
      .ok_or_else(|| YoloOnnxError::OutputShape(Vec::new()))?;
    let view = output
      .to_array_view::<f32>()
      .map_err(YoloOnnxError::tract)?;

    let scale_x = input.width() as f32 / self.input_size as f32;
    let scale_y = input.height() as f32 / self.input_size as f32;
    let items = decode_predictions(
      view,
      (scale_x, scale_y),
      (input.width() as f32, input.height() as f32),
    )?;

    Ok(nms(items, self.nms_threshold).into())
  }
}

/// 解码 YOLO 输出
///
/// 输出形状为 `[1, 4 + 类别数, 锚点数]`，坐标为中心点和宽高，
/// 换算回原图并裁剪到图像范围内。
fn decode_predictions<T: WithLabel>(
  view: tract_ndarray::ArrayViewD<f32>,
  (scale_x, scale_y): (f32, f32),
  (image_w, image_h): (f32, f32),
) -> Result<Vec<DetectItem<T>>, YoloOnnxError> {
  let shape = view.shape().to_vec();
  let view = view
    .into_dimensionality::<tract_ndarray::Ix3>()
    .map_err(|_| YoloOnnxError::OutputShape(shape.clone()))?;

  let (batch, features, anchors) = view.dim();
  if batch != 1 || features <= YOLO_BOX_VALUES {
    error!("模型输出形状不符: {:?}", shape);
    return Err(YoloOnnxError::OutputShape(shape));
  }
  let num_classes = features - YOLO_BOX_VALUES;
  debug!("锚点数量: {}, 类别数量: {}", anchors, num_classes);

  let mut items = Vec::new();
  for a in 0..anchors {
    let (class_id, score) = (0..num_classes)
      .map(|c| (c, view[[0, YOLO_BOX_VALUES + c, a]]))
      .fold((0usize, f32::MIN), |best, cur| if cur.1 > best.1 { cur } else { best });

    if score <= YOLO_OBJECT_THRESH {
      continue;
    }

    let cx = view[[0, 0, a]];
    let cy = view[[0, 1, a]];
    let w = view[[0, 2, a]];
    let h = view[[0, 3, a]];

    let x_min = ((cx - w / 2.0) * scale_x).clamp(0.0, image_w);
    let y_min = ((cy - h / 2.0) * scale_y).clamp(0.0, image_h);
    let x_max = ((cx + w / 2.0) * scale_x).clamp(0.0, image_w);
    let y_max = ((cy + h / 2.0) * scale_y).clamp(0.0, image_h);

    if x_min >= x_max || y_min >= y_max {
      continue;
    }

    items.push(DetectItem {
      kind: T::from_label_id(class_id as u32),
      score: score.min(1.0),
      bbox: [x_min, y_min, x_max, y_max],
    });
  }

  debug!("NMS 前检测到 {} 个物体", items.len());
  Ok(items)
}

/// 非极大值抑制，同类别之间进行
///
/// 结果按置信度降序排列。
fn nms<T: WithLabel>(mut items: Vec<DetectItem<T>>, nms_threshold: f32) -> Vec<DetectItem<T>> {
  items.sort_by(|a, b| b.score.total_cmp(&a.score));

  let mut result: Vec<DetectItem<T>> = Vec::new();
  for item in items {
    let suppressed = result.iter().any(|kept| {
      kept.kind.to_label_str() == item.kind.to_label_str()
        && iou(&kept.bbox, &item.bbox) >= nms_threshold
    });
    if !suppressed {
      result.push(item);
    }
  }

  result
}

fn iou(a: &[f32; 4], b: &[f32; 4]) -> f32 {
  let x1 = a[0].max(b[0]);
  let y1 = a[1].max(b[1]);
  let x2 = a[2].min(b[2]);
  let y2 = a[3].min(b[3]);

  let intersection = (x2 - x1).max(0.0) * (y2 - y1).max(0.0);
  let area_a = (a[2] - a[0]) * (a[3] - a[1]);
  let area_b = (b[2] - b[0]) * (b[3] - b[1]);
  let union = area_a + area_b - intersection;

  if union > 0.0 {
    intersection / union
  } else {
    0.0
  }
}
