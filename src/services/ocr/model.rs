// PaddleOCR-style two-stage model: text detection + CTC recognition over
// two ONNX sessions.
//
// This is the concrete TextRecognizer; everything above it consumes only
// the RawPrediction contract.

use crate::core::config::OcrConfig;
use crate::core::errors::OcrError;
use crate::core::types::{PixelGrid, RawPrediction};
use ndarray::Array4;
use ort::session::{builder::GraphOptimizationLevel, Session};
use ort::value::Value;
use std::path::Path;
use tracing::debug;

use super::TextRecognizer;

/// Long side cap for the detection input.
const DET_MAX_SIDE: u32 = 960;
/// Detection input dims must be a multiple of the network stride.
const DET_STRIDE: u32 = 32;
/// Recognition input height.
const REC_HEIGHT: u32 = 48;
const REC_MIN_WIDTH: u32 = 16;
const REC_MAX_WIDTH: u32 = 512;
/// Detected components smaller than this on either side are noise.
const MIN_BOX_SIDE: i32 = 3;
/// Padding added around detected boxes before cropping for recognition.
const BOX_PAD: i32 = 2;

const DET_MEAN: [f32; 3] = [0.485, 0.456, 0.406];
const DET_STD: [f32; 3] = [0.229, 0.224, 0.225];

pub struct PaddleModel {
    det: Session,
    rec: Session,
    charset: Vec<String>,
    det_threshold: f32,
}

impl PaddleModel {
    pub fn load(config: &OcrConfig) -> Result<Self, OcrError> {
        let det = Self::build_session(
            &config.det_model_dir.join("inference.onnx"),
            config.intra_threads,
        )?;
        let rec = Self::build_session(
            &config.rec_model_dir.join("inference.onnx"),
            config.intra_threads,
        )?;
        let charset = Self::load_charset(&config.rec_model_dir.join("keys.txt"))?;

        debug!("recognition charset has {} entries", charset.len());

        Ok(Self {
            det,
            rec,
            charset,
            det_threshold: config.det_threshold,
        })
    }

    fn build_session(path: &Path, intra_threads: usize) -> Result<Session, OcrError> {
        if !path.is_file() {
            return Err(OcrError::ModelAssetsMissing {
                path: path.to_path_buf(),
            });
        }

        let session = Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .with_intra_threads(intra_threads)?
            .commit_from_file(path)?;

        Ok(session)
    }

    /// Loads the recognition charset, one token per line. Index 0 of the
    /// model output is the CTC blank; line `i` maps to output index `i + 1`.
    fn load_charset(path: &Path) -> Result<Vec<String>, OcrError> {
        if !path.is_file() {
            return Err(OcrError::ModelAssetsMissing {
                path: path.to_path_buf(),
            });
        }

        let content = std::fs::read_to_string(path).map_err(|source| OcrError::AssetRead {
            path: path.to_path_buf(),
            source,
        })?;

        Ok(content.lines().map(|line| line.to_string()).collect())
    }

    fn detect(&mut self, image: &PixelGrid) -> Result<Vec<[i32; 4]>, OcrError> {
        if image.width == 0 || image.height == 0 {
            return Err(OcrError::Preprocessing(format!(
                "invalid image dimensions: {}x{}",
                image.width, image.height
            )));
        }

        let (tensor, in_w, in_h) = det_preprocess(image);

        let shape: Vec<usize> = tensor.shape().to_vec();
        let (data, _offset) = tensor.into_raw_vec_and_offset();
        let shape_arr: [usize; 4] = [shape[0], shape[1], shape[2], shape[3]];
        let input = Value::from_array((shape_arr, data))?;

        // Extract the probability map while the outputs are borrowed, then
        // drop them before post-processing.
        let (dims, probs) = {
            let outputs = self.det.run(ort::inputs!["x" => input])?;
            let first_key = outputs
                .keys()
                .next()
                .ok_or_else(|| OcrError::Preprocessing("detection model has no outputs".into()))?;
            let (shape, data) = outputs[first_key].try_extract_tensor::<f32>()?;
            let dims: Vec<usize> = shape.iter().map(|&d| d as usize).collect();
            (dims, data.to_vec())
        };

        // Probability map comes back as [1, 1, H, W] at input resolution.
        let (map_h, map_w) = match dims.as_slice() {
            [1, 1, h, w] => (*h, *w),
            other => {
                return Err(OcrError::Preprocessing(format!(
                    "unexpected detection output shape: {other:?}"
                )))
            }
        };

        let mut boxes = boxes_from_prob_map(&probs, map_w, map_h, self.det_threshold);

        // Map back to original pixel coordinates and pad slightly so the
        // recognition crop does not clip glyph edges.
        let scale_x = image.width as f32 / in_w as f32;
        let scale_y = image.height as f32 / in_h as f32;
        for b in &mut boxes {
            b[0] = ((b[0] as f32 * scale_x) as i32 - BOX_PAD).max(0);
            b[1] = ((b[1] as f32 * scale_y) as i32 - BOX_PAD).max(0);
            b[2] = ((b[2] as f32 * scale_x) as i32 + BOX_PAD).min(image.width as i32 - 1);
            b[3] = ((b[3] as f32 * scale_y) as i32 + BOX_PAD).min(image.height as i32 - 1);
        }
        boxes.retain(|b| b[2] - b[0] >= MIN_BOX_SIDE && b[3] - b[1] >= MIN_BOX_SIDE);

        debug!("detector proposed {} text boxes", boxes.len());
        Ok(boxes)
    }

    fn recognize(&mut self, image: &PixelGrid, bbox: &[i32; 4]) -> Result<(String, f32), OcrError> {
        let tensor = rec_preprocess(image, bbox);

        let shape: Vec<usize> = tensor.shape().to_vec();
        let (data, _offset) = tensor.into_raw_vec_and_offset();
        let shape_arr: [usize; 4] = [shape[0], shape[1], shape[2], shape[3]];
        let input = Value::from_array((shape_arr, data))?;

        let (dims, logits) = {
            let outputs = self.rec.run(ort::inputs!["x" => input])?;
            let first_key = outputs.keys().next().ok_or_else(|| {
                OcrError::Preprocessing("recognition model has no outputs".into())
            })?;
            let (shape, data) = outputs[first_key].try_extract_tensor::<f32>()?;
            let dims: Vec<usize> = shape.iter().map(|&d| d as usize).collect();
            (dims, data.to_vec())
        };

        // Logits come back as [1, T, V].
        let (steps, vocab_size) = match dims.as_slice() {
            [1, t, v] => (*t, *v),
            other => {
                return Err(OcrError::Preprocessing(format!(
                    "unexpected recognition output shape: {other:?}"
                )))
            }
        };

        Ok(ctc_decode(&logits, steps, vocab_size, &self.charset))
    }
}

impl TextRecognizer for PaddleModel {
    fn predict(&mut self, image: &PixelGrid) -> Result<RawPrediction, OcrError> {
        let boxes = self.detect(image)?;

        let mut raw = RawPrediction::default();
        for bbox in boxes {
            let (text, score) = self.recognize(image, &bbox)?;
            let [x0, y0, x1, y1] = bbox;
            raw.rec_texts.push(text);
            raw.rec_scores.push(score);
            raw.rec_boxes.push(bbox);
            raw.rec_polys
                .push(vec![[x0, y0], [x1, y0], [x1, y1], [x0, y1]]);
        }

        Ok(raw)
    }
}

/// Resize (long side capped, dims rounded up to the network stride),
/// normalize, and pack into an NCHW tensor. Returns the tensor plus the
/// actual input dims used, for mapping detections back.
fn det_preprocess(image: &PixelGrid) -> (Array4<f32>, u32, u32) {
    let long_side = image.width.max(image.height);
    let scale = if long_side > DET_MAX_SIDE {
        DET_MAX_SIDE as f32 / long_side as f32
    } else {
        1.0
    };

    let in_w = round_to_stride((image.width as f32 * scale) as u32);
    let in_h = round_to_stride((image.height as f32 * scale) as u32);

    let mut tensor = Array4::<f32>::zeros((1, 3, in_h as usize, in_w as usize));
    for y in 0..in_h {
        let src_y = (y * image.height / in_h).min(image.height - 1);
        for x in 0..in_w {
            let src_x = (x * image.width / in_w).min(image.width - 1);
            let bgr = image.pixel(src_x, src_y);
            for c in 0..3 {
                tensor[[0, c, y as usize, x as usize]] =
                    (bgr[c] as f32 / 255.0 - DET_MEAN[c]) / DET_STD[c];
            }
        }
    }

    (tensor, in_w, in_h)
}

fn round_to_stride(side: u32) -> u32 {
    side.max(DET_STRIDE).div_ceil(DET_STRIDE) * DET_STRIDE
}

/// Crop the box, resize to the recognition height keeping aspect ratio, and
/// normalize to [-1, 1].
fn rec_preprocess(image: &PixelGrid, bbox: &[i32; 4]) -> Array4<f32> {
    let x0 = bbox[0].max(0) as u32;
    let y0 = bbox[1].max(0) as u32;
    let x1 = (bbox[2] as u32).min(image.width.saturating_sub(1));
    let y1 = (bbox[3] as u32).min(image.height.saturating_sub(1));
    let crop_w = (x1 - x0 + 1).max(1);
    let crop_h = (y1 - y0 + 1).max(1);

    let scale = REC_HEIGHT as f32 / crop_h as f32;
    let in_w = ((crop_w as f32 * scale) as u32).clamp(REC_MIN_WIDTH, REC_MAX_WIDTH);

    let mut tensor = Array4::<f32>::zeros((1, 3, REC_HEIGHT as usize, in_w as usize));
    for y in 0..REC_HEIGHT {
        let src_y = y0 + (y * crop_h / REC_HEIGHT).min(crop_h - 1);
        for x in 0..in_w {
            let src_x = x0 + (x * crop_w / in_w).min(crop_w - 1);
            let bgr = image.pixel(src_x, src_y);
            for c in 0..3 {
                tensor[[0, c, y as usize, x as usize]] = bgr[c] as f32 / 127.5 - 1.0;
            }
        }
    }

    tensor
}

/// Threshold the probability map and turn each connected component into its
/// bounding box (map coordinates).
fn boxes_from_prob_map(probs: &[f32], width: usize, height: usize, threshold: f32) -> Vec<[i32; 4]> {
    let mut visited = vec![false; width * height];
    let mut boxes = Vec::new();
    let mut stack = Vec::new();

    for start in 0..width * height {
        if visited[start] || probs[start] < threshold {
            continue;
        }

        let (mut min_x, mut min_y) = (width - 1, height - 1);
        let (mut max_x, mut max_y) = (0usize, 0usize);

        visited[start] = true;
        stack.push(start);
        while let Some(idx) = stack.pop() {
            let (x, y) = (idx % width, idx / width);
            min_x = min_x.min(x);
            max_x = max_x.max(x);
            min_y = min_y.min(y);
            max_y = max_y.max(y);

            // 4-connected neighborhood
            if x > 0 {
                push_if_text(idx - 1, probs, threshold, &mut visited, &mut stack);
            }
            if x + 1 < width {
                push_if_text(idx + 1, probs, threshold, &mut visited, &mut stack);
            }
            if y > 0 {
                push_if_text(idx - width, probs, threshold, &mut visited, &mut stack);
            }
            if y + 1 < height {
                push_if_text(idx + width, probs, threshold, &mut visited, &mut stack);
            }
        }

        boxes.push([min_x as i32, min_y as i32, max_x as i32, max_y as i32]);
    }

    boxes
}

fn push_if_text(
    idx: usize,
    probs: &[f32],
    threshold: f32,
    visited: &mut [bool],
    stack: &mut Vec<usize>,
) {
    if !visited[idx] && probs[idx] >= threshold {
        visited[idx] = true;
        stack.push(idx);
    }
}

/// CTC greedy decode: argmax per timestep, collapse repeats, drop blanks
/// (index 0). Confidence is the mean best-class probability of the kept
/// characters.
fn ctc_decode(logits: &[f32], steps: usize, vocab_size: usize, charset: &[String]) -> (String, f32) {
    let mut text = String::new();
    let mut confidences = Vec::new();
    let mut prev_idx = None;

    for t in 0..steps {
        let offset = t * vocab_size;
        let mut best_idx = 0;
        let mut best_val = f32::NEG_INFINITY;
        for i in 0..vocab_size {
            let val = logits[offset + i];
            if val > best_val {
                best_val = val;
                best_idx = i;
            }
        }

        if best_idx != 0 && prev_idx != Some(best_idx) {
            if let Some(token) = charset.get(best_idx - 1) {
                text.push_str(token);
                confidences.push(best_val.clamp(0.0, 1.0));
            }
        }

        prev_idx = Some(best_idx);
    }

    let confidence = if confidences.is_empty() {
        0.0
    } else {
        confidences.iter().sum::<f32>() / confidences.len() as f32
    };

    (text, confidence)
}
