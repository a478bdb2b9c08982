// Value types flowing through the OCR-to-translation pipeline

use serde::{Deserialize, Serialize};

use crate::core::errors::OcrError;

/// Decoded image pixels in BGR channel order, row-major, 3 bytes per pixel.
///
/// The inference engine expects BGR input, so the decoder reorders channels
/// once at the boundary and everything downstream works on this layout.
#[derive(Debug, Clone)]
pub struct PixelGrid {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

impl PixelGrid {
    /// BGR bytes of the pixel at (x, y). Caller guarantees bounds.
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 3] {
        let idx = (y as usize * self.width as usize + x as usize) * 3;
        [self.data[idx], self.data[idx + 1], self.data[idx + 2]]
    }
}

/// Raw detect+recognize output: four co-indexed arrays, one entry per
/// detected region.
///
/// This is the structural contract with the model layer. Lengths are
/// validated in [`RawPrediction::into_regions`] immediately after the
/// inference call; misaligned arrays never propagate further.
#[derive(Debug, Clone, Default)]
pub struct RawPrediction {
    pub rec_texts: Vec<String>,
    pub rec_scores: Vec<f32>,
    pub rec_boxes: Vec<[i32; 4]>,
    pub rec_polys: Vec<Vec<[i32; 2]>>,
}

impl RawPrediction {
    pub fn into_regions(self) -> Result<Vec<TextRegion>, OcrError> {
        let n = self.rec_texts.len();
        if self.rec_scores.len() != n || self.rec_boxes.len() != n || self.rec_polys.len() != n {
            return Err(OcrError::MisalignedOutput {
                texts: n,
                scores: self.rec_scores.len(),
                boxes: self.rec_boxes.len(),
                polys: self.rec_polys.len(),
            });
        }

        let regions = self
            .rec_texts
            .into_iter()
            .zip(self.rec_scores)
            .zip(self.rec_boxes)
            .zip(self.rec_polys)
            .map(|(((text, score), bbox), polygon)| TextRegion {
                text,
                confidence: clamp_confidence(score),
                polygon,
                bbox,
            })
            .collect();

        Ok(regions)
    }
}

/// Engine scores outside [0, 1] (including NaN for "not reported") collapse
/// into the valid range.
fn clamp_confidence(score: f32) -> f32 {
    if score.is_finite() {
        score.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

/// One OCR detection: recognized text plus its detection geometry.
///
/// `bbox` is the axis-aligned `[x_min, y_min, x_max, y_max]` box of
/// `polygon`. Text is kept exactly as recognized; trimming happens in the
/// grouping stage.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TextRegion {
    pub text: String,
    pub confidence: f32,
    pub polygon: Vec<[i32; 2]>,
    pub bbox: [i32; 4],
}

/// One unit of text submitted to the translation backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Chunk(pub String);

impl Chunk {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// A translated chunk, index-aligned with the chunk sequence that produced
/// it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TranslatedChunk {
    pub source: Chunk,
    pub translated: String,
}

/// How sorted regions are merged into translation chunks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GroupingStrategy {
    /// Each non-empty region becomes its own chunk.
    #[default]
    PerSegment,
    /// All non-empty regions join into a single newline-separated chunk.
    Page,
}

impl std::str::FromStr for GroupingStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "per-segment" => Ok(Self::PerSegment),
            "page" => Ok(Self::Page),
            other => Err(format!("unknown grouping strategy '{other}'")),
        }
    }
}
