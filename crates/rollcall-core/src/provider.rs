//! Seams to the external face pipeline.
//!
//! Detection and embedding extraction are owned by third-party models;
//! the kiosk only needs these two calls. Implementations wrap whatever
//! model the front end ships with.

use crate::types::Embedding;
use image::DynamicImage;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("face location failed: {0}")]
    Locate(String),
    #[error("embedding extraction failed: {0}")]
    Embed(String),
}

/// Axis-aligned region of a frame containing a detected face.
#[derive(Debug, Clone, Copy)]
pub struct FaceRegion {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
    pub confidence: f32,
}

impl FaceRegion {
    /// Crop this region out of a frame, clamped to the frame bounds.
    pub fn crop(&self, frame: &DynamicImage) -> DynamicImage {
        let x = self.x.min(frame.width().saturating_sub(1));
        let y = self.y.min(frame.height().saturating_sub(1));
        let w = self.width.min(frame.width() - x).max(1);
        let h = self.height.min(frame.height() - y).max(1);
        frame.crop_imm(x, y, w, h)
    }
}

/// Finds at most one face in a frame. When the underlying detector
/// reports several, implementations return the first.
pub trait FaceLocator {
    fn locate(&mut self, frame: &DynamicImage) -> Result<Option<FaceRegion>, ProviderError>;
}

/// Turns a face crop into a fixed-length embedding vector.
pub trait EmbeddingProvider {
    fn embed(&mut self, face: &DynamicImage) -> Result<Embedding, ProviderError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crop_clamps_to_frame() {
        let frame = DynamicImage::new_rgb8(100, 80);
        let region = FaceRegion {
            x: 90,
            y: 70,
            width: 50,
            height: 50,
            confidence: 0.9,
        };
        let crop = region.crop(&frame);
        assert!(crop.width() <= 10);
        assert!(crop.height() <= 10);
    }

    #[test]
    fn test_crop_inside_frame() {
        let frame = DynamicImage::new_rgb8(100, 80);
        let region = FaceRegion {
            x: 10,
            y: 10,
            width: 40,
            height: 30,
            confidence: 0.9,
        };
        let crop = region.crop(&frame);
        assert_eq!((crop.width(), crop.height()), (40, 30));
    }
}
