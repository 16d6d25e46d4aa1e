use crate::detection::FacePrediction;
use image::DynamicImage;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AnalyzeError {
    #[error("face detector failed: {0}")]
    Detector(String),
    #[error("attribute classifier failed: {0}")]
    Classifier(String),
}

/// Detection plus attribute classification over one decoded frame.
///
/// Implementations share read-only model state across requests; a call never
/// mutates the frame it is given and performs no I/O.
pub trait FaceAnalyzer: Send + Sync + 'static {
    fn analyze(&self, image: &DynamicImage) -> Result<Vec<FacePrediction>, AnalyzeError>;
}
