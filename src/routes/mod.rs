mod health;
mod metrics;
mod predict;
mod predict_frame;

use crate::codec::{self, CodecError};
use crate::detection::FacePrediction;
use crate::face_analyzer::AnalyzeError;
use crate::server::SharedState;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use image::DynamicImage;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tower_http::limit::RequestBodyLimitLayer;

const MAX_BODY_BYTES: usize = 25 * 1024 * 1024; /* 25mb */

pub fn api_routes() -> Router<SharedState> {
    Router::new()
        .route("/health", get(health::healthcheck))
        .route("/metrics", get(metrics::metrics_handler))
        .route("/predict", post(predict::predict))
        .route("/predict_frame", post(predict_frame::predict_frame))
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
}

/// Response body shared by both prediction routes.
#[derive(Debug, Serialize, Deserialize)]
pub struct PredictionResponse {
    pub predictions: Vec<String>,
    pub annotated_image: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    Analyze(#[from] AnalyzeError),
    #[error("could not encode annotated image: {0}")]
    Encode(#[from] CodecError),
}

/// Runs the detection-and-classification pipeline over a decoded frame and
/// builds the response body. The caller's image is only ever copied.
pub(crate) fn analyze_and_annotate(
    state: &SharedState,
    image: &DynamicImage,
) -> Result<(PredictionResponse, Vec<FacePrediction>), PipelineError> {
    let faces = state.analyzer.analyze(image)?;

    let mut annotated = image.to_rgb8();
    state.annotator.annotate(&mut annotated, &faces);
    let annotated_image = codec::encode_jpeg_data_url(&DynamicImage::ImageRgb8(annotated))?;

    let predictions = faces.iter().map(FacePrediction::label).collect();

    Ok((
        PredictionResponse {
            predictions,
            annotated_image,
        },
        faces,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::annotate::Annotator;
    use crate::face_analyzer::FaceAnalyzer;
    use crate::labels::{AgeBracket, Gender};
    use crate::recorder::{RecorderError, SightingRecorder};
    use crate::telemetry::Metrics;
    use async_trait::async_trait;
    use image::RgbImage;
    use std::sync::Arc;

    struct EmptyAnalyzer;

    impl FaceAnalyzer for EmptyAnalyzer {
        fn analyze(&self, _image: &DynamicImage) -> Result<Vec<FacePrediction>, AnalyzeError> {
            Ok(Vec::new())
        }
    }

    struct NullRecorder;

    #[async_trait]
    impl SightingRecorder for NullRecorder {
        async fn record(
            &self,
            _gender: Gender,
            _age: AgeBracket,
            _client_id: &str,
        ) -> Result<(), RecorderError> {
            Ok(())
        }
    }

    fn empty_state() -> SharedState {
        SharedState {
            analyzer: Arc::new(EmptyAnalyzer),
            annotator: Arc::new(Annotator::without_font()),
            recorder: Arc::new(NullRecorder),
            metrics: Arc::new(Metrics::new()),
        }
    }

    fn test_image() -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_pixel(80, 60, image::Rgb([120, 130, 140])))
    }

    #[test]
    fn test_zero_faces_is_a_clean_reencode() {
        let image = test_image();
        let (response, faces) = analyze_and_annotate(&empty_state(), &image).unwrap();

        assert!(faces.is_empty());
        assert!(response.predictions.is_empty());
        // No faces means no drawing: byte-for-byte the plain re-encode.
        assert_eq!(
            response.annotated_image,
            codec::encode_jpeg_data_url(&image).unwrap()
        );
    }

    #[test]
    fn test_response_wire_shape() {
        let response = PredictionResponse {
            predictions: vec!["Male, (25-32)".into()],
            annotated_image: "data:image/jpeg;base64,abc".into(),
        };
        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value["predictions"][0], "Male, (25-32)");
        assert_eq!(value["annotated_image"], "data:image/jpeg;base64,abc");

        let error = serde_json::to_value(ErrorBody {
            error: "no image file provided".into(),
        })
        .unwrap();
        assert_eq!(error["error"], "no image file provided");
    }

    #[test]
    fn test_identical_input_yields_identical_output() {
        let state = empty_state();
        let image = test_image();

        let (first, _) = analyze_and_annotate(&state, &image).unwrap();
        let (second, _) = analyze_and_annotate(&state, &image).unwrap();

        assert_eq!(first.predictions, second.predictions);
        assert_eq!(first.annotated_image, second.annotated_image);
    }
}
