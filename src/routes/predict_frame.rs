use crate::codec::{self, CodecError};
use crate::routes::{analyze_and_annotate, ErrorBody, PipelineError, PredictionResponse};
use crate::server::SharedState;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use std::time::Instant;
use thiserror::Error;
use tracing::instrument;

const ROUTE: &str = "/predict_frame";

#[derive(Debug, Deserialize)]
pub struct FrameRequest {
    pub image_data: Option<String>,
    pub client_id: Option<String>,
}

#[derive(Error, Debug)]
pub enum PredictFrameError {
    #[error("no image data provided")]
    MissingImageData,
    #[error("client_id is required")]
    MissingClientId,
    #[error("invalid base64 data: {0}")]
    InvalidPayload(CodecError),
    #[error("could not decode image data: {0}")]
    Decode(CodecError),
    #[error("prediction failed: {0}")]
    Pipeline(#[from] PipelineError),
}

impl IntoResponse for PredictFrameError {
    fn into_response(self) -> Response {
        let status = match &self {
            PredictFrameError::MissingImageData
            | PredictFrameError::MissingClientId
            | PredictFrameError::InvalidPayload(_)
            | PredictFrameError::Decode(_) => StatusCode::BAD_REQUEST,
            PredictFrameError::Pipeline(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (
            status,
            Json(ErrorBody {
                error: self.to_string(),
            }),
        )
            .into_response()
    }
}

/// Live-frame prediction: a data-URL frame posted by the embedded collector.
/// When at least one face is accepted, the first label is persisted for the
/// client; the write never delays or alters the response.
#[instrument(skip(state, request))]
pub async fn predict_frame(
    State(state): State<SharedState>,
    Json(request): Json<FrameRequest>,
) -> Result<Json<PredictionResponse>, PredictFrameError> {
    state.metrics.record_request(ROUTE);
    let started = Instant::now();

    let image_data = request
        .image_data
        .ok_or(PredictFrameError::MissingImageData)?;
    let client_id = request
        .client_id
        .filter(|id| !id.is_empty())
        .ok_or(PredictFrameError::MissingClientId)?;

    let image_bytes =
        codec::decode_data_url(&image_data).map_err(PredictFrameError::InvalidPayload)?;
    let image = codec::decode_image(&image_bytes).map_err(PredictFrameError::Decode)?;

    let (response, faces) = analyze_and_annotate(&state, &image)?;

    if let Some(first) = faces.first() {
        let recorder = state.recorder.clone();
        let metrics = state.metrics.clone();
        let gender = first.gender;
        let age = first.age;
        tokio::spawn(async move {
            match recorder.record(gender, age, &client_id).await {
                Ok(()) => metrics.record_sighting(),
                Err(e) => {
                    tracing::error!(client_id = %client_id, "Failed to record sighting: {}", e);
                }
            }
        });
    }

    state
        .metrics
        .record_faces_detected(faces.len() as u64, ROUTE);
    state
        .metrics
        .record_prediction_duration(started.elapsed().as_millis() as u64, ROUTE);

    Ok(Json(response))
}
