use crate::codec::{self, CodecError};
use crate::routes::{analyze_and_annotate, ErrorBody, PipelineError, PredictionResponse};
use crate::server::SharedState;
use axum::extract::multipart::{Multipart, MultipartError};
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use bytes::Bytes;
use std::time::Instant;
use thiserror::Error;
use tracing::instrument;

const ROUTE: &str = "/predict";

#[derive(Error, Debug)]
pub enum PredictError {
    #[error("no image file provided")]
    MissingImageField,
    #[error("invalid multipart request: {0}")]
    Multipart(#[from] MultipartError),
    #[error("could not decode image: {0}")]
    Decode(#[from] CodecError),
    #[error("prediction failed: {0}")]
    Pipeline(#[from] PipelineError),
}

impl IntoResponse for PredictError {
    fn into_response(self) -> Response {
        let status = match &self {
            PredictError::MissingImageField
            | PredictError::Multipart(_)
            | PredictError::Decode(_) => StatusCode::BAD_REQUEST,
            PredictError::Pipeline(_) => StatusCode::INTERNAL_SERVER_ERROR,
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

/// Single-image prediction: multipart upload in, labels plus annotated JPEG
/// out. No persistence side effect on this route.
#[instrument(skip(state, multipart))]
pub async fn predict(
    State(state): State<SharedState>,
    mut multipart: Multipart,
) -> Result<Json<PredictionResponse>, PredictError> {
    state.metrics.record_request(ROUTE);
    let started = Instant::now();

    let mut image_bytes: Option<Bytes> = None;
    while let Some(field) = multipart.next_field().await? {
        if field.name() == Some("image") {
            image_bytes = Some(field.bytes().await?);
        }
    }
    let image_bytes = image_bytes.ok_or(PredictError::MissingImageField)?;

    let image = codec::decode_image(&image_bytes)?;
    let (response, faces) = analyze_and_annotate(&state, &image)?;

    state
        .metrics
        .record_faces_detected(faces.len() as u64, ROUTE);
    state
        .metrics
        .record_prediction_duration(started.elapsed().as_millis() as u64, ROUTE);

    Ok(Json(response))
}
