use crate::{
    error::PredictError, model_service::ModelService, prediction::PredictionResponse,
    server::AppState,
};
use axum::{
    extract::{multipart::MultipartRejection, Multipart, State},
    response::Json,
};
use bytes::Bytes;
use std::time::Instant;
use tracing::instrument;

/// Field name used by the web front-end for the upload.
const FILE_FIELD: &str = "file";

#[instrument(skip(state, multipart))]
pub async fn predict<M: ModelService>(
    State(state): State<AppState<M>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<PredictionResponse>, PredictError> {
    let image_data = read_image_field(multipart?).await?;
    tracing::debug!("Received image of {} bytes", image_data.len());

    let start = Instant::now();
    let probabilities = state.model_service.predict(image_data).await?;
    let response =
        PredictionResponse::from_probabilities(state.service_state.get_labels(), probabilities)?;

    tracing::debug!(
        predicted_class = %response.predicted_class,
        confidence = response.confidence,
        elapsed_ms = start.elapsed().as_millis() as u64,
        "Prediction complete"
    );

    Ok(Json(response))
}

/// First non-empty file field, or the `file` field when the client did not
/// send a filename.
async fn read_image_field(mut multipart: Multipart) -> Result<Bytes, PredictError> {
    while let Some(field) = multipart.next_field().await? {
        let is_file = field.file_name().is_some() || field.name() == Some(FILE_FIELD);
        if !is_file {
            continue;
        }

        let data = field.bytes().await?;
        if !data.is_empty() {
            return Ok(data);
        }
    }

    Err(PredictError::MissingFile)
}
