mod labels;
mod predict;

use crate::{model_service::ModelService, server::AppState};
use axum::{
    extract::State,
    response::Json,
    routing::{get, post},
    Router,
};
use serde::Serialize;

pub fn api_routes<M: ModelService>() -> Router<AppState<M>> {
    Router::new()
        .route("/predict", post(predict::predict::<M>))
        .route("/labels", get(labels::class_labels::<M>))
        .route("/health", get(health::<M>))
}

/// Liveness plus the size of the label table requests are mapped onto.
#[derive(Serialize)]
struct Health {
    status: &'static str,
    num_classes: usize,
}

async fn health<M: ModelService>(State(state): State<AppState<M>>) -> Json<Health> {
    Json(Health {
        status: "ok",
        num_classes: state.service_state.get_labels().len(),
    })
}
