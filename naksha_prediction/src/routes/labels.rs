use crate::{model_service::ModelService, server::AppState};
use axum::{extract::State, response::Json};
use naksha_core::LabelTable;
use serde::Serialize;

#[derive(Serialize)]
pub struct ClassLabels {
    class_labels: LabelTable,
}

pub async fn class_labels<M: ModelService>(State(state): State<AppState<M>>) -> Json<ClassLabels> {
    Json(ClassLabels {
        class_labels: state.service_state.get_labels().clone(),
    })
}
