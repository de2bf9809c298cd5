mod error;
mod model_service;
mod ort_service;
mod prediction;
mod routes;
mod server;
mod state;

pub mod config;

pub use error::PredictError;
pub use model_service::ModelService;
pub use ort_service::OrtModelService;
pub use prediction::{ClassProbabilities, PredictionResponse};
pub use server::{build_router, start_server, AppState, HttpServer};
pub use state::ServiceState;
