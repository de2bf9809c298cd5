use crate::{
    config::{Config, ServerConfig},
    model_service::ModelService,
    ort_service::OrtModelService,
    routes::api_routes,
    state::ServiceState,
};
use axum::{
    extract::DefaultBodyLimit,
    http::{header::InvalidHeaderValue, HeaderValue},
    Router,
};
use std::sync::Arc;
use tokio::{net::TcpListener, signal};
use tower_http::{
    cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer},
    trace::TraceLayer,
};

/// Handles shared by every request. Both are read-only after startup.
pub struct AppState<M: ModelService> {
    pub model_service: Arc<M>,
    pub service_state: Arc<ServiceState>,
}

impl<M: ModelService> Clone for AppState<M> {
    fn clone(&self) -> Self {
        Self {
            model_service: self.model_service.clone(),
            service_state: self.service_state.clone(),
        }
    }
}

fn cors_layer(server_config: &ServerConfig) -> Result<CorsLayer, InvalidHeaderValue> {
    let origins = server_config
        .cors_origins
        .iter()
        .map(|origin| origin.parse::<HeaderValue>())
        .collect::<Result<Vec<_>, _>>()?;

    Ok(CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true))
}

pub fn build_router<M: ModelService>(
    model_service: M,
    service_state: ServiceState,
    server_config: &ServerConfig,
) -> Result<Router, InvalidHeaderValue> {
    let app_state = AppState {
        model_service: Arc::new(model_service),
        service_state: Arc::new(service_state),
    };

    let router = Router::new()
        .merge(api_routes())
        .with_state(app_state)
        .layer(DefaultBodyLimit::max(server_config.max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(server_config)?);

    Ok(router)
}

pub struct HttpServer {
    router: Router,
    listener: TcpListener,
}

impl HttpServer {
    pub async fn new(router: Router, server_config: &ServerConfig) -> std::io::Result<Self> {
        let listener = TcpListener::bind(server_config.get_address()).await?;

        Ok(Self { router, listener })
    }

    pub async fn run(self) -> Result<(), Box<dyn std::error::Error>> {
        tracing::info!("Inference service listening on {}", self.listener.local_addr()?);

        let shutdown = async {
            let received = shutdown_signal().await;
            tracing::info!(signal = received, "Draining in-flight requests before exit");
        };

        axum::serve(self.listener, self.router)
            .with_graceful_shutdown(shutdown)
            .await?;

        Ok(())
    }
}

pub async fn start_server(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    let ort_model_service = OrtModelService::new(&config.model)?;
    let service_state = ServiceState::new(&config.labels, ort_model_service.embedded_labels()?)?;

    let router = build_router(ort_model_service, service_state, &config.server)?;
    let http_server = HttpServer::new(router, &config.server).await?;

    http_server.run().await?;

    Ok(())
}

/// Resolves with the name of the first shutdown signal received. A handler
/// that fails to install is logged and never fires.
async fn shutdown_signal() -> &'static str {
    let interrupt = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Could not listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Could not listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    tokio::select! {
        _ = interrupt => "SIGINT",
        _ = terminate => "SIGTERM",
    }
}
