use crate::{
    annotate::Annotator, config::ServerConfig, face_analyzer::FaceAnalyzer,
    recorder::SightingRecorder, routes::api_routes, telemetry::Metrics,
};
use axum::Router;
use axum_otel_metrics::HttpMetricsLayerBuilder;
use std::sync::Arc;
use tokio::{net::TcpListener, sync::broadcast::Receiver, task::JoinHandle};
use tower_http::cors::CorsLayer;

#[derive(Clone)]
pub struct SharedState {
    pub analyzer: Arc<dyn FaceAnalyzer>,
    pub annotator: Arc<Annotator>,
    pub recorder: Arc<dyn SightingRecorder>,
    pub metrics: Arc<Metrics>,
}

pub struct HttpServer {
    router: Router,
    listener: TcpListener,
}

impl HttpServer {
    pub async fn new(state: SharedState, server_config: &ServerConfig) -> anyhow::Result<Self> {
        let addr = server_config.get_address();

        let metrics_layer = HttpMetricsLayerBuilder::new().build();

        // The collector script runs on client sites, so cross-origin posts
        // must be allowed.
        let router = Router::new()
            .merge(api_routes())
            .with_state(state)
            .layer(metrics_layer)
            .layer(CorsLayer::permissive());

        let listener = TcpListener::bind(addr).await?;

        Ok(Self { router, listener })
    }

    pub async fn run(
        self,
        shutdown_rx: Receiver<()>,
    ) -> anyhow::Result<JoinHandle<anyhow::Result<()>>> {
        tracing::info!("Starting app on {}", &self.listener.local_addr()?);

        let listener = self.listener;
        let router = self.router;
        let server_handle = tokio::spawn({
            let mut shutdown_rx = shutdown_rx.resubscribe();
            async move {
                let server = axum::serve(listener, router);
                server
                    .with_graceful_shutdown(async move {
                        shutdown_rx.recv().await.ok();
                    })
                    .await?;
                Ok(())
            }
        });

        Ok(server_handle)
    }
}
