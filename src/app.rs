use crate::annotate::Annotator;
use crate::config::Config;
use crate::face_analyzer::FaceAnalyzer;
use crate::ort_analyzer::OrtFaceAnalyzer;
use crate::recorder::{FirestoreRecorder, SightingRecorder};
use crate::server::{HttpServer, SharedState};
use crate::telemetry::Metrics;

use std::{error::Error, sync::Arc};
use tokio::{signal, sync::broadcast};

pub async fn start_app(config: Config) -> Result<(), Box<dyn Error>> {
    let analyzer: Arc<dyn FaceAnalyzer> = match OrtFaceAnalyzer::new(&config.models) {
        Ok(analyzer) => Arc::new(analyzer),
        Err(e) => {
            tracing::error!("Failed to load model bank: {}", e);
            return Err(e);
        }
    };

    let annotator = match Annotator::from_font_file(&config.annotation.font_file) {
        Ok(annotator) => Arc::new(annotator),
        Err(e) => {
            tracing::error!("Failed to load annotation font: {}", e);
            return Err(Box::new(e));
        }
    };

    let recorder: Arc<dyn SightingRecorder> = match FirestoreRecorder::new(&config.firestore).await
    {
        Ok(recorder) => Arc::new(recorder),
        Err(e) => {
            tracing::error!("Failed to initialize record store: {}", e);
            return Err(Box::new(e));
        }
    };

    let state = SharedState {
        analyzer,
        annotator,
        recorder,
        metrics: Arc::new(Metrics::new()),
    };

    let server = HttpServer::new(state, &config.server).await?;

    let (shutdown_tx, _) = broadcast::channel(1);
    let server_handle = server.run(shutdown_tx.subscribe()).await?;

    shutdown_signal().await;
    tracing::info!("Shutdown signal received, starting graceful shutdown.");

    let _ = shutdown_tx.send(());
    let _ = server_handle.await;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
