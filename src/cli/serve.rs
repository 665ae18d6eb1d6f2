use std::path::Path;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use crate::api::{self, AppState};
use crate::cli::commands::ServeArgs;
use crate::config::{parse_config, VishnoraConfig, DEFAULT_DB_PATH};
use crate::db::Database;
use crate::errors::VishnoraError;
use crate::models::campaign::CampaignStatus;
use crate::pipeline::{CampaignRunner, RunnerSettings};
use crate::queue::{ActiveRuns, JobSource, MemoryJobQueue, WorkerPool};
use tracing::{info, warn};

pub async fn handle_serve(args: ServeArgs) -> Result<(), VishnoraError> {
    let config = match &args.config {
        Some(path) => parse_config(Path::new(path)).await?,
        None => VishnoraConfig::default(),
    };
    let server = config.server.clone().unwrap_or_default();
    let host = args.host.or(server.host).unwrap_or_else(|| "0.0.0.0".to_string());
    let port = args.port.or(server.port).unwrap_or(8080);
    let db_path = args.db
        .or_else(|| config.database_path().map(str::to_string))
        .unwrap_or_else(|| DEFAULT_DB_PATH.to_string());
    let workers = args.workers.unwrap_or_else(|| config.worker_concurrency());
    if workers == 0 {
        return Err(VishnoraError::Config("--workers must be at least 1".into()));
    }

    let db = Database::new(&db_path)?;
    let queue = Arc::new(MemoryJobQueue::new());

    // The queue lives in memory; campaigns left queued by a previous process
    // would otherwise never run.
    let pending = db.campaign_ids_with_status(CampaignStatus::Queued)?;
    if !pending.is_empty() {
        info!(count = pending.len(), "Re-enqueuing campaigns left queued");
    }
    for id in &pending {
        queue.enqueue(id).await;
    }
    let orphaned = db.campaign_ids_with_status(CampaignStatus::Running)?;
    if !orphaned.is_empty() {
        warn!(count = orphaned.len(), "Campaigns marked running from a previous process; cancel them to close them out");
    }

    let active = ActiveRuns::new();
    let runner = Arc::new(CampaignRunner::new(
        Arc::new(db.clone()),
        Arc::new(db.clone()),
        RunnerSettings::from_config(&config),
    )?);
    let shutdown = CancellationToken::new();
    let pool = WorkerPool::new(queue.clone(), runner, active.clone(), workers);
    let pool_task = tokio::spawn(pool.run(shutdown.clone()));

    let app = api::build_router(AppState::new(db, queue.clone(), active));
    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(addr = %addr, db = %db_path, workers, "Listening");

    let signal = {
        let shutdown = shutdown.clone();
        async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(error = %e, "Failed to listen for shutdown signal");
            }
            info!("Shutdown requested");
            shutdown.cancel();
        }
    };
    axum::serve(listener, app)
        .with_graceful_shutdown(signal)
        .await
        .map_err(|e| VishnoraError::Internal(format!("Server error: {}", e)))?;

    queue.close();
    shutdown.cancel();
    pool_task
        .await
        .map_err(|e| VishnoraError::Internal(format!("Worker pool task failed: {}", e)))?;
    Ok(())
}
