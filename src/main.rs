use std::{net::SocketAddr, sync::Arc};

use tokio::signal;
use tracing::{error, info};

use lead_capture as api;
use lead_capture::storage::{PhotoPolicy, PhotoStore};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cfg = api::config::load_config()?;
    api::config::init_tracing(cfg.log_level(), cfg.log_json);
    info!(
        environment = %cfg.environment,
        upload_dir = %cfg.upload_dir.display(),
        "Configuration loaded"
    );

    // Init DB
    let db_pool = api::db::establish_connection_from_app_config(&cfg).await?;
    let db_arc = Arc::new(db_pool);
    if cfg.auto_migrate {
        api::repositories::LeadRepository::new(db_arc.clone())
            .ensure_schema()
            .await
            .map_err(|e| {
                error!("Failed running migrations: {}", e);
                e
            })?;
    }

    // Photo storage
    let photos = PhotoStore::open(
        cfg.upload_dir.clone(),
        cfg.uploads_url_prefix.clone(),
        PhotoPolicy {
            max_bytes: cfg.max_photo_bytes,
            max_count: cfg.max_photos,
        },
    )
    .await?;

    let services = api::handlers::AppServices::new(db_arc.clone(), photos);

    let app_state = api::AppState {
        db: db_arc,
        config: cfg.clone(),
        services,
    };

    let app = api::build_router(app_state);

    // Bind and serve
    let ip: std::net::IpAddr = cfg.host.parse()?;
    let addr = SocketAddr::new(ip, cfg.port);
    info!("lead-capture listening on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("lead-capture stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
