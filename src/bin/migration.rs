use std::sync::Arc;

use lead_capture::{config, db, repositories::LeadRepository};
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cfg = config::load_config()?;
    config::init_tracing(cfg.log_level(), cfg.log_json);

    info!("Starting database migration");
    let pool = db::establish_connection_from_app_config(&cfg).await?;
    LeadRepository::new(Arc::new(pool)).ensure_schema().await?;
    info!("Migration completed successfully");

    Ok(())
}
