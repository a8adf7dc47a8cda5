pub mod leads;

use crate::{db::DbPool, repositories::LeadRepository, services::leads::LeadService, storage::PhotoStore};
use std::sync::Arc;

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// Services layer used by the HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub leads: Arc<LeadService>,
}

impl AppServices {
    pub fn new(db_pool: Arc<DbPool>, photos: PhotoStore) -> Self {
        let repository = LeadRepository::new(db_pool);
        Self {
            leads: Arc::new(LeadService::new(repository, photos)),
        }
    }
}
