use metrics::counter;
use tracing::{error, info, instrument, warn};
use validator::Validate;

use crate::{
    dto::lead::{CreateLeadRequest, LeadResponse},
    errors::ServiceError,
    repositories::{LeadRepository, NewLead},
    storage::{content_type_for, PhotoStore, PhotoUpload},
};

/// Lead capture and retrieval on top of the repository and photo store
#[derive(Clone)]
pub struct LeadService {
    repository: LeadRepository,
    photos: PhotoStore,
}

impl LeadService {
    pub fn new(repository: LeadRepository, photos: PhotoStore) -> Self {
        Self { repository, photos }
    }

    pub fn photo_store(&self) -> &PhotoStore {
        &self.photos
    }

    /// Lists every lead, newest first
    #[instrument(skip(self))]
    pub async fn list_leads(&self) -> Result<Vec<LeadResponse>, ServiceError> {
        let leads = self.repository.list_all().await.map_err(|e| {
            error!("Failed to fetch leads: {}", e);
            e
        })?;
        Ok(leads.into_iter().map(LeadResponse::from).collect())
    }

    /// Retrieval URLs for the photos of one lead, in upload order
    #[instrument(skip(self))]
    pub async fn photo_urls(&self, id: i32) -> Result<Vec<String>, ServiceError> {
        let filenames = self.repository.get_photo_filenames(id).await?;
        Ok(filenames
            .iter()
            .map(|name| self.photos.url_for(name))
            .collect())
    }

    /// Stores the photos and inserts the lead as one unit.
    ///
    /// A rejected photo leaves nothing behind. When the insert fails the
    /// photos written for this submission are removed again.
    #[instrument(skip(self, request, photos), fields(photos = photos.len()))]
    pub async fn create_lead(
        &self,
        request: CreateLeadRequest,
        photos: Vec<PhotoUpload>,
    ) -> Result<LeadResponse, ServiceError> {
        request.validate()?;
        let request = request.normalized();

        let stored = self.photos.accept_all(&photos).await?;

        let new_lead = NewLead {
            company: request.company,
            contact_person: request.contact_person,
            email: request.email,
            photo_paths: stored.clone(),
        };

        match self.repository.insert(new_lead).await {
            Ok(model) => {
                info!(lead_id = model.id, photos = stored.len(), "lead captured");
                Ok(LeadResponse::from(model))
            }
            Err(e) => {
                warn!(error = %e, "lead insert failed; discarding stored photos");
                counter!("lead_capture.leads.failed", 1);
                self.photos.discard(&stored).await;
                Err(e)
            }
        }
    }

    /// Bytes and content type of a stored photo
    #[instrument(skip(self))]
    pub async fn photo(&self, filename: &str) -> Result<(Vec<u8>, &'static str), ServiceError> {
        let bytes = self.photos.serve(filename).await?;
        Ok((bytes, content_type_for(filename)))
    }
}
