use metrics::counter;
use sea_orm::{ActiveModelTrait, DatabaseConnection, EntityTrait, QueryOrder, Set};
use std::sync::Arc;
use tracing::{debug, instrument};

use crate::entities::lead::{
    ActiveModel as LeadActiveModel, Column, Entity as Lead, Model as LeadModel, PhotoPaths,
};
use crate::errors::ServiceError;
use crate::repositories::Repository;

use super::BaseRepository;

/// Values for a lead about to be inserted
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewLead {
    pub company: Option<String>,
    pub contact_person: Option<String>,
    pub email: Option<String>,
    pub photo_paths: Vec<String>,
}

/// Repository for the `leads` table
#[derive(Debug, Clone)]
pub struct LeadRepository {
    base: BaseRepository,
}

impl LeadRepository {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self {
            base: BaseRepository::new(db),
        }
    }

    /// Creates the leads table if it is missing. Safe to call on every start.
    pub async fn ensure_schema(&self) -> Result<(), ServiceError> {
        crate::db::run_migrations(self.base.get_db()).await
    }

    /// Inserts a lead and returns the stored row with its id and timestamp
    #[instrument(skip(self, lead), fields(photos = lead.photo_paths.len()))]
    pub async fn insert(&self, lead: NewLead) -> Result<LeadModel, ServiceError> {
        let model = LeadActiveModel {
            company: Set(lead.company),
            contact_person: Set(lead.contact_person),
            email: Set(lead.email),
            photo_paths: Set(PhotoPaths(lead.photo_paths)),
            ..Default::default()
        }
        .insert(self.base.get_db())
        .await?;

        counter!("lead_capture.leads.created", 1);
        debug!(lead_id = model.id, "lead inserted");
        Ok(model)
    }

    /// Every lead, newest first
    pub async fn list_all(&self) -> Result<Vec<LeadModel>, ServiceError> {
        Lead::find()
            .order_by_desc(Column::CreatedAt)
            .order_by_desc(Column::Id)
            .all(self.base.get_db())
            .await
            .map_err(ServiceError::DatabaseError)
    }

    /// Stored photo filenames of one lead, in upload order
    pub async fn get_photo_filenames(&self, id: i32) -> Result<Vec<String>, ServiceError> {
        Lead::find_by_id(id)
            .one(self.base.get_db())
            .await?
            .map(|lead| lead.photo_paths.into_inner())
            .ok_or_else(|| ServiceError::NotFound(format!("Lead {} not found", id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    async fn repository() -> LeadRepository {
        let pool = crate::db::establish_connection_with_config(&crate::db::DbConfig {
            url: "sqlite::memory:".to_string(),
            max_connections: 1,
            ..Default::default()
        })
        .await
        .expect("in-memory sqlite");
        let repo = LeadRepository::new(Arc::new(pool));
        repo.ensure_schema().await.expect("schema");
        repo
    }

    #[tokio::test]
    async fn insert_without_fields_yields_null_row() {
        let repo = repository().await;

        let lead = repo.insert(NewLead::default()).await.unwrap();

        assert!(lead.id > 0);
        assert_eq!(lead.company, None);
        assert_eq!(lead.contact_person, None);
        assert_eq!(lead.email, None);
        assert!(lead.photo_paths.0.is_empty());
    }

    #[tokio::test]
    async fn ensure_schema_twice_keeps_rows() {
        let repo = repository().await;
        repo.insert(NewLead {
            company: Some("Tecnarit".into()),
            ..Default::default()
        })
        .await
        .unwrap();

        repo.ensure_schema().await.unwrap();

        assert_eq!(repo.list_all().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn list_all_is_newest_first() {
        let repo = repository().await;
        let a = repo
            .insert(NewLead {
                company: Some("A".into()),
                ..Default::default()
            })
            .await
            .unwrap();
        let b = repo
            .insert(NewLead {
                company: Some("B".into()),
                ..Default::default()
            })
            .await
            .unwrap();

        let ids: Vec<i32> = repo.list_all().await.unwrap().iter().map(|l| l.id).collect();
        assert_eq!(ids, vec![b.id, a.id]);
    }

    #[tokio::test]
    async fn photo_filenames_keep_order_and_unknown_id_is_not_found() {
        let repo = repository().await;
        let lead = repo
            .insert(NewLead {
                photo_paths: vec!["lead-2.png".into(), "lead-1.jpg".into()],
                ..Default::default()
            })
            .await
            .unwrap();

        assert_eq!(
            repo.get_photo_filenames(lead.id).await.unwrap(),
            vec!["lead-2.png".to_string(), "lead-1.jpg".to_string()]
        );
        assert_matches!(
            repo.get_photo_filenames(lead.id + 100).await,
            Err(ServiceError::NotFound(_))
        );
    }
}
