use axum::{
    extract::{rejection::PathRejection, Multipart, Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json},
};
use bytes::BytesMut;
use tracing::debug;
use utoipa::ToSchema;

use crate::{
    dto::lead::{CreateLeadRequest, LeadResponse, PhotoUrlsResponse},
    errors::ServiceError,
    storage::{PhotoError, PhotoUpload},
    ApiResponse, ApiResult, AppState,
};

/// Multipart field carrying the photo files
pub const PHOTOS_FIELD: &str = "photos";

/// Shape of the multipart form accepted by `POST /leads`
#[derive(Debug, ToSchema)]
#[schema(rename_all = "camelCase")]
pub struct CreateLeadForm {
    pub company: Option<String>,
    pub contact_person: Option<String>,
    pub email: Option<String>,
    /// Up to five .png, .jpg or .jpeg images
    #[schema(value_type = Vec<String>)]
    pub photos: Vec<Vec<u8>>,
}

#[utoipa::path(
    get,
    path = "/leads",
    responses(
        (status = 200, description = "All leads, newest first", body = ApiResponse<Vec<LeadResponse>>),
        (status = 500, description = "Leads could not be fetched", body = crate::errors::ErrorResponse)
    ),
    tag = "leads"
)]
pub async fn list_leads(State(state): State<AppState>) -> ApiResult<Vec<LeadResponse>> {
    let leads = state.services.leads.list_leads().await?;
    Ok(Json(ApiResponse::success(leads)))
}

#[utoipa::path(
    get,
    path = "/leads/:id/photos",
    params(
        ("id" = i32, Path, description = "Lead ID")
    ),
    responses(
        (status = 200, description = "Photo URLs in upload order", body = ApiResponse<PhotoUrlsResponse>),
        (status = 404, description = "Lead not found", body = crate::errors::ErrorResponse)
    ),
    tag = "leads"
)]
pub async fn get_lead_photos(
    State(state): State<AppState>,
    id: Result<Path<i32>, PathRejection>,
) -> ApiResult<PhotoUrlsResponse> {
    let Path(id) = id?;
    let photo_urls = state.services.leads.photo_urls(id).await?;
    Ok(Json(ApiResponse::success(PhotoUrlsResponse { photo_urls })))
}

#[utoipa::path(
    post,
    path = "/leads",
    request_body(content = CreateLeadForm, content_type = "multipart/form-data"),
    responses(
        (status = 201, description = "Lead created", body = ApiResponse<LeadResponse>),
        (status = 400, description = "Invalid submission", body = crate::errors::ErrorResponse),
        (status = 500, description = "Lead could not be stored", body = crate::errors::ErrorResponse)
    ),
    tag = "leads"
)]
pub async fn create_lead(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<ApiResponse<LeadResponse>>), ServiceError> {
    let store = state.services.leads.photo_store();
    let policy = store.policy();

    let mut request = CreateLeadRequest::default();
    let mut photos: Vec<PhotoUpload> = Vec::new();

    while let Some(mut field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "company" => request.company = Some(field.text().await?),
            "contactPerson" => request.contact_person = Some(field.text().await?),
            "email" => request.email = Some(field.text().await?),
            PHOTOS_FIELD => {
                // Browsers send an empty, unnamed part when no file was chosen
                let file_name = field.file_name().unwrap_or_default().to_string();
                if file_name.is_empty() {
                    while field.chunk().await?.is_some() {}
                    continue;
                }

                store.check_count(photos.len() + 1)?;

                let content_type = field.content_type().map(str::to_string);
                let mut data = BytesMut::new();
                while let Some(chunk) = field.chunk().await? {
                    if data.len() + chunk.len() > policy.max_bytes {
                        return Err(PhotoError::TooLarge {
                            file_name,
                            max_bytes: policy.max_bytes,
                        }
                        .into());
                    }
                    data.extend_from_slice(&chunk);
                }

                debug!(file_name = %file_name, size = data.len(), "received photo");
                photos.push(PhotoUpload::new(file_name, content_type, data.freeze()));
            }
            other => {
                return Err(ServiceError::ValidationError(format!(
                    "Unexpected form field '{}'",
                    other
                )));
            }
        }
    }

    let lead = state.services.leads.create_lead(request, photos).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(lead))))
}

#[utoipa::path(
    get,
    path = "/uploads/:filename",
    params(
        ("filename" = String, Path, description = "Stored photo filename")
    ),
    responses(
        (status = 200, description = "Raw image bytes with an image/png or image/jpeg content type"),
        (status = 404, description = "Photo not found", body = crate::errors::ErrorResponse)
    ),
    tag = "uploads"
)]
pub async fn serve_upload(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> Result<impl IntoResponse, ServiceError> {
    let (bytes, content_type) = state.services.leads.photo(&filename).await?;
    Ok(([(header::CONTENT_TYPE, content_type)], bytes))
}
