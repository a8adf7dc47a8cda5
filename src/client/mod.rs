//! Typed HTTP client for the lead API.
//!
//! [`LeadApi`] is the seam the UI state machines and the CLI talk through;
//! [`HttpLeadClient`] implements it over `reqwest`.

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::de::DeserializeOwned;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, instrument};

use crate::{
    dto::lead::{CreateLeadRequest, LeadResponse, PhotoUrlsResponse},
    errors::ErrorResponse,
    handlers::leads::PHOTOS_FIELD,
    storage::PhotoUpload,
    ApiResponse,
};

#[derive(Debug, Error)]
pub enum ClientError {
    /// The request never produced a usable response
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The server answered with an error body
    #[error("{message} (HTTP {status})")]
    Api { status: u16, message: String },
}

impl ClientError {
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Transport(e) => e.status().map(|s| s.as_u16()),
            ClientError::Api { status, .. } => Some(*status),
        }
    }
}

/// Everything a capture form sends in one submission
#[derive(Debug, Clone, Default)]
pub struct LeadSubmission {
    pub fields: CreateLeadRequest,
    pub photos: Vec<PhotoUpload>,
}

#[async_trait]
pub trait LeadApi: Send + Sync {
    async fn list_leads(&self) -> Result<Vec<LeadResponse>, ClientError>;

    async fn photo_urls(&self, id: i32) -> Result<Vec<String>, ClientError>;

    async fn create_lead(&self, submission: LeadSubmission) -> Result<LeadResponse, ClientError>;
}

#[derive(Clone)]
pub struct HttpLeadClient {
    client: reqwest::Client,
    base_url: String,
}

impl HttpLeadClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self, ClientError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("lead-capture/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Resolves a path or server-relative URL against the base URL
    pub fn url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            path.to_string()
        } else if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }

    /// Downloads a stored photo by the URL returned from [`LeadApi::photo_urls`]
    #[instrument(skip(self))]
    pub async fn fetch_photo(&self, url: &str) -> Result<Vec<u8>, ClientError> {
        let response = self.client.get(self.url(url)).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(api_error(response).await);
        }
        Ok(response.bytes().await?.to_vec())
    }
}

#[async_trait]
impl LeadApi for HttpLeadClient {
    #[instrument(skip(self))]
    async fn list_leads(&self) -> Result<Vec<LeadResponse>, ClientError> {
        let response = self.client.get(self.url("/leads")).send().await?;
        decode(response).await
    }

    #[instrument(skip(self))]
    async fn photo_urls(&self, id: i32) -> Result<Vec<String>, ClientError> {
        let response = self
            .client
            .get(self.url(&format!("/leads/{}/photos", id)))
            .send()
            .await?;
        let body: PhotoUrlsResponse = decode(response).await?;
        Ok(body.photo_urls)
    }

    #[instrument(skip(self, submission), fields(photos = submission.photos.len()))]
    async fn create_lead(&self, submission: LeadSubmission) -> Result<LeadResponse, ClientError> {
        let mut form = Form::new();
        let fields = submission.fields;
        for (name, value) in [
            ("company", fields.company),
            ("contactPerson", fields.contact_person),
            ("email", fields.email),
        ] {
            if let Some(value) = value {
                form = form.text(name, value);
            }
        }

        for photo in submission.photos {
            let mut part = Part::bytes(photo.data.to_vec()).file_name(photo.file_name);
            if let Some(content_type) = photo.content_type {
                part = part.mime_str(&content_type)?;
            }
            form = form.part(PHOTOS_FIELD, part);
        }

        let response = self
            .client
            .post(self.url("/leads"))
            .multipart(form)
            .send()
            .await?;
        decode(response).await
    }
}

async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ClientError> {
    let status = response.status();
    if !status.is_success() {
        return Err(api_error(response).await);
    }

    let body: ApiResponse<T> = response.json().await?;
    body.data.ok_or_else(|| ClientError::Api {
        status: status.as_u16(),
        message: body
            .message
            .unwrap_or_else(|| "response carried no data".to_string()),
    })
}

async fn api_error(response: reqwest::Response) -> ClientError {
    let status = response.status();
    let message = match response.json::<ErrorResponse>().await {
        Ok(body) => body.message,
        Err(e) => {
            debug!(error = %e, "error response had no JSON body");
            status
                .canonical_reason()
                .unwrap_or("request failed")
                .to_string()
        }
    };

    ClientError::Api {
        status: status.as_u16(),
        message,
    }
}
