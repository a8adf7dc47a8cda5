use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{info, warn};

use crate::{
    client::{ClientError, LeadApi, LeadSubmission},
    dto::lead::{CreateLeadRequest, LeadResponse},
    storage::{PhotoPolicy, PhotoUpload},
};

/// How long the confirmation stays visible after a successful submit
pub const CONFIRMATION_TTL: Duration = Duration::from_secs(3);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormError {
    #[error("'{0}' is not a valid email address")]
    InvalidEmail(String),

    #[error("at most {max} photos may be attached")]
    TooManyPhotos { max: usize },

    #[error("{file_name}: only .png, .jpg and .jpeg images are allowed")]
    UnsupportedPhoto { file_name: String },

    #[error("a submission is already in progress")]
    SubmissionInFlight,
}

/// What the form shows below the submit control
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Feedback {
    None,
    Confirmed { lead_id: i32 },
    Failed(String),
}

/// State of the lead capture form.
///
/// A submit is split into [`begin_submit`](Self::begin_submit), which hands
/// out the payload, and [`complete_submit`](Self::complete_submit), which
/// takes the outcome. In between the form refuses a second submit.
#[derive(Debug, Clone)]
pub struct CaptureForm {
    pub company: String,
    pub contact_person: String,
    pub email: String,
    photos: Vec<PhotoUpload>,
    max_photos: usize,
    in_flight: bool,
    feedback: Feedback,
    confirmed_until: Option<Instant>,
}

impl Default for CaptureForm {
    fn default() -> Self {
        Self::new(PhotoPolicy::default().max_count)
    }
}

impl CaptureForm {
    pub fn new(max_photos: usize) -> Self {
        Self {
            company: String::new(),
            contact_person: String::new(),
            email: String::new(),
            photos: Vec::new(),
            max_photos,
            in_flight: false,
            feedback: Feedback::None,
            confirmed_until: None,
        }
    }

    pub fn photos(&self) -> &[PhotoUpload] {
        &self.photos
    }

    /// Attaches a photo; only PNG and JPEG images are taken.
    pub fn add_photo(&mut self, photo: PhotoUpload) -> Result<(), FormError> {
        if !photo.has_allowed_type() {
            return Err(FormError::UnsupportedPhoto {
                file_name: photo.file_name,
            });
        }
        if self.photos.len() >= self.max_photos {
            return Err(FormError::TooManyPhotos {
                max: self.max_photos,
            });
        }
        self.photos.push(photo);
        Ok(())
    }

    pub fn remove_photo(&mut self, index: usize) -> Option<PhotoUpload> {
        (index < self.photos.len()).then(|| self.photos.remove(index))
    }

    /// Submit control state
    pub fn can_submit(&self) -> bool {
        !self.in_flight
    }

    pub fn is_submitting(&self) -> bool {
        self.in_flight
    }

    /// Checks performed before anything is sent
    pub fn validate(&self) -> Result<(), FormError> {
        if !self.email.is_empty() && !validator::validate_email(self.email.as_str()) {
            return Err(FormError::InvalidEmail(self.email.clone()));
        }
        if self.photos.len() > self.max_photos {
            return Err(FormError::TooManyPhotos {
                max: self.max_photos,
            });
        }
        if let Some(bad) = self.photos.iter().find(|p| !p.has_allowed_type()) {
            return Err(FormError::UnsupportedPhoto {
                file_name: bad.file_name.clone(),
            });
        }
        Ok(())
    }

    /// Validates the form and marks it in flight.
    ///
    /// Validation errors are also shown as failure feedback.
    pub fn begin_submit(&mut self) -> Result<LeadSubmission, FormError> {
        if self.in_flight {
            return Err(FormError::SubmissionInFlight);
        }
        if let Err(e) = self.validate() {
            self.feedback = Feedback::Failed(e.to_string());
            return Err(e);
        }

        self.in_flight = true;
        self.feedback = Feedback::None;
        self.confirmed_until = None;

        Ok(LeadSubmission {
            fields: CreateLeadRequest {
                company: Some(self.company.clone()),
                contact_person: Some(self.contact_person.clone()),
                email: Some(self.email.clone()),
            }
            .normalized(),
            photos: self.photos.clone(),
        })
    }

    /// Applies the outcome of the request started by `begin_submit`.
    ///
    /// Success clears the form and shows a confirmation until
    /// `now + CONFIRMATION_TTL`; failure keeps every field as entered.
    pub fn complete_submit(&mut self, outcome: Result<LeadResponse, ClientError>, now: Instant) {
        self.in_flight = false;
        match outcome {
            Ok(lead) => {
                info!(lead_id = lead.id, "lead submitted");
                self.company.clear();
                self.contact_person.clear();
                self.email.clear();
                self.photos.clear();
                self.feedback = Feedback::Confirmed { lead_id: lead.id };
                self.confirmed_until = Some(now + CONFIRMATION_TTL);
            }
            Err(e) => {
                warn!(error = %e, "lead submission failed");
                self.feedback = Feedback::Failed(match e {
                    ClientError::Api { message, .. } => message,
                    other => other.to_string(),
                });
                self.confirmed_until = None;
            }
        }
    }

    /// Full submit against `api`, with `now` read when the response arrives
    pub async fn submit(&mut self, api: &dyn LeadApi) -> Result<(), FormError> {
        let submission = self.begin_submit()?;
        let outcome = api.create_lead(submission).await;
        self.complete_submit(outcome, Instant::now());
        Ok(())
    }

    /// Feedback visible at `now`; a confirmation lapses after its deadline
    pub fn feedback(&self, now: Instant) -> Feedback {
        match (&self.feedback, self.confirmed_until) {
            (Feedback::Confirmed { .. }, Some(until)) if now >= until => Feedback::None,
            (feedback, _) => feedback.clone(),
        }
    }

    /// Closes the confirmation before its deadline
    pub fn dismiss_confirmation(&mut self) {
        if matches!(self.feedback, Feedback::Confirmed { .. }) {
            self.feedback = Feedback::None;
            self.confirmed_until = None;
        }
    }
}
