use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::entities::lead;

/// Text fields of a lead submission.
///
/// Field names follow the multipart form (`contactPerson`). Every field is
/// optional; empty strings are treated as absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateLeadRequest {
    #[validate(length(max = 255))]
    #[schema(example = "Tecnarit")]
    pub company: Option<String>,
    #[validate(length(max = 255))]
    #[schema(example = "Jane Doe")]
    pub contact_person: Option<String>,
    /// Accepted as given; format is only checked by the capture form
    #[validate(length(max = 255))]
    #[schema(example = "jane@example.com")]
    pub email: Option<String>,
}

impl CreateLeadRequest {
    /// Turns empty strings into `None`
    pub fn normalized(self) -> Self {
        Self {
            company: non_empty(self.company),
            contact_person: non_empty(self.contact_person),
            email: non_empty(self.email),
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

/// A stored lead as returned by the API
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "id": 42,
    "company": "Tecnarit",
    "contact_person": "Jane Doe",
    "email": "jane@example.com",
    "photo_paths": ["lead-1728900000000000000-3120.jpg"],
    "created_at": "2024-10-14T10:30:00Z"
}))]
pub struct LeadResponse {
    pub id: i32,
    pub company: Option<String>,
    pub contact_person: Option<String>,
    pub email: Option<String>,
    /// Stored photo filenames in upload order
    #[serde(default)]
    pub photo_paths: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl From<lead::Model> for LeadResponse {
    fn from(model: lead::Model) -> Self {
        Self {
            id: model.id,
            company: model.company,
            contact_person: model.contact_person,
            email: model.email,
            photo_paths: model.photo_paths.into_inner(),
            created_at: model.created_at,
        }
    }
}

/// Retrieval URLs of a lead's photos
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct PhotoUrlsResponse {
    #[serde(rename = "photoUrls")]
    #[schema(example = json!(["/uploads/lead-1728900000000000000-3120.jpg"]))]
    pub photo_urls: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_strings_normalize_to_none() {
        let request = CreateLeadRequest {
            company: Some(String::new()),
            contact_person: Some("Jane".into()),
            email: None,
        }
        .normalized();

        assert_eq!(request.company, None);
        assert_eq!(request.contact_person.as_deref(), Some("Jane"));
        assert_eq!(request.email, None);
    }

    #[test]
    fn overlong_fields_fail_validation() {
        let request = CreateLeadRequest {
            company: Some("x".repeat(256)),
            ..Default::default()
        };
        let errors = request.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("company"));
    }

    #[test]
    fn any_email_string_is_accepted() {
        let request = CreateLeadRequest {
            email: Some("not-an-email".into()),
            ..Default::default()
        };
        assert!(request.validate().is_ok());
    }

    #[test]
    fn photo_urls_use_camel_case_key() {
        let body = serde_json::to_value(PhotoUrlsResponse {
            photo_urls: vec!["/uploads/a.png".into()],
        })
        .unwrap();
        assert_eq!(body, serde_json::json!({"photoUrls": ["/uploads/a.png"]}));
    }
}
