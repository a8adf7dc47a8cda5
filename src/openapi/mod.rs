use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Lead Capture API",
        version = "1.0.0",
        description = r#"
# Lead Capture API

Records trade-show leads (company, contact person, email) together with up to
five photos per lead, and serves them back for browsing.

## Photos

Photos are uploaded as `multipart/form-data` under the `photos` field. Only
`.png`, `.jpg` and `.jpeg` images are accepted, at most 5 MB each. A rejected
photo rejects the whole submission; nothing is stored.

## Error Handling

Errors share one body format:

```json
{
  "success": false,
  "error": "Bad Request",
  "message": "notes.pdf: only .png, .jpg and .jpeg images are allowed",
  "timestamp": "2024-10-14T10:30:00Z"
}
```
        "#,
        license(
            name = "MIT",
            url = "https://opensource.org/licenses/MIT"
        )
    ),
    servers(
        (url = "http://localhost:5000", description = "Local development")
    ),
    tags(
        (name = "leads", description = "Lead capture and browsing"),
        (name = "uploads", description = "Stored lead photos"),
        (name = "health", description = "Health check endpoints")
    ),
    paths(
        crate::handlers::leads::list_leads,
        crate::handlers::leads::get_lead_photos,
        crate::handlers::leads::create_lead,
        crate::handlers::leads::serve_upload,
        crate::health::health_check,
    ),
    components(
        schemas(
            crate::dto::lead::LeadResponse,
            crate::dto::lead::PhotoUrlsResponse,
            crate::dto::lead::CreateLeadRequest,
            crate::handlers::leads::CreateLeadForm,
            crate::health::HealthInfo,
            crate::health::HealthStatus,
            crate::errors::ErrorResponse
        )
    )
)]
pub struct ApiDocV1;

pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/swagger-ui")
        .url("/api-docs/openapi.json", ApiDocV1::openapi())
        .config(utoipa_swagger_ui::Config::from("/api-docs/openapi.json").try_it_out_enabled(true))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_lists_lead_endpoints() {
        let openapi = ApiDocV1::openapi();
        let json = serde_json::to_string_pretty(&openapi).unwrap();
        assert!(json.contains("Lead Capture API"));
        assert!(json.contains("/leads"));
        assert!(json.contains("/uploads/:filename"));
        assert!(json.contains("multipart/form-data"));
    }
}
