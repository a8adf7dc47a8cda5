use assert_matches::assert_matches;
use lead_capture::{
    client::{ClientError, HttpLeadClient, LeadApi, LeadSubmission},
    dto::lead::CreateLeadRequest,
    storage::PhotoUpload,
};
use serde_json::json;
use wiremock::{
    matchers::{body_string_contains, header_regex, method, path},
    Mock, MockServer, ResponseTemplate,
};

fn lead_json(id: i32, company: &str) -> serde_json::Value {
    json!({
        "id": id,
        "company": company,
        "contact_person": null,
        "email": null,
        "photo_paths": [],
        "created_at": "2024-10-14T10:30:00Z"
    })
}

#[tokio::test]
async fn list_leads_unwraps_envelope() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/leads"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "data": [lead_json(2, "Beta"), lead_json(1, "Acme")],
            "meta": {"timestamp": "2024-10-14T10:30:00Z"}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = HttpLeadClient::new(server.uri()).unwrap();
    let leads = client.list_leads().await.unwrap();

    assert_eq!(leads.len(), 2);
    assert_eq!(leads[0].id, 2);
    assert_eq!(leads[1].company.as_deref(), Some("Acme"));
}

#[tokio::test]
async fn photo_urls_reads_camel_case_key() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/leads/7/photos"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "data": {"photoUrls": ["/uploads/a.png", "/uploads/b.jpg"]}
        })))
        .mount(&server)
        .await;

    let client = HttpLeadClient::new(server.uri()).unwrap();

    assert_eq!(
        client.photo_urls(7).await.unwrap(),
        vec!["/uploads/a.png".to_string(), "/uploads/b.jpg".to_string()]
    );
}

#[tokio::test]
async fn error_body_becomes_api_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/leads/9/photos"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "success": false,
            "error": "Not Found",
            "message": "Not found: Lead 9 not found",
            "timestamp": "2024-10-14T10:30:00Z"
        })))
        .mount(&server)
        .await;

    let client = HttpLeadClient::new(server.uri()).unwrap();
    let err = client.photo_urls(9).await.unwrap_err();

    assert_matches!(
        &err,
        ClientError::Api { status: 404, message } if message == "Not found: Lead 9 not found"
    );
    assert_eq!(err.status(), Some(404));
}

#[tokio::test]
async fn non_json_error_falls_back_to_status_reason() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/leads"))
        .respond_with(ResponseTemplate::new(502).set_body_string("upstream down"))
        .mount(&server)
        .await;

    let client = HttpLeadClient::new(server.uri()).unwrap();

    assert_matches!(
        client.list_leads().await,
        Err(ClientError::Api { status: 502, message }) if message == "Bad Gateway"
    );
}

#[tokio::test]
async fn create_lead_posts_multipart_form() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/leads"))
        .and(header_regex("content-type", "^multipart/form-data; boundary="))
        .and(body_string_contains("name=\"contactPerson\""))
        .and(body_string_contains("name=\"photos\"; filename=\"card.png\""))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "success": true,
            "data": lead_json(3, "Acme")
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = HttpLeadClient::new(server.uri()).unwrap();
    let lead = client
        .create_lead(LeadSubmission {
            fields: CreateLeadRequest {
                company: Some("Acme".into()),
                contact_person: Some("Jane".into()),
                email: None,
            },
            photos: vec![PhotoUpload::new(
                "card.png",
                Some("image/png".into()),
                b"png".to_vec(),
            )],
        })
        .await
        .unwrap();

    assert_eq!(lead.id, 3);
}

#[tokio::test]
async fn unreachable_server_is_a_transport_error() {
    let client = HttpLeadClient::new("http://127.0.0.1:9").unwrap();
    assert_matches!(client.list_leads().await, Err(ClientError::Transport(_)));
}
