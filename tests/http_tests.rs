//! Wire-level tests for the token provider and the HTTP gateway against a
//! local mock server.

use wiremock::matchers::{body_string_contains, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use pbigate::auth::{AccessToken, AzureTokenProvider, CredentialError, TokenProvider};
use pbigate::configuration::{ENV_CLIENT_ID, ENV_CLIENT_SECRET, ENV_TENANT_ID};
use pbigate::gateway::{Gateway, HttpGateway, UpstreamOutcome, UpstreamRequest};

/// Credential scenarios share one test because they manipulate process
/// environment variables, which are global to the test binary.
#[tokio::test]
async fn azure_token_provider_performs_the_client_credentials_exchange() {
    let server = MockServer::start().await;
    let provider = AzureTokenProvider::new(server.uri());

    // Missing secrets surface as a credential error, not a panic or a
    // startup failure.
    std::env::remove_var(ENV_CLIENT_ID);
    std::env::remove_var(ENV_CLIENT_SECRET);
    std::env::remove_var(ENV_TENANT_ID);
    assert!(matches!(
        provider.acquire().await.unwrap_err(),
        CredentialError::MissingSecret(_)
    ));

    std::env::set_var(ENV_CLIENT_ID, "client-1");
    std::env::set_var(ENV_CLIENT_SECRET, "secret-1");
    std::env::set_var(ENV_TENANT_ID, "tenant-1");

    // Happy path: a form-encoded client-credentials grant against the
    // tenant's token endpoint.
    Mock::given(method("POST"))
        .and(path("/tenant-1/oauth2/v2.0/token"))
        .and(body_string_contains("grant_type=client_credentials"))
        .and(body_string_contains("client_id=client-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "token_type": "Bearer",
            "expires_in": 3599,
            "access_token": "tok-123"
        })))
        .up_to_n_times(1)
        .mount(&server)
        .await;

    let token = provider.acquire().await.unwrap();
    assert_eq!(token.as_str(), "tok-123");

    // A 2xx response without an access_token field is its own failure mode.
    Mock::given(method("POST"))
        .and(path("/tenant-1/oauth2/v2.0/token"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({"token_type": "Bearer"})),
        )
        .up_to_n_times(1)
        .mount(&server)
        .await;
    assert!(matches!(
        provider.acquire().await.unwrap_err(),
        CredentialError::MissingAccessToken
    ));

    // A rejected exchange keeps the identity provider's response body.
    Mock::given(method("POST"))
        .and(path("/tenant-1/oauth2/v2.0/token"))
        .respond_with(ResponseTemplate::new(401).set_body_string("invalid_client"))
        .mount(&server)
        .await;
    match provider.acquire().await.unwrap_err() {
        CredentialError::Rejected { status, body } => {
            assert_eq!(status, 401);
            assert_eq!(body, "invalid_client");
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn gateway_attaches_the_bearer_token_and_accept_header() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/groups"))
        .and(header("authorization", "Bearer tok-xyz"))
        .and(header("accept", "application/json"))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"value":[]}"#))
        .expect(1)
        .mount(&server)
        .await;

    let gateway = HttpGateway::new().unwrap();
    let token = AccessToken::new("tok-xyz");
    let outcome = gateway
        .call(&token, UpstreamRequest::get(format!("{}/groups", server.uri())))
        .await
        .unwrap();

    assert_eq!(
        outcome,
        UpstreamOutcome::Success {
            status: 200,
            body: br#"{"value":[]}"#.to_vec()
        }
    );
}

#[tokio::test]
async fn gateway_reports_non_2xx_as_failure_with_the_raw_body() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/groups/W1/datasets/m2"))
        .respond_with(ResponseTemplate::new(403).set_body_string("insufficient permissions"))
        .mount(&server)
        .await;

    let gateway = HttpGateway::new().unwrap();
    let token = AccessToken::new("tok");
    let outcome = gateway
        .call(
            &token,
            UpstreamRequest::delete(format!("{}/groups/W1/datasets/m2", server.uri())),
        )
        .await
        .unwrap();

    assert_eq!(
        outcome,
        UpstreamOutcome::Failure {
            status: 403,
            body: "insufficient permissions".to_string()
        }
    );
}

#[tokio::test]
async fn gateway_posts_json_bodies() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/groups"))
        .and(body_string_contains(r#""name":"Finance""#))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"id":"W9"}"#))
        .expect(1)
        .mount(&server)
        .await;

    let gateway = HttpGateway::new().unwrap();
    let token = AccessToken::new("tok");
    let outcome = gateway
        .call(
            &token,
            UpstreamRequest::post_json(
                format!("{}/groups", server.uri()),
                serde_json::json!({"name": "Finance", "type": "Workspace"}),
            ),
        )
        .await
        .unwrap();

    assert!(matches!(outcome, UpstreamOutcome::Success { status: 200, .. }));
}

#[tokio::test]
async fn gateway_uploads_files_as_multipart_form_content() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/groups/W1/imports"))
        .and(query_param("datasetDisplayName", "Sales"))
        .and(body_string_contains("name=\"file\""))
        .and(body_string_contains("filename=\"sales.pbix\""))
        .respond_with(ResponseTemplate::new(202).set_body_string(""))
        .expect(1)
        .mount(&server)
        .await;

    let gateway = HttpGateway::new().unwrap();
    let token = AccessToken::new("tok");
    let outcome = gateway
        .call(
            &token,
            UpstreamRequest::post_file(
                format!("{}/groups/W1/imports?datasetDisplayName=Sales", server.uri()),
                "sales.pbix",
                b"PBIX-BYTES".to_vec(),
            ),
        )
        .await
        .unwrap();

    assert!(matches!(outcome, UpstreamOutcome::Success { status: 202, .. }));
}
