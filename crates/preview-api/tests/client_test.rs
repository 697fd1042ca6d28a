// Integration tests for `ProvisionClient` using wiremock.

use pretty_assertions::assert_eq;
use secrecy::SecretString;
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use preview_api::types::{CreateSiteRequest, InstallRepositoryRequest, LetsEncryptRequest};
use preview_api::{DebugLevel, Error, ProvisionClient, TransportConfig};

// ── Helpers ─────────────────────────────────────────────────────────

async fn setup() -> (MockServer, ProvisionClient) {
    let server = MockServer::start().await;
    let client = ProvisionClient::new(
        &server.uri(),
        &SecretString::from("test-token"),
        TransportConfig::default(),
        DebugLevel::Silent,
    )
    .unwrap();
    (server, client)
}

fn site_body(id: u64, name: &str, status: &str) -> serde_json::Value {
    json!({
        "id": id,
        "server_id": 1,
        "name": name,
        "status": status,
        "repository_status": null,
        "quick_deploy": null,
        "deployment_status": null,
    })
}

// ── Happy-path tests ────────────────────────────────────────────────

#[tokio::test]
async fn test_list_sites_unwraps_envelope() {
    let (server, client) = setup().await;

    let body = json!({
        "sites": [
            site_body(10, "a.example.com", "installed"),
            site_body(11, "b.example.com", "installing"),
        ]
    });

    Mock::given(method("GET"))
        .and(path("/api/v1/servers/1/sites"))
        .and(header("Authorization", "Bearer test-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&body))
        .mount(&server)
        .await;

    let sites = client.list_sites(1).await.unwrap();

    assert_eq!(sites.len(), 2);
    assert_eq!(sites[0].name, "a.example.com");
    assert!(sites[0].is_installed());
    assert!(!sites[1].is_installed());
}

#[tokio::test]
async fn test_create_site_sends_payload() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api/v1/servers/1/sites"))
        .and(body_json(json!({
            "domain": "feature-login.example.com",
            "project_type": "php",
            "directory": "/public",
            "database": "feature_login",
            "isolated": false,
        })))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "site": site_body(42, "feature-login.example.com", "installing") })),
        )
        .mount(&server)
        .await;

    let request = CreateSiteRequest::php(
        "feature-login.example.com",
        Some("feature_login".to_owned()),
    );
    let site = client.create_site(1, &request).await.unwrap();

    assert_eq!(site.id, 42);
    assert_eq!(site.status.as_deref(), Some("installing"));
}

#[tokio::test]
async fn test_install_repository() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api/v1/servers/1/sites/42/git"))
        .and(body_json(json!({
            "provider": "github",
            "repository": "acme/app",
            "branch": "feature/login",
            "composer": true,
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "site": {
                "id": 42,
                "server_id": 1,
                "name": "feature-login.example.com",
                "status": "installed",
                "repository_status": "installing",
            }
        })))
        .mount(&server)
        .await;

    let request = InstallRepositoryRequest::github("acme/app", "feature/login");
    let site = client.install_repository(1, 42, &request).await.unwrap();

    assert!(site.repository_installing());
}

#[tokio::test]
async fn test_get_env_returns_raw_text() {
    let (server, client) = setup().await;

    let env = "APP_NAME=Laravel\nDB_DATABASE=forge\n";

    Mock::given(method("GET"))
        .and(path("/api/v1/servers/1/sites/42/env"))
        .respond_with(ResponseTemplate::new(200).set_body_string(env))
        .mount(&server)
        .await;

    Mock::given(method("PUT"))
        .and(path("/api/v1/servers/1/sites/42/env"))
        .and(body_json(json!({ "content": "APP_NAME=Preview\n" })))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    assert_eq!(client.get_env(1, 42).await.unwrap(), env);
    client.put_env(1, 42, "APP_NAME=Preview\n").await.unwrap();
}

#[tokio::test]
async fn test_create_letsencrypt_certificate() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api/v1/servers/1/sites/42/certificates/letsencrypt"))
        .and(body_json(json!({ "domains": ["feature-login.example.com"] })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "certificate": {
                "id": 77,
                "domain": "feature-login.example.com",
                "type": "letsencrypt",
                "request_status": "created",
                "status": "installing",
                "activation_status": null,
                "active": false,
            }
        })))
        .mount(&server)
        .await;

    let request = LetsEncryptRequest {
        domains: vec!["feature-login.example.com".to_owned()],
    };
    let certificate = client
        .create_letsencrypt_certificate(1, 42, &request)
        .await
        .unwrap();

    assert_eq!(certificate.id, 77);
    assert!(!certificate.is_installed());
    assert!(certificate.activation_status.is_none());
}

// ── Retry policy ────────────────────────────────────────────────────

#[tokio::test]
async fn test_rate_limited_request_is_retransmitted() {
    let (server, client) = setup().await;

    // First attempt is rate limited; the retransmission succeeds.
    Mock::given(method("GET"))
        .and(path("/api/v1/servers/1/sites"))
        .respond_with(ResponseTemplate::new(429))
        .up_to_n_times(1)
        .with_priority(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/v1/servers/1/sites"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "sites": [] })))
        .with_priority(5)
        .expect(1)
        .mount(&server)
        .await;

    let sites = client.list_sites(1).await.unwrap();
    assert!(sites.is_empty());
}

// ── Error handling ──────────────────────────────────────────────────

#[tokio::test]
async fn test_remote_rejection_preserves_status_and_body() {
    let (server, client) = setup().await;

    let rejection = json!({ "domain": ["The domain has already been taken."] });

    Mock::given(method("POST"))
        .and(path("/api/v1/servers/1/sites"))
        .respond_with(ResponseTemplate::new(422).set_body_json(&rejection))
        .mount(&server)
        .await;

    let request = CreateSiteRequest::php("taken.example.com", None);
    let err = client.create_site(1, &request).await.unwrap_err();

    assert_eq!(err.status(), Some(422));
    assert!(err.body().unwrap().contains("already been taken"));
    assert!(
        err.to_string()
            .contains("failed with status code 422")
    );
}

#[tokio::test]
async fn test_certificate_status_404_gets_diagnosis() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/servers/1/sites/42/certificates/77"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let err = client.get_certificate(1, 42, 77).await.unwrap_err();

    assert!(matches!(
        err,
        Error::CertificateLookupFailed { status: 404, .. }
    ));
    assert!(err.is_not_found());
    assert!(err.to_string().contains("failed to be issued"));
}

#[tokio::test]
async fn test_plain_404_is_not_diagnosed() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/servers/9"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let err = client.get_server(9).await.unwrap_err();

    assert!(matches!(err, Error::Remote { status: 404, .. }));
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_deserialization_error_keeps_body() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/servers/1"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let err = client.get_server(1).await.unwrap_err();

    assert!(matches!(err, Error::Deserialization { .. }));
    assert_eq!(err.body(), Some("not json"));
}

#[tokio::test]
async fn test_deserialization_error_with_multibyte_body() {
    let (server, client) = setup().await;

    // A multibyte character straddling the preview cutoff must not break
    // the error path.
    let body = format!("{}é and more non-JSON text", "a".repeat(199));

    Mock::given(method("GET"))
        .and(path("/api/v1/servers/1"))
        .respond_with(ResponseTemplate::new(200).set_body_string(&*body))
        .mount(&server)
        .await;

    let err = client.get_server(1).await.unwrap_err();

    assert!(matches!(err, Error::Deserialization { .. }));
    assert_eq!(err.body(), Some(body.as_str()));
    assert!(err.to_string().contains('é'));
}
