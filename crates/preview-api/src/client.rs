// Hand-crafted async HTTP client for the provisioning API.
//
// Base path: /api/v1/
// Auth: `Authorization: Bearer` header
//
// Resource payloads arrive wrapped in named envelopes ({"site": {...}});
// every endpoint method here unwraps the envelope and returns the payload
// type from `types`. The `env` and `deployment/script` endpoints exchange
// raw text bodies instead of JSON.

use std::time::Duration;

use reqwest::{Method, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;
use url::Url;

use crate::error::Error;
use crate::transport::TransportConfig;
use crate::types::{
    Certificate, CloneCertificateRequest, CreateJobRequest, CreateSiteRequest, Database,
    InstallCertificateRequest, InstallRepositoryRequest, LetsEncryptRequest, ScheduledJob, Server,
    Site, SiteCommand, Webhook,
};

/// Pause before retransmitting a rate-limited request.
const RATE_LIMIT_PAUSE: Duration = Duration::from_secs(1);

// ── Request/response logging ─────────────────────────────────────────

/// How much request/response detail to emit through `tracing`.
///
/// Purely observational — the level never changes what the client does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum DebugLevel {
    /// No request logging.
    #[default]
    Silent,
    /// Method, path, and response status.
    Requests,
    /// Requests plus request/response bodies.
    Bodies,
}

// ── Resource envelopes ───────────────────────────────────────────────

#[derive(serde::Deserialize)]
struct ServersEnvelope {
    servers: Vec<Server>,
}

#[derive(serde::Deserialize)]
struct ServerEnvelope {
    server: Server,
}

#[derive(serde::Deserialize)]
struct SitesEnvelope {
    sites: Vec<Site>,
}

#[derive(serde::Deserialize)]
struct SiteEnvelope {
    site: Site,
}

#[derive(serde::Deserialize)]
struct CertificateEnvelope {
    certificate: Certificate,
}

#[derive(serde::Deserialize)]
struct DatabasesEnvelope {
    databases: Vec<Database>,
}

#[derive(serde::Deserialize)]
struct JobsEnvelope {
    jobs: Vec<ScheduledJob>,
}

#[derive(serde::Deserialize)]
struct JobEnvelope {
    job: ScheduledJob,
}

#[derive(serde::Deserialize)]
struct CommandEnvelope {
    command: SiteCommand,
}

#[derive(serde::Deserialize)]
struct WebhookEnvelope {
    webhook: Webhook,
}

// ── Client ───────────────────────────────────────────────────────────

/// Async client for the provisioning API.
///
/// Constructed once with its bearer token and shared (by `Arc`) with every
/// domain object for the duration of a run — there is no process-global
/// client state. Rotate the token with [`set_token`](Self::set_token) before
/// handing the client out.
pub struct ProvisionClient {
    http: reqwest::Client,
    base_url: Url,
    transport: TransportConfig,
    debug: DebugLevel,
}

impl ProvisionClient {
    // ── Constructors ─────────────────────────────────────────────────

    /// Build a client for `base_url` authenticating with `token`.
    pub fn new(
        base_url: &str,
        token: &secrecy::SecretString,
        transport: TransportConfig,
        debug: DebugLevel,
    ) -> Result<Self, Error> {
        let http = transport.build_client(token)?;
        let base_url = Self::normalize_base_url(base_url)?;
        Ok(Self {
            http,
            base_url,
            transport,
            debug,
        })
    }

    /// Replace the bearer token, rebuilding the underlying HTTP client so
    /// subsequent requests use a fresh connection with the new credential.
    pub fn set_token(&mut self, token: &secrecy::SecretString) -> Result<(), Error> {
        self.http = self.transport.build_client(token)?;
        Ok(())
    }

    /// Change the request-logging level.
    pub fn set_debug(&mut self, debug: DebugLevel) {
        self.debug = debug;
    }

    /// Ensure the base URL ends with `/api/v1/` so relative joins work.
    fn normalize_base_url(raw: &str) -> Result<Url, Error> {
        let mut url = Url::parse(raw)?;
        let path = url.path().trim_end_matches('/').to_owned();
        if path.ends_with("/api/v1") {
            url.set_path(&format!("{path}/"));
        } else {
            url.set_path(&format!("{path}/api/v1/"));
        }
        Ok(url)
    }

    /// Join a relative path (e.g. `"servers/1/sites"`) onto the base URL.
    fn url(&self, path: &str) -> Url {
        // base_url always ends with `/api/v1/`, so joining relative paths works.
        self.base_url
            .join(path)
            .expect("path should be valid relative URL")
    }

    // ── Send path ────────────────────────────────────────────────────

    /// Send one request, transparently retransmitting on HTTP 429.
    ///
    /// The retry is unbounded: each 429 costs one fixed pause and one
    /// identical retransmission. Every other status is returned to the
    /// response handlers untouched.
    async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<reqwest::Response, Error> {
        let url = self.url(path);
        loop {
            if self.debug >= DebugLevel::Requests {
                debug!("{method} {url}");
            }
            if self.debug >= DebugLevel::Bodies {
                if let Some(body) = body {
                    debug!("request body: {body}");
                }
            }

            let mut request = self.http.request(method.clone(), url.clone());
            if let Some(body) = body {
                request = request.json(body);
            }
            let response = request.send().await?;

            if response.status() == StatusCode::TOO_MANY_REQUESTS {
                if self.debug >= DebugLevel::Requests {
                    debug!("{method} {url} rate limited, retrying in {RATE_LIMIT_PAUSE:?}");
                }
                tokio::time::sleep(RATE_LIMIT_PAUSE).await;
                continue;
            }

            if self.debug >= DebugLevel::Requests {
                debug!("{method} {url} -> {}", response.status());
            }
            return Ok(response);
        }
    }

    // ── Response handling ────────────────────────────────────────────

    async fn read_body(&self, response: reqwest::Response) -> Result<(StatusCode, String), Error> {
        let status = response.status();
        let body = response.text().await?;
        if self.debug >= DebugLevel::Bodies {
            debug!("response body: {body}");
        }
        Ok((status, body))
    }

    async fn handle_json<T: DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<T, Error> {
        let (status, body) = self.read_body(response).await?;
        if !status.is_success() {
            return Err(Error::Remote {
                status: status.as_u16(),
                body,
            });
        }
        serde_json::from_str(&body).map_err(|e| {
            let preview: String = body.chars().take(200).collect();
            Error::Deserialization {
                message: format!("{e} (body preview: {preview:?})"),
                body,
            }
        })
    }

    async fn handle_text(&self, response: reqwest::Response) -> Result<String, Error> {
        let (status, body) = self.read_body(response).await?;
        if !status.is_success() {
            return Err(Error::Remote {
                status: status.as_u16(),
                body,
            });
        }
        Ok(body)
    }

    async fn handle_empty(&self, response: reqwest::Response) -> Result<(), Error> {
        let (status, body) = self.read_body(response).await?;
        if !status.is_success() {
            return Err(Error::Remote {
                status: status.as_u16(),
                body,
            });
        }
        Ok(())
    }

    // ── HTTP verbs ───────────────────────────────────────────────────

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, Error> {
        let response = self.send(Method::GET, path, None).await?;
        self.handle_json(response).await
    }

    async fn post_json<T: DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, Error> {
        let body = serde_json::to_value(body).expect("payload serializes to JSON");
        let response = self.send(Method::POST, path, Some(&body)).await?;
        self.handle_json(response).await
    }

    async fn post_empty<B: Serialize>(&self, path: &str, body: &B) -> Result<(), Error> {
        let body = serde_json::to_value(body).expect("payload serializes to JSON");
        let response = self.send(Method::POST, path, Some(&body)).await?;
        self.handle_empty(response).await
    }

    async fn put_empty<B: Serialize>(&self, path: &str, body: &B) -> Result<(), Error> {
        let body = serde_json::to_value(body).expect("payload serializes to JSON");
        let response = self.send(Method::PUT, path, Some(&body)).await?;
        self.handle_empty(response).await
    }

    async fn delete(&self, path: &str) -> Result<(), Error> {
        let response = self.send(Method::DELETE, path, None).await?;
        self.handle_empty(response).await
    }

    // ── Servers ──────────────────────────────────────────────────────

    pub async fn list_servers(&self) -> Result<Vec<Server>, Error> {
        let envelope: ServersEnvelope = self.get_json("servers").await?;
        Ok(envelope.servers)
    }

    pub async fn get_server(&self, server: u64) -> Result<Server, Error> {
        let envelope: ServerEnvelope = self.get_json(&format!("servers/{server}")).await?;
        Ok(envelope.server)
    }

    // ── Sites ────────────────────────────────────────────────────────

    pub async fn list_sites(&self, server: u64) -> Result<Vec<Site>, Error> {
        let envelope: SitesEnvelope = self.get_json(&format!("servers/{server}/sites")).await?;
        Ok(envelope.sites)
    }

    pub async fn get_site(&self, server: u64, site: u64) -> Result<Site, Error> {
        let envelope: SiteEnvelope = self
            .get_json(&format!("servers/{server}/sites/{site}"))
            .await?;
        Ok(envelope.site)
    }

    pub async fn create_site(
        &self,
        server: u64,
        request: &CreateSiteRequest,
    ) -> Result<Site, Error> {
        let envelope: SiteEnvelope = self
            .post_json(&format!("servers/{server}/sites"), request)
            .await?;
        Ok(envelope.site)
    }

    pub async fn delete_site(&self, server: u64, site: u64) -> Result<(), Error> {
        self.delete(&format!("servers/{server}/sites/{site}")).await
    }

    // ── Git ──────────────────────────────────────────────────────────

    pub async fn install_repository(
        &self,
        server: u64,
        site: u64,
        request: &InstallRepositoryRequest,
    ) -> Result<Site, Error> {
        let envelope: SiteEnvelope = self
            .post_json(&format!("servers/{server}/sites/{site}/git"), request)
            .await?;
        Ok(envelope.site)
    }

    // ── Environment file (raw text) ──────────────────────────────────

    pub async fn get_env(&self, server: u64, site: u64) -> Result<String, Error> {
        let response = self
            .send(Method::GET, &format!("servers/{server}/sites/{site}/env"), None)
            .await?;
        self.handle_text(response).await
    }

    pub async fn put_env(&self, server: u64, site: u64, content: &str) -> Result<(), Error> {
        self.put_empty(
            &format!("servers/{server}/sites/{site}/env"),
            &serde_json::json!({ "content": content }),
        )
        .await
    }

    // ── Deployment ───────────────────────────────────────────────────

    /// Toggle quick deploy (push-to-deploy) on.
    pub async fn enable_quick_deploy(&self, server: u64, site: u64) -> Result<Site, Error> {
        let envelope: SiteEnvelope = self
            .post_json(
                &format!("servers/{server}/sites/{site}/deployment"),
                &serde_json::json!({}),
            )
            .await?;
        Ok(envelope.site)
    }

    /// Trigger a deployment. The returned record shows `deployment_status`
    /// non-null; poll `get_site` until it reverts to null.
    pub async fn deploy(&self, server: u64, site: u64) -> Result<Site, Error> {
        let envelope: SiteEnvelope = self
            .post_json(
                &format!("servers/{server}/sites/{site}/deployment/deploy"),
                &serde_json::json!({}),
            )
            .await?;
        Ok(envelope.site)
    }

    pub async fn get_deploy_script(&self, server: u64, site: u64) -> Result<String, Error> {
        let response = self
            .send(
                Method::GET,
                &format!("servers/{server}/sites/{site}/deployment/script"),
                None,
            )
            .await?;
        self.handle_text(response).await
    }

    pub async fn put_deploy_script(
        &self,
        server: u64,
        site: u64,
        content: &str,
    ) -> Result<(), Error> {
        self.put_empty(
            &format!("servers/{server}/sites/{site}/deployment/script"),
            &serde_json::json!({ "content": content }),
        )
        .await
    }

    // ── Certificates ─────────────────────────────────────────────────

    pub async fn create_letsencrypt_certificate(
        &self,
        server: u64,
        site: u64,
        request: &LetsEncryptRequest,
    ) -> Result<Certificate, Error> {
        let envelope: CertificateEnvelope = self
            .post_json(
                &format!("servers/{server}/sites/{site}/certificates/letsencrypt"),
                request,
            )
            .await?;
        Ok(envelope.certificate)
    }

    pub async fn install_certificate(
        &self,
        server: u64,
        site: u64,
        request: &InstallCertificateRequest,
    ) -> Result<Certificate, Error> {
        let envelope: CertificateEnvelope = self
            .post_json(&format!("servers/{server}/sites/{site}/certificates"), request)
            .await?;
        Ok(envelope.certificate)
    }

    pub async fn clone_certificate(
        &self,
        server: u64,
        site: u64,
        request: &CloneCertificateRequest,
    ) -> Result<Certificate, Error> {
        let envelope: CertificateEnvelope = self
            .post_json(&format!("servers/{server}/sites/{site}/certificates"), request)
            .await?;
        Ok(envelope.certificate)
    }

    /// Fetch a certificate's current status.
    ///
    /// A 404 here gets the enriched [`Error::CertificateLookupFailed`]
    /// diagnosis instead of a bare remote rejection — certificates that
    /// fail automatic issuance disappear from this endpoint.
    pub async fn get_certificate(
        &self,
        server: u64,
        site: u64,
        certificate: u64,
    ) -> Result<Certificate, Error> {
        let result: Result<CertificateEnvelope, Error> = self
            .get_json(&format!(
                "servers/{server}/sites/{site}/certificates/{certificate}"
            ))
            .await;
        match result {
            Ok(envelope) => Ok(envelope.certificate),
            Err(Error::Remote { status: 404, body }) => {
                Err(Error::CertificateLookupFailed { status: 404, body })
            }
            Err(e) => Err(e),
        }
    }

    pub async fn activate_certificate(
        &self,
        server: u64,
        site: u64,
        certificate: u64,
    ) -> Result<(), Error> {
        self.post_empty(
            &format!("servers/{server}/sites/{site}/certificates/{certificate}/activate"),
            &serde_json::json!({}),
        )
        .await
    }

    // ── Databases ────────────────────────────────────────────────────

    pub async fn list_databases(&self, server: u64) -> Result<Vec<Database>, Error> {
        let envelope: DatabasesEnvelope =
            self.get_json(&format!("servers/{server}/databases")).await?;
        Ok(envelope.databases)
    }

    pub async fn delete_database(&self, server: u64, database: u64) -> Result<(), Error> {
        self.delete(&format!("servers/{server}/databases/{database}"))
            .await
    }

    // ── Scheduled jobs ───────────────────────────────────────────────

    pub async fn list_jobs(&self, server: u64) -> Result<Vec<ScheduledJob>, Error> {
        let envelope: JobsEnvelope = self.get_json(&format!("servers/{server}/jobs")).await?;
        Ok(envelope.jobs)
    }

    pub async fn create_job(
        &self,
        server: u64,
        request: &CreateJobRequest,
    ) -> Result<ScheduledJob, Error> {
        let envelope: JobEnvelope = self
            .post_json(&format!("servers/{server}/jobs"), request)
            .await?;
        Ok(envelope.job)
    }

    pub async fn delete_job(&self, server: u64, job: u64) -> Result<(), Error> {
        self.delete(&format!("servers/{server}/jobs/{job}")).await
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Run a one-off command in the site's directory.
    pub async fn run_command(
        &self,
        server: u64,
        site: u64,
        command: &str,
    ) -> Result<SiteCommand, Error> {
        let envelope: CommandEnvelope = self
            .post_json(
                &format!("servers/{server}/sites/{site}/commands"),
                &serde_json::json!({ "command": command }),
            )
            .await?;
        Ok(envelope.command)
    }

    // ── Webhooks & notifications ─────────────────────────────────────

    pub async fn create_webhook(&self, server: u64, site: u64, url: &str) -> Result<Webhook, Error> {
        let envelope: WebhookEnvelope = self
            .post_json(
                &format!("servers/{server}/sites/{site}/webhooks"),
                &serde_json::json!({ "url": url }),
            )
            .await?;
        Ok(envelope.webhook)
    }

    /// Register an address to notify when a deployment fails.
    pub async fn create_failure_email(
        &self,
        server: u64,
        site: u64,
        email: &str,
    ) -> Result<(), Error> {
        self.post_empty(
            &format!("servers/{server}/sites/{site}/deployment-failure-emails"),
            &serde_json::json!({ "email": email }),
        )
        .await
    }
}
