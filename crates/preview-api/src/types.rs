//! Wire types for the provisioning API.
//!
//! All types match the JSON exchanged with `/api/v1/` endpoints. List and
//! single-resource responses arrive wrapped in a named envelope
//! (`{"site": {...}}`, `{"sites": [...]}`); the client strips the envelope
//! before callers see these types.

use serde::{Deserialize, Serialize};

// ── Servers ──────────────────────────────────────────────────────────

/// A provisioning host — from `GET /servers/{id}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Server {
    pub id: u64,
    pub name: String,
}

// ── Sites ────────────────────────────────────────────────────────────

/// A site under a server — from `GET /servers/{id}/sites/{id}`.
///
/// The four status fields evolve independently on the remote side and are
/// only ever observed, never written, by this crate. Consumers must re-fetch
/// the whole record to see a transition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Site {
    pub id: u64,
    pub server_id: u64,
    pub name: String,
    /// Site provisioning state: `installing` until ready, then `installed`,
    /// `removing` while a delete is in flight.
    #[serde(default)]
    pub status: Option<String>,
    /// Git install state: absent before any install, `installing` while one
    /// runs, `installed` on success. May revert to absent on failure.
    #[serde(default)]
    pub repository_status: Option<String>,
    /// Push-to-deploy flag. Absent until the feature has ever been toggled.
    #[serde(default)]
    pub quick_deploy: Option<bool>,
    /// Absent while idle, non-null while a deployment is running.
    #[serde(default)]
    pub deployment_status: Option<String>,
}

impl Site {
    /// The site has finished provisioning and can accept further operations.
    pub fn is_installed(&self) -> bool {
        self.status.as_deref() == Some("installed")
    }

    /// A git install is still running.
    pub fn repository_installing(&self) -> bool {
        self.repository_status.as_deref() == Some("installing")
    }

    /// No deployment is currently in flight.
    pub fn deployment_idle(&self) -> bool {
        self.deployment_status.is_none()
    }
}

/// Payload for `POST /servers/{id}/sites`.
#[derive(Debug, Clone, Serialize)]
pub struct CreateSiteRequest {
    /// Fully-qualified site name, e.g. `feature-login.example.com`.
    pub domain: String,
    pub project_type: String,
    pub directory: String,
    /// Database to create alongside the site. Omitted entirely for sites
    /// that bring their own storage (sqlite).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub aliases: Vec<String>,
    pub isolated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub php_version: Option<String>,
}

impl CreateSiteRequest {
    /// A PHP site served from `/public` — the only project shape previews use.
    pub fn php(domain: impl Into<String>, database: Option<String>) -> Self {
        Self {
            domain: domain.into(),
            project_type: "php".to_owned(),
            directory: "/public".to_owned(),
            database,
            aliases: Vec::new(),
            isolated: false,
            username: None,
            php_version: None,
        }
    }
}

/// Payload for `POST /servers/{id}/sites/{id}/git`.
#[derive(Debug, Clone, Serialize)]
pub struct InstallRepositoryRequest {
    pub provider: String,
    /// `owner/repo` shorthand.
    pub repository: String,
    pub branch: String,
    pub composer: bool,
}

impl InstallRepositoryRequest {
    pub fn github(repository: impl Into<String>, branch: impl Into<String>) -> Self {
        Self {
            provider: "github".to_owned(),
            repository: repository.into(),
            branch: branch.into(),
            composer: true,
        }
    }
}

// ── Certificates ─────────────────────────────────────────────────────

/// A TLS certificate attached to a site.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Certificate {
    pub id: u64,
    #[serde(default)]
    pub domain: Option<String>,
    /// `letsencrypt` for requested certificates, absent for uploaded/cloned.
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub request_status: Option<String>,
    /// Issuance progress: `installing` then `installed`.
    #[serde(default)]
    pub status: Option<String>,
    /// Absent until activation has been requested, then `activating` and
    /// finally `activated`. The gate for requesting activation at most once.
    #[serde(default)]
    pub activation_status: Option<String>,
    /// The definitive "serving traffic right now" signal.
    #[serde(default)]
    pub active: bool,
}

impl Certificate {
    pub fn is_installed(&self) -> bool {
        self.status.as_deref() == Some("installed")
    }
}

/// Payload for `POST /servers/{id}/sites/{id}/certificates/letsencrypt`.
#[derive(Debug, Clone, Serialize)]
pub struct LetsEncryptRequest {
    pub domains: Vec<String>,
}

/// Payload for `POST /servers/{id}/sites/{id}/certificates` with an
/// existing certificate and private key.
#[derive(Debug, Clone, Serialize)]
pub struct InstallCertificateRequest {
    #[serde(rename = "type")]
    pub kind: String,
    pub certificate: String,
    pub key: String,
}

impl InstallCertificateRequest {
    pub fn existing(certificate: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            kind: "existing".to_owned(),
            certificate: certificate.into(),
            key: key.into(),
        }
    }
}

/// Payload for `POST /servers/{id}/sites/{id}/certificates` cloning a
/// certificate already present on the server.
#[derive(Debug, Clone, Serialize)]
pub struct CloneCertificateRequest {
    #[serde(rename = "type")]
    pub kind: String,
    pub certificate_id: u64,
}

impl CloneCertificateRequest {
    pub fn from_id(certificate_id: u64) -> Self {
        Self {
            kind: "clone".to_owned(),
            certificate_id,
        }
    }
}

// ── Databases ────────────────────────────────────────────────────────

/// A database on a server — from `GET /servers/{id}/databases`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Database {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub status: Option<String>,
}

// ── Scheduled jobs ───────────────────────────────────────────────────

/// A cron-style job on a server — from `GET /servers/{id}/jobs`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduledJob {
    pub id: u64,
    pub command: String,
    #[serde(default)]
    pub frequency: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

/// Payload for `POST /servers/{id}/jobs`.
#[derive(Debug, Clone, Serialize)]
pub struct CreateJobRequest {
    pub command: String,
    pub frequency: String,
}

impl CreateJobRequest {
    pub fn minutely(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            frequency: "minutely".to_owned(),
        }
    }
}

// ── Commands ─────────────────────────────────────────────────────────

/// A one-off command executed in a site's directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SiteCommand {
    pub id: u64,
    pub command: String,
    #[serde(default)]
    pub status: Option<String>,
}

// ── Webhooks ─────────────────────────────────────────────────────────

/// A deployment webhook — from `POST /servers/{id}/sites/{id}/webhooks`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Webhook {
    pub id: u64,
    pub url: String,
}
