//! End-to-end create/destroy workflows for per-branch preview sites.
//!
//! These two entry points compose the domain model into the full
//! provisioning sequence. Both are idempotent at the site level: creating a
//! preview that already exists and destroying one that never existed are
//! success paths, not errors.

use std::sync::Arc;

use futures::future::try_join_all;
use indexmap::IndexMap;
use preview_api::types::CreateSiteRequest;
use preview_api::ProvisionClient;

use crate::env::{EnvAssignments, EnvValue};
use crate::error::CoreError;
use crate::naming::{normalize_database_name, normalize_domain_name};
use crate::report::Reporter;
use crate::server::Server;
use crate::site::RepositoryInstall;

/// The env keys wired to a networked database. Unset wholesale when the
/// preview runs on sqlite.
const NETWORKED_DB_KEYS: [&str; 5] = [
    "DB_HOST",
    "DB_PORT",
    "DB_DATABASE",
    "DB_USERNAME",
    "DB_PASSWORD",
];

/// One provisioning host and the domain suffix its previews live under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub id: u64,
    pub domain: String,
}

/// How to give the preview site a TLS certificate.
///
/// Exactly one of four ways — a site cannot both clone and upload, and
/// `Skip` rules out the other three, so illegal combinations cannot be
/// expressed at all.
#[derive(Debug, Clone, Default)]
pub enum CertificateMode {
    /// Request a fresh automatically-issued certificate.
    #[default]
    Auto,
    /// No certificate; the preview serves plain HTTP.
    Skip,
    /// Install a caller-provided certificate and private key.
    Existing { certificate: String, key: String },
    /// Clone a certificate already present on the server.
    Clone { certificate_id: u64 },
}

/// Inputs for [`create_preview`].
#[derive(Debug, Clone)]
pub struct CreatePreview {
    /// Branch the preview tracks. Source of the site slug and database name.
    pub branch: String,
    /// `owner/repo` to install.
    pub repository: String,
    pub servers: Vec<ServerConfig>,
    /// Commands appended to the deploy script after creation.
    pub after_deploy: Option<String>,
    /// Caller-supplied env overrides. Always win over computed defaults.
    pub environment: IndexMap<String, String>,
    pub certificate: CertificateMode,
    /// Explicit site slug; defaults to the normalized branch name.
    pub name: Option<String>,
    pub webhooks: Vec<String>,
    pub failure_emails: Vec<String>,
    /// Extra domains. A leading dot gets the branch slug prefixed; a
    /// trailing dot gets the server's domain suffix appended.
    pub aliases: Vec<String>,
    /// Create the site under an isolated system user.
    pub isolated: bool,
    /// Isolation username; defaults to the site name when isolated.
    pub username: Option<String>,
    /// PHP version pin, e.g. `"8.2"`.
    pub php: Option<String>,
}

impl CreatePreview {
    pub fn new(
        branch: impl Into<String>,
        repository: impl Into<String>,
        servers: Vec<ServerConfig>,
    ) -> Self {
        Self {
            branch: branch.into(),
            repository: repository.into(),
            servers,
            after_deploy: None,
            environment: IndexMap::new(),
            certificate: CertificateMode::default(),
            name: None,
            webhooks: Vec::new(),
            failure_emails: Vec::new(),
            aliases: Vec::new(),
            isolated: false,
            username: None,
            php: None,
        }
    }

    fn wants_sqlite(&self) -> bool {
        self.environment.get("DB_CONNECTION").map(String::as_str) == Some("sqlite")
    }
}

/// Inputs for [`destroy_preview`].
#[derive(Debug, Clone)]
pub struct DestroyPreview {
    pub branch: String,
    pub servers: Vec<ServerConfig>,
    pub environment: IndexMap<String, String>,
    pub name: Option<String>,
}

impl DestroyPreview {
    pub fn new(branch: impl Into<String>, servers: Vec<ServerConfig>) -> Self {
        Self {
            branch: branch.into(),
            servers,
            environment: IndexMap::new(),
            name: None,
        }
    }

    fn wants_sqlite(&self) -> bool {
        self.environment.get("DB_CONNECTION").map(String::as_str) == Some("sqlite")
    }
}

/// A provisioned preview.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Preview {
    pub url: String,
    pub id: u64,
}

/// A destroyed preview.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DestroyedPreview {
    pub id: u64,
}

fn site_name(name: Option<&str>, branch: &str, domain: &str) -> String {
    let slug = name.map_or_else(|| normalize_domain_name(branch), ToOwned::to_owned);
    format!("{slug}.{domain}")
}

/// Stand up a preview site for a branch.
///
/// Returns `None` when a site with the computed name already exists —
/// re-running for an already-provisioned branch is a safe no-op. Remote
/// rejections propagate untouched; the caller owns failure reporting.
pub async fn create_preview(
    client: Arc<ProvisionClient>,
    config: CreatePreview,
    reporter: &dyn Reporter,
) -> Result<Option<Preview>, CoreError> {
    let first = config.servers.first().ok_or(CoreError::NoServers)?;

    reporter.info(&format!("Creating preview site for branch: {}.", config.branch));

    let name = site_name(config.name.as_deref(), &config.branch, &first.domain);

    let mut server = Server::fetch(Arc::clone(&client), first.id, &first.domain).await?;
    server.load_sites().await?;

    if let Some(site) = server.find_site(&name) {
        reporter.info(&format!("Site exists: {}.", site.name()));
        return Ok(None);
    }

    let aliases = config
        .aliases
        .iter()
        .map(|alias| {
            if alias.starts_with('.') {
                format!("{}{alias}", normalize_domain_name(&config.branch))
            } else if alias.ends_with('.') {
                format!("{alias}{}", first.domain)
            } else {
                alias.clone()
            }
        })
        .collect();

    let username = match (&config.username, config.isolated) {
        (Some(username), _) => Some(username.clone()),
        (None, true) => Some(name.clone()),
        (None, false) => None,
    };

    let php_version = config
        .php
        .as_ref()
        .map(|version| format!("php{}", version.replace('.', "")));

    let database = if config.wants_sqlite() {
        None
    } else {
        Some(normalize_database_name(&config.branch))
    };

    reporter.info(&format!("Creating site: {name}."));
    let mut request = CreateSiteRequest::php(name, database);
    request.aliases = aliases;
    request.isolated = config.isolated;
    request.username = username;
    request.php_version = php_version;
    let mut site = server.create_site(&request).await?;

    match &config.certificate {
        CertificateMode::Skip => {}
        CertificateMode::Existing { certificate, key } => {
            reporter.info("Installing existing SSL certificate.");
            site.install_certificate(certificate, key).await?;
        }
        CertificateMode::Clone { certificate_id } => {
            reporter.info("Cloning existing SSL certificate.");
            site.clone_certificate(*certificate_id).await?;
        }
        CertificateMode::Auto => {
            reporter.info("Requesting new SSL certificate.");
            site.create_certificate().await?;
        }
    }

    reporter.info(&format!("Installing repository: {}.", config.repository));
    match site.install_repository(&config.repository, &config.branch).await? {
        RepositoryInstall::Installed => {}
        RepositoryInstall::Indeterminate(status) => {
            reporter.warn(&format!(
                "Repository install finished with unexpected status {status:?}; continuing."
            ));
        }
    }

    reporter.info("Updating `.env` file.");
    let mut assignments = EnvAssignments::new();
    if config.wants_sqlite() {
        for key in NETWORKED_DB_KEYS {
            assignments.insert(key.to_owned(), EnvValue::Unset);
        }
    } else {
        assignments.insert(
            "DB_DATABASE".to_owned(),
            EnvValue::set(normalize_database_name(&config.branch)),
        );
    }
    for (key, value) in &config.environment {
        assignments.insert(key.clone(), EnvValue::set(value.clone()));
    }
    site.set_environment_variables(&assignments).await?;

    reporter.info("Installing scheduler.");
    site.install_scheduler().await?;

    if let Some(after_deploy) = &config.after_deploy {
        reporter.info("Updating deploy script.");
        site.append_to_deploy_script(after_deploy).await?;
    }

    reporter.info("Enabling quick deploy.");
    site.enable_quick_deploy().await?;

    // Webhooks and failure emails are independent of each other; register
    // them all at once and wait for the lot.
    reporter.info("Setting up webhooks and failure emails.");
    let site_ref = &site;
    futures::try_join!(
        try_join_all(
            config
                .webhooks
                .iter()
                .map(|url| async move { site_ref.create_webhook(url).await }),
        ),
        try_join_all(
            config
                .failure_emails
                .iter()
                .map(|email| async move { site_ref.create_failure_email(email).await }),
        ),
    )?;

    reporter.info("Deploying site.");
    site.deploy().await?;

    let scheme = match config.certificate {
        CertificateMode::Skip => "http",
        _ => {
            reporter.info("Waiting for SSL certificate to be activated.");
            site.ensure_certificate_activated().await?;
            "https"
        }
    };

    Ok(Some(Preview {
        url: format!("{scheme}://{}", site.name()),
        id: site.id(),
    }))
}

/// Tear down the preview site for a branch.
///
/// Returns `None` (after a warning) when no matching site exists. The
/// scheduler is deliberately not uninstalled first: deleting jobs right
/// before the site delete leaves the remote site stuck `removing`
/// indefinitely, and the delete call cleans up its own jobs anyway.
pub async fn destroy_preview(
    client: Arc<ProvisionClient>,
    config: DestroyPreview,
    reporter: &dyn Reporter,
) -> Result<Option<DestroyedPreview>, CoreError> {
    let first = config.servers.first().ok_or(CoreError::NoServers)?;

    reporter.info(&format!("Removing preview site: {}.", config.branch));

    let name = site_name(config.name.as_deref(), &config.branch, &first.domain);

    let mut server = Server::fetch(Arc::clone(&client), first.id, &first.domain).await?;
    server.load_sites().await?;

    let Some(site) = server.find_site(&name) else {
        reporter.warn(&format!("Site not found: {name}."));
        return Ok(None);
    };

    reporter.info(&format!("Found site: {}.", site.name()));

    reporter.info("Deleting site.");
    let deleted = site.delete().await?;

    if !config.wants_sqlite() {
        reporter.info("Deleting database.");
        deleted
            .delete_database(&normalize_database_name(&config.branch))
            .await?;
    }

    Ok(Some(DestroyedPreview { id: deleted.id }))
}
