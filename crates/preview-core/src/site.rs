//! The central mutable entity: a remotely-provisioned site.
//!
//! A `Site`'s identity (`id`, `server_id`, `name`) never changes; its status
//! fields evolve remotely and are only observed here by re-fetching the
//! whole record. [`Site::refresh`] is the single sanctioned mutation path —
//! no method infers a status transition locally.

use std::sync::Arc;
use std::time::Duration;

use preview_api::types::{
    Certificate, CloneCertificateRequest, CreateJobRequest, InstallCertificateRequest,
    InstallRepositoryRequest, LetsEncryptRequest, Webhook,
};
use preview_api::{types, ProvisionClient};

use crate::env::{update_env_text, EnvAssignments};
use crate::error::CoreError;
use crate::poll;

/// Pause between status re-fetches for ordinary transitions.
pub(crate) const STATUS_PAUSE: Duration = Duration::from_secs(1);
/// Git installs are slow; poll them less aggressively.
const REPOSITORY_PAUSE: Duration = Duration::from_secs(5);
/// Certificate issuance sits between the two.
const CERTIFICATE_PAUSE: Duration = Duration::from_secs(2);

/// Outcome of a repository install.
///
/// The remote side reports `installing` while working and `installed` on
/// success, but on failure the field can revert to absent instead of a
/// dedicated error value. That third state is surfaced explicitly rather
/// than conflated with success — the caller decides what to do with it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RepositoryInstall {
    Installed,
    /// The status left `installing` without reaching `installed`. Carries
    /// whatever terminal value was observed (often none at all).
    Indeterminate(Option<String>),
}

/// Handle to a live remote site.
pub struct Site {
    client: Arc<ProvisionClient>,
    data: types::Site,
    certificate_id: Option<u64>,
}

impl Site {
    pub(crate) fn new(client: Arc<ProvisionClient>, data: types::Site) -> Self {
        Self {
            client,
            data,
            certificate_id: None,
        }
    }

    pub fn id(&self) -> u64 {
        self.data.id
    }

    pub fn server_id(&self) -> u64 {
        self.data.server_id
    }

    pub fn name(&self) -> &str {
        &self.data.name
    }

    pub fn status(&self) -> Option<&str> {
        self.data.status.as_deref()
    }

    pub fn repository_status(&self) -> Option<&str> {
        self.data.repository_status.as_deref()
    }

    pub fn quick_deploy(&self) -> Option<bool> {
        self.data.quick_deploy
    }

    pub fn deployment_status(&self) -> Option<&str> {
        self.data.deployment_status.as_deref()
    }

    /// The certificate currently tracked for this site, if any was
    /// requested, installed, or cloned through this handle.
    pub fn certificate_id(&self) -> Option<u64> {
        self.certificate_id
    }

    /// Re-read every status field from the remote source of truth.
    ///
    /// Replaces the whole record at once so a caller never observes a
    /// half-updated combination of status fields.
    pub async fn refresh(&mut self) -> Result<(), CoreError> {
        self.data = self.client.get_site(self.server_id(), self.id()).await?;
        Ok(())
    }

    // ── Repository ───────────────────────────────────────────────────

    /// Install a git repository at `branch` and wait for the install to
    /// leave the `installing` state.
    pub async fn install_repository(
        &mut self,
        repository: &str,
        branch: &str,
    ) -> Result<RepositoryInstall, CoreError> {
        let request = InstallRepositoryRequest::github(repository, branch);
        self.client
            .install_repository(self.server_id(), self.id(), &request)
            .await?;

        let (client, server_id, site_id) = (&self.client, self.server_id(), self.id());
        self.data = poll::until(
            |site: &types::Site| !site.repository_installing(),
            || client.get_site(server_id, site_id),
            REPOSITORY_PAUSE,
        )
        .await?;

        Ok(match self.data.repository_status.as_deref() {
            Some("installed") => RepositoryInstall::Installed,
            other => RepositoryInstall::Indeterminate(other.map(ToOwned::to_owned)),
        })
    }

    // ── Environment & deploy script ──────────────────────────────────

    /// Merge `assignments` into the site's `.env` file.
    pub async fn set_environment_variables(
        &self,
        assignments: &EnvAssignments,
    ) -> Result<(), CoreError> {
        let env = self.client.get_env(self.server_id(), self.id()).await?;
        let updated = update_env_text(&env, assignments);
        self.client
            .put_env(self.server_id(), self.id(), &updated)
            .await?;
        Ok(())
    }

    /// Append commands to the deploy script. Script edits are synchronous
    /// server-side, so no polling happens here.
    pub async fn append_to_deploy_script(&self, extra: &str) -> Result<(), CoreError> {
        let script = self
            .client
            .get_deploy_script(self.server_id(), self.id())
            .await?;
        self.client
            .put_deploy_script(self.server_id(), self.id(), &format!("{script}\n{extra}"))
            .await?;
        Ok(())
    }

    // ── Scheduler ────────────────────────────────────────────────────

    fn artisan_path(&self) -> String {
        format!("/home/forge/{}/artisan", self.name())
    }

    /// Install the periodic scheduler job for this site.
    pub async fn install_scheduler(&self) -> Result<(), CoreError> {
        let request =
            CreateJobRequest::minutely(format!("php {} schedule:run", self.artisan_path()));
        self.client.create_job(self.server_id(), &request).await?;
        Ok(())
    }

    /// Delete every scheduled job referencing this site's entrypoint.
    ///
    /// Jobs are matched by command string, not stored ids — several jobs may
    /// reference the same site and all of them have to go.
    pub async fn uninstall_scheduler(&self) -> Result<(), CoreError> {
        let path = self.artisan_path();
        let jobs = self.client.list_jobs(self.server_id()).await?;
        for job in jobs.iter().filter(|job| job.command.contains(&path)) {
            self.client.delete_job(self.server_id(), job.id).await?;
        }
        Ok(())
    }

    // ── Certificates ─────────────────────────────────────────────────

    /// Request a new automatically-issued certificate for this site's name.
    pub async fn create_certificate(&mut self) -> Result<(), CoreError> {
        let request = LetsEncryptRequest {
            domains: vec![self.name().to_owned()],
        };
        let certificate = self
            .client
            .create_letsencrypt_certificate(self.server_id(), self.id(), &request)
            .await?;
        self.certificate_id = Some(certificate.id);
        Ok(())
    }

    /// Install a caller-provided certificate and private key.
    pub async fn install_certificate(
        &mut self,
        certificate: &str,
        key: &str,
    ) -> Result<(), CoreError> {
        let request = InstallCertificateRequest::existing(certificate, key);
        let certificate = self
            .client
            .install_certificate(self.server_id(), self.id(), &request)
            .await?;
        self.certificate_id = Some(certificate.id);
        Ok(())
    }

    /// Clone a certificate already present on the server.
    pub async fn clone_certificate(&mut self, certificate_id: u64) -> Result<(), CoreError> {
        let request = CloneCertificateRequest::from_id(certificate_id);
        let certificate = self
            .client
            .clone_certificate(self.server_id(), self.id(), &request)
            .await?;
        self.certificate_id = Some(certificate.id);
        Ok(())
    }

    /// Wait until the tracked certificate is actively serving traffic.
    ///
    /// No-op when no certificate is tracked. Activation is requested at most
    /// once: only while the certificate is installed and `activation_status`
    /// is still absent. Automatically-issued certificates activate on their
    /// own; installed and cloned ones need the explicit request.
    pub async fn ensure_certificate_activated(&self) -> Result<(), CoreError> {
        let Some(certificate_id) = self.certificate_id else {
            return Ok(());
        };

        let (client, server_id, site_id) = (&self.client, self.server_id(), self.id());
        poll::until(
            |certificate: &Certificate| certificate.active,
            || async move {
                let certificate = client
                    .get_certificate(server_id, site_id, certificate_id)
                    .await?;
                if certificate.is_installed() && certificate.activation_status.is_none() {
                    client
                        .activate_certificate(server_id, site_id, certificate_id)
                        .await?;
                }
                Ok::<_, CoreError>(certificate)
            },
            CERTIFICATE_PAUSE,
        )
        .await?;

        Ok(())
    }

    // ── Deployment ───────────────────────────────────────────────────

    /// Turn on push-to-deploy and wait for the flag to be confirmed.
    pub async fn enable_quick_deploy(&mut self) -> Result<(), CoreError> {
        self.client
            .enable_quick_deploy(self.server_id(), self.id())
            .await?;
        let (client, server_id, site_id) = (&self.client, self.server_id(), self.id());
        self.data = poll::until(
            |site: &types::Site| site.quick_deploy != Some(false),
            || client.get_site(server_id, site_id),
            STATUS_PAUSE,
        )
        .await?;
        Ok(())
    }

    /// Trigger a deployment and wait for `deployment_status` to return to
    /// idle. Repeatable — the remote side serializes deployments.
    pub async fn deploy(&mut self) -> Result<(), CoreError> {
        self.client.deploy(self.server_id(), self.id()).await?;
        let (client, server_id, site_id) = (&self.client, self.server_id(), self.id());
        self.data = poll::until(
            types::Site::deployment_idle,
            || client.get_site(server_id, site_id),
            STATUS_PAUSE,
        )
        .await?;
        Ok(())
    }

    // ── Webhooks & notifications ─────────────────────────────────────

    pub async fn create_webhook(&self, url: &str) -> Result<Webhook, CoreError> {
        Ok(self
            .client
            .create_webhook(self.server_id(), self.id(), url)
            .await?)
    }

    pub async fn create_failure_email(&self, email: &str) -> Result<(), CoreError> {
        self.client
            .create_failure_email(self.server_id(), self.id(), email)
            .await?;
        Ok(())
    }

    // ── Teardown ─────────────────────────────────────────────────────

    /// Delete a database by exact name. Absent databases are a no-op, not
    /// an error — database names are conventional, never tracked by id.
    pub async fn delete_database(&self, name: &str) -> Result<(), CoreError> {
        delete_database_by_name(&self.client, self.server_id(), name).await
    }

    /// Delete the remote site, consuming this handle.
    ///
    /// Returns a [`DeletedSite`] for cleaning up resources that outlive the
    /// site record itself.
    pub async fn delete(self) -> Result<DeletedSite, CoreError> {
        self.client.delete_site(self.server_id(), self.id()).await?;
        Ok(DeletedSite {
            id: self.data.id,
            server_id: self.data.server_id,
            client: self.client,
        })
    }
}

/// Proof that a site's delete call has been issued.
pub struct DeletedSite {
    pub id: u64,
    server_id: u64,
    client: Arc<ProvisionClient>,
}

impl DeletedSite {
    /// Delete the database conventionally associated with the site.
    pub async fn delete_database(&self, name: &str) -> Result<(), CoreError> {
        delete_database_by_name(&self.client, self.server_id, name).await
    }
}

async fn delete_database_by_name(
    client: &ProvisionClient,
    server_id: u64,
    name: &str,
) -> Result<(), CoreError> {
    let databases = client.list_databases(server_id).await?;
    if let Some(database) = databases.into_iter().find(|d| d.name == name) {
        client.delete_database(server_id, database.id).await?;
    }
    Ok(())
}
