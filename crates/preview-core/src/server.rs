//! A provisioning host and its current site list.

use std::sync::Arc;

use preview_api::types::{self, CreateSiteRequest};
use preview_api::ProvisionClient;

use crate::error::CoreError;
use crate::poll;
use crate::site::{Site, STATUS_PAUSE};

/// Handle to a remote server. Identity is immutable once fetched; the site
/// list is a cached snapshot replaced wholesale by [`load_sites`](Self::load_sites).
pub struct Server {
    client: Arc<ProvisionClient>,
    id: u64,
    name: String,
    /// Domain suffix under which this server's preview sites are created.
    domain: String,
    sites: Vec<types::Site>,
}

impl Server {
    /// Load server metadata. Fails with the API's 404 rejection when the id
    /// does not exist.
    pub async fn fetch(
        client: Arc<ProvisionClient>,
        id: u64,
        domain: impl Into<String>,
    ) -> Result<Self, CoreError> {
        let server = client.get_server(id).await?;
        Ok(Self {
            client,
            id: server.id,
            name: server.name,
            domain: domain.into(),
            sites: Vec::new(),
        })
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    /// The most recently loaded site snapshot.
    pub fn sites(&self) -> &[types::Site] {
        &self.sites
    }

    /// Replace the cached site list from the remote listing. Idempotent.
    pub async fn load_sites(&mut self) -> Result<(), CoreError> {
        self.sites = self.client.list_sites(self.id).await?;
        Ok(())
    }

    /// Find a site by exact fully-qualified name in the cached snapshot.
    pub fn find_site(&self, name: &str) -> Option<Site> {
        self.sites
            .iter()
            .find(|site| site.name == name)
            .map(|site| Site::new(Arc::clone(&self.client), site.clone()))
    }

    /// Create a site and wait for it to reach `installed`.
    ///
    /// Remote rejections (e.g. duplicate domain → 422) propagate untouched.
    pub async fn create_site(&self, request: &CreateSiteRequest) -> Result<Site, CoreError> {
        let created = self.client.create_site(self.id, request).await?;
        let (client, server_id, site_id) = (&self.client, self.id, created.id);
        let data = poll::until(
            types::Site::is_installed,
            || client.get_site(server_id, site_id),
            STATUS_PAUSE,
        )
        .await?;
        Ok(Site::new(Arc::clone(&self.client), data))
    }
}
