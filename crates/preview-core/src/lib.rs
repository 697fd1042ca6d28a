// preview-core: domain model and orchestration for branch preview deployments.

pub mod env;
pub mod error;
pub mod naming;
pub mod poll;
pub mod preview;
pub mod report;
pub mod server;
pub mod site;

// ── Primary re-exports ──────────────────────────────────────────────
pub use env::{update_env_text, EnvAssignments, EnvValue};
pub use error::CoreError;
pub use naming::{normalize_database_name, normalize_domain_name};
pub use preview::{
    create_preview, destroy_preview, CertificateMode, CreatePreview, DestroyPreview,
    DestroyedPreview, Preview, ServerConfig,
};
pub use report::{NullReporter, Reporter, TracingReporter};
pub use server::Server;
pub use site::{DeletedSite, RepositoryInstall, Site};

// The API client is part of the public surface — consumers construct one
// and hand it to the orchestrator.
pub use preview_api::{DebugLevel, ProvisionClient, TransportConfig};
