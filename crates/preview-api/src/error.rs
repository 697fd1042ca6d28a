use thiserror::Error;

/// Top-level error type for the `preview-api` crate.
///
/// Covers every failure mode of the provisioning client: transport faults,
/// terminal HTTP rejections, and decode failures. HTTP 429 never surfaces
/// here — the client absorbs it with its retry policy.
#[derive(Debug, Error)]
pub enum Error {
    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// The bearer token contains bytes that cannot appear in a header.
    #[error("Invalid API token: {0}")]
    InvalidToken(String),

    // ── Remote rejections ───────────────────────────────────────────
    /// Terminal non-2xx response, with the raw body preserved for
    /// diagnostics (validation errors arrive as JSON in the body).
    #[error("provisioning API request failed with status code {status}")]
    Remote { status: u16, body: String },

    /// 404 on a certificate-status lookup. The certificate record vanishing
    /// mid-poll almost always means the automatic issuance failed upstream
    /// (e.g. the ACME order was rejected), so the plain 404 gets a hint.
    #[error(
        "certificate status lookup returned {status}; the certificate likely \
         failed to be issued — check the site's SSL panel for the provider's \
         error output"
    )]
    CertificateLookupFailed { status: u16, body: String },

    // ── Data ────────────────────────────────────────────────────────
    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },
}

impl Error {
    /// The HTTP status of a remote rejection, if this error carries one.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Remote { status, .. } | Self::CertificateLookupFailed { status, .. } => {
                Some(*status)
            }
            Self::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Returns `true` if this is a "not found" rejection.
    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }

    /// The raw response body of a remote rejection, if preserved.
    pub fn body(&self) -> Option<&str> {
        match self {
            Self::Remote { body, .. } | Self::CertificateLookupFailed { body, .. } => {
                Some(body.as_str())
            }
            Self::Deserialization { body, .. } => Some(body.as_str()),
            _ => None,
        }
    }
}
