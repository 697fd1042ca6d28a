// ── Core error types ──
//
// Failures from the orchestration layer. Remote rejections pass through
// from `preview-api` untouched — the orchestrator never catches them, they
// belong to the caller.

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A provisioning API call failed (terminal non-2xx, transport fault,
    /// or decode failure). Carries the full API error, raw body included.
    #[error(transparent)]
    Api(#[from] preview_api::Error),

    /// A bounded poll gave up before its condition held. Only produced by
    /// [`poll::until_bounded`](crate::poll::until_bounded) — the default
    /// polling mode has no limit and never emits this.
    #[error("polling gave up after {attempts} attempts")]
    PollTimeout { attempts: u32 },

    /// The orchestrator was handed an empty server list.
    #[error("at least one server is required")]
    NoServers,
}
