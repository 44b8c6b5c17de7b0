//! Runtime integration errors.
//!
//! Script-level failures are [`core_types::JsError`]s and travel through
//! promises; the errors here are reported to the embedder.

use thiserror::Error;

/// Errors raised while configuring or wiring up a [`Runtime`](crate::Runtime).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuntimeError {
    /// Rejection hooks may be installed once per runtime
    #[error("rejection hooks are already installed")]
    HooksAlreadyInstalled,

    /// The configuration document could not be read
    #[error("invalid runtime configuration: {0}")]
    InvalidConfig(String),
}
