//! `tracing` subscriber setup and session spans.

use serde::{Deserialize, Serialize};
use tracing::Span;
use tracing_subscriber::util::{SubscriberInitExt, TryInitError};
use tracing_subscriber::{fmt, layer::SubscriberExt, EnvFilter};
use uuid::Uuid;

use crate::core::Scope;

/// Filter used when `RUST_LOG` is unset.
pub const DEFAULT_DIRECTIVE: &str = "pipesync=info";

/// Output format of the log subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Plain,
    /// One JSON object per line.
    Json,
}

/// Installs a global subscriber filtered by `RUST_LOG`.
///
/// Falls back to `default_directive` when `RUST_LOG` is unset or invalid.
///
/// # Errors
///
/// Returns an error if a global subscriber is already installed.
pub fn try_init_tracing(format: LogFormat, default_directive: &str) -> Result<(), TryInitError> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive));
    let registry = tracing_subscriber::registry().with(filter);

    match format {
        LogFormat::Plain => registry.with(fmt::layer()).try_init(),
        LogFormat::Json => registry.with(fmt::layer().json()).try_init(),
    }
}

/// Installs a global subscriber with [`DEFAULT_DIRECTIVE`]. Does nothing if
/// one is already installed.
pub fn init_tracing(format: LogFormat) {
    let _ = try_init_tracing(format, DEFAULT_DIRECTIVE);
}

/// Span wrapping everything a session actor logs.
#[must_use]
pub fn session_span(session_id: Uuid, scope: &Scope) -> Span {
    tracing::info_span!(
        "sync_session",
        %session_id,
        user_id = %scope.user_id,
        script_id = scope.script_id.as_deref().unwrap_or(""),
        version_id = scope.version_id.as_deref().unwrap_or(""),
    )
}
