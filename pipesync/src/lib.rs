//! # Pipesync
//!
//! Client-side progress synchronization for dependency-ordered analysis
//! pipelines.
//!
//! A backend runs long analysis units (script breakdown, shot lists,
//! storyboard images, ...) and streams their progress over a WebSocket.
//! Events arrive out of order, duplicated or not at all. Pipesync keeps a
//! consistent view anyway:
//!
//! - **Dependency graph**: units grouped into ordered stages, validated as a DAG
//! - **Reconciliation**: snapshots, heartbeats and incremental updates merged
//!   so the newest timestamp always wins
//! - **Aggregation**: stage and overall percentages derived from unit statuses
//! - **Health monitoring**: silent connections detected, refreshed and
//!   reconnected
//! - **Sessions**: one actor per watched scope over a shared transport
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use pipesync::prelude::*;
//! use std::sync::Arc;
//!
//! init_tracing(LogFormat::Plain);
//!
//! let manager = SessionManager::websocket(
//!     SyncConfig::default().with_ws_url("wss://api.example.com/progress"),
//!     Arc::new(catalog::script_production()),
//! );
//! let mut session = manager.open(Scope::pipeline_run("user", "script", "v3")).await;
//!
//! let mut changes = session.watch_state();
//! while changes.changed().await.is_ok() {
//!     println!("overall {}%", session.overall_progress());
//! }
//! manager.close(&mut session).await;
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod config;
pub mod core;
pub mod errors;
pub mod events;
pub mod graph;
pub mod health;
pub mod observability;
pub mod progress;
pub mod protocol;
pub mod reconcile;
pub mod session;
pub mod testing;
pub mod transport;
pub mod utils;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::config::SyncConfig;
    pub use crate::core::{ProcessingKind, Scope, UnitId, UnitStatus};
    pub use crate::errors::{GraphError, PipesyncError, TransportError};
    pub use crate::events::{CollectingEventSink, EventSink, LoggingEventSink, NoOpEventSink};
    pub use crate::graph::{catalog, DependencyGraph, GraphBuilder, GraphConfig};
    pub use crate::health::{HealthState, HealthThresholds};
    pub use crate::observability::{init_tracing, LogFormat};
    pub use crate::progress::{overall_progress, stage_progress, StageProgressView};
    pub use crate::protocol::{parse_frame, InboundEvent, OutboundRequest};
    pub use crate::reconcile::{ReconciledState, Reconciler};
    pub use crate::session::{ConnectionStatus, Session, SessionManager};
    pub use crate::transport::{Transport, WebSocketTransport};
    pub use crate::utils::Timestamp;
}
