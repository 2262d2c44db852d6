//! Core domain model types for pipesync.
//!
//! This module contains the fundamental types used throughout the crate:
//! - Unit status and processing kind enums
//! - Unit identifiers
//! - Synchronization scopes

mod ids;
mod scope;
mod status;

pub use ids::UnitId;
pub use scope::{EventScope, Scope};
pub use status::{ProcessingKind, UnitStatus};
