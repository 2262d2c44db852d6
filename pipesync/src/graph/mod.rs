//! The dependency graph model.
//!
//! This module provides:
//! - Unit and stage declarations (loadable as configuration data)
//! - A validating builder
//! - The immutable [`DependencyGraph`] and its queries
//! - The built-in script production catalog

pub mod catalog;
mod builder;
mod dag;
mod decl;

pub use builder::GraphBuilder;
pub use dag::DependencyGraph;
pub use decl::{GraphConfig, Stage, StageDecl, UnitDecl};
