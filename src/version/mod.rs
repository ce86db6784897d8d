//! Version resolution layer for the module registry
//!
//! This module turns rows read from a registry store into ordered version
//! listings, package lookups and assembled module versions.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │  RowSource  │────▶│  Resolver   │────▶│  Assembler  │
//! │  (storage)  │     │  (facade)   │     │(per-version)│
//! └─────────────┘     └─────────────┘     └─────────────┘
//!        │                                       │
//!        ▼                                       ▼
//! ┌─────────────┐                         ┌─────────────┐
//! │   Series    │                         │   License   │
//! │ (v2+ paths) │                         │ (zip, sort) │
//! └─────────────┘                         └─────────────┘
//! ```
//!
//! # Modules
//!
//! - [`resolver`]: Async facade with argument validation and deadlines
//! - [`store`]: Row source trait, row types and cancellation token
//! - [`assembler`]: Folds package rows into a [`types::Version`]
//! - [`semver`]: Newest-first version ordering and version classification
//! - [`series`]: Module series and package suffix matching
//! - [`license`]: License metadata pairing and ordering
//! - [`error`]: Error types for resolver and storage operations
//! - [`types`]: Common types like `VersionInfo` and `Package`

pub mod assembler;
pub mod error;
pub mod license;
pub mod resolver;
pub mod semver;
pub mod series;
pub mod store;
pub mod types;
