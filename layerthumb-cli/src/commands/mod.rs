//! CLI command implementations.
//!
//! Each subcommand has its own module with argument definitions and handlers.
//!
//! # Command Modules
//!
//! - [`capture`] - Store thumbnails from an externally rendered image
//! - [`config`] - Configuration management (path, init)
//! - [`get`] - Fetch a thumbnail, generating it on a cache miss
//! - [`status`] - Report FRESH, STALE or ABSENT for an entity

pub mod capture;
pub mod common;
pub mod config;
pub mod get;
pub mod status;
