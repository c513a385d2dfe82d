//! ignition-rs library
//!
//! This crate provides a first-boot provisioning agent: it acquires the
//! machine config from the first applicable provider, resolves the configs
//! it references, caches the result and hands it to provisioning stages.
//!
//! # Design Principles
//!
//! - **Safety First**: No unsafe code (`#![forbid(unsafe_code)]`)
//! - **Verified Inputs**: Referenced configs are checked against their
//!   declared hashes before they are parsed
//! - **No Secrets in Logs**: Diagnostics are redacted before they are logged

pub mod config;
pub mod engine;
pub mod fetch;
pub mod providers;
pub mod report;
pub mod stages;
pub mod state;

mod error;

pub use engine::Engine;
pub use error::IgnitionError;
pub use report::Report;
