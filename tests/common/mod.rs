//! Shared test utilities for toptalk integration harnesses.
//!
//! Import everything you need via `mod common; use common::*;` at the top of
//! each harness file. Pipelines built here run real `sh` fixture commands
//! against temp-dir logs, so harnesses that drive them must not pause tokio
//! time.

pub mod assertions;
pub mod builders;
pub mod fake_store;
pub mod fixtures;

pub use builders::*;
pub use fake_store::*;
pub use fixtures::*;
