//! Port definitions (hexagonal architecture interfaces)
//!
//! This module defines the port traits that form the boundaries of the
//! hexagonal architecture. Ports are interfaces that the domain core
//! depends on, but whose implementations live in adapter crates.
//!
//! ## Ports Overview
//!
//! - [`StorageAdapter`] - conditional-write object storage (S3, Drive, Dropbox, local folder)
//! - [`VcsEngine`] - the external version-control engine, invoked as a subprocess
//! - [`ChainRepository`] - persistent storage for configured remotes and their bookkeeping

pub mod chain_repository;
pub mod storage_adapter;
pub mod vcs_engine;

pub use chain_repository::ChainRepository;
pub use storage_adapter::{ObjectContent, StorageAdapter, Tokens, TOKEN_REFRESH_SKEW};
pub use vcs_engine::{ObjectKind, VcsEngine};
