//! Use cases (interactors) for the CornCob sync protocol.
//!
//! This module contains the application use cases that orchestrate domain
//! entities and port interfaces. Use cases are thin coordinators that
//! delegate protocol rules to domain methods and I/O to ports.
//!
//! ## Use Cases
//!
//! - [`PushUseCase`] - publish a new link onto a remote's chain
//! - [`CloneUseCase`] - bootstrap a fresh local graph from a remote's initial link
//! - [`FetchUseCase`] - walk the chain and integrate missing bundles into private refs
//! - [`MergeUseCase`] - integrate fetched remote-tracking refs into local branches

pub mod clone;
pub mod fetch;
pub mod merge;
pub mod push;

pub use clone::CloneUseCase;
pub use fetch::{FetchOutcome, FetchUseCase};
pub use merge::MergeUseCase;
pub use push::{PushOutcome, PushUseCase};
