// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 Mason Contributors

//! Locates bricks by path, git reference, or registry name, and materializes
//! them into a content-addressed on-disk cache.

mod collaborators;
mod hash;
mod lock;
mod resolver;

pub use collaborators::{
    Logger, NoRegistryClient, ProcessOutput, ProcessRunner, ProgressHandle, RegistryClient,
    TokioProcessRunner, TracingLogger, NullLogger,
};
pub use hash::content_hash;
pub use lock::LockTable;
pub use resolver::{resolve, BrickRef, ResolvedBrick, ResolverError};
