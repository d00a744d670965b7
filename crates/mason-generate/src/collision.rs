// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 Mason Contributors

//! The append/overwrite/skip/prompt collision matrix, implemented as a
//! pure function over byte slices so it is testable without touching a
//! filesystem.

use std::path::Path;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OnConflict {
    Prompt,
    Overwrite,
    Skip,
    Append,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    Created,
    Overwritten,
    Appended,
    Skipped,
    Identical,
}

/// Invoked once per conflicting destination when `on_conflict == Prompt`;
/// the result is cached for the remainder of a `generate` call. Must
/// never return `Prompt`.
pub trait FileConflictResolver: Send + Sync {
    fn resolve(&self, path: &Path, existing: &[u8], new: &[u8]) -> OnConflict;
}

#[derive(Clone)]
pub struct CollisionPolicy {
    pub on_conflict: OnConflict,
    pub resolver: Option<Arc<dyn FileConflictResolver>>,
}

impl CollisionPolicy {
    pub fn overwrite() -> Self {
        Self {
            on_conflict: OnConflict::Overwrite,
            resolver: None,
        }
    }

    pub fn skip() -> Self {
        Self {
            on_conflict: OnConflict::Skip,
            resolver: None,
        }
    }

    pub fn append() -> Self {
        Self {
            on_conflict: OnConflict::Append,
            resolver: None,
        }
    }

    pub fn prompt(resolver: Arc<dyn FileConflictResolver>) -> Self {
        Self {
            on_conflict: OnConflict::Prompt,
            resolver: Some(resolver),
        }
    }
}

/// The collision matrix itself. `on_conflict` must already be resolved to a
/// concrete action (never `Prompt`) — the `Prompt` branch is dispatched by
/// the caller before this function is reached, since resolving it requires
/// invoking the `FileConflictResolver` collaborator.
pub fn decide(existing: Option<&[u8]>, new: &[u8], on_conflict: OnConflict) -> (Disposition, Option<Vec<u8>>) {
    match existing {
        None => (Disposition::Created, Some(new.to_vec())),
        Some(e) if e == new => (Disposition::Identical, None),
        Some(e) => match on_conflict {
            OnConflict::Overwrite => (Disposition::Overwritten, Some(new.to_vec())),
            OnConflict::Append => {
                let mut combined = e.to_vec();
                combined.extend_from_slice(new);
                (Disposition::Appended, Some(combined))
            }
            OnConflict::Skip => (Disposition::Skipped, None),
            OnConflict::Prompt => {
                unreachable!("Prompt must be resolved by the caller before calling decide()")
            }
        },
    }
}
