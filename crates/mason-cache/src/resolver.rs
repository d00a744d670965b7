// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 Mason Contributors

use crate::collaborators::{Logger, ProcessRunner, RegistryClient};
use crate::hash::content_hash;
use crate::lock::LockTable;
use mason_brick::Brick;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// The resolution key: a discriminated union of path, git, or registry
/// bricks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BrickRef {
    Path {
        dir: PathBuf,
    },
    Git {
        url: String,
        git_ref: Option<String>,
        sub_path: Option<String>,
    },
    Registry {
        name: String,
        version_constraint: String,
    },
}

/// `{ref, canonicalCacheDir, brick, contentHash}`. Invariant: two
/// `ResolvedBrick`s with equal `content_hash` have byte-equal
/// `template_files` and hook bytes.
#[derive(Debug, Clone)]
pub struct ResolvedBrick {
    pub brick_ref: BrickRef,
    pub canonical_cache_dir: PathBuf,
    pub brick: Brick,
    pub content_hash: String,
}

#[derive(Debug, Error)]
pub enum ResolverError {
    #[error("git fetch failed for {url} (ref {git_ref:?}): {stderr}")]
    GitFetchFailure {
        url: String,
        git_ref: Option<String>,
        stderr: String,
    },
    #[error("registry error: {cause}")]
    RegistryError { cause: String },
    #[error("network access is disabled but ref {0:?} requires it")]
    NetworkDisabled(BrickRef),
    #[error("cache write failed: {cause}")]
    CacheWriteFailure { cause: String },
    #[error(transparent)]
    Loader(#[from] mason_brick::LoaderError),
}

/// Resolves `brick_ref` to a `ResolvedBrick`, materializing into
/// `<cache_root>/bricks/<key>/`.
pub async fn resolve(
    brick_ref: &BrickRef,
    cache_root: &Path,
    allow_network: bool,
    locks: &LockTable,
    process_runner: &dyn ProcessRunner,
    registry_client: &dyn RegistryClient,
    logger: &dyn Logger,
) -> Result<ResolvedBrick, ResolverError> {
    match brick_ref {
        BrickRef::Path { dir } => resolve_path(brick_ref, dir, cache_root, locks, logger).await,
        BrickRef::Git { .. } => {
            if !allow_network {
                return Err(ResolverError::NetworkDisabled(brick_ref.clone()));
            }
            resolve_git(brick_ref, cache_root, locks, process_runner, logger).await
        }
        BrickRef::Registry { .. } => {
            if !allow_network {
                return Err(ResolverError::NetworkDisabled(brick_ref.clone()));
            }
            resolve_registry(brick_ref, cache_root, locks, registry_client, logger).await
        }
    }
}

async fn resolve_path(
    brick_ref: &BrickRef,
    dir: &Path,
    cache_root: &Path,
    locks: &LockTable,
    logger: &dyn Logger,
) -> Result<ResolvedBrick, ResolverError> {
    let brick = mason_brick::load_from_dir(dir)?;
    materialize(brick_ref.clone(), brick, cache_root, locks, logger).await
}

async fn resolve_git(
    brick_ref: &BrickRef,
    cache_root: &Path,
    locks: &LockTable,
    process_runner: &dyn ProcessRunner,
    logger: &dyn Logger,
) -> Result<ResolvedBrick, ResolverError> {
    let BrickRef::Git {
        url,
        git_ref,
        sub_path,
    } = brick_ref
    else {
        unreachable!("resolve_git called with non-Git ref")
    };

    let tmp = tempfile::tempdir().map_err(|e| ResolverError::GitFetchFailure {
        url: url.clone(),
        git_ref: git_ref.clone(),
        stderr: format!("failed to create scratch dir: {e}"),
    })?;

    logger.detail(&format!("git clone --depth 1 {url}"));

    let mut args: Vec<&str> = vec!["clone", "--depth", "1"];
    if let Some(r) = git_ref {
        args.push("--branch");
        args.push(r.as_str());
    }
    let dest = tmp.path().to_string_lossy().to_string();
    args.push(url.as_str());
    args.push(dest.as_str());

    let output = process_runner
        .run("git", &args, None, &[])
        .await
        .map_err(|e| ResolverError::GitFetchFailure {
            url: url.clone(),
            git_ref: git_ref.clone(),
            stderr: e.to_string(),
        })?;

    if output.exit_code != 0 {
        return Err(ResolverError::GitFetchFailure {
            url: url.clone(),
            git_ref: git_ref.clone(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        });
    }

    let brick_dir = match sub_path {
        Some(sp) => tmp.path().join(sp),
        None => tmp.path().to_path_buf(),
    };

    let brick = mason_brick::load_from_dir(&brick_dir)?;
    materialize(brick_ref.clone(), brick, cache_root, locks, logger).await
}

async fn resolve_registry(
    brick_ref: &BrickRef,
    cache_root: &Path,
    locks: &LockTable,
    registry_client: &dyn RegistryClient,
    logger: &dyn Logger,
) -> Result<ResolvedBrick, ResolverError> {
    let BrickRef::Registry {
        name,
        version_constraint,
    } = brick_ref
    else {
        unreachable!("resolve_registry called with non-Registry ref")
    };

    let version = registry_client
        .latest_version(name, version_constraint)
        .await
        .map_err(|e| ResolverError::RegistryError {
            cause: e.to_string(),
        })?;

    let req =
        semver::VersionReq::parse(version_constraint).map_err(|e| ResolverError::RegistryError {
            cause: format!("invalid version constraint {version_constraint:?}: {e}"),
        })?;
    if !req.matches(&version) {
        return Err(ResolverError::RegistryError {
            cause: format!(
                "registry returned version {version} for {name}, which does not satisfy {version_constraint:?}"
            ),
        });
    }

    let key = format!("{name}_{version}");
    let target_dir = cache_root.join("bricks").join(&key);

    if target_dir.join("brick.yaml").is_file() {
        logger.detail(&format!("registry brick {key} already cached, skipping download"));
        let brick = mason_brick::load_from_dir(&target_dir)?;
        let hash = content_hash(&brick);
        return Ok(ResolvedBrick {
            brick_ref: brick_ref.clone(),
            canonical_cache_dir: target_dir,
            brick,
            content_hash: hash,
        });
    }

    let bytes = registry_client
        .download(name, &version)
        .await
        .map_err(|e| ResolverError::RegistryError {
            cause: e.to_string(),
        })?;

    let brick = mason_brick::load_from_bundle(&bytes)?;
    let hash = content_hash(&brick);

    let cache_root = cache_root.to_path_buf();
    let brick_for_write = brick.clone();
    let target_dir_for_write = target_dir.clone();
    locks
        .with_lock(&cache_root, &key, move || {
            write_to_temp_then_rename(&brick_for_write, &target_dir_for_write)
        })
        .await
        .map_err(|e| ResolverError::CacheWriteFailure {
            cause: e.to_string(),
        })?;

    Ok(ResolvedBrick {
        brick_ref: brick_ref.clone(),
        canonical_cache_dir: target_dir,
        brick,
        content_hash: hash,
    })
}

async fn materialize(
    brick_ref: BrickRef,
    brick: Brick,
    cache_root: &Path,
    locks: &LockTable,
    logger: &dyn Logger,
) -> Result<ResolvedBrick, ResolverError> {
    let hash = content_hash(&brick);
    let target_dir = cache_root.join("bricks").join(&hash);

    if target_dir.join("brick.yaml").is_file() {
        logger.detail(&format!("cache entry {hash} already materialized"));
    } else {
        let cache_root = cache_root.to_path_buf();
        let brick_for_write = brick.clone();
        let target_dir_for_write = target_dir.clone();
        locks
            .with_lock(&cache_root, &hash, move || {
                write_to_temp_then_rename(&brick_for_write, &target_dir_for_write)
            })
            .await
            .map_err(|e| ResolverError::CacheWriteFailure {
                cause: e.to_string(),
            })?;
    }

    Ok(ResolvedBrick {
        brick_ref,
        canonical_cache_dir: target_dir,
        brick,
        content_hash: hash,
    })
}

/// Write-to-temp-sibling-then-rename: stage the brick's files under a
/// scratch directory next to the target, then atomically rename it into
/// place so a concurrent reader never observes a partially populated
/// cache directory. Retried once on transient I/O failure.
fn write_to_temp_then_rename(brick: &Brick, target_dir: &Path) -> anyhow::Result<()> {
    if target_dir.join("brick.yaml").is_file() {
        return Ok(());
    }

    let parent = target_dir
        .parent()
        .ok_or_else(|| anyhow::anyhow!("cache target has no parent directory"))?;
    std::fs::create_dir_all(parent)?;

    let pid = std::process::id();
    let tmp_name = format!(
        ".tmp-{}-{pid}",
        target_dir.file_name().unwrap_or_default().to_string_lossy()
    );
    let tmp_dir = parent.join(tmp_name);

    let attempt = |tmp_dir: &Path| -> anyhow::Result<()> {
        if tmp_dir.exists() {
            std::fs::remove_dir_all(tmp_dir)?;
        }
        mason_brick::write_to_dir(brick, tmp_dir)?;
        Ok(())
    };

    if let Err(first_err) = attempt(&tmp_dir) {
        tracing::warn!(error = %first_err, "cache materialization failed, retrying once");
        attempt(&tmp_dir)?;
    }

    match std::fs::rename(&tmp_dir, target_dir) {
        Ok(()) => Ok(()),
        Err(e) => {
            let _ = std::fs::remove_dir_all(&tmp_dir);
            Err(anyhow::Error::new(e).context("rename cache temp dir into place"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborators::{NoRegistryClient, NullLogger, ProcessOutput, TokioProcessRunner};
    use async_trait::async_trait;
    use indexmap::IndexMap;
    use mason_brick::{Hooks, TemplateFile};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn sample_brick() -> Brick {
        Brick {
            name: "greeting".into(),
            description: "".into(),
            version: semver::Version::new(0, 1, 0),
            publish_to: None,
            variables: IndexMap::new(),
            template_files: vec![TemplateFile {
                rel_path: "GREETINGS.md".into(),
                bytes: b"Hi {{name}}!".to_vec(),
            }],
            hooks: Hooks::default(),
        }
    }

    fn write_brick_dir(dir: &Path) {
        std::fs::write(dir.join("brick.yaml"), "name: greeting\nversion: 0.1.0\n").unwrap();
        std::fs::create_dir_all(dir.join("__brick__")).unwrap();
        std::fs::write(dir.join("__brick__/GREETINGS.md"), "Hi {{name}}!").unwrap();
    }

    #[tokio::test]
    async fn resolving_path_ref_twice_is_idempotent() {
        let source = tempfile::tempdir().unwrap();
        write_brick_dir(source.path());
        let cache = tempfile::tempdir().unwrap();
        let locks = LockTable::new();
        let runner = TokioProcessRunner;
        let registry = NoRegistryClient;
        let logger = NullLogger;

        let brick_ref = BrickRef::Path {
            dir: source.path().to_path_buf(),
        };

        let first = resolve(
            &brick_ref,
            cache.path(),
            false,
            &locks,
            &runner,
            &registry,
            &logger,
        )
        .await
        .unwrap();
        let second = resolve(
            &brick_ref,
            cache.path(),
            false,
            &locks,
            &runner,
            &registry,
            &logger,
        )
        .await
        .unwrap();

        assert_eq!(first.content_hash, second.content_hash);
        assert_eq!(first.canonical_cache_dir, second.canonical_cache_dir);
    }

    #[tokio::test]
    async fn network_disabled_fails_fast_for_git_and_registry() {
        let cache = tempfile::tempdir().unwrap();
        let locks = LockTable::new();
        let runner = TokioProcessRunner;
        let registry = NoRegistryClient;
        let logger = NullLogger;

        let git_ref = BrickRef::Git {
            url: "https://example.invalid/brick.git".into(),
            git_ref: None,
            sub_path: None,
        };
        let err = resolve(
            &git_ref,
            cache.path(),
            false,
            &locks,
            &runner,
            &registry,
            &logger,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ResolverError::NetworkDisabled(_)));

        let registry_ref = BrickRef::Registry {
            name: "widget".into(),
            version_constraint: "^0.1.0".into(),
        };
        let err = resolve(
            &registry_ref,
            cache.path(),
            false,
            &locks,
            &runner,
            &registry,
            &logger,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ResolverError::NetworkDisabled(_)));
    }

    struct CountingRegistry {
        downloads: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl RegistryClient for CountingRegistry {
        async fn latest_version(&self, _name: &str, _constraint: &str) -> anyhow::Result<semver::Version> {
            Ok(semver::Version::new(0, 1, 3))
        }
        async fn download(&self, _name: &str, _version: &semver::Version) -> anyhow::Result<Vec<u8>> {
            self.downloads.fetch_add(1, Ordering::SeqCst);
            let doc = mason_bundle::BundleDocument {
                name: "widget".into(),
                description: "".into(),
                version: "0.1.3".into(),
                vars: serde_json::json!({}),
                files: vec![mason_bundle::BundleEntry {
                    path: "a.txt".into(),
                    bytes: b"a".to_vec(),
                    is_text: true,
                }],
                hooks: vec![],
            };
            Ok(mason_bundle::encode_universal(&doc).unwrap())
        }
    }

    #[tokio::test]
    async fn registry_second_resolve_skips_download() {
        let cache = tempfile::tempdir().unwrap();
        let locks = LockTable::new();
        let runner = TokioProcessRunner;
        let downloads = Arc::new(AtomicUsize::new(0));
        let registry = CountingRegistry {
            downloads: downloads.clone(),
        };
        let logger = NullLogger;

        let brick_ref = BrickRef::Registry {
            name: "widget".into(),
            version_constraint: "^0.1.0".into(),
        };

        let first = resolve(
            &brick_ref,
            cache.path(),
            true,
            &locks,
            &runner,
            &registry,
            &logger,
        )
        .await
        .unwrap();
        assert_eq!(first.canonical_cache_dir, cache.path().join("bricks/widget_0.1.3"));
        assert_eq!(downloads.load(Ordering::SeqCst), 1);

        let _second = resolve(
            &brick_ref,
            cache.path(),
            true,
            &locks,
            &runner,
            &registry,
            &logger,
        )
        .await
        .unwrap();
        assert_eq!(downloads.load(Ordering::SeqCst), 1, "second resolve should skip download");
    }

    struct FailingProcessRunner;
    #[async_trait]
    impl ProcessRunner for FailingProcessRunner {
        async fn run(
            &self,
            _cmd: &str,
            _args: &[&str],
            _cwd: Option<&Path>,
            _env: &[(&str, &str)],
        ) -> anyhow::Result<ProcessOutput> {
            Ok(ProcessOutput {
                exit_code: 128,
                stdout: Vec::new(),
                stderr: b"fatal: repository not found".to_vec(),
            })
        }
    }

    #[tokio::test]
    async fn git_clone_failure_surfaces_git_fetch_failure() {
        let cache = tempfile::tempdir().unwrap();
        let locks = LockTable::new();
        let runner = FailingProcessRunner;
        let registry = NoRegistryClient;
        let logger = NullLogger;

        let brick_ref = BrickRef::Git {
            url: "https://example.invalid/nope.git".into(),
            git_ref: None,
            sub_path: None,
        };
        let err = resolve(
            &brick_ref,
            cache.path(),
            true,
            &locks,
            &runner,
            &registry,
            &logger,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ResolverError::GitFetchFailure { .. }));
    }

    struct MismatchedRegistry;
    #[async_trait]
    impl RegistryClient for MismatchedRegistry {
        async fn latest_version(&self, _name: &str, _constraint: &str) -> anyhow::Result<semver::Version> {
            Ok(semver::Version::new(2, 0, 0))
        }
        async fn download(&self, _name: &str, _version: &semver::Version) -> anyhow::Result<Vec<u8>> {
            unreachable!("download must not be called once the version fails to match")
        }
    }

    #[tokio::test]
    async fn registry_version_not_matching_constraint_is_rejected() {
        let cache = tempfile::tempdir().unwrap();
        let locks = LockTable::new();
        let runner = TokioProcessRunner;
        let registry = MismatchedRegistry;
        let logger = NullLogger;

        let brick_ref = BrickRef::Registry {
            name: "widget".into(),
            version_constraint: "^0.1.0".into(),
        };

        let err = resolve(
            &brick_ref,
            cache.path(),
            true,
            &locks,
            &runner,
            &registry,
            &logger,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ResolverError::RegistryError { .. }));
    }
}
