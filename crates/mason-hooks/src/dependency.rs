// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 Mason Contributors

//! Hook dependency provisioning: the brick's dependency-manifest bytes get
//! hashed with sha1 (distinct from the cache key's sha256) and installed
//! under `<tmp>/.mason/<sha1>/`. First caller wins; later callers observe
//! the completed install via an OS file lock.

use anyhow::{Context, Result};
use async_trait::async_trait;
use fs2::FileExt;
use sha1::{Digest, Sha1};
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};

#[async_trait]
pub trait DependencyInstaller: Send + Sync {
    async fn install(&self, manifest_bytes: &[u8], install_dir: &Path) -> Result<()>;
}

/// Installs nothing; used when a brick's hook has no dependency manifest or
/// a caller explicitly opts out of provisioning (e.g. in tests).
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopDependencyInstaller;

#[async_trait]
impl DependencyInstaller for NoopDependencyInstaller {
    async fn install(&self, _manifest_bytes: &[u8], _install_dir: &Path) -> Result<()> {
        Ok(())
    }
}

/// Runs a configurable command (e.g. `pub get`, `npm install`) inside the
/// install directory after writing the manifest bytes to `manifest_file`.
pub struct CommandDependencyInstaller {
    pub manifest_file_name: String,
    pub program: String,
    pub args: Vec<String>,
    pub process_runner: Box<dyn mason_cache::ProcessRunner>,
}

#[async_trait]
impl DependencyInstaller for CommandDependencyInstaller {
    async fn install(&self, manifest_bytes: &[u8], install_dir: &Path) -> Result<()> {
        std::fs::create_dir_all(install_dir)
            .with_context(|| format!("create install dir {}", install_dir.display()))?;
        std::fs::write(install_dir.join(&self.manifest_file_name), manifest_bytes)
            .with_context(|| format!("write {}", self.manifest_file_name))?;

        let args: Vec<&str> = self.args.iter().map(String::as_str).collect();
        let out = self
            .process_runner
            .run(&self.program, &args, Some(install_dir), &[])
            .await?;
        if out.exit_code != 0 {
            anyhow::bail!("{}", String::from_utf8_lossy(&out.stderr));
        }
        Ok(())
    }
}

pub fn sha1_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha1::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

struct FileLockGuard(std::fs::File);

impl Drop for FileLockGuard {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.0);
    }
}

async fn acquire_file_lock(path: PathBuf) -> Result<FileLockGuard> {
    tokio::task::spawn_blocking(move || -> Result<FileLockGuard> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new().create(true).write(true).open(&path)?;
        file.lock_exclusive()?;
        Ok(FileLockGuard(file))
    })
    .await
    .context("lock worker task panicked")?
}

/// Ensures `<tmp_root>/.mason/<sha1(manifest_bytes)>/` contains an installed
/// dependency set, installing at most once across concurrent callers.
pub async fn ensure_installed(
    manifest_bytes: &[u8],
    tmp_root: &Path,
    installer: &dyn DependencyInstaller,
) -> Result<PathBuf> {
    let key = sha1_hex(manifest_bytes);
    let install_dir = tmp_root.join(".mason").join(&key);
    let marker = install_dir.join(".installed");
    if marker.is_file() {
        return Ok(install_dir);
    }

    let lock_path = tmp_root.join(".mason").join(format!("{key}.lock"));
    let _guard = acquire_file_lock(lock_path).await?;

    if marker.is_file() {
        return Ok(install_dir);
    }

    std::fs::create_dir_all(&install_dir)
        .with_context(|| format!("create {}", install_dir.display()))?;
    installer.install(manifest_bytes, &install_dir).await?;
    std::fs::write(&marker, b"")?;

    Ok(install_dir)
}
