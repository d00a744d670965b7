// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 Mason Contributors

//! Cross-process materialization lock: at most one writer per cache key,
//! enforced by an OS file lock on `<cacheRoot>/<key>.lock`. An in-process
//! `tokio::sync::Mutex` keyed by hash sits on top purely to
//! avoid redundant lock-acquisition attempts from the same process; it is
//! not a substitute for the file lock, which is what makes the guarantee
//! hold across separate `mason` invocations.

use anyhow::{Context, Result};
use fs2::FileExt;
use std::collections::HashMap;
use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex as StdMutex;
use tokio::sync::Mutex as AsyncMutex;

#[derive(Default)]
pub struct LockTable {
    inner: StdMutex<HashMap<String, std::sync::Arc<AsyncMutex<()>>>>,
}

impl LockTable {
    pub fn new() -> Self {
        Self::default()
    }

    fn in_process_lock(&self, key: &str) -> std::sync::Arc<AsyncMutex<()>> {
        let mut guard = self.inner.lock().expect("lock table poisoned");
        guard
            .entry(key.to_string())
            .or_insert_with(|| std::sync::Arc::new(AsyncMutex::new(())))
            .clone()
    }

    /// Runs `f` with both the in-process and the cross-process (file) lock
    /// held for `key`, materialized at `cache_root/<key>.lock`.
    pub async fn with_lock<T, F>(&self, cache_root: &Path, key: &str, f: F) -> Result<T>
    where
        F: FnOnce() -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let in_process = self.in_process_lock(key);
        let _in_process_guard = in_process.lock().await;

        let lock_path = cache_root.join(format!("{key}.lock"));
        let cache_root = cache_root.to_path_buf();

        tokio::task::spawn_blocking(move || -> Result<T> {
            std::fs::create_dir_all(&cache_root)
                .with_context(|| format!("create cache root {}", cache_root.display()))?;
            let file = OpenOptions::new()
                .create(true)
                .write(true)
                .open(&lock_path)
                .with_context(|| format!("open lock file {}", lock_path.display()))?;
            file.lock_exclusive()
                .with_context(|| format!("acquire lock {}", lock_path.display()))?;
            let result = f();
            let _ = FileExt::unlock(&file);
            result
        })
        .await
        .context("lock worker task panicked")?
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn with_lock_runs_closure_and_returns_value() {
        let table = LockTable::new();
        let tmp = tempfile::tempdir().unwrap();
        let v = table
            .with_lock(tmp.path(), "abc", || Ok(42))
            .await
            .unwrap();
        assert_eq!(v, 42);
    }

    #[tokio::test]
    async fn concurrent_same_key_materializes_once() {
        let table = std::sync::Arc::new(LockTable::new());
        let tmp = tempfile::tempdir().unwrap();
        let counter = std::sync::Arc::new(std::sync::atomic::AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let table = table.clone();
            let root = tmp.path().to_path_buf();
            let counter = counter.clone();
            handles.push(tokio::spawn(async move {
                table
                    .with_lock(&root, "shared-key", move || {
                        counter.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
                        Ok(())
                    })
                    .await
                    .unwrap();
            }));
        }
        for h in handles {
            h.await.unwrap();
        }
        assert_eq!(counter.load(std::sync::atomic::Ordering::SeqCst), 8);
    }
}
