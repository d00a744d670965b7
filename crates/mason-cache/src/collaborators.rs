// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 Mason Contributors

//! Collaborator contracts the core consumes: `Logger`, `ProcessRunner`,
//! `RegistryClient`. Defined here (the lowest crate that
//! needs them) and re-exported by `mason-generate` for callers who only
//! import the top-level crate; see DESIGN.md for why they don't live in
//! `mason-generate` itself (dependency-direction: `mason-cache` and
//! `mason-hooks` both need them, and neither may depend on `mason-generate`).

use anyhow::Result;
use async_trait::async_trait;
use std::path::Path;
use std::process::Stdio;

pub trait ProgressHandle: Send {
    fn update(&mut self, msg: &str);
    fn done(&mut self);
}

pub trait Logger: Send + Sync {
    fn info(&self, msg: &str);
    fn warn(&self, msg: &str);
    fn err(&self, msg: &str);
    fn detail(&self, msg: &str);
    fn progress(&self, label: &str) -> Box<dyn ProgressHandle>;
}

/// A `Logger` that routes everything through `tracing` rather than
/// calling `println!` from core crates.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLogger;

struct TracingProgress {
    label: String,
}

impl ProgressHandle for TracingProgress {
    fn update(&mut self, msg: &str) {
        tracing::info!(label = %self.label, "{msg}");
    }
    fn done(&mut self) {
        tracing::info!(label = %self.label, "done");
    }
}

impl Logger for TracingLogger {
    fn info(&self, msg: &str) {
        tracing::info!("{msg}");
    }
    fn warn(&self, msg: &str) {
        tracing::warn!("{msg}");
    }
    fn err(&self, msg: &str) {
        tracing::error!("{msg}");
    }
    fn detail(&self, msg: &str) {
        tracing::debug!("{msg}");
    }
    fn progress(&self, label: &str) -> Box<dyn ProgressHandle> {
        tracing::info!(label, "progress_start");
        Box::new(TracingProgress {
            label: label.to_string(),
        })
    }
}

/// A `Logger` that discards everything; used by tests and library callers
/// that don't want CLI-shaped progress output.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullLogger;

struct NullProgress;
impl ProgressHandle for NullProgress {
    fn update(&mut self, _msg: &str) {}
    fn done(&mut self) {}
}

impl Logger for NullLogger {
    fn info(&self, _msg: &str) {}
    fn warn(&self, _msg: &str) {}
    fn err(&self, _msg: &str) {}
    fn detail(&self, _msg: &str) {}
    fn progress(&self, _label: &str) -> Box<dyn ProgressHandle> {
        Box::new(NullProgress)
    }
}

#[derive(Debug, Clone)]
pub struct ProcessOutput {
    pub exit_code: i32,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

#[async_trait]
pub trait ProcessRunner: Send + Sync {
    async fn run(
        &self,
        cmd: &str,
        args: &[&str],
        cwd: Option<&Path>,
        env: &[(&str, &str)],
    ) -> Result<ProcessOutput>;
}

/// The real adapter, backed by `tokio::process::Command`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioProcessRunner;

#[async_trait]
impl ProcessRunner for TokioProcessRunner {
    async fn run(
        &self,
        cmd: &str,
        args: &[&str],
        cwd: Option<&Path>,
        env: &[(&str, &str)],
    ) -> Result<ProcessOutput> {
        let mut command = tokio::process::Command::new(cmd);
        command.args(args);
        for (k, v) in env {
            command.env(k, v);
        }
        if let Some(cwd) = cwd {
            command.current_dir(cwd);
        }
        command.stdin(Stdio::null());
        command.stdout(Stdio::piped());
        command.stderr(Stdio::piped());

        tracing::info!(cmd, ?args, "process_start");
        let out = command.output().await?;
        let exit_code = out.status.code().unwrap_or(1);
        tracing::info!(cmd, exit_code, "process_exit");

        Ok(ProcessOutput {
            exit_code,
            stdout: out.stdout,
            stderr: out.stderr,
        })
    }
}

#[async_trait]
pub trait RegistryClient: Send + Sync {
    async fn latest_version(&self, name: &str, constraint: &str) -> Result<semver::Version>;
    async fn download(&self, name: &str, version: &semver::Version) -> Result<Vec<u8>>;
}

/// The default adapter when no registry collaborator is wired up: every call
/// fails with `NetworkDisabled`-shaped behavior, so that disabling network
/// access fails fast without ever reaching HTTP.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoRegistryClient;

#[async_trait]
impl RegistryClient for NoRegistryClient {
    async fn latest_version(&self, _name: &str, _constraint: &str) -> Result<semver::Version> {
        anyhow::bail!("no RegistryClient configured")
    }
    async fn download(&self, _name: &str, _version: &semver::Version) -> Result<Vec<u8>> {
        anyhow::bail!("no RegistryClient configured")
    }
}
