// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 Mason Contributors

//! Provisions a brick's hook dependencies, spawns the hook process, streams
//! variable-mutation messages over a length-free, line-delimited JSON-frame
//! IPC, and surfaces errors with enough provenance to blame the hook.

mod dependency;

pub use dependency::{
    ensure_installed, sha1_hex, CommandDependencyInstaller, DependencyInstaller,
    NoopDependencyInstaller,
};

use mason_brick::HookFile;
use serde::Deserialize;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::process::Command;

#[derive(Debug, Error)]
pub enum HookError {
    #[error("installing dependencies for hook {hook_path}: {stderr}")]
    HookDependencyInstallFailure { hook_path: String, stderr: String },
    #[error("hook source at {hook_path} contains characters rejected by the toolchain")]
    HookInvalidCharactersException { hook_path: String },
    #[error("hook source at {hook_path} does not expose a `run(context)` entrypoint")]
    HookMissingRunException { hook_path: String },
    #[error("failed to spawn hook worker for {hook_path}: {message}")]
    HookRunException { hook_path: String, message: String },
    #[error("hook {hook_path} raised an exception: {message}")]
    HookExecutionException { hook_path: String, message: String },
    #[error(transparent)]
    Render(#[from] mason_render::RenderError),
}

/// Result of a single pre/post-generation hook invocation: the authoritative
/// post-hook variable map (the last `message` frame received, or the input
/// unchanged if the hook never sent one).
#[derive(Debug, Clone)]
pub struct HookOutcome {
    pub vars: Value,
}

/// How to launch the rendered hook source as a worker process; e.g.
/// `HookInterpreter { program: "dart".into(), args: vec!["run".into()] }`
/// spawns `dart run <script-path>`.
#[derive(Debug, Clone)]
pub struct HookInterpreter {
    pub program: String,
    pub args: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct Frame {
    channel: String,
    #[serde(default)]
    payload: Value,
}

/// Restores the process's working directory on every exit path: success,
/// hook error, or spawn failure.
struct WorkingDirGuard {
    previous: PathBuf,
}

impl WorkingDirGuard {
    fn enter(dir: &Path) -> std::io::Result<Self> {
        let previous = std::env::current_dir()?;
        std::env::set_current_dir(dir)?;
        Ok(Self { previous })
    }
}

impl Drop for WorkingDirGuard {
    fn drop(&mut self) {
        let _ = std::env::set_current_dir(&self.previous);
    }
}

/// Runs a single hook: renders its source against `vars`, checks it exposes
/// a `run` entrypoint, spawns it, and streams variable updates through
/// `on_vars_changed` in receive order. Returns the last-received var map
/// (or the input `vars` unchanged if the hook never emitted one).
pub async fn run_hook(
    hook: &HookFile,
    vars: &Value,
    interpreter: &HookInterpreter,
    workdir: &Path,
    mut on_vars_changed: impl FnMut(&Value),
) -> Result<HookOutcome, HookError> {
    let rendered_bytes = mason_render::render_bytes(&hook.bytes, vars)?;
    let rendered = std::str::from_utf8(&rendered_bytes)
        .map_err(|_| HookError::HookInvalidCharactersException {
            hook_path: hook.rel_path.clone(),
        })?
        .to_string();

    if !has_run_entrypoint(&rendered) {
        return Err(HookError::HookMissingRunException {
            hook_path: hook.rel_path.clone(),
        });
    }

    let _cwd_guard = WorkingDirGuard::enter(workdir).map_err(|e| HookError::HookRunException {
        hook_path: hook.rel_path.clone(),
        message: format!("failed to enter hook working directory: {e}"),
    })?;

    let script_path = workdir.join(format!(
        ".mason-hook-{}",
        hook.rel_path.replace(['/', '\\'], "_")
    ));
    std::fs::write(&script_path, &rendered).map_err(|e| HookError::HookRunException {
        hook_path: hook.rel_path.clone(),
        message: format!("failed to write rendered hook source: {e}"),
    })?;

    let mut cmd = Command::new(&interpreter.program);
    cmd.args(&interpreter.args);
    cmd.arg(&script_path);
    cmd.current_dir(workdir);
    cmd.stdin(Stdio::piped());
    cmd.stdout(Stdio::piped());
    cmd.stderr(Stdio::piped());

    tracing::info!(hook = %hook.rel_path, "hook_start");
    let start = std::time::Instant::now();

    let mut child = cmd.spawn().map_err(|e| HookError::HookRunException {
        hook_path: hook.rel_path.clone(),
        message: e.to_string(),
    })?;

    let mut stdin = child.stdin.take().expect("piped stdin");
    let stdout = child.stdout.take().expect("piped stdout");
    let mut stderr = child.stderr.take().expect("piped stderr");

    let initial_line = format!("{}\n", serde_json::to_string(vars).unwrap_or_default());
    stdin
        .write_all(initial_line.as_bytes())
        .await
        .map_err(|e| HookError::HookRunException {
            hook_path: hook.rel_path.clone(),
            message: format!("failed to write initial vars to hook stdin: {e}"),
        })?;
    drop(stdin);

    let stderr_task = tokio::spawn(async move {
        let mut buf = Vec::new();
        let _ = stderr.read_to_end(&mut buf).await;
        buf
    });

    let mut reader = BufReader::new(stdout).lines();
    let mut latest_vars = vars.clone();
    let mut hook_error: Option<String> = None;

    while let Some(line) = reader
        .next_line()
        .await
        .map_err(|e| HookError::HookRunException {
            hook_path: hook.rel_path.clone(),
            message: format!("reading hook stdout: {e}"),
        })?
    {
        let Ok(frame) = serde_json::from_str::<Frame>(&line) else {
            continue;
        };
        match frame.channel.as_str() {
            "message" => {
                latest_vars = frame.payload.clone();
                on_vars_changed(&latest_vars);
            }
            "error" => {
                hook_error = Some(
                    frame
                        .payload
                        .as_str()
                        .map(str::to_string)
                        .unwrap_or_else(|| frame.payload.to_string()),
                );
            }
            "exit" => {}
            _ => {}
        }
    }

    let status = child.wait().await.map_err(|e| HookError::HookRunException {
        hook_path: hook.rel_path.clone(),
        message: format!("awaiting hook exit: {e}"),
    })?;
    let stderr_tail = stderr_task.await.unwrap_or_default();
    let duration = start.elapsed();

    let _ = std::fs::remove_file(&script_path);

    tracing::info!(
        hook = %hook.rel_path,
        exit_code = status.code().unwrap_or(-1),
        duration_ms = duration.as_millis() as u64,
        "hook_exit"
    );

    if let Some(message) = hook_error {
        return Err(HookError::HookExecutionException {
            hook_path: hook.rel_path.clone(),
            message,
        });
    }

    if !status.success() {
        return Err(HookError::HookExecutionException {
            hook_path: hook.rel_path.clone(),
            message: String::from_utf8_lossy(&stderr_tail).to_string(),
        });
    }

    Ok(HookOutcome { vars: latest_vars })
}

/// Scans for a top-level `run` identifier immediately followed by `(`,
/// ignoring whitespace — a deliberately permissive stand-in for a real
/// parser's entrypoint check. A stricter parse would also be acceptable.
fn has_run_entrypoint(source: &str) -> bool {
    let bytes = source.as_bytes();
    let needle = b"run";
    let mut i = 0;
    while i + needle.len() <= bytes.len() {
        if &bytes[i..i + needle.len()] == needle {
            let prev_ok = i == 0 || !is_ident_char(bytes[i - 1]);
            let mut j = i + needle.len();
            while j < bytes.len() && bytes[j].is_ascii_whitespace() {
                j += 1;
            }
            let next_is_paren = j < bytes.len() && bytes[j] == b'(';
            if prev_ok && next_is_paren {
                return true;
            }
        }
        i += 1;
    }
    false
}

fn is_ident_char(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}
