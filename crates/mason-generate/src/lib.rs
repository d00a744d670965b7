// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 Mason Contributors

//! Orchestrates the Resolver → Loader → (Generator ↔ Renderer ↔ HookRunner)
//! pipeline: validates variables, runs `preGen`/`postGen`, renders and
//! writes each template file under the brick's collision policy, and
//! reports the result.

mod collision;
mod variables;

pub use collision::{CollisionPolicy, Disposition, FileConflictResolver, OnConflict};
pub use variables::VariableValidationError;

// Re-exported so a caller only needs `mason-generate` on its dependency
// line to assemble a full pipeline; the traits are defined in `mason-cache`
// to avoid a dependency cycle (see DESIGN.md).
pub use mason_cache::{
    Logger, NoRegistryClient, NullLogger, ProcessOutput, ProcessRunner, ProgressHandle,
    RegistryClient, TokioProcessRunner, TracingLogger,
};
pub use mason_hooks::{
    CommandDependencyInstaller, DependencyInstaller, HookError, HookInterpreter,
    NoopDependencyInstaller,
};

pub use mason_brick::{
    Brick, HookFile, Hooks, LoaderError, TemplateFile, VarType, VariableDef,
};
pub use mason_cache::{resolve, BrickRef, ResolvedBrick, ResolverError};

use serde_json::Value;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use variables::validate_and_coerce;

/// A variable prompting collaborator. The core never invokes
/// this itself — `generate` assumes the caller already prompted and
/// supplies a complete `vars` map — but the contract is part of the crate's
/// public surface so a CLI layer built on top of `mason-generate` has a
/// shared trait to implement against.
pub trait Prompter: Send + Sync {
    fn prompt(&self, def: &VariableDef, default: Option<&Value>) -> anyhow::Result<Value>;
}

/// The default `Prompter`: errors unconditionally, since the core never
/// prompts on its own.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoPrompter;

impl Prompter for NoPrompter {
    fn prompt(&self, def: &VariableDef, _default: Option<&Value>) -> anyhow::Result<Value> {
        anyhow::bail!(
            "the core never prompts; variable {:?} needed an outward prompt",
            def.prompt
        )
    }
}

/// Process-wide configuration the core accepts by value — never read from
/// `std::env` inside `mason-cache`/`mason-generate`/`mason-hooks`. The
/// `mason-cli` binary is the one place environment variables are folded
/// into this struct.
#[derive(Clone)]
pub struct CoreConfig {
    pub cache_root: PathBuf,
    pub collision_policy: CollisionPolicy,
    pub hook_timeout: Option<Duration>,
    pub allow_network: bool,
}

/// How to run a brick's hooks: the worker interpreter, the dependency
/// installer, and the scratch root dependency installs are keyed under.
#[derive(Clone)]
pub struct HookConfig {
    pub interpreter: HookInterpreter,
    pub dependency_installer: Arc<dyn DependencyInstaller>,
    pub tmp_root: PathBuf,
}

#[derive(Debug, Clone)]
pub struct GeneratedFile {
    pub abs_path: PathBuf,
    /// Forward-slash-normalized, relative to `target_dir`, so the same
    /// brick and vars always produce the same report byte-for-byte.
    pub rel_path: String,
    pub disposition: Disposition,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, Default)]
pub struct GenerateReport {
    pub files: Vec<GeneratedFile>,
}

#[derive(Debug, Error)]
#[error("failed to write {path}: {cause}")]
pub struct FileWriteFailure {
    pub path: PathBuf,
    pub cause: String,
}

#[derive(Debug, Error)]
pub enum GenerateError {
    #[error(transparent)]
    VariableValidation(#[from] VariableValidationError),
    #[error(transparent)]
    Render(#[from] mason_render::RenderError),
    #[error(transparent)]
    Hook(#[from] HookError),
    #[error(transparent)]
    FileWrite(#[from] FileWriteFailure),
    #[error("brick declares a {phase} hook but no HookConfig collaborator was supplied")]
    HookConfigMissing { phase: &'static str },
    #[error("postGen hook failed after writing {files_written} file(s): {cause}")]
    PostGenFailed {
        report: GenerateReport,
        files_written: usize,
        cause: String,
    },
}

/// Contract: `generate(brick, targetDir, vars, policy, hooks?) ->
/// GenerateReport`. Validates/coerces vars, runs `preGen`, renders and
/// writes each template file in lexicographic order under the collision
/// policy, runs `postGen`, and returns the aggregate report.
pub async fn generate(
    brick: &Brick,
    target_dir: &Path,
    vars: Value,
    policy: &CollisionPolicy,
    hooks: Option<&HookConfig>,
    logger: &dyn Logger,
) -> Result<GenerateReport, GenerateError> {
    let mut vars = validate_and_coerce(&brick.variables, &vars)?;

    if let Some(pre) = &brick.hooks.pre_gen {
        logger.info("running preGen hook");
        vars = run_hook_phase(pre, &brick.hooks.manifest, &vars, hooks, target_dir, "preGen", logger)
            .await?;
    }

    let renderer = mason_render::Renderer::new();
    let mut files = Vec::new();
    let mut resolved_cache: HashMap<String, OnConflict> = HashMap::new();

    for tf in &brick.template_files {
        let rendered_rel = renderer.render(&tf.rel_path, &vars)?;
        if rendered_rel.split('/').any(str::is_empty) {
            // A section evaluated to empty and consumed the segment —
            // skip this file entirely.
            continue;
        }
        mason_brick::ensure_safe_rel_path_str(&rendered_rel).map_err(|e| FileWriteFailure {
            path: PathBuf::from(&rendered_rel),
            cause: e.to_string(),
        })?;
        let rendered_bytes = renderer.render_bytes(&tf.bytes, &vars)?;
        let abs_path = target_dir.join(&rendered_rel);

        let existing = if abs_path.is_file() {
            Some(std::fs::read(&abs_path).map_err(|e| FileWriteFailure {
                path: abs_path.clone(),
                cause: e.to_string(),
            })?)
        } else {
            None
        };

        let is_conflicting =
            existing.is_some() && existing.as_deref() != Some(rendered_bytes.as_slice());

        let effective_conflict = if is_conflicting && policy.on_conflict == OnConflict::Prompt {
            if let Some(cached) = resolved_cache.get(&rendered_rel) {
                *cached
            } else {
                let resolver = policy
                    .resolver
                    .as_ref()
                    .expect("CollisionPolicy::Prompt requires a FileConflictResolver");
                let resolved =
                    resolver.resolve(&abs_path, existing.as_deref().unwrap(), &rendered_bytes);
                resolved_cache.insert(rendered_rel.clone(), resolved);
                resolved
            }
        } else {
            policy.on_conflict
        };

        let (disposition, write_bytes) =
            collision::decide(existing.as_deref(), &rendered_bytes, effective_conflict);

        if let Some(bytes) = &write_bytes {
            if let Some(parent) = abs_path.parent() {
                std::fs::create_dir_all(parent).map_err(|e| FileWriteFailure {
                    path: parent.to_path_buf(),
                    cause: e.to_string(),
                })?;
            }
            std::fs::write(&abs_path, bytes).map_err(|e| FileWriteFailure {
                path: abs_path.clone(),
                cause: e.to_string(),
            })?;
        }
        logger.detail(&format!("{:?} {}", disposition, rendered_rel));

        let recorded_bytes = write_bytes.unwrap_or_else(|| existing.clone().unwrap_or_default());
        files.push(GeneratedFile {
            abs_path,
            rel_path: rendered_rel,
            disposition,
            bytes: recorded_bytes,
        });
    }

    let report = GenerateReport { files };

    if let Some(post) = &brick.hooks.post_gen {
        logger.info("running postGen hook");
        match run_hook_phase(post, &brick.hooks.manifest, &vars, hooks, target_dir, "postGen", logger)
            .await
        {
            Ok(_) => {}
            Err(e) => {
                let files_written = report.files.len();
                return Err(GenerateError::PostGenFailed {
                    report,
                    files_written,
                    cause: e.to_string(),
                });
            }
        }
    }

    Ok(report)
}

async fn run_hook_phase(
    hook: &HookFile,
    manifest: &Option<Vec<u8>>,
    vars: &Value,
    hooks: Option<&HookConfig>,
    target_dir: &Path,
    phase: &'static str,
    logger: &dyn Logger,
) -> Result<Value, GenerateError> {
    let config = hooks.ok_or(GenerateError::HookConfigMissing { phase })?;

    if let Some(manifest_bytes) = manifest {
        mason_hooks::ensure_installed(manifest_bytes, &config.tmp_root, config.dependency_installer.as_ref())
            .await
            .map_err(|e| HookError::HookDependencyInstallFailure {
                hook_path: hook.rel_path.clone(),
                stderr: format!("{e:#}"),
            })?;
    }

    let outcome = mason_hooks::run_hook(hook, vars, &config.interpreter, target_dir, |v| {
        logger.detail(&format!("{} set vars: {v}", hook.rel_path));
    })
    .await?;

    Ok(outcome.vars)
}
