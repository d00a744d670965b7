// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 Mason Contributors

//! A failing hook dependency install or a missing hook entrypoint must
//! abort generation before any template file is written.

use async_trait::async_trait;
use indexmap::IndexMap;
use mason_brick::{Brick, HookFile, Hooks, TemplateFile};
use mason_generate::{generate, CollisionPolicy, GenerateError, HookConfig, NullLogger};
use mason_hooks::{DependencyInstaller, HookError, HookInterpreter};
use serde_json::json;
use std::path::Path;
use std::sync::Arc;

fn brick_with_hook(hooks: Hooks) -> Brick {
    Brick {
        name: "greeting".into(),
        description: String::new(),
        version: semver::Version::new(0, 1, 0),
        publish_to: None,
        variables: IndexMap::new(),
        template_files: vec![TemplateFile {
            rel_path: "GREETINGS.md".into(),
            bytes: b"Hi!".to_vec(),
        }],
        hooks,
    }
}

struct AlwaysFailsInstaller;

#[async_trait]
impl DependencyInstaller for AlwaysFailsInstaller {
    async fn install(&self, _manifest_bytes: &[u8], _install_dir: &Path) -> anyhow::Result<()> {
        anyhow::bail!("boom")
    }
}

#[tokio::test]
async fn e7_failing_dependency_install_reports_and_writes_nothing() {
    let brick = brick_with_hook(Hooks {
        pre_gen: Some(HookFile {
            rel_path: "pre_gen.sh".into(),
            bytes: b"# run(context)\ncat >/dev/null\n".to_vec(),
        }),
        post_gen: None,
        manifest: Some(b"name: hooks\n".to_vec()),
    });

    let target = tempfile::tempdir().unwrap();
    let hooks = HookConfig {
        interpreter: HookInterpreter {
            program: "bash".into(),
            args: vec![],
        },
        dependency_installer: Arc::new(AlwaysFailsInstaller),
        tmp_root: std::env::temp_dir(),
    };

    let err = generate(
        &brick,
        target.path(),
        json!({}),
        &CollisionPolicy::overwrite(),
        Some(&hooks),
        &NullLogger,
    )
    .await
    .expect_err("dependency install failure must propagate");

    assert!(matches!(
        err,
        GenerateError::Hook(HookError::HookDependencyInstallFailure { .. })
    ));
    assert!(!target.path().join("GREETINGS.md").exists());
}

#[tokio::test]
async fn e8_hook_missing_run_entrypoint_aborts_before_any_write() {
    let brick = brick_with_hook(Hooks {
        pre_gen: Some(HookFile {
            rel_path: "pre_gen.sh".into(),
            bytes: b"echo no entrypoint here\n".to_vec(),
        }),
        post_gen: None,
        manifest: None,
    });

    let target = tempfile::tempdir().unwrap();
    let hooks = HookConfig {
        interpreter: HookInterpreter {
            program: "bash".into(),
            args: vec![],
        },
        dependency_installer: Arc::new(mason_generate::NoopDependencyInstaller),
        tmp_root: std::env::temp_dir(),
    };

    let err = generate(
        &brick,
        target.path(),
        json!({}),
        &CollisionPolicy::overwrite(),
        Some(&hooks),
        &NullLogger,
    )
    .await
    .expect_err("missing entrypoint must abort generation");

    assert!(matches!(
        err,
        GenerateError::Hook(HookError::HookMissingRunException { .. })
    ));
    assert!(!target.path().join("GREETINGS.md").exists());
}
