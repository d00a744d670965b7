// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 Mason Contributors

//! Thin CLI glue wiring `mason-generate`'s `generate()` entry point to a
//! terminal invocation. This binary is demonstration scaffolding, not a
//! feature surface: argument parsing, the registry HTTP client, and
//! interactive prompting stay external collaborators.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use mason_cache::{BrickRef, LockTable, NoRegistryClient, TokioProcessRunner, TracingLogger};
use mason_generate::{CollisionPolicy, CoreConfig, GenerateReport, HookConfig};
use mason_hooks::{HookInterpreter, NoopDependencyInstaller};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

#[derive(Debug, Parser)]
#[command(name = "mason", version = env!("CARGO_PKG_VERSION"), about = "Mason brick generator", long_about = None)]
pub struct Cli {
    /// Log format: human or jsonl.
    #[arg(long, env = "MASON_LOG_FORMAT", default_value = "human")]
    pub log_format: String,

    /// Override the on-disk brick cache root.
    #[arg(long, env = "MASON_CACHE_ROOT")]
    pub cache_root: Option<PathBuf>,

    /// Allow network access for git/registry bricks.
    #[arg(long, env = "MASON_ALLOW_NETWORK", default_value_t = true)]
    pub allow_network: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Generate a project from a brick.
    Generate {
        /// Path to a brick directory, or a `git:` / `registry:` reference.
        brick: String,

        /// Directory to generate into.
        #[arg(long, default_value = ".")]
        out: PathBuf,

        /// Variables as `key=value` pairs; repeatable.
        #[arg(long = "var", value_parser = parse_var)]
        vars: Vec<(String, String)>,

        /// What to do when a destination file already exists and differs.
        #[arg(long, value_enum, default_value = "overwrite")]
        on_conflict: OnConflictArg,
    },
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum OnConflictArg {
    Overwrite,
    Skip,
    Append,
}

fn parse_var(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((k, v)) => Ok((k.to_string(), v.to_string())),
        None => Err(format!("expected key=value, got {s:?}")),
    }
}

pub async fn run_cli(cli: Cli) -> Result<()> {
    init_tracing(&cli.log_format)?;

    let cache_root = match cli.cache_root {
        Some(p) => p,
        None => default_cache_root()?,
    };

    match cli.command {
        Commands::Generate {
            brick,
            out,
            vars,
            on_conflict,
        } => generate_command(cache_root, cli.allow_network, brick, out, vars, on_conflict).await,
    }
}

async fn generate_command(
    cache_root: PathBuf,
    allow_network: bool,
    brick_arg: String,
    out: PathBuf,
    vars: Vec<(String, String)>,
    on_conflict: OnConflictArg,
) -> Result<()> {
    let brick_ref = parse_brick_ref(&brick_arg)?;

    let logger = TracingLogger;
    let locks = LockTable::default();
    let process_runner = TokioProcessRunner;
    let registry_client = NoRegistryClient;

    let resolved = mason_cache::resolve(
        &brick_ref,
        &cache_root,
        allow_network,
        &locks,
        &process_runner,
        &registry_client,
        &logger,
    )
    .await
    .context("resolving brick")?;

    std::fs::create_dir_all(&out).with_context(|| format!("create target dir {}", out.display()))?;

    let policy = match on_conflict {
        OnConflictArg::Overwrite => CollisionPolicy::overwrite(),
        OnConflictArg::Skip => CollisionPolicy::skip(),
        OnConflictArg::Append => CollisionPolicy::append(),
    };

    let hook_config = HookConfig {
        interpreter: HookInterpreter {
            program: std::env::var("MASON_HOOK_INTERPRETER").unwrap_or_else(|_| "sh".to_string()),
            args: vec![],
        },
        dependency_installer: Arc::new(NoopDependencyInstaller),
        tmp_root: std::env::temp_dir(),
    };

    let mut vars_obj = serde_json::Map::new();
    for (k, v) in vars {
        vars_obj.insert(k, serde_json::Value::String(v));
    }

    let report = mason_generate::generate(
        &resolved.brick,
        &out,
        serde_json::Value::Object(vars_obj),
        &policy,
        Some(&hook_config),
        &logger,
    )
    .await
    .context("generating brick")?;

    print_report(&report);

    // `CoreConfig` exists so a caller can thread all of `{cache_root,
    // collision_policy, hook_timeout, allow_network}` through a single
    // value; this CLI builds one for parity with the library surface even
    // though it dispatches the fields individually above.
    let _config = CoreConfig {
        cache_root,
        collision_policy: policy,
        hook_timeout: None,
        allow_network,
    };

    Ok(())
}

fn parse_brick_ref(arg: &str) -> Result<BrickRef> {
    if let Some(url) = arg.strip_prefix("git:") {
        let (url, git_ref) = match url.split_once('#') {
            Some((u, r)) => (u.to_string(), Some(r.to_string())),
            None => (url.to_string(), None),
        };
        return Ok(BrickRef::Git {
            url,
            git_ref,
            sub_path: None,
        });
    }
    if let Some(spec) = arg.strip_prefix("registry:") {
        let (name, constraint) = match spec.split_once('@') {
            Some((n, c)) => (n.to_string(), c.to_string()),
            None => (spec.to_string(), "*".to_string()),
        };
        return Ok(BrickRef::Registry {
            name,
            version_constraint: constraint,
        });
    }
    Ok(BrickRef::Path {
        dir: PathBuf::from(arg),
    })
}

fn print_report(report: &GenerateReport) {
    for f in &report.files {
        println!("{:?} {}", f.disposition, f.rel_path);
    }
}

fn default_cache_root() -> Result<PathBuf> {
    let strategy = etcetera::choose_base_strategy().context("resolve XDG base strategy")?;
    use etcetera::BaseStrategy;
    Ok(strategy.cache_dir().join("mason"))
}

fn init_tracing(format: &str) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));

    match format {
        "human" => {
            tracing_subscriber::fmt().with_env_filter(filter).init();
        }
        "jsonl" => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .json()
                .with_current_span(true)
                .init();
        }
        other => bail!("invalid --log-format '{other}' (expected human|jsonl)"),
    }
    Ok(())
}

/// Maps an error chain to usage-class/fatal-class exit codes: malformed
/// inputs or a missing brick are usage errors (64); everything else is a
/// fatal runtime error (70).
pub fn exit_code_for(err: &anyhow::Error) -> ExitCode {
    for cause in err.chain() {
        if cause.downcast_ref::<mason_brick::LoaderError>().is_some() {
            return ExitCode::from(64);
        }
        if cause
            .downcast_ref::<mason_generate::VariableValidationError>()
            .is_some()
        {
            return ExitCode::from(64);
        }
    }
    ExitCode::from(70)
}
