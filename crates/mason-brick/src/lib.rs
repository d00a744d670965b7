// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 Mason Contributors

//! Reads a brick directory or bundle into the addressable in-memory `Brick`
//! value that the Generator and Hook Runner consume.

use anyhow::{Context, Result};
use indexmap::IndexMap;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::{Component, Path, PathBuf};
use thiserror::Error;

/// An immutable, fully-loaded brick: metadata, variable schema, template
/// tree, and optional hooks.
#[derive(Debug, Clone, PartialEq)]
pub struct Brick {
    pub name: String,
    pub description: String,
    pub version: semver::Version,
    pub publish_to: Option<String>,
    pub variables: IndexMap<String, VariableDef>,
    pub template_files: Vec<TemplateFile>,
    pub hooks: Hooks,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateFile {
    pub rel_path: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HookFile {
    pub rel_path: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Hooks {
    pub pre_gen: Option<HookFile>,
    pub post_gen: Option<HookFile>,
    pub manifest: Option<Vec<u8>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum VarType {
    String,
    Number,
    Boolean,
    Enum,
    Array,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VariableDef {
    pub var_type: VarType,
    pub description: Option<String>,
    pub default: Option<serde_json::Value>,
    pub prompt: Option<String>,
    pub values: Option<Vec<serde_json::Value>>,
}

impl VariableDef {
    pub fn has_default(&self) -> bool {
        self.default.is_some()
    }
}

#[derive(Debug, Error)]
pub enum LoaderError {
    #[error("brick.yaml not found under {dir}")]
    BrickMissingMetadata { dir: PathBuf },
    #[error("brick.yaml is malformed: {yaml_error}")]
    BrickMalformedMetadata { yaml_error: String },
    #[error("__brick__/ template root not found under {dir}")]
    BrickMissingTemplateRoot { dir: PathBuf },
    #[error(transparent)]
    BundleDecode(#[from] mason_bundle::BundleDecodeError),
}

// ---- brick.yaml wire shape --------------------------------------------

#[derive(Debug, Deserialize)]
struct BrickManifestWire {
    name: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    version: Option<String>,
    #[serde(default)]
    publish_to: Option<String>,
    #[serde(default)]
    vars: IndexMap<String, VariableDefWire>,
}

/// `VariableDef` shorthand-or-struct duality: a bare string is a prompt text
/// shorthand for a `string`-typed variable with no default.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum VariableDefWire {
    Shorthand(String),
    Full(VariableDefFullWire),
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct VariableDefFullWire {
    #[serde(rename = "type", default = "default_var_type")]
    var_type: VarType,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    default: Option<serde_json::Value>,
    #[serde(default)]
    prompt: Option<String>,
    #[serde(default)]
    values: Option<Vec<serde_json::Value>>,
}

fn default_var_type() -> VarType {
    VarType::String
}

impl From<VariableDefWire> for VariableDef {
    fn from(w: VariableDefWire) -> Self {
        match w {
            VariableDefWire::Shorthand(prompt) => VariableDef {
                var_type: VarType::String,
                description: None,
                default: None,
                prompt: Some(prompt),
                values: None,
            },
            VariableDefWire::Full(f) => VariableDef {
                var_type: f.var_type,
                description: f.description,
                default: f.default,
                prompt: f.prompt,
                values: f.values,
            },
        }
    }
}

/// Invariant (i): a brick's name matches `^[a-z][a-z0-9_]*$`.
pub fn is_valid_brick_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_lowercase() => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
}

// ---- loadFromDir ---------------------------------------------------------

/// Reads `dir/brick.yaml`, `dir/__brick__/`, and `dir/hooks/` into a `Brick`.
pub fn load_from_dir(dir: &Path) -> Result<Brick, LoaderError> {
    tracing::debug!(dir = %dir.display(), "loading brick from directory");
    let manifest_path = dir.join("brick.yaml");
    if !manifest_path.is_file() {
        return Err(LoaderError::BrickMissingMetadata {
            dir: dir.to_path_buf(),
        });
    }
    let raw = std::fs::read_to_string(&manifest_path).map_err(|e| {
        LoaderError::BrickMalformedMetadata {
            yaml_error: format!("read {}: {e}", manifest_path.display()),
        }
    })?;

    let wire: BrickManifestWire =
        serde_yaml::from_str(&raw).map_err(|e| LoaderError::BrickMalformedMetadata {
            yaml_error: e.to_string(),
        })?;

    if !is_valid_brick_name(&wire.name) {
        return Err(LoaderError::BrickMalformedMetadata {
            yaml_error: format!(
                "brick name {:?} does not match ^[a-z][a-z0-9_]*$",
                wire.name
            ),
        });
    }

    let version = match &wire.version {
        Some(v) => semver::Version::parse(v).map_err(|e| LoaderError::BrickMalformedMetadata {
            yaml_error: format!("invalid semver version {v:?}: {e}"),
        })?,
        None => semver::Version::new(0, 1, 0),
    };

    let template_root = dir.join("__brick__");
    if !template_root.is_dir() {
        return Err(LoaderError::BrickMissingTemplateRoot {
            dir: template_root,
        });
    }

    let template_files = collect_template_files(&template_root).map_err(|e| {
        LoaderError::BrickMalformedMetadata {
            yaml_error: format!("reading template tree: {e:#}"),
        }
    })?;

    let hooks = collect_hooks(&dir.join("hooks")).map_err(|e| {
        LoaderError::BrickMalformedMetadata {
            yaml_error: format!("reading hooks/: {e:#}"),
        }
    })?;

    let variables = wire
        .vars
        .into_iter()
        .map(|(k, v)| (k, VariableDef::from(v)))
        .collect();

    Ok(Brick {
        name: wire.name,
        description: wire.description,
        version,
        publish_to: wire.publish_to,
        variables,
        template_files,
        hooks,
    })
}

/// Reads a universal bundle's bytes into the same `Brick` shape `loadFromDir`
/// produces.
pub fn load_from_bundle(bytes: &[u8]) -> Result<Brick, LoaderError> {
    let doc = mason_bundle::decode_universal(bytes)?;

    let version = semver::Version::parse(&doc.version).unwrap_or_else(|_| semver::Version::new(0, 1, 0));

    let vars_map: IndexMap<String, VariableDefWire> = if doc.vars.is_null() {
        IndexMap::new()
    } else {
        serde_json::from_value(doc.vars).map_err(|e| LoaderError::BrickMalformedMetadata {
            yaml_error: format!("bundle vars payload: {e}"),
        })?
    };
    let variables = vars_map
        .into_iter()
        .map(|(k, v)| (k, VariableDef::from(v)))
        .collect();

    let template_files = doc
        .files
        .into_iter()
        .map(|f| TemplateFile {
            rel_path: f.path,
            bytes: f.bytes,
        })
        .collect();

    let mut hooks = Hooks::default();
    for h in doc.hooks {
        let stem = Path::new(&h.path)
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();
        if stem == "pre_gen" {
            hooks.pre_gen = Some(HookFile {
                rel_path: h.path,
                bytes: h.bytes,
            });
        } else if stem == "post_gen" {
            hooks.post_gen = Some(HookFile {
                rel_path: h.path,
                bytes: h.bytes,
            });
        } else {
            hooks.manifest = Some(h.bytes);
        }
    }

    Ok(Brick {
        name: doc.name,
        description: doc.description,
        version,
        publish_to: None,
        variables,
        template_files,
        hooks,
    })
}

// ---- tree walking (sorted, symlink-refusing) --

fn collect_template_files(root: &Path) -> Result<Vec<TemplateFile>> {
    let mut out = Vec::new();
    walk_dir(root, Path::new(""), &mut out)?;
    out.sort_by(|a, b| a.0.cmp(&b.0));
    out.into_iter()
        .map(|(rel, abs)| {
            let bytes =
                std::fs::read(&abs).with_context(|| format!("read {}", abs.display()))?;
            Ok(TemplateFile {
                rel_path: rel.to_string_lossy().replace('\\', "/"),
                bytes,
            })
        })
        .collect()
}

fn walk_dir(root: &Path, rel: &Path, out: &mut Vec<(PathBuf, PathBuf)>) -> Result<()> {
    for entry in std::fs::read_dir(root).with_context(|| format!("read {}", root.display()))? {
        let entry = entry?;
        let p = entry.path();
        let file_name = match p.file_name() {
            Some(n) => n.to_os_string(),
            None => continue,
        };
        let child_rel = rel.join(file_name);
        let ft = entry.file_type()?;
        if ft.is_symlink() {
            anyhow::bail!("brick template tree contains symlink (refused): {}", p.display());
        }
        if ft.is_dir() {
            walk_dir(&p, &child_rel, out)?;
        } else if ft.is_file() {
            out.push((child_rel, p));
        } else {
            anyhow::bail!("brick template tree contains unsupported entry: {}", p.display());
        }
    }
    Ok(())
}

fn collect_hooks(hooks_dir: &Path) -> Result<Hooks> {
    let mut hooks = Hooks::default();
    if !hooks_dir.is_dir() {
        return Ok(hooks);
    }
    for entry in std::fs::read_dir(hooks_dir)
        .with_context(|| format!("read {}", hooks_dir.display()))?
    {
        let entry = entry?;
        let p = entry.path();
        if !p.is_file() {
            continue;
        }
        let stem = p
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();
        let rel_path = p
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        let bytes = std::fs::read(&p).with_context(|| format!("read {}", p.display()))?;

        if stem == "pre_gen" {
            hooks.pre_gen = Some(HookFile { rel_path, bytes });
        } else if stem == "post_gen" {
            hooks.post_gen = Some(HookFile { rel_path, bytes });
        } else {
            hooks.manifest = Some(bytes);
        }
    }
    Ok(hooks)
}

/// Serializes a `Brick` back out to a `brick.yaml` + `__brick__/` + `hooks/`
/// directory tree — the inverse of `load_from_dir`, used by the cache to
/// materialize a resolved brick (from a path tree, a git clone, or a decoded
/// registry bundle) into its canonical on-disk cache entry.
pub fn write_to_dir(brick: &Brick, dir: &Path) -> Result<()> {
    std::fs::create_dir_all(dir).with_context(|| format!("create {}", dir.display()))?;

    let manifest_yaml = serialize_manifest(brick)?;
    std::fs::write(dir.join("brick.yaml"), manifest_yaml)
        .with_context(|| format!("write {}/brick.yaml", dir.display()))?;

    let template_root = dir.join("__brick__");
    for f in &brick.template_files {
        ensure_safe_rel_path(Path::new(&f.rel_path))?;
        let dst = template_root.join(&f.rel_path);
        if let Some(parent) = dst.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&dst, &f.bytes).with_context(|| format!("write {}", dst.display()))?;
    }

    if brick.hooks.pre_gen.is_some() || brick.hooks.post_gen.is_some() || brick.hooks.manifest.is_some()
    {
        let hooks_dir = dir.join("hooks");
        std::fs::create_dir_all(&hooks_dir)?;
        if let Some(h) = &brick.hooks.pre_gen {
            std::fs::write(hooks_dir.join(&h.rel_path), &h.bytes)?;
        }
        if let Some(h) = &brick.hooks.post_gen {
            std::fs::write(hooks_dir.join(&h.rel_path), &h.bytes)?;
        }
        if let Some(m) = &brick.hooks.manifest {
            std::fs::write(hooks_dir.join("manifest.deps"), m)?;
        }
    }

    Ok(())
}

fn serialize_manifest(brick: &Brick) -> Result<String> {
    #[derive(Serialize)]
    struct ManifestOut<'a> {
        name: &'a str,
        description: &'a str,
        version: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        publish_to: Option<&'a str>,
        vars: IndexMap<String, VariableDefOut>,
    }

    #[derive(Serialize)]
    struct VariableDefOut {
        #[serde(rename = "type")]
        var_type: VarType,
        #[serde(skip_serializing_if = "Option::is_none")]
        description: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        default: Option<serde_json::Value>,
        #[serde(skip_serializing_if = "Option::is_none")]
        prompt: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        values: Option<Vec<serde_json::Value>>,
    }

    let vars = brick
        .variables
        .iter()
        .map(|(k, v)| {
            (
                k.clone(),
                VariableDefOut {
                    var_type: v.var_type,
                    description: v.description.clone(),
                    default: v.default.clone(),
                    prompt: v.prompt.clone(),
                    values: v.values.clone(),
                },
            )
        })
        .collect();

    let out = ManifestOut {
        name: &brick.name,
        description: &brick.description,
        version: brick.version.to_string(),
        publish_to: brick.publish_to.as_deref(),
        vars,
    };

    serde_yaml::to_string(&out).context("serialize brick.yaml")
}

fn ensure_safe_rel_path(p: &Path) -> Result<()> {
    for c in p.components() {
        match c {
            Component::Normal(_) => {}
            _ => anyhow::bail!("unsafe path component: {}", p.display()),
        }
    }
    Ok(())
}

/// Re-exported so `mason-generate` can reuse the exact same safety check
/// before writing a rendered destination path.
pub fn ensure_safe_rel_path_str(p: &str) -> Result<()> {
    ensure_safe_rel_path(Path::new(p))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write(dir: &Path, rel: &str, contents: &str) {
        let p = dir.join(rel);
        if let Some(parent) = p.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(p, contents).unwrap();
    }

    #[test]
    fn valid_brick_names() {
        assert!(is_valid_brick_name("greeting"));
        assert!(is_valid_brick_name("greeting_2"));
        assert!(!is_valid_brick_name("Greeting"));
        assert!(!is_valid_brick_name("2greeting"));
        assert!(!is_valid_brick_name("greeting-dash"));
    }

    #[test]
    fn missing_manifest_is_reported() {
        let tmp = tempfile::tempdir().unwrap();
        let err = load_from_dir(tmp.path()).unwrap_err();
        assert!(matches!(err, LoaderError::BrickMissingMetadata { .. }));
    }

    #[test]
    fn missing_template_root_is_reported() {
        let tmp = tempfile::tempdir().unwrap();
        write(
            tmp.path(),
            "brick.yaml",
            "name: greeting\nversion: 0.1.0\n",
        );
        let err = load_from_dir(tmp.path()).unwrap_err();
        assert!(matches!(err, LoaderError::BrickMissingTemplateRoot { .. }));
    }

    #[test]
    fn malformed_yaml_is_reported() {
        let tmp = tempfile::tempdir().unwrap();
        write(tmp.path(), "brick.yaml", "name: [unterminated\n");
        let err = load_from_dir(tmp.path()).unwrap_err();
        assert!(matches!(err, LoaderError::BrickMalformedMetadata { .. }));
    }

    #[test]
    fn loads_shorthand_and_full_vars() {
        let tmp = tempfile::tempdir().unwrap();
        write(
            tmp.path(),
            "brick.yaml",
            r#"
name: greeting
description: says hi
version: 0.1.0
vars:
  name: "Your name please"
  age:
    type: number
    default: 1
"#,
        );
        write(tmp.path(), "__brick__/GREETINGS.md", "Hi {{name}}!");
        let brick = load_from_dir(tmp.path()).unwrap();
        assert_eq!(brick.name, "greeting");
        assert_eq!(brick.template_files.len(), 1);
        assert_eq!(brick.template_files[0].rel_path, "GREETINGS.md");
        assert_eq!(brick.variables["name"].prompt.as_deref(), Some("Your name please"));
        assert_eq!(brick.variables["age"].var_type, VarType::Number);
    }

    #[test]
    fn collects_hooks_by_location() {
        let tmp = tempfile::tempdir().unwrap();
        write(tmp.path(), "brick.yaml", "name: greeting\nversion: 0.1.0\n");
        write(tmp.path(), "__brick__/a.txt", "a");
        write(tmp.path(), "hooks/pre_gen.dart", "run(){}");
        write(tmp.path(), "hooks/post_gen.dart", "run(){}");
        write(tmp.path(), "hooks/pubspec.yaml", "name: hooks\n");
        let brick = load_from_dir(tmp.path()).unwrap();
        assert!(brick.hooks.pre_gen.is_some());
        assert!(brick.hooks.post_gen.is_some());
        assert!(brick.hooks.manifest.is_some());
    }

    #[test]
    fn template_files_are_sorted_lexicographically() {
        let tmp = tempfile::tempdir().unwrap();
        write(tmp.path(), "brick.yaml", "name: greeting\nversion: 0.1.0\n");
        write(tmp.path(), "__brick__/z.txt", "z");
        write(tmp.path(), "__brick__/a.txt", "a");
        let brick = load_from_dir(tmp.path()).unwrap();
        let names: Vec<_> = brick.template_files.iter().map(|f| f.rel_path.clone()).collect();
        assert_eq!(names, vec!["a.txt".to_string(), "z.txt".to_string()]);
    }

    #[test]
    fn load_from_bundle_matches_dir_shape() {
        let doc = mason_bundle::BundleDocument {
            name: "greeting".into(),
            description: "says hi".into(),
            version: "0.1.0".into(),
            vars: serde_json::json!({"name": "Your name"}),
            files: vec![mason_bundle::BundleEntry {
                path: "GREETINGS.md".into(),
                bytes: b"Hi {{name}}!".to_vec(),
                is_text: true,
            }],
            hooks: vec![],
        };
        let encoded = mason_bundle::encode_universal(&doc).unwrap();
        let brick = load_from_bundle(&encoded).unwrap();
        assert_eq!(brick.name, "greeting");
        assert_eq!(brick.template_files.len(), 1);
    }

    #[test]
    fn write_to_dir_round_trips_through_load_from_dir() {
        let tmp = tempfile::tempdir().unwrap();
        write(tmp.path(), "brick.yaml", "name: greeting\nversion: 0.2.0\n");
        write(tmp.path(), "__brick__/a.txt", "hello");
        write(tmp.path(), "hooks/pre_gen.dart", "run(){}");
        let brick = load_from_dir(tmp.path()).unwrap();

        let out = tempfile::tempdir().unwrap();
        write_to_dir(&brick, out.path()).unwrap();
        let reloaded = load_from_dir(out.path()).unwrap();

        assert_eq!(reloaded.name, brick.name);
        assert_eq!(reloaded.version, brick.version);
        assert_eq!(reloaded.template_files, brick.template_files);
        assert!(reloaded.hooks.pre_gen.is_some());
    }
}
