// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 Mason Contributors

//! Encodes/decodes a brick to and from the "universal" (binary, deflate-of-
//! JSON) and "dart-source" (text, embeddable-constant) bundle formats.
//!
//! The codec owns only the JSON payload shared by both formats; the source
//! bundle's language wrapper is packaging scaffolding that stays with the CLI
//! layer (out of scope here, per the core/CLI split).

use anyhow::{Context, Result};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use flate2::read::DeflateDecoder;
use flate2::write::DeflateEncoder;
use flate2::Compression;
use serde::{Deserialize, Serialize};
use std::io::{Read, Write};
use thiserror::Error;

/// In-memory shape shared by both bundle formats.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundleDocument {
    pub name: String,
    pub description: String,
    pub version: String,
    /// Raw `vars` mapping, re-parsed into `VariableDef`s by `mason-brick` —
    /// the codec doesn't know that shape, only that it round-trips as JSON.
    pub vars: serde_json::Value,
    pub files: Vec<BundleEntry>,
    pub hooks: Vec<BundleEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundleEntry {
    pub path: String,
    pub bytes: Vec<u8>,
    pub is_text: bool,
}

#[derive(Debug, Error)]
pub enum BundleDecodeError {
    #[error("bundle entry {path}: {cause}")]
    Entry { path: String, cause: String },
    #[error("bundle payload is not valid deflate/JSON: {0}")]
    Envelope(String),
}

#[derive(Debug, Serialize, Deserialize)]
struct WireDocument {
    name: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    version: String,
    #[serde(default)]
    vars: serde_json::Value,
    #[serde(default)]
    files: Vec<WireEntry>,
    #[serde(default)]
    hooks: Vec<WireEntry>,
}

#[derive(Debug, Serialize, Deserialize)]
struct WireEntry {
    path: String,
    data: String,
    #[serde(rename = "type")]
    kind: String,
}

/// Encodes a brick document into the deflate-of-JSON universal bundle format.
///
/// `files`/`hooks` are sorted lexicographically by `path` before encoding,
/// per the round-trip law: key order in the JSON object is not load-bearing,
/// but entry order inside the arrays is, so it's made deterministic here.
pub fn encode_universal(doc: &BundleDocument) -> Result<Vec<u8>> {
    let wire = to_wire(doc);
    let json = serde_json::to_vec(&wire).context("serialize bundle document")?;

    let mut enc = DeflateEncoder::new(Vec::new(), Compression::default());
    enc.write_all(&json).context("deflate bundle payload")?;
    enc.finish().context("finish deflate stream")
}

/// Decodes a universal bundle. Unknown top-level JSON keys are ignored;
/// trailing whitespace after the JSON value is tolerated (both via serde's
/// default behavior / the JSON reader stopping at the value's end).
///
/// Per-entry decode failures (invalid base64, or non-UTF-8 bytes declared
/// `type: "text"`) are surfaced as `BundleDecodeError` rather than silently
/// dropped.
pub fn decode_universal(bytes: &[u8]) -> Result<BundleDocument, BundleDecodeError> {
    let mut dec = DeflateDecoder::new(bytes);
    let mut json = Vec::new();
    dec.read_to_end(&mut json)
        .map_err(|e| BundleDecodeError::Envelope(e.to_string()))?;

    let wire: WireDocument = serde_json::from_slice(&json)
        .map_err(|e| BundleDecodeError::Envelope(e.to_string()))?;

    from_wire(wire)
}

/// Renders the bundle document as an embeddable Rust source constant.
///
/// The codec's job ends here: producing the embeddable string. Wrapping it
/// in an actual compiled artifact (e.g. a CLI subcommand's packaging step) is
/// out of scope for this crate.
pub fn encode_source_embed(doc: &BundleDocument) -> Result<String> {
    let wire = to_wire(doc);
    let json = serde_json::to_string_pretty(&wire).context("serialize bundle document")?;
    let escaped = json.replace("\"#", "\"\\#");
    Ok(format!(
        "// SPDX-License-Identifier: MIT OR Apache-2.0\n\npub const BRICK_BUNDLE: &str = r#\"{escaped}\"#;\n"
    ))
}

fn to_wire(doc: &BundleDocument) -> WireDocument {
    let mut files = doc.files.clone();
    let mut hooks = doc.hooks.clone();
    files.sort_by(|a, b| a.path.cmp(&b.path));
    hooks.sort_by(|a, b| a.path.cmp(&b.path));

    WireDocument {
        name: doc.name.clone(),
        description: doc.description.clone(),
        version: doc.version.clone(),
        vars: doc.vars.clone(),
        files: files.iter().map(entry_to_wire).collect(),
        hooks: hooks.iter().map(entry_to_wire).collect(),
    }
}

fn entry_to_wire(e: &BundleEntry) -> WireEntry {
    WireEntry {
        path: e.path.clone(),
        data: BASE64.encode(&e.bytes),
        kind: if e.is_text { "text" } else { "binary" }.to_string(),
    }
}

fn from_wire(wire: WireDocument) -> Result<BundleDocument, BundleDecodeError> {
    let files = wire
        .files
        .into_iter()
        .map(entry_from_wire)
        .collect::<Result<Vec<_>, _>>()?;
    let hooks = wire
        .hooks
        .into_iter()
        .map(entry_from_wire)
        .collect::<Result<Vec<_>, _>>()?;

    Ok(BundleDocument {
        name: wire.name,
        description: wire.description,
        version: wire.version,
        vars: wire.vars,
        files,
        hooks,
    })
}

fn entry_from_wire(e: WireEntry) -> Result<BundleEntry, BundleDecodeError> {
    let is_text = match e.kind.as_str() {
        "text" => true,
        "binary" => false,
        other => {
            return Err(BundleDecodeError::Entry {
                path: e.path,
                cause: format!("unknown entry type {other:?}"),
            })
        }
    };

    let bytes = BASE64.decode(&e.data).map_err(|err| BundleDecodeError::Entry {
        path: e.path.clone(),
        cause: format!("invalid base64: {err}"),
    })?;

    if is_text && std::str::from_utf8(&bytes).is_err() {
        return Err(BundleDecodeError::Entry {
            path: e.path,
            cause: "declared type \"text\" but bytes are not valid UTF-8".to_string(),
        });
    }

    Ok(BundleEntry {
        path: e.path,
        bytes,
        is_text,
    })
}
