// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 Mason Contributors

use mason_brick::Brick;
use sha2::{Digest, Sha256};

/// `sha256(manifest-bytes ‖ templateFiles-manifest)` truncated to 40 hex
/// chars. `manifest-bytes` is the brick's hook dependency-manifest bytes
/// (empty if the brick has none); the templateFiles-manifest is each file
/// hashed as `relPath‖0x00‖bytes`, in sorted order: serialize
/// deterministically, feed a streaming hasher, hex-encode.
pub fn content_hash(brick: &Brick) -> String {
    let mut hasher = Sha256::new();
    hasher.update(brick.hooks.manifest.as_deref().unwrap_or(&[]));

    let mut files: Vec<&mason_brick::TemplateFile> = brick.template_files.iter().collect();
    files.sort_by(|a, b| a.rel_path.cmp(&b.rel_path));
    for f in files {
        hasher.update(f.rel_path.as_bytes());
        hasher.update([0u8]);
        hasher.update(&f.bytes);
    }

    let digest = hex::encode(hasher.finalize());
    digest[..40].to_string()
}
