// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 Mason Contributors

//! Logic-less template rendering: tokenize -> parse -> evaluate.
//!
//! The syntax is Mustache-flavored: `{{var}}`, `{{#section}}...{{/section}}`,
//! `{{^inverted}}...{{/inverted}}`, `{{> partial}}`, and a pipe-style lambda
//! application `{{var#lambda}}`. Missing keys render as empty string; this is
//! the logic-less convention, not an error.

mod case;
mod error;
mod lambda;
mod parser;

pub use error::RenderError;
pub use lambda::{default_lambdas, Lambda, LambdaRegistry};

use indexmap::IndexMap;
use parser::Node;
use serde_json::Value;

/// A set of named partial templates, looked up by `{{> name}}`.
pub type Partials<'a> = IndexMap<&'a str, &'a str>;

/// Renders `template` against `vars`, with no partials or custom lambdas.
pub fn render(template: &str, vars: &Value) -> Result<String, RenderError> {
    Renderer::new().render(template, vars)
}

/// Attempts to render `buf` as UTF-8 text containing template tags.
///
/// If the payload is not valid UTF-8, or contains no `{{` delimiter, the
/// buffer is returned unchanged (spec: byte rendering is best-effort).
pub fn render_bytes(buf: &[u8], vars: &Value) -> Result<Vec<u8>, RenderError> {
    Renderer::new().render_bytes(buf, vars)
}

/// A reusable renderer carrying a lambda registry and (optionally) partials.
///
/// `Renderer` is side-effect-free: rendering the same `(template, vars)` pair
/// twice always produces the same output, and no state is mutated by a call
/// to [`Renderer::render`].
#[derive(Clone)]
pub struct Renderer {
    lambdas: LambdaRegistry,
}

impl Default for Renderer {
    fn default() -> Self {
        Self::new()
    }
}

impl Renderer {
    pub fn new() -> Self {
        Self {
            lambdas: default_lambdas(),
        }
    }

    /// Registers (or overrides) a lambda by name.
    pub fn with_lambda(mut self, name: &'static str, f: Lambda) -> Self {
        self.lambdas.insert(name, f);
        self
    }

    pub fn render(&self, template: &str, vars: &Value) -> Result<String, RenderError> {
        self.render_with_partials(template, vars, &Partials::new())
    }

    pub fn render_with_partials(
        &self,
        template: &str,
        vars: &Value,
        partials: &Partials<'_>,
    ) -> Result<String, RenderError> {
        let nodes = parser::parse(template)?;
        let mut out = String::new();
        let scopes: Vec<&Value> = vec![vars];
        self.eval_nodes(&nodes, &scopes, partials, &mut out)?;
        Ok(out)
    }

    pub fn render_bytes(&self, buf: &[u8], vars: &Value) -> Result<Vec<u8>, RenderError> {
        self.render_bytes_with_partials(buf, vars, &Partials::new())
    }

    pub fn render_bytes_with_partials(
        &self,
        buf: &[u8],
        vars: &Value,
        partials: &Partials<'_>,
    ) -> Result<Vec<u8>, RenderError> {
        let Ok(text) = std::str::from_utf8(buf) else {
            return Ok(buf.to_vec());
        };
        if !text.contains("{{") {
            return Ok(buf.to_vec());
        }
        Ok(self
            .render_with_partials(text, vars, partials)?
            .into_bytes())
    }

    fn eval_nodes(
        &self,
        nodes: &[Node],
        scopes: &[&Value],
        partials: &Partials<'_>,
        out: &mut String,
    ) -> Result<(), RenderError> {
        for node in nodes {
            self.eval_node(node, scopes, partials, out)?;
        }
        Ok(())
    }

    fn eval_node(
        &self,
        node: &Node,
        scopes: &[&Value],
        partials: &Partials<'_>,
        out: &mut String,
    ) -> Result<(), RenderError> {
        match node {
            Node::Text(s) => out.push_str(s),
            Node::Var(path) => {
                if let Some(v) = lookup(scopes, path) {
                    push_value(out, v);
                }
            }
            Node::Lambda(path, lambda_name) => {
                let raw = lookup(scopes, path)
                    .map(value_to_plain_string)
                    .unwrap_or_default();
                match self.lambdas.get(lambda_name.as_str()) {
                    Some(f) => out.push_str(&f(&raw)),
                    None => out.push_str(&raw),
                }
            }
            Node::Section(path, children) => {
                let Some(v) = lookup(scopes, path) else {
                    return Ok(());
                };
                match v {
                    Value::Array(items) => {
                        for item in items {
                            let mut inner = scopes.to_vec();
                            inner.push(item);
                            self.eval_nodes(children, &inner, partials, out)?;
                        }
                    }
                    Value::Bool(b) => {
                        if *b {
                            self.eval_nodes(children, scopes, partials, out)?;
                        }
                    }
                    Value::Null => {}
                    Value::Object(o) => {
                        if !o.is_empty() {
                            let mut inner = scopes.to_vec();
                            inner.push(v);
                            self.eval_nodes(children, &inner, partials, out)?;
                        }
                    }
                    other => {
                        if is_truthy(other) {
                            self.eval_nodes(children, scopes, partials, out)?;
                        }
                    }
                }
            }
            Node::Inverted(path, children) => {
                let falsy = match lookup(scopes, path) {
                    None => true,
                    Some(Value::Null) => true,
                    Some(Value::Bool(b)) => !*b,
                    Some(Value::Array(items)) => items.is_empty(),
                    Some(other) => !is_truthy(other),
                };
                if falsy {
                    self.eval_nodes(children, scopes, partials, out)?;
                }
            }
            Node::Partial(name) => {
                if let Some(src) = partials.get(name.as_str()) {
                    let nodes = parser::parse(src)?;
                    self.eval_nodes(&nodes, scopes, partials, out)?;
                }
            }
        }
        Ok(())
    }
}

fn is_truthy(v: &Value) -> bool {
    match v {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::String(s) => !s.is_empty(),
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

fn push_value(out: &mut String, v: &Value) {
    match v {
        Value::String(s) => out.push_str(s),
        Value::Null => {}
        other => out.push_str(&other.to_string()),
    }
}

fn value_to_plain_string(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Dotted-path lookup walking the scope stack innermost-first, falling back
/// outward when a segment is missing (Mustache's implicit parent scoping).
fn lookup<'a>(scopes: &[&'a Value], path: &str) -> Option<&'a Value> {
    if path == "." {
        return scopes.last().copied();
    }
    let segments: Vec<&str> = path.split('.').collect();
    for scope in scopes.iter().rev() {
        if let Some(v) = lookup_path(scope, &segments) {
            return Some(v);
        }
    }
    None
}

fn lookup_path<'a>(root: &'a Value, segments: &[&str]) -> Option<&'a Value> {
    let mut cur = root;
    for seg in segments {
        cur = cur.as_object()?.get(*seg)?;
    }
    Some(cur)
}
