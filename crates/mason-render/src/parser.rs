// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 Mason Contributors

//! Tokenize -> parse a template string into a tree of [`Node`]s.
//!
//! Grammar (informal):
//!   text    := any run of bytes not containing "{{"
//!   tag     := "{{" tag-body "}}"
//!   section := "{{#" name "}}" nodes* "{{/" name "}}"
//!   inverted:= "{{^" name "}}" nodes* "{{/" name "}}"
//!   partial := "{{>" ws* name "}}"
//!   lambda  := "{{" name "#" lambda-name "}}"
//!   var     := "{{" name "}}"

use crate::error::RenderError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Text(String),
    Var(String),
    Lambda(String, String),
    Section(String, Vec<Node>),
    Inverted(String, Vec<Node>),
    Partial(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RawTag<'a> {
    Var(&'a str),
    Section(&'a str),
    Inverted(&'a str),
    Close(&'a str),
    Partial(&'a str),
    Lambda(&'a str, &'a str),
}

pub fn parse(template: &str) -> Result<Vec<Node>, RenderError> {
    let tokens = tokenize(template)?;
    let mut pos = 0;
    let nodes = parse_nodes(template, &tokens, &mut pos, None)?;
    if pos != tokens.len() {
        let (offset, _) = tokens[pos];
        return Err(RenderError::syntax(
            template,
            offset,
            "unexpected closing tag without a matching opener",
        ));
    }
    Ok(nodes)
}

enum Token<'a> {
    Text(&'a str),
    Tag(RawTag<'a>),
}

fn tokenize(template: &str) -> Result<Vec<(usize, Token<'_>)>, RenderError> {
    let mut out = Vec::new();
    let bytes = template.as_bytes();
    let mut i = 0;
    let mut text_start = 0;

    while i < bytes.len() {
        if bytes[i] == b'{' && i + 1 < bytes.len() && bytes[i + 1] == b'{' {
            if i > text_start {
                out.push((text_start, Token::Text(&template[text_start..i])));
            }
            let Some(close_rel) = template[i..].find("}}") else {
                return Err(RenderError::syntax(
                    template,
                    i,
                    "unterminated tag: missing closing `}}`",
                ));
            };
            let close = i + close_rel;
            let body = &template[i + 2..close];
            let tag = parse_tag_body(template, i, body)?;
            out.push((i, Token::Tag(tag)));
            i = close + 2;
            text_start = i;
        } else {
            i += 1;
        }
    }
    if bytes.len() > text_start {
        out.push((text_start, Token::Text(&template[text_start..])));
    }
    Ok(out)
}

fn parse_tag_body<'a>(
    template: &str,
    offset: usize,
    body: &'a str,
) -> Result<RawTag<'a>, RenderError> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return Err(RenderError::syntax(template, offset, "empty tag body"));
    }
    let mut chars = trimmed.chars();
    match chars.next() {
        Some('#') => Ok(RawTag::Section(trimmed[1..].trim())),
        Some('^') => Ok(RawTag::Inverted(trimmed[1..].trim())),
        Some('/') => Ok(RawTag::Close(trimmed[1..].trim())),
        Some('>') => Ok(RawTag::Partial(trimmed[1..].trim())),
        _ => {
            if let Some(hash) = trimmed.find('#') {
                let name = trimmed[..hash].trim();
                let lambda = trimmed[hash + 1..].trim();
                if name.is_empty() || lambda.is_empty() {
                    return Err(RenderError::syntax(
                        template,
                        offset,
                        "malformed lambda tag: expected `{{var#lambda}}`",
                    ));
                }
                Ok(RawTag::Lambda(name, lambda))
            } else {
                Ok(RawTag::Var(trimmed))
            }
        }
    }
}

fn parse_nodes(
    template: &str,
    tokens: &[(usize, Token<'_>)],
    pos: &mut usize,
    open_section: Option<&str>,
) -> Result<Vec<Node>, RenderError> {
    let mut nodes = Vec::new();
    while *pos < tokens.len() {
        let (offset, tok) = &tokens[*pos];
        match tok {
            Token::Text(s) => {
                nodes.push(Node::Text(s.to_string()));
                *pos += 1;
            }
            Token::Tag(RawTag::Var(name)) => {
                nodes.push(Node::Var(name.to_string()));
                *pos += 1;
            }
            Token::Tag(RawTag::Lambda(name, lambda)) => {
                nodes.push(Node::Lambda(name.to_string(), lambda.to_string()));
                *pos += 1;
            }
            Token::Tag(RawTag::Partial(name)) => {
                nodes.push(Node::Partial(name.to_string()));
                *pos += 1;
            }
            Token::Tag(RawTag::Section(name)) => {
                let name = name.to_string();
                *pos += 1;
                let children = parse_nodes(template, tokens, pos, Some(&name))?;
                nodes.push(Node::Section(name, children));
            }
            Token::Tag(RawTag::Inverted(name)) => {
                let name = name.to_string();
                *pos += 1;
                let children = parse_nodes(template, tokens, pos, Some(&name))?;
                nodes.push(Node::Inverted(name, children));
            }
            Token::Tag(RawTag::Close(name)) => {
                match open_section {
                    Some(expected) if expected == *name => {
                        *pos += 1;
                        return Ok(nodes);
                    }
                    Some(expected) => {
                        return Err(RenderError::syntax(
                            template,
                            *offset,
                            format!(
                                "mismatched closing tag: expected `{{{{/{expected}}}}}`, found `{{{{/{name}}}}}`"
                            ),
                        ));
                    }
                    None => {
                        return Err(RenderError::syntax(
                            template,
                            *offset,
                            format!("closing tag `{{{{/{name}}}}}` with no matching opener"),
                        ));
                    }
                }
            }
        }
    }
    if let Some(expected) = open_section {
        return Err(RenderError::syntax(
            template,
            template.len(),
            format!("unterminated section `{{{{#{expected}}}}}`: missing `{{{{/{expected}}}}}`"),
        ));
    }
    Ok(nodes)
}
