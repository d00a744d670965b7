// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 Mason Contributors

//! Case-lambda implementations.
//!
//! Tokenization rule (per the wire contract): split on lower->upper and
//! letter->digit transitions, and on any run of non-alphanumeric characters;
//! the separators themselves are discarded. Each lambda then re-joins the
//! words with its own separator and per-word casing.

#[derive(Clone, Copy, PartialEq, Eq)]
enum CharKind {
    Lower,
    Upper,
    Digit,
    Other,
}

fn classify(c: char) -> CharKind {
    if c.is_uppercase() {
        CharKind::Upper
    } else if c.is_lowercase() {
        CharKind::Lower
    } else if c.is_numeric() {
        CharKind::Digit
    } else {
        CharKind::Other
    }
}

/// Splits `s` into case-preserving words per the tokenization rule.
pub fn split_words(s: &str) -> Vec<String> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut prev: Option<CharKind> = None;

    for c in s.chars() {
        let kind = classify(c);
        if kind == CharKind::Other {
            if !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
            prev = None;
            continue;
        }

        let boundary = matches!(
            (prev, kind),
            (Some(CharKind::Lower), CharKind::Upper)
                | (Some(CharKind::Upper), CharKind::Digit)
                | (Some(CharKind::Lower), CharKind::Digit)
                | (Some(CharKind::Digit), CharKind::Upper)
                | (Some(CharKind::Digit), CharKind::Lower)
        );
        if boundary && !current.is_empty() {
            words.push(std::mem::take(&mut current));
        }
        current.push(c);
        prev = Some(kind);
    }
    if !current.is_empty() {
        words.push(current);
    }
    words
}

fn capitalize_first(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        None => String::new(),
        Some(first) => {
            let mut out = String::with_capacity(word.len());
            out.extend(first.to_uppercase());
            out.push_str(&chars.as_str().to_lowercase());
            out
        }
    }
}

fn lower(word: &str) -> String {
    word.to_lowercase()
}

fn upper(word: &str) -> String {
    word.to_uppercase()
}

fn join_words<I: IntoIterator<Item = String>>(words: I, sep: &str) -> String {
    words.into_iter().collect::<Vec<_>>().join(sep)
}

pub fn camel_case(s: &str) -> String {
    let words = split_words(s);
    let mut out = String::new();
    for (i, w) in words.iter().enumerate() {
        if i == 0 {
            out.push_str(&lower(w));
        } else {
            out.push_str(&capitalize_first(w));
        }
    }
    out
}

pub fn pascal_case(s: &str) -> String {
    join_words(split_words(s).iter().map(|w| capitalize_first(w)), "")
}

pub fn snake_case(s: &str) -> String {
    join_words(split_words(s).iter().map(|w| lower(w)), "_")
}

pub fn constant_case(s: &str) -> String {
    join_words(split_words(s).iter().map(|w| upper(w)), "_")
}

pub fn param_case(s: &str) -> String {
    join_words(split_words(s).iter().map(|w| lower(w)), "-")
}

pub fn path_case(s: &str) -> String {
    join_words(split_words(s).iter().map(|w| lower(w)), "/")
}

pub fn dot_case(s: &str) -> String {
    join_words(split_words(s).iter().map(|w| lower(w)), ".")
}

pub fn header_case(s: &str) -> String {
    join_words(split_words(s).iter().map(|w| capitalize_first(w)), "-")
}

pub fn title_case(s: &str) -> String {
    join_words(split_words(s).iter().map(|w| capitalize_first(w)), " ")
}

pub fn sentence_case(s: &str) -> String {
    let joined = join_words(split_words(s).iter().map(|w| lower(w)), " ");
    capitalize_first(&joined)
}

pub fn lower_case(s: &str) -> String {
    s.to_lowercase()
}

pub fn upper_case(s: &str) -> String {
    s.to_uppercase()
}

pub fn mustache_case(s: &str) -> String {
    s.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn camel_case_basic() {
        assert_eq!(camel_case("foo_bar_baz"), "fooBarBaz");
        assert_eq!(camel_case("FooBarBaz"), "fooBarBaz");
    }

    #[test]
    fn snake_case_basic() {
        assert_eq!(snake_case("FooBarBaz"), "foo_bar_baz");
    }

    #[test]
    fn constant_case_basic() {
        assert_eq!(constant_case("fooBarBaz"), "FOO_BAR_BAZ");
    }

    #[test]
    fn empty_input_yields_empty_output() {
        for f in [
            camel_case as fn(&str) -> String,
            pascal_case,
            snake_case,
            constant_case,
            param_case,
            path_case,
            dot_case,
            header_case,
            title_case,
            sentence_case,
            lower_case,
            upper_case,
            mustache_case,
        ] {
            assert_eq!(f(""), "");
        }
    }

    #[test]
    fn case_lambdas_are_idempotent_on_already_cased_input() {
        let cases: &[(fn(&str) -> String, &str)] = &[
            (camel_case, "fooBarBaz"),
            (pascal_case, "FooBarBaz"),
            (snake_case, "foo_bar_baz"),
            (constant_case, "FOO_BAR_BAZ"),
            (param_case, "foo-bar-baz"),
            (path_case, "foo/bar/baz"),
            (dot_case, "foo.bar.baz"),
            (header_case, "Foo-Bar-Baz"),
            (title_case, "Foo Bar Baz"),
            (sentence_case, "Foo bar baz"),
            (lower_case, "foo bar"),
            (upper_case, "FOO BAR"),
            (mustache_case, "{{foo}}"),
        ];
        for (f, input) in cases {
            let once = f(input);
            let twice = f(&once);
            assert_eq!(once, twice, "not idempotent for input {input:?}");
        }
    }
}
