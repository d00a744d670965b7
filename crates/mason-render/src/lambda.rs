// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 Mason Contributors

use crate::case;
use indexmap::IndexMap;

/// A named string-to-string transform invoked via `{{var#lambda}}`.
pub type Lambda = fn(&str) -> String;

/// Ordered mapping from lambda name (including aliases) to implementation.
pub type LambdaRegistry = IndexMap<&'static str, Lambda>;

/// The required lambda set from the wire contract, plus the common aliases
/// scaffolding tools in this ecosystem accept for the same transform.
pub fn default_lambdas() -> LambdaRegistry {
    let mut m: LambdaRegistry = IndexMap::new();

    m.insert("camelCase", case::camel_case as Lambda);
    m.insert("camelcase", case::camel_case as Lambda);

    m.insert("constantCase", case::constant_case as Lambda);
    m.insert("constcase", case::constant_case as Lambda);

    m.insert("dotCase", case::dot_case as Lambda);
    m.insert("dotcase", case::dot_case as Lambda);

    m.insert("headerCase", case::header_case as Lambda);
    m.insert("headercase", case::header_case as Lambda);

    m.insert("lowerCase", case::lower_case as Lambda);
    m.insert("lowercase", case::lower_case as Lambda);

    m.insert("pascalCase", case::pascal_case as Lambda);
    m.insert("pascalcase", case::pascal_case as Lambda);

    m.insert("paramCase", case::param_case as Lambda);
    m.insert("paramcase", case::param_case as Lambda);
    m.insert("kebabCase", case::param_case as Lambda);

    m.insert("pathCase", case::path_case as Lambda);
    m.insert("pathcase", case::path_case as Lambda);

    m.insert("sentenceCase", case::sentence_case as Lambda);
    m.insert("sentencecase", case::sentence_case as Lambda);

    m.insert("snakeCase", case::snake_case as Lambda);
    m.insert("snakecase", case::snake_case as Lambda);

    m.insert("titleCase", case::title_case as Lambda);
    m.insert("titlecase", case::title_case as Lambda);

    m.insert("upperCase", case::upper_case as Lambda);
    m.insert("uppercase", case::upper_case as Lambda);

    m.insert("mustacheCase", case::mustache_case as Lambda);
    m.insert("mustachecase", case::mustache_case as Lambda);

    m
}
