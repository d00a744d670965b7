// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 Mason Contributors

use thiserror::Error;

/// Template syntax failures raised during parsing.
///
/// Missing variable keys are *not* errors (logic-less convention); only
/// malformed tag syntax (unterminated sections, mismatched section names,
/// empty tag bodies) reaches this type.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RenderError {
    #[error("render error at offset {offset} in template: {message}")]
    Syntax {
        template: String,
        offset: usize,
        message: String,
    },
}

impl RenderError {
    pub fn syntax(template: impl Into<String>, offset: usize, message: impl Into<String>) -> Self {
        RenderError::Syntax {
            template: template.into(),
            offset,
            message: message.into(),
        }
    }
}
