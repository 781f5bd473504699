// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::Rc;
use thiserror::Error;

type String = Rc<str>;

/// Failure of a projection run.
///
/// Messages carry the source location of the offending expression when one
/// is known.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProjectionError {
    /// An operator or built-in was applied to values of the wrong kind.
    #[error("type mismatch: {0}")]
    TypeMismatch(String),

    /// A member or field that does not exist was read or edited.
    #[error("unknown member: {0}")]
    UnknownMember(String),

    /// A projection reference or direction resolves to nothing.
    #[error("unknown projection: {0}")]
    UnknownProjection(String),

    /// A name that is neither a variable, a type, nor an imported function.
    #[error("undeclared identifier: {0}")]
    UndeclaredIdentifier(String),

    /// An add or rename would produce a duplicate member name.
    #[error("name collision: {0}")]
    NameCollision(String),

    #[error("recursion limit {limit} exceeded: {message}")]
    RecursionLimit { limit: usize, message: String },

    /// A host function returned an error.
    #[error("host function `{function}` failed: {message}")]
    Host { function: String, message: String },

    #[error("internal error: {0}")]
    Internal(String),
}

impl ProjectionError {
    /// Recovers the typed error from an evaluation result.
    pub(crate) fn from_anyhow(err: anyhow::Error) -> Self {
        match err.downcast::<ProjectionError>() {
            Ok(e) => e,
            Err(e) => ProjectionError::Internal(format!("{e:#}").into()),
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            ProjectionError::TypeMismatch(_) => "TypeMismatch",
            ProjectionError::UnknownMember(_) => "UnknownMember",
            ProjectionError::UnknownProjection(_) => "UnknownProjection",
            ProjectionError::UndeclaredIdentifier(_) => "UndeclaredIdentifier",
            ProjectionError::NameCollision(_) => "NameCollision",
            ProjectionError::RecursionLimit { .. } => "RecursionLimit",
            ProjectionError::Host { .. } => "Host",
            ProjectionError::Internal(_) => "Internal",
        }
    }
}
