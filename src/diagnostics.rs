// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::interpreter::ProjectionError;
use crate::types::NodeId;
use crate::Rc;

use core::fmt;

use serde::Serialize;

/// Code used for every projection evaluation failure.
pub const INVALID_PROJECTION: &str = "invalid-projection";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnostic {
    pub code: Rc<str>,
    pub severity: Severity,
    /// Node the failed projection was applied to.
    pub target: NodeId,
    pub message: Rc<str>,
}

impl Diagnostic {
    pub fn invalid_projection(target: NodeId, err: &ProjectionError) -> Self {
        Self {
            code: INVALID_PROJECTION.into(),
            severity: Severity::Error,
            target,
            message: err.to_string().into(),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let severity = match self.severity {
            Severity::Error => "error",
        };
        write!(f, "{severity} {} on {}: {}", self.code, self.target, self.message)
    }
}

/// Receiver of diagnostics produced by projection runs.
pub trait DiagnosticSink {
    fn report(&mut self, diagnostic: Diagnostic);
}

impl DiagnosticSink for Vec<Diagnostic> {
    fn report(&mut self, diagnostic: Diagnostic) {
        self.push(diagnostic);
    }
}
