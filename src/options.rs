// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use serde::{Deserialize, Serialize};

/// What `deleteX(name)` does when `name` is not a member.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AbsentMemberPolicy {
    /// Leave the container untouched and record nothing.
    #[default]
    Ignore,
    /// Fail with an unknown-member error.
    Error,
}

/// Evaluation settings of a [`Program`](crate::Program).
///
/// Deserializable from JSON or YAML; missing fields take their defaults:
///
/// ```text
/// { "absent-member": "error", "max-depth": 64 }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct Options {
    pub absent_member: AbsentMemberPolicy,
    /// Maximum number of nested projection activations.
    pub max_depth: usize,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            absent_member: AbsentMemberPolicy::Ignore,
            max_depth: 256,
        }
    }
}

impl Options {
    pub fn from_json_str(json: &str) -> anyhow::Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}
