// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

// Use README.md as crate documentation.
#![doc = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/README.md"))]

mod ast;
mod builtins;
mod diagnostics;
pub mod extensions;
mod instructions;
mod interpreter;
mod lexer;
mod options;
mod parser;
mod program;
mod registry;
mod scope;
mod state;
mod types;
mod value;

#[cfg(feature = "arc")]
pub(crate) use std::sync::Arc as Rc;

#[cfg(not(feature = "arc"))]
pub(crate) use std::rc::Rc;

pub use diagnostics::{Diagnostic, DiagnosticSink, Severity, INVALID_PROJECTION};
pub use extensions::{HostContext, HostFunction, HostModule};
pub use instructions::{Instruction, OperationKind};
pub use interpreter::ProjectionError;
pub use options::{AbsentMemberPolicy, Options};
pub use program::Program;
pub use registry::{Direction, ProjectionHandle, ProjectionId, ProjectionRef, ProjectionTarget};
pub use state::{StateKey, StateMaps};
pub use types::{IntrinsicName, MemberSlot, Members, NodeId, TypeData, TypeGraph, TypeKind, TypeNode};
pub use value::Value;

/// Items in `unstable` are likely to change.
pub mod unstable {
    pub use crate::ast::*;
    pub use crate::lexer::*;
    pub use crate::parser::*;
}

#[cfg(test)]
mod tests;
