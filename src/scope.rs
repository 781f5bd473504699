// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::lexer::SourceStr;
use crate::registry::Direction;
use crate::types::NodeId;
use crate::value::Value;

use std::collections::BTreeMap;

use anyhow::{anyhow, Result};

type Frame = BTreeMap<SourceStr, Value>;

/// State of one projection invocation.
///
/// Each invocation owns its `self` cell and frame chain. Nested invocations
/// get a fresh activation and cannot see the caller's bindings.
#[derive(Debug)]
pub(crate) struct Activation {
    pub self_node: NodeId,
    pub direction: Direction,
    // Number of host modules visible to the projection being run.
    pub host_epoch: usize,
    // Set by `return`; unwinds every enclosing block and loop.
    pub returning: bool,
    frames: Vec<Frame>,
}

impl Activation {
    pub fn new(self_node: NodeId, direction: Direction, host_epoch: usize) -> Self {
        Self {
            self_node,
            direction,
            host_epoch,
            returning: false,
            frames: vec![Frame::new()],
        }
    }

    pub fn push_frame(&mut self) {
        self.frames.push(Frame::new());
    }

    pub fn pop_frame(&mut self) -> Result<()> {
        // The outermost frame holds the parameters and lives as long as the activation.
        if self.frames.len() <= 1 {
            return Err(anyhow!("internal error: no frame to pop"));
        }
        self.frames.pop();
        Ok(())
    }

    pub fn bind(&mut self, name: SourceStr, value: Value) -> Result<()> {
        self.frames
            .last_mut()
            .ok_or_else(|| anyhow!("internal error: no active frame"))?
            .insert(name, value);
        Ok(())
    }

    /// Innermost binding of `name`.
    pub fn lookup(&self, name: &SourceStr) -> Option<&Value> {
        self.frames.iter().rev().find_map(|f| f.get(name))
    }
}
