// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Host functions callable from projection bodies.
//!
//! A [`HostModule`] bundles plain functions (called as `name(...)`) and
//! decorators (called as `@name(...)`). Once imported into a
//! [`Program`](crate::Program), its exports are visible by bare name in every
//! projection declared afterwards.

use crate::state::{StateKey, StateMaps};
use crate::types::{NodeId, TypeGraph};
use crate::value::Value;
use crate::Rc;

use core::fmt;
use std::collections::BTreeMap;

use anyhow::{bail, Result};

pub mod doc;
pub mod versioning;

/// Read access to the graph plus read/write access to state maps, handed to
/// every host function call.
pub struct HostContext<'a> {
    graph: &'a TypeGraph,
    state: &'a StateMaps,
}

impl<'a> HostContext<'a> {
    pub fn new(graph: &'a TypeGraph, state: &'a StateMaps) -> Self {
        Self { graph, state }
    }

    pub fn graph(&self) -> &TypeGraph {
        self.graph
    }

    pub fn state(&self) -> &StateMaps {
        self.state
    }

    /// Reads the entry for `node`, falling back to the nodes it was derived from.
    pub fn get_state(&self, key: StateKey, node: NodeId) -> Option<Value> {
        self.state.get(self.graph, key, node)
    }

    pub fn set_state(&self, key: StateKey, node: NodeId, value: Value) {
        self.state.set(key, node, value)
    }

    /// The node passed as argument `idx`, erroring if it is missing or not a type.
    pub fn node_arg(&self, name: &str, args: &[Value], idx: usize) -> Result<NodeId> {
        match args.get(idx) {
            Some(Value::Type(id)) if self.graph.get(*id).is_some() => Ok(*id),
            Some(v) => bail!("`{name}` expects a type as argument {}, got {v}", idx + 1),
            None => bail!("`{name}` expects at least {} arguments", idx + 1),
        }
    }
}

/// A function exported by a host module.
///
/// By convention the first argument is the node being inspected or decorated.
pub trait HostFunction: Send + Sync {
    fn call(&self, ctx: &mut HostContext<'_>, args: Vec<Value>) -> Result<Value>;
}

impl<F> HostFunction for F
where
    F: Fn(&mut HostContext<'_>, Vec<Value>) -> Result<Value> + Send + Sync,
{
    fn call(&self, ctx: &mut HostContext<'_>, args: Vec<Value>) -> Result<Value> {
        self(ctx, args)
    }
}

#[derive(Clone)]
pub struct HostModule {
    name: String,
    functions: BTreeMap<String, Rc<dyn HostFunction>>,
    decorators: BTreeMap<String, Rc<dyn HostFunction>>,
}

impl fmt::Debug for HostModule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostModule")
            .field("name", &self.name)
            .field("functions", &self.functions.keys().collect::<Vec<_>>())
            .field("decorators", &self.decorators.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl HostModule {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            functions: BTreeMap::new(),
            decorators: BTreeMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn with_function<F>(mut self, name: &str, f: F) -> Self
    where
        F: Fn(&mut HostContext<'_>, Vec<Value>) -> Result<Value> + Send + Sync + 'static,
    {
        self.functions.insert(name.to_string(), Rc::new(f));
        self
    }

    pub fn with_decorator<F>(mut self, name: &str, f: F) -> Self
    where
        F: Fn(&mut HostContext<'_>, Vec<Value>) -> Result<Value> + Send + Sync + 'static,
    {
        self.decorators.insert(name.to_string(), Rc::new(f));
        self
    }

    /// Registers a function implemented by a type rather than a closure.
    pub fn with_host_function(mut self, name: &str, f: impl HostFunction + 'static) -> Self {
        self.functions.insert(name.to_string(), Rc::new(f));
        self
    }

    pub fn function(&self, name: &str) -> Option<&Rc<dyn HostFunction>> {
        self.functions.get(name)
    }

    pub fn decorator(&self, name: &str) -> Option<&Rc<dyn HostFunction>> {
        self.decorators.get(name)
    }

    pub fn function_names(&self) -> impl Iterator<Item = &str> {
        self.functions.keys().map(|k| k.as_str())
    }

    pub fn decorator_names(&self) -> impl Iterator<Item = &str> {
        self.decorators.keys().map(|k| k.as_str())
    }
}
