// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::ast::*;
use crate::diagnostics::{Diagnostic, DiagnosticSink};
use crate::extensions::{HostContext, HostModule};
use crate::instructions::Instruction;
use crate::interpreter::{Interpreter, ProjectionError};
use crate::lexer::*;
use crate::options::{AbsentMemberPolicy, Options};
use crate::parser::*;
use crate::registry::{ProjectionHandle, ProjectionId, ProjectionRef, Registry};
use crate::state::StateMaps;
use crate::types::{NodeId, TypeGraph};
use crate::value::Value;
use crate::Rc;

use std::path::Path;

use anyhow::{anyhow, bail, Result};
use log::{info, warn};

/// A type graph together with the projections declared against it.
///
/// `Program` owns everything a projection run needs: the graph, the declared
/// projections, imported host modules, state maps and options. Cloning a
/// program takes an independent snapshot, so each thread can work on its own
/// fork.
#[derive(Debug, Clone, Default)]
pub struct Program {
    graph: TypeGraph,
    registry: Registry,
    hosts: Vec<Rc<HostModule>>,
    state: StateMaps,
    options: Options,
    diagnostics: Vec<Diagnostic>,
}

impl Program {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a program over an existing graph.
    pub fn with_graph(graph: TypeGraph) -> Self {
        Self {
            graph,
            ..Self::default()
        }
    }

    pub fn graph(&self) -> &TypeGraph {
        &self.graph
    }

    /// Mutable access for building the graph. Nodes can only be added.
    pub fn graph_mut(&mut self) -> &mut TypeGraph {
        &mut self.graph
    }

    pub fn state(&self) -> &StateMaps {
        &self.state
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    pub fn set_options(&mut self, options: Options) {
        self.options = options;
    }

    pub fn set_absent_member_policy(&mut self, policy: AbsentMemberPolicy) {
        self.options.absent_member = policy;
    }

    pub fn set_max_depth(&mut self, max_depth: usize) {
        self.options.max_depth = max_depth;
    }

    /// Makes the exports of `module` callable from projections declared after
    /// this call.
    pub fn import(&mut self, module: HostModule) {
        info!("importing host module `{}`", module.name());
        self.hosts.push(Rc::new(module));
    }

    /// Parses and declares the projections in `source`.
    ///
    /// Each declaration's selector must be a kind keyword (`model`, `op`, ...)
    /// or the name of a type already in the graph.
    pub fn add_projections(&mut self, path: String, source: String) -> Result<Vec<ProjectionId>> {
        let source = Source::from_contents(path, source)?;
        self.declare_source(&source)
    }

    pub fn add_projections_from_file<P: AsRef<Path>>(&mut self, path: P) -> Result<Vec<ProjectionId>> {
        let source = Source::from_file(path)?;
        self.declare_source(&source)
    }

    fn declare_source(&mut self, source: &Source) -> Result<Vec<ProjectionId>> {
        let mut parser = Parser::new(source)?;
        let module: Module = parser.parse()?;
        let epoch = self.hosts.len();
        let mut ids = Vec::with_capacity(module.projections.len());
        for decl in &module.projections {
            ids.push(self.registry.declare(&self.graph, decl, epoch)?);
        }
        info!(
            "declared {} projections from {} ({} total)",
            ids.len(),
            source.file(),
            self.registry.len()
        );
        Ok(ids)
    }

    /// Projections applicable to `node`, in declaration order.
    pub fn projections(&self, node: NodeId) -> Vec<ProjectionRef> {
        self.registry
            .applicable(&self.graph, node)
            .map(|p| p.to_ref())
            .collect()
    }

    /// First projection applicable to `node` named `name`.
    pub fn projection(&self, node: NodeId, name: &str) -> Option<ProjectionRef> {
        self.registry
            .resolve(&self.graph, node, name)
            .map(|p| p.to_ref())
    }

    /// Runs `handle` on `node`.
    ///
    /// On failure a single `invalid-projection` diagnostic is recorded and
    /// `None` is returned.
    pub fn project(
        &mut self,
        node: NodeId,
        handle: ProjectionHandle,
        args: &[Value],
    ) -> Option<NodeId> {
        let mut diagnostics = core::mem::take(&mut self.diagnostics);
        let result = self.project_with_sink(node, handle, args, &mut diagnostics);
        self.diagnostics = diagnostics;
        result
    }

    /// Like [`Program::project`], reporting failures to `sink`.
    pub fn project_with_sink(
        &mut self,
        node: NodeId,
        handle: ProjectionHandle,
        args: &[Value],
        sink: &mut dyn DiagnosticSink,
    ) -> Option<NodeId> {
        match self.try_project(node, handle, args) {
            Ok(result) => Some(result),
            Err(e) => {
                warn!("projection of {node} failed: {e}");
                sink.report(Diagnostic::invalid_projection(node, &e));
                None
            }
        }
    }

    pub fn try_project(
        &mut self,
        node: NodeId,
        handle: ProjectionHandle,
        args: &[Value],
    ) -> Result<NodeId, ProjectionError> {
        Interpreter::new(
            &mut self.graph,
            &self.registry,
            &self.hosts,
            &self.state,
            &self.options,
        )
        .project(node, handle, args)
    }

    /// Structural edits `handle` performs on `node`, in execution order.
    ///
    /// On failure a single `invalid-projection` diagnostic is recorded and
    /// `None` is returned.
    pub fn get_projection_instructions(
        &mut self,
        node: NodeId,
        handle: ProjectionHandle,
        args: &[Value],
    ) -> Option<Vec<Instruction>> {
        match self.try_get_projection_instructions(node, handle, args) {
            Ok(instructions) => Some(instructions),
            Err(e) => {
                warn!("projection of {node} failed: {e}");
                self.diagnostics
                    .report(Diagnostic::invalid_projection(node, &e));
                None
            }
        }
    }

    pub fn try_get_projection_instructions(
        &mut self,
        node: NodeId,
        handle: ProjectionHandle,
        args: &[Value],
    ) -> Result<Vec<Instruction>, ProjectionError> {
        Interpreter::new(
            &mut self.graph,
            &self.registry,
            &self.hosts,
            &self.state,
            &self.options,
        )
        .instructions(node, handle, args)
    }

    /// Applies an imported decorator to `target`, as the schema compiler does
    /// for `@name(args)` on a declaration.
    pub fn call_decorator(&mut self, name: &str, target: NodeId, args: Vec<Value>) -> Result<Value> {
        let decorator = self
            .hosts
            .iter()
            .rev()
            .find_map(|m| m.decorator(name).cloned())
            .ok_or_else(|| anyhow!("decorator `{name}` is not declared"))?;
        if self.graph.get(target).is_none() {
            bail!("{target} is not a node of this graph");
        }
        let mut params = Vec::with_capacity(args.len() + 1);
        params.push(Value::Type(target));
        params.extend(args);
        let mut ctx = HostContext::new(&self.graph, &self.state);
        decorator.call(&mut ctx, params)
    }

    /// Calls an imported function by name.
    pub fn call_function(&self, name: &str, args: Vec<Value>) -> Result<Value> {
        let function = self
            .hosts
            .iter()
            .rev()
            .find_map(|m| m.function(name).cloned())
            .ok_or_else(|| anyhow!("function `{name}` is not declared"))?;
        let mut ctx = HostContext::new(&self.graph, &self.state);
        function.call(&mut ctx, args)
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn take_diagnostics(&mut self) -> Vec<Diagnostic> {
        core::mem::take(&mut self.diagnostics)
    }
}
