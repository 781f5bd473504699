// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::ast::*;
use crate::builtins::{STRING_METHODS, STRUCTURAL_METHODS};
use crate::extensions::{HostContext, HostFunction, HostModule};
use crate::instructions::{Instruction, OperationKind, Recorder};
use crate::lexer::Span;
use crate::options::Options;
use crate::registry::{Direction, Projection, ProjectionHandle, Registry};
use crate::scope::Activation;
use crate::state::StateMaps;
use crate::types::{IntrinsicName, MemberSlot, NodeId, TypeGraph};
use crate::value::Value;
use crate::Rc;

use std::collections::BTreeMap;

use anyhow::{anyhow, Result};
use log::{debug, info};

mod error;
mod loops;
mod structural;

pub use error::ProjectionError;

type MemoKey = (NodeId, crate::registry::ProjectionId, Direction, Vec<Value>);

#[derive(Debug, Clone, Copy)]
enum MemoEntry {
    InProgress,
    Done(NodeId),
}

/// Result of evaluating an expression.
#[derive(Debug, Clone)]
pub(crate) enum Operand {
    Value(Value),
    /// Snapshot of a node's child collection, in declaration order.
    Members(Vec<NodeId>),
    /// A declared projection referenced by bare name, e.g. `v` in
    /// `self.projectProperty(p.name, v, version)`.
    Projection(Rc<str>),
}

impl From<Value> for Operand {
    fn from(v: Value) -> Self {
        Operand::Value(v)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Return,
}

pub(crate) fn located(span: &Span, msg: &str) -> Rc<str> {
    format!(
        "{msg} (at {}:{}:{})",
        span.source.file(),
        span.line,
        span.col
    )
    .into()
}

pub(crate) fn type_mismatch(span: &Span, msg: &str) -> anyhow::Error {
    ProjectionError::TypeMismatch(located(span, msg)).into()
}

pub(crate) fn unknown_member(span: &Span, msg: &str) -> anyhow::Error {
    ProjectionError::UnknownMember(located(span, msg)).into()
}

pub(crate) struct Interpreter<'a> {
    graph: &'a mut TypeGraph,
    registry: &'a Registry,
    hosts: &'a [Rc<HostModule>],
    state: &'a StateMaps,
    options: &'a Options,
    activations: Vec<Activation>,
    memo: BTreeMap<MemoKey, MemoEntry>,
    recorder: Option<Recorder>,
    // Nodes at or above this index were allocated by the current call.
    watermark: usize,
}

impl<'a> Interpreter<'a> {
    pub fn new(
        graph: &'a mut TypeGraph,
        registry: &'a Registry,
        hosts: &'a [Rc<HostModule>],
        state: &'a StateMaps,
        options: &'a Options,
    ) -> Self {
        let watermark = graph.len();
        Self {
            graph,
            registry,
            hosts,
            state,
            options,
            activations: vec![],
            memo: BTreeMap::new(),
            recorder: None,
            watermark,
        }
    }

    pub fn project(
        &mut self,
        node: NodeId,
        handle: ProjectionHandle,
        args: &[Value],
    ) -> Result<NodeId, ProjectionError> {
        self.run(node, handle, args)
            .map_err(ProjectionError::from_anyhow)
    }

    pub fn instructions(
        &mut self,
        node: NodeId,
        handle: ProjectionHandle,
        args: &[Value],
    ) -> Result<Vec<Instruction>, ProjectionError> {
        let mark = self.graph.len();
        self.recorder = Some(Recorder::default());
        let result = self.run(node, handle, args);
        let recorder = self.recorder.take().unwrap_or_default();
        result.map_err(ProjectionError::from_anyhow)?;
        let instructions = recorder.into_instructions();

        // Only nodes referenced by recorded arguments outlive the call.
        let keep = instructions
            .iter()
            .flat_map(|i| i.extra_args.iter())
            .filter_map(|v| match v {
                Value::Type(id) => Some(id.index() + 1),
                _ => None,
            })
            .fold(mark, usize::max);
        self.release(keep);
        Ok(instructions)
    }

    fn run(&mut self, node: NodeId, handle: ProjectionHandle, args: &[Value]) -> Result<NodeId> {
        let mark = self.graph.len();
        let result = self.project_node(node, handle, args);
        if result.is_err() {
            self.release(mark);
        }
        result
    }

    /// Releases the nodes allocated at or after `len` along with their state.
    fn release(&mut self, len: usize) {
        if self.graph.len() > len {
            debug!("releasing {} scratch nodes", self.graph.len() - len);
            self.state.discard_from(len);
            self.graph.truncate(len);
        }
    }

    fn project_node(
        &mut self,
        node: NodeId,
        handle: ProjectionHandle,
        args: &[Value],
    ) -> Result<NodeId> {
        if self.graph.get(node).is_none() {
            return Err(ProjectionError::TypeMismatch(
                format!("{node} is not a node of this graph").into(),
            )
            .into());
        }
        let registry = self.registry;
        let projection = registry.get(handle.projection).ok_or_else(|| {
            ProjectionError::UnknownProjection(
                format!("no projection with id {}", handle.projection.index()).into(),
            )
        })?;

        info!(
            "projecting {} with {}#{} ({}) args {:?}",
            self.graph.describe(node),
            projection.name,
            handle.direction,
            projection.span.source.file(),
            args
        );

        self.watermark = self.graph.len();
        self.memo.clear();
        self.activations.clear();
        let result = self.invoke(node, projection, handle.direction, args.to_vec())?;
        info!("projected {} into {}", node, self.graph.describe(result));
        Ok(result)
    }

    fn activation(&self) -> Result<&Activation> {
        self.activations
            .last()
            .ok_or_else(|| anyhow!("internal error: no active projection"))
    }

    fn activation_mut(&mut self) -> Result<&mut Activation> {
        self.activations
            .last_mut()
            .ok_or_else(|| anyhow!("internal error: no active projection"))
    }

    pub(crate) fn self_node(&self) -> Result<NodeId> {
        Ok(self.activation()?.self_node)
    }

    pub(crate) fn set_self(&mut self, node: NodeId) -> Result<()> {
        self.activation_mut()?.self_node = node;
        Ok(())
    }

    // Instructions are only kept for the outermost activation; nested runs
    // are summarized by the `projectX` that triggered them.
    pub(crate) fn record(&mut self, op: OperationKind, target_name: &str, extra_args: Vec<Value>) {
        if self.activations.len() == 1 {
            if let Some(recorder) = self.recorder.as_mut() {
                recorder.record(op, target_name, extra_args);
            }
        }
    }

    /// Runs one direction of `projection` with `self` bound to `node`.
    fn invoke(
        &mut self,
        node: NodeId,
        projection: &Projection,
        direction: Direction,
        args: Vec<Value>,
    ) -> Result<NodeId> {
        let decl = match projection.body(direction) {
            Some(decl) => decl.clone(),
            None => {
                return Err(ProjectionError::UnknownProjection(
                    located(
                        &projection.span,
                        &format!(
                            "projection `{}` has no `{direction}` direction",
                            projection.name
                        ),
                    ),
                )
                .into())
            }
        };

        let key = (node, projection.id, direction, args.clone());
        match self.memo.get(&key) {
            Some(MemoEntry::Done(result)) => {
                debug!("reusing {}#{} on {node}", projection.name, direction);
                return Ok(*result);
            }
            Some(MemoEntry::InProgress) => {
                debug!(
                    "cycle through {}#{} on {node}; leaving node unchanged",
                    projection.name, direction
                );
                return Ok(node);
            }
            None => (),
        }

        if self.activations.len() >= self.options.max_depth {
            return Err(ProjectionError::RecursionLimit {
                limit: self.options.max_depth,
                message: located(
                    &projection.span,
                    &format!(
                        "while applying `{}` to {}",
                        projection.name,
                        self.graph.describe(node)
                    ),
                ),
            }
            .into());
        }

        self.memo.insert(key.clone(), MemoEntry::InProgress);
        let mut activation = Activation::new(node, direction, projection.host_epoch);
        for (idx, param) in decl.params.iter().enumerate() {
            // Missing arguments are bound to none.
            activation.bind(param.source_str(), args.get(idx).cloned().unwrap_or_default())?;
        }
        self.activations.push(activation);

        let result = self.eval_block(&decl.body);
        let activation = self
            .activations
            .pop()
            .ok_or_else(|| anyhow!("internal error: activation stack underflow"))?;
        result?;

        let projected = activation.self_node;
        self.memo.insert(key, MemoEntry::Done(projected));
        Ok(projected)
    }

    /// Applies the projection named `name` to `node` in the current direction.
    ///
    /// A node with no applicable projection of that name is returned as is.
    pub(crate) fn apply_named_projection(
        &mut self,
        span: &Span,
        node: NodeId,
        name: &str,
        args: Vec<Value>,
    ) -> Result<NodeId> {
        let registry = self.registry;
        if !registry.is_declared(name) {
            return Err(ProjectionError::UnknownProjection(located(
                span,
                &format!("no projection named `{name}` is declared"),
            ))
            .into());
        }
        let direction = self
            .activations
            .last()
            .map_or(Direction::To, |a| a.direction);
        match registry.resolve(self.graph, node, name) {
            Some(projection) => self.invoke(node, projection, direction, args),
            None => {
                debug!(
                    "`{name}` does not apply to {}; leaving it unchanged",
                    self.graph.describe(node)
                );
                Ok(node)
            }
        }
    }

    fn eval_block(&mut self, block: &Ref<Block>) -> Result<Flow> {
        self.activation_mut()?.push_frame();
        for stmt in &block.stmts {
            if self.eval_stmt(stmt)? == Flow::Return {
                self.activation_mut()?.pop_frame()?;
                return Ok(Flow::Return);
            }
        }
        self.activation_mut()?.pop_frame()?;
        Ok(Flow::Continue)
    }

    fn eval_stmt(&mut self, stmt: &Ref<Stmt>) -> Result<Flow> {
        match stmt.as_ref() {
            Stmt::Expr { expr, .. } => {
                self.eval_expr(expr)?;
                // A `return` inside a forEach body unwinds through here.
                match self.activation()?.returning {
                    true => Ok(Flow::Return),
                    false => Ok(Flow::Continue),
                }
            }
            Stmt::If {
                cond,
                then,
                otherwise,
                ..
            } => {
                let cond = self.eval_expr(cond)?;
                if self.is_truthy(&cond) {
                    self.eval_block(then)
                } else if let Some(otherwise) = otherwise {
                    self.eval_block(otherwise)
                } else {
                    Ok(Flow::Continue)
                }
            }
            Stmt::Return { span, expr } => {
                let value = self.eval_value(expr)?;
                let node = match value {
                    Value::Type(id) => id,
                    Value::None => {
                        return Err(type_mismatch(span, "cannot return none from a projection"))
                    }
                    v => self.graph.type_of_value(&v),
                };
                debug!("return replaces self with {}", self.graph.describe(node));
                self.set_self(node)?;
                self.activation_mut()?.returning = true;
                Ok(Flow::Return)
            }
        }
    }

    fn is_truthy(&self, operand: &Operand) -> bool {
        match operand {
            Operand::Value(Value::None) => false,
            Operand::Value(Value::Bool(b)) => *b,
            Operand::Value(Value::Number(n)) => *n != 0.0,
            Operand::Value(Value::String(s)) => !s.is_empty(),
            Operand::Value(Value::Type(id)) => ![
                IntrinsicName::Void,
                IntrinsicName::Never,
                IntrinsicName::Null,
            ]
            .iter()
            .any(|i| self.graph.is_intrinsic(*id, *i)),
            Operand::Members(items) => !items.is_empty(),
            Operand::Projection(_) => true,
        }
    }

    pub(crate) fn eval_value(&mut self, expr: &Ref<Expr>) -> Result<Value> {
        match self.eval_expr(expr)? {
            Operand::Value(v) => Ok(v),
            Operand::Members(_) => Err(type_mismatch(
                expr.span(),
                "a member collection cannot be used as a value",
            )),
            Operand::Projection(name) => Err(type_mismatch(
                expr.span(),
                &format!("projection `{name}` cannot be used as a value"),
            )),
        }
    }

    fn eval_values(&mut self, exprs: &[Ref<Expr>]) -> Result<Vec<Value>> {
        exprs.iter().map(|e| self.eval_value(e)).collect()
    }

    fn eval_expr(&mut self, expr: &Ref<Expr>) -> Result<Operand> {
        match expr.as_ref() {
            Expr::String { value, .. } | Expr::Number { value, .. } | Expr::Bool { value, .. } => {
                Ok(Operand::Value(value.clone()))
            }
            Expr::Ident { span } => self.resolve_ident(span),
            Expr::Member { refr, field, .. } => {
                let target = self.eval_expr(refr)?;
                self.read_field(field, target)
            }
            Expr::Call { span, fcn, params } => self.eval_call(span, fcn, params),
            Expr::Decorator { name, params, .. } => {
                let mut args = self.eval_values(params)?;
                if let Some(Value::Type(target)) = args.first() {
                    let target = self.materialize(*target)?;
                    args[0] = Value::Type(target);
                }
                self.call_host(name, true, args).map(Operand::Value)
            }
            Expr::ProjectionRef {
                target, name, args, ..
            } => {
                let node = match self.eval_value(target)? {
                    Value::Type(id) => id,
                    v => {
                        return Err(type_mismatch(
                            target.span(),
                            &format!("projection `{}` applied to non-type {v}", name.text()),
                        ))
                    }
                };
                let args = self.eval_values(args)?;
                let result = self.apply_named_projection(name, node, name.text(), args)?;
                Ok(Operand::Value(Value::Type(result)))
            }
            Expr::Lambda { span, .. } => Err(type_mismatch(
                span,
                "a lambda can only be passed to forEach",
            )),
            Expr::Unary { span, op, expr } => {
                let operand = self.eval_expr(expr)?;
                match (op, operand) {
                    (UnaryOp::Not, v) => Ok(Value::Bool(!self.is_truthy(&v)).into()),
                    (UnaryOp::Neg, Operand::Value(Value::Number(n))) => {
                        Ok(Value::Number(-n).into())
                    }
                    (UnaryOp::Neg, _) => Err(type_mismatch(span, "unary - expects a number")),
                }
            }
            Expr::ArithExpr { span, op, lhs, rhs } => {
                let lhs = self.eval_value(lhs)?;
                let rhs = self.eval_value(rhs)?;
                Self::eval_arith(span, *op, lhs, rhs).map(Operand::Value)
            }
            Expr::BoolExpr { span, op, lhs, rhs } => {
                let lhs = self.eval_value(lhs)?;
                let rhs = self.eval_value(rhs)?;
                Self::eval_compare(span, *op, lhs, rhs).map(Operand::Value)
            }
            Expr::LogicExpr { op, lhs, rhs, .. } => {
                let lhs = self.eval_expr(lhs)?;
                let result = match (op, self.is_truthy(&lhs)) {
                    (LogicOp::And, false) => false,
                    (LogicOp::Or, true) => true,
                    _ => {
                        let rhs = self.eval_expr(rhs)?;
                        self.is_truthy(&rhs)
                    }
                };
                Ok(Value::Bool(result).into())
            }
        }
    }

    fn eval_arith(span: &Span, op: ArithOp, lhs: Value, rhs: Value) -> Result<Value> {
        match (op, &lhs, &rhs) {
            (ArithOp::Add, Value::Number(a), Value::Number(b)) => Ok(Value::Number(a + b)),
            (ArithOp::Sub, Value::Number(a), Value::Number(b)) => Ok(Value::Number(a - b)),
            (ArithOp::Mul, Value::Number(a), Value::Number(b)) => Ok(Value::Number(a * b)),
            (ArithOp::Div, Value::Number(a), Value::Number(b)) => Ok(Value::Number(a / b)),
            (ArithOp::Add, Value::String(a), Value::String(b)) => {
                Ok(Value::from(format!("{a}{b}")))
            }
            _ => Err(type_mismatch(
                span,
                &format!(
                    "cannot apply {op:?} to {} and {}",
                    lhs.kind_name(),
                    rhs.kind_name()
                ),
            )),
        }
    }

    fn eval_compare(span: &Span, op: BoolOp, lhs: Value, rhs: Value) -> Result<Value> {
        let ordered = matches!(
            (&lhs, &rhs),
            (Value::Number(_), Value::Number(_)) | (Value::String(_), Value::String(_))
        );
        let same_kind = core::mem::discriminant(&lhs) == core::mem::discriminant(&rhs);
        let result = match op {
            BoolOp::Eq if same_kind => lhs == rhs,
            BoolOp::Ne if same_kind => lhs != rhs,
            // Compare numbers with IEEE semantics rather than the total order.
            BoolOp::Lt if ordered => Self::partial(&lhs, &rhs).is_some_and(|o| o.is_lt()),
            BoolOp::Le if ordered => Self::partial(&lhs, &rhs).is_some_and(|o| o.is_le()),
            BoolOp::Gt if ordered => Self::partial(&lhs, &rhs).is_some_and(|o| o.is_gt()),
            BoolOp::Ge if ordered => Self::partial(&lhs, &rhs).is_some_and(|o| o.is_ge()),
            _ => {
                return Err(type_mismatch(
                    span,
                    &format!(
                        "cannot compare {} with {} using {op:?}",
                        lhs.kind_name(),
                        rhs.kind_name()
                    ),
                ))
            }
        };
        Ok(Value::Bool(result))
    }

    fn partial(lhs: &Value, rhs: &Value) -> Option<core::cmp::Ordering> {
        match (lhs, rhs) {
            (Value::Number(a), Value::Number(b)) => a.partial_cmp(b),
            (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }

    fn resolve_ident(&mut self, span: &Span) -> Result<Operand> {
        if let Some(v) = self.activation()?.lookup(&span.source_str()) {
            return Ok(Operand::Value(v.clone()));
        }

        let name = span.text();
        if name == "self" {
            return Ok(Value::Type(self.self_node()?).into());
        }
        if let Some(intrinsic) = IntrinsicName::from_name(name) {
            return Ok(Value::Type(self.graph.intrinsic(intrinsic)).into());
        }
        if let Some(node) = self.graph.lookup(name) {
            return Ok(Value::Type(node).into());
        }
        if self.registry.is_declared(name) {
            return Ok(Operand::Projection(name.into()));
        }
        Err(ProjectionError::UndeclaredIdentifier(located(
            span,
            &format!("`{name}` is not declared"),
        ))
        .into())
    }

    fn read_field(&mut self, field: &Span, target: Operand) -> Result<Operand> {
        let name = field.text();
        let node = match target {
            Operand::Value(Value::Type(node)) => node,
            Operand::Members(items) if name == "size" => {
                return Ok(Value::Number(items.len() as f64).into())
            }
            Operand::Value(Value::String(s)) if name == "length" => {
                return Ok(Value::Number(s.chars().count() as f64).into())
            }
            Operand::Value(v) => {
                return Err(unknown_member(
                    field,
                    &format!("{} has no member `{name}`", v.kind_name()),
                ))
            }
            _ => return Err(unknown_member(field, &format!("no member `{name}`"))),
        };

        let graph = &*self.graph;
        let n = graph.node(node);
        let missing = || unknown_member(field, &format!("{} has no `{name}`", graph.describe(node)));
        let value = match name {
            "name" => match n.name() {
                Some(s) => Value::from(s),
                None => Value::None,
            },
            "kind" => Value::from(n.kind().as_str()),
            "type" => Value::Type(n.member_type().ok_or_else(missing)?),
            "returnType" => Value::Type(n.return_type().ok_or_else(missing)?),
            "parameters" => Value::Type(n.parameters().ok_or_else(missing)?),
            "optional" => match n.data() {
                crate::types::TypeData::ModelProperty { optional, .. } => Value::Bool(*optional),
                _ => return Err(missing()),
            },
            "value" => match n.data() {
                crate::types::TypeData::EnumMember { value, .. } => {
                    value.clone().unwrap_or_else(|| Value::from(n.name().unwrap_or_default()))
                }
                _ => return Err(missing()),
            },
            _ => match MemberSlot::from_collection_name(name).and_then(|slot| n.members(slot)) {
                Some(members) => return Ok(Operand::Members(members.values().copied().collect())),
                None => return Err(missing()),
            },
        };
        Ok(value.into())
    }

    fn eval_call(&mut self, span: &Span, fcn: &Ref<Expr>, params: &[Ref<Expr>]) -> Result<Operand> {
        match fcn.as_ref() {
            Expr::Ident { span: name } => {
                let args = self.eval_values(params)?;
                self.call_host(name, false, args).map(Operand::Value)
            }
            Expr::Member { refr, field, .. } => {
                let receiver = self.eval_expr(refr)?;
                let method = field.text();
                match receiver {
                    Operand::Members(items) if method == "forEach" => {
                        self.eval_for_each(span, items, params)?;
                        Ok(Value::None.into())
                    }
                    Operand::Value(Value::String(s)) => match STRING_METHODS.get(method) {
                        Some(f) if params.is_empty() => Ok(Value::from(f(&s)).into()),
                        Some(_) => Err(type_mismatch(
                            span,
                            &format!("`{method}` takes no arguments"),
                        )),
                        None => Err(unknown_member(
                            field,
                            &format!("string has no method `{method}`"),
                        )),
                    },
                    Operand::Value(Value::Type(node)) => match STRUCTURAL_METHODS.get(method) {
                        Some(op) => {
                            let mut args = Vec::with_capacity(params.len());
                            for p in params {
                                args.push(self.eval_expr(p)?);
                            }
                            self.eval_structural(span, field, *op, node, args)
                                .map(Operand::Value)
                        }
                        None => Err(unknown_member(
                            field,
                            &format!(
                                "{} has no method `{method}`",
                                self.graph.describe(node)
                            ),
                        )),
                    },
                    Operand::Value(v) => Err(unknown_member(
                        field,
                        &format!("{} has no method `{method}`", v.kind_name()),
                    )),
                    _ => Err(unknown_member(field, &format!("no method `{method}`"))),
                }
            }
            _ => Err(type_mismatch(fcn.span(), "expression is not callable")),
        }
    }

    fn lookup_host(&self, name: &str, decorator: bool) -> Result<Option<Rc<dyn HostFunction>>> {
        let epoch = self.activation()?.host_epoch.min(self.hosts.len());
        Ok(self.hosts[..epoch].iter().rev().find_map(|m| {
            if decorator {
                m.decorator(name).cloned()
            } else {
                m.function(name).cloned()
            }
        }))
    }

    fn call_host(&mut self, name: &Span, decorator: bool, args: Vec<Value>) -> Result<Value> {
        let fname = name.text();
        let f = match self.lookup_host(fname, decorator)? {
            Some(f) => f,
            None => {
                let what = if decorator { "decorator" } else { "function" };
                return Err(ProjectionError::UndeclaredIdentifier(located(
                    name,
                    &format!("{what} `{fname}` is not declared"),
                ))
                .into());
            }
        };

        debug!("calling host {fname} with {args:?}");
        let mut ctx = HostContext::new(self.graph, self.state);
        let value = f.call(&mut ctx, args).map_err(|e| ProjectionError::Host {
            function: fname.into(),
            message: located(name, &format!("{e:#}")),
        })?;
        if let Value::Type(id) = &value {
            if self.graph.get(*id).is_none() {
                return Err(ProjectionError::Host {
                    function: fname.into(),
                    message: located(
                        name,
                        &format!("returned {id}, which is not a node of this graph"),
                    ),
                }
                .into());
            }
        }
        Ok(value)
    }

    /// Gives a decorator target a node private to this call, so decorators
    /// applied by a projection never land on source nodes.
    fn materialize(&mut self, node: NodeId) -> Result<NodeId> {
        if node.index() >= self.watermark {
            return Ok(node);
        }
        let self_node = self.self_node()?;
        if node == self_node {
            let copy = self.graph.derive(node);
            self.set_self(copy)?;
            return Ok(copy);
        }
        if let Some((name, live)) = self.live_member(node)? {
            if live.index() >= self.watermark {
                return Ok(live);
            }
            let copy = self.graph.derive(live);
            let updated = self.graph.derive_with_member(self_node, &name, copy)?;
            self.set_self(updated)?;
            return Ok(copy);
        }
        let copy = self.graph.derive(node);
        debug!(
            "decorating detached copy {copy} of {}",
            self.graph.describe(node)
        );
        Ok(copy)
    }

    /// The member of the current `self` sharing `node`'s lineage.
    pub(crate) fn live_member(&self, node: NodeId) -> Result<Option<(Rc<str>, NodeId)>> {
        let self_node = self.self_node()?;
        let graph = &*self.graph;
        let members = match graph.node(self_node).data().members() {
            Some(members) => members,
            None => return Ok(None),
        };
        let root = graph.lineage_root(node);
        Ok(members
            .iter()
            .find(|(_, m)| graph.lineage_root(**m) == root)
            .map(|(name, m)| (name.clone(), *m)))
    }
}
