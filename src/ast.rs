// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::lexer::*;
use crate::value::Value;
use crate::*;

use core::{cmp, fmt, ops::Deref};

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum ArithOp {
    Add,
    Sub,
    Mul,
    Div,
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum BoolOp {
    Lt,
    Le,
    Eq,
    Ge,
    Gt,
    Ne,
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum LogicOp {
    And,
    Or,
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum UnaryOp {
    Not,
    Neg,
}

pub struct NodeRef<T> {
    r: Rc<T>,
}

impl<T> Clone for NodeRef<T> {
    fn clone(&self) -> Self {
        Self { r: self.r.clone() }
    }
}

impl<T: fmt::Debug> fmt::Debug for NodeRef<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.r.as_ref().fmt(f)
    }
}

impl<T> cmp::PartialEq for NodeRef<T> {
    fn eq(&self, other: &Self) -> bool {
        Rc::as_ptr(&self.r).eq(&Rc::as_ptr(&other.r))
    }
}

impl<T> cmp::Eq for NodeRef<T> {}

impl<T> cmp::Ord for NodeRef<T> {
    fn cmp(&self, other: &Self) -> cmp::Ordering {
        Rc::as_ptr(&self.r).cmp(&Rc::as_ptr(&other.r))
    }
}

impl<T> cmp::PartialOrd for NodeRef<T> {
    fn partial_cmp(&self, other: &Self) -> Option<cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Deref for NodeRef<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.r
    }
}

impl<T> AsRef<T> for NodeRef<T> {
    fn as_ref(&self) -> &T {
        self.deref()
    }
}

impl<T> NodeRef<T> {
    pub fn new(t: T) -> Self {
        Self { r: Rc::new(t) }
    }
}

pub type Ref<T> = NodeRef<T>;

#[derive(Debug)]
pub enum Expr {
    String {
        span: Span,
        value: Value,
    },

    Number {
        span: Span,
        value: Value,
    },

    Bool {
        span: Span,
        value: Value,
    },

    Ident {
        span: Span,
    },

    // a.b
    Member {
        span: Span,
        refr: Ref<Expr>,
        field: Span,
    },

    // f(a, b) and a.f(b)
    Call {
        span: Span,
        fcn: Ref<Expr>,
        params: Vec<Ref<Expr>>,
    },

    // @name(a, b)
    Decorator {
        span: Span,
        name: Span,
        params: Vec<Ref<Expr>>,
    },

    // a#name(b)
    ProjectionRef {
        span: Span,
        target: Ref<Expr>,
        name: Span,
        args: Vec<Ref<Expr>>,
    },

    // (p) => { ... }
    Lambda {
        span: Span,
        params: Vec<Span>,
        body: Ref<Block>,
    },

    Unary {
        span: Span,
        op: UnaryOp,
        expr: Ref<Expr>,
    },

    ArithExpr {
        span: Span,
        op: ArithOp,
        lhs: Ref<Expr>,
        rhs: Ref<Expr>,
    },

    BoolExpr {
        span: Span,
        op: BoolOp,
        lhs: Ref<Expr>,
        rhs: Ref<Expr>,
    },

    LogicExpr {
        span: Span,
        op: LogicOp,
        lhs: Ref<Expr>,
        rhs: Ref<Expr>,
    },
}

impl Expr {
    pub const fn span(&self) -> &Span {
        match *self {
            Self::String { ref span, .. }
            | Self::Number { ref span, .. }
            | Self::Bool { ref span, .. }
            | Self::Ident { ref span }
            | Self::Member { ref span, .. }
            | Self::Call { ref span, .. }
            | Self::Decorator { ref span, .. }
            | Self::ProjectionRef { ref span, .. }
            | Self::Lambda { ref span, .. }
            | Self::Unary { ref span, .. }
            | Self::ArithExpr { ref span, .. }
            | Self::BoolExpr { ref span, .. }
            | Self::LogicExpr { ref span, .. } => span,
        }
    }
}

#[derive(Debug)]
pub enum Stmt {
    Expr {
        span: Span,
        expr: Ref<Expr>,
    },

    // `else if` is represented as an `If` nested in `otherwise`.
    If {
        span: Span,
        cond: Ref<Expr>,
        then: Ref<Block>,
        otherwise: Option<Ref<Block>>,
    },

    Return {
        span: Span,
        expr: Ref<Expr>,
    },
}

impl Stmt {
    pub const fn span(&self) -> &Span {
        match *self {
            Self::Expr { ref span, .. }
            | Self::If { ref span, .. }
            | Self::Return { ref span, .. } => span,
        }
    }
}

#[derive(Debug)]
pub struct Block {
    pub span: Span,
    pub stmts: Vec<Ref<Stmt>>,
}

/// One direction (`to` or `from`) of a projection declaration.
#[derive(Debug)]
pub struct DirectionDecl {
    pub span: Span,
    pub params: Vec<Span>,
    pub body: Ref<Block>,
}

/// `projection <selector>#<name> { to(...) { ... } from(...) { ... } }`
///
/// The selector is either a node kind keyword (`model`, `op`, ...) or the
/// name of a declared type.
#[derive(Debug)]
pub struct ProjectionDecl {
    pub span: Span,
    pub selector: Span,
    pub name: Span,
    pub to: Option<Ref<DirectionDecl>>,
    pub from: Option<Ref<DirectionDecl>>,
}

#[derive(Debug)]
pub struct Module {
    pub projections: Vec<Ref<ProjectionDecl>>,
}
