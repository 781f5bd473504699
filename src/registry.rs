// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::ast::{DirectionDecl, ProjectionDecl, Ref};
use crate::lexer::Span;
use crate::types::{NodeId, TypeGraph, TypeKind};
use crate::Rc;

use core::fmt;

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Direction {
    To,
    From,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match self {
            Direction::To => "to",
            Direction::From => "from",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ProjectionId(u32);

impl ProjectionId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// What a projection declaration applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjectionTarget {
    /// Every node of a kind, e.g. `projection model#v`.
    Kind(TypeKind),
    /// One declared node, e.g. `projection Foo#v`.
    Node(NodeId),
}

/// A direction of one projection, usable with [`Program::project`](crate::Program::project).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ProjectionHandle {
    pub projection: ProjectionId,
    pub direction: Direction,
}

/// Public view of a projection applicable to a node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectionRef {
    pub id: ProjectionId,
    pub name: Rc<str>,
    pub target: ProjectionTarget,
    has_to: bool,
    has_from: bool,
}

impl ProjectionRef {
    pub fn to(&self) -> Option<ProjectionHandle> {
        self.has_to.then_some(ProjectionHandle {
            projection: self.id,
            direction: Direction::To,
        })
    }

    pub fn from(&self) -> Option<ProjectionHandle> {
        self.has_from.then_some(ProjectionHandle {
            projection: self.id,
            direction: Direction::From,
        })
    }
}

#[derive(Debug, Clone)]
pub(crate) struct Projection {
    pub id: ProjectionId,
    pub target: ProjectionTarget,
    pub name: Rc<str>,
    pub to: Option<Ref<DirectionDecl>>,
    pub from: Option<Ref<DirectionDecl>>,
    // Host modules imported before the declaration.
    pub host_epoch: usize,
    pub span: Span,
}

impl Projection {
    pub fn body(&self, direction: Direction) -> Option<&Ref<DirectionDecl>> {
        match direction {
            Direction::To => self.to.as_ref(),
            Direction::From => self.from.as_ref(),
        }
    }

    pub fn applies_to(&self, graph: &TypeGraph, node: NodeId) -> bool {
        match self.target {
            ProjectionTarget::Kind(kind) => graph.kind(node) == kind,
            ProjectionTarget::Node(target) => graph.lineage(node).any(|n| n == target),
        }
    }

    pub fn to_ref(&self) -> ProjectionRef {
        ProjectionRef {
            id: self.id,
            name: self.name.clone(),
            target: self.target,
            has_to: self.to.is_some(),
            has_from: self.from.is_some(),
        }
    }
}

/// Declared projections, in declaration order.
#[derive(Debug, Clone, Default)]
pub(crate) struct Registry {
    projections: Vec<Projection>,
}

impl Registry {
    pub fn declare(
        &mut self,
        graph: &TypeGraph,
        decl: &Ref<ProjectionDecl>,
        host_epoch: usize,
    ) -> Result<ProjectionId> {
        let selector = decl.selector.text();
        let target = match TypeKind::from_selector(selector) {
            Some(kind) => ProjectionTarget::Kind(kind),
            None => match graph.lookup(selector) {
                Some(node) => ProjectionTarget::Node(node),
                None => bail!(decl
                    .selector
                    .error(&format!("`{selector}` is neither a type kind nor a declared type"))),
            },
        };

        let id = ProjectionId(self.projections.len() as u32);
        self.projections.push(Projection {
            id,
            target,
            name: decl.name.text().into(),
            to: decl.to.clone(),
            from: decl.from.clone(),
            host_epoch,
            span: decl.span.clone(),
        });
        Ok(id)
    }

    pub fn get(&self, id: ProjectionId) -> Option<&Projection> {
        self.projections.get(id.index())
    }

    pub fn applicable<'a>(
        &'a self,
        graph: &'a TypeGraph,
        node: NodeId,
    ) -> impl Iterator<Item = &'a Projection> + 'a {
        self.projections
            .iter()
            .filter(move |p| p.applies_to(graph, node))
    }

    /// First applicable projection named `name`.
    pub fn resolve(&self, graph: &TypeGraph, node: NodeId, name: &str) -> Option<&Projection> {
        self.projections
            .iter()
            .find(|p| p.applies_to(graph, node) && p.name.as_ref() == name)
    }

    /// Whether any projection, applicable or not, is named `name`.
    pub fn is_declared(&self, name: &str) -> bool {
        self.projections.iter().any(|p| p.name.as_ref() == name)
    }

    pub fn len(&self) -> usize {
        self.projections.len()
    }
}
