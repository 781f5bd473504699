// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::value::Value;
use crate::Rc;

use core::fmt;
use std::collections::BTreeSet;

use anyhow::{anyhow, bail, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Stable identity of a node in a [`TypeGraph`].
///
/// Ids are handed out by the arena in allocation order. Nodes allocated by a
/// failed projection are released and their ids handed out again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeId(u32);

impl NodeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum TypeKind {
    Model,
    ModelProperty,
    Union,
    UnionVariant,
    Operation,
    Interface,
    Enum,
    EnumMember,
    Scalar,
    Intrinsic,
    StringLiteral,
    NumericLiteral,
    BooleanLiteral,
    Tuple,
}

impl TypeKind {
    /// Name of the kind as reported by `node.kind` inside projection bodies.
    pub fn as_str(self) -> &'static str {
        match self {
            TypeKind::Model => "Model",
            TypeKind::ModelProperty => "ModelProperty",
            TypeKind::Union => "Union",
            TypeKind::UnionVariant => "UnionVariant",
            TypeKind::Operation => "Operation",
            TypeKind::Interface => "Interface",
            TypeKind::Enum => "Enum",
            TypeKind::EnumMember => "EnumMember",
            TypeKind::Scalar => "Scalar",
            TypeKind::Intrinsic => "Intrinsic",
            TypeKind::StringLiteral => "String",
            TypeKind::NumericLiteral => "Number",
            TypeKind::BooleanLiteral => "Boolean",
            TypeKind::Tuple => "Tuple",
        }
    }

    /// Maps a projection selector keyword (`model`, `op`, ...) to a kind.
    pub fn from_selector(selector: &str) -> Option<TypeKind> {
        Some(match selector {
            "model" => TypeKind::Model,
            "modelproperty" => TypeKind::ModelProperty,
            "union" => TypeKind::Union,
            "unionvariant" => TypeKind::UnionVariant,
            "op" => TypeKind::Operation,
            "interface" => TypeKind::Interface,
            "enum" => TypeKind::Enum,
            "enummember" => TypeKind::EnumMember,
            "scalar" => TypeKind::Scalar,
            _ => return None,
        })
    }
}

impl fmt::Display for TypeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum IntrinsicName {
    Void,
    Never,
    Unknown,
    Null,
}

impl IntrinsicName {
    pub const ALL: [IntrinsicName; 4] = [
        IntrinsicName::Void,
        IntrinsicName::Never,
        IntrinsicName::Unknown,
        IntrinsicName::Null,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            IntrinsicName::Void => "void",
            IntrinsicName::Never => "never",
            IntrinsicName::Unknown => "unknown",
            IntrinsicName::Null => "null",
        }
    }

    pub fn from_name(name: &str) -> Option<IntrinsicName> {
        IntrinsicName::ALL.into_iter().find(|i| i.as_str() == name)
    }
}

/// The child collection a container kind owns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum MemberSlot {
    Properties,
    Variants,
    Operations,
    Members,
}

impl MemberSlot {
    pub fn collection_name(self) -> &'static str {
        match self {
            MemberSlot::Properties => "properties",
            MemberSlot::Variants => "variants",
            MemberSlot::Operations => "operations",
            MemberSlot::Members => "members",
        }
    }

    pub fn from_collection_name(name: &str) -> Option<MemberSlot> {
        Some(match name {
            "properties" => MemberSlot::Properties,
            "variants" => MemberSlot::Variants,
            "operations" => MemberSlot::Operations,
            "members" => MemberSlot::Members,
            _ => return None,
        })
    }

    /// Kind of the nodes stored in this slot.
    pub fn member_kind(self) -> TypeKind {
        match self {
            MemberSlot::Properties => TypeKind::ModelProperty,
            MemberSlot::Variants => TypeKind::UnionVariant,
            MemberSlot::Operations => TypeKind::Operation,
            MemberSlot::Members => TypeKind::EnumMember,
        }
    }
}

/// Ordered, name-unique child collection.
pub type Members = IndexMap<Rc<str>, NodeId>;

#[derive(Debug, Clone)]
pub enum TypeData {
    Model {
        name: Option<Rc<str>>,
        properties: Members,
    },
    ModelProperty {
        name: Rc<str>,
        r#type: NodeId,
        optional: bool,
    },
    Union {
        name: Option<Rc<str>>,
        variants: Members,
    },
    UnionVariant {
        name: Rc<str>,
        r#type: NodeId,
    },
    Operation {
        name: Rc<str>,
        parameters: NodeId,
        return_type: NodeId,
    },
    Interface {
        name: Rc<str>,
        operations: Members,
    },
    Enum {
        name: Rc<str>,
        members: Members,
    },
    EnumMember {
        name: Rc<str>,
        value: Option<Value>,
    },
    Scalar {
        name: Rc<str>,
        base: Option<NodeId>,
    },
    Intrinsic(IntrinsicName),
    StringLiteral(Rc<str>),
    NumericLiteral(f64),
    BooleanLiteral(bool),
    Tuple {
        values: Vec<NodeId>,
    },
}

impl TypeData {
    pub fn kind(&self) -> TypeKind {
        match self {
            TypeData::Model { .. } => TypeKind::Model,
            TypeData::ModelProperty { .. } => TypeKind::ModelProperty,
            TypeData::Union { .. } => TypeKind::Union,
            TypeData::UnionVariant { .. } => TypeKind::UnionVariant,
            TypeData::Operation { .. } => TypeKind::Operation,
            TypeData::Interface { .. } => TypeKind::Interface,
            TypeData::Enum { .. } => TypeKind::Enum,
            TypeData::EnumMember { .. } => TypeKind::EnumMember,
            TypeData::Scalar { .. } => TypeKind::Scalar,
            TypeData::Intrinsic(_) => TypeKind::Intrinsic,
            TypeData::StringLiteral(_) => TypeKind::StringLiteral,
            TypeData::NumericLiteral(_) => TypeKind::NumericLiteral,
            TypeData::BooleanLiteral(_) => TypeKind::BooleanLiteral,
            TypeData::Tuple { .. } => TypeKind::Tuple,
        }
    }

    pub fn name(&self) -> Option<&Rc<str>> {
        match self {
            TypeData::Model { name, .. } | TypeData::Union { name, .. } => name.as_ref(),
            TypeData::ModelProperty { name, .. }
            | TypeData::UnionVariant { name, .. }
            | TypeData::Operation { name, .. }
            | TypeData::Interface { name, .. }
            | TypeData::Enum { name, .. }
            | TypeData::EnumMember { name, .. }
            | TypeData::Scalar { name, .. } => Some(name),
            TypeData::Intrinsic(_)
            | TypeData::StringLiteral(_)
            | TypeData::NumericLiteral(_)
            | TypeData::BooleanLiteral(_)
            | TypeData::Tuple { .. } => None,
        }
    }

    /// The child collection of a container kind.
    pub fn member_slot(&self) -> Option<MemberSlot> {
        match self {
            TypeData::Model { .. } => Some(MemberSlot::Properties),
            TypeData::Union { .. } => Some(MemberSlot::Variants),
            TypeData::Interface { .. } => Some(MemberSlot::Operations),
            TypeData::Enum { .. } => Some(MemberSlot::Members),
            _ => None,
        }
    }

    pub fn members(&self) -> Option<&Members> {
        match self {
            TypeData::Model { properties: m, .. }
            | TypeData::Union { variants: m, .. }
            | TypeData::Interface { operations: m, .. }
            | TypeData::Enum { members: m, .. } => Some(m),
            _ => None,
        }
    }

    fn members_mut(&mut self) -> Option<&mut Members> {
        match self {
            TypeData::Model { properties: m, .. }
            | TypeData::Union { variants: m, .. }
            | TypeData::Interface { operations: m, .. }
            | TypeData::Enum { members: m, .. } => Some(m),
            _ => None,
        }
    }

    /// Declared type of a property or variant.
    pub fn member_type(&self) -> Option<NodeId> {
        match self {
            TypeData::ModelProperty { r#type, .. } | TypeData::UnionVariant { r#type, .. } => {
                Some(*r#type)
            }
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct TypeNode {
    id: NodeId,
    origin: Option<NodeId>,
    data: TypeData,
}

impl TypeNode {
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// The node this one was derived from by a projection edit, if any.
    pub fn origin(&self) -> Option<NodeId> {
        self.origin
    }

    pub fn data(&self) -> &TypeData {
        &self.data
    }

    pub fn kind(&self) -> TypeKind {
        self.data.kind()
    }

    pub fn name(&self) -> Option<&str> {
        self.data.name().map(|n| n.as_ref())
    }

    pub fn members(&self, slot: MemberSlot) -> Option<&Members> {
        match self.data.member_slot() {
            Some(s) if s == slot => self.data.members(),
            _ => None,
        }
    }

    pub fn member_type(&self) -> Option<NodeId> {
        self.data.member_type()
    }

    pub fn return_type(&self) -> Option<NodeId> {
        match &self.data {
            TypeData::Operation { return_type, .. } => Some(*return_type),
            _ => None,
        }
    }

    pub fn parameters(&self) -> Option<NodeId> {
        match &self.data {
            TypeData::Operation { parameters, .. } => Some(*parameters),
            _ => None,
        }
    }
}

/// Scalars every graph starts with.
const STD_SCALARS: &[&str] = &[
    "string", "boolean", "bytes", "numeric", "integer", "float", "int8", "int16", "int32",
    "int64", "uint8", "uint16", "uint32", "uint64", "float32", "float64", "plainDate",
    "plainTime", "utcDateTime", "duration", "url",
];

/// Append-only arena of type nodes.
///
/// Nodes are never modified once a projection has observed them: every
/// projection edit allocates a new node through the `derive_*` family and
/// leaves the previous handle valid and unchanged. The builder methods
/// (`add_*`) mutate containers in place and are meant for graph
/// construction only.
#[derive(Debug, Clone)]
pub struct TypeGraph {
    nodes: Vec<TypeNode>,
    globals: IndexMap<Rc<str>, NodeId>,
    intrinsics: [NodeId; 4],
}

impl Default for TypeGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl TypeGraph {
    pub fn new() -> Self {
        let mut graph = Self {
            nodes: vec![],
            globals: IndexMap::new(),
            intrinsics: [NodeId(0); 4],
        };
        for (idx, intrinsic) in IntrinsicName::ALL.into_iter().enumerate() {
            graph.intrinsics[idx] = graph.alloc(TypeData::Intrinsic(intrinsic), None);
        }
        for scalar in STD_SCALARS {
            let id = graph.alloc(
                TypeData::Scalar {
                    name: (*scalar).into(),
                    base: None,
                },
                None,
            );
            graph.globals.insert((*scalar).into(), id);
        }
        graph
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Drops every node allocated at or after `len`.
    pub(crate) fn truncate(&mut self, len: usize) {
        self.nodes.truncate(len);
    }

    pub fn get(&self, id: NodeId) -> Option<&TypeNode> {
        self.nodes.get(id.index())
    }

    /// Returns the node for an id minted by this graph.
    ///
    /// Panics if `id` was minted by another graph and is out of range.
    pub fn node(&self, id: NodeId) -> &TypeNode {
        &self.nodes[id.index()]
    }

    pub fn kind(&self, id: NodeId) -> TypeKind {
        self.node(id).kind()
    }

    /// Looks up a named top-level declaration.
    pub fn lookup(&self, name: &str) -> Option<NodeId> {
        self.globals.get(name).copied()
    }

    pub fn intrinsic(&self, name: IntrinsicName) -> NodeId {
        match name {
            IntrinsicName::Void => self.intrinsics[0],
            IntrinsicName::Never => self.intrinsics[1],
            IntrinsicName::Unknown => self.intrinsics[2],
            IntrinsicName::Null => self.intrinsics[3],
        }
    }

    pub fn is_intrinsic(&self, id: NodeId, name: IntrinsicName) -> bool {
        matches!(&self.node(id).data, TypeData::Intrinsic(i) if *i == name)
    }

    fn alloc(&mut self, data: TypeData, origin: Option<NodeId>) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(TypeNode { id, origin, data });
        id
    }

    fn declare(&mut self, name: &str, data: TypeData) -> Result<NodeId> {
        if self.globals.contains_key(name) {
            bail!("duplicate declaration `{name}`");
        }
        let id = self.alloc(data, None);
        self.globals.insert(name.into(), id);
        Ok(id)
    }

    fn add_member(&mut self, container: NodeId, name: &str, data: TypeData) -> Result<NodeId> {
        let slot = self
            .node(container)
            .data
            .member_slot()
            .ok_or_else(|| anyhow!("{} cannot hold members", self.describe(container)))?;
        if slot.member_kind() != data.kind() {
            bail!(
                "{} cannot hold a {}",
                self.describe(container),
                data.kind()
            );
        }
        if self.member(container, name).is_some() {
            bail!(
                "duplicate member `{name}` in {}",
                self.describe(container)
            );
        }
        let member = self.alloc(data, None);
        if let Some(members) = self.nodes[container.index()].data.members_mut() {
            members.insert(name.into(), member);
        }
        Ok(member)
    }

    pub fn add_model(&mut self, name: &str) -> Result<NodeId> {
        self.declare(
            name,
            TypeData::Model {
                name: Some(name.into()),
                properties: Members::new(),
            },
        )
    }

    /// Adds an anonymous model, e.g. the type of an inline property `e: { x: string }`.
    pub fn add_anonymous_model(&mut self) -> NodeId {
        self.alloc(
            TypeData::Model {
                name: None,
                properties: Members::new(),
            },
            None,
        )
    }

    pub fn add_property(&mut self, model: NodeId, name: &str, r#type: NodeId) -> Result<NodeId> {
        self.add_member(
            model,
            name,
            TypeData::ModelProperty {
                name: name.into(),
                r#type,
                optional: false,
            },
        )
    }

    pub fn add_optional_property(
        &mut self,
        model: NodeId,
        name: &str,
        r#type: NodeId,
    ) -> Result<NodeId> {
        self.add_member(
            model,
            name,
            TypeData::ModelProperty {
                name: name.into(),
                r#type,
                optional: true,
            },
        )
    }

    pub fn add_union(&mut self, name: &str) -> Result<NodeId> {
        self.declare(
            name,
            TypeData::Union {
                name: Some(name.into()),
                variants: Members::new(),
            },
        )
    }

    pub fn add_variant(&mut self, union: NodeId, name: &str, r#type: NodeId) -> Result<NodeId> {
        self.add_member(
            union,
            name,
            TypeData::UnionVariant {
                name: name.into(),
                r#type,
            },
        )
    }

    fn operation_data(
        &mut self,
        name: &str,
        parameters: &[(&str, NodeId)],
        return_type: NodeId,
    ) -> Result<TypeData> {
        let params = self.add_anonymous_model();
        for (param, r#type) in parameters {
            self.add_property(params, param, *r#type)?;
        }
        Ok(TypeData::Operation {
            name: name.into(),
            parameters: params,
            return_type,
        })
    }

    pub fn add_operation(
        &mut self,
        name: &str,
        parameters: &[(&str, NodeId)],
        return_type: NodeId,
    ) -> Result<NodeId> {
        let data = self.operation_data(name, parameters, return_type)?;
        self.declare(name, data)
    }

    pub fn add_interface(&mut self, name: &str) -> Result<NodeId> {
        self.declare(
            name,
            TypeData::Interface {
                name: name.into(),
                operations: Members::new(),
            },
        )
    }

    pub fn add_interface_operation(
        &mut self,
        interface: NodeId,
        name: &str,
        parameters: &[(&str, NodeId)],
        return_type: NodeId,
    ) -> Result<NodeId> {
        let data = self.operation_data(name, parameters, return_type)?;
        self.add_member(interface, name, data)
    }

    pub fn add_enum(&mut self, name: &str) -> Result<NodeId> {
        self.declare(
            name,
            TypeData::Enum {
                name: name.into(),
                members: Members::new(),
            },
        )
    }

    pub fn add_enum_member(
        &mut self,
        r#enum: NodeId,
        name: &str,
        value: Option<Value>,
    ) -> Result<NodeId> {
        self.add_member(
            r#enum,
            name,
            TypeData::EnumMember {
                name: name.into(),
                value,
            },
        )
    }

    pub fn add_scalar(&mut self, name: &str, base: Option<NodeId>) -> Result<NodeId> {
        self.declare(
            name,
            TypeData::Scalar {
                name: name.into(),
                base,
            },
        )
    }

    pub fn string_literal(&mut self, value: &str) -> NodeId {
        self.alloc(TypeData::StringLiteral(value.into()), None)
    }

    pub fn numeric_literal(&mut self, value: f64) -> NodeId {
        self.alloc(TypeData::NumericLiteral(value), None)
    }

    pub fn boolean_literal(&mut self, value: bool) -> NodeId {
        self.alloc(TypeData::BooleanLiteral(value), None)
    }

    pub fn tuple(&mut self, values: Vec<NodeId>) -> NodeId {
        self.alloc(TypeData::Tuple { values }, None)
    }

    /// Allocates a brand new member node for `slot`.
    pub(crate) fn new_member(&mut self, slot: MemberSlot, name: &str, value: &Value) -> NodeId {
        let data = match slot {
            MemberSlot::Properties => TypeData::ModelProperty {
                name: name.into(),
                r#type: self.type_of_value(value),
                optional: false,
            },
            MemberSlot::Variants => TypeData::UnionVariant {
                name: name.into(),
                r#type: self.type_of_value(value),
            },
            MemberSlot::Operations => {
                let signature = match value {
                    Value::Type(op) => match &self.node(*op).data {
                        TypeData::Operation {
                            parameters,
                            return_type,
                            ..
                        } => Some((*parameters, *return_type)),
                        _ => None,
                    },
                    _ => None,
                };
                // Anything but an operation becomes the return type of an
                // operation without parameters.
                let (parameters, return_type) = match signature {
                    Some(signature) => signature,
                    None => (self.add_anonymous_model(), self.type_of_value(value)),
                };
                TypeData::Operation {
                    name: name.into(),
                    parameters,
                    return_type,
                }
            }
            MemberSlot::Members => TypeData::EnumMember {
                name: name.into(),
                value: match value {
                    Value::None | Value::Type(_) => None,
                    v => Some(v.clone()),
                },
            },
        };
        self.alloc(data, None)
    }

    /// Converts a value into a type: type references are used as-is, literal
    /// values become literal types.
    pub fn type_of_value(&mut self, value: &Value) -> NodeId {
        match value {
            Value::Type(id) => *id,
            Value::String(s) => self.alloc(TypeData::StringLiteral(s.clone()), None),
            Value::Number(n) => self.numeric_literal(*n),
            Value::Bool(b) => self.boolean_literal(*b),
            Value::None => self.intrinsic(IntrinsicName::Null),
        }
    }

    /// Allocates a copy of `id` whose origin is `id`.
    pub fn derive(&mut self, id: NodeId) -> NodeId {
        let data = self.node(id).data.clone();
        self.alloc(data, Some(id))
    }

    /// Allocates a copy of `container` with its child collection replaced.
    pub fn derive_with_members(&mut self, container: NodeId, members: Members) -> Result<NodeId> {
        let mut data = self.node(container).data.clone();
        match data.members_mut() {
            Some(m) => *m = members,
            None => bail!("{} has no members", self.describe(container)),
        }
        Ok(self.alloc(data, Some(container)))
    }

    /// Allocates a copy of `container` with one existing child replaced.
    pub fn derive_with_member(
        &mut self,
        container: NodeId,
        name: &str,
        member: NodeId,
    ) -> Result<NodeId> {
        let mut members = self
            .node(container)
            .data
            .members()
            .cloned()
            .ok_or_else(|| anyhow!("{} has no members", self.describe(container)))?;
        match members.get_mut(name) {
            Some(slot) => *slot = member,
            None => bail!("{} has no member `{name}`", self.describe(container)),
        }
        self.derive_with_members(container, members)
    }

    pub fn derive_renamed(&mut self, id: NodeId, new_name: &str) -> Result<NodeId> {
        let mut data = self.node(id).data.clone();
        match &mut data {
            TypeData::Model { name, .. } | TypeData::Union { name, .. } => {
                *name = Some(new_name.into())
            }
            TypeData::ModelProperty { name, .. }
            | TypeData::UnionVariant { name, .. }
            | TypeData::Operation { name, .. }
            | TypeData::Interface { name, .. }
            | TypeData::Enum { name, .. }
            | TypeData::EnumMember { name, .. }
            | TypeData::Scalar { name, .. } => *name = new_name.into(),
            TypeData::Intrinsic(_)
            | TypeData::StringLiteral(_)
            | TypeData::NumericLiteral(_)
            | TypeData::BooleanLiteral(_)
            | TypeData::Tuple { .. } => bail!("{} cannot be renamed", self.describe(id)),
        }
        Ok(self.alloc(data, Some(id)))
    }

    pub fn derive_with_type(&mut self, member: NodeId, new_type: NodeId) -> Result<NodeId> {
        let mut data = self.node(member).data.clone();
        match &mut data {
            TypeData::ModelProperty { r#type, .. } | TypeData::UnionVariant { r#type, .. } => {
                *r#type = new_type
            }
            _ => bail!("{} has no declared type", self.describe(member)),
        }
        Ok(self.alloc(data, Some(member)))
    }

    pub fn derive_with_return_type(&mut self, op: NodeId, new_type: NodeId) -> Result<NodeId> {
        let mut data = self.node(op).data.clone();
        match &mut data {
            TypeData::Operation { return_type, .. } => *return_type = new_type,
            _ => bail!("{} has no return type", self.describe(op)),
        }
        Ok(self.alloc(data, Some(op)))
    }

    pub fn member(&self, container: NodeId, name: &str) -> Option<NodeId> {
        self.node(container).data.members()?.get(name).copied()
    }

    /// First node of the derivation chain `id` belongs to.
    pub fn lineage_root(&self, mut id: NodeId) -> NodeId {
        while let Some(origin) = self.node(id).origin {
            id = origin;
        }
        id
    }

    /// Iterates `id` followed by the nodes it was derived from.
    pub fn lineage(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        core::iter::successors(Some(id), move |n| self.node(*n).origin)
    }

    pub fn same_lineage(&self, a: NodeId, b: NodeId) -> bool {
        self.lineage_root(a) == self.lineage_root(b)
    }

    /// Short human readable description, used in diagnostics.
    pub fn describe(&self, id: NodeId) -> String {
        let node = match self.get(id) {
            Some(node) => node,
            None => return format!("unknown node {id}"),
        };
        match &node.data {
            TypeData::Intrinsic(i) => i.as_str().to_string(),
            TypeData::StringLiteral(s) => format!("{s:?}"),
            TypeData::NumericLiteral(n) => format!("{n}"),
            TypeData::BooleanLiteral(b) => format!("{b}"),
            data => match data.name() {
                Some(name) => format!("{} `{name}`", data.kind()),
                None => format!("anonymous {}", data.kind()),
            },
        }
    }

    /// Compares two subgraphs ignoring node identity.
    ///
    /// Pairs already under comparison are assumed equal, which makes the check
    /// terminate on self-referential types.
    pub fn structurally_equal(&self, a: NodeId, b: NodeId) -> bool {
        let mut assumed = BTreeSet::new();
        self.structurally_equal_impl(a, b, &mut assumed)
    }

    fn structurally_equal_impl(
        &self,
        a: NodeId,
        b: NodeId,
        assumed: &mut BTreeSet<(NodeId, NodeId)>,
    ) -> bool {
        if a == b || !assumed.insert((a, b)) {
            return true;
        }
        let (x, y) = (&self.node(a).data, &self.node(b).data);
        let members_equal = |m1: &Members, m2: &Members, assumed: &mut BTreeSet<(NodeId, NodeId)>| {
            m1.len() == m2.len()
                && m1.iter().zip(m2.iter()).all(|((k1, v1), (k2, v2))| {
                    k1 == k2 && self.structurally_equal_impl(*v1, *v2, assumed)
                })
        };
        match (x, y) {
            (
                TypeData::Model {
                    name: n1,
                    properties: m1,
                },
                TypeData::Model {
                    name: n2,
                    properties: m2,
                },
            )
            | (
                TypeData::Union {
                    name: n1,
                    variants: m1,
                },
                TypeData::Union {
                    name: n2,
                    variants: m2,
                },
            ) => n1 == n2 && members_equal(m1, m2, assumed),
            (
                TypeData::Interface {
                    name: n1,
                    operations: m1,
                },
                TypeData::Interface {
                    name: n2,
                    operations: m2,
                },
            )
            | (
                TypeData::Enum {
                    name: n1,
                    members: m1,
                },
                TypeData::Enum {
                    name: n2,
                    members: m2,
                },
            ) => n1 == n2 && members_equal(m1, m2, assumed),
            (
                TypeData::ModelProperty {
                    name: n1,
                    r#type: t1,
                    optional: o1,
                },
                TypeData::ModelProperty {
                    name: n2,
                    r#type: t2,
                    optional: o2,
                },
            ) => n1 == n2 && o1 == o2 && self.structurally_equal_impl(*t1, *t2, assumed),
            (
                TypeData::UnionVariant {
                    name: n1,
                    r#type: t1,
                },
                TypeData::UnionVariant {
                    name: n2,
                    r#type: t2,
                },
            ) => n1 == n2 && self.structurally_equal_impl(*t1, *t2, assumed),
            (
                TypeData::Operation {
                    name: n1,
                    parameters: p1,
                    return_type: r1,
                },
                TypeData::Operation {
                    name: n2,
                    parameters: p2,
                    return_type: r2,
                },
            ) => {
                n1 == n2
                    && self.structurally_equal_impl(*p1, *p2, assumed)
                    && self.structurally_equal_impl(*r1, *r2, assumed)
            }
            (
                TypeData::EnumMember {
                    name: n1,
                    value: v1,
                },
                TypeData::EnumMember {
                    name: n2,
                    value: v2,
                },
            ) => n1 == n2 && v1 == v2,
            (
                TypeData::Scalar {
                    name: n1,
                    base: b1,
                },
                TypeData::Scalar {
                    name: n2,
                    base: b2,
                },
            ) => {
                n1 == n2
                    && match (b1, b2) {
                        (Some(b1), Some(b2)) => self.structurally_equal_impl(*b1, *b2, assumed),
                        (None, None) => true,
                        _ => false,
                    }
            }
            (TypeData::Intrinsic(i1), TypeData::Intrinsic(i2)) => i1 == i2,
            (TypeData::StringLiteral(s1), TypeData::StringLiteral(s2)) => s1 == s2,
            (TypeData::NumericLiteral(n1), TypeData::NumericLiteral(n2)) => {
                n1.total_cmp(n2).is_eq()
            }
            (TypeData::BooleanLiteral(b1), TypeData::BooleanLiteral(b2)) => b1 == b2,
            (TypeData::Tuple { values: v1 }, TypeData::Tuple { values: v2 }) => {
                v1.len() == v2.len()
                    && v1
                        .iter()
                        .zip(v2.iter())
                        .all(|(a, b)| self.structurally_equal_impl(*a, *b, assumed))
            }
            _ => false,
        }
    }
}
