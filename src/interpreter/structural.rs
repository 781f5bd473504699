// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::builtins::StructuralOp;
use crate::instructions::OperationKind;
use crate::interpreter::{located, type_mismatch, unknown_member, Interpreter, Operand, ProjectionError};
use crate::lexer::Span;
use crate::options::AbsentMemberPolicy;
use crate::types::{MemberSlot, Members, NodeId, TypeKind};
use crate::value::Value;
use crate::Rc;

use anyhow::Result;
use log::debug;

// Edits on `self` replace it and are recorded. Edits on any other receiver
// produce a detached copy of the receiver, returned to the caller.
impl Interpreter<'_> {
    pub(super) fn eval_structural(
        &mut self,
        span: &Span,
        method: &Span,
        op: StructuralOp,
        receiver: NodeId,
        args: Vec<Operand>,
    ) -> Result<Value> {
        match op {
            StructuralOp::Add(slot) => self.add_member(span, method, slot, receiver, &args),
            StructuralOp::Delete(slot) => self.delete_member(span, method, slot, receiver, &args),
            StructuralOp::Rename(slot) => self.rename_member(span, method, slot, receiver, &args),
            StructuralOp::Project(slot) => {
                self.project_member(span, method, slot, receiver, args)
            }
            StructuralOp::Get(slot) => {
                let name = string_arg(span, method, &args, 0)?;
                self.members_of(method, slot, receiver)?;
                match self.graph.member(receiver, &name) {
                    Some(member) => Ok(Value::Type(member)),
                    None => Err(unknown_member(
                        span,
                        &format!("{} has no member `{name}`", self.graph.describe(receiver)),
                    )),
                }
            }
            StructuralOp::SetType => self.set_type(span, method, receiver, &args, false),
            StructuralOp::SetReturnType => self.set_type(span, method, receiver, &args, true),
        }
    }

    fn members_of(&self, method: &Span, slot: MemberSlot, receiver: NodeId) -> Result<Members> {
        match self.graph.node(receiver).members(slot) {
            Some(members) => Ok(members.clone()),
            None => Err(type_mismatch(
                method,
                &format!(
                    "`{}` is not available on {}",
                    method.text(),
                    self.graph.describe(receiver)
                ),
            )),
        }
    }

    // Replaces `self` when the edit targeted it. Returns whether it did.
    fn commit(&mut self, receiver: NodeId, updated: NodeId) -> Result<bool> {
        if receiver == self.self_node()? {
            self.set_self(updated)?;
            Ok(true)
        } else {
            debug!(
                "edit of {} is detached from self",
                self.graph.describe(receiver)
            );
            Ok(false)
        }
    }

    fn add_member(
        &mut self,
        span: &Span,
        method: &Span,
        slot: MemberSlot,
        receiver: NodeId,
        args: &[Operand],
    ) -> Result<Value> {
        let name = string_arg(span, method, args, 0)?;
        let mut members = self.members_of(method, slot, receiver)?;
        let value = match args.get(1) {
            Some(Operand::Value(v)) => v.clone(),
            None if slot == MemberSlot::Members => Value::None,
            _ => {
                return Err(type_mismatch(
                    span,
                    &format!("`{}` expects a type as second argument", method.text()),
                ))
            }
        };
        if members.contains_key(&*name) {
            return Err(name_collision(span, &name, &self.graph.describe(receiver)));
        }

        let member = self.graph.new_member(slot, &name, &value);
        members.insert(name.clone(), member);
        let updated = self.graph.derive_with_members(receiver, members)?;
        if !self.commit(receiver, updated)? {
            return Ok(Value::Type(updated));
        }
        self.record(OperationKind::add(slot), &name, vec![value]);
        Ok(Value::Type(member))
    }

    fn delete_member(
        &mut self,
        span: &Span,
        method: &Span,
        slot: MemberSlot,
        receiver: NodeId,
        args: &[Operand],
    ) -> Result<Value> {
        let name = string_arg(span, method, args, 0)?;
        let mut members = self.members_of(method, slot, receiver)?;
        if members.shift_remove(&*name).is_none() {
            return match self.options.absent_member {
                AbsentMemberPolicy::Ignore => {
                    debug!(
                        "`{}`: {} has no member `{name}`; ignoring",
                        method.text(),
                        self.graph.describe(receiver)
                    );
                    Ok(Value::None)
                }
                AbsentMemberPolicy::Error => Err(unknown_member(
                    span,
                    &format!(
                        "cannot delete `{name}`: {} has no such member",
                        self.graph.describe(receiver)
                    ),
                )),
            };
        }

        let updated = self.graph.derive_with_members(receiver, members)?;
        if !self.commit(receiver, updated)? {
            return Ok(Value::Type(updated));
        }
        self.record(OperationKind::delete(slot), &name, vec![]);
        Ok(Value::None)
    }

    fn rename_member(
        &mut self,
        span: &Span,
        method: &Span,
        slot: MemberSlot,
        receiver: NodeId,
        args: &[Operand],
    ) -> Result<Value> {
        let old_name = string_arg(span, method, args, 0)?;
        let new_name = string_arg(span, method, args, 1)?;
        let members = self.members_of(method, slot, receiver)?;
        let member = match members.get(&*old_name) {
            Some(member) => *member,
            None => {
                return Err(unknown_member(
                    span,
                    &format!(
                        "cannot rename `{old_name}`: {} has no such member",
                        self.graph.describe(receiver)
                    ),
                ))
            }
        };
        if old_name == new_name {
            return Ok(Value::Type(member));
        }
        if members.contains_key(&*new_name) {
            return Err(name_collision(
                span,
                &new_name,
                &self.graph.describe(receiver),
            ));
        }

        let renamed = self.graph.derive_renamed(member, &new_name)?;
        // Rebuild the collection so the member keeps its position.
        let members: Members = members
            .into_iter()
            .map(|(k, v)| match k == old_name {
                true => (new_name.clone(), renamed),
                false => (k, v),
            })
            .collect();
        let updated = self.graph.derive_with_members(receiver, members)?;
        if !self.commit(receiver, updated)? {
            return Ok(Value::Type(updated));
        }
        self.record(
            OperationKind::rename(slot),
            &old_name,
            vec![Value::String(new_name)],
        );
        Ok(Value::Type(renamed))
    }

    fn project_member(
        &mut self,
        span: &Span,
        method: &Span,
        slot: MemberSlot,
        receiver: NodeId,
        mut args: Vec<Operand>,
    ) -> Result<Value> {
        let name = string_arg(span, method, &args, 0)?;
        let projection: Rc<str> = match args.get(1) {
            Some(Operand::Projection(p)) => p.clone(),
            Some(Operand::Value(Value::String(p))) => p.clone(),
            _ => {
                return Err(type_mismatch(
                    span,
                    &format!("`{}` expects a projection name", method.text()),
                ))
            }
        };
        let op_kind = OperationKind::project(slot).ok_or_else(|| {
            type_mismatch(method, &format!("`{}` cannot be projected", method.text()))
        })?;
        let mut projection_args = Vec::with_capacity(args.len().saturating_sub(2));
        for arg in args.drain(..).skip(2) {
            match arg {
                Operand::Value(v) => projection_args.push(v),
                _ => {
                    return Err(type_mismatch(
                        span,
                        "projection arguments must be values",
                    ))
                }
            }
        }

        let members = self.members_of(method, slot, receiver)?;
        let member = match members.get(&*name) {
            Some(member) => *member,
            None => {
                return Err(unknown_member(
                    span,
                    &format!(
                        "cannot project `{name}`: {} has no such member",
                        self.graph.describe(receiver)
                    ),
                ))
            }
        };

        let projected = match slot {
            MemberSlot::Operations => {
                self.apply_named_projection(span, member, &projection, projection_args.clone())?
            }
            _ => {
                let current = self.graph.node(member).member_type().ok_or_else(|| {
                    type_mismatch(
                        span,
                        &format!("{} has no type", self.graph.describe(member)),
                    )
                })?;
                let projected_type = self.apply_named_projection(
                    span,
                    current,
                    &projection,
                    projection_args.clone(),
                )?;
                match projected_type == current {
                    true => member,
                    false => self.graph.derive_with_type(member, projected_type)?,
                }
            }
        };
        if projected == member {
            return Ok(Value::Type(member));
        }

        let updated = self.graph.derive_with_member(receiver, &name, projected)?;
        if !self.commit(receiver, updated)? {
            return Ok(Value::Type(updated));
        }
        let mut extra_args = vec![Value::String(projection)];
        extra_args.extend(projection_args);
        self.record(op_kind, &name, extra_args);
        Ok(Value::Type(projected))
    }

    fn set_type(
        &mut self,
        span: &Span,
        method: &Span,
        receiver: NodeId,
        args: &[Operand],
        return_type: bool,
    ) -> Result<Value> {
        let new_type = match args {
            [Operand::Value(Value::None)] | [] => {
                return Err(type_mismatch(
                    span,
                    &format!("`{}` expects a type", method.text()),
                ))
            }
            [Operand::Value(v)] => self.graph.type_of_value(v),
            _ => {
                return Err(type_mismatch(
                    span,
                    &format!("`{}` expects exactly one type", method.text()),
                ))
            }
        };

        let expected = match return_type {
            true => &[TypeKind::Operation][..],
            false => &[TypeKind::ModelProperty, TypeKind::UnionVariant][..],
        };
        if !expected.contains(&self.graph.kind(receiver)) {
            return Err(type_mismatch(
                method,
                &format!(
                    "`{}` is not available on {}",
                    method.text(),
                    self.graph.describe(receiver)
                ),
            ));
        }
        let op = match return_type {
            true => OperationKind::SetReturnType,
            false => OperationKind::SetType,
        };

        let self_node = self.self_node()?;
        if receiver == self_node {
            let updated = match self.retyped(receiver, new_type, return_type)? {
                Some(updated) => updated,
                None => return Ok(Value::Type(receiver)),
            };
            self.set_self(updated)?;
            let name = self.graph.node(receiver).name().unwrap_or_default().to_string();
            self.record(op, &name, vec![Value::Type(new_type)]);
            return Ok(Value::Type(updated));
        }

        // Members read from `self` (e.g. a forEach item) are edited in place
        // of their live counterpart, which may have been renamed since.
        if let Some((name, live)) = self.live_member(receiver)? {
            let updated = match self.retyped(live, new_type, return_type)? {
                Some(updated) => updated,
                None => return Ok(Value::Type(live)),
            };
            let container = self.graph.derive_with_member(self_node, &name, updated)?;
            self.set_self(container)?;
            self.record(op, &name, vec![Value::Type(new_type)]);
            return Ok(Value::Type(updated));
        }

        match self.retyped(receiver, new_type, return_type)? {
            Some(updated) => Ok(Value::Type(updated)),
            None => Ok(Value::Type(receiver)),
        }
    }

    // A copy of `node` with its type replaced, or None if it already has it.
    fn retyped(
        &mut self,
        node: NodeId,
        new_type: NodeId,
        return_type: bool,
    ) -> Result<Option<NodeId>> {
        let n = self.graph.node(node);
        let current = match return_type {
            true => n.return_type(),
            false => n.member_type(),
        };
        if current == Some(new_type) {
            return Ok(None);
        }
        Ok(Some(match return_type {
            true => self.graph.derive_with_return_type(node, new_type)?,
            false => self.graph.derive_with_type(node, new_type)?,
        }))
    }
}

fn string_arg(span: &Span, method: &Span, args: &[Operand], idx: usize) -> Result<Rc<str>> {
    match args.get(idx) {
        Some(Operand::Value(Value::String(s))) => Ok(s.clone()),
        Some(Operand::Value(v)) => Err(type_mismatch(
            span,
            &format!(
                "`{}` expects a string as argument {}, got {}",
                method.text(),
                idx + 1,
                v.kind_name()
            ),
        )),
        _ => Err(type_mismatch(
            span,
            &format!("`{}` expects a string as argument {}", method.text(), idx + 1),
        )),
    }
}

fn name_collision(span: &Span, name: &str, container: &str) -> anyhow::Error {
    ProjectionError::NameCollision(located(
        span,
        &format!("{container} already has a member named `{name}`"),
    ))
    .into()
}
