// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::types::MemberSlot;
use crate::value::Value;
use crate::Rc;

use core::fmt;

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum OperationKind {
    AddProperty,
    DeleteProperty,
    RenameProperty,
    ProjectProperty,
    AddVariant,
    DeleteVariant,
    RenameVariant,
    ProjectVariant,
    AddOperation,
    DeleteOperation,
    RenameOperation,
    ProjectOperation,
    AddMember,
    DeleteMember,
    RenameMember,
    SetType,
    SetReturnType,
}

impl OperationKind {
    pub fn as_str(self) -> &'static str {
        match self {
            OperationKind::AddProperty => "addProperty",
            OperationKind::DeleteProperty => "deleteProperty",
            OperationKind::RenameProperty => "renameProperty",
            OperationKind::ProjectProperty => "projectProperty",
            OperationKind::AddVariant => "addVariant",
            OperationKind::DeleteVariant => "deleteVariant",
            OperationKind::RenameVariant => "renameVariant",
            OperationKind::ProjectVariant => "projectVariant",
            OperationKind::AddOperation => "addOperation",
            OperationKind::DeleteOperation => "deleteOperation",
            OperationKind::RenameOperation => "renameOperation",
            OperationKind::ProjectOperation => "projectOperation",
            OperationKind::AddMember => "addMember",
            OperationKind::DeleteMember => "deleteMember",
            OperationKind::RenameMember => "renameMember",
            OperationKind::SetType => "setType",
            OperationKind::SetReturnType => "setReturnType",
        }
    }

    pub(crate) fn add(slot: MemberSlot) -> Self {
        match slot {
            MemberSlot::Properties => OperationKind::AddProperty,
            MemberSlot::Variants => OperationKind::AddVariant,
            MemberSlot::Operations => OperationKind::AddOperation,
            MemberSlot::Members => OperationKind::AddMember,
        }
    }

    pub(crate) fn delete(slot: MemberSlot) -> Self {
        match slot {
            MemberSlot::Properties => OperationKind::DeleteProperty,
            MemberSlot::Variants => OperationKind::DeleteVariant,
            MemberSlot::Operations => OperationKind::DeleteOperation,
            MemberSlot::Members => OperationKind::DeleteMember,
        }
    }

    pub(crate) fn rename(slot: MemberSlot) -> Self {
        match slot {
            MemberSlot::Properties => OperationKind::RenameProperty,
            MemberSlot::Variants => OperationKind::RenameVariant,
            MemberSlot::Operations => OperationKind::RenameOperation,
            MemberSlot::Members => OperationKind::RenameMember,
        }
    }

    // Enum members carry no type, so there is no `projectMember`.
    pub(crate) fn project(slot: MemberSlot) -> Option<Self> {
        match slot {
            MemberSlot::Properties => Some(OperationKind::ProjectProperty),
            MemberSlot::Variants => Some(OperationKind::ProjectVariant),
            MemberSlot::Operations => Some(OperationKind::ProjectOperation),
            MemberSlot::Members => None,
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One structural edit performed by a projection run.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Instruction {
    pub op: OperationKind,
    /// Name of the edited member, or of the edited node for `setType` and
    /// `setReturnType`.
    pub target_name: Rc<str>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub extra_args: Vec<Value>,
}

/// Collects instructions performed by the outermost projection activation.
#[derive(Debug, Default)]
pub(crate) struct Recorder {
    instructions: Vec<Instruction>,
}

impl Recorder {
    pub fn record(&mut self, op: OperationKind, target_name: &str, extra_args: Vec<Value>) {
        log::debug!("recording {op} `{target_name}`");
        self.instructions.push(Instruction {
            op,
            target_name: target_name.into(),
            extra_args,
        });
    }

    pub fn into_instructions(self) -> Vec<Instruction> {
        self.instructions
    }
}
