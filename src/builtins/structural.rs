// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::builtins::StructuralOp;
use crate::types::MemberSlot;

use std::collections::HashMap;

pub fn register(m: &mut HashMap<&'static str, StructuralOp>) {
    use MemberSlot::*;
    use StructuralOp::*;

    m.insert("addProperty", Add(Properties));
    m.insert("deleteProperty", Delete(Properties));
    m.insert("renameProperty", Rename(Properties));
    m.insert("projectProperty", Project(Properties));
    m.insert("getProperty", Get(Properties));

    m.insert("addVariant", Add(Variants));
    m.insert("deleteVariant", Delete(Variants));
    m.insert("renameVariant", Rename(Variants));
    m.insert("projectVariant", Project(Variants));
    m.insert("getVariant", Get(Variants));

    m.insert("addOperation", Add(Operations));
    m.insert("deleteOperation", Delete(Operations));
    m.insert("renameOperation", Rename(Operations));
    m.insert("projectOperation", Project(Operations));
    m.insert("getOperation", Get(Operations));

    m.insert("addMember", Add(Members));
    m.insert("deleteMember", Delete(Members));
    m.insert("renameMember", Rename(Members));
    m.insert("getMember", Get(Members));

    m.insert("setType", SetType);
    m.insert("setReturnType", SetReturnType);
}
