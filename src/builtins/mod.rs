// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

pub mod strings;
pub mod structural;

use crate::types::MemberSlot;

use std::collections::HashMap;

use lazy_static::lazy_static;

/// Method on a type node that edits or reads its structure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StructuralOp {
    Add(MemberSlot),
    Delete(MemberSlot),
    Rename(MemberSlot),
    Project(MemberSlot),
    Get(MemberSlot),
    SetType,
    SetReturnType,
}

pub type StringFcn = fn(&str) -> String;

#[rustfmt::skip]
lazy_static! {
    pub static ref STRUCTURAL_METHODS: HashMap<&'static str, StructuralOp> = {
	let mut m: HashMap<&'static str, StructuralOp> = HashMap::new();
	structural::register(&mut m);
	m
    };

    pub static ref STRING_METHODS: HashMap<&'static str, StringFcn> = {
	let mut m: HashMap<&'static str, StringFcn> = HashMap::new();
	strings::register(&mut m);
	m
    };
}
