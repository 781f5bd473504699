// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use super::{HostContext, HostModule};
use crate::state::StateKey;
use crate::value::Value;

use anyhow::{bail, Result};

/// `@doc(node, text)` attaches documentation to a node; `getDoc(node)` reads it
/// back, returning none when nothing is attached.
pub fn module() -> HostModule {
    let key = StateKey::new();
    HostModule::new("doc")
        .with_decorator("doc", move |ctx: &mut HostContext<'_>, args: Vec<Value>| {
            let node = ctx.node_arg("doc", &args, 0)?;
            let text = match args.get(1) {
                Some(Value::String(s)) => s.clone(),
                Some(v) => bail!("`doc` expects a string, got {v}"),
                None => bail!("`doc` expects a documentation string"),
            };
            ctx.set_state(key, node, Value::String(text));
            Ok(Value::None)
        })
        .with_function("getDoc", move |ctx: &mut HostContext<'_>, args: Vec<Value>| {
            get_doc(ctx, key, &args)
        })
}

fn get_doc(ctx: &HostContext<'_>, key: StateKey, args: &[Value]) -> Result<Value> {
    let node = ctx.node_arg("getDoc", args, 0)?;
    Ok(ctx.get_state(key, node).unwrap_or_default())
}
