// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Version metadata decorators and the accessors projection bodies use to
//! drive versioning decisions:
//!
//! ```text
//! @added(v)                 getAddedOn(node)            -1 when absent
//! @removed(v)               getRemovedOn(node)          Infinity when absent
//! @renamedFrom(v, oldName)  getRenamedFromVersion(node) -1 when absent
//!                           getRenamedFromOldName(node) "" when absent
//! ```

use super::{HostContext, HostFunction, HostModule};
use crate::state::StateKey;
use crate::value::Value;

use anyhow::{bail, Result};

// Reads one state map, yielding `default` for nodes without an entry.
struct StateReader {
    name: &'static str,
    key: StateKey,
    default: fn() -> Value,
}

impl HostFunction for StateReader {
    fn call(&self, ctx: &mut HostContext<'_>, args: Vec<Value>) -> Result<Value> {
        let node = ctx.node_arg(self.name, &args, 0)?;
        Ok(ctx
            .get_state(self.key, node)
            .unwrap_or_else(self.default))
    }
}

fn version_arg(name: &str, args: &[Value]) -> Result<Value> {
    match args.get(1) {
        Some(v @ Value::Number(_)) => Ok(v.clone()),
        Some(v) => bail!("`{name}` expects a version number, got {v}"),
        None => bail!("`{name}` expects a version number"),
    }
}

pub fn module() -> HostModule {
    let added_on = StateKey::new();
    let removed_on = StateKey::new();
    let renamed_from_version = StateKey::new();
    let renamed_from_name = StateKey::new();

    HostModule::new("versioning")
        .with_decorator("added", move |ctx: &mut HostContext<'_>, args: Vec<Value>| {
            let node = ctx.node_arg("added", &args, 0)?;
            ctx.set_state(added_on, node, version_arg("added", &args)?);
            Ok(Value::None)
        })
        .with_decorator("removed", move |ctx: &mut HostContext<'_>, args: Vec<Value>| {
            let node = ctx.node_arg("removed", &args, 0)?;
            ctx.set_state(removed_on, node, version_arg("removed", &args)?);
            Ok(Value::None)
        })
        .with_decorator(
            "renamedFrom",
            move |ctx: &mut HostContext<'_>, args: Vec<Value>| {
                let node = ctx.node_arg("renamedFrom", &args, 0)?;
                let version = version_arg("renamedFrom", &args)?;
                let old_name = match args.get(2) {
                    Some(v @ Value::String(_)) => v.clone(),
                    _ => bail!("`renamedFrom` expects the previous name as a string"),
                };
                ctx.set_state(renamed_from_version, node, version);
                ctx.set_state(renamed_from_name, node, old_name);
                Ok(Value::None)
            },
        )
        .with_host_function(
            "getAddedOn",
            StateReader {
                name: "getAddedOn",
                key: added_on,
                default: || Value::Number(-1.0),
            },
        )
        .with_host_function(
            "getRemovedOn",
            StateReader {
                name: "getRemovedOn",
                key: removed_on,
                default: || Value::Number(f64::INFINITY),
            },
        )
        .with_host_function(
            "getRenamedFromVersion",
            StateReader {
                name: "getRenamedFromVersion",
                key: renamed_from_version,
                default: || Value::Number(-1.0),
            },
        )
        .with_host_function(
            "getRenamedFromOldName",
            StateReader {
                name: "getRenamedFromOldName",
                key: renamed_from_name,
                default: || Value::from(""),
            },
        )
}
