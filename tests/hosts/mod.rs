// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use anyhow::{bail, Result};
use cadl_projection::extensions::doc;
use cadl_projection::*;

fn handle(program: &Program, node: NodeId, name: &str) -> Result<ProjectionHandle> {
    match program.projection(node, name).and_then(|p| p.to()) {
        Some(h) => Ok(h),
        None => bail!("projection `{name}` does not apply to {node}"),
    }
}

#[test]
fn doc_decorator_inside_projection() -> Result<()> {
    let mut program = Program::new();
    program.import(doc::module());
    let foo = program.graph_mut().add_model("Foo")?;
    program.call_decorator("doc", foo, vec![Value::from("original")])?;
    program.add_projections(
        "doc.cadl".to_string(),
        r#"
        projection model#documented {
          to {
            @doc(self, "projected " + getDoc(self));
          }
        }
        "#
        .to_string(),
    )?;

    let h = handle(&program, foo, "documented")?;
    let projected = program.try_project(foo, h, &[])?;
    assert_ne!(projected, foo);

    let read = |program: &Program, node: NodeId| program.call_function("getDoc", vec![Value::Type(node)]);
    assert_eq!(read(&program, projected)?, Value::from("projected original"));
    // The decorator targeted a copy; the source keeps its documentation.
    assert_eq!(read(&program, foo)?, Value::from("original"));
    Ok(())
}

#[test]
fn get_doc_defaults_to_none() -> Result<()> {
    let mut program = Program::new();
    program.import(doc::module());
    let foo = program.graph_mut().add_model("Foo")?;
    assert_eq!(
        program.call_function("getDoc", vec![Value::Type(foo)])?,
        Value::None
    );
    assert!(program.call_function("getDoc", vec![Value::from(1)]).is_err());
    assert!(program.call_decorator("doc", foo, vec![]).is_err());
    Ok(())
}

#[test]
fn decorating_a_member_through_for_each() -> Result<()> {
    let mut program = Program::new();
    program.import(doc::module());
    let s = match program.graph().lookup("string") {
        Some(s) => s,
        None => bail!("string missing"),
    };
    let foo = program.graph_mut().add_model("Foo")?;
    let a = program.graph_mut().add_property(foo, "a", s)?;
    program.add_projections(
        "doc.cadl".to_string(),
        r#"
        projection model#documented {
          to {
            self.properties.forEach((p) => {
              @doc(p, "property " + p.name);
            });
          }
        }
        "#
        .to_string(),
    )?;

    let h = handle(&program, foo, "documented")?;
    let projected = program.try_project(foo, h, &[])?;
    let projected_a = match program.graph().member(projected, "a") {
        Some(m) => m,
        None => bail!("a missing"),
    };
    assert_ne!(projected_a, a);
    assert_eq!(
        program.call_function("getDoc", vec![Value::Type(projected_a)])?,
        Value::from("property a")
    );
    assert_eq!(
        program.call_function("getDoc", vec![Value::Type(a)])?,
        Value::None
    );
    Ok(())
}

#[test]
fn imports_are_visible_to_later_declarations_only() -> Result<()> {
    let mut program = Program::new();
    let foo = program.graph_mut().add_model("Foo")?;
    let source = r#"projection model#NAME { to { return answer(self); } }"#;

    program.add_projections("early.cadl".to_string(), source.replace("NAME", "early"))?;
    program.import(
        HostModule::new("answers").with_function(
            "answer",
            |_: &mut HostContext<'_>, _: Vec<Value>| -> Result<Value> { Ok(Value::from(42)) },
        ),
    );
    program.add_projections("late.cadl".to_string(), source.replace("NAME", "late"))?;

    let early = handle(&program, foo, "early")?;
    match program.try_project(foo, early, &[]) {
        Err(ProjectionError::UndeclaredIdentifier(msg)) => assert!(msg.contains("answer")),
        r => bail!("unexpected result {r:?}"),
    }

    let late = handle(&program, foo, "late")?;
    let result = program.try_project(foo, late, &[])?;
    assert!(matches!(
        program.graph().node(result).data(),
        TypeData::NumericLiteral(n) if *n == 42.0
    ));
    Ok(())
}

#[test]
fn later_imports_shadow_earlier_ones() -> Result<()> {
    let module = |value: &'static str| {
        HostModule::new(value).with_function(
            "which",
            move |_: &mut HostContext<'_>, _: Vec<Value>| -> Result<Value> { Ok(Value::from(value)) },
        )
    };
    let mut program = Program::new();
    program.import(module("first"));
    program.import(module("second"));
    assert_eq!(program.call_function("which", vec![])?, Value::from("second"));
    Ok(())
}

#[test]
fn functions_and_decorators_are_separate() -> Result<()> {
    let mut program = Program::new();
    program.import(doc::module());
    let foo = program.graph_mut().add_model("Foo")?;
    program.add_projections(
        "ns.cadl".to_string(),
        r#"projection model#n { to { doc(self, "x"); } }"#.to_string(),
    )?;
    let h = handle(&program, foo, "n")?;
    assert!(matches!(
        program.try_project(foo, h, &[]),
        Err(ProjectionError::UndeclaredIdentifier(_))
    ));
    Ok(())
}

struct Failing;

impl HostFunction for Failing {
    fn call(&self, _ctx: &mut HostContext<'_>, _args: Vec<Value>) -> Result<Value> {
        bail!("backend unavailable")
    }
}

#[test]
fn host_failures_are_reported() -> Result<()> {
    let mut program = Program::new();
    program.import(HostModule::new("failing").with_host_function("fetch", Failing));
    let foo = program.graph_mut().add_model("Foo")?;
    program.add_projections(
        "host.cadl".to_string(),
        r#"projection model#f { to { fetch(self); } }"#.to_string(),
    )?;
    let h = handle(&program, foo, "f")?;

    match program.try_project(foo, h, &[]) {
        Err(ProjectionError::Host { function, message }) => {
            assert_eq!(&*function, "fetch");
            assert!(message.contains("backend unavailable"));
        }
        r => bail!("unexpected result {r:?}"),
    }

    assert_eq!(program.project(foo, h, &[]), None);
    assert_eq!(program.diagnostics().len(), 1);
    assert!(program.diagnostics()[0].message.contains("fetch"));
    Ok(())
}

#[test]
fn host_state_is_keyed_by_token() -> Result<()> {
    let key = StateKey::new();
    let mut program = Program::new();
    program.import(
        HostModule::new("counter")
            .with_decorator(
                "mark",
                move |ctx: &mut HostContext<'_>, args: Vec<Value>| -> Result<Value> {
                    let node = ctx.node_arg("mark", &args, 0)?;
                    ctx.set_state(key, node, Value::from(true));
                    Ok(Value::None)
                },
            )
            .with_function(
                "isMarked",
                move |ctx: &mut HostContext<'_>, args: Vec<Value>| -> Result<Value> {
                    let node = ctx.node_arg("isMarked", &args, 0)?;
                    Ok(Value::from(ctx.get_state(key, node).is_some()))
                },
            ),
    );
    let foo = program.graph_mut().add_model("Foo")?;
    program.add_projections(
        "mark.cadl".to_string(),
        r#"
        projection model#m {
          to {
            if !isMarked(self) {
              @mark(self);
            };
            self.addProperty("marked", isMarked(self));
          }
        }
        "#
        .to_string(),
    )?;

    let h = handle(&program, foo, "m")?;
    let projected = program.try_project(foo, h, &[])?;
    let marked = match program.graph().member(projected, "marked") {
        Some(m) => m,
        None => bail!("marked missing"),
    };
    let ty = program.graph().node(marked).member_type();
    assert!(matches!(
        ty.map(|t| program.graph().node(t).data()),
        Some(TypeData::BooleanLiteral(true))
    ));
    assert_eq!(program.state().get_exact(key, foo), None);
    assert_eq!(program.state().len(key), 1);
    Ok(())
}

#[test]
fn decorating_a_referenced_type_leaves_the_source_alone() -> Result<()> {
    let mut program = Program::new();
    program.import(doc::module());
    let inner = program.graph_mut().add_model("Inner")?;
    let foo = program.graph_mut().add_model("Foo")?;
    program.graph_mut().add_property(foo, "a", inner)?;
    program.add_projections(
        "doc.cadl".to_string(),
        r#"projection Foo#d { to { @doc(Inner, "projected"); } }"#.to_string(),
    )?;

    let h = handle(&program, foo, "d")?;
    program.try_project(foo, h, &[])?;
    assert_eq!(
        program.call_function("getDoc", vec![Value::Type(inner)])?,
        Value::None
    );
    Ok(())
}

#[test]
fn state_of_failed_runs_is_discarded() -> Result<()> {
    let mut program = Program::new();
    program.import(doc::module());
    let s = match program.graph().lookup("string") {
        Some(s) => s,
        None => bail!("string missing"),
    };
    let foo = program.graph_mut().add_model("Foo")?;
    program.graph_mut().add_property(foo, "a", s)?;
    program.add_projections(
        "doc.cadl".to_string(),
        r#"
        projection model#broken {
          to {
            @doc(self, "partial");
            self.addProperty("x", 1 + "hi");
          }
        }
        projection model#trim {
          to {
            self.deleteProperty("a");
          }
        }
        "#
        .to_string(),
    )?;

    let broken = handle(&program, foo, "broken")?;
    assert!(program.try_project(foo, broken, &[]).is_err());

    let trim = handle(&program, foo, "trim")?;
    let trimmed = program.try_project(foo, trim, &[])?;
    assert_eq!(
        program.call_function("getDoc", vec![Value::Type(trimmed)])?,
        Value::None
    );
    Ok(())
}

#[test]
fn foreign_nodes_from_hosts_are_rejected() -> Result<()> {
    let mut other = Program::new();
    let mut foreign = other.graph_mut().add_model("M0")?;
    for i in 1..8 {
        foreign = other.graph_mut().add_model(&format!("M{i}"))?;
    }

    let mut program = Program::new();
    let foo = program.graph_mut().add_model("Foo")?;
    assert!(program.graph().get(foreign).is_none());
    program.import(HostModule::new("stray").with_function(
        "stray",
        move |_: &mut HostContext<'_>, _: Vec<Value>| -> Result<Value> {
            Ok(Value::Type(foreign))
        },
    ));
    program.add_projections(
        "stray.cadl".to_string(),
        r#"projection model#s { to { return stray(); } }"#.to_string(),
    )?;

    let h = handle(&program, foo, "s")?;
    match program.try_project(foo, h, &[]) {
        Err(ProjectionError::Host { function, message }) => {
            assert_eq!(&*function, "stray");
            assert!(message.contains("not a node of this graph"));
        }
        r => bail!("unexpected result {r:?}"),
    }
    Ok(())
}
