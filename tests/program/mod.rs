// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use anyhow::{bail, Result};
use cadl_projection::*;

fn handle(program: &Program, node: NodeId, name: &str) -> Result<ProjectionHandle> {
    match program.projection(node, name).and_then(|p| p.to()) {
        Some(h) => Ok(h),
        None => bail!("projection `{name}` does not apply to {node}"),
    }
}

fn names(graph: &TypeGraph, node: NodeId) -> Vec<String> {
    graph
        .node(node)
        .data()
        .members()
        .map(|m| m.keys().map(|k| k.to_string()).collect())
        .unwrap_or_default()
}

fn string(program: &Program) -> Result<NodeId> {
    match program.graph().lookup("string") {
        Some(s) => Ok(s),
        None => bail!("string scalar missing"),
    }
}

const CASING: &str = r#"
projection model#camel {
  to {
    self.properties.forEach((p) => {
      self.renameProperty(p.name, p.name.toCamelCase());
    });
  }
  from {
    self.properties.forEach((p) => {
      self.renameProperty(p.name, p.name.toSnakeCase());
    });
  }
}
"#;

#[test]
fn snake_camel_round_trip() -> Result<()> {
    let mut program = Program::new();
    let s = string(&program)?;
    let foo = program.graph_mut().add_model("Foo")?;
    program.graph_mut().add_property(foo, "foo_prop", s)?;
    program.graph_mut().add_property(foo, "bar_prop", s)?;
    program.add_projections("casing.cadl".to_string(), CASING.to_string())?;

    let camel = match program.projection(foo, "camel") {
        Some(p) => p,
        None => bail!("camel not found"),
    };
    let (to, from) = match (camel.to(), camel.from()) {
        (Some(to), Some(from)) => (to, from),
        _ => bail!("camel should have both directions"),
    };

    let projected = program.try_project(foo, to, &[])?;
    assert_eq!(names(program.graph(), projected), ["fooProp", "barProp"]);

    let restored = program.try_project(projected, from, &[])?;
    assert_eq!(names(program.graph(), restored), ["foo_prop", "bar_prop"]);
    assert_eq!(names(program.graph(), foo), ["foo_prop", "bar_prop"]);
    Ok(())
}

#[test]
fn return_void_replaces_any_kind() -> Result<()> {
    let mut program = Program::new();
    let s = string(&program)?;
    let graph = program.graph_mut();
    let model = graph.add_model("M")?;
    let union = graph.add_union("U")?;
    graph.add_variant(union, "a", s)?;
    let interface = graph.add_interface("I")?;
    let void = graph.intrinsic(IntrinsicName::Void);
    graph.add_interface_operation(interface, "read", &[("id", s)], s)?;
    let op = graph.add_operation("op", &[], void)?;
    let e = graph.add_enum("E")?;
    let scalar = graph.add_scalar("myString", Some(s))?;

    let mut source = String::new();
    for kind in ["model", "union", "interface", "op", "enum", "scalar"] {
        source.push_str(&format!("projection {kind}#erase {{ to {{ return void; }} }}\n"));
    }
    program.add_projections("erase.cadl".to_string(), source)?;

    for node in [model, union, interface, op, e, scalar] {
        let h = handle(&program, node, "erase")?;
        let result = program.try_project(node, h, &[])?;
        assert_eq!(program.graph().kind(result), TypeKind::Intrinsic);
        assert!(program.graph().is_intrinsic(result, IntrinsicName::Void));
    }
    Ok(())
}

#[test]
fn errors_become_one_diagnostic() -> Result<()> {
    let mut program = Program::new();
    let foo = program.graph_mut().add_model("Foo")?;
    program.add_projections(
        "bad.cadl".to_string(),
        r#"projection model#bad { to { self.addProperty("x", 1 + "hi"); } }"#.to_string(),
    )?;
    let h = handle(&program, foo, "bad")?;

    assert_eq!(program.project(foo, h, &[]), None);
    let diagnostics = program.take_diagnostics();
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(&*diagnostics[0].code, INVALID_PROJECTION);
    assert_eq!(diagnostics[0].severity, Severity::Error);
    assert!(diagnostics[0]
        .to_string()
        .starts_with(&format!("error {INVALID_PROJECTION} on {foo}")));
    assert_eq!(diagnostics[0].target, foo);
    assert!(diagnostics[0].message.contains("bad.cadl"));

    assert_eq!(program.get_projection_instructions(foo, h, &[]), None);
    assert_eq!(program.diagnostics().len(), 1);

    // Diagnostics can also go to a caller-provided sink.
    let mut sink: Vec<Diagnostic> = vec![];
    assert_eq!(program.project_with_sink(foo, h, &[], &mut sink), None);
    assert_eq!(sink.len(), 1);
    assert_eq!(program.diagnostics().len(), 1);

    assert!(names(program.graph(), foo).is_empty());
    Ok(())
}

const ABSENT: &str = r#"projection model#drop { to { self.deleteProperty("missing"); } }"#;

#[test]
fn deleting_absent_member_is_ignored_by_default() -> Result<()> {
    let mut program = Program::new();
    let foo = program.graph_mut().add_model("Foo")?;
    program.add_projections("absent.cadl".to_string(), ABSENT.to_string())?;
    let h = handle(&program, foo, "drop")?;

    let instructions = program.try_get_projection_instructions(foo, h, &[])?;
    assert!(instructions.is_empty());
    assert_eq!(program.try_project(foo, h, &[])?, foo);
    Ok(())
}

#[test]
fn deleting_absent_member_can_be_an_error() -> Result<()> {
    let mut program = Program::new();
    let foo = program.graph_mut().add_model("Foo")?;
    program.add_projections("absent.cadl".to_string(), ABSENT.to_string())?;
    program.set_absent_member_policy(AbsentMemberPolicy::Error);
    let h = handle(&program, foo, "drop")?;

    match program.try_project(foo, h, &[]) {
        Err(ProjectionError::UnknownMember(msg)) => assert!(msg.contains("missing")),
        r => bail!("unexpected result {r:?}"),
    }
    Ok(())
}

#[test]
fn options_from_json() -> Result<()> {
    let options = Options::from_json_str(r#"{ "absent-member": "error", "max-depth": 8 }"#)?;
    assert_eq!(options.absent_member, AbsentMemberPolicy::Error);
    assert_eq!(options.max_depth, 8);

    let defaults = Options::from_json_str("{}")?;
    assert_eq!(defaults, Options::default());
    assert!(Options::from_json_str(r#"{ "strict": true }"#).is_err());
    Ok(())
}

#[test]
fn name_collisions() -> Result<()> {
    let mut program = Program::new();
    let s = string(&program)?;
    let foo = program.graph_mut().add_model("Foo")?;
    program.graph_mut().add_property(foo, "a", s)?;
    program.graph_mut().add_property(foo, "b", s)?;
    program.add_projections(
        "collide.cadl".to_string(),
        r#"
        projection model#add { to { self.addProperty("a", string); } }
        projection model#rename { to { self.renameProperty("a", "b"); } }
        projection model#same { to { self.renameProperty("a", "a"); } }
        "#
        .to_string(),
    )?;

    for name in ["add", "rename"] {
        let h = handle(&program, foo, name)?;
        match program.try_project(foo, h, &[]) {
            Err(ProjectionError::NameCollision(_)) => (),
            r => bail!("{name}: unexpected result {r:?}"),
        }
    }

    let h = handle(&program, foo, "same")?;
    assert!(program.try_get_projection_instructions(foo, h, &[])?.is_empty());
    Ok(())
}

#[test]
fn renaming_absent_member_is_unknown_member() -> Result<()> {
    let mut program = Program::new();
    let foo = program.graph_mut().add_model("Foo")?;
    program.add_projections(
        "rename.cadl".to_string(),
        r#"projection model#r { to { self.renameProperty("nope", "x"); } }"#.to_string(),
    )?;
    let h = handle(&program, foo, "r")?;
    assert!(matches!(
        program.try_project(foo, h, &[]),
        Err(ProjectionError::UnknownMember(_))
    ));
    Ok(())
}

#[test]
fn rename_keeps_position() -> Result<()> {
    let mut program = Program::new();
    let s = string(&program)?;
    let foo = program.graph_mut().add_model("Foo")?;
    for n in ["a", "b", "c"] {
        program.graph_mut().add_property(foo, n, s)?;
    }
    program.add_projections(
        "rename.cadl".to_string(),
        r#"projection model#r { to { self.renameProperty("b", "z"); } }"#.to_string(),
    )?;
    let h = handle(&program, foo, "r")?;
    let result = program.try_project(foo, h, &[])?;
    assert_eq!(names(program.graph(), result), ["a", "z", "c"]);
    Ok(())
}

#[test]
fn unions_enums_interfaces_and_operations() -> Result<()> {
    let mut program = Program::new();
    let s = string(&program)?;
    let int32 = match program.graph().lookup("int32") {
        Some(i) => i,
        None => bail!("int32 missing"),
    };
    let graph = program.graph_mut();
    let union = graph.add_union("Pet")?;
    graph.add_variant(union, "cat", s)?;
    graph.add_variant(union, "dog", s)?;
    let e = graph.add_enum("Color")?;
    graph.add_enum_member(e, "red", None)?;
    graph.add_enum_member(e, "green", Some(Value::from("g")))?;
    let iface = graph.add_interface("Store")?;
    graph.add_interface_operation(iface, "get", &[("id", s)], s)?;
    graph.add_interface_operation(iface, "remove", &[("id", s)], s)?;

    program.add_projections(
        "kinds.cadl".to_string(),
        r#"
        projection union#u {
          to {
            self.deleteVariant("dog");
            self.addVariant("fish", int32);
            self.getVariant("cat").setType(int32);
          }
        }
        projection enum#e {
          to {
            self.renameMember("red", "Red");
            self.addMember("blue");
            self.deleteMember("green");
          }
        }
        projection interface#i {
          to {
            self.operations.forEach((o) => {
              o.setReturnType(int32);
            });
            self.renameOperation("remove", "delete");
            self.projectOperation("get", opv);
          }
        }
        projection op#opv {
          to {
            self.setReturnType(void);
          }
        }
        "#
        .to_string(),
    )?;

    let h = handle(&program, union, "u")?;
    let instructions = program.try_get_projection_instructions(union, h, &[])?;
    let ops: Vec<&str> = instructions.iter().map(|i| i.op.as_str()).collect();
    assert_eq!(ops, ["deleteVariant", "addVariant", "setType"]);
    let result = program.try_project(union, h, &[])?;
    let graph = program.graph();
    assert_eq!(names(graph, result), ["cat", "fish"]);
    let cat = graph.member(result, "cat").unwrap();
    assert_eq!(graph.node(cat).member_type(), Some(int32));
    assert_eq!(graph.node(graph.member(union, "cat").unwrap()).member_type(), Some(s));

    let h = handle(&program, e, "e")?;
    let result = program.try_project(e, h, &[])?;
    assert_eq!(names(program.graph(), result), ["Red", "blue"]);

    let h = handle(&program, iface, "i")?;
    let instructions = program.try_get_projection_instructions(iface, h, &[])?;
    let ops: Vec<&str> = instructions.iter().map(|i| i.op.as_str()).collect();
    assert_eq!(
        ops,
        ["setReturnType", "setReturnType", "renameOperation", "projectOperation"]
    );
    let result = program.try_project(iface, h, &[])?;
    let graph = program.graph();
    assert_eq!(names(graph, result), ["get", "delete"]);
    let void = graph.intrinsic(IntrinsicName::Void);
    let get = graph.member(result, "get").unwrap();
    let delete = graph.member(result, "delete").unwrap();
    assert_eq!(graph.node(get).return_type(), Some(void));
    assert_eq!(graph.node(delete).return_type(), Some(int32));
    Ok(())
}

#[test]
fn wrong_slot_is_type_mismatch() -> Result<()> {
    let mut program = Program::new();
    let foo = program.graph_mut().add_model("Foo")?;
    program.add_projections(
        "slot.cadl".to_string(),
        r#"projection model#w { to { self.addVariant("x", string); } }"#.to_string(),
    )?;
    let h = handle(&program, foo, "w")?;
    assert!(matches!(
        program.try_project(foo, h, &[]),
        Err(ProjectionError::TypeMismatch(_))
    ));
    Ok(())
}

#[test]
fn missing_direction_is_unknown_projection() -> Result<()> {
    let mut program = Program::new();
    let foo = program.graph_mut().add_model("Foo")?;
    program.add_projections(
        "dir.cadl".to_string(),
        r#"
        projection model#only { to { } }
        projection model#caller { from { return self#only(); } }
        "#
        .to_string(),
    )?;
    let only = match program.projection(foo, "only") {
        Some(p) => p,
        None => bail!("only missing"),
    };
    assert!(only.from().is_none());

    // `#` inherits the direction of the calling projection.
    let caller = match program.projection(foo, "caller").and_then(|p| p.from()) {
        Some(h) => h,
        None => bail!("caller missing"),
    };
    assert!(matches!(
        program.try_project(foo, caller, &[]),
        Err(ProjectionError::UnknownProjection(_))
    ));
    Ok(())
}

#[test]
fn projection_reference_on_inapplicable_node_is_identity() -> Result<()> {
    let mut program = Program::new();
    let s = string(&program)?;
    let foo = program.graph_mut().add_model("Foo")?;
    program.graph_mut().add_property(foo, "a", s)?;
    program.add_projections(
        "ref.cadl".to_string(),
        r#"
        projection model#m { to { return self.getProperty("a").type#m(); } }
        "#
        .to_string(),
    )?;
    let h = handle(&program, foo, "m")?;
    assert_eq!(program.try_project(foo, h, &[])?, s);
    Ok(())
}

#[test]
fn projections_listing_and_targets() -> Result<()> {
    let mut program = Program::new();
    let foo = program.graph_mut().add_model("Foo")?;
    let bar = program.graph_mut().add_model("Bar")?;
    program.add_projections(
        "list.cadl".to_string(),
        r#"
        projection model#all { to { } from { } }
        projection Foo#only { to { self.addProperty("foo", string); } }
        projection Foo#all { to { return never; } }
        "#
        .to_string(),
    )?;

    let foo_names: Vec<String> = program
        .projections(foo)
        .iter()
        .map(|p| p.name.to_string())
        .collect();
    assert_eq!(foo_names, ["all", "only", "all"]);
    assert_eq!(program.projections(bar).len(), 1);

    // First declaration wins.
    let all = match program.projection(foo, "all") {
        Some(p) => p,
        None => bail!("all missing"),
    };
    assert_eq!(all.target, ProjectionTarget::Kind(TypeKind::Model));

    // Node-targeted projections still apply to nodes derived from their target.
    let h = handle(&program, foo, "only")?;
    let projected = program.try_project(foo, h, &[])?;
    assert!(program.projection(projected, "only").is_some());
    assert!(program.projection(bar, "only").is_none());

    assert!(program
        .add_projections(
            "bad.cadl".to_string(),
            "projection Missing#x { to { } }".to_string()
        )
        .is_err());
    Ok(())
}

#[test]
fn recursive_types_terminate() -> Result<()> {
    let mut program = Program::new();
    let node = program.graph_mut().add_model("Node")?;
    program.graph_mut().add_property(node, "next", node)?;
    program.graph_mut().add_property(node, "value_x", node)?;
    program.add_projections(
        "cycle.cadl".to_string(),
        r#"
        projection model#deep {
          to {
            self.properties.forEach((p) => {
              self.projectProperty(p.name, deep);
            });
            self.renameProperty("value_x", "valueX");
          }
        }
        "#
        .to_string(),
    )?;
    let h = handle(&program, node, "deep")?;
    let result = program.try_project(node, h, &[])?;
    assert_eq!(names(program.graph(), result), ["next", "valueX"]);
    assert_eq!(names(program.graph(), node), ["next", "value_x"]);
    Ok(())
}

#[test]
fn recursion_limit() -> Result<()> {
    let mut program = Program::new();
    let foo = program.graph_mut().add_model("Foo")?;
    program.set_max_depth(16);
    program.add_projections(
        "deep.cadl".to_string(),
        r#"
        projection model#grow {
          to(n) {
            return self#grow(n + 1);
          }
        }
        "#
        .to_string(),
    )?;
    let h = handle(&program, foo, "grow")?;
    match program.try_project(foo, h, &[Value::from(0)]) {
        Err(ProjectionError::RecursionLimit { limit, .. }) => assert_eq!(limit, 16),
        r => bail!("unexpected result {r:?}"),
    }
    Ok(())
}

#[test]
fn edits_on_other_nodes_are_detached() -> Result<()> {
    let mut program = Program::new();
    let s = string(&program)?;
    let foo = program.graph_mut().add_model("Foo")?;
    let bar = program.graph_mut().add_model("Bar")?;
    program.graph_mut().add_property(bar, "x", s)?;
    program.add_projections(
        "detached.cadl".to_string(),
        r#"
        projection Foo#d {
          to {
            Bar.deleteProperty("x");
          }
        }
        "#
        .to_string(),
    )?;
    let h = handle(&program, foo, "d")?;
    assert!(program.try_get_projection_instructions(foo, h, &[])?.is_empty());
    assert_eq!(program.try_project(foo, h, &[])?, foo);
    assert_eq!(names(program.graph(), bar), ["x"]);
    Ok(())
}

#[test]
fn detached_edits_return_the_edited_copy() -> Result<()> {
    let mut program = Program::new();
    let s = string(&program)?;
    let foo = program.graph_mut().add_model("Foo")?;
    let bar = program.graph_mut().add_model("Bar")?;
    program.graph_mut().add_property(bar, "x", s)?;
    program.add_projections(
        "detached.cadl".to_string(),
        r#"
        projection Foo#dropped {
          to {
            return Bar.deleteProperty("x");
          }
        }
        projection Foo#renamed {
          to {
            return Bar.renameProperty("x", "y");
          }
        }
        projection Foo#added {
          to {
            return Bar.addProperty("z", string);
          }
        }
        "#
        .to_string(),
    )?;

    let h = handle(&program, foo, "dropped")?;
    let dropped = program.try_project(foo, h, &[])?;
    assert_ne!(dropped, bar);
    assert_eq!(program.graph().node(dropped).name(), Some("Bar"));
    assert!(names(program.graph(), dropped).is_empty());

    let h = handle(&program, foo, "renamed")?;
    let renamed = program.try_project(foo, h, &[])?;
    assert_eq!(names(program.graph(), renamed), ["y"]);

    let h = handle(&program, foo, "added")?;
    let added = program.try_project(foo, h, &[])?;
    assert_eq!(names(program.graph(), added), ["x", "z"]);

    assert_eq!(names(program.graph(), bar), ["x"]);
    Ok(())
}

#[test]
fn scratch_nodes_are_released() -> Result<()> {
    let mut program = Program::new();
    let s = string(&program)?;
    let foo = program.graph_mut().add_model("Foo")?;
    program.graph_mut().add_property(foo, "some_name", s)?;
    let source = format!(
        "{CASING}\n{}",
        r#"
        projection model#broken {
          to {
            self.renameProperty("some_name", "other");
            self.addProperty("x", 1 + "hi");
          }
        }
        "#
    );
    program.add_projections("scratch.cadl".to_string(), source)?;
    let len = program.graph().len();

    let broken = handle(&program, foo, "broken")?;
    assert!(program.try_project(foo, broken, &[]).is_err());
    assert_eq!(program.graph().len(), len);

    let camel = handle(&program, foo, "camel")?;
    let instructions = program.try_get_projection_instructions(foo, camel, &[])?;
    assert_eq!(instructions.len(), 1);
    assert_eq!(program.graph().len(), len);

    let projected = program.try_project(foo, camel, &[])?;
    assert!(program.graph().len() > len);
    assert_eq!(names(program.graph(), projected), ["someName"]);
    Ok(())
}

#[cfg(feature = "arc")]
#[test]
fn program_is_shareable() -> Result<()> {
    fn assert_send_sync<T: Send + Sync + Clone>() {}
    assert_send_sync::<Program>();

    let mut program = Program::new();
    let foo = program.graph_mut().add_model("Foo")?;
    program.add_projections("casing.cadl".to_string(), CASING.to_string())?;
    program.graph_mut().add_property(foo, "some_name", foo)?;
    let h = handle(&program, foo, "camel")?;

    let workers: Vec<_> = (0..4)
        .map(|_| {
            let mut fork = program.clone();
            std::thread::spawn(move || {
                fork.try_project(foo, h, &[])
                    .map(|n| names(fork.graph(), n))
            })
        })
        .collect();
    for w in workers {
        match w.join() {
            Ok(r) => assert_eq!(r?, ["someName"]),
            Err(_) => bail!("worker panicked"),
        }
    }
    Ok(())
}
