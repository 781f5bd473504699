// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use anyhow::{anyhow, bail, Result};
use cadl_projection::*;
use serde::{Deserialize, Serialize};
use std::env;
use test_generator::test_resources;

/// One top-level declaration of the case's type graph.
///
/// Members are written `name: type`, `name?: type` for optional properties,
/// `name: type` for an operation's return type and plain `name` for enum
/// members. Types must be declared before they are referenced.
#[derive(Serialize, Deserialize, PartialEq, Debug)]
struct Decl {
    kind: String,
    name: String,
    #[serde(default)]
    members: Vec<String>,
    returns: Option<String>,
}

#[derive(Serialize, Deserialize, PartialEq, Debug)]
#[serde(rename_all = "camelCase")]
struct WantInstruction {
    op: String,
    target_name: String,
    #[serde(default)]
    extra_args: Vec<Value>,
}

#[derive(Serialize, Deserialize, PartialEq, Debug)]
#[serde(deny_unknown_fields)]
struct Case {
    note: String,
    #[serde(default)]
    types: Vec<Decl>,
    projections: String,
    target: String,
    projection: String,
    #[serde(default = "default_direction")]
    direction: Direction,
    #[serde(default)]
    args: Vec<Value>,
    options: Option<Options>,
    want_kind: Option<String>,
    want_name: Option<String>,
    want_members: Option<Vec<String>>,
    want_instructions: Option<Vec<WantInstruction>>,
    /// The unchanged source members, checked after the run.
    source_members: Option<Vec<String>>,
    error: Option<String>,
    error_kind: Option<String>,
}

fn default_direction() -> Direction {
    Direction::To
}

#[derive(Serialize, Deserialize, PartialEq, Debug)]
struct Test {
    cases: Vec<Case>,
}

fn resolve(graph: &TypeGraph, name: &str) -> Result<NodeId> {
    let name = name.trim();
    if let Some(i) = IntrinsicName::ALL.iter().find(|i| i.as_str() == name) {
        return Ok(graph.intrinsic(*i));
    }
    graph
        .lookup(name)
        .ok_or_else(|| anyhow!("type `{name}` is not declared"))
}

fn split_member(member: &str) -> Result<(&str, bool, &str)> {
    let (name, ty) = member
        .split_once(':')
        .ok_or_else(|| anyhow!("member `{member}` has no type"))?;
    let name = name.trim();
    match name.strip_suffix('?') {
        Some(name) => Ok((name, true, ty.trim())),
        None => Ok((name, false, ty.trim())),
    }
}

fn build_graph(graph: &mut TypeGraph, decls: &[Decl]) -> Result<()> {
    for decl in decls {
        match decl.kind.as_str() {
            "model" => {
                let model = graph.add_model(&decl.name)?;
                for member in &decl.members {
                    let (name, optional, ty) = split_member(member)?;
                    let ty = resolve(graph, ty)?;
                    if optional {
                        graph.add_optional_property(model, name, ty)?;
                    } else {
                        graph.add_property(model, name, ty)?;
                    }
                }
            }
            "union" => {
                let union = graph.add_union(&decl.name)?;
                for member in &decl.members {
                    let (name, _, ty) = split_member(member)?;
                    let ty = resolve(graph, ty)?;
                    graph.add_variant(union, name, ty)?;
                }
            }
            "enum" => {
                let e = graph.add_enum(&decl.name)?;
                for member in &decl.members {
                    graph.add_enum_member(e, member.trim(), None)?;
                }
            }
            "interface" => {
                let interface = graph.add_interface(&decl.name)?;
                for member in &decl.members {
                    let (name, _, ty) = split_member(member)?;
                    let ty = resolve(graph, ty)?;
                    graph.add_interface_operation(interface, name, &[], ty)?;
                }
            }
            "op" => {
                let returns = resolve(graph, decl.returns.as_deref().unwrap_or("void"))?;
                graph.add_operation(&decl.name, &[], returns)?;
            }
            "scalar" => {
                graph.add_scalar(&decl.name, None)?;
            }
            k => bail!("unsupported declaration kind `{k}`"),
        }
    }
    Ok(())
}

fn type_name(graph: &TypeGraph, id: NodeId) -> String {
    match graph.node(id).data() {
        TypeData::Intrinsic(i) => i.as_str().to_string(),
        TypeData::StringLiteral(_) | TypeData::NumericLiteral(_) | TypeData::BooleanLiteral(_) => {
            graph.describe(id)
        }
        data => match data.name() {
            Some(name) => name.to_string(),
            None => format!("{{{}}}", render_members(graph, id).join(", ")),
        },
    }
}

fn render_member(graph: &TypeGraph, member: NodeId) -> String {
    let node = graph.node(member);
    let name = node.name().unwrap_or_default();
    match node.data() {
        TypeData::ModelProperty {
            r#type, optional, ..
        } => {
            let opt = if *optional { "?" } else { "" };
            format!("{name}{opt}: {}", type_name(graph, *r#type))
        }
        TypeData::UnionVariant { r#type, .. } => format!("{name}: {}", type_name(graph, *r#type)),
        TypeData::Operation { return_type, .. } => {
            format!("{name}: {}", type_name(graph, *return_type))
        }
        _ => name.to_string(),
    }
}

fn render_members(graph: &TypeGraph, id: NodeId) -> Vec<String> {
    graph
        .node(id)
        .data()
        .members()
        .map(|members| members.values().map(|m| render_member(graph, *m)).collect())
        .unwrap_or_default()
}

fn check_members(actual: Vec<String>, expected: &[String], what: &str) -> Result<()> {
    if actual != expected {
        let (a, e) = (actual.join("\n"), expected.join("\n"));
        std::println!("{what} mismatch :\n{}", prettydiff::diff_lines(&e, &a));
        bail!("{what} mismatch: got {actual:?}, expected {expected:?}");
    }
    Ok(())
}

fn run_case(case: &Case) -> Result<()> {
    let mut program = Program::new();
    if let Some(options) = &case.options {
        program.set_options(options.clone());
    }
    build_graph(program.graph_mut(), &case.types)?;
    program.add_projections("case.cadl".to_string(), case.projections.clone())?;

    let target = resolve(program.graph(), &case.target)?;
    let projection = program
        .projection(target, &case.projection)
        .ok_or_else(|| anyhow!("projection `{}` does not apply", case.projection))?;
    let handle = match case.direction {
        Direction::To => projection.to(),
        Direction::From => projection.from(),
    }
    .ok_or_else(|| anyhow!("projection has no `{}` direction", case.direction))?;

    let node = match (
        program.try_project(target, handle, &case.args),
        &case.error,
        &case.error_kind,
    ) {
        (Ok(node), None, None) => node,
        (Ok(node), _, _) => bail!(
            "expected an error, projection returned {}",
            program.graph().describe(node)
        ),
        (Err(e), None, None) => return Err(e.into()),
        (Err(e), error, kind) => {
            if let Some(expected) = error {
                let actual = e.to_string();
                if !actual.contains(expected.as_str()) {
                    bail!("Error message\n`{actual}\n`\ndoes not contain `{expected}`");
                }
            }
            if let Some(kind) = kind {
                assert_eq!(e.kind_name(), kind.as_str(), "{e}");
            }
            return Ok(());
        }
    };

    let graph = program.graph();
    if let Some(kind) = &case.want_kind {
        assert_eq!(graph.kind(node).as_str(), kind.as_str());
    }
    if let Some(name) = &case.want_name {
        assert_eq!(graph.node(node).name().unwrap_or_default(), name.as_str());
    }
    if let Some(members) = &case.want_members {
        check_members(render_members(graph, node), members, "members")?;
    }
    if let Some(members) = &case.source_members {
        check_members(render_members(graph, target), members, "source members")?;
    }

    if let Some(want) = &case.want_instructions {
        let actual: Vec<WantInstruction> = program
            .try_get_projection_instructions(target, handle, &case.args)?
            .iter()
            .map(|i| WantInstruction {
                op: i.op.as_str().to_string(),
                target_name: i.target_name.to_string(),
                extra_args: i.extra_args.clone(),
            })
            .collect();
        assert_eq!(&actual, want);
    }
    Ok(())
}

fn yaml_test_impl(file: &str) -> Result<()> {
    println!("\nrunning {}", file);

    let yaml = std::fs::read_to_string(file)?;
    let test: Test = serde_yaml::from_str(&yaml)?;

    for case in &test.cases {
        print!("case {} ", case.note);
        run_case(case).map_err(|e| anyhow!("case `{}` failed: {e:#}", case.note))?;
        println!("passed");
    }
    println!("{} cases passed.", test.cases.len());
    Ok(())
}

fn yaml_test(file: &str) -> Result<()> {
    match yaml_test_impl(file) {
        Ok(_) => Ok(()),
        Err(e) => {
            // Returned errors are not always printed by cargo test.
            panic!("{}", e);
        }
    }
}

#[test]
#[ignore = "run a single case file passed on the command line"]
fn one_yaml() -> Result<()> {
    env_logger::init();

    let file = match env::args().find(|a| a.ends_with(".yaml")) {
        Some(f) => f,
        None => bail!("missing yaml test file"),
    };
    yaml_test(&file)
}

#[test_resources("tests/projection/cases/*.yaml")]
fn run(path: &str) {
    yaml_test(path).unwrap()
}
