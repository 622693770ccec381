//
// Part of weft
// Copyright (c) 2023 Sander in 't Veld
// License: MIT
//

use weft::config::Settings;
use weft::expression::{Expression, TypedSymbol};
use weft::ir::{Node, NodeKind, NodeTag};
use weft::module::ModuleDefinition;
use weft::rebuilder::{CodeGenerator, Rebuilder};
use weft::scope::Scopes;
use weft::sourcefile::{DumpReader, Sourcefile, Unit};
use weft::subroutine::Subroutine;
use weft::types::{DataType, Intent, SymbolAttributes};
use weft::visitor::{FindNodes, FindVariables};
use weft::visitor::{Replacement, SubstituteExpressions, Transformer};

use std::collections::HashMap;

use anyhow::anyhow;
use pretty_assertions::assert_eq;

fn load(filename: &str, definitions: &[ModuleDefinition])
	-> Result<Sourcefile, anyhow::Error>
{
	let file = Sourcefile::from_file(
		filename.as_ref(),
		&DumpReader,
		&Settings::default(),
		definitions,
	)?;
	Ok(file)
}

fn kernel(file: &Sourcefile) -> Result<Subroutine, anyhow::Error>
{
	match file.get("kernel")
	{
		Some(Unit::Subroutine(routine)) => Ok(routine.clone()),
		_ => Err(anyhow!("no kernel")),
	}
}

fn names(symbols: Vec<TypedSymbol>) -> Vec<String>
{
	symbols.into_iter().map(|x| x.name).collect()
}

#[test]
fn splice_loop_body_into_parent() -> Result<(), anyhow::Error>
{
	let file = load("tests/samples/kernel_fp.tree", &[])?;
	let mut routine = kernel(&file)?;
	assert_eq!(routine.body.len(), 4);

	let loops = FindNodes::new(NodeTag::Loop).visit(&routine.body.body);
	let (id, inner) = match &loops[0].kind
	{
		NodeKind::Loop { body, .. } => (loops[0].id, body.clone()),
		_ => unreachable!(),
	};
	let mut mapping = HashMap::new();
	mapping.insert(id, Replacement::Nodes(inner));
	let body = std::mem::take(&mut routine.body);
	routine.body = Transformer::new(mapping).visit_section(body);

	assert_eq!(routine.body.len(), 5);
	let tags: Vec<NodeTag> = routine.body.iter().map(|x| x.tag()).collect();
	assert_eq!(tags, vec![
		NodeTag::Allocation,
		NodeTag::Assignment,
		NodeTag::Assignment,
		NodeTag::CallStatement,
		NodeTag::Deallocation,
	]);
	Ok(())
}

#[test]
fn remove_nested_statement_invalidates_container() -> Result<(), anyhow::Error>
{
	let file = load("tests/samples/kernel_fp.tree", &[])?;
	let routine = kernel(&file)?;
	let assignments = FindNodes::new(NodeTag::Assignment).visit(&routine.body.body);
	let mut mapping = HashMap::new();
	mapping.insert(assignments[0].id, Replacement::Remove);

	let kept = Transformer::new(mapping.clone()).visit(routine.body.body.clone());
	assert!(kept[1].source.is_some());

	let invalidated = Transformer::new(mapping)
		.invalidate_source()
		.visit(routine.body.body.clone());
	assert!(invalidated[0].source.is_some());
	assert!(invalidated[1].source.is_none());
	match &invalidated[1].kind
	{
		NodeKind::Loop { body, .. } => assert_eq!(body.len(), 1),
		other => return Err(anyhow!("unexpected {:?}", other)),
	}
	Ok(())
}

#[test]
fn replacement_nodes_are_not_transformed_again() -> Result<(), anyhow::Error>
{
	let comment = Node::comment("! replaced");
	let original = vec![Node::comment("! original")];
	let mut mapping = HashMap::new();
	mapping.insert(original[0].id, Replacement::Node(comment.clone()));
	mapping.insert(comment.id, Replacement::Remove);
	let result = Transformer::new(mapping).visit(original);
	assert_eq!(result, vec![comment]);
	Ok(())
}

#[test]
fn substitute_dimension_with_literal() -> Result<(), anyhow::Error>
{
	let file = load("tests/samples/kernel_fp.tree", &[])?;
	let routine = kernel(&file)?;
	let n = routine
		.variable_map()
		.get("n")
		.cloned()
		.ok_or_else(|| anyhow!("no n"))?;
	let mut mapping = HashMap::new();
	mapping.insert(Expression::Symbol(n), Expression::IntLiteral(10));

	let body = SubstituteExpressions::new(mapping).visit(routine.body.body.clone());
	let code = Rebuilder::default().generate(&body)?;
	assert!(code.contains("ALLOCATE(tmp(10))"));
	assert!(code.contains("DO i = 1, 10"));
	assert!(code.contains("CALL helper(y, 10)"));
	assert!(!code.contains("(n)"));

	// Only statements that changed lose their provenance.
	assert!(body[0].source.is_none());
	assert!(body[3].source.is_some());
	Ok(())
}

#[test]
fn substitute_keeps_source_when_asked() -> Result<(), anyhow::Error>
{
	let file = load("tests/samples/kernel_fp.tree", &[])?;
	let routine = kernel(&file)?;
	let tmp = routine
		.variable_map()
		.get("tmp")
		.cloned()
		.ok_or_else(|| anyhow!("no tmp"))?;
	// Without a subscript, as in the deallocation.
	let tmp = TypedSymbol {
		dimensions: Vec::new(),
		..tmp
	};
	let renamed = TypedSymbol {
		name: "work".to_string(),
		..tmp.clone()
	};
	let mut mapping = HashMap::new();
	mapping.insert(Expression::Symbol(tmp), Expression::Symbol(renamed));

	let body = SubstituteExpressions::new(mapping)
		.invalidate_source(false)
		.visit(routine.body.body.clone());
	assert!(body.iter().all(|x| x.source.is_some()));
	let code = Rebuilder::default().generate(&body)?;
	assert!(code.contains("DEALLOCATE(work)"));
	assert!(!code.contains("DEALLOCATE(tmp)"));
	Ok(())
}

#[test]
fn set_variables_adds_and_removes() -> Result<(), anyhow::Error>
{
	let file = load("tests/samples/kernel_fp.tree", &[])?;
	let mut routine = kernel(&file)?;
	let mut variables: Vec<TypedSymbol> = routine
		.variables()
		.into_iter()
		.filter(|x| x.name != "tmp")
		.collect();
	variables.push(
		TypedSymbol::new("work", routine.scope)
			.with_attributes(SymbolAttributes::new(DataType::Real)),
	);
	routine.set_variables(variables);

	assert_eq!(names(routine.variables()), vec!["n", "x", "y", "i", "work"]);
	assert_eq!(routine.spec.len(), 5);
	let code = Rebuilder::default().generate(&routine.spec.body)?;
	assert!(code.ends_with("REAL :: work\n"));
	Ok(())
}

#[test]
fn set_variables_drops_removed_arguments() -> Result<(), anyhow::Error>
{
	let file = load("tests/samples/kernel_fp.tree", &[])?;
	let mut routine = kernel(&file)?;
	let variables: Vec<TypedSymbol> = routine
		.variables()
		.into_iter()
		.filter(|x| x.name != "y")
		.collect();
	routine.set_variables(variables);
	assert_eq!(routine.argnames(), vec!["n", "x"]);
	assert_eq!(routine.dummies, vec!["n", "x"]);
	Ok(())
}

#[test]
fn set_arguments_declares_new_ones() -> Result<(), anyhow::Error>
{
	let file = load("tests/samples/kernel_fp.tree", &[])?;
	let mut routine = kernel(&file)?;
	let mut arguments = routine.arguments();
	let m = TypedSymbol::new("m", routine.scope).with_attributes(
		SymbolAttributes::new(DataType::Integer).with_intent(Intent::In),
	);
	arguments.push(m);
	routine.set_arguments(arguments);

	assert_eq!(routine.argnames(), vec!["n", "x", "y", "m"]);
	assert_eq!(routine.variables().len(), 6);
	let code = Rebuilder::default().generate(&routine.spec.body)?;
	assert!(code.ends_with("INTEGER, INTENT(IN) :: m\n"));

	// Dropping an argument keeps its declaration.
	let arguments: Vec<TypedSymbol> = routine
		.arguments()
		.into_iter()
		.filter(|x| x.name != "x")
		.collect();
	routine.set_arguments(arguments);
	assert_eq!(routine.argnames(), vec!["n", "y", "m"]);
	assert_eq!(routine.variables().len(), 6);
	Ok(())
}

#[test]
fn loop_variables_are_found() -> Result<(), anyhow::Error>
{
	let file = load("tests/samples/kernel_fp.tree", &[])?;
	let routine = kernel(&file)?;
	let mut found: Vec<String> = FindVariables::new()
		.shallow()
		.visit(&routine.body.body)
		.into_iter()
		.map(|x| x.name.clone())
		.collect();
	found.sort();
	found.dedup();
	assert_eq!(found, vec!["i", "n", "tmp", "x", "y"]);
	Ok(())
}

#[test]
fn enrich_calls_from_imported_module() -> Result<(), anyhow::Error>
{
	let physics = load("tests/samples/physics_fp.tree", &[])?;
	let reset = match physics.get("reset")
	{
		Some(Unit::Subroutine(routine)) => routine,
		_ => return Err(anyhow!("no reset")),
	};
	let mut file = load("tests/samples/driver_fp.tree", &physics.definitions())?;
	let driver = file
		.subroutine_mut("driver")
		.ok_or_else(|| anyhow!("no driver"))?;
	driver.enrich_calls(&[reset]);

	let calls: Vec<_> = FindNodes::new(NodeTag::CallStatement)
		.visit(&driver.body.body)
		.into_iter()
		.filter_map(|node| match &node.kind
		{
			NodeKind::CallStatement(call) => Some(call.clone()),
			_ => None,
		})
		.collect();
	assert_eq!(calls.len(), 2);

	let first = calls[0].context.as_ref().ok_or_else(|| anyhow!("none"))?;
	assert_eq!(first.routine, "reset");
	assert!(!first.active);
	let second = calls[1].context.as_ref().ok_or_else(|| anyhow!("none"))?;
	assert!(second.active);

	for call in &calls
	{
		let map = call.arg_map();
		assert_eq!(map.len(), 1);
		assert_eq!(map[0].0, "s");
		assert_eq!(map[0].1.symbol().map(|x| x.name.as_str()), Some("s"));
	}
	Ok(())
}

#[test]
fn enrich_calls_ignores_other_routines() -> Result<(), anyhow::Error>
{
	let file = load("tests/samples/kernel_fp.tree", &[])?;
	let mut routine = kernel(&file)?;
	let unrelated = Subroutine::new("unrelated", &mut Scopes::new(), None);
	routine.enrich_calls(&[&unrelated]);
	let calls = FindNodes::new(NodeTag::CallStatement).visit(&routine.body.body);
	match &calls[0].kind
	{
		NodeKind::CallStatement(call) =>
		{
			assert!(call.context.is_none());
			assert!(call.arg_map().is_empty());
		}
		other => return Err(anyhow!("unexpected {:?}", other)),
	}

	let helper = routine.members()[0].clone();
	routine.enrich_calls(&[&helper]);
	let calls = FindNodes::new(NodeTag::CallStatement).visit(&routine.body.body);
	match &calls[0].kind
	{
		NodeKind::CallStatement(call) =>
		{
			let names: Vec<String> =
				call.arg_map().into_iter().map(|(x, _)| x).collect();
			assert_eq!(names, vec!["z", "m"]);
		}
		other => return Err(anyhow!("unexpected {:?}", other)),
	}
	Ok(())
}
