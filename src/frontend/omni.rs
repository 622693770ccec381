//
// Part of weft
// Copyright (c) 2023 Sander in 't Veld
// License: MIT
//

//! Tree shapes of the OMNI compiler's XcodeML. Procedure signatures live in
//! the type table at the root of the program, keyed by type name.

use crate::error::Error;
use crate::frontend::{Entity, ModuleOutline, ParseNode, ProcedureOutline};

pub fn is_procedure(tag: &str) -> bool
{
	tag == "FfunctionDefinition"
}

fn function_type<'t>(
	type_table: Option<&'t ParseNode>,
	type_name: &str,
	tree: &ParseNode,
) -> Result<&'t ParseNode, Error>
{
	type_table
		.and_then(|table| {
			table
				.find_all("FfunctionType")
				.find(|x| x.attribute("type") == Some(type_name))
		})
		.ok_or_else(|| {
			tree.malformed(format!(
				"Expected an FfunctionType '{}' in the type table.",
				type_name
			))
		})
}

pub fn outline_procedure<'t>(
	tree: &'t ParseNode,
	type_table: Option<&ParseNode>,
) -> Result<ProcedureOutline<'t>, Error>
{
	if !is_procedure(&tree.tag)
	{
		return Err(tree.malformed("Expected an FfunctionDefinition.".into()));
	}
	let name_node = tree.require("name")?;
	let name = name_node.require_text()?.to_string();
	let type_name = name_node.require_attribute("type")?;
	let signature = function_type(type_table, type_name, tree)?;
	let is_function = signature.attribute("return_type") != Some("Fvoid");
	let dummies = match signature.child("params")
	{
		Some(params) => params
			.find_all("name")
			.map(|x| x.require_text().map(|x| x.to_ascii_lowercase()))
			.collect::<Result<Vec<String>, Error>>()?,
		None => Vec::new(),
	};

	let spec = match tree.child("declarations")
	{
		Some(declarations) => declarations.children.iter().collect(),
		None => Vec::new(),
	};
	let (body, members) = match tree.child("body")
	{
		Some(body) => split_contains(body),
		None => (Vec::new(), Vec::new()),
	};

	Ok(ProcedureOutline {
		name,
		is_function,
		dummies,
		bind: signature.attribute("bind").map(|x| x.to_string()),
		preamble: Vec::new(),
		spec,
		body,
		members,
		drop_own_declaration: !is_function,
		implicit_none: true,
		tree,
	})
}

/// Separates the contained procedures from the remaining statements.
fn split_contains(node: &ParseNode) -> (Vec<&ParseNode>, Vec<&ParseNode>)
{
	let mut statements = Vec::new();
	let mut members = Vec::new();
	for child in &node.children
	{
		if child.is("FcontainsStatement")
		{
			members.extend(child.children.iter().filter(|x| is_procedure(&x.tag)));
		}
		else
		{
			statements.push(child);
		}
	}
	(statements, members)
}

pub fn outline_module(tree: &ParseNode) -> Result<ModuleOutline, Error>
{
	if !tree.is("FmoduleDefinition")
	{
		return Err(tree.malformed("Expected an FmoduleDefinition.".into()));
	}
	let name = tree.require_attribute("name")?.to_string();
	let spec = match tree.child("declarations")
	{
		Some(declarations) => declarations.children.iter().collect(),
		None => Vec::new(),
	};
	let (_, routines) = split_contains(tree);
	Ok(ModuleOutline {
		name,
		spec,
		routines,
		tree,
	})
}

pub fn file_entities(tree: &ParseNode) -> Result<Vec<Entity>, Error>
{
	if !tree.is("XcodeProgram")
	{
		return Err(tree.malformed("Expected an XcodeProgram.".into()));
	}
	let declarations = tree.require("globalDeclarations")?;
	Ok(declarations
		.children
		.iter()
		.map(|x| match x.tag.as_str()
		{
			"FmoduleDefinition" => Entity::Module(x),
			"FfunctionDefinition" => Entity::Procedure(x),
			_ => Entity::Statement(x),
		})
		.collect())
}
