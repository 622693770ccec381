//
// Part of weft
// Copyright (c) 2023 Sander in 't Veld
// License: MIT
//

//! Tree shapes of fparser, which follow the names of the standard's syntax
//! rules.

use crate::error::Error;
use crate::frontend::{Entity, ModuleOutline, ParseNode, ProcedureOutline};

pub fn is_procedure(tag: &str) -> bool
{
	tag == "Subroutine_Subprogram" || tag == "Function_Subprogram"
}

fn children_of<'t>(tree: &'t ParseNode, tag: &str) -> Vec<&'t ParseNode>
{
	match tree.child(tag)
	{
		Some(part) => part.children.iter().collect(),
		None => Vec::new(),
	}
}

/// Direct children only: procedures nested in those are their own concern.
fn subprograms<'t>(tree: &'t ParseNode, tag: &str) -> Vec<&'t ParseNode>
{
	match tree.child(tag)
	{
		Some(part) => part
			.children
			.iter()
			.filter(|x| is_procedure(&x.tag))
			.collect(),
		None => Vec::new(),
	}
}

fn is_trailing_commentary(node: &ParseNode) -> bool
{
	match node.tag.as_str()
	{
		"comment" | "comment-block" | "pragma" => true,
		_ => false,
	}
}

pub fn outline_procedure(tree: &ParseNode) -> Result<ProcedureOutline, Error>
{
	let (statement_tag, is_function) = match tree.tag.as_str()
	{
		"Subroutine_Subprogram" => ("Subroutine_Stmt", false),
		"Function_Subprogram" => ("Function_Stmt", true),
		_ =>
		{
			return Err(tree.malformed(
				"Expected a Subroutine_Subprogram or Function_Subprogram.".into(),
			))
		}
	};
	let statement = tree.require(statement_tag)?;
	let name = statement.require_attribute("name")?.to_string();
	let dummies = match statement.child("Dummy_Arg_List")
	{
		Some(list) => list
			.find_all("Name")
			.map(|x| x.require_text().map(|x| x.to_ascii_lowercase()))
			.collect::<Result<Vec<String>, Error>>()?,
		None => Vec::new(),
	};

	let mut spec = children_of(tree, "Specification_Part");
	let mut body = children_of(tree, "Execution_Part");
	// A specification of nothing but commentary is all docstring.
	if let Some(last) = spec.iter().rposition(|x| !is_trailing_commentary(x))
	{
		let mut moved = spec.split_off(last + 1);
		moved.append(&mut body);
		body = moved;
	}

	Ok(ProcedureOutline {
		name,
		is_function,
		dummies,
		bind: statement.attribute("bind").map(|x| x.to_string()),
		preamble: Vec::new(),
		spec,
		body,
		members: subprograms(tree, "Internal_Subprogram_Part"),
		drop_own_declaration: false,
		implicit_none: false,
		tree,
	})
}

pub fn outline_module(tree: &ParseNode) -> Result<ModuleOutline, Error>
{
	if !tree.is("Module")
	{
		return Err(tree.malformed("Expected a Module.".into()));
	}
	let name = tree.require("Module_Stmt")?.require_attribute("name")?;
	Ok(ModuleOutline {
		name: name.to_string(),
		spec: children_of(tree, "Specification_Part"),
		routines: subprograms(tree, "Module_Subprogram_Part"),
		tree,
	})
}

pub fn file_entities(tree: &ParseNode) -> Result<Vec<Entity>, Error>
{
	if !tree.is("Program")
	{
		return Err(tree.malformed("Expected a Program.".into()));
	}
	Ok(tree
		.children
		.iter()
		.map(|x| match x.tag.as_str()
		{
			"Module" => Entity::Module(x),
			tag if is_procedure(tag) => Entity::Procedure(x),
			_ => Entity::Statement(x),
		})
		.collect())
}
