//
// Part of weft
// Copyright (c) 2023 Sander in 't Veld
// License: MIT
//

//! Tree shapes of the Open Fortran Parser.

use crate::error::Error;
use crate::frontend::{Entity, ModuleOutline, ParseNode, ProcedureOutline};

pub fn is_procedure(tag: &str) -> bool
{
	tag == "subroutine" || tag == "function"
}

pub fn outline_procedure(tree: &ParseNode) -> Result<ProcedureOutline, Error>
{
	if !is_procedure(&tree.tag)
	{
		return Err(tree.malformed("Expected a subroutine or function.".into()));
	}
	let name = tree.require_attribute("name")?.to_string();
	let is_function = tree.is("function");

	let header = tree.require("header")?;
	let dummies = if is_function
	{
		match header.child("names")
		{
			Some(names) => names
				.find_all("name")
				.map(|x| x.require_attribute("id").map(|x| x.to_ascii_lowercase()))
				.collect::<Result<Vec<String>, Error>>()?,
			None => Vec::new(),
		}
	}
	else
	{
		match header.child("arguments")
		{
			Some(arguments) => arguments
				.find_all("argument")
				.map(|x| {
					x.require_attribute("name").map(|x| x.to_ascii_lowercase())
				})
				.collect::<Result<Vec<String>, Error>>()?,
			None => Vec::new(),
		}
	};

	let body = tree.require("body")?;
	let position = body
		.children
		.iter()
		.position(|x| x.is("specification"))
		.ok_or_else(|| {
			body.malformed("Expected a 'specification' node.".into())
		})?;
	let preamble = body.children[..position].iter().collect();
	let spec = body.children[position].children.iter().collect();
	let executable = body.children[position + 1..].iter().collect();

	let members = match tree.child("members")
	{
		Some(members) => members
			.children
			.iter()
			.filter(|x| is_procedure(&x.tag))
			.collect(),
		None => Vec::new(),
	};

	Ok(ProcedureOutline {
		name,
		is_function,
		dummies,
		bind: tree.attribute("bind").map(|x| x.to_string()),
		preamble,
		spec,
		body: executable,
		members,
		drop_own_declaration: false,
		implicit_none: false,
		tree,
	})
}

pub fn outline_module(tree: &ParseNode) -> Result<ModuleOutline, Error>
{
	if !tree.is("module")
	{
		return Err(tree.malformed("Expected a module.".into()));
	}
	let name = tree.require_attribute("name")?.to_string();
	let spec = tree.require("body/specification")?.children.iter().collect();
	let routines = match tree.child("members")
	{
		Some(members) => members
			.children
			.iter()
			.filter(|x| is_procedure(&x.tag))
			.collect(),
		None => Vec::new(),
	};
	Ok(ModuleOutline {
		name,
		spec,
		routines,
		tree,
	})
}

pub fn file_entities(tree: &ParseNode) -> Result<Vec<Entity>, Error>
{
	if !tree.is("file")
	{
		return Err(tree.malformed("Expected a file.".into()));
	}
	Ok(tree
		.children
		.iter()
		.map(|x| match x.tag.as_str()
		{
			"module" => Entity::Module(x),
			tag if is_procedure(tag) => Entity::Procedure(x),
			_ => Entity::Statement(x),
		})
		.collect())
}
