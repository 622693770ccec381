//
// Part of weft
// Copyright (c) 2023 Sander in 't Veld
// License: MIT
//

use crate::error::Error;
use crate::expression::TypedSymbol;
use crate::frontend::{BuildContext, ParseNode};
use crate::ir::{Node, NodeKind, NodeTag, Section};
use crate::scope::{EntityKind, EntityRef, ScopeId, Scopes};
use crate::source::Source;
use crate::subroutine::Subroutine;
use crate::types::{SymbolAttributes, TypeDef};
use crate::visitor::FindNodes;

#[derive(Debug, Clone, PartialEq)]
pub struct Module
{
	pub name: String,
	pub docstring: Vec<Node>,
	pub spec: Section,
	pub routines: Vec<Subroutine>,
	pub scope: ScopeId,
	pub source: Option<Source>,
}

impl Module
{
	pub fn new(name: &str, scopes: &mut Scopes, parent: Option<ScopeId>) -> Module
	{
		let scope = scopes.create(parent);
		scopes.set_defined_by(
			scope,
			EntityRef {
				kind: EntityKind::Module,
				name: name.to_string(),
			},
		);
		Module {
			name: name.to_string(),
			docstring: Vec::new(),
			spec: Section::default(),
			routines: Vec::new(),
			scope,
			source: None,
		}
	}

	pub fn from_tree(
		tree: &ParseNode,
		context: &mut BuildContext,
	) -> Result<Module, Error>
	{
		let outline = context.frontend.outline_module(tree)?;
		log::debug!("building module '{}'", outline.name);
		let parent = context.scope;
		let mut module = Module::new(&outline.name, context.scopes, parent);

		let (spec, routines) = {
			let mut inner = context.nested(Some(module.scope));
			let spec = inner.build_each(&outline.spec)?;
			let routines = outline
				.routines
				.iter()
				.map(|routine| Subroutine::from_tree(routine, &mut inner))
				.collect::<Result<Vec<Subroutine>, Error>>()?;
			(spec, routines)
		};

		let split = spec
			.iter()
			.position(|x| !x.is_comment())
			.unwrap_or(spec.len());
		let mut docstring = spec;
		let spec = docstring.split_off(split);
		module.docstring = docstring;
		module.spec = Section::new(spec);
		module.routines = routines;
		module.source = context.source_of(outline.tree);
		Ok(module)
	}

	pub fn subroutine(&self, name: &str) -> Option<&Subroutine>
	{
		self.routines
			.iter()
			.find(|x| x.name.eq_ignore_ascii_case(name))
	}

	pub fn subroutine_mut(&mut self, name: &str) -> Option<&mut Subroutine>
	{
		self.routines
			.iter_mut()
			.find(|x| x.name.eq_ignore_ascii_case(name))
	}

	pub fn variables(&self) -> Vec<TypedSymbol>
	{
		FindNodes::new(NodeTag::Declaration)
			.shallow()
			.visit(&self.spec.body)
			.into_iter()
			.flat_map(|node| match &node.kind
			{
				NodeKind::Declaration { variables } => variables.clone(),
				_ => Vec::new(),
			})
			.collect()
	}

	/// A snapshot of what this module exports, for resolving imports in
	/// files built later.
	pub fn definition(&self, scopes: &Scopes) -> ModuleDefinition
	{
		let (symbols, types) = match scopes.get(self.scope)
		{
			Some(scope) => (
				scope
					.symbols
					.iter()
					.filter(|(_, attributes)| !attributes.dtype.is_procedure())
					.map(|(name, attributes)| (name.to_string(), attributes.clone()))
					.collect(),
				scope.types.iter().map(|(_, x)| x.clone()).collect(),
			),
			None => (Vec::new(), Vec::new()),
		};
		let procedures = self
			.routines
			.iter()
			.map(|routine| ProcedureSignature {
				name: routine.name.clone(),
				is_function: routine.is_function,
				arguments: routine
					.arguments()
					.into_iter()
					.map(|x| (x.name, x.attributes))
					.collect(),
			})
			.collect();
		ModuleDefinition {
			name: self.name.clone(),
			symbols,
			types,
			procedures,
		}
	}
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProcedureSignature
{
	pub name: String,
	pub is_function: bool,
	pub arguments: Vec<(String, SymbolAttributes)>,
}

/// The exported names of a module, detached from the scopes it was built in.
#[derive(Debug, Clone, PartialEq)]
pub struct ModuleDefinition
{
	pub name: String,
	pub symbols: Vec<(String, SymbolAttributes)>,
	pub types: Vec<TypeDef>,
	pub procedures: Vec<ProcedureSignature>,
}

impl ModuleDefinition
{
	pub fn symbol(&self, name: &str) -> Option<SymbolAttributes>
	{
		let variable = self
			.symbols
			.iter()
			.find(|(x, _)| x.eq_ignore_ascii_case(name))
			.map(|(_, attributes)| attributes.clone());
		variable.or_else(|| {
			self.procedures
				.iter()
				.find(|x| x.name.eq_ignore_ascii_case(name))
				.map(|x| SymbolAttributes::procedure(&x.name, x.is_function))
		})
	}

	pub fn typedef(&self, name: &str) -> Option<&TypeDef>
	{
		self.types.iter().find(|x| x.name.eq_ignore_ascii_case(name))
	}

	/// Variables first, then procedures.
	pub fn all_symbols(&self) -> Vec<(String, SymbolAttributes)>
	{
		let procedures = self.procedures.iter().map(|x| {
			(
				x.name.clone(),
				SymbolAttributes::procedure(&x.name, x.is_function),
			)
		});
		self.symbols.iter().cloned().chain(procedures).collect()
	}
}
