//
// Part of weft
// Copyright (c) 2023 Sander in 't Veld
// License: MIT
//

//! The boundary with the external dialect parsers. Each dialect hands over a
//! parse tree; this module knows where in those trees the parts of a
//! procedure, module or file are, and lowers statements into IR through a
//! shared `NodeBuilder` callback.

pub mod fparser;
pub mod lowering;
pub mod ofp;
pub mod omni;
pub mod tree;

pub use tree::ParseNode;

use crate::config::Settings;
use crate::error::Error;
use crate::ir::Node;
use crate::module::ModuleDefinition;
use crate::scope::{ScopeId, Scopes};
use crate::source::Source;

use serde::Deserialize;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Frontend
{
	Omni,
	Ofp,
	#[default]
	#[serde(alias = "fparser")]
	Fp,
}

impl std::str::FromStr for Frontend
{
	type Err = Error;

	fn from_str(name: &str) -> Result<Frontend, Error>
	{
		let lowered = name.trim().to_ascii_lowercase();
		serde_plain::from_str(&lowered).map_err(|_| Error::UnknownFrontend {
			name: name.to_string(),
		})
	}
}

impl std::fmt::Display for Frontend
{
	fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result
	{
		match self
		{
			Frontend::Omni => write!(f, "omni"),
			Frontend::Ofp => write!(f, "ofp"),
			Frontend::Fp => write!(f, "fp"),
		}
	}
}

/// Converts a sequence of parse tree nodes into IR nodes.
pub trait NodeBuilder
{
	fn build(
		&self,
		nodes: &[ParseNode],
		context: &mut BuildContext,
	) -> Result<Vec<Node>, Error>;
}

/// Everything the node builder needs besides the tree itself.
pub struct BuildContext<'a>
{
	pub scopes: &'a mut Scopes,
	/// The scope that new names are bound to, or for a procedure under
	/// construction, the scope enclosing it.
	pub scope: Option<ScopeId>,
	pub raw_source: Option<&'a str>,
	pub definitions: &'a [ModuleDefinition],
	pub frontend: Frontend,
	pub settings: &'a Settings,
	pub builder: &'a dyn NodeBuilder,
	/// The OMNI type table, which holds the signatures of procedures.
	pub type_table: Option<&'a ParseNode>,
}

impl<'a> BuildContext<'a>
{
	pub fn new(scopes: &'a mut Scopes, settings: &'a Settings) -> Self
	{
		BuildContext {
			scopes,
			scope: None,
			raw_source: None,
			definitions: &[],
			frontend: settings.frontend,
			settings,
			builder: &lowering::StatementBuilder,
			type_table: None,
		}
	}

	pub fn in_scope(self, scope: Option<ScopeId>) -> Self
	{
		BuildContext { scope, ..self }
	}

	pub fn with_raw_source(self, raw_source: &'a str) -> Self
	{
		BuildContext {
			raw_source: Some(raw_source),
			..self
		}
	}

	pub fn with_definitions(self, definitions: &'a [ModuleDefinition])
		-> Self
	{
		BuildContext {
			definitions,
			..self
		}
	}

	pub fn with_frontend(self, frontend: Frontend) -> Self
	{
		BuildContext { frontend, ..self }
	}

	pub fn with_type_table(self, type_table: Option<&'a ParseNode>) -> Self
	{
		BuildContext { type_table, ..self }
	}

	/// A context for building inside another scope, sharing everything else.
	pub fn nested(&mut self, scope: Option<ScopeId>) -> BuildContext<'_>
	{
		BuildContext {
			scopes: &mut *self.scopes,
			scope,
			raw_source: self.raw_source,
			definitions: self.definitions,
			frontend: self.frontend,
			settings: self.settings,
			builder: self.builder,
			type_table: self.type_table,
		}
	}

	pub fn build(&mut self, nodes: &[ParseNode]) -> Result<Vec<Node>, Error>
	{
		let builder = self.builder;
		builder.build(nodes, self)
	}

	/// Build each of the given nodes, which need not be siblings.
	pub fn build_each(&mut self, nodes: &[&ParseNode])
		-> Result<Vec<Node>, Error>
	{
		let builder = self.builder;
		let mut built = Vec::new();
		for node in nodes
		{
			built.extend(builder.build(std::slice::from_ref(*node), self)?);
		}
		Ok(built)
	}

	pub fn require_scope(&self, tag: &str) -> Result<ScopeId, Error>
	{
		self.scope.ok_or_else(|| Error::MalformedTree {
			tag: tag.to_string(),
			expectation: "Expected to be inside a scope.".to_string(),
			location: None,
		})
	}

	pub fn source_of(&self, node: &ParseNode) -> Option<Source>
	{
		let lines = node.lines()?;
		match self.raw_source
		{
			Some(raw) => Some(Source::extract(raw, lines)),
			None => Some(Source::new(lines)),
		}
	}
}

/// The parts of a procedure, located in a dialect-specific parse tree.
#[derive(Debug)]
pub struct ProcedureOutline<'t>
{
	pub name: String,
	pub is_function: bool,
	pub dummies: Vec<String>,
	pub bind: Option<String>,
	/// Nodes that precede the specification and always belong to the
	/// docstring.
	pub preamble: Vec<&'t ParseNode>,
	pub spec: Vec<&'t ParseNode>,
	pub body: Vec<&'t ParseNode>,
	pub members: Vec<&'t ParseNode>,
	pub drop_own_declaration: bool,
	pub implicit_none: bool,
	pub tree: &'t ParseNode,
}

#[derive(Debug)]
pub struct ModuleOutline<'t>
{
	pub name: String,
	pub spec: Vec<&'t ParseNode>,
	pub routines: Vec<&'t ParseNode>,
	pub tree: &'t ParseNode,
}

/// A top level entity of a file.
#[derive(Debug, Clone, Copy)]
pub enum Entity<'t>
{
	Procedure(&'t ParseNode),
	Module(&'t ParseNode),
	Statement(&'t ParseNode),
}

impl Frontend
{
	pub fn outline_procedure<'t>(
		&self,
		tree: &'t ParseNode,
		type_table: Option<&ParseNode>,
	) -> Result<ProcedureOutline<'t>, Error>
	{
		match self
		{
			Frontend::Ofp => ofp::outline_procedure(tree),
			Frontend::Omni => omni::outline_procedure(tree, type_table),
			Frontend::Fp => fparser::outline_procedure(tree),
		}
	}

	pub fn outline_module<'t>(
		&self,
		tree: &'t ParseNode,
	) -> Result<ModuleOutline<'t>, Error>
	{
		match self
		{
			Frontend::Ofp => ofp::outline_module(tree),
			Frontend::Omni => omni::outline_module(tree),
			Frontend::Fp => fparser::outline_module(tree),
		}
	}

	pub fn file_entities<'t>(
		&self,
		tree: &'t ParseNode,
	) -> Result<Vec<Entity<'t>>, Error>
	{
		match self
		{
			Frontend::Ofp => ofp::file_entities(tree),
			Frontend::Omni => omni::file_entities(tree),
			Frontend::Fp => fparser::file_entities(tree),
		}
	}

	/// Where the signatures of procedures live, if this dialect keeps them
	/// apart from the procedures themselves.
	pub fn type_table<'t>(&self, tree: &'t ParseNode) -> Option<&'t ParseNode>
	{
		match self
		{
			Frontend::Omni => tree.child("typeTable"),
			_ => None,
		}
	}

	pub fn is_procedure(&self, tag: &str) -> bool
	{
		match self
		{
			Frontend::Ofp => ofp::is_procedure(tag),
			Frontend::Omni => omni::is_procedure(tag),
			Frontend::Fp => fparser::is_procedure(tag),
		}
	}
}
