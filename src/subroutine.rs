//
// Part of weft
// Copyright (c) 2023 Sander in 't Veld
// License: MIT
//

//! Procedures: construction from a dialect's parse tree, the accessors that
//! transformations use to edit them, and the repair of scope bindings.

use crate::error::{Error, Warning};
use crate::expression::{Expression, TypedSymbol};
use crate::frontend::{BuildContext, Frontend, ParseNode, ProcedureOutline};
use crate::ir::{CallContext, Node, NodeKind, NodeTag, Section};
use crate::scope::{EntityKind, EntityRef, ScopeId, Scopes, SymbolTable};
use crate::source::Source;
use crate::types::SymbolAttributes;
use crate::visitor::{fold_children, fold_symbol_children, Fold};
use crate::visitor::{FindNodes, FindTypedSymbols, FindVariables};
use crate::visitor::{Renumber, Replacement, SubstituteExpressions, Transformer};

use std::collections::{HashMap, HashSet};

#[derive(Debug, Clone, PartialEq)]
pub struct Subroutine
{
	pub name: String,
	/// Dummy argument names in signature order, lowercase.
	pub dummies: Vec<String>,
	pub docstring: Vec<Node>,
	pub spec: Section,
	pub body: Section,
	pub members: Vec<Subroutine>,
	pub scope: ScopeId,
	pub bind: Option<String>,
	pub is_function: bool,
	pub source: Option<Source>,
}

/// Everything a procedure consists of apart from its scope.
#[derive(Debug, Default)]
pub struct Parts
{
	pub name: String,
	pub dummies: Vec<String>,
	pub docstring: Vec<Node>,
	pub spec: Section,
	pub body: Section,
	pub members: Vec<Subroutine>,
	pub bind: Option<String>,
	pub is_function: bool,
	pub source: Option<Source>,
}

impl Subroutine
{
	/// Take ownership of a scope, record this procedure as its defining
	/// entity and register the procedure in the enclosing scope.
	pub fn from_parts(parts: Parts, scope: ScopeId, scopes: &mut Scopes)
		-> Subroutine
	{
		let kind = if parts.is_function
		{
			EntityKind::Function
		}
		else
		{
			EntityKind::Subroutine
		};
		scopes.set_defined_by(
			scope,
			EntityRef {
				kind,
				name: parts.name.clone(),
			},
		);
		if let Some(parent) = scopes.parent(scope)
		{
			scopes.declare(
				parent,
				&parts.name,
				SymbolAttributes::procedure(&parts.name, parts.is_function),
			);
		}
		Subroutine {
			name: parts.name,
			dummies: parts
				.dummies
				.iter()
				.map(|x| x.to_ascii_lowercase())
				.collect(),
			docstring: parts.docstring,
			spec: parts.spec,
			body: parts.body,
			members: parts.members,
			scope,
			bind: parts.bind,
			is_function: parts.is_function,
			source: parts.source,
		}
	}

	/// An empty subroutine in a fresh scope.
	pub fn new(name: &str, scopes: &mut Scopes, parent: Option<ScopeId>)
		-> Subroutine
	{
		let scope = scopes.create(parent);
		let parts = Parts {
			name: name.to_string(),
			..Parts::default()
		};
		Subroutine::from_parts(parts, scope, scopes)
	}

	/// Build a procedure with the dialect of the context. The scope of the
	/// context becomes the parent of the new procedure's scope.
	pub fn from_tree(
		tree: &ParseNode,
		context: &mut BuildContext,
	) -> Result<Subroutine, Error>
	{
		let outline = context
			.frontend
			.outline_procedure(tree, context.type_table)?;
		Subroutine::assemble(outline, context)
	}

	pub fn from_ofp(
		tree: &ParseNode,
		context: &mut BuildContext,
	) -> Result<Subroutine, Error>
	{
		let scope = context.scope;
		let mut context = context.nested(scope).with_frontend(Frontend::Ofp);
		Subroutine::from_tree(tree, &mut context)
	}

	pub fn from_omni(
		tree: &ParseNode,
		context: &mut BuildContext,
	) -> Result<Subroutine, Error>
	{
		let scope = context.scope;
		let mut context = context.nested(scope).with_frontend(Frontend::Omni);
		Subroutine::from_tree(tree, &mut context)
	}

	pub fn from_fparser(
		tree: &ParseNode,
		context: &mut BuildContext,
	) -> Result<Subroutine, Error>
	{
		let scope = context.scope;
		let mut context = context.nested(scope).with_frontend(Frontend::Fp);
		Subroutine::from_tree(tree, &mut context)
	}

	fn assemble(
		outline: ProcedureOutline,
		context: &mut BuildContext,
	) -> Result<Subroutine, Error>
	{
		log::debug!(
			"building {} '{}'",
			if outline.is_function
			{
				"function"
			}
			else
			{
				"subroutine"
			},
			outline.name
		);
		let scope = context.scopes.create(context.scope);

		let (preamble, spec, members, body) = {
			let mut inner = context.nested(Some(scope));
			let preamble = inner.build_each(&outline.preamble)?;
			let spec = inner.build_each(&outline.spec)?;
			// Members are built before the body, so that calls to them
			// find their procedure symbols.
			let members = outline
				.members
				.iter()
				.map(|member| Subroutine::from_tree(member, &mut inner))
				.collect::<Result<Vec<Subroutine>, Error>>()?;
			let body = inner.build_each(&outline.body)?;
			(preamble, spec, members, body)
		};

		let (docstring, mut spec) = split_docstring(preamble, spec);
		if outline.drop_own_declaration
		{
			spec = drop_declaration_of(spec, &outline.name);
			if let Some(own) = context.scopes.get_mut(scope)
			{
				own.symbols.remove(&outline.name);
			}
		}
		if outline.implicit_none
		{
			insert_implicit_none(&mut spec);
		}

		let parts = Parts {
			name: outline.name,
			dummies: outline.dummies,
			docstring,
			spec: Section::new(spec),
			body: Section::new(body),
			members,
			bind: outline.bind,
			is_function: outline.is_function,
			source: context.source_of(outline.tree),
		};
		let mut routine = Subroutine::from_parts(parts, scope, context.scopes);
		if context.settings.infer_allocatable_shapes
		{
			routine.infer_allocatable_shapes(context.scopes);
		}
		routine.rescope_variables(
			context.scopes,
			context.settings.strict_scoping,
		)?;
		Ok(routine)
	}

	/// Give every occurrence of an allocated array the shape it is
	/// allocated with, or the shape of the allocation's data source.
	pub fn infer_allocatable_shapes(&mut self, scopes: &mut Scopes)
	{
		let mut shapes: HashMap<String, Vec<Expression>> = HashMap::new();
		let allocations =
			FindNodes::new(NodeTag::Allocation).shallow().visit(&self.body.body);
		for node in allocations
		{
			let (variables, data_source) = match &node.kind
			{
				NodeKind::Allocation {
					variables,
					data_source,
				} => (variables, data_source),
				_ => continue,
			};
			for variable in variables.iter().filter_map(|x| x.symbol())
			{
				// A data source allocated earlier has its inferred shape.
				let shape = match data_source.as_ref().and_then(|x| x.symbol())
				{
					Some(source) => shapes
						.get(&source.full_name().to_ascii_lowercase())
						.cloned()
						.unwrap_or_else(|| source.attributes.shape.clone()),
					None => variable.dimensions.clone(),
				};
				if shape.is_empty()
				{
					continue;
				}
				shapes.insert(variable.full_name().to_ascii_lowercase(), shape);
			}
		}
		if shapes.is_empty()
		{
			return;
		}

		for (name, shape) in &shapes
		{
			if let Some(scope) = scopes.get_mut(self.scope)
			{
				if let Some(attributes) = scope.symbols.get_mut(name)
				{
					attributes.shape = shape.clone();
				}
			}
		}

		let mut reshape = MapSymbols(|mut symbol: TypedSymbol| {
			if let Some(shape) = shapes.get(&symbol.full_name().to_ascii_lowercase())
			{
				symbol.attributes.shape = shape.clone();
			}
			symbol
		});
		let mut mapping = HashMap::new();
		for symbol in self.ir_symbols()
		{
			let replacement = reshape.fold_symbol(symbol.clone());
			mapping.insert(
				Expression::Symbol(symbol),
				Expression::Symbol(replacement),
			);
		}
		self.substitute(mapping, false);
	}

	/// Rebind every typed symbol of this procedure to a scope in its chain
	/// of scopes, so that no symbol refers to a scope this procedure cannot
	/// see. Returns the soft conditions encountered.
	pub fn rescope_variables(
		&mut self,
		scopes: &mut Scopes,
		strict: bool,
	) -> Result<Vec<Warning>, Error>
	{
		let chain = scopes.ancestors(self.scope);
		let locals: HashSet<String> = self
			.variables()
			.iter()
			.map(|x| x.full_name().to_ascii_lowercase())
			.collect();
		let imports: HashSet<String> = self
			.imported_symbols()
			.iter()
			.map(|x| x.full_name().to_ascii_lowercase())
			.collect();
		let variables: HashSet<String> = FindVariables::new()
			.shallow()
			.visit(&self.spec.body)
			.into_iter()
			.chain(FindVariables::new().shallow().visit(&self.body.body))
			.map(|x| x.full_name().to_ascii_lowercase())
			.collect();

		let mut rescoper = Rescoper {
			scopes,
			own: self.scope,
			chain,
			locals,
			imports,
			variables,
			strict,
			routine: &self.name,
			warnings: Vec::new(),
		};
		let mut mapping = HashMap::new();
		let mut seen = HashSet::new();
		for symbol in self.ir_symbols()
		{
			if !seen.insert(symbol.clone())
			{
				continue;
			}
			let rescoped = rescoper.rescope(&symbol)?;
			if rescoped != symbol
			{
				mapping.insert(
					Expression::Symbol(symbol),
					Expression::Symbol(rescoped),
				);
			}
		}
		let warnings = rescoper.warnings;
		self.substitute(mapping, false);
		Ok(warnings)
	}

	/// The typed symbols of this procedure's own IR, without those of
	/// nested procedures.
	fn ir_symbols(&self) -> Vec<TypedSymbol>
	{
		let mut symbols = Vec::new();
		for nodes in [&self.docstring, &self.spec.body, &self.body.body]
		{
			symbols.extend(
				FindTypedSymbols::new().shallow().visit(nodes).into_iter().cloned(),
			);
		}
		symbols
	}

	fn substitute(
		&mut self,
		mapping: HashMap<Expression, Expression>,
		invalidate_source: bool,
	)
	{
		if mapping.is_empty()
		{
			return;
		}
		let substitute = || {
			SubstituteExpressions::new(mapping.clone())
				.invalidate_source(invalidate_source)
				.shallow()
		};
		let docstring = std::mem::take(&mut self.docstring);
		self.docstring = substitute().visit(docstring);
		let spec = std::mem::take(&mut self.spec);
		self.spec = substitute().visit_section(spec);
		let body = std::mem::take(&mut self.body);
		self.body = substitute().visit_section(body);
	}

	/// Copy this procedure into a fresh scope with the same parent.
	pub fn clone_routine(&self, scopes: &mut Scopes) -> Result<Subroutine, Error>
	{
		let parent = scopes.parent(self.scope);
		self.clone_with(scopes, &self.name, parent)
	}

	/// Copy this procedure into a fresh scope under the given parent. The
	/// copy shares no scope and no node identity with the original.
	pub fn clone_with(
		&self,
		scopes: &mut Scopes,
		name: &str,
		parent: Option<ScopeId>,
	) -> Result<Subroutine, Error>
	{
		let scope = scopes.duplicate(self.scope, parent);
		let members = self
			.members
			.iter()
			.map(|member| member.clone_with(scopes, &member.name, Some(scope)))
			.collect::<Result<Vec<Subroutine>, Error>>()?;
		let parts = Parts {
			name: name.to_string(),
			dummies: self.dummies.clone(),
			docstring: Renumber.fold_nodes(self.docstring.clone()),
			spec: Section::new(clone_procedures(
				Renumber.fold_nodes(self.spec.body.clone()),
				scopes,
				(self.scope, scope),
			)?),
			body: Section::new(Renumber.fold_nodes(self.body.body.clone())),
			members,
			bind: self.bind.clone(),
			is_function: self.is_function,
			source: self.source.clone(),
		};
		let mut routine = Subroutine::from_parts(parts, scope, scopes);
		routine.rescope_variables(scopes, false)?;
		Ok(routine)
	}

	/// All variables declared in the specification, arguments included.
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

	/// Make the declarations match the given variables: new ones are
	/// declared at the end of the specification, missing ones are removed,
	/// along with any declaration left empty and any argument no longer
	/// declared.
	pub fn set_variables(&mut self, variables: Vec<TypedSymbol>)
	{
		let wanted: HashSet<String> = variables
			.iter()
			.map(|x| x.full_name().to_ascii_lowercase())
			.collect();
		let declared: HashSet<String> = self
			.variables()
			.iter()
			.map(|x| x.full_name().to_ascii_lowercase())
			.collect();

		let mut mapping = HashMap::new();
		for node in FindNodes::new(NodeTag::Declaration)
			.shallow()
			.visit(&self.spec.body)
		{
			if let NodeKind::Declaration { variables } = &node.kind
			{
				let kept: Vec<TypedSymbol> = variables
					.iter()
					.filter(|x| wanted.contains(&x.full_name().to_ascii_lowercase()))
					.cloned()
					.collect();
				if kept.is_empty()
				{
					mapping.insert(node.id, Replacement::Remove);
				}
				else if kept.len() < variables.len()
				{
					let updated = Node {
						kind: NodeKind::Declaration { variables: kept },
						..node.clone()
					};
					mapping.insert(node.id, Replacement::Node(updated));
				}
			}
		}
		let spec = std::mem::take(&mut self.spec);
		self.spec = Transformer::new(mapping).shallow().visit_section(spec);

		for variable in variables
		{
			if !declared.contains(&variable.full_name().to_ascii_lowercase())
			{
				self.spec.append(vec![Node::new(NodeKind::Declaration {
					variables: vec![variable],
				})]);
			}
		}
		self.dummies.retain(|x| wanted.contains(x));
	}

	/// The declared arguments, in signature order.
	pub fn arguments(&self) -> Vec<TypedSymbol>
	{
		let map = self.variable_map();
		self.dummies
			.iter()
			.filter_map(|name| map.get(name).cloned())
			.collect()
	}

	/// Replace the signature. Arguments that are not declared yet are
	/// declared at the end of the specification; declarations of removed
	/// arguments stay.
	pub fn set_arguments(&mut self, arguments: Vec<TypedSymbol>)
	{
		let map = self.variable_map();
		self.dummies = arguments
			.iter()
			.map(|x| x.name.to_ascii_lowercase())
			.collect();
		for argument in arguments
		{
			if !map.contains(&argument.name)
			{
				self.spec.append(vec![Node::new(NodeKind::Declaration {
					variables: vec![argument],
				})]);
			}
		}
	}

	pub fn argnames(&self) -> Vec<String>
	{
		self.arguments().into_iter().map(|x| x.name).collect()
	}

	pub fn variable_map(&self) -> SymbolTable<TypedSymbol>
	{
		let mut map = SymbolTable::new();
		for variable in self.variables()
		{
			map.insert(&variable.full_name(), variable);
		}
		map
	}

	fn imported_symbols(&self) -> Vec<TypedSymbol>
	{
		FindNodes::new(NodeTag::Import)
			.shallow()
			.visit(&self.spec.body)
			.into_iter()
			.flat_map(|node| match &node.kind
			{
				NodeKind::Import { symbols, .. } => symbols.clone(),
				_ => Vec::new(),
			})
			.collect()
	}

	/// Attach a call context to every call to one of the given routines.
	/// A call directly preceded by a `weft reference` pragma is inactive.
	pub fn enrich_calls(&mut self, routines: &[&Subroutine])
	{
		let targets = routines
			.iter()
			.map(|routine| {
				(routine.name.to_ascii_lowercase(), (*routine).clone_signature())
			})
			.collect();
		let mut enricher = CallEnricher { targets };
		let body = std::mem::take(&mut self.body);
		self.body = Section::new(enricher.fold_nodes(body.body));
	}

	fn clone_signature(&self) -> (String, Vec<String>)
	{
		(self.name.clone(), self.dummies.clone())
	}

	/// An interface block declaring only this procedure's signature. The
	/// argument declarations are rebound to the scope of the interface.
	pub fn interface(&self, scopes: &mut Scopes) -> Result<Node, Error>
	{
		let scope = scopes.create(None);
		let arguments: HashSet<String> = self.dummies.iter().cloned().collect();
		let mut mapping = HashMap::new();
		for node in FindNodes::new(NodeTag::Declaration)
			.shallow()
			.visit(&self.spec.body)
		{
			if let NodeKind::Declaration { variables } = &node.kind
			{
				if variables
					.iter()
					.all(|x| arguments.contains(&x.name.to_ascii_lowercase()))
				{
					let variables: Vec<TypedSymbol> = variables
						.iter()
						.map(|x| x.clone().with_scope(scope))
						.collect();
					for variable in &variables
					{
						scopes.declare(scope, &variable.name, variable.attributes.clone());
					}
					let updated = Node {
						kind: NodeKind::Declaration { variables },
						..node.clone()
					};
					mapping.insert(node.id, Replacement::Node(updated));
				}
				else
				{
					mapping.insert(node.id, Replacement::Remove);
				}
			}
		}
		let spec = Transformer::new(mapping)
			.shallow()
			.visit(self.spec.body.clone());
		let spec = Renumber.fold_nodes(spec);
		let parts = Parts {
			name: self.name.clone(),
			dummies: self.dummies.clone(),
			spec: Section::new(spec),
			bind: self.bind.clone(),
			is_function: self.is_function,
			..Parts::default()
		};
		let mut routine = Subroutine::from_parts(parts, scope, scopes);
		routine.rescope_variables(scopes, false)?;
		Ok(Node::new(NodeKind::Interface {
			body: vec![Node::new(NodeKind::Subroutine(Box::new(routine)))],
		}))
	}

	/// The entity whose scope encloses this procedure's scope.
	pub fn parent<'s>(&self, scopes: &'s Scopes) -> Option<&'s EntityRef>
	{
		let parent = scopes.parent(self.scope)?;
		scopes.defined_by(parent)
	}

	pub fn members(&self) -> &[Subroutine]
	{
		&self.members
	}

	pub fn member(&self, name: &str) -> Option<&Subroutine>
	{
		self.members
			.iter()
			.find(|x| x.name.eq_ignore_ascii_case(name))
	}

	pub fn scope(&self) -> ScopeId
	{
		self.scope
	}

	/// Docstring, specification and body, in that order.
	pub fn ir(&self) -> [&[Node]; 3]
	{
		[
			self.docstring.as_slice(),
			self.spec.body.as_slice(),
			self.body.body.as_slice(),
		]
	}
}

/// The docstring is everything before the specification, together with the
/// longest prefix of the specification that is only commentary.
fn split_docstring(preamble: Vec<Node>, spec: Vec<Node>) -> (Vec<Node>, Vec<Node>)
{
	let mut docstring = preamble;
	let split = spec
		.iter()
		.position(|x| !x.is_comment())
		.unwrap_or(spec.len());
	let mut spec = spec;
	let rest = spec.split_off(split);
	docstring.extend(spec);
	(docstring, rest)
}

fn drop_declaration_of(spec: Vec<Node>, name: &str) -> Vec<Node>
{
	spec.into_iter()
		.filter_map(|node| match node.kind
		{
			NodeKind::Declaration { variables } =>
			{
				let variables: Vec<TypedSymbol> = variables
					.into_iter()
					.filter(|x| !x.name.eq_ignore_ascii_case(name))
					.collect();
				if variables.is_empty()
				{
					None
				}
				else
				{
					Some(Node {
						kind: NodeKind::Declaration { variables },
						..node
					})
				}
			}
			_ => Some(node),
		})
		.collect()
}

/// Give the procedures of interface blocks scopes of their own. A procedure
/// whose scope hung below `host.0` is moved below `host.1`.
fn clone_procedures(
	nodes: Vec<Node>,
	scopes: &mut Scopes,
	host: (ScopeId, ScopeId),
) -> Result<Vec<Node>, Error>
{
	let mut cloned = Vec::with_capacity(nodes.len());
	for node in nodes
	{
		let kind = match node.kind
		{
			NodeKind::Interface { body } => NodeKind::Interface {
				body: clone_procedures(body, scopes, host)?,
			},
			NodeKind::Subroutine(routine) =>
			{
				let parent = match scopes.parent(routine.scope)
				{
					Some(parent) if parent == host.0 => Some(host.1),
					parent => parent,
				};
				let copy = routine.clone_with(scopes, &routine.name, parent)?;
				NodeKind::Subroutine(Box::new(copy))
			}
			kind => kind,
		};
		cloned.push(Node { kind, ..node });
	}
	Ok(cloned)
}

/// Insert `IMPLICIT NONE` after the leading imports of modules.
fn insert_implicit_none(spec: &mut Vec<Node>)
{
	let present = spec.iter().any(|node| match &node.kind
	{
		NodeKind::Intrinsic { text } => text.eq_ignore_ascii_case("implicit none"),
		_ => false,
	});
	if present
	{
		return;
	}
	let position = spec
		.iter()
		.position(|node| match &node.kind
		{
			NodeKind::Import { c_import, .. } => *c_import,
			_ => true,
		})
		.unwrap_or(spec.len());
	spec.insert(position, Node::intrinsic("IMPLICIT NONE"));
}

/// Applies a function to every typed symbol, innermost first.
struct MapSymbols<F>(F);

impl<F> Fold for MapSymbols<F>
where
	F: FnMut(TypedSymbol) -> TypedSymbol,
{
	fn fold_symbol(&mut self, symbol: TypedSymbol) -> TypedSymbol
	{
		let symbol = fold_symbol_children(self, symbol);
		(self.0)(symbol)
	}
}

struct Rescoper<'a>
{
	scopes: &'a mut Scopes,
	own: ScopeId,
	chain: Vec<ScopeId>,
	locals: HashSet<String>,
	imports: HashSet<String>,
	/// Names used as variables rather than as procedures.
	variables: HashSet<String>,
	strict: bool,
	routine: &'a str,
	warnings: Vec<Warning>,
}

impl<'a> Rescoper<'a>
{
	fn rescope(&mut self, symbol: &TypedSymbol) -> Result<TypedSymbol, Error>
	{
		let parent = match &symbol.parent
		{
			Some(parent) => Some(Box::new(self.rescope(parent)?)),
			None => None,
		};
		let dimensions = symbol
			.dimensions
			.iter()
			.map(|x| self.rescope_expression(x))
			.collect::<Result<Vec<Expression>, Error>>()?;
		let mut rescoped = TypedSymbol {
			parent,
			dimensions,
			..symbol.clone()
		};

		let name = symbol.full_name();
		let key = name.to_ascii_lowercase();
		if self.locals.contains(&key) || self.imports.contains(&key)
		{
			if symbol.scope != self.own
			{
				rescoped.scope = self.own;
				match self.scopes.lookup(self.own, &name, false)
				{
					Some(attributes) => rescoped.attributes = attributes,
					None => self.scopes.declare(
						self.own,
						&name,
						symbol.attributes.clone(),
					),
				}
			}
			return Ok(rescoped);
		}

		if self.chain.contains(&symbol.scope)
		{
			if self.strict
				&& self.variables.contains(&key)
				&& self.scopes.lookup(symbol.scope, &name, true).is_none()
			{
				return Err(self.missing(&name));
			}
			return Ok(rescoped);
		}

		for &scope in &self.chain
		{
			if let Some(stored) = self.scopes.lookup(scope, &name, false)
			{
				let is_equal = stored.compare(
					&symbol.attributes,
					self.scopes,
					scope,
					symbol.scope,
				);
				if !is_equal && !symbol.attributes.dtype.is_deferred()
				{
					log::warn!(
						"in '{}': type for {} does not match stored type",
						self.routine,
						name
					);
					self.warnings.push(Warning::TypeMismatch {
						name: name.clone(),
						stored: stored.clone(),
						found: symbol.attributes.clone(),
					});
				}
				rescoped.scope = scope;
				rescoped.attributes = stored;
				return Ok(rescoped);
			}
		}

		if self.strict
		{
			return Err(self.missing(&name));
		}
		log::debug!(
			"in '{}': type for {} not found in any scope",
			self.routine,
			name
		);
		self.warnings.push(Warning::MissingDefinition { name: name.clone() });
		rescoped.scope = self.own;
		if !name.contains('%')
		{
			self.scopes
				.declare(self.own, &name, symbol.attributes.clone());
		}
		Ok(rescoped)
	}

	fn rescope_expression(
		&mut self,
		expression: &Expression,
	) -> Result<Expression, Error>
	{
		let rescoped = match expression
		{
			Expression::Symbol(symbol) => Expression::Symbol(self.rescope(symbol)?),
			Expression::Binary { op, left, right } => Expression::Binary {
				op: *op,
				left: Box::new(self.rescope_expression(left)?),
				right: Box::new(self.rescope_expression(right)?),
			},
			Expression::Unary { op, operand } => Expression::Unary {
				op: *op,
				operand: Box::new(self.rescope_expression(operand)?),
			},
			Expression::FunctionCall {
				function,
				arguments,
			} => Expression::FunctionCall {
				function: self.rescope(function)?,
				arguments: arguments
					.iter()
					.map(|x| self.rescope_expression(x))
					.collect::<Result<Vec<Expression>, Error>>()?,
			},
			Expression::Range { lower, upper, step } =>
			{
				let mut bound = |x: &Option<Box<Expression>>| match x
				{
					Some(x) => self.rescope_expression(x).map(|x| Some(Box::new(x))),
					None => Ok(None),
				};
				Expression::Range {
					lower: bound(lower)?,
					upper: bound(upper)?,
					step: bound(step)?,
				}
			}
			literal => literal.clone(),
		};
		Ok(rescoped)
	}

	fn missing(&self, name: &str) -> Error
	{
		Error::MissingDefinition {
			name: name.to_string(),
			routine: self.routine.to_string(),
		}
	}
}

struct CallEnricher
{
	/// Target routines by lowercase name, with their name and dummies.
	targets: HashMap<String, (String, Vec<String>)>,
}

fn is_reference_pragma(node: &Node) -> bool
{
	match &node.kind
	{
		NodeKind::Pragma { keyword, content } =>
		{
			keyword.eq_ignore_ascii_case("weft")
				&& content
					.trim_start()
					.to_ascii_lowercase()
					.starts_with("reference")
		}
		_ => false,
	}
}

impl Fold for CallEnricher
{
	fn fold_nodes(&mut self, nodes: Vec<Node>) -> Vec<Node>
	{
		let mut reference = false;
		let mut folded = Vec::with_capacity(nodes.len());
		for node in nodes
		{
			let is_reference = is_reference_pragma(&node);
			let mut node = fold_children(self, node);
			if let NodeKind::CallStatement(call) = &mut node.kind
			{
				let name = call.name.full_name().to_ascii_lowercase();
				if let Some((routine, arguments)) = self.targets.get(&name)
				{
					call.context = Some(CallContext {
						routine: routine.clone(),
						arguments: arguments.clone(),
						active: !reference,
					});
				}
			}
			reference = is_reference;
			folded.push(node);
		}
		folded
	}

	fn fold_expression(&mut self, expression: Expression) -> Expression
	{
		expression
	}

	fn fold_symbol(&mut self, symbol: TypedSymbol) -> TypedSymbol
	{
		symbol
	}

	fn descends_into_procedures(&self) -> bool
	{
		false
	}
}
