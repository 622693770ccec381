//
// Part of weft
// Copyright (c) 2023 Sander in 't Veld
// License: MIT
//

//! The statement vocabulary shared by all dialects. Declarations and imports
//! register their names in the scope of the build context as a side effect;
//! every name occurrence is bound to that scope.

use crate::error::Error;
use crate::expression::{BinaryOp, Expression, TypedSymbol, UnaryOp};
use crate::frontend::{BuildContext, NodeBuilder, ParseNode};
use crate::ir::{Call, Node, NodeKind, Section};
use crate::module::ModuleDefinition;
use crate::scope::ScopeId;
use crate::subroutine::Subroutine;
use crate::types::{DataType, Intent, Modifier, SymbolAttributes, TypeDef};
use crate::visitor::{fold_symbol_children, Fold};

pub struct StatementBuilder;

impl NodeBuilder for StatementBuilder
{
	fn build(
		&self,
		nodes: &[ParseNode],
		context: &mut BuildContext,
	) -> Result<Vec<Node>, Error>
	{
		let mut built = Vec::new();
		for node in nodes
		{
			if let Some(kind) = lower_statement(node, context)?
			{
				built.push(Node::new(kind).with_source(context.source_of(node)));
			}
		}
		Ok(built)
	}
}

fn lower_statement(
	node: &ParseNode,
	context: &mut BuildContext,
) -> Result<Option<NodeKind>, Error>
{
	let kind = match node.tag.as_str()
	{
		"comment" => NodeKind::Comment {
			text: node.attribute_or_text("text").unwrap_or("").to_string(),
		},
		"comment-block" => NodeKind::CommentBlock {
			comments: context.build(&node.children)?,
		},
		"pragma" => NodeKind::Pragma {
			keyword: node.require_attribute("keyword")?.to_string(),
			content: node.attribute("content").unwrap_or("").to_string(),
		},
		"intrinsic" => NodeKind::Intrinsic {
			text: node.require_attribute_or_text("text")?.to_string(),
		},
		"declaration" =>
		{
			let scope = context.require_scope(&node.tag)?;
			let mut variables = Vec::new();
			for (name, attributes) in declared_variables(node, context)?
			{
				context.scopes.declare(scope, &name, attributes.clone());
				variables.push(
					TypedSymbol::new(&name, scope).with_attributes(attributes),
				);
			}
			NodeKind::Declaration { variables }
		}
		"derived-type" =>
		{
			let scope = context.require_scope(&node.tag)?;
			let mut members = Vec::new();
			for declaration in node.find_all("declaration")
			{
				members.extend(declared_variables(declaration, context)?);
			}
			let typedef = TypeDef {
				name: node.require_attribute("name")?.to_string(),
				members,
			};
			context.scopes.declare_type(scope, typedef.clone());
			NodeKind::TypeDef(typedef)
		}
		"import" => lower_import(node, context)?,
		"allocate" =>
		{
			let mut variables = Vec::new();
			let mut data_source = None;
			for child in &node.children
			{
				if child.is("source")
				{
					data_source = Some(first_expression(child, context)?);
				}
				else
				{
					variables.push(lower_expression(child, context)?);
				}
			}
			NodeKind::Allocation {
				variables,
				data_source,
			}
		}
		"deallocate" => NodeKind::Deallocation {
			variables: lower_expressions(&node.children, context)?,
		},
		"call" =>
		{
			let name = node.require_attribute("name")?;
			let mut arguments = Vec::new();
			let mut kwarguments = Vec::new();
			for child in &node.children
			{
				if child.is("keyword")
				{
					let keyword = child.require_attribute("name")?;
					let value = first_expression(child, context)?;
					kwarguments.push((keyword.to_string(), value));
				}
				else
				{
					arguments.push(lower_expression(child, context)?);
				}
			}
			NodeKind::CallStatement(Call {
				name: lower_name(name, Vec::new(), context)?,
				arguments,
				kwarguments,
				context: None,
			})
		}
		"interface" =>
		{
			let mut body = Vec::new();
			for child in &node.children
			{
				if context.frontend.is_procedure(&child.tag)
				{
					let routine = Subroutine::from_tree(child, context)?;
					body.push(
						Node::new(NodeKind::Subroutine(Box::new(routine)))
							.with_source(context.source_of(child)),
					);
				}
				else
				{
					body.extend(context.build(std::slice::from_ref(child))?);
				}
			}
			NodeKind::Interface { body }
		}
		"assignment" => match node.children.as_slice()
		{
			[lhs, rhs] => NodeKind::Assignment {
				lhs: lower_expression(lhs, context)?,
				rhs: lower_expression(rhs, context)?,
			},
			_ =>
			{
				return Err(node.malformed(
					"Expected exactly two expressions.".to_string(),
				))
			}
		},
		"if" =>
		{
			let condition = first_expression(node.require("condition")?, context)?;
			let body = match node.child("then")
			{
				Some(then) => context.build(&then.children)?,
				None => Vec::new(),
			};
			let else_body = match node.child("else")
			{
				Some(otherwise) => context.build(&otherwise.children)?,
				None => Vec::new(),
			};
			NodeKind::Conditional {
				condition,
				body,
				else_body,
			}
		}
		"loop" =>
		{
			let variable = node.require_attribute("variable")?;
			let variable = lower_name(variable, Vec::new(), context)?;
			let bounds = node.require("bounds")?;
			let mut bounds = lower_expressions(&bounds.children, context)?
				.into_iter()
				.map(Box::new);
			let lower = bounds.next();
			let upper = bounds.next();
			let step = bounds.next();
			if lower.is_none() || upper.is_none()
			{
				return Err(node.malformed(
					"Expected a lower and an upper bound.".to_string(),
				));
			}
			let body = match node.child("body")
			{
				Some(body) => context.build(&body.children)?,
				None => Vec::new(),
			};
			NodeKind::Loop {
				variable,
				bounds: Expression::Range { lower, upper, step },
				body,
			}
		}
		"section" => NodeKind::Section(Section::new(context.build(&node.children)?)),
		"empty" => return Ok(None),
		_ =>
		{
			return Err(node.malformed(format!(
				"Unknown statement '{}'.",
				node.tag
			)))
		}
	};
	Ok(Some(kind))
}

/// The names and attributes declared by a declaration node, which are not
/// registered anywhere yet.
fn declared_variables(
	node: &ParseNode,
	context: &mut BuildContext,
) -> Result<Vec<(String, SymbolAttributes)>, Error>
{
	let dtype = DataType::from_name(node.require_attribute("type")?);
	let kind = match node.attribute("kind")
	{
		Some(kind) => Some(Box::new(lower_literal_or_name(kind, context)?)),
		None => None,
	};
	let intent = match node.attribute("intent")
	{
		Some(intent) => Some(Intent::from_name(intent).ok_or_else(|| {
			node.malformed(format!("Unknown intent '{}'.", intent))
		})?),
		None => None,
	};
	let mut modifiers = enumset::EnumSet::new();
	for name in node.attribute("modifiers").unwrap_or("").split_whitespace()
	{
		let modifier = Modifier::from_name(name).ok_or_else(|| {
			node.malformed(format!("Unknown modifier '{}'.", name))
		})?;
		modifiers.insert(modifier);
	}

	let mut declared = Vec::new();
	for variable in node.find_all("variable")
	{
		let name = variable.require_attribute_or_text("name")?;
		let shape = match variable.child("dimensions")
		{
			Some(dimensions) => lower_expressions(&dimensions.children, context)?,
			None => Vec::new(),
		};
		let initial = match variable.child("init")
		{
			Some(init) => Some(Box::new(first_expression(init, context)?)),
			None => None,
		};
		let attributes = SymbolAttributes {
			dtype: dtype.clone(),
			kind: kind.clone(),
			shape,
			intent,
			modifiers,
			initial,
		};
		declared.push((name.to_string(), attributes));
	}
	if declared.is_empty()
	{
		return Err(node.malformed("Expected at least one variable.".to_string()));
	}
	Ok(declared)
}

fn lower_import(
	node: &ParseNode,
	context: &mut BuildContext,
) -> Result<NodeKind, Error>
{
	let scope = context.require_scope(&node.tag)?;
	let module = node.require_attribute("module")?.to_string();
	let c_import = node.flag("c_import");

	let mut names: Vec<String> = node
		.attribute("only")
		.unwrap_or("")
		.split(|x: char| x.is_whitespace() || x == ',')
		.filter(|x| !x.is_empty())
		.map(|x| x.to_string())
		.collect();
	for symbol in node.find_all("symbol")
	{
		names.push(symbol.require_attribute_or_text("name")?.to_string());
	}

	let definitions = context.definitions;
	let definition = definitions
		.iter()
		.find(|x| x.name.eq_ignore_ascii_case(&module));
	if definition.is_none() && !c_import
	{
		log::debug!("no definition available for module '{}'", module);
	}

	if names.is_empty()
	{
		if let Some(definition) = definition
		{
			for typedef in &definition.types
			{
				context
					.scopes
					.declare_type(scope, rebind_typedef(typedef, scope));
			}
			for (name, attributes) in definition.all_symbols()
			{
				let attributes = rebind_attributes(&attributes, scope);
				context.scopes.declare(scope, &name, attributes);
			}
		}
		return Ok(NodeKind::Import {
			module,
			symbols: Vec::new(),
			c_import,
		});
	}

	let mut symbols = Vec::new();
	for name in names
	{
		let attributes = match definition
		{
			Some(definition) => import_symbol(definition, &name, context, scope),
			None => None,
		};
		let attributes = attributes.unwrap_or_else(SymbolAttributes::deferred);
		context.scopes.declare(scope, &name, attributes.clone());
		symbols.push(TypedSymbol::new(&name, scope).with_attributes(attributes));
	}
	Ok(NodeKind::Import {
		module,
		symbols,
		c_import,
	})
}

fn import_symbol(
	definition: &ModuleDefinition,
	name: &str,
	context: &mut BuildContext,
	scope: ScopeId,
) -> Option<SymbolAttributes>
{
	if let Some(typedef) = definition.typedef(name)
	{
		context
			.scopes
			.declare_type(scope, rebind_typedef(typedef, scope));
		return Some(SymbolAttributes::new(DataType::Derived {
			name: typedef.name.to_ascii_lowercase(),
		}));
	}
	let attributes = definition.symbol(name)?;
	// Members of an imported variable of derived type must be resolvable.
	if let DataType::Derived { name: type_name } = &attributes.dtype
	{
		if let Some(typedef) = definition.typedef(type_name)
		{
			context
				.scopes
				.declare_type(scope, rebind_typedef(typedef, scope));
		}
	}
	Some(rebind_attributes(&attributes, scope))
}

/// Binds every symbol inside the expressions of some attributes to a scope.
struct Rebind
{
	scope: ScopeId,
}

impl Fold for Rebind
{
	fn fold_symbol(&mut self, symbol: TypedSymbol) -> TypedSymbol
	{
		let symbol = fold_symbol_children(self, symbol);
		TypedSymbol {
			scope: self.scope,
			..symbol
		}
	}
}

pub fn rebind_attributes(
	attributes: &SymbolAttributes,
	scope: ScopeId,
) -> SymbolAttributes
{
	let mut rebind = Rebind { scope };
	let attributes = attributes.clone();
	SymbolAttributes {
		kind: attributes
			.kind
			.map(|x| Box::new(rebind.fold_expression(*x))),
		shape: attributes
			.shape
			.into_iter()
			.map(|x| rebind.fold_expression(x))
			.collect(),
		initial: attributes
			.initial
			.map(|x| Box::new(rebind.fold_expression(*x))),
		..attributes
	}
}

fn rebind_typedef(typedef: &TypeDef, scope: ScopeId) -> TypeDef
{
	TypeDef {
		name: typedef.name.clone(),
		members: typedef
			.members
			.iter()
			.map(|(name, attributes)| {
				(name.clone(), rebind_attributes(attributes, scope))
			})
			.collect(),
	}
}

fn first_expression(
	node: &ParseNode,
	context: &mut BuildContext,
) -> Result<Expression, Error>
{
	match node.children.first()
	{
		Some(child) => lower_expression(child, context),
		None => Err(node.malformed("Expected an expression.".to_string())),
	}
}

fn lower_expressions(
	nodes: &[ParseNode],
	context: &mut BuildContext,
) -> Result<Vec<Expression>, Error>
{
	nodes.iter().map(|x| lower_expression(x, context)).collect()
}

pub fn lower_expression(
	node: &ParseNode,
	context: &mut BuildContext,
) -> Result<Expression, Error>
{
	let expression = match node.tag.as_str()
	{
		"name" =>
		{
			let name = node.require_attribute_or_text("name")?;
			let dimensions = lower_expressions(&node.children, context)?;
			Expression::Symbol(lower_name(name, dimensions, context)?)
		}
		"int" =>
		{
			let text = node.require_attribute_or_text("value")?;
			let value = text.trim().parse().map_err(|_| {
				node.malformed(format!("Invalid integer '{}'.", text))
			})?;
			Expression::IntLiteral(value)
		}
		"real" =>
		{
			let text = node.require_attribute_or_text("value")?;
			Expression::RealLiteral(text.trim().to_string())
		}
		"logical" =>
		{
			let text = node.require_attribute_or_text("value")?;
			match text.trim().trim_matches('.').to_ascii_lowercase().as_str()
			{
				"true" => Expression::LogicLiteral(true),
				"false" => Expression::LogicLiteral(false),
				_ =>
				{
					return Err(node.malformed(format!(
						"Invalid logical '{}'.",
						text
					)))
				}
			}
		}
		"string" => Expression::StringLiteral(
			node.attribute_or_text("value").unwrap_or("").to_string(),
		),
		"op" =>
		{
			let op = node.require_attribute_or_text("op")?;
			match node.children.as_slice()
			{
				[operand] =>
				{
					let op = UnaryOp::from_str(op).ok_or_else(|| {
						node.malformed(format!("Unknown unary operator '{}'.", op))
					})?;
					Expression::Unary {
						op,
						operand: Box::new(lower_expression(operand, context)?),
					}
				}
				[left, right] =>
				{
					let op = BinaryOp::from_str(op).ok_or_else(|| {
						node.malformed(format!("Unknown operator '{}'.", op))
					})?;
					Expression::Binary {
						op,
						left: Box::new(lower_expression(left, context)?),
						right: Box::new(lower_expression(right, context)?),
					}
				}
				_ =>
				{
					return Err(node.malformed(
						"Expected one or two operands.".to_string(),
					))
				}
			}
		}
		"range" =>
		{
			let mut bound = |tag: &str| -> Result<Option<Box<Expression>>, Error> {
				match node.child(tag)
				{
					Some(x) => Ok(Some(Box::new(first_expression(x, context)?))),
					None => Ok(None),
				}
			};
			let lower = bound("lower")?;
			let upper = bound("upper")?;
			let step = bound("step")?;
			Expression::Range { lower, upper, step }
		}
		"fcall" =>
		{
			let name = node.require_attribute("name")?;
			let function = lower_name(name, Vec::new(), context)?;
			let arguments = lower_expressions(&node.children, context)?;
			Expression::FunctionCall {
				function,
				arguments,
			}
		}
		_ =>
		{
			return Err(node.malformed(format!(
				"Unknown expression '{}'.",
				node.tag
			)))
		}
	};
	Ok(expression)
}

/// A name occurrence such as `a%b%c`, bound to the scope of the context
/// with whatever attributes are visible from there.
pub fn lower_name(
	path: &str,
	dimensions: Vec<Expression>,
	context: &mut BuildContext,
) -> Result<TypedSymbol, Error>
{
	let scope = context.require_scope("name")?;
	let mut symbol: Option<TypedSymbol> = None;
	let mut full_name = String::new();
	for part in path.split('%').map(|x| x.trim())
	{
		if part.is_empty()
		{
			return Err(Error::MalformedTree {
				tag: "name".to_string(),
				expectation: format!("Invalid name '{}'.", path),
				location: None,
			});
		}
		if !full_name.is_empty()
		{
			full_name.push('%');
		}
		full_name.push_str(part);
		let attributes = context
			.scopes
			.lookup(scope, &full_name, true)
			.unwrap_or_else(SymbolAttributes::deferred);
		let next = TypedSymbol::new(part, scope).with_attributes(attributes);
		symbol = Some(match symbol
		{
			Some(parent) => next.with_parent(parent),
			None => next,
		});
	}
	match symbol
	{
		Some(symbol) => Ok(symbol.with_dimensions(dimensions)),
		None => Err(Error::MalformedTree {
			tag: "name".to_string(),
			expectation: "Expected a name.".to_string(),
			location: None,
		}),
	}
}

/// A kind parameter is either a literal such as `8` or a named constant.
fn lower_literal_or_name(
	text: &str,
	context: &mut BuildContext,
) -> Result<Expression, Error>
{
	match text.trim().parse::<i64>()
	{
		Ok(value) => Ok(Expression::IntLiteral(value)),
		Err(_) => Ok(Expression::Symbol(lower_name(text, Vec::new(), context)?)),
	}
}

#[cfg(test)]
mod tests
{
	use super::*;
	use crate::config::Settings;
	use crate::scope::Scopes;

	fn build(dump: &str, scopes: &mut Scopes, scope: ScopeId) -> Vec<Node>
	{
		let settings = Settings::default();
		let tree = ParseNode::read(dump, "test.tree").unwrap();
		let mut context = BuildContext::new(scopes, &settings).in_scope(Some(scope));
		context.build(&tree.children).unwrap()
	}

	#[test]
	fn declarations_register_in_scope()
	{
		let mut scopes = Scopes::new();
		let scope = scopes.create(None);
		let nodes = build(
			r#"(section
				(declaration type="integer" intent="in" (variable name="Count"))
				(declaration type="real" modifiers="allocatable"
					(variable name="x" (dimensions (range) (range)))))"#,
			&mut scopes,
			scope,
		);
		assert_eq!(nodes.len(), 2);
		let count = scopes.lookup(scope, "count", false).unwrap();
		assert_eq!(count.dtype, DataType::Integer);
		assert_eq!(count.intent, Some(Intent::In));
		let x = scopes.lookup(scope, "X", false).unwrap();
		assert!(x.has(Modifier::Allocatable));
		assert_eq!(x.shape.len(), 2);
	}

	#[test]
	fn names_take_attributes_from_enclosing_scopes()
	{
		let mut scopes = Scopes::new();
		let outer = scopes.create(None);
		scopes.declare(outer, "n", SymbolAttributes::new(DataType::Integer));
		let inner = scopes.create(Some(outer));
		let nodes = build(
			r#"(section (assignment (name "m") (name "N")))"#,
			&mut scopes,
			inner,
		);
		match &nodes[0].kind
		{
			NodeKind::Assignment { lhs, rhs } =>
			{
				let lhs = lhs.symbol().unwrap();
				let rhs = rhs.symbol().unwrap();
				assert_eq!(lhs.attributes.dtype, DataType::Deferred);
				assert_eq!(rhs.attributes.dtype, DataType::Integer);
				assert_eq!(rhs.scope, inner);
			}
			_ => panic!("expected an assignment"),
		}
	}

	#[test]
	fn member_names_form_a_chain()
	{
		let mut scopes = Scopes::new();
		let scope = scopes.create(None);
		let nodes = build(
			r#"(section
				(derived-type name="point" (declaration type="real" (variable name="x")))
				(declaration type="type(point)" (variable name="p"))
				(assignment (name "p%x") (real "1.0")))"#,
			&mut scopes,
			scope,
		);
		match &nodes[2].kind
		{
			NodeKind::Assignment { lhs, .. } =>
			{
				let lhs = lhs.symbol().unwrap();
				assert_eq!(lhs.full_name(), "p%x");
				assert_eq!(lhs.attributes.dtype, DataType::Real);
				let parent = lhs.parent.as_ref().unwrap();
				assert_eq!(
					parent.attributes.dtype,
					DataType::Derived {
						name: "point".to_string()
					}
				);
			}
			_ => panic!("expected an assignment"),
		}
	}

	#[test]
	fn kind_and_initial_value_are_kept()
	{
		let mut scopes = Scopes::new();
		let scope = scopes.create(None);
		scopes.declare(scope, "jprb", SymbolAttributes::new(DataType::Integer));
		build(
			r#"(section
				(declaration type="real" kind="jprb" modifiers="parameter"
					(variable name="g" (init (real "9.81"))))
				(declaration type="integer" kind="8" (variable name="n")))"#,
			&mut scopes,
			scope,
		);
		let g = scopes.lookup(scope, "g", false).unwrap();
		let kind = g.kind.as_deref().and_then(|x| x.symbol()).unwrap();
		assert_eq!(kind.name, "jprb");
		assert_eq!(kind.attributes.dtype, DataType::Integer);
		assert_eq!(
			g.initial.as_deref(),
			Some(&Expression::RealLiteral("9.81".to_string()))
		);
		let n = scopes.lookup(scope, "n", false).unwrap();
		assert_eq!(n.kind, Some(Box::new(Expression::IntLiteral(8))));

		let rebound = rebind_attributes(&g, ScopeId::default());
		let kind = rebound.kind.as_deref().and_then(|x| x.symbol()).unwrap();
		assert_eq!(kind.scope, ScopeId::default());
	}

	#[test]
	fn unknown_statement_is_malformed()
	{
		let mut scopes = Scopes::new();
		let scope = scopes.create(None);
		let settings = Settings::default();
		let tree = ParseNode::new("section").with_child(ParseNode::new("goto"));
		let mut context = BuildContext::new(&mut scopes, &settings).in_scope(Some(scope));
		match context.build(&tree.children)
		{
			Err(Error::MalformedTree { tag, .. }) => assert_eq!(tag, "goto"),
			other => panic!("unexpected {:?}", other),
		}
	}
}
