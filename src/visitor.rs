//
// Part of weft
// Copyright (c) 2023 Sander in 't Veld
// License: MIT
//

//! Generic traversal of the IR. `Visit` walks a tree by reference and is the
//! basis for searching; `Fold` consumes a tree and rebuilds it and is the basis
//! for rewriting. Both know every node variant, so that a search or rewrite
//! only overrides the cases it cares about.

use crate::expression::{Expression, TypedSymbol};
use crate::ir::{Call, Node, NodeId, NodeKind, NodeTag, Section};
use crate::module::Module;
use crate::subroutine::Subroutine;

use enumset::EnumSet;

use std::collections::HashMap;

pub trait Visit<'ir>
{
	fn visit_node(&mut self, node: &'ir Node)
	{
		walk_node(self, node)
	}

	fn visit_expression(&mut self, expression: &'ir Expression)
	{
		walk_expression(self, expression)
	}

	fn visit_symbol(&mut self, symbol: &'ir TypedSymbol)
	{
		walk_symbol(self, symbol)
	}

	/// Whether to walk into nested procedures and modules.
	fn descends_into_procedures(&self) -> bool
	{
		true
	}
}

pub fn walk_nodes<'ir, V: Visit<'ir> + ?Sized>(visitor: &mut V, nodes: &'ir [Node])
{
	for node in nodes
	{
		visitor.visit_node(node);
	}
}

pub fn walk_node<'ir, V: Visit<'ir> + ?Sized>(visitor: &mut V, node: &'ir Node)
{
	match &node.kind
	{
		NodeKind::Comment { .. } => (),
		NodeKind::CommentBlock { comments } => walk_nodes(visitor, comments),
		NodeKind::Pragma { .. } => (),
		NodeKind::Intrinsic { .. } => (),
		NodeKind::Declaration { variables } =>
		{
			for variable in variables
			{
				visitor.visit_symbol(variable);
			}
		}
		NodeKind::TypeDef(_) => (),
		NodeKind::Import { symbols, .. } =>
		{
			for symbol in symbols
			{
				visitor.visit_symbol(symbol);
			}
		}
		NodeKind::Allocation {
			variables,
			data_source,
		} =>
		{
			for variable in variables
			{
				visitor.visit_expression(variable);
			}
			if let Some(source) = data_source
			{
				visitor.visit_expression(source);
			}
		}
		NodeKind::Deallocation { variables } =>
		{
			for variable in variables
			{
				visitor.visit_expression(variable);
			}
		}
		NodeKind::CallStatement(call) =>
		{
			visitor.visit_symbol(&call.name);
			walk_call_arguments(visitor, call);
		}
		NodeKind::Interface { body } => walk_nodes(visitor, body),
		NodeKind::Assignment { lhs, rhs } =>
		{
			visitor.visit_expression(lhs);
			visitor.visit_expression(rhs);
		}
		NodeKind::Conditional {
			condition,
			body,
			else_body,
		} =>
		{
			visitor.visit_expression(condition);
			walk_nodes(visitor, body);
			walk_nodes(visitor, else_body);
		}
		NodeKind::Loop {
			variable,
			bounds,
			body,
		} =>
		{
			visitor.visit_symbol(variable);
			visitor.visit_expression(bounds);
			walk_nodes(visitor, body);
		}
		NodeKind::Section(section) => walk_nodes(visitor, &section.body),
		NodeKind::Subroutine(routine) =>
		{
			if visitor.descends_into_procedures()
			{
				walk_subroutine(visitor, routine);
			}
		}
		NodeKind::Module(module) =>
		{
			if visitor.descends_into_procedures()
			{
				walk_module(visitor, module);
			}
		}
	}
}

pub fn walk_call_arguments<'ir, V: Visit<'ir> + ?Sized>(
	visitor: &mut V,
	call: &'ir Call,
)
{
	for argument in &call.arguments
	{
		visitor.visit_expression(argument);
	}
	for (_, argument) in &call.kwarguments
	{
		visitor.visit_expression(argument);
	}
}

pub fn walk_subroutine<'ir, V: Visit<'ir> + ?Sized>(
	visitor: &mut V,
	routine: &'ir Subroutine,
)
{
	walk_nodes(visitor, &routine.docstring);
	walk_nodes(visitor, &routine.spec.body);
	walk_nodes(visitor, &routine.body.body);
	for member in &routine.members
	{
		walk_subroutine(visitor, member);
	}
}

pub fn walk_module<'ir, V: Visit<'ir> + ?Sized>(
	visitor: &mut V,
	module: &'ir Module,
)
{
	walk_nodes(visitor, &module.docstring);
	walk_nodes(visitor, &module.spec.body);
	for routine in &module.routines
	{
		walk_subroutine(visitor, routine);
	}
}

pub fn walk_expression<'ir, V: Visit<'ir> + ?Sized>(
	visitor: &mut V,
	expression: &'ir Expression,
)
{
	match expression
	{
		Expression::Symbol(symbol) => visitor.visit_symbol(symbol),
		Expression::IntLiteral(_) => (),
		Expression::RealLiteral(_) => (),
		Expression::LogicLiteral(_) => (),
		Expression::StringLiteral(_) => (),
		Expression::Binary { left, right, .. } =>
		{
			visitor.visit_expression(left);
			visitor.visit_expression(right);
		}
		Expression::Unary { operand, .. } => visitor.visit_expression(operand),
		Expression::FunctionCall {
			function,
			arguments,
		} =>
		{
			visitor.visit_symbol(function);
			for argument in arguments
			{
				visitor.visit_expression(argument);
			}
		}
		Expression::Range { lower, upper, step } =>
		{
			for bound in [lower, upper, step].into_iter().flatten()
			{
				visitor.visit_expression(bound);
			}
		}
	}
}

/// The parent of a member is visited before its subscripts.
pub fn walk_symbol<'ir, V: Visit<'ir> + ?Sized>(
	visitor: &mut V,
	symbol: &'ir TypedSymbol,
)
{
	if let Some(parent) = &symbol.parent
	{
		visitor.visit_symbol(parent);
	}
	for dimension in &symbol.dimensions
	{
		visitor.visit_expression(dimension);
	}
}

enum Matcher<'p>
{
	Tags(EnumSet<NodeTag>),
	Predicate(Box<dyn Fn(&Node) -> bool + 'p>),
}

impl<'p> Matcher<'p>
{
	fn matches(&self, node: &Node) -> bool
	{
		match self
		{
			Matcher::Tags(tags) => tags.contains(node.tag()),
			Matcher::Predicate(predicate) => predicate(node),
		}
	}
}

/// Collects the nodes of a tree that match a set of variants or a predicate,
/// in traversal order.
pub struct FindNodes<'ir, 'p>
{
	matcher: Matcher<'p>,
	greedy: bool,
	shallow: bool,
	found: Vec<&'ir Node>,
}

impl<'ir, 'p> FindNodes<'ir, 'p>
{
	pub fn new(tags: impl Into<EnumSet<NodeTag>>) -> Self
	{
		FindNodes {
			matcher: Matcher::Tags(tags.into()),
			greedy: false,
			shallow: false,
			found: Vec::new(),
		}
	}

	pub fn matching(predicate: impl Fn(&Node) -> bool + 'p) -> Self
	{
		FindNodes {
			matcher: Matcher::Predicate(Box::new(predicate)),
			greedy: false,
			shallow: false,
			found: Vec::new(),
		}
	}

	/// Do not look inside nodes that already matched.
	pub fn greedy(self) -> Self
	{
		FindNodes {
			greedy: true,
			..self
		}
	}

	/// Do not look inside nested procedures and modules.
	pub fn shallow(self) -> Self
	{
		FindNodes {
			shallow: true,
			..self
		}
	}

	pub fn visit(mut self, nodes: &'ir [Node]) -> Vec<&'ir Node>
	{
		walk_nodes(&mut self, nodes);
		self.found
	}

	pub fn visit_routine(mut self, routine: &'ir Subroutine) -> Vec<&'ir Node>
	{
		walk_subroutine(&mut self, routine);
		self.found
	}
}

impl<'ir, 'p> Visit<'ir> for FindNodes<'ir, 'p>
{
	fn visit_node(&mut self, node: &'ir Node)
	{
		if self.matcher.matches(node)
		{
			self.found.push(node);
			if self.greedy
			{
				return;
			}
		}
		walk_node(self, node)
	}

	fn descends_into_procedures(&self) -> bool
	{
		!self.shallow
	}
}

/// Collects every typed symbol occurrence, including procedure names, member
/// parents and symbols inside subscripts, repeats included.
#[derive(Default)]
pub struct FindTypedSymbols<'ir>
{
	shallow: bool,
	found: Vec<&'ir TypedSymbol>,
}

impl<'ir> FindTypedSymbols<'ir>
{
	pub fn new() -> Self
	{
		Self::default()
	}

	pub fn shallow(self) -> Self
	{
		FindTypedSymbols {
			shallow: true,
			..self
		}
	}

	pub fn visit(mut self, nodes: &'ir [Node]) -> Vec<&'ir TypedSymbol>
	{
		walk_nodes(&mut self, nodes);
		self.found
	}

	pub fn in_expression(
		mut self,
		expression: &'ir Expression,
	) -> Vec<&'ir TypedSymbol>
	{
		walk_expression(&mut self, expression);
		self.found
	}

	pub fn visit_routine(
		mut self,
		routine: &'ir Subroutine,
	) -> Vec<&'ir TypedSymbol>
	{
		walk_subroutine(&mut self, routine);
		self.found
	}
}

impl<'ir> Visit<'ir> for FindTypedSymbols<'ir>
{
	fn visit_symbol(&mut self, symbol: &'ir TypedSymbol)
	{
		self.found.push(symbol);
		walk_symbol(self, symbol)
	}

	fn descends_into_procedures(&self) -> bool
	{
		!self.shallow
	}
}

/// Like `FindTypedSymbols`, but skips the names of called procedures.
#[derive(Default)]
pub struct FindVariables<'ir>
{
	shallow: bool,
	found: Vec<&'ir TypedSymbol>,
}

impl<'ir> FindVariables<'ir>
{
	pub fn new() -> Self
	{
		Self::default()
	}

	pub fn shallow(self) -> Self
	{
		FindVariables {
			shallow: true,
			..self
		}
	}

	pub fn visit(mut self, nodes: &'ir [Node]) -> Vec<&'ir TypedSymbol>
	{
		walk_nodes(&mut self, nodes);
		self.found
	}

	pub fn visit_routine(
		mut self,
		routine: &'ir Subroutine,
	) -> Vec<&'ir TypedSymbol>
	{
		walk_subroutine(&mut self, routine);
		self.found
	}
}

impl<'ir> Visit<'ir> for FindVariables<'ir>
{
	fn visit_node(&mut self, node: &'ir Node)
	{
		match &node.kind
		{
			NodeKind::CallStatement(call) => walk_call_arguments(self, call),
			_ => walk_node(self, node),
		}
	}

	fn visit_expression(&mut self, expression: &'ir Expression)
	{
		match expression
		{
			Expression::FunctionCall { arguments, .. } =>
			{
				for argument in arguments
				{
					self.visit_expression(argument);
				}
			}
			_ => walk_expression(self, expression),
		}
	}

	fn visit_symbol(&mut self, symbol: &'ir TypedSymbol)
	{
		if !symbol.is_procedure()
		{
			self.found.push(symbol);
		}
		walk_symbol(self, symbol)
	}

	fn descends_into_procedures(&self) -> bool
	{
		!self.shallow
	}
}

pub trait Fold
{
	fn fold_nodes(&mut self, nodes: Vec<Node>) -> Vec<Node>
	{
		nodes
			.into_iter()
			.flat_map(|node| self.fold_node(node))
			.collect()
	}

	/// Returns the nodes that take the place of the given node, which allows
	/// a fold to remove a node or to splice in several.
	fn fold_node(&mut self, node: Node) -> Vec<Node>
	{
		vec![fold_children(self, node)]
	}

	fn fold_expression(&mut self, expression: Expression) -> Expression
	{
		fold_expression_children(self, expression)
	}

	fn fold_symbol(&mut self, symbol: TypedSymbol) -> TypedSymbol
	{
		fold_symbol_children(self, symbol)
	}

	fn descends_into_procedures(&self) -> bool
	{
		true
	}
}

pub fn fold_children<F: Fold + ?Sized>(folder: &mut F, node: Node) -> Node
{
	let Node { id, kind, source } = node;
	let kind = match kind
	{
		NodeKind::CommentBlock { comments } => NodeKind::CommentBlock {
			comments: folder.fold_nodes(comments),
		},
		NodeKind::Declaration { variables } => NodeKind::Declaration {
			variables: variables
				.into_iter()
				.map(|x| folder.fold_symbol(x))
				.collect(),
		},
		NodeKind::Import {
			module,
			symbols,
			c_import,
		} => NodeKind::Import {
			module,
			symbols: symbols.into_iter().map(|x| folder.fold_symbol(x)).collect(),
			c_import,
		},
		NodeKind::Allocation {
			variables,
			data_source,
		} => NodeKind::Allocation {
			variables: variables
				.into_iter()
				.map(|x| folder.fold_expression(x))
				.collect(),
			data_source: data_source.map(|x| folder.fold_expression(x)),
		},
		NodeKind::Deallocation { variables } => NodeKind::Deallocation {
			variables: variables
				.into_iter()
				.map(|x| folder.fold_expression(x))
				.collect(),
		},
		NodeKind::CallStatement(call) =>
		{
			NodeKind::CallStatement(Call {
				name: folder.fold_symbol(call.name),
				arguments: call
					.arguments
					.into_iter()
					.map(|x| folder.fold_expression(x))
					.collect(),
				kwarguments: call
					.kwarguments
					.into_iter()
					.map(|(keyword, x)| (keyword, folder.fold_expression(x)))
					.collect(),
				context: call.context,
			})
		}
		NodeKind::Interface { body } => NodeKind::Interface {
			body: folder.fold_nodes(body),
		},
		NodeKind::Assignment { lhs, rhs } => NodeKind::Assignment {
			lhs: folder.fold_expression(lhs),
			rhs: folder.fold_expression(rhs),
		},
		NodeKind::Conditional {
			condition,
			body,
			else_body,
		} => NodeKind::Conditional {
			condition: folder.fold_expression(condition),
			body: folder.fold_nodes(body),
			else_body: folder.fold_nodes(else_body),
		},
		NodeKind::Loop {
			variable,
			bounds,
			body,
		} => NodeKind::Loop {
			variable: folder.fold_symbol(variable),
			bounds: folder.fold_expression(bounds),
			body: folder.fold_nodes(body),
		},
		NodeKind::Section(section) => NodeKind::Section(Section {
			body: folder.fold_nodes(section.body),
		}),
		NodeKind::Subroutine(routine) if folder.descends_into_procedures() =>
		{
			NodeKind::Subroutine(Box::new(fold_subroutine(folder, *routine)))
		}
		NodeKind::Module(module) if folder.descends_into_procedures() =>
		{
			NodeKind::Module(Box::new(fold_module(folder, *module)))
		}
		kind => kind,
	};
	Node { id, kind, source }
}

pub fn fold_subroutine<F: Fold + ?Sized>(
	folder: &mut F,
	mut routine: Subroutine,
) -> Subroutine
{
	let docstring = std::mem::take(&mut routine.docstring);
	routine.docstring = folder.fold_nodes(docstring);
	let spec = std::mem::take(&mut routine.spec);
	routine.spec = Section::new(folder.fold_nodes(spec.body));
	let body = std::mem::take(&mut routine.body);
	routine.body = Section::new(folder.fold_nodes(body.body));
	let members = std::mem::take(&mut routine.members);
	routine.members = members
		.into_iter()
		.map(|member| fold_subroutine(folder, member))
		.collect();
	routine
}

pub fn fold_module<F: Fold + ?Sized>(folder: &mut F, module: Module) -> Module
{
	let Module {
		name,
		docstring,
		spec,
		routines,
		scope,
		source,
	} = module;
	Module {
		name,
		docstring: folder.fold_nodes(docstring),
		spec: Section::new(folder.fold_nodes(spec.body)),
		routines: routines
			.into_iter()
			.map(|routine| fold_subroutine(folder, routine))
			.collect(),
		scope,
		source,
	}
}

pub fn fold_expression_children<F: Fold + ?Sized>(
	folder: &mut F,
	expression: Expression,
) -> Expression
{
	match expression
	{
		Expression::Symbol(symbol) => Expression::Symbol(folder.fold_symbol(symbol)),
		Expression::Binary { op, left, right } => Expression::Binary {
			op,
			left: Box::new(folder.fold_expression(*left)),
			right: Box::new(folder.fold_expression(*right)),
		},
		Expression::Unary { op, operand } => Expression::Unary {
			op,
			operand: Box::new(folder.fold_expression(*operand)),
		},
		Expression::FunctionCall {
			function,
			arguments,
		} => Expression::FunctionCall {
			function: folder.fold_symbol(function),
			arguments: arguments
				.into_iter()
				.map(|x| folder.fold_expression(x))
				.collect(),
		},
		Expression::Range { lower, upper, step } => Expression::Range {
			lower: lower.map(|x| Box::new(folder.fold_expression(*x))),
			upper: upper.map(|x| Box::new(folder.fold_expression(*x))),
			step: step.map(|x| Box::new(folder.fold_expression(*x))),
		},
		literal => literal,
	}
}

pub fn fold_symbol_children<F: Fold + ?Sized>(
	folder: &mut F,
	symbol: TypedSymbol,
) -> TypedSymbol
{
	let TypedSymbol {
		name,
		attributes,
		parent,
		scope,
		dimensions,
	} = symbol;
	TypedSymbol {
		name,
		attributes,
		parent: parent.map(|x| Box::new(folder.fold_symbol(*x))),
		scope,
		dimensions: dimensions
			.into_iter()
			.map(|x| folder.fold_expression(x))
			.collect(),
	}
}

/// What a node is replaced with by a `Transformer`.
#[derive(Debug, Clone)]
pub enum Replacement
{
	Node(Node),
	Nodes(Vec<Node>),
	Remove,
}

impl From<Node> for Replacement
{
	fn from(node: Node) -> Replacement
	{
		Replacement::Node(node)
	}
}

impl From<Vec<Node>> for Replacement
{
	fn from(nodes: Vec<Node>) -> Replacement
	{
		Replacement::Nodes(nodes)
	}
}

/// Replaces, splices or removes nodes by id. Replacement nodes are inserted
/// as given and are not themselves transformed.
pub struct Transformer
{
	mapping: HashMap<NodeId, Replacement>,
	invalidate_source: bool,
	shallow: bool,
	replaced: usize,
}

impl Transformer
{
	pub fn new(mapping: HashMap<NodeId, Replacement>) -> Transformer
	{
		Transformer {
			mapping,
			invalidate_source: false,
			shallow: false,
			replaced: 0,
		}
	}

	/// Containers whose children were changed lose their provenance.
	pub fn invalidate_source(self) -> Transformer
	{
		Transformer {
			invalidate_source: true,
			..self
		}
	}

	pub fn shallow(self) -> Transformer
	{
		Transformer {
			shallow: true,
			..self
		}
	}

	pub fn visit(mut self, nodes: Vec<Node>) -> Vec<Node>
	{
		if self.mapping.is_empty()
		{
			return nodes;
		}
		self.fold_nodes(nodes)
	}

	pub fn visit_section(self, section: Section) -> Section
	{
		Section::new(self.visit(section.body))
	}
}

impl Fold for Transformer
{
	fn fold_node(&mut self, node: Node) -> Vec<Node>
	{
		if let Some(replacement) = self.mapping.get(&node.id)
		{
			self.replaced += 1;
			return match replacement
			{
				Replacement::Node(x) => vec![x.clone()],
				Replacement::Nodes(x) => x.clone(),
				Replacement::Remove => Vec::new(),
			};
		}
		let before = self.replaced;
		let mut node = fold_children(self, node);
		if self.invalidate_source && self.replaced > before
		{
			node.source = None;
		}
		vec![node]
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
		!self.shallow
	}
}

/// Replaces expressions anywhere inside statements. A key found inside a
/// replacement is not replaced again. Where the grammar demands a symbol,
/// such as a declared variable or a loop variable, only replacements that are
/// themselves symbols are applied.
pub struct SubstituteExpressions
{
	mapping: HashMap<Expression, Expression>,
	invalidate_source: bool,
	shallow: bool,
	changed: usize,
}

impl SubstituteExpressions
{
	pub fn new(mapping: HashMap<Expression, Expression>) -> Self
	{
		SubstituteExpressions {
			mapping,
			invalidate_source: true,
			shallow: false,
			changed: 0,
		}
	}

	/// By default, statements in which a substitution took place lose their
	/// provenance because they no longer match the original text.
	pub fn invalidate_source(self, invalidate_source: bool) -> Self
	{
		SubstituteExpressions {
			invalidate_source,
			..self
		}
	}

	pub fn shallow(self) -> Self
	{
		SubstituteExpressions {
			shallow: true,
			..self
		}
	}

	pub fn visit(mut self, nodes: Vec<Node>) -> Vec<Node>
	{
		if self.mapping.is_empty()
		{
			return nodes;
		}
		self.fold_nodes(nodes)
	}

	pub fn visit_section(self, section: Section) -> Section
	{
		Section::new(self.visit(section.body))
	}

	pub fn apply_to_expression(mut self, expression: Expression) -> Expression
	{
		if self.mapping.is_empty()
		{
			return expression;
		}
		self.fold_expression(expression)
	}
}

impl Fold for SubstituteExpressions
{
	fn fold_node(&mut self, node: Node) -> Vec<Node>
	{
		let before = self.changed;
		let mut node = fold_children(self, node);
		if self.invalidate_source && self.changed > before
		{
			node.source = None;
		}
		vec![node]
	}

	fn fold_expression(&mut self, expression: Expression) -> Expression
	{
		if let Some(replacement) = self.mapping.get(&expression)
		{
			self.changed += 1;
			return replacement.clone();
		}
		fold_expression_children(self, expression)
	}

	fn fold_symbol(&mut self, symbol: TypedSymbol) -> TypedSymbol
	{
		let key = Expression::Symbol(symbol.clone());
		if let Some(Expression::Symbol(replacement)) = self.mapping.get(&key)
		{
			self.changed += 1;
			return replacement.clone();
		}
		fold_symbol_children(self, symbol)
	}

	fn descends_into_procedures(&self) -> bool
	{
		!self.shallow
	}
}

/// Gives every node a fresh id, so that the result can be rewritten without
/// affecting the tree it was copied from.
pub struct Renumber;

impl Fold for Renumber
{
	fn fold_node(&mut self, node: Node) -> Vec<Node>
	{
		let node = Node {
			id: NodeId::fresh(),
			..node
		};
		vec![fold_children(self, node)]
	}

	fn fold_expression(&mut self, expression: Expression) -> Expression
	{
		expression
	}

	fn fold_symbol(&mut self, symbol: TypedSymbol) -> TypedSymbol
	{
		symbol
	}
}
