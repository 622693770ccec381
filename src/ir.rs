//
// Part of weft
// Copyright (c) 2023 Sander in 't Veld
// License: MIT
//

//! The IR node model. A node is a closed set of variants; ordered sequences
//! of nodes make up sections, bodies and branches.

use crate::expression::{Expression, TypedSymbol};
use crate::module::Module;
use crate::source::Source;
use crate::subroutine::Subroutine;
use crate::types::TypeDef;

use enumset::EnumSetType;

use std::sync::atomic::{AtomicU32, Ordering};

static NEXT_NODE_ID: AtomicU32 = AtomicU32::new(1);

/// Identifies a node for the purpose of tree rewriting. Every node created
/// by `Node::new` gets a fresh id; cloning a node keeps its id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

impl NodeId
{
	pub fn fresh() -> NodeId
	{
		NodeId(NEXT_NODE_ID.fetch_add(1, Ordering::Relaxed))
	}
}

#[derive(Debug, Clone)]
pub struct Node
{
	pub id: NodeId,
	pub kind: NodeKind,
	pub source: Option<Source>,
}

impl Node
{
	pub fn new(kind: NodeKind) -> Node
	{
		Node {
			id: NodeId::fresh(),
			kind,
			source: None,
		}
	}

	pub fn with_source(self, source: Option<Source>) -> Node
	{
		Node { source, ..self }
	}

	pub fn comment(text: &str) -> Node
	{
		Node::new(NodeKind::Comment {
			text: text.to_string(),
		})
	}

	pub fn intrinsic(text: &str) -> Node
	{
		Node::new(NodeKind::Intrinsic {
			text: text.to_string(),
		})
	}

	pub fn tag(&self) -> NodeTag
	{
		match &self.kind
		{
			NodeKind::Comment { .. } => NodeTag::Comment,
			NodeKind::CommentBlock { .. } => NodeTag::CommentBlock,
			NodeKind::Pragma { .. } => NodeTag::Pragma,
			NodeKind::Intrinsic { .. } => NodeTag::Intrinsic,
			NodeKind::Declaration { .. } => NodeTag::Declaration,
			NodeKind::TypeDef(_) => NodeTag::TypeDef,
			NodeKind::Import { .. } => NodeTag::Import,
			NodeKind::Allocation { .. } => NodeTag::Allocation,
			NodeKind::Deallocation { .. } => NodeTag::Deallocation,
			NodeKind::CallStatement(_) => NodeTag::CallStatement,
			NodeKind::Interface { .. } => NodeTag::Interface,
			NodeKind::Assignment { .. } => NodeTag::Assignment,
			NodeKind::Conditional { .. } => NodeTag::Conditional,
			NodeKind::Loop { .. } => NodeTag::Loop,
			NodeKind::Section(_) => NodeTag::Section,
			NodeKind::Subroutine(_) => NodeTag::Subroutine,
			NodeKind::Module(_) => NodeTag::Module,
		}
	}

	/// Whether this node only carries commentary, as a docstring would.
	pub fn is_comment(&self) -> bool
	{
		match &self.kind
		{
			NodeKind::Comment { .. } => true,
			NodeKind::CommentBlock { .. } => true,
			_ => false,
		}
	}
}

/// Nodes compare by content and provenance, never by id.
impl PartialEq for Node
{
	fn eq(&self, other: &Node) -> bool
	{
		self.kind == other.kind && self.source == other.source
	}
}

#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind
{
	Comment
	{
		text: String
	},
	CommentBlock
	{
		comments: Vec<Node>
	},
	Pragma
	{
		keyword: String, content: String
	},
	/// A statement kept verbatim, such as `IMPLICIT NONE` or `RETURN`.
	Intrinsic
	{
		text: String
	},
	Declaration
	{
		variables: Vec<TypedSymbol>
	},
	TypeDef(TypeDef),
	Import
	{
		module: String,
		symbols: Vec<TypedSymbol>,
		c_import: bool,
	},
	Allocation
	{
		variables: Vec<Expression>,
		data_source: Option<Expression>,
	},
	Deallocation
	{
		variables: Vec<Expression>
	},
	CallStatement(Call),
	Interface
	{
		body: Vec<Node>
	},
	Assignment
	{
		lhs: Expression, rhs: Expression
	},
	Conditional
	{
		condition: Expression,
		body: Vec<Node>,
		else_body: Vec<Node>,
	},
	Loop
	{
		variable: TypedSymbol,
		bounds: Expression,
		body: Vec<Node>,
	},
	Section(Section),
	Subroutine(Box<Subroutine>),
	Module(Box<Module>),
}

#[derive(Debug, EnumSetType)]
pub enum NodeTag
{
	Comment,
	CommentBlock,
	Pragma,
	Intrinsic,
	Declaration,
	TypeDef,
	Import,
	Allocation,
	Deallocation,
	CallStatement,
	Interface,
	Assignment,
	Conditional,
	Loop,
	Section,
	Subroutine,
	Module,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Call
{
	pub name: TypedSymbol,
	pub arguments: Vec<Expression>,
	pub kwarguments: Vec<(String, Expression)>,
	pub context: Option<CallContext>,
}

/// What is known about the routine a call statement targets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallContext
{
	pub routine: String,
	/// Dummy argument names of the target routine, in signature order.
	pub arguments: Vec<String>,
	pub active: bool,
}

impl Call
{
	/// Pairs each dummy argument name with the actual argument passed to it:
	/// positional arguments first, then keyword arguments. Empty when no call
	/// context is attached.
	pub fn arg_map(&self) -> Vec<(String, &Expression)>
	{
		let context = match &self.context
		{
			Some(context) => context,
			None => return Vec::new(),
		};
		let mut pairs: Vec<(String, &Expression)> = context
			.arguments
			.iter()
			.zip(self.arguments.iter())
			.map(|(name, argument)| (name.clone(), argument))
			.collect();
		for (keyword, argument) in &self.kwarguments
		{
			let name = context
				.arguments
				.iter()
				.find(|x| x.eq_ignore_ascii_case(keyword))
				.cloned()
				.unwrap_or_else(|| keyword.to_ascii_lowercase());
			pairs.push((name, argument));
		}
		pairs
	}
}

/// An ordered sequence of nodes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Section
{
	pub body: Vec<Node>,
}

impl Section
{
	pub fn new(body: Vec<Node>) -> Section
	{
		Section { body }
	}

	pub fn append(&mut self, nodes: Vec<Node>)
	{
		self.body.extend(nodes);
	}

	pub fn prepend(&mut self, nodes: Vec<Node>)
	{
		self.body.splice(0..0, nodes);
	}

	pub fn insert(&mut self, position: usize, nodes: Vec<Node>)
	{
		let position = position.min(self.body.len());
		self.body.splice(position..position, nodes);
	}

	pub fn len(&self) -> usize
	{
		self.body.len()
	}

	pub fn is_empty(&self) -> bool
	{
		self.body.is_empty()
	}

	pub fn iter(&self) -> std::slice::Iter<Node>
	{
		self.body.iter()
	}
}

impl From<Vec<Node>> for Section
{
	fn from(body: Vec<Node>) -> Section
	{
		Section { body }
	}
}
