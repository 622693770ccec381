//
// Part of weft
// Copyright (c) 2023 Sander in 't Veld
// License: MIT
//

//! Typed symbols and the expressions that embed them.

use crate::scope::ScopeId;
use crate::types::SymbolAttributes;

/// An occurrence of a name, bound to a scope.
///
/// Two typed symbols are equal when they spell the same name (ignoring case),
/// have equal parents and dimensions, and are bound to the same scope.
/// Attributes are not part of the identity, so that a symbol can be found in
/// a substitution map even when its attributes have been updated since.
#[derive(Debug, Clone)]
pub struct TypedSymbol
{
	/// The last component of the name, so `c` for `a%b%c`.
	pub name: String,
	pub attributes: SymbolAttributes,
	pub parent: Option<Box<TypedSymbol>>,
	pub scope: ScopeId,
	/// Subscripts of an array reference.
	pub dimensions: Vec<Expression>,
}

impl TypedSymbol
{
	pub fn new(name: &str, scope: ScopeId) -> TypedSymbol
	{
		TypedSymbol {
			name: name.to_string(),
			attributes: SymbolAttributes::deferred(),
			parent: None,
			scope,
			dimensions: Vec::new(),
		}
	}

	pub fn with_attributes(self, attributes: SymbolAttributes) -> TypedSymbol
	{
		TypedSymbol { attributes, ..self }
	}

	pub fn with_parent(self, parent: TypedSymbol) -> TypedSymbol
	{
		TypedSymbol {
			parent: Some(Box::new(parent)),
			..self
		}
	}

	pub fn with_scope(self, scope: ScopeId) -> TypedSymbol
	{
		TypedSymbol { scope, ..self }
	}

	pub fn with_dimensions(self, dimensions: Vec<Expression>) -> TypedSymbol
	{
		TypedSymbol { dimensions, ..self }
	}

	pub fn full_name(&self) -> String
	{
		match &self.parent
		{
			Some(parent) => format!("{}%{}", parent.full_name(), self.name),
			None => self.name.clone(),
		}
	}

	pub fn basename(&self) -> &str
	{
		&self.name
	}

	/// The outermost symbol of a derived type member chain.
	pub fn root(&self) -> &TypedSymbol
	{
		match &self.parent
		{
			Some(parent) => parent.root(),
			None => self,
		}
	}

	pub fn is_array(&self) -> bool
	{
		!self.dimensions.is_empty() || !self.attributes.shape.is_empty()
	}

	pub fn is_procedure(&self) -> bool
	{
		self.attributes.dtype.is_procedure()
	}

	pub fn shape(&self) -> &[Expression]
	{
		&self.attributes.shape
	}

	pub fn matches_name(&self, name: &str) -> bool
	{
		self.full_name().eq_ignore_ascii_case(name)
	}
}

impl PartialEq for TypedSymbol
{
	fn eq(&self, other: &TypedSymbol) -> bool
	{
		self.name.eq_ignore_ascii_case(&other.name)
			&& self.scope == other.scope
			&& self.parent == other.parent
			&& self.dimensions == other.dimensions
	}
}

impl Eq for TypedSymbol {}

impl std::hash::Hash for TypedSymbol
{
	fn hash<H: std::hash::Hasher>(&self, state: &mut H)
	{
		self.name.to_ascii_lowercase().hash(state);
		self.scope.hash(state);
		self.parent.hash(state);
		self.dimensions.hash(state);
	}
}

impl std::fmt::Display for TypedSymbol
{
	fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result
	{
		write!(f, "{}", self.full_name())?;
		if !self.dimensions.is_empty()
		{
			write!(f, "({})", join(&self.dimensions))?;
		}
		Ok(())
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp
{
	Add,
	Subtract,
	Multiply,
	Divide,
	Power,
	Concat,
	Equals,
	NotEquals,
	Less,
	LessEqual,
	Greater,
	GreaterEqual,
	And,
	Or,
}

impl BinaryOp
{
	pub fn from_str(op: &str) -> Option<BinaryOp>
	{
		let op = match op.trim().to_ascii_lowercase().as_str()
		{
			"+" => BinaryOp::Add,
			"-" => BinaryOp::Subtract,
			"*" => BinaryOp::Multiply,
			"/" => BinaryOp::Divide,
			"**" => BinaryOp::Power,
			"//" => BinaryOp::Concat,
			"==" | ".eq." => BinaryOp::Equals,
			"/=" | ".ne." => BinaryOp::NotEquals,
			"<" | ".lt." => BinaryOp::Less,
			"<=" | ".le." => BinaryOp::LessEqual,
			">" | ".gt." => BinaryOp::Greater,
			">=" | ".ge." => BinaryOp::GreaterEqual,
			".and." => BinaryOp::And,
			".or." => BinaryOp::Or,
			_ => return None,
		};
		Some(op)
	}

	pub fn as_str(&self) -> &'static str
	{
		match self
		{
			BinaryOp::Add => "+",
			BinaryOp::Subtract => "-",
			BinaryOp::Multiply => "*",
			BinaryOp::Divide => "/",
			BinaryOp::Power => "**",
			BinaryOp::Concat => "//",
			BinaryOp::Equals => "==",
			BinaryOp::NotEquals => "/=",
			BinaryOp::Less => "<",
			BinaryOp::LessEqual => "<=",
			BinaryOp::Greater => ">",
			BinaryOp::GreaterEqual => ">=",
			BinaryOp::And => ".and.",
			BinaryOp::Or => ".or.",
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOp
{
	Negative,
	Not,
}

impl UnaryOp
{
	pub fn from_str(op: &str) -> Option<UnaryOp>
	{
		match op.trim().to_ascii_lowercase().as_str()
		{
			"-" => Some(UnaryOp::Negative),
			".not." => Some(UnaryOp::Not),
			_ => None,
		}
	}

	pub fn as_str(&self) -> &'static str
	{
		match self
		{
			UnaryOp::Negative => "-",
			UnaryOp::Not => ".not.",
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Expression
{
	Symbol(TypedSymbol),
	IntLiteral(i64),
	/// Kept as written, including any kind suffix such as `1.0_dp`.
	RealLiteral(String),
	LogicLiteral(bool),
	StringLiteral(String),
	Binary
	{
		op: BinaryOp,
		left: Box<Expression>,
		right: Box<Expression>,
	},
	Unary
	{
		op: UnaryOp,
		operand: Box<Expression>,
	},
	FunctionCall
	{
		function: TypedSymbol,
		arguments: Vec<Expression>,
	},
	Range
	{
		lower: Option<Box<Expression>>,
		upper: Option<Box<Expression>>,
		step: Option<Box<Expression>>,
	},
}

impl Expression
{
	pub fn symbol(&self) -> Option<&TypedSymbol>
	{
		match self
		{
			Expression::Symbol(symbol) => Some(symbol),
			_ => None,
		}
	}

	/// A range with both bounds, as used for loop bounds.
	pub fn range(lower: Expression, upper: Expression) -> Expression
	{
		Expression::Range {
			lower: Some(Box::new(lower)),
			upper: Some(Box::new(upper)),
			step: None,
		}
	}
}

impl From<TypedSymbol> for Expression
{
	fn from(symbol: TypedSymbol) -> Expression
	{
		Expression::Symbol(symbol)
	}
}

impl std::fmt::Display for Expression
{
	fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result
	{
		match self
		{
			Expression::Symbol(symbol) => write!(f, "{}", symbol),
			Expression::IntLiteral(value) => write!(f, "{}", value),
			Expression::RealLiteral(value) => write!(f, "{}", value),
			Expression::LogicLiteral(true) => write!(f, ".true."),
			Expression::LogicLiteral(false) => write!(f, ".false."),
			Expression::StringLiteral(value) =>
			{
				write!(f, "'{}'", value.replace('\'', "''"))
			}
			Expression::Binary { op, left, right } =>
			{
				write_operand(f, left)?;
				write!(f, " {} ", op.as_str())?;
				write_operand(f, right)
			}
			Expression::Unary { op, operand } =>
			{
				match op
				{
					UnaryOp::Negative => write!(f, "-")?,
					UnaryOp::Not => write!(f, ".not. ")?,
				}
				write_operand(f, operand)
			}
			Expression::FunctionCall {
				function,
				arguments,
			} => write!(f, "{}({})", function.full_name(), join(arguments)),
			Expression::Range { lower, upper, step } =>
			{
				if let Some(lower) = lower
				{
					write!(f, "{}", lower)?;
				}
				write!(f, ":")?;
				if let Some(upper) = upper
				{
					write!(f, "{}", upper)?;
				}
				if let Some(step) = step
				{
					write!(f, ":{}", step)?;
				}
				Ok(())
			}
		}
	}
}

fn write_operand(
	f: &mut std::fmt::Formatter,
	operand: &Expression,
) -> std::fmt::Result
{
	match operand
	{
		Expression::Binary { .. } => write!(f, "({})", operand),
		_ => write!(f, "{}", operand),
	}
}

pub fn join(expressions: &[Expression]) -> String
{
	expressions
		.iter()
		.map(|x| x.to_string())
		.collect::<Vec<String>>()
		.join(", ")
}
