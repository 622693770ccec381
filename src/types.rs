//
// Part of weft
// Copyright (c) 2023 Sander in 't Veld
// License: MIT
//

//! Type and attribute records attached to names in a symbol table.

use crate::expression::Expression;
use crate::scope::{ScopeId, Scopes};

use enumset::{EnumSet, EnumSetType};

use std::collections::HashSet;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DataType
{
	Integer,
	Real,
	Logical,
	Character,
	Complex,
	Derived
	{
		name: String
	},
	Procedure
	{
		name: String, is_function: bool
	},
	/// Not resolved yet, typically because the defining module was not
	/// available when the IR was built.
	Deferred,
}

impl DataType
{
	pub fn from_name(name: &str) -> DataType
	{
		let lowered = name.trim().to_ascii_lowercase();
		match lowered.as_str()
		{
			"integer" => DataType::Integer,
			"real" | "double precision" => DataType::Real,
			"logical" => DataType::Logical,
			"character" => DataType::Character,
			"complex" => DataType::Complex,
			"deferred" | "" => DataType::Deferred,
			_ =>
			{
				let name = lowered
					.strip_prefix("type(")
					.and_then(|x| x.strip_suffix(')'))
					.unwrap_or(&lowered)
					.trim();
				DataType::Derived {
					name: name.to_string(),
				}
			}
		}
	}

	pub fn is_deferred(&self) -> bool
	{
		match self
		{
			DataType::Deferred => true,
			_ => false,
		}
	}

	pub fn is_procedure(&self) -> bool
	{
		match self
		{
			DataType::Procedure { .. } => true,
			_ => false,
		}
	}
}

impl std::fmt::Display for DataType
{
	fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result
	{
		match self
		{
			DataType::Integer => write!(f, "INTEGER"),
			DataType::Real => write!(f, "REAL"),
			DataType::Logical => write!(f, "LOGICAL"),
			DataType::Character => write!(f, "CHARACTER"),
			DataType::Complex => write!(f, "COMPLEX"),
			DataType::Derived { name } => write!(f, "TYPE({})", name),
			DataType::Procedure { .. } => write!(f, "PROCEDURE"),
			DataType::Deferred => write!(f, "DEFERRED"),
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Intent
{
	In,
	Out,
	InOut,
}

impl Intent
{
	pub fn from_name(name: &str) -> Option<Intent>
	{
		match name.trim().to_ascii_lowercase().as_str()
		{
			"in" => Some(Intent::In),
			"out" => Some(Intent::Out),
			"inout" | "in out" => Some(Intent::InOut),
			_ => None,
		}
	}

	pub fn as_str(&self) -> &'static str
	{
		match self
		{
			Intent::In => "in",
			Intent::Out => "out",
			Intent::InOut => "inout",
		}
	}
}

#[derive(Debug, EnumSetType)]
pub enum Modifier
{
	Pointer,
	Allocatable,
	Contiguous,
	Parameter,
	Optional,
	Target,
	Save,
	Value,
	External,
}

impl Modifier
{
	pub fn from_name(name: &str) -> Option<Modifier>
	{
		match name.trim().to_ascii_lowercase().as_str()
		{
			"pointer" => Some(Modifier::Pointer),
			"allocatable" => Some(Modifier::Allocatable),
			"contiguous" => Some(Modifier::Contiguous),
			"parameter" => Some(Modifier::Parameter),
			"optional" => Some(Modifier::Optional),
			"target" => Some(Modifier::Target),
			"save" => Some(Modifier::Save),
			"value" => Some(Modifier::Value),
			"external" => Some(Modifier::External),
			_ => None,
		}
	}

	pub fn as_str(&self) -> &'static str
	{
		match self
		{
			Modifier::Pointer => "pointer",
			Modifier::Allocatable => "allocatable",
			Modifier::Contiguous => "contiguous",
			Modifier::Parameter => "parameter",
			Modifier::Optional => "optional",
			Modifier::Target => "target",
			Modifier::Save => "save",
			Modifier::Value => "value",
			Modifier::External => "external",
		}
	}
}

/// Everything a symbol table knows about a name.
#[derive(Debug, Clone, PartialEq)]
pub struct SymbolAttributes
{
	pub dtype: DataType,
	pub kind: Option<Box<Expression>>,
	/// Dimension expressions, empty for scalars.
	pub shape: Vec<Expression>,
	pub intent: Option<Intent>,
	pub modifiers: EnumSet<Modifier>,
	pub initial: Option<Box<Expression>>,
}

impl SymbolAttributes
{
	pub fn new(dtype: DataType) -> SymbolAttributes
	{
		SymbolAttributes {
			dtype,
			kind: None,
			shape: Vec::new(),
			intent: None,
			modifiers: EnumSet::new(),
			initial: None,
		}
	}

	pub fn deferred() -> SymbolAttributes
	{
		SymbolAttributes::new(DataType::Deferred)
	}

	pub fn procedure(name: &str, is_function: bool) -> SymbolAttributes
	{
		SymbolAttributes::new(DataType::Procedure {
			name: name.to_string(),
			is_function,
		})
	}

	pub fn with_shape(self, shape: Vec<Expression>) -> SymbolAttributes
	{
		SymbolAttributes { shape, ..self }
	}

	pub fn with_intent(self, intent: Intent) -> SymbolAttributes
	{
		SymbolAttributes {
			intent: Some(intent),
			..self
		}
	}

	pub fn with_modifier(mut self, modifier: Modifier) -> SymbolAttributes
	{
		self.modifiers.insert(modifier);
		self
	}

	pub fn has(&self, modifier: Modifier) -> bool
	{
		self.modifiers.contains(modifier)
	}

	/// Structural comparison. Derived types are compared through their
	/// definitions, looked up from `left_scope` and `right_scope`
	/// respectively. Where symbols are attached to a parent, that link is
	/// not part of the comparison.
	pub fn compare(
		&self,
		other: &SymbolAttributes,
		scopes: &Scopes,
		left_scope: ScopeId,
		right_scope: ScopeId,
	) -> bool
	{
		let mut comparison = TypeComparison {
			scopes,
			left_scope,
			right_scope,
			visited: HashSet::new(),
		};
		comparison.attributes(self, other)
	}
}

/// A derived type definition: an ordered list of members.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeDef
{
	pub name: String,
	pub members: Vec<(String, SymbolAttributes)>,
}

impl TypeDef
{
	pub fn member(&self, name: &str) -> Option<&SymbolAttributes>
	{
		self.members
			.iter()
			.find(|(x, _)| x.eq_ignore_ascii_case(name))
			.map(|(_, attributes)| attributes)
	}
}

struct TypeComparison<'a>
{
	scopes: &'a Scopes,
	left_scope: ScopeId,
	right_scope: ScopeId,
	// Pairs of derived type names already under comparison; a revisited
	// pair is assumed equal so that self-referential types terminate.
	visited: HashSet<(String, String)>,
}

impl<'a> TypeComparison<'a>
{
	fn attributes(&mut self, a: &SymbolAttributes, b: &SymbolAttributes)
		-> bool
	{
		a.kind == b.kind
			&& a.shape == b.shape
			&& a.intent == b.intent
			&& a.modifiers == b.modifiers
			&& a.initial == b.initial
			&& self.dtype(&a.dtype, &b.dtype)
	}

	fn dtype(&mut self, a: &DataType, b: &DataType) -> bool
	{
		match (a, b)
		{
			(
				DataType::Derived { name: left },
				DataType::Derived { name: right },
			) =>
			{
				if !left.eq_ignore_ascii_case(right)
				{
					return false;
				}
				let key = (left.to_ascii_lowercase(), right.to_ascii_lowercase());
				if !self.visited.insert(key)
				{
					return true;
				}
				let scopes = self.scopes;
				let left_def = scopes.lookup_type(self.left_scope, left, true);
				let right_def = scopes.lookup_type(self.right_scope, right, true);
				match (left_def, right_def)
				{
					(Some(x), Some(y)) =>
					{
						x.members.len() == y.members.len()
							&& x.members.iter().zip(y.members.iter()).all(
								|((xn, xa), (yn, ya))| {
									xn.eq_ignore_ascii_case(yn)
										&& self.attributes(xa, ya)
								},
							)
					}
					_ => true,
				}
			}
			(
				DataType::Procedure { name: left, .. },
				DataType::Procedure { name: right, .. },
			) => left.eq_ignore_ascii_case(right),
			(a, b) => a == b,
		}
	}
}

#[cfg(test)]
mod tests
{
	use super::*;

	#[test]
	fn data_type_names()
	{
		assert_eq!(DataType::from_name("Integer"), DataType::Integer);
		assert_eq!(DataType::from_name("DOUBLE PRECISION"), DataType::Real);
		assert_eq!(
			DataType::from_name("TYPE(Point)"),
			DataType::Derived {
				name: "point".to_string()
			}
		);
	}

	#[test]
	fn self_referential_types_compare_equal()
	{
		let mut scopes = Scopes::new();
		let scope = scopes.create(None);
		let node = DataType::Derived {
			name: "node".to_string(),
		};
		scopes.declare_type(
			scope,
			TypeDef {
				name: "node".to_string(),
				members: vec![
					(
						"value".to_string(),
						SymbolAttributes::new(DataType::Real),
					),
					(
						"next".to_string(),
						SymbolAttributes::new(node.clone())
							.with_modifier(Modifier::Pointer),
					),
				],
			},
		);
		let a = SymbolAttributes::new(node.clone());
		let b = SymbolAttributes::new(node);
		assert!(a.compare(&b, &scopes, scope, scope));
	}

	#[test]
	fn differing_modifiers_do_not_compare_equal()
	{
		let scopes = Scopes::new();
		let a = SymbolAttributes::new(DataType::Real);
		let b = a.clone().with_modifier(Modifier::Allocatable);
		let id = ScopeId::default();
		assert!(!a.compare(&b, &scopes, id, id));
	}
}
