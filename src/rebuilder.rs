//
// Part of weft
// Copyright (c) 2023 Sander in 't Veld
// License: MIT
//

//! Renders IR as Fortran source text.

use crate::error::Error;
use crate::expression::{join, Expression, TypedSymbol};
use crate::ir::{Call, Node, NodeKind};
use crate::module::Module;
use crate::subroutine::Subroutine;
use crate::types::{DataType, TypeDef};

use std::fmt::Write;

/// Produces output text from IR.
pub trait CodeGenerator
{
	fn generate(&self, nodes: &[Node]) -> Result<String, Error>;
}

/// The code generator that writes Fortran back out.
pub struct Rebuilder
{
	pub indentation: &'static str,
}

impl Default for Rebuilder
{
	fn default() -> Rebuilder
	{
		Rebuilder { indentation: "  " }
	}
}

impl CodeGenerator for Rebuilder
{
	fn generate(&self, nodes: &[Node]) -> Result<String, Error>
	{
		let indentation = Indentation {
			value: self.indentation,
			amount: 0,
		};
		rebuild_nodes(nodes, &indentation)
	}
}

pub fn rebuild_nodes(
	nodes: &[Node],
	indentation: &Indentation,
) -> Result<String, Error>
{
	let mut buffer = String::new();
	for node in nodes
	{
		buffer.push_str(&node.rebuild(indentation)?);
	}
	Ok(buffer)
}

pub struct Indentation
{
	pub value: &'static str,
	pub amount: usize,
}

impl Indentation
{
	fn increased(&self) -> Indentation
	{
		Indentation {
			value: self.value,
			amount: self.amount + 1,
		}
	}
}

impl std::fmt::Display for Indentation
{
	fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result
	{
		write!(f, "{}", self.value.repeat(self.amount))
	}
}

pub trait Rebuildable
{
	/// Every line of the result ends with a newline.
	fn rebuild(&self, indentation: &Indentation) -> Result<String, Error>;
}

impl Rebuildable for Node
{
	fn rebuild(&self, indentation: &Indentation) -> Result<String, Error>
	{
		let mut buffer = String::new();
		match &self.kind
		{
			NodeKind::Comment { text } =>
			{
				writeln!(&mut buffer, "{}{}", indentation, text)?;
			}
			NodeKind::CommentBlock { comments } =>
			{
				buffer.push_str(&rebuild_nodes(comments, indentation)?);
			}
			NodeKind::Pragma { keyword, content } =>
			{
				writeln!(&mut buffer, "{}!${} {}", indentation, keyword, content)?;
			}
			NodeKind::Intrinsic { text } =>
			{
				writeln!(&mut buffer, "{}{}", indentation, text)?;
			}
			NodeKind::Declaration { variables } =>
			{
				writeln!(
					&mut buffer,
					"{}{}",
					indentation,
					rebuild_declaration(variables)?
				)?;
			}
			NodeKind::TypeDef(typedef) =>
			{
				buffer.push_str(&typedef.rebuild(indentation)?);
			}
			NodeKind::Import {
				module,
				symbols,
				c_import,
			} =>
			{
				if *c_import
				{
					writeln!(&mut buffer, "#include \"{}\"", module)?;
				}
				else if symbols.is_empty()
				{
					writeln!(&mut buffer, "{}USE {}", indentation, module)?;
				}
				else
				{
					let names: Vec<String> =
						symbols.iter().map(|x| x.full_name()).collect();
					writeln!(
						&mut buffer,
						"{}USE {}, ONLY: {}",
						indentation,
						module,
						names.join(", ")
					)?;
				}
			}
			NodeKind::Allocation {
				variables,
				data_source,
			} =>
			{
				write!(&mut buffer, "{}ALLOCATE({}", indentation, join(variables))?;
				if let Some(data_source) = data_source
				{
					write!(&mut buffer, ", SOURCE={}", data_source)?;
				}
				writeln!(&mut buffer, ")")?;
			}
			NodeKind::Deallocation { variables } =>
			{
				writeln!(
					&mut buffer,
					"{}DEALLOCATE({})",
					indentation,
					join(variables)
				)?;
			}
			NodeKind::CallStatement(call) =>
			{
				writeln!(&mut buffer, "{}{}", indentation, rebuild_call(call))?;
			}
			NodeKind::Interface { body } =>
			{
				writeln!(&mut buffer, "{}INTERFACE", indentation)?;
				buffer.push_str(&rebuild_nodes(body, &indentation.increased())?);
				writeln!(&mut buffer, "{}END INTERFACE", indentation)?;
			}
			NodeKind::Assignment { lhs, rhs } =>
			{
				writeln!(&mut buffer, "{}{} = {}", indentation, lhs, rhs)?;
			}
			NodeKind::Conditional {
				condition,
				body,
				else_body,
			} =>
			{
				writeln!(&mut buffer, "{}IF ({}) THEN", indentation, condition)?;
				buffer.push_str(&rebuild_nodes(body, &indentation.increased())?);
				if !else_body.is_empty()
				{
					writeln!(&mut buffer, "{}ELSE", indentation)?;
					buffer.push_str(&rebuild_nodes(
						else_body,
						&indentation.increased(),
					)?);
				}
				writeln!(&mut buffer, "{}END IF", indentation)?;
			}
			NodeKind::Loop {
				variable,
				bounds,
				body,
			} =>
			{
				writeln!(
					&mut buffer,
					"{}DO {} = {}",
					indentation,
					variable,
					rebuild_bounds(bounds)
				)?;
				buffer.push_str(&rebuild_nodes(body, &indentation.increased())?);
				writeln!(&mut buffer, "{}END DO", indentation)?;
			}
			NodeKind::Section(section) =>
			{
				buffer.push_str(&rebuild_nodes(&section.body, indentation)?);
			}
			NodeKind::Subroutine(routine) =>
			{
				buffer.push_str(&routine.rebuild(indentation)?);
			}
			NodeKind::Module(module) =>
			{
				buffer.push_str(&module.rebuild(indentation)?);
			}
		}
		Ok(buffer)
	}
}

impl Rebuildable for Subroutine
{
	fn rebuild(&self, indentation: &Indentation) -> Result<String, Error>
	{
		let keyword = if self.is_function
		{
			"FUNCTION"
		}
		else
		{
			"SUBROUTINE"
		};
		let mut buffer = String::new();
		write!(
			&mut buffer,
			"{}{} {}({})",
			indentation,
			keyword,
			self.name,
			self.dummies.join(", ")
		)?;
		match self.bind.as_deref()
		{
			Some(bind) if bind.eq_ignore_ascii_case("c") =>
			{
				write!(&mut buffer, " BIND(C)")?
			}
			Some(bind) => write!(&mut buffer, " BIND(C, name='{}')", bind)?,
			None => (),
		}
		writeln!(&mut buffer)?;

		let inner = indentation.increased();
		buffer.push_str(&rebuild_nodes(&self.docstring, &inner)?);
		buffer.push_str(&rebuild_nodes(&self.spec.body, &inner)?);
		buffer.push_str(&rebuild_nodes(&self.body.body, &inner)?);
		if !self.members.is_empty()
		{
			writeln!(&mut buffer, "{}CONTAINS", indentation)?;
			for member in &self.members
			{
				buffer.push_str(&member.rebuild(&inner)?);
			}
		}
		writeln!(&mut buffer, "{}END {} {}", indentation, keyword, self.name)?;
		Ok(buffer)
	}
}

impl Rebuildable for Module
{
	fn rebuild(&self, indentation: &Indentation) -> Result<String, Error>
	{
		let mut buffer = String::new();
		writeln!(&mut buffer, "{}MODULE {}", indentation, self.name)?;
		let inner = indentation.increased();
		buffer.push_str(&rebuild_nodes(&self.docstring, &inner)?);
		buffer.push_str(&rebuild_nodes(&self.spec.body, &inner)?);
		if !self.routines.is_empty()
		{
			writeln!(&mut buffer, "{}CONTAINS", indentation)?;
			for routine in &self.routines
			{
				buffer.push_str(&routine.rebuild(&inner)?);
			}
		}
		writeln!(&mut buffer, "{}END MODULE {}", indentation, self.name)?;
		Ok(buffer)
	}
}

impl Rebuildable for TypeDef
{
	fn rebuild(&self, indentation: &Indentation) -> Result<String, Error>
	{
		let mut buffer = String::new();
		writeln!(&mut buffer, "{}TYPE {}", indentation, self.name)?;
		let inner = indentation.increased();
		for (name, attributes) in &self.members
		{
			write!(&mut buffer, "{}{}", inner, rebuild_type(&attributes.dtype))?;
			if let Some(kind) = &attributes.kind
			{
				write!(&mut buffer, "(kind={})", kind)?;
			}
			write!(&mut buffer, " :: {}", name)?;
			if !attributes.shape.is_empty()
			{
				write!(&mut buffer, "({})", join(&attributes.shape))?;
			}
			writeln!(&mut buffer)?;
		}
		writeln!(&mut buffer, "{}END TYPE {}", indentation, self.name)?;
		Ok(buffer)
	}
}

fn rebuild_type(dtype: &DataType) -> String
{
	match dtype
	{
		DataType::Procedure { .. } => "EXTERNAL".to_string(),
		DataType::Deferred => "CLASS(*)".to_string(),
		dtype => dtype.to_string(),
	}
}

/// The attributes of the first variable apply to the whole declaration.
fn rebuild_declaration(variables: &[TypedSymbol]) -> Result<String, Error>
{
	let mut buffer = String::new();
	let first = match variables.first()
	{
		Some(first) => first,
		None => return Ok(buffer),
	};
	let attributes = &first.attributes;
	write!(&mut buffer, "{}", rebuild_type(&attributes.dtype))?;
	if let Some(kind) = &attributes.kind
	{
		write!(&mut buffer, "(kind={})", kind)?;
	}
	if let Some(intent) = attributes.intent
	{
		write!(&mut buffer, ", INTENT({})", intent.as_str().to_uppercase())?;
	}
	for modifier in attributes.modifiers.iter()
	{
		write!(&mut buffer, ", {}", modifier.as_str().to_uppercase())?;
	}
	write!(&mut buffer, " :: ")?;
	for (i, variable) in variables.iter().enumerate()
	{
		if i > 0
		{
			write!(&mut buffer, ", ")?;
		}
		write!(&mut buffer, "{}", variable.full_name())?;
		let shape = if variable.dimensions.is_empty()
		{
			variable.shape()
		}
		else
		{
			variable.dimensions.as_slice()
		};
		if !shape.is_empty()
		{
			write!(&mut buffer, "({})", join(shape))?;
		}
		if let Some(initial) = &variable.attributes.initial
		{
			write!(&mut buffer, " = {}", initial)?;
		}
	}
	Ok(buffer)
}

fn rebuild_call(call: &Call) -> String
{
	let mut arguments: Vec<String> =
		call.arguments.iter().map(|x| x.to_string()).collect();
	arguments.extend(
		call.kwarguments
			.iter()
			.map(|(keyword, x)| format!("{}={}", keyword, x)),
	);
	format!("CALL {}({})", call.name.full_name(), arguments.join(", "))
}

fn rebuild_bounds(bounds: &Expression) -> String
{
	match bounds
	{
		Expression::Range {
			lower: Some(lower),
			upper: Some(upper),
			step,
		} => match step
		{
			Some(step) => format!("{}, {}, {}", lower, upper, step),
			None => format!("{}, {}", lower, upper),
		},
		bounds => bounds.to_string(),
	}
}
