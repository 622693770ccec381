//
// Part of weft
// Copyright (c) 2023 Sander in 't Veld
// License: MIT
//

//! A whole source file: the top level container of IR, and the owner of the
//! scopes that the IR in it refers to.

use crate::config::Settings;
use crate::error::Error;
use crate::frontend::{BuildContext, Entity, ParseNode};
use crate::ir::{Node, NodeKind, Section};
use crate::module::{Module, ModuleDefinition};
use crate::rebuilder::CodeGenerator;
use crate::scope::Scopes;
use crate::source::Source;
use crate::subroutine::Subroutine;

use std::path::{Path, PathBuf};

/// Turns raw text into a parse tree.
pub trait Parser
{
	fn parse(&self, text: &str, filename: &str) -> Result<ParseNode, Error>;

	/// Whether the line numbers in the resulting tree point into the text
	/// that was parsed, so that it can serve as provenance.
	fn lines_refer_to_input(&self) -> bool
	{
		true
	}
}

/// Reads a parse tree that was dumped by one of the external parsers.
pub struct DumpReader;

impl Parser for DumpReader
{
	fn parse(&self, text: &str, filename: &str) -> Result<ParseNode, Error>
	{
		ParseNode::read(text, filename)
	}

	fn lines_refer_to_input(&self) -> bool
	{
		false
	}
}

#[derive(Debug)]
pub struct Sourcefile
{
	pub path: Option<PathBuf>,
	pub ir: Section,
	pub scopes: Scopes,
	pub source: Option<Source>,
}

/// A program unit found by name.
#[derive(Debug, Clone, Copy)]
pub enum Unit<'a>
{
	Module(&'a Module),
	Subroutine(&'a Subroutine),
}

/// A rewrite of IR, applied through `Sourcefile::apply`.
pub trait Transformation
{
	fn transform_subroutine(
		&mut self,
		_routine: &mut Subroutine,
		_scopes: &mut Scopes,
	) -> Result<(), Error>
	{
		Ok(())
	}

	fn transform_module(
		&mut self,
		_module: &mut Module,
		_scopes: &mut Scopes,
	) -> Result<(), Error>
	{
		Ok(())
	}

	fn transform_file(
		&mut self,
		_ir: &mut Section,
		_scopes: &mut Scopes,
	) -> Result<(), Error>
	{
		Ok(())
	}

	/// Whether the routines of a module are transformed after the module.
	fn recurses_to_procedures(&self) -> bool
	{
		true
	}
}

impl Sourcefile
{
	pub fn from_file(
		path: &Path,
		parser: &dyn Parser,
		settings: &Settings,
		definitions: &[ModuleDefinition],
	) -> Result<Sourcefile, Error>
	{
		log::info!("loading {}", path.display());
		let raw = if settings.preprocess
		{
			preprocess(path, settings)?
		}
		else
		{
			std::fs::read_to_string(path).map_err(|source| Error::Io {
				path: path.to_string_lossy().to_string(),
				source,
			})?
		};
		let filename = path.to_string_lossy();
		let mut file =
			Sourcefile::from_source(&raw, &filename, parser, settings, definitions)?;
		file.path = Some(path.to_path_buf());
		if let Some(source) = &mut file.source
		{
			source.file = Some(path.to_path_buf());
		}
		Ok(file)
	}

	pub fn from_source(
		raw: &str,
		filename: &str,
		parser: &dyn Parser,
		settings: &Settings,
		definitions: &[ModuleDefinition],
	) -> Result<Sourcefile, Error>
	{
		let tree = parser.parse(raw, filename)?;
		let raw_source = if parser.lines_refer_to_input()
		{
			Some(raw)
		}
		else
		{
			None
		};
		Sourcefile::from_tree(&tree, raw_source, settings, definitions)
	}

	/// Build every top level entity of a parse tree. Modules built earlier
	/// in the file serve as definitions for the entities after them.
	pub fn from_tree(
		tree: &ParseNode,
		raw_source: Option<&str>,
		settings: &Settings,
		definitions: &[ModuleDefinition],
	) -> Result<Sourcefile, Error>
	{
		let frontend = settings.frontend;
		let type_table = frontend.type_table(tree);
		let mut scopes = Scopes::new();
		let mut known: Vec<ModuleDefinition> = definitions.to_vec();
		let mut nodes = Vec::new();

		for entity in frontend.file_entities(tree)?
		{
			let mut context = BuildContext::new(&mut scopes, settings)
				.with_definitions(&known)
				.with_type_table(type_table);
			if let Some(raw) = raw_source
			{
				context = context.with_raw_source(raw);
			}
			match entity
			{
				Entity::Module(tree) =>
				{
					let module = Module::from_tree(tree, &mut context)?;
					known.push(module.definition(&scopes));
					let source = module.source.clone();
					nodes.push(
						Node::new(NodeKind::Module(Box::new(module)))
							.with_source(source),
					);
				}
				Entity::Procedure(tree) =>
				{
					let routine = Subroutine::from_tree(tree, &mut context)?;
					let source = routine.source.clone();
					nodes.push(
						Node::new(NodeKind::Subroutine(Box::new(routine)))
							.with_source(source),
					);
				}
				Entity::Statement(tree) =>
				{
					nodes.extend(context.build(std::slice::from_ref(tree))?);
				}
			}
		}

		Ok(Sourcefile {
			path: None,
			ir: Section::new(nodes),
			scopes,
			source: raw_source.map(|raw| Source::whole_file(raw, None)),
		})
	}

	pub fn modules(&self) -> Vec<&Module>
	{
		self.ir
			.iter()
			.filter_map(|node| match &node.kind
			{
				NodeKind::Module(module) => Some(&**module),
				_ => None,
			})
			.collect()
	}

	/// Free subroutines only; see `all_subroutines`.
	pub fn subroutines(&self) -> Vec<&Subroutine>
	{
		self.ir
			.iter()
			.filter_map(|node| match &node.kind
			{
				NodeKind::Subroutine(routine) => Some(&**routine),
				_ => None,
			})
			.collect()
	}

	/// Free subroutines followed by the routines of every module.
	pub fn all_subroutines(&self) -> Vec<&Subroutine>
	{
		let mut routines = self.subroutines();
		for module in self.modules()
		{
			routines.extend(module.routines.iter());
		}
		routines
	}

	/// Look up a module or subroutine by name, ignoring case. Modules take
	/// precedence.
	pub fn get(&self, name: &str) -> Option<Unit>
	{
		if let Some(module) = self
			.modules()
			.into_iter()
			.find(|x| x.name.eq_ignore_ascii_case(name))
		{
			return Some(Unit::Module(module));
		}
		self.all_subroutines()
			.into_iter()
			.find(|x| x.name.eq_ignore_ascii_case(name))
			.map(Unit::Subroutine)
	}

	pub fn subroutine_mut(&mut self, name: &str) -> Option<&mut Subroutine>
	{
		for node in self.ir.body.iter_mut()
		{
			match &mut node.kind
			{
				NodeKind::Subroutine(routine)
					if routine.name.eq_ignore_ascii_case(name) =>
				{
					return Some(&mut **routine);
				}
				NodeKind::Module(module) =>
				{
					if let Some(routine) = module.subroutine_mut(name)
					{
						return Some(routine);
					}
				}
				_ => (),
			}
		}
		None
	}

	/// Definitions of the modules in this file, for building other files.
	pub fn definitions(&self) -> Vec<ModuleDefinition>
	{
		self.modules()
			.into_iter()
			.map(|module| module.definition(&self.scopes))
			.collect()
	}

	pub fn apply(
		&mut self,
		transformation: &mut dyn Transformation,
	) -> Result<(), Error>
	{
		transformation.transform_file(&mut self.ir, &mut self.scopes)?;
		let recurse = transformation.recurses_to_procedures();
		for node in self.ir.body.iter_mut()
		{
			match &mut node.kind
			{
				NodeKind::Module(module) =>
				{
					transformation.transform_module(module, &mut self.scopes)?;
					if recurse
					{
						for routine in module.routines.iter_mut()
						{
							transformation
								.transform_subroutine(routine, &mut self.scopes)?;
						}
					}
				}
				NodeKind::Subroutine(routine) =>
				{
					transformation.transform_subroutine(routine, &mut self.scopes)?;
				}
				_ => (),
			}
		}
		Ok(())
	}

	pub fn write(&self, generator: &dyn CodeGenerator) -> Result<String, Error>
	{
		let mut text = generator.generate(&self.ir.body)?;
		if !text.ends_with('\n')
		{
			text.push('\n');
		}
		Ok(text)
	}

	pub fn to_file(
		&self,
		path: &Path,
		generator: &dyn CodeGenerator,
	) -> Result<(), Error>
	{
		let text = self.write(generator)?;
		std::fs::write(path, text).map_err(|source| Error::Io {
			path: path.to_string_lossy().to_string(),
			source,
		})?;
		log::info!("wrote {}", path.display());
		Ok(())
	}
}

fn preprocess(path: &Path, settings: &Settings) -> Result<String, Error>
{
	let preprocessor = settings.preprocessor();
	let mut command = std::process::Command::new(&preprocessor);
	command.arg("-P").arg("-traditional-cpp");
	for include in &settings.includes
	{
		command.arg(format!("-I{}", include.display()));
	}
	for define in &settings.defines
	{
		command.arg(format!("-D{}", define));
	}
	command.arg(path);
	log::debug!("running {:?}", command);

	let output = command.output().map_err(|source| Error::Io {
		path: preprocessor.to_string_lossy().to_string(),
		source,
	})?;
	if !output.status.success()
	{
		return Err(Error::Preprocessor {
			message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
		});
	}
	String::from_utf8(output.stdout).map_err(|error| Error::Preprocessor {
		message: error.to_string(),
	})
}

#[cfg(test)]
mod tests
{
	use super::*;

	#[test]
	fn statements_at_file_level_are_kept()
	{
		let tree = ParseNode::read(
			r#"(Program (comment "! header") (Module (Module_Stmt name="m")))"#,
			"fp.tree",
		)
		.unwrap();
		let file =
			Sourcefile::from_tree(&tree, None, &Settings::default(), &[]).unwrap();
		assert_eq!(file.ir.len(), 2);
		assert!(file.ir.body[0].is_comment());
		assert_eq!(file.modules().len(), 1);
		assert!(file.source.is_none());
	}
}
