//
// Part of weft
// Copyright (c) 2023 Sander in 't Veld
// License: MIT
//

use weft::config::Settings;
use weft::error::Error;
use weft::frontend::Frontend;
use weft::ir::{Node, NodeKind, NodeTag, Section};
use weft::module::Module;
use weft::rebuilder::Rebuilder;
use weft::scope::Scopes;
use weft::sourcefile::{DumpReader, Parser, Sourcefile, Transformation, Unit};
use weft::subroutine::Subroutine;
use weft::types::DataType;
use weft::visitor::FindNodes;

use anyhow::anyhow;
use pretty_assertions::assert_eq;

fn load(filename: &str, settings: &Settings) -> Result<Sourcefile, Error>
{
	let physics = Sourcefile::from_file(
		"tests/samples/physics_fp.tree".as_ref(),
		&DumpReader,
		settings,
		&[],
	)?;
	Sourcefile::from_file(
		filename.as_ref(),
		&DumpReader,
		settings,
		&physics.definitions(),
	)
}

#[test]
fn module_definitions() -> Result<(), anyhow::Error>
{
	let file = Sourcefile::from_file(
		"tests/samples/physics_fp.tree".as_ref(),
		&DumpReader,
		&Settings::default(),
		&[],
	)?;
	assert_eq!(file.modules().len(), 1);
	assert!(file.subroutines().is_empty());
	assert_eq!(file.all_subroutines().len(), 1);

	let definitions = file.definitions();
	assert_eq!(definitions.len(), 1);
	let physics = &definitions[0];
	assert_eq!(physics.name, "physics");
	let names: Vec<&str> = physics.symbols.iter().map(|(x, _)| x.as_str()).collect();
	assert_eq!(names, vec!["g", "nlev"]);
	assert_eq!(physics.symbol("G").map(|x| x.dtype), Some(DataType::Real));
	let state = physics.typedef("state").ok_or_else(|| anyhow!("no state"))?;
	assert_eq!(state.members.len(), 2);
	assert_eq!(physics.procedures.len(), 1);
	assert_eq!(physics.procedures[0].name, "reset");
	assert_eq!(physics.procedures[0].arguments.len(), 1);
	Ok(())
}

#[test]
fn imports_resolve_across_files() -> Result<(), anyhow::Error>
{
	let settings = Settings {
		strict_scoping: true,
		..Settings::default()
	};
	let file = load("tests/samples/driver_fp.tree", &settings)?;
	let driver = match file.get("driver")
	{
		Some(Unit::Subroutine(routine)) => routine,
		_ => return Err(anyhow!("no driver")),
	};
	let g = file
		.scopes
		.lookup(driver.scope, "g", false)
		.ok_or_else(|| anyhow!("g not imported"))?;
	assert_eq!(g.dtype, DataType::Real);
	let s = file
		.scopes
		.lookup(driver.scope, "s", false)
		.ok_or_else(|| anyhow!("no s"))?;
	assert_eq!(s.dtype, DataType::Derived {
		name: "state".to_string()
	});
	let member = file
		.scopes
		.lookup(driver.scope, "s%t", false)
		.ok_or_else(|| anyhow!("s%t not resolved"))?;
	assert_eq!(member.dtype, DataType::Real);
	let reset = file
		.scopes
		.lookup(driver.scope, "reset", false)
		.ok_or_else(|| anyhow!("reset not imported"))?;
	assert!(reset.dtype.is_procedure());
	Ok(())
}

#[test]
fn imports_without_definitions_are_deferred() -> Result<(), anyhow::Error>
{
	let file = Sourcefile::from_file(
		"tests/samples/driver_fp.tree".as_ref(),
		&DumpReader,
		&Settings::default(),
		&[],
	)?;
	let driver = file.subroutines()[0];
	let g = file
		.scopes
		.lookup(driver.scope, "g", false)
		.ok_or_else(|| anyhow!("g not registered"))?;
	assert!(g.dtype.is_deferred());
	Ok(())
}

#[test]
fn units_by_name() -> Result<(), anyhow::Error>
{
	let file = Sourcefile::from_file(
		"tests/samples/physics_fp.tree".as_ref(),
		&DumpReader,
		&Settings::default(),
		&[],
	)?;
	assert!(matches!(file.get("PHYSICS"), Some(Unit::Module(_))));
	assert!(matches!(file.get("reset"), Some(Unit::Subroutine(_))));
	assert!(file.get("missing").is_none());
	assert!(file.path.is_some());
	Ok(())
}

#[test]
fn write_regenerates_every_unit() -> Result<(), anyhow::Error>
{
	let file = Sourcefile::from_file(
		"tests/samples/physics_fp.tree".as_ref(),
		&DumpReader,
		&Settings::default(),
		&[],
	)?;
	let code = file.write(&Rebuilder::default())?;
	assert!(code.starts_with("MODULE physics\n"));
	assert!(code.contains("REAL, PARAMETER :: g = 9.81\n"));
	assert!(code.contains("CONTAINS\n"));
	assert!(code.contains("SUBROUTINE reset(s)\n"));
	assert!(code.contains("s%t = 0.0\n"));
	assert!(code.ends_with("END MODULE physics\n"));
	Ok(())
}

#[test]
fn to_file_writes_to_disk() -> Result<(), anyhow::Error>
{
	let file = Sourcefile::from_file(
		"tests/samples/kernel_omni.tree".as_ref(),
		&DumpReader,
		&Settings {
			frontend: Frontend::Omni,
			..Settings::default()
		},
		&[],
	)?;
	let dir = tempfile::tempdir()?;
	let path = dir.path().join("kernel.F90");
	let generator = Rebuilder::default();
	file.to_file(&path, &generator)?;
	let written = std::fs::read_to_string(&path)?;
	assert_eq!(written, file.write(&generator)?);
	assert!(written.contains("IMPLICIT NONE"));
	Ok(())
}

#[test]
fn missing_file_is_io_error()
{
	let result = Sourcefile::from_file(
		"tests/samples/does_not_exist.tree".as_ref(),
		&DumpReader,
		&Settings::default(),
		&[],
	);
	match result
	{
		Err(Error::Io { path, .. }) => assert!(path.ends_with("does_not_exist.tree")),
		other => panic!("unexpected {:?}", other.map(|_| ())),
	}
}

#[derive(Default)]
struct Census
{
	files: usize,
	modules: Vec<String>,
	routines: Vec<String>,
	shallow: bool,
}

impl Transformation for Census
{
	fn transform_subroutine(
		&mut self,
		routine: &mut Subroutine,
		_scopes: &mut Scopes,
	) -> Result<(), Error>
	{
		self.routines.push(routine.name.clone());
		routine.body.prepend(vec![Node::comment("! visited")]);
		Ok(())
	}

	fn transform_module(
		&mut self,
		module: &mut Module,
		_scopes: &mut Scopes,
	) -> Result<(), Error>
	{
		self.modules.push(module.name.clone());
		Ok(())
	}

	fn transform_file(
		&mut self,
		_ir: &mut Section,
		_scopes: &mut Scopes,
	) -> Result<(), Error>
	{
		self.files += 1;
		Ok(())
	}

	fn recurses_to_procedures(&self) -> bool
	{
		!self.shallow
	}
}

#[test]
fn apply_visits_modules_then_routines() -> Result<(), anyhow::Error>
{
	let mut file = Sourcefile::from_file(
		"tests/samples/physics_fp.tree".as_ref(),
		&DumpReader,
		&Settings::default(),
		&[],
	)?;
	let mut census = Census::default();
	file.apply(&mut census)?;
	assert_eq!(census.files, 1);
	assert_eq!(census.modules, vec!["physics"]);
	assert_eq!(census.routines, vec!["reset"]);
	let reset = file
		.subroutine_mut("reset")
		.ok_or_else(|| anyhow!("no reset"))?;
	let comments = FindNodes::new(NodeTag::Comment).visit(&reset.body.body);
	assert_eq!(comments.len(), 1);

	let mut shallow = Census {
		shallow: true,
		..Census::default()
	};
	file.apply(&mut shallow)?;
	assert_eq!(shallow.modules, vec!["physics"]);
	assert!(shallow.routines.is_empty());
	Ok(())
}

#[test]
fn apply_stops_at_first_error()
{
	struct Refuse;

	impl Transformation for Refuse
	{
		fn transform_subroutine(
			&mut self,
			routine: &mut Subroutine,
			_scopes: &mut Scopes,
		) -> Result<(), Error>
		{
			Err(Error::MissingDefinition {
				name: "anything".to_string(),
				routine: routine.name.clone(),
			})
		}
	}

	let mut file = match Sourcefile::from_file(
		"tests/samples/kernel_fp.tree".as_ref(),
		&DumpReader,
		&Settings::default(),
		&[],
	)
	{
		Ok(file) => file,
		Err(error) => panic!("{}", error),
	};
	match file.apply(&mut Refuse)
	{
		Err(Error::MissingDefinition { routine, .. }) => assert_eq!(routine, "kernel"),
		other => panic!("unexpected {:?}", other),
	}
}

/// Yields a fixed tree whose line numbers refer to the text it was given.
struct Canned;

impl Parser for Canned
{
	fn parse(&self, _text: &str, filename: &str) -> Result<weft::frontend::ParseNode, Error>
	{
		weft::frontend::ParseNode::read(
			r#"(Program (Subroutine_Subprogram lines="1:3"
				(Subroutine_Stmt name="noop")
				(Specification_Part)
				(Execution_Part (intrinsic line="2" text="RETURN"))))"#,
			filename,
		)
	}
}

#[test]
fn custom_parser_provides_provenance() -> Result<(), anyhow::Error>
{
	let raw = "subroutine noop\n  return\nend subroutine noop";
	let file = Sourcefile::from_source(
		raw,
		"noop.F90",
		&Canned,
		&Settings::default(),
		&[],
	)?;
	let whole = file.source.as_ref().ok_or_else(|| anyhow!("none"))?;
	assert_eq!(whole.lines, (1, 3));
	let routine = file.subroutines()[0];
	let statement = &routine.body.body[0];
	assert_eq!(statement.kind, NodeKind::Intrinsic {
		text: "RETURN".to_string()
	});
	let source = statement.source.as_ref().ok_or_else(|| anyhow!("none"))?;
	assert_eq!(source.string.as_deref(), Some("  return"));
	Ok(())
}
