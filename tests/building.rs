//
// Part of weft
// Copyright (c) 2023 Sander in 't Veld
// License: MIT
//

use weft::config::Settings;
use weft::error::Error;
use weft::expression::Expression;
use weft::frontend::{BuildContext, Frontend, ParseNode};
use weft::ir::{NodeKind, NodeTag};
use weft::rebuilder::{CodeGenerator, Rebuilder};
use weft::scope::Scopes;
use weft::sourcefile::{DumpReader, Sourcefile, Unit};
use weft::subroutine::Subroutine;
use weft::types::{DataType, Intent};
use weft::visitor::{FindNodes, FindTypedSymbols};

use anyhow::anyhow;
use pretty_assertions::assert_eq;

fn build(filename: &str, frontend: Frontend) -> Result<Sourcefile, Error>
{
	let settings = Settings {
		frontend,
		..Settings::default()
	};
	Sourcefile::from_file(filename.as_ref(), &DumpReader, &settings, &[])
}

fn kernel(file: &Sourcefile) -> Result<&Subroutine, anyhow::Error>
{
	match file.get("kernel")
	{
		Some(Unit::Subroutine(routine)) => Ok(routine),
		_ => Err(anyhow!("no kernel")),
	}
}

const DIALECTS: [(&str, Frontend); 3] = [
	("tests/samples/kernel_fp.tree", Frontend::Fp),
	("tests/samples/kernel_ofp.tree", Frontend::Ofp),
	("tests/samples/kernel_omni.tree", Frontend::Omni),
];

const KERNEL_BODY: &str = "ALLOCATE(tmp(n))
DO i = 1, n
  tmp(i) = 2.0 * x(i)
  y(i) = tmp(i) + 1.0
END DO
CALL helper(y, n)
DEALLOCATE(tmp)
";

#[test]
fn dialects_agree() -> Result<(), anyhow::Error>
{
	for (filename, frontend) in DIALECTS
	{
		let file = build(filename, frontend)?;
		let routine = kernel(&file)?;
		assert_eq!(routine.name, "kernel");
		assert!(!routine.is_function);
		assert_eq!(routine.argnames(), vec!["n", "x", "y"]);
		let names: Vec<String> =
			routine.variables().into_iter().map(|x| x.name).collect();
		assert_eq!(names, vec!["n", "x", "y", "tmp", "i"]);
		let body = Rebuilder::default().generate(&routine.body.body)?;
		assert_eq!(body, KERNEL_BODY);
		assert_eq!(routine.members().len(), 1);
		assert_eq!(routine.members()[0].argnames(), vec!["z", "m"]);
	}
	Ok(())
}

#[test]
fn docstring_from_leading_comments() -> Result<(), anyhow::Error>
{
	for (filename, frontend) in &DIALECTS[..2]
	{
		let file = build(filename, *frontend)?;
		let routine = kernel(&file)?;
		assert_eq!(routine.docstring.len(), 1);
		match &routine.docstring[0].kind
		{
			NodeKind::Comment { text } =>
			{
				assert_eq!(text, "! Scale and shift an array")
			}
			other => return Err(anyhow!("unexpected {:?}", other)),
		}
		assert_eq!(routine.spec.len(), 5);
	}
	Ok(())
}

#[test]
fn omni_drops_own_declaration() -> Result<(), anyhow::Error>
{
	let file = build("tests/samples/kernel_omni.tree", Frontend::Omni)?;
	let routine = kernel(&file)?;
	assert!(routine.docstring.is_empty());
	assert_eq!(routine.spec.body[0].kind, NodeKind::Intrinsic {
		text: "IMPLICIT NONE".to_string()
	});
	assert!(routine.variable_map().get("kernel").is_none());
	assert!(file.scopes.lookup(routine.scope, "kernel", false).is_none());

	let helper = &routine.members()[0];
	assert_eq!(helper.spec.len(), 3);
	assert!(helper.variable_map().get("helper").is_none());
	Ok(())
}

#[test]
fn allocatable_shape_is_inferred() -> Result<(), anyhow::Error>
{
	let file = build("tests/samples/kernel_fp.tree", Frontend::Fp)?;
	let routine = kernel(&file)?;
	let n = routine
		.variable_map()
		.get("n")
		.cloned()
		.ok_or_else(|| anyhow!("no n"))?;
	let tmp = routine
		.variable_map()
		.get("tmp")
		.cloned()
		.ok_or_else(|| anyhow!("no tmp"))?;
	assert_eq!(tmp.shape(), &[Expression::Symbol(n.clone())]);
	let stored = file
		.scopes
		.lookup(routine.scope, "tmp", false)
		.ok_or_else(|| anyhow!("tmp not registered"))?;
	assert_eq!(stored.shape, vec![Expression::Symbol(n)]);
	Ok(())
}

#[test]
fn allocated_shapes_reach_every_occurrence() -> Result<(), anyhow::Error>
{
	let file = build("tests/samples/shapes_fp.tree", Frontend::Fp)?;
	let routine = match file.get("shapes")
	{
		Some(Unit::Subroutine(routine)) => routine,
		_ => return Err(anyhow!("no shapes")),
	};
	let expected = vec![Expression::IntLiteral(10), Expression::IntLiteral(20)];

	// The data source of `b` was itself allocated, so `b` takes its shape.
	let mut count = 0;
	for part in routine.ir()
	{
		for symbol in FindTypedSymbols::new().shallow().visit(part)
		{
			if symbol.name == "a" || symbol.name == "b"
			{
				assert_eq!(symbol.shape(), expected.as_slice(), "{}", symbol);
				count += 1;
			}
		}
	}
	// Two declarations, three allocations, three uses and two deallocations.
	assert_eq!(count, 10);
	for name in ["a", "b"]
	{
		let stored = file
			.scopes
			.lookup(routine.scope, name, false)
			.ok_or_else(|| anyhow!("{} not registered", name))?;
		assert_eq!(stored.shape, expected);
	}

	// A data source without a known shape leaves the declared shape alone.
	let c = file
		.scopes
		.lookup(routine.scope, "c", false)
		.ok_or_else(|| anyhow!("c not registered"))?;
	assert_eq!(c.shape, vec![Expression::Range {
		lower: None,
		upper: None,
		step: None
	}]);
	Ok(())
}

#[test]
fn allocatable_shape_is_kept_when_disabled() -> Result<(), anyhow::Error>
{
	let settings = Settings {
		infer_allocatable_shapes: false,
		..Settings::default()
	};
	let file = Sourcefile::from_file(
		"tests/samples/kernel_fp.tree".as_ref(),
		&DumpReader,
		&settings,
		&[],
	)?;
	let routine = kernel(&file)?;
	let stored = file
		.scopes
		.lookup(routine.scope, "tmp", false)
		.ok_or_else(|| anyhow!("tmp not registered"))?;
	assert_eq!(stored.shape, vec![Expression::Range {
		lower: None,
		upper: None,
		step: None
	}]);
	Ok(())
}

#[test]
fn declarations_register_attributes() -> Result<(), anyhow::Error>
{
	let file = build("tests/samples/kernel_ofp.tree", Frontend::Ofp)?;
	let routine = kernel(&file)?;
	let n = file
		.scopes
		.lookup(routine.scope, "N", false)
		.ok_or_else(|| anyhow!("n not registered"))?;
	assert_eq!(n.dtype, DataType::Integer);
	assert_eq!(n.intent, Some(Intent::In));

	// The member registers itself in the scope of its host.
	let helper = file
		.scopes
		.lookup(routine.scope, "helper", false)
		.ok_or_else(|| anyhow!("helper not registered"))?;
	assert!(helper.dtype.is_procedure());
	let parent = routine.members()[0].parent(&file.scopes);
	assert_eq!(parent.map(|x| x.name.as_str()), Some("kernel"));
	Ok(())
}

#[test]
fn call_to_member_is_typed_as_procedure() -> Result<(), anyhow::Error>
{
	let file = build("tests/samples/kernel_fp.tree", Frontend::Fp)?;
	let routine = kernel(&file)?;
	let calls = FindNodes::new(NodeTag::CallStatement).visit(&routine.body.body);
	assert_eq!(calls.len(), 1);
	match &calls[0].kind
	{
		NodeKind::CallStatement(call) =>
		{
			assert!(call.name.is_procedure());
			assert_eq!(call.name.scope, routine.scope);
		}
		_ => unreachable!(),
	}
	Ok(())
}

#[test]
fn provenance_without_raw_source() -> Result<(), anyhow::Error>
{
	let file = build("tests/samples/kernel_fp.tree", Frontend::Fp)?;
	let routine = kernel(&file)?;
	assert_eq!(routine.source.as_ref().map(|x| x.lines), Some((1, 22)));
	let assignments =
		FindNodes::new(NodeTag::Assignment).visit(&routine.body.body);
	let source = assignments[0].source.as_ref().ok_or_else(|| anyhow!("none"))?;
	assert_eq!(source.lines, (10, 10));
	assert_eq!(source.string, None);
	assert!(file.source.is_none());
	Ok(())
}

#[test]
fn provenance_with_raw_source() -> Result<(), anyhow::Error>
{
	let raw = "subroutine swap(a, b)\n  real :: a, b, t\n  t = a\n  a = b\n  \
	           b = t\nend subroutine swap\n";
	let tree = ParseNode::read(
		r#"(Program (Subroutine_Subprogram lines="1:6"
			(Subroutine_Stmt name="swap" (Dummy_Arg_List (Name "a") (Name "b")))
			(Specification_Part
				(declaration line="2" type="real"
					(variable name="a") (variable name="b") (variable name="t")))
			(Execution_Part
				(assignment line="3" (name "t") (name "a"))
				(assignment line="4" (name "a") (name "b"))
				(assignment line="5" (name "b") (name "t")))))"#,
		"swap.tree",
	)?;
	let file = Sourcefile::from_tree(&tree, Some(raw), &Settings::default(), &[])?;
	let routine = file.subroutines()[0];
	let source = routine.body.body[1]
		.source
		.as_ref()
		.ok_or_else(|| anyhow!("none"))?;
	assert_eq!(source.string.as_deref(), Some("  a = b"));
	let whole = routine.source.as_ref().ok_or_else(|| anyhow!("none"))?;
	assert_eq!(whole.lines, (1, 6));
	assert!(whole
		.string
		.as_deref()
		.unwrap_or("")
		.ends_with("end subroutine swap"));
	Ok(())
}

#[test]
fn dialect_specific_entry_points() -> Result<(), anyhow::Error>
{
	let settings = Settings::default();
	let tree = ParseNode::read(
		&std::fs::read_to_string("tests/samples/kernel_ofp.tree")?,
		"kernel_ofp.tree",
	)?;
	let routine_tree = tree
		.child("subroutine")
		.ok_or_else(|| anyhow!("no subroutine"))?;
	let mut scopes = Scopes::new();
	let mut context = BuildContext::new(&mut scopes, &settings);
	// The settings select fparser, but the entry point overrides that.
	let routine = Subroutine::from_ofp(routine_tree, &mut context)?;
	assert_eq!(routine.argnames(), vec!["n", "x", "y"]);
	assert!(Subroutine::from_fparser(routine_tree, &mut context).is_err());
	Ok(())
}

#[test]
fn wrong_dialect_is_malformed()
{
	match build("tests/samples/kernel_fp.tree", Frontend::Omni)
	{
		Err(Error::MalformedTree { tag, .. }) => assert_eq!(tag, "Program"),
		other => panic!("unexpected {:?}", other.map(|_| ())),
	}
}

#[test]
fn fail_on_unknown_statement()
{
	match build("tests/samples/invalid/unknown_statement.tree", Frontend::Fp)
	{
		Err(Error::MalformedTree { tag, location, .. }) =>
		{
			assert_eq!(tag, "goto");
			assert!(location.is_some());
		}
		other => panic!("unexpected {:?}", other.map(|_| ())),
	}
}

#[test]
fn fail_on_unterminated_dump()
{
	match build("tests/samples/invalid/unterminated.tree", Frontend::Fp)
	{
		Err(Error::Syntax { location, .. }) =>
		{
			assert!(location.source_filename.ends_with("unterminated.tree"))
		}
		other => panic!("unexpected {:?}", other.map(|_| ())),
	}
}

#[test]
fn fail_on_missing_specification()
{
	match build("tests/samples/invalid/missing_specification.tree", Frontend::Ofp)
	{
		Err(Error::MalformedTree { tag, .. }) => assert_eq!(tag, "body"),
		other => panic!("unexpected {:?}", other.map(|_| ())),
	}
}

#[test]
fn undeclared_names_fail_only_when_strict() -> Result<(), anyhow::Error>
{
	let filename = "tests/samples/invalid/undeclared.tree";
	let file = build(filename, Frontend::Fp)?;
	assert_eq!(file.subroutines().len(), 1);

	let settings = Settings {
		strict_scoping: true,
		..Settings::default()
	};
	match Sourcefile::from_file(filename.as_ref(), &DumpReader, &settings, &[])
	{
		Err(Error::MissingDefinition { name, routine }) =>
		{
			assert_eq!(name, "x");
			assert_eq!(routine, "sloppy");
		}
		other => return Err(anyhow!("unexpected {:?}", other.map(|_| ()))),
	}
	Ok(())
}

#[test]
fn strict_build_of_clean_kernel() -> Result<(), anyhow::Error>
{
	let settings = Settings {
		strict_scoping: true,
		frontend: Frontend::Omni,
		..Settings::default()
	};
	let file = Sourcefile::from_file(
		"tests/samples/kernel_omni.tree".as_ref(),
		&DumpReader,
		&settings,
		&[],
	)?;
	assert_eq!(file.all_subroutines().len(), 1);
	Ok(())
}
