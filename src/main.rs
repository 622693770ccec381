//
// Part of weft
// Copyright (c) 2023 Sander in 't Veld
// License: MIT
//

use weft::config::Settings;
use weft::frontend::Frontend;
use weft::module::ModuleDefinition;
use weft::rebuilder::Rebuilder;
use weft::sourcefile::{DumpReader, Sourcefile};

use std::io::Write;

use anyhow::anyhow;
use anyhow::Context;
use clap::Parser;
use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

#[derive(Debug, clap::Parser)]
#[clap(version, propagate_version = true)]
#[clap(args_conflicts_with_subcommands = true)]
struct Cli
{
	#[clap(subcommand)]
	sub: Option<Subcommand>,

	#[clap(flatten)]
	build: BuildArgs,
}

#[derive(Debug, clap::Subcommand)]
enum Subcommand
{
	/// Build IR from one or more parse tree dumps and regenerate source (default)
	Build(BuildArgs),
	/// Build IR from parse tree dumps and print its debug form
	Dump(DumpArgs),
}

#[derive(Debug, Default, clap::Args)]
struct BuildArgs
{
	/// One or more parse tree dumps, in dependency order
	#[clap(value_parser, required(true))]
	filepaths: Vec<std::path::PathBuf>,

	/// Which parser produced the dumps: 'omni', 'ofp' or 'fp' (default: 'fp')
	#[clap(short, long)]
	frontend: Option<String>,

	/// Load additional build options from TOML file
	#[clap(long)]
	config: Option<std::path::PathBuf>,

	/// Fail on names that no enclosing scope defines
	#[clap(long)]
	strict: bool,

	/// Write regenerated source to this directory
	#[clap(long)]
	out_dir: Option<std::path::PathBuf>,

	/// Show a lot of intermediate output
	#[clap(short, long)]
	verbose: bool,
}

#[derive(Debug, Default, clap::Args)]
struct DumpArgs
{
	/// One or more parse tree dumps, in dependency order
	#[clap(value_parser, required(true))]
	filepaths: Vec<std::path::PathBuf>,

	/// Which parser produced the dumps: 'omni', 'ofp' or 'fp' (default: 'fp')
	#[clap(short, long)]
	frontend: Option<String>,

	/// Load additional build options from TOML file
	#[clap(long)]
	config: Option<std::path::PathBuf>,

	/// Fail on names that no enclosing scope defines
	#[clap(long)]
	strict: bool,
}

fn main() -> Result<(), anyhow::Error>
{
	#[cfg(feature = "logging")]
	env_logger::init();

	let result = do_main();
	if result.is_err()
	{
		let mut stdout = StandardStream::stdout(ColorChoice::Auto);
		let colorspec_error = ColorSpec::new()
			.set_fg(Some(Color::Red))
			.set_bold(true)
			.to_owned();
		stdout.set_color(&colorspec_error)?;
		writeln!(stdout)?;
		stdout.reset()?;
	}
	result
}

struct MainArgs
{
	filepaths: Vec<std::path::PathBuf>,
	settings: Settings,
	out_dir: Option<std::path::PathBuf>,
	verbose: bool,
	is_dump: bool,
}

impl TryFrom<Cli> for MainArgs
{
	type Error = anyhow::Error;

	fn try_from(cli: Cli) -> Result<Self, Self::Error>
	{
		match cli
		{
			Cli {
				sub: None,
				build: args,
			}
			| Cli {
				sub: Some(Subcommand::Build(args)),
				build: _,
			} =>
			{
				let settings =
					load_settings(args.config, args.frontend, args.strict)?;
				Ok(MainArgs {
					filepaths: args.filepaths,
					settings,
					out_dir: args.out_dir,
					verbose: args.verbose,
					is_dump: false,
				})
			}
			Cli {
				sub: Some(Subcommand::Dump(args)),
				build: _,
			} =>
			{
				let settings =
					load_settings(args.config, args.frontend, args.strict)?;
				Ok(MainArgs {
					filepaths: args.filepaths,
					settings,
					out_dir: None,
					verbose: false,
					is_dump: true,
				})
			}
		}
	}
}

/// Command line flags take precedence over the configuration file.
fn load_settings(
	config: Option<std::path::PathBuf>,
	frontend: Option<String>,
	strict: bool,
) -> Result<Settings, anyhow::Error>
{
	let mut settings = if let Some(filename) = config
	{
		Settings::from_toml_file(&filename).with_context(|| {
			format!("failed to load '{}'", filename.to_string_lossy())
		})?
	}
	else
	{
		Settings::default()
	};
	if let Some(frontend) = frontend
	{
		settings.frontend = frontend.parse::<Frontend>()?;
	}
	settings.strict_scoping |= strict;
	Ok(settings)
}

fn do_main() -> Result<(), anyhow::Error>
{
	let args = Cli::parse().try_into()?;
	let MainArgs {
		filepaths,
		settings,
		out_dir,
		verbose,
		is_dump,
	} = args;

	let mut stdout = StandardStream::stdout(ColorChoice::Auto);
	let colorspec_header = ColorSpec::new().to_owned();
	let colorspec_dump = ColorSpec::new().set_dimmed(true).to_owned();
	let colorspec_error = ColorSpec::new()
		.set_fg(Some(Color::Red))
		.set_bold(true)
		.to_owned();
	let colorspec_success =
		ColorSpec::new().set_fg(Some(Color::Green)).to_owned();

	let generator = Rebuilder::default();
	let mut definitions: Vec<ModuleDefinition> = Vec::new();

	for filepath in filepaths
	{
		let filename = filepath.to_string_lossy().to_string();
		if verbose
		{
			stdout.set_color(&colorspec_header)?;
			writeln!(
				stdout,
				"Building {} with the {} frontend...",
				filename, settings.frontend
			)?;
		}
		let file = match Sourcefile::from_file(
			&filepath,
			&DumpReader,
			&settings,
			&definitions,
		)
		{
			Ok(file) => file,
			Err(error) =>
			{
				stdout.set_color(&colorspec_error)?;
				writeln!(stdout)?;
				let raw = std::fs::read_to_string(&filepath).unwrap_or_default();
				error.report().eprint(ariadne::sources(vec![(filename, raw)]))?;
				stdout.reset()?;
				return Err(anyhow!("building IR failed"));
			}
		};

		if is_dump
		{
			stdout.set_color(&colorspec_dump)?;
			writeln!(stdout, "{:#?}", file.ir)?;
			stdout.reset()?;
		}
		else
		{
			let code = file.write(&generator)?;
			if verbose
			{
				stdout.set_color(&colorspec_dump)?;
				writeln!(stdout, "{}", code)?;
			}
			if let Some(out_dir) = &out_dir
			{
				let outputpath = {
					let mut path = out_dir.clone();
					path.push(filepath.file_name().context("invalid filename")?);
					path.set_extension("F90");
					path
				};
				std::fs::create_dir_all(out_dir)?;
				stdout.set_color(&colorspec_header)?;
				writeln!(stdout, "Writing to {}...", outputpath.to_string_lossy())?;
				file.to_file(&outputpath, &generator)?;
			}
			stdout.set_color(&colorspec_success)?;
			writeln!(
				stdout,
				"Built {} module(s) and {} subroutine(s) from {}.",
				file.modules().len(),
				file.all_subroutines().len(),
				filename
			)?;
			stdout.reset()?;
		}

		definitions.extend(file.definitions());
	}

	if !is_dump
	{
		stdout.reset()?;
		writeln!(stdout, "Done.")?;
	}
	Ok(())
}

