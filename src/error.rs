//
// Part of weft
// Copyright (c) 2023 Sander in 't Veld
// License: MIT
//

use crate::source::Location;
use crate::types::SymbolAttributes;

use ariadne::{Report, ReportKind};
use thiserror::Error;

#[must_use]
#[derive(Debug, Error)]
pub enum Error
{
	#[error("syntax error {}: {expectation}", .location.format())]
	Syntax
	{
		expectation: String,
		location: Location,
	},
	#[error("unexpected character {character:?} {}", .location.format())]
	UnexpectedCharacter
	{
		character: char,
		location: Location,
	},
	#[error("malformed `{tag}` node: {expectation}")]
	MalformedTree
	{
		tag: String,
		expectation: String,
		location: Option<Location>,
	},
	#[error("unknown frontend '{name}'")]
	UnknownFrontend
	{
		name: String
	},
	#[error("no definition found for '{name}' in '{routine}'")]
	MissingDefinition
	{
		name: String, routine: String
	},
	#[error("invalid configuration: {message}")]
	Config
	{
		message: String
	},
	#[error("preprocessing failed: {message}")]
	Preprocessor
	{
		message: String
	},
	#[error("failed to access '{path}'")]
	Io
	{
		path: String,
		#[source]
		source: std::io::Error,
	},
	#[error("failed to format output")]
	Format(#[from] std::fmt::Error),
}

impl Error
{
	pub fn location(&self) -> Option<&Location>
	{
		match self
		{
			Error::Syntax { location, .. } => Some(location),
			Error::UnexpectedCharacter { location, .. } => Some(location),
			Error::MalformedTree { location, .. } => location.as_ref(),
			_ => None,
		}
	}

	pub fn report(&self) -> Report<(String, std::ops::Range<usize>)>
	{
		let mut colors = ariadne::ColorGenerator::new();
		let a = colors.next();

		match self.location()
		{
			Some(location) => Report::build(
				ReportKind::Error,
				location.source_filename.clone(),
				location.span.start,
			)
			.with_message(self.to_string())
			.with_label(
				location
					.label()
					.with_message(self.expectation())
					.with_color(a),
			)
			.finish(),
			None => Report::build(ReportKind::Error, String::new(), 0)
				.with_message(self.to_string())
				.finish(),
		}
	}

	fn expectation(&self) -> String
	{
		match self
		{
			Error::Syntax { expectation, .. } => expectation.clone(),
			Error::UnexpectedCharacter { .. } => "Unexpected character.".into(),
			Error::MalformedTree { expectation, .. } => expectation.clone(),
			_ => String::new(),
		}
	}
}

/// A soft condition found while repairing scope bindings.
/// Processing continues after a warning.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Warning
{
	#[error("type for {name} does not match stored type")]
	TypeMismatch
	{
		name: String,
		stored: SymbolAttributes,
		found: SymbolAttributes,
	},
	#[error("type for {name} not found in any scope")]
	MissingDefinition
	{
		name: String
	},
}

impl Warning
{
	pub fn name(&self) -> &str
	{
		match self
		{
			Warning::TypeMismatch { name, .. } => name,
			Warning::MissingDefinition { name } => name,
		}
	}
}
