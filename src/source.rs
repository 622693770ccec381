//
// Part of weft
// Copyright (c) 2023 Sander in 't Veld
// License: MIT
//

//! Provenance: where a parse tree node or an IR node came from.

use std::path::PathBuf;

/// A position inside a parse tree dump, used for error reports.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Location
{
	pub source_filename: String,
	pub span: std::ops::Range<usize>,
	pub line_number: usize,
	pub line_offset: usize,
}

impl Location
{
	pub fn format(&self) -> String
	{
		format!(
			"at {}:{}:{}",
			self.source_filename, self.line_number, self.line_offset
		)
	}

	pub fn label(&self) -> ariadne::Label<(String, std::ops::Range<usize>)>
	{
		ariadne::Label::new((self.source_filename.clone(), self.span.clone()))
	}
}

/// A span of lines in the original source text, with the verbatim text of
/// those lines when the raw source was available at construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Source
{
	/// First and last line, both one-based and inclusive.
	pub lines: (usize, usize),
	pub string: Option<String>,
	pub file: Option<PathBuf>,
}

impl Source
{
	pub fn new(lines: (usize, usize)) -> Source
	{
		Source {
			lines,
			string: None,
			file: None,
		}
	}

	pub fn extract(raw_source: &str, lines: (usize, usize)) -> Source
	{
		let (start, end) = lines;
		let string = if start >= 1 && end >= start
		{
			let extracted: Vec<&str> = raw_source
				.lines()
				.skip(start - 1)
				.take(end - start + 1)
				.collect();
			if extracted.is_empty()
			{
				None
			}
			else
			{
				Some(extracted.join("\n"))
			}
		}
		else
		{
			None
		};
		Source {
			lines,
			string,
			file: None,
		}
	}

	pub fn whole_file(raw_source: &str, file: Option<PathBuf>) -> Source
	{
		let lines = (1, raw_source.matches('\n').count() + 1);
		Source {
			lines,
			string: Some(raw_source.to_string()),
			file,
		}
	}
}
