//
// Part of weft
// Copyright (c) 2023 Sander in 't Veld
// License: MIT
//

//! Parse trees as emitted by the dialect parsers, and a reader for their
//! textual dump form:
//!
//! ```text
//! (tag key="value" "text" (child ...) ...)
//! ```

use crate::error::Error;
use crate::source::Location;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParseNode
{
	pub tag: String,
	pub attributes: Vec<(String, String)>,
	pub text: Option<String>,
	pub children: Vec<ParseNode>,
	pub location: Option<Location>,
}

impl ParseNode
{
	pub fn new(tag: &str) -> ParseNode
	{
		ParseNode {
			tag: tag.to_string(),
			..ParseNode::default()
		}
	}

	pub fn with_attribute(mut self, key: &str, value: &str) -> ParseNode
	{
		self.attributes.push((key.to_string(), value.to_string()));
		self
	}

	pub fn with_text(self, text: &str) -> ParseNode
	{
		ParseNode {
			text: Some(text.to_string()),
			..self
		}
	}

	pub fn with_child(mut self, child: ParseNode) -> ParseNode
	{
		self.children.push(child);
		self
	}

	pub fn is(&self, tag: &str) -> bool
	{
		self.tag == tag
	}

	pub fn attribute(&self, key: &str) -> Option<&str>
	{
		self.attributes
			.iter()
			.find(|(k, _)| k == key)
			.map(|(_, v)| v.as_str())
	}

	pub fn flag(&self, key: &str) -> bool
	{
		match self.attribute(key)
		{
			Some(value) => value.eq_ignore_ascii_case("true"),
			None => false,
		}
	}

	/// The value of the given attribute, or failing that, the text.
	pub fn attribute_or_text(&self, key: &str) -> Option<&str>
	{
		self.attribute(key).or(self.text.as_deref())
	}

	/// The first direct child with the given tag.
	pub fn child(&self, tag: &str) -> Option<&ParseNode>
	{
		self.children.iter().find(|x| x.tag == tag)
	}

	pub fn find_all<'t>(
		&'t self,
		tag: &'t str,
	) -> impl Iterator<Item = &'t ParseNode> + 't
	{
		self.children.iter().filter(move |x| x.tag == tag)
	}

	/// Follow a path of tags such as `header/arguments`, taking the first
	/// matching child at each step.
	pub fn find(&self, path: &str) -> Option<&ParseNode>
	{
		path.split('/')
			.filter(|x| !x.is_empty())
			.try_fold(self, |node, tag| node.child(tag))
	}

	pub fn require(&self, path: &str) -> Result<&ParseNode, Error>
	{
		self.find(path).ok_or_else(|| {
			self.malformed(format!("Expected a '{}' node.", path))
		})
	}

	pub fn require_attribute(&self, key: &str) -> Result<&str, Error>
	{
		self.attribute(key).ok_or_else(|| {
			self.malformed(format!("Expected a '{}' attribute.", key))
		})
	}

	pub fn require_text(&self) -> Result<&str, Error>
	{
		self.text
			.as_deref()
			.ok_or_else(|| self.malformed("Expected text.".to_string()))
	}

	pub fn require_attribute_or_text(&self, key: &str) -> Result<&str, Error>
	{
		self.attribute_or_text(key).ok_or_else(|| {
			self.malformed(format!("Expected a '{}' attribute or text.", key))
		})
	}

	pub fn malformed(&self, expectation: String) -> Error
	{
		Error::MalformedTree {
			tag: self.tag.clone(),
			expectation,
			location: self.location.clone(),
		}
	}

	/// The source lines this node came from, taken from either a `line="N"`
	/// or a `lines="A:B"` attribute.
	pub fn lines(&self) -> Option<(usize, usize)>
	{
		if let Some(lines) = self.attribute("lines")
		{
			let (start, end) = lines.split_once(':')?;
			let start = start.trim().parse().ok()?;
			let end = end.trim().parse().ok()?;
			return Some((start, end));
		}
		let line = self.attribute("line")?.trim().parse().ok()?;
		Some((line, line))
	}

	/// Read a dump. Several top level nodes are gathered under a synthetic
	/// `dump` node; a single one is returned as is.
	pub fn read(text: &str, filename: &str) -> Result<ParseNode, Error>
	{
		let mut reader = Reader::new(text, filename);
		let mut nodes = Vec::new();
		loop
		{
			reader.skip_whitespace();
			match reader.peek()
			{
				None => break,
				Some('(') => nodes.push(reader.read_node()?),
				Some(x) => return Err(reader.unexpected(x)),
			}
		}
		if nodes.len() == 1
		{
			Ok(nodes.remove(0))
		}
		else
		{
			Ok(ParseNode {
				tag: "dump".to_string(),
				children: nodes,
				..ParseNode::default()
			})
		}
	}
}

struct Reader<'a>
{
	filename: &'a str,
	chars: std::iter::Peekable<std::str::CharIndices<'a>>,
	line: usize,
	last_line_start_offset: usize,
	end: usize,
}

impl<'a> Reader<'a>
{
	fn new(text: &'a str, filename: &'a str) -> Reader<'a>
	{
		Reader {
			filename,
			chars: text.char_indices().peekable(),
			line: 1,
			last_line_start_offset: 0,
			end: text.len(),
		}
	}

	fn offset(&mut self) -> usize
	{
		match self.chars.peek()
		{
			Some(&(offset, _)) => offset,
			None => self.end,
		}
	}

	fn location(&mut self, start: usize) -> Location
	{
		let end = self.offset().max(start + 1);
		Location {
			source_filename: self.filename.to_string(),
			span: start..end,
			line_number: self.line,
			line_offset: start.saturating_sub(self.last_line_start_offset) + 1,
		}
	}

	fn peek(&mut self) -> Option<char>
	{
		self.chars.peek().map(|&(_, x)| x)
	}

	fn next(&mut self) -> Option<char>
	{
		let (offset, x) = self.chars.next()?;
		if x == '\n'
		{
			self.line += 1;
			self.last_line_start_offset = offset + 1;
		}
		Some(x)
	}

	fn unexpected(&mut self, character: char) -> Error
	{
		let start = self.offset();
		Error::UnexpectedCharacter {
			character,
			location: self.location(start),
		}
	}

	fn syntax(&mut self, start: usize, expectation: &str) -> Error
	{
		Error::Syntax {
			expectation: expectation.to_string(),
			location: self.location(start),
		}
	}

	fn skip_whitespace(&mut self)
	{
		while let Some(x) = self.peek()
		{
			if x == ';'
			{
				while let Some(y) = self.next()
				{
					if y == '\n'
					{
						break;
					}
				}
			}
			else if x.is_whitespace()
			{
				self.next();
			}
			else
			{
				break;
			}
		}
	}

	fn read_node(&mut self) -> Result<ParseNode, Error>
	{
		let start = self.offset();
		let location = self.location(start);
		self.next();
		self.skip_whitespace();
		let tag = self.read_word();
		if tag.is_empty()
		{
			return Err(self.syntax(start, "Expected a tag after '('."));
		}

		let mut node = ParseNode {
			tag,
			location: Some(location),
			..ParseNode::default()
		};
		loop
		{
			self.skip_whitespace();
			let item_start = self.offset();
			match self.peek()
			{
				Some(')') =>
				{
					self.next();
					return Ok(node);
				}
				Some('(') => node.children.push(self.read_node()?),
				Some('"') =>
				{
					let text = self.read_string()?;
					if node.text.is_some()
					{
						return Err(self.syntax(
							item_start,
							"A node can only have a single text.",
						));
					}
					node.text = Some(text);
				}
				Some(x) if is_word_character(x) =>
				{
					let key = self.read_word();
					if self.peek() != Some('=')
					{
						return Err(self.syntax(
							item_start,
							"Expected '=' after attribute name.",
						));
					}
					self.next();
					let value = match self.peek()
					{
						Some('"') => self.read_string()?,
						_ => self.read_word(),
					};
					node.attributes.push((key, value));
				}
				Some(x) => return Err(self.unexpected(x)),
				None =>
				{
					return Err(self.syntax(start, "Unterminated node."));
				}
			}
		}
	}

	fn read_word(&mut self) -> String
	{
		let mut word = String::new();
		while let Some(x) = self.peek()
		{
			if is_word_character(x)
			{
				word.push(x);
				self.next();
			}
			else
			{
				break;
			}
		}
		word
	}

	fn read_string(&mut self) -> Result<String, Error>
	{
		let start = self.offset();
		self.next();
		let mut value = String::new();
		loop
		{
			match self.next()
			{
				Some('"') => return Ok(value),
				Some('\\') => match self.next()
				{
					Some('n') => value.push('\n'),
					Some(x) => value.push(x),
					None => break,
				},
				Some(x) => value.push(x),
				None => break,
			}
		}
		Err(self.syntax(start, "Unterminated string."))
	}
}

fn is_word_character(x: char) -> bool
{
	match x
	{
		'a'..='z' | 'A'..='Z' | '0'..='9' => true,
		'_' | '-' | '.' | ':' | '%' | '+' | '*' | '/' | '<' | '>' => true,
		_ => false,
	}
}
