//
// Part of weft
// Copyright (c) 2023 Sander in 't Veld
// License: MIT
//

//! Scopes are stored in an arena and referred to by `ScopeId`. A scope links
//! to its parent by id only, so a scope never owns its parent and symbols can
//! refer to scopes without forming ownership cycles.

use crate::types::{SymbolAttributes, TypeDef};

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};

static NEXT_ARENA_ID: AtomicU32 = AtomicU32::new(1);

/// Identifies a scope within the arena that issued it. Every arena has its
/// own tag, so an id carried over from another file never resolves to an
/// unrelated scope. The default id belongs to no arena.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ScopeId
{
	arena: u32,
	index: u32,
}

impl std::fmt::Display for ScopeId
{
	fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result
	{
		write!(f, "#{}:{}", self.arena, self.index)
	}
}

/// A map with case-insensitive keys that remembers insertion order and the
/// spelling used when a key was first inserted.
#[derive(Debug, Clone, PartialEq)]
pub struct SymbolTable<T>
{
	entries: Vec<(String, T)>,
	index: HashMap<String, usize>,
}

impl<T> Default for SymbolTable<T>
{
	fn default() -> Self
	{
		SymbolTable {
			entries: Vec::new(),
			index: HashMap::new(),
		}
	}
}

impl<T> SymbolTable<T>
{
	pub fn new() -> Self
	{
		Self::default()
	}

	pub fn insert(&mut self, name: &str, value: T) -> Option<T>
	{
		let key = name.to_ascii_lowercase();
		match self.index.get(&key)
		{
			Some(&i) => Some(std::mem::replace(&mut self.entries[i].1, value)),
			None =>
			{
				self.index.insert(key, self.entries.len());
				self.entries.push((name.to_string(), value));
				None
			}
		}
	}

	pub fn get(&self, name: &str) -> Option<&T>
	{
		let key = name.to_ascii_lowercase();
		self.index.get(&key).map(|&i| &self.entries[i].1)
	}

	pub fn get_mut(&mut self, name: &str) -> Option<&mut T>
	{
		let key = name.to_ascii_lowercase();
		match self.index.get(&key)
		{
			Some(&i) => Some(&mut self.entries[i].1),
			None => None,
		}
	}

	pub fn contains(&self, name: &str) -> bool
	{
		self.index.contains_key(&name.to_ascii_lowercase())
	}

	pub fn remove(&mut self, name: &str) -> Option<T>
	{
		let key = name.to_ascii_lowercase();
		let i = self.index.remove(&key)?;
		let (_, value) = self.entries.remove(i);
		for position in self.index.values_mut()
		{
			if *position > i
			{
				*position -= 1;
			}
		}
		Some(value)
	}

	pub fn iter(&self) -> impl Iterator<Item = (&str, &T)>
	{
		self.entries.iter().map(|(name, value)| (name.as_str(), value))
	}

	pub fn len(&self) -> usize
	{
		self.entries.len()
	}

	pub fn is_empty(&self) -> bool
	{
		self.entries.is_empty()
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind
{
	Subroutine,
	Function,
	Module,
}

/// The entity a scope belongs to, recorded when that entity is constructed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityRef
{
	pub kind: EntityKind,
	pub name: String,
}

#[derive(Debug, Clone, Default)]
pub struct Scope
{
	parent: Option<ScopeId>,
	pub symbols: SymbolTable<SymbolAttributes>,
	pub types: SymbolTable<TypeDef>,
	defined_by: Option<EntityRef>,
}

impl Scope
{
	pub fn parent(&self) -> Option<ScopeId>
	{
		self.parent
	}

	pub fn defined_by(&self) -> Option<&EntityRef>
	{
		self.defined_by.as_ref()
	}
}

#[derive(Debug, Clone)]
pub struct Scopes
{
	arena: u32,
	scopes: Vec<Scope>,
}

impl Default for Scopes
{
	fn default() -> Scopes
	{
		Scopes {
			arena: NEXT_ARENA_ID.fetch_add(1, Ordering::Relaxed),
			scopes: Vec::new(),
		}
	}
}

impl Scopes
{
	pub fn new() -> Scopes
	{
		Scopes::default()
	}

	pub fn create(&mut self, parent: Option<ScopeId>) -> ScopeId
	{
		let id = ScopeId {
			arena: self.arena,
			index: self.scopes.len() as u32,
		};
		self.scopes.push(Scope {
			parent,
			..Scope::default()
		});
		id
	}

	/// Create a new scope with a copy of the symbol and type tables of an
	/// existing scope, but without its defining entity.
	pub fn duplicate(
		&mut self,
		original: ScopeId,
		parent: Option<ScopeId>,
	) -> ScopeId
	{
		let (symbols, types) = match self.get(original)
		{
			Some(scope) => (scope.symbols.clone(), scope.types.clone()),
			None => (SymbolTable::new(), SymbolTable::new()),
		};
		let id = self.create(parent);
		if let Some(scope) = self.get_mut(id)
		{
			scope.symbols = symbols;
			scope.types = types;
		}
		id
	}

	/// Ids issued by another arena are not found.
	pub fn get(&self, id: ScopeId) -> Option<&Scope>
	{
		if id.arena != self.arena
		{
			return None;
		}
		self.scopes.get(id.index as usize)
	}

	pub fn get_mut(&mut self, id: ScopeId) -> Option<&mut Scope>
	{
		if id.arena != self.arena
		{
			return None;
		}
		self.scopes.get_mut(id.index as usize)
	}

	/// Whether this arena issued the given id.
	pub fn contains(&self, id: ScopeId) -> bool
	{
		self.get(id).is_some()
	}

	pub fn len(&self) -> usize
	{
		self.scopes.len()
	}

	pub fn is_empty(&self) -> bool
	{
		self.scopes.is_empty()
	}

	pub fn parent(&self, id: ScopeId) -> Option<ScopeId>
	{
		self.get(id).and_then(|scope| scope.parent)
	}

	/// The scope itself followed by its parent, grandparent and so on.
	pub fn ancestors(&self, id: ScopeId) -> Vec<ScopeId>
	{
		let mut hierarchy = Vec::new();
		let mut current = self.get(id).map(|_| id);
		while let Some(scope) = current
		{
			if hierarchy.contains(&scope)
			{
				break;
			}
			hierarchy.push(scope);
			current = self.parent(scope);
		}
		hierarchy
	}

	pub fn set_defined_by(&mut self, id: ScopeId, entity: EntityRef)
	{
		if let Some(scope) = self.get_mut(id)
		{
			scope.defined_by = Some(entity);
		}
	}

	pub fn defined_by(&self, id: ScopeId) -> Option<&EntityRef>
	{
		self.get(id).and_then(|scope| scope.defined_by())
	}

	/// Register or overwrite a binding in the local table of a scope.
	pub fn declare(
		&mut self,
		id: ScopeId,
		name: &str,
		attributes: SymbolAttributes,
	)
	{
		if let Some(scope) = self.get_mut(id)
		{
			scope.symbols.insert(name, attributes);
		}
	}

	pub fn declare_type(&mut self, id: ScopeId, typedef: TypeDef)
	{
		if let Some(scope) = self.get_mut(id)
		{
			let name = typedef.name.clone();
			scope.types.insert(&name, typedef);
		}
	}

	/// Look up the attributes of a name. A derived type member such as
	/// `a%b` resolves `a` first and then the member `b` of its type.
	pub fn lookup(
		&self,
		id: ScopeId,
		name: &str,
		recursive: bool,
	) -> Option<SymbolAttributes>
	{
		if let Some((parent_name, member)) = name.rsplit_once('%')
		{
			let parent = self.lookup(id, parent_name, recursive)?;
			return match parent.dtype
			{
				crate::types::DataType::Derived { name: type_name } => self
					.lookup_type(id, &type_name, true)
					.and_then(|typedef| typedef.member(member))
					.cloned(),
				_ => None,
			};
		}

		let scope = self.get(id)?;
		match scope.symbols.get(name)
		{
			Some(attributes) => Some(attributes.clone()),
			None if recursive => match scope.parent
			{
				Some(parent) => self.lookup(parent, name, true),
				None => None,
			},
			None => None,
		}
	}

	pub fn lookup_type(
		&self,
		id: ScopeId,
		name: &str,
		recursive: bool,
	) -> Option<&TypeDef>
	{
		let scope = self.get(id)?;
		match scope.types.get(name)
		{
			Some(typedef) => Some(typedef),
			None if recursive => match scope.parent
			{
				Some(parent) => self.lookup_type(parent, name, true),
				None => None,
			},
			None => None,
		}
	}
}
