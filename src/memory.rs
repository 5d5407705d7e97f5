//! A headless, in-memory presentation tree.
//!
//! [`Document`] implements [`Platform`] over an arena of nodes, counts every mutation in [`Stats`]
//! and can [`dispatch`](`Document::dispatch`) events to registered handlers, which makes it suitable
//! for tests and one-off rendering to [`markup`](`Document::markup`).
//!
//! Nodes are never freed. Detached and replaced nodes stay addressable through their [`NodeId`]
//! until the [`Document`] is dropped, so a long-lived document grows with every replacement
//! (see [`Document::node_count`]).

use crate::{is_text_input, Event, Handler, Platform};
use core::{
	cell::RefCell,
	fmt::{self, Debug, Formatter, Write as _},
};
use std::rc::Rc;
use thiserror::Error;
use tracing::{trace, trace_span};

/// A handle to a node of a [`Document`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

/// Mutation counts, since creation or the last [`Document::reset_stats`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Stats {
	pub elements_created: usize,
	pub texts_created: usize,
	pub attributes_set: usize,
	pub attributes_removed: usize,
	pub field_values_set: usize,
	pub listeners_added: usize,
	pub listeners_removed: usize,
	pub children_appended: usize,
	pub children_replaced: usize,
	pub children_removed: usize,
	pub texts_updated: usize,
}

impl Stats {
	/// Sum of all attribute, field value and listener changes.
	#[must_use]
	pub fn prop_mutations(&self) -> usize {
		self.attributes_set + self.attributes_removed + self.field_values_set + self.listeners_added + self.listeners_removed
	}
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomError {
	#[error("invalid tag name {0:?}")]
	InvalidTagName(String),
	#[error("{0:?} does not exist")]
	UnknownNode(NodeId),
	#[error("{0:?} is not an element")]
	NotAnElement(NodeId),
	#[error("{0:?} is not a text node")]
	NotAText(NodeId),
	#[error("{child:?} is not a child of {parent:?}")]
	NotAChild { parent: NodeId, child: NodeId },
	#[error("inserting {child:?} into {parent:?} would create a cycle")]
	Cycle { parent: NodeId, child: NodeId },
}

#[derive(Debug)]
enum Data {
	Element {
		tag: String,
		attributes: Vec<(String, String)>,
		field_value: Option<String>,
		listeners: Vec<(String, Handler)>,
	},
	Text(String),
}

#[derive(Debug)]
struct Entry {
	data: Data,
	parent: Option<NodeId>,
	children: Vec<NodeId>,
}

#[derive(Debug, Default)]
struct Arena {
	entries: Vec<Entry>,
	stats: Stats,
}

impl Arena {
	fn entry(&self, id: NodeId) -> Result<&Entry, DomError> {
		self.entries.get(id.0).ok_or(DomError::UnknownNode(id))
	}

	fn entry_mut(&mut self, id: NodeId) -> Result<&mut Entry, DomError> {
		self.entries.get_mut(id.0).ok_or(DomError::UnknownNode(id))
	}

	fn push(&mut self, data: Data) -> NodeId {
		self.entries.push(Entry {
			data,
			parent: None,
			children: Vec::new(),
		});
		NodeId(self.entries.len() - 1)
	}

	fn element_mut(&mut self, id: NodeId) -> Result<(&mut Vec<(String, String)>, &mut Option<String>, &mut Vec<(String, Handler)>), DomError> {
		match &mut self.entry_mut(id)?.data {
			Data::Element {
				attributes,
				field_value,
				listeners,
				..
			} => Ok((attributes, field_value, listeners)),
			Data::Text(_) => Err(DomError::NotAnElement(id)),
		}
	}

	/// Detaches `child` from its current parent, if any.
	fn detach(&mut self, child: NodeId) -> Result<(), DomError> {
		if let Some(parent) = self.entry_mut(child)?.parent.take() {
			self.entry_mut(parent)?.children.retain(|&c| c != child);
		}
		Ok(())
	}

	fn check_insertable(&self, parent: NodeId, child: NodeId) -> Result<(), DomError> {
		if let Data::Text(_) = self.entry(parent)?.data {
			return Err(DomError::NotAnElement(parent));
		}
		self.entry(child)?;
		let mut ancestor = Some(parent);
		while let Some(a) = ancestor {
			if a == child {
				return Err(DomError::Cycle { parent, child });
			}
			ancestor = self.entry(a)?.parent;
		}
		Ok(())
	}
}

/// A cheaply cloneable handle to a shared in-memory tree.
#[derive(Clone, Default)]
pub struct Document(Rc<RefCell<Arena>>);

impl Document {
	#[must_use]
	pub fn new() -> Self {
		Self::default()
	}

	/// Creates a detached element to mount into, without counting it in [`Stats`].
	///
	/// # Errors
	///
	/// Iff `tag` is not a valid tag name.
	pub fn create_root(&self, tag: &str) -> Result<NodeId, DomError> {
		validate_tag(tag)?;
		Ok(self.0.borrow_mut().push(Data::Element {
			tag: tag.to_owned(),
			attributes: Vec::new(),
			field_value: None,
			listeners: Vec::new(),
		}))
	}

	/// The number of nodes created so far, including detached ones and roots.
	#[must_use]
	pub fn node_count(&self) -> usize {
		self.0.borrow().entries.len()
	}

	#[must_use]
	pub fn stats(&self) -> Stats {
		self.0.borrow().stats
	}

	pub fn reset_stats(&self) {
		self.0.borrow_mut().stats = Stats::default()
	}

	#[must_use]
	pub fn tag(&self, node: NodeId) -> Option<String> {
		match &self.0.borrow().entry(node).ok()?.data {
			Data::Element { tag, .. } => Some(tag.clone()),
			Data::Text(_) => None,
		}
	}

	#[must_use]
	pub fn attribute(&self, node: NodeId, name: &str) -> Option<String> {
		match &self.0.borrow().entry(node).ok()?.data {
			Data::Element { attributes, .. } => attributes.iter().find(|(n, _)| n == name).map(|(_, v)| v.clone()),
			Data::Text(_) => None,
		}
	}

	#[must_use]
	pub fn field_value(&self, node: NodeId) -> Option<String> {
		match &self.0.borrow().entry(node).ok()?.data {
			Data::Element { field_value, .. } => field_value.clone(),
			Data::Text(_) => None,
		}
	}

	/// The data of a text node.
	#[must_use]
	pub fn text(&self, node: NodeId) -> Option<String> {
		match &self.0.borrow().entry(node).ok()?.data {
			Data::Text(text) => Some(text.clone()),
			Data::Element { .. } => None,
		}
	}

	/// Concatenated text of `node` and all its descendants.
	#[must_use]
	pub fn text_content(&self, node: NodeId) -> String {
		fn collect(arena: &Arena, node: NodeId, text: &mut String) {
			if let Ok(entry) = arena.entry(node) {
				match &entry.data {
					Data::Text(data) => text.push_str(data),
					Data::Element { .. } => {
						for &child in &entry.children {
							collect(arena, child, text)
						}
					}
				}
			}
		}

		let mut text = String::new();
		collect(&self.0.borrow(), node, &mut text);
		text
	}

	#[must_use]
	pub fn children(&self, node: NodeId) -> Vec<NodeId> {
		self.0.borrow().entry(node).map(|entry| entry.children.clone()).unwrap_or_default()
	}

	#[must_use]
	pub fn parent(&self, node: NodeId) -> Option<NodeId> {
		self.0.borrow().entry(node).ok()?.parent
	}

	#[must_use]
	pub fn listener_count(&self, node: NodeId, event: &str) -> usize {
		match self.0.borrow().entry(node).map(|entry| &entry.data) {
			Ok(Data::Element { listeners, .. }) => listeners.iter().filter(|(e, _)| e == event).count(),
			_ => 0,
		}
	}

	/// Descendants of `root` (including itself) with the given tag, in document order.
	#[must_use]
	pub fn find_all(&self, root: NodeId, tag: &str) -> Vec<NodeId> {
		fn visit(arena: &Arena, node: NodeId, tag: &str, found: &mut Vec<NodeId>) {
			if let Ok(entry) = arena.entry(node) {
				if let Data::Element { tag: t, .. } = &entry.data {
					if t.eq_ignore_ascii_case(tag) {
						found.push(node)
					}
				}
				for &child in &entry.children {
					visit(arena, child, tag, found)
				}
			}
		}

		let mut found = Vec::new();
		visit(&self.0.borrow(), root, tag, &mut found);
		found
	}

	/// Invokes the handlers registered on `node` for `event.name`, in registration order.
	///
	/// No borrow of the document is held while handlers run, so they may freely re-render into it.
	/// Returns the number of handlers invoked.
	pub fn dispatch(&self, node: NodeId, event: &Event) -> usize {
		let span = trace_span!("Dispatching", ?node, event = %event.name);
		let _enter = span.enter();

		let handlers: Vec<Handler> = match self.0.borrow().entry(node).map(|entry| &entry.data) {
			Ok(Data::Element { listeners, .. }) => listeners.iter().filter(|(e, _)| *e == event.name).map(|(_, h)| h.clone()).collect(),
			_ => Vec::new(),
		};
		for handler in &handlers {
			handler.call(event)
		}
		trace!("Invoked {} handler(s).", handlers.len());
		handlers.len()
	}

	/// Simulates typing: sets the field value of `node`, then dispatches an `input` event carrying it.
	///
	/// # Errors
	///
	/// Iff `node` is not an element.
	pub fn input(&self, node: NodeId, value: &str) -> Result<usize, DomError> {
		*self.0.borrow_mut().element_mut(node)?.1 = Some(value.to_owned());
		Ok(self.dispatch(node, &Event::new("input").with_value(value)))
	}

	/// Serializes `node` as HTML-like markup, for inspection.
	#[must_use]
	pub fn markup(&self, node: NodeId) -> String {
		fn write(arena: &Arena, node: NodeId, out: &mut String) -> fmt::Result {
			let entry = match arena.entry(node) {
				Ok(entry) => entry,
				Err(_) => return Ok(()),
			};
			match &entry.data {
				Data::Text(text) => out.write_str(text),
				Data::Element {
					tag,
					attributes,
					field_value,
					listeners,
				} => {
					write!(out, "<{}", tag)?;
					for (name, value) in attributes {
						write!(out, " {}={:?}", name, value)?;
					}
					if let Some(field_value) = field_value {
						write!(out, " .value={:?}", field_value)?;
					}
					for (event, _) in listeners {
						write!(out, " @{}", event)?;
					}
					out.write_char('>')?;
					for &child in &entry.children {
						write(arena, child, out)?;
					}
					write!(out, "</{}>", tag)
				}
			}
		}

		let mut out = String::new();
		// Writing to a `String` can't fail.
		let _ = write(&self.0.borrow(), node, &mut out);
		out
	}
}

impl Debug for Document {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		let arena = self.0.borrow();
		f.debug_struct("Document")
			.field("nodes", &arena.entries.len())
			.field("stats", &arena.stats)
			.finish()
	}
}

fn validate_tag(tag: &str) -> Result<(), DomError> {
	if tag.is_empty() || !tag.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == ':') || !tag.starts_with(|c: char| c.is_ascii_alphabetic()) {
		Err(DomError::InvalidTagName(tag.to_owned()))
	} else {
		Ok(())
	}
}

impl Platform for Document {
	type Node = NodeId;
	type Error = DomError;

	fn create_element(&self, tag: &str) -> Result<NodeId, DomError> {
		validate_tag(tag)?;
		let mut arena = self.0.borrow_mut();
		arena.stats.elements_created += 1;
		Ok(arena.push(Data::Element {
			tag: tag.to_owned(),
			attributes: Vec::new(),
			field_value: None,
			listeners: Vec::new(),
		}))
	}

	fn create_text(&self, text: &str) -> Result<NodeId, DomError> {
		let mut arena = self.0.borrow_mut();
		arena.stats.texts_created += 1;
		Ok(arena.push(Data::Text(text.to_owned())))
	}

	fn set_attribute(&self, node: &NodeId, name: &str, value: &str) -> Result<(), DomError> {
		let mut arena = self.0.borrow_mut();
		let (attributes, _, _) = arena.element_mut(*node)?;
		match attributes.iter_mut().find(|(n, _)| n == name) {
			Some((_, v)) => value.clone_into(v),
			None => attributes.push((name.to_owned(), value.to_owned())),
		}
		arena.stats.attributes_set += 1;
		Ok(())
	}

	fn remove_attribute(&self, node: &NodeId, name: &str) -> Result<(), DomError> {
		let mut arena = self.0.borrow_mut();
		let (attributes, _, _) = arena.element_mut(*node)?;
		let before = attributes.len();
		attributes.retain(|(n, _)| n != name);
		if attributes.len() != before {
			arena.stats.attributes_removed += 1;
		}
		Ok(())
	}

	fn set_field_value(&self, node: &NodeId, value: &str) -> Result<(), DomError> {
		let mut arena = self.0.borrow_mut();
		let tag = match &arena.entry(*node)?.data {
			Data::Element { tag, .. } => tag.clone(),
			Data::Text(_) => return Err(DomError::NotAnElement(*node)),
		};
		let (attributes, field_value, _) = arena.element_mut(*node)?;
		if is_text_input(&tag) {
			*field_value = Some(value.to_owned());
			arena.stats.field_values_set += 1;
		} else {
			match attributes.iter_mut().find(|(n, _)| n == "value") {
				Some((_, v)) => value.clone_into(v),
				None => attributes.push(("value".to_owned(), value.to_owned())),
			}
			arena.stats.attributes_set += 1;
		}
		Ok(())
	}

	fn add_listener(&self, node: &NodeId, event: &str, handler: &Handler) -> Result<(), DomError> {
		let mut arena = self.0.borrow_mut();
		let (_, _, listeners) = arena.element_mut(*node)?;
		// Like the DOM, ignore exact duplicates.
		if !listeners.iter().any(|(e, h)| e == event && h == handler) {
			listeners.push((event.to_owned(), handler.clone()));
			arena.stats.listeners_added += 1;
		}
		Ok(())
	}

	fn remove_listener(&self, node: &NodeId, event: &str, handler: &Handler) -> Result<(), DomError> {
		let mut arena = self.0.borrow_mut();
		let (_, _, listeners) = arena.element_mut(*node)?;
		if let Some(position) = listeners.iter().position(|(e, h)| e == event && h == handler) {
			listeners.remove(position);
			arena.stats.listeners_removed += 1;
		}
		Ok(())
	}

	fn append_child(&self, parent: &NodeId, child: &NodeId) -> Result<(), DomError> {
		let mut arena = self.0.borrow_mut();
		arena.check_insertable(*parent, *child)?;
		arena.detach(*child)?;
		arena.entry_mut(*parent)?.children.push(*child);
		arena.entry_mut(*child)?.parent = Some(*parent);
		arena.stats.children_appended += 1;
		Ok(())
	}

	fn replace_child(&self, parent: &NodeId, new_child: &NodeId, old_child: &NodeId) -> Result<(), DomError> {
		let mut arena = self.0.borrow_mut();
		if arena.entry(*old_child)?.parent != Some(*parent) {
			return Err(DomError::NotAChild {
				parent: *parent,
				child: *old_child,
			});
		}
		if new_child == old_child {
			return Ok(());
		}
		arena.check_insertable(*parent, *new_child)?;
		arena.detach(*new_child)?;

		let children = &mut arena.entry_mut(*parent)?.children;
		let position = children.iter().position(|c| c == old_child).ok_or(DomError::NotAChild {
			parent: *parent,
			child: *old_child,
		})?;
		children[position] = *new_child;
		arena.entry_mut(*old_child)?.parent = None;
		arena.entry_mut(*new_child)?.parent = Some(*parent);
		arena.stats.children_replaced += 1;
		Ok(())
	}

	fn remove_child(&self, parent: &NodeId, child: &NodeId) -> Result<(), DomError> {
		let mut arena = self.0.borrow_mut();
		if arena.entry(*child)?.parent != Some(*parent) {
			return Err(DomError::NotAChild {
				parent: *parent,
				child: *child,
			});
		}
		arena.detach(*child)?;
		arena.stats.children_removed += 1;
		Ok(())
	}

	fn child_at(&self, parent: &NodeId, index: usize) -> Option<NodeId> {
		self.0.borrow().entry(*parent).ok()?.children.get(index).copied()
	}

	fn set_text(&self, node: &NodeId, text: &str) -> Result<(), DomError> {
		let mut arena = self.0.borrow_mut();
		match &mut arena.entry_mut(*node)?.data {
			Data::Text(data) => text.clone_into(data),
			Data::Element { .. } => return Err(DomError::NotAText(*node)),
		}
		arena.stats.texts_updated += 1;
		Ok(())
	}
}
