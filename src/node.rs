//! Description trees, as returned by render functions.
//!
//! A [`Node`] tree is rebuilt from scratch on every render pass and never mutated afterwards.
//! Function components are expanded by [`build`] and don't appear in it.

use crate::{platform::is_text_input, state::Scope};
use core::{
	fmt::{self, Debug, Formatter},
	hash::{Hash, Hasher},
};
use std::{borrow::Cow, rc::Rc};
use tracing::{trace, trace_span};

/// One unit of described presentation.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
	Element(Element),
	Text(String),
}

impl Node {
	/// The element's tag, or [`None`] for text.
	#[must_use]
	pub fn tag(&self) -> Option<&str> {
		match self {
			Node::Element(element) => Some(element.tag.as_ref()),
			Node::Text(_) => None,
		}
	}

	#[must_use]
	pub fn as_element(&self) -> Option<&Element> {
		match self {
			Node::Element(element) => Some(element),
			Node::Text(_) => None,
		}
	}

	/// Whether the reconciler may patch a live node described by `other` into one described by `self`.
	#[must_use]
	pub fn same_kind(&self, other: &Node) -> bool {
		match (self, other) {
			(Node::Element(a), Node::Element(b)) => a.tag == b.tag,
			(Node::Text(_), Node::Text(_)) => true,
			_ => false,
		}
	}
}

#[derive(Debug, Clone, PartialEq)]
pub struct Element {
	pub tag: Cow<'static, str>,
	/// At most one prop per key. [`element`] keeps the last of any duplicates.
	pub props: Vec<Prop>,
	/// Always flat.
	pub children: Vec<Node>,
}

/// A property, resolved once while the tree is built.
#[derive(Debug, Clone, PartialEq)]
pub enum Prop {
	Attribute { name: Cow<'static, str>, value: String },
	Event { event: Cow<'static, str>, handler: Handler },
	/// The live field value of text inputs. Other elements receive it as `value` attribute.
	Value(String),
}

/// What a prop writes to on the live node, to match props across passes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum PropKey<'a> {
	Attribute(&'a str),
	Event(&'a str),
	Value,
}

impl Prop {
	/// Resolves a conventionally named property.
	///
	/// Handlers named `on…` bind the lowercased remainder as event (`onClick` listens for `click`),
	/// `value` is the controlled field value and anything else becomes an attribute.
	#[must_use]
	pub fn named(name: &str, value: impl Into<PropValue>) -> Self {
		match (name, value.into()) {
			(name, PropValue::Handler(handler)) if name.starts_with("on") => Prop::Event {
				event: name["on".len()..].to_lowercase().into(),
				handler,
			},
			("value", PropValue::Text(value)) => Prop::Value(value),
			(name, PropValue::Text(value)) => Prop::Attribute {
				name: name.to_owned().into(),
				value,
			},
			(name, PropValue::Handler(handler)) => Prop::Attribute {
				name: name.to_owned().into(),
				value: format!("{:?}", handler),
			},
		}
	}

	/// Outside of text inputs, [`Prop::Value`] writes the `value` attribute and shares its key.
	pub(crate) fn key(&self, tag: &str) -> PropKey<'_> {
		match self {
			Prop::Attribute { name, .. } => PropKey::Attribute(name),
			Prop::Event { event, .. } => PropKey::Event(event),
			Prop::Value(_) if is_text_input(tag) => PropKey::Value,
			Prop::Value(_) => PropKey::Attribute("value"),
		}
	}
}

/// Untyped input to [`Prop::named`].
#[derive(Debug, Clone)]
pub enum PropValue {
	Text(String),
	Handler(Handler),
}

impl From<&str> for PropValue {
	fn from(text: &str) -> Self {
		PropValue::Text(text.to_owned())
	}
}

impl From<String> for PropValue {
	fn from(text: String) -> Self {
		PropValue::Text(text)
	}
}

impl From<Handler> for PropValue {
	fn from(handler: Handler) -> Self {
		PropValue::Handler(handler)
	}
}

#[must_use]
pub fn attr(name: impl Into<Cow<'static, str>>, value: impl ToString) -> Prop {
	Prop::Attribute {
		name: name.into(),
		value: value.to_string(),
	}
}

#[must_use]
pub fn on(event: impl Into<Cow<'static, str>>, handler: impl 'static + Fn(&Event)) -> Prop {
	Prop::Event {
		event: event.into(),
		handler: Handler::new(handler),
	}
}

/// Binds an existing handler, so that its identity can be kept across passes.
#[must_use]
pub fn on_handler(event: impl Into<Cow<'static, str>>, handler: &Handler) -> Prop {
	Prop::Event {
		event: event.into(),
		handler: handler.clone(),
	}
}

#[must_use]
pub fn value(value: impl ToString) -> Prop {
	Prop::Value(value.to_string())
}

/// An event callback.
///
/// Equality and hashing use the identity of the shared allocation, never the behaviour:
/// two separately created handlers are always different, clones of one handler are always equal.
#[derive(Clone)]
pub struct Handler(Rc<dyn Fn(&Event)>);

impl Handler {
	pub fn new(f: impl 'static + Fn(&Event)) -> Self {
		Self(Rc::new(f))
	}

	pub fn call(&self, event: &Event) {
		(self.0)(event)
	}

	fn address(&self) -> usize {
		Rc::as_ptr(&self.0).cast::<()>() as usize
	}
}

impl PartialEq for Handler {
	fn eq(&self, other: &Self) -> bool {
		self.address() == other.address()
	}
}
impl Eq for Handler {}

impl Hash for Handler {
	fn hash<H: Hasher>(&self, state: &mut H) {
		self.address().hash(state)
	}
}

impl Debug for Handler {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		write!(f, "Handler({:#x})", self.address())
	}
}

/// What a platform passes to a [`Handler`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
	pub name: String,
	/// The target's field value, if the target is a text input.
	pub value: Option<String>,
}

impl Event {
	#[must_use]
	pub fn new(name: impl Into<String>) -> Self {
		Self {
			name: name.into(),
			value: None,
		}
	}

	#[must_use]
	pub fn with_value(self, value: impl Into<String>) -> Self {
		Self {
			value: Some(value.into()),
			..self
		}
	}
}

/// A child argument, before flattening.
#[derive(Debug, Clone, PartialEq)]
pub enum Child {
	Node(Node),
	Many(Vec<Child>),
}

impl Child {
	fn flatten_into(self, flat: &mut Vec<Node>) {
		match self {
			Child::Node(node) => flat.push(node),
			Child::Many(children) => {
				for child in children {
					child.flatten_into(flat)
				}
			}
		}
	}
}

pub(crate) fn flatten(children: Vec<Child>) -> Vec<Node> {
	let mut flat = Vec::with_capacity(children.len());
	for child in children {
		child.flatten_into(&mut flat)
	}
	flat
}

impl From<Node> for Child {
	fn from(node: Node) -> Self {
		Child::Node(node)
	}
}

impl From<Element> for Child {
	fn from(element: Element) -> Self {
		Child::Node(Node::Element(element))
	}
}

impl From<&str> for Child {
	fn from(text: &str) -> Self {
		Child::Node(Node::Text(text.to_owned()))
	}
}

impl From<&String> for Child {
	fn from(text: &String) -> Self {
		Child::Node(Node::Text(text.clone()))
	}
}

impl From<String> for Child {
	fn from(text: String) -> Self {
		Child::Node(Node::Text(text))
	}
}

impl<T: Into<Child>> From<Vec<T>> for Child {
	fn from(children: Vec<T>) -> Self {
		Child::Many(children.into_iter().map(Into::into).collect())
	}
}

impl<T: Into<Child>> From<Option<T>> for Child {
	fn from(child: Option<T>) -> Self {
		match child {
			Some(child) => child.into(),
			None => Child::Many(Vec::new()),
		}
	}
}

macro_rules! primitive_children {
	($($primitive:ty),*$(,)?) => {$(
		impl From<$primitive> for Child {
			fn from(primitive: $primitive) -> Self {
				Child::Node(Node::Text(primitive.to_string()))
			}
		}
	)*};
}
primitive_children!(bool, char, i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize, f32, f64);

/// Collects heterogeneous child arguments into a `Vec<Child>`.
#[macro_export]
macro_rules! children {
	($($child:expr),*$(,)?) => {
		::std::vec![$($crate::Child::from($child)),*]
	};
}

pub type Component<'k> = &'k dyn Fn(&mut Scope<'_>, Props) -> Node;

/// What [`build`] creates.
pub enum Kind<'k> {
	Tag(Cow<'static, str>),
	Component(Component<'k>),
}

impl From<&'static str> for Kind<'_> {
	fn from(tag: &'static str) -> Self {
		Kind::Tag(tag.into())
	}
}

impl From<String> for Kind<'_> {
	fn from(tag: String) -> Self {
		Kind::Tag(tag.into())
	}
}

impl Debug for Kind<'_> {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		match self {
			Kind::Tag(tag) => f.debug_tuple("Tag").field(tag).finish(),
			Kind::Component(component) => f.debug_tuple("Component").field(&(*component as *const _ as *const ())).finish(),
		}
	}
}

/// The arguments a component is invoked with.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Props {
	pub props: Vec<Prop>,
	/// Already flattened.
	pub children: Vec<Node>,
}

impl Props {
	#[must_use]
	pub fn attribute(&self, name: &str) -> Option<&str> {
		self.props.iter().find_map(|prop| match prop {
			Prop::Attribute { name: n, value } if n == name => Some(value.as_str()),
			_ => None,
		})
	}

	#[must_use]
	pub fn handler(&self, event: &str) -> Option<&Handler> {
		self.props.iter().find_map(|prop| match prop {
			Prop::Event { event: e, handler } if e == event => Some(handler),
			_ => None,
		})
	}
}

/// Builds a description node.
///
/// Components are called right away with the flattened children and their result is returned as-is.
pub fn build<'k>(scope: &mut Scope<'_>, kind: impl Into<Kind<'k>>, props: Vec<Prop>, children: Vec<Child>) -> Node {
	match kind.into() {
		Kind::Component(component) => {
			let span = trace_span!("Expanding component", props = props.len(), children = children.len());
			let _enter = span.enter();
			component(
				scope,
				Props {
					props,
					children: flatten(children),
				},
			)
		}
		Kind::Tag(tag) => element(tag, props, children),
	}
}

/// Builds an element without a [`Scope`], for trees that contain no components.
///
/// Of several props writing to the same attribute, field value or event, the last one wins.
/// It takes the place of the first.
#[must_use]
pub fn element(tag: impl Into<Cow<'static, str>>, props: Vec<Prop>, children: Vec<Child>) -> Node {
	let tag = tag.into();
	Node::Element(Element {
		props: dedup_props(&tag, props),
		tag,
		children: flatten(children),
	})
}

fn dedup_props(tag: &str, props: Vec<Prop>) -> Vec<Prop> {
	let mut deduped: Vec<Prop> = Vec::with_capacity(props.len());
	for prop in props {
		match deduped.iter().position(|kept| kept.key(tag) == prop.key(tag)) {
			Some(i) => {
				trace!(key = ?prop.key(tag), "Overriding duplicate prop.");
				deduped[i] = prop;
			}
			None => deduped.push(prop),
		}
	}
	deduped
}

#[must_use]
pub fn text(text: impl ToString) -> Node {
	Node::Text(text.to_string())
}
