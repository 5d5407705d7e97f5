//! The browser DOM as [`Platform`].

use crate::{rc_hash_map::RcHashMap, Event, Handler, Platform};
use core::cell::RefCell;
use js_sys::Function;
use tracing::{instrument, trace, warn};
use wasm_bindgen::{closure::Closure, JsCast, JsValue};
use web_sys::{Document, HtmlInputElement, HtmlTextAreaElement, Node};

/// Drives a [`web_sys::Document`].
///
/// Each distinct [`Handler`] is wrapped into one JavaScript function, shared by all elements it's bound to.
/// These functions are reference-counted per [`WebPlatform`] instance, so removals find the exact function added earlier.
/// Once unused, they are handed over to the JavaScript garbage collector,
/// which keeps them alive while the event that removed them is still being dispatched.
#[derive(Debug)]
pub struct WebPlatform {
	document: Document,
	listeners: RefCell<RcHashMap<Handler, u16, Function>>,
}

impl WebPlatform {
	#[must_use]
	#[instrument]
	pub fn new(document: Document) -> Self {
		Self {
			document,
			listeners: RefCell::default(),
		}
	}

	#[must_use]
	pub fn document(&self) -> &Document {
		&self.document
	}

	/// The number of distinct handlers currently bound through this instance.
	#[must_use]
	pub fn handler_count(&self) -> usize {
		self.listeners.borrow().len()
	}

	fn get_or_create_listener(&self, handler: &Handler) -> Result<Function, JsValue> {
		self.listeners
			.borrow_mut()
			.increment_or_insert_with(handler.clone(), |handler| {
				let handler = handler.clone();
				trace!(?handler, "Created listener function.");
				Closure::wrap(Box::new(move |event: web_sys::Event| handler.call(&convert_event(&event))) as Box<dyn Fn(web_sys::Event)>)
					.into_js_value()
					.unchecked_into::<Function>()
			})
			.map(|function| function.clone())
			.map_err(|_| JsValue::from_str("sapling: Too many (more than 65k) active bindings of the same `Handler`"))
	}
}

fn convert_event(event: &web_sys::Event) -> Event {
	let value = event.target().and_then(|target| {
		target
			.dyn_ref::<HtmlInputElement>()
			.map(HtmlInputElement::value)
			.or_else(|| target.dyn_ref::<HtmlTextAreaElement>().map(HtmlTextAreaElement::value))
	});
	Event { name: event.type_(), value }
}

fn as_element(node: &Node) -> Result<&web_sys::Element, JsValue> {
	node.dyn_ref::<web_sys::Element>()
		.ok_or_else(|| JsValue::from_str("sapling: Expected an element."))
}

impl Platform for WebPlatform {
	type Node = Node;
	type Error = JsValue;

	fn create_element(&self, tag: &str) -> Result<Node, JsValue> {
		Ok(self.document.create_element(tag)?.into())
	}

	fn create_text(&self, text: &str) -> Result<Node, JsValue> {
		Ok(self.document.create_text_node(text).into())
	}

	fn set_attribute(&self, node: &Node, name: &str, value: &str) -> Result<(), JsValue> {
		as_element(node)?.set_attribute(name, value)
	}

	fn remove_attribute(&self, node: &Node, name: &str) -> Result<(), JsValue> {
		as_element(node)?.remove_attribute(name)
	}

	fn set_field_value(&self, node: &Node, value: &str) -> Result<(), JsValue> {
		if let Some(input) = node.dyn_ref::<HtmlInputElement>() {
			input.set_value(value);
			Ok(())
		} else if let Some(text_area) = node.dyn_ref::<HtmlTextAreaElement>() {
			text_area.set_value(value);
			Ok(())
		} else {
			as_element(node)?.set_attribute("value", value)
		}
	}

	fn add_listener(&self, node: &Node, event: &str, handler: &Handler) -> Result<(), JsValue> {
		let function = self.get_or_create_listener(handler)?;
		node.add_event_listener_with_callback(event, &function)
	}

	fn remove_listener(&self, node: &Node, event: &str, handler: &Handler) -> Result<(), JsValue> {
		let function = match self.listeners.borrow_mut().weak_decrement(handler) {
			Ok(Some(function)) => function.clone(),
			Ok(None) => {
				warn!(?handler, "Tried to remove a listener that was never added. Ignoring.");
				return Ok(());
			}
			Err(_) => return Err(JsValue::from_str("sapling: Tried to remove a listener more often than it was added.")),
		};
		node.remove_event_listener_with_callback(event, &function)?;

		let mut listeners = self.listeners.borrow_mut();
		let freed = listeners.drain_weak().count();
		if freed != 0 {
			trace!("Freed {} listener function(s).", freed);
		}
		trace!("Listener function count/cached capacity: {}/{}", listeners.len(), listeners.capacity());
		Ok(())
	}

	fn append_child(&self, parent: &Node, child: &Node) -> Result<(), JsValue> {
		parent.append_child(child).map(drop)
	}

	fn replace_child(&self, parent: &Node, new_child: &Node, old_child: &Node) -> Result<(), JsValue> {
		parent.replace_child(new_child, old_child).map(drop)
	}

	fn remove_child(&self, parent: &Node, child: &Node) -> Result<(), JsValue> {
		parent.remove_child(child).map(drop)
	}

	fn child_at(&self, parent: &Node, index: usize) -> Option<Node> {
		parent.child_nodes().get(u32::try_from(index).ok()?)
	}

	fn set_text(&self, node: &Node, text: &str) -> Result<(), JsValue> {
		node.set_text_content(Some(text));
		Ok(())
	}
}
