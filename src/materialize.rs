use crate::{
	platform::{is_text_input, Platform},
	redact, Element, Node, Options, Prop,
};
use tracing::{error, instrument, trace, trace_span};

/// Creates the live counterpart of `node`, including all descendants.
///
/// The result is not attached to any parent.
/// Platform errors are propagated as-is, which may leave a partially built detached subtree behind.
///
/// Elements nested deeper than the default [`Options::depth_limit`] are created without children.
#[instrument(skip(platform, node))]
pub fn materialize<P: ?Sized + Platform>(platform: &P, node: &Node) -> Result<P::Node, P::Error> {
	materialize_limited(platform, node, Options::default().depth_limit)
}

/// Stops descending once `depth_limit` is exhausted, the same way patching does.
pub(crate) fn materialize_limited<P: ?Sized + Platform>(platform: &P, node: &Node, depth_limit: usize) -> Result<P::Node, P::Error> {
	match node {
		Node::Text(text) => {
			let span = trace_span!("Creating text node", text = redact(text));
			let _enter = span.enter();
			platform.create_text(text)
		}
		Node::Element(element) => materialize_element(platform, element, depth_limit),
	}
}

fn materialize_element<P: ?Sized + Platform>(platform: &P, element: &Element, depth_limit: usize) -> Result<P::Node, P::Error> {
	let Element { tag, props, children } = element;
	let span = trace_span!("Creating element", %tag, props = props.len(), children = children.len());
	let _enter = span.enter();

	let live = platform.create_element(tag)?;
	for prop in props {
		bind_prop(platform, &live, tag, prop)?;
	}
	if depth_limit == 0 {
		error!("Depth limit reached. Not creating {} child(ren) of <{}>.", children.len(), tag);
		return Ok(live);
	}
	for child in children {
		let child = materialize_limited(platform, child, depth_limit - 1)?;
		platform.append_child(&live, &child)?;
	}
	trace!("Created element.");
	Ok(live)
}

pub(crate) fn bind_prop<P: ?Sized + Platform>(platform: &P, live: &P::Node, tag: &str, prop: &Prop) -> Result<(), P::Error> {
	match prop {
		Prop::Attribute { name, value } => {
			trace!(%name, value = redact(value), "Setting attribute.");
			platform.set_attribute(live, name, value)
		}
		Prop::Event { event, handler } => {
			trace!(%event, ?handler, "Adding listener.");
			platform.add_listener(live, event, handler)
		}
		Prop::Value(value) if is_text_input(tag) => {
			trace!(value = redact(value), "Setting field value.");
			platform.set_field_value(live, value)
		}
		Prop::Value(value) => {
			trace!(value = redact(value), "Setting value attribute on <{}>.", tag);
			platform.set_attribute(live, "value", value)
		}
	}
}

pub(crate) fn unbind_prop<P: ?Sized + Platform>(platform: &P, live: &P::Node, tag: &str, prop: &Prop) -> Result<(), P::Error> {
	match prop {
		Prop::Attribute { name, .. } => {
			trace!(%name, "Removing attribute.");
			platform.remove_attribute(live, name)
		}
		Prop::Event { event, handler } => {
			trace!(%event, ?handler, "Removing listener.");
			platform.remove_listener(live, event, handler)
		}
		Prop::Value(_) if is_text_input(tag) => {
			trace!("Leaving field value of <{}> as is.", tag);
			Ok(())
		}
		Prop::Value(_) => {
			trace!("Removing value attribute.");
			platform.remove_attribute(live, "value")
		}
	}
}
