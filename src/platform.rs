//! The presentation platform the reconciler drives.

use crate::Handler;
use core::fmt::Debug;

/// A live presentation tree, as exposed to the materializer and reconciler.
///
/// All operations take `&self`: handlers invoked by the platform may re-enter the reconciler
/// (through a state setter) while the platform is otherwise idle.
///
/// Implementations should fail on invalid operations rather than ignore them,
/// as failures are propagated to whoever triggered the render pass.
pub trait Platform {
	/// A cheap handle to a live node.
	type Node: Clone + Debug;
	type Error: Debug;

	fn create_element(&self, tag: &str) -> Result<Self::Node, Self::Error>;
	fn create_text(&self, text: &str) -> Result<Self::Node, Self::Error>;

	fn set_attribute(&self, node: &Self::Node, name: &str, value: &str) -> Result<(), Self::Error>;
	fn remove_attribute(&self, node: &Self::Node, name: &str) -> Result<(), Self::Error>;

	/// Sets the live value of a text input, as opposed to its `value` attribute.
	fn set_field_value(&self, node: &Self::Node, value: &str) -> Result<(), Self::Error>;

	fn add_listener(&self, node: &Self::Node, event: &str, handler: &Handler) -> Result<(), Self::Error>;
	/// Removes the listener registered with an equal `handler` for `event`.
	fn remove_listener(&self, node: &Self::Node, event: &str, handler: &Handler) -> Result<(), Self::Error>;

	fn append_child(&self, parent: &Self::Node, child: &Self::Node) -> Result<(), Self::Error>;
	fn replace_child(&self, parent: &Self::Node, new_child: &Self::Node, old_child: &Self::Node) -> Result<(), Self::Error>;
	fn remove_child(&self, parent: &Self::Node, child: &Self::Node) -> Result<(), Self::Error>;
	fn child_at(&self, parent: &Self::Node, index: usize) -> Option<Self::Node>;

	/// Replaces the content of a text node.
	fn set_text(&self, node: &Self::Node, text: &str) -> Result<(), Self::Error>;
}

/// Whether `tag` names an element with a live field value.
#[must_use]
pub fn is_text_input(tag: &str) -> bool {
	tag.eq_ignore_ascii_case("input") || tag.eq_ignore_ascii_case("textarea")
}
