//! Slot-based component state.
//!
//! State is addressed by call order: the `n`th [`Scope::use_state`] call of a render pass always refers to slot `n`.
//! Render functions must therefore call it unconditionally and in the same order on every pass.

use crate::{
	node::{self, Child, Kind, Prop},
	Node,
};
use core::{
	any::{type_name, Any},
	fmt::{self, Debug, Formatter},
	marker::PhantomData,
};
use std::rc::Weak;
use tracing::{error, trace, warn};

/// Implemented by whatever owns a [`SlotStore`] and re-renders when a slot changes.
pub(crate) trait Runtime {
	/// Overwrites slot `index` and re-renders synchronously (or as soon as the current pass is done).
	fn write_slot(&self, index: usize, value: Box<dyn Any>);
}

/// Persistent values, in slot order.
#[derive(Default)]
pub struct SlotStore {
	values: Vec<Box<dyn Any>>,
}

impl SlotStore {
	#[must_use]
	pub fn new() -> Self {
		Self::default()
	}

	#[must_use]
	pub fn len(&self) -> usize {
		self.values.len()
	}

	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.values.is_empty()
	}

	/// Reads slot `index`, if it exists and holds a `T`.
	#[must_use]
	pub fn get<T: 'static>(&self, index: usize) -> Option<&T> {
		self.values.get(index)?.downcast_ref()
	}

	/// Starts a render pass that isn't attached to any runtime.
	///
	/// Setters handed out by the returned [`Scope`] only log a warning.
	pub fn scope(&mut self) -> Scope<'_> {
		Scope {
			slots: self,
			cursor: 0,
			runtime: None,
		}
	}

	pub(crate) fn attached_scope(&mut self, runtime: Weak<dyn Runtime>) -> Scope<'_> {
		Scope {
			slots: self,
			cursor: 0,
			runtime: Some(runtime),
		}
	}

	pub(crate) fn write(&mut self, index: usize, value: Box<dyn Any>) {
		match self.values.get_mut(index) {
			Some(slot) => *slot = value,
			None => error!("Tried to write slot {} of {}. Ignoring.", index, self.values.len()),
		}
	}
}

impl Debug for SlotStore {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_struct("SlotStore").field("len", &self.values.len()).finish_non_exhaustive()
	}
}

/// The render context handed to render functions and components for one pass.
pub struct Scope<'a> {
	slots: &'a mut SlotStore,
	cursor: usize,
	runtime: Option<Weak<dyn Runtime>>,
}

impl Scope<'_> {
	/// Returns the value of the next slot and a setter for it.
	///
	/// `initial` is stored only the first time this slot is reached and ignored afterwards.
	pub fn use_state<T: 'static + Clone>(&mut self, initial: T) -> (T, Setter<T>) {
		self.use_state_with(move || initial)
	}

	/// Like [`use_state`](`Scope::use_state`), but only computes the initial value when it's needed.
	pub fn use_state_with<T: 'static + Clone>(&mut self, initial: impl FnOnce() -> T) -> (T, Setter<T>) {
		let index = self.cursor;
		self.cursor += 1;

		let values = &mut self.slots.values;
		let value = match values.get(index).map(|slot| slot.downcast_ref::<T>()) {
			Some(Some(value)) => value.clone(),
			Some(None) => {
				error!(
					"Slot {} doesn't hold a {}. State must be used unconditionally and in the same order on every pass. Reinitializing.",
					index,
					type_name::<T>()
				);
				let value = initial();
				values[index] = Box::new(value.clone());
				value
			}
			None => {
				debug_assert_eq!(index, values.len());
				trace!("Initializing slot {}.", index);
				let value = initial();
				values.push(Box::new(value.clone()));
				value
			}
		};

		(
			value,
			Setter {
				index,
				runtime: self.runtime.clone(),
				_value: PhantomData,
			},
		)
	}

	/// The number of slots used so far in this pass.
	#[must_use]
	pub fn cursor(&self) -> usize {
		self.cursor
	}

	/// See [`build`](`crate::build`).
	pub fn build<'k>(&mut self, kind: impl Into<Kind<'k>>, props: Vec<Prop>, children: Vec<Child>) -> Node {
		node::build(self, kind, props, children)
	}
}

impl Debug for Scope<'_> {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_struct("Scope")
			.field("slots", &self.slots)
			.field("cursor", &self.cursor)
			.field("attached", &self.runtime.is_some())
			.finish()
	}
}

/// Overwrites one slot and re-renders.
pub struct Setter<T> {
	index: usize,
	runtime: Option<Weak<dyn Runtime>>,
	_value: PhantomData<fn(T)>,
}

impl<T: 'static> Setter<T> {
	/// Stores `value`, then synchronously runs a full render pass before returning.
	///
	/// Called during a render pass, the update is applied right after that pass, followed by a pass of its own.
	pub fn set(&self, value: T) {
		match self.runtime.as_ref().map(Weak::upgrade) {
			Some(Some(runtime)) => runtime.write_slot(self.index, Box::new(value)),
			Some(None) => warn!("Slot {} was set after its mount was dropped. Ignoring.", self.index),
			None => warn!("Slot {} was set outside of a mount. Ignoring.", self.index),
		}
	}

	#[must_use]
	pub fn slot(&self) -> usize {
		self.index
	}
}

impl<T> Clone for Setter<T> {
	fn clone(&self) -> Self {
		Self {
			index: self.index,
			runtime: self.runtime.clone(),
			_value: PhantomData,
		}
	}
}

impl<T> Debug for Setter<T> {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_struct("Setter")
			.field("index", &self.index)
			.field("type", &type_name::<T>())
			.finish()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn initial_values_are_only_used_once() {
		let mut slots = SlotStore::new();
		{
			let mut scope = slots.scope();
			assert_eq!(scope.use_state(1).0, 1);
			assert_eq!(scope.use_state("a").0, "a");
			assert_eq!(scope.cursor(), 2);
		}
		slots.write(0, Box::new(5));
		{
			let mut scope = slots.scope();
			assert_eq!(scope.use_state(1).0, 5);
			assert_eq!(scope.use_state("b").0, "a");
		}
		assert_eq!(slots.len(), 2);
	}

	#[test]
	fn mismatching_slot_type_is_reinitialized() {
		let mut slots = SlotStore::new();
		slots.scope().use_state(1_u32);
		let (value, setter) = slots.scope().use_state_with(|| String::from("text"));
		assert_eq!(value, "text");
		assert_eq!(setter.slot(), 0);
		assert_eq!(slots.get::<String>(0).map(String::as_str), Some("text"));
		assert_eq!(slots.get::<u32>(0), None);
	}

	#[test]
	fn detached_setter_is_ignored() {
		let mut slots = SlotStore::new();
		let (_, setter) = slots.scope().use_state(0);
		setter.set(1);
		assert_eq!(slots.get::<i32>(0), Some(&0));
	}
}
