#![doc(html_root_url = "https://docs.rs/sapling/0.0.1")]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

//! A minimal positional VDOM reconciler with slot-based component state.
//!
//! Render functions build a description tree ([`Node`]) on every pass.
//! The [`Reconciler`] compares it with the previous pass's tree and patches a live tree,
//! exposed through the [`Platform`] trait, in place wherever the kinds of nodes at the same position match.
//!
//! State lives in a [`Mount`], addressed by the order of [`Scope::use_state`] calls during a pass.
//! Setting it re-renders synchronously.
//!
//! Two platforms are included: the headless [`memory::Document`], and, with the `web` feature, [`web::WebPlatform`].

#[cfg(doctest)]
pub mod readme {
	doc_comment::doctest!("../README.md");
}

mod error;
mod materialize;
pub mod memory;
mod mount;
mod node;
mod platform;
#[cfg(feature = "web")]
mod rc_hash_map;
mod reconcile;
mod state;
#[cfg(feature = "web")]
pub mod web;

pub use error::Error;
pub use materialize::materialize;
pub use mount::{Mount, Options};
pub use node::{attr, build, element, on, on_handler, text, value, Child, Component, Element, Event, Handler, Kind, Node, Prop, PropValue, Props};
pub use platform::{is_text_input, Platform};
pub use reconcile::{reconcile, PassStats, Reconciler};
pub use state::{Scope, Setter, SlotStore};

/// Text content is only logged with the `dangerous-logging` feature.
pub(crate) fn redact(value: &str) -> &str {
	if cfg!(feature = "dangerous-logging") {
		value
	} else {
		"<redacted>"
	}
}
