use core::fmt::Debug;
use thiserror::Error;

/// Errors of [`Mount`](`crate::Mount`) operations.
#[derive(Debug, Error)]
pub enum Error<E: Debug> {
	#[error("presentation platform operation failed: {0:?}")]
	Platform(E),

	/// A render pass was requested while another one was running further up the stack.
	#[error("render pass requested while another render pass is running")]
	Reentrant,

	/// State updates requested during render passes kept requesting further passes.
	#[error("gave up after {0} deferred render passes; a render function probably sets state unconditionally")]
	DeferredLimit(usize),
}
