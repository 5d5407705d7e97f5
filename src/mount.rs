use crate::{
	state::{Runtime, SlotStore},
	Error, Node, Platform, Reconciler, Scope,
};
use core::{
	any::Any,
	cell::{Cell, RefCell},
	fmt::{self, Debug, Formatter},
};
use std::{
	collections::VecDeque,
	rc::{Rc, Weak},
};
use tracing::{error, info, info_span, instrument, trace};

/// Runtime configuration of a [`Mount`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Options {
	/// Nesting depth beyond which the reconciler stops descending, logging an error.
	pub depth_limit: usize,
	/// Whether live children beyond the end of a shrunk child list are removed.
	///
	/// Without this, stale nodes stay in the live tree and later appends land after them.
	pub prune_excess: bool,
	/// How many passes requested by state updates during render passes are run before giving up.
	pub max_deferred_passes: usize,
}

impl Default for Options {
	fn default() -> Self {
		Self {
			depth_limit: 1024,
			prune_excess: true,
			max_deferred_passes: 64,
		}
	}
}

/// A root render function attached to a container in a live tree.
///
/// Owns the slot store and the description tree of the last pass, which serves as baseline for the next one.
/// Setters handed out during its passes re-render it synchronously. They turn into no-ops once the [`Mount`] is dropped.
pub struct Mount<P: 'static + Platform> {
	inner: Rc<Inner<P>>,
}

struct Inner<P: Platform> {
	this: Weak<Inner<P>>,
	platform: P,
	container: P::Node,
	root: Box<dyn Fn(&mut Scope<'_>) -> Node>,
	options: Options,
	state: RefCell<State<P>>,
	deferred: RefCell<VecDeque<(usize, Box<dyn Any>)>>,
	passes: Cell<u64>,
}

struct State<P: Platform> {
	slots: SlotStore,
	previous: Option<Node>,
	live: Option<P::Node>,
}

impl<P: 'static + Platform> Mount<P> {
	/// Renders `root` into `container` for the first time.
	///
	/// # Errors
	///
	/// Iff the initial render pass fails.
	pub fn new(platform: P, container: P::Node, root: impl 'static + Fn(&mut Scope<'_>) -> Node) -> Result<Self, Error<P::Error>> {
		Self::with_options(platform, container, root, Options::default())
	}

	/// # Errors
	///
	/// Iff the initial render pass fails.
	#[instrument(skip(platform, root))]
	pub fn with_options(
		platform: P,
		container: P::Node,
		root: impl 'static + Fn(&mut Scope<'_>) -> Node,
		options: Options,
	) -> Result<Self, Error<P::Error>> {
		let inner = Rc::new_cyclic(|this| Inner {
			this: this.clone(),
			platform,
			container,
			root: Box::new(root),
			options,
			state: RefCell::new(State {
				slots: SlotStore::new(),
				previous: None,
				live: None,
			}),
			deferred: RefCell::default(),
			passes: Cell::new(0),
		});
		inner.render()?;
		Ok(Self { inner })
	}

	/// Runs a full render pass, plus any passes requested by state updates during it.
	///
	/// # Errors
	///
	/// - [`Error::Platform`] if the platform fails. The live tree may be partially updated,
	///   and the previous description tree is kept as baseline.
	/// - [`Error::Reentrant`] if called from within a render function.
	/// - [`Error::DeferredLimit`] if render functions keep setting state.
	pub fn render(&self) -> Result<(), Error<P::Error>> {
		self.inner.render()
	}

	#[must_use]
	pub fn platform(&self) -> &P {
		&self.inner.platform
	}

	#[must_use]
	pub fn container(&self) -> &P::Node {
		&self.inner.container
	}

	/// The live node created or patched by the last successful pass.
	#[must_use]
	pub fn live(&self) -> Option<P::Node> {
		self.inner.state.borrow().live.clone()
	}

	/// Calls `f` with the description tree of the last successful pass.
	pub fn with_tree<R>(&self, f: impl FnOnce(Option<&Node>) -> R) -> R {
		f(self.inner.state.borrow().previous.as_ref())
	}

	/// The number of completed render passes.
	#[must_use]
	pub fn passes(&self) -> u64 {
		self.inner.passes.get()
	}

	#[must_use]
	pub fn options(&self) -> &Options {
		&self.inner.options
	}
}

impl<P: 'static + Platform> Inner<P> {
	fn render(&self) -> Result<(), Error<P::Error>> {
		self.pass()?;

		let mut deferred_passes = 0;
		loop {
			let next = self.deferred.borrow_mut().pop_front();
			let (index, value) = match next {
				Some(next) => next,
				None => return Ok(()),
			};

			if deferred_passes == self.options.max_deferred_passes {
				let dropped = self.deferred.borrow_mut().drain(..).count() + 1;
				error!("Dropping {} state update(s) after {} deferred pass(es).", dropped, deferred_passes);
				return Err(Error::DeferredLimit(deferred_passes));
			}
			deferred_passes += 1;

			self.state.try_borrow_mut().map_err(|_| Error::Reentrant)?.slots.write(index, value);
			self.pass()?;
		}
	}

	fn pass(&self) -> Result<(), Error<P::Error>> {
		let mut state = self.state.try_borrow_mut().map_err(|_| Error::Reentrant)?;
		let state = &mut *state;

		let span = info_span!("Render pass", pass = self.passes.get());
		let _enter = span.enter();

		let this: Weak<dyn Runtime> = self.this.clone();
		let tree = {
			let mut scope = state.slots.attached_scope(this);
			let tree = (self.root)(&mut scope);
			trace!("Used {} slot(s).", scope.cursor());
			tree
		};

		let mut reconciler = Reconciler::new(&self.platform, &self.options);
		let live = reconciler
			.reconcile_live(&tree, state.previous.as_ref(), &self.container, state.live.clone())
			.map_err(Error::Platform)?;
		info!(stats = ?reconciler.stats(), slots = state.slots.len(), "Render pass complete.");

		state.previous = Some(tree);
		state.live = Some(live);
		self.passes.set(self.passes.get() + 1);
		Ok(())
	}
}

impl<P: 'static + Platform> Runtime for Inner<P> {
	fn write_slot(&self, index: usize, value: Box<dyn Any>) {
		match self.state.try_borrow_mut() {
			Ok(mut state) => state.slots.write(index, value),
			Err(_) => {
				trace!("Render pass in progress. Deferring update of slot {}.", index);
				return self.deferred.borrow_mut().push_back((index, value));
			}
		}

		if let Err(error) = self.render() {
			error!("Render pass after update of slot {} failed: {:?}", index, error);
		}
	}
}

impl<P: 'static + Platform> Debug for Mount<P> {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_struct("Mount")
			.field("container", &self.inner.container)
			.field("options", &self.inner.options)
			.field("passes", &self.inner.passes.get())
			.finish_non_exhaustive()
	}
}
