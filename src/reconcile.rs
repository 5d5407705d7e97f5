use crate::{
	materialize::{bind_prop, materialize_limited, unbind_prop},
	node::PropKey,
	redact, Element, Node, Options, Platform, Prop,
};
use hashbrown::{HashMap, HashSet};
use tracing::{error, info, instrument, trace, trace_span, warn};

/// Live-tree mutations performed by one [`Reconciler`], for logging.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PassStats {
	/// Subtrees materialized and appended.
	pub created: usize,
	/// Subtrees materialized in place of a mismatching live node.
	pub replaced: usize,
	/// Live elements whose props and children were patched in place.
	pub patched: usize,
	/// Text nodes whose content was overwritten.
	pub texts_updated: usize,
	/// Excess live children removed.
	pub removed: usize,
}

/// Brings a live tree in line with a new description tree, using the previous description tree as baseline.
///
/// Children are matched by position only: child `i` of the new tree is always compared to child `i` of the old tree.
/// Reordering siblings therefore patches every moved position rather than moving nodes.
#[derive(Debug)]
pub struct Reconciler<'a, P: ?Sized + Platform> {
	platform: &'a P,
	options: &'a Options,
	stats: PassStats,
}

impl<'a, P: ?Sized + Platform> Reconciler<'a, P> {
	#[must_use]
	pub fn new(platform: &'a P, options: &'a Options) -> Self {
		Self {
			platform,
			options,
			stats: PassStats::default(),
		}
	}

	#[must_use]
	pub fn stats(&self) -> PassStats {
		self.stats
	}

	/// Reconciles the live child of `container` at `index`, which must have been built from `old` if that is present.
	///
	/// Without `old`, `new` is materialized and appended to `container`.
	/// If the kinds of `old` and `new` differ, the live child is replaced wholesale.
	/// Otherwise it is patched in place.
	///
	/// Returns the live node now representing `new`.
	#[instrument(skip(self, new, old, container))]
	pub fn reconcile(&mut self, new: &Node, old: Option<&Node>, container: &P::Node, index: usize) -> Result<P::Node, P::Error> {
		let live = self.reconcile_at(new, old, container, index, self.options.depth_limit)?;
		info!(stats = ?self.stats, "Reconciled.");
		Ok(live)
	}

	/// Like [`reconcile`](`Reconciler::reconcile`), but with the live node built from `old` already known.
	///
	/// `live` must be a child of `container`. Other children of `container` are left alone.
	/// Without `old`, `new` is materialized and appended to `container`.
	#[instrument(skip(self, new, old, container, live))]
	pub fn reconcile_live(&mut self, new: &Node, old: Option<&Node>, container: &P::Node, live: Option<P::Node>) -> Result<P::Node, P::Error> {
		let depth_limit = self.options.depth_limit;
		let live = match (old, live) {
			(Some(old), Some(live)) => self.update(new, old, container, live, depth_limit)?,
			(Some(old), None) => {
				error!("Expected a live node for the previous tree. Switching to insertion.");
				if count_listeners(old) != 0 {
					warn!("{} listener(s) of the missing node were unaccounted for.", count_listeners(old));
				}
				self.create(new, container, depth_limit)?
			}
			(None, _) => self.create(new, container, depth_limit)?,
		};
		info!(stats = ?self.stats, "Reconciled.");
		Ok(live)
	}

	fn reconcile_at(&mut self, new: &Node, old: Option<&Node>, container: &P::Node, index: usize, depth_limit: usize) -> Result<P::Node, P::Error> {
		let old = match old {
			Some(old) => old,
			None => return self.create(new, container, depth_limit),
		};

		let live = match self.platform.child_at(container, index) {
			Some(live) => live,
			None => {
				error!("Expected live node at index {} but the container has no such child. Switching to insertion.", index);
				if count_listeners(old) != 0 {
					warn!("{} listener(s) of the missing node were unaccounted for.", count_listeners(old));
				}
				return self.create(new, container, depth_limit);
			}
		};
		self.update(new, old, container, live, depth_limit)
	}

	fn update(&mut self, new: &Node, old: &Node, container: &P::Node, live: P::Node, depth_limit: usize) -> Result<P::Node, P::Error> {
		match (new, old) {
			(Node::Text(t_new), Node::Text(t_old)) => {
				let span = trace_span!("Diffing text node", t_old = redact(t_old), t_new = redact(t_new));
				let _enter = span.enter();
				if t_new == t_old {
					trace!("Text unchanged.");
				} else {
					self.platform.set_text(&live, t_new)?;
					self.stats.texts_updated += 1;
				}
				Ok(live)
			}

			(Node::Element(e_new), Node::Element(e_old)) if e_new.tag == e_old.tag => {
				let span = trace_span!("Diffing element", tag = %e_new.tag);
				let _enter = span.enter();
				self.patch_element(e_new, e_old, &live, depth_limit)?;
				Ok(live)
			}

			// Mismatching nodes: Destroy and rebuild.
			(n_new, n_old) => {
				let span = trace_span!("Replacing mismatching", old = ?n_old.tag(), new = ?n_new.tag());
				let _enter = span.enter();

				if let (Some(a), Some(b)) = (n_old.tag(), n_new.tag()) {
					if a.eq_ignore_ascii_case(b) {
						warn!("Recreating element due to different tag name casing: {:?} -> {:?}", a, b);
					}
				}

				self.unbind(n_old, &live, depth_limit)?;
				let fresh = materialize_limited(self.platform, n_new, depth_limit)?;
				self.platform.replace_child(container, &fresh, &live)?;
				self.stats.replaced += 1;
				Ok(fresh)
			}
		}
	}

	fn create(&mut self, new: &Node, container: &P::Node, depth_limit: usize) -> Result<P::Node, P::Error> {
		let span = trace_span!("Creating", tag = ?new.tag());
		let _enter = span.enter();
		let live = materialize_limited(self.platform, new, depth_limit)?;
		self.platform.append_child(container, &live)?;
		self.stats.created += 1;
		Ok(live)
	}

	#[allow(clippy::similar_names)]
	fn patch_element(&mut self, e_new: &Element, e_old: &Element, live: &P::Node, depth_limit: usize) -> Result<(), P::Error> {
		debug_assert_eq!(e_new.tag, e_old.tag);
		self.patch_props(&e_new.tag, &e_new.props, &e_old.props, live)?;
		self.stats.patched += 1;

		if depth_limit == 0 {
			error!("Depth limit reached");
			return Ok(());
		}

		let (c_new, c_old) = (&e_new.children, &e_old.children);
		for (i, child) in c_new.iter().enumerate() {
			self.reconcile_at(child, c_old.get(i), live, i, depth_limit - 1)?;
		}

		if c_old.len() > c_new.len() {
			let excess = &c_old[c_new.len()..];
			if self.options.prune_excess {
				self.prune(excess, live, c_new.len(), depth_limit - 1)?;
			} else {
				trace!("Leaving {} stale live child(ren) in place.", excess.len());
			}
		}
		Ok(())
	}

	/// Applies changed and added props first, then removes props missing from `p_new`.
	fn patch_props(&mut self, tag: &str, p_new: &[Prop], p_old: &[Prop], live: &P::Node) -> Result<(), P::Error> {
		if p_new == p_old {
			trace!("Props unchanged.");
			return Ok(());
		}

		let previous: HashMap<PropKey<'_>, &Prop> = p_old.iter().map(|prop| (prop.key(tag), prop)).collect();
		for prop in p_new {
			match previous.get(&prop.key(tag)) {
				Some(&previous) if previous == prop => (),
				Some(Prop::Event { event, handler }) => {
					trace!(%event, "Rebinding listener.");
					self.platform.remove_listener(live, event, handler)?;
					bind_prop(self.platform, live, tag, prop)?;
				}
				_ => bind_prop(self.platform, live, tag, prop)?,
			}
		}

		let current: HashSet<PropKey<'_>> = p_new.iter().map(|prop| prop.key(tag)).collect();
		for prop in p_old {
			if !current.contains(&prop.key(tag)) {
				unbind_prop(self.platform, live, tag, prop)?;
			}
		}
		Ok(())
	}

	/// Removes the live children at `start..` that were built from `excess`, last first.
	fn prune(&mut self, excess: &[Node], parent: &P::Node, start: usize, depth_limit: usize) -> Result<(), P::Error> {
		let span = trace_span!("Removing excess children", count = excess.len());
		let _enter = span.enter();
		for (i, old) in excess.iter().enumerate().rev() {
			match self.platform.child_at(parent, start + i) {
				Some(live) => {
					self.unbind(old, &live, depth_limit)?;
					self.platform.remove_child(parent, &live)?;
					self.stats.removed += 1;
				}
				None => error!("Expected to remove live node at index {} but found none. Skipping.", start + i),
			}
		}
		Ok(())
	}

	/// Unregisters all listeners of a to-be-discarded live subtree without detaching it.
	fn unbind(&mut self, old: &Node, live: &P::Node, depth_limit: usize) -> Result<(), P::Error> {
		let element = match old {
			Node::Text(_) => return Ok(()),
			Node::Element(element) => element,
		};
		for prop in &element.props {
			if let Prop::Event { event, handler } = prop {
				self.platform.remove_listener(live, event, handler)?;
			}
		}

		if depth_limit == 0 {
			error!("Depth limit reached while unbinding <{}>.", element.tag);
			return Ok(());
		}
		for (i, child) in element.children.iter().enumerate() {
			match self.platform.child_at(live, i) {
				Some(live_child) => self.unbind(child, &live_child, depth_limit - 1)?,
				None => {
					error!("Expected to unbind live node at index {} beyond the end of <{}>. Ignoring bindings.", i, element.tag);
					break;
				}
			}
		}
		Ok(())
	}
}

fn count_listeners(node: &Node) -> usize {
	match node {
		Node::Text(_) => 0,
		Node::Element(element) => {
			element.props.iter().filter(|prop| matches!(prop, Prop::Event { .. })).count()
				+ element.children.iter().map(count_listeners).sum::<usize>()
		}
	}
}

/// Reconciles the first child of `container` with default [`Options`].
///
/// See [`Reconciler::reconcile`].
pub fn reconcile<P: ?Sized + Platform>(platform: &P, new: &Node, old: Option<&Node>, container: &P::Node) -> Result<P::Node, P::Error> {
	Reconciler::new(platform, &Options::default()).reconcile(new, old, container, 0)
}
