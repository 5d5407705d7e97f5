use core::{
	fmt::{self, Debug, Formatter},
	hash::{BuildHasher, Hash},
};
use hashbrown::{
	hash_map::{DefaultHashBuilder, Entry},
	HashMap,
};
use num_traits::{CheckedAdd, CheckedSub, One, Zero};

/// A map of values shared by a counted number of users.
///
/// Entries whose count dropped to zero stay around until [`RcHashMap::drain_weak`] is called,
/// so that a value can be looked up one last time after its final decrement.
pub struct RcHashMap<K, C, V, S = DefaultHashBuilder>(HashMap<K, (C, V), S>)
where
	K: Hash + Eq,
	C: CheckedAdd + CheckedSub + One + Zero,
	S: BuildHasher;

impl<K, C, V, S> Default for RcHashMap<K, C, V, S>
where
	K: Hash + Eq,
	C: CheckedAdd + CheckedSub + One + Zero,
	S: Default + BuildHasher,
{
	fn default() -> Self {
		Self::new()
	}
}

impl<K, C, V, S> RcHashMap<K, C, V, S>
where
	K: Hash + Eq,
	C: CheckedAdd + CheckedSub + One + Zero,
	S: BuildHasher,
{
	#[must_use]
	pub fn new() -> Self
	where
		S: Default,
	{
		Self(HashMap::with_hasher(S::default()))
	}

	/// Increments the count for `k`, creating the value with a count of one if absent.
	pub fn increment_or_insert_with<F: FnOnce(&K) -> V>(&mut self, k: K, v: F) -> Result<&mut V, CountSaturatedError> {
		match self.0.entry(k) {
			Entry::Occupied(occupied) => {
				let (c, v) = occupied.into_mut();
				*c = c.checked_add(&C::one()).ok_or(CountSaturatedError)?;
				Ok(v)
			}
			Entry::Vacant(vacant) => {
				let value = v(vacant.key());
				let (_, v) = vacant.insert((C::one(), value));
				Ok(v)
			}
		}
	}

	/// Decrements the count for `k` without removing the entry.
	///
	/// Returns [`None`] if there is no entry for `k`.
	pub fn weak_decrement(&mut self, k: &K) -> Result<Option<&mut V>, CountSaturatedError> {
		match self.0.get_mut(k) {
			Some((c, v)) => {
				*c = c.checked_sub(&C::one()).ok_or(CountSaturatedError)?;
				Ok(Some(v))
			}
			None => Ok(None),
		}
	}

	/// Removes all entries with a count of zero.
	pub fn drain_weak(&mut self) -> impl '_ + Iterator<Item = (K, V)> {
		self.0.drain_filter(|_, (c, _)| c.is_zero()).map(|(k, (_, v))| (k, v))
	}

	#[must_use]
	pub fn len(&self) -> usize {
		self.0.len()
	}

	#[must_use]
	pub fn capacity(&self) -> usize {
		self.0.capacity()
	}
}

impl<K, C, V, S> Debug for RcHashMap<K, C, V, S>
where
	K: Debug + Hash + Eq,
	C: Debug + CheckedAdd + CheckedSub + One + Zero,
	S: BuildHasher,
{
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_map().entries(self.0.iter().map(|(k, (c, _))| (k, c))).finish()
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CountSaturatedError;
