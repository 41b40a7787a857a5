//! Per-event-type dispatch registry.
//!
//! # Role
//!
//! A [`HandlerList`] owns every live [`Subscription`] for one event type, bucketed by
//! [`Priority`], and serves a flattened, priority-ordered snapshot of them to publishers.
//!
//! # Invariants
//!
//! - When present, the baked snapshot is exactly the concatenation of the live buckets in
//!   ascending priority order, each bucket in registration order.
//! - Every mutation of the live buckets clears the baked snapshot before the registry lock is
//!   released, so a reader never obtains a snapshot older than the last completed mutation.
//! - [`HandlerList::listeners`] never takes the registry lock while a snapshot is published.

use std::any::TypeId;
use std::ops::Deref;
use std::sync::Arc;

use arc_swap::ArcSwapOption;
use parking_lot::Mutex;
use tracing::{debug, trace, warn};

use crate::dispatch::{DispatchSummary, FaultSink, dispatch};
use crate::error::RegisterError;
use crate::event::Event;
use crate::owner::{ListenerId, OwnerId};
use crate::priority::Priority;
use crate::subscription::{Subscription, SubscriptionInfo};
use crate::timings::TimingsEntry;


/// Immutable, priority-ordered snapshot of a handler list.
pub struct Baked<E> {
	subs: Vec<Subscription<E>>,
}

impl<E> Baked<E> {
	fn from_slots(slots: &Slots<E>) -> Self {
		let mut subs = Vec::with_capacity(slots.len());
		for bucket in &slots.buckets {
			subs.extend(bucket.iter().cloned());
		}
		Self { subs }
	}

	pub fn as_slice(&self) -> &[Subscription<E>] {
		&self.subs
	}
}

impl<E> Deref for Baked<E> {
	type Target = [Subscription<E>];

	fn deref(&self) -> &Self::Target {
		&self.subs
	}
}

struct Slots<E> {
	buckets: [Vec<Subscription<E>>; Priority::COUNT],
}

impl<E> Slots<E> {
	fn new() -> Self {
		Self {
			buckets: std::array::from_fn(|_| Vec::new()),
		}
	}

	fn len(&self) -> usize {
		self.buckets.iter().map(Vec::len).sum()
	}

	fn iter(&self) -> impl Iterator<Item = &Subscription<E>> {
		self.buckets.iter().flatten()
	}

	fn retain(&mut self, mut keep: impl FnMut(&Subscription<E>) -> bool) -> usize {
		let before = self.len();
		for bucket in &mut self.buckets {
			bucket.retain(|s| keep(s));
		}
		before - self.len()
	}
}

/// The live subscriber set for events of type `E`.
pub struct HandlerList<E> {
	name: &'static str,
	live: Mutex<Slots<E>>,
	baked: ArcSwapOption<Baked<E>>,
}

impl<E: Event> Default for HandlerList<E> {
	fn default() -> Self {
		Self::new()
	}
}

impl<E: Event> HandlerList<E> {
	/// Creates an empty, untracked handler list.
	///
	/// Lists obtained through [`Catalog::handlers`](crate::Catalog::handlers) are tracked
	/// for bulk operations; lists built here are not unless passed to
	/// [`Catalog::track`](crate::Catalog::track).
	pub fn new() -> Self {
		Self {
			name: E::NAME,
			live: Mutex::new(Slots::new()),
			baked: ArcSwapOption::empty(),
		}
	}

	pub fn event_name(&self) -> &'static str {
		self.name
	}

	/// Appends `sub` to its priority bucket.
	///
	/// Fails without modifying the list if the same callback is already registered for the
	/// same owner at the same priority.
	pub fn register(&self, sub: Subscription<E>) -> Result<(), RegisterError> {
		let mut live = self.live.lock();
		self.insert(&mut live, sub)?;
		self.baked.store(None);
		Ok(())
	}

	/// Registers each subscription in order, invalidating the snapshot once.
	///
	/// Stops at the first duplicate; subscriptions before it remain registered.
	pub fn register_all<I>(&self, subs: I) -> Result<(), RegisterError>
	where
		I: IntoIterator<Item = Subscription<E>>,
	{
		let mut live = self.live.lock();
		let mut changed = false;
		let mut result = Ok(());
		for sub in subs {
			if let Err(e) = self.insert(&mut live, sub) {
				result = Err(e);
				break;
			}
			changed = true;
		}
		if changed {
			self.baked.store(None);
		}
		result
	}

	fn insert(&self, live: &mut Slots<E>, sub: Subscription<E>) -> Result<(), RegisterError> {
		let bucket = &mut live.buckets[sub.priority().slot()];
		if bucket.iter().any(|s| s.same_binding(&sub)) {
			warn!(
				event = self.name,
				owner = %sub.owner(),
				listener = %sub.listener(),
				priority = %sub.priority(),
				"Rejected duplicate listener registration"
			);
			return Err(RegisterError::Duplicate {
				event: self.name,
				owner: sub.owner().clone(),
				listener: sub.listener(),
				priority: sub.priority(),
			});
		}
		bucket.push(sub);
		Ok(())
	}

	/// Removes the subscription with the same binding as `sub`, if present.
	pub fn unregister(&self, sub: &Subscription<E>) -> bool {
		let mut live = self.live.lock();
		let bucket = &mut live.buckets[sub.priority().slot()];
		let Some(pos) = bucket.iter().position(|s| s.same_binding(sub)) else {
			return false;
		};
		bucket.remove(pos);
		self.baked.store(None);
		true
	}

	/// Removes every subscription registered by `owner`.
	pub fn unregister_owner(&self, owner: &OwnerId) -> usize {
		self.remove_where(|s| s.owner() == owner)
	}

	/// Removes every subscription bound to `listener`, whoever registered it.
	pub fn unregister_listener(&self, listener: ListenerId) -> usize {
		self.remove_where(|s| s.listener() == listener)
	}

	/// Removes all subscriptions.
	pub fn clear(&self) -> usize {
		self.remove_where(|_| true)
	}

	fn remove_where(&self, mut matches: impl FnMut(&Subscription<E>) -> bool) -> usize {
		let mut live = self.live.lock();
		let removed = live.retain(|s| !matches(s));
		if removed > 0 {
			self.baked.store(None);
			debug!(event = self.name, removed, "Unregistered listeners");
		}
		removed
	}

	/// Publishes the flattened snapshot if stale and returns it.
	///
	/// A no-op returning the existing snapshot when nothing changed since the last bake.
	pub fn bake(&self) -> Arc<Baked<E>> {
		self.bake_inner().0
	}

	/// Like [`bake`](Self::bake), also reporting whether this call built the snapshot.
	fn bake_inner(&self) -> (Arc<Baked<E>>, bool) {
		let live = self.live.lock();
		if let Some(baked) = self.baked.load_full() {
			return (baked, false);
		}
		let baked = Arc::new(Baked::from_slots(&live));
		self.baked.store(Some(Arc::clone(&baked)));
		trace!(event = self.name, listeners = baked.len(), "Baked handler list");
		(baked, true)
	}

	/// Returns the current snapshot, baking first if stale.
	#[inline]
	pub fn listeners(&self) -> Arc<Baked<E>> {
		match self.baked.load_full() {
			Some(baked) => baked,
			None => self.bake(),
		}
	}

	pub fn is_baked(&self) -> bool {
		self.baked.load().is_some()
	}

	/// Number of live subscriptions.
	pub fn len(&self) -> usize {
		self.live.lock().len()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	/// Live subscriptions registered by `owner`, in execution order.
	pub fn subscriptions_of(&self, owner: &OwnerId) -> Vec<Subscription<E>> {
		self.live.lock().iter().filter(|s| s.owner() == owner).cloned().collect()
	}

	/// Delivers `event` to every subscription in order.
	///
	/// Listener failures go to `sink`; see [`dispatch`](crate::dispatch::dispatch).
	pub fn call(&self, event: &mut E, sink: &dyn FaultSink) -> DispatchSummary {
		let listeners = self.listeners();
		dispatch(&listeners, event, sink)
	}
}

/// Object-safe view of a [`HandlerList`] used for catalog-wide sweeps.
pub trait ErasedHandlerList: Send + Sync {
	fn event_name(&self) -> &'static str;

	fn event_type(&self) -> TypeId;

	/// Bakes if stale. Returns whether a new snapshot was built.
	fn bake_if_stale(&self) -> bool;

	fn clear(&self) -> usize;

	fn unregister_owner(&self, owner: &OwnerId) -> usize;

	fn unregister_listener(&self, listener: ListenerId) -> usize;

	fn subscriptions(&self) -> Vec<SubscriptionInfo>;

	fn subscriptions_of(&self, owner: &OwnerId) -> Vec<SubscriptionInfo>;

	fn timings(&self) -> Vec<TimingsEntry>;

	fn reset_timings(&self);

	fn len(&self) -> usize;

	fn is_baked(&self) -> bool;
}

impl<E: Event> ErasedHandlerList for HandlerList<E> {
	fn event_name(&self) -> &'static str {
		self.name
	}

	fn event_type(&self) -> TypeId {
		TypeId::of::<E>()
	}

	fn bake_if_stale(&self) -> bool {
		if HandlerList::is_baked(self) {
			return false;
		}
		// Another thread may bake between the check and the lock.
		self.bake_inner().1
	}

	fn clear(&self) -> usize {
		HandlerList::clear(self)
	}

	fn unregister_owner(&self, owner: &OwnerId) -> usize {
		HandlerList::unregister_owner(self, owner)
	}

	fn unregister_listener(&self, listener: ListenerId) -> usize {
		HandlerList::unregister_listener(self, listener)
	}

	fn subscriptions(&self) -> Vec<SubscriptionInfo> {
		self.live.lock().iter().map(|s| s.info(self.name)).collect()
	}

	fn subscriptions_of(&self, owner: &OwnerId) -> Vec<SubscriptionInfo> {
		self.live.lock().iter().filter(|s| s.owner() == owner).map(|s| s.info(self.name)).collect()
	}

	fn timings(&self) -> Vec<TimingsEntry> {
		self.live
			.lock()
			.iter()
			.filter_map(|s| {
				let t = s.timings()?;
				Some(TimingsEntry {
					event: self.name,
					owner: s.owner().clone(),
					listener: s.listener(),
					priority: s.priority(),
					count: t.count(),
					total: t.total(),
				})
			})
			.collect()
	}

	fn reset_timings(&self) {
		for t in self.live.lock().iter().filter_map(Subscription::timings) {
			t.reset();
		}
	}

	fn len(&self) -> usize {
		HandlerList::len(self)
	}

	fn is_baked(&self) -> bool {
		HandlerList::is_baked(self)
	}
}
