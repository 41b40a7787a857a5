//! Registry catalog: every handler list in the process, keyed by event type.
//!
//! # Role
//!
//! The catalog maps each event type to its [`HandlerList`], constructing lists lazily on first
//! use, and runs sweeps (bake, reset, owner or listener teardown) over every list it tracks.
//!
//! # Concurrency
//!
//! - The type map is published through an `ArcSwap`, so resolving a handler list never locks.
//! - New lists are added under the write half of the list lock; sweeps hold the read half, so
//!   a sweep sees every list that existed when it started and none is added mid-sweep.
//! - Each list's own lock protects its contents; sweeps take one list lock at a time.

use std::any::{Any, TypeId};
use std::sync::{Arc, OnceLock};

use arc_swap::ArcSwap;
use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use tracing::{debug, info, warn};

use crate::config::DispatchConfig;
use crate::dispatch::{DispatchSummary, FaultSink, TracingFaultSink};
use crate::error::{InitError, RegisterError};
use crate::event::Event;
use crate::handler_list::{ErasedHandlerList, HandlerList};
use crate::listener::{Listener, ListenerBinder};
use crate::owner::{ListenerId, OwnerId};
use crate::subscription::{Subscription, SubscriptionInfo};
use crate::timings::TimingsEntry;

#[cfg(test)]
mod tests;

type TypeMap = FxHashMap<TypeId, Arc<dyn Any + Send + Sync>>;

/// Collection of handler lists with catalog-wide bulk operations.
pub struct Catalog {
	config: DispatchConfig,
	sink: Arc<dyn FaultSink>,
	lists: RwLock<Vec<Arc<dyn ErasedHandlerList>>>,
	by_type: ArcSwap<TypeMap>,
}

impl Default for Catalog {
	fn default() -> Self {
		Self::new(DispatchConfig::default())
	}
}

impl Catalog {
	/// Creates an empty catalog that logs listener faults through `tracing`.
	pub fn new(config: DispatchConfig) -> Self {
		Self::with_sink(config, Arc::new(TracingFaultSink))
	}

	pub fn with_sink(config: DispatchConfig, sink: Arc<dyn FaultSink>) -> Self {
		Self {
			config,
			sink,
			lists: RwLock::new(Vec::new()),
			by_type: ArcSwap::from_pointee(TypeMap::default()),
		}
	}

	pub fn config(&self) -> &DispatchConfig {
		&self.config
	}

	pub fn fault_sink(&self) -> &dyn FaultSink {
		&*self.sink
	}

	/// Returns the handler list for `E` if one has been created.
	pub fn get<E: Event>(&self) -> Option<Arc<HandlerList<E>>> {
		let any = self.by_type.load().get(&TypeId::of::<E>())?.clone();
		any.downcast::<HandlerList<E>>().ok()
	}

	/// Returns the handler list for `E`, creating and tracking it on first use.
	pub fn handlers<E: Event>(&self) -> Arc<HandlerList<E>> {
		if let Some(list) = self.get::<E>() {
			return list;
		}

		let mut lists = self.lists.write();
		// Another thread may have created it while we waited for the lock.
		if let Some(list) = self.get::<E>() {
			return list;
		}

		let list = Arc::new(HandlerList::<E>::new());
		let mut map = TypeMap::clone(&self.by_type.load());
		map.insert(TypeId::of::<E>(), list.clone());
		self.by_type.store(Arc::new(map));
		lists.push(list.clone());
		debug!(event = E::NAME, total = lists.len(), "Created handler list");
		list
	}

	/// Adds an externally constructed list to the sweep set.
	///
	/// Does not make it the list [`handlers`](Self::handlers) resolves for `E`. Returns
	/// `false` if the list was already tracked.
	pub fn track<E: Event>(&self, list: &Arc<HandlerList<E>>) -> bool {
		let mut lists = self.lists.write();
		let ptr = Arc::as_ptr(list).cast::<()>();
		if lists.iter().any(|l| Arc::as_ptr(l).cast::<()>() == ptr) {
			return false;
		}
		lists.push(list.clone());
		true
	}

	/// Snapshot of every tracked list, in creation order.
	pub fn handler_lists(&self) -> Vec<Arc<dyn ErasedHandlerList>> {
		self.lists.read().clone()
	}

	/// Registers one subscription on the list for `E`.
	///
	/// Attaches timings when [`DispatchConfig::timings`] is enabled.
	pub fn register<E: Event>(&self, sub: Subscription<E>) -> Result<(), RegisterError> {
		let sub = if self.config.timings && sub.timings().is_none() { sub.timed() } else { sub };
		self.handlers::<E>().register(sub)
	}

	/// Binds every handler of `listener` on behalf of `owner`.
	///
	/// Either all handlers are registered or, on the first failure, none remain.
	pub fn register_listener<L: Listener>(&self, owner: OwnerId, listener: Arc<L>) -> Result<ListenerId, RegisterError> {
		let mut binder = ListenerBinder::new(self, owner);
		let id = binder.listener();
		listener.bind(&mut binder);
		let owner = binder.owner().clone();

		match binder.finish() {
			Ok((id, handlers)) => {
				debug!(%owner, listener = %id, handlers, "Registered listener");
				if self.config.bake_after_listener_registration {
					self.bake_all();
				}
				Ok(id)
			}
			Err(e) => {
				warn!(%owner, listener = %id, error = %e, "Rolled back listener registration");
				Err(e)
			}
		}
	}

	/// Bakes every stale list. Returns how many were rebuilt.
	pub fn bake_all(&self) -> usize {
		let lists = self.lists.read();
		let baked = lists.iter().filter(|l| l.bake_if_stale()).count();
		if baked > 0 {
			debug!(baked, total = lists.len(), "Baked handler lists");
		}
		baked
	}

	/// Removes every subscription from every list.
	pub fn reset_all(&self) -> usize {
		let lists = self.lists.read();
		let removed: usize = lists.iter().map(|l| l.clear()).sum();
		info!(removed, lists = lists.len(), "Reset all handler lists");
		removed
	}

	/// Removes `owner` from every list it subscribed to.
	pub fn unregister_owner_all(&self, owner: &OwnerId) -> usize {
		let removed: usize = self.lists.read().iter().map(|l| l.unregister_owner(owner)).sum();
		debug!(%owner, removed, "Unregistered owner from all handler lists");
		removed
	}

	/// Removes every handler of `listener` from every list.
	pub fn unregister_listener_all(&self, listener: ListenerId) -> usize {
		let removed: usize = self.lists.read().iter().map(|l| l.unregister_listener(listener)).sum();
		debug!(%listener, removed, "Unregistered listener from all handler lists");
		removed
	}

	/// Every live subscription of `owner`, grouped by list in creation order.
	pub fn subscriptions_of(&self, owner: &OwnerId) -> Vec<SubscriptionInfo> {
		self.lists.read().iter().flat_map(|l| l.subscriptions_of(owner)).collect()
	}

	/// Timings of every timed subscription, slowest total first.
	pub fn timings_report(&self) -> Vec<TimingsEntry> {
		let mut entries: Vec<_> = self.lists.read().iter().flat_map(|l| l.timings()).collect();
		entries.sort_by(|a, b| b.total.cmp(&a.total).then_with(|| a.event.cmp(b.event)));
		entries
	}

	pub fn reset_timings(&self) {
		for list in self.lists.read().iter() {
			list.reset_timings();
		}
	}

	/// Publishes `event` to its handler list, reporting faults to this catalog's sink.
	///
	/// Does not create a list for `E`; with no list there is nobody to deliver to.
	pub fn call<E: Event>(&self, event: &mut E) -> DispatchSummary {
		match self.get::<E>() {
			Some(list) => list.call(event, &*self.sink),
			None => DispatchSummary::default(),
		}
	}
}

static GLOBAL: OnceLock<Catalog> = OnceLock::new();

/// Installs `catalog` as the process-wide catalog.
pub fn install(catalog: Catalog) -> Result<&'static Catalog, InitError> {
	let mut installed = false;
	let global = GLOBAL.get_or_init(|| {
		installed = true;
		catalog
	});
	if installed { Ok(global) } else { Err(InitError::AlreadyInitialized) }
}

/// Installs a process-wide catalog built from `config`.
pub fn init(config: DispatchConfig) -> Result<&'static Catalog, InitError> {
	install(Catalog::new(config))
}

/// The process-wide catalog, created with the default config if never initialized.
pub fn global() -> &'static Catalog {
	GLOBAL.get_or_init(Catalog::default)
}
