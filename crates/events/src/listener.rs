//! Listener objects that bind several handlers in one step.
//!
//! A [`Listener`] enumerates its handlers explicitly through a [`ListenerBinder`] when it is
//! registered with [`Catalog::register_listener`]. Handlers created through the binder share the
//! listener's [`ListenerId`], so [`Catalog::unregister_listener_all`] detaches the whole object.

use std::sync::Arc;

use crate::catalog::Catalog;
use crate::error::RegisterError;
use crate::event::Event;
use crate::owner::{ListenerId, OwnerId};
use crate::priority::Priority;
use crate::subscription::{Callback, ListenerResult, Subscription};

/// An object with one or more event handlers.
///
/// ```
/// use std::sync::Arc;
/// use std::sync::atomic::{AtomicUsize, Ordering};
///
/// use hopper_events::{Catalog, Listener, ListenerBinder, OwnerId, Priority, impl_event};
///
/// struct PlayerJoin;
/// impl_event!(PlayerJoin);
///
/// #[derive(Default)]
/// struct JoinCounter(AtomicUsize);
///
/// impl Listener for JoinCounter {
/// 	fn bind(self: Arc<Self>, binder: &mut ListenerBinder<'_>) {
/// 		binder.on_with::<PlayerJoin, _>(Priority::Monitor, true, move |_| {
/// 			self.0.fetch_add(1, Ordering::Relaxed);
/// 			Ok(())
/// 		});
/// 	}
/// }
///
/// let catalog = Catalog::default();
/// let counter = Arc::new(JoinCounter::default());
/// catalog.register_listener(OwnerId::new("stats"), counter.clone()).unwrap();
/// catalog.call(&mut PlayerJoin);
/// assert_eq!(counter.0.load(Ordering::Relaxed), 1);
/// ```
pub trait Listener: Send + Sync + 'static {
	fn bind(self: Arc<Self>, binder: &mut ListenerBinder<'_>);
}

/// Registration context handed to [`Listener::bind`].
///
/// The first failed registration is remembered and later calls become no-ops;
/// [`Catalog::register_listener`] then removes whatever this binder registered.
pub struct ListenerBinder<'a> {
	catalog: &'a Catalog,
	owner: OwnerId,
	listener: ListenerId,
	undo: Vec<Box<dyn FnOnce()>>,
	error: Option<RegisterError>,
}

impl<'a> ListenerBinder<'a> {
	pub(crate) fn new(catalog: &'a Catalog, owner: OwnerId) -> Self {
		Self {
			catalog,
			owner,
			listener: ListenerId::next(),
			undo: Vec::new(),
			error: None,
		}
	}

	pub fn owner(&self) -> &OwnerId {
		&self.owner
	}

	pub fn listener(&self) -> ListenerId {
		self.listener
	}

	/// Wraps `f` as a handler of this listener without registering it.
	///
	/// The returned callback can be passed to [`subscribe`](Self::subscribe) more than once,
	/// for example at several priorities.
	pub fn callback<E, F>(&self, f: F) -> Callback<E>
	where
		E: Event,
		F: Fn(&mut E) -> ListenerResult + Send + Sync + 'static,
	{
		Callback::for_listener(self.listener, f)
	}

	/// Binds `f` at the configured default priority, skipped for cancelled events.
	pub fn on<E, F>(&mut self, f: F) -> &mut Self
	where
		E: Event,
		F: Fn(&mut E) -> ListenerResult + Send + Sync + 'static,
	{
		let priority = self.catalog.config().default_priority;
		self.on_with(priority, false, f)
	}

	/// Binds `f` with an explicit priority and cancellation preference.
	pub fn on_with<E, F>(&mut self, priority: Priority, ignores_cancelled: bool, f: F) -> &mut Self
	where
		E: Event,
		F: Fn(&mut E) -> ListenerResult + Send + Sync + 'static,
	{
		let callback = self.callback(f);
		self.subscribe(priority, ignores_cancelled, callback)
	}

	/// Binds an existing callback.
	///
	/// Binding the same callback twice at the same priority fails the whole registration.
	pub fn subscribe<E: Event>(&mut self, priority: Priority, ignores_cancelled: bool, callback: Callback<E>) -> &mut Self {
		if self.error.is_some() {
			return self;
		}
		let sub = Subscription::new(self.owner.clone(), priority, callback).ignore_cancelled(ignores_cancelled);
		match self.catalog.register(sub.clone()) {
			Ok(()) => {
				let list = self.catalog.handlers::<E>();
				self.undo.push(Box::new(move || {
					list.unregister(&sub);
				}));
			}
			Err(e) => self.error = Some(e),
		}
		self
	}

	/// Number of subscriptions registered so far.
	pub fn bound(&self) -> usize {
		self.undo.len()
	}

	/// Returns the listener id and handler count, or removes everything bound and returns the
	/// first error.
	pub(crate) fn finish(self) -> Result<(ListenerId, usize), RegisterError> {
		let Some(e) = self.error else {
			return Ok((self.listener, self.undo.len()));
		};
		for undo in self.undo.into_iter().rev() {
			undo();
		}
		Err(e)
	}
}
