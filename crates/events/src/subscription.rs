//! Subscriptions: one callback bound to one owner and priority.

use std::fmt;
use std::sync::Arc;

use crate::owner::{ListenerId, OwnerId};
use crate::priority::Priority;
use crate::timings::Timings;

/// Result returned by listener callbacks.
///
/// An `Err` is reported to the dispatching catalog's [`FaultSink`](crate::FaultSink) and
/// never reaches the publisher.
pub type ListenerResult = anyhow::Result<()>;

type HandlerFn<E> = dyn Fn(&mut E) -> ListenerResult + Send + Sync;

/// A listener callback for events of type `E`.
///
/// Cloning is cheap and preserves identity: two callbacks are the same callback only if they
/// share both the [`ListenerId`] and the underlying closure.
pub struct Callback<E> {
	listener: ListenerId,
	f: Arc<HandlerFn<E>>,
}

impl<E> Clone for Callback<E> {
	fn clone(&self) -> Self {
		Self {
			listener: self.listener,
			f: Arc::clone(&self.f),
		}
	}
}

impl<E> Callback<E> {
	/// Wraps `f` as a standalone listener with a freshly allocated [`ListenerId`].
	pub fn new<F>(f: F) -> Self
	where
		F: Fn(&mut E) -> ListenerResult + Send + Sync + 'static,
	{
		Self::for_listener(ListenerId::next(), f)
	}

	/// Wraps `f` as one handler of an existing listener.
	pub fn for_listener<F>(listener: ListenerId, f: F) -> Self
	where
		F: Fn(&mut E) -> ListenerResult + Send + Sync + 'static,
	{
		Self { listener, f: Arc::new(f) }
	}

	pub fn listener(&self) -> ListenerId {
		self.listener
	}

	/// Identity comparison.
	pub fn same_as(&self, other: &Self) -> bool {
		self.listener == other.listener && Arc::ptr_eq(&self.f, &other.f)
	}

	#[inline]
	pub(crate) fn invoke(&self, event: &mut E) -> ListenerResult {
		(self.f)(event)
	}
}

impl<E> fmt::Debug for Callback<E> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_tuple("Callback").field(&self.listener).finish()
	}
}

/// A callback registered on behalf of an owner at a priority.
///
/// Immutable once built. Two subscriptions are equal for registration purposes when they
/// share owner, priority and callback identity; see [`Subscription::same_binding`].
pub struct Subscription<E> {
	owner: OwnerId,
	priority: Priority,
	callback: Callback<E>,
	ignores_cancelled: bool,
	timings: Option<Arc<Timings>>,
}

impl<E> Clone for Subscription<E> {
	fn clone(&self) -> Self {
		Self {
			owner: self.owner.clone(),
			priority: self.priority,
			callback: self.callback.clone(),
			ignores_cancelled: self.ignores_cancelled,
			timings: self.timings.clone(),
		}
	}
}

impl<E> Subscription<E> {
	/// Creates a subscription that is skipped once the event has been cancelled.
	pub fn new(owner: OwnerId, priority: Priority, callback: Callback<E>) -> Self {
		Self {
			owner,
			priority,
			callback,
			ignores_cancelled: false,
			timings: None,
		}
	}

	/// Sets whether the callback still runs for events that are already cancelled.
	pub fn ignore_cancelled(mut self, ignores_cancelled: bool) -> Self {
		self.ignores_cancelled = ignores_cancelled;
		self
	}

	/// Attaches a fresh [`Timings`] record.
	pub fn timed(mut self) -> Self {
		self.timings = Some(Arc::new(Timings::new()));
		self
	}

	pub fn owner(&self) -> &OwnerId {
		&self.owner
	}

	pub fn priority(&self) -> Priority {
		self.priority
	}

	pub fn callback(&self) -> &Callback<E> {
		&self.callback
	}

	pub fn listener(&self) -> ListenerId {
		self.callback.listener
	}

	/// `true` if the callback runs even when the event is cancelled.
	pub fn ignores_cancelled(&self) -> bool {
		self.ignores_cancelled
	}

	pub fn timings(&self) -> Option<&Timings> {
		self.timings.as_deref()
	}

	/// Whether `other` binds the same callback for the same owner at the same priority.
	pub fn same_binding(&self, other: &Self) -> bool {
		self.priority == other.priority && self.owner == other.owner && self.callback.same_as(&other.callback)
	}

	/// Runs the callback, recording timings if attached.
	#[inline]
	pub(crate) fn invoke(&self, event: &mut E) -> ListenerResult {
		match &self.timings {
			Some(t) => t.measure(|| self.callback.invoke(event)),
			None => self.callback.invoke(event),
		}
	}

	pub(crate) fn info(&self, event: &'static str) -> SubscriptionInfo {
		SubscriptionInfo {
			event,
			owner: self.owner.clone(),
			listener: self.listener(),
			priority: self.priority,
			ignores_cancelled: self.ignores_cancelled,
		}
	}
}

impl<E> fmt::Debug for Subscription<E> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Subscription")
			.field("owner", &self.owner)
			.field("priority", &self.priority)
			.field("listener", &self.callback.listener)
			.field("ignores_cancelled", &self.ignores_cancelled)
			.field("timed", &self.timings.is_some())
			.finish()
	}
}

/// Type-erased description of a live subscription, for introspection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionInfo {
	pub event: &'static str,
	pub owner: OwnerId,
	pub listener: ListenerId,
	pub priority: Priority,
	pub ignores_cancelled: bool,
}
