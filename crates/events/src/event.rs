//! Event payload traits.

/// A value that can be published through a [`HandlerList`](crate::HandlerList).
///
/// Each implementing type gets its own handler list in a [`Catalog`](crate::Catalog),
/// keyed by its [`TypeId`](std::any::TypeId).
pub trait Event: Send + 'static {
	/// Human-readable event name, used in logs and introspection.
	const NAME: &'static str;

	/// Exposes the cancellation flag if this event can be vetoed.
	///
	/// Dispatch consults this before each subscription that does not ignore cancelled
	/// events. Non-cancellable events keep the default.
	fn as_cancellable(&self) -> Option<&dyn Cancellable> {
		None
	}
}

/// Veto flag carried by cancellable events.
///
/// Any listener may flip the flag in either direction; whatever value is set when the last
/// listener returns is what the publisher acts on.
pub trait Cancellable {
	fn is_cancelled(&self) -> bool;

	fn set_cancelled(&mut self, cancelled: bool);

	fn cancel(&mut self) {
		self.set_cancelled(true);
	}
}

/// Returns whether `event` is cancellable and currently cancelled.
#[inline]
pub fn is_cancelled<E: Event>(event: &E) -> bool {
	event.as_cancellable().is_some_and(Cancellable::is_cancelled)
}

/// Implements [`Event`] (and optionally [`Cancellable`]) for a payload type.
///
/// # Example
///
/// ```
/// use hopper_events::{Cancellable, impl_event};
///
/// struct PlayerJoin {
/// 	pub name: String,
/// }
/// impl_event!(PlayerJoin);
///
/// struct BlockBreak {
/// 	pub x: i32,
/// 	pub y: i32,
/// 	pub z: i32,
/// 	cancelled: bool,
/// }
/// impl_event!(BlockBreak, cancellable(cancelled));
///
/// let mut ev = BlockBreak { x: 0, y: 64, z: 0, cancelled: false };
/// ev.cancel();
/// assert!(ev.is_cancelled());
/// ```
#[macro_export]
macro_rules! impl_event {
	($ty:ty) => {
		impl $crate::Event for $ty {
			const NAME: &'static str = stringify!($ty);
		}
	};
	($ty:ty, cancellable($field:ident)) => {
		impl $crate::Event for $ty {
			const NAME: &'static str = stringify!($ty);

			fn as_cancellable(&self) -> ::core::option::Option<&dyn $crate::Cancellable> {
				::core::option::Option::Some(self)
			}
		}

		impl $crate::Cancellable for $ty {
			fn is_cancelled(&self) -> bool {
				self.$field
			}

			fn set_cancelled(&mut self, cancelled: bool) {
				self.$field = cancelled;
			}
		}
	};
}
