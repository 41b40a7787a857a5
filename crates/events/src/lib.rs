//! Priority-ordered event dispatch for plugin hosts.
//!
//! Each event type has a [`HandlerList`]: subscriptions bucketed by [`Priority`] and flattened
//! ("baked") into one ordered snapshot that publishers read without locking. A [`Catalog`]
//! owns the lists for every event type and runs bulk operations over all of them, such as
//! dropping everything a plugin registered when it unloads.
//!
//! # Example
//!
//! ```
//! use hopper_events::{Callback, Cancellable, Catalog, OwnerId, Priority, Subscription, impl_event};
//!
//! struct BlockBreak {
//! 	y: i32,
//! 	cancelled: bool,
//! }
//! impl_event!(BlockBreak, cancellable(cancelled));
//!
//! let catalog = Catalog::default();
//! let protect = OwnerId::new("spawn-protect");
//!
//! catalog
//! 	.register(Subscription::new(
//! 		protect.clone(),
//! 		Priority::High,
//! 		Callback::new(|ev: &mut BlockBreak| {
//! 			if ev.y > 100 {
//! 				ev.cancel();
//! 			}
//! 			Ok(())
//! 		}),
//! 	))
//! 	.unwrap();
//!
//! let mut ev = BlockBreak { y: 120, cancelled: false };
//! catalog.call(&mut ev);
//! assert!(ev.is_cancelled());
//!
//! catalog.unregister_owner_all(&protect);
//! let mut ev = BlockBreak { y: 120, cancelled: false };
//! catalog.call(&mut ev);
//! assert!(!ev.is_cancelled());
//! ```
//!
//! # Ordering
//!
//! Within one dispatch, subscriptions run in ascending priority ([`Priority::Lowest`] first)
//! and, within a priority, in registration order. Subscriptions that do not
//! [ignore cancellation](Subscription::ignore_cancelled) are skipped while the event is
//! cancelled.
//!
//! # Failure isolation
//!
//! A listener that returns an error or panics is reported to the catalog's [`FaultSink`]
//! (by default [`TracingFaultSink`]) and delivery continues. Only duplicate registration is
//! reported to the caller, as [`RegisterError::Duplicate`].

pub mod catalog;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod event;
pub mod handler_list;
pub mod listener;
pub mod owner;
pub mod priority;
pub mod subscription;
pub mod timings;

pub use catalog::{Catalog, global, init, install};
pub use config::DispatchConfig;
pub use dispatch::{DispatchSummary, FaultCause, FaultSink, ListenerFault, TracingFaultSink, dispatch};
pub use error::{ConfigError, InitError, RegisterError};
pub use event::{Cancellable, Event, is_cancelled};
pub use handler_list::{Baked, ErasedHandlerList, HandlerList};
pub use listener::{Listener, ListenerBinder};
pub use owner::{ListenerId, OwnerId};
pub use priority::{ParsePriorityError, Priority};
pub use subscription::{Callback, ListenerResult, Subscription, SubscriptionInfo};
pub use timings::{Timings, TimingsEntry};
