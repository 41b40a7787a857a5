//! Caller-side delivery of one event to a baked subscriber sequence.
//!
//! Listener failures are isolated: an `Err` result or a panic from one callback is reported
//! to a [`FaultSink`] and delivery continues with the next subscription. The publisher only
//! ever sees the event's final state and a [`DispatchSummary`].

use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};

use crate::event::{Event, is_cancelled};
use crate::owner::{ListenerId, OwnerId};
use crate::priority::Priority;
use crate::subscription::Subscription;

/// Counters for one dispatch pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DispatchSummary {
	/// Callbacks that were invoked, including ones that faulted.
	pub invoked: usize,
	/// Subscriptions skipped because the event was cancelled.
	pub skipped: usize,
	/// Callbacks that returned an error or panicked.
	pub faulted: usize,
}

/// Why a listener failed.
#[derive(Debug)]
pub enum FaultCause {
	Error(anyhow::Error),
	Panic(String),
}

impl fmt::Display for FaultCause {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			FaultCause::Error(e) => write!(f, "{e:#}"),
			FaultCause::Panic(msg) => write!(f, "panicked: {msg}"),
		}
	}
}

/// A listener failure caught during dispatch.
#[derive(Debug)]
pub struct ListenerFault<'a> {
	pub event: &'static str,
	pub owner: &'a OwnerId,
	pub listener: ListenerId,
	pub priority: Priority,
	pub cause: FaultCause,
}

/// Destination for listener faults.
pub trait FaultSink: Send + Sync {
	fn report(&self, fault: ListenerFault<'_>);
}

/// Logs faults through `tracing` at error level.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingFaultSink;

impl FaultSink for TracingFaultSink {
	fn report(&self, fault: ListenerFault<'_>) {
		tracing::error!(
			event = fault.event,
			owner = %fault.owner,
			listener = %fault.listener,
			priority = %fault.priority,
			"Could not pass event to listener: {}",
			fault.cause
		);
	}
}

/// Delivers `event` to `subs` in order.
///
/// A subscription that does not ignore cancelled events is skipped while the event is
/// cancelled. The check happens immediately before each subscription, so a later listener
/// can un-cancel an event and bring subsequent listeners back.
pub fn dispatch<E: Event>(subs: &[Subscription<E>], event: &mut E, sink: &dyn FaultSink) -> DispatchSummary {
	let mut summary = DispatchSummary::default();

	for sub in subs {
		if !sub.ignores_cancelled() && is_cancelled(event) {
			summary.skipped += 1;
			continue;
		}

		summary.invoked += 1;
		let cause = match panic::catch_unwind(AssertUnwindSafe(|| sub.invoke(event))) {
			Ok(Ok(())) => continue,
			Ok(Err(e)) => FaultCause::Error(e),
			Err(payload) => FaultCause::Panic(panic_message(payload.as_ref())),
		};

		summary.faulted += 1;
		sink.report(ListenerFault {
			event: E::NAME,
			owner: sub.owner(),
			listener: sub.listener(),
			priority: sub.priority(),
			cause,
		});
	}

	summary
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
	if let Some(s) = payload.downcast_ref::<&str>() {
		(*s).to_string()
	} else if let Some(s) = payload.downcast_ref::<String>() {
		s.clone()
	} else {
		"<non-string panic payload>".to_string()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn extracts_panic_messages() {
		let payload = panic::catch_unwind(|| panic!("boom-str")).unwrap_err();
		assert_eq!(panic_message(payload.as_ref()), "boom-str");

		let payload = panic::catch_unwind(|| panic!("{}", String::from("boom-string"))).unwrap_err();
		assert_eq!(panic_message(payload.as_ref()), "boom-string");

		let payload = panic::catch_unwind(|| std::panic::panic_any(42u8)).unwrap_err();
		assert_eq!(panic_message(payload.as_ref()), "<non-string panic payload>");
	}

	#[test]
	fn cause_display_includes_context() {
		let err = anyhow::anyhow!("disk full").context("saving region");
		assert_eq!(FaultCause::Error(err).to_string(), "saving region: disk full");
		assert_eq!(FaultCause::Panic("oops".into()).to_string(), "panicked: oops");
	}
}
