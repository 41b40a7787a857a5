use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use pretty_assertions::assert_eq;
use rstest::rstest;

use super::*;
use crate::dispatch::ListenerFault;
use crate::priority::Priority;
use crate::subscription::Callback;

#[derive(Default)]
struct Join {
	seen: Vec<&'static str>,
}
crate::impl_event!(Join);

#[derive(Default)]
struct Chat {
	seen: Vec<&'static str>,
	cancelled: bool,
}
crate::impl_event!(Chat, cancellable(cancelled));

#[derive(Default)]
struct Quit {
	seen: Vec<&'static str>,
}
crate::impl_event!(Quit);

trait Seen {
	fn seen(&mut self) -> &mut Vec<&'static str>;
}

impl Seen for Join {
	fn seen(&mut self) -> &mut Vec<&'static str> {
		&mut self.seen
	}
}

impl Seen for Chat {
	fn seen(&mut self) -> &mut Vec<&'static str> {
		&mut self.seen
	}
}

impl Seen for Quit {
	fn seen(&mut self) -> &mut Vec<&'static str> {
		&mut self.seen
	}
}

fn mark<E: Event + Seen>(owner: &str, priority: Priority, tag: &'static str) -> Subscription<E> {
	Subscription::new(
		OwnerId::new(owner),
		priority,
		Callback::new(move |ev: &mut E| {
			ev.seen().push(tag);
			Ok(())
		}),
	)
}

fn seen<E: Event + Seen + Default>(catalog: &Catalog) -> Vec<&'static str> {
	let mut ev = E::default();
	catalog.call(&mut ev);
	ev.seen().clone()
}

#[test]
fn handlers_resolve_one_list_per_type() {
	let catalog = Catalog::default();
	assert!(catalog.get::<Join>().is_none());

	let a = catalog.handlers::<Join>();
	let b = catalog.handlers::<Join>();
	let chat = catalog.handlers::<Chat>();

	assert!(Arc::ptr_eq(&a, &b));
	assert!(Arc::ptr_eq(&a, &catalog.get::<Join>().expect("created above")));
	assert_eq!(chat.event_name(), "Chat");
	assert_eq!(catalog.handler_lists().iter().map(|l| l.event_name()).collect::<Vec<_>>(), vec!["Join", "Chat"]);
}

#[test]
fn owner_sweep_reaches_every_list() {
	let catalog = Catalog::default();
	let gone = OwnerId::new("gone");

	catalog.register(mark::<Join>("gone", Priority::Low, "j-gone")).unwrap();
	catalog.register(mark::<Join>("kept", Priority::High, "j-kept")).unwrap();
	catalog.register(mark::<Chat>("gone", Priority::Normal, "c-gone")).unwrap();
	catalog.register(mark::<Chat>("gone", Priority::Monitor, "c-gone-2")).unwrap();
	catalog.register(mark::<Quit>("gone", Priority::Lowest, "q-gone")).unwrap();
	catalog.bake_all();

	assert_eq!(catalog.unregister_owner_all(&gone), 4);

	assert!(catalog.handlers::<Join>().listeners().iter().all(|s| s.owner().name() == "kept"));
	assert!(catalog.handlers::<Chat>().listeners().is_empty());
	assert!(catalog.handlers::<Quit>().listeners().is_empty());
	assert_eq!(seen::<Join>(&catalog), vec!["j-kept"]);

	assert_eq!(catalog.unregister_owner_all(&gone), 0);
}

#[test]
fn listener_sweep_spans_types_and_owners() {
	let catalog = Catalog::default();
	let id = ListenerId::next();

	for (owner, priority) in [("a", Priority::Low), ("b", Priority::High)] {
		catalog
			.register(Subscription::new(OwnerId::new(owner), priority, Callback::for_listener(id, |_: &mut Join| Ok(()))))
			.unwrap();
	}
	catalog
		.register(Subscription::new(OwnerId::new("a"), Priority::Normal, Callback::for_listener(id, |_: &mut Quit| Ok(()))))
		.unwrap();
	catalog.register(mark::<Quit>("a", Priority::Normal, "other")).unwrap();

	assert_eq!(catalog.unregister_listener_all(id), 3);
	assert!(catalog.handlers::<Join>().is_empty());
	assert_eq!(seen::<Quit>(&catalog), vec!["other"]);
}

#[test]
fn reset_all_empties_every_list() {
	let catalog = Catalog::default();
	catalog.register(mark::<Join>("a", Priority::Low, "j")).unwrap();
	catalog.register(mark::<Chat>("b", Priority::Low, "c")).unwrap();
	catalog.register(mark::<Chat>("b", Priority::High, "c2")).unwrap();

	assert_eq!(catalog.reset_all(), 3);
	assert!(catalog.handler_lists().iter().all(|l| l.len() == 0));
	assert_eq!(catalog.handler_lists().len(), 2);
	assert!(seen::<Chat>(&catalog).is_empty());
}

#[test]
fn bake_all_only_rebuilds_stale_lists() {
	let catalog = Catalog::default();
	catalog.register(mark::<Join>("a", Priority::Low, "j")).unwrap();
	catalog.register(mark::<Chat>("a", Priority::Low, "c")).unwrap();

	assert_eq!(catalog.bake_all(), 2);
	assert_eq!(catalog.bake_all(), 0);
	assert!(catalog.handler_lists().iter().all(|l| l.is_baked()));

	catalog.register(mark::<Chat>("a", Priority::High, "c2")).unwrap();
	assert_eq!(catalog.bake_all(), 1);
}

#[test]
fn subscriptions_of_lists_owner_bindings_in_list_order() {
	let catalog = Catalog::default();
	catalog.register(mark::<Join>("a", Priority::High, "j")).unwrap();
	catalog.register(mark::<Chat>("a", Priority::Low, "c").ignore_cancelled(true)).unwrap();
	catalog.register(mark::<Chat>("b", Priority::Low, "c-b")).unwrap();

	let found: Vec<_> = catalog
		.subscriptions_of(&OwnerId::new("a"))
		.into_iter()
		.map(|info| (info.event, info.priority, info.ignores_cancelled))
		.collect();
	assert_eq!(found, vec![("Join", Priority::High, false), ("Chat", Priority::Low, true)]);
}

#[test]
fn tracked_lists_join_sweeps() {
	let catalog = Catalog::default();
	let external = Arc::new(HandlerList::<Quit>::new());
	external.register(mark::<Quit>("a", Priority::Normal, "q")).unwrap();

	assert!(catalog.track(&external));
	assert!(!catalog.track(&external));
	assert_eq!(catalog.handler_lists().len(), 1);
	assert!(catalog.get::<Quit>().is_none());

	assert_eq!(catalog.unregister_owner_all(&OwnerId::new("a")), 1);
	assert!(external.is_empty());
}

#[test]
fn call_without_list_does_nothing() {
	let catalog = Catalog::default();
	let mut ev = Quit::default();
	assert_eq!(catalog.call(&mut ev), DispatchSummary::default());
	assert!(catalog.get::<Quit>().is_none());
	assert!(catalog.handler_lists().is_empty());
}

#[derive(Default)]
struct Collect(Mutex<Vec<String>>);

impl FaultSink for Collect {
	fn report(&self, fault: ListenerFault<'_>) {
		self.0.lock().push(format!("{}/{}: {}", fault.event, fault.owner, fault.cause));
	}
}

#[test]
fn call_reports_faults_to_catalog_sink() {
	let sink = Arc::new(Collect::default());
	let catalog = Catalog::with_sink(DispatchConfig::default(), sink.clone());
	catalog
		.register(Subscription::new(OwnerId::new("bad"), Priority::Low, Callback::new(|_: &mut Chat| panic!("bad plugin"))))
		.unwrap();
	catalog.register(mark::<Chat>("good", Priority::High, "good")).unwrap();

	assert_eq!(seen::<Chat>(&catalog), vec!["good"]);
	assert_eq!(*sink.0.lock(), vec!["Chat/bad: panicked: bad plugin".to_string()]);
}

struct Greeter {
	joins: AtomicUsize,
}

impl Listener for Greeter {
	fn bind(self: Arc<Self>, binder: &mut ListenerBinder<'_>) {
		let this = Arc::clone(&self);
		binder
			.on::<Join, _>(move |ev| {
				this.joins.fetch_add(1, Ordering::Relaxed);
				ev.seen.push("greet");
				Ok(())
			})
			.on_with::<Chat, _>(Priority::Monitor, true, |ev| {
				ev.seen.push("log");
				Ok(())
			});
	}
}

#[rstest]
#[case::baked(true)]
#[case::lazy(false)]
fn register_listener_binds_every_handler(#[case] bake_after: bool) {
	let catalog = Catalog::new(DispatchConfig {
		default_priority: Priority::High,
		bake_after_listener_registration: bake_after,
		..DispatchConfig::default()
	});
	let greeter = Arc::new(Greeter { joins: AtomicUsize::new(0) });
	let owner = OwnerId::new("greeter");

	let id = catalog.register_listener(owner.clone(), greeter.clone()).unwrap();

	assert_eq!(catalog.handler_lists().iter().all(|l| l.is_baked()), bake_after);
	let infos = catalog.subscriptions_of(&owner);
	assert_eq!(infos.len(), 2);
	assert!(infos.iter().all(|info| info.listener == id));
	assert_eq!(infos[0].priority, Priority::High);

	let mut chat = Chat {
		cancelled: true,
		..Chat::default()
	};
	catalog.call(&mut chat);
	assert_eq!(chat.seen, vec!["log"]);
	assert_eq!(seen::<Join>(&catalog), vec!["greet"]);
	assert_eq!(greeter.joins.load(Ordering::Relaxed), 1);

	assert_eq!(catalog.unregister_listener_all(id), 2);
	assert!(seen::<Join>(&catalog).is_empty());
}

struct DoubleBind;

impl Listener for DoubleBind {
	fn bind(self: Arc<Self>, binder: &mut ListenerBinder<'_>) {
		let audit = binder.callback::<Join, _>(|ev| {
			ev.seen.push("audit");
			Ok(())
		});
		binder
			.on_with::<Chat, _>(Priority::Low, false, |_| Ok(()))
			.subscribe(Priority::Lowest, false, audit.clone())
			.subscribe(Priority::Monitor, true, audit.clone());
		assert_eq!(binder.bound(), 3);
		binder.subscribe(Priority::Monitor, false, audit);
	}
}

#[test]
fn failed_listener_registration_leaves_nothing_behind() {
	let catalog = Catalog::default();
	catalog.register(mark::<Join>("other", Priority::Normal, "other")).unwrap();
	let owner = OwnerId::new("double");

	let err = catalog.register_listener(owner.clone(), Arc::new(DoubleBind)).unwrap_err();

	assert!(matches!(err, RegisterError::Duplicate { event: "Join", priority: Priority::Monitor, .. }));
	assert!(catalog.subscriptions_of(&owner).is_empty());
	assert!(catalog.handlers::<Chat>().is_empty());
	assert_eq!(catalog.handlers::<Join>().len(), 1);
	assert_eq!(seen::<Join>(&catalog), vec!["other"]);
}

#[test]
fn one_callback_may_bind_at_several_priorities() {
	struct Twice;

	impl Listener for Twice {
		fn bind(self: Arc<Self>, binder: &mut ListenerBinder<'_>) {
			let tick = binder.callback::<Join, _>(|ev| {
				ev.seen.push("tick");
				Ok(())
			});
			binder.subscribe(Priority::Low, false, tick.clone()).subscribe(Priority::High, false, tick);
		}
	}

	let catalog = Catalog::default();
	let id = catalog.register_listener(OwnerId::new("twice"), Arc::new(Twice)).unwrap();
	assert_eq!(seen::<Join>(&catalog), vec!["tick", "tick"]);
	assert_eq!(catalog.unregister_listener_all(id), 2);
}

#[test]
fn concurrent_bake_all_counts_each_list_once() {
	let catalog = Catalog::default();
	catalog.register(mark::<Join>("a", Priority::Low, "j")).unwrap();
	catalog.register(mark::<Chat>("a", Priority::Low, "c")).unwrap();
	catalog.register(mark::<Quit>("a", Priority::Low, "q")).unwrap();

	let total: usize = std::thread::scope(|s| {
		let handles: Vec<_> = (0..8).map(|_| s.spawn(|| catalog.bake_all())).collect();
		handles.into_iter().map(|h| h.join().unwrap()).sum()
	});

	assert_eq!(total, 3);
	assert_eq!(catalog.bake_all(), 0);
}

#[test]
fn timings_report_orders_by_total_time() {
	let catalog = Catalog::new(DispatchConfig {
		timings: true,
		..DispatchConfig::default()
	});
	catalog.register(mark::<Join>("fast", Priority::Low, "fast")).unwrap();
	catalog
		.register(Subscription::new(
			OwnerId::new("slow"),
			Priority::High,
			Callback::new(|_: &mut Join| {
				std::thread::sleep(Duration::from_millis(5));
				Ok(())
			}),
		))
		.unwrap();

	seen::<Join>(&catalog);
	seen::<Join>(&catalog);

	let report = catalog.timings_report();
	assert_eq!(report.iter().map(|e| e.owner.name()).collect::<Vec<_>>(), vec!["slow", "fast"]);
	assert!(report.iter().all(|e| e.count == 2));
	assert!(report[0].average() >= Duration::from_millis(5));

	catalog.reset_timings();
	assert!(catalog.timings_report().iter().all(|e| e.count == 0));
}

#[test]
fn untimed_catalog_reports_nothing() {
	let catalog = Catalog::default();
	catalog.register(mark::<Join>("a", Priority::Low, "a")).unwrap();
	seen::<Join>(&catalog);
	assert!(catalog.timings_report().is_empty());
}

#[test]
fn concurrent_first_use_creates_one_list() {
	let catalog = Catalog::default();
	let lists: Vec<_> = std::thread::scope(|s| {
		let handles: Vec<_> = (0..4).map(|_| s.spawn(|| catalog.handlers::<Join>())).collect();
		handles.into_iter().map(|h| h.join().unwrap()).collect()
	});

	assert!(lists.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));
	assert_eq!(catalog.handler_lists().len(), 1);
}

#[test]
fn global_catalog_installs_once() {
	let installed = init(DispatchConfig {
		timings: true,
		..DispatchConfig::default()
	})
	.expect("first install");

	assert!(std::ptr::eq(installed, global()));
	assert!(global().config().timings);
	assert_eq!(install(Catalog::default()).err(), Some(InitError::AlreadyInitialized));
}
