/// Marker-driven discovery through a Catalog
use graft_di::{Binding, Catalog, CustomProvider, DiError, Injectable, Injector, Resolver};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

trait Clock: Send + Sync {
    fn now(&self) -> u64;
}

struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> u64 {
        1_700_000_000
    }
}

impl Injectable for SystemClock {
    type Deps = ();
    fn construct(_: ()) -> Self {
        SystemClock
    }
}

struct FrozenClock;

impl Clock for FrozenClock {
    fn now(&self) -> u64 {
        0
    }
}

impl Injectable for FrozenClock {
    type Deps = ();
    fn construct(_: ()) -> Self {
        FrozenClock
    }
}

struct Scheduler {
    clock: Arc<dyn Clock>,
}

impl Injectable for Scheduler {
    type Deps = (Arc<dyn Clock>,);
    fn construct((clock,): Self::Deps) -> Self {
        Scheduler { clock }
    }
}

#[test]
fn test_implemented_by_without_scope_is_transient() {
    let injector = Injector::builder()
        .catalog(Catalog::new().implemented_by::<dyn Clock, SystemClock, _>(|c| c as Arc<dyn Clock>))
        .build()
        .unwrap();

    let a = injector.get_required::<dyn Clock>();
    let b = injector.get_required::<dyn Clock>();
    assert_eq!(a.now(), 1_700_000_000);
    assert!(!Arc::ptr_eq(&a, &b));
}

#[test]
fn test_implemented_by_takes_implementation_singleton_marker() {
    let catalog = Catalog::new()
        .implemented_by::<dyn Clock, SystemClock, _>(|c| c as Arc<dyn Clock>)
        .singleton::<SystemClock>()
        .singleton::<Scheduler>();

    let injector = Injector::builder().catalog(catalog).build().unwrap();

    let scheduler = injector.get_required::<Scheduler>();
    let clock = injector.get_required::<dyn Clock>();
    assert!(Arc::ptr_eq(&scheduler.clock, &clock));
    assert!(Arc::ptr_eq(&scheduler, &injector.get_required::<Scheduler>()));

    // The implementation is only reachable through its abstraction
    assert!(matches!(
        injector.get::<SystemClock>(),
        Err(DiError::UnknownDependency(_))
    ));
}

#[test]
fn test_explicit_binding_wins_over_markers() {
    let injector = Injector::builder()
        .register_binding(Binding::bind::<dyn Clock>().to::<FrozenClock, _>(|c| c as Arc<dyn Clock>))
        .unwrap()
        .catalog(Catalog::new().implemented_by::<dyn Clock, SystemClock, _>(|c| c as Arc<dyn Clock>))
        .build()
        .unwrap();

    assert_eq!(injector.get_required::<dyn Clock>().now(), 0);
}

#[test]
fn test_eager_singleton_marker_builds_at_startup() {
    static STARTED: AtomicUsize = AtomicUsize::new(0);

    struct Heartbeat;
    impl Injectable for Heartbeat {
        type Deps = ();
        fn construct(_: ()) -> Self {
            STARTED.fetch_add(1, Ordering::SeqCst);
            Heartbeat
        }
    }

    let _injector = Injector::builder()
        .catalog(Catalog::new().eager_singleton::<Heartbeat>())
        .build()
        .unwrap();
    assert_eq!(STARTED.load(Ordering::SeqCst), 1);
}

#[test]
fn test_conflicting_construction_markers_fail_build() {
    let catalog = Catalog::new()
        .implemented_by::<dyn Clock, SystemClock, _>(|c| c as Arc<dyn Clock>)
        .implemented_by::<dyn Clock, FrozenClock, _>(|c| c as Arc<dyn Clock>);

    match Injector::builder().catalog(catalog).build() {
        Err(DiError::ConflictingMarkers { first, second, .. }) => {
            assert_eq!(first, "implemented_by");
            assert_eq!(second, "implemented_by");
        }
        other => panic!("Expected ConflictingMarkers, got {:?}", other.err()),
    }
}

struct Nonce(u64);

struct NonceSource {
    next: AtomicUsize,
}

impl Injectable for NonceSource {
    type Deps = ();
    fn construct(_: ()) -> Self {
        NonceSource {
            next: AtomicUsize::new(10),
        }
    }
}

impl CustomProvider<Nonce> for NonceSource {
    fn provide(&self) -> Arc<Nonce> {
        Arc::new(Nonce(self.next.fetch_add(1, Ordering::SeqCst) as u64))
    }
}

#[test]
fn test_provided_by_registers_provider_object() {
    let injector = Injector::builder()
        .catalog(Catalog::new().provided_by::<Nonce, NonceSource>())
        .build()
        .unwrap();

    assert_eq!(injector.get_required::<Nonce>().0, 10);
    assert_eq!(injector.get_required::<Nonce>().0, 11);

    // The provider object was registered as a singleton
    let source = injector.get_required::<NonceSource>();
    assert!(Arc::ptr_eq(&source, &injector.get_required::<NonceSource>()));
}

#[test]
fn test_catalogs_merge_across_builder_calls() {
    let injector = Injector::builder()
        .catalog(Catalog::new().implemented_by::<dyn Clock, SystemClock, _>(|c| c as Arc<dyn Clock>))
        .catalog(Catalog::new().singleton::<Scheduler>())
        .build()
        .unwrap();

    assert_eq!(injector.len(), 2);
    assert_eq!(injector.get_required::<Scheduler>().clock.now(), 1_700_000_000);
}

struct TickingClock {
    ticks: AtomicUsize,
}

impl Clock for TickingClock {
    fn now(&self) -> u64 {
        self.ticks.load(Ordering::SeqCst) as u64
    }
}

impl Injectable for TickingClock {
    type Deps = ();
    fn construct(_: ()) -> Self {
        TickingClock {
            ticks: AtomicUsize::new(0),
        }
    }
}

impl CustomProvider<Nonce> for TickingClock {
    fn provide(&self) -> Arc<Nonce> {
        Arc::new(Nonce(self.ticks.fetch_add(1, Ordering::SeqCst) as u64))
    }
}

#[test]
fn test_scoped_implementation_can_also_be_a_provider_object() {
    let catalog = Catalog::new()
        .implemented_by::<dyn Clock, TickingClock, _>(|c| c as Arc<dyn Clock>)
        .singleton::<TickingClock>()
        .provided_by::<Nonce, TickingClock>();

    let injector = Injector::builder().catalog(catalog).build().unwrap();

    assert_eq!(injector.get_required::<Nonce>().0, 0);
    assert_eq!(injector.get_required::<Nonce>().0, 1);

    let source = injector.get_required::<TickingClock>();
    assert!(Arc::ptr_eq(&source, &injector.get_required::<TickingClock>()));
    assert_eq!(source.now(), 2);

    let clock = injector.get_required::<dyn Clock>();
    assert!(Arc::ptr_eq(&clock, &injector.get_required::<dyn Clock>()));
}
