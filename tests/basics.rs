use graft_di::{
    AnyArc, Binding, DiError, FieldInjections, Injectable, Injected, Injector, InjectorOptions,
    InstantiationObserver, Key, Resolver, Scope,
};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

trait Logger: Send + Sync {
    fn log(&self, message: &str) -> String;
}

struct ConsoleLogger;

impl Logger for ConsoleLogger {
    fn log(&self, message: &str) -> String {
        format!("console: {}", message)
    }
}

impl Injectable for ConsoleLogger {
    type Deps = ();
    fn construct(_: ()) -> Self {
        ConsoleLogger
    }
}

struct FileLogger;

impl Logger for FileLogger {
    fn log(&self, message: &str) -> String {
        format!("file: {}", message)
    }
}

impl Injectable for FileLogger {
    type Deps = ();
    fn construct(_: ()) -> Self {
        FileLogger
    }
}

trait Greeter: Send + Sync {
    fn greet(&self, name: &str) -> String;
    fn logger(&self) -> &Arc<dyn Logger>;
}

struct FriendlyGreeter {
    logger: Arc<dyn Logger>,
}

impl Greeter for FriendlyGreeter {
    fn greet(&self, name: &str) -> String {
        self.logger.log(&format!("hello, {}", name))
    }

    fn logger(&self) -> &Arc<dyn Logger> {
        &self.logger
    }
}

impl Injectable for FriendlyGreeter {
    type Deps = (Arc<dyn Logger>,);
    fn construct((logger,): Self::Deps) -> Self {
        FriendlyGreeter { logger }
    }
}

fn logger_binding() -> Binding {
    Binding::bind::<dyn Logger>()
        .to::<ConsoleLogger, _>(|logger| logger as Arc<dyn Logger>)
        .singleton()
}

fn greeter_binding() -> Binding {
    Binding::bind::<dyn Greeter>().to::<FriendlyGreeter, _>(|greeter| greeter as Arc<dyn Greeter>)
}

#[test]
fn test_two_greeters_share_one_logger() {
    let injector = Injector::builder()
        .register_binding(logger_binding())
        .unwrap()
        .register_binding(greeter_binding())
        .unwrap()
        .build()
        .unwrap();

    let first = injector.get_required::<dyn Greeter>();
    let second = injector.get_required::<dyn Greeter>();

    assert!(!Arc::ptr_eq(&first, &second));
    assert!(Arc::ptr_eq(first.logger(), second.logger()));
    assert_eq!(first.greet("ada"), "console: hello, ada");
}

#[test]
fn test_singleton_identity_and_transient_distinctness() {
    struct Clock;
    impl Injectable for Clock {
        type Deps = ();
        fn construct(_: ()) -> Self {
            Clock
        }
    }

    struct Request;
    impl Injectable for Request {
        type Deps = ();
        fn construct(_: ()) -> Self {
            Request
        }
    }

    let injector = Injector::builder()
        .register_binding(Binding::bind::<Clock>().to_self().in_scope(Scope::Singleton))
        .unwrap()
        .register_binding(Binding::bind::<Request>().to_self())
        .unwrap()
        .build()
        .unwrap();

    let c1 = injector.get_required::<Clock>();
    let c2 = injector.get_required::<Clock>();
    assert!(Arc::ptr_eq(&c1, &c2));

    let r1 = injector.get_required::<Request>();
    let r2 = injector.get_required::<Request>();
    assert!(!Arc::ptr_eq(&r1, &r2));
}

#[test]
fn test_preset_instance_is_returned_as_is() {
    let preset: Arc<dyn Logger> = Arc::new(FileLogger);
    let injector = Injector::builder()
        .register_binding(Binding::bind::<dyn Logger>().to_instance(preset.clone()))
        .unwrap()
        .register_binding(greeter_binding())
        .unwrap()
        .build()
        .unwrap();

    let greeter = injector.get_required::<dyn Greeter>();
    assert!(Arc::ptr_eq(greeter.logger(), &preset));
    assert_eq!(greeter.greet("bob"), "file: hello, bob");
}

#[test]
fn test_preset_with_transient_scope_is_rejected() {
    let result = Injector::builder().register_binding(
        Binding::bind::<dyn Logger>()
            .to_instance(Arc::new(ConsoleLogger))
            .in_scope(Scope::Transient),
    );
    assert!(matches!(result, Err(DiError::InvalidConstructor { .. })));
}

#[test]
fn test_unknown_type_then_unrelated_success() {
    let injector = Injector::builder()
        .register_binding(greeter_binding())
        .unwrap()
        .register_binding(Binding::bind::<ConsoleLogger>().to_self())
        .unwrap()
        .build()
        .unwrap();

    match injector.get::<dyn Greeter>() {
        Err(DiError::UnknownDependency(name)) => {
            assert_eq!(name, Key::of::<dyn Logger>().display_name());
        }
        _ => panic!("Expected UnknownDependency"),
    }

    // Nothing stays locked after the failure
    assert!(injector.get::<ConsoleLogger>().is_ok());

    match injector.get::<String>() {
        Err(DiError::UnknownDependency(name)) => assert_eq!(name, "alloc::string::String"),
        _ => panic!("Expected UnknownDependency"),
    }
}

#[test]
fn test_duplicate_binding_names_both_implementations() {
    let result = Injector::builder()
        .register_binding(logger_binding())
        .unwrap()
        .register_binding(
            Binding::bind::<dyn Logger>().to::<FileLogger, _>(|logger| logger as Arc<dyn Logger>),
        );

    let err = result.err().expect("duplicate binding should fail");
    let message = err.to_string();
    assert!(message.contains("ConsoleLogger"), "{}", message);
    assert!(message.contains("FileLogger"), "{}", message);
    assert!(matches!(err, DiError::DuplicateBinding { .. }));
}

static EAGER_ORDER: Mutex<Vec<&'static str>> = parking_lot::const_mutex(Vec::new());

struct Migrations;
impl Injectable for Migrations {
    type Deps = ();
    fn construct(_: ()) -> Self {
        EAGER_ORDER.lock().push("migrations");
        Migrations
    }
}

struct Warmup;
impl Injectable for Warmup {
    type Deps = ();
    fn construct(_: ()) -> Self {
        EAGER_ORDER.lock().push("warmup");
        Warmup
    }
}

#[test]
fn test_eager_singletons_built_in_registration_order() {
    let injector = Injector::builder()
        .register_binding(Binding::bind::<Migrations>().to_self().eager_singleton())
        .unwrap()
        .register_binding(Binding::bind::<Warmup>().to_self().eager_singleton())
        .unwrap()
        .build()
        .unwrap();

    assert_eq!(*EAGER_ORDER.lock(), vec!["migrations", "warmup"]);

    // Already built: no second construction
    injector.get_required::<Migrations>();
    assert_eq!(EAGER_ORDER.lock().len(), 2);
}

#[test]
fn test_eager_instantiation_can_be_disabled() {
    static BUILT: AtomicUsize = AtomicUsize::new(0);

    struct Lazy;
    impl Injectable for Lazy {
        type Deps = ();
        fn construct(_: ()) -> Self {
            BUILT.fetch_add(1, Ordering::SeqCst);
            Lazy
        }
    }

    let injector = Injector::builder()
        .register_binding(Binding::bind::<Lazy>().to_self().eager_singleton())
        .unwrap()
        .options(InjectorOptions::default().with_instantiate_eager(false))
        .build()
        .unwrap();

    assert_eq!(BUILT.load(Ordering::SeqCst), 0);
    injector.get_required::<Lazy>();
    injector.get_required::<Lazy>();
    assert_eq!(BUILT.load(Ordering::SeqCst), 1);
}

struct AuditedService {
    audit: Injected<dyn Logger>,
    ready: AtomicUsize,
}

impl Injectable for AuditedService {
    type Deps = ();

    fn construct(_: ()) -> Self {
        AuditedService {
            audit: Injected::new(),
            ready: AtomicUsize::new(0),
        }
    }

    fn inject_fields(fields: &mut FieldInjections<Self>) {
        fields.field(|s: &AuditedService| &s.audit);
    }

    fn initialize(&self) {
        // Fields are injected before the hook runs
        assert!(self.audit.is_injected());
        self.ready.fetch_add(1, Ordering::SeqCst);
    }
}

#[test]
fn test_field_injection_and_initialize_hook() {
    let injector = Injector::builder()
        .register_binding(logger_binding())
        .unwrap()
        .register_binding(Binding::bind::<AuditedService>().to_self().singleton())
        .unwrap()
        .build()
        .unwrap();

    let service = injector.get_required::<AuditedService>();
    let logger = injector.get_required::<dyn Logger>();
    assert!(Arc::ptr_eq(service.audit.get().unwrap(), &logger));
    assert_eq!(service.ready.load(Ordering::SeqCst), 1);

    // Cached singleton is not re-wired
    let again = injector.get_required::<AuditedService>();
    assert!(Arc::ptr_eq(&service, &again));
    assert_eq!(again.ready.load(Ordering::SeqCst), 1);
}

#[derive(Default)]
struct Recorder {
    instantiated: Mutex<Vec<Key>>,
}

impl InstantiationObserver for Recorder {
    fn instantiated(&self, key: &Key, _instance: &AnyArc) {
        self.instantiated.lock().push(*key);
    }
}

#[test]
fn test_observers_see_each_fresh_instance_once() {
    let recorder = Arc::new(Recorder::default());
    let injector = Injector::builder()
        .register_binding(logger_binding())
        .unwrap()
        .register_binding(greeter_binding())
        .unwrap()
        .add_observer(recorder.clone())
        .build()
        .unwrap();

    injector.get_required::<dyn Greeter>();
    injector.get_required::<dyn Greeter>();

    // Dependencies first; the singleton logger only once
    assert_eq!(
        *recorder.instantiated.lock(),
        vec![
            Key::of::<dyn Logger>(),
            Key::of::<dyn Greeter>(),
            Key::of::<dyn Greeter>(),
        ]
    );
}

#[test]
fn test_reentrant_resolution_is_an_error() {
    struct Reentrant {
        injector: Mutex<Option<Injector>>,
        seen: Mutex<Option<DiError>>,
    }

    impl InstantiationObserver for Reentrant {
        fn instantiated(&self, _key: &Key, _instance: &AnyArc) {
            if let Some(injector) = self.injector.lock().as_ref() {
                *self.seen.lock() = injector.get::<ConsoleLogger>().err();
            }
        }
    }

    let observer = Arc::new(Reentrant { injector: Mutex::new(None), seen: Mutex::new(None) });
    let injector = Injector::builder()
        .register_binding(Binding::bind::<ConsoleLogger>().to_self())
        .unwrap()
        .add_observer(observer.clone())
        .build()
        .unwrap();
    *observer.injector.lock() = Some(injector.clone());

    assert!(injector.get::<ConsoleLogger>().is_ok());
    assert!(matches!(*observer.seen.lock(), Some(DiError::ReentrantResolution(_))));

    // Break the observer -> injector reference cycle
    observer.injector.lock().take();
}

#[test]
fn test_introspection_during_resolution_does_not_block() {
    struct Inspector {
        injector: Mutex<Option<Injector>>,
        seen: Mutex<Option<(usize, bool, usize, String)>>,
    }

    impl InstantiationObserver for Inspector {
        fn instantiated(&self, _key: &Key, _instance: &AnyArc) {
            let injector = self.injector.lock().clone();
            if let Some(injector) = injector {
                *self.seen.lock() = Some((
                    injector.len(),
                    injector.contains(&Key::of::<ConsoleLogger>()),
                    injector.dependency_graph().nodes.len(),
                    format!("{:?}", injector),
                ));
            }
        }
    }

    let observer = Arc::new(Inspector { injector: Mutex::new(None), seen: Mutex::new(None) });
    let injector = Injector::builder()
        .register_binding(Binding::bind::<ConsoleLogger>().to_self())
        .unwrap()
        .add_observer(observer.clone())
        .build()
        .unwrap();
    *observer.injector.lock() = Some(injector.clone());

    let (done, finished) = std::sync::mpsc::channel();
    let worker = injector.clone();
    std::thread::spawn(move || {
        let _ = done.send(worker.get::<ConsoleLogger>().is_ok());
    });
    let resolved = finished.recv_timeout(std::time::Duration::from_secs(5));
    observer.injector.lock().take();

    assert_eq!(resolved, Ok(true));
    let (len, contains, nodes, debug) = observer.seen.lock().take().unwrap();
    assert_eq!(len, 1);
    assert!(contains);
    assert_eq!(nodes, 1);
    assert!(debug.contains("providers: 1"), "{}", debug);
}

#[test]
fn test_injector_introspection() {
    let injector = Injector::builder()
        .register_binding(logger_binding())
        .unwrap()
        .build()
        .unwrap();

    assert_eq!(injector.len(), 1);
    assert!(!injector.is_empty());
    assert!(injector.contains(&Key::of::<dyn Logger>()));
    assert!(!injector.contains(&Key::of::<dyn Greeter>()));
    assert_eq!(injector.options(), &InjectorOptions::default());
}
