//! Greeter Demo - Bindings, scopes and modules in one small object graph
//!
//! This example demonstrates:
//! - Binding a trait to its implementation with a singleton scope
//! - Transient services sharing one singleton dependency
//! - A module contributing a factory method and a parameterized factory
//! - Field injection and the post-construction initialize hook
//! - Structured logging of every instantiation through `LoggingObserver`
//!
//! Run with `RUST_LOG=debug cargo run --example greeter` to see the engine's own events.

use graft_di::*;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

trait Logger: Send + Sync {
    fn log(&self, message: &str);
}

struct ConsoleLogger {
    prefix: Arc<Prefix>,
}

impl Logger for ConsoleLogger {
    fn log(&self, message: &str) {
        println!("{} {}", self.prefix.0, message);
    }
}

impl Injectable for ConsoleLogger {
    type Deps = (Arc<Prefix>,);
    fn construct((prefix,): Self::Deps) -> Self {
        ConsoleLogger { prefix }
    }
}

struct Prefix(&'static str);

struct Greeter {
    logger: Arc<dyn Logger>,
    audit: Injected<AuditTrail>,
}

impl Greeter {
    fn greet(&self, name: &str) {
        self.logger.log(&format!("Hello, {}!", name));
        if let Some(audit) = self.audit.get() {
            audit.record(name);
        }
    }
}

impl Injectable for Greeter {
    type Deps = (Arc<dyn Logger>,);

    fn construct((logger,): Self::Deps) -> Self {
        Greeter {
            logger,
            audit: Injected::new(),
        }
    }

    fn inject_fields(fields: &mut FieldInjections<Self>) {
        fields.field(|g: &Greeter| &g.audit);
    }

    fn initialize(&self) {
        self.logger.log("greeter ready");
    }
}

struct AuditTrail {
    entries: AtomicU32,
}

impl AuditTrail {
    fn record(&self, name: &str) {
        let n = self.entries.fetch_add(1, Ordering::SeqCst) + 1;
        println!("  audit #{}: greeted {}", n, name);
    }
}

impl Injectable for AuditTrail {
    type Deps = ();
    fn construct(_: ()) -> Self {
        AuditTrail {
            entries: AtomicU32::new(0),
        }
    }
}

struct GreetingModule;

impl Module for GreetingModule {
    fn configure(&self, binder: &mut Binder) -> DiResult<()> {
        binder
            .bind(
                Binding::bind::<dyn Logger>()
                    .to::<ConsoleLogger, _>(|l| l as Arc<dyn Logger>)
                    .singleton(),
            )
            .bind(Binding::bind::<AuditTrail>().to_self().eager_singleton())
            .bind(Binding::bind::<Greeter>().to_self())
            .provides::<Prefix, (), _>(Scope::Singleton, |()| Arc::new(Prefix("[greeter]")))
            .factory::<Greeter>();
        Ok(())
    }
}

fn main() -> DiResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let injector = Injector::builder()
        .install(GreetingModule)?
        .add_observer(Arc::new(LoggingObserver::with_label("greeter-demo")))
        .options(InjectorOptions::from_env().with_validate_on_build(true))
        .build()?;

    println!("\n1. Two transient greeters, one singleton logger");
    let first = injector.get::<Greeter>()?;
    let second = injector.get::<Greeter>()?;
    first.greet("Ada");
    second.greet("Grace");
    println!(
        "  distinct greeters: {}, shared logger: {}",
        !Arc::ptr_eq(&first, &second),
        Arc::ptr_eq(&first.logger, &second.logger)
    );

    println!("\n2. Greeters built on demand through Factory<Greeter>");
    let factory = injector.get::<Factory<Greeter>>()?;
    factory.create()?.greet("Barbara");

    println!("\n3. Dependency graph");
    println!("{}", injector.dependency_graph().to_dot());

    println!("\n4. Asking for something nobody bound");
    match injector.get::<String>() {
        Err(err) => println!("  {}", err),
        Ok(_) => unreachable!(),
    }

    Ok(())
}
