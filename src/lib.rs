//! # graft-di
//!
//! Dependency injection built around a binding registry, lazy construction
//! of the object graph and stand-ins that break dependency cycles.
//!
//! ## Features
//!
//! - **Typed constructors**: dependencies are declared as a tuple of `Arc`s on [`Injectable`]
//! - **Scopes**: Transient, Singleton and EagerSingleton providers
//! - **Trait bindings**: request `dyn Trait` and get the bound implementation
//! - **Cycle breaking**: cycles through a trait resolve via forwarding [`Proxy`] stand-ins
//! - **Modules and factories**: factory methods, [`Factory<T>`] and [`CustomProvider`] objects
//! - **Discovery**: marker tables ([`Catalog`]) fill in providers for unbound types
//! - **Field injection**: [`Injected<T>`] slots filled after construction
//!
//! ## Quick Start
//!
//! ```rust
//! use graft_di::{Binding, Injectable, Injector, Resolver};
//! use std::sync::Arc;
//!
//! trait Logger: Send + Sync {
//!     fn log(&self, message: &str) -> String;
//! }
//!
//! struct ConsoleLogger;
//! impl Logger for ConsoleLogger {
//!     fn log(&self, message: &str) -> String {
//!         format!("[LOG] {}", message)
//!     }
//! }
//! impl Injectable for ConsoleLogger {
//!     type Deps = ();
//!     fn construct(_: ()) -> Self { ConsoleLogger }
//! }
//!
//! struct FriendlyGreeter {
//!     logger: Arc<dyn Logger>,
//! }
//! impl Injectable for FriendlyGreeter {
//!     type Deps = (Arc<dyn Logger>,);
//!     fn construct((logger,): Self::Deps) -> Self { FriendlyGreeter { logger } }
//! }
//!
//! let injector = Injector::builder()
//!     .register_binding(
//!         Binding::bind::<dyn Logger>()
//!             .to::<ConsoleLogger, _>(|logger| logger as Arc<dyn Logger>)
//!             .singleton(),
//!     )
//!     .unwrap()
//!     .register_binding(Binding::bind::<FriendlyGreeter>().to_self())
//!     .unwrap()
//!     .build()
//!     .unwrap();
//!
//! let greeter = injector.get_required::<FriendlyGreeter>();
//! assert_eq!(greeter.logger.log("hello"), "[LOG] hello");
//! ```
//!
//! ## Breaking Cycles
//!
//! ```rust
//! use graft_di::{Binding, Injectable, Injected, Injector, Proxy, Resolver};
//! use std::sync::Arc;
//!
//! trait Ping: Send + Sync { fn ping(&self) -> &'static str; }
//! trait Pong: Send + Sync { fn pong(&self) -> &'static str; }
//!
//! impl Ping for Proxy<dyn Ping> {
//!     fn ping(&self) -> &'static str { self.target().ping() }
//! }
//!
//! struct PingImpl { pong: Arc<dyn Pong> }
//! impl Ping for PingImpl { fn ping(&self) -> &'static str { "ping" } }
//! impl Injectable for PingImpl {
//!     type Deps = (Arc<dyn Pong>,);
//!     fn construct((pong,): Self::Deps) -> Self { PingImpl { pong } }
//! }
//!
//! struct PongImpl { ping: Arc<dyn Ping> }
//! impl Pong for PongImpl { fn pong(&self) -> &'static str { "pong" } }
//! impl Injectable for PongImpl {
//!     type Deps = (Arc<dyn Ping>,);
//!     fn construct((ping,): Self::Deps) -> Self { PongImpl { ping } }
//! }
//!
//! let injector = Injector::builder()
//!     .register_binding(Binding::bind::<dyn Ping>().to::<PingImpl, _>(|p| p as Arc<dyn Ping>).singleton())
//!     .unwrap()
//!     .register_binding(Binding::bind::<dyn Pong>().to::<PongImpl, _>(|p| p as Arc<dyn Pong>).singleton())
//!     .unwrap()
//!     .stand_in::<dyn Ping, _>(|proxy| proxy as Arc<dyn Ping>)
//!     .unwrap()
//!     .build()
//!     .unwrap();
//!
//! let pong = injector.get_required::<dyn Pong>();
//! assert_eq!(pong.pong(), "pong");
//! ```

pub mod binding;
pub mod config;
pub mod descriptors;
pub mod discovery;
pub mod error;
pub mod graph;
pub mod injector;
pub mod key;
pub mod observer;
pub mod provider;
pub mod proxy;
pub mod scope;
pub mod traits;

// Internal modules
mod registry;

// Re-export core types
pub use binding::{Binder, Binding, BindingBuilder, Module};
pub use config::InjectorOptions;
pub use descriptors::{
    Activator, ActivatorKind, AnyArc, Dependencies, Dependency, FieldInjections, Injectable, Injected,
};
pub use discovery::Catalog;
pub use error::{DiError, DiResult};
pub use graph::{DependencyEdge, DependencyGraph, EdgeKind, GraphNode};
pub use injector::{Injector, InjectorBuilder};
pub use key::{key_of_type, Key};
pub use observer::{InstantiationObserver, LoggingObserver};
pub use provider::{CustomProvider, Factory};
pub use proxy::{Proxy, ProxyNotInitialized};
pub use scope::Scope;
pub use traits::{Resolver, ResolverCore};
