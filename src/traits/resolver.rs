//! Resolver traits for typed resolution.

use std::sync::Arc;

use crate::descriptors::{unerase, AnyArc};
use crate::error::DiResult;
use crate::key::Key;

/// Object-safe resolution entry point.
///
/// Implemented by [`Injector`](crate::Injector). Most callers use the typed
/// methods of [`Resolver`], which every `ResolverCore` gets for free.
pub trait ResolverCore: Send + Sync {
    /// Resolves the requested type to its type-erased instance.
    ///
    /// The returned value holds an `Arc<T>` where `T` is the type `key` was
    /// built from.
    fn resolve_any(&self, key: &Key) -> DiResult<AnyArc>;
}

/// Typed resolution on top of [`ResolverCore`].
///
/// `T` may be a concrete type or a trait object; both resolve through the
/// same path.
///
/// # Examples
///
/// ```
/// use graft_di::{Binding, Injectable, Injector, Resolver};
/// use std::sync::Arc;
///
/// trait Logger: Send + Sync {
///     fn log(&self, msg: &str) -> String;
/// }
///
/// struct ConsoleLogger;
/// impl Logger for ConsoleLogger {
///     fn log(&self, msg: &str) -> String { format!("LOG: {}", msg) }
/// }
/// impl Injectable for ConsoleLogger {
///     type Deps = ();
///     fn construct(_: ()) -> Self { ConsoleLogger }
/// }
///
/// let injector = Injector::builder()
///     .register_binding(
///         Binding::bind::<dyn Logger>()
///             .to::<ConsoleLogger, _>(|c| c as Arc<dyn Logger>)
///             .singleton(),
///     )
///     .unwrap()
///     .build()
///     .unwrap();
///
/// let logger = injector.get::<dyn Logger>().unwrap();
/// assert_eq!(logger.log("ready"), "LOG: ready");
/// ```
pub trait Resolver: ResolverCore {
    /// Resolves `T`.
    fn get<T: ?Sized + Send + Sync + 'static>(&self) -> DiResult<Arc<T>> {
        let any = self.resolve_any(&Key::of::<T>())?;
        unerase::<T>(&any)
    }

    /// Resolves `T`, panicking on failure.
    ///
    /// Use this when the binding is known to exist and a configuration error
    /// should fail fast.
    ///
    /// # Panics
    ///
    /// Panics if resolution fails.
    fn get_required<T: ?Sized + Send + Sync + 'static>(&self) -> Arc<T> {
        self.get::<T>()
            .unwrap_or_else(|e| panic!("Failed to resolve {}: {:?}", std::any::type_name::<T>(), e))
    }
}

impl<R: ResolverCore + ?Sized> Resolver for R {}
