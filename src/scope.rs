//! Binding scope definitions.

/// Scopes controlling instance caching behavior
///
/// Defines how instances produced for a binding are created, cached and
/// shared by the [`Injector`](crate::Injector).
///
/// # Scope Characteristics
///
/// - **Transient**: new instance on every resolution, never cached
/// - **Singleton**: built on first resolution, cached for the injector's lifetime
/// - **EagerSingleton**: like `Singleton`, but built during
///   [`InjectorBuilder::build`](crate::InjectorBuilder::build)
///
/// # Examples
///
/// ```rust
/// use graft_di::{Binding, Injectable, Injector, Resolver, Scope};
/// use std::sync::Arc;
///
/// struct Clock;
/// impl Injectable for Clock {
///     type Deps = ();
///     fn construct(_: ()) -> Self { Clock }
/// }
///
/// struct Request;
/// impl Injectable for Request {
///     type Deps = ();
///     fn construct(_: ()) -> Self { Request }
/// }
///
/// let injector = Injector::builder()
///     .register_binding(Binding::bind::<Clock>().to_self().in_scope(Scope::Singleton))
///     .unwrap()
///     .register_binding(Binding::bind::<Request>().to_self())
///     .unwrap()
///     .build()
///     .unwrap();
///
/// let a = injector.get_required::<Clock>();
/// let b = injector.get_required::<Clock>();
/// assert!(Arc::ptr_eq(&a, &b));
///
/// let r1 = injector.get_required::<Request>();
/// let r2 = injector.get_required::<Request>();
/// assert!(!Arc::ptr_eq(&r1, &r2));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "config", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "config", serde(rename_all = "snake_case"))]
pub enum Scope {
    /// New instance per resolution, never cached
    #[default]
    Transient,
    /// Single instance per injector, built on first request
    Singleton,
    /// Single instance per injector, built as soon as configuration completes
    ///
    /// Used for side-effecting startup objects that nothing else depends on.
    EagerSingleton,
}

impl Scope {
    /// Whether instances are cached by the provider.
    #[inline]
    pub fn is_singleton(self) -> bool {
        matches!(self, Scope::Singleton | Scope::EagerSingleton)
    }

    /// Whether the provider is built during `InjectorBuilder::build`.
    #[inline]
    pub fn is_eager(self) -> bool {
        matches!(self, Scope::EagerSingleton)
    }
}
