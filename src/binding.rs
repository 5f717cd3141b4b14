//! Binding records and grouped configuration modules.

use std::marker::PhantomData;
use std::sync::Arc;

use crate::descriptors::{erase, Activator, AnyArc, Dependencies, Injectable};
use crate::error::{DiError, DiResult};
use crate::key::Key;
use crate::provider::{forward_through, CustomProvider, Factory, FactoryRecipe, Provider, Strategy};
use crate::scope::Scope;

enum Source {
    Activator(Activator),
    Preset(AnyArc),
}

/// Immutable description of how one requested type is satisfied.
///
/// Start with [`Binding::bind`], pick the implementation, then optionally a
/// scope. Bindings default to [`Scope::Transient`]; preset instances default
/// to [`Scope::Singleton`].
///
/// # Examples
///
/// ```rust
/// use graft_di::{Binding, Injectable, Scope};
/// use std::sync::Arc;
///
/// trait Logger: Send + Sync {}
///
/// struct ConsoleLogger;
/// impl Logger for ConsoleLogger {}
/// impl Injectable for ConsoleLogger {
///     type Deps = ();
///     fn construct(_: ()) -> Self { ConsoleLogger }
/// }
///
/// let binding = Binding::bind::<dyn Logger>()
///     .to::<ConsoleLogger, _>(|c| c as Arc<dyn Logger>)
///     .singleton();
/// assert_eq!(binding.scope(), Scope::Singleton);
/// assert!(binding.implementation().display_name().ends_with("ConsoleLogger"));
/// ```
pub struct Binding {
    requested: Key,
    implementation: Key,
    scope: Scope,
    source: Source,
}

/// First half of a [`Binding`]: the requested type without an implementation.
pub struct BindingBuilder<R: ?Sized> {
    _requested: PhantomData<fn() -> Arc<R>>,
}

impl Binding {
    /// Starts a binding for the requested type `R`.
    pub fn bind<R: ?Sized + Send + Sync + 'static>() -> BindingBuilder<R> {
        BindingBuilder {
            _requested: PhantomData,
        }
    }

    /// Sets the scope.
    pub fn in_scope(mut self, scope: Scope) -> Self {
        self.scope = scope;
        self
    }

    /// Shorthand for `in_scope(Scope::Singleton)`.
    pub fn singleton(self) -> Self {
        self.in_scope(Scope::Singleton)
    }

    /// Shorthand for `in_scope(Scope::EagerSingleton)`.
    pub fn eager_singleton(self) -> Self {
        self.in_scope(Scope::EagerSingleton)
    }

    pub fn requested(&self) -> Key {
        self.requested
    }

    pub fn implementation(&self) -> Key {
        self.implementation
    }

    pub fn scope(&self) -> Scope {
        self.scope
    }

    /// Whether the binding carries a pre-built instance.
    pub fn is_preset(&self) -> bool {
        matches!(self.source, Source::Preset(_))
    }

    pub(crate) fn into_provider(self) -> DiResult<Provider> {
        let strategy = match self.source {
            Source::Activator(activator) => Strategy::constructed(activator, self.scope),
            Source::Preset(_) if !self.scope.is_singleton() => {
                return Err(DiError::InvalidConstructor {
                    type_name: self.requested.display_name(),
                    reason: "a preset instance requires a singleton scope",
                })
            }
            Source::Preset(instance) => Strategy::Preset {
                instance,
                scope: self.scope,
            },
        };
        Ok(Provider::new(self.requested, strategy))
    }
}

impl std::fmt::Debug for Binding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Binding")
            .field("requested", &self.requested)
            .field("implementation", &self.implementation)
            .field("scope", &self.scope)
            .field("preset", &self.is_preset())
            .finish()
    }
}

impl<R: ?Sized + Send + Sync + 'static> BindingBuilder<R> {
    /// Binds `R` to the implementation `I`, exposed through `upcast`.
    ///
    /// For trait objects the upcast is the unsizing cast
    /// `|i| i as Arc<dyn Trait>`; an implementation that does not provide the
    /// capability is rejected at compile time.
    pub fn to<I, U>(self, upcast: U) -> Binding
    where
        I: Injectable,
        U: Fn(Arc<I>) -> Arc<R> + Send + Sync + 'static,
    {
        Binding {
            requested: Key::of::<R>(),
            implementation: Key::of::<I>(),
            scope: Scope::Transient,
            source: Source::Activator(Activator::constructor::<R, I, U>(upcast)),
        }
    }

    /// Binds `R` to an already built instance (singleton unless re-scoped).
    pub fn to_instance(self, instance: Arc<R>) -> Binding {
        Binding {
            requested: Key::of::<R>(),
            implementation: Key::of::<R>(),
            scope: Scope::Singleton,
            source: Source::Preset(erase(instance)),
        }
    }
}

impl<R: Injectable> BindingBuilder<R> {
    /// Binds a concrete type to itself.
    pub fn to_self(self) -> Binding {
        self.to::<R, _>(|instance| instance)
    }
}

/// A group of bindings and factory methods installed together.
///
/// # Examples
///
/// ```rust
/// use graft_di::{Binder, Binding, DiResult, Injectable, Injector, Module, Resolver, Scope};
/// use std::sync::Arc;
///
/// struct Settings { url: String }
///
/// struct Database { url: String }
/// impl Injectable for Database {
///     type Deps = (Arc<Settings>,);
///     fn construct((settings,): Self::Deps) -> Self {
///         Database { url: settings.url.clone() }
///     }
/// }
///
/// struct StorageModule;
/// impl Module for StorageModule {
///     fn configure(&self, binder: &mut Binder) -> DiResult<()> {
///         binder
///             .bind(Binding::bind::<Database>().to_self().singleton())
///             .provides::<Settings, (), _>(Scope::Singleton, |()| {
///                 Arc::new(Settings { url: "postgres://localhost".into() })
///             });
///         Ok(())
///     }
/// }
///
/// let injector = Injector::builder().install(StorageModule).unwrap().build().unwrap();
/// assert_eq!(injector.get_required::<Database>().url, "postgres://localhost");
/// ```
pub trait Module {
    /// Declares this module's bindings and factory methods.
    fn configure(&self, binder: &mut Binder) -> DiResult<()>;
}

/// Collects what a [`Module`] declares.
///
/// Plain bindings are registered before factory methods, factories and
/// forwarding providers, each group in declaration order.
#[derive(Default)]
pub struct Binder {
    bindings: Vec<Binding>,
    methods: Vec<Provider>,
}

impl Binder {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Adds a binding record.
    pub fn bind(&mut self, binding: Binding) -> &mut Self {
        self.bindings.push(binding);
        self
    }

    /// Adds a factory method producing `R` from the dependency tuple `D`.
    pub fn provides<R, D, F>(&mut self, scope: Scope, factory: F) -> &mut Self
    where
        R: ?Sized + Send + Sync + 'static,
        D: Dependencies,
        F: Fn(D) -> Arc<R> + Send + Sync + 'static,
    {
        self.methods.push(Provider::new(
            Key::of::<R>(),
            Strategy::FactoryMethod {
                activator: Activator::factory_method::<R, D, F>(factory),
                scope,
            },
        ));
        self
    }

    /// Registers `Factory<T>` building fresh `T` instances.
    pub fn factory<T: Injectable>(&mut self) -> &mut Self {
        self.factory_of::<T, T, _>(|instance| instance)
    }

    /// Registers `Factory<R>` building fresh `I` instances exposed as `R`.
    pub fn factory_of<R, I, U>(&mut self, upcast: U) -> &mut Self
    where
        R: ?Sized + Send + Sync + 'static,
        I: Injectable,
        U: Fn(Arc<I>) -> Arc<R> + Send + Sync + 'static,
    {
        self.methods.push(Provider::new(
            Key::of::<Factory<R>>(),
            Strategy::ParameterizedFactory(FactoryRecipe::new::<R, I, U>(upcast)),
        ));
        self
    }

    /// Satisfies `T` by asking the provider object `P`, which must be bound separately.
    pub fn provided_by<T, P>(&mut self) -> &mut Self
    where
        T: ?Sized + Send + Sync + 'static,
        P: CustomProvider<T>,
    {
        self.methods.push(Provider::new(
            Key::of::<T>(),
            Strategy::Forwarding {
                provider: Key::of::<P>(),
                forward: forward_through::<T, P>(),
            },
        ));
        self
    }

    /// Providers in registration order: bindings first, then the rest.
    pub(crate) fn into_providers(self) -> DiResult<Vec<Provider>> {
        let mut providers = Vec::with_capacity(self.bindings.len() + self.methods.len());
        for binding in self.bindings {
            providers.push(binding.into_provider()?);
        }
        providers.extend(self.methods);
        Ok(providers)
    }
}
