//! The injector: builder, resolution engine and top-level resolve.
//!
//! All resolution goes through one [`Engine`] guarded by a mutex. A
//! top-level [`Injector::resolve_any`] call holds that lock for the whole
//! object graph it builds, so the lock set and issued stand-ins always
//! describe exactly one pass.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, info, instrument, trace};

use crate::binding::{Binding, Binder, Module};
use crate::config::InjectorOptions;
use crate::descriptors::{AnyArc, Wiring};
use crate::discovery::Catalog;
use crate::error::{DiError, DiResult};
use crate::graph::DependencyGraph;
use crate::key::Key;
use crate::observer::{InstantiationObserver, Observers};
use crate::provider::Provided;
use crate::proxy::{Proxy, ProxyNotInitialized, StandInFactory};
use crate::registry::{KeyMap, ProviderRegistry};
use crate::traits::ResolverCore;

pub(crate) mod state;

use state::{ActiveGuard, ResolutionState};

/// Resolution engine: registry, stand-in factories and per-pass state.
pub(crate) struct Engine {
    registry: ProviderRegistry,
    stand_ins: KeyMap<StandInFactory>,
    observers: Observers,
    state: ResolutionState,
}

impl Engine {
    fn new(
        registry: ProviderRegistry,
        stand_ins: KeyMap<StandInFactory>,
        observers: Observers,
        max_depth: usize,
    ) -> Self {
        Self {
            registry,
            stand_ins,
            observers,
            state: ResolutionState::new(max_depth),
        }
    }

    /// Returns a fully constructed and wired instance for `key`.
    fn resolve(&mut self, key: Key) -> DiResult<AnyArc> {
        let (initialized, implementation) = {
            let provider = self.registry.lookup(&key)?;
            (provider.is_initialized(), provider.implementation())
        };

        if self.state.is_locked(&key) {
            return self.stand_in_for(key);
        }

        self.state.descend()?;
        let result = self.build(key, implementation, initialized);
        self.state.ascend();
        result
    }

    fn build(&mut self, key: Key, implementation: Key, initialized: bool) -> DiResult<AnyArc> {
        if !initialized {
            self.prepare(key, implementation)?;
        }

        let provider = self.registry.lookup(&key)?;
        let fresh = !provider.is_initialized() || provider.is_unscoped();
        let Provided { instance, wiring } = provider.provide()?;
        trace!(requested = key.display_name(), fresh, "provided");

        if fresh {
            self.registry.lookup_mut(&key)?.mark_initialized();
            self.wire(key, implementation, &instance, wiring)?;
        }
        Ok(instance)
    }

    /// Resolves the provider's dependency list while `key` is locked.
    fn prepare(&mut self, key: Key, implementation: Key) -> DiResult<()> {
        let dependency_keys = self.registry.lookup(&key)?.dependency_keys().to_vec();
        if dependency_keys
            .iter()
            .any(|dependency| *dependency == key || *dependency == implementation)
        {
            return Err(DiError::SelfDependency(key.display_name()));
        }

        self.state.lock(key);
        let mut dependencies = Vec::with_capacity(dependency_keys.len());
        for dependency in dependency_keys {
            dependencies.push(self.resolve(dependency)?);
        }
        self.state.unlock(&key);

        self.registry.lookup_mut(&key)?.set_dependencies(dependencies);
        Ok(())
    }

    /// Post-construction work for a fresh instance.
    fn wire(&mut self, key: Key, implementation: Key, instance: &AnyArc, wiring: Wiring) -> DiResult<()> {
        let Wiring { fields, initialize } = wiring;

        for field in fields {
            if field.key == key || field.key == implementation {
                return Err(DiError::SelfDependency(key.display_name()));
            }
            let dependency = self.resolve(field.key)?;
            (field.assign)(&dependency)?;
        }

        if let Some(mut stand_in) = self.state.take_stand_in(&key) {
            stand_in.bind(instance)?;
            debug!(requested = key.display_name(), "stand-in bound");
        }

        if let Some(initialize) = initialize {
            initialize();
        }

        debug!(
            requested = key.display_name(),
            implementation = implementation.display_name(),
            "instantiated"
        );
        self.observers.instantiated(&key, instance);
        Ok(())
    }

    /// Stand-in for a type that is already being constructed in this pass.
    fn stand_in_for(&mut self, key: Key) -> DiResult<AnyArc> {
        if let Some(issued) = self.state.issued(&key) {
            return Ok(Arc::clone(&issued.instance));
        }

        let factory = match self.stand_ins.get(&key) {
            Some(factory) => factory,
            None => return Err(DiError::Circular(self.state.path_to(key))),
        };
        let issued = factory.issue();
        let instance = Arc::clone(&issued.instance);
        self.state.record_stand_in(key, issued);

        debug!(requested = key.display_name(), "stand-in issued");
        self.observers.stand_in_issued(&key);
        Ok(instance)
    }

}

// The registry's shape is fixed once built; introspection reads this copy so
// it never waits on the engine lock.
struct InjectorInner {
    engine: Mutex<Engine>,
    graph: DependencyGraph,
    registered: KeyMap<usize>,
    options: InjectorOptions,
}

/// Dependency injection container
///
/// Built once from bindings, modules and discovery markers, then asked for
/// root objects; everything downstream is constructed transitively.
/// Cloning is cheap and clones share all providers and cached singletons.
///
/// # Thread Safety
///
/// `Injector` is `Send + Sync`. Each top-level resolve runs in an exclusive
/// critical section, so concurrent callers are serialized. Resolving from
/// the same injector inside a constructor, init hook or observer fails with
/// [`DiError::ReentrantResolution`].
///
/// # Examples
///
/// ```rust
/// use graft_di::{Binding, Injectable, Injector, Resolver};
/// use std::sync::Arc;
///
/// trait Logger: Send + Sync {
///     fn log(&self, msg: &str) -> String;
/// }
///
/// struct ConsoleLogger;
/// impl Logger for ConsoleLogger {
///     fn log(&self, msg: &str) -> String { format!("[console] {}", msg) }
/// }
/// impl Injectable for ConsoleLogger {
///     type Deps = ();
///     fn construct(_: ()) -> Self { ConsoleLogger }
/// }
///
/// struct Greeter { logger: Arc<dyn Logger> }
/// impl Injectable for Greeter {
///     type Deps = (Arc<dyn Logger>,);
///     fn construct((logger,): Self::Deps) -> Self { Greeter { logger } }
/// }
///
/// let injector = Injector::builder()
///     .register_binding(
///         Binding::bind::<dyn Logger>()
///             .to::<ConsoleLogger, _>(|c| c as Arc<dyn Logger>)
///             .singleton(),
///     )?
///     .register_binding(Binding::bind::<Greeter>().to_self())?
///     .build()?;
///
/// let first = injector.get::<Greeter>()?;
/// let second = injector.get::<Greeter>()?;
/// assert!(!Arc::ptr_eq(&first, &second));
/// assert!(Arc::ptr_eq(&first.logger, &second.logger));
/// assert_eq!(first.logger.log("hi"), "[console] hi");
/// # Ok::<(), graft_di::DiError>(())
/// ```
#[derive(Clone)]
pub struct Injector {
    inner: Arc<InjectorInner>,
}

impl Injector {
    /// Starts configuring a new injector.
    pub fn builder() -> InjectorBuilder {
        InjectorBuilder::new()
    }

    /// Options the injector was built with.
    pub fn options(&self) -> &InjectorOptions {
        &self.inner.options
    }

    /// Whether a provider is registered for `key`.
    ///
    /// Like [`len`](Self::len) and [`dependency_graph`](Self::dependency_graph),
    /// this is safe to call from constructors and observers mid-resolve.
    pub fn contains(&self, key: &Key) -> bool {
        self.inner.registered.contains_key(key)
    }

    /// Number of registered providers.
    pub fn len(&self) -> usize {
        self.inner.graph.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Static dependency graph of every registered provider.
    pub fn dependency_graph(&self) -> DependencyGraph {
        self.inner.graph.clone()
    }

    fn id(&self) -> usize {
        Arc::as_ptr(&self.inner) as usize
    }

    /// Resolves `key` to its type-erased instance.
    ///
    /// The resolution state is cleared before this returns, whether the pass
    /// succeeded, failed or panicked. A stand-in used before its target was
    /// bound surfaces as [`DiError::ProxyNotInitialized`]; any other panic
    /// from user code is propagated unchanged.
    #[instrument(level = "debug", skip(self, key), fields(requested = key.display_name()))]
    pub fn resolve_any(&self, key: &Key) -> DiResult<AnyArc> {
        let _active = ActiveGuard::enter(self.id(), key)?;
        let mut engine = self.inner.engine.lock();

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| engine.resolve(*key)));
        engine.state.reset();
        drop(engine);

        match outcome {
            Ok(result) => result,
            Err(payload) => match payload.downcast::<ProxyNotInitialized>() {
                Ok(uninitialized) => Err(DiError::ProxyNotInitialized(uninitialized.type_name)),
                Err(payload) => panic::resume_unwind(payload),
            },
        }
    }

    fn instantiate_eager(&self) -> DiResult<()> {
        let eager = self
            .inner
            .graph
            .nodes
            .iter()
            .filter(|node| node.scope.is_eager())
            .map(|node| node.key);
        for key in eager {
            info!(requested = key.display_name(), "instantiating eager singleton");
            self.resolve_any(&key)?;
        }
        Ok(())
    }
}

impl ResolverCore for Injector {
    fn resolve_any(&self, key: &Key) -> DiResult<AnyArc> {
        Injector::resolve_any(self, key)
    }
}

impl std::fmt::Debug for Injector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Injector")
            .field("providers", &self.len())
            .field("options", &self.inner.options)
            .finish()
    }
}

/// Consuming builder for an [`Injector`].
///
/// Registration methods fail fast: a duplicate binding is reported by the
/// call that introduces it.
pub struct InjectorBuilder {
    registry: ProviderRegistry,
    stand_ins: KeyMap<StandInFactory>,
    observers: Observers,
    options: InjectorOptions,
    catalog: Option<Catalog>,
}

impl Default for InjectorBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl InjectorBuilder {
    pub fn new() -> Self {
        Self {
            registry: ProviderRegistry::new(),
            stand_ins: KeyMap::default(),
            observers: Observers::new(),
            options: InjectorOptions::default(),
            catalog: None,
        }
    }

    /// Registers one binding record.
    pub fn register_binding(mut self, binding: Binding) -> DiResult<Self> {
        self.registry.register(binding.into_provider()?)?;
        Ok(self)
    }

    /// Registers everything a module declares: bindings first, then factory methods.
    pub fn install<M: Module>(mut self, module: M) -> DiResult<Self> {
        let mut binder = Binder::new();
        module.configure(&mut binder)?;
        for provider in binder.into_providers()? {
            self.registry.register(provider)?;
        }
        Ok(self)
    }

    /// Registers the cycle-breaking stand-in for abstraction `T`.
    ///
    /// `wrap` turns the proxy into the exposed `Arc<T>`; with a forwarding
    /// `impl T for Proxy<dyn T>` it is just the unsizing cast.
    ///
    /// ```rust
    /// use graft_di::{Injector, Proxy};
    /// use std::sync::Arc;
    ///
    /// trait Ledger: Send + Sync {
    ///     fn total(&self) -> i64;
    /// }
    ///
    /// impl Ledger for Proxy<dyn Ledger> {
    ///     fn total(&self) -> i64 { self.target().total() }
    /// }
    ///
    /// let builder = Injector::builder()
    ///     .stand_in::<dyn Ledger, _>(|proxy| proxy as Arc<dyn Ledger>)
    ///     .unwrap();
    /// assert!(builder.stand_in::<dyn Ledger, _>(|proxy| proxy as Arc<dyn Ledger>).is_err());
    /// ```
    pub fn stand_in<T, W>(mut self, wrap: W) -> DiResult<Self>
    where
        T: ?Sized + Send + Sync + 'static,
        W: Fn(Arc<Proxy<T>>) -> Arc<T> + Send + Sync + 'static,
    {
        let factory = StandInFactory::new::<T, W>(wrap);
        let key = factory.key();
        if self.stand_ins.contains_key(&key) {
            return Err(DiError::DuplicateStandIn(key.display_name()));
        }
        self.stand_ins.insert(key, factory);
        Ok(self)
    }

    pub fn add_observer(mut self, observer: Arc<dyn InstantiationObserver>) -> Self {
        self.observers.add(observer);
        self
    }

    pub fn options(mut self, options: InjectorOptions) -> Self {
        self.options = options;
        self
    }

    /// Adds discovery markers, applied to unbound types during `build`.
    pub fn catalog(mut self, catalog: Catalog) -> Self {
        self.catalog = Some(match self.catalog.take() {
            Some(existing) => existing.merge(catalog),
            None => catalog,
        });
        self
    }

    /// Runs discovery, optional validation and eager instantiation.
    pub fn build(self) -> DiResult<Injector> {
        let InjectorBuilder {
            mut registry,
            stand_ins,
            observers,
            options,
            catalog,
        } = self;

        if let Some(catalog) = catalog {
            catalog.discover(&mut registry)?;
        }

        let graph = DependencyGraph::from_providers(registry.iter());
        if options.validate_on_build {
            graph.validate()?;
        }
        let registered = graph
            .nodes
            .iter()
            .enumerate()
            .map(|(index, node)| (node.key, index))
            .collect();

        let has_observers = observers.has_observers();
        let injector = Injector {
            inner: Arc::new(InjectorInner {
                engine: Mutex::new(Engine::new(registry, stand_ins, observers, options.max_depth)),
                graph,
                registered,
                options,
            }),
        };

        if injector.inner.options.instantiate_eager {
            injector.instantiate_eager()?;
        }

        info!(
            providers = injector.len(),
            observers = has_observers,
            "injector built"
        );
        Ok(injector)
    }
}
