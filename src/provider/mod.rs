//! Construction strategies bound to one requested type.
//!
//! A [`Provider`] is what the registry stores for each requested type. It
//! owns the dependency list the engine resolved for it, and for scoped
//! strategies the cached instance. Providers never resolve anything
//! themselves; the engine fills their dependencies before the first
//! [`Provider::provide`] call.

use std::sync::Arc;

use once_cell::sync::OnceCell;

use crate::descriptors::{Activator, AnyArc, Built, Wiring};
use crate::error::{DiError, DiResult};
use crate::graph::EdgeKind;
use crate::key::Key;
use crate::scope::Scope;

pub mod factory;

pub use factory::{CustomProvider, Factory};
pub(crate) use factory::{forward_through, FactoryRecipe, ForwardFn};

/// How a provider produces its instance.
pub(crate) enum Strategy {
    /// Constructor descriptor, new instance every call
    Transient(Activator),
    /// Constructor descriptor, built once and cached
    Singleton(Activator),
    /// Like `Singleton`, instantiated when the injector is built
    EagerSingleton(Activator),
    /// Module factory closure following its declared scope
    FactoryMethod { activator: Activator, scope: Scope },
    /// Delegates to a [`CustomProvider`] object registered under `provider`
    Forwarding { provider: Key, forward: ForwardFn },
    /// Hands out a [`Factory`] built once from cached dependencies
    ParameterizedFactory(FactoryRecipe),
    /// Singleton whose instance was supplied with the binding
    Preset { instance: AnyArc, scope: Scope },
}

impl Strategy {
    /// Constructor-backed strategy for `scope`.
    pub(crate) fn constructed(activator: Activator, scope: Scope) -> Self {
        match scope {
            Scope::Transient => Strategy::Transient(activator),
            Scope::Singleton => Strategy::Singleton(activator),
            Scope::EagerSingleton => Strategy::EagerSingleton(activator),
        }
    }
}

/// Output of one [`Provider::provide`] call.
pub(crate) struct Provided {
    pub(crate) instance: AnyArc,
    /// Field injections and init hook of a freshly built instance; empty otherwise.
    pub(crate) wiring: Wiring,
}

impl Provided {
    fn bare(instance: AnyArc) -> Self {
        Self {
            instance,
            wiring: Wiring::default(),
        }
    }
}

impl From<Built> for Provided {
    fn from(built: Built) -> Self {
        Self {
            instance: built.instance,
            wiring: built.wiring,
        }
    }
}

/// Construction strategy for exactly one requested type.
pub(crate) struct Provider {
    requested: Key,
    implementation: Key,
    strategy: Strategy,
    dependency_keys: Vec<Key>,
    field_keys: Vec<Key>,
    dependencies: Vec<AnyArc>,
    initialized: bool,
    instance: OnceCell<AnyArc>,
}

impl Provider {
    pub(crate) fn new(requested: Key, strategy: Strategy) -> Self {
        let (implementation, dependency_keys, field_keys) = match &strategy {
            Strategy::Transient(activator)
            | Strategy::Singleton(activator)
            | Strategy::EagerSingleton(activator)
            | Strategy::FactoryMethod { activator, .. } => (
                activator.implementation(),
                activator.dependency_keys().to_vec(),
                activator.field_keys().to_vec(),
            ),
            Strategy::Forwarding { provider, .. } => (requested, vec![*provider], Vec::new()),
            Strategy::ParameterizedFactory(recipe) => (
                recipe.implementation(),
                recipe.dependency_keys().to_vec(),
                Vec::new(),
            ),
            Strategy::Preset { .. } => (requested, Vec::new(), Vec::new()),
        };

        let instance = OnceCell::new();
        let mut initialized = false;
        if let Strategy::Preset { instance: preset, .. } = &strategy {
            let _ = instance.set(Arc::clone(preset));
            initialized = true;
        }

        Self {
            requested,
            implementation,
            strategy,
            dependency_keys,
            field_keys,
            dependencies: Vec::new(),
            initialized,
            instance,
        }
    }

    #[inline]
    pub(crate) fn requested(&self) -> Key {
        self.requested
    }

    #[inline]
    pub(crate) fn implementation(&self) -> Key {
        self.implementation
    }

    pub(crate) fn dependency_keys(&self) -> &[Key] {
        &self.dependency_keys
    }

    pub(crate) fn field_keys(&self) -> &[Key] {
        &self.field_keys
    }

    #[inline]
    pub(crate) fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub(crate) fn mark_initialized(&mut self) {
        self.initialized = true;
    }

    pub(crate) fn set_dependencies(&mut self, dependencies: Vec<AnyArc>) {
        debug_assert_eq!(dependencies.len(), self.dependency_keys.len());
        self.dependencies = dependencies;
    }

    /// Caching scope of the instances this provider hands out.
    pub(crate) fn scope(&self) -> Scope {
        match &self.strategy {
            Strategy::Transient(_) | Strategy::Forwarding { .. } => Scope::Transient,
            Strategy::Singleton(_) | Strategy::ParameterizedFactory(_) => Scope::Singleton,
            Strategy::EagerSingleton(_) => Scope::EagerSingleton,
            Strategy::FactoryMethod { scope, .. } | Strategy::Preset { scope, .. } => *scope,
        }
    }

    /// Whether every `provide` call yields a freshly constructed instance.
    pub(crate) fn is_unscoped(&self) -> bool {
        match &self.strategy {
            Strategy::Transient(_) => true,
            Strategy::FactoryMethod { scope, .. } => !scope.is_singleton(),
            _ => false,
        }
    }

    /// Short strategy label for diagnostics.
    pub(crate) fn strategy_name(&self) -> &'static str {
        match &self.strategy {
            Strategy::Transient(_) => "transient",
            Strategy::Singleton(_) => "singleton",
            Strategy::EagerSingleton(_) => "eager_singleton",
            Strategy::FactoryMethod { .. } => "factory_method",
            Strategy::Forwarding { .. } => "forwarding",
            Strategy::ParameterizedFactory(_) => "parameterized_factory",
            Strategy::Preset { .. } => "preset",
        }
    }

    /// Edge kind of this provider's positional dependencies.
    pub(crate) fn dependency_edge_kind(&self) -> EdgeKind {
        match &self.strategy {
            Strategy::FactoryMethod { .. } => EdgeKind::FactoryMethod,
            Strategy::Forwarding { .. } => EdgeKind::Forwarding,
            _ => EdgeKind::Constructor,
        }
    }

    /// Produces an instance from the already populated dependency list.
    pub(crate) fn provide(&self) -> DiResult<Provided> {
        match &self.strategy {
            Strategy::Transient(activator) => self.construct(activator),
            Strategy::Singleton(activator) | Strategy::EagerSingleton(activator) => {
                self.cached_or_else(|| self.construct(activator))
            }
            Strategy::FactoryMethod { activator, scope } => {
                if scope.is_singleton() {
                    self.cached_or_else(|| self.construct(activator))
                } else {
                    self.construct(activator)
                }
            }
            Strategy::Forwarding { forward, .. } => {
                let provider = self.dependencies.first().ok_or(DiError::InvalidConstructor {
                    type_name: self.requested.display_name(),
                    reason: "forwarding provider object was not resolved",
                })?;
                Ok(Provided::bare(forward(provider)?))
            }
            Strategy::ParameterizedFactory(recipe) => self.cached_or_else(|| {
                Ok(Provided::bare(recipe.make(self.dependencies.clone())))
            }),
            Strategy::Preset { .. } => self.cached_or_else(|| {
                Err(DiError::InvalidConstructor {
                    type_name: self.requested.display_name(),
                    reason: "preset instance is missing",
                })
            }),
        }
    }

    fn construct(&self, activator: &Activator) -> DiResult<Provided> {
        activator.build(&self.dependencies).map(Provided::from)
    }

    fn cached_or_else<F>(&self, build: F) -> DiResult<Provided>
    where
        F: FnOnce() -> DiResult<Provided>,
    {
        if let Some(instance) = self.instance.get() {
            return Ok(Provided::bare(Arc::clone(instance)));
        }

        let provided = build()?;
        self.instance
            .set(Arc::clone(&provided.instance))
            .map_err(|_| DiError::SingletonReconstructed(self.requested.display_name()))?;
        Ok(provided)
    }
}

impl std::fmt::Debug for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Provider")
            .field("requested", &self.requested)
            .field("implementation", &self.implementation)
            .field("strategy", &self.strategy_name())
            .field("dependency_keys", &self.dependency_keys)
            .field("initialized", &self.initialized)
            .field("cached", &self.instance.get().is_some())
            .finish()
    }
}
