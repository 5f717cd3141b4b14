//! Marker-driven discovery of providers.
//!
//! A [`Catalog`] is a table of per-type markers filled by host code. When
//! the injector is built, one discovery pass turns the markers into
//! providers for every type that has no explicit binding.

use std::collections::HashSet;
use std::sync::Arc;

use crate::descriptors::{Activator, Injectable};
use crate::error::{DiError, DiResult};
use crate::key::Key;
use crate::provider::{forward_through, CustomProvider, ForwardFn, Provider, Strategy};
use crate::registry::{KeyMap, ProviderRegistry};
use crate::scope::Scope;

#[derive(Clone)]
enum Marker {
    ImplementedBy {
        implementation: Key,
        activator: Activator,
    },
    ProvidedBy {
        provider: Key,
        forward: ForwardFn,
        provider_activator: Activator,
    },
    Scoped {
        scope: Scope,
        activator: Activator,
    },
}

impl Marker {
    fn name(&self) -> &'static str {
        match self {
            Marker::ImplementedBy { .. } => "implemented_by",
            Marker::ProvidedBy { .. } => "provided_by",
            Marker::Scoped { scope: Scope::EagerSingleton, .. } => "eager_singleton",
            Marker::Scoped { .. } => "singleton",
        }
    }

    fn is_scope(&self) -> bool {
        matches!(self, Marker::Scoped { .. })
    }
}

#[derive(Default)]
struct TypeMarkers {
    construction: Option<Marker>,
    scope: Option<Marker>,
}

impl TypeMarkers {
    fn scope(&self) -> Option<Scope> {
        match &self.scope {
            Some(Marker::Scoped { scope, .. }) => Some(*scope),
            _ => None,
        }
    }
}

/// Declarative construction metadata keyed by type.
///
/// - `implemented_by::<R, I>` marks abstraction `R` as implemented by `I`.
///   `R` takes `I`'s scope marker, or is transient without one.
/// - `singleton::<I>` / `eager_singleton::<I>` mark a concrete type's scope.
///   A marked type that is some abstraction's implementation is only
///   registered through that abstraction.
/// - `provided_by::<T, P>` satisfies `T` through the provider object `P`,
///   which is registered as a singleton unless bound or marked elsewhere.
///
/// Types with an explicit binding are left alone. A type may carry one
/// construction marker and one scope marker; a second one of either kind is
/// reported as [`DiError::ConflictingMarkers`] when the injector is built.
///
/// # Examples
///
/// ```rust
/// use graft_di::{Catalog, Injectable, Injector, Resolver};
/// use std::sync::Arc;
///
/// trait Clock: Send + Sync {
///     fn now(&self) -> u64;
/// }
///
/// struct FixedClock;
/// impl Clock for FixedClock {
///     fn now(&self) -> u64 { 42 }
/// }
/// impl Injectable for FixedClock {
///     type Deps = ();
///     fn construct(_: ()) -> Self { FixedClock }
/// }
///
/// let catalog = Catalog::new()
///     .implemented_by::<dyn Clock, FixedClock, _>(|c| c as Arc<dyn Clock>)
///     .singleton::<FixedClock>();
///
/// let injector = Injector::builder().catalog(catalog).build().unwrap();
/// let a = injector.get_required::<dyn Clock>();
/// let b = injector.get_required::<dyn Clock>();
/// assert_eq!(a.now(), 42);
/// assert!(Arc::ptr_eq(&a, &b));
/// ```
#[derive(Clone, Default)]
pub struct Catalog {
    markers: Vec<(Key, Marker)>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks abstraction `R` as implemented by `I`.
    pub fn implemented_by<R, I, U>(mut self, upcast: U) -> Self
    where
        R: ?Sized + Send + Sync + 'static,
        I: Injectable,
        U: Fn(Arc<I>) -> Arc<R> + Send + Sync + 'static,
    {
        self.markers.push((
            Key::of::<R>(),
            Marker::ImplementedBy {
                implementation: Key::of::<I>(),
                activator: Activator::constructor::<R, I, U>(upcast),
            },
        ));
        self
    }

    /// Marks `I` as a lazily built singleton.
    pub fn singleton<I: Injectable>(self) -> Self {
        self.scoped::<I>(Scope::Singleton)
    }

    /// Marks `I` as a singleton built with the injector.
    pub fn eager_singleton<I: Injectable>(self) -> Self {
        self.scoped::<I>(Scope::EagerSingleton)
    }

    fn scoped<I: Injectable>(mut self, scope: Scope) -> Self {
        self.markers.push((
            Key::of::<I>(),
            Marker::Scoped {
                scope,
                activator: Activator::constructor::<I, I, _>(|instance| instance),
            },
        ));
        self
    }

    /// Marks `T` as produced by the provider object `P`.
    pub fn provided_by<T, P>(mut self) -> Self
    where
        T: ?Sized + Send + Sync + 'static,
        P: CustomProvider<T> + Injectable,
    {
        self.markers.push((
            Key::of::<T>(),
            Marker::ProvidedBy {
                provider: Key::of::<P>(),
                forward: forward_through::<T, P>(),
                provider_activator: Activator::constructor::<P, P, _>(|instance| instance),
            },
        ));
        self
    }

    /// Appends another catalog's markers.
    pub fn merge(mut self, other: Catalog) -> Self {
        self.markers.extend(other.markers);
        self
    }

    pub fn len(&self) -> usize {
        self.markers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.markers.is_empty()
    }

    fn group(self) -> DiResult<(Vec<Key>, KeyMap<TypeMarkers>)> {
        let mut order = Vec::new();
        let mut grouped: KeyMap<TypeMarkers> = KeyMap::default();

        for (key, marker) in self.markers {
            let entry = grouped.entry(key).or_insert_with(|| {
                order.push(key);
                TypeMarkers::default()
            });
            let slot = if marker.is_scope() {
                &mut entry.scope
            } else {
                &mut entry.construction
            };

            match slot.as_ref() {
                Some(existing) => {
                    // Repeating the same scope marker is harmless.
                    let repeated = existing.is_scope() && existing.name() == marker.name();
                    if !repeated {
                        return Err(DiError::ConflictingMarkers {
                            type_name: key.display_name(),
                            first: existing.name(),
                            second: marker.name(),
                        });
                    }
                }
                None => *slot = Some(marker),
            }
        }
        Ok((order, grouped))
    }

    /// Registers providers for every marked type without an explicit binding.
    pub(crate) fn discover(self, registry: &mut ProviderRegistry) -> DiResult<()> {
        let (order, grouped) = self.group()?;

        let implementations: HashSet<Key> = grouped
            .values()
            .filter_map(|markers| match &markers.construction {
                Some(Marker::ImplementedBy { implementation, .. }) => Some(*implementation),
                _ => None,
            })
            .collect();
        let providers: HashSet<Key> = grouped
            .values()
            .filter_map(|markers| match &markers.construction {
                Some(Marker::ProvidedBy { provider, .. }) => Some(*provider),
                _ => None,
            })
            .collect();

        let mut discovered = 0usize;
        for key in order {
            if registry.contains(&key) {
                tracing::trace!(requested = key.display_name(), "explicitly bound, skipping markers");
                continue;
            }
            let Some(markers) = grouped.get(&key) else {
                continue;
            };

            match (&markers.construction, &markers.scope) {
                (Some(Marker::ImplementedBy { implementation, activator }), _) => {
                    let scope = grouped
                        .get(implementation)
                        .and_then(TypeMarkers::scope)
                        .unwrap_or(Scope::Transient);
                    registry.register(Provider::new(key, Strategy::constructed(activator.clone(), scope)))?;
                }
                (
                    Some(Marker::ProvidedBy {
                        provider,
                        forward,
                        provider_activator,
                    }),
                    _,
                ) => {
                    if !registry.contains(provider) && !grouped.contains_key(provider) {
                        registry.register(Provider::new(
                            *provider,
                            Strategy::Singleton(provider_activator.clone()),
                        ))?;
                        discovered += 1;
                    }
                    registry.register(Provider::new(
                        key,
                        Strategy::Forwarding {
                            provider: *provider,
                            forward: Arc::clone(forward),
                        },
                    ))?;
                }
                (_, Some(Marker::Scoped { scope, activator })) => {
                    // An implementation's scope marker is consumed by its
                    // abstraction, unless a provided_by also needs it directly.
                    if implementations.contains(&key) && !providers.contains(&key) {
                        continue;
                    }
                    registry.register(Provider::new(key, Strategy::constructed(activator.clone(), *scope)))?;
                }
                _ => continue,
            }
            discovered += 1;
        }

        tracing::debug!(discovered, "discovery pass complete");
        Ok(())
    }
}

impl std::fmt::Debug for Catalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.markers.iter().map(|(key, marker)| (key.display_name(), marker.name())))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    trait Store: Send + Sync {}

    struct MemoryStore;
    impl Store for MemoryStore {}
    impl Injectable for MemoryStore {
        type Deps = ();
        fn construct(_: ()) -> Self {
            MemoryStore
        }
    }

    fn scopes(registry: &ProviderRegistry) -> Vec<(Key, Scope)> {
        registry.iter().map(|p| (p.requested(), p.scope())).collect()
    }

    #[test]
    fn implemented_by_inherits_implementation_scope() {
        let mut registry = ProviderRegistry::new();
        Catalog::new()
            .eager_singleton::<MemoryStore>()
            .implemented_by::<dyn Store, MemoryStore, _>(|m| m as Arc<dyn Store>)
            .discover(&mut registry)
            .unwrap();

        assert_eq!(scopes(&registry), vec![(Key::of::<dyn Store>(), Scope::EagerSingleton)]);
    }

    #[test]
    fn implemented_by_without_scope_marker_is_transient() {
        let mut registry = ProviderRegistry::new();
        Catalog::new()
            .implemented_by::<dyn Store, MemoryStore, _>(|m| m as Arc<dyn Store>)
            .discover(&mut registry)
            .unwrap();

        assert_eq!(scopes(&registry), vec![(Key::of::<dyn Store>(), Scope::Transient)]);
    }

    #[test]
    fn conflicting_scope_markers_are_rejected() {
        let mut registry = ProviderRegistry::new();
        let result = Catalog::new()
            .singleton::<MemoryStore>()
            .eager_singleton::<MemoryStore>()
            .discover(&mut registry);

        match result {
            Err(DiError::ConflictingMarkers { first, second, .. }) => {
                assert_eq!(first, "singleton");
                assert_eq!(second, "eager_singleton");
            }
            _ => panic!("expected ConflictingMarkers"),
        }
    }

    #[test]
    fn repeated_scope_marker_is_accepted() {
        let mut registry = ProviderRegistry::new();
        Catalog::new()
            .singleton::<MemoryStore>()
            .singleton::<MemoryStore>()
            .discover(&mut registry)
            .unwrap();
        assert_eq!(registry.len(), 1);
    }
}
