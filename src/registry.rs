//! Provider registry.

use crate::error::{DiError, DiResult};
use crate::key::Key;
use crate::provider::Provider;

#[cfg(feature = "ahash")]
pub(crate) type KeyMap<V> = ahash::AHashMap<Key, V>;
#[cfg(not(feature = "ahash"))]
pub(crate) type KeyMap<V> = std::collections::HashMap<Key, V>;

/// Registry holding exactly one provider per requested type
///
/// Registration order is kept alongside the map; eager instantiation and
/// graph export walk providers in that order.
#[derive(Default)]
pub(crate) struct ProviderRegistry {
    providers: KeyMap<Provider>,
    order: Vec<Key>,
}

impl ProviderRegistry {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Adds a provider, refusing a second provider for the same requested type.
    pub(crate) fn register(&mut self, provider: Provider) -> DiResult<()> {
        let key = provider.requested();
        if let Some(existing) = self.providers.get(&key) {
            return Err(DiError::DuplicateBinding {
                requested: key.display_name(),
                existing: existing.implementation().display_name(),
                attempted: provider.implementation().display_name(),
            });
        }

        tracing::trace!(
            requested = key.display_name(),
            implementation = provider.implementation().display_name(),
            "registered provider"
        );
        self.order.push(key);
        self.providers.insert(key, provider);
        Ok(())
    }

    #[inline]
    pub(crate) fn lookup(&self, key: &Key) -> DiResult<&Provider> {
        self.providers
            .get(key)
            .ok_or(DiError::UnknownDependency(key.display_name()))
    }

    #[inline]
    pub(crate) fn lookup_mut(&mut self, key: &Key) -> DiResult<&mut Provider> {
        self.providers
            .get_mut(key)
            .ok_or(DiError::UnknownDependency(key.display_name()))
    }

    #[inline]
    pub(crate) fn contains(&self, key: &Key) -> bool {
        self.providers.contains_key(key)
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.order.len()
    }

    /// Providers in registration order.
    pub(crate) fn iter(&self) -> impl Iterator<Item = &Provider> + '_ {
        self.order.iter().filter_map(move |key| self.providers.get(key))
    }
}
