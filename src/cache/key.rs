//! Cache key derivation

use crate::markup::{ComponentClass, ContainerInfo};

/// Derives the cache key for a container's markup. `None` means the markup
/// must not be cached.
pub trait CacheKeyProvider: Send + Sync {
    fn cache_key(&self, container: &ContainerInfo, class: &ComponentClass) -> Option<String>;
}

/// `class[_variation][_style][_locale].extension`
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultCacheKeyProvider;

impl CacheKeyProvider for DefaultCacheKeyProvider {
    fn cache_key(&self, container: &ContainerInfo, class: &ComponentClass) -> Option<String> {
        let mut key = class.name.clone();
        for part in [&container.variation, &container.style, &container.locale]
            .into_iter()
            .flatten()
        {
            key.push('_');
            key.push_str(part);
        }
        key.push('.');
        key.push_str(&container.markup_type);
        Some(key)
    }
}

/// Never caches; used when `[cache] enabled = false`
#[derive(Debug, Default, Clone, Copy)]
pub struct NoCacheKeyProvider;

impl CacheKeyProvider for NoCacheKeyProvider {
    fn cache_key(&self, _container: &ContainerInfo, _class: &ComponentClass) -> Option<String> {
        None
    }
}
