//! Markup cache
//!
//! Parsed markup is cached in two maps:
//!
//! | Map | Key | Value |
//! |-----|-----|-------|
//! | key cache | cache key | location string |
//! | markup cache | location string | [`CacheEntry`] |
//!
//! Several cache keys (style, locale or variation specific lookups, or a
//! derived class without its own template) may share one location. A lookup
//! that found no markup is remembered as [`CacheEntry::NoMarkup`], stored under
//! the cache key as its own location.
//!
//! # Invalidation
//!
//! Removing a markup also removes every markup merged on top of it. After
//! the location entry is gone, all entries are swept repeatedly, dropping
//! those whose base markup is no longer cached, until a sweep removes
//! nothing. Key entries pointing at removed locations and watcher entries of
//! markup that is no longer cached are pruned afterwards.
//!
//! # Concurrency
//!
//! Both maps are concurrent maps and no lock is held while markup is parsed.
//! Two threads may load the same markup at the same time; the first one to
//! insert wins and the other result is discarded.

pub mod key;
pub mod store;

pub use key::{CacheKeyProvider, DefaultCacheKeyProvider, NoCacheKeyProvider};
pub use store::{CacheStore, DashMapStore};

use crate::config::Config;
use crate::error::TrellisResult;
use crate::factory::MarkupFactory;
use crate::markup::{ComponentClass, ContainerInfo, Markup, MarkupResourceStream};
use crate::watch::{ChangeListener, ModificationWatcher};
use serde::Serialize;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Value stored in the markup cache
#[derive(Debug, Clone)]
pub enum CacheEntry {
    Markup(Arc<Markup>),
    /// No markup exists for the key
    NoMarkup,
}

impl CacheEntry {
    pub fn markup(&self) -> Option<&Arc<Markup>> {
        match self {
            Self::Markup(markup) => Some(markup),
            Self::NoMarkup => None,
        }
    }

    pub fn into_markup(self) -> Option<Arc<Markup>> {
        match self {
            Self::Markup(markup) => Some(markup),
            Self::NoMarkup => None,
        }
    }

    pub fn is_no_markup(&self) -> bool {
        matches!(self, Self::NoMarkup)
    }

    /// Location of the base markup this entry was merged with
    fn base_location(&self) -> Option<String> {
        self.markup()
            .and_then(|markup| markup.resource())
            .and_then(|resource| resource.base_markup_resource())
            .map(|base| base.location_as_string())
    }
}

/// Counters reported by `trellis cache stats`
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct CacheStats {
    pub markups: usize,
    pub no_markup: usize,
    pub keys: usize,
    pub watched: usize,
}

struct Inner {
    factory: MarkupFactory,
    key_provider: Arc<dyn CacheKeyProvider>,
    /// location -> markup
    markup_cache: Box<dyn CacheStore<String, CacheEntry>>,
    /// cache key -> location
    markup_key_cache: Box<dyn CacheStore<String, String>>,
    watcher: Option<ModificationWatcher>,
}

/// Builder for [`MarkupCache`]
pub struct MarkupCacheBuilder {
    factory: MarkupFactory,
    key_provider: Arc<dyn CacheKeyProvider>,
    markup_cache: Box<dyn CacheStore<String, CacheEntry>>,
    markup_key_cache: Box<dyn CacheStore<String, String>>,
    watcher: Option<ModificationWatcher>,
}

impl MarkupCacheBuilder {
    pub fn key_provider(mut self, provider: Arc<dyn CacheKeyProvider>) -> Self {
        self.key_provider = provider;
        self
    }

    pub fn stores(
        mut self,
        markup_cache: Box<dyn CacheStore<String, CacheEntry>>,
        markup_key_cache: Box<dyn CacheStore<String, String>>,
    ) -> Self {
        self.markup_cache = markup_cache;
        self.markup_key_cache = markup_key_cache;
        self
    }

    pub fn watcher(mut self, watcher: ModificationWatcher) -> Self {
        self.watcher = Some(watcher);
        self
    }

    pub fn build(self) -> MarkupCache {
        MarkupCache {
            inner: Arc::new(Inner {
                factory: self.factory,
                key_provider: self.key_provider,
                markup_cache: self.markup_cache,
                markup_key_cache: self.markup_key_cache,
                watcher: self.watcher,
            }),
        }
    }
}

/// Cache of parsed markup. Clones share the same cache.
#[derive(Clone)]
pub struct MarkupCache {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for MarkupCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MarkupCache")
            .field("size", &self.size())
            .field("watcher", &self.inner.watcher)
            .finish()
    }
}

impl MarkupCache {
    /// Cache with the default key provider and stores, without a watcher
    pub fn new(factory: MarkupFactory) -> Self {
        Self::builder(factory).build()
    }

    pub fn builder(factory: MarkupFactory) -> MarkupCacheBuilder {
        MarkupCacheBuilder {
            factory,
            key_provider: Arc::new(DefaultCacheKeyProvider),
            markup_cache: Box::new(DashMapStore::new()),
            markup_key_cache: Box::new(DashMapStore::new()),
            watcher: None,
        }
    }

    /// Cache set up from the `[cache]`, `[markup]`, `[resources]` and
    /// `[[components]]` config sections
    pub fn from_config(config: &Config) -> TrellisResult<Self> {
        let mut builder = Self::builder(MarkupFactory::from_config(config)?);
        if !config.cache.enabled {
            builder = builder.key_provider(Arc::new(NoCacheKeyProvider));
        }
        if config.cache.watch {
            let interval = Duration::from_millis(config.cache.poll_interval_ms);
            builder = builder.watcher(ModificationWatcher::new(interval)?);
        }
        Ok(builder.build())
    }

    pub fn factory(&self) -> &MarkupFactory {
        &self.inner.factory
    }

    pub fn watcher(&self) -> Option<&ModificationWatcher> {
        self.inner.watcher.as_ref()
    }

    /// Markup for `container`.
    ///
    /// `class` is the class whose markup is wanted; it defaults to the
    /// container's own class. With `enforce_reload` the cache is bypassed
    /// for the lookup, though the reloaded markup is still only stored if
    /// no other entry got there first.
    pub fn get_markup(
        &self,
        container: &ContainerInfo,
        class: Option<&ComponentClass>,
        enforce_reload: bool,
    ) -> TrellisResult<Option<Arc<Markup>>> {
        let class = match class {
            Some(class) => class.clone(),
            None => self.inner.factory.container_class(container),
        };

        let cache_key = self.inner.key_provider.cache_key(container, &class);

        if !enforce_reload {
            if let Some(entry) = cache_key
                .as_deref()
                .and_then(|key| self.get_markup_from_cache(key))
            {
                return Ok(entry.into_markup());
            }
        }

        let entry = match self
            .inner
            .factory
            .markup_resource_stream(container, &class)?
        {
            Some(mut resource) => {
                resource.cache_key = cache_key;
                self.load_markup_and_watch_for_changes(resource, enforce_reload)?
            }
            None => match cache_key {
                Some(key) => self.on_markup_not_found(&key),
                None => CacheEntry::NoMarkup,
            },
        };

        Ok(entry.into_markup())
    }

    /// Cached entry for `cache_key`, if both index entries are present
    pub fn get_markup_from_cache(&self, cache_key: &str) -> Option<CacheEntry> {
        let location = self.inner.markup_key_cache.get(&cache_key.to_string())?;
        let entry = self.inner.markup_cache.get(&location);
        if entry.is_some() {
            debug!("Markup cache hit: {}", cache_key);
        }
        entry
    }

    /// Remember that there is no markup for `cache_key`
    pub fn on_markup_not_found(&self, cache_key: &str) -> CacheEntry {
        debug!("No markup for {}", cache_key);
        let entry = self.put_into_cache(cache_key, CacheEntry::NoMarkup);
        self.inner
            .markup_key_cache
            .put(cache_key.to_string(), cache_key.to_string());
        entry
    }

    /// Insert unless an entry for `location` already exists. Returns the
    /// entry that is in the cache afterwards.
    pub fn put_into_cache(&self, location: &str, entry: CacheEntry) -> CacheEntry {
        let stored = self
            .inner
            .markup_cache
            .put_if_absent(location.to_string(), entry.clone());

        let replaced = match (&stored, &entry) {
            (CacheEntry::Markup(a), CacheEntry::Markup(b)) => !Arc::ptr_eq(a, b),
            (CacheEntry::NoMarkup, CacheEntry::NoMarkup) => false,
            _ => true,
        };
        if replaced {
            debug!("Markup for {} was cached concurrently; keeping first", location);
        }
        stored
    }

    /// Remove the markup for `cache_key` and every markup derived from it
    pub fn remove_markup(&self, cache_key: &str) -> Option<CacheEntry> {
        let inner = &self.inner;
        let location = inner.markup_key_cache.remove(&cache_key.to_string())?;
        let removed = inner.markup_cache.remove(&location);

        if removed.is_some() {
            debug!("Removed markup {} ({})", cache_key, location);
            self.remove_markup_where_base_markup_is_no_longer_cached();
            self.remove_keys_without_location();
        }

        if let Some(watcher) = &inner.watcher {
            watcher.retain(|_, key| key.is_some_and(|key| self.is_markup_cached(key)));
        }

        removed
    }

    /// Sweep until a full pass removes nothing
    fn remove_markup_where_base_markup_is_no_longer_cached(&self) {
        let store = &self.inner.markup_cache;
        loop {
            let mut removed_any = false;
            for location in store.keys() {
                let Some(entry) = store.get(&location) else {
                    continue;
                };
                let Some(base) = entry.base_location() else {
                    continue;
                };
                if !store.contains_key(&base) {
                    debug!("Removing {}: base markup {} is gone", location, base);
                    store.remove(&location);
                    removed_any = true;
                }
            }
            if !removed_any {
                break;
            }
        }
    }

    fn remove_keys_without_location(&self) {
        let inner = &self.inner;
        for key in inner.markup_key_cache.keys() {
            let dangling = inner
                .markup_key_cache
                .get(&key)
                .is_some_and(|location| !inner.markup_cache.contains_key(&location));
            if dangling {
                inner.markup_key_cache.remove(&key);
            }
        }
    }

    fn load_markup_and_watch_for_changes(
        &self,
        resource: MarkupResourceStream,
        enforce_reload: bool,
    ) -> TrellisResult<CacheEntry> {
        if let Some(cache_key) = &resource.cache_key {
            if !enforce_reload {
                // Another key (a subclass without its own template, or a
                // style or locale falling back) may have loaded this file
                let location = resource.location_as_string();
                if let Some(entry) = self.inner.markup_cache.get(&location) {
                    debug!("Markup {} already cached for another key", location);
                    self.inner.markup_key_cache.put(cache_key.clone(), location);
                    return Ok(entry);
                }
            }

            if let Some(watcher) = &self.inner.watcher {
                let listener = self.change_listener(cache_key.clone(), &resource);
                watcher.add(resource.location.clone(), Some(cache_key.clone()), listener);
            }
        }
        self.load_markup(resource, enforce_reload)
    }

    /// Invalidates `cache_key` when the resource changes. Holds the cache
    /// weakly so a watcher outliving the cache does nothing.
    fn change_listener(&self, cache_key: String, resource: &MarkupResourceStream) -> ChangeListener {
        let cache: Weak<Inner> = Arc::downgrade(&self.inner);
        let path = resource.location.clone();
        Arc::new(move || {
            let Some(inner) = cache.upgrade() else {
                return;
            };
            info!("Invalidating markup {} ({})", cache_key, path.display());
            let cache = MarkupCache { inner };
            if let Some(watcher) = cache.watcher() {
                watcher.remove(&path);
            }
            cache.remove_markup(&cache_key);
        })
    }

    fn load_markup(
        &self,
        resource: MarkupResourceStream,
        enforce_reload: bool,
    ) -> TrellisResult<CacheEntry> {
        let cache_key = resource.cache_key.clone();
        let fallback_location = resource.location_as_string();

        let loaded = self
            .inner
            .factory
            .load_markup(self, resource, enforce_reload)?;

        let Some(markup) = loaded else {
            // The file vanished between locating and reading it
            warn!("Markup resource disappeared: {}", fallback_location);
            if let Some(key) = &cache_key {
                self.inner.markup_key_cache.remove(key);
            }
            return Ok(CacheEntry::NoMarkup);
        };

        let markup = Arc::new(markup);
        let Some(cache_key) = cache_key else {
            return Ok(CacheEntry::Markup(markup));
        };

        let location = markup.location_as_string().unwrap_or(fallback_location);
        let entry = self.put_into_cache(&location, CacheEntry::Markup(markup));
        self.inner.markup_key_cache.put(cache_key, location);
        Ok(entry)
    }

    /// Whether markup (or a no-markup marker) is cached for `cache_key`
    pub fn is_markup_cached(&self, cache_key: &str) -> bool {
        self.inner
            .markup_key_cache
            .get(&cache_key.to_string())
            .is_some_and(|location| self.inner.markup_cache.contains_key(&location))
    }

    /// Number of location entries
    pub fn size(&self) -> usize {
        self.inner.markup_cache.size()
    }

    /// Cache keys, sorted
    pub fn cache_keys(&self) -> Vec<String> {
        let mut keys = self.inner.markup_key_cache.keys();
        keys.sort();
        keys
    }

    pub fn stats(&self) -> CacheStats {
        let store = &self.inner.markup_cache;
        let no_markup = store
            .keys()
            .iter()
            .filter(|location| store.get(location).is_some_and(|e| e.is_no_markup()))
            .count();
        CacheStats {
            markups: store.size().saturating_sub(no_markup),
            no_markup,
            keys: self.inner.markup_key_cache.size(),
            watched: self.inner.watcher.as_ref().map_or(0, |w| w.len()),
        }
    }

    /// Drop every entry and stop watching all resources
    pub fn clear(&self) {
        self.inner.markup_cache.clear();
        self.inner.markup_key_cache.clear();
        if let Some(watcher) = &self.inner.watcher {
            watcher.clear();
        }
    }

    /// Clear and release the stores and stop the watcher
    pub fn shutdown(&self) {
        if let Some(watcher) = &self.inner.watcher {
            watcher.stop();
            watcher.clear();
        }
        self.inner.markup_cache.shutdown();
        self.inner.markup_key_cache.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ComponentConfig;
    use std::path::Path;
    use crate::markup::ComponentKind;
    use std::thread;
    use std::time::Instant;
    use tempfile::TempDir;

    fn component(name: &str, extends: Option<&str>, kind: &str) -> ComponentConfig {
        ComponentConfig {
            name: name.to_string(),
            extends: extends.map(str::to_string),
            kind: kind.to_string(),
        }
    }

    fn write(root: &Path, relative: &str, contents: &str) {
        let path = root.join(relative);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, contents).unwrap();
    }

    /// Three-level page hierarchy: Layout <- Base <- Home
    fn fixture(watch: bool) -> (TempDir, MarkupCache) {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "app/Layout.html",
            "<html><body><h1>Site</h1><wicket:child/></body></html>",
        );
        write(
            dir.path(),
            "app/Base.html",
            "<wicket:extend><nav>menu</nav><wicket:child/></wicket:extend>",
        );
        write(
            dir.path(),
            "app/Home.html",
            "<wicket:extend><p wicket:id=\"greeting\">hi</p></wicket:extend>",
        );
        write(dir.path(), "app/Plain.html", "<p>plain</p>");

        let mut config = Config::default();
        config.cache.watch = watch;
        config.cache.poll_interval_ms = 20;
        config.resources.roots = vec![dir.path().to_path_buf()];
        config.components = vec![
            component("app.Layout", None, "page"),
            component("app.Base", Some("app.Layout"), "page"),
            component("app.Home", Some("app.Base"), "page"),
            component("app.Plain", None, "panel"),
        ];
        let cache = MarkupCache::from_config(&config).unwrap();
        (dir, cache)
    }

    /// Dispatch watcher events until a listener fires or five seconds pass
    fn wait_for_change(watcher: &ModificationWatcher) -> usize {
        let deadline = Instant::now() + Duration::from_secs(5);
        let mut fired = 0;
        while fired == 0 && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(20));
            fired += watcher.check();
        }
        fired
    }

    fn get(cache: &MarkupCache, class: &str) -> Option<Arc<Markup>> {
        cache
            .get_markup(&ContainerInfo::new(class), None, false)
            .unwrap()
    }

    #[test]
    fn markup_is_cached() {
        let (_dir, cache) = fixture(false);
        let first = get(&cache, "app.Plain").unwrap();
        let second = get(&cache, "app.Plain").unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert!(cache.is_markup_cached("app.Plain.html"));
        assert_eq!(cache.size(), 1);
    }

    #[test]
    fn inherited_markup_caches_the_whole_chain() {
        let (_dir, cache) = fixture(false);
        let home = get(&cache, "app.Home").unwrap();

        let text = home.to_string();
        assert!(text.contains("<h1>Site</h1>"));
        assert!(text.contains("<nav>menu</nav>"));
        assert!(text.contains("<p wicket:id=\"greeting\">hi</p>"));

        assert_eq!(
            cache.cache_keys(),
            vec!["app.Base.html", "app.Home.html", "app.Layout.html"]
        );
        let base = home.resource().unwrap().base_markup_resource().unwrap();
        assert!(base.location.ends_with("app/Base.html"));
    }

    #[test]
    fn missing_markup_is_remembered() {
        let (_dir, cache) = fixture(false);
        assert!(get(&cache, "app.Missing").is_none());

        let entry = cache.get_markup_from_cache("app.Missing.html").unwrap();
        assert!(entry.is_no_markup());
        assert_eq!(cache.stats().no_markup, 1);
        assert!(get(&cache, "app.Missing").is_none());
    }

    #[test]
    fn removing_base_removes_derived_markup() {
        let (_dir, cache) = fixture(false);
        get(&cache, "app.Home").unwrap();
        get(&cache, "app.Plain").unwrap();
        assert_eq!(cache.size(), 4);

        let removed = cache.remove_markup("app.Layout.html");
        assert!(removed.is_some());

        assert!(!cache.is_markup_cached("app.Layout.html"));
        assert!(!cache.is_markup_cached("app.Base.html"));
        assert!(!cache.is_markup_cached("app.Home.html"));
        assert!(cache.is_markup_cached("app.Plain.html"));
        assert_eq!(cache.cache_keys(), vec!["app.Plain.html"]);
        assert_eq!(cache.size(), 1);
    }

    #[test]
    fn removing_derived_keeps_base() {
        let (_dir, cache) = fixture(false);
        get(&cache, "app.Home").unwrap();

        cache.remove_markup("app.Home.html");
        assert!(cache.is_markup_cached("app.Layout.html"));
        assert!(cache.is_markup_cached("app.Base.html"));
        assert!(!cache.is_markup_cached("app.Home.html"));
    }

    #[test]
    fn removing_unknown_key_is_a_no_op() {
        let (_dir, cache) = fixture(false);
        get(&cache, "app.Plain").unwrap();
        assert!(cache.remove_markup("nope.html").is_none());
        assert_eq!(cache.size(), 1);
    }

    #[test]
    fn first_writer_wins() {
        let (_dir, cache) = fixture(false);
        let a = Arc::new(Markup::new(None));
        let b = Arc::new(Markup::new(None));

        let stored = cache.put_into_cache("loc", CacheEntry::Markup(Arc::clone(&a)));
        assert!(Arc::ptr_eq(stored.markup().unwrap(), &a));

        let stored = cache.put_into_cache("loc", CacheEntry::Markup(b));
        assert!(Arc::ptr_eq(stored.markup().unwrap(), &a));
    }

    #[test]
    fn concurrent_loads_agree_on_one_markup() {
        let (_dir, cache) = fixture(false);
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cache = cache.clone();
                thread::spawn(move || {
                    cache
                        .get_markup(&ContainerInfo::new("app.Home"), None, true)
                        .unwrap()
                        .unwrap()
                })
            })
            .collect();
        let results: Vec<Arc<Markup>> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        let cached = cache
            .get_markup_from_cache("app.Home.html")
            .and_then(CacheEntry::into_markup)
            .unwrap();
        assert!(results.iter().all(|m| Arc::ptr_eq(m, &cached)));
    }

    #[test]
    fn enforce_reload_bypasses_lookup() {
        let (dir, cache) = fixture(false);
        let first = get(&cache, "app.Plain").unwrap();
        write(dir.path(), "app/Plain.html", "<p>changed</p>");

        let reloaded = cache
            .get_markup(&ContainerInfo::new("app.Plain"), None, true)
            .unwrap()
            .unwrap();
        // Already cached: the first entry stays authoritative
        assert!(Arc::ptr_eq(&first, &reloaded));

        cache.remove_markup("app.Plain.html");
        let fresh = get(&cache, "app.Plain").unwrap();
        assert_eq!(fresh.to_string(), "<p>changed</p>");
    }

    #[test]
    fn disabled_cache_loads_every_time() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "Plain.html", "<p>x</p>");
        let mut config = Config::default();
        config.cache.enabled = false;
        config.resources.roots = vec![dir.path().to_path_buf()];

        let cache = MarkupCache::from_config(&config).unwrap();
        let a = get(&cache, "Plain").unwrap();
        let b = get(&cache, "Plain").unwrap();
        assert!(!Arc::ptr_eq(&a, &b));
        assert_eq!(cache.size(), 0);
        assert!(get(&cache, "Missing").is_none());
        assert_eq!(cache.size(), 0);
    }

    #[test]
    fn parse_errors_are_not_cached() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "Broken.html", "<div><span wicket:id=\"x\"></div>");
        let mut config = Config::default();
        config.resources.roots = vec![dir.path().to_path_buf()];

        let cache = MarkupCache::from_config(&config).unwrap();
        let err = cache
            .get_markup(&ContainerInfo::new("Broken"), None, false)
            .unwrap_err();
        assert!(err.is_markup_error());
        assert_eq!(cache.size(), 0);
        assert!(!cache.is_markup_cached("Broken.html"));
    }

    #[test]
    fn missing_base_markup_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "app/Child.html", "<wicket:extend>x</wicket:extend>");
        let mut config = Config::default();
        config.resources.roots = vec![dir.path().to_path_buf()];
        config.components = vec![
            component("app.Parent", None, "panel"),
            component("app.Child", Some("app.Parent"), "panel"),
        ];

        let cache = MarkupCache::from_config(&config).unwrap();
        let err = cache
            .get_markup(&ContainerInfo::new("app.Child"), None, false)
            .unwrap_err();
        assert!(matches!(
            err,
            crate::error::TrellisError::BaseMarkupNotFound { .. }
        ));
    }

    #[test]
    fn file_change_invalidates_dependents() {
        let (dir, cache) = fixture(true);
        get(&cache, "app.Home").unwrap();
        let watcher = cache.watcher().unwrap().clone();
        assert_eq!(watcher.len(), 3);

        write(
            dir.path(),
            "app/Layout.html",
            "<html><body><h1>New site title</h1><wicket:child/></body></html>",
        );
        assert_eq!(wait_for_change(&watcher), 1);

        assert_eq!(cache.size(), 0);
        assert!(cache.cache_keys().is_empty());
        assert!(watcher.is_empty());

        let home = get(&cache, "app.Home").unwrap();
        assert!(home.to_string().contains("New site title"));
        assert_eq!(watcher.len(), 3);
    }

    #[test]
    fn clear_and_shutdown() {
        let (_dir, cache) = fixture(true);
        get(&cache, "app.Home").unwrap();
        cache.clear();
        assert_eq!(cache.size(), 0);
        assert_eq!(cache.stats(), CacheStats::default());

        get(&cache, "app.Plain").unwrap();
        cache.shutdown();
        assert_eq!(cache.size(), 0);
        assert!(cache.watcher().unwrap().is_empty());
    }

    /// Layout page plus a derived page that has no template of its own
    fn shared_fixture(watch: bool) -> (TempDir, MarkupCache) {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "app/Base.html", "<div><span wicket:id=\"x\"></span></div>");

        let mut config = Config::default();
        config.cache.watch = watch;
        config.cache.poll_interval_ms = 20;
        config.resources.roots = vec![dir.path().to_path_buf()];
        config.components = vec![
            component("app.Base", None, "panel"),
            component("app.Derived", Some("app.Base"), "panel"),
        ];
        let cache = MarkupCache::from_config(&config).unwrap();
        (dir, cache)
    }

    #[test]
    fn cached_location_is_reused_without_parsing() {
        let (dir, cache) = shared_fixture(false);
        let base = get(&cache, "app.Base").unwrap();

        // Unparseable now; a lookup that reparsed the file would fail
        write(dir.path(), "app/Base.html", "<div><span wicket:id=\"x\"></div>");

        let derived = get(&cache, "app.Derived").unwrap();
        assert!(Arc::ptr_eq(&base, &derived));
        assert!(cache.is_markup_cached("app.Derived.html"));
        assert_eq!(cache.size(), 1);
    }

    #[test]
    fn keys_sharing_a_location_are_removed_together() {
        let (_dir, cache) = shared_fixture(true);
        let derived = get(&cache, "app.Derived").unwrap();
        let base = get(&cache, "app.Base").unwrap();
        assert!(Arc::ptr_eq(&base, &derived));

        let location = derived.location_as_string().unwrap();
        assert_eq!(
            cache.inner.markup_key_cache.get(&"app.Derived.html".to_string()),
            Some(location.clone())
        );
        assert_eq!(
            cache.inner.markup_key_cache.get(&"app.Base.html".to_string()),
            Some(location)
        );
        assert_eq!(cache.size(), 1);

        let watcher = cache.watcher().unwrap();
        assert_eq!(watcher.len(), 1);
        assert_eq!(
            watcher.entries()[0].cache_key.as_deref(),
            Some("app.Derived.html")
        );

        assert!(cache.remove_markup("app.Derived.html").is_some());
        assert!(!cache.is_markup_cached("app.Base.html"));
        assert!(cache.cache_keys().is_empty());
        assert_eq!(cache.size(), 0);
        assert!(watcher.is_empty());
    }

    #[test]
    fn vanished_resource_loads_as_no_markup() {
        let (dir, cache) = fixture(false);
        let mut resource = MarkupResourceStream::new(
            dir.path().join("app/Vanished.html"),
            ContainerInfo::new("app.Vanished"),
            ComponentClass::new("app.Vanished", ComponentKind::Panel),
        );
        resource.cache_key = Some("app.Vanished.html".to_string());
        cache
            .inner
            .markup_key_cache
            .put("app.Vanished.html".to_string(), "stale".to_string());

        let entry = cache.load_markup(resource, false).unwrap();
        assert!(entry.is_no_markup());
        assert!(cache
            .inner
            .markup_key_cache
            .get(&"app.Vanished.html".to_string())
            .is_none());
        assert_eq!(cache.size(), 0);
    }
}
