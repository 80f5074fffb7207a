//! Modification watcher
//!
//! Template files are watched by a `notify` poll watcher that compares file
//! contents as well as modification times, so a rewrite within the same
//! mtime tick is still seen. Change events are queued by the poll thread and
//! dispatched to per-file listeners by [`ModificationWatcher::check`], either
//! on demand or from the task spawned by [`ModificationWatcher::start`].

use crate::error::{TrellisError, TrellisResult};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use notify::{Config, Event, EventKind, PollWatcher, RecursiveMode, Watcher};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

/// Called when a watched file changed or was removed
pub type ChangeListener = Arc<dyn Fn() + Send + Sync>;

struct WatchEntry {
    cache_key: Option<String>,
    modified: Option<DateTime<Utc>>,
    listener: ChangeListener,
}

/// A watched resource, as reported by [`ModificationWatcher::entries`]
#[derive(Debug, Clone, Serialize)]
pub struct WatchedResource {
    pub path: PathBuf,
    pub cache_key: Option<String>,
    pub modified: Option<DateTime<Utc>>,
}

struct WatcherInner {
    entries: DashMap<PathBuf, WatchEntry>,
    poller: Mutex<PollWatcher>,
    events: Mutex<Receiver<notify::Result<Event>>>,
    task: Mutex<Option<JoinHandle<()>>>,
    poll_interval: Duration,
}

/// File watcher with one listener per path. Clones share the same entries.
#[derive(Clone)]
pub struct ModificationWatcher {
    inner: Arc<WatcherInner>,
}

impl std::fmt::Debug for ModificationWatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModificationWatcher")
            .field("entries", &self.inner.entries.len())
            .field("poll_interval", &self.inner.poll_interval)
            .field("running", &self.is_running())
            .finish()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn modified_time(path: &Path) -> Option<DateTime<Utc>> {
    std::fs::metadata(path)
        .and_then(|m| m.modified())
        .ok()
        .map(DateTime::<Utc>::from)
}

fn is_change(kind: &EventKind) -> bool {
    matches!(
        kind,
        EventKind::Any | EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
    )
}

impl ModificationWatcher {
    /// Watcher whose poll thread rescans the watched files every
    /// `poll_interval`
    pub fn new(poll_interval: Duration) -> TrellisResult<Self> {
        if poll_interval.is_zero() {
            return Err(TrellisError::Watcher(
                "poll interval must be greater than zero".to_string(),
            ));
        }

        let (tx, rx) = mpsc::channel();
        let config = Config::default()
            .with_poll_interval(poll_interval)
            .with_compare_contents(true);
        let poller = PollWatcher::new(
            move |res| {
                let _ = tx.send(res);
            },
            config,
        )
        .map_err(|e| TrellisError::Watcher(format!("cannot create poll watcher: {}", e)))?;

        Ok(Self {
            inner: Arc::new(WatcherInner {
                entries: DashMap::new(),
                poller: Mutex::new(poller),
                events: Mutex::new(rx),
                task: Mutex::new(None),
                poll_interval,
            }),
        })
    }

    pub fn poll_interval(&self) -> Duration {
        self.inner.poll_interval
    }

    /// Watch `path`. Returns false if the path is already watched, in
    /// which case the existing listener is kept.
    pub fn add(
        &self,
        path: impl Into<PathBuf>,
        cache_key: Option<String>,
        listener: ChangeListener,
    ) -> bool {
        let path = path.into();
        let mut added = false;
        self.inner.entries.entry(path.clone()).or_insert_with(|| {
            added = true;
            WatchEntry {
                cache_key,
                modified: modified_time(&path),
                listener,
            }
        });
        if !added {
            return false;
        }

        // A missing file is reported through the event queue, not here
        if let Err(e) = lock(&self.inner.poller).watch(&path, RecursiveMode::NonRecursive) {
            warn!("Cannot watch {}: {}", path.display(), e);
        }
        debug!("Watching {}", path.display());
        true
    }

    /// Stop watching `path`
    pub fn remove(&self, path: &Path) -> bool {
        if self.inner.entries.remove(path).is_none() {
            return false;
        }
        if let Err(e) = lock(&self.inner.poller).unwatch(path) {
            debug!("Unwatching {}: {}", path.display(), e);
        }
        true
    }

    pub fn len(&self) -> usize {
        self.inner.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.entries.is_empty()
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.inner.entries.contains_key(path)
    }

    /// Snapshot of the watched resources, sorted by path
    pub fn entries(&self) -> Vec<WatchedResource> {
        let mut entries: Vec<WatchedResource> = self
            .inner
            .entries
            .iter()
            .map(|entry| WatchedResource {
                path: entry.key().clone(),
                cache_key: entry.cache_key.clone(),
                modified: entry.modified,
            })
            .collect();
        entries.sort_by(|a, b| a.path.cmp(&b.path));
        entries
    }

    /// Keep only the entries for which `keep(path, cache_key)` is true
    pub fn retain<F>(&self, mut keep: F)
    where
        F: FnMut(&Path, Option<&str>) -> bool,
    {
        let dropped: Vec<PathBuf> = self
            .inner
            .entries
            .iter()
            .filter(|entry| !keep(entry.key(), entry.cache_key.as_deref()))
            .map(|entry| entry.key().clone())
            .collect();
        for path in dropped {
            self.remove(&path);
        }
    }

    pub fn clear(&self) {
        let paths: Vec<PathBuf> = self
            .inner
            .entries
            .iter()
            .map(|entry| entry.key().clone())
            .collect();
        for path in paths {
            self.remove(&path);
        }
    }

    /// Dispatch the changes queued since the last call.
    ///
    /// Each changed file fires its listener once, after all map guards are
    /// released, so listeners may add or remove entries. Returns the number
    /// of listeners fired.
    pub fn check(&self) -> usize {
        let events: Vec<notify::Result<Event>> = lock(&self.inner.events).try_iter().collect();

        let mut changed: Vec<(PathBuf, bool)> = Vec::new();
        for result in events {
            let event = match result {
                Ok(event) => event,
                Err(e) => {
                    debug!("Watch error: {}", e);
                    continue;
                }
            };
            if !is_change(&event.kind) {
                continue;
            }
            let removed = matches!(event.kind, EventKind::Remove(_));
            for path in event.paths {
                match changed.iter_mut().find(|(seen, _)| *seen == path) {
                    Some(seen) => seen.1 = removed,
                    None => changed.push((path, removed)),
                }
            }
        }

        let mut fired = Vec::new();
        for (path, removed) in changed {
            if let Some(mut entry) = self.inner.entries.get_mut(&path) {
                entry.modified = modified_time(&path);
                fired.push((path, Arc::clone(&entry.listener), removed));
            }
        }

        let count = fired.len();
        for (path, listener, removed) in fired {
            if removed {
                info!("Markup removed: {}", path.display());
            } else {
                info!("Markup changed: {}", path.display());
            }
            listener();
        }
        count
    }

    pub fn is_running(&self) -> bool {
        lock(&self.inner.task)
            .as_ref()
            .is_some_and(|t| !t.is_finished())
    }

    /// Dispatch queued changes every `interval` on the current tokio runtime
    pub fn start(&self, interval: Duration) -> TrellisResult<()> {
        if interval.is_zero() {
            return Err(TrellisError::Watcher(
                "dispatch interval must be greater than zero".to_string(),
            ));
        }
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| TrellisError::Watcher(format!("no tokio runtime: {}", e)))?;

        let mut task = lock(&self.inner.task);
        if task.as_ref().is_some_and(|t| !t.is_finished()) {
            return Err(TrellisError::Watcher("watcher already started".to_string()));
        }

        let watcher = self.clone();
        *task = Some(runtime.spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately
            ticker.tick().await;

            loop {
                ticker.tick().await;
                let watcher = watcher.clone();
                if let Err(e) = tokio::task::spawn_blocking(move || watcher.check()).await {
                    warn!("Change dispatch failed: {}", e);
                }
            }
        }));

        info!("Modification watcher started ({:?} interval)", interval);
        Ok(())
    }

    /// Stop dispatching. Entries stay watched.
    pub fn stop(&self) {
        if let Some(handle) = lock(&self.inner.task).take() {
            handle.abort();
            debug!("Modification watcher stopped");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Instant;

    const POLL: Duration = Duration::from_millis(20);

    fn counter() -> (Arc<AtomicUsize>, ChangeListener) {
        let count = Arc::new(AtomicUsize::new(0));
        let listener_count = Arc::clone(&count);
        let listener: ChangeListener = Arc::new(move || {
            listener_count.fetch_add(1, Ordering::SeqCst);
        });
        (count, listener)
    }

    /// Dispatch until at least one listener fired or five seconds passed
    fn wait_for_change(watcher: &ModificationWatcher) -> usize {
        let deadline = Instant::now() + Duration::from_secs(5);
        let mut fired = 0;
        while fired == 0 && Instant::now() < deadline {
            std::thread::sleep(POLL);
            fired += watcher.check();
        }
        fired
    }

    #[test]
    fn zero_poll_interval_is_rejected() {
        assert!(ModificationWatcher::new(Duration::ZERO).is_err());
    }

    #[test]
    fn add_is_idempotent_per_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Home.html");
        std::fs::write(&path, "<p>").unwrap();

        let watcher = ModificationWatcher::new(POLL).unwrap();
        let (_, listener) = counter();
        assert!(watcher.add(&path, Some("Home.html".into()), Arc::clone(&listener)));
        assert!(!watcher.add(&path, None, listener));
        assert_eq!(watcher.len(), 1);

        let entries = watcher.entries();
        assert_eq!(entries[0].cache_key.as_deref(), Some("Home.html"));
        assert!(entries[0].modified.is_some());
    }

    #[test]
    fn unchanged_files_fire_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Still.html");
        std::fs::write(&path, "<p>same</p>").unwrap();

        let watcher = ModificationWatcher::new(POLL).unwrap();
        let (count, listener) = counter();
        watcher.add(&path, None, listener);

        std::thread::sleep(POLL * 5);
        assert_eq!(watcher.check(), 0);
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn content_change_fires_listener() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Home.html");
        std::fs::write(&path, "<p>one</p>").unwrap();

        let watcher = ModificationWatcher::new(POLL).unwrap();
        let (count, listener) = counter();
        watcher.add(&path, None, listener);

        std::fs::write(&path, "<p>two, longer</p>").unwrap();
        assert!(wait_for_change(&watcher) >= 1);
        assert!(count.load(Ordering::SeqCst) >= 1);
    }

    #[test]
    fn removal_fires_listener() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Gone.html");
        std::fs::write(&path, "x").unwrap();

        let watcher = ModificationWatcher::new(POLL).unwrap();
        let (count, listener) = counter();
        watcher.add(&path, None, listener);

        std::fs::remove_file(&path).unwrap();
        assert!(wait_for_change(&watcher) >= 1);
        assert!(count.load(Ordering::SeqCst) >= 1);
    }

    #[test]
    fn listener_may_remove_its_entry() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Self.html");
        std::fs::write(&path, "a").unwrap();

        let watcher = ModificationWatcher::new(POLL).unwrap();
        let inner_watcher = watcher.clone();
        let inner_path = path.clone();
        watcher.add(
            &path,
            None,
            Arc::new(move || {
                inner_watcher.remove(&inner_path);
            }),
        );

        std::fs::write(&path, "bb").unwrap();
        assert_eq!(wait_for_change(&watcher), 1);
        assert!(watcher.is_empty());
    }

    #[test]
    fn retain_by_cache_key() {
        let watcher = ModificationWatcher::new(POLL).unwrap();
        let (_, listener) = counter();
        watcher.add("/nonexistent/a.html", Some("a".into()), Arc::clone(&listener));
        watcher.add("/nonexistent/b.html", Some("b".into()), listener);

        watcher.retain(|_, key| key == Some("b"));
        let entries = watcher.entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].path, PathBuf::from("/nonexistent/b.html"));
        assert!(!watcher.contains(Path::new("/nonexistent/a.html")));

        watcher.clear();
        assert!(watcher.is_empty());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn dispatch_task_delivers_changes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Poll.html");
        std::fs::write(&path, "a").unwrap();

        let watcher = ModificationWatcher::new(POLL).unwrap();
        let (count, listener) = counter();
        watcher.add(&path, None, listener);
        watcher.start(POLL).unwrap();
        assert!(watcher.is_running());
        assert!(watcher.start(POLL).is_err());

        std::fs::write(&path, "changed").unwrap();
        for _ in 0..250 {
            if count.load(Ordering::SeqCst) > 0 {
                break;
            }
            tokio::time::sleep(POLL).await;
        }
        watcher.stop();
        assert!(count.load(Ordering::SeqCst) >= 1);
        assert!(!watcher.is_running());
    }

    #[test]
    fn start_without_runtime_fails() {
        let watcher = ModificationWatcher::new(POLL).unwrap();
        assert!(watcher.start(POLL).is_err());
    }
}
