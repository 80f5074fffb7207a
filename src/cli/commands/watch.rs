//! Watch command - keep markup loaded and reload it as templates change

use crate::cache::MarkupCache;
use crate::cli::args::WatchArgs;
use crate::config::Config;
use crate::error::{TrellisError, TrellisResult};
use crate::markup::{ContainerInfo, Markup};
use crate::ui::{self, TaskSpinner, UiContext};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

/// Execute the watch command
pub async fn execute(args: WatchArgs, config: &Config) -> TrellisResult<()> {
    if !config.cache.enabled {
        return Err(TrellisError::User(
            "Caching is disabled (cache.enabled = false); nothing to watch".to_string(),
        ));
    }
    let ctx = UiContext::detect();
    let mut config = config.clone();
    if let Some(interval) = args.interval {
        config.cache.poll_interval_ms = interval;
    }
    let config = &config;
    let cache = MarkupCache::from_config(config)?;
    let watcher = cache.watcher().cloned().ok_or_else(|| {
        TrellisError::User("File watching is disabled (cache.watch = false)".to_string())
    })?;

    let classes = if args.classes.is_empty() {
        cache
            .factory()
            .registry()
            .names()
            .into_iter()
            .map(str::to_string)
            .collect()
    } else {
        args.classes.clone()
    };
    if classes.is_empty() {
        return Err(TrellisError::User(
            "No component classes to watch; pass class names or add [[components]]".to_string(),
        ));
    }

    let mut loaded = BTreeMap::new();
    for class in &classes {
        let container = ContainerInfo::new(class).with_markup_type(&config.markup.extension);
        let markup = load(&ctx, &cache, &container);
        loaded.insert(class.clone(), (container, markup));
    }
    ui::step_info(&ctx, &format!("Watching {} file(s)", watcher.len()));

    if args.once {
        // Give the poll thread one full scan
        tokio::time::sleep(watcher.poll_interval()).await;
        let changed = watcher.check();
        reload_changed(&ctx, &cache, &mut loaded);
        ui::step_ok(&ctx, &format!("{} file(s) changed", changed));
        return Ok(());
    }

    let interval = watcher.poll_interval();
    let mut spinner = TaskSpinner::new(&ctx);
    spinner.start("Watching for changes (Ctrl-C to stop)");
    if let Err(e) = watcher.start(interval) {
        spinner.stop_error("Could not start the file watcher");
        return Err(e);
    }

    let mut ticker = tokio::time::interval(interval);
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            _ = ticker.tick() => reload_changed(&ctx, &cache, &mut loaded),
        }
    }

    watcher.stop();
    cache.shutdown();
    spinner.stop("Stopped watching");
    Ok(())
}

fn load(ctx: &UiContext, cache: &MarkupCache, container: &ContainerInfo) -> Option<Arc<Markup>> {
    match cache.get_markup(container, None, false) {
        Ok(Some(markup)) => Some(markup),
        Ok(None) => {
            ui::step_warn_hint(
                ctx,
                &format!("No markup for {}", container.class_name),
                "Check [resources] roots",
            );
            None
        }
        Err(e) => {
            ui::step_error_detail(ctx, &container.class_name, &e.to_string());
            None
        }
    }
}

/// Reload every class whose cache entry was invalidated and report it
fn reload_changed(
    ctx: &UiContext,
    cache: &MarkupCache,
    loaded: &mut BTreeMap<String, (ContainerInfo, Option<Arc<Markup>>)>,
) {
    for (class, (container, current)) in loaded.iter_mut() {
        let still_cached = current
            .as_ref()
            .and_then(|m| m.resource())
            .and_then(|r| r.cache_key.as_deref())
            .is_some_and(|key| cache.is_markup_cached(key));
        if still_cached {
            continue;
        }

        debug!("Reloading markup for {}", class);
        // Errors are reported once, when a working template breaks
        let reloaded = match cache.get_markup(container, None, false) {
            Ok(markup) => markup,
            Err(e) => {
                if current.is_some() {
                    ui::step_error_detail(ctx, class, &e.to_string());
                }
                None
            }
        };
        if reloaded.is_some() {
            ui::step_ok(ctx, &format!("Reloaded {}", class));
        }
        *current = reloaded;
    }
}
