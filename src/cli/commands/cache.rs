//! Cache command - warm the markup cache and report on it

use crate::cache::{CacheStats, MarkupCache};
use crate::cli::args::{CacheAction, CacheArgs, ContainerArgs, OutputFormat};
use crate::config::Config;
use crate::error::TrellisResult;
use crate::ui::{self, UiContext, WarmProgress};
use console::style;
use serde::Serialize;
use tracing::warn;

/// Execute the cache command
pub async fn execute(args: CacheArgs, config: &Config) -> TrellisResult<()> {
    match args.action {
        CacheAction::Warm { container, format } => warm(config, &container, format),
        CacheAction::Stats { remove, format } => stats(config, remove, format),
    }
}

/// Outcome of loading every configured component
#[derive(Debug, Default, Serialize)]
struct WarmReport {
    loaded: Vec<String>,
    missing: Vec<String>,
    failed: Vec<(String, String)>,
}

fn warm_all(
    cache: &MarkupCache,
    config: &Config,
    container: &ContainerArgs,
    progress: Option<&WarmProgress>,
) -> WarmReport {
    let mut report = WarmReport::default();
    let classes: Vec<String> = cache
        .factory()
        .registry()
        .names()
        .into_iter()
        .map(str::to_string)
        .collect();

    for class in classes {
        let info = container.container(&class, &config.markup.extension);
        match cache.get_markup(&info, None, false) {
            Ok(Some(_)) => {
                if let Some(progress) = progress {
                    progress.loaded(&class);
                }
                report.loaded.push(class);
            }
            Ok(None) => {
                if let Some(progress) = progress {
                    progress.failed(&class, "no markup");
                }
                report.missing.push(class);
            }
            Err(e) => {
                warn!("Failed to load markup for {}: {}", class, e);
                if let Some(progress) = progress {
                    progress.failed(&class, &e.to_string());
                }
                report.failed.push((class, e.to_string()));
            }
        }
    }
    report
}

fn warm(config: &Config, container: &ContainerArgs, format: OutputFormat) -> TrellisResult<()> {
    let cache = MarkupCache::from_config(config)?;

    let report = match format {
        OutputFormat::Table => {
            let ctx = UiContext::detect();
            let progress = WarmProgress::new(&ctx, cache.factory().registry().len());
            let report = warm_all(&cache, config, container, Some(&progress));
            progress.finish();
            report
        }
        _ => warm_all(&cache, config, container, None),
    };
    let stats = cache.stats();

    match format {
        OutputFormat::Json => {
            #[derive(Serialize)]
            struct WarmJson<'a> {
                #[serde(flatten)]
                report: &'a WarmReport,
                stats: &'a CacheStats,
                keys: Vec<String>,
            }
            let json = WarmJson {
                report: &report,
                stats: &stats,
                keys: cache.cache_keys(),
            };
            println!("{}", serde_json::to_string_pretty(&json)?);
        }
        OutputFormat::Plain => {
            for key in cache.cache_keys() {
                println!("{}", key);
            }
        }
        OutputFormat::Table => {
            let ctx = UiContext::detect();
            ui::step_ok_detail(
                &ctx,
                &format!("Loaded {} component(s)", report.loaded.len()),
                &format!("{} missing, {} failed", report.missing.len(), report.failed.len()),
            );
            print_stats(&ctx, &stats);
        }
    }
    Ok(())
}

fn stats(config: &Config, remove: Option<String>, format: OutputFormat) -> TrellisResult<()> {
    let cache = MarkupCache::from_config(config)?;
    warm_all(&cache, config, &ContainerArgs::default(), None);

    let before = cache.cache_keys();
    let removed = remove.as_deref().map(|key| cache.remove_markup(key).is_some());
    let after = cache.cache_keys();
    let invalidated: Vec<&String> = before.iter().filter(|k| !after.contains(k)).collect();
    let stats = cache.stats();

    match format {
        OutputFormat::Json => {
            #[derive(Serialize)]
            struct StatsJson<'a> {
                #[serde(flatten)]
                stats: &'a CacheStats,
                keys: &'a [String],
                invalidated: &'a [&'a String],
            }
            let json = StatsJson {
                stats: &stats,
                keys: &after,
                invalidated: &invalidated,
            };
            println!("{}", serde_json::to_string_pretty(&json)?);
        }
        OutputFormat::Plain => {
            for key in &after {
                println!("{}", key);
            }
        }
        OutputFormat::Table => {
            let ctx = UiContext::detect();
            print_stats(&ctx, &stats);
            if let (Some(key), Some(found)) = (&remove, removed) {
                println!();
                if !found {
                    ui::step_warn_hint(
                        &ctx,
                        &format!("{} is not cached", key),
                        "Run: trellis cache warm --format plain",
                    );
                } else {
                    ui::section(&ctx, &format!("Removed {}", key));
                    for key in &invalidated {
                        println!("  {} {}", style("-").red(), key);
                    }
                }
            }
        }
    }
    Ok(())
}

fn print_stats(ctx: &UiContext, stats: &CacheStats) {
    ui::section(ctx, "Markup cache");
    ui::key_value(ctx, "markups", &stats.markups.to_string());
    ui::key_value(ctx, "not found", &stats.no_markup.to_string());
    ui::key_value(ctx, "keys", &stats.keys.to_string());
    ui::key_value(ctx, "watched files", &stats.watched.to_string());
}
