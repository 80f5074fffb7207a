//! Config command - show or edit configuration

use crate::cli::args::{ConfigAction, ConfigArgs};
use crate::config::{Config, ConfigManager, LOCAL_CONFIG_FILE};
use crate::error::{TrellisError, TrellisResult};
use crate::ui::{self, UiContext};
use std::path::PathBuf;
use tokio::fs;

/// Keys accepted by `config set`, with the kind of value they take
const CONFIG_KEYS: &[(&str, ValueKind)] = &[
    ("general.verbose", ValueKind::Bool),
    ("general.log_format", ValueKind::Text),
    ("markup.strip_comments", ValueKind::Bool),
    ("markup.compress_whitespace", ValueKind::Bool),
    ("markup.strip_wicket_tags", ValueKind::Bool),
    ("markup.default_encoding", ValueKind::Text),
    ("markup.automatic_linking", ValueKind::Bool),
    ("markup.extension", ValueKind::Text),
    ("cache.enabled", ValueKind::Bool),
    ("cache.watch", ValueKind::Bool),
    ("cache.poll_interval_ms", ValueKind::Number),
    ("resources.roots", ValueKind::PathList),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ValueKind {
    Bool,
    Number,
    Text,
    PathList,
}

/// Execute the config command
pub async fn execute(
    args: ConfigArgs,
    config: &Config,
    manager: &ConfigManager,
) -> TrellisResult<()> {
    match args.action {
        None | Some(ConfigAction::Show) => show_config(config)?,
        Some(ConfigAction::Path) => println!("{}", manager.path().display()),
        Some(ConfigAction::Init { force }) => init_config(manager, force).await?,
        Some(ConfigAction::Set { key, value, local }) => {
            if local {
                set_local_value(&key, &value).await?
            } else {
                set_value(manager, config, &key, &value).await?
            }
        }
    }

    Ok(())
}

fn show_config(config: &Config) -> TrellisResult<()> {
    println!("{}", toml::to_string_pretty(config)?);
    Ok(())
}

async fn init_config(manager: &ConfigManager, force: bool) -> TrellisResult<()> {
    let ctx = UiContext::detect();
    let path = manager.path();

    if path.exists() && !force {
        ui::step_warn_hint(
            &ctx,
            &format!("Config already exists at {}", path.display()),
            "Use --force to overwrite",
        );
        return Ok(());
    }

    manager.save(&Config::default()).await?;
    ui::step_ok_detail(&ctx, "Configuration initialized", &path.display().to_string());
    Ok(())
}

async fn set_value(
    manager: &ConfigManager,
    config: &Config,
    key: &str,
    value: &str,
) -> TrellisResult<()> {
    let ctx = UiContext::detect();
    let mut config = config.clone();

    match key {
        "general.verbose" => config.general.verbose = parse_bool(value)?,
        "general.log_format" => config.general.log_format = parse_log_format(value)?,
        "markup.strip_comments" => config.markup.strip_comments = parse_bool(value)?,
        "markup.compress_whitespace" => config.markup.compress_whitespace = parse_bool(value)?,
        "markup.strip_wicket_tags" => config.markup.strip_wicket_tags = parse_bool(value)?,
        "markup.default_encoding" => config.markup.default_encoding = value.to_string(),
        "markup.automatic_linking" => config.markup.automatic_linking = parse_bool(value)?,
        "markup.extension" => config.markup.extension = value.to_string(),
        "cache.enabled" => config.cache.enabled = parse_bool(value)?,
        "cache.watch" => config.cache.watch = parse_bool(value)?,
        "cache.poll_interval_ms" => config.cache.poll_interval_ms = parse_u64(value)?,
        "resources.roots" => config.resources.roots = split_list(value).map(PathBuf::from).collect(),
        _ => {
            ui::step_error_detail(&ctx, "Unknown config key", key);
            ui::remark(&ctx, "Valid keys:");
            for (key, _) in CONFIG_KEYS {
                eprintln!("  {}", key);
            }
            return Ok(());
        }
    }

    manager.save(&config).await?;
    ui::step_ok(&ctx, &format!("Set {} = {}", key, value));
    Ok(())
}

async fn set_local_value(key: &str, value: &str) -> TrellisResult<()> {
    let ctx = UiContext::detect();
    let kind = value_kind(key)?;

    let cwd =
        std::env::current_dir().map_err(|e| TrellisError::io("getting current directory", e))?;
    let local_path = cwd.join(LOCAL_CONFIG_FILE);

    // Start from the existing local file so unrelated keys survive
    let mut doc: toml::Value = if local_path.exists() {
        let content = fs::read_to_string(&local_path)
            .await
            .map_err(|e| TrellisError::io(format!("reading {}", local_path.display()), e))?;
        content
            .parse()
            .map_err(|e: toml::de::Error| TrellisError::ConfigInvalid {
                path: local_path.clone(),
                reason: e.to_string(),
            })?
    } else {
        toml::Value::Table(toml::map::Map::new())
    };

    set_toml_value(&mut doc, key, typed_value(kind, value)?)?;

    let content = toml::to_string_pretty(&doc)?;
    fs::write(&local_path, content)
        .await
        .map_err(|e| TrellisError::io(format!("writing {}", local_path.display()), e))?;

    ui::step_ok(
        &ctx,
        &format!("Set {} = {} in {}", key, value, local_path.display()),
    );
    Ok(())
}

fn value_kind(key: &str) -> TrellisResult<ValueKind> {
    CONFIG_KEYS
        .iter()
        .find(|(known, _)| *known == key)
        .map(|(_, kind)| *kind)
        .ok_or_else(|| TrellisError::User(format!("Unknown config key: {}", key)))
}

fn typed_value(kind: ValueKind, value: &str) -> TrellisResult<toml::Value> {
    Ok(match kind {
        ValueKind::Bool => toml::Value::Boolean(parse_bool(value)?),
        ValueKind::Number => {
            let number = i64::try_from(parse_u64(value)?)
                .map_err(|_| TrellisError::User(format!("Number too large: {}", value)))?;
            toml::Value::Integer(number)
        }
        ValueKind::Text => toml::Value::String(value.to_string()),
        ValueKind::PathList => toml::Value::Array(
            split_list(value)
                .map(|item| toml::Value::String(item.to_string()))
                .collect(),
        ),
    })
}

/// Set a dot-separated key in a TOML tree, creating intermediate tables
fn set_toml_value(doc: &mut toml::Value, key: &str, value: toml::Value) -> TrellisResult<()> {
    let (path, leaf) = match key.rsplit_once('.') {
        Some((path, leaf)) => (Some(path), leaf),
        None => (None, key),
    };

    let mut current = doc;
    for part in path.into_iter().flat_map(|p| p.split('.')) {
        current = current
            .as_table_mut()
            .ok_or_else(|| TrellisError::User(format!("Expected table at key: {}", part)))?
            .entry(part)
            .or_insert_with(|| toml::Value::Table(toml::map::Map::new()));
    }

    current
        .as_table_mut()
        .ok_or_else(|| TrellisError::User(format!("Expected table for key: {}", key)))?
        .insert(leaf.to_string(), value);
    Ok(())
}

fn split_list(value: &str) -> impl Iterator<Item = &str> {
    value.split(',').map(str::trim).filter(|s| !s.is_empty())
}

fn parse_log_format(value: &str) -> TrellisResult<String> {
    match value {
        "text" | "json" => Ok(value.to_string()),
        _ => Err(TrellisError::User(format!(
            "Invalid log format: {}. Use text or json",
            value
        ))),
    }
}

fn parse_bool(value: &str) -> TrellisResult<bool> {
    match value.to_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        _ => Err(TrellisError::User(format!(
            "Invalid boolean value: {}. Use true/false",
            value
        ))),
    }
}

fn parse_u64(value: &str) -> TrellisResult<u64> {
    value
        .parse()
        .map_err(|_| TrellisError::User(format!("Invalid number: {}", value)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sets_nested_values() {
        let mut doc = toml::Value::Table(toml::map::Map::new());
        set_toml_value(&mut doc, "cache.watch", toml::Value::Boolean(false)).unwrap();
        set_toml_value(&mut doc, "cache.poll_interval_ms", toml::Value::Integer(250)).unwrap();

        let config: Config = doc.try_into().unwrap();
        assert!(!config.cache.watch);
        assert_eq!(config.cache.poll_interval_ms, 250);
        assert!(config.cache.enabled);
    }

    #[test]
    fn typed_values() {
        assert_eq!(
            typed_value(ValueKind::Bool, "yes").unwrap(),
            toml::Value::Boolean(true)
        );
        assert!(typed_value(ValueKind::Number, "abc").is_err());
        assert_eq!(
            typed_value(ValueKind::PathList, "templates, shared ,").unwrap(),
            toml::Value::Array(vec![
                toml::Value::String("templates".into()),
                toml::Value::String("shared".into()),
            ])
        );
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(value_kind("vm.name").is_err());
        assert_eq!(value_kind("markup.extension").unwrap(), ValueKind::Text);
    }

    #[test]
    fn log_format_is_validated() {
        assert!(parse_log_format("json").is_ok());
        assert!(parse_log_format("xml").is_err());
    }
}
