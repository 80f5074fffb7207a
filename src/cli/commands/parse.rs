//! Parse command - run one markup file through the parser

use crate::cli::args::{OutputFormat, ParseArgs};
use crate::config::Config;
use crate::error::{TrellisError, TrellisResult};
use crate::factory::ComponentRegistry;
use crate::markup::{ContainerInfo, Markup, MarkupElement, MarkupResourceStream};
use crate::parser::{MarkupParser, ParserSettings};
use crate::ui::{self, UiContext};
use serde::Serialize;
use std::sync::Arc;
use tokio::fs;

/// Execute the parse command
pub async fn execute(args: ParseArgs, config: &Config) -> TrellisResult<()> {
    if !args.file.exists() {
        return Err(TrellisError::PathNotFound(args.file));
    }
    let text = fs::read_to_string(&args.file)
        .await
        .map_err(|e| TrellisError::io(format!("reading {}", args.file.display()), e))?;

    let parser = MarkupParser::new(ParserSettings::from(&config.markup));
    let markup = match &args.class {
        Some(class_name) => {
            let registry = ComponentRegistry::from_config(&config.components)?;
            let resource = MarkupResourceStream::new(
                args.file.clone(),
                ContainerInfo::new(class_name).with_markup_type(&config.markup.extension),
                registry.class(class_name),
            );
            parser.parse_resource(&text, Arc::new(resource))?
        }
        None => parser.parse(&text)?,
    };

    match args.format {
        OutputFormat::Table => print_table(&markup, &args.file.display().to_string()),
        OutputFormat::Json => print_json(&markup)?,
        OutputFormat::Plain => print!("{}", markup),
    }
    Ok(())
}

/// JSON shape shared by `parse` and `inspect`
#[derive(Serialize)]
pub(crate) struct MarkupReport<'a> {
    pub location: Option<String>,
    pub wicket_namespace: &'a str,
    pub encoding: Option<&'a str>,
    pub loaded_at: String,
    pub components: Vec<&'a str>,
    pub elements: &'a [MarkupElement],
}

impl<'a> MarkupReport<'a> {
    pub fn new(markup: &'a Markup) -> Self {
        Self {
            location: markup.location_as_string(),
            wicket_namespace: markup.wicket_namespace(),
            encoding: markup.encoding(),
            loaded_at: markup.loaded_at().to_rfc3339(),
            components: markup.component_ids(),
            elements: markup.elements(),
        }
    }
}

fn print_json(markup: &Markup) -> TrellisResult<()> {
    println!("{}", serde_json::to_string_pretty(&MarkupReport::new(markup))?);
    Ok(())
}

pub(crate) fn print_table(markup: &Markup, title: &str) {
    let ctx = UiContext::detect();
    ui::section(&ctx, title);
    ui::key_value(&ctx, "namespace", markup.wicket_namespace());
    ui::key_value(&ctx, "encoding", markup.encoding().unwrap_or("-"));
    ui::key_value(&ctx, "elements", &markup.len().to_string());
    println!();

    println!("{:<6} {:<8} {:<20} {:<30}", "INDEX", "KIND", "ID", "TEXT");
    println!("{}", "-".repeat(70));
    for (index, element) in markup.elements().iter().enumerate() {
        let (kind, id) = match element {
            MarkupElement::Raw { .. } => ("raw", String::new()),
            MarkupElement::Tag(tag) => {
                let id = tag
                    .id
                    .clone()
                    .or_else(|| tag.open_tag_id.as_ref().map(|id| format!("/{}", id)))
                    .unwrap_or_default();
                ("tag", id)
            }
        };
        println!(
            "{:<6} {:<8} {:<20} {:<30}",
            index,
            kind,
            id,
            summarize(&element.to_markup(), 40)
        );
    }
}

/// Single-line preview of `text`, at most `max` characters
fn summarize(text: &str, max: usize) -> String {
    let flat: String = text
        .chars()
        .map(|c| if c.is_whitespace() { ' ' } else { c })
        .collect();
    if flat.chars().count() <= max {
        return flat;
    }
    let cut: String = flat.chars().take(max.saturating_sub(3)).collect();
    format!("{}...", cut)
}
