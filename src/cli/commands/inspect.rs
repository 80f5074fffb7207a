//! Inspect command - show the markup a component class resolves to

use super::parse::{print_table, MarkupReport};
use crate::autolink::{AutoLink, AutoLinkResolver};
use crate::cache::MarkupCache;
use crate::cli::args::{InspectArgs, OutputFormat};
use crate::config::Config;
use crate::error::{TrellisError, TrellisResult};
use crate::markup::{Markup, MarkupResourceStream};
use crate::ui::{self, UiContext};
use serde::Serialize;
use tracing::debug;

/// Execute the inspect command
pub async fn execute(args: InspectArgs, config: &Config) -> TrellisResult<()> {
    let cache = MarkupCache::from_config(config)?;
    let container = args
        .container
        .container(&args.class, &config.markup.extension);

    let markup = cache
        .get_markup(&container, None, false)?
        .ok_or_else(|| TrellisError::MarkupNotFound(args.class.clone()))?;
    debug!("Resolved {} with {} elements", args.class, markup.len());

    let links = if args.links {
        let package = cache.factory().container_class(&container).package().to_string();
        AutoLinkResolver::new(cache.factory().registry()).resolve_markup(&markup, &package)
    } else {
        Vec::new()
    };

    match args.format {
        OutputFormat::Json => print_json(&markup, &links)?,
        OutputFormat::Plain => print!("{}", markup),
        OutputFormat::Table => {
            let ctx = UiContext::detect();
            print_table(&markup, &args.class);
            println!();
            print_hierarchy(&ctx, &markup);
            if args.links {
                print_links(&ctx, &links);
            }
        }
    }
    Ok(())
}

/// Resource chain from the markup's own file down to its root base markup
fn hierarchy(markup: &Markup) -> Vec<&MarkupResourceStream> {
    let mut chain = Vec::new();
    let mut current = markup.resource().map(|r| r.as_ref());
    while let Some(resource) = current {
        chain.push(resource);
        current = resource.base_markup_resource().map(|r| r.as_ref());
    }
    chain
}

fn print_hierarchy(ctx: &UiContext, markup: &Markup) {
    ui::section(ctx, "Resources");
    for resource in hierarchy(markup) {
        ui::key_value(
            ctx,
            &resource.markup_class.name,
            &resource.location.display().to_string(),
        );
    }
}

fn print_links(ctx: &UiContext, links: &[AutoLink]) {
    ui::section(ctx, "Automatic links");
    if links.is_empty() {
        ui::remark(ctx, "none");
        return;
    }
    for link in links {
        let target = match link {
            AutoLink::Page {
                class_name,
                parameters,
                ..
            } if parameters.is_empty() => format!("page {}", class_name),
            AutoLink::Page {
                class_name,
                parameters,
                ..
            } => format!("page {} {:?}", class_name, parameters),
            AutoLink::External { href, .. } => href.clone(),
        };
        ui::key_value(ctx, link.id(), &target);
    }
}

fn print_json(markup: &Markup, links: &[AutoLink]) -> TrellisResult<()> {
    #[derive(Serialize)]
    struct InspectJson<'a> {
        #[serde(flatten)]
        markup: MarkupReport<'a>,
        hierarchy: Vec<String>,
        links: &'a [AutoLink],
    }

    let report = InspectJson {
        markup: MarkupReport::new(markup),
        hierarchy: hierarchy(markup)
            .into_iter()
            .map(|r| r.location_as_string())
            .collect(),
        links,
    };
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
