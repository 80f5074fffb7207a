//! Markup factory
//!
//! Knows the component classes, finds the template for a container by
//! walking its class hierarchy, and turns a located resource into parsed
//! markup. Inherited markup is merged with the base class markup, which is
//! fetched through the cache so it is cached under its own key.

use crate::cache::MarkupCache;
use crate::config::{ComponentConfig, Config};
use crate::error::{TrellisError, TrellisResult};
use crate::markup::{
    inherit, ComponentClass, ComponentKind, ContainerInfo, Markup, MarkupResourceStream,
    ResourceLocator,
};
use crate::parser::{MarkupParser, ParserSettings};
use std::collections::{HashMap, HashSet};
use std::io::ErrorKind;
use std::sync::Arc;
use tracing::{debug, trace};

/// Registered component classes
#[derive(Debug, Clone, Default)]
pub struct ComponentRegistry {
    classes: HashMap<String, ComponentClass>,
}

impl ComponentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from `[[components]]` config entries, rejecting cyclic hierarchies
    pub fn from_config(components: &[ComponentConfig]) -> TrellisResult<Self> {
        let mut registry = Self::new();
        for component in components {
            let mut class =
                ComponentClass::new(&component.name, ComponentKind::parse(&component.kind));
            if let Some(base) = &component.extends {
                class = class.extending(base);
            }
            registry.register(class);
        }

        for name in registry.classes.keys() {
            registry.ancestors(name)?;
        }
        Ok(registry)
    }

    pub fn register(&mut self, class: ComponentClass) {
        self.classes.insert(class.name.clone(), class);
    }

    pub fn get(&self, name: &str) -> Option<&ComponentClass> {
        self.classes.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.classes.contains_key(name)
    }

    /// The registered class, or a plain container without a superclass
    pub fn class(&self, name: &str) -> ComponentClass {
        self.get(name)
            .cloned()
            .unwrap_or_else(|| ComponentClass::new(name, ComponentKind::Container))
    }

    /// Superclass of `class`, if it has one
    pub fn superclass(&self, class: &ComponentClass) -> Option<ComponentClass> {
        class.extends.as_deref().map(|base| self.class(base))
    }

    /// `name` followed by its superclasses, nearest first
    pub fn ancestors(&self, name: &str) -> TrellisResult<Vec<ComponentClass>> {
        let mut chain = Vec::new();
        let mut seen = HashSet::new();
        let mut current = Some(self.class(name));

        while let Some(class) = current {
            if !seen.insert(class.name.clone()) {
                return Err(TrellisError::CyclicHierarchy(name.to_string()));
            }
            current = self.superclass(&class);
            chain.push(class);
        }
        Ok(chain)
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    /// Registered class names, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.classes.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

/// Locates and loads markup
#[derive(Debug, Clone)]
pub struct MarkupFactory {
    settings: ParserSettings,
    locator: ResourceLocator,
    registry: ComponentRegistry,
}

impl MarkupFactory {
    pub fn new(
        settings: ParserSettings,
        locator: ResourceLocator,
        registry: ComponentRegistry,
    ) -> Self {
        Self {
            settings,
            locator,
            registry,
        }
    }

    pub fn from_config(config: &Config) -> TrellisResult<Self> {
        Ok(Self::new(
            ParserSettings::from(&config.markup),
            ResourceLocator::new(config.resources.roots.clone()),
            ComponentRegistry::from_config(&config.components)?,
        ))
    }

    pub fn registry(&self) -> &ComponentRegistry {
        &self.registry
    }

    pub fn locator(&self) -> &ResourceLocator {
        &self.locator
    }

    pub fn settings(&self) -> &ParserSettings {
        &self.settings
    }

    /// Class whose markup the container needs
    pub fn container_class(&self, container: &ContainerInfo) -> ComponentClass {
        self.registry.class(&container.class_name)
    }

    /// Parser configured with the factory's settings
    pub fn new_markup_parser(&self) -> MarkupParser {
        MarkupParser::new(self.settings.clone())
    }

    /// Find the template for `class`, falling back to its superclasses
    pub fn markup_resource_stream(
        &self,
        container: &ContainerInfo,
        class: &ComponentClass,
    ) -> TrellisResult<Option<MarkupResourceStream>> {
        for candidate in self.registry.ancestors(&class.name)? {
            if let Some(path) = self.locator.locate(&candidate, container) {
                trace!("Markup for {} found at {}", class.name, path.display());
                return Ok(Some(MarkupResourceStream::new(
                    path,
                    container.clone(),
                    candidate,
                )));
            }
        }
        debug!("No markup found for {}", class.name);
        Ok(None)
    }

    /// Read and parse a located resource.
    ///
    /// Returns `Ok(None)` when the file has disappeared since it was located.
    pub fn load_markup(
        &self,
        cache: &MarkupCache,
        resource: MarkupResourceStream,
        enforce_reload: bool,
    ) -> TrellisResult<Option<Markup>> {
        let bytes = match std::fs::read(&resource.location) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(TrellisError::io(
                    format!("reading {}", resource.location.display()),
                    e,
                ))
            }
        };
        let text = String::from_utf8_lossy(&bytes);

        let resource = Arc::new(resource);
        let markup = self
            .new_markup_parser()
            .parse_resource(&text, Arc::clone(&resource))?;

        if !inherit::is_inherited(&markup) {
            return Ok(Some(markup));
        }

        let class = &resource.markup_class;
        let base_class = self
            .registry
            .superclass(class)
            .ok_or_else(|| TrellisError::NoBaseClass(class.name.clone()))?;

        let base = cache
            .get_markup(&resource.container, Some(&base_class), enforce_reload)?
            .ok_or_else(|| TrellisError::BaseMarkupNotFound {
                class: class.name.clone(),
                base: base_class.name.clone(),
            })?;

        debug!("Merging {} with base markup {}", class.name, base_class.name);
        Ok(Some(Markup::merged(&markup, &base)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn component(name: &str, extends: Option<&str>, kind: &str) -> ComponentConfig {
        ComponentConfig {
            name: name.to_string(),
            extends: extends.map(str::to_string),
            kind: kind.to_string(),
        }
    }

    #[test]
    fn registry_from_config() {
        let registry = ComponentRegistry::from_config(&[
            component("app.BasePage", None, "page"),
            component("app.Home", Some("app.BasePage"), "page"),
        ])
        .unwrap();

        assert_eq!(registry.len(), 2);
        let home = registry.class("app.Home");
        assert!(home.is_page());
        assert_eq!(
            registry.superclass(&home).map(|c| c.name),
            Some("app.BasePage".to_string())
        );
    }

    #[test]
    fn unknown_class_is_plain_container() {
        let registry = ComponentRegistry::new();
        let class = registry.class("x.Unknown");
        assert_eq!(class.kind, ComponentKind::Container);
        assert!(class.extends.is_none());
    }

    #[test]
    fn ancestors_nearest_first() {
        let registry = ComponentRegistry::from_config(&[
            component("a.A", None, "page"),
            component("a.B", Some("a.A"), "page"),
            component("a.C", Some("a.B"), "page"),
        ])
        .unwrap();
        let names: Vec<String> = registry
            .ancestors("a.C")
            .unwrap()
            .into_iter()
            .map(|c| c.name)
            .collect();
        assert_eq!(names, vec!["a.C", "a.B", "a.A"]);
    }

    #[test]
    fn cyclic_hierarchy_rejected() {
        let err = ComponentRegistry::from_config(&[
            component("a.A", Some("a.B"), "panel"),
            component("a.B", Some("a.A"), "panel"),
        ])
        .unwrap_err();
        assert!(matches!(err, TrellisError::CyclicHierarchy(_)));
    }

    #[test]
    fn resource_stream_walks_hierarchy() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("app")).unwrap();
        std::fs::write(dir.path().join("app/Base.html"), "<p>base</p>").unwrap();

        let registry = ComponentRegistry::from_config(&[
            component("app.Base", None, "panel"),
            component("app.Derived", Some("app.Base"), "panel"),
        ])
        .unwrap();
        let factory = MarkupFactory::new(
            ParserSettings::default(),
            ResourceLocator::new(vec![dir.path().to_path_buf()]),
            registry,
        );

        let container = ContainerInfo::new("app.Derived");
        let class = factory.container_class(&container);
        let stream = factory
            .markup_resource_stream(&container, &class)
            .unwrap()
            .unwrap();
        assert_eq!(stream.markup_class.name, "app.Base");
        assert!(stream.location.ends_with("app/Base.html"));

        let missing = factory
            .markup_resource_stream(&ContainerInfo::new("other.X"), &registry_class("other.X"))
            .unwrap();
        assert!(missing.is_none());
    }

    fn registry_class(name: &str) -> ComponentClass {
        ComponentClass::new(name, ComponentKind::Container)
    }
}
