//! The managed-component source boundary.
//!
//! A component source exposes externally registered components by name,
//! lets the engine introspect their attribute catalogs (including nested
//! sub-field catalogs for composite attributes), and serves individual
//! attribute values. Production deployments plug a real source in behind
//! [`ComponentSource`]; tests and demos use [`MapSource`].

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use attrwatch_types::{AttrValue, ValueKind};
use parking_lot::RwLock;

use crate::error::SourceError;

/// Structured name of a managed component: a domain plus key properties.
///
/// Patterns use the same shape; a property value of `*` matches any value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ComponentName {
    domain: String,
    properties: BTreeMap<String, String>,
}

impl ComponentName {
    pub fn new(domain: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
            properties: BTreeMap::new(),
        }
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    pub fn property(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(String::as_str)
    }

    /// Whether this concrete name matches a pattern. The domain must be
    /// equal; every pattern property must be present, with `*` accepting
    /// any value.
    pub fn matches(&self, pattern: &ComponentName) -> bool {
        if self.domain != pattern.domain {
            return false;
        }
        pattern.properties.iter().all(|(key, value)| match self.properties.get(key) {
            Some(own) => value == "*" || own == value,
            None => false,
        })
    }

    /// Canonical string form `domain:key=value,...` with sorted keys.
    pub fn canonical(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for ComponentName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:", self.domain)?;
        for (i, (key, value)) in self.properties.iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            write!(f, "{key}={value}")?;
        }
        Ok(())
    }
}

/// A discovered component, addressable through its source.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ComponentHandle {
    name: ComponentName,
}

impl ComponentHandle {
    pub fn new(name: ComponentName) -> Self {
        Self { name }
    }

    pub fn name(&self) -> &ComponentName {
        &self.name
    }
}

/// One entry of a component's attribute catalog.
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeInfo {
    pub name: String,
    pub kind: ValueKind,
    /// Nested sub-field catalog for composite attributes.
    pub sub_fields: Option<Vec<(String, ValueKind)>>,
}

impl AttributeInfo {
    pub fn scalar(name: impl Into<String>, kind: ValueKind) -> Self {
        Self {
            name: name.into(),
            kind,
            sub_fields: None,
        }
    }

    pub fn composite(name: impl Into<String>, sub_fields: Vec<(String, ValueKind)>) -> Self {
        Self {
            name: name.into(),
            kind: ValueKind::Text,
            sub_fields: Some(sub_fields),
        }
    }

    pub fn is_composite(&self) -> bool {
        self.sub_fields.is_some()
    }
}

/// The managed-component source collaborator.
///
/// Calls are synchronous and blocking; no timeout is enforced on an
/// individual call, so an unresponsive source stalls only the refresh
/// cycle that invoked it.
pub trait ComponentSource: Send + Sync {
    /// Every component whose name matches the pattern.
    fn find_components(&self, pattern: &ComponentName)
        -> Result<Vec<ComponentHandle>, SourceError>;

    /// The component's attribute catalog.
    fn introspect(&self, handle: &ComponentHandle) -> Result<Vec<AttributeInfo>, SourceError>;

    /// One attribute value by exact declared name.
    fn get_attribute(
        &self,
        handle: &ComponentHandle,
        name: &str,
    ) -> Result<AttrValue, SourceError>;
}

impl<T: ComponentSource + ?Sized> ComponentSource for Arc<T> {
    fn find_components(
        &self,
        pattern: &ComponentName,
    ) -> Result<Vec<ComponentHandle>, SourceError> {
        (**self).find_components(pattern)
    }

    fn introspect(&self, handle: &ComponentHandle) -> Result<Vec<AttributeInfo>, SourceError> {
        (**self).introspect(handle)
    }

    fn get_attribute(
        &self,
        handle: &ComponentHandle,
        name: &str,
    ) -> Result<AttrValue, SourceError> {
        (**self).get_attribute(handle, name)
    }
}

/// In-memory component source backed by a map of attribute values.
///
/// Attribute catalogs are derived from the stored values; composite values
/// report their fields as a nested sub-field catalog.
#[derive(Debug, Default)]
pub struct MapSource {
    components: RwLock<BTreeMap<String, StoredComponent>>,
}

#[derive(Debug)]
struct StoredComponent {
    name: ComponentName,
    attributes: BTreeMap<String, AttrValue>,
}

impl MapSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a component with its attribute values. Replaces any
    /// previously stored component of the same name.
    pub fn register(
        &self,
        name: ComponentName,
        attributes: impl IntoIterator<Item = (&'static str, AttrValue)>,
    ) {
        let attributes = attributes
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect();
        self.components.write().insert(
            name.canonical(),
            StoredComponent { name, attributes },
        );
    }

    /// Overwrite a single attribute value, e.g. to advance a counter
    /// between snapshots.
    pub fn set_attribute(&self, name: &ComponentName, attribute: &str, value: AttrValue) {
        if let Some(component) = self.components.write().get_mut(&name.canonical()) {
            component.attributes.insert(attribute.to_string(), value);
        }
    }

    /// Drop a single attribute, simulating it disappearing at runtime.
    pub fn remove_attribute(&self, name: &ComponentName, attribute: &str) {
        if let Some(component) = self.components.write().get_mut(&name.canonical()) {
            component.attributes.remove(attribute);
        }
    }

    /// Remove a whole component.
    pub fn deregister(&self, name: &ComponentName) {
        self.components.write().remove(&name.canonical());
    }
}

impl ComponentSource for MapSource {
    fn find_components(
        &self,
        pattern: &ComponentName,
    ) -> Result<Vec<ComponentHandle>, SourceError> {
        let components = self.components.read();
        Ok(components
            .values()
            .filter(|c| c.name.matches(pattern))
            .map(|c| ComponentHandle::new(c.name.clone()))
            .collect())
    }

    fn introspect(&self, handle: &ComponentHandle) -> Result<Vec<AttributeInfo>, SourceError> {
        let components = self.components.read();
        let component = components
            .get(&handle.name().canonical())
            .ok_or_else(|| SourceError::NoSuchComponent(handle.name().canonical()))?;

        Ok(component
            .attributes
            .iter()
            .map(|(name, value)| match value {
                AttrValue::Composite(fields) => AttributeInfo::composite(
                    name.clone(),
                    fields
                        .iter()
                        .filter_map(|(field, v)| v.kind().map(|k| (field.clone(), k)))
                        .collect(),
                ),
                scalar => AttributeInfo::scalar(
                    name.clone(),
                    scalar.kind().unwrap_or(ValueKind::Text),
                ),
            })
            .collect())
    }

    fn get_attribute(
        &self,
        handle: &ComponentHandle,
        name: &str,
    ) -> Result<AttrValue, SourceError> {
        let components = self.components.read();
        let component = components
            .get(&handle.name().canonical())
            .ok_or_else(|| SourceError::NoSuchComponent(handle.name().canonical()))?;
        component
            .attributes
            .get(name)
            .cloned()
            .ok_or_else(|| SourceError::NoSuchAttribute(name.to_string()))
    }
}
