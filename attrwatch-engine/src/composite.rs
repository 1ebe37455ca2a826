//! Resolution of composite (dotted) attribute specs.
//!
//! A spec `Parent.Child` is split on the first dot only, so child names
//! may themselves contain dots. The parent resolves against the component
//! catalog and the child against the parent's sub-field catalog, each with
//! the case-folded fallback. The produced canonical name is always the
//! fully qualified `Parent.Child` form - also when the caller supplied a
//! bare child name and the parent had to be searched for.

use std::collections::HashMap;

use attrwatch_types::{DatumDefinition, DatumKind, ValueKind};

use crate::catalog::AttributeCatalog;
use crate::query::AttributeSpec;
use crate::source::AttributeInfo;

/// Per-query-execution resolver. Parent sub-field catalogs are cached so
/// repeated sub-field requests against the same parent resolve from the
/// first lookup.
#[derive(Debug, Default)]
pub struct CompositeResolver {
    parents: HashMap<String, Option<ParentFields>>,
}

#[derive(Debug, Clone)]
struct ParentFields {
    canonical: String,
    by_name: HashMap<String, ValueKind>,
    folded: HashMap<String, String>,
}

impl ParentFields {
    fn from_info(info: &AttributeInfo) -> Option<Self> {
        let sub_fields = info.sub_fields.as_ref()?;
        let mut by_name = HashMap::with_capacity(sub_fields.len());
        let mut folded = HashMap::with_capacity(sub_fields.len());
        for (name, kind) in sub_fields {
            by_name.insert(name.clone(), *kind);
            folded.entry(name.to_lowercase()).or_insert_with(|| name.clone());
        }
        Some(Self {
            canonical: info.name.clone(),
            by_name,
            folded,
        })
    }

    fn resolve_child(&self, child: &str) -> Option<(String, ValueKind)> {
        if let Some(kind) = self.by_name.get(child) {
            return Some((child.to_string(), *kind));
        }
        let canonical = self.folded.get(&child.to_lowercase())?;
        Some((canonical.clone(), self.by_name[canonical]))
    }
}

impl CompositeResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve a dotted spec `Parent.Child` into a definition.
    pub fn resolve_dotted(
        &mut self,
        catalog: &AttributeCatalog,
        spec: &AttributeSpec,
        requested: DatumKind,
    ) -> Option<DatumDefinition> {
        let (parent, child) = spec.name().split_once('.')?;
        let fields = self.parent(catalog, parent)?;
        let (child_name, kind) = fields.resolve_child(child)?;
        Some(make_definition(&fields.canonical, &child_name, kind, spec, requested))
    }

    /// Resolve a bare child name by searching the remaining composite
    /// parents in declaration order. The first parent exposing a matching
    /// sub-field wins.
    pub fn resolve_bare(
        &mut self,
        catalog: &AttributeCatalog,
        spec: &AttributeSpec,
        requested: DatumKind,
    ) -> Option<DatumDefinition> {
        let parents: Vec<String> = catalog.composites().map(|info| info.name.clone()).collect();
        for parent in parents {
            let Some(fields) = self.parent(catalog, &parent) else {
                continue;
            };
            if let Some((child_name, kind)) = fields.resolve_child(spec.name()) {
                return Some(make_definition(
                    &fields.canonical,
                    &child_name,
                    kind,
                    spec,
                    requested,
                ));
            }
        }
        None
    }

    fn parent(&mut self, catalog: &AttributeCatalog, name: &str) -> Option<ParentFields> {
        let key = name.to_lowercase();
        if let Some(cached) = self.parents.get(&key) {
            return cached.clone();
        }
        let fields = catalog.peek(name).and_then(ParentFields::from_info);
        self.parents.insert(key, fields.clone());
        fields
    }
}

fn make_definition(
    parent: &str,
    child: &str,
    kind: ValueKind,
    spec: &AttributeSpec,
    requested: DatumKind,
) -> DatumDefinition {
    let canonical = format!("{parent}.{child}");
    let mut def = DatumDefinition::new(canonical.clone(), requested, kind).with_parent(parent);
    if let Some(display) = spec.display_name() {
        def = def.with_display_name(display);
    }
    def
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> AttributeCatalog {
        AttributeCatalog::new(vec![
            AttributeInfo::scalar("Name", ValueKind::Text),
            AttributeInfo::composite(
                "Usage",
                vec![
                    ("used".to_string(), ValueKind::Long),
                    ("max".to_string(), ValueKind::Long),
                    ("committed.bytes".to_string(), ValueKind::Long),
                ],
            ),
            AttributeInfo::composite(
                "PeakUsage",
                vec![("used".to_string(), ValueKind::Long)],
            ),
        ])
    }

    #[test]
    fn dotted_spec_resolves_to_canonical_name() {
        let c = catalog();
        let mut resolver = CompositeResolver::new();
        let def = resolver
            .resolve_dotted(&c, &AttributeSpec::parse("Usage.used"), DatumKind::Gauge)
            .unwrap();

        assert_eq!(def.name(), "Usage.used");
        assert_eq!(def.parent(), Some("Usage"));
        assert_eq!(def.child(), Some("used"));
        assert_eq!(def.kind(), DatumKind::Gauge);
        assert_eq!(def.value_kind(), ValueKind::Long);
    }

    #[test]
    fn split_is_on_the_first_dot_only() {
        let c = catalog();
        let mut resolver = CompositeResolver::new();
        let def = resolver
            .resolve_dotted(
                &c,
                &AttributeSpec::parse("Usage.committed.bytes"),
                DatumKind::Gauge,
            )
            .unwrap();
        assert_eq!(def.name(), "Usage.committed.bytes");
        assert_eq!(def.child(), Some("committed.bytes"));
    }

    #[test]
    fn case_fold_applies_at_both_levels() {
        let c = catalog();
        let mut resolver = CompositeResolver::new();
        let def = resolver
            .resolve_dotted(&c, &AttributeSpec::parse("usage.Used"), DatumKind::Gauge)
            .unwrap();
        assert_eq!(def.name(), "Usage.used");
    }

    #[test]
    fn bare_child_resolves_against_first_declaring_parent() {
        let c = catalog();
        let mut resolver = CompositeResolver::new();
        let def = resolver
            .resolve_bare(&c, &AttributeSpec::parse("used"), DatumKind::Gauge)
            .unwrap();

        // Both Usage and PeakUsage expose "used"; Usage is declared first.
        assert_eq!(def.name(), "Usage.used");
    }

    #[test]
    fn bare_and_dotted_specs_agree_on_the_canonical_name() {
        let c = catalog();
        let mut resolver = CompositeResolver::new();
        let dotted = resolver
            .resolve_dotted(&c, &AttributeSpec::parse("Usage.used"), DatumKind::Gauge)
            .unwrap();
        let bare = resolver
            .resolve_bare(&c, &AttributeSpec::parse("used"), DatumKind::Gauge)
            .unwrap();
        assert_eq!(dotted.name(), bare.name());
    }

    #[test]
    fn missing_parent_or_child_is_a_miss() {
        let c = catalog();
        let mut resolver = CompositeResolver::new();
        assert!(resolver
            .resolve_dotted(&c, &AttributeSpec::parse("Nope.used"), DatumKind::Gauge)
            .is_none());
        assert!(resolver
            .resolve_dotted(&c, &AttributeSpec::parse("Usage.nope"), DatumKind::Gauge)
            .is_none());
        assert!(resolver
            .resolve_bare(&c, &AttributeSpec::parse("nope"), DatumKind::Gauge)
            .is_none());
    }

    #[test]
    fn scalar_parent_is_not_composite() {
        let c = catalog();
        let mut resolver = CompositeResolver::new();
        assert!(resolver
            .resolve_dotted(&c, &AttributeSpec::parse("Name.used"), DatumKind::Gauge)
            .is_none());
    }

    #[test]
    fn parent_lookups_are_cached() {
        let c = catalog();
        let mut resolver = CompositeResolver::new();
        resolver.resolve_dotted(&c, &AttributeSpec::parse("Usage.used"), DatumKind::Gauge);
        resolver.resolve_dotted(&c, &AttributeSpec::parse("Usage.max"), DatumKind::Gauge);
        assert_eq!(resolver.parents.len(), 1);
    }

    #[test]
    fn display_override_survives_composite_resolution() {
        let c = catalog();
        let mut resolver = CompositeResolver::new();
        let def = resolver
            .resolve_dotted(
                &c,
                &AttributeSpec::parse("Usage.used(displayName=\"Heap Used\")"),
                DatumKind::Gauge,
            )
            .unwrap();
        assert_eq!(def.display_name(), "Heap Used");
        assert_eq!(def.name(), "Usage.used");
    }
}
