//! Attribute extraction - reconciling declared monitoring intent against a
//! component's actual attribute catalog.
//!
//! Resolution runs once per discovered component, in a fixed order:
//! composite (dotted) specs, then ratio components into a found-set, then
//! counters, then gauges. Counters and gauges each resolve in two
//! whole-set passes - exact names for every spec first, the case-folded
//! fallback for the still-unresolved rest second - so an exact match on a
//! later spec beats a case-toggle on an earlier one. A matched attribute
//! is consumed and cannot be claimed twice.

use std::collections::{HashMap, HashSet};

use attrwatch_types::{DatumDefinition, DatumKind, ValueKind};
use tracing::{debug, warn};

use crate::catalog::AttributeCatalog;
use crate::composite::CompositeResolver;
use crate::error::SourceError;
use crate::query::{AttributeSpec, Query};
use crate::source::{ComponentHandle, ComponentSource};

/// Resolve a query against one component into its datum definitions.
///
/// Declared attributes missing from the catalog are silently absent from
/// the result; only ratio clauses that lose a component are logged.
pub fn resolve_definitions(
    query: &Query,
    source: &dyn ComponentSource,
    handle: &ComponentHandle,
) -> Result<Vec<DatumDefinition>, SourceError> {
    let mut catalog = AttributeCatalog::new(source.introspect(handle)?);
    let mut resolver = CompositeResolver::new();
    let mut resolved: Vec<DatumDefinition> = Vec::new();

    // Dotted specs resolve first and leave the pool.
    let (composite_counters, plain_counters) = split_composites(query.counters());
    let (composite_gauges, plain_gauges) = split_composites(query.gauges());
    for (specs, kind) in [
        (composite_counters, DatumKind::Counter),
        (composite_gauges, DatumKind::Gauge),
    ] {
        for spec in specs {
            match resolver.resolve_dotted(&catalog, spec, kind) {
                Some(def) => resolved.push(def),
                None => debug!(spec = spec.name(), "composite spec did not resolve"),
            }
        }
    }

    // Ratio components resolve without consuming catalog entries, so two
    // ratios may share a denominator and a counter may still claim it.
    let mut found: HashMap<&str, (String, ValueKind)> = HashMap::new();
    for ratio in query.ratios() {
        for name in [ratio.numerator(), ratio.denominator()] {
            if found.contains_key(name) {
                continue;
            }
            if let Some(info) = catalog.peek(name) {
                if info.kind.is_numeric() {
                    found.insert(name, (info.name.clone(), info.kind));
                }
            }
        }
    }

    resolve_plain(&mut catalog, &mut resolver, &plain_counters, DatumKind::Counter, &mut resolved);
    resolve_plain(&mut catalog, &mut resolver, &plain_gauges, DatumKind::Gauge, &mut resolved);

    // A ratio materializes only when both of its components resolved.
    let mut ratio_components: Vec<(String, ValueKind)> = Vec::new();
    for ratio in query.ratios() {
        match (found.get(ratio.numerator()), found.get(ratio.denominator())) {
            (Some(num), Some(den)) => {
                resolved.push(DatumDefinition::ratio(
                    ratio.name(),
                    num.0.clone(),
                    den.0.clone(),
                    ratio.is_percent(),
                ));
                ratio_components.push(num.clone());
                ratio_components.push(den.clone());
            }
            _ => warn!(
                ratio = ratio.name(),
                component = handle.name().canonical(),
                "dropping ratio with unresolved components"
            ),
        }
    }

    // Deduplicated union, first resolution wins. Ratio components not
    // otherwise claimed are appended as void definitions: extracted so the
    // ratio arithmetic has both endpoints, but never reported themselves.
    let mut seen: HashSet<String> = HashSet::new();
    let mut union: Vec<DatumDefinition> = Vec::new();
    for def in resolved {
        if seen.insert(def.name().to_string()) {
            union.push(def);
        }
    }
    for (name, kind) in ratio_components {
        if seen.insert(name.clone()) {
            union.push(DatumDefinition::new(name, DatumKind::Void, kind));
        }
    }

    Ok(union)
}

fn split_composites(specs: &[AttributeSpec]) -> (Vec<&AttributeSpec>, Vec<&AttributeSpec>) {
    specs.iter().partition(|spec| spec.is_composite())
}

fn resolve_plain(
    catalog: &mut AttributeCatalog,
    resolver: &mut CompositeResolver,
    specs: &[&AttributeSpec],
    requested: DatumKind,
    out: &mut Vec<DatumDefinition>,
) {
    let mut remaining: Vec<&AttributeSpec> = specs.to_vec();

    // Pass one: exact names, across all specs.
    remaining.retain(|spec| match catalog.take_exact(spec.name()) {
        Some(info) => {
            out.push(plain_definition(&info.name, info.kind, spec, requested));
            false
        }
        None => true,
    });

    // Pass two: case-folded fallback for whatever is left.
    remaining.retain(|spec| match catalog.take_folded(spec.name()) {
        Some(info) => {
            out.push(plain_definition(&info.name, info.kind, spec, requested));
            false
        }
        None => true,
    });

    // Last resort: a bare name may be a sub-field of some composite
    // attribute; it then canonicalizes to the fully qualified form.
    for spec in remaining {
        match resolver.resolve_bare(catalog, spec, requested) {
            Some(def) => out.push(def),
            None => debug!(spec = spec.name(), "attribute did not resolve"),
        }
    }
}

fn plain_definition(
    canonical: &str,
    kind: ValueKind,
    spec: &AttributeSpec,
    requested: DatumKind,
) -> DatumDefinition {
    let mut def = DatumDefinition::new(canonical, requested, kind);
    if let Some(display) = spec.display_name() {
        def = def.with_display_name(display);
    }
    def
}
