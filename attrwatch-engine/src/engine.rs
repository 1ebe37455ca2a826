//! Query engine - turning a query into the set of matching instances.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::error::SourceError;
use crate::extract::resolve_definitions;
use crate::instance::Instance;
use crate::query::Query;
use crate::source::ComponentSource;

/// Discovers the components matching a query and binds each into an
/// [`Instance`] with its definitions resolved once.
pub struct QueryEngine {
    source: Arc<dyn ComponentSource>,
}

impl QueryEngine {
    pub fn new(source: Arc<dyn ComponentSource>) -> Self {
        Self { source }
    }

    pub fn source(&self) -> &Arc<dyn ComponentSource> {
        &self.source
    }

    /// Run one discovery pass. Cost is proportional to the number of
    /// matches; per-component resolution failures skip that component
    /// only. A [`SourceError`] from the lookup itself aborts the pass.
    pub fn discover(&self, query: &Query) -> Result<Vec<Instance>, SourceError> {
        let pattern = query.component_pattern();
        let handles = self.source.find_components(&pattern)?;
        let mut instances = Vec::with_capacity(handles.len());

        for handle in handles {
            let instance_id = query
                .instance_key()
                .and_then(|key| handle.name().property(key))
                .map(str::to_string);

            if let Some(filter) = query.instance_filter() {
                let matched = instance_id.as_deref().is_some_and(|id| filter.is_match(id));
                if !matched {
                    debug!(
                        component = handle.name().canonical(),
                        "instance filter rejected component"
                    );
                    continue;
                }
            }

            if let Some((attribute, regex)) = query.attribute_filter() {
                match self.source.get_attribute(&handle, attribute) {
                    Ok(value) if regex.is_match(&value.to_string()) => {}
                    Ok(_) => continue,
                    Err(err) => {
                        warn!(
                            %err,
                            component = handle.name().canonical(),
                            "attribute filter unevaluable, skipping component"
                        );
                        continue;
                    }
                }
            }

            let definitions = match resolve_definitions(query, self.source.as_ref(), &handle) {
                Ok(definitions) => definitions,
                Err(err) => {
                    warn!(
                        %err,
                        component = handle.name().canonical(),
                        "skipping unresolvable component"
                    );
                    continue;
                }
            };

            instances.push(Instance::new(
                handle,
                query.signature(),
                query.display_name().to_string(),
                definitions,
                instance_id,
                query.interval(),
            ));
        }

        Ok(instances)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::{ComponentName, MapSource};
    use attrwatch_types::AttrValue;

    fn pool(name: &str) -> ComponentName {
        ComponentName::new("app.pools")
            .with_property("type", "ConnectionPool")
            .with_property("name", name)
    }

    fn source_with_pools(names: &[&'static str]) -> Arc<MapSource> {
        let source = Arc::new(MapSource::new());
        for name in names {
            source.register(
                pool(name),
                [
                    ("WaitCount", AttrValue::Long(1)),
                    ("Label", AttrValue::Text(format!("pool {name}"))),
                ],
            );
        }
        source
    }

    #[test]
    fn one_instance_per_match() {
        let source = source_with_pools(&["main", "batch"]);
        let engine = QueryEngine::new(source);
        let query = Query::builder("app.pools", "type=ConnectionPool")
            .instance_key("name")
            .counters("WaitCount")
            .build()
            .unwrap();

        let mut instances = engine.discover(&query).unwrap();
        instances.sort_by_key(|i| i.key());
        assert_eq!(instances.len(), 2);
        assert_eq!(instances[0].instance_id(), Some("batch"));
        assert_eq!(instances[1].instance_id(), Some("main"));
        assert_eq!(instances[0].definitions().len(), 1);
    }

    #[test]
    fn instance_filter_narrows_matches() {
        let source = source_with_pools(&["main", "batch", "maintenance"]);
        let engine = QueryEngine::new(source);
        let query = Query::builder("app.pools", "type=ConnectionPool")
            .instance_key("name")
            .instance_filter("^main")
            .counters("WaitCount")
            .build()
            .unwrap();

        let mut keys: Vec<String> = engine
            .discover(&query)
            .unwrap()
            .iter()
            .map(Instance::key)
            .collect();
        keys.sort();
        assert_eq!(keys, ["main", "maintenance"]);
    }

    #[test]
    fn attribute_filter_reads_the_component() {
        let source = source_with_pools(&["main", "batch"]);
        let engine = QueryEngine::new(source);
        let query = Query::builder("app.pools", "type=ConnectionPool")
            .instance_key("name")
            .attribute_filter("Label=pool main")
            .counters("WaitCount")
            .build()
            .unwrap();

        let instances = engine.discover(&query).unwrap();
        assert_eq!(instances.len(), 1);
        assert_eq!(instances[0].instance_id(), Some("main"));
    }

    #[test]
    fn no_matches_is_an_empty_set() {
        let source = source_with_pools(&[]);
        let engine = QueryEngine::new(source);
        let query = Query::builder("app.pools", "type=ConnectionPool")
            .counters("WaitCount")
            .build()
            .unwrap();

        assert!(engine.discover(&query).unwrap().is_empty());
    }

    #[test]
    fn tracking_key_falls_back_to_component_name() {
        let source = source_with_pools(&["main"]);
        let engine = QueryEngine::new(source);
        let query = Query::builder("app.pools", "type=ConnectionPool")
            .counters("WaitCount")
            .build()
            .unwrap();

        let instances = engine.discover(&query).unwrap();
        assert_eq!(instances[0].instance_id(), None);
        assert_eq!(instances[0].key(), pool("main").canonical());
    }
}
