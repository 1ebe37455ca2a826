//! Instance lifecycle tracking across repeated refresh cycles.
//!
//! A lifecycle owns the instances discovered for one query and drives the
//! snapshot registry: register on first sight, deregister on teardown.
//! Whether a query tracks one instance or many is decided by its instance
//! key. Registration is monotonic - instances that stop matching are kept
//! until full teardown.

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::warn;

use crate::engine::QueryEngine;
use crate::instance::Instance;
use crate::query::Query;

/// The explicitly owned registry collaborator. A registered instance is
/// periodically sampled by the reporting layer; deregistration stops the
/// sampling. Both calls are driven explicitly by the lifecycle, never by
/// drop glue.
pub trait SnapshotRegistry: Send + Sync {
    fn register(&self, instance: &Instance);
    fn deregister(&self, instance: &Instance);
}

#[derive(Debug)]
enum Tracked {
    Single(Option<Instance>),
    Multi(BTreeMap<String, Instance>),
}

/// Tracks discovered instances for one query.
pub struct InstanceLifecycle {
    query: Query,
    engine: QueryEngine,
    registry: Arc<dyn SnapshotRegistry>,
    tracked: Mutex<Tracked>,
}

impl InstanceLifecycle {
    pub fn new(query: Query, engine: QueryEngine, registry: Arc<dyn SnapshotRegistry>) -> Self {
        let tracked = if query.instance_key().is_some() {
            Tracked::Multi(BTreeMap::new())
        } else {
            Tracked::Single(None)
        };
        Self {
            query,
            engine,
            registry,
            tracked: Mutex::new(tracked),
        }
    }

    pub fn query(&self) -> &Query {
        &self.query
    }

    /// Whether this lifecycle tracks multiple instances.
    pub fn is_multi(&self) -> bool {
        matches!(&*self.tracked.lock(), Tracked::Multi(_))
    }

    /// Currently tracked instances.
    pub fn instances(&self) -> Vec<Instance> {
        match &*self.tracked.lock() {
            Tracked::Single(slot) => slot.iter().cloned().collect(),
            Tracked::Multi(map) => map.values().cloned().collect(),
        }
    }

    /// Run one discovery cycle.
    ///
    /// Single-instance: queries only while nothing is registered; the
    /// first discovery wins and later refreshes never re-query. Multi-
    /// instance: re-queries every time and registers unseen identifiers;
    /// tracked instances are never re-registered or removed. A source
    /// failure skips this cycle and keeps all registrations.
    pub fn refresh(&self) {
        let mut tracked = self.tracked.lock();
        match &mut *tracked {
            Tracked::Single(slot) => {
                if slot.is_some() {
                    return;
                }
                match self.engine.discover(&self.query) {
                    Ok(instances) => {
                        if let Some(instance) = instances.into_iter().next() {
                            self.registry.register(&instance);
                            *slot = Some(instance);
                        }
                    }
                    Err(err) => {
                        warn!(%err, query = self.query.display_name(), "skipping refresh cycle")
                    }
                }
            }
            Tracked::Multi(map) => match self.engine.discover(&self.query) {
                Ok(instances) => {
                    for instance in instances {
                        let key = instance.key();
                        if !map.contains_key(&key) {
                            self.registry.register(&instance);
                            map.insert(key, instance);
                        }
                    }
                }
                Err(err) => {
                    warn!(%err, query = self.query.display_name(), "skipping refresh cycle")
                }
            },
        }
    }

    /// Deregister every tracked instance exactly once and forget it.
    pub fn teardown(&self) {
        let mut tracked = self.tracked.lock();
        match &mut *tracked {
            Tracked::Single(slot) => {
                if let Some(instance) = slot.take() {
                    self.registry.deregister(&instance);
                }
            }
            Tracked::Multi(map) => {
                for (_, instance) in std::mem::take(map) {
                    self.registry.deregister(&instance);
                }
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::error::SourceError;
    use crate::source::{AttributeInfo, ComponentHandle, ComponentName, ComponentSource, MapSource};
    use attrwatch_types::AttrValue;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Registry double that records register/deregister calls by key.
    #[derive(Debug, Default)]
    pub struct RecordingRegistry {
        pub registered: Mutex<Vec<String>>,
        pub deregistered: Mutex<Vec<String>>,
    }

    impl SnapshotRegistry for RecordingRegistry {
        fn register(&self, instance: &Instance) {
            self.registered.lock().push(instance.key());
        }

        fn deregister(&self, instance: &Instance) {
            self.deregistered.lock().push(instance.key());
        }
    }

    /// Source wrapper counting discovery calls.
    #[derive(Debug, Default)]
    pub struct CountingSource {
        pub inner: MapSource,
        pub finds: AtomicUsize,
    }

    impl ComponentSource for CountingSource {
        fn find_components(
            &self,
            pattern: &ComponentName,
        ) -> Result<Vec<ComponentHandle>, SourceError> {
            self.finds.fetch_add(1, Ordering::Relaxed);
            self.inner.find_components(pattern)
        }

        fn introspect(&self, handle: &ComponentHandle) -> Result<Vec<AttributeInfo>, SourceError> {
            self.inner.introspect(handle)
        }

        fn get_attribute(
            &self,
            handle: &ComponentHandle,
            name: &str,
        ) -> Result<AttrValue, SourceError> {
            self.inner.get_attribute(handle, name)
        }
    }

    /// Source that always fails discovery.
    #[derive(Debug, Default)]
    pub struct DownSource;

    impl ComponentSource for DownSource {
        fn find_components(
            &self,
            _pattern: &ComponentName,
        ) -> Result<Vec<ComponentHandle>, SourceError> {
            Err(SourceError::Unavailable("connection refused".into()))
        }

        fn introspect(&self, _handle: &ComponentHandle) -> Result<Vec<AttributeInfo>, SourceError> {
            Err(SourceError::Unavailable("connection refused".into()))
        }

        fn get_attribute(
            &self,
            _handle: &ComponentHandle,
            _name: &str,
        ) -> Result<AttrValue, SourceError> {
            Err(SourceError::Unavailable("connection refused".into()))
        }
    }

    pub fn pool(name: &str) -> ComponentName {
        ComponentName::new("app.pools")
            .with_property("type", "ConnectionPool")
            .with_property("name", name)
    }

    pub fn register_pool(source: &MapSource, name: &str) {
        source.register(pool(name), [("WaitCount", AttrValue::Long(1))]);
    }
}
