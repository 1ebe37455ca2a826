//! A discovered component bound to the query that matched it.

use std::sync::Arc;
use std::time::Duration;

use attrwatch_types::DatumDefinition;

use crate::snapshot::SnapshotData;
use crate::source::{ComponentHandle, ComponentName};

/// One discovered managed component bound to a query.
///
/// The datum definitions are resolved exactly once at discovery and shared
/// by every snapshot taken from this instance afterwards.
#[derive(Debug, Clone)]
pub struct Instance {
    handle: ComponentHandle,
    query_signature: u64,
    display_name: String,
    definitions: Arc<[DatumDefinition]>,
    instance_id: Option<String>,
    interval: Duration,
}

impl Instance {
    pub(crate) fn new(
        handle: ComponentHandle,
        query_signature: u64,
        display_name: String,
        definitions: Vec<DatumDefinition>,
        instance_id: Option<String>,
        interval: Duration,
    ) -> Self {
        Self {
            handle,
            query_signature,
            display_name,
            definitions: definitions.into(),
            instance_id,
            interval,
        }
    }

    pub fn handle(&self) -> &ComponentHandle {
        &self.handle
    }

    pub fn component(&self) -> &ComponentName {
        self.handle.name()
    }

    /// Signature of the query this instance was discovered for.
    pub fn query_signature(&self) -> u64 {
        self.query_signature
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn definitions(&self) -> &[DatumDefinition] {
        &self.definitions
    }

    /// Identifier extracted via the query's instance key, if one was
    /// configured and present on the component name.
    pub fn instance_id(&self) -> Option<&str> {
        self.instance_id.as_deref()
    }

    /// Sampling interval the owning query asked for.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Key used for lifecycle tracking: the instance identifier when
    /// present, the canonical component name otherwise.
    pub fn key(&self) -> String {
        self.instance_id
            .clone()
            .unwrap_or_else(|| self.handle.name().canonical())
    }

    /// A fresh, empty measurement window over this instance's definitions.
    pub fn new_snapshot(&self) -> SnapshotData {
        SnapshotData::new(self.definitions.clone())
    }
}
