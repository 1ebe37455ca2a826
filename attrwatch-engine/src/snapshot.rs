//! Snapshot data - the per-instance measurement window.
//!
//! A snapshot moves through `empty -> initialized -> finalized`:
//! [`SnapshotData::init`] extracts the initial datum map at window start,
//! [`SnapshotData::take_snapshot`] the final map at window end, and only a
//! finalized snapshot derives observations. Each snapshot has a single
//! owner (the interval timer driving its instance) and is discarded after
//! its observations are read.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use attrwatch_types::{
    AttrValue, Datum, DatumDefinition, DatumKind, DeltaRecord, ObservationSet, ObservedValue,
};
use tracing::warn;

use crate::error::SourceError;
use crate::source::{ComponentHandle, ComponentSource};

#[derive(Debug)]
pub struct SnapshotData {
    definitions: Arc<[DatumDefinition]>,
    start_ms: Option<u64>,
    end_ms: Option<u64>,
    initial: BTreeMap<String, Datum>,
    final_values: BTreeMap<String, Datum>,
}

impl SnapshotData {
    pub fn new(definitions: Arc<[DatumDefinition]>) -> Self {
        Self {
            definitions,
            start_ms: None,
            end_ms: None,
            initial: BTreeMap::new(),
            final_values: BTreeMap::new(),
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.start_ms.is_some()
    }

    pub fn is_finalized(&self) -> bool {
        self.end_ms.is_some()
    }

    /// Window length in milliseconds; zero until finalized.
    pub fn duration_millis(&self) -> u64 {
        match (self.start_ms, self.end_ms) {
            (Some(start), Some(end)) => end.saturating_sub(start),
            _ => 0,
        }
    }

    /// Populate the initial datum map at window start.
    pub fn init(&mut self, source: &dyn ComponentSource, handle: &ComponentHandle, at_ms: u64) {
        self.start_ms = Some(at_ms);
        self.initial = extract_all(&self.definitions, source, handle);
    }

    /// `init` stamped with the current wall clock.
    pub fn init_now(&mut self, source: &dyn ComponentSource, handle: &ComponentHandle) {
        self.init(source, handle, epoch_millis());
    }

    /// Populate the final datum map and close the window. A snapshot that
    /// was never initialized stays empty.
    pub fn take_snapshot(
        &mut self,
        source: &dyn ComponentSource,
        handle: &ComponentHandle,
        at_ms: u64,
    ) {
        if self.start_ms.is_none() {
            warn!("take_snapshot before init, ignoring");
            return;
        }
        self.end_ms = Some(at_ms);
        self.final_values = extract_all(&self.definitions, source, handle);
    }

    /// `take_snapshot` stamped with the current wall clock.
    pub fn take_snapshot_now(&mut self, source: &dyn ComponentSource, handle: &ComponentHandle) {
        self.take_snapshot(source, handle, epoch_millis());
    }

    /// Derive the observation set for this window.
    ///
    /// Only valid once finalized; returns `None` before that. Data missing
    /// from either endpoint drop only their own observation.
    pub fn observations(&self, instance_id: Option<&str>) -> Option<ObservationSet> {
        let start = self.start_ms?;
        let end = self.end_ms?;

        let mut builder = ObservationSet::builder().window(start, end);
        if let Some(id) = instance_id {
            builder = builder.instance_id(id);
        }

        for def in self.definitions.iter() {
            let value = match def.kind() {
                DatumKind::Void => continue,
                DatumKind::Text => match self.final_values.get(def.name()) {
                    Some(datum) => ObservedValue::Text(datum.value.to_string()),
                    None => continue,
                },
                DatumKind::Gauge => match self.final_values.get(def.name()) {
                    Some(datum) => ObservedValue::Gauge(datum.value.clone()),
                    None => continue,
                },
                DatumKind::Counter => {
                    let initial = self.numeric(&self.initial, def.name());
                    let final_value = self.numeric(&self.final_values, def.name());
                    match (initial, final_value) {
                        (Some(initial), Some(final_value)) => {
                            ObservedValue::Counter(DeltaRecord::new(
                                initial,
                                final_value,
                                Duration::from_millis(end.saturating_sub(start)),
                            ))
                        }
                        _ => continue,
                    }
                }
                DatumKind::Ratio => {
                    let numerator = def
                        .numerator()
                        .and_then(|name| self.numeric(&self.final_values, name));
                    let denominator = def
                        .denominator()
                        .and_then(|name| self.numeric(&self.final_values, name));
                    match (numerator, denominator) {
                        (Some(numerator), Some(denominator)) => ObservedValue::Ratio {
                            // Division by zero degrades to a zero ratio.
                            value: if denominator == 0.0 {
                                0.0
                            } else {
                                numerator / denominator
                            },
                            percent: def.is_percent(),
                        },
                        _ => continue,
                    }
                }
            };
            builder = builder.observe(def.name(), def.display_name(), value);
        }

        Some(builder.build())
    }

    fn numeric(&self, map: &BTreeMap<String, Datum>, name: &str) -> Option<f64> {
        map.get(name).and_then(|datum| datum.value.as_f64())
    }
}

fn extract_all(
    definitions: &[DatumDefinition],
    source: &dyn ComponentSource,
    handle: &ComponentHandle,
) -> BTreeMap<String, Datum> {
    let mut data = BTreeMap::new();
    for def in definitions {
        if def.kind() == DatumKind::Ratio {
            continue; // derived, nothing to extract
        }
        match fetch_value(source, handle, def) {
            Ok(value) => {
                data.insert(def.name().to_string(), Datum::new(def.clone(), value));
            }
            Err(err) => warn!(
                %err,
                datum = def.name(),
                component = handle.name().canonical(),
                "dropping datum from snapshot"
            ),
        }
    }
    data
}

/// Fetch one definition's value, descending into the parent record for
/// composite sub-fields.
fn fetch_value(
    source: &dyn ComponentSource,
    handle: &ComponentHandle,
    def: &DatumDefinition,
) -> Result<AttrValue, SourceError> {
    match (def.parent(), def.child()) {
        (Some(parent), Some(child)) => {
            let value = source.get_attribute(handle, parent)?;
            match &value {
                AttrValue::Composite(_) => value
                    .field(child)
                    .cloned()
                    .ok_or_else(|| SourceError::NoSuchAttribute(def.name().to_string())),
                _ => Err(SourceError::Shape(parent.to_string())),
            }
        }
        _ => source.get_attribute(handle, def.name()),
    }
}

fn epoch_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
