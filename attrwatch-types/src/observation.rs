//! Observations - the windowed measurements derived from extracted data.

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use crate::{AttrValue, DatumDefinition, SchemaVersion};

/// One extracted value at one point in time, tagged with its definition.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Datum {
    pub definition: DatumDefinition,
    pub value: AttrValue,
}

impl Datum {
    pub fn new(definition: DatumDefinition, value: AttrValue) -> Self {
        Self { definition, value }
    }
}

/// A counter delta across one measurement window.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DeltaRecord {
    pub initial: f64,
    pub final_value: f64,
    pub duration_millis: u64,
}

impl DeltaRecord {
    pub fn new(initial: f64, final_value: f64, duration: Duration) -> Self {
        Self {
            initial,
            final_value,
            duration_millis: duration.as_millis() as u64,
        }
    }

    /// Raw delta over the window.
    pub fn delta(&self) -> f64 {
        self.final_value - self.initial
    }

    /// Delta normalized to one second. Zero-length windows yield 0.0.
    pub fn per_second(&self) -> f64 {
        if self.duration_millis == 0 {
            return 0.0;
        }
        self.delta() * 1000.0 / self.duration_millis as f64
    }

    /// Delta normalized to one minute. Zero-length windows yield 0.0.
    pub fn per_minute(&self) -> f64 {
        self.per_second() * 60.0
    }
}

/// The reported value of one observation.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ObservedValue {
    /// Final value rendered verbatim.
    Text(String),
    /// Point-in-time value, no use of the initial extraction.
    Gauge(AttrValue),
    /// Windowed counter delta.
    Counter(DeltaRecord),
    /// numerator / denominator at the final timestamp.
    Ratio { value: f64, percent: bool },
}

impl fmt::Display for ObservedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ObservedValue::Text(s) => write!(f, "{s}"),
            ObservedValue::Gauge(v) => write!(f, "{v}"),
            ObservedValue::Counter(d) => {
                write!(
                    f,
                    "{} ({} -> {} over {}ms)",
                    d.delta(),
                    d.initial,
                    d.final_value,
                    d.duration_millis
                )
            }
            ObservedValue::Ratio { value, percent } => {
                if *percent {
                    write!(f, "{:.3}%", value * 100.0)
                } else {
                    write!(f, "{value:.3}")
                }
            }
        }
    }
}

/// One named observation within a set.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Observation {
    /// Canonical datum name.
    pub name: String,
    /// Human-facing display name.
    pub display_name: String,
    pub value: ObservedValue,
}

/// The structured observation set produced for one instance per interval.
///
/// Keyed by canonical datum name. Consumed by downstream reporting and
/// renderable as a fixed-width table for logs.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ObservationSet {
    /// Schema version for forward compatibility.
    pub version: SchemaVersion,
    /// Identifier of the instance these observations came from, if the
    /// originating query declared an instance key.
    pub instance_id: Option<String>,
    /// Window start, milliseconds since the Unix epoch.
    pub start_ms: u64,
    /// Window end, milliseconds since the Unix epoch.
    pub end_ms: u64,
    pub observations: BTreeMap<String, Observation>,
}

impl ObservationSet {
    pub fn builder() -> ObservationSetBuilder {
        ObservationSetBuilder::new()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn get(&self, name: &str) -> Option<&Observation> {
        self.observations.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Observation)> {
        self.observations.iter()
    }

    /// Window length in milliseconds.
    pub fn duration_millis(&self) -> u64 {
        self.end_ms.saturating_sub(self.start_ms)
    }
}

/// Builder for [`ObservationSet`].
#[derive(Debug, Default)]
pub struct ObservationSetBuilder {
    instance_id: Option<String>,
    start_ms: u64,
    end_ms: u64,
    observations: BTreeMap<String, Observation>,
}

impl ObservationSetBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn instance_id(mut self, id: impl Into<String>) -> Self {
        self.instance_id = Some(id.into());
        self
    }

    pub fn window(mut self, start_ms: u64, end_ms: u64) -> Self {
        self.start_ms = start_ms;
        self.end_ms = end_ms;
        self
    }

    pub fn observe(
        mut self,
        name: impl Into<String>,
        display_name: impl Into<String>,
        value: ObservedValue,
    ) -> Self {
        let name = name.into();
        self.observations.insert(
            name.clone(),
            Observation {
                name,
                display_name: display_name.into(),
                value,
            },
        );
        self
    }

    pub fn build(self) -> ObservationSet {
        ObservationSet {
            version: SchemaVersion::current(),
            instance_id: self.instance_id,
            start_ms: self.start_ms,
            end_ms: self.end_ms,
            observations: self.observations,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delta_record_reports_window() {
        let d = DeltaRecord::new(500.0, 750.0, Duration::from_millis(1000));
        assert_eq!(d.initial, 500.0);
        assert_eq!(d.final_value, 750.0);
        assert_eq!(d.duration_millis, 1000);
        assert_eq!(d.delta(), 250.0);
    }

    #[test]
    fn delta_normalization() {
        let d = DeltaRecord::new(0.0, 300.0, Duration::from_secs(30));
        assert_eq!(d.per_second(), 10.0);
        assert_eq!(d.per_minute(), 600.0);
    }

    #[test]
    fn zero_duration_rate_is_zero() {
        let d = DeltaRecord::new(10.0, 20.0, Duration::ZERO);
        assert_eq!(d.per_second(), 0.0);
        assert_eq!(d.per_minute(), 0.0);
    }

    #[test]
    fn percent_ratio_renders_three_decimals() {
        let v = ObservedValue::Ratio {
            value: 75.0 / 101.0,
            percent: true,
        };
        assert_eq!(v.to_string(), "74.257%");
    }

    #[test]
    fn plain_ratio_renders_three_decimals() {
        let v = ObservedValue::Ratio {
            value: 0.5,
            percent: false,
        };
        assert_eq!(v.to_string(), "0.500");
    }

    #[test]
    fn builder_keys_by_canonical_name() {
        let set = ObservationSet::builder()
            .instance_id("pool-1")
            .window(1000, 2000)
            .observe("WaitCount", "Waits", ObservedValue::Text("3".into()))
            .observe(
                "Usage.used",
                "Usage.used",
                ObservedValue::Gauge(AttrValue::Long(1024)),
            )
            .build();

        assert_eq!(set.len(), 2);
        assert_eq!(set.duration_millis(), 1000);
        assert_eq!(set.get("WaitCount").unwrap().display_name, "Waits");
        assert!(set.get("Usage.used").is_some());
        assert!(set.version.is_compatible());
    }

    #[test]
    fn empty_set() {
        let set = ObservationSet::builder().build();
        assert!(set.is_empty());
        assert_eq!(set.len(), 0);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn serde_roundtrip() {
        let set = ObservationSet::builder()
            .window(1000, 2000)
            .observe(
                "Count",
                "Count",
                ObservedValue::Counter(DeltaRecord::new(1.0, 2.0, Duration::from_secs(1))),
            )
            .build();

        let json = serde_json::to_string(&set).unwrap();
        let parsed: ObservationSet = serde_json::from_str(&json).unwrap();
        assert_eq!(set, parsed);
    }
}
