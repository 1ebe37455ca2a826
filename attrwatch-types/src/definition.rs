//! Datum definitions - the resolved description of one monitored attribute.

use crate::ValueKind;

/// How a resolved datum is reported downstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DatumKind {
    /// Monotonically increasing quantity, reported as a windowed delta.
    Counter,
    /// Point-in-time quantity, reported as-is.
    Gauge,
    /// Non-numeric value, reported as its final textual form.
    Text,
    /// Derived numerator/denominator quantity.
    Ratio,
    /// Extracted for ratio arithmetic but never reported on its own.
    Void,
}

impl DatumKind {
    /// Clamp a requested output kind to what the underlying value type
    /// actually supports. A boolean cannot become a counter.
    pub fn clamp_for(self, value_kind: ValueKind) -> DatumKind {
        match self {
            DatumKind::Counter | DatumKind::Gauge if !value_kind.is_numeric() => DatumKind::Text,
            other => other,
        }
    }
}

/// Preferred display mode for counter deltas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CounterDisplay {
    /// Raw delta over the measurement window.
    #[default]
    Delta,
    /// Delta normalized to one second.
    DeltaPerSecond,
    /// Delta normalized to one minute.
    DeltaPerMinute,
}

/// The resolved definition of one monitored datum.
///
/// Definitions are produced once per discovered component by resolving a
/// query against the component's attribute catalog, then reused for every
/// snapshot taken from that component. The canonical name of a composite
/// sub-field is always the fully qualified `parent.child` form.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DatumDefinition {
    name: String,
    display_name: String,
    kind: DatumKind,
    value_kind: ValueKind,
    parent: Option<String>,
    counter_display: CounterDisplay,
    percent: bool,
    numerator: Option<String>,
    denominator: Option<String>,
}

impl DatumDefinition {
    /// A definition whose output kind is clamped to the value kind.
    pub fn new(name: impl Into<String>, kind: DatumKind, value_kind: ValueKind) -> Self {
        let name = name.into();
        Self {
            display_name: name.clone(),
            name,
            kind: kind.clamp_for(value_kind),
            value_kind,
            parent: None,
            counter_display: CounterDisplay::default(),
            percent: false,
            numerator: None,
            denominator: None,
        }
    }

    /// A ratio definition referencing two already-resolved datum names.
    pub fn ratio(
        name: impl Into<String>,
        numerator: impl Into<String>,
        denominator: impl Into<String>,
        percent: bool,
    ) -> Self {
        let name = name.into();
        Self {
            display_name: name.clone(),
            name,
            kind: DatumKind::Ratio,
            value_kind: ValueKind::Double,
            parent: None,
            counter_display: CounterDisplay::default(),
            percent,
            numerator: Some(numerator.into()),
            denominator: Some(denominator.into()),
        }
    }

    /// Override the human-facing display name.
    pub fn with_display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = display_name.into();
        self
    }

    /// Mark this definition as a composite sub-field of `parent`.
    pub fn with_parent(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    /// Set the preferred display mode for counter deltas.
    pub fn with_counter_display(mut self, display: CounterDisplay) -> Self {
        self.counter_display = display;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn kind(&self) -> DatumKind {
        self.kind
    }

    pub fn value_kind(&self) -> ValueKind {
        self.value_kind
    }

    /// Parent attribute name for composite sub-fields.
    pub fn parent(&self) -> Option<&str> {
        self.parent.as_deref()
    }

    /// Child name within the parent record, when this is a composite
    /// sub-field.
    pub fn child(&self) -> Option<&str> {
        let parent = self.parent.as_deref()?;
        self.name.strip_prefix(parent)?.strip_prefix('.')
    }

    pub fn counter_display(&self) -> CounterDisplay {
        self.counter_display
    }

    /// Whether a ratio is rendered as a percentage.
    pub fn is_percent(&self) -> bool {
        self.percent
    }

    pub fn numerator(&self) -> Option<&str> {
        self.numerator.as_deref()
    }

    pub fn denominator(&self) -> Option<&str> {
        self.denominator.as_deref()
    }
}

impl PartialEq for DatumDefinition {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.kind == other.kind
    }
}

impl Eq for DatumDefinition {}

impl std::hash::Hash for DatumDefinition {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.name.hash(state);
        self.kind.hash(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamp_keeps_numeric_counters() {
        assert_eq!(
            DatumKind::Counter.clamp_for(ValueKind::Long),
            DatumKind::Counter
        );
        assert_eq!(
            DatumKind::Gauge.clamp_for(ValueKind::Double),
            DatumKind::Gauge
        );
    }

    #[test]
    fn clamp_degrades_non_numeric_to_text() {
        assert_eq!(
            DatumKind::Counter.clamp_for(ValueKind::Bool),
            DatumKind::Text
        );
        assert_eq!(DatumKind::Gauge.clamp_for(ValueKind::Char), DatumKind::Text);
        assert_eq!(DatumKind::Gauge.clamp_for(ValueKind::Text), DatumKind::Text);
    }

    #[test]
    fn clamp_leaves_other_kinds_alone() {
        assert_eq!(DatumKind::Text.clamp_for(ValueKind::Long), DatumKind::Text);
        assert_eq!(DatumKind::Void.clamp_for(ValueKind::Text), DatumKind::Void);
    }

    #[test]
    fn new_clamps_on_construction() {
        let def = DatumDefinition::new("Running", DatumKind::Counter, ValueKind::Bool);
        assert_eq!(def.kind(), DatumKind::Text);
    }

    #[test]
    fn display_name_defaults_to_name() {
        let def = DatumDefinition::new("WaitCount", DatumKind::Counter, ValueKind::Long);
        assert_eq!(def.display_name(), "WaitCount");

        let def = def.with_display_name("Waits");
        assert_eq!(def.display_name(), "Waits");
        assert_eq!(def.name(), "WaitCount");
    }

    #[test]
    fn child_derived_from_parent_prefix() {
        let def = DatumDefinition::new("Usage.used", DatumKind::Gauge, ValueKind::Long)
            .with_parent("Usage");
        assert_eq!(def.parent(), Some("Usage"));
        assert_eq!(def.child(), Some("used"));
    }

    #[test]
    fn child_names_may_contain_dots() {
        let def = DatumDefinition::new("Usage.used.bytes", DatumKind::Gauge, ValueKind::Long)
            .with_parent("Usage");
        assert_eq!(def.child(), Some("used.bytes"));
    }

    #[test]
    fn equality_is_name_and_kind() {
        let a = DatumDefinition::new("X", DatumKind::Gauge, ValueKind::Long);
        let b = DatumDefinition::new("X", DatumKind::Gauge, ValueKind::Int);
        let c = DatumDefinition::new("X", DatumKind::Counter, ValueKind::Long);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn ratio_carries_component_names() {
        let def = DatumDefinition::ratio("hitRatio", "Hits", "Total", true);
        assert_eq!(def.kind(), DatumKind::Ratio);
        assert_eq!(def.numerator(), Some("Hits"));
        assert_eq!(def.denominator(), Some("Total"));
        assert!(def.is_percent());
        assert_eq!(def.value_kind(), ValueKind::Double);
    }
}
