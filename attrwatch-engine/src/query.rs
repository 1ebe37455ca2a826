//! Queries - the immutable, hashable description of what to monitor.
//!
//! A query names a class of managed components (domain + name pattern),
//! declares which attributes to watch as counters and gauges, defines
//! derived ratios, and optionally filters matched instances. Queries are
//! deduplicated across configuration reloads through a stable signature
//! computed from a canonical string form of their content.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::time::Duration;

use regex::Regex;
use tracing::warn;

use crate::error::ConfigError;
use crate::source::ComponentName;

/// Default sampling interval when the configuration names none.
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(60);

/// One requested attribute, parsed from its raw declarative form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeSpec {
    name: String,
    display_name: Option<String>,
    composite: bool,
}

impl AttributeSpec {
    /// Parse a raw spec, honoring an optional `(displayName="...")`
    /// suffix. A malformed suffix is kept as part of the literal name and
    /// logged.
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        let (name, display_name) = match raw.split_once('(') {
            Some((prefix, suffix)) => match parse_display_suffix(suffix) {
                Some(display) => (prefix.trim(), Some(display)),
                None => {
                    warn!(spec = raw, "unrecognized attribute suffix, taken literally");
                    (raw, None)
                }
            },
            None => (raw, None),
        };
        Self {
            name: name.to_string(),
            composite: name.contains('.'),
            display_name,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn display_name(&self) -> Option<&str> {
        self.display_name.as_deref()
    }

    /// Whether the requested name is dotted, i.e. targets a sub-field of
    /// a composite attribute.
    pub fn is_composite(&self) -> bool {
        self.composite
    }

    fn canonical(&self) -> String {
        match &self.display_name {
            Some(display) => format!("{}(displayName=\"{}\")", self.name, display),
            None => self.name.clone(),
        }
    }
}

fn parse_display_suffix(suffix: &str) -> Option<String> {
    let inner = suffix
        .strip_prefix("displayName=\"")?
        .strip_suffix("\")")?;
    if inner.contains('"') {
        return None;
    }
    Some(inner.to_string())
}

/// A declared ratio: `name=numerator/denominator`, optionally suffixed
/// `(formatAsPercent=true)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RatioSpec {
    name: String,
    numerator: String,
    denominator: String,
    percent: bool,
}

impl RatioSpec {
    pub fn parse(raw: &str) -> Result<Self, ConfigError> {
        let raw = raw.trim();
        let (body, percent) = match raw.split_once('(') {
            Some((body, suffix)) => (body.trim(), parse_percent_suffix(raw, suffix)?),
            None => (raw, false),
        };
        let (name, expr) = body
            .split_once('=')
            .ok_or_else(|| ConfigError::Ratio(raw.to_string()))?;
        let (numerator, denominator) = expr
            .split_once('/')
            .ok_or_else(|| ConfigError::Ratio(raw.to_string()))?;

        let name = name.trim();
        let numerator = numerator.trim();
        let denominator = denominator.trim();
        if name.is_empty() || numerator.is_empty() || denominator.is_empty() {
            return Err(ConfigError::Ratio(raw.to_string()));
        }

        Ok(Self {
            name: name.to_string(),
            numerator: numerator.to_string(),
            denominator: denominator.to_string(),
            percent,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn numerator(&self) -> &str {
        &self.numerator
    }

    pub fn denominator(&self) -> &str {
        &self.denominator
    }

    pub fn is_percent(&self) -> bool {
        self.percent
    }

    fn canonical(&self) -> String {
        format!(
            "{}={}/{}@{}",
            self.name, self.numerator, self.denominator, self.percent
        )
    }
}

fn parse_percent_suffix(raw: &str, suffix: &str) -> Result<bool, ConfigError> {
    suffix
        .strip_prefix("formatAsPercent=")
        .and_then(|rest| rest.strip_suffix(')'))
        .and_then(|flag| flag.trim().parse::<bool>().ok())
        .ok_or_else(|| ConfigError::Ratio(raw.to_string()))
}

/// An immutable monitoring query.
///
/// Equality and hashing delegate to the signature, so logically identical
/// queries (set semantics, order-irrelevant) collapse to one across
/// configuration reloads.
#[derive(Debug, Clone)]
pub struct Query {
    domain: String,
    pattern_raw: String,
    base_pattern: ComponentName,
    instance_key: Option<String>,
    display_name: String,
    counters: Vec<AttributeSpec>,
    gauges: Vec<AttributeSpec>,
    ratios: Vec<RatioSpec>,
    instance_filter: Option<Regex>,
    attribute_filter: Option<(String, Regex)>,
    interval: Duration,
    signature: u64,
}

impl Query {
    pub fn builder(domain: impl Into<String>, pattern: impl Into<String>) -> QueryBuilder {
        QueryBuilder::new(domain, pattern)
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    /// Raw name-pattern text this query was declared with.
    pub fn pattern(&self) -> &str {
        &self.pattern_raw
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn instance_key(&self) -> Option<&str> {
        self.instance_key.as_deref()
    }

    pub fn counters(&self) -> &[AttributeSpec] {
        &self.counters
    }

    pub fn gauges(&self) -> &[AttributeSpec] {
        &self.gauges
    }

    pub fn ratios(&self) -> &[RatioSpec] {
        &self.ratios
    }

    pub fn instance_filter(&self) -> Option<&Regex> {
        self.instance_filter.as_ref()
    }

    pub fn attribute_filter(&self) -> Option<(&str, &Regex)> {
        self.attribute_filter.as_ref().map(|(n, r)| (n.as_str(), r))
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Stable content hash used for equality and reload deduplication.
    pub fn signature(&self) -> u64 {
        self.signature
    }

    /// The discovery pattern: the base name pattern, widened with a
    /// wildcard instance-key clause when an instance key is configured.
    pub fn component_pattern(&self) -> ComponentName {
        let mut pattern = self.base_pattern.clone();
        if let Some(key) = &self.instance_key {
            if pattern.property(key).is_none() {
                pattern = pattern.with_property(key.clone(), "*");
            }
        }
        pattern
    }
}

impl PartialEq for Query {
    fn eq(&self, other: &Self) -> bool {
        self.signature == other.signature
    }
}

impl Eq for Query {}

impl Hash for Query {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.signature.hash(state);
    }
}

/// Accumulating builder for [`Query`].
///
/// Raw comma-separated declarations are parsed into ordered unique sets
/// (first occurrence of a name wins). Malformed ratio clauses and filter
/// regexes are logged and dropped; the query stays usable. Only a numeric
/// parse error on the interval fails `build()`.
#[derive(Debug)]
pub struct QueryBuilder {
    domain: String,
    pattern_raw: String,
    instance_key: Option<String>,
    display_name: Option<String>,
    counters: Vec<AttributeSpec>,
    gauges: Vec<AttributeSpec>,
    ratios: Vec<RatioSpec>,
    instance_filter: Option<Regex>,
    attribute_filter: Option<(String, Regex)>,
    interval_raw: Option<String>,
}

impl QueryBuilder {
    pub fn new(domain: impl Into<String>, pattern: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
            pattern_raw: pattern.into(),
            instance_key: None,
            display_name: None,
            counters: Vec::new(),
            gauges: Vec::new(),
            ratios: Vec::new(),
            instance_filter: None,
            attribute_filter: None,
            interval_raw: None,
        }
    }

    pub fn display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    /// The name-property key distinguishing multiple matched components.
    pub fn instance_key(mut self, key: impl Into<String>) -> Self {
        self.instance_key = Some(key.into());
        self
    }

    /// Accumulate comma-separated counter attribute specs.
    pub fn counters(mut self, raw: &str) -> Self {
        accumulate_specs(&mut self.counters, raw);
        self
    }

    /// Accumulate comma-separated gauge attribute specs.
    pub fn gauges(mut self, raw: &str) -> Self {
        accumulate_specs(&mut self.gauges, raw);
        self
    }

    /// Accumulate comma-separated ratio definitions.
    pub fn ratios(mut self, raw: &str) -> Self {
        for clause in raw.split(',').map(str::trim).filter(|c| !c.is_empty()) {
            match RatioSpec::parse(clause) {
                Ok(spec) => {
                    if !self.ratios.iter().any(|r| r.name == spec.name) {
                        self.ratios.push(spec);
                    }
                }
                Err(err) => warn!(%err, "dropping ratio clause"),
            }
        }
        self
    }

    /// Regex filter over the extracted instance identifier.
    pub fn instance_filter(mut self, pattern: &str) -> Self {
        match Regex::new(pattern) {
            Ok(regex) => self.instance_filter = Some(regex),
            Err(err) => warn!(%err, pattern, "dropping malformed instance filter"),
        }
        self
    }

    /// `attribute=regex` filter over one attribute's rendered value.
    pub fn attribute_filter(mut self, raw: &str) -> Self {
        let parsed = raw
            .split_once('=')
            .ok_or_else(|| ConfigError::Filter(raw.to_string()))
            .and_then(|(name, pattern)| {
                Regex::new(pattern)
                    .map(|regex| (name.trim().to_string(), regex))
                    .map_err(|_| ConfigError::Filter(raw.to_string()))
            });
        match parsed {
            Ok(filter) => self.attribute_filter = Some(filter),
            Err(err) => warn!(%err, "dropping malformed attribute filter"),
        }
        self
    }

    /// Sampling interval in seconds, as declared in configuration text.
    pub fn interval_str(mut self, raw: &str) -> Self {
        self.interval_raw = Some(raw.trim().to_string());
        self
    }

    pub fn build(self) -> Result<Query, ConfigError> {
        let interval = match &self.interval_raw {
            Some(raw) => raw
                .parse::<u64>()
                .map(Duration::from_secs)
                .map_err(|_| ConfigError::Interval(raw.clone()))?,
            None => DEFAULT_INTERVAL,
        };

        let base_pattern = parse_pattern(&self.domain, &self.pattern_raw);
        let display_name = self
            .display_name
            .unwrap_or_else(|| format!("{}:{}", self.domain, self.pattern_raw));

        let signature = compute_signature(
            &self.domain,
            &self.pattern_raw,
            self.instance_key.as_deref(),
            &display_name,
            &self.counters,
            &self.gauges,
            &self.ratios,
            self.instance_filter.as_ref(),
            self.attribute_filter.as_ref(),
            interval,
        );

        Ok(Query {
            domain: self.domain,
            pattern_raw: self.pattern_raw,
            base_pattern,
            instance_key: self.instance_key,
            display_name,
            counters: self.counters,
            gauges: self.gauges,
            ratios: self.ratios,
            instance_filter: self.instance_filter,
            attribute_filter: self.attribute_filter,
            interval,
            signature,
        })
    }
}

fn accumulate_specs(specs: &mut Vec<AttributeSpec>, raw: &str) {
    for clause in raw.split(',').map(str::trim).filter(|c| !c.is_empty()) {
        let spec = AttributeSpec::parse(clause);
        if !specs.iter().any(|s| s.name == spec.name) {
            specs.push(spec);
        }
    }
}

fn parse_pattern(domain: &str, raw: &str) -> ComponentName {
    let mut pattern = ComponentName::new(domain);
    for clause in raw.split(',').map(str::trim).filter(|c| !c.is_empty()) {
        match clause.split_once('=') {
            Some((key, value)) => {
                pattern = pattern.with_property(key.trim(), value.trim());
            }
            None => warn!(clause, "dropping malformed name-pattern clause"),
        }
    }
    pattern
}

#[allow(clippy::too_many_arguments)]
fn compute_signature(
    domain: &str,
    pattern: &str,
    instance_key: Option<&str>,
    display_name: &str,
    counters: &[AttributeSpec],
    gauges: &[AttributeSpec],
    ratios: &[RatioSpec],
    instance_filter: Option<&Regex>,
    attribute_filter: Option<&(String, Regex)>,
    interval: Duration,
) -> u64 {
    let mut counters: Vec<String> = counters.iter().map(AttributeSpec::canonical).collect();
    let mut gauges: Vec<String> = gauges.iter().map(AttributeSpec::canonical).collect();
    let mut ratios: Vec<String> = ratios.iter().map(RatioSpec::canonical).collect();
    counters.sort();
    gauges.sort();
    ratios.sort();

    let canonical = format!(
        "{domain}|{pattern}|{}|{display_name}|c:{}|g:{}|r:{}|if:{}|af:{}|{}",
        instance_key.unwrap_or(""),
        counters.join(","),
        gauges.join(","),
        ratios.join(","),
        instance_filter.map(Regex::as_str).unwrap_or(""),
        attribute_filter
            .map(|(name, regex)| format!("{name}={}", regex.as_str()))
            .unwrap_or_default(),
        interval.as_secs(),
    );

    let mut hasher = DefaultHasher::new();
    canonical.hash(&mut hasher);
    hasher.finish()
}
