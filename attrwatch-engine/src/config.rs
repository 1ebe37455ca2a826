//! Declarative monitoring configuration.
//!
//! These types map the external configuration format onto query builders:
//! comma-separated counter/gauge specs, ratio definitions, filters, and an
//! interval, all as raw text. A clause that fails to parse drops that
//! clause (or, for the interval, that query) with a logged warning; a
//! configuration is never rejected wholesale.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::ConfigError;
use crate::query::Query;

/// The full declarative configuration: one entry per monitoring query.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MonitorConfig {
    #[serde(default)]
    pub queries: Vec<QueryConfig>,
}

/// One declarative query, as written in configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryConfig {
    /// Domain of the managed components to match.
    pub domain: String,

    /// Base component name pattern, `key=value` clauses separated by
    /// commas.
    pub pattern: String,

    /// Human-facing name for this query.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,

    /// Name-property key distinguishing multiple matched components.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance_key: Option<String>,

    /// Comma-separated counter attribute specs, each optionally suffixed
    /// `(displayName="...")`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub counters: Option<String>,

    /// Comma-separated gauge attribute specs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gauges: Option<String>,

    /// Comma-separated ratio definitions `name=numerator/denominator`,
    /// each optionally suffixed `(formatAsPercent=true)`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ratios: Option<String>,

    /// Regex filter over the extracted instance identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance_filter: Option<String>,

    /// `attribute=regex` filter over one attribute's rendered value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attribute_filter: Option<String>,

    /// Sampling interval in seconds, as configuration text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interval: Option<String>,
}

impl QueryConfig {
    /// Build the query this entry describes.
    ///
    /// Malformed ratio and filter clauses are dropped inside the builder;
    /// only an unparseable interval fails the whole entry.
    pub fn build(&self) -> Result<Query, ConfigError> {
        let mut builder = Query::builder(&self.domain, &self.pattern);
        if let Some(name) = &self.display_name {
            builder = builder.display_name(name);
        }
        if let Some(key) = &self.instance_key {
            builder = builder.instance_key(key);
        }
        if let Some(counters) = &self.counters {
            builder = builder.counters(counters);
        }
        if let Some(gauges) = &self.gauges {
            builder = builder.gauges(gauges);
        }
        if let Some(ratios) = &self.ratios {
            builder = builder.ratios(ratios);
        }
        if let Some(filter) = &self.instance_filter {
            builder = builder.instance_filter(filter);
        }
        if let Some(filter) = &self.attribute_filter {
            builder = builder.attribute_filter(filter);
        }
        if let Some(interval) = &self.interval {
            builder = builder.interval_str(interval);
        }
        builder.build()
    }
}

impl MonitorConfig {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Build the deduplicated query set for
    /// [`SnapshotManager::apply_config`](crate::SnapshotManager::apply_config).
    ///
    /// Entries that fail to build are dropped with a warning; entries whose
    /// signature repeats an earlier one collapse to the first occurrence.
    pub fn queries(&self) -> Vec<Query> {
        let mut queries = Vec::with_capacity(self.queries.len());
        let mut seen = HashSet::new();
        for entry in &self.queries {
            match entry.build() {
                Ok(query) => {
                    if seen.insert(query.signature()) {
                        queries.push(query);
                    }
                }
                Err(err) => warn!(
                    %err,
                    domain = %entry.domain,
                    pattern = %entry.pattern,
                    "dropping unbuildable query entry"
                ),
            }
        }
        queries
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn entry() -> QueryConfig {
        QueryConfig {
            domain: "app.pools".to_string(),
            pattern: "type=ConnectionPool".to_string(),
            display_name: Some("Connection pools".to_string()),
            instance_key: Some("name".to_string()),
            counters: Some("WaitCount,CreateCount(displayName=\"Created\")".to_string()),
            gauges: Some("ActiveCount".to_string()),
            ratios: Some("usage=Used/Max(formatAsPercent=true)".to_string()),
            instance_filter: Some("^prod-".to_string()),
            attribute_filter: None,
            interval: Some("30".to_string()),
        }
    }

    #[test]
    fn entry_builds_a_full_query() {
        let query = entry().build().unwrap();
        assert_eq!(query.domain(), "app.pools");
        assert_eq!(query.display_name(), "Connection pools");
        assert_eq!(query.instance_key(), Some("name"));
        assert_eq!(query.counters().len(), 2);
        assert_eq!(query.gauges().len(), 1);
        assert_eq!(query.ratios().len(), 1);
        assert!(query.instance_filter().is_some());
        assert_eq!(query.interval(), Duration::from_secs(30));
    }

    #[test]
    fn json_parses_with_optional_fields_absent() {
        let config = MonitorConfig::from_json(
            r#"{
                "queries": [
                    {"domain": "app.pools", "pattern": "type=ConnectionPool", "counters": "WaitCount"}
                ]
            }"#,
        )
        .unwrap();

        let queries = config.queries();
        assert_eq!(queries.len(), 1);
        assert_eq!(queries[0].interval(), crate::query::DEFAULT_INTERVAL);
    }

    #[test]
    fn reordered_spec_lists_share_a_signature() {
        let mut a = entry();
        let mut b = entry();
        a.counters = Some("WaitCount,CreateCount(displayName=\"Created\")".to_string());
        b.counters = Some("CreateCount(displayName=\"Created\"),WaitCount".to_string());

        assert_eq!(
            a.build().unwrap().signature(),
            b.build().unwrap().signature()
        );
    }

    #[test]
    fn duplicate_entries_collapse() {
        let config = MonitorConfig {
            queries: vec![entry(), entry()],
        };
        assert_eq!(config.queries().len(), 1);
    }

    #[test]
    fn bad_interval_drops_only_that_entry() {
        let mut bad = entry();
        bad.interval = Some("soon".to_string());
        let config = MonitorConfig {
            queries: vec![bad, entry()],
        };

        let queries = config.queries();
        assert_eq!(queries.len(), 1);
        assert_eq!(queries[0].interval(), Duration::from_secs(30));
    }

    #[test]
    fn malformed_ratio_clause_keeps_the_entry() {
        let mut noisy = entry();
        noisy.ratios = Some("usage=Used/Max,broken".to_string());

        let query = noisy.build().unwrap();
        assert_eq!(query.ratios().len(), 1);
        assert_eq!(query.ratios()[0].name(), "usage");
    }

    #[test]
    fn serialization_skips_absent_fields() {
        let config = MonitorConfig {
            queries: vec![QueryConfig {
                domain: "d".to_string(),
                pattern: "type=X".to_string(),
                display_name: None,
                instance_key: None,
                counters: Some("A".to_string()),
                gauges: None,
                ratios: None,
                instance_filter: None,
                attribute_filter: None,
                interval: None,
            }],
        };

        let json = serde_json::to_string(&config).unwrap();
        assert!(!json.contains("instance_key"));
        assert!(!json.contains("ratios"));

        let parsed = MonitorConfig::from_json(&json).unwrap();
        assert_eq!(parsed.queries()[0], config.queries()[0]);
    }
}
