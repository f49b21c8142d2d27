use std::collections::BTreeSet;

use itertools::Itertools;
use model::{
    shape::{CoverageShape, PriorityLevel},
    source::SourcedShape,
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use utility::serde::comma_separated;

/// Priority and service type selection of the map view.
///
/// An empty selection excludes nothing. Service types are stored lowercase
/// and matched case-insensitively.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShapeFilter {
    priorities: BTreeSet<PriorityLevel>,
    service_types: BTreeSet<String>,
}

impl ShapeFilter {
    pub fn new<P, S, T>(priorities: P, service_types: S) -> Self
    where
        P: IntoIterator<Item = PriorityLevel>,
        S: IntoIterator<Item = T>,
        T: AsRef<str>,
    {
        Self {
            priorities: priorities.into_iter().collect(),
            service_types: service_types
                .into_iter()
                .map(|service_type| service_type.as_ref().trim().to_lowercase())
                .filter(|service_type| !service_type.is_empty())
                .collect(),
        }
    }

    pub fn priorities(&self) -> &BTreeSet<PriorityLevel> {
        &self.priorities
    }

    pub fn service_types(&self) -> &BTreeSet<String> {
        &self.service_types
    }

    pub fn is_empty(&self) -> bool {
        self.priorities.is_empty() && self.service_types.is_empty()
    }

    pub fn toggle_priority(&mut self, level: PriorityLevel) {
        if !self.priorities.remove(&level) {
            self.priorities.insert(level);
        }
    }

    pub fn toggle_service_type(&mut self, service_type: &str) {
        let service_type = service_type.trim().to_lowercase();
        if !self.service_types.remove(&service_type) {
            self.service_types.insert(service_type);
        }
    }

    pub fn clear(&mut self) {
        self.priorities.clear();
        self.service_types.clear();
    }

    /// Shapes without a priority level are never excluded by the priority
    /// selection.
    pub fn matches(&self, shape: &CoverageShape) -> bool {
        let priority_passes = match shape.priority_level {
            Some(level) => self.priorities.is_empty() || self.priorities.contains(&level),
            None => true,
        };
        priority_passes
            && self
                .service_types
                .iter()
                .all(|service_type| shape.has_service_type(service_type))
    }

    pub fn apply(&self, shapes: &[SourcedShape]) -> Vec<SourcedShape> {
        shapes
            .iter()
            .filter(|sourced| self.matches(&sourced.shape))
            .cloned()
            .collect()
    }

    /// Parses a url query string such as `priority=1,2&services=hvac`.
    /// Unknown parameters and malformed entries are ignored.
    pub fn from_query(query: &str) -> Self {
        let params = serde_urlencoded::from_str::<FilterQuery>(query.trim_start_matches('?'))
            .unwrap_or_else(|why| {
                log::warn!("ignoring malformed filter query '{}': {}", query, why);
                FilterQuery::default()
            });
        Self::from(params)
    }

    /// The url encoded query string reproducing this filter, empty if
    /// nothing is selected.
    pub fn to_query(&self) -> String {
        serde_urlencoded::to_string(FilterQuery::from(self)).unwrap_or_else(|why| {
            log::warn!("failed to encode filter {:?}: {}", self, why);
            String::new()
        })
    }
}

/// Filter as it travels in url query parameters.
#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct FilterQuery {
    /// Comma separated priority levels, e.g. `1,2`.
    pub priority: Option<String>,
    /// Comma separated service types, e.g. `hvac,electrical`.
    pub services: Option<String>,
}

impl From<FilterQuery> for ShapeFilter {
    fn from(query: FilterQuery) -> Self {
        let priorities = query
            .priority
            .as_deref()
            .map(comma_separated::split::<PriorityLevel>)
            .unwrap_or_default();
        let service_types = query
            .services
            .as_deref()
            .map(comma_separated::split::<String>)
            .unwrap_or_default();
        ShapeFilter::new(priorities, service_types)
    }
}

impl From<&ShapeFilter> for FilterQuery {
    fn from(filter: &ShapeFilter) -> Self {
        let priority = filter.priorities.iter().map(PriorityLevel::level).join(",");
        let services = filter.service_types.iter().join(",");
        FilterQuery {
            priority: Some(priority).filter(|value| !value.is_empty()),
            services: Some(services).filter(|value| !value.is_empty()),
        }
    }
}
