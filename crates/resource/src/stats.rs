//! Point-in-time registry statistics

use std::collections::BTreeMap;

use serde::Serialize;

use crate::state::ResourceState;

/// Snapshot of what the registry holds.
///
/// Derived on demand and never persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ResourceStatistics {
    /// Number of live resources
    pub total: usize,
    /// Live resources per type tag
    pub by_type: BTreeMap<String, usize>,
    /// Live resources per state
    pub by_state: BTreeMap<ResourceState, usize>,
}

impl ResourceStatistics {
    pub(crate) fn record(&mut self, type_tag: &str, state: ResourceState) {
        self.total += 1;
        *self.by_type.entry(type_tag.to_string()).or_default() += 1;
        *self.by_state.entry(state).or_default() += 1;
    }

    /// Count for `type_tag`; zero when absent
    pub fn count_for(&self, type_tag: &str) -> usize {
        self.by_type.get(type_tag).copied().unwrap_or(0)
    }

    /// Count for `state`; zero when absent
    pub fn count_in(&self, state: ResourceState) -> usize {
        self.by_state.get(&state).copied().unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_tags_count_zero() {
        let mut stats = ResourceStatistics::default();
        stats.record("chrome", ResourceState::Valid);
        stats.record("chrome", ResourceState::Stale);
        stats.record("db", ResourceState::Valid);

        assert_eq!(stats.total, 3);
        assert_eq!(stats.count_for("chrome"), 2);
        assert_eq!(stats.count_for("firefox"), 0);
        assert_eq!(stats.count_in(ResourceState::Valid), 2);
        assert_eq!(stats.count_in(ResourceState::Invalid), 0);
    }

    #[test]
    fn serializes_for_reporting() {
        let mut stats = ResourceStatistics::default();
        stats.record("db", ResourceState::Valid);
        let json = serde_json::to_value(&stats).unwrap();
        assert_eq!(json["by_state"]["valid"], 1);
        assert_eq!(json["by_type"]["db"], 1);
    }
}
