// src/core/aggregate.rs

use std::collections::{BTreeMap, BTreeSet};

use tracing::warn;

use crate::core::models::{CheckId, CheckResult};

/// What happened to a `record` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordOutcome {
    Recorded,
    /// The id already had a result; the first one was kept.
    Duplicate,
    /// The id was not part of the run's selection; nothing was stored.
    NotSelected,
}

/// Accumulates one result per selected check.
///
/// Keys are always a subset of the selection and each key is written once:
/// later writes for the same id are ignored.
#[derive(Debug, Clone)]
pub struct ResultAggregate {
    selected: BTreeSet<CheckId>,
    results: BTreeMap<CheckId, CheckResult>,
}

impl ResultAggregate {
    pub fn new(selected: BTreeSet<CheckId>) -> Self {
        Self { selected, results: BTreeMap::new() }
    }

    pub fn record(&mut self, id: CheckId, result: CheckResult) -> RecordOutcome {
        if !self.selected.contains(&id) {
            warn!(check = %id, "Dropping result for a check outside the selection.");
            return RecordOutcome::NotSelected;
        }
        if self.results.contains_key(&id) {
            warn!(check = %id, "Ignoring duplicate result, keeping the first one.");
            return RecordOutcome::Duplicate;
        }
        self.results.insert(id, result);
        RecordOutcome::Recorded
    }

    pub fn snapshot(&self) -> BTreeMap<CheckId, CheckResult> {
        self.results.clone()
    }

    pub fn get(&self, id: CheckId) -> Option<&CheckResult> {
        self.results.get(&id)
    }

    pub fn selected(&self) -> &BTreeSet<CheckId> {
        &self.selected
    }

    /// Selected checks that have not produced a result yet.
    pub fn pending(&self) -> Vec<CheckId> {
        self.selected.iter().filter(|id| !self.results.contains_key(id)).copied().collect()
    }

    /// True once every selected check has exactly one result.
    pub fn is_settled(&self) -> bool {
        self.results.len() == self.selected.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn aggregate(ids: &[CheckId]) -> ResultAggregate {
        ResultAggregate::new(ids.iter().copied().collect())
    }

    #[test]
    fn first_write_wins() {
        let mut agg = aggregate(&[CheckId::Headers]);
        let first = CheckResult::Success(json!({ "headers": {} }));

        assert_eq!(agg.record(CheckId::Headers, first.clone()), RecordOutcome::Recorded);
        assert_eq!(
            agg.record(CheckId::Headers, CheckResult::Failure("stale".into())),
            RecordOutcome::Duplicate
        );
        assert_eq!(agg.get(CheckId::Headers), Some(&first));
    }

    #[test]
    fn unselected_ids_never_enter_the_map() {
        let mut agg = aggregate(&[CheckId::Dns]);
        assert_eq!(
            agg.record(CheckId::Ports, CheckResult::TimedOut(None)),
            RecordOutcome::NotSelected
        );
        assert!(agg.snapshot().is_empty());
    }

    #[test]
    fn settles_when_every_selected_id_has_a_result() {
        let mut agg = aggregate(&[CheckId::Dns, CheckId::Ssl]);
        assert!(!agg.is_settled());
        assert_eq!(agg.pending(), vec![CheckId::Dns, CheckId::Ssl]);

        agg.record(CheckId::Ssl, CheckResult::TimedOut(None));
        assert!(!agg.is_settled());
        assert_eq!(agg.pending(), vec![CheckId::Dns]);

        agg.record(CheckId::Dns, CheckResult::Failure("nxdomain".into()));
        assert!(agg.is_settled());
        assert!(agg.pending().is_empty());
    }
}
