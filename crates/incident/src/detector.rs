//! Seen-state tracking for incident updates.
use std::collections::HashSet;

use crate::model::{Incident, IncidentUpdate};

/// Identity of an update within a feed.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UpdateKey {
    /// Parent incident ID
    pub incident_id: String,
    /// Update ID
    pub update_id: String,
}

impl From<&IncidentUpdate> for UpdateKey {
    fn from(update: &IncidentUpdate) -> Self {
        Self { incident_id: update.incident_id.clone(), update_id: update.update_id.clone() }
    }
}

/// An update not seen before, borrowed from the snapshot it came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NewUpdate<'a> {
    /// The incident carrying the update
    pub incident: &'a Incident,
    /// The update itself
    pub update: &'a IncidentUpdate,
}

/// Remembers which updates of one feed were already reported.
///
/// Novelty is decided purely on `(incident_id, update_id)`; timestamps are never compared.
/// The set only grows and lives as long as the process.
#[derive(Debug, Default)]
pub struct ChangeDetector {
    seen: HashSet<UpdateKey>,
}

impl ChangeDetector {
    /// Create a detector with empty seen-state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the updates of `incidents` not seen before, in feed order, and mark them seen.
    pub fn diff<'a>(&mut self, incidents: &'a [Incident]) -> Vec<NewUpdate<'a>> {
        incidents
            .iter()
            .flat_map(|incident| incident.updates.iter().map(move |update| (incident, update)))
            .filter(|(_, update)| self.seen.insert(UpdateKey::from(*update)))
            .map(|(incident, update)| NewUpdate { incident, update })
            .collect()
    }

    /// Number of updates seen so far.
    pub fn seen_count(&self) -> usize {
        self.seen.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::UpdateStatus;
    use chrono::Utc;

    fn update(incident: &str, id: &str, status: UpdateStatus) -> IncidentUpdate {
        IncidentUpdate {
            incident_id: incident.to_owned(),
            update_id: id.to_owned(),
            status,
            impact: "minor".to_owned(),
            body: None,
            observed_at: Utc::now(),
        }
    }

    fn incident(id: &str, updates: Vec<IncidentUpdate>) -> Incident {
        Incident {
            incident_id: id.to_owned(),
            name: format!("incident {id}"),
            impact: "minor".to_owned(),
            affected_product: "API".to_owned(),
            updates,
        }
    }

    fn ids(new: &[NewUpdate<'_>]) -> Vec<(String, String)> {
        new.iter()
            .map(|n| (n.incident.incident_id.clone(), n.update.update_id.clone()))
            .collect()
    }

    #[test]
    fn second_identical_snapshot_is_empty() {
        let snapshot = vec![
            incident("I1", vec![update("I1", "U1", UpdateStatus::Investigating)]),
            incident("I2", vec![update("I2", "U1", UpdateStatus::Identified)]),
        ];
        let mut detector = ChangeDetector::new();

        assert_eq!(detector.diff(&snapshot).len(), 2);
        assert!(detector.diff(&snapshot).is_empty());
        assert_eq!(detector.seen_count(), 2);
    }

    #[test]
    fn reports_only_the_new_update_of_an_incident() {
        let mut detector = ChangeDetector::new();

        let first = vec![incident("I1", vec![update("I1", "U1", UpdateStatus::Investigating)])];
        let new = detector.diff(&first);
        assert_eq!(ids(&new), [("I1".to_owned(), "U1".to_owned())]);

        let second = vec![incident(
            "I1",
            vec![
                update("I1", "U2", UpdateStatus::Resolved),
                update("I1", "U1", UpdateStatus::Investigating),
            ],
        )];
        let new = detector.diff(&second);
        assert_eq!(ids(&new), [("I1".to_owned(), "U2".to_owned())]);
        assert_eq!(new[0].update.status, UpdateStatus::Resolved);

        assert!(detector.diff(&second).is_empty());
    }

    #[test]
    fn keeps_feed_order_and_scopes_ids_by_incident() {
        let snapshot = vec![
            incident(
                "I2",
                vec![update("I2", "A", UpdateStatus::Monitoring), update("I2", "B", UpdateStatus::Identified)],
            ),
            incident("I1", vec![update("I1", "A", UpdateStatus::Investigating)]),
        ];
        let mut detector = ChangeDetector::new();

        let new = detector.diff(&snapshot);
        assert_eq!(
            ids(&new),
            [
                ("I2".to_owned(), "A".to_owned()),
                ("I2".to_owned(), "B".to_owned()),
                ("I1".to_owned(), "A".to_owned()),
            ]
        );
    }

    #[test]
    fn duplicate_entries_within_a_snapshot_are_reported_once() {
        let snapshot = vec![incident(
            "I1",
            vec![update("I1", "U1", UpdateStatus::Investigating), update("I1", "U1", UpdateStatus::Investigating)],
        )];
        let mut detector = ChangeDetector::new();

        assert_eq!(detector.diff(&snapshot).len(), 1);
    }

    #[test]
    fn seen_state_never_shrinks() {
        let mut detector = ChangeDetector::new();
        let mut last = 0;

        for snapshot in [
            vec![incident("I1", vec![update("I1", "U1", UpdateStatus::Investigating)])],
            vec![],
            vec![incident("I2", vec![update("I2", "U1", UpdateStatus::Investigating)])],
            vec![incident("I1", vec![update("I1", "U1", UpdateStatus::Investigating)])],
        ] {
            detector.diff(&snapshot);
            assert!(detector.seen_count() >= last);
            last = detector.seen_count();
        }

        assert_eq!(last, 2);
        let replay = [incident("I1", vec![update("I1", "U1", UpdateStatus::Investigating)])];
        assert!(detector.diff(&replay).is_empty());
    }
}
