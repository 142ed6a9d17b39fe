//! Ordered, validated event list.

use reprise_core::{Event, Timestamp};
use tracing::debug;

use crate::error::{ReplayError, Result};

/// Events in replay order with full snapshot positions indexed.
#[derive(Debug, Clone)]
pub struct Timeline {
    events: Vec<Event>,
    /// Indices of full snapshot events, ascending.
    snapshots: Vec<usize>,
}

impl Timeline {
    /// Sort (stably, ties keep recorded order), normalize and validate events.
    pub fn new(mut events: Vec<Event>) -> Result<Self> {
        if events.is_empty() {
            return Err(ReplayError::EmptyTimeline);
        }

        events.sort_by_key(|e| e.timestamp);
        for event in &mut events {
            event.normalize_legacy_open_mode();
        }

        let snapshots: Vec<usize> = events
            .iter()
            .enumerate()
            .filter(|(_, e)| e.is_full_snapshot())
            .map(|(i, _)| i)
            .collect();

        let Some(&first_snapshot) = snapshots.first() else {
            return Err(ReplayError::NoFullSnapshot);
        };
        if let Some(orphan) = events[..first_snapshot].iter().find(|e| e.is_incremental()) {
            return Err(ReplayError::MissingBaseSnapshot {
                at: orphan.timestamp.as_millis(),
            });
        }

        debug!(
            events = events.len(),
            snapshots = snapshots.len(),
            "built replay timeline"
        );
        Ok(Self { events, snapshots })
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn get(&self, index: usize) -> Option<&Event> {
        self.events.get(index)
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn snapshot_count(&self) -> usize {
        self.snapshots.len()
    }

    /// Timestamp of the first event.
    pub fn start(&self) -> Timestamp {
        self.events.first().map(|e| e.timestamp).unwrap_or_default()
    }

    /// Timestamp of the last event.
    pub fn end(&self) -> Timestamp {
        self.events.last().map(|e| e.timestamp).unwrap_or_default()
    }

    /// Timestamp of the first full snapshot.
    pub fn first_snapshot_time(&self) -> Option<Timestamp> {
        self.snapshots.first().map(|&i| self.events[i].timestamp)
    }

    /// Number of events with `timestamp <= t`.
    pub fn end_index(&self, t: Timestamp) -> usize {
        self.events.partition_point(|e| e.timestamp <= t)
    }

    /// Index of the most recent full snapshot with `timestamp <= t`.
    pub fn baseline_index(&self, t: Timestamp) -> Option<usize> {
        let end = self.end_index(t);
        let count = self.snapshots.partition_point(|&i| i < end);
        count.checked_sub(1).map(|k| self.snapshots[k])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reprise_core::{IncrementalMutation, SerializedNode};

    fn doc() -> SerializedNode {
        SerializedNode::document(1, vec![])
    }

    #[test]
    fn test_empty_timeline() {
        assert!(matches!(Timeline::new(vec![]), Err(ReplayError::EmptyTimeline)));
    }

    #[test]
    fn test_missing_base_snapshot() {
        let events = vec![
            Event::meta(0, "https://example.com", 800, 600),
            Event::mutations(5, vec![IncrementalMutation::text(2, "x")]),
            Event::full_snapshot(10, doc()),
        ];
        assert!(matches!(
            Timeline::new(events),
            Err(ReplayError::MissingBaseSnapshot { at: 5 })
        ));
    }

    #[test]
    fn test_no_full_snapshot() {
        let events = vec![
            Event::meta(0, "https://example.com", 800, 600),
            Event::new(
                5,
                reprise_core::EventData::Custom {
                    tag: "note".to_string(),
                    payload: serde_json::Value::Null,
                },
            ),
        ];
        assert!(matches!(Timeline::new(events), Err(ReplayError::NoFullSnapshot)));
    }

    #[test]
    fn test_sorting_is_stable() {
        let events = vec![
            Event::full_snapshot(0, doc()),
            Event::mutations(20, vec![IncrementalMutation::text(2, "b")]),
            Event::mutations(10, vec![IncrementalMutation::text(2, "a1")]),
            Event::mutations(10, vec![IncrementalMutation::text(2, "a2")]),
        ];
        let timeline = Timeline::new(events).unwrap();
        let order: Vec<i64> = timeline.events().iter().map(|e| e.timestamp.as_millis()).collect();
        assert_eq!(order, vec![0, 10, 10, 20]);
        assert_eq!(
            timeline.events()[1],
            Event::mutations(10, vec![IncrementalMutation::text(2, "a1")])
        );
    }

    #[test]
    fn test_indices() {
        let events = vec![
            Event::meta(0, "", 800, 600),
            Event::full_snapshot(5, doc()),
            Event::mutations(10, vec![]),
            Event::full_snapshot(20, doc()),
            Event::mutations(30, vec![]),
        ];
        let timeline = Timeline::new(events).unwrap();

        assert_eq!(timeline.start().as_millis(), 0);
        assert_eq!(timeline.end().as_millis(), 30);
        assert_eq!(timeline.first_snapshot_time(), Some(Timestamp::from_millis(5)));
        assert_eq!(timeline.baseline_index(Timestamp::from_millis(4)), None);
        assert_eq!(timeline.baseline_index(Timestamp::from_millis(5)), Some(1));
        assert_eq!(timeline.baseline_index(Timestamp::from_millis(19)), Some(1));
        assert_eq!(timeline.baseline_index(Timestamp::from_millis(25)), Some(3));
        assert_eq!(timeline.end_index(Timestamp::from_millis(10)), 3);
        assert_eq!(timeline.end_index(Timestamp::from_millis(100)), 5);
    }
}
