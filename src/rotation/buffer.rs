//! Rotation buffer: the installed view set plus the shared cursor.

use crate::replica::ReplicaInfo;
use crate::rotation::view::build_views;

/// The full set of views generated from one snapshot, cycled round-robin.
///
/// Replaced wholesale on every detected change; never mutated in place after
/// installation. The cursor always satisfies `cursor < views.len()` and
/// resets to zero with each replacement.
#[derive(Debug)]
pub struct RotationBuffer {
    views: Vec<Vec<ReplicaInfo>>,
    cursor: usize,
}

impl RotationBuffer {
    /// Build a buffer from a snapshot's entity list.
    pub fn from_entities(entities: &[ReplicaInfo]) -> Self {
        Self {
            views: build_views(entities),
            cursor: 0,
        }
    }

    /// Empty buffer used before the first poll completes: a single view with
    /// no replicas, so early pulls see "nothing available" rather than an
    /// error.
    pub fn empty() -> Self {
        Self {
            views: vec![Vec::new()],
            cursor: 0,
        }
    }

    /// Hand out the next view in rotation and advance the cursor.
    ///
    /// Returns a copy; the buffer's own views stay private to the broker.
    pub fn next_view(&mut self) -> Vec<ReplicaInfo> {
        let view = self.views[self.cursor].clone();
        self.cursor = (self.cursor + 1) % self.views.len();
        view
    }

    pub fn view_count(&self) -> usize {
        self.views.len()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }
}
