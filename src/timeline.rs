//! Ordered exercise slots of a single session.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{ExerciseSession, WorkoutSet};

/// The slots of one session, always kept sorted by order index with no two
/// slots sharing an index.
///
/// Loading a list where several slots share an index keeps every slot and
/// moves the later ones to the next free index.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "Vec<ExerciseSession>", into = "Vec<ExerciseSession>")]
pub struct ExerciseTimeline {
    slots: Vec<ExerciseSession>,
}

impl From<Vec<ExerciseSession>> for ExerciseTimeline {
    fn from(mut slots: Vec<ExerciseSession>) -> Self {
        slots.sort_by_key(|s| s.order_index);
        let mut next = 0;
        let mut renumbered = 0;
        for s in &mut slots {
            if s.order_index < next {
                s.order_index = next;
                renumbered += 1;
            }
            next = s.order_index + 1;
        }
        if renumbered > 0 {
            log::warn!("Renumbered {renumbered} exercise slots that shared an order index");
        }
        Self { slots }
    }
}

impl From<ExerciseTimeline> for Vec<ExerciseSession> {
    fn from(timeline: ExerciseTimeline) -> Self {
        timeline.slots
    }
}

impl ExerciseTimeline {
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ExerciseSession> {
        self.slots.iter()
    }

    pub fn as_slice(&self) -> &[ExerciseSession] {
        &self.slots
    }

    /// Mutable access by storage position. Callers must not touch
    /// `order_index`.
    pub(crate) fn slots_mut(&mut self) -> &mut [ExerciseSession] {
        &mut self.slots
    }

    pub fn slot_at(&self, order_index: u32) -> Option<&ExerciseSession> {
        self.position_of(order_index).map(|pos| &self.slots[pos])
    }

    pub fn slot_at_mut(&mut self, order_index: u32) -> Option<&mut ExerciseSession> {
        self.position_of(order_index).map(move |pos| &mut self.slots[pos])
    }

    pub fn slot(&self, id: Uuid) -> Option<&ExerciseSession> {
        self.slots.iter().find(|s| s.id == id)
    }

    /// The slot owning the given set, if any.
    pub fn slot_for_set(&self, set_id: Uuid) -> Option<&ExerciseSession> {
        self.slots
            .iter()
            .find(|s| s.sets.iter().any(|set| set.id == set_id))
    }

    pub fn sets(&self) -> impl Iterator<Item = &WorkoutSet> {
        self.slots.iter().flat_map(|s| s.sets.iter())
    }

    /// Insert a slot at `at_index`.
    ///
    /// Slots already at or after `at_index` move up by one so order indices
    /// stay unique. An index past the end of the timeline lands the slot at
    /// the end instead of failing. Returns the storage position used.
    pub fn append(&mut self, mut slot: ExerciseSession, at_index: u32) -> usize {
        for s in self.slots.iter_mut().filter(|s| s.order_index >= at_index) {
            s.order_index += 1;
        }
        slot.order_index = at_index;
        let pos = self.slots.partition_point(|s| s.order_index < at_index);
        self.slots.insert(pos, slot);
        pos
    }

    /// Put `slot` at `at_index`, replacing whatever occupied it.
    ///
    /// The replaced slot's sets are dropped, not merged. With nothing at
    /// that index the slot is inserted in order. Returns the replaced slot.
    pub fn replace(&mut self, at_index: u32, mut slot: ExerciseSession) -> Option<ExerciseSession> {
        slot.order_index = at_index;
        match self.position_of(at_index) {
            Some(pos) => Some(std::mem::replace(&mut self.slots[pos], slot)),
            None => {
                let pos = self.slots.partition_point(|s| s.order_index < at_index);
                self.slots.insert(pos, slot);
                None
            }
        }
    }

    fn position_of(&self, order_index: u32) -> Option<usize> {
        self.slots
            .binary_search_by_key(&order_index, |s| s.order_index)
            .ok()
    }
}

impl<'a> IntoIterator for &'a ExerciseTimeline {
    type Item = &'a ExerciseSession;
    type IntoIter = std::slice::Iter<'a, ExerciseSession>;

    fn into_iter(self) -> Self::IntoIter {
        self.slots.iter()
    }
}
