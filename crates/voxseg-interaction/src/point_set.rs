//! Ordered point collections with a selection cursor.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use voxseg_core::error::{Result, VoxsegError};
use voxseg_core::revision::Revision;

/// What insertion does when a bounded point set is already full.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BoundedInsertPolicy {
    /// The new point replaces the first point in the set.
    OverwriteFirst,
    /// The insertion is dropped.
    #[default]
    Reject,
}

/// The result of an insertion attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    /// The point was appended at the given index.
    Appended(usize),
    /// The set was full; the point at the given index was replaced.
    Overwrote(usize),
    /// The set was full and the policy dropped the point.
    Rejected,
}

/// An ordered, mutable collection of 3D points with a selection cursor.
///
/// Invariants: the selection, when present, is a valid index; a configured
/// maximum point count is never exceeded by insertion; removing the selected
/// point clears the selection.
#[derive(Debug, Clone)]
pub struct PointSet {
    points: Vec<Vec3>,
    selected: Option<usize>,
    max_points: Option<usize>,
    policy: BoundedInsertPolicy,
    revision: Revision,
}

impl PointSet {
    /// Creates an empty, unbounded point set.
    #[must_use]
    pub fn new() -> Self {
        Self {
            points: Vec::new(),
            selected: None,
            max_points: None,
            policy: BoundedInsertPolicy::default(),
            revision: Revision::now(),
        }
    }

    /// Creates an empty point set holding at most `max_points` points.
    ///
    /// A maximum of 0 is treated as unbounded.
    #[must_use]
    pub fn bounded(max_points: usize, policy: BoundedInsertPolicy) -> Self {
        Self {
            max_points: (max_points > 0).then_some(max_points),
            policy,
            ..Self::new()
        }
    }

    /// Creates the single-point set used by one-seed tools: insertion into
    /// the full set replaces the stored point.
    #[must_use]
    pub fn single_point() -> Self {
        Self::bounded(1, BoundedInsertPolicy::OverwriteFirst)
    }

    /// Returns the number of points.
    #[must_use]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Returns true if the set holds no points.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Returns true if a configured maximum is reached.
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.max_points.is_some_and(|max| self.points.len() >= max)
    }

    /// Returns the configured maximum, if any.
    #[must_use]
    pub fn max_points(&self) -> Option<usize> {
        self.max_points
    }

    /// Returns the bounded-insertion policy.
    #[must_use]
    pub fn policy(&self) -> BoundedInsertPolicy {
        self.policy
    }

    /// Returns the point at an index.
    #[must_use]
    pub fn point(&self, index: usize) -> Option<Vec3> {
        self.points.get(index).copied()
    }

    /// Returns all points in order.
    #[must_use]
    pub fn points(&self) -> &[Vec3] {
        &self.points
    }

    /// Returns the selected index, if any.
    #[must_use]
    pub fn selected_index(&self) -> Option<usize> {
        self.selected
    }

    /// Returns the selected point, if any.
    #[must_use]
    pub fn selected_point(&self) -> Option<Vec3> {
        self.selected.and_then(|i| self.point(i))
    }

    /// Attempts to insert a point, honoring the size bound.
    pub fn insert(&mut self, position: Vec3) -> InsertOutcome {
        if self.is_full() {
            return match self.policy {
                BoundedInsertPolicy::OverwriteFirst => {
                    self.points[0] = position;
                    self.revision.touch();
                    InsertOutcome::Overwrote(0)
                }
                BoundedInsertPolicy::Reject => InsertOutcome::Rejected,
            };
        }
        self.points.push(position);
        self.revision.touch();
        InsertOutcome::Appended(self.points.len() - 1)
    }

    /// Removes the point at an index.
    ///
    /// Clears the selection if the removed point was selected; shifts it if
    /// a preceding point was removed.
    pub fn remove(&mut self, index: usize) -> Result<Vec3> {
        if index >= self.points.len() {
            return Err(VoxsegError::InvalidIndex {
                index,
                len: self.points.len(),
            });
        }
        let removed = self.points.remove(index);
        self.selected = match self.selected {
            Some(s) if s == index => None,
            Some(s) if s > index => Some(s - 1),
            other => other,
        };
        self.revision.touch();
        Ok(removed)
    }

    /// Selects the point at an index.
    pub fn select(&mut self, index: usize) -> Result<()> {
        if index >= self.points.len() {
            return Err(VoxsegError::InvalidIndex {
                index,
                len: self.points.len(),
            });
        }
        self.selected = Some(index);
        Ok(())
    }

    /// Clears the selection.
    pub fn unselect(&mut self) {
        self.selected = None;
    }

    /// Replaces the coordinates of the point at an index.
    pub fn set_point(&mut self, index: usize, position: Vec3) -> Result<()> {
        match self.points.get_mut(index) {
            Some(point) => {
                *point = position;
                self.revision.touch();
                Ok(())
            }
            None => Err(VoxsegError::InvalidIndex {
                index,
                len: self.points.len(),
            }),
        }
    }

    /// Applies a delta to every point in the set.
    pub fn translate_all(&mut self, delta: Vec3) {
        for point in &mut self.points {
            *point += delta;
        }
        if !self.points.is_empty() {
            self.revision.touch();
        }
    }

    /// Removes all points and clears the selection.
    pub fn clear(&mut self) {
        if !self.points.is_empty() {
            self.revision.touch();
        }
        self.points.clear();
        self.selected = None;
    }

    /// Returns the index of the point nearest to `position` within
    /// `radius`, or `None` if no point qualifies.
    #[must_use]
    pub fn nearest_within(&self, position: Vec3, radius: f32) -> Option<usize> {
        let mut best: Option<(usize, f32)> = None;
        for (index, point) in self.points.iter().enumerate() {
            let distance = point.distance(position);
            if distance < radius && best.map_or(true, |(_, d)| distance < d) {
                best = Some((index, distance));
            }
        }
        best.map(|(index, _)| index)
    }

    /// Returns the modification stamp.
    #[must_use]
    pub fn revision(&self) -> Revision {
        self.revision
    }
}

impl Default for PointSet {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_insert_and_selection() {
        let mut set = PointSet::new();
        assert_eq!(set.insert(Vec3::X), InsertOutcome::Appended(0));
        assert_eq!(set.insert(Vec3::Y), InsertOutcome::Appended(1));
        set.select(1).unwrap();
        assert_eq!(set.selected_point(), Some(Vec3::Y));
    }

    #[test]
    fn test_single_point_overwrites() {
        let mut set = PointSet::single_point();
        assert_eq!(set.insert(Vec3::X), InsertOutcome::Appended(0));
        assert_eq!(set.insert(Vec3::Y), InsertOutcome::Overwrote(0));
        assert_eq!(set.len(), 1);
        assert_eq!(set.point(0), Some(Vec3::Y));
    }

    #[test]
    fn test_bounded_reject() {
        let mut set = PointSet::bounded(2, BoundedInsertPolicy::Reject);
        set.insert(Vec3::X);
        set.insert(Vec3::Y);
        assert_eq!(set.insert(Vec3::Z), InsertOutcome::Rejected);
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_remove_adjusts_selection() {
        let mut set = PointSet::new();
        set.insert(Vec3::X);
        set.insert(Vec3::Y);
        set.insert(Vec3::Z);

        set.select(2).unwrap();
        set.remove(0).unwrap();
        assert_eq!(set.selected_index(), Some(1));
        assert_eq!(set.selected_point(), Some(Vec3::Z));

        set.remove(1).unwrap();
        assert_eq!(set.selected_index(), None);
    }

    #[test]
    fn test_remove_out_of_range() {
        let mut set = PointSet::new();
        assert!(matches!(
            set.remove(0),
            Err(VoxsegError::InvalidIndex { index: 0, len: 0 })
        ));
    }

    #[test]
    fn test_translate_all() {
        let mut set = PointSet::new();
        set.insert(Vec3::ZERO);
        set.insert(Vec3::X);
        set.translate_all(Vec3::new(0.0, 1.0, 0.0));
        assert_eq!(set.point(0), Some(Vec3::Y));
        assert_eq!(set.point(1), Some(Vec3::new(1.0, 1.0, 0.0)));
    }

    #[test]
    fn test_nearest_within_prefers_closest() {
        let mut set = PointSet::new();
        set.insert(Vec3::ZERO);
        set.insert(Vec3::new(0.5, 0.0, 0.0));
        assert_eq!(set.nearest_within(Vec3::new(0.4, 0.0, 0.0), 1.0), Some(1));
        assert_eq!(set.nearest_within(Vec3::new(10.0, 0.0, 0.0), 1.0), None);
    }

    proptest! {
        /// A single-point-bounded set never exceeds one point and always
        /// stores the most recently inserted position.
        #[test]
        fn prop_single_point_bound(positions in prop::collection::vec(
            (-100.0f32..100.0, -100.0f32..100.0, -100.0f32..100.0),
            1..32,
        )) {
            let mut set = PointSet::single_point();
            for &(x, y, z) in &positions {
                set.insert(Vec3::new(x, y, z));
                prop_assert!(set.len() <= 1);
            }
            let (x, y, z) = *positions.last().unwrap();
            prop_assert_eq!(set.point(0), Some(Vec3::new(x, y, z)));
        }

        /// Bounded sets never exceed their maximum, whatever the policy.
        #[test]
        fn prop_bound_never_exceeded(
            max in 1usize..5,
            overwrite in proptest::bool::ANY,
            count in 0usize..20,
        ) {
            let policy = if overwrite {
                BoundedInsertPolicy::OverwriteFirst
            } else {
                BoundedInsertPolicy::Reject
            };
            let mut set = PointSet::bounded(max, policy);
            for i in 0..count {
                set.insert(Vec3::splat(i as f32));
                prop_assert!(set.len() <= max);
            }
        }
    }
}
