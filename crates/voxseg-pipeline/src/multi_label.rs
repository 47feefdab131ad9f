//! Multi-label preview support.
//!
//! Some algorithms produce a whole labeled partition at once (e.g. automatic
//! multi-level thresholding). [`MultiLabelPreview`] wraps such an algorithm
//! as a [`PreviewComputeStrategy`]: it caches the expensive multi-label
//! result and reduces the operator's currently selected label subset to the
//! single-label preview the base pipeline displays and commits.

use std::any::Any;

use glam::Vec3;

use voxseg_core::error::{Result, VoxsegError};
use voxseg_core::label::{LabelSet, LabelValue, BACKGROUND_VALUE};
use voxseg_core::revision::Revision;
use voxseg_core::volume::{LabelFrame, ScalarFrame};

use crate::strategy::PreviewComputeStrategy;

/// The hook of a multi-label algorithm: one call produces the full labeled
/// partition of a time step, together with the labels it used.
pub trait MultiLabelCompute: Any {
    /// Human-readable tool name.
    fn name(&self) -> &str;

    /// Computes the multi-label candidate volume for one time step.
    fn compute_multi_label(
        &mut self,
        input: &ScalarFrame,
        time_step: usize,
    ) -> Result<(LabelFrame, LabelSet)>;

    /// Modification stamp of the algorithm's parameters.
    fn parameter_revision(&self) -> Revision;

    /// Replaces the algorithm's seed points (world coordinates).
    fn set_seeds(&mut self, _seeds: &[Vec3]) {}
}

/// Cached multi-label result of the wrapped algorithm.
struct MlCache {
    frame: LabelFrame,
    labels: LabelSet,
    time_step: usize,
    computed_at: Revision,
}

/// Strategy wrapper adding selected-label reduction over a multi-label
/// algorithm.
///
/// The wrapped hook only runs when its result is stale: it does not exist
/// yet, the algorithm parameters changed, a different time step is
/// requested, or the selected time point moved. Changing the selected label
/// subset alone never re-runs the algorithm; it only changes how the cached
/// result is reduced.
pub struct MultiLabelPreview<A: MultiLabelCompute> {
    inner: A,
    selected: Vec<LabelValue>,
    selection_revision: Revision,
    active_label: LabelValue,
    time_point_stale: bool,
    cache: Option<MlCache>,
}

impl<A: MultiLabelCompute> MultiLabelPreview<A> {
    /// Wraps a multi-label algorithm. No label is selected initially.
    pub fn new(inner: A) -> Self {
        Self {
            inner,
            selected: Vec::new(),
            selection_revision: Revision::now(),
            active_label: 1,
            time_point_stale: false,
            cache: None,
        }
    }

    /// Returns the wrapped algorithm.
    #[must_use]
    pub fn inner(&self) -> &A {
        &self.inner
    }

    /// Returns the wrapped algorithm mutably.
    ///
    /// Parameter changes made through this reference are picked up via the
    /// algorithm's own revision stamp.
    pub fn inner_mut(&mut self) -> &mut A {
        &mut self.inner
    }

    /// Replaces the set of labels that count as "the segmentation".
    ///
    /// This only changes the reduction of the already computed result; the
    /// underlying multi-label preview is not recomputed.
    pub fn set_selected_labels(&mut self, labels: Vec<LabelValue>) {
        if labels != self.selected {
            self.selected = labels;
            self.selection_revision.touch();
        }
    }

    /// Returns the currently selected labels.
    #[must_use]
    pub fn selected_labels(&self) -> &[LabelValue] {
        &self.selected
    }

    /// Returns the cached multi-label frame for inspection, if computed.
    #[must_use]
    pub fn multi_label_frame(&self) -> Option<&LabelFrame> {
        self.cache.as_ref().map(|cache| &cache.frame)
    }

    /// Returns the label set of the cached multi-label result, if computed.
    #[must_use]
    pub fn multi_label_set(&self) -> Option<&LabelSet> {
        self.cache.as_ref().map(|cache| &cache.labels)
    }

    fn is_stale(&self, input: &ScalarFrame, time_step: usize) -> bool {
        match &self.cache {
            None => true,
            Some(cache) => {
                self.time_point_stale
                    || self
                        .inner
                        .parameter_revision()
                        .is_newer_than(cache.computed_at)
                    || cache.time_step != time_step
                    || !cache.frame.geometry().approx_eq(input.geometry())
            }
        }
    }

    /// Merges the selected labels of the cached frame into a single-label
    /// mask carrying the active label value.
    fn reduce(&self, multi_label: &LabelFrame) -> LabelFrame {
        let mut merged = LabelFrame::new_empty(*multi_label.geometry());
        if self.selected.is_empty() {
            // Nothing selected: the base preview is empty, the multi-label
            // result stays available for inspection.
            return merged;
        }
        let out = merged.voxels_mut();
        for (idx, &value) in multi_label.voxels().iter().enumerate() {
            if value != BACKGROUND_VALUE && self.selected.contains(&value) {
                out[idx] = self.active_label;
            }
        }
        merged
    }
}

impl<A: MultiLabelCompute> PreviewComputeStrategy for MultiLabelPreview<A> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn compute_preview(
        &mut self,
        input: &ScalarFrame,
        _prior: Option<&LabelFrame>,
        time_step: usize,
    ) -> Result<LabelFrame> {
        if self.is_stale(input, time_step) {
            let (frame, labels) = self.inner.compute_multi_label(input, time_step)?;
            if !frame.geometry().approx_eq(input.geometry()) {
                return Err(VoxsegError::GeometryMismatch(
                    "multi-label result does not match the input geometry".into(),
                ));
            }
            self.cache = Some(MlCache {
                frame,
                labels,
                time_step,
                computed_at: Revision::now(),
            });
            self.time_point_stale = false;
        }

        let cache = self
            .cache
            .as_ref()
            .ok_or_else(|| VoxsegError::InvalidState("multi-label cache missing".into()))?;
        Ok(self.reduce(&cache.frame))
    }

    fn parameter_revision(&self) -> Revision {
        // Selection changes must recompute the reduced preview (cheap) but
        // not the cached multi-label result, which has its own staleness.
        self.inner.parameter_revision().max(self.selection_revision)
    }

    fn prepare_update(&mut self, active_label: LabelValue) {
        self.active_label = active_label;
    }

    fn set_seeds(&mut self, seeds: &[Vec3]) {
        self.inner.set_seeds(seeds);
    }

    fn time_point_changed(&mut self) {
        self.time_point_stale = true;
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
