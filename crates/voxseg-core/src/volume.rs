//! Voxel volumes: scalar input images and label segmentations.
//!
//! Both volume types hold one buffer per time step over a shared
//! [`VolumeGeometry`]. Single-time-step frames ([`ScalarFrame`],
//! [`LabelFrame`]) are the unit of exchange with segmentation algorithms.

use glam::UVec3;

use crate::error::{Result, VoxsegError};
use crate::geometry::{Roi, TimeGeometry, VolumeGeometry};
use crate::label::{LabelSet, LabelValue, BACKGROUND_VALUE};
use crate::revision::Revision;
use crate::scalar::{ScalarData, ScalarKind};

/// Computes the x-runs copying an ROI window out of a source grid.
fn window_runs(src: &VolumeGeometry, roi: &Roi) -> Vec<(usize, usize, usize)> {
    let roi = roi.clamped_to(src.dims());
    let sub = VolumeGeometry::with_dims(roi.size());
    let mut runs = Vec::with_capacity(roi.size().y as usize * roi.size().z as usize);
    for k in 0..roi.size().z {
        for j in 0..roi.size().y {
            let src_start = src.flatten_index(roi.offset() + UVec3::new(0, j, k));
            let dst_start = sub.flatten_index(UVec3::new(0, j, k));
            runs.push((src_start, dst_start, roi.size().x as usize));
        }
    }
    runs
}

/// One time step of a scalar volume.
#[derive(Debug, Clone, PartialEq)]
pub struct ScalarFrame {
    geometry: VolumeGeometry,
    data: ScalarData,
}

impl ScalarFrame {
    /// Creates a frame from a geometry and a matching buffer.
    pub fn new(geometry: VolumeGeometry, data: ScalarData) -> Result<Self> {
        if data.len() != geometry.num_voxels() {
            return Err(VoxsegError::GeometryMismatch(format!(
                "buffer holds {} samples, geometry describes {} voxels",
                data.len(),
                geometry.num_voxels()
            )));
        }
        Ok(Self { geometry, data })
    }

    /// Returns the spatial layout.
    #[must_use]
    pub fn geometry(&self) -> &VolumeGeometry {
        &self.geometry
    }

    /// Returns the voxel buffer.
    #[must_use]
    pub fn data(&self) -> &ScalarData {
        &self.data
    }

    /// Returns the numeric kind of the buffer.
    #[must_use]
    pub fn kind(&self) -> ScalarKind {
        self.data.kind()
    }

    /// Returns the sample at a 3D index widened to `f64`.
    #[must_use]
    pub fn sample_at(&self, index: UVec3) -> Option<f64> {
        self.geometry
            .contains_index(index)
            .then(|| self.data.sample_as_f64(self.geometry.flatten_index(index)))
            .flatten()
    }
}

/// A scalar input volume with one buffer per time step.
#[derive(Debug, Clone)]
pub struct ImageVolume {
    name: String,
    geometry: VolumeGeometry,
    time: TimeGeometry,
    frames: Vec<ScalarData>,
    revision: Revision,
}

impl ImageVolume {
    /// Creates a zero-filled volume.
    pub fn new(
        name: impl Into<String>,
        geometry: VolumeGeometry,
        time: TimeGeometry,
        kind: ScalarKind,
    ) -> Self {
        let frames = (0..time.num_steps())
            .map(|_| ScalarData::zeros(kind, geometry.num_voxels()))
            .collect();
        Self {
            name: name.into(),
            geometry,
            time,
            frames,
            revision: Revision::now(),
        }
    }

    /// Creates a volume from per-time-step buffers.
    ///
    /// All buffers must match the geometry's voxel count and share one
    /// numeric kind; their count must match the time geometry.
    pub fn from_frames(
        name: impl Into<String>,
        geometry: VolumeGeometry,
        time: TimeGeometry,
        frames: Vec<ScalarData>,
    ) -> Result<Self> {
        if frames.len() != time.num_steps() {
            return Err(VoxsegError::GeometryMismatch(format!(
                "{} buffers provided for {} time steps",
                frames.len(),
                time.num_steps()
            )));
        }
        let kind = frames
            .first()
            .map(ScalarData::kind)
            .ok_or_else(|| VoxsegError::GeometryMismatch("no time steps".into()))?;
        for frame in &frames {
            if frame.kind() != kind {
                return Err(VoxsegError::ScalarKindMismatch {
                    expected: kind,
                    actual: frame.kind(),
                });
            }
            if frame.len() != geometry.num_voxels() {
                return Err(VoxsegError::GeometryMismatch(format!(
                    "buffer holds {} samples, geometry describes {} voxels",
                    frame.len(),
                    geometry.num_voxels()
                )));
            }
        }
        Ok(Self {
            name: name.into(),
            geometry,
            time,
            frames,
            revision: Revision::now(),
        })
    }

    /// Returns the volume name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the spatial layout.
    #[must_use]
    pub fn geometry(&self) -> &VolumeGeometry {
        &self.geometry
    }

    /// Returns the frame timing.
    #[must_use]
    pub fn time_geometry(&self) -> &TimeGeometry {
        &self.time
    }

    /// Returns the number of time steps.
    #[must_use]
    pub fn num_time_steps(&self) -> usize {
        self.frames.len()
    }

    /// Returns the numeric kind of the voxel buffers.
    #[must_use]
    pub fn kind(&self) -> ScalarKind {
        self.frames[0].kind()
    }

    /// Returns the buffer of one time step.
    #[must_use]
    pub fn frame_data(&self, step: usize) -> Option<&ScalarData> {
        self.frames.get(step)
    }

    /// Returns the buffer of one time step mutably and stamps the volume
    /// modified.
    pub fn frame_data_mut(&mut self, step: usize) -> Option<&mut ScalarData> {
        self.revision.touch();
        self.frames.get_mut(step)
    }

    /// Returns a copy of one time step as a standalone frame.
    #[must_use]
    pub fn extract_frame(&self, step: usize) -> Option<ScalarFrame> {
        let data = self.frames.get(step)?.clone();
        Some(ScalarFrame {
            geometry: self.geometry,
            data,
        })
    }

    /// Returns a copy of an ROI window of one time step.
    #[must_use]
    pub fn crop_frame(&self, step: usize, roi: &Roi) -> Option<ScalarFrame> {
        let data = self.frames.get(step)?;
        let runs = window_runs(&self.geometry, roi);
        let sub_geometry = self.geometry.crop(roi);
        Some(ScalarFrame {
            geometry: sub_geometry,
            data: data.copy_runs(&runs, sub_geometry.num_voxels()),
        })
    }

    /// Returns the modification stamp.
    #[must_use]
    pub fn revision(&self) -> Revision {
        self.revision
    }

    /// Stamps the volume modified.
    pub fn touch(&mut self) {
        self.revision.touch();
    }
}

/// One time step of a label volume.
#[derive(Debug, Clone, PartialEq)]
pub struct LabelFrame {
    geometry: VolumeGeometry,
    voxels: Vec<LabelValue>,
}

impl LabelFrame {
    /// Creates a background-filled frame.
    #[must_use]
    pub fn new_empty(geometry: VolumeGeometry) -> Self {
        Self {
            voxels: vec![BACKGROUND_VALUE; geometry.num_voxels()],
            geometry,
        }
    }

    /// Creates a frame from a geometry and a matching voxel buffer.
    pub fn from_voxels(geometry: VolumeGeometry, voxels: Vec<LabelValue>) -> Result<Self> {
        if voxels.len() != geometry.num_voxels() {
            return Err(VoxsegError::GeometryMismatch(format!(
                "buffer holds {} voxels, geometry describes {}",
                voxels.len(),
                geometry.num_voxels()
            )));
        }
        Ok(Self { geometry, voxels })
    }

    /// Returns the spatial layout.
    #[must_use]
    pub fn geometry(&self) -> &VolumeGeometry {
        &self.geometry
    }

    /// Returns the voxel buffer.
    #[must_use]
    pub fn voxels(&self) -> &[LabelValue] {
        &self.voxels
    }

    /// Returns the voxel buffer mutably.
    pub fn voxels_mut(&mut self) -> &mut [LabelValue] {
        &mut self.voxels
    }

    /// Returns the value at a 3D index.
    #[must_use]
    pub fn value_at(&self, index: UVec3) -> Option<LabelValue> {
        self.geometry
            .contains_index(index)
            .then(|| self.voxels[self.geometry.flatten_index(index)])
    }

    /// Sets the value at a 3D index. Out-of-range indices are ignored.
    pub fn set_value_at(&mut self, index: UVec3, value: LabelValue) {
        if self.geometry.contains_index(index) {
            let idx = self.geometry.flatten_index(index);
            self.voxels[idx] = value;
        }
    }

    /// Resets every voxel to background.
    pub fn clear(&mut self) {
        self.voxels.fill(BACKGROUND_VALUE);
    }

    /// Counts the voxels holding the given value.
    #[must_use]
    pub fn count_of(&self, value: LabelValue) -> usize {
        self.voxels.iter().filter(|&&v| v == value).count()
    }
}

/// A multi-label segmentation volume with one frame per time step.
#[derive(Debug, Clone)]
pub struct LabelVolume {
    name: String,
    geometry: VolumeGeometry,
    time: TimeGeometry,
    frames: Vec<Vec<LabelValue>>,
    labels: LabelSet,
    revision: Revision,
}

impl LabelVolume {
    /// Creates a background-filled volume with an empty label set.
    pub fn new_empty(name: impl Into<String>, geometry: VolumeGeometry, time: TimeGeometry) -> Self {
        let frames = (0..time.num_steps())
            .map(|_| vec![BACKGROUND_VALUE; geometry.num_voxels()])
            .collect();
        Self {
            name: name.into(),
            geometry,
            time,
            frames,
            labels: LabelSet::new(),
            revision: Revision::now(),
        }
    }

    /// Returns the volume name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Sets the volume name.
    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    /// Returns the spatial layout.
    #[must_use]
    pub fn geometry(&self) -> &VolumeGeometry {
        &self.geometry
    }

    /// Returns the frame timing.
    #[must_use]
    pub fn time_geometry(&self) -> &TimeGeometry {
        &self.time
    }

    /// Returns the number of time steps.
    #[must_use]
    pub fn num_time_steps(&self) -> usize {
        self.frames.len()
    }

    /// Returns the label set.
    #[must_use]
    pub fn labels(&self) -> &LabelSet {
        &self.labels
    }

    /// Returns the label set mutably and stamps the volume modified.
    pub fn labels_mut(&mut self) -> &mut LabelSet {
        self.revision.touch();
        &mut self.labels
    }

    /// Returns the voxels of one time step.
    #[must_use]
    pub fn frame(&self, step: usize) -> Option<&[LabelValue]> {
        self.frames.get(step).map(Vec::as_slice)
    }

    /// Returns the voxels of one time step mutably and stamps the volume
    /// modified.
    pub fn frame_mut(&mut self, step: usize) -> Option<&mut [LabelValue]> {
        self.revision.touch();
        self.frames.get_mut(step).map(Vec::as_mut_slice)
    }

    /// Returns a copy of one time step as a standalone frame.
    #[must_use]
    pub fn extract_frame(&self, step: usize) -> Option<LabelFrame> {
        Some(LabelFrame {
            geometry: self.geometry,
            voxels: self.frames.get(step)?.clone(),
        })
    }

    /// Returns a copy of an ROI window of one time step.
    #[must_use]
    pub fn extract_window(&self, step: usize, roi: &Roi) -> Option<LabelFrame> {
        let voxels = self.frames.get(step)?;
        let sub_geometry = self.geometry.crop(roi);
        let mut out = vec![BACKGROUND_VALUE; sub_geometry.num_voxels()];
        for (src, dst, len) in window_runs(&self.geometry, roi) {
            out[dst..dst + len].copy_from_slice(&voxels[src..src + len]);
        }
        Some(LabelFrame {
            geometry: sub_geometry,
            voxels: out,
        })
    }

    /// Replaces the voxels of one time step with a frame of identical
    /// geometry.
    pub fn write_frame(&mut self, step: usize, frame: &LabelFrame) -> Result<()> {
        if !frame.geometry().approx_eq(&self.geometry) {
            return Err(VoxsegError::GeometryMismatch(
                "frame geometry does not match volume geometry".into(),
            ));
        }
        let target = self
            .frames
            .get_mut(step)
            .ok_or_else(|| VoxsegError::InvalidState(format!("no time step {step}")))?;
        target.copy_from_slice(frame.voxels());
        self.revision.touch();
        Ok(())
    }

    /// Resets one time step to background.
    pub fn clear_frame(&mut self, step: usize) {
        if let Some(frame) = self.frames.get_mut(step) {
            frame.fill(BACKGROUND_VALUE);
            self.revision.touch();
        }
    }

    /// Resets every time step to background.
    pub fn clear_all(&mut self) {
        for frame in &mut self.frames {
            frame.fill(BACKGROUND_VALUE);
        }
        self.revision.touch();
    }

    /// Checks that every non-background voxel holds a value present in the
    /// label set.
    pub fn validate(&self) -> Result<()> {
        for (step, frame) in self.frames.iter().enumerate() {
            for &voxel in frame {
                if voxel != BACKGROUND_VALUE && !self.labels.contains(voxel) {
                    return Err(VoxsegError::InvalidState(format!(
                        "time step {step} holds value {voxel} with no matching label"
                    )));
                }
            }
        }
        Ok(())
    }

    /// Returns the modification stamp.
    #[must_use]
    pub fn revision(&self) -> Revision {
        self.revision
    }

    /// Stamps the volume modified.
    pub fn touch(&mut self) {
        self.revision.touch();
    }
}
